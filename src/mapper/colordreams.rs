use crate::{banks::MemConfig, cart::CartHeader};
use super::Mapper;

// Mapper 11
// https://www.nesdev.org/wiki/Color_Dreams
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorDreams;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for ColorDreams {
  fn new(_: &CartHeader, _: &mut MemConfig) -> Box<Self> {
    Box::new(ColorDreams)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, _: usize, val: u8) {
    banks.prg.set_page(0, val as usize & 0b11);
    banks.chr.set_page(0, val as usize >> 4);
  }
}
