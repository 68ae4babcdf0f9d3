use crate::{banks::MemConfig, cart::CartHeader};
use super::Mapper;

// Mapper 66
// https://www.nesdev.org/wiki/GxROM
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GxRom;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for GxRom {
  fn new(_: &CartHeader, _: &mut MemConfig) -> Box<Self> {
    Box::new(GxRom)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, _: usize, val: u8) {
    banks.chr.set_page(0, val as usize & 0b11);
    banks.prg.set_page(0, (val as usize >> 4) & 0b11);
  }
}
