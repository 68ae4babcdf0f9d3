use crate::{banks::MemConfig, cart::{CartHeader, Mirroring}};
use super::Mapper;

// Mapper 07
// https://www.nesdev.org/wiki/AxROM
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxRom;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for AxRom {
  fn new(_: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.set_mirroring(Mirroring::OneScreenLow);
    Box::new(AxRom)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, _: usize, val: u8) {
    banks.prg.set_page(0, val as usize & 0b111);

    let mirroring = match val & 0b0001_0000 != 0 {
      false => Mirroring::OneScreenLow,
      true  => Mirroring::OneScreenHigh,
    };
    banks.set_mirroring(mirroring);
  }
}
