use crate::{banks::{Banking, MemConfig}, cart::CartHeader};
use super::Mapper;

// Mapper 00
// https://www.nesdev.org/wiki/NROM
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NRom;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for NRom {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    // a 16kb rom shows up twice, the second page wraps back to bank 0
    banks.prg = Banking::new_prg(header, 2);
    banks.prg.set_page(1, 1);
    Box::new(NRom)
  }

  fn prg_write(&mut self, _: &mut MemConfig, _: usize, _: u8) {}
}
