use crate::{banks::{Banking, MemConfig}, cart::CartHeader};
use super::Mapper;

// Mapper 02
// https://www.nesdev.org/wiki/UxROM
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UxRom;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for UxRom {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 2);
    banks.prg.set_page_to_last_bank(1);
    Box::new(UxRom)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, _: usize, val: u8) {
    banks.prg.set_page(0, val as usize);
  }
}
