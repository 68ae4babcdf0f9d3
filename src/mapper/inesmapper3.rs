use crate::{banks::{Banking, MemConfig}, cart::CartHeader};
use super::Mapper;

// Mapper 03
// https://www.nesdev.org/wiki/INES_Mapper_003
// https://www.nesdev.org/wiki/CNROM
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct INesMapper003;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for INesMapper003 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    // same prg layout as NROM
    banks.prg = Banking::new_prg(header, 2);
    banks.prg.set_page(1, 1);
    Box::new(INesMapper003)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, _: usize, val: u8) {
    banks.chr.set_page(0, val as usize);
  }
}
