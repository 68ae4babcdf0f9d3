use crate::{banks::{Banking, MemConfig}, cart::{CartHeader, Mirroring}};
use super::Mapper;

// Mapper 71
// https://www.nesdev.org/wiki/INES_Mapper_071
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct INesMapper071;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for INesMapper071 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 2);
    banks.prg.set_page_to_last_bank(1);
    Box::new(INesMapper071)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr {
      // only Fire Hawk wires this one
      0x9000..=0x9FFF => {
        let mirroring = match (val >> 4) & 1 != 0 {
          false => Mirroring::OneScreenLow,
          true  => Mirroring::OneScreenHigh,
        };
        banks.set_mirroring(mirroring);
      }
      0xC000..=0xFFFF => banks.prg.set_page(0, val as usize & 0b1111),
      _ => {}
    }
  }
}
