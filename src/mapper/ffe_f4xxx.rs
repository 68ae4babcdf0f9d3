use crate::{banks::{Banking, MemConfig}, cart::{CartHeader, Mirroring}};
use super::Mapper;

// Mapper 06
// https://www.nesdev.org/wiki/INES_Mapper_006
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FfeF4xxx;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for FfeF4xxx {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 2);
    banks.prg.set_page_to_last_bank(1);
    banks.sram_guard.set_access(false, false);
    Box::new(FfeF4xxx)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr & 0xF000 {
      0x8000 => banks.prg.set_page(0, val as usize & 0b1111),
      0x9000 => {
        let mirroring = match val & 1 != 0 {
          false => Mirroring::Vertical,
          true  => Mirroring::Horizontal,
        };
        banks.set_mirroring(mirroring);
      }
      // reads need bit 7, writes need exactly 10 in bits 7-6
      0xA000 => banks.sram_guard.set_access(val & 0x80 != 0, val & 0x40 != 0),
      0xB000 => banks.chr.set_page(0, val as usize & 0b11),
      _ => {}
    }
  }
}
