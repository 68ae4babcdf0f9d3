use crate::{banks::MemConfig, cart::{CartHeader, Mirroring}};
use super::Mapper;

// Mapper 255
// https://www.nesdev.org/wiki/INES_Mapper_255
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct INesMapper255;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for INesMapper255 {
  fn new(_: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.sram_guard.set_write_protected(true);
    Box::new(INesMapper255)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr & 0x8001 {
      0x8000 => {
        banks.prg.set_page(0, val as usize & 0b11_1111);
        banks.chr.set_page(0, (val as usize >> 6) & 0b11);
      }
      _ => {
        banks.sram_guard.set_write_protected(val & 0x80 != 0);
        let mirroring = match val & 1 != 0 {
          false => Mirroring::Horizontal,
          true  => Mirroring::Vertical,
        };
        banks.set_mirroring(mirroring);
      }
    }
  }
}
