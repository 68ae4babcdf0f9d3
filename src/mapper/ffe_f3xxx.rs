use crate::{banks::MemConfig, cart::CartHeader};
use super::Mapper;

// Mapper 08
// https://www.nesdev.org/wiki/INES_Mapper_008
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FfeF3xxx;

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for FfeF3xxx {
  fn new(_: &CartHeader, _: &mut MemConfig) -> Box<Self> {
    Box::new(FfeF3xxx)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr {
      0x8000..=0xAFFF => banks.prg.set_page(0, val as usize & 0b1111),
      0xB000..=0xDFFF => banks.chr.set_page(0, val as usize & 0b1111),
      _ => {}
    }
  }
}

#[cfg(test)]
mod ffe_f3xxx_tests {
  use super::*;
  use crate::cart::Mirroring;

  #[test]
  fn split_prg_and_chr_registers() {
    let header = CartHeader::new_raw(8, 256 * 1024, 128 * 1024, Mirroring::Vertical);
    let mut banks = MemConfig::new(&header);
    let mut ffe = FfeF3xxx::new(&header, &mut banks);

    ffe.prg_write(&mut banks, 0xA000, 0x13);
    ffe.prg_write(&mut banks, 0xD000, 0x25);
    assert_eq!(banks.prg.page_bank(0), 3);
    assert_eq!(banks.chr.page_bank(0), 5);

    ffe.prg_write(&mut banks, 0xE000, 1);
    assert_eq!(banks.prg.page_bank(0), 3);
    assert_eq!(banks.chr.page_bank(0), 5);
  }
}
