use crate::{
  banks::{Banking, MemConfig},
  cart::{CartHeader, Mirroring},
};
use super::Mapper;

// Mapper 75
// https://www.nesdev.org/wiki/VRC1
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VRC1 {
  chr_selects: [u8; 2],
  chr_hi: [bool; 2],
}

impl VRC1 {
  fn update_chr_banks(&self, banks: &mut MemConfig) {
    for page in 0..2 {
      let bank = ((self.chr_hi[page] as u8) << 4) | self.chr_selects[page];
      banks.chr.set_page(page, bank as usize);
    }
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for VRC1 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 4);
    banks.prg.set_page_to_last_bank(3);
    banks.chr = Banking::new_chr(header, 2);

    Box::new(Self { chr_selects: [0; 2], chr_hi: [false; 2] })
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr & 0xF000 {
      0x8000 => banks.prg.set_page(0, val as usize & 0b1111),
      0xA000 => banks.prg.set_page(1, val as usize & 0b1111),
      0xC000 => banks.prg.set_page(2, val as usize & 0b1111),
      0x9000 => {
        let mirroring = match val & 1 != 0 {
          false => Mirroring::Vertical,
          true  => Mirroring::Horizontal,
        };
        banks.set_mirroring(mirroring);

        self.chr_hi = [val & 0b010 != 0, val & 0b100 != 0];
        self.update_chr_banks(banks);
      }
      0xE000 => {
        self.chr_selects[0] = val & 0b1111;
        self.update_chr_banks(banks);
      }
      0xF000 => {
        self.chr_selects[1] = val & 0b1111;
        self.update_chr_banks(banks);
      }
      _ => {}
    }
  }
}
