use crate::{
  banks::{Banking, MemConfig},
  cart::{CartHeader, Mirroring},
};
use super::Mapper;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Latch { FD, #[default] FE }

// Mapper 09
// https://www.nesdev.org/wiki/MMC2
// Mapper 10
// https://www.nesdev.org/wiki/MMC4
// They only differ in the prg layout.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MMC2 {
  is_mmc4: bool,
  chr_selects0: [u8; 2],
  chr_selects1: [u8; 2],
  latches: [Latch; 2],
}

impl MMC2 {
  fn update_chr_banks(&self, banks: &mut MemConfig) {
    banks.chr.set_page(0, self.chr_selects0[self.latches[0] as usize] as usize);
    banks.chr.set_page(1, self.chr_selects1[self.latches[1] as usize] as usize);
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for MMC2 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    let is_mmc4 = header.mapper == 10;

    if is_mmc4 {
      banks.prg = Banking::new_prg(header, 2);
      banks.prg.set_page_to_last_bank(1);
    } else {
      banks.prg = Banking::new_prg(header, 4);
      banks.prg.set_page_from_last(1, 2);
      banks.prg.set_page_from_last(2, 1);
      banks.prg.set_page_to_last_bank(3);
    }
    banks.chr = Banking::new_chr(header, 2);

    let mapper = Self {
      is_mmc4,
      chr_selects0: [0; 2],
      chr_selects1: [0; 2],
      latches: [Latch::FE; 2],
    };
    mapper.update_chr_banks(banks);

    Box::new(mapper)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    let bank = val & 0b1_1111;

    match addr {
      0xA000..=0xAFFF => {
        let mask = if self.is_mmc4 { 0b1111 } else { 0b111 };
        banks.prg.set_page(0, (val & mask) as usize);
      }
      0xB000..=0xBFFF => self.chr_selects0[Latch::FD as usize] = bank,
      0xC000..=0xCFFF => self.chr_selects0[Latch::FE as usize] = bank,
      0xD000..=0xDFFF => self.chr_selects1[Latch::FD as usize] = bank,
      0xE000..=0xEFFF => self.chr_selects1[Latch::FE as usize] = bank,
      0xF000..=0xFFFF => {
        let mirroring = match val & 1 != 0 {
          false => Mirroring::Vertical,
          true  => Mirroring::Horizontal,
        };
        banks.set_mirroring(mirroring);
      }
      _ => {}
    }

    self.update_chr_banks(banks);
  }

  // the latch switches after the triggering fetch completed
  fn notify_ppu_access(&mut self, banks: &mut MemConfig, addr: usize) {
    // mmc2 low half triggers on the exact address, everything else on an 8 byte range
    let trigger = if addr < 0x1000 && !self.is_mmc4 { addr } else { addr & !0b111 };
    let latch = match trigger {
      0x0FD8 => Some((0, Latch::FD)),
      0x0FE8 => Some((0, Latch::FE)),
      0x1FD8 => Some((1, Latch::FD)),
      0x1FE8 => Some((1, Latch::FE)),
      _ => None,
    };

    if let Some((half, latch)) = latch {
      self.latches[half] = latch;
      self.update_chr_banks(banks);
    }
  }
}
