use crate::{
  banks::{Banking, MemConfig},
  cart::{CartHeader, Mirroring},
  serial::{SerialLoader, SerialWrite},
};
use super::Mapper;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, PartialEq)]
enum PrgMode { Bank32kb, FixFirst16kb, #[default] FixLast16kb }
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, PartialEq)]
enum ChrMode { #[default] Bank8kb, Bank4kb }

const CTRL_RESET: u8 = 0b0_1100;

// Mapper 01
// https://www.nesdev.org/wiki/MMC1
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MMC1 {
  serial: SerialLoader,

  ctrl: u8,
  chr_select0: u8,
  chr_select1: u8,
  prg_select: u8,

  // SUROM boards use a chr line as the 256kb prg outer bank
  has_outer_prg: bool,
}

impl MMC1 {
  fn prg_mode(&self) -> PrgMode {
    match (self.ctrl >> 2) & 0b11 {
      0 | 1 => PrgMode::Bank32kb,
      2 => PrgMode::FixFirst16kb,
      _ => PrgMode::FixLast16kb,
    }
  }

  fn chr_mode(&self) -> ChrMode {
    match (self.ctrl >> 4) & 1 != 0 {
      false => ChrMode::Bank8kb,
      true  => ChrMode::Bank4kb,
    }
  }

  fn mirroring(&self) -> Mirroring {
    match self.ctrl & 0b11 {
      0 => Mirroring::OneScreenLow,
      1 => Mirroring::OneScreenHigh,
      2 => Mirroring::Vertical,
      _ => Mirroring::Horizontal,
    }
  }

  fn update_banks(&self, banks: &mut MemConfig) {
    banks.set_mirroring(self.mirroring());

    let outer = if self.has_outer_prg { self.chr_select0 as usize & 0b1_0000 } else { 0 };
    let bank = self.prg_select as usize & 0b1111;
    match self.prg_mode() {
      PrgMode::Bank32kb => {
        banks.prg.set_page(0, outer | (bank & !1));
        banks.prg.set_page(1, outer | (bank | 1));
      }
      PrgMode::FixFirst16kb => {
        banks.prg.set_page(0, outer);
        banks.prg.set_page(1, outer | bank);
      }
      PrgMode::FixLast16kb => {
        banks.prg.set_page(0, outer | bank);
        banks.prg.set_page(1, outer | 0b1111);
      }
    }

    match self.chr_mode() {
      ChrMode::Bank8kb => {
        let bank = self.chr_select0 as usize & !1;
        banks.chr.set_page(0, bank);
        banks.chr.set_page(1, bank | 1);
      }
      ChrMode::Bank4kb => {
        banks.chr.set_page(0, self.chr_select0 as usize);
        banks.chr.set_page(1, self.chr_select1 as usize);
      }
    }

    // MMC1B: bit 4 of the prg register disables the ram
    banks.sram_guard.set_enabled(self.prg_select & 0b1_0000 == 0);
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for MMC1 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 2);
    banks.chr = Banking::new_chr(header, 2);

    let mapper = Self {
      serial: SerialLoader::default(),
      ctrl: CTRL_RESET,
      chr_select0: 0,
      chr_select1: 0,
      prg_select: 0,
      has_outer_prg: header.prg_size > 256 * 1024,
    };
    mapper.update_banks(banks);

    Box::new(mapper)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match self.serial.write(val) {
      SerialWrite::Shifting => return,
      SerialWrite::Reset => self.ctrl |= CTRL_RESET,
      SerialWrite::Commit(reg) => match addr {
        0x8000..=0x9FFF => self.ctrl = reg,
        0xA000..=0xBFFF => self.chr_select0 = reg,
        0xC000..=0xDFFF => self.chr_select1 = reg,
        _ => self.prg_select = reg,
      }
    }

    self.update_banks(banks);
  }
}

#[cfg(test)]
mod mmc1_tests {
  use super::*;

  fn serial_write(mmc1: &mut MMC1, banks: &mut MemConfig, addr: usize, val: u8) {
    for i in 0..5 {
      mmc1.prg_write(banks, addr, (val >> i) & 1);
    }
  }

  fn header() -> CartHeader {
    CartHeader::new_raw(1, 256 * 1024, 128 * 1024, Mirroring::Horizontal)
  }

  #[test]
  fn power_on_fixes_last_bank() {
    let header = header();
    let mut banks = MemConfig::new(&header);
    let mmc1 = MMC1::new(&header, &mut banks);

    assert_eq!(mmc1.prg_mode(), PrgMode::FixLast16kb);
    assert_eq!(banks.prg.page_bank(0), 0);
    assert_eq!(banks.prg.page_bank(1), 15);
  }

  #[test]
  fn chr_bank0_scenario() {
    let header = header();
    let mut banks = MemConfig::new(&header);
    let mut mmc1 = MMC1::new(&header, &mut banks);

    mmc1.prg_write(&mut banks, 0x8000, 0x80);
    for bit in [0, 1, 0, 1, 1] {
      mmc1.prg_write(&mut banks, 0xA000, bit);
    }
    assert_eq!(mmc1.chr_select0, 0x1A);
    assert_eq!(mmc1.chr_select1, 0);
    assert_eq!(mmc1.prg_select, 0);
  }

  #[test]
  fn reset_forces_fix_last_without_commit() {
    let header = header();
    let mut banks = MemConfig::new(&header);
    let mut mmc1 = MMC1::new(&header, &mut banks);

    serial_write(&mut mmc1, &mut banks, 0x8000, 0b0_0010);
    assert_eq!(mmc1.prg_mode(), PrgMode::Bank32kb);
    assert_eq!(banks.mirroring(), Mirroring::Vertical);

    mmc1.prg_write(&mut banks, 0xE000, 1);
    mmc1.prg_write(&mut banks, 0xE000, 0x80);
    assert_eq!(mmc1.prg_mode(), PrgMode::FixLast16kb);
    assert_eq!(mmc1.prg_select, 0);
    assert_eq!(banks.mirroring(), Mirroring::Vertical);
  }

  #[test]
  fn chr_4kb_mode() {
    let header = header();
    let mut banks = MemConfig::new(&header);
    let mut mmc1 = MMC1::new(&header, &mut banks);

    serial_write(&mut mmc1, &mut banks, 0x8000, 0b1_1111);
    serial_write(&mut mmc1, &mut banks, 0xA000, 3);
    serial_write(&mut mmc1, &mut banks, 0xC000, 9);
    assert_eq!(banks.chr.page_bank(0), 3);
    assert_eq!(banks.chr.page_bank(1), 9);
  }

  #[test]
  fn prg_bit4_disables_ram() {
    let header = header();
    let mut banks = MemConfig::new(&header);
    let mut mmc1 = MMC1::new(&header, &mut banks);
    assert!(banks.sram_guard.can_read());

    serial_write(&mut mmc1, &mut banks, 0xE000, 0b1_0000);
    assert!(!banks.sram_guard.can_read());
  }

  #[test]
  fn surom_outer_bank() {
    let header = CartHeader::new_raw(1, 512 * 1024, 0, Mirroring::Horizontal);
    let mut banks = MemConfig::new(&header);
    let mut mmc1 = MMC1::new(&header, &mut banks);

    serial_write(&mut mmc1, &mut banks, 0xA000, 0b1_0000);
    serial_write(&mut mmc1, &mut banks, 0xE000, 2);
    assert_eq!(banks.prg.page_bank(0), 18);
    assert_eq!(banks.prg.page_bank(1), 31);
  }
}
