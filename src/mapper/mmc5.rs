use log::trace;

use crate::{
  audio::{AudioChip, ExpansionAudio},
  banks::{wrap_offset, Banking, MemConfig},
  cart::{CartHeader, ConsoleTiming, Mirroring},
  sram::OPEN_BUS,
};
use super::{Mapper, PrgTarget};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum PrgMode { Bank32kb, Bank16kb, BankMixed, #[default] Bank8kb }

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum ChrMode { Bank8kb, Bank4kb, Bank2kb, #[default] Bank1kb }

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum ExRamMode { Nametbl, NametblEx, ReadWrite, #[default] ReadOnly }

/// What one of the five 8kb cpu windows (0x6000..=0xFFFF) points at.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
enum PrgSlot { Rom(usize), Ram(usize) }

const EXRAM_SIZE: usize = 1024;

// Mapper 05
// https://www.nesdev.org/wiki/MMC5
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MMC5 {
  prg_mode: PrgMode,
  // raw values of 0x5113..=0x5117
  prg_selects: [u8; 5],
  prg_slots: [PrgSlot; 5],
  ram_protect: [u8; 2],

  chr_mode: ChrMode,
  chr_selects: [u16; 8],
  chr_hi: u8,

  exram_mode: ExRamMode,
  exram: Box<[u8]>,

  irq_target: u8,
  irq_enabled: bool,
  irq_status: bool,
  irq_pending: bool,
  in_frame: bool,
  scanline_count: u8,
  frame_line: u16,
  frame_lines: u16,

  multiplicand: u8,
  multiplier: u8,

  audio: ExpansionAudio,
}

impl MMC5 {
  fn slot_from_select(val: u8) -> PrgSlot {
    let bank = val as usize & 0b0111_1111;
    if val & 0b1000_0000 != 0 { PrgSlot::Rom(bank) } else { PrgSlot::Ram(bank) }
  }

  fn update_prg_banks(&mut self, banks: &mut MemConfig) {
    let [r0, r1, r2, r3, r4] = self.prg_selects;
    // 0x5113 is always ram, 0x5117 always rom
    let ram = PrgSlot::Ram(r0 as usize & 0b0111_1111);
    let last = r4 as usize & 0b0111_1111;

    let slot16 = |val: u8, half: usize| match Self::slot_from_select(val) {
      PrgSlot::Rom(bank) => PrgSlot::Rom((bank & !1) | half),
      PrgSlot::Ram(bank) => PrgSlot::Ram((bank & !1) | half),
    };

    let cpu_slots = match self.prg_mode {
      PrgMode::Bank32kb => {
        let bank = last & !0b11;
        [0, 1, 2, 3].map(|i| PrgSlot::Rom(bank | i))
      }
      PrgMode::Bank16kb => [
        slot16(r2, 0), slot16(r2, 1),
        PrgSlot::Rom(last & !1), PrgSlot::Rom(last | 1),
      ],
      PrgMode::BankMixed => [
        slot16(r2, 0), slot16(r2, 1),
        Self::slot_from_select(r3), PrgSlot::Rom(last),
      ],
      PrgMode::Bank8kb => [
        Self::slot_from_select(r1), Self::slot_from_select(r2),
        Self::slot_from_select(r3), PrgSlot::Rom(last),
      ],
    };

    self.prg_slots[0] = ram;
    self.prg_slots[1..].copy_from_slice(&cpu_slots);

    for (page, slot) in cpu_slots.iter().enumerate() {
      if let PrgSlot::Rom(bank) = slot {
        banks.prg.set_page(page, *bank);
      }
    }
  }

  fn update_chr_banks(&self, banks: &mut MemConfig) {
    for page in 0..8 {
      let bank = match self.chr_mode {
        ChrMode::Bank8kb => self.chr_selects[7] as usize * 8 + page,
        ChrMode::Bank4kb => self.chr_selects[page / 4 * 4 + 3] as usize * 4 + page % 4,
        ChrMode::Bank2kb => self.chr_selects[page / 2 * 2 + 1] as usize * 2 + page % 2,
        ChrMode::Bank1kb => self.chr_selects[page] as usize,
      };
      banks.chr.set_page(page, bank);
    }
  }

  fn update_ram_protect(&self, banks: &mut MemConfig) {
    let unlocked = self.ram_protect == [0b10, 0b01];
    banks.sram_guard.set_write_protected(!unlocked);
  }

  fn write_nametable_mapping(&self, banks: &mut MemConfig, val: u8) {
    match val {
      0x44 => banks.set_mirroring(Mirroring::Vertical),
      0x50 => banks.set_mirroring(Mirroring::Horizontal),
      0x00 => banks.set_mirroring(Mirroring::OneScreenLow),
      0x55 => banks.set_mirroring(Mirroring::OneScreenHigh),
      // exram and fill mode quadrants are not backed by ciram,
      // they fall back to the ciram page of their low bit
      _ => {
        for quadrant in 0..4 {
          let page = (val >> (quadrant * 2)) & 1;
          banks.set_nametable_page(quadrant, page as usize);
        }
      }
    }
  }

  fn product(&self) -> u16 {
    self.multiplicand as u16 * self.multiplier as u16
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for MMC5 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 4);
    banks.chr = Banking::new_chr(header, 8);
    // reads are always allowed, writes need the 0x5102/0x5103 unlock
    banks.sram_guard.set_access(true, true);

    let frame_lines = match header.timing {
      ConsoleTiming::PAL | ConsoleTiming::Dendy => 312,
      _ => 262,
    };

    let mut mapper = Self {
      prg_mode: PrgMode::Bank8kb,
      prg_selects: [0, 0, 0, 0, 0xFF],
      prg_slots: [PrgSlot::Ram(0); 5],
      ram_protect: [0; 2],
      chr_mode: ChrMode::Bank1kb,
      chr_selects: [0; 8],
      chr_hi: 0,
      exram_mode: ExRamMode::Nametbl,
      exram: vec![0; EXRAM_SIZE].into_boxed_slice(),
      irq_target: 0,
      irq_enabled: false,
      irq_status: false,
      irq_pending: false,
      in_frame: false,
      scanline_count: 0,
      frame_line: 0,
      frame_lines,
      multiplicand: 0xFF,
      multiplier: 0xFF,
      audio: ExpansionAudio::new(AudioChip::Mmc5),
    };
    mapper.update_prg_banks(banks);
    mapper.update_chr_banks(banks);

    Box::new(mapper)
  }

  fn prg_write(&mut self, _: &mut MemConfig, _: usize, _: u8) {}

  fn map_prg_addr(&mut self, banks: &mut MemConfig, addr: usize) -> PrgTarget {
    match addr {
      0x4020..=0x5FFF => PrgTarget::Cart,
      0x6000..=0xFFFF => match self.prg_slots[(addr - 0x6000) / 0x2000] {
        PrgSlot::Rom(_) => PrgTarget::Prg(banks.prg.translate(addr)),
        PrgSlot::Ram(bank) => {
          let offset = bank * 0x2000 + (addr & 0x1FFF);
          PrgTarget::SRam(wrap_offset(offset, banks.sram.data_size))
        }
      }
      _ => PrgTarget::OpenBus,
    }
  }

  fn cart_read(&mut self, addr: usize) -> u8 {
    match addr {
      0x5204 => {
        ((self.irq_status as u8) << 7) | ((self.in_frame as u8) << 6)
      }
      0x5205 => self.product() as u8,
      0x5206 => (self.product() >> 8) as u8,
      0x5C00..=0x5FFF => match self.exram_mode {
        ExRamMode::ReadWrite | ExRamMode::ReadOnly => self.exram[addr - 0x5C00],
        _ => OPEN_BUS,
      }
      _ => OPEN_BUS,
    }
  }

  fn cart_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr {
      0x5000..=0x5015 => self.audio.write(addr - 0x5000, val),
      0x5100 => {
        self.prg_mode = match val & 0b11 {
          0 => PrgMode::Bank32kb,
          1 => PrgMode::Bank16kb,
          2 => PrgMode::BankMixed,
          _ => PrgMode::Bank8kb,
        };
        self.update_prg_banks(banks);
      }
      0x5101 => {
        self.chr_mode = match val & 0b11 {
          0 => ChrMode::Bank8kb,
          1 => ChrMode::Bank4kb,
          2 => ChrMode::Bank2kb,
          _ => ChrMode::Bank1kb,
        };
        self.update_chr_banks(banks);
      }
      0x5102 | 0x5103 => {
        self.ram_protect[addr - 0x5102] = val & 0b11;
        self.update_ram_protect(banks);
      }
      0x5104 => self.exram_mode = match val & 0b11 {
        0 => ExRamMode::Nametbl,
        1 => ExRamMode::NametblEx,
        2 => ExRamMode::ReadWrite,
        _ => ExRamMode::ReadOnly,
      },
      0x5105 => self.write_nametable_mapping(banks, val),
      0x5113..=0x5117 => {
        self.prg_selects[addr - 0x5113] = val;
        self.update_prg_banks(banks);
      }
      0x5120..=0x5127 => {
        self.chr_selects[addr - 0x5120] = ((self.chr_hi as u16) << 8) | val as u16;
        self.update_chr_banks(banks);
      }
      // background set for 8x16 sprites, this board is modelled with a single set
      0x5128..=0x512B => {}
      0x5130 => self.chr_hi = val & 0b11,

      0x5203 => self.irq_target = val,
      0x5204 => {
        self.irq_enabled = val & 0b1000_0000 != 0;
        if !self.irq_enabled {
          self.irq_pending = false;
        }
      }
      0x5205 => self.multiplicand = val,
      0x5206 => self.multiplier = val,

      0x5C00..=0x5FFF => {
        let writable = match self.exram_mode {
          ExRamMode::Nametbl | ExRamMode::NametblEx => self.in_frame,
          ExRamMode::ReadWrite => true,
          ExRamMode::ReadOnly => false,
        };
        if writable {
          self.exram[addr - 0x5C00] = val;
        }
      }
      _ => {}
    }
  }

  // one call per scanline of the whole frame, the first visible line first
  fn notify_scanline(&mut self) {
    let line = self.frame_line;
    self.frame_line = (line + 1) % self.frame_lines;

    match line {
      0 => {
        self.in_frame = true;
        self.scanline_count = 0;
        self.irq_status = false;
      }
      1..=239 => {
        self.scanline_count = self.scanline_count.wrapping_add(1);
        if self.scanline_count == self.irq_target {
          self.irq_status = true;
          if self.irq_enabled {
            trace!("MMC5 irq asserted on scanline {}", self.scanline_count);
            self.irq_pending = true;
          }
        }
      }
      240 => self.in_frame = false,
      _ => {}
    }
  }

  fn poll_irq(&self) -> bool {
    self.irq_pending
  }

  fn ack_irq(&mut self) {
    self.irq_pending = false;
  }

  fn audio(&self) -> Option<&ExpansionAudio> { Some(&self.audio) }
  fn audio_mut(&mut self) -> Option<&mut ExpansionAudio> { Some(&mut self.audio) }
}

#[cfg(test)]
mod mmc5_tests {
  use super::*;

  fn setup() -> (Box<MMC5>, MemConfig) {
    let mut header = CartHeader::new_raw(5, 512 * 1024, 512 * 1024, Mirroring::Vertical);
    header.prg_ram_size = 64 * 1024;
    let mut banks = MemConfig::new(&header);
    let mmc5 = MMC5::new(&header, &mut banks);
    (mmc5, banks)
  }

  #[test]
  fn power_on_maps_last_bank_everywhere_rom() {
    let (mut mmc5, mut banks) = setup();
    assert_eq!(banks.prg.page_bank(3), 63);
    assert_eq!(mmc5.map_prg_addr(&mut banks, 0xFFFC), PrgTarget::Prg(63 * 0x2000 + 0x1FFC));
    assert!(matches!(mmc5.map_prg_addr(&mut banks, 0x8000), PrgTarget::SRam(_)));
  }

  #[test]
  fn prg_modes() {
    let (mut mmc5, mut banks) = setup();
    mmc5.cart_write(&mut banks, 0x5117, 0x8D);
    mmc5.cart_write(&mut banks, 0x5100, 0);
    let pages: Vec<_> = (0..4).map(|p| banks.prg.page_bank(p)).collect();
    assert_eq!(pages, [12, 13, 14, 15]);

    mmc5.cart_write(&mut banks, 0x5100, 1);
    mmc5.cart_write(&mut banks, 0x5115, 0x85);
    let pages: Vec<_> = (0..4).map(|p| banks.prg.page_bank(p)).collect();
    assert_eq!(pages, [4, 5, 12, 13]);

    mmc5.cart_write(&mut banks, 0x5100, 3);
    mmc5.cart_write(&mut banks, 0x5114, 0x03);
    assert_eq!(mmc5.map_prg_addr(&mut banks, 0x8010), PrgTarget::SRam(3 * 0x2000 + 0x10));
  }

  #[test]
  fn ram_writes_need_unlock() {
    let (mut mmc5, mut banks) = setup();
    assert!(banks.sram_guard.can_read());
    assert!(!banks.sram_guard.can_write());

    mmc5.cart_write(&mut banks, 0x5102, 0b10);
    assert!(!banks.sram_guard.can_write());
    mmc5.cart_write(&mut banks, 0x5103, 0b01);
    assert!(banks.sram_guard.can_write());
  }

  #[test]
  fn chr_modes_and_upper_bits() {
    let (mut mmc5, mut banks) = setup();
    mmc5.cart_write(&mut banks, 0x5130, 1);
    mmc5.cart_write(&mut banks, 0x5122, 0x04);
    assert_eq!(banks.chr.page_bank(2), 0x104);

    mmc5.cart_write(&mut banks, 0x5130, 0);
    mmc5.cart_write(&mut banks, 0x5127, 3);
    mmc5.cart_write(&mut banks, 0x5101, 0);
    let pages: Vec<_> = (0..8).map(|p| banks.chr.page_bank(p)).collect();
    assert_eq!(pages, [24, 25, 26, 27, 28, 29, 30, 31]);
  }

  #[test]
  fn nametable_mapping() {
    let (mut mmc5, mut banks) = setup();
    mmc5.cart_write(&mut banks, 0x5105, 0x50);
    assert_eq!(banks.mirroring(), Mirroring::Horizontal);

    // quadrants 0, 1, 1, 0
    mmc5.cart_write(&mut banks, 0x5105, 0b00_01_01_00);
    assert_eq!(banks.ciram.page_bank(1), 1);
    assert_eq!(banks.ciram.page_bank(3), 0);
  }

  #[test]
  fn multiplier() {
    let (mut mmc5, mut banks) = setup();
    mmc5.cart_write(&mut banks, 0x5205, 200);
    mmc5.cart_write(&mut banks, 0x5206, 150);
    assert_eq!(mmc5.cart_read(0x5205), (30000u16 & 0xFF) as u8);
    assert_eq!(mmc5.cart_read(0x5206), (30000u16 >> 8) as u8);
  }

  #[test]
  fn scanline_irq_does_not_ack_on_status_read() {
    let (mut mmc5, mut banks) = setup();
    mmc5.cart_write(&mut banks, 0x5203, 10);
    mmc5.cart_write(&mut banks, 0x5204, 0x80);

    for _ in 0..10 {
      mmc5.notify_scanline();
    }
    assert!(!mmc5.poll_irq());
    mmc5.notify_scanline();
    assert!(mmc5.poll_irq());

    assert_eq!(mmc5.cart_read(0x5204), 0xC0);
    assert!(mmc5.poll_irq());

    mmc5.ack_irq();
    assert!(!mmc5.poll_irq());
  }

  #[test]
  fn in_frame_flag_follows_frame() {
    let (mut mmc5, _) = setup();
    mmc5.notify_scanline();
    assert!(mmc5.in_frame);
    for _ in 0..240 {
      mmc5.notify_scanline();
    }
    assert!(!mmc5.in_frame);
    // vblank and pre-render lines, then the next frame starts
    for _ in 0..22 {
      mmc5.notify_scanline();
    }
    assert!(mmc5.in_frame);
  }

  #[test]
  fn exram_access_modes() {
    let (mut mmc5, mut banks) = setup();
    mmc5.cart_write(&mut banks, 0x5C00, 0x12);
    assert_eq!(mmc5.cart_read(0x5C00), OPEN_BUS);

    mmc5.cart_write(&mut banks, 0x5104, 2);
    mmc5.cart_write(&mut banks, 0x5C00, 0x12);
    assert_eq!(mmc5.cart_read(0x5C00), 0x12);

    mmc5.cart_write(&mut banks, 0x5104, 3);
    mmc5.cart_write(&mut banks, 0x5C00, 0x34);
    assert_eq!(mmc5.cart_read(0x5C00), 0x12);
  }
}
