use bitfield_struct::bitfield;

use crate::{
  banks::{Banking, MemConfig},
  cart::{CartHeader, Mirroring},
  irq::{CountDirection, CounterIrq},
  sram::OPEN_BUS,
};
use super::{Mapper, PrgTarget};

#[bitfield(u16)]
struct ChrSelect {
  #[bits(4)]
  lo: u8,
  #[bits(5)]
  hi: u8,
  #[bits(7)]
  __: u8,
}

// Mappers 21, 22, 23, 25
// https://www.nesdev.org/wiki/VRC2_and_VRC4
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VRC2_4 {
  mapper: u16,
  prg_select0: u8,
  swap_mode: bool,
  chr_selects: [u16; 8],
  // VRC2 boards without ram answer 0x6000 with a one bit latch
  latch: bool,
  irq: CounterIrq,
}

impl VRC2_4 {
  fn is_vrc2a(&self) -> bool { self.mapper == 22 }

  // Each board wires different cpu lines to the chip register select pins.
  // Or-ing both candidate lines works for every submapper at once.
  fn translate_addr(&self, addr: usize) -> usize {
    let bit = |n: usize| (addr >> n) & 1;

    let (a0, a1) = match self.mapper {
      // VRC4a, VRC4c
      21 => (bit(1) | bit(6), bit(2) | bit(7)),
      // VRC2a
      22 => (bit(1), bit(0)),
      // VRC2b, VRC4e
      23 => (bit(0) | bit(2), bit(1) | bit(3)),
      // VRC2c, VRC4b, VRC4d
      _ => (bit(1) | bit(3), bit(0) | bit(2)),
    };

    (addr & 0xF000) | (a1 << 1) | a0
  }

  fn update_prg_banks(&self, banks: &mut MemConfig) {
    let bank = self.prg_select0 as usize & 0b1_1111;
    match self.swap_mode {
      false => {
        banks.prg.set_page(0, bank);
        banks.prg.set_page_from_last(2, 1);
      }
      true => {
        banks.prg.set_page_from_last(0, 1);
        banks.prg.set_page(2, bank);
      }
    }
  }

  fn update_chr_bank(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    // 0xB000..=0xE003, two registers per page, low nibble first
    let reg = ((addr >> 12) - 0xB) * 2 + ((addr >> 1) & 1);
    let is_high = addr & 1 != 0;

    let mut select = ChrSelect::from_bits(self.chr_selects[reg]);
    if is_high {
      select.set_hi(val & 0b1_1111);
    } else {
      select.set_lo(val & 0b1111);
    }
    self.chr_selects[reg] = select.into_bits();

    let bank = if self.is_vrc2a() { select.into_bits() >> 1 } else { select.into_bits() };
    banks.chr.set_page(reg, bank as usize);
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for VRC2_4 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 4);
    banks.chr = Banking::new_chr(header, 8);
    banks.prg.set_page_to_last_bank(3);

    let mapper = Self {
      mapper: header.mapper,
      prg_select0: 0,
      swap_mode: false,
      chr_selects: [0; 8],
      latch: false,
      irq: CounterIrq::new(CountDirection::Up),
    };
    mapper.update_prg_banks(banks);

    Box::new(mapper)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    let addr = self.translate_addr(addr);

    match addr {
      0x8000..=0x8003 => {
        self.prg_select0 = val;
        self.update_prg_banks(banks);
      }
      0x9000..=0x9003 if self.is_vrc2a() => banks.set_mirroring(match val & 1 != 0 {
        false => Mirroring::Vertical,
        true  => Mirroring::Horizontal,
      }),
      0x9000 | 0x9001 => banks.set_mirroring(Mirroring::from_bits(val)),
      0x9002 | 0x9003 => {
        self.swap_mode = val & 0b10 != 0;
        self.update_prg_banks(banks);
      }
      0xA000..=0xA003 => banks.prg.set_page(1, val as usize & 0b1_1111),
      0xB000..=0xE003 => self.update_chr_bank(banks, addr, val),

      0xF000 => self.irq.write_latch_lo(val),
      0xF001 => self.irq.write_latch_hi(val),
      0xF002 => self.irq.write_ctrl(val),
      0xF003 => self.irq.write_ack(),
      _ => {}
    }
  }

  fn map_prg_addr(&mut self, banks: &mut MemConfig, addr: usize) -> PrgTarget {
    match addr {
      0x6000..=0x6FFF if self.is_vrc2a() => PrgTarget::Cart,
      0x4020..=0x5FFF => PrgTarget::Cart,
      0x6000..=0x7FFF => PrgTarget::SRam(banks.sram.translate(addr)),
      _ => PrgTarget::Prg(banks.prg.translate(addr)),
    }
  }

  fn cart_read(&mut self, addr: usize) -> u8 {
    match addr {
      0x6000..=0x6FFF => 0x60 | self.latch as u8,
      _ => OPEN_BUS,
    }
  }

  fn cart_write(&mut self, _: &mut MemConfig, addr: usize, val: u8) {
    if (0x6000..=0x6FFF).contains(&addr) {
      self.latch = val & 1 != 0;
    }
  }

  fn notify_cpu_cycle(&mut self) {
    if !self.is_vrc2a() {
      self.irq.clock_cpu();
    }
  }

  fn poll_irq(&self) -> bool {
    self.irq.pending()
  }

  fn ack_irq(&mut self) {
    self.irq.acknowledge();
  }
}
