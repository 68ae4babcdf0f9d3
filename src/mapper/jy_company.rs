use crate::{
  banks::{wrap_bank, wrap_offset, Banking, MemConfig},
  cart::{CartHeader, Mirroring},
  irq::{CountDirection, CounterIrq},
  sram::OPEN_BUS,
};
use super::{Mapper, PrgTarget};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum IrqSource { #[default] CpuCycle, PpuA12, PpuRead, CpuWrite }

// Mapper 90
// https://www.nesdev.org/wiki/J.Y._Company_ASIC
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JyCompany {
  prg_selects: [u8; 4],
  chr_selects: [u16; 8],
  nametbl_selects: [u8; 4],

  // 0xD000
  prg_mode: u8,
  chr_mode: u8,
  prg_last_from_reg: bool,
  ext_nametables: bool,
  rom_at_6000: bool,

  irq: CounterIrq,
  irq_source: IrqSource,
  // direction bits 00 and 11 hold the counter without disabling it
  irq_paused: bool,
  small_prescaler: bool,
  prescaler: u8,
  xor: u8,
  a12_high: bool,

  multiplicand: u8,
  multiplier: u8,
  scratch: u8,
}

impl JyCompany {
  fn update_prg_banks(&self, banks: &mut MemConfig) {
    let last = banks.prg.banks_count.saturating_sub(1);
    let [r0, r1, r2, r3] = self.prg_selects.map(|r| r as usize & 0b111_1111);

    let pages = match self.prg_mode {
      0 => {
        let bank = if self.prg_last_from_reg { r3 * 4 } else { last & !0b11 };
        [bank, bank | 1, bank | 2, bank | 3]
      }
      1 => {
        let hi = if self.prg_last_from_reg { r3 * 2 } else { last & !1 };
        [r1 * 2, r1 * 2 + 1, hi, hi | 1]
      }
      2 => [r0, r1, r2, if self.prg_last_from_reg { r3 } else { last }],
      _ => {
        // mode 3 wires the register bits in reverse order
        let rev = |r: usize| (r as u8).reverse_bits() as usize >> 1;
        [rev(r0), rev(r1), rev(r2), if self.prg_last_from_reg { rev(r3) } else { last }]
      }
    };

    for (page, bank) in pages.into_iter().enumerate() {
      banks.prg.set_page(page, bank);
    }
  }

  /// Bank in 8kb units visible at 0x6000 when it holds rom.
  fn prg_6000_bank(&self) -> usize {
    let r3 = self.prg_selects[3] as usize & 0b111_1111;
    match self.prg_mode {
      0 => r3 * 4 + 3,
      1 => r3 * 2 + 1,
      _ => r3,
    }
  }

  fn update_chr_banks(&self, banks: &mut MemConfig) {
    let reg = |i: usize| self.chr_selects[i] as usize;

    for page in 0..8 {
      let bank = match self.chr_mode {
        0 => reg(0) * 8 + page,
        1 => reg(page / 4 * 4) * 4 + page % 4,
        2 => reg(page / 2 * 2) * 2 + page % 2,
        _ => reg(page),
      };
      banks.chr.set_page(page, bank);
    }
  }

  fn update_nametables(&self, banks: &mut MemConfig) {
    if !self.ext_nametables { return; }

    for (quadrant, select) in self.nametbl_selects.iter().enumerate() {
      banks.set_nametable_page(quadrant, *select as usize & 1);
    }
  }

  fn write_mode(&mut self, banks: &mut MemConfig, val: u8) {
    self.prg_mode = val & 0b11;
    self.prg_last_from_reg = val & 0b100 != 0;
    self.chr_mode = (val >> 3) & 0b11;
    self.ext_nametables = val & 0b10_0000 != 0;
    self.rom_at_6000 = val & 0b1000_0000 != 0;

    self.update_prg_banks(banks);
    self.update_chr_banks(banks);
    self.update_nametables(banks);
  }

  fn write_irq_mode(&mut self, val: u8) {
    self.irq_paused = match val >> 6 {
      1 => { self.irq.direction = CountDirection::Up; false }
      2 => { self.irq.direction = CountDirection::Down; false }
      _ => true,
    };
    self.small_prescaler = val & 0b1000 != 0;

    self.irq_source = match val & 0b11 {
      0 => IrqSource::CpuCycle,
      1 => IrqSource::PpuA12,
      2 => IrqSource::PpuRead,
      _ => IrqSource::CpuWrite,
    };
  }

  /// One event of the selected source. The prescaler divides it by 256,
  /// or by 8 in small mode, before the counter sees it.
  fn clock_irq(&mut self) {
    if self.irq_paused || !self.irq.enabled() { return; }

    let mask = if self.small_prescaler { 0b111 } else { 0xFF };
    let carry = match self.irq.direction {
      CountDirection::Up => {
        self.prescaler = self.prescaler.wrapping_add(1);
        self.prescaler & mask == 0
      }
      CountDirection::Down => {
        self.prescaler = self.prescaler.wrapping_sub(1);
        self.prescaler & mask == mask
      }
    };

    if carry {
      self.irq.clock_scanline();
    }
  }

  fn product(&self) -> u16 {
    self.multiplicand as u16 * self.multiplier as u16
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for JyCompany {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 4);
    banks.chr = Banking::new_chr(header, 8);

    let irq = CounterIrq::new(CountDirection::Up);

    let mapper = Self {
      prg_selects: [0; 4],
      chr_selects: [0; 8],
      nametbl_selects: [0; 4],
      prg_mode: 0,
      chr_mode: 0,
      prg_last_from_reg: false,
      ext_nametables: false,
      rom_at_6000: false,
      irq,
      irq_source: IrqSource::CpuCycle,
      irq_paused: true,
      small_prescaler: false,
      prescaler: 0,
      xor: 0,
      a12_high: false,
      multiplicand: 0,
      multiplier: 0,
      scratch: 0,
    };
    mapper.update_prg_banks(banks);
    mapper.update_chr_banks(banks);

    Box::new(mapper)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr & 0xF007 {
      addr @ 0x8000..=0x8007 => {
        self.prg_selects[addr & 0b11] = val;
        self.update_prg_banks(banks);
      }
      addr @ 0x9000..=0x9007 => {
        let reg = &mut self.chr_selects[addr & 0b111];
        *reg = (*reg & 0xFF00) | val as u16;
        self.update_chr_banks(banks);
      }
      addr @ 0xA000..=0xA007 => {
        let reg = &mut self.chr_selects[addr & 0b111];
        *reg = (*reg & 0x00FF) | ((val as u16) << 8);
        self.update_chr_banks(banks);
      }
      addr @ 0xB000..=0xB003 => {
        self.nametbl_selects[addr & 0b11] = val;
        self.update_nametables(banks);
      }

      0xC000 => self.irq.set_enabled(val & 1 != 0),
      0xC001 => self.write_irq_mode(val),
      0xC002 => self.irq.set_enabled(false),
      0xC003 => self.irq.set_enabled(true),
      0xC004 => self.prescaler = val ^ self.xor,
      0xC005 => {
        let period = val ^ self.xor;
        self.irq.write_latch(period);
        self.irq.counter = period;
      }
      0xC006 => self.xor = val,

      0xD000 | 0xD004 => self.write_mode(banks, val),
      0xD001 | 0xD005 => banks.set_mirroring(Mirroring::from_bits(val)),
      _ => {}
    }

    if self.irq_source == IrqSource::CpuWrite {
      self.clock_irq();
    }
  }

  fn map_prg_addr(&mut self, banks: &mut MemConfig, addr: usize) -> PrgTarget {
    match addr {
      0x4020..=0x5FFF => PrgTarget::Cart,
      0x6000..=0x7FFF if self.rom_at_6000 => {
        let bank = wrap_bank(self.prg_6000_bank(), banks.prg.banks_count);
        let offset = bank * banks.prg.bank_size + (addr & 0x1FFF);
        PrgTarget::Prg(wrap_offset(offset, banks.prg.data_size))
      }
      0x6000..=0x7FFF => PrgTarget::SRam(banks.sram.translate(addr)),
      _ => PrgTarget::Prg(banks.prg.translate(addr)),
    }
  }

  fn cart_read(&mut self, addr: usize) -> u8 {
    match addr {
      0x5800 => self.product() as u8,
      0x5801 => (self.product() >> 8) as u8,
      0x5803 => self.scratch,
      _ => OPEN_BUS,
    }
  }

  fn cart_write(&mut self, _: &mut MemConfig, addr: usize, val: u8) {
    match addr {
      0x5800 => self.multiplicand = val,
      0x5801 => self.multiplier = val,
      0x5803 => self.scratch = val,
      _ => {}
    }
  }

  fn notify_ppu_access(&mut self, _: &mut MemConfig, addr: usize) {
    let high = addr & 0x1000 != 0;
    let rising = high && !self.a12_high;
    self.a12_high = high;

    match self.irq_source {
      IrqSource::PpuA12 if rising => self.clock_irq(),
      IrqSource::PpuRead => self.clock_irq(),
      _ => {}
    }
  }

  fn notify_cpu_cycle(&mut self) {
    if self.irq_source == IrqSource::CpuCycle {
      self.clock_irq();
    }
  }

  fn poll_irq(&self) -> bool {
    self.irq.pending()
  }

  fn ack_irq(&mut self) {
    self.irq.acknowledge();
  }
}

#[cfg(test)]
mod jy_company_tests {
  use super::*;

  fn setup() -> (Box<JyCompany>, MemConfig) {
    let header = CartHeader::new_raw(90, 512 * 1024, 256 * 1024, Mirroring::Vertical);
    let mut banks = MemConfig::new(&header);
    let jy = JyCompany::new(&header, &mut banks);
    (jy, banks)
  }

  #[test]
  fn prg_modes() {
    let (mut jy, mut banks) = setup();
    let pages: Vec<_> = (0..4).map(|p| banks.prg.page_bank(p)).collect();
    assert_eq!(pages, [60, 61, 62, 63]);

    jy.prg_write(&mut banks, 0x8000, 5);
    jy.prg_write(&mut banks, 0x8001, 6);
    jy.prg_write(&mut banks, 0x8002, 7);
    jy.prg_write(&mut banks, 0xD000, 0b10);
    let pages: Vec<_> = (0..4).map(|p| banks.prg.page_bank(p)).collect();
    assert_eq!(pages, [5, 6, 7, 63]);

    jy.prg_write(&mut banks, 0x8003, 9);
    jy.prg_write(&mut banks, 0xD000, 0b110);
    assert_eq!(banks.prg.page_bank(3), 9);

    jy.prg_write(&mut banks, 0xD000, 0b01);
    let pages: Vec<_> = (0..4).map(|p| banks.prg.page_bank(p)).collect();
    assert_eq!(pages, [12, 13, 62, 63]);
  }

  #[test]
  fn chr_select_has_high_byte() {
    let (mut jy, mut banks) = setup();
    jy.prg_write(&mut banks, 0xD000, 0b1_1000);
    jy.prg_write(&mut banks, 0x9005, 0x10);
    jy.prg_write(&mut banks, 0xA005, 0x01);
    assert_eq!(banks.chr.page_bank(5), 0x110 % 256);

    jy.prg_write(&mut banks, 0xD000, 0b0_1000);
    jy.prg_write(&mut banks, 0x9004, 3);
    let pages: Vec<_> = (4..8).map(|p| banks.chr.page_bank(p)).collect();
    assert_eq!(pages, [12, 13, 14, 15]);
  }

  #[test]
  fn multiplier_and_scratch_live_below_6000() {
    let (mut jy, mut banks) = setup();
    assert_eq!(jy.map_prg_addr(&mut banks, 0x5800), PrgTarget::Cart);
    jy.cart_write(&mut banks, 0x5800, 0x12);
    jy.cart_write(&mut banks, 0x5801, 0x34);
    assert_eq!(jy.cart_read(0x5800), 0xA8);
    assert_eq!(jy.cart_read(0x5801), 0x03);

    jy.cart_write(&mut banks, 0x5803, 0x77);
    assert_eq!(jy.cart_read(0x5803), 0x77);

    assert!(matches!(jy.map_prg_addr(&mut banks, 0x6000), PrgTarget::SRam(0)));
  }

  #[test]
  fn rom_at_6000() {
    let (mut jy, mut banks) = setup();
    jy.prg_write(&mut banks, 0x8003, 4);
    jy.prg_write(&mut banks, 0xD000, 0b1000_0010);
    assert_eq!(jy.map_prg_addr(&mut banks, 0x6001), PrgTarget::Prg(4 * 0x2000 + 1));
  }

  fn program_irq(jy: &mut JyCompany, banks: &mut MemConfig, mode: u8, period: u8) {
    jy.prg_write(banks, 0xC001, mode);
    jy.prg_write(banks, 0xC004, 0);
    jy.prg_write(banks, 0xC005, period);
    jy.prg_write(banks, 0xC003, 0);
  }

  fn cycles_until_irq(jy: &mut JyCompany, limit: usize) -> Option<usize> {
    (1..=limit).find(|_| {
      jy.notify_cpu_cycle();
      jy.poll_irq()
    })
  }

  #[test]
  fn irq_period_comes_from_counter_register() {
    // down counting, 3 bit prescaler, cpu cycles
    let (mut jy, mut banks) = setup();
    program_irq(&mut jy, &mut banks, 0b1000_1000, 4);
    // the first cycle borrows out of the prescaler, then every 8th
    assert_eq!(cycles_until_irq(&mut jy, 10_000), Some(1 + 4 * 8));

    let (mut jy, mut banks) = setup();
    program_irq(&mut jy, &mut banks, 0b1000_1000, 100);
    assert_eq!(cycles_until_irq(&mut jy, 10_000), Some(1 + 100 * 8));

    // the counter reloads, the next period is a full one
    jy.prg_write(&mut banks, 0xC002, 0);
    assert!(!jy.poll_irq());
    jy.prg_write(&mut banks, 0xC003, 0);
    assert_eq!(cycles_until_irq(&mut jy, 10_000), Some(101 * 8));
  }

  #[test]
  fn irq_registers_are_xored() {
    let (mut jy, mut banks) = setup();
    jy.prg_write(&mut banks, 0xC006, 0xFF);
    jy.prg_write(&mut banks, 0xC001, 0b1000_1000);
    jy.prg_write(&mut banks, 0xC004, 0xFF);
    jy.prg_write(&mut banks, 0xC005, !4);
    jy.prg_write(&mut banks, 0xC003, 0);
    assert_eq!(jy.irq.latch, 4);
    assert_eq!(jy.prescaler, 0);
    assert_eq!(cycles_until_irq(&mut jy, 10_000), Some(33));
  }

  #[test]
  fn full_prescaler_counts_up() {
    let (mut jy, mut banks) = setup();
    program_irq(&mut jy, &mut banks, 0b0100_0000, 0xFE);
    // 0xFE -> 0xFF -> wrap, one counter step every 256 cycles
    assert_eq!(cycles_until_irq(&mut jy, 10_000), Some(2 * 256));
  }

  #[test]
  fn pause_keeps_pending_and_enable() {
    let (mut jy, mut banks) = setup();
    program_irq(&mut jy, &mut banks, 0b1000_1000, 0);
    assert_eq!(cycles_until_irq(&mut jy, 100), Some(1));

    jy.prg_write(&mut banks, 0xC001, 0b0000_1000);
    assert!(jy.poll_irq());
    assert!(jy.irq.enabled());

    jy.ack_irq();
    assert_eq!(cycles_until_irq(&mut jy, 1000), None);

    // counting resumes where it stopped
    jy.prg_write(&mut banks, 0xC001, 0b1000_1000);
    assert_eq!(cycles_until_irq(&mut jy, 1000), Some(8));
  }

  #[test]
  fn irq_from_a12_edges() {
    let (mut jy, mut banks) = setup();
    program_irq(&mut jy, &mut banks, 0b0100_1001, 0xFF);
    // 3 bit prescaler counting up: 8 rising edges per counter step
    jy.prg_write(&mut banks, 0xC004, 7);

    // cpu cycles don't clock the counter in this mode
    jy.notify_cpu_cycle();
    assert!(!jy.poll_irq());

    jy.notify_ppu_access(&mut banks, 0x0000);
    jy.notify_ppu_access(&mut banks, 0x1000);
    jy.notify_ppu_access(&mut banks, 0x1008);
    assert!(jy.poll_irq());
  }
}
