use crate::{
  audio::{AudioChip, ExpansionAudio},
  banks::{Banking, MemConfig},
  cart::{CartHeader, Mirroring},
  irq::{CountDirection, CounterIrq},
};
use super::Mapper;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, PartialEq)]
enum ChrMode { #[default] Bank1kb, Bank2kb, BankMixed }

// Mappers 24, 26
// https://www.nesdev.org/wiki/VRC6
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VRC6 {
  mapper: u16,
  chr_selects: [u8; 8],
  chr_mode: ChrMode,
  // when set, 2kb banks take their low bit from the register instead of A10
  chr_latch: bool,

  irq: CounterIrq,
  audio: ExpansionAudio,
}

impl VRC6 {
  /// Canonical register address: mapper 26 has A0 and A1 swapped,
  /// then only A0, A1 and the top nibble are decoded.
  pub(crate) fn decode_addr(mapper: u16, addr: usize) -> usize {
    let addr = if mapper == 26 {
      (addr & !0b11) | ((addr & 0b01) << 1) | ((addr & 0b10) >> 1)
    } else { addr };

    addr & 0xF003
  }

  fn chr_bank_2kb(&self, reg: usize, page: usize) -> usize {
    let bank = self.chr_selects[reg] as usize;
    if self.chr_latch { bank } else { (bank & !1) | (page & 1) }
  }

  fn update_chr_banks(&self, banks: &mut MemConfig) {
    for page in 0..8 {
      let bank = match self.chr_mode {
        ChrMode::Bank1kb => self.chr_selects[page] as usize,
        ChrMode::Bank2kb => self.chr_bank_2kb(page / 2, page),
        ChrMode::BankMixed if page < 4 => self.chr_selects[page] as usize,
        ChrMode::BankMixed => self.chr_bank_2kb(4 + (page - 4) / 2, page),
      };
      banks.chr.set_page(page, bank);
    }
  }

  fn write_ppu_ctrl(&mut self, banks: &mut MemConfig, val: u8) {
    self.chr_mode = match val & 0b11 {
      0 => ChrMode::Bank1kb,
      1 => ChrMode::Bank2kb,
      _ => ChrMode::BankMixed,
    };
    self.chr_latch = val & 0b10_0000 != 0;
    self.update_chr_banks(banks);

    banks.set_mirroring(Mirroring::from_bits(val >> 2));
    banks.sram_guard.set_enabled(val & 0b1000_0000 != 0);
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for VRC6 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 4);
    banks.chr = Banking::new_chr(header, 8);
    banks.prg.set_page(1, 1);
    banks.prg.set_page_to_last_bank(3);

    let mapper = Self {
      mapper: header.mapper,
      chr_selects: [0; 8],
      chr_mode: ChrMode::Bank1kb,
      chr_latch: false,
      irq: CounterIrq::new(CountDirection::Up),
      audio: ExpansionAudio::new(AudioChip::Vrc6),
    };

    Box::new(mapper)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    let addr = Self::decode_addr(self.mapper, addr);

    match addr {
      0x8000..=0x8003 => {
        let bank = (val as usize & 0b1111) << 1;
        banks.prg.set_page(0, bank);
        banks.prg.set_page(1, bank | 1);
      }
      0x9000..=0x9003 => self.audio.write(addr & 0b11, val),
      0xA000..=0xA002 => self.audio.write(4 + (addr & 0b11), val),
      0xB000..=0xB002 => self.audio.write(8 + (addr & 0b11), val),
      0xB003 => self.write_ppu_ctrl(banks, val),
      0xC000..=0xC003 => banks.prg.set_page(2, val as usize & 0b1_1111),
      0xD000..=0xE003 => {
        let reg = ((addr >> 12) - 0xD) * 4 + (addr & 0b11);
        self.chr_selects[reg] = val;
        self.update_chr_banks(banks);
      }
      0xF000 => self.irq.write_latch(val),
      0xF001 => self.irq.write_ctrl(val),
      0xF002 => self.irq.write_ack(),
      _ => {}
    }
  }

  fn notify_cpu_cycle(&mut self) {
    self.irq.clock_cpu();
  }

  fn poll_irq(&self) -> bool {
    self.irq.pending()
  }

  fn ack_irq(&mut self) {
    self.irq.acknowledge();
  }

  fn audio(&self) -> Option<&ExpansionAudio> { Some(&self.audio) }
  fn audio_mut(&mut self) -> Option<&mut ExpansionAudio> { Some(&mut self.audio) }
}
