use log::trace;

use crate::{
  audio::{AudioChip, ExpansionAudio},
  banks::{wrap_bank, wrap_offset, Banking, MemConfig},
  cart::{CartHeader, Mirroring},
};
use super::{Mapper, PrgTarget};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command { Chr(u8), Prg0, Prg(u8), Nametbl, IrqCtrl, IrqLo, IrqHi }

impl Default for Command {
  fn default() -> Self { Command::Chr(0) }
}

impl From<u8> for Command {
  fn from(val: u8) -> Self {
    match val & 0b1111 {
      0x8 => Command::Prg0,
      n @ 0x9..=0xB => Command::Prg(n - 0x9),
      0xC => Command::Nametbl,
      0xD => Command::IrqCtrl,
      0xE => Command::IrqLo,
      0xF => Command::IrqHi,
      n => Command::Chr(n),
    }
  }
}

// Mapper 69
// https://www.nesdev.org/wiki/Sunsoft_FME-7
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SunsoftFME7 {
  command: Command,
  // bank visible at 0x6000 when it holds rom
  prg_6000: usize,
  ram_selected: bool,

  irq_enabled: bool,
  irq_counter_enabled: bool,
  irq_count: u16,
  irq_pending: bool,

  audio: ExpansionAudio,
}

impl SunsoftFME7 {
  fn write_param(&mut self, banks: &mut MemConfig, val: u8) {
    match self.command {
      Command::Chr(page) => banks.chr.set_page(page as usize, val as usize),
      Command::Prg0 => {
        let bank = val as usize & 0b11_1111;
        self.ram_selected = val & 0b0100_0000 != 0;
        self.prg_6000 = bank;
        banks.sram.set_page(0, bank);
        banks.sram_guard.set_enabled(val & 0b1000_0000 != 0);
      }
      Command::Prg(page) => banks.prg.set_page(page as usize, val as usize & 0b11_1111),
      Command::Nametbl => banks.set_mirroring(Mirroring::from_bits(val)),
      Command::IrqCtrl => {
        self.irq_enabled = val & 1 != 0;
        self.irq_counter_enabled = val & 0b1000_0000 != 0;
        self.irq_pending = false;
      }
      Command::IrqLo => self.irq_count = (self.irq_count & 0xFF00) | val as u16,
      Command::IrqHi => self.irq_count = (self.irq_count & 0x00FF) | ((val as u16) << 8),
    }
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for SunsoftFME7 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 4);
    banks.chr = Banking::new_chr(header, 8);
    banks.prg.set_page_to_last_bank(3);
    banks.sram_guard.set_enabled(false);

    Box::new(Self {
      command: Command::default(),
      prg_6000: 0,
      ram_selected: false,
      irq_enabled: false,
      irq_counter_enabled: false,
      irq_count: 0,
      irq_pending: false,
      audio: ExpansionAudio::new(AudioChip::Sunsoft5B),
    })
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr {
      0x8000..=0x9FFF => self.command = Command::from(val),
      0xA000..=0xBFFF => self.write_param(banks, val),
      0xC000..=0xDFFF => self.audio.select(val),
      0xE000..=0xFFFF => self.audio.write_selected(val),
      _ => {}
    }
  }

  fn map_prg_addr(&mut self, banks: &mut MemConfig, addr: usize) -> PrgTarget {
    match addr {
      0x4020..=0x5FFF => PrgTarget::Cart,
      0x6000..=0x7FFF if self.ram_selected => PrgTarget::SRam(banks.sram.translate(addr)),
      0x6000..=0x7FFF => {
        let bank = wrap_bank(self.prg_6000, banks.prg.banks_count);
        let offset = bank * banks.prg.bank_size + (addr & 0x1FFF);
        PrgTarget::Prg(wrap_offset(offset, banks.prg.data_size))
      }
      _ => PrgTarget::Prg(banks.prg.translate(addr)),
    }
  }

  fn notify_cpu_cycle(&mut self) {
    if !self.irq_counter_enabled { return; }

    self.irq_count = self.irq_count.wrapping_sub(1);
    if self.irq_count == 0xFFFF && self.irq_enabled {
      trace!("FME-7 irq asserted");
      self.irq_pending = true;
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
