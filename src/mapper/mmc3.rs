use bitfield_struct::bitfield;

use crate::{
  banks::{Banking, MemConfig},
  cart::{CartHeader, Mirroring},
  irq::A12Irq,
};
use super::Mapper;

#[bitfield(u8)]
struct BankSelect {
  #[bits(3)]
  reg: u8,
  #[bits(3)]
  __: u8,
  prg_swapped: bool,
  chr_inverted: bool,
}

// Mapper 04
// https://www.nesdev.org/wiki/MMC3
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MMC3 {
  bank_select: u8,
  regs: [u8; 8],
  irq: A12Irq,
}

impl MMC3 {
  fn update_prg_banks(&self, banks: &mut MemConfig) {
    let select = BankSelect::from_bits(self.bank_select);
    let (r6, r7) = (self.regs[6] as usize & 0b11_1111, self.regs[7] as usize & 0b11_1111);

    match select.prg_swapped() {
      false => {
        banks.prg.set_page(0, r6);
        banks.prg.set_page_from_last(2, 1);
      }
      true => {
        banks.prg.set_page_from_last(0, 1);
        banks.prg.set_page(2, r6);
      }
    }
    banks.prg.set_page(1, r7);
    banks.prg.set_page_to_last_bank(3);
  }

  fn update_chr_banks(&self, banks: &mut MemConfig) {
    let select = BankSelect::from_bits(self.bank_select);
    // the 2kb half lives at 0x0000 unless inverted
    let flip = if select.chr_inverted() { 4 } else { 0 };

    let r0 = self.regs[0] as usize & !1;
    let r1 = self.regs[1] as usize & !1;
    banks.chr.set_page(flip, r0);
    banks.chr.set_page(1 ^ flip, r0 | 1);
    banks.chr.set_page(2 ^ flip, r1);
    banks.chr.set_page(3 ^ flip, r1 | 1);

    for (i, &reg) in self.regs[2..6].iter().enumerate() {
      banks.chr.set_page((4 + i) ^ flip, reg as usize);
    }
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for MMC3 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 4);
    banks.chr = Banking::new_chr(header, 8);
    // ram stays closed until the game opens it through 0xA001
    banks.sram_guard.set_access(false, false);

    let mapper = Self {
      bank_select: 0,
      regs: [0, 2, 4, 5, 6, 7, 0, 1],
      irq: A12Irq::default(),
    };
    mapper.update_prg_banks(banks);
    mapper.update_chr_banks(banks);

    Box::new(mapper)
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    match addr & 0xE001 {
      0x8000 => {
        self.bank_select = val;
        self.update_prg_banks(banks);
        self.update_chr_banks(banks);
      }
      0x8001 => {
        let reg = BankSelect::from_bits(self.bank_select).reg() as usize;
        self.regs[reg] = val;
        match reg {
          6 | 7 => self.update_prg_banks(banks),
          _ => self.update_chr_banks(banks),
        }
      }
      0xA000 => {
        let mirroring = match val & 1 != 0 {
          false => Mirroring::Vertical,
          true  => Mirroring::Horizontal,
        };
        banks.set_mirroring(mirroring);
      }
      0xA001 => banks.sram_guard.set_access(val & 0x80 != 0, val & 0x40 != 0),
      0xC000 => self.irq.set_latch(val),
      0xC001 => self.irq.request_reload(),
      0xE000 => self.irq.set_enabled(false),
      _ => self.irq.set_enabled(true),
    }
  }

  fn notify_ppu_access(&mut self, _: &mut MemConfig, addr: usize) {
    self.irq.observe(addr);
  }

  fn poll_irq(&self) -> bool {
    self.irq.pending()
  }

  fn ack_irq(&mut self) {
    self.irq.acknowledge();
  }
}
