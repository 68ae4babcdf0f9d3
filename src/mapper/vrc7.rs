use crate::{
  audio::{AudioChip, ExpansionAudio},
  banks::{Banking, MemConfig},
  cart::{CartHeader, Mirroring},
  irq::{CountDirection, CounterIrq},
};
use super::Mapper;

// Mapper 85
// https://www.nesdev.org/wiki/VRC7
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VRC7 {
  irq: CounterIrq,
  audio: ExpansionAudio,
}

impl VRC7 {
  /// VRC7a wires A4 and VRC7b wires A3 to the same register line.
  /// A5 is only decoded by the sound port at 0x9030.
  pub(crate) fn decode_addr(addr: usize) -> usize {
    let line = if addr & 0b1_1000 != 0 { 0x10 } else { 0 };
    let hi = addr & 0xF000;
    let sound_data = if hi == 0x9000 { addr & 0x20 } else { 0 };
    hi | sound_data | line
  }
}

#[cfg_attr(feature = "serde", typetag::serde)]
impl Mapper for VRC7 {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> {
    banks.prg = Banking::new_prg(header, 4);
    banks.prg.set_page_to_last_bank(3);
    banks.chr = Banking::new_chr(header, 8);
    banks.sram_guard.set_enabled(false);

    Box::new(Self {
      irq: CounterIrq::new(CountDirection::Up),
      audio: ExpansionAudio::new(AudioChip::Vrc7),
    })
  }

  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8) {
    let bank = val as usize & 0b11_1111;

    match Self::decode_addr(addr) {
      0x8000 => banks.prg.set_page(0, bank),
      0x8010 => banks.prg.set_page(1, bank),
      0x9000 => banks.prg.set_page(2, bank),
      0x9010 => self.audio.select(val),
      0x9030 => self.audio.write_selected(val),
      addr @ 0xA000..=0xD010 => {
        let page = ((addr >> 12) - 0xA) * 2 + ((addr >> 4) & 1);
        banks.chr.set_page(page, val as usize);
      }
      0xE000 => {
        banks.set_mirroring(Mirroring::from_bits(val));
        banks.sram_guard.set_enabled(val & 0b1000_0000 != 0);
      }
      0xE010 => self.irq.write_latch(val),
      0xF000 => self.irq.write_ctrl(val),
      0xF010 => self.irq.write_ack(),
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

#[cfg(test)]
mod vrc7_tests {
  use super::*;

  fn setup() -> (Box<VRC7>, MemConfig) {
    let header = CartHeader::new_raw(85, 256 * 1024, 128 * 1024, Mirroring::Vertical);
    let mut banks = MemConfig::new(&header);
    let vrc = VRC7::new(&header, &mut banks);
    (vrc, banks)
  }

  #[test]
  fn both_board_wirings_decode_alike() {
    assert_eq!(VRC7::decode_addr(0x8008), 0x8010);
    assert_eq!(VRC7::decode_addr(0x8010), 0x8010);
    assert_eq!(VRC7::decode_addr(0xB008), 0xB010);
    assert_eq!(VRC7::decode_addr(0x9030), 0x9030);
    assert_eq!(VRC7::decode_addr(0xA020), 0xA000);
  }

  #[test]
  fn prg_and_chr_pages() {
    let (mut vrc, mut banks) = setup();
    vrc.prg_write(&mut banks, 0x8000, 3);
    vrc.prg_write(&mut banks, 0x8008, 4);
    vrc.prg_write(&mut banks, 0x9000, 5);
    let pages: Vec<_> = (0..4).map(|p| banks.prg.page_bank(p)).collect();
    assert_eq!(pages, [3, 4, 5, 31]);

    vrc.prg_write(&mut banks, 0xC010, 77);
    assert_eq!(banks.chr.page_bank(5), 77);
    vrc.prg_write(&mut banks, 0xD000, 12);
    assert_eq!(banks.chr.page_bank(6), 12);
  }

  #[test]
  fn mirroring_and_ram_enable() {
    let (mut vrc, mut banks) = setup();
    assert!(!banks.sram_guard.can_read());

    vrc.prg_write(&mut banks, 0xE000, 0b1000_0011);
    assert_eq!(banks.mirroring(), Mirroring::OneScreenHigh);
    assert!(banks.sram_guard.can_write());
  }

  #[test]
  fn sound_port_is_indirect() {
    let (mut vrc, mut banks) = setup();
    vrc.prg_write(&mut banks, 0x9010, 0x30);
    vrc.prg_write(&mut banks, 0x9030, 0x1F);
    assert_eq!(vrc.audio.reg(0x30), 0x1F);
    assert_eq!(vrc.audio.selected(), 0x30);
  }

  #[test]
  fn irq_in_cycle_mode() {
    let (mut vrc, mut banks) = setup();
    vrc.prg_write(&mut banks, 0xE008, 0xFE);
    vrc.prg_write(&mut banks, 0xF000, 0b111);
    vrc.notify_cpu_cycle();
    vrc.notify_cpu_cycle();
    assert!(vrc.poll_irq());

    // acknowledge keeps counting because of enable-after-ack
    vrc.prg_write(&mut banks, 0xF008, 0);
    assert!(!vrc.poll_irq());
    assert!(vrc.irq.enabled());
  }
}
