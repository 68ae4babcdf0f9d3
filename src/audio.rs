// Expansion sound registers are only stored and forwarded here,
// synthesis is done by whoever owns the mixer.

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AudioChip { #[default] Vrc6, Vrc7, Sunsoft5B, Mmc5 }

impl AudioChip {
  fn regs_count(&self) -> usize {
    match self {
      AudioChip::Vrc6 => 3 * 4,
      AudioChip::Vrc7 => 0x40,
      AudioChip::Sunsoft5B => 0x10,
      AudioChip::Mmc5 => 0x16,
    }
  }
}

pub trait AudioSink {
  fn write(&mut self, chip: AudioChip, reg: usize, val: u8);
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Default)]
pub struct ExpansionAudio {
  chip: AudioChip,
  regs: Box<[u8]>,
  selected: u8,
  #[cfg_attr(feature = "serde", serde(skip))]
  sink: Option<Box<dyn AudioSink>>,
}

impl ExpansionAudio {
  pub fn new(chip: AudioChip) -> Self {
    let regs = vec![0; chip.regs_count()].into_boxed_slice();
    Self { chip, regs, selected: 0, sink: None }
  }

  pub fn chip(&self) -> AudioChip { self.chip }

  pub fn reg(&self, reg: usize) -> u8 {
    self.regs.get(reg).copied().unwrap_or(0)
  }

  pub fn write(&mut self, reg: usize, val: u8) {
    let Some(slot) = self.regs.get_mut(reg) else { return; };
    *slot = val;

    if let Some(sink) = &mut self.sink {
      sink.write(self.chip, reg, val);
    }
  }

  /// Address latch of chips with an indirect register port (VRC7, 5B).
  pub fn select(&mut self, val: u8) {
    self.selected = val;
  }

  pub fn selected(&self) -> u8 { self.selected }

  pub fn write_selected(&mut self, val: u8) {
    let reg = self.selected as usize % self.regs.len().max(1);
    self.write(reg, val);
  }

  pub fn set_sink(&mut self, sink: Box<dyn AudioSink>) {
    self.sink = Some(sink);
  }

  pub fn take_sink(&mut self) -> Option<Box<dyn AudioSink>> {
    self.sink.take()
  }
}
