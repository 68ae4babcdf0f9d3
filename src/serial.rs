// Serial port used by MMC1 style boards
// https://www.nesdev.org/wiki/MMC1#Registers

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialWrite {
  /// Bit 7 was set: the shift register was cleared, nothing committed.
  Reset,
  Shifting,
  /// Fifth bit received, the five bits collected LSB first.
  Commit(u8),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct SerialLoader {
  shift_reg: u8,
  shift_writes: u8,
}

impl SerialLoader {
  pub fn write(&mut self, val: u8) -> SerialWrite {
    if val & 0b1000_0000 != 0 {
      self.reset();
      return SerialWrite::Reset;
    }

    self.shift_reg = (self.shift_reg >> 1) | ((val & 1) << 4);
    self.shift_writes += 1;

    if self.shift_writes < 5 {
      return SerialWrite::Shifting;
    }

    let res = self.shift_reg & 0b1_1111;
    self.reset();
    SerialWrite::Commit(res)
  }

  pub fn reset(&mut self) {
    self.shift_reg = 0;
    self.shift_writes = 0;
  }

  pub fn bits_written(&self) -> u8 { self.shift_writes }
}
