use log::trace;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IrqState { #[default] Idle, Counting, Pending }

/// Scanline counter clocked by rising edges of PPU address line A12.
// https://www.nesdev.org/wiki/MMC3#IRQ_Specifics
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct A12Irq {
  pub latch: u8,
  pub counter: u8,
  pub reload: bool,
  enabled: bool,
  pending: bool,
  a12_high: bool,
}

impl A12Irq {
  /// Feeds one PPU pattern table access.
  pub fn observe(&mut self, addr: usize) {
    let high = addr & 0x1000 != 0;
    let rising = high && !self.a12_high;
    self.a12_high = high;

    if rising {
      self.clock_edge();
    }
  }

  pub fn clock_edge(&mut self) {
    if self.reload {
      self.counter = self.latch;
      self.reload = false;
    } else if self.counter == 0 {
      self.counter = self.latch;
    } else {
      self.counter -= 1;
      if self.counter == 0 && self.enabled {
        trace!("A12 irq asserted");
        self.pending = true;
      }
    }
  }

  pub fn set_latch(&mut self, val: u8) {
    self.latch = val;
  }

  pub fn request_reload(&mut self) {
    self.counter = 0;
    self.reload = true;
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
    if !enabled {
      self.pending = false;
    }
  }

  pub fn enabled(&self) -> bool { self.enabled }
  pub fn pending(&self) -> bool { self.pending }

  pub fn acknowledge(&mut self) {
    if self.pending {
      trace!("A12 irq acknowledged");
    }
    self.pending = false;
  }

  pub fn state(&self) -> IrqState {
    if self.pending { IrqState::Pending }
    else if self.enabled { IrqState::Counting }
    else { IrqState::Idle }
  }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CounterMode { #[default] Scanline, Cycle }

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CountDirection { #[default] Up, Down }

const PRESCALER_RELOAD: i16 = 341;

/// 8 bit counter clocked by cpu cycles, either directly or through
/// a scanline prescaler.
// https://www.nesdev.org/wiki/VRC_IRQ
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct CounterIrq {
  pub latch: u8,
  pub counter: u8,
  pub mode: CounterMode,
  pub direction: CountDirection,
  prescaler: i16,
  enabled: bool,
  enabled_after_ack: bool,
  pending: bool,
}

impl CounterIrq {
  pub fn new(direction: CountDirection) -> Self {
    Self { direction, prescaler: PRESCALER_RELOAD, ..Default::default() }
  }

  pub fn write_latch(&mut self, val: u8) {
    self.latch = val;
  }

  pub fn write_latch_lo(&mut self, val: u8) {
    self.latch = (self.latch & 0xF0) | (val & 0x0F);
  }

  pub fn write_latch_hi(&mut self, val: u8) {
    self.latch = (self.latch & 0x0F) | ((val & 0x0F) << 4);
  }

  /// VRC control byte: bit 0 enable after ack, bit 1 enable, bit 2 cycle mode.
  pub fn write_ctrl(&mut self, val: u8) {
    self.enabled_after_ack = val & 0b001 != 0;
    self.enabled = val & 0b010 != 0;
    self.mode = match val & 0b100 != 0 {
      false => CounterMode::Scanline,
      true  => CounterMode::Cycle,
    };

    self.pending = false;
    if self.enabled {
      self.counter = self.latch;
      self.prescaler = PRESCALER_RELOAD;
    }
  }

  pub fn write_ack(&mut self) {
    self.pending = false;
    self.enabled = self.enabled_after_ack;
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
    if !enabled {
      self.pending = false;
    }
  }

  pub fn enabled(&self) -> bool { self.enabled }
  pub fn pending(&self) -> bool { self.pending }

  pub fn acknowledge(&mut self) {
    self.pending = false;
  }

  pub fn state(&self) -> IrqState {
    if self.pending { IrqState::Pending }
    else if self.enabled { IrqState::Counting }
    else { IrqState::Idle }
  }

  pub fn clock_cpu(&mut self) {
    if !self.enabled { return; }

    match self.mode {
      CounterMode::Cycle => self.tick(),
      CounterMode::Scanline => {
        self.prescaler -= 3;
        if self.prescaler <= 0 {
          self.prescaler += PRESCALER_RELOAD;
          self.tick();
        }
      }
    }
  }

  /// Clocks the counter once, for sources that are already scanline aligned.
  pub fn clock_scanline(&mut self) {
    if self.enabled {
      self.tick();
    }
  }

  fn tick(&mut self) {
    let wrapped = match self.direction {
      CountDirection::Up => self.counter == 0xFF,
      CountDirection::Down => self.counter == 0x00,
    };

    if wrapped {
      trace!("counter irq asserted, reloading {:#04x}", self.latch);
      self.counter = self.latch;
      self.pending = true;
    } else {
      self.counter = match self.direction {
        CountDirection::Up => self.counter + 1,
        CountDirection::Down => self.counter - 1,
      };
    }
  }
}
