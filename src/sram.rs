use bitflags::bitflags;

/// Value read when no device drives the data bus.
pub const OPEN_BUS: u8 = 0xFF;

bitflags! {
  #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
  #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
  pub struct RamAccess: u8 {
    const ENABLED         = 0b01;
    const WRITE_PROTECTED = 0b10;
  }
}

/// Gates the cpu accesses to PRG-RAM.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrgRamGuard {
  access: RamAccess,
}

impl PrgRamGuard {
  pub fn new(enabled: bool) -> Self {
    let mut guard = Self::default();
    guard.set_enabled(enabled);
    guard
  }

  pub fn access(&self) -> RamAccess { self.access }

  pub fn set_enabled(&mut self, enabled: bool) {
    self.access.set(RamAccess::ENABLED, enabled);
  }

  pub fn set_write_protected(&mut self, protected: bool) {
    self.access.set(RamAccess::WRITE_PROTECTED, protected);
  }

  pub fn set_access(&mut self, enabled: bool, protected: bool) {
    self.set_enabled(enabled);
    self.set_write_protected(protected);
  }

  pub fn can_read(&self) -> bool {
    self.access.contains(RamAccess::ENABLED)
  }

  pub fn can_write(&self) -> bool {
    self.access.contains(RamAccess::ENABLED)
    && !self.access.contains(RamAccess::WRITE_PROTECTED)
  }

  pub fn read(&self, ram: &[u8], offset: usize) -> u8 {
    if !self.can_read() { return OPEN_BUS; }
    ram.get(offset).copied().unwrap_or(OPEN_BUS)
  }

  /// Returns true only if the byte was actually stored.
  pub fn write(&self, ram: &mut [u8], offset: usize, val: u8) -> bool {
    if !self.can_write() { return false; }

    match ram.get_mut(offset) {
      Some(byte) => {
        *byte = val;
        true
      }
      None => false,
    }
  }
}
