use log::warn;

use crate::{cart::{CartHeader, Mirroring}, sram::PrgRamGuard};

/// Reduces a requested bank number into the banks really present.
/// An empty backing store only ever exposes bank 0.
pub fn wrap_bank(bank: usize, banks_count: usize) -> usize {
  if banks_count == 0 { 0 } else { bank % banks_count }
}

/// Folds an offset back into the physical size of a backing store.
/// The result is always `< size`, unless `size` is 0.
pub fn wrap_offset(offset: usize, size: usize) -> usize {
  if size == 0 { 0 } else { offset % size }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct PrgBanking;
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct ChrBanking;
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct SramBanking;
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct CiramBanking;

/// A row of equally sized windows (pages) over one backing array.
/// Each page holds the start offset of the bank currently mapped into it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone)]
pub struct Banking<T> {
  pub data_size: usize,
  pub bank_size: usize,
  pub banks_count: usize,

  pages_start: usize,
  pub bankings: Box<[usize]>,
  kind: std::marker::PhantomData<T>,
}

impl<T> Banking<T> {
  pub fn new(data_size: usize, pages_start: usize, bank_size: usize, pages_count: usize) -> Self {
    let bankings = vec![0; pages_count].into_boxed_slice();
    let bank_size = bank_size.max(1);
    // a store smaller than one window still has one (mirrored) bank
    let banks_count = (data_size / bank_size).max(1);
    Self { bankings, data_size, pages_start, bank_size, banks_count, kind: std::marker::PhantomData::<T> }
  }

  pub fn set_page(&mut self, page: usize, bank: usize) {
    let bank = wrap_bank(bank, self.banks_count);
    if let Some(slot) = self.bankings.get_mut(page) {
      *slot = bank * self.bank_size;
    }
  }

  pub fn swap_pages(&mut self, left: usize, right: usize) {
    if left < self.bankings.len() && right < self.bankings.len() {
      self.bankings.swap(left, right);
    }
  }

  pub fn set_page_to_last_bank(&mut self, page: usize) {
    self.set_page_from_last(page, 0);
  }

  /// Maps the bank `back` positions before the last one, e.g. 1 is the second last.
  pub fn set_page_from_last(&mut self, page: usize, back: usize) {
    let bank = self.banks_count.saturating_sub(1 + back);
    self.set_page(page, bank);
  }

  pub fn page_bank(&self, page: usize) -> usize {
    self.bankings.get(page).map(|start| start / self.bank_size).unwrap_or(0)
  }

  pub fn pages_count(&self) -> usize {
    self.bankings.len()
  }

  pub fn page_to_bank_addr(&self, page: usize, addr: usize) -> usize {
    let start = self.bankings.get(page).copied().unwrap_or(0);
    wrap_offset(start + (addr % self.bank_size), self.data_size)
  }

  pub fn translate(&self, addr: usize) -> usize {
    let page = addr.wrapping_sub(self.pages_start) / self.bank_size;
    self.page_to_bank_addr(page, addr)
  }

  fn is_mismatched(&self) -> bool {
    self.data_size != 0 && (self.data_size < self.bank_size || self.data_size % self.bank_size != 0)
  }
}

impl Banking<PrgBanking> {
  pub fn new_prg(header: &CartHeader, pages_count: usize) -> Self {
    let pages_size = 32*1024 / pages_count;
    Self::new(header.prg_size, 0x8000, pages_size, pages_count)
  }
}

impl Banking<SramBanking> {
  pub fn new_sram(header: &CartHeader) -> Self {
    Self::new(header.sram_real_size(), 0x6000, 8*1024, 1)
  }
}

impl Banking<ChrBanking> {
  pub fn new_chr(header: &CartHeader, pages_count: usize) -> Self {
    let pages_size = 8*1024 / pages_count;
    Self::new(header.chr_real_size(), 0, pages_size, pages_count)
  }
}

impl Banking<CiramBanking> {
  pub fn new_ciram(header: &CartHeader) -> Self {
    let mut res = Self::new(header.ciram_size(), 0x2000, 1024, 4);
    res.update(header.mirroring);
    res
  }

  pub fn update(&mut self, mirroring: Mirroring) {
    let pages = match mirroring {
      Mirroring::Horizontal    => [0, 0, 1, 1],
      Mirroring::Vertical      => [0, 1, 0, 1],
      Mirroring::OneScreenLow  => [0, 0, 0, 0],
      Mirroring::OneScreenHigh => [1, 1, 1, 1],
      Mirroring::FourScreen    => [0, 1, 2, 3],
    };

    for (page, bank) in pages.into_iter().enumerate() {
      self.set_page(page, bank);
    }
  }
}

/// The bank tables of a cartridge, plus the mirroring and PRG-RAM state
/// every mapper shares.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct MemConfig {
  pub prg:   Banking<PrgBanking>,
  pub chr:   Banking<ChrBanking>,
  pub sram:  Banking<SramBanking>,
  pub ciram: Banking<CiramBanking>,
  pub sram_guard: PrgRamGuard,

  mirroring: Mirroring,
  four_screen: bool,
}

impl Default for MemConfig {
  fn default() -> Self {
    Self::new(&CartHeader::default())
  }
}

impl MemConfig {
  pub fn new(header: &CartHeader) -> Self {
    let prg = Banking::new_prg(header, 1);
    let chr = Banking::new_chr(header, 1);
    let sram = Banking::new_sram(header);
    let ciram = Banking::new_ciram(header);
    let four_screen = header.mirroring == Mirroring::FourScreen;

    Self {
      prg, chr, sram, ciram,
      sram_guard: PrgRamGuard::new(true),
      mirroring: header.mirroring,
      four_screen,
    }
  }

  pub fn mirroring(&self) -> Mirroring {
    self.mirroring
  }

  /// Applies a mirroring chosen by a mapper register.
  /// Four-screen wiring on the board wins over any register write.
  pub fn set_mirroring(&mut self, mirroring: Mirroring) {
    if self.four_screen { return; }

    self.mirroring = mirroring;
    self.ciram.update(mirroring);
  }

  /// Points a single nametable quadrant at a CIRAM page, for boards
  /// that map each quadrant on its own.
  pub fn set_nametable_page(&mut self, quadrant: usize, page: usize) {
    if self.four_screen { return; }
    self.ciram.set_page(quadrant, page);
  }

  /// Logs a size mismatch between a backing array and its window granularity.
  /// Called once, when the cartridge is loaded.
  pub fn check_sizes(&self) {
    if self.prg.is_mismatched() {
      warn!(
        "PRG-ROM size {:#x} doesn't fit {:#x} byte banks, accesses will be wrapped",
        self.prg.data_size, self.prg.bank_size
      );
    }

    if self.chr.is_mismatched() {
      warn!(
        "CHR size {:#x} doesn't fit {:#x} byte banks, accesses will be wrapped",
        self.chr.data_size, self.chr.bank_size
      );
    }
  }
}

#[cfg(test)]
mod banks_tests {
  use super::*;

  #[test]
  fn wrap_primitives() {
    assert_eq!(wrap_bank(5, 2), 1);
    assert_eq!(wrap_bank(7, 8), 7);
    assert_eq!(wrap_bank(3, 0), 0);
    assert_eq!(wrap_offset(0x4000, 0x4000), 0);
    assert_eq!(wrap_offset(0x4001, 0x4000), 1);
    assert_eq!(wrap_offset(123, 0), 0);
  }

  #[test]
  fn undersized_prg_wraps_requested_bank() {
    // 16KB of PRG seen through 8KB windows
    let mut prg = Banking::<PrgBanking>::new(16*1024, 0x8000, 8*1024, 4);
    assert_eq!(prg.banks_count, 2);

    prg.set_page(0, 5);
    assert_eq!(prg.page_bank(0), 1);
    assert_eq!(prg.translate(0x8000), 0x2000);
    assert_eq!(prg.translate(0x9FFF), 0x3FFF);
  }

  #[test]
  fn translated_offsets_stay_in_range() {
    for size in [8*1024, 16*1024, 24*1024, 40*1024] {
      let mut prg = Banking::<PrgBanking>::new(size, 0x8000, 8*1024, 4);
      for bank in 0..64 {
        for page in 0..4 {
          prg.set_page(page, bank);
        }
        for addr in (0x8000..=0xFFFF).step_by(0x3FF) {
          assert!(prg.translate(addr) < size);
        }
      }
    }
  }

  #[test]
  fn store_smaller_than_window_is_mirrored() {
    let chr = Banking::<ChrBanking>::new(2*1024, 0, 8*1024, 1);
    assert_eq!(chr.banks_count, 1);
    assert!(chr.is_mismatched());
    assert_eq!(chr.translate(0x0800), 0);
    assert_eq!(chr.translate(0x1FFF), 0x7FF);
  }

  #[test]
  fn last_bank_pages() {
    let mut prg = Banking::<PrgBanking>::new(128*1024, 0x8000, 8*1024, 4);
    prg.set_page_to_last_bank(3);
    prg.set_page_from_last(2, 1);
    assert_eq!(prg.page_bank(3), 15);
    assert_eq!(prg.page_bank(2), 14);
  }

  #[test]
  fn ciram_layouts() {
    let mut ciram = Banking::<CiramBanking>::new(2*1024, 0x2000, 1024, 4);
    ciram.update(Mirroring::Vertical);
    assert_eq!(ciram.translate(0x2000), ciram.translate(0x2800));
    assert_ne!(ciram.translate(0x2000), ciram.translate(0x2400));

    ciram.update(Mirroring::Horizontal);
    assert_eq!(ciram.translate(0x2000), ciram.translate(0x2400));
    assert_ne!(ciram.translate(0x2000), ciram.translate(0x2800));

    ciram.update(Mirroring::OneScreenHigh);
    assert_eq!(ciram.translate(0x2C10), 0x410);
  }

  #[test]
  fn four_screen_ignores_register_mirroring() {
    let header = CartHeader { mirroring: Mirroring::FourScreen, ..Default::default() };
    let mut cfg = MemConfig::new(&header);
    cfg.set_mirroring(Mirroring::Vertical);
    assert_eq!(cfg.mirroring(), Mirroring::FourScreen);
    assert_eq!(cfg.ciram.translate(0x2C00), 0xC00);
  }
}
