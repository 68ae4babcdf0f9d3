#![allow(dead_code)]

use nen_mapper::{Cart, CartHeader, Mirroring};

pub const PRG_BANK: usize = 8 * 1024;
pub const CHR_BANK: usize = 1024;

pub fn init_logger() {
  let mut builder = colog::basic_builder();
  builder.filter_level(log::LevelFilter::Debug);
  // every test calls this, only the first one wins
  let _ = builder.try_init();
}

/// PRG-ROM where every 8kb bank is filled with its own index.
pub fn prg_rom(size: usize) -> Vec<u8> {
  (0..size).map(|i| (i / PRG_BANK) as u8).collect()
}

/// CHR-ROM where every 1kb bank is filled with its own index.
pub fn chr_rom(size: usize) -> Vec<u8> {
  (0..size).map(|i| (i / CHR_BANK) as u8).collect()
}

/// A full iNES image. `flags6` only needs the low nibble,
/// the mapper number is filled in.
pub fn ines_image(mapper: u8, prg_16kb: u8, chr_8kb: u8, flags6: u8) -> Vec<u8> {
  let mut rom = vec![
    0x4E, 0x45, 0x53, 0x1A,
    prg_16kb, chr_8kb,
    (mapper << 4) | (flags6 & 0x0F),
    mapper & 0xF0,
  ];
  rom.resize(16, 0);
  rom.extend(prg_rom(prg_16kb as usize * 16 * 1024));
  rom.extend(chr_rom(chr_8kb as usize * 8 * 1024));
  rom
}

/// Cartridge built from split arrays. A `chr_kb` of 0 means 8kb of CHR-RAM.
pub fn new_cart(mapper: u16, prg_kb: usize, chr_kb: usize) -> Cart {
  new_cart_with(mapper, prg_kb, chr_kb, |_| {})
}

pub fn new_cart_with(mapper: u16, prg_kb: usize, chr_kb: usize, edit: impl FnOnce(&mut CartHeader)) -> Cart {
  init_logger();

  let mut header = CartHeader::new_raw(mapper, prg_kb * 1024, chr_kb * 1024, Mirroring::Vertical);
  edit(&mut header);
  let prg = prg_rom(prg_kb * 1024);
  let chr = chr_rom(chr_kb * 1024);

  match Cart::from_parts(header, prg, chr) {
    Ok(cart) => cart,
    Err(e) => panic!("test cartridge for mapper {mapper} failed to load: {e}"),
  }
}

/// Index of the 8kb PRG bank currently visible at `addr`.
pub fn prg_bank_at(cart: &mut Cart, addr: u16) -> u8 {
  cart.cpu_read(addr)
}

/// Index of the 1kb CHR bank currently visible at `addr`.
pub fn chr_bank_at(cart: &mut Cart, addr: u16) -> u8 {
  cart.ppu_read(addr)
}

pub fn prg_layout(cart: &mut Cart) -> [u8; 4] {
  [0x8000, 0xA000, 0xC000, 0xE000].map(|addr| prg_bank_at(cart, addr))
}

pub fn chr_layout(cart: &mut Cart) -> [u8; 8] {
  let mut pages = [0; 8];
  for (i, page) in pages.iter_mut().enumerate() {
    *page = chr_bank_at(cart, (i * CHR_BANK) as u16);
  }
  pages
}
