mod nrom;
mod mmc1;
mod uxrom;
mod inesmapper3;
mod mmc3;
mod mmc5;
mod axrom;
mod mmc2;
mod colordreams;
mod gxrom;
mod inesmapper71;
mod vrc1;
mod vrc2_4;
mod vrc6;
mod vrc7;
mod sunsoft_fme_7;
mod jy_company;
mod ffe_f4xxx;
mod ffe_f3xxx;
mod inesmapper255;

use log::debug;

use crate::{
  audio::ExpansionAudio,
  banks::MemConfig,
  cart::CartHeader,
  error::CartError,
  sram::OPEN_BUS,
};

pub use axrom::AxRom;
pub use colordreams::ColorDreams;
pub use ffe_f3xxx::FfeF3xxx;
pub use ffe_f4xxx::FfeF4xxx;
pub use gxrom::GxRom;
pub use inesmapper3::INesMapper003;
pub use inesmapper71::INesMapper071;
pub use inesmapper255::INesMapper255;
pub use jy_company::JyCompany;
pub use mmc1::MMC1;
pub use mmc2::MMC2;
pub use mmc3::MMC3;
pub use mmc5::MMC5;
pub use nrom::NRom;
pub use sunsoft_fme_7::SunsoftFME7;
pub use uxrom::UxRom;
pub use vrc1::VRC1;
pub use vrc2_4::VRC2_4;
pub use vrc6::VRC6;
pub use vrc7::VRC7;

/// Where a cpu access in cartridge space ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrgTarget {
  /// Offset into PRG-ROM.
  Prg(usize),
  /// Offset into PRG-RAM, gated by the RAM guard.
  SRam(usize),
  /// A register owned by the mapper itself.
  Cart,
  OpenBus,
}

#[cfg_attr(feature = "serde", typetag::serde)]
pub trait Mapper {
  fn new(header: &CartHeader, banks: &mut MemConfig) -> Box<Self> where Self: Sized;

  /// Cpu writes to 0x8000..=0xFFFF.
  fn prg_write(&mut self, banks: &mut MemConfig, addr: usize, val: u8);

  /// Cpu accesses resolved to `PrgTarget::Cart`.
  fn cart_read(&mut self, addr: usize) -> u8 {
    debug!("unmapped cartridge read at {addr:#06x}");
    OPEN_BUS
  }
  fn cart_write(&mut self, _banks: &mut MemConfig, addr: usize, val: u8) {
    debug!("unmapped cartridge write {val:#04x} at {addr:#06x}");
  }

  fn map_prg_addr(&mut self, banks: &mut MemConfig, addr: usize) -> PrgTarget {
    match addr {
      0x4020..=0x5FFF => PrgTarget::Cart,
      0x6000..=0x7FFF => PrgTarget::SRam(banks.sram.translate(addr)),
      _ => PrgTarget::Prg(banks.prg.translate(addr)),
    }
  }

  fn map_chr_addr(&mut self, banks: &mut MemConfig, addr: usize) -> usize {
    banks.chr.translate(addr)
  }

  /// Called after every pattern table access, read or write.
  fn notify_ppu_access(&mut self, _banks: &mut MemConfig, _addr: usize) {}
  fn notify_scanline(&mut self) {}
  fn notify_cpu_cycle(&mut self) {}

  fn poll_irq(&self) -> bool { false }
  fn ack_irq(&mut self) {}

  fn audio(&self) -> Option<&ExpansionAudio> { None }
  fn audio_mut(&mut self) -> Option<&mut ExpansionAudio> { None }
}

pub type MapperCtor = fn(&CartHeader, &mut MemConfig) -> Box<dyn Mapper>;

fn boxed<M: Mapper + 'static>(header: &CartHeader, banks: &mut MemConfig) -> Box<dyn Mapper> {
  M::new(header, banks)
}

pub fn mapper_ctor(id: u16) -> Result<MapperCtor, CartError> {
  let ctor: MapperCtor = match id {
    0  => boxed::<NRom>,
    1  => boxed::<MMC1>,
    2  => boxed::<UxRom>,
    3  => boxed::<INesMapper003>,
    4  => boxed::<MMC3>,
    5  => boxed::<MMC5>,
    6  => boxed::<FfeF4xxx>,
    7  => boxed::<AxRom>,
    8  => boxed::<FfeF3xxx>,
    9 | 10 => boxed::<MMC2>,
    11 => boxed::<ColorDreams>,
    21 | 22 | 23 | 25 => boxed::<VRC2_4>,
    24 | 26 => boxed::<VRC6>,
    66 => boxed::<GxRom>,
    69 => boxed::<SunsoftFME7>,
    71 => boxed::<INesMapper071>,
    75 => boxed::<VRC1>,
    85 => boxed::<VRC7>,
    90 => boxed::<JyCompany>,
    255 => boxed::<INesMapper255>,
    _ => return Err(CartError::UnsupportedMapper(id)),
  };

  Ok(ctor)
}

pub fn mapper_name(id: u16) -> &'static str {
  MAPPERS_TABLE.iter()
    .find(|m| m.0 == id)
    .map(|m| m.1)
    .unwrap_or("Not implemented")
}

const MAPPERS_TABLE: [(u16, &str); 25] = [
  (0, "NRom"),
  (1, "MMC1"),
  (2, "UxRom"),
  (3, "CNRom (INesMapper003)"),
  (4, "MMC3"),
  (5, "MMC5"),
  (6, "FFE F4xxx"),
  (7, "AxRom"),
  (8, "FFE F3xxx"),
  (9, "MMC2"),
  (10, "MMC4"),
  (11, "ColorDreams"),
  (21, "VRC4a/VRC4c"),
  (22, "VRC2a"),
  (23, "VRC2b/VRC4e"),
  (24, "VRC6a"),
  (25, "VRC2c/VRC4b/VRC4d"),
  (26, "VRC6b"),
  (66, "GxRom"),
  (69, "Sunsoft FME-7"),
  (71, "Codemasters (INesMapper071)"),
  (75, "VRC1"),
  (85, "VRC7"),
  (90, "JY Company"),
  (255, "Multicart (INesMapper255)"),
];
