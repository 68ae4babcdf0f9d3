use log::{debug, info};

use crate::{
  audio::{AudioSink, ExpansionAudio},
  banks::MemConfig,
  error::{alloc_zeroed, CartError},
  mapper::{self, Mapper, MapperCtor, PrgTarget},
  sram::OPEN_BUS,
};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CartHeader {
  pub format: HeaderFormat,
  pub timing: ConsoleTiming,

  pub has_trainer: bool,
  pub mirroring: Mirroring,

  pub mapper: u16,
  pub submapper: u8,
  pub mapper_name: String,

  pub prg_size: usize,
  pub chr_size: usize,
  pub uses_chr_ram: bool,
  pub chr_ram_size: usize,
  pub has_battery: bool,
  pub prg_ram_size: usize,
  pub eeprom_size: usize,
}

impl CartHeader {
  /// Header for a cartridge whose arrays come from somewhere else than an iNES file.
  pub fn new_raw(mapper: u16, prg_size: usize, chr_size: usize, mirroring: Mirroring) -> Self {
    Self {
      mapper,
      mapper_name: mapper::mapper_name(mapper).to_string(),
      prg_size,
      chr_size,
      uses_chr_ram: chr_size == 0,
      chr_ram_size: if chr_size == 0 { CHR_ROM_PAGE_SIZE } else { 0 },
      mirroring,
      ..Default::default()
    }
  }

  pub fn chr_real_size(&self) -> usize {
    if !self.uses_chr_ram {
      self.chr_size
    } else if self.chr_ram_size > 0 {
      self.chr_ram_size
    } else { CHR_ROM_PAGE_SIZE }
  }

  pub fn sram_real_size(&self) -> usize {
    if self.has_battery && self.eeprom_size > 0 {
      self.eeprom_size
    } else if self.prg_ram_size > 0 {
      self.prg_ram_size
    } else { 8 * 1024 }
  }

  pub fn ciram_size(&self) -> usize {
    if self.mirroring == Mirroring::FourScreen { 4 * 1024 } else { 2 * 1024 }
  }
}

const NES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const PRG_ROM_PAGE_SIZE: usize = 1024 * 16;
const CHR_ROM_PAGE_SIZE: usize = 1024 * 8;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum HeaderFormat { #[default] INes, Nes2_0 }

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
  #[default] Horizontal,
  Vertical,
  OneScreenLow,
  OneScreenHigh,
  FourScreen,
}

impl Mirroring {
  /// The two bit layout most mappers share:
  /// 0 vertical, 1 horizontal, 2 one screen low, 3 one screen high.
  pub fn from_bits(bits: u8) -> Self {
    match bits & 0b11 {
      0 => Mirroring::Vertical,
      1 => Mirroring::Horizontal,
      2 => Mirroring::OneScreenLow,
      _ => Mirroring::OneScreenHigh,
    }
  }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum ConsoleTiming { NTSC, PAL, World, Dendy, #[default] Unknown }

pub fn is_nes_rom(rom: &[u8]) -> bool {
  rom.len() >= 4 && rom[0..4] == NES_MAGIC
}

impl CartHeader {
  pub fn new(rom: &[u8]) -> Result<Self, CartError> {
    if rom.len() < HEADER_SIZE {
      return Err(CartError::Truncated { expected: HEADER_SIZE, found: rom.len() });
    }

    if !is_nes_rom(rom) {
      return Err(CartError::InvalidHeader("Nintendo header magic values not found"));
    }

    let mut header = CartHeader::default();

    header.uses_chr_ram = rom[5] == 0;
    header.prg_size = rom[4] as usize * PRG_ROM_PAGE_SIZE;
    header.chr_size = rom[5] as usize * CHR_ROM_PAGE_SIZE;
    // iNes header doesn't hold information about chr ram size, so it defaults to 8kb if no chr rom is present
    header.chr_ram_size = if header.uses_chr_ram { CHR_ROM_PAGE_SIZE } else { 0 };

    let four_screen = rom[6] & 0b0000_1000 != 0;
    header.mirroring = match (rom[6] & 1, four_screen) {
      (_, true)  => Mirroring::FourScreen,
      (0, false) => Mirroring::Horizontal,
      _          => Mirroring::Vertical,
    };

    header.has_battery = rom[6] & 0b0000_0010 != 0;
    header.has_trainer = rom[6] & 0b0000_0100 != 0;

    let mapper_low = rom[6] >> 4;
    let mapper_high = rom[7] & 0b1111_0000;
    header.mapper = (mapper_high | mapper_low) as u16;

    header.format = if rom[7] & 0b0000_1100 == 0x8 { HeaderFormat::Nes2_0 } else { HeaderFormat::INes };
    // This field was a later addition to iNes, so most games do not use it, even if they contain prg_ram.
    // If it is 0, prg ram is inferred as 8kb.
    header.prg_ram_size = rom[8] as usize * 8 * 1024;

    if header.format == HeaderFormat::Nes2_0 {
      if rom[9] & 0b1111 == 0xF || rom[9] >> 4 == 0xF {
        return Err(CartError::InvalidHeader("NES 2.0 'exponent-multiplier' notation for ROM sizes not implemented"));
      }

      header.mapper |= (rom[8] as u16 & 0b1111) << 8;
      header.submapper = rom[8] >> 4;

      let prg_16kb_banks = ((rom[9] as usize & 0b1111) << 8) + rom[4] as usize;
      let chr_8kb_banks  = ((rom[9] as usize >> 4) << 8)     + rom[5] as usize;
      header.prg_size = prg_16kb_banks * PRG_ROM_PAGE_SIZE;
      header.chr_size = chr_8kb_banks * CHR_ROM_PAGE_SIZE;
      header.uses_chr_ram = chr_8kb_banks == 0;

      header.prg_ram_size = if rom[10] & 0b0000_1111 == 0 { 0 } else { 64 << (rom[10] & 0b0000_1111) };
      header.eeprom_size  = if rom[10] & 0b1111_0000 == 0 { 0 } else { 64 << (rom[10] >> 4) };
      header.chr_ram_size = if rom[11] & 0b0000_1111 == 0 { 0 } else { 64 << (rom[11] & 0b0000_1111) };

      header.timing = match rom[12] & 0b11 {
        0 => ConsoleTiming::NTSC,
        1 => ConsoleTiming::PAL,
        2 => ConsoleTiming::World,
        _ => ConsoleTiming::Dendy,
      };
    }

    header.mapper_name = mapper::mapper_name(header.mapper).to_string();
    if header.mapper == 4 && header.submapper == 1 {
      header.mapper_name = String::from("MMC6");
    }

    Ok(header)
  }
}

/// A loaded cartridge: the backing arrays, the bank tables and the mapper driving them.
pub struct Cart {
  pub header: CartHeader,
  prg: Box<[u8]>,
  chr: Box<[u8]>,
  sram: Box<[u8]>,
  ciram: Box<[u8]>,
  cfg: MemConfig,
  mapper: Box<dyn Mapper>,
  ctor: MapperCtor,
  sram_dirty: bool,
}

impl Cart {
  pub fn new(rom: &[u8]) -> Result<Self, CartError> {
    let header = CartHeader::new(rom)?;

    let prg_start = HEADER_SIZE + if header.has_trainer { TRAINER_SIZE } else { 0 };
    let chr_start = prg_start + header.prg_size;
    let chr_end = chr_start + if header.uses_chr_ram { 0 } else { header.chr_size };

    if rom.len() < chr_end {
      return Err(CartError::Truncated { expected: chr_end, found: rom.len() });
    }

    let prg = rom[prg_start..chr_start].to_vec();
    let chr = rom[chr_start..chr_end].to_vec();
    Self::from_parts(header, prg, chr)
  }

  /// Builds a cartridge from already split PRG and CHR arrays.
  /// `chr` is ignored when the header declares CHR-RAM.
  pub fn from_parts(mut header: CartHeader, prg: Vec<u8>, chr: Vec<u8>) -> Result<Self, CartError> {
    if prg.is_empty() {
      return Err(CartError::ZeroSize("PRG-ROM"));
    }
    if chr.is_empty() && !header.uses_chr_ram {
      return Err(CartError::ZeroSize("CHR-ROM"));
    }

    let ctor = mapper::mapper_ctor(header.mapper)?;

    header.prg_size = prg.len();
    let chr = if header.uses_chr_ram {
      header.chr_size = 0;
      alloc_zeroed("CHR-RAM", header.chr_real_size())?
    } else {
      header.chr_size = chr.len();
      chr.into_boxed_slice()
    };

    let sram = alloc_zeroed("PRG-RAM", header.sram_real_size())?;
    let ciram = alloc_zeroed("CIRAM", header.ciram_size())?;

    let mut cfg = MemConfig::new(&header);
    let mapper = ctor(&header, &mut cfg);
    cfg.check_sizes();

    info!(
      "Loaded cartridge: mapper {} ({}), PRG {}KB, {} {}KB, battery: {}, mirroring: {:?}",
      header.mapper, header.mapper_name,
      header.prg_size / 1024,
      if header.uses_chr_ram { "CHR-RAM" } else { "CHR-ROM" },
      header.chr_real_size() / 1024,
      header.has_battery, header.mirroring,
    );

    Ok(Self {
      header,
      prg: prg.into_boxed_slice(),
      chr, sram, ciram, cfg, mapper, ctor,
      sram_dirty: false,
    })
  }

  /// Restores the mapper power on state. RAM contents survive.
  pub fn reset(&mut self) {
    let sink = self.mapper.audio_mut().and_then(|audio| audio.take_sink());

    self.cfg = MemConfig::new(&self.header);
    self.mapper = (self.ctor)(&self.header, &mut self.cfg);

    if let (Some(sink), Some(audio)) = (sink, self.mapper.audio_mut()) {
      audio.set_sink(sink);
    }
  }

  pub fn cpu_read(&mut self, addr: u16) -> u8 {
    let addr = addr as usize;
    if addr < 0x4020 {
      debug!("cpu read outside of cartridge space at {addr:#06x}");
      return OPEN_BUS;
    }

    match self.mapper.map_prg_addr(&mut self.cfg, addr) {
      PrgTarget::Prg(offset) => self.prg.get(offset).copied().unwrap_or(OPEN_BUS),
      PrgTarget::SRam(offset) => self.cfg.sram_guard.read(&self.sram, offset),
      PrgTarget::Cart => self.mapper.cart_read(addr),
      PrgTarget::OpenBus => OPEN_BUS,
    }
  }

  pub fn cpu_write(&mut self, addr: u16, val: u8) {
    let addr = addr as usize;
    if addr < 0x4020 {
      debug!("cpu write outside of cartridge space at {addr:#06x}");
      return;
    }

    let target = self.mapper.map_prg_addr(&mut self.cfg, addr);
    if addr >= 0x8000 {
      self.mapper.prg_write(&mut self.cfg, addr, val);
    }

    match target {
      PrgTarget::SRam(offset) => {
        let stored = self.cfg.sram_guard.write(&mut self.sram, offset, val);
        if stored && self.header.has_battery {
          self.sram_dirty = true;
        }
      }
      PrgTarget::Cart => self.mapper.cart_write(&mut self.cfg, addr, val),
      PrgTarget::Prg(_) | PrgTarget::OpenBus => {}
    }
  }

  pub fn ppu_read(&mut self, addr: u16) -> u8 {
    let addr = addr as usize;
    if addr >= 0x2000 {
      debug!("ppu read outside of pattern tables at {addr:#06x}");
      return OPEN_BUS;
    }

    let offset = self.mapper.map_chr_addr(&mut self.cfg, addr);
    let val = self.chr.get(offset).copied().unwrap_or(OPEN_BUS);
    self.mapper.notify_ppu_access(&mut self.cfg, addr);
    val
  }

  pub fn ppu_write(&mut self, addr: u16, val: u8) {
    let addr = addr as usize;
    if addr >= 0x2000 {
      debug!("ppu write outside of pattern tables at {addr:#06x}");
      return;
    }

    if self.header.uses_chr_ram {
      let offset = self.mapper.map_chr_addr(&mut self.cfg, addr);
      if let Some(byte) = self.chr.get_mut(offset) {
        *byte = val;
      }
    }
    self.mapper.notify_ppu_access(&mut self.cfg, addr);
  }

  /// Offset into CIRAM of a nametable address, after mirroring.
  pub fn nametable_addr(&self, addr: u16) -> usize {
    let addr = 0x2000 + (addr as usize & 0x0FFF);
    self.cfg.ciram.translate(addr)
  }

  pub fn ciram_read(&self, addr: u16) -> u8 {
    if !(0x2000..=0x3EFF).contains(&addr) {
      debug!("nametable read outside of nametable space at {addr:#06x}");
      return OPEN_BUS;
    }
    self.ciram.get(self.nametable_addr(addr)).copied().unwrap_or(OPEN_BUS)
  }

  pub fn ciram_write(&mut self, addr: u16, val: u8) {
    if !(0x2000..=0x3EFF).contains(&addr) {
      debug!("nametable write outside of nametable space at {addr:#06x}");
      return;
    }
    let offset = self.nametable_addr(addr);
    if let Some(byte) = self.ciram.get_mut(offset) {
      *byte = val;
    }
  }

  pub fn scanline(&mut self) {
    self.mapper.notify_scanline();
  }

  pub fn clock(&mut self, cycles: u32) {
    for _ in 0..cycles {
      self.mapper.notify_cpu_cycle();
    }
  }

  pub fn irq_state(&self) -> bool {
    self.mapper.poll_irq()
  }

  pub fn irq_clear(&mut self) {
    self.mapper.ack_irq();
  }

  pub fn get_mirror_mode(&self) -> Mirroring {
    self.cfg.mirroring()
  }

  pub fn prg_ram(&self) -> &[u8] {
    &self.sram
  }

  /// Battery backed RAM, if the cartridge has any worth saving.
  pub fn battery_ram(&self) -> Option<&[u8]> {
    if self.header.has_battery { Some(&self.sram) } else { None }
  }

  pub fn load_prg_ram(&mut self, data: &[u8]) {
    let len = data.len().min(self.sram.len());
    self.sram[..len].copy_from_slice(&data[..len]);
  }

  pub fn is_dirty(&self) -> bool {
    self.sram_dirty
  }

  pub fn take_dirty(&mut self) -> bool {
    std::mem::take(&mut self.sram_dirty)
  }

  pub fn chr(&self) -> &[u8] {
    &self.chr
  }

  pub fn expansion_audio(&self) -> Option<&ExpansionAudio> {
    self.mapper.audio()
  }

  /// Forwards expansion sound register writes to `sink`.
  /// Returns false if the board has no sound chip.
  pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink>) -> bool {
    match self.mapper.audio_mut() {
      Some(audio) => {
        audio.set_sink(sink);
        true
      }
      None => false,
    }
  }
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize)]
struct CartStateRef<'a> {
  mapper_id: u16,
  chr_ram: &'a [u8],
  sram: &'a [u8],
  ciram: &'a [u8],
  cfg: &'a MemConfig,
  mapper: &'a dyn Mapper,
  sram_dirty: bool,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct CartState {
  mapper_id: u16,
  chr_ram: Box<[u8]>,
  sram: Box<[u8]>,
  ciram: Box<[u8]>,
  cfg: MemConfig,
  mapper: Box<dyn Mapper>,
  sram_dirty: bool,
}

#[cfg(feature = "serde")]
impl serde::Serialize for Cart {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer {
    // rom contents are never part of the state, chr only when it is ram
    let chr_ram: &[u8] = if self.header.uses_chr_ram { &self.chr } else { &[] };

    let state = CartStateRef {
      mapper_id: self.header.mapper,
      chr_ram,
      sram: &self.sram,
      ciram: &self.ciram,
      cfg: &self.cfg,
      mapper: self.mapper.as_ref(),
      sram_dirty: self.sram_dirty,
    };
    state.serialize(serializer)
  }
}

#[cfg(feature = "serde")]
impl Cart {
  /// Same as serializing the cartridge directly.
  pub fn save_state<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serde::Serialize::serialize(self, serializer)
  }

  /// Restores a state produced by serializing a cartridge of the same game.
  pub fn load_state<'de, D>(&mut self, deserializer: D) -> Result<(), D::Error>
  where
    D: serde::Deserializer<'de> {
    use serde::{de::Error, Deserialize};

    let state = CartState::deserialize(deserializer)?;
    if state.mapper_id != self.header.mapper {
      return Err(D::Error::custom(format!(
        "state belongs to mapper {}, cartridge uses mapper {}", state.mapper_id, self.header.mapper
      )));
    }

    let sink = self.mapper.audio_mut().and_then(|audio| audio.take_sink());

    if self.header.uses_chr_ram {
      self.chr = state.chr_ram;
    }
    self.sram = state.sram;
    self.ciram = state.ciram;
    self.cfg = state.cfg;
    self.mapper = state.mapper;
    self.sram_dirty = state.sram_dirty;

    if let (Some(sink), Some(audio)) = (sink, self.mapper.audio_mut()) {
      audio.set_sink(sink);
    }
    Ok(())
  }
}

#[cfg(test)]
mod cart_tests {
  use super::*;

  fn ines(prg_banks: u8, chr_banks: u8, flags6: u8, flags7: u8) -> Vec<u8> {
    let mut rom = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, flags6, flags7];
    rom.resize(HEADER_SIZE, 0);
    rom
  }

  #[test]
  fn parse_ines_header() {
    let rom = ines(2, 1, 0b0100_0011, 0b0000_0000);
    let header = CartHeader::new(&rom).unwrap();
    assert_eq!(header.format, HeaderFormat::INes);
    assert_eq!(header.mapper, 4);
    assert_eq!(header.prg_size, 32 * 1024);
    assert_eq!(header.chr_size, 8 * 1024);
    assert!(!header.uses_chr_ram);
    assert!(header.has_battery);
    assert_eq!(header.mirroring, Mirroring::Vertical);
    assert_eq!(header.mapper_name, "MMC3");
  }

  #[test]
  fn parse_four_screen_and_chr_ram() {
    let rom = ines(1, 0, 0b0000_1000, 0);
    let header = CartHeader::new(&rom).unwrap();
    assert_eq!(header.mirroring, Mirroring::FourScreen);
    assert!(header.uses_chr_ram);
    assert_eq!(header.chr_real_size(), 8 * 1024);
    assert_eq!(header.ciram_size(), 4 * 1024);
  }

  #[test]
  fn parse_nes2_header() {
    let mut rom = ines(2, 0, 0b0101_0000, 0b0100_1000);
    rom[8] = 0x21;
    rom[10] = 0x07;
    rom[11] = 0x07;
    rom[12] = 1;
    let header = CartHeader::new(&rom).unwrap();
    assert_eq!(header.format, HeaderFormat::Nes2_0);
    assert_eq!(header.mapper, 0x145);
    assert_eq!(header.submapper, 2);
    assert_eq!(header.prg_ram_size, 8 * 1024);
    assert_eq!(header.chr_ram_size, 8 * 1024);
    assert_eq!(header.timing, ConsoleTiming::PAL);
  }

  #[test]
  fn reject_bad_magic_and_short_images() {
    let mut rom = ines(1, 1, 0, 0);
    rom[0] = b'X';
    assert!(matches!(CartHeader::new(&rom), Err(CartError::InvalidHeader(_))));
    assert!(matches!(CartHeader::new(&rom[..8]), Err(CartError::Truncated { .. })));
  }

  #[test]
  fn mirroring_register_layout() {
    assert_eq!(Mirroring::from_bits(0), Mirroring::Vertical);
    assert_eq!(Mirroring::from_bits(1), Mirroring::Horizontal);
    assert_eq!(Mirroring::from_bits(2), Mirroring::OneScreenLow);
    assert_eq!(Mirroring::from_bits(0xFF), Mirroring::OneScreenHigh);
  }
}
