//! Cartridge side of a NES: bank switching, nametable mirroring,
//! PRG-RAM gating and the IRQ sources found on mapper boards.
//!
//! The cpu and ppu cores drive a [`Cart`] through its bus methods;
//! everything behind them is owned by the cartridge instance.

pub mod error;
pub mod banks;
pub mod sram;
pub mod serial;
pub mod irq;
pub mod audio;
pub mod cart;
pub mod mapper;

pub use audio::{AudioChip, AudioSink, ExpansionAudio};
pub use cart::{Cart, CartHeader, Mirroring};
pub use error::CartError;
pub use irq::IrqState;
pub use mapper::Mapper;
