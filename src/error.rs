#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
  #[error("not a valid iNES/NES 2.0 rom: {0}")]
  InvalidHeader(&'static str),

  #[error("rom image is truncated: expected {expected} bytes, found {found}")]
  Truncated { expected: usize, found: usize },

  #[error("mapper {0} not implemented, game can't be loaded")]
  UnsupportedMapper(u16),

  #[error("cartridge has no {0} data")]
  ZeroSize(&'static str),

  #[error("couldn't allocate {size} bytes of {what}")]
  AllocationFailure { what: &'static str, size: usize },
}

/// Allocates a zeroed buffer, reporting failure instead of aborting.
pub(crate) fn alloc_zeroed(what: &'static str, size: usize) -> Result<Box<[u8]>, CartError> {
  let mut buf = Vec::new();
  buf
    .try_reserve_exact(size)
    .map_err(|_| CartError::AllocationFailure { what, size })?;
  buf.resize(size, 0);
  Ok(buf.into_boxed_slice())
}
