use serde::{ Serialize, Deserialize };

use crate::error::{ Result, TapeError };


/// Default size of the first arena segment.

pub const DEFAULT_INITIAL_CAPACITY: usize = 1 << 16;

pub const INITIAL_CAPACITY_VAR: &str = "CHAINTAPE_INITIAL_CAPACITY";
pub const MAX_CAPACITY_VAR: &str = "CHAINTAPE_MAX_CAPACITY";


/// Sizing of the arena that backs a [Tape](crate::Tape).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeConfig {
  /// Bytes reserved on first allocation. Later segments double in size.
  pub initial_capacity: usize,

  /// Upper bound on the bytes the arena may reserve in total.
  /// Allocations beyond it fail with [TapeError::OutOfMemory].
  pub max_capacity: Option<usize>,
}

impl Default for TapeConfig {
  fn default() -> Self {
    Self {
      initial_capacity: DEFAULT_INITIAL_CAPACITY,
      max_capacity: None,
    }
  }
}

impl TapeConfig {
  pub fn with_initial_capacity(mut self, bytes: usize) -> Self {
    self.initial_capacity = bytes;
    self
  }

  pub fn with_max_capacity(mut self, bytes: usize) -> Self {
    self.max_capacity = Some(bytes);
    self
  }

  /// Read `CHAINTAPE_INITIAL_CAPACITY` and `CHAINTAPE_MAX_CAPACITY`,
  /// falling back to defaults for unset variables.

  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self> {
    let parse = |key: &'static str| -> Result<Option<usize>> {
      match lookup(key) {
        None => Ok(None),
        Some(value) => value.trim().parse()
          .map(Some)
          .map_err(|_| TapeError::Config { key, value }),
      }
    };
    let mut config = Self::default();
    if let Some(bytes) = parse(INITIAL_CAPACITY_VAR)? {
      config.initial_capacity = bytes;
    }
    config.max_capacity = parse(MAX_CAPACITY_VAR)?;
    Ok(config)
  }
}
