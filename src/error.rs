use thiserror::Error;

/// Failures reported by the allocator.
///
/// Every variant leaves the arena exactly as it was before the failing call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ArenaError {
  /// Requested size was zero or above the configured maximum.
  #[error("bad arguments: {requested} bytes requested")]
  BadArguments { requested: usize },

  /// The OS refused to map the arena.
  #[error("system call failed (errno {errno})")]
  SystemCallFailed { errno: i32 },

  /// No arena is active.
  #[error("arena is not initialized")]
  Uninitialized,

  /// No free chunk can hold the request.
  #[error("out of memory: no free chunk holds {requested} bytes")]
  OutOfMemory { requested: usize },

  /// `init` was called while an arena is still active.
  #[error("arena is already initialized")]
  AlreadyInitialized,
}

impl ArenaError {
  /// Legacy negative result code for this error.
  pub const fn code(&self) -> i32 {
    match self {
      Self::OutOfMemory { .. } => -1,
      Self::BadArguments { .. } => -2,
      Self::SystemCallFailed { .. } => -3,
      Self::AlreadyInitialized => -4,
      Self::Uninitialized => -5,
    }
  }
}
