/// Largest arena, and largest single request, accepted by default.
pub const MAX_ARENA_SIZE: usize = 0x7FFF_FFFF;

/// Limits applied by an [`Allocator`](crate::Allocator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
  /// Upper bound for both `init` and `allocate` sizes, in bytes.
  pub max_size: usize,
}

impl ArenaConfig {
  pub const fn new(max_size: usize) -> Self {
    Self { max_size }
  }

  /// `true` when `size` is within the configured limit.
  pub const fn permits(
    &self,
    size: usize,
  ) -> bool {
    size <= self.max_size
  }
}

impl Default for ArenaConfig {
  fn default() -> Self {
    Self::new(MAX_ARENA_SIZE)
  }
}
