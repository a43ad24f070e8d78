use std::ptr::NonNull;

use crate::{
  align_to,
  arena::Arena,
  chunk::ChunkInfo,
  config::{ArenaConfig, MAX_ARENA_SIZE},
  error::ArenaError,
  region::{Region, page_size},
};

/// First-fit allocator over a single OS-backed arena.
///
/// The arena only exists between [`Allocator::init`] and [`Allocator::destroy`];
/// dropping the allocator also unmaps it. The most recent failure is kept in
/// [`Allocator::status`].
pub struct Allocator {
  config: ArenaConfig,
  arena: Option<Arena>,
  status: Option<ArenaError>,
}

impl Allocator {
  pub const fn new() -> Self {
    Self::with_config(ArenaConfig::new(MAX_ARENA_SIZE))
  }

  pub const fn with_config(config: ArenaConfig) -> Self {
    Self {
      config,
      arena: None,
      status: None,
    }
  }

  /// Maps an arena of `size` bytes rounded up to the page size and returns
  /// the rounded size.
  ///
  /// Fails with [`ArenaError::AlreadyInitialized`] if an arena is active;
  /// call [`Allocator::destroy`] first.
  pub fn init(
    &mut self,
    size: usize,
  ) -> Result<usize, ArenaError> {
    let result = self.try_init(size);
    self.record(result)
  }

  fn try_init(
    &mut self,
    size: usize,
  ) -> Result<usize, ArenaError> {
    if self.arena.is_some() {
      return Err(ArenaError::AlreadyInitialized);
    }

    if size == 0 || !self.config.permits(size) {
      return Err(ArenaError::BadArguments { requested: size });
    }

    let page = page_size();

    // Rounding up must not wrap past usize::MAX.
    if size > usize::MAX - (page - 1) {
      return Err(ArenaError::BadArguments { requested: size });
    }

    let adjusted = align_to!(size, page);

    tracing::debug!(requested = size, page_size = page, adjusted, "initializing arena");

    let arena = Arena::new(Region::map(adjusted)?);

    tracing::debug!(
      start = ?arena.base(),
      end = ?arena.base().wrapping_add(adjusted),
      "arena mapped"
    );

    self.arena = Some(arena);

    Ok(adjusted)
  }

  /// Unmaps the arena. Every pointer handed out so far dangles afterwards.
  pub fn destroy(&mut self) -> Result<(), ArenaError> {
    match self.arena.take() {
      Some(arena) => {
        tracing::debug!(start = ?arena.base(), size = arena.size(), "destroying arena");
        drop(arena);
        Ok(())
      }
      None => {
        tracing::debug!("destroy called without an arena");
        self.record(Err(ArenaError::Uninitialized))
      }
    }
  }

  /// Hands out `size` payload bytes from the first free chunk large enough.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, ArenaError> {
    let result = match self.arena.as_mut() {
      None => Err(ArenaError::Uninitialized),
      Some(_) if size == 0 || !self.config.permits(size) => {
        Err(ArenaError::BadArguments { requested: size })
      }
      Some(arena) => arena.allocate(size),
    };

    self.record(result)
  }

  /// Returns the chunk behind `address` to the arena, merging it with free
  /// neighbours.
  ///
  /// Null addresses, and any call without an active arena, are no-ops.
  ///
  /// # Safety
  ///
  /// A non-null `address` must come from [`Allocator::allocate`] on the
  /// current arena and must not have been released already.
  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    if let Some(arena) = self.arena.as_mut() {
      unsafe { arena.release(address) };
    }
  }

  /// The error left by the most recent failing call, if any.
  pub fn status(&self) -> Option<ArenaError> {
    self.status
  }

  pub fn config(&self) -> ArenaConfig {
    self.config
  }

  pub fn is_initialized(&self) -> bool {
    self.arena.is_some()
  }

  /// Size of the active arena in bytes, or zero.
  pub fn size(&self) -> usize {
    self.arena.as_ref().map_or(0, Arena::size)
  }

  /// Start address of the active arena.
  pub fn base(&self) -> Option<NonNull<u8>> {
    self.arena.as_ref().and_then(|arena| NonNull::new(arena.base()))
  }

  /// Chunks of the active arena in address order; empty without an arena.
  pub fn chunks(&self) -> impl Iterator<Item = ChunkInfo> + '_ {
    self.arena.iter().flat_map(Arena::chunks)
  }

  fn record<T>(
    &mut self,
    result: Result<T, ArenaError>,
  ) -> Result<T, ArenaError> {
    if let Err(error) = &result {
      self.status = Some(*error);
    }

    result
  }
}

impl Default for Allocator {
  fn default() -> Self {
    Self::new()
  }
}
