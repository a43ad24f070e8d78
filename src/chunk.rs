use std::{mem, ptr};

use crate::region::Region;

/// Link value meaning "no neighbour".
pub const NIL: usize = usize::MAX;

/// Bytes taken by every chunk header in front of its payload.
pub const HEADER_SIZE: usize = mem::size_of::<ChunkHeader>();

/// Metadata written into the arena directly in front of each payload.
///
/// `forward` and `backward` are arena-relative offsets of the neighbouring
/// headers in address order, or [`NIL`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
  pub size: usize,
  pub is_free: bool,
  pub forward: usize,
  pub backward: usize,
}

impl ChunkHeader {
  pub fn new(
    size: usize,
    is_free: bool,
    forward: usize,
    backward: usize,
  ) -> Self {
    Self {
      size,
      is_free,
      forward,
      backward,
    }
  }
}

/// Reads the header stored at `offset`.
///
/// # Safety
///
/// `offset + HEADER_SIZE` must not exceed the region and a header must have
/// been written at `offset`.
#[inline]
pub unsafe fn read(
  region: &Region,
  offset: usize,
) -> ChunkHeader {
  debug_assert!(offset + HEADER_SIZE <= region.len());
  // Payload sizes are exact, so headers are not necessarily aligned.
  unsafe { ptr::read_unaligned(region.as_ptr().add(offset) as *const ChunkHeader) }
}

/// Writes `header` at `offset`.
///
/// # Safety
///
/// `offset + HEADER_SIZE` must not exceed the region.
#[inline]
pub unsafe fn write(
  region: &Region,
  offset: usize,
  header: ChunkHeader,
) {
  debug_assert!(offset + HEADER_SIZE <= region.len());
  unsafe { ptr::write_unaligned(region.as_ptr().add(offset) as *mut ChunkHeader, header) }
}

/// Read-only view of one chunk, as reported by [`Allocator::chunks`](crate::Allocator::chunks).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
  /// Offset of the header from the start of the arena.
  pub offset: usize,
  /// Payload bytes, header excluded.
  pub size: usize,
  /// `false` while the chunk is handed out to a caller.
  pub is_free: bool,
}

impl ChunkInfo {
  /// Offset of the payload from the start of the arena.
  #[inline]
  pub fn payload_offset(&self) -> usize {
    self.offset + HEADER_SIZE
  }

  /// Offset one past the end of the payload.
  #[inline]
  pub fn end(&self) -> usize {
    self.payload_offset() + self.size
  }
}
