use std::ptr::NonNull;

use crate::{
  chunk::{self, ChunkHeader, ChunkInfo, HEADER_SIZE, NIL},
  error::ArenaError,
  region::Region,
};

/// Offset of the first chunk. It is never merged away, since coalescing
/// always folds a chunk into its lower neighbour.
const HEAD: usize = 0;

/// An active arena: one mapped region partitioned into address-ordered chunks.
pub struct Arena {
  region: Region,
}

impl Arena {
  /// Takes ownership of `region` and lays a single free chunk over all of it.
  pub fn new(region: Region) -> Self {
    let initial = ChunkHeader::new(region.len() - HEADER_SIZE, true, NIL, NIL);

    // SAFETY: a mapped region is at least one page, which always holds a header.
    unsafe { chunk::write(&region, HEAD, initial) };

    Self { region }
  }

  #[inline]
  pub fn size(&self) -> usize {
    self.region.len()
  }

  #[inline]
  pub fn base(&self) -> *mut u8 {
    self.region.as_ptr()
  }

  /// Walks the chunk list from the arena start in address order.
  pub fn chunks(&self) -> Chunks<'_> {
    Chunks {
      region: &self.region,
      next: HEAD,
    }
  }

  /// Returns the offset of the first free chunk holding at least `size` bytes.
  fn find_free_chunk(
    &self,
    size: usize,
  ) -> Option<usize> {
    self
      .chunks()
      .find(|chunk| chunk.is_free && chunk.size >= size)
      .map(|chunk| chunk.offset)
  }

  /// First-fit allocation of `size` payload bytes.
  ///
  /// The selected chunk is split when its surplus can hold another header;
  /// otherwise the caller gets the whole chunk. Nothing changes on failure.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, ArenaError> {
    let offset = self
      .find_free_chunk(size)
      .ok_or(ArenaError::OutOfMemory { requested: size })?;

    unsafe {
      let mut selected = self.header(offset);

      if selected.size - size >= HEADER_SIZE {
        let split = offset + HEADER_SIZE + size;
        let remainder = ChunkHeader::new(
          selected.size - size - HEADER_SIZE,
          true,
          selected.forward,
          offset,
        );

        self.set_header(split, remainder);
        self.set_backward(selected.forward, split);

        tracing::trace!(offset, split, remainder = remainder.size, "split chunk");

        selected.forward = split;
        selected.size = size;
      }

      selected.is_free = false;
      self.set_header(offset, selected);

      Ok(NonNull::new_unchecked(self.base().add(offset + HEADER_SIZE)))
    }
  }

  /// Marks the chunk owning `address` free and coalesces it with free neighbours,
  /// backward first, then forward.
  ///
  /// Addresses outside the arena's payload space are ignored.
  ///
  /// # Safety
  ///
  /// `address` must have been returned by [`Arena::allocate`] on this arena and
  /// not released since.
  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) {
    let Some(offset) = self.header_offset(address) else {
      tracing::warn!(
        ?address,
        "release of an address outside the arena's payload space ignored"
      );
      return;
    };

    unsafe {
      let mut current = offset;
      let mut header = self.header(offset);
      header.is_free = true;

      if header.backward != NIL {
        let mut previous = self.header(header.backward);

        if previous.is_free {
          tracing::trace!(offset, into = header.backward, "coalesce backward");

          previous.size += HEADER_SIZE + header.size;
          previous.forward = header.forward;
          self.set_backward(header.forward, header.backward);

          current = header.backward;
          header = previous;
        }
      }

      if header.forward != NIL {
        let next = self.header(header.forward);

        if next.is_free {
          tracing::trace!(offset = header.forward, into = current, "coalesce forward");

          header.size += HEADER_SIZE + next.size;
          header.forward = next.forward;
          self.set_backward(next.forward, current);
        }
      }

      self.set_header(current, header);
    }
  }

  /// Maps a payload address back to its header offset, if it lies in the arena.
  fn header_offset(
    &self,
    address: *mut u8,
  ) -> Option<usize> {
    if !self.region.contains(address) {
      return None;
    }

    (address as usize - self.base() as usize).checked_sub(HEADER_SIZE)
  }

  #[inline]
  unsafe fn header(
    &self,
    offset: usize,
  ) -> ChunkHeader {
    unsafe { chunk::read(&self.region, offset) }
  }

  #[inline]
  unsafe fn set_header(
    &mut self,
    offset: usize,
    header: ChunkHeader,
  ) {
    unsafe { chunk::write(&self.region, offset, header) }
  }

  /// Points the `backward` link of the chunk at `offset` to `backward`.
  /// Does nothing when `offset` is [`NIL`].
  unsafe fn set_backward(
    &mut self,
    offset: usize,
    backward: usize,
  ) {
    if offset == NIL {
      return;
    }

    unsafe {
      let mut header = self.header(offset);
      header.backward = backward;
      self.set_header(offset, header);
    }
  }
}

/// Iterator over the chunks of an [`Arena`] in address order.
pub struct Chunks<'a> {
  region: &'a Region,
  next: usize,
}

impl Iterator for Chunks<'_> {
  type Item = ChunkInfo;

  fn next(&mut self) -> Option<Self::Item> {
    if self.next == NIL {
      return None;
    }

    let offset = self.next;
    // SAFETY: every forward link names a header written by the arena.
    let header = unsafe { chunk::read(self.region, offset) };
    self.next = header.forward;

    Some(ChunkInfo {
      offset,
      size: header.size,
      is_free: header.is_free,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::region::page_size;

  fn arena() -> Arena {
    Arena::new(Region::map(page_size()).unwrap())
  }

  fn layout(arena: &Arena) -> Vec<(usize, bool)> {
    arena.chunks().map(|chunk| (chunk.size, chunk.is_free)).collect()
  }

  unsafe fn backward_links(arena: &Arena) -> Vec<usize> {
    arena
      .chunks()
      .map(|chunk| unsafe { arena.header(chunk.offset).backward })
      .collect()
  }

  #[test]
  fn test_new_arena_is_one_free_chunk() {
    let arena = arena();
    let page = page_size();

    assert_eq!(layout(&arena), vec![(page - HEADER_SIZE, true)]);
  }

  #[test]
  fn test_allocate_splits_and_links() {
    let mut arena = arena();
    let page = page_size();

    let first = arena.allocate(50).unwrap();
    let second = arena.allocate(30).unwrap();

    assert_eq!(first.as_ptr(), unsafe { arena.base().add(HEADER_SIZE) });
    assert_eq!(second.as_ptr(), unsafe { first.as_ptr().add(50 + HEADER_SIZE) });

    assert_eq!(
      layout(&arena),
      vec![
        (50, false),
        (30, false),
        (page - 3 * HEADER_SIZE - 80, true),
      ]
    );

    let offsets: Vec<usize> = arena.chunks().map(|chunk| chunk.offset).collect();
    assert_eq!(offsets, vec![0, HEADER_SIZE + 50, 2 * HEADER_SIZE + 80]);
    assert_eq!(unsafe { backward_links(&arena) }, vec![NIL, 0, HEADER_SIZE + 50]);
  }

  #[test]
  fn test_allocate_without_room_for_header_takes_whole_chunk() {
    let mut arena = arena();
    let capacity = page_size() - HEADER_SIZE;

    arena.allocate(capacity - HEADER_SIZE + 1).unwrap();

    assert_eq!(layout(&arena), vec![(capacity, false)]);
  }

  #[test]
  fn test_allocate_exact_surplus_leaves_empty_free_chunk() {
    let mut arena = arena();
    let capacity = page_size() - HEADER_SIZE;

    arena.allocate(capacity - HEADER_SIZE).unwrap();

    assert_eq!(
      layout(&arena),
      vec![(capacity - HEADER_SIZE, false), (0, true)]
    );
  }

  #[test]
  fn test_first_fit_not_best_fit() {
    let mut arena = arena();

    let large = arena.allocate(200).unwrap();
    arena.allocate(8).unwrap();
    let small = arena.allocate(40).unwrap();
    arena.allocate(8).unwrap();

    unsafe {
      arena.release(large.as_ptr());
      arena.release(small.as_ptr());
    }

    let reused = arena.allocate(40).unwrap();
    assert_eq!(reused, large);
  }

  #[test]
  fn test_out_of_memory_leaves_state_untouched() {
    let mut arena = arena();

    arena.allocate(100).unwrap();
    let before = layout(&arena);

    assert_eq!(
      arena.allocate(page_size()),
      Err(ArenaError::OutOfMemory {
        requested: page_size()
      })
    );
    assert_eq!(layout(&arena), before);
  }

  #[test]
  fn test_release_coalesces_backward() {
    let mut arena = arena();

    let first = arena.allocate(16).unwrap();
    let second = arena.allocate(16).unwrap();
    arena.allocate(16).unwrap();

    unsafe {
      arena.release(first.as_ptr());
      arena.release(second.as_ptr());
    }

    let chunks = layout(&arena);
    assert_eq!(chunks[0], (32 + HEADER_SIZE, true));
    assert_eq!(chunks[1], (16, false));
    assert_eq!(chunks.len(), 3);
    assert_eq!(unsafe { backward_links(&arena) }[1], 0);
  }

  #[test]
  fn test_release_coalesces_forward() {
    let mut arena = arena();

    let first = arena.allocate(16).unwrap();
    let second = arena.allocate(16).unwrap();
    arena.allocate(16).unwrap();

    unsafe {
      arena.release(second.as_ptr());
      arena.release(first.as_ptr());
    }

    let chunks = layout(&arena);
    assert_eq!(chunks[0], (32 + HEADER_SIZE, true));
    assert_eq!(chunks.len(), 3);
  }

  #[test]
  fn test_release_between_free_neighbours_yields_one_chunk() {
    let mut arena = arena();
    let page = page_size();

    let first = arena.allocate(16).unwrap();
    let second = arena.allocate(24).unwrap();
    let third = arena.allocate(32).unwrap();

    unsafe {
      arena.release(first.as_ptr());
      arena.release(third.as_ptr());
      arena.release(second.as_ptr());
    }

    assert_eq!(layout(&arena), vec![(page - HEADER_SIZE, true)]);
    assert_eq!(unsafe { backward_links(&arena) }, vec![NIL]);
  }

  #[test]
  fn test_release_outside_arena_is_ignored() {
    let mut arena = arena();
    arena.allocate(16).unwrap();
    let before = layout(&arena);

    let mut foreign = 0u8;

    unsafe {
      arena.release(&mut foreign);
      arena.release(arena.base());
      arena.release(arena.base().add(HEADER_SIZE - 1));
    }

    assert_eq!(layout(&arena), before);
  }

  #[cfg(not(miri))]
  mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
      Allocate(usize),
      Release(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
      prop_oneof![
        3 => (1usize..600).prop_map(Op::Allocate),
        2 => any::<usize>().prop_map(Op::Release),
      ]
    }

    /// Checks the chunk list against the arena and the live allocations.
    fn check(
      arena: &Arena,
      live: &[(NonNull<u8>, usize, u8)],
    ) -> Result<(), TestCaseError> {
      let chunks: Vec<ChunkInfo> = arena.chunks().collect();
      let backward = unsafe { backward_links(arena) };

      prop_assert_eq!(chunks[0].offset, 0);
      prop_assert_eq!(chunks.last().unwrap().end(), arena.size());
      prop_assert_eq!(
        chunks.iter().map(|chunk| HEADER_SIZE + chunk.size).sum::<usize>(),
        arena.size()
      );
      prop_assert_eq!(backward[0], NIL);

      for (i, pair) in chunks.windows(2).enumerate() {
        prop_assert_eq!(pair[0].end(), pair[1].offset);
        prop_assert_eq!(backward[i + 1], pair[0].offset);
        prop_assert!(!(pair[0].is_free && pair[1].is_free));
      }

      let allocated = chunks.iter().filter(|chunk| !chunk.is_free).count();
      prop_assert_eq!(allocated, live.len());

      for &(address, size, fill) in live {
        let offset = address.as_ptr() as usize - arena.base() as usize - HEADER_SIZE;
        let chunk = chunks.iter().find(|chunk| chunk.offset == offset);

        prop_assert!(chunk.is_some_and(|chunk| !chunk.is_free && chunk.size >= size));

        let payload = unsafe { std::slice::from_raw_parts(address.as_ptr(), size) };
        prop_assert!(payload.iter().all(|byte| *byte == fill));
      }

      Ok(())
    }

    proptest! {
      #[test]
      fn invariants_hold_under_random_workload(
        ops in proptest::collection::vec(op(), 1..120),
      ) {
        let mut arena = arena();
        let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();

        for (step, op) in ops.into_iter().enumerate() {
          match op {
            Op::Allocate(size) => {
              let before: Vec<ChunkInfo> = arena.chunks().collect();

              match arena.allocate(size) {
                Ok(address) => {
                  let fill = step as u8;
                  unsafe { std::ptr::write_bytes(address.as_ptr(), fill, size) };
                  live.push((address, size, fill));
                }
                Err(error) => {
                  prop_assert_eq!(error, ArenaError::OutOfMemory { requested: size });
                  prop_assert!(before.iter().all(|chunk| !chunk.is_free || chunk.size < size));
                  prop_assert_eq!(arena.chunks().collect::<Vec<_>>(), before);
                }
              }
            }
            Op::Release(index) => {
              if live.is_empty() {
                continue;
              }

              let (address, _, _) = live.swap_remove(index % live.len());
              unsafe { arena.release(address.as_ptr()) };
            }
          }

          check(&arena, &live)?;
        }

        for (address, _, _) in live.drain(..) {
          unsafe { arena.release(address.as_ptr()) };
        }

        prop_assert_eq!(layout(&arena), vec![(arena.size() - HEADER_SIZE, true)]);
      }

      #[test]
      fn allocation_after_release_reuses_space(
        sizes in proptest::collection::vec(1usize..400, 1..8),
        size in 1usize..400,
      ) {
        let mut arena = arena();

        for size in sizes {
          let _ = arena.allocate(size);
        }

        if let Ok(address) = arena.allocate(size) {
          unsafe { arena.release(address.as_ptr()) };
          prop_assert!(arena.allocate(size).is_ok());
        }
      }
    }
  }
}
