//! # firstfit - A First-Fit Arena Allocator
//!
//! This crate provides a single-threaded **first-fit free-list allocator** that
//! carves allocations out of one fixed-size arena mapped with `mmap(2)`.
//!
//! ## Overview
//!
//! The arena is split into chunks. Every chunk is a header followed by its
//! payload, and the headers form an address-ordered doubly-linked list that
//! lives inside the arena itself:
//!
//! ```text
//!   Arena (one mmap region, page-rounded):
//!
//!   ┌────────┬──────────┬────────┬────────┬────────┬──────────────────────┐
//!   │ header │ payload  │ header │payload │ header │       payload        │
//!   │ alloc  │  50 B    │ alloc  │ 30 B   │ free   │    rest of arena     │
//!   └────────┴──────────┴────────┴────────┴────────┴──────────────────────┘
//!   ▲        ▲          ▲
//!   │        │          └── forward link of the first chunk (offset 82)
//!   │        └── pointer returned to the caller
//!   └── offset 0, head of the list
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   firstfit
//!   ├── align      - align_to! rounding macro
//!   ├── allocator  - Allocator: init/destroy lifecycle, status code
//!   ├── arena      - First-fit search, splitting and coalescing
//!   ├── chunk      - Chunk header layout (internal)
//!   ├── config     - ArenaConfig and MAX_ARENA_SIZE
//!   ├── error      - ArenaError
//!   └── region     - Owned mmap region (internal)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use firstfit::Allocator;
//!
//! let mut allocator = Allocator::new();
//! let size = allocator.init(100).unwrap();
//! assert_eq!(size % firstfit::page_size(), 0);
//!
//! let ptr = allocator.allocate(8).unwrap().as_ptr() as *mut u64;
//!
//! unsafe {
//!   ptr.write_unaligned(42);
//!   assert_eq!(ptr.read_unaligned(), 42);
//!
//!   allocator.release(ptr as *mut u8);
//! }
//!
//! allocator.destroy().unwrap();
//! ```
//!
//! ## How It Works
//!
//! Allocation scans the list from the arena start and takes the first free
//! chunk large enough. When the surplus can hold another header, the tail is
//! split off as a new free chunk:
//!
//! ```text
//!   allocate(50) on a free chunk of 200 B:
//!
//!   before ┌────────┬──────────────────────────────────────┐
//!          │ free   │               200 B                  │
//!          └────────┴──────────────────────────────────────┘
//!   after  ┌────────┬──────────┬────────┬──────────────────┐
//!          │ alloc  │   50 B   │ free   │ 200 - 50 - H B   │
//!          └────────┴──────────┴────────┴──────────────────┘
//! ```
//!
//! Release marks the chunk free, folds it into a free predecessor, then folds
//! a free successor into the result, so no two neighbours are ever both free:
//!
//! ```text
//!   release(B) with A and C free:
//!
//!   ┌───┬─────┬───┬─────┬───┬─────┐        ┌───┬─────────────────────────┐
//!   │ A │free │ B │alloc│ C │free │  ───▶  │ A │ free: A + H + B + H + C │
//!   └───┴─────┴───┴─────┴───┴─────┘        └───┴─────────────────────────┘
//! ```
//!
//! Links are offsets from the arena start rather than addresses.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: wrap the `Allocator` in a `Mutex` to share it
//! - **Fixed arena**: the region never grows or shrinks after `init`
//! - **No alignment beyond byte granularity**: payload sizes are kept exact
//! - **Unix-only**: requires `libc`, `mmap` and `munmap`
//!
//! ## Safety
//!
//! Releasing a pointer that did not come from `allocate`, releasing it twice,
//! or writing past a chunk's payload corrupts the arena. `release` is therefore
//! `unsafe`; the allocator does not try to detect such misuse.

pub mod align;
mod allocator;
mod arena;
mod chunk;
mod config;
mod error;
mod region;

pub use allocator::Allocator;
pub use chunk::{ChunkInfo, HEADER_SIZE};
pub use config::{ArenaConfig, MAX_ARENA_SIZE};
pub use error::ArenaError;
pub use region::page_size;
