use std::{io, ptr::NonNull};

use libc::{
  MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, _SC_PAGESIZE, c_void, mmap,
  munmap, sysconf,
};

use crate::error::ArenaError;

/// Fallback when `sysconf` cannot report the page size.
const DEFAULT_PAGE_SIZE: usize = 4096;

/// Returns the host page size in bytes.
pub fn page_size() -> usize {
  let size = unsafe { sysconf(_SC_PAGESIZE) };

  if size <= 0 {
    DEFAULT_PAGE_SIZE
  } else {
    size as usize
  }
}

/// A private, anonymous, read/write mapping owned by exactly one value.
///
/// The mapping is returned to the OS when the region is dropped.
pub struct Region {
  base: NonNull<u8>,
  len: usize,
}

// SAFETY: the mapping is private to this value and never aliased by another owner.
unsafe impl Send for Region {}

impl Region {
  /// Maps `len` bytes. `len` should already be a multiple of [`page_size`].
  pub fn map(len: usize) -> Result<Self, ArenaError> {
    if len == 0 {
      return Err(ArenaError::BadArguments { requested: len });
    }

    let address = unsafe {
      mmap(
        std::ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
      return Err(ArenaError::SystemCallFailed { errno });
    }

    match NonNull::new(address as *mut u8) {
      Some(base) => Ok(Self { base, len }),
      None => Err(ArenaError::SystemCallFailed { errno: 0 }),
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn as_ptr(&self) -> *mut u8 {
    self.base.as_ptr()
  }

  /// `true` if `address` lies inside the mapping.
  #[inline]
  pub fn contains(
    &self,
    address: *const u8,
  ) -> bool {
    let start = self.base.as_ptr() as usize;
    let address = address as usize;

    address >= start && address < start + self.len
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    let result = unsafe { munmap(self.base.as_ptr() as *mut c_void, self.len) };

    if result != 0 {
      tracing::error!(
        base = ?self.base,
        len = self.len,
        error = %io::Error::last_os_error(),
        "munmap failed"
      );
    }
  }
}
