/// Rounds `$value` up to the next multiple of `$align`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use firstfit::align_to;
///
/// assert_eq!(align_to!(100, 4096), 4096);
/// assert_eq!(align_to!(4096, 4096), 4096);
/// assert_eq!(align_to!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}
