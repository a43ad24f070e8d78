use std::ptr;

use firstfit::{Allocator, ArenaError, HEADER_SIZE};
use tracing::Level;

/// Prints every chunk of the arena in address order.
fn print_chunks(
  label: &str,
  allocator: &Allocator,
) {
  println!("[{}] chunks:", label);
  for chunk in allocator.chunks() {
    println!(
      "    offset {:>5}  payload {:>5} B  {}",
      chunk.offset,
      chunk.size,
      if chunk.is_free { "free" } else { "allocated" }
    );
  }
}

fn main() -> Result<(), ArenaError> {
  // TRACE shows every split and coalesce decision.
  tracing_subscriber::fmt().with_max_level(Level::TRACE).init();

  let mut allocator = Allocator::new();

  // --------------------------------------------------------------------
  // 1) Map an arena. The requested size is rounded up to a full page.
  // --------------------------------------------------------------------
  let size = allocator.init(100)?;
  println!("\n[1] init(100) reserved {} bytes, header is {} bytes", size, HEADER_SIZE);
  print_chunks("1", &allocator);

  // --------------------------------------------------------------------
  // 2) Two allocations land next to each other, one header apart.
  // --------------------------------------------------------------------
  let first = allocator.allocate(50)?;
  let second = allocator.allocate(30)?;
  println!("\n[2] allocate(50) = {:?}, allocate(30) = {:?}", first, second);
  println!(
    "[2] distance = {} bytes",
    second.as_ptr() as usize - first.as_ptr() as usize
  );

  unsafe {
    ptr::write_bytes(first.as_ptr(), 0xAB, 50);
    ptr::write_bytes(second.as_ptr(), 0xCD, 30);
  }
  print_chunks("2", &allocator);

  // --------------------------------------------------------------------
  // 3) Releasing both folds everything back into one free chunk.
  // --------------------------------------------------------------------
  unsafe {
    allocator.release(first.as_ptr());
    allocator.release(second.as_ptr());
  }
  println!("\n[3] released both blocks");
  print_chunks("3", &allocator);

  // --------------------------------------------------------------------
  // 4) A full page of payload never fits: the first header takes its share.
  // --------------------------------------------------------------------
  match allocator.allocate(size) {
    Ok(address) => println!("\n[4] unexpectedly allocated {:?}", address),
    Err(error) => println!("\n[4] allocate({}) failed: {} (code {})", size, error, error.code()),
  }
  println!("[4] status = {:?}", allocator.status());

  // --------------------------------------------------------------------
  // 5) Tear down. Pointers from this arena now dangle.
  // --------------------------------------------------------------------
  allocator.destroy()?;
  println!("\n[5] destroyed, initialized = {}", allocator.is_initialized());

  Ok(())
}
