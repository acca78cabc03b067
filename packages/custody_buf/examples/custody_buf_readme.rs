//! Example from the README.

use std::io::Cursor;

use custody_buf::{BufferPool, Result};

fn main() -> Result<()> {
    let pool = BufferPool::new();

    let mut bytes = pool.new_bytes(8)?;
    bytes.p(|b| b.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]))?;

    bytes.slice(2..5)?;
    assert_eq!(bytes.to_vec()?, vec![3, 4, 5]);

    bytes.manual_destroy()?;
    assert_eq!(pool.count_outstanding_and_retained(), (0, 1));

    // The next buffer reads into the storage that was just returned.
    let mut greeting = pool.read_bytes(Cursor::new(b"hello, world".to_vec()))?;
    greeting.slice_from(7)?;

    let owned = greeting.take()?;
    println!("{}", String::from_utf8_lossy(&owned));

    Ok(())
}
