use std::io::Read;

use custody_pool::{Item, Pool};

use crate::{BufferConfig, BufferLifecycle, BufferSource, Bytes, Result};

/// A pool of byte buffers.
///
/// This is a thin wrapper over a [`Pool`] with the [`BufferLifecycle`] policy. It offers
/// shorthands for the common ways of obtaining a buffer, either as a full [`Item`] or as a
/// [`Bytes`] view.
///
/// Clones share the same underlying pool.
///
/// # Example
///
/// ```
/// use custody_buf::BufferPool;
///
/// let pool = BufferPool::new();
///
/// let bytes = pool.new_bytes(16)?;
/// bytes.p(|b| b[0] = 1)?;
///
/// let owned = bytes.take()?;
/// assert_eq!(owned.len(), 16);
/// assert_eq!(owned[0], 1);
/// # Ok::<(), custody_buf::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct BufferPool {
    pool: Pool<BufferLifecycle>,
}

impl BufferPool {
    /// Creates a buffer pool with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: Pool::new(BufferLifecycle),
        }
    }

    /// Issues a buffer holding a copy of `bytes`.
    ///
    /// # Errors
    ///
    /// Never fails with the built-in policy; the signature mirrors the underlying pool.
    pub fn new_buffer(&self, bytes: Vec<u8>) -> Result<Item<BufferLifecycle>> {
        Ok(self.pool.new_item(BufferConfig::Bytes(bytes))?)
    }

    /// Adopts an external buffer into the pool. Its storage may be reused after the item is
    /// destroyed.
    ///
    /// # Errors
    ///
    /// Never fails with the built-in policy; the signature mirrors the underlying pool.
    pub fn involve_buffer(&self, buffer: Vec<u8>) -> Result<Item<BufferLifecycle>> {
        let config = BufferConfig::Len(buffer.len());
        Ok(self
            .pool
            .involve_item(config, BufferSource::Owned(buffer))?)
    }

    /// Wraps an external buffer without adding its storage to the pool. On destroy the value is
    /// released rather than reset.
    ///
    /// # Errors
    ///
    /// Never fails with the built-in policy; the signature mirrors the underlying pool.
    pub fn parse_buffer(&self, buffer: Vec<u8>) -> Result<Item<BufferLifecycle>> {
        let config = BufferConfig::Len(buffer.len());
        Ok(self.pool.parse_item(config, BufferSource::Owned(buffer))?)
    }

    /// Issues a buffer holding everything `reader` yields until its end. The bytes are read
    /// into recycled storage, which goes back to the pool after the item is destroyed.
    ///
    /// # Errors
    ///
    /// Fails with [`custody_pool::Error::UnsupportedSource`] if reading fails. No item is
    /// issued in that case.
    pub fn read_buffer(
        &self,
        reader: impl Read + Send + 'static,
    ) -> Result<Item<BufferLifecycle>> {
        Ok(self
            .pool
            .involve_item(BufferConfig::Len(0), BufferSource::Reader(Box::new(reader)))?)
    }

    /// Issues a view of `len` zero bytes.
    ///
    /// # Errors
    ///
    /// Never fails with the built-in policy; the signature mirrors the underlying pool.
    pub fn new_bytes(&self, len: usize) -> Result<Bytes> {
        let item = self.pool.new_item(BufferConfig::Len(len))?;
        Bytes::from_item(item)
    }

    /// Adopts `bytes` into the pool and returns a view of them.
    ///
    /// # Errors
    ///
    /// Never fails with the built-in policy; the signature mirrors the underlying pool.
    pub fn involve_bytes(&self, bytes: Vec<u8>) -> Result<Bytes> {
        Bytes::from_item(self.involve_buffer(bytes)?)
    }

    /// Wraps `bytes` in a view without adding their storage to the pool.
    ///
    /// # Errors
    ///
    /// Never fails with the built-in policy; the signature mirrors the underlying pool.
    pub fn parse_bytes(&self, bytes: Vec<u8>) -> Result<Bytes> {
        Bytes::from_item(self.parse_buffer(bytes)?)
    }

    /// Reads `reader` to its end into a pooled buffer and returns a view of the bytes.
    ///
    /// # Errors
    ///
    /// See [`read_buffer()`][Self::read_buffer].
    pub fn read_bytes(&self, reader: impl Read + Send + 'static) -> Result<Bytes> {
        Bytes::from_item(self.read_buffer(reader)?)
    }

    /// See [`Pool::count_outstanding_and_retained()`].
    #[must_use]
    pub fn count_outstanding_and_retained(&self) -> (usize, usize) {
        self.pool.count_outstanding_and_retained()
    }

    /// The underlying item pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<BufferLifecycle> {
        &self.pool
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Pool<BufferLifecycle>> for BufferPool {
    /// Wraps a pool built with custom settings, e.g. via [`Pool::builder()`].
    fn from(pool: Pool<BufferLifecycle>) -> Self {
        Self { pool }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::{self, Cursor};

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::Error;

    assert_impl_all!(BufferPool: Send, Sync, Clone);

    #[test]
    fn new_buffer_copies_bytes() {
        let pool = BufferPool::new();

        let item = pool.new_buffer(vec![1, 2, 3]).unwrap();

        assert!(item.has_involved());
        assert_eq!(item.v(Clone::clone).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn involved_buffer_is_recycled() {
        let pool = BufferPool::new();

        let item = pool.involve_buffer(vec![0; 128]).unwrap();
        assert!(item.has_involved());
        item.manual_destroy().unwrap();

        assert_eq!(pool.count_outstanding_and_retained(), (0, 1));

        // The adopted capacity is reused for the next buffer.
        let item = pool.pool().new_item(BufferConfig::Len(0)).unwrap();
        assert!(item.v(Vec::capacity).unwrap() >= 128);
    }

    #[test]
    fn parsed_buffer_is_not_buffered() {
        let pool = BufferPool::new();

        let item = pool.parse_buffer(vec![5; 4]).unwrap();

        assert!(!item.has_involved());
        assert_eq!(item.v(Vec::len).unwrap(), 4);
    }

    #[test]
    fn read_buffer_drains_reader() {
        let pool = BufferPool::new();

        let item = pool.read_buffer(Cursor::new(b"streamed".to_vec())).unwrap();

        assert!(item.has_involved());
        assert_eq!(item.take().unwrap(), b"streamed");
        assert_eq!(pool.count_outstanding_and_retained(), (0, 0));

        drop(item);
        assert_eq!(pool.count_outstanding_and_retained(), (0, 1));
    }

    #[test]
    fn failed_read_issues_nothing() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("connection reset"))
            }
        }

        let pool = BufferPool::new();

        let result = pool.read_bytes(Broken);

        assert!(matches!(
            result,
            Err(Error::Pool(custody_pool::Error::UnsupportedSource { .. }))
        ));
        assert_eq!(pool.count_outstanding_and_retained(), (0, 1));
    }

    #[test]
    fn views_cover_whole_buffer() {
        let pool = BufferPool::new();

        assert_eq!(pool.new_bytes(10).unwrap().len(), 10);
        assert_eq!(pool.involve_bytes(vec![1; 7]).unwrap().len(), 7);
        assert_eq!(pool.parse_bytes(vec![1; 3]).unwrap().len(), 3);
        assert!(pool.new_bytes(0).unwrap().is_empty());
    }

    #[test]
    fn custom_pool_settings_are_used() {
        let pool = BufferPool::from(Pool::builder(BufferLifecycle).no_put_back(true).build());

        pool.new_bytes(8).unwrap().manual_destroy().unwrap();

        assert_eq!(pool.count_outstanding_and_retained(), (0, 0));
    }

    #[test]
    fn clones_share_pool() {
        let pool = BufferPool::new();
        let clone = pool.clone();

        let bytes = clone.new_bytes(4).unwrap();
        assert_eq!(pool.count_outstanding_and_retained(), (1, 0));

        bytes.manual_destroy().unwrap();
        assert_eq!(pool.count_outstanding_and_retained(), (0, 1));
    }
}
