use std::fmt;
use std::io::Read;

use custody_pool::{Error, Lifecycle, Result};
use tracing::trace;

/// Buffers with a capacity above this are released on reset instead of being kept for reuse.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// How a pooled buffer is constructed.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum BufferConfig {
    /// A buffer of the given length, filled with zeroes.
    Len(usize),

    /// A buffer holding a copy of the given bytes.
    Bytes(Vec<u8>),

    /// A buffer holding the UTF-8 bytes of the given string.
    Text(String),
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::Len(0)
    }
}

/// External objects a buffer pool can adopt.
#[non_exhaustive]
pub enum BufferSource {
    /// An owned byte vector.
    Owned(Vec<u8>),

    /// An owned string, adopted as its UTF-8 bytes.
    Text(String),

    /// A reader, drained to its end into the recycled storage.
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for BufferSource {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned(bytes) => f.debug_tuple("Owned").field(bytes).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Reader(_) => f.debug_tuple("Reader").finish_non_exhaustive(),
        }
    }
}

impl From<Vec<u8>> for BufferSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Owned(value)
    }
}

impl From<String> for BufferSource {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Lifecycle policy for pools of `Vec<u8>` buffers.
///
/// Constructing and adopting buffers reuses the capacity of recycled storage whenever it is
/// large enough. Resetting a buffer keeps its capacity unless it exceeds 64 KiB, in which case
/// the storage is released so that a single large buffer cannot pin memory in the pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct BufferLifecycle;

impl Lifecycle for BufferLifecycle {
    type Value = Vec<u8>;
    type Config = BufferConfig;
    type Source = BufferSource;

    fn new(&self, config: &BufferConfig, mut recycled: Vec<u8>) -> Result<Vec<u8>> {
        match config {
            BufferConfig::Len(len) => {
                recycled.clear();
                recycled.resize(*len, 0);
                Ok(recycled)
            }
            BufferConfig::Bytes(bytes) => {
                if recycled.capacity() < bytes.len() {
                    return Ok(bytes.clone());
                }

                Ok(refill(recycled, bytes))
            }
            BufferConfig::Text(text) => Ok(refill(recycled, text.as_bytes())),
        }
    }

    fn parse(&self, source: BufferSource, mut recycled: Vec<u8>) -> Result<Vec<u8>> {
        let bytes = match source {
            BufferSource::Owned(bytes) => bytes,
            BufferSource::Text(text) => text.into_bytes(),
            BufferSource::Reader(mut reader) => {
                recycled.clear();

                reader
                    .read_to_end(&mut recycled)
                    .map_err(|e| Error::UnsupportedSource {
                        reason: format!("reading the source failed: {e}"),
                    })?;

                return Ok(recycled);
            }
        };

        if recycled.capacity() < bytes.len() {
            return Ok(bytes);
        }

        Ok(refill(recycled, &bytes))
    }

    fn reset(&self, value: &mut Vec<u8>) {
        if value.capacity() > MAX_RETAINED_CAPACITY {
            trace!(
                capacity = value.capacity(),
                "releasing oversized buffer instead of retaining it"
            );

            *value = Vec::new();
            return;
        }

        value.clear();
    }

    fn copy(&self, dst: &mut Vec<u8>, src: &Vec<u8>) -> Result<()> {
        dst.clone_from(src);
        Ok(())
    }
}

/// Replaces the contents of `recycled` with `bytes`, growing it if needed.
fn refill(mut recycled: Vec<u8>, bytes: &[u8]) -> Vec<u8> {
    recycled.clear();
    recycled.extend_from_slice(bytes);
    recycled
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::{self, Cursor};

    use super::*;

    #[test]
    fn new_len_zero_fills_recycled_storage() {
        let recycled = vec![7; 32];
        let capacity = recycled.capacity();

        let value = BufferLifecycle.new(&BufferConfig::Len(8), recycled).unwrap();

        assert_eq!(value, vec![0; 8]);
        assert_eq!(value.capacity(), capacity);
    }

    #[test]
    fn new_bytes_reuses_large_enough_storage() {
        let recycled = Vec::with_capacity(16);
        let capacity = recycled.capacity();

        let value = BufferLifecycle
            .new(&BufferConfig::Bytes(vec![1, 2, 3]), recycled)
            .unwrap();

        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(value.capacity(), capacity);
    }

    #[test]
    fn new_bytes_allocates_when_storage_too_small() {
        let value = BufferLifecycle
            .new(&BufferConfig::Bytes(vec![1, 2, 3]), Vec::new())
            .unwrap();

        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn new_text_holds_utf8_bytes() {
        let value = BufferLifecycle
            .new(&BufferConfig::Text("héllo".to_string()), vec![9, 9])
            .unwrap();

        assert_eq!(value, "héllo".as_bytes());
    }

    #[test]
    fn parse_adopts_when_storage_too_small() {
        let source = vec![4; 100];
        let pointer = source.as_ptr();

        let value = BufferLifecycle
            .parse(BufferSource::Owned(source), Vec::new())
            .unwrap();

        assert_eq!(value.as_ptr(), pointer);
        assert_eq!(value.len(), 100);
    }

    #[test]
    fn parse_copies_into_large_enough_storage() {
        let recycled = Vec::with_capacity(64);
        let pointer = recycled.as_ptr();

        let value = BufferLifecycle
            .parse(BufferSource::Text("abc".to_string()), recycled)
            .unwrap();

        assert_eq!(value.as_ptr(), pointer);
        assert_eq!(value, b"abc");
    }

    #[test]
    fn parse_reader_fills_recycled_storage() {
        let recycled = vec![9; 64];
        let pointer = recycled.as_ptr();

        let value = BufferLifecycle
            .parse(
                BufferSource::Reader(Box::new(Cursor::new(vec![1, 2, 3]))),
                recycled,
            )
            .unwrap();

        assert_eq!(value.as_ptr(), pointer);
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn parse_reader_failure_is_reported() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }

        let result = BufferLifecycle.parse(BufferSource::Reader(Box::new(Broken)), Vec::new());

        assert!(matches!(
            result,
            Err(Error::UnsupportedSource { reason }) if reason.contains("disk on fire")
        ));
    }

    #[test]
    fn reset_keeps_small_capacity() {
        let mut value = vec![1; 1024];
        let capacity = value.capacity();

        BufferLifecycle.reset(&mut value);

        assert!(value.is_empty());
        assert_eq!(value.capacity(), capacity);
    }

    #[test]
    fn reset_drops_oversized_capacity() {
        let mut value = vec![1; MAX_RETAINED_CAPACITY + 1];

        BufferLifecycle.reset(&mut value);

        assert!(value.is_empty());
        assert_eq!(value.capacity(), 0);
    }

    #[test]
    fn copy_replaces_contents() {
        let mut dst = vec![0; 10];

        BufferLifecycle.copy(&mut dst, &vec![5, 6]).unwrap();

        assert_eq!(dst, vec![5, 6]);
    }

    #[test]
    fn default_config_is_empty_buffer() {
        assert_eq!(BufferConfig::default(), BufferConfig::Len(0));
    }
}
