use std::fmt;
use std::ops::{Bound, Range, RangeBounds};

use custody_pool::Item;

use crate::{BufferLifecycle, Error, Result};

/// A view of a contiguous range of a pooled byte buffer.
///
/// The view owns the pooled item it looks into, so all ownership rules of [`Item`] apply: the
/// bytes can be moved out once via [`take()`][Self::take], the view can be destroyed once, and
/// every later operation fails with [`custody_pool::Error::UseAfterDestroy`].
///
/// Access closures receive exactly the bytes inside the view. The buffer can still be resized
/// through [`item()`][Self::item], after which a view that no longer fits fails with
/// [`Error::OutOfRange`] instead of slicing.
///
/// # Example
///
/// ```
/// use custody_buf::BufferPool;
///
/// let pool = BufferPool::new();
///
/// let mut bytes = pool.involve_bytes(b"hello, world".to_vec())?;
/// bytes.slice(7..)?;
///
/// assert_eq!(bytes.to_vec()?, b"world");
/// assert_eq!(bytes.take()?, b"world");
/// # Ok::<(), custody_buf::Error>(())
/// ```
pub struct Bytes {
    item: Item<BufferLifecycle>,
    range: Range<usize>,
}

impl Bytes {
    /// Creates a view covering the whole buffer of `item`.
    ///
    /// # Errors
    ///
    /// Fails if the item was already retired or is being accessed with overlap detection
    /// enabled.
    pub fn from_item(item: Item<BufferLifecycle>) -> Result<Self> {
        let len = item.v(Vec::len)?;

        Ok(Self { item, range: 0..len })
    }

    /// Number of bytes in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Runs `f` with shared access to the bytes in the view.
    ///
    /// # Errors
    ///
    /// Fails with the errors of [`Item::v()`], and with [`Error::OutOfRange`] if the buffer was
    /// shrunk through [`item()`][Self::item] so that the view no longer fits.
    pub fn v<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let range = self.range.clone();

        self.item.v(|buf| match buf.get(range) {
            Some(view) => Ok(f(view)),
            None => Err(self.out_of_range(buf.len())),
        })?
    }

    /// Runs `f` with exclusive access to the bytes in the view.
    ///
    /// # Errors
    ///
    /// Fails with the errors of [`Item::p()`], and with [`Error::OutOfRange`] if the buffer was
    /// shrunk through [`item()`][Self::item] so that the view no longer fits.
    pub fn p<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let range = self.range.clone();

        self.item.p(|buf| {
            let len = buf.len();

            match buf.get_mut(range) {
                Some(view) => Ok(f(view)),
                None => Err(self.out_of_range(len)),
            }
        })?
    }

    /// Copies the bytes in the view into a new vector, leaving the view intact.
    ///
    /// # Errors
    ///
    /// Fails with the errors of [`v()`][Self::v].
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.v(<[u8]>::to_vec)
    }

    /// Creates an independent view of a deep copy of the same bytes.
    ///
    /// # Errors
    ///
    /// Fails with the errors of [`Item::copy()`].
    pub fn copy(&self) -> Result<Self> {
        Ok(Self {
            item: self.item.copy()?,
            range: self.range.clone(),
        })
    }

    /// Moves the bytes in the view out, retiring the underlying item. Bytes of the buffer
    /// outside the view are discarded.
    ///
    /// # Errors
    ///
    /// Fails with the errors of [`Item::take()`]. Fails with [`Error::OutOfRange`] if the buffer
    /// was shrunk through [`item()`][Self::item] so that the view no longer fits; the item is
    /// retired either way.
    pub fn take(&self) -> Result<Vec<u8>> {
        let mut buf = self.item.take()?;

        if buf.get(self.range.clone()).is_none() {
            return Err(self.out_of_range(buf.len()));
        }

        buf.truncate(self.range.end);
        buf.drain(..self.range.start);

        Ok(buf)
    }

    /// Destroys the underlying item. See [`Item::destroy()`].
    ///
    /// # Errors
    ///
    /// Fails with the errors of [`Item::destroy()`].
    pub fn destroy(&self) -> Result<()> {
        Ok(self.item.destroy()?)
    }

    /// Destroys the underlying item and returns its storage to the pool right away. See
    /// [`Item::manual_destroy()`].
    ///
    /// # Errors
    ///
    /// Fails with the errors of [`Item::manual_destroy()`].
    pub fn manual_destroy(self) -> Result<()> {
        Ok(self.item.manual_destroy()?)
    }

    /// Whether the underlying item has been retired.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.item.is_destroyed()
    }

    /// Narrows the view to `range`, which is relative to the current view.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OutOfRange`] if the range does not fit in the view, in which case the
    /// view is left unchanged, and with [`custody_pool::Error::UseAfterDestroy`] if the item was
    /// retired.
    pub fn slice(&mut self, range: impl RangeBounds<usize>) -> Result<()> {
        if self.item.is_destroyed() {
            return Err(custody_pool::Error::UseAfterDestroy.into());
        }

        let len = self.len();

        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };

        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        };

        if start > end || end > len {
            return Err(Error::OutOfRange { start, end, len });
        }

        // Both bounds are within the current view, so these cannot overflow.
        self.range = self.range.start.saturating_add(start)..self.range.start.saturating_add(end);

        Ok(())
    }

    /// Drops the first `from` bytes of the view. Shorthand for `slice(from..)`.
    ///
    /// # Errors
    ///
    /// See [`slice()`][Self::slice].
    pub fn slice_from(&mut self, from: usize) -> Result<()> {
        self.slice(from..)
    }

    /// Keeps only the first `to` bytes of the view. Shorthand for `slice(..to)`.
    ///
    /// # Errors
    ///
    /// See [`slice()`][Self::slice].
    pub fn slice_to(&mut self, to: usize) -> Result<()> {
        self.slice(..to)
    }

    /// The pooled item behind the view.
    ///
    /// Resizing the buffer through the item does not move the view. Operations on a view that
    /// no longer fits fail with [`Error::OutOfRange`].
    #[must_use]
    pub fn item(&self) -> &Item<BufferLifecycle> {
        &self.item
    }

    fn out_of_range(&self, len: usize) -> Error {
        Error::OutOfRange {
            start: self.range.start,
            end: self.range.end,
            len,
        }
    }
}

impl fmt::Debug for Bytes {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bytes")
            .field("item", &self.item)
            .field("range", &self.range)
            .finish()
    }
}
