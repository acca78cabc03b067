use crate::Result;

/// Defines how a [`Pool`][crate::Pool] constructs, adopts, clears and duplicates its values.
///
/// A pool owns exactly one lifecycle policy for its whole lifetime and shares it between all
/// threads that use the pool. The policy never sees an item, only the values inside.
///
/// # Recycled values
///
/// [`new()`][Self::new] and [`parse()`][Self::parse] receive the value left behind by an earlier
/// item that used the same storage. This value has been through [`reset()`][Self::reset] or was
/// replaced with its default, but implementations must not assume anything else about it. They
/// may reuse its backing storage or discard it and allocate.
///
/// # Errors
///
/// Configurations and sources the policy does not recognize should be rejected with
/// [`Error::UnsupportedConfig`][crate::Error::UnsupportedConfig] and
/// [`Error::UnsupportedSource`][crate::Error::UnsupportedSource]. The pool hands such errors to
/// its caller unchanged.
///
/// # Example
///
/// ```
/// use custody_pool::{Error, Lifecycle, Result};
///
/// /// Pools `String` values of a requested minimum capacity.
/// #[derive(Debug)]
/// struct Strings;
///
/// impl Lifecycle for Strings {
///     type Value = String;
///     type Config = usize;
///     type Source = String;
///
///     fn new(&self, capacity: &usize, mut recycled: String) -> Result<String> {
///         recycled.clear();
///         recycled.reserve(*capacity);
///         Ok(recycled)
///     }
///
///     fn parse(&self, source: String, _recycled: String) -> Result<String> {
///         Ok(source)
///     }
///
///     fn reset(&self, value: &mut String) {
///         value.clear();
///     }
///
///     fn copy(&self, dst: &mut String, src: &String) -> Result<()> {
///         dst.clone_from(src);
///         Ok(())
///     }
/// }
/// ```
pub trait Lifecycle {
    /// The pooled value type. The default value is what non-buffered items are zeroed to.
    type Value: Default;

    /// The construction argument. It is stored in the item so that
    /// [`Item::copy()`][crate::Item::copy] can construct a sibling the same way.
    type Config: Clone;

    /// External objects the policy can adopt.
    type Source;

    /// Produces a ready-to-use value from a configuration and a recycled value.
    fn new(&self, config: &Self::Config, recycled: Self::Value) -> Result<Self::Value>;

    /// Adopts an external object into the value shape.
    fn parse(&self, source: Self::Source, recycled: Self::Value) -> Result<Self::Value>;

    /// Clears a value for reuse.
    ///
    /// Implementations should drop oversized backing storage instead of retaining it, to bound
    /// the memory held by the free list.
    fn reset(&self, value: &mut Self::Value);

    /// Deep-duplicates `src` into `dst`. Afterwards the two must be fully independent.
    fn copy(&self, dst: &mut Self::Value, src: &Self::Value) -> Result<()>;
}
