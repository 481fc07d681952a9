/// Configuration options for [`TextReader`](crate::TextReader).
///
/// # Examples
///
/// ```rust
/// use iontext::{ReaderOptions, TextReader};
///
/// let options = ReaderOptions {
///     max_container_depth: Some(32),
/// };
/// let _reader = TextReader::with_options("[[[]]]".as_bytes(), options);
/// ```
///
/// # Default
///
/// No limits are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReaderOptions {
    /// The deepest nesting `step_in` may reach.
    ///
    /// With `Some(n)`, stepping into a container while already `n` levels deep
    /// fails with [`Error::DepthLimitExceeded`](crate::Error::DepthLimitExceeded).
    /// Containers that are never stepped into are skipped without limit.
    ///
    /// # Default
    ///
    /// `None`
    pub max_container_depth: Option<usize>,
}
