//! Read model trait for query-side views.

/// A view that can report its size without awaiting.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries as of the last completed write.
    fn count(&self) -> usize;
}
