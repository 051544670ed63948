use crate::record::Series;

/// A store that durably persists one record per call.
///
/// Writes are synchronous from the caller's point of view: the event loop
/// issues one write at a time and waits for the outcome before receiving
/// the next record.
pub trait Sink {
    type Error: std::fmt::Display;

    /// Persists a single record, returning the store's verdict.
    fn write(
        &self,
        series: &Series,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
}
