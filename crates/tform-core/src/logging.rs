//! Tracing helpers for the transformation engine
//!
//! The library only emits `tracing` spans and events; installing a
//! subscriber is left to the application.
//!
//! - `transform` span (debug): one per `Engine::transform` call
//! - field failures and missing identities: `warn`
//! - per-record summary: `debug`
//! - per-field success: `trace`

use tracing::Span;

/// Span covering one `transform` call
pub(crate) fn transform_span(record_no: u64, record_id: Option<&str>) -> Span {
    tracing::debug_span!("transform", record_no, record_id = record_id.unwrap_or(""))
}

/// Summary event emitted when a record has been transformed
pub(crate) fn record_transformed(record_no: u64, fields: usize, failures: usize) {
    if failures > 0 {
        tracing::debug!(record_no, fields, failures, "Record transformed with field errors");
    } else {
        tracing::debug!(record_no, fields, "Record transformed");
    }
}
