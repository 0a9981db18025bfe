//! Error taxonomy (spec §7).
//!
//! Most of the taxonomy is recovered silently inside the pipeline and
//! surfaced only as a warning string on `ConvertResult.warnings` — the
//! core's public API never throws for a single malformed line, an
//! unavailable graphics stream, or an ambiguous pattern. `ConvertError`
//! exists only for failures a caller must act on: a page whose recovery
//! attempts were exhausted, or a config that cannot produce a valid
//! pipeline run.

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("page {page_index} failed irrecoverably: {reason}")]
    CatastrophicPageFailure { page_index: usize, reason: String },

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
