//! Error types shared across the chronik ecosystem.

use uuid::Uuid;

/// Result alias used throughout the engine.
pub type Result<T> = core::result::Result<T, StoreError>;

/// Errors raised by the transcoder.
#[derive(Debug, thiserror::Error)]
pub enum TranscodingError {
    /// A record carried a type tag no registered transcoding claims.
    #[error("no transcoding registered for tag `{0}`")]
    UnknownTag(String),
    /// A value of this kind has no registered transcoding to encode it.
    #[error("no transcoding registered to encode {0} value")]
    Unencodable(&'static str),
    /// The tagged body did not match the transcoding's decoder.
    #[error("malformed body for tag `{tag}`: {reason}")]
    Malformed {
        /// Tag whose transcoding rejected the body.
        tag: String,
        /// What the decoder objected to.
        reason: String,
    },
    /// The byte string was not a well-formed wire document.
    #[error("invalid wire document: {0}")]
    Document(String),
    /// After upcasting, the record's topic is not in the event-type registry.
    #[error("record topic `{0}` is not addressable by any registered type")]
    UnknownTopic(String),
}

/// Errors raised by stores, recorders and the repository.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Repository found neither a snapshot nor events for the aggregate.
    #[error("aggregate {0} not found")]
    AggregateNotFound(Uuid),
    /// Uniqueness violation on `(originator_id, originator_version)` or on a
    /// snapshot key. The canonical retriable error: reload and retry.
    #[error("record conflict for originator {0}")]
    RecordConflict(Uuid),
    /// Any other recorder failure: connectivity, unrelated integrity
    /// violations, exhausted store-internal retries.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// Encoding or decoding of event state failed.
    #[error(transparent)]
    Transcoding(#[from] TranscodingError),
    /// Cipher tag verification, decompression, or an upcaster refused the
    /// record.
    #[error("integrity failure: {0}")]
    Integrity(String),
    /// A notification log section id did not match `<u64>,<u64>`.
    #[error("invalid section id `{0}`")]
    InvalidSectionId(String),
}

impl StoreError {
    /// Whether the caller may reload and retry the failed save.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::RecordConflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_error_names_the_tag() {
        let err = TranscodingError::UnknownTag("point_xy".to_owned());
        assert!(err.to_string().contains("point_xy"));
    }

    #[test]
    fn conflict_is_the_only_retriable_kind() {
        let id = Uuid::new_v4();
        assert!(StoreError::RecordConflict(id).is_conflict());
        assert!(!StoreError::AggregateNotFound(id).is_conflict());
        assert!(!StoreError::Persistence("down".into()).is_conflict());
    }
}
