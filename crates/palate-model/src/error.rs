//! Error types for the data model

use crate::ids::ItemId;

/// A row from the remote store that cannot become an [`crate::ActivityItem`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// A required field is absent or blank
    #[error("record {id} is missing required field `{field}`")]
    MissingField {
        /// Offending record
        id: ItemId,
        /// Field name
        field: &'static str,
    },

    /// Rating is not a finite number inside the accepted range
    #[error("record {id} has out-of-range rating {rating}")]
    InvalidRating {
        /// Offending record
        id: ItemId,
        /// The rejected value
        rating: f32,
    },

    /// Owner is not part of the caller's roster
    #[error("record {id} belongs to an owner outside the roster")]
    UnknownOwner {
        /// Offending record
        id: ItemId,
    },
}

/// A deep-link query string that cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// `sort=` value is not a known sort key
    #[error("unknown sort key: {0}")]
    UnknownSort(String),

    /// `status=` value is not a known status filter
    #[error("unknown status filter: {0}")]
    UnknownStatus(String),

    /// `owners=` contains something that is not a user id
    #[error("invalid owner id: {0}")]
    InvalidOwner(String),

    /// `page=` is not a positive integer
    #[error("invalid page number: {0}")]
    InvalidPage(String),
}
