//! Physics error types

use thiserror::Error;

use super::collider::ColliderId;

/// Errors reported by the collision engine
///
/// Every variant except [`PhysicsError::InvalidConfig`] and
/// [`PhysicsError::UnsupportedCastingMode`] indicates a caller bug or an
/// internal inconsistency and is not recoverable within the group.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// The collider (or its velocity) is already registered with a group
    #[error("collider is already tracked by a collider group")]
    AlreadyTracked,

    /// No entry exists for the given id
    #[error("collider {0} is not tracked by this group")]
    NotTracked(ColliderId),

    /// The collider handle is not registered with this group
    #[error("collider is not tracked by this group")]
    UnknownCollider,

    /// An entry sits in a bucket its id does not hash to
    #[error("collider {id} found in bucket {found}, expected bucket {expected}")]
    BucketMismatch {
        /// Offending entry
        id: ColliderId,
        /// Bucket holding the entry
        found: usize,
        /// Bucket the entry belongs in
        expected: usize,
    },

    /// Bookkeeping disagrees with the buckets' contents
    #[error("bucket table holds {actual} entries but reports {reported}")]
    BucketGap {
        /// Entry count the table reports
        reported: usize,
        /// Entries actually found in the buckets
        actual: usize,
    },

    /// A collider was registered with unusable bounds
    #[error("invalid collider bounds: {0}")]
    InvalidBounds(String),

    /// A casting mode name could not be parsed
    #[error("unsupported casting mode: {0}")]
    UnsupportedCastingMode(String),

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for engine operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;
