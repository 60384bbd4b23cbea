//! Fatal error types. Per the error-handling design, only conditions that must
//! abort a load or a period switch get an `Err`; everything else (unknown
//! stop id, unreachable destination, no feasible arrive-by departure) is a
//! soft failure represented as an empty result.

/// Errors raised while turning the two binary streams into a [`crate::Network`].
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("unknown magic bytes {observed:02x?} in {what} file")]
    UnknownMagic { what: &'static str, observed: [u8; 4] },

    #[error("truncated {what} file: expected at least {expected} more bytes, found {found}")]
    Truncated { what: &'static str, expected: usize, found: usize },

    #[error("unsupported {what} format version {found}")]
    VersionMismatch { what: &'static str, found: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Errors raised while building the derived [`crate::Network`] from raw,
/// loader-produced records.
#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    #[error(
        "route {route_id} trip {trip_index} is not monotonic at pattern position {position}: \
         time {time} follows {previous}"
    )]
    NonMonotonicTrip { route_id: u32, trip_index: usize, position: usize, previous: u32, time: u32 },

    #[error(
        "route {route_id} position {position}: trip {trip_index} departs at {time}, earlier \
         than trip {trip_index}'s predecessor arrival of {previous} at the same stop"
    )]
    NonMonotonicRoute { route_id: u32, trip_index: usize, position: usize, previous: u32, time: u32 },

    #[error("duplicate stop id {0}")]
    DuplicateStopId(u32),
}

/// Fatal errors from the query facade (period management). Query failures
/// that are merely "nothing found" are soft and return empty results instead.
#[derive(thiserror::Error, Debug)]
pub enum PlannerError {
    #[error("period {0:?} is not loaded")]
    UnknownPeriod(String),
}
