//! Utility functions for identifier generation and timestamp handling.

pub mod timestamps;

pub use timestamps::{epoch_seconds, iso_timestamp, Timestamp};

use uuid::Uuid;

/// Generates a new identifier for threads, messages, and step records.
///
/// Identifiers are time-ordered (UUID v7) so that stores keyed by id
/// iterate in creation order.
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_uuid_v7() {
        let id = generate_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }
}
