//! UUID utilities

use uuid::Uuid;

/// Generate a new surrogate identity (UUIDv4)
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a stored identity from its text form
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}
