use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn invalid_id(id: i64) -> Self { Self::InvalidArgument(format!("invalid ID {}", id)) }

    pub(crate) fn io(path: &Path, e: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", path.display(), e))
    }

    pub(crate) fn parse(path: &Path, e: serde_json::Error) -> Self {
        Self::Parse(format!("{}: {}", path.display(), e))
    }

    /// True for failures of the backing file itself (read, write or parse).
    pub fn is_io(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::Parse(_))
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            StoreError::InvalidArgument(_) => 1001,
            StoreError::NotFound(_) => 1003,
            StoreError::Io(_) => 1200,
            StoreError::Parse(_) => 1201,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_family_and_codes() {
        assert!(StoreError::Io("x".into()).is_io());
        assert!(StoreError::Parse("x".into()).is_io());
        assert!(!StoreError::not_found("user").is_io());
        assert_eq!(StoreError::invalid_id(0).code(), 1001);
        assert_eq!(StoreError::not_found("user").to_string(), "not found: user not found");
    }
}
