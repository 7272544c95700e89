use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::region::RegionId;

/// Result type used by the annotation crate.
pub type Result<T> = std::result::Result<T, AnnotationError>;

/// Errors produced by store operations, hydration and document I/O.
#[derive(Debug)]
pub enum AnnotationError {
    /// The authorizer declined to materialize a provisional region.
    RefusedCreation,
    RegionNotFound {
        id: RegionId,
    },
    /// A persisted entry lacks a field required to restore it.
    MalformedEntry {
        reason: String,
    },
    InvalidDocument {
        reason: String,
    },
    DocumentIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    Serialization(serde_json::Error),
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    ConfigParse {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
}

impl AnnotationError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEntry {
            reason: reason.into(),
        }
    }
}

impl Display for AnnotationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RefusedCreation => write!(f, "region creation was refused"),
            Self::RegionNotFound { id } => write!(f, "region not found: {id}"),
            Self::MalformedEntry { reason } => write!(f, "malformed entry: {reason}"),
            Self::InvalidDocument { reason } => write!(f, "invalid document: {reason}"),
            Self::DocumentIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
            Self::ConfigIo { path, source } => {
                write!(f, "failed to read config: {} ({source})", path.display())
            }
            Self::ConfigParse {
                path: Some(path),
                source,
            } => write!(f, "invalid config at {} ({source})", path.display()),
            Self::ConfigParse { path: None, source } => write!(f, "invalid config ({source})"),
        }
    }
}

impl std::error::Error for AnnotationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DocumentIo { source, .. } => Some(source),
            Self::Serialization(err) => Some(err),
            Self::ConfigIo { source, .. } => Some(source),
            Self::ConfigParse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AnnotationError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

#[cfg(test)]
mod tests {
    use super::AnnotationError;
    use crate::region::RegionId;

    #[test]
    fn region_not_found_message_names_the_region() {
        let id = RegionId::new();
        let message = AnnotationError::RegionNotFound { id }.to_string();
        assert!(message.contains(&id.to_string()));
    }
}
