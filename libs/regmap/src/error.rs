use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the schema document nor a cached catalog could be found.
    #[error("schema source `{source_id}` not found")]
    NotFound { source_id: String },

    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema document is not well-formed: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// A required element is missing, a number does not parse, or a bit
    /// range does not fit its register.
    #[error("malformed schema at {context}: {reason}")]
    MalformedSchema { context: String, reason: String },
}

impl Error {
    pub(crate) fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSchema {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                source_id: path.display().to_string(),
            }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Both unparsable XML and semantically invalid content count as a
    /// malformed schema.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedSchema { .. } | Self::Xml(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = Error::from_io("chips/STM32F401.svd", io);
        assert!(error.is_not_found());
        assert_eq!(
            error.to_string(),
            "schema source `chips/STM32F401.svd` not found"
        );
    }

    #[test]
    fn other_io_errors_keep_their_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let error = Error::from_io("locked.svd", io);
        assert!(matches!(error, Error::Io { .. }));
        assert!(!error.is_malformed());
    }
}
