use std::fmt;

/// Failure while building a handler tree.
///
/// Every variant is fatal: no partial tree is ever returned.
#[derive(Debug)]
pub enum BuildError {
    /// A declared handler's factory failed
    Construction {
        accessor: String,
        source: anyhow::Error,
    },
    /// A handler's connection hook failed after the tree was built
    Connection {
        accessor: String,
        source: anyhow::Error,
    },
    /// Node names must be non-empty and may not contain `.`
    InvalidName {
        parent: Option<String>,
        name: String,
    },
    /// Two children of one node derived the same name
    DuplicateChild { parent: String, name: String },
}

impl BuildError {
    /// Accessor of the node the failure is attributed to.
    #[must_use]
    pub fn accessor(&self) -> String {
        match self {
            BuildError::Construction { accessor, .. } | BuildError::Connection { accessor, .. } => {
                accessor.clone()
            }
            BuildError::InvalidName { parent, name } => match parent {
                Some(parent) => format!("{parent}.{name}"),
                None => name.clone(),
            },
            BuildError::DuplicateChild { parent, name } => format!("{parent}.{name}"),
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Construction { accessor, source } => {
                write!(f, "Failed to construct handler '{accessor}': {source}")
            }
            BuildError::Connection { accessor, source } => {
                write!(f, "Failed to connect handler '{accessor}': {source}")
            }
            BuildError::InvalidName { parent, name } => match parent {
                Some(parent) => write!(f, "Invalid handler name '{name}' under '{parent}'"),
                None => write!(f, "Invalid root handler name '{name}'"),
            },
            BuildError::DuplicateChild { parent, name } => {
                write!(f, "Handler '{parent}' declares child '{name}' more than once")
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Construction { source, .. } | BuildError::Connection { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_source() {
        let err = BuildError::Construction {
            accessor: "root.broken".to_string(),
            source: anyhow::anyhow!("database offline"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to construct handler 'root.broken': database offline"
        );
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.accessor(), "root.broken");
    }

    #[test]
    fn test_name_errors_have_no_source() {
        let err = BuildError::DuplicateChild {
            parent: "root".to_string(),
            name: "content".to_string(),
        };
        assert_eq!(err.accessor(), "root.content");
        assert!(std::error::Error::source(&err).is_none());

        let err = BuildError::InvalidName {
            parent: None,
            name: String::new(),
        };
        assert_eq!(err.to_string(), "Invalid root handler name ''");
    }
}
