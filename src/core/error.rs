//! Errors raised while loading configuration and level files

/// Errors that can occur while loading or saving data files
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// IO error
    Io(String),
    /// Serialization error
    Serialize(String),
    /// Deserialization error
    Deserialize(String),
    /// The file parsed but describes an unusable level
    InvalidLevel(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Serialize(e) => write!(f, "Serialization error: {e}"),
            Self::Deserialize(e) => write!(f, "Deserialization error: {e}"),
            Self::InvalidLevel(e) => write!(f, "Invalid level: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}
