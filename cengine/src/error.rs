//! Engine-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    InvalidCommand,
    Wire,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidCommand, message)
    }

    pub fn wire(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Wire, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Store, message)
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for EngineError {}

impl From<cwire::WireError> for EngineError {
    fn from(value: cwire::WireError) -> Self {
        EngineError::wire(value.to_string())
    }
}
