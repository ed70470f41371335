//! Error taxonomy shared by the session and scrape components.

use thiserror::Error;

/// How a presentation layer should style a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Local precondition failure; never reaches the service.
    #[error("{0}")]
    Validation(String),

    /// 401/403 from the service.
    #[error("{0}")]
    Auth(String),

    /// Any other non-2xx response, or a transport failure (`status` is `None`).
    #[error("{message}")]
    Remote { status: Option<u16>, message: String },

    /// Token slot or export file I/O.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn severity(&self) -> Severity {
        match self {
            ClientError::Validation(_) => Severity::Warning,
            ClientError::Auth(_) | ClientError::Remote { .. } | ClientError::Storage(_) => {
                Severity::Error
            }
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
