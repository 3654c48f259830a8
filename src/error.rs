// MIT License
// Copyright (c) 2024 Graham King

use std::path::PathBuf;

/// Everything a workflow can fail with. Engine diagnostics are carried as-is.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Missing or invalid configuration, detected before connecting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transport could not open or keep a session.
    #[error("connection error: {0}")]
    Connection(String),

    /// The engine rejected a statement.
    #[error("statement failed: {message}\n  statement: {statement}")]
    Statement { statement: String, message: String },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The sample data file is not in the expected shape.
    #[error("invalid sample data: {0}")]
    Data(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AdminError {
    pub fn statement(statement: &str, message: impl Into<String>) -> Self {
        AdminError::Statement {
            statement: statement.trim().to_string(),
            message: message.into(),
        }
    }

    /// The text to show when a best-effort step swallows this error.
    pub fn diagnostic(&self) -> String {
        match self {
            AdminError::Statement { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<csv::Error> for AdminError {
    fn from(err: csv::Error) -> Self {
        AdminError::Data(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_is_the_engine_text_for_statements() {
        let err = AdminError::statement(
            "  DROP DATABASE x\n",
            "[Error 3802] Database 'x' does not exist.",
        );
        assert_eq!(err.diagnostic(), "[Error 3802] Database 'x' does not exist.");
        assert!(err.to_string().contains("statement: DROP DATABASE x"));
    }

    #[test]
    fn diagnostic_falls_back_to_display() {
        let err = AdminError::Connection("refused".to_string());
        assert_eq!(err.diagnostic(), "connection error: refused");
    }
}
