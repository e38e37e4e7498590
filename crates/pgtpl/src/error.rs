//! Error types for pgtpl

use crate::params::Params;
use std::fmt;
use thiserror::Error;

/// Result type alias for pgtpl operations
pub type TplResult<T> = Result<T, TplError>;

/// Error types for templating, reshaping and execution
#[derive(Debug, Error)]
pub enum TplError {
    /// Bound values and placeholders do not line up
    #[error("Parameter count mismatch in `{template}`: expected {expected}, got {got}")]
    ParamCountMismatch {
        template: String,
        expected: usize,
        got: usize,
    },

    /// A value of a kind that cannot be rendered or bound here
    #[error("Unsupported value kind `{kind}`: {context}")]
    UnsupportedValueKind { kind: &'static str, context: String },

    /// A list value with no `IN (...)` placeholder to expand into
    #[error("Nested array provided to bind to `{param}` in `{template}`")]
    UnsupportedNestedArrayBinding { param: String, template: String },

    /// Malformed grouping format string
    #[error("Invalid format pattern `{format}`: {reason}")]
    InvalidFormatSpec { format: String, reason: String },

    /// Template mixes `?` and `:name` placeholders
    #[error("Template mixes positional and named placeholders: `{template}`")]
    MixedPlaceholders { template: String },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Execution failed; carries the debug-rendered query and the bound values
    #[error("{error}\nQuery: {debug_sql}")]
    Driver {
        error: DriverError,
        debug_sql: String,
        params: Params,
    },

    /// Driver failure that did not come from the database server
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),
}

impl TplError {
    /// Create a parameter count mismatch error
    pub fn param_count(template: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::ParamCountMismatch {
            template: template.into(),
            expected,
            got,
        }
    }

    /// Create an unsupported value kind error
    pub fn unsupported(kind: &'static str, context: impl Into<String>) -> Self {
        Self::UnsupportedValueKind {
            kind,
            context: context.into(),
        }
    }

    /// Create a nested array binding error
    pub fn nested_array(param: impl Into<String>, template: impl Into<String>) -> Self {
        Self::UnsupportedNestedArrayBinding {
            param: param.into(),
            template: template.into(),
        }
    }

    /// Create an invalid format spec error
    pub fn invalid_format(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormatSpec {
            format: format.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this is a parameter count mismatch
    pub fn is_param_count_mismatch(&self) -> bool {
        matches!(self, Self::ParamCountMismatch { .. })
    }

    /// Check if this is an invalid format spec error
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, Self::InvalidFormatSpec { .. })
    }

    /// Check if this error came from the database
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }

    /// The debug-rendered query attached to a driver error, if any.
    pub fn debug_sql(&self) -> Option<&str> {
        match self {
            Self::Driver { debug_sql, .. } => Some(debug_sql),
            _ => None,
        }
    }
}

/// Error details reported by the database for a failed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    /// Primary message from the server.
    pub message: String,
    /// SQLSTATE code (e.g. `42601`).
    pub sql_state: Option<String>,
    /// 1-based character offset into the executed statement.
    pub position: Option<u32>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            position: None,
        }
    }

    pub fn with_sql_state(mut self, code: impl Into<String>) -> Self {
        self.sql_state = Some(code.into());
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Extract server-side details from a `tokio_postgres` error.
    ///
    /// Returns `None` for client-side failures (closed connection, encoding, ...).
    pub fn from_db_error(err: &tokio_postgres::Error) -> Option<Self> {
        let db_err = err.as_db_error()?;
        let position = match db_err.position() {
            Some(tokio_postgres::error::ErrorPosition::Original(p)) => Some(*p),
            _ => None,
        };
        Some(Self {
            message: db_err.message().to_string(),
            sql_state: Some(db_err.code().code().to_string()),
            position,
        })
    }

    /// Message in the form the debug renderer understands (`... at character N`).
    pub fn highlight_message(&self) -> String {
        match self.position {
            Some(p) => format!("{} at character {p}", self.message),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(code) => write!(f, "Database error [{code}]: {}", self.message),
            None => write!(f, "Database error: {}", self.message),
        }
    }
}

impl std::error::Error for DriverError {}
