use crate::error::DriverError;

/// What to do after a failed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorAction {
    /// Surface the failure to the caller as [`crate::TplError::Driver`].
    #[default]
    Propagate,
    /// Swallow the failure; the operation returns an empty result.
    Recover,
}

/// Pluggable reaction to database errors raised while executing a template.
///
/// `debug_sql` is the debug-rendered query with the failing token
/// highlighted. It is meant for logs and must not be executed.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: &DriverError, debug_sql: &str) -> ErrorAction;
}

impl<F> ErrorHandler for F
where
    F: Fn(&DriverError, &str) -> ErrorAction + Send + Sync,
{
    fn handle(&self, error: &DriverError, debug_sql: &str) -> ErrorAction {
        self(error, debug_sql)
    }
}

/// Always propagates. Used when no handler is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagateHandler;

impl ErrorHandler for PropagateHandler {
    fn handle(&self, _error: &DriverError, _debug_sql: &str) -> ErrorAction {
        ErrorAction::Propagate
    }
}

#[cfg(feature = "tracing")]
pub use tracing_handler::TracingErrorHandler;

#[cfg(feature = "tracing")]
mod tracing_handler {
    use super::{ErrorAction, ErrorHandler};
    use crate::error::DriverError;
    use crate::query::truncate_sql_bytes;
    use tracing::Level;

    /// Emits a `tracing` event for every failed execution, then applies a fixed action.
    ///
    /// Events use the `pgtpl.sql` target.
    #[derive(Debug, Clone)]
    pub struct TracingErrorHandler {
        /// Tracing event level to emit at.
        pub level: Level,
        /// Truncate long SQL strings (in bytes). `None` means no truncation.
        pub max_sql_length: Option<usize>,
        /// Action returned after logging.
        pub action: ErrorAction,
    }

    impl Default for TracingErrorHandler {
        fn default() -> Self {
            Self {
                level: Level::ERROR,
                max_sql_length: Some(200),
                action: ErrorAction::Propagate,
            }
        }
    }

    impl TracingErrorHandler {
        pub fn new() -> Self {
            Self::default()
        }

        /// Override the tracing event level.
        pub fn level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Set maximum SQL length to display.
        pub fn max_sql_length(mut self, len: usize) -> Self {
            self.max_sql_length = Some(len);
            self
        }

        /// Disable SQL truncation.
        pub fn no_truncate(mut self) -> Self {
            self.max_sql_length = None;
            self
        }

        /// Swallow errors after logging them.
        pub fn recover(mut self) -> Self {
            self.action = ErrorAction::Recover;
            self
        }

        pub(crate) fn truncate_sql(&self, sql: &str) -> String {
            match self.max_sql_length {
                Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
                _ => sql.to_string(),
            }
        }
    }

    impl ErrorHandler for TracingErrorHandler {
        fn handle(&self, error: &DriverError, debug_sql: &str) -> ErrorAction {
            macro_rules! emit_at_level {
                ($level:expr, $($field:tt)*) => {
                    match $level {
                        Level::ERROR => tracing::error!($($field)*),
                        Level::WARN  => tracing::warn!($($field)*),
                        Level::INFO  => tracing::info!($($field)*),
                        Level::DEBUG => tracing::debug!($($field)*),
                        Level::TRACE => tracing::trace!($($field)*),
                    }
                };
            }

            let code = error.sql_state.as_deref().unwrap_or("-");
            let sql = self.truncate_sql(debug_sql);
            emit_at_level!(
                self.level,
                target: "pgtpl.sql",
                code,
                position = ?error.position,
                sql = %sql,
                "{}",
                error.message
            );
            self.action
        }
    }
}
