/// Configuration for debug rendering.
///
/// The defaults produce HTML suitable for an error page: bound values are
/// wrapped in `<abbr title=":name">` and the failing token in
/// `<span class="sql-error">`.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Text inserted where the reported error starts.
    pub error_open: String,
    /// Text inserted where the reported error ends.
    pub error_close: String,
    /// Highlight width (in characters) when the message names no `"token"`.
    pub default_token_len: usize,
    /// Wrap values in a hover-title annotation when rendering for an error.
    pub annotate_values: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            error_open: "<span class=\"sql-error\">".to_string(),
            error_close: "</span>".to_string(),
            default_token_len: 5,
            annotate_values: true,
        }
    }
}

impl RenderConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain-text output: `>>>`/`<<<` error markers and no value annotation.
    pub fn plain() -> Self {
        Self {
            error_open: ">>>".to_string(),
            error_close: "<<<".to_string(),
            annotate_values: false,
            ..Self::default()
        }
    }

    /// Set the markers placed around the failing token.
    pub fn with_error_markers(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.error_open = open.into();
        self.error_close = close.into();
        self
    }

    /// Set the fallback highlight width.
    pub fn with_default_token_len(mut self, len: usize) -> Self {
        self.default_token_len = len;
        self
    }

    /// Enable or disable the `<abbr>` annotation around values.
    pub fn annotate_values(mut self, enabled: bool) -> Self {
        self.annotate_values = enabled;
        self
    }
}
