//! Debug rendering of parameterized queries.
//!
//! Produces a human-readable reconstruction of a query with its bound values
//! substituted in and, when a driver error message carries an offset, the
//! failing token highlighted. The output is for logs and error pages only and
//! must never be executed.
//!
//! # Example
//!
//! ```ignore
//! use pgtpl::{Params, render_debug_query};
//!
//! let sql = render_debug_query(
//!     "SELECT * FROM users WHERE id = :id",
//!     &Params::named([("id", 5)]),
//!     None,
//! )?;
//! assert_eq!(sql, "SELECT * FROM users WHERE id = 5");
//! ```

mod config;
mod highlight;


pub use config::RenderConfig;

use crate::error::{TplError, TplResult};
use crate::params::Params;
use crate::query::SlotNumbering;
use crate::quote::{PgQuoter, Quoter};
use crate::scan::{PlaceholderKind, placeholder_style, scan_placeholders};
use crate::value::Value;
use highlight::{Assembler, error_span};

/// Render `template` with `params` substituted, highlighting the error
/// location reported in `error_message` (if any).
///
/// Uses [`PgQuoter`] and [`RenderConfig::default`].
pub fn render_debug_query(
    template: &str,
    params: &Params,
    error_message: Option<&str>,
) -> TplResult<String> {
    DebugRenderer::new(PgQuoter).render(template, params, error_message)
}

/// A replacement computed from a read-only scan of the template.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    start: usize,
    end: usize,
    text: String,
    /// Characters the placeholder occupies in the executed statement.
    width: usize,
}

/// Debug renderer bound to a quoting capability and a configuration.
#[derive(Debug, Clone, Default)]
pub struct DebugRenderer<Q> {
    quoter: Q,
    config: RenderConfig,
}

impl<Q: Quoter> DebugRenderer<Q> {
    /// Create a renderer with the default configuration.
    pub fn new(quoter: Q) -> Self {
        Self {
            quoter,
            config: RenderConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a single bound value.
    ///
    /// Without `for_error_display`, numbers render bare and everything else
    /// single-quoted as-is. With it, the value goes through the quoter and is
    /// wrapped in a hover-title annotation naming `placeholder`.
    pub fn render_value(
        &self,
        placeholder: &str,
        value: &Value,
        for_error_display: bool,
    ) -> TplResult<String> {
        if let Value::List(_) = value {
            return Err(TplError::unsupported(
                "list",
                format!("cannot render a list bound to `{placeholder}`; expand it first"),
            ));
        }

        if !for_error_display {
            return Ok(match value {
                Value::Null => "NULL".to_string(),
                Value::Int(i) => i.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Literal(raw) => raw.clone(),
                Value::Bool(_) => format!("'{}'", value.clone().normalize()),
                other => format!("'{other}'"),
            });
        }

        let quoted = self.quoter.quote(value);
        if self.config.annotate_values {
            Ok(format!("<abbr title=\"{placeholder}\">{quoted}</abbr>"))
        } else {
            Ok(quoted)
        }
    }

    /// Render `template` with `params` substituted.
    ///
    /// `error_message` is the driver's message for a failed execution, or
    /// `None` when there is no error to highlight.
    pub fn render(
        &self,
        template: &str,
        params: &Params,
        error_message: Option<&str>,
    ) -> TplResult<String> {
        let fragments = if params.is_empty() {
            Vec::new()
        } else {
            self.fragments(template, params, error_message.is_some())?
        };

        let markers = error_message
            .and_then(|msg| error_span(msg, self.config.default_token_len))
            .map(|(start, end)| {
                vec![
                    (start, self.config.error_open.as_str()),
                    (end, self.config.error_close.as_str()),
                ]
            })
            .unwrap_or_default();

        let extra: usize = fragments.iter().map(|f| f.text.len()).sum();
        let mut asm = Assembler::new(template.len() + extra, markers);
        let mut last = 0;
        for frag in &fragments {
            asm.text(&template[last..frag.start]);
            asm.slot(&frag.text, frag.width);
            last = frag.end;
        }
        asm.text(&template[last..]);

        Ok(asm.finish())
    }

    fn fragments(
        &self,
        template: &str,
        params: &Params,
        for_error_display: bool,
    ) -> TplResult<Vec<Fragment>> {
        placeholder_style(template)?;
        let placeholders = scan_placeholders(template);
        let mut fragments = Vec::with_capacity(placeholders.len());
        let mut numbering = SlotNumbering::new();

        match params {
            Params::None => {}
            Params::Positional(values) => {
                let positional: Vec<_> = placeholders
                    .iter()
                    .filter(|p| p.kind == PlaceholderKind::Positional)
                    .collect();
                if positional.len() > values.len() {
                    return Err(TplError::param_count(template, positional.len(), values.len()));
                }
                for (ph, value) in positional.into_iter().zip(values) {
                    fragments.push(Fragment {
                        start: ph.start,
                        end: ph.end,
                        text: self.render_value("?", value, for_error_display)?,
                        width: numbering.assign(ph.kind, ph.name, value).width(),
                    });
                }
            }
            Params::Named(values) => {
                for ph in placeholders.iter().filter(|p| p.kind == PlaceholderKind::Named) {
                    let Some(value) = values.get(ph.name) else {
                        continue;
                    };
                    fragments.push(Fragment {
                        start: ph.start,
                        end: ph.end,
                        text: self.render_value(&template[ph.start..ph.end], value, for_error_display)?,
                        width: numbering.assign(ph.kind, ph.name, value).width(),
                    });
                }
            }
        }

        Ok(fragments)
    }
}
