//! # pgtpl
//!
//! Parameterized SQL templates and result reshaping for Postgres.
//!
//! ## Features
//!
//! - **Templates**: write SQL with `?` or `:name` placeholders and bind dynamic [`Value`]s
//! - **List expansion**: `IN (?)` / `IN (:ids)` bound to a list becomes one placeholder per element
//! - **Debug rendering**: reconstruct a query with its values for logs, highlighting the token a
//!   database error points at
//! - **Reshaping**: fold flat rows into nested maps with a compact format such as `id[type][]=>*`
//! - **Transaction-friendly**: run templates on anything implementing [`GenericClient`]
//!
//! ## Executing templates
//!
//! ```ignore
//! use pgtpl::template;
//!
//! let by_kind = template("SELECT id, type, value FROM zoo WHERE id IN (?)")
//!     .bind(vec![5, 6])
//!     .fetch_grouped(&client, "id[type][]=>value", false)
//!     .await?;
//! // {"5": {"fruit": ["apple"], "mammal": ["cat", "rhino"]}, "6": {"fruit": ["pear"]}}
//! ```
//!
//! ## Without a database
//!
//! ```ignore
//! use pgtpl::{Params, expand, render_debug_query, reshape};
//!
//! let (sql, params) = expand("SELECT * FROM t WHERE id IN (?)", &Params::positional([vec![1, 2]]))?;
//! let shown = render_debug_query(&sql, &params, None)?;
//! assert_eq!(shown, "SELECT * FROM t WHERE id IN (1, 2)");
//! ```

pub mod client;
pub mod error;
pub mod expand;
pub mod params;
pub mod query;
pub mod quote;
pub mod render;
pub mod reshape;
pub mod scan;
pub mod value;

pub use client::GenericClient;
pub use error::{DriverError, TplError, TplResult};
pub use expand::{element_name, expand};
pub use params::Params;
#[cfg(feature = "tracing")]
pub use query::TracingErrorHandler;
pub use query::{
    Compiled, ErrorAction, ErrorHandler, PropagateHandler, TemplateQuery, compile, template,
};
pub use quote::{PgQuoter, Quoter, quote_text};
pub use render::{DebugRenderer, RenderConfig, render_debug_query};
pub use reshape::{FormatSpec, PathSegment, Record, Reshaped, RowLike, ValueSpec, reshape, reshape_with};
pub use scan::{Placeholder, PlaceholderKind};
pub use value::{Value, literal};
