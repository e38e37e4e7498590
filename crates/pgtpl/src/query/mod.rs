//! Template execution.
//!
//! A [`TemplateQuery`] holds a template and its bound values. Executing it
//! expands list values, numbers placeholders for `tokio-postgres`, runs the
//! statement through a [`GenericClient`] and, on a database error, attaches a
//! debug rendering of the failing query.
//!
//! ```ignore
//! use pgtpl::template;
//!
//! let users = template("SELECT * FROM users WHERE id IN (:ids) AND status = :status")
//!     .bind_named("ids", vec![1, 2, 3])
//!     .bind_named("status", "active")
//!     .fetch_all(&client)
//!     .await?;
//! ```

mod compile;
mod handler;


pub use compile::{Compiled, compile};
pub(crate) use compile::SlotNumbering;
#[cfg(feature = "tracing")]
pub use handler::TracingErrorHandler;
pub use handler::{ErrorAction, ErrorHandler, PropagateHandler};

use crate::client::GenericClient;
use crate::error::{DriverError, TplError, TplResult};
use crate::expand::expand;
use crate::params::Params;
use crate::quote::PgQuoter;
use crate::render::{DebugRenderer, RenderConfig};
use crate::reshape::{FormatSpec, Record, Reshaped, reshape_with};
use crate::value::Value;
use std::sync::Arc;
use tokio_postgres::Row;

/// Start a query from a template using `?` or `:name` placeholders.
pub fn template(sql: impl Into<String>) -> TemplateQuery {
    TemplateQuery::new(sql)
}

/// A template plus bound values, ready to run against a [`GenericClient`].
#[derive(Clone)]
pub struct TemplateQuery {
    template: String,
    params: Params,
    mixed: bool,
    tag: Option<String>,
    handler: Option<Arc<dyn ErrorHandler>>,
    render: RenderConfig,
}

impl std::fmt::Debug for TemplateQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateQuery")
            .field("template", &self.template)
            .field("params", &self.params)
            .field("tag", &self.tag)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl TemplateQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            template: sql.into(),
            params: Params::None,
            mixed: false,
            tag: None,
            handler: None,
            render: RenderConfig::default(),
        }
    }

    /// Bind the next positional (`?`) value.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        if self.params.push(value).is_err() {
            self.mixed = true;
        }
        self
    }

    /// Bind a named (`:name`) value.
    pub fn bind_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if self.params.insert(name, value).is_err() {
            self.mixed = true;
        }
        self
    }

    /// Replace all bound values.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self.mixed = false;
        self
    }

    /// Label the query in logs.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Install a handler consulted on database errors.
    pub fn on_error(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Configure how the debug SQL attached to errors is rendered.
    pub fn render_config(mut self, config: RenderConfig) -> Self {
        self.render = config;
        self
    }

    pub fn template_sql(&self) -> &str {
        &self.template
    }

    pub fn bound(&self) -> &Params {
        &self.params
    }

    /// Expand lists and number placeholders without executing.
    ///
    /// Returns the expanded template, its parameters and the compiled statement.
    pub fn prepare(&self) -> TplResult<(String, Params, Compiled)> {
        if self.mixed {
            return Err(TplError::MixedPlaceholders {
                template: self.template.clone(),
            });
        }
        let (expanded, params) = expand(&self.template, &self.params)?;
        let compiled = compile(&expanded, &params)?;
        Ok((expanded, params, compiled))
    }

    /// Debug rendering of this query with its values substituted.
    pub fn debug_sql(&self) -> TplResult<String> {
        let (expanded, params) = expand(&self.template, &self.params)?;
        self.renderer().render(&expanded, &params, None)
    }

    /// Execute and decode every row.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> TplResult<Vec<Record>> {
        let rows = self.query_rows(conn).await?;
        rows.iter().map(Record::from_pg_row).collect()
    }

    /// Execute and decode the first row, if any.
    pub async fn fetch_opt(&self, conn: &impl GenericClient) -> TplResult<Option<Record>> {
        let rows = self.query_rows(conn).await?;
        rows.first().map(Record::from_pg_row).transpose()
    }

    /// Execute and return the first column of the first row.
    pub async fn fetch_scalar(&self, conn: &impl GenericClient) -> TplResult<Option<Value>> {
        let record = self.fetch_opt(conn).await?;
        Ok(record.and_then(|r| r.into_values().into_iter().next()))
    }

    /// Execute and return the first column of every row.
    pub async fn fetch_column(&self, conn: &impl GenericClient) -> TplResult<Vec<Value>> {
        let rows = self.fetch_all(conn).await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.into_values().into_iter().next())
            .collect())
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&self, conn: &impl GenericClient) -> TplResult<u64> {
        let (expanded, params, compiled) = self.prepare()?;
        self.log(&compiled);
        match conn.execute(&compiled.sql, &compiled.param_refs()).await {
            Ok(n) => Ok(n),
            Err(e) => self.on_failure(e, &expanded, params).map(|()| 0),
        }
    }

    /// Execute and fold the rows into a nested structure (see [`crate::reshape`]).
    ///
    /// The format is validated before the query runs.
    pub async fn fetch_grouped(
        &self,
        conn: &impl GenericClient,
        format: &str,
        keep_key_columns: bool,
    ) -> TplResult<Reshaped> {
        let spec = FormatSpec::parse(format)?;
        let rows = self.query_rows(conn).await?;
        reshape_with(rows.iter(), &spec, keep_key_columns)
    }

    async fn query_rows(&self, conn: &impl GenericClient) -> TplResult<Vec<Row>> {
        let (expanded, params, compiled) = self.prepare()?;
        self.log(&compiled);
        match conn.query(&compiled.sql, &compiled.param_refs()).await {
            Ok(rows) => Ok(rows),
            Err(e) => self.on_failure(e, &expanded, params).map(|()| Vec::new()),
        }
    }

    fn renderer(&self) -> DebugRenderer<PgQuoter> {
        DebugRenderer::new(PgQuoter).with_config(self.render.clone())
    }

    /// Turn a driver failure into [`TplError::Driver`], or recover if the handler says so.
    fn on_failure(&self, err: TplError, expanded: &str, params: Params) -> TplResult<()> {
        let TplError::Query(pg) = err else {
            return Err(err);
        };
        let Some(driver) = DriverError::from_db_error(&pg) else {
            return Err(TplError::Query(pg));
        };

        let debug_sql = self
            .renderer()
            .render(expanded, &params, Some(&driver.highlight_message()))
            .unwrap_or_else(|_| expanded.to_string());

        let handler: &dyn ErrorHandler = match self.handler.as_deref() {
            Some(h) => h,
            None => &PropagateHandler,
        };
        match handler.handle(&driver, &debug_sql) {
            ErrorAction::Recover => Ok(()),
            ErrorAction::Propagate => Err(TplError::Driver {
                error: driver,
                debug_sql,
                params,
            }),
        }
    }

    #[cfg(feature = "tracing")]
    fn log(&self, compiled: &Compiled) {
        let tag = self.tag.as_deref().unwrap_or("-");
        let sql = match compiled.sql.len() {
            len if len > LOG_SQL_LENGTH => {
                format!("{}...", truncate_sql_bytes(&compiled.sql, LOG_SQL_LENGTH))
            }
            _ => compiled.sql.clone(),
        };
        tracing::debug!(
            target: "pgtpl.sql",
            tag,
            param_count = compiled.params.len(),
            sql = %sql,
        );
    }

    #[cfg(not(feature = "tracing"))]
    fn log(&self, _compiled: &Compiled) {}
}

#[cfg(feature = "tracing")]
const LOG_SQL_LENGTH: usize = 200;

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
