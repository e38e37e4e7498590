use crate::error::{TplError, TplResult};
use crate::params::Params;
use crate::scan::{PlaceholderKind, placeholder_counts, placeholder_style, scan_placeholders};
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// A statement ready for `tokio-postgres`: `$n` placeholders plus their values.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub params: Vec<Value>,
    /// Character width of each placeholder replacement in `sql`, in template order.
    pub slot_widths: Vec<usize>,
}

impl Compiled {
    /// Parameter references in the shape `tokio-postgres` expects.
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

/// What a placeholder turns into in the executed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot<'v> {
    /// Raw SQL written in place.
    Inline(&'v str),
    /// `$n`; `fresh` is set the first time `n` is handed out.
    Param { n: usize, fresh: bool },
}

impl Slot<'_> {
    /// Characters the slot occupies in the executed statement.
    pub(crate) fn width(&self) -> usize {
        match self {
            Slot::Inline(raw) => raw.chars().count(),
            Slot::Param { n, .. } => 1 + n.to_string().len(),
        }
    }
}

/// Hands out `$n` numbers the way [`compile`] emits them.
///
/// Positional placeholders get consecutive numbers, a name keeps the number of
/// its first appearance, and literals take no number.
#[derive(Debug, Default)]
pub(crate) struct SlotNumbering<'t> {
    next: usize,
    names: Vec<(&'t str, usize)>,
}

impl<'t> SlotNumbering<'t> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn assign<'v>(
        &mut self,
        kind: PlaceholderKind,
        name: &'t str,
        value: &'v Value,
    ) -> Slot<'v> {
        if let Value::Literal(raw) = value {
            return Slot::Inline(raw);
        }
        if kind == PlaceholderKind::Named {
            if let Some((_, n)) = self.names.iter().find(|(known, _)| *known == name) {
                return Slot::Param { n: *n, fresh: false };
            }
        }
        self.next += 1;
        if kind == PlaceholderKind::Named {
            self.names.push((name, self.next));
        }
        Slot::Param {
            n: self.next,
            fresh: true,
        }
    }
}

/// Number the placeholders of an expanded template as `$1, $2, ...`.
///
/// Positional placeholders are numbered in order. Each distinct `:name` gets
/// one number, assigned in order of first appearance, and is reused for later
/// occurrences. [`Value::Literal`] values are written into the SQL verbatim
/// instead of being bound. [`Params::None`] leaves the SQL untouched.
///
/// The bound values must match the placeholders exactly: one value per `?`,
/// or one entry per distinct `:name` with no extras.
///
/// Lists must have been expanded first (see [`crate::expand`]).
pub fn compile(template: &str, params: &Params) -> TplResult<Compiled> {
    placeholder_style(template)?;

    if matches!(params, Params::None) {
        return Ok(Compiled {
            sql: template.to_string(),
            params: Vec::new(),
            slot_widths: Vec::new(),
        });
    }

    let placeholders = scan_placeholders(template);
    match params {
        Params::Positional(values) if placeholders.len() != values.len() => {
            return Err(TplError::param_count(template, placeholders.len(), values.len()));
        }
        Params::Named(named) => {
            let (_, names) = placeholder_counts(template);
            if names.len() != named.len() || names.iter().any(|n| !named.contains_key(*n)) {
                return Err(TplError::param_count(template, names.len(), named.len()));
            }
        }
        _ => {}
    }

    let mut sql = String::with_capacity(template.len());
    let mut bound: Vec<Value> = Vec::new();
    let mut slot_widths = Vec::with_capacity(placeholders.len());
    let mut numbering = SlotNumbering::new();
    let mut last = 0;

    for (idx, ph) in placeholders.iter().enumerate() {
        sql.push_str(&template[last..ph.start]);
        last = ph.end;

        let value: &Value = match (ph.kind, params) {
            (PlaceholderKind::Positional, Params::Positional(values)) => &values[idx],
            (PlaceholderKind::Named, Params::Named(named)) if named.contains_key(ph.name) => {
                &named[ph.name]
            }
            _ => {
                return Err(TplError::param_count(template, placeholders.len(), params.len()));
            }
        };
        if value.is_list() {
            return Err(TplError::unsupported(
                "list",
                format!(
                    "list bound to `{}` must be expanded before execution",
                    &template[ph.start..ph.end]
                ),
            ));
        }

        let slot = numbering.assign(ph.kind, ph.name, value);
        slot_widths.push(slot.width());
        match slot {
            Slot::Inline(raw) => sql.push_str(raw),
            Slot::Param { n, fresh } => {
                if fresh {
                    bound.push(value.clone());
                }
                sql.push('$');
                sql.push_str(&n.to_string());
            }
        }
    }
    sql.push_str(&template[last..]);

    Ok(Compiled {
        sql,
        params: bound,
        slot_widths,
    })
}
