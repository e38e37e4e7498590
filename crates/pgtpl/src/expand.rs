//! Array parameter expansion.
//!
//! Rewrites `IN (?)` / `IN (:name)` placeholders bound to a list into one
//! placeholder per element, so the driver only ever binds scalars.
//!
//! ```ignore
//! use pgtpl::{Params, expand};
//!
//! let (sql, params) = expand(
//!     "SELECT * FROM users WHERE id IN (:ids)",
//!     &Params::named([("ids", vec![1, 2, 3])]),
//! )?;
//! assert_eq!(sql, "SELECT * FROM users WHERE id IN (:ids__0, :ids__1, :ids__2)");
//! ```

use crate::error::{TplError, TplResult};
use crate::params::Params;
use crate::scan::{Placeholder, PlaceholderKind, placeholder_counts, placeholder_style, scan_placeholders};
use crate::value::Value;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Expand list-valued parameters into `IN (...)` lists.
///
/// Every list must be bound to a placeholder written as `IN (?)` / `IN (:name)`
/// (whitespace before `IN` required, case-insensitive). Booleans, inside and
/// outside lists, become `t` / `f`. An empty list expands to `IN (NULL)`.
///
/// [`Params::None`] returns the template untouched.
pub fn expand(template: &str, params: &Params) -> TplResult<(String, Params)> {
    placeholder_style(template)?;
    match params {
        Params::None => Ok((template.to_string(), Params::None)),
        Params::Positional(values) => expand_positional(template, values),
        Params::Named(values) => expand_named(template, values),
    }
}

/// Byte span of `<ws>IN ( <placeholder> )` around `ph`, if the placeholder sits in one.
fn in_list_span(template: &str, ph: &Placeholder<'_>) -> Option<(usize, usize)> {
    static BEFORE: OnceLock<Regex> = OnceLock::new();
    static AFTER: OnceLock<Regex> = OnceLock::new();

    let before = BEFORE
        .get_or_init(|| Regex::new(r"(?i)\sIN\s*\(\s*$").expect("invalid built-in IN regex"))
        .find(&template[..ph.start])?;
    let after = AFTER
        .get_or_init(|| Regex::new(r"^\s*\)").expect("invalid built-in IN regex"))
        .find(&template[ph.end..])?;

    Some((before.start(), ph.end + after.end()))
}

fn check_elements(name: &str, template: &str, items: &[Value]) -> TplResult<()> {
    if items.iter().any(Value::is_list) {
        return Err(TplError::nested_array(name, template));
    }
    Ok(())
}

fn expand_positional(template: &str, values: &[Value]) -> TplResult<(String, Params)> {
    let placeholders: Vec<_> = scan_placeholders(template)
        .into_iter()
        .filter(|p| p.kind == PlaceholderKind::Positional)
        .collect();
    if placeholders.len() != values.len() {
        return Err(TplError::param_count(template, placeholders.len(), values.len()));
    }

    let mut sql = String::with_capacity(template.len());
    let mut out = Vec::with_capacity(values.len());
    let mut last = 0;

    for (idx, (ph, value)) in placeholders.iter().zip(values).enumerate() {
        let Value::List(items) = value else {
            out.push(value.clone().normalize());
            continue;
        };

        let param = format!("#{}", idx + 1);
        check_elements(&param, template, items)?;
        let (start, end) =
            in_list_span(template, ph).ok_or_else(|| TplError::nested_array(&param, template))?;

        sql.push_str(&template[last..start]);
        sql.push_str(" IN (");
        if items.is_empty() {
            sql.push_str("NULL");
        } else {
            for i in 0..items.len() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push('?');
            }
        }
        sql.push(')');
        last = end;

        out.extend(items.iter().cloned().map(Value::normalize));
    }
    sql.push_str(&template[last..]);

    Ok((sql, Params::Positional(out)))
}

fn expand_named(template: &str, values: &BTreeMap<String, Value>) -> TplResult<(String, Params)> {
    let (_, names) = placeholder_counts(template);
    if names.len() != values.len() || names.iter().any(|n| !values.contains_key(*n)) {
        return Err(TplError::param_count(template, names.len(), values.len()));
    }

    let mut sql = String::with_capacity(template.len());
    let mut last = 0;

    for ph in scan_placeholders(template) {
        let Some(Value::List(items)) = values.get(ph.name) else {
            continue;
        };
        check_elements(ph.name, template, items)?;
        let (start, end) =
            in_list_span(template, &ph).ok_or_else(|| TplError::nested_array(ph.name, template))?;

        sql.push_str(&template[last..start]);
        sql.push_str(" IN (");
        if items.is_empty() {
            sql.push_str("NULL");
        } else {
            for i in 0..items.len() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push(':');
                sql.push_str(&element_name(ph.name, i));
            }
        }
        sql.push(')');
        last = end;
    }
    sql.push_str(&template[last..]);

    // A generated element name must not shadow another parameter.
    let mut out = BTreeMap::new();
    for (name, value) in values {
        match value {
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if out.insert(element_name(name, i), item.clone().normalize()).is_some() {
                        return Err(TplError::nested_array(name.as_str(), template));
                    }
                }
            }
            other => {
                if out.insert(name.clone(), other.clone().normalize()).is_some() {
                    return Err(TplError::nested_array(name.as_str(), template));
                }
            }
        }
    }

    Ok((sql, Params::Named(out)))
}

/// Name of the `i`-th element generated from list parameter `name`.
pub fn element_name(name: &str, i: usize) -> String {
    format!("{name}__{i}")
}
