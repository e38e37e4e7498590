//! Result reshaping.
//!
//! Folds a flat row stream into a nested keyed structure described by a
//! compact format string:
//!
//! | format              | result                                        |
//! |---------------------|-----------------------------------------------|
//! | `id=>value`         | `{id: value}`                                 |
//! | `id=>value;type`    | `{id: {value, type}}`                         |
//! | `id=>*`             | `{id: {every other column}}`                  |
//! | `id[]=>*`           | `{id: [{...}, {...}]}` (rows appended)        |
//! | `id[type]=>value`   | `{id: {type: value}}` (last row wins)         |
//! | `id[type][]=>value` | `{id: {type: [value, ...]}}`                  |
//!
//! Rows are folded in delivery order; for duplicate keys the last row wins.

mod row;
mod spec;


pub use row::{Record, RowLike};
pub use spec::{FormatSpec, PathSegment, ValueSpec};

use crate::error::TplResult;
use serde_json::{Map, Value as Json};

/// A reshaped result: insertion-ordered keys mapping to nested maps, lists or leaves.
pub type Reshaped = Map<String, Json>;

/// Parse `format` and fold `rows` into a nested structure.
///
/// Zero rows produce an empty map.
pub fn reshape<R, I>(rows: I, format: &str, keep_key_columns: bool) -> TplResult<Reshaped>
where
    R: RowLike,
    I: IntoIterator<Item = R>,
{
    let spec = FormatSpec::parse(format)?;
    reshape_with(rows, &spec, keep_key_columns)
}

/// Fold `rows` into a nested structure described by an already parsed `spec`.
///
/// With `keep_key_columns == false`, a wildcard leaf drops the key field and
/// every keyed nesting field.
pub fn reshape_with<R, I>(rows: I, spec: &FormatSpec, keep_key_columns: bool) -> TplResult<Reshaped>
where
    R: RowLike,
    I: IntoIterator<Item = R>,
{
    let mut result = Reshaped::new();
    for row in rows {
        fold_row(&mut result, &row, spec, keep_key_columns)?;
    }
    Ok(result)
}

fn leaf<R: RowLike>(row: &R, spec: &FormatSpec, keep_key_columns: bool) -> TplResult<Json> {
    match &spec.value_spec {
        ValueSpec::Column(column) => Ok(row.value_of(column)?.to_json()),
        ValueSpec::Columns(columns) => {
            let mut map = Map::new();
            for column in columns {
                map.insert(column.clone(), row.value_of(column)?.to_json());
            }
            Ok(Json::Object(map))
        }
        ValueSpec::Wildcard => {
            let mut map = Map::new();
            for column in row.column_names() {
                if !keep_key_columns && spec.is_key_column(column) {
                    continue;
                }
                map.insert(column.to_string(), row.value_of(column)?.to_json());
            }
            Ok(Json::Object(map))
        }
    }
}

fn ensure_object(v: &mut Json) -> &mut Map<String, Json> {
    if !v.is_object() {
        *v = Json::Object(Map::new());
    }
    v.as_object_mut().expect("value was just made an object")
}

fn ensure_array(v: &mut Json) -> &mut Vec<Json> {
    if !v.is_array() {
        *v = Json::Array(Vec::new());
    }
    v.as_array_mut().expect("value was just made an array")
}

fn fold_row<R: RowLike>(
    result: &mut Reshaped,
    row: &R,
    spec: &FormatSpec,
    keep_key_columns: bool,
) -> TplResult<()> {
    let key = row.value_of(&spec.key_field)?.key_string()?;
    let leaf = leaf(row, spec, keep_key_columns)?;

    if spec.nested_path.is_empty() {
        result.insert(key, leaf);
        return Ok(());
    }

    let mut cont = result.entry(key).or_insert(Json::Null);
    for segment in &spec.nested_path {
        cont = match segment {
            PathSegment::Field(field) => {
                let key = row.value_of(field)?.key_string()?;
                ensure_object(cont).entry(key).or_insert(Json::Null)
            }
            PathSegment::Append => {
                let list = ensure_array(cont);
                list.push(Json::Null);
                list.last_mut().expect("just pushed")
            }
        };
    }
    *cont = leaf;

    Ok(())
}
