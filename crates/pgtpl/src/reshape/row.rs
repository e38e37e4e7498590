//! Row access for the reshaper.

use crate::error::{TplError, TplResult};
use crate::value::Value;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

/// A result row: named columns in result order.
pub trait RowLike {
    /// Column names in result order.
    fn column_names(&self) -> Vec<&str>;

    /// Value of `column`. Fails with [`TplError::Decode`] when it is missing.
    fn value_of(&self, column: &str) -> TplResult<Value>;
}

impl<R: RowLike + ?Sized> RowLike for &R {
    fn column_names(&self) -> Vec<&str> {
        (**self).column_names()
    }

    fn value_of(&self, column: &str) -> TplResult<Value> {
        (**self).value_of(column)
    }
}

/// An owned row of `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column (builder style).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Append a column, replacing the value if the column already exists.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some((_, v)) => *v = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// The first column's value, if any.
    pub fn first(&self) -> Option<&Value> {
        self.fields.first().map(|(_, v)| v)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.fields.into_iter().map(|(_, v)| v).collect()
    }

    /// JSON object with columns in result order.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(c, v)| (c.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Decode every column of a `tokio_postgres` row.
    pub fn from_pg_row(row: &Row) -> TplResult<Self> {
        let fields = (0..row.len())
            .map(|idx| Ok((row.columns()[idx].name().to_string(), decode_column(row, idx)?)))
            .collect::<TplResult<Vec<_>>>()?;
        Ok(Self { fields })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.push(k, v);
        }
        record
    }
}

impl TryFrom<serde_json::Value> for Record {
    type Error = TplError;

    fn try_from(v: serde_json::Value) -> TplResult<Self> {
        let serde_json::Value::Object(map) = v else {
            return Err(TplError::unsupported("row", "each row must be a JSON object"));
        };
        let mut record = Record::new();
        for (column, value) in map {
            record.push(column, Value::try_from(value)?);
        }
        Ok(record)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl RowLike for Record {
    fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(c, _)| c.as_str()).collect()
    }

    fn value_of(&self, column: &str) -> TplResult<Value> {
        self.get(column)
            .cloned()
            .ok_or_else(|| TplError::decode(column, "column not found in row"))
    }
}

impl RowLike for Row {
    fn column_names(&self) -> Vec<&str> {
        self.columns().iter().map(|c| c.name()).collect()
    }

    fn value_of(&self, column: &str) -> TplResult<Value> {
        let idx = self
            .columns()
            .iter()
            .position(|c| c.name() == column)
            .ok_or_else(|| TplError::decode(column, "column not found in row"))?;
        decode_column(self, idx)
    }
}

/// Decode one column of a `tokio_postgres` row by its Postgres type.
pub(crate) fn decode_column(row: &Row, idx: usize) -> TplResult<Value> {
    let column = &row.columns()[idx];
    let name = column.name();
    let err = |e: tokio_postgres::Error| TplError::decode(name, e.to_string());

    let value = match *column.type_() {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(err)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(err)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(err)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(err)?.into(),
        Type::OID => row.try_get::<_, Option<u32>>(idx).map_err(err)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(err)?.into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(err)?.into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx).map_err(err)?.into()
        }
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(err)?
            .map(|j| j.to_string())
            .into(),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(idx)
            .map_err(err)?
            .map(|u| u.to_string())
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(err)?
            .map(|t| t.to_rfc3339())
            .into(),
        Type::TIMESTAMP => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .map_err(err)?
            .map(|t| t.to_string())
            .into(),
        Type::DATE => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)
            .map_err(err)?
            .map(|d| d.to_string())
            .into(),
        Type::TIME => row
            .try_get::<_, Option<chrono::NaiveTime>>(idx)
            .map_err(err)?
            .map(|t| t.to_string())
            .into(),
        Type::BOOL_ARRAY => row.try_get::<_, Option<Vec<bool>>>(idx).map_err(err)?.into(),
        Type::INT2_ARRAY => row.try_get::<_, Option<Vec<i16>>>(idx).map_err(err)?.into(),
        Type::INT4_ARRAY => row.try_get::<_, Option<Vec<i32>>>(idx).map_err(err)?.into(),
        Type::INT8_ARRAY => row.try_get::<_, Option<Vec<i64>>>(idx).map_err(err)?.into(),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => {
            row.try_get::<_, Option<Vec<String>>>(idx).map_err(err)?.into()
        }
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)
            .map_err(err)?
            .map(|d| d.to_string())
            .into(),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map_err(err)?
            .map(|b| hex_text(&b))
            .into(),
        Type::INET => row
            .try_get::<_, Option<cidr::IpInet>>(idx)
            .map_err(err)?
            .map(|inet| {
                let max = if inet.address().is_ipv4() { 32 } else { 128 };
                if inet.network_length() == max {
                    inet.address().to_string()
                } else {
                    format!("{}/{}", inet.address(), inet.network_length())
                }
            })
            .into(),
        Type::CIDR => row
            .try_get::<_, Option<cidr::IpCidr>>(idx)
            .map_err(err)?
            .map(|c| format!("{}/{}", c.first_address(), c.network_length()))
            .into(),
        ref other => row
            .try_get::<_, Option<RawColumn>>(idx)
            .map_err(err)?
            .map(|raw| raw_text(other, raw.0))
            .into(),
    };

    Ok(value)
}

/// Undecoded column bytes, accepted for any type.
struct RawColumn<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawColumn<'a> {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawColumn(raw))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn hex_text(bytes: &[u8]) -> String {
    format!("\\x{}", hex::encode(bytes))
}

/// Text form of a column type without a dedicated decoder.
///
/// Intervals use the server's default output style. Enums and other types
/// whose binary form is their text come through as-is; anything else is
/// shown as hex.
fn raw_text(ty: &Type, raw: &[u8]) -> String {
    if *ty == Type::INTERVAL {
        if let Ok(bytes) = <[u8; 16]>::try_from(raw) {
            let micros = i64::from_be_bytes(bytes[0..8].try_into().unwrap_or_default());
            let days = i32::from_be_bytes(bytes[8..12].try_into().unwrap_or_default());
            let months = i32::from_be_bytes(bytes[12..16].try_into().unwrap_or_default());
            return interval_text(months, days, micros);
        }
    }
    match std::str::from_utf8(raw) {
        Ok(text) if !text.chars().any(|c| c.is_control() && !c.is_whitespace()) => text.to_string(),
        _ => hex_text(raw),
    }
}

fn interval_text(months: i32, days: i32, micros: i64) -> String {
    let unit = |n: i32, name: &str| (n != 0).then(|| format!("{n} {name}{}", if n == 1 { "" } else { "s" }));

    let mut parts: Vec<String> = [
        unit(months / 12, "year"),
        unit(months % 12, "mon"),
        unit(days, "day"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let us = micros.unsigned_abs();
        let secs = us / 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let frac = us % 1_000_000;
        if frac != 0 {
            time.push('.');
            time.push_str(format!("{frac:06}").trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}
