//! Bound values.
//!
//! [`Value`] is the dynamic value model shared by the debug renderer, the
//! array expander and the result reshaper. It binds directly to
//! `tokio-postgres` through [`ToSql`].

use crate::error::{TplError, TplResult};
use crate::quote::Quoter;
use crate::scan::{PlaceholderKind, scan_placeholders};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, WrongType};
use uuid::Uuid;

/// A single bound value (or a list of them, for `IN (...)` expansion).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Raw SQL text rendered verbatim and inlined instead of bound.
    Literal(String),
    /// A sequence; only valid as the value of an `IN (...)` placeholder.
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Literal(_) => "literal",
            Value::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Booleans become the single-character flags `t` / `f`.
    pub fn normalize(self) -> Value {
        match self {
            Value::Bool(b) => Value::Text(if b { "t" } else { "f" }.to_string()),
            other => other,
        }
    }

    /// String form used for grouping keys in reshaped results.
    pub fn key_string(&self) -> TplResult<String> {
        match self {
            Value::Null => Ok(String::new()),
            Value::Bool(b) => Ok(if *b { "t" } else { "f" }.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Text(s) | Value::Literal(s) => Ok(s.clone()),
            Value::List(_) => Err(TplError::unsupported(
                "list",
                "a list cannot be used as a grouping key",
            )),
        }
    }

    /// Convert into JSON for reshaped output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) | Value::Literal(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => f.write_str(if *b { "t" } else { "f" }),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) | Value::Literal(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Build a [`Value::Literal`] from raw SQL, replacing each `?` with a quoted value.
///
/// ```ignore
/// let v = pgtpl::literal("now() - interval ?", ["1 day"], &PgQuoter)?;
/// ```
pub fn literal<I, V>(sql: &str, params: I, quoter: &impl Quoter) -> TplResult<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let mut params = params.into_iter().map(Into::into);
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    let mut used = 0;

    for ph in scan_placeholders(sql) {
        if ph.kind != PlaceholderKind::Positional {
            continue;
        }
        let Some(value) = params.next() else {
            return Err(TplError::param_count(sql, used + 1, used));
        };
        if value.is_list() {
            return Err(TplError::unsupported("list", "lists cannot be quoted into a literal"));
        }
        out.push_str(&sql[last..ph.start]);
        out.push_str(&quoter.quote(&value));
        last = ph.end;
        used += 1;
    }
    out.push_str(&sql[last..]);

    Ok(Value::Literal(out))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = TplError;

    fn try_from(v: serde_json::Value) -> TplResult<Self> {
        match v {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| TplError::unsupported("number", format!("{n} is out of range"))),
            },
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<TplResult<Vec<_>>>()
                .map(Value::List),
            serde_json::Value::Object(_) => Err(TplError::unsupported(
                "object",
                "JSON objects cannot be bound as a value",
            )),
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "t" | "true" | "1" | "y" | "yes" | "on" => Some(true),
        "f" | "false" | "0" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn is_textual(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty)
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::default())))
}

/// Offset-less input is taken as UTC.
fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| parse_timestamp(s).map(|t| t.and_utc()))
}

fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
}

fn parse_numeric(s: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s))
}

fn mismatch(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Int(_) => "integer",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Literal(_) => "literal",
        Value::List(_) => "list",
    };
    format!("cannot bind a {kind} value to a parameter of type {ty}").into()
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::JSON | Type::JSONB => self.to_json().to_sql(ty, out),
                _ if is_textual(ty) => (if *b { "t" } else { "f" }).to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                Type::JSON | Type::JSONB => self.to_json().to_sql(ty, out),
                _ if is_textual(ty) => i.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => self.to_json().to_sql(ty, out),
                _ if is_textual(ty) => f.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Text(s) => {
                let t = s.trim();
                match *ty {
                    Type::BOOL => match parse_flag(t) {
                        Some(b) => b.to_sql(ty, out),
                        None => Err(format!("cannot bind {s:?} as boolean").into()),
                    },
                    Type::INT2 => t.parse::<i16>()?.to_sql(ty, out),
                    Type::INT4 => t.parse::<i32>()?.to_sql(ty, out),
                    Type::INT8 => t.parse::<i64>()?.to_sql(ty, out),
                    Type::OID => t.parse::<u32>()?.to_sql(ty, out),
                    Type::FLOAT4 => t.parse::<f32>()?.to_sql(ty, out),
                    Type::FLOAT8 => t.parse::<f64>()?.to_sql(ty, out),
                    Type::NUMERIC => parse_numeric(t)?.to_sql(ty, out),
                    Type::DATE => NaiveDate::parse_from_str(t, "%Y-%m-%d")?.to_sql(ty, out),
                    Type::TIMESTAMP => parse_timestamp(t)?.to_sql(ty, out),
                    Type::TIMESTAMPTZ => parse_timestamptz(t)?.to_sql(ty, out),
                    Type::TIME => parse_time(t)?.to_sql(ty, out),
                    Type::UUID => Uuid::parse_str(t)?.to_sql(ty, out),
                    Type::JSON | Type::JSONB => {
                        serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                    }
                    _ if is_textual(ty) => s.as_str().to_sql(ty, out),
                    _ if matches!(ty.kind(), Kind::Enum(_)) => {
                        out.extend_from_slice(s.as_bytes());
                        Ok(IsNull::No)
                    }
                    _ => Err(mismatch(self, ty)),
                }
            }
            Value::Literal(_) => Err("literal values are inlined into the SQL, not bound".into()),
            Value::List(_) => Err("list values must be expanded before binding".into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::OID
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::NUMERIC
                | Type::DATE
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::TIME
                | Type::UUID
                | Type::JSON
                | Type::JSONB
        ) || is_textual(ty)
            || matches!(ty.kind(), Kind::Enum(_))
    }

    /// `NULL` binds to any parameter type; everything else is checked against
    /// [`ToSql::accepts`] first.
    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if let Value::Null = self {
            return Ok(IsNull::Yes);
        }
        if !<Self as ToSql>::accepts(ty) {
            return Err(Box::new(WrongType::new::<Self>(ty.clone())));
        }
        self.to_sql(ty, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::PgQuoter;
    use tokio_postgres::types::FromSql;

    #[test]
    fn normalize_turns_bools_into_flags() {
        assert_eq!(Value::Bool(true).normalize(), Value::Text("t".into()));
        assert_eq!(Value::Bool(false).normalize(), Value::Text("f".into()));
        assert_eq!(Value::Int(3).normalize(), Value::Int(3));
    }

    #[test]
    fn key_string_forms() {
        assert_eq!(Value::Int(5).key_string().unwrap(), "5");
        assert_eq!(Value::Null.key_string().unwrap(), "");
        assert_eq!(Value::Bool(true).key_string().unwrap(), "t");
        assert!(Value::List(vec![]).key_string().is_err());
    }

    #[test]
    fn from_json_rejects_objects() {
        let v = Value::try_from(serde_json::json!([1, "a", null, 1.5])).unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Int(1),
                Value::Text("a".into()),
                Value::Null,
                Value::Float(1.5)
            ])
        );

        let err = Value::try_from(serde_json::json!({"a": 1})).unwrap_err();
        assert!(matches!(err, TplError::UnsupportedValueKind { kind: "object", .. }));
    }

    #[test]
    fn literal_quotes_params() {
        let v = literal("lower(?) || ?", ["O'Neil", "x"], &PgQuoter).unwrap();
        assert_eq!(v, Value::Literal("lower('O''Neil') || 'x'".into()));
    }

    #[test]
    fn literal_without_params_is_verbatim() {
        let v = literal("DEFAULT", Vec::<Value>::new(), &PgQuoter).unwrap();
        assert_eq!(v, Value::Literal("DEFAULT".into()));
    }

    #[test]
    fn literal_with_missing_param_fails() {
        let err = literal("? + ?", [1], &PgQuoter).unwrap_err();
        assert!(err.is_param_count_mismatch());
    }

    #[test]
    fn binds_int_to_int4() {
        let mut buf = BytesMut::new();
        let is_null = Value::Int(7).to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&buf[..], &7_i32.to_be_bytes());
    }

    #[test]
    fn binds_flag_to_bool() {
        let mut buf = BytesMut::new();
        Value::Text("t".into()).to_sql(&Type::BOOL, &mut buf).unwrap();
        assert_eq!(&buf[..], &[1]);
    }

    fn bind(value: Value, ty: &Type) -> Result<BytesMut, Box<dyn Error + Sync + Send>> {
        let mut buf = BytesMut::new();
        value.to_sql_checked(ty, &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn binds_numbers_to_numeric() {
        let buf = bind(Value::Int(42), &Type::NUMERIC).unwrap();
        assert_eq!(Decimal::from_sql(&Type::NUMERIC, &buf).unwrap(), Decimal::from(42));

        let buf = bind(Value::Float(2.5), &Type::NUMERIC).unwrap();
        assert_eq!(Decimal::from_sql(&Type::NUMERIC, &buf).unwrap(), Decimal::new(25, 1));

        let buf = bind(Value::Text("12.340".into()), &Type::NUMERIC).unwrap();
        assert_eq!(Decimal::from_sql(&Type::NUMERIC, &buf).unwrap().to_string(), "12.340");

        let buf = bind(Value::Text("1e3".into()), &Type::NUMERIC).unwrap();
        assert_eq!(Decimal::from_sql(&Type::NUMERIC, &buf).unwrap(), Decimal::from(1000));
    }

    #[test]
    fn binds_int_to_int8_and_float8() {
        let buf = bind(Value::Int(1 << 40), &Type::INT8).unwrap();
        assert_eq!(i64::from_sql(&Type::INT8, &buf).unwrap(), 1 << 40);

        let buf = bind(Value::Int(3), &Type::FLOAT8).unwrap();
        assert_eq!(f64::from_sql(&Type::FLOAT8, &buf).unwrap(), 3.0);
    }

    #[test]
    fn binds_text_to_temporal_types() {
        let buf = bind(Value::Text("2024-02-29".into()), &Type::DATE).unwrap();
        assert_eq!(
            NaiveDate::from_sql(&Type::DATE, &buf).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );

        let buf = bind(Value::Text("2024-02-29 12:30:00".into()), &Type::TIMESTAMP).unwrap();
        let ts = NaiveDateTime::from_sql(&Type::TIMESTAMP, &buf).unwrap();
        assert_eq!(ts.to_string(), "2024-02-29 12:30:00");

        let buf = bind(Value::Text("2024-02-29T12:30:00+02:00".into()), &Type::TIMESTAMPTZ).unwrap();
        let ts = DateTime::<Utc>::from_sql(&Type::TIMESTAMPTZ, &buf).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-02-29T10:30:00+00:00");

        let buf = bind(Value::Text("2024-02-29 12:30:00".into()), &Type::TIMESTAMPTZ).unwrap();
        let ts = DateTime::<Utc>::from_sql(&Type::TIMESTAMPTZ, &buf).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-02-29T12:30:00+00:00");

        let buf = bind(Value::Text("12:30:15".into()), &Type::TIME).unwrap();
        assert_eq!(
            NaiveTime::from_sql(&Type::TIME, &buf).unwrap(),
            NaiveTime::from_hms_opt(12, 30, 15).unwrap()
        );
    }

    #[test]
    fn binds_text_to_uuid_and_json() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let buf = bind(Value::Text(id.into()), &Type::UUID).unwrap();
        assert_eq!(Uuid::from_sql(&Type::UUID, &buf).unwrap().to_string(), id);

        let buf = bind(Value::Text(r#"{"a": [1, 2]}"#.into()), &Type::JSONB).unwrap();
        assert_eq!(
            serde_json::Value::from_sql(&Type::JSONB, &buf).unwrap(),
            serde_json::json!({"a": [1, 2]})
        );

        let buf = bind(Value::Int(5), &Type::JSON).unwrap();
        assert_eq!(serde_json::Value::from_sql(&Type::JSON, &buf).unwrap(), serde_json::json!(5));
    }

    #[test]
    fn binds_scalars_to_text() {
        let buf = bind(Value::Int(5), &Type::VARCHAR).unwrap();
        assert_eq!(&buf[..], b"5");

        let buf = bind(Value::Bool(true), &Type::TEXT).unwrap();
        assert_eq!(&buf[..], b"t");
    }

    #[test]
    fn rejects_mismatched_types() {
        assert!(bind(Value::Int(1), &Type::UUID).is_err());
        assert!(bind(Value::Bool(true), &Type::INT4).is_err());
        assert!(bind(Value::Float(1.5), &Type::INT4).is_err());
        assert!(bind(Value::Float(1.5), &Type::DATE).is_err());
        assert!(bind(Value::Text("not a date".into()), &Type::DATE).is_err());
        assert!(bind(Value::Text("nope".into()), &Type::UUID).is_err());
        assert!(bind(Value::Text("{".into()), &Type::JSONB).is_err());
        assert!(bind(Value::Int(70_000), &Type::INT2).is_err());
    }

    #[test]
    fn unsupported_types_are_refused_before_encoding() {
        assert!(!<Value as ToSql>::accepts(&Type::BYTEA));
        let err = bind(Value::Int(1), &Type::BYTEA).unwrap_err();
        assert!(err.is::<WrongType>());

        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql_checked(&Type::BYTEA, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn refuses_to_bind_lists() {
        let mut buf = BytesMut::new();
        assert!(Value::List(vec![]).to_sql(&Type::INT4, &mut buf).is_err());
    }
}
