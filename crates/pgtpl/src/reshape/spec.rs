use crate::error::{TplError, TplResult};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// One bracket group of a format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// `[column]`: a keyed level, last value wins.
    Field(String),
    /// `[]`: a list level, rows are appended.
    Append,
}

/// Right-hand side of a format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSpec {
    /// `*`: the whole row as a mapping.
    Wildcard,
    /// `col`: a single scalar.
    Column(String),
    /// `a;b;c`: a mapping restricted to these columns, in this order.
    Columns(Vec<String>),
}

/// A parsed grouping format: `key[seg][seg]...=>columns`.
///
/// ```ignore
/// let spec: FormatSpec = "id[type][]=>value;price".parse()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub key_field: String,
    pub nested_path: Vec<PathSegment>,
    pub value_spec: ValueSpec,
}

impl FormatSpec {
    /// Parse a format string.
    pub fn parse(format: &str) -> TplResult<Self> {
        static GRAMMAR: OnceLock<Regex> = OnceLock::new();
        static SEGMENT: OnceLock<Regex> = OnceLock::new();

        let caps = GRAMMAR
            .get_or_init(|| {
                Regex::new(r"^([^=\[\]]+)((?:\[[^\[\]]*\])*)=>(.+)$")
                    .expect("invalid built-in format regex")
            })
            .captures(format.trim())
            .ok_or_else(|| TplError::invalid_format(format, "expected `key[...]=>columns`"))?;

        let key_field = caps[1].trim();
        if key_field.is_empty() {
            return Err(TplError::invalid_format(format, "empty key field"));
        }

        let nested_path = SEGMENT
            .get_or_init(|| Regex::new(r"\[([^\]]*)\]").expect("invalid built-in segment regex"))
            .captures_iter(&caps[2])
            .map(|c| match c[1].trim() {
                "" => PathSegment::Append,
                name => PathSegment::Field(name.to_string()),
            })
            .collect();

        let columns = caps[3].trim();
        let value_spec = if columns == "*" {
            ValueSpec::Wildcard
        } else {
            let names: Vec<String> = columns.split(';').map(|c| c.trim().to_string()).collect();
            if names.iter().any(|c| c.is_empty()) {
                return Err(TplError::invalid_format(format, "empty column name"));
            }
            if names.iter().any(|c| c == "*") {
                return Err(TplError::invalid_format(format, "`*` cannot be combined with columns"));
            }
            match <[String; 1]>::try_from(names) {
                Ok([single]) => ValueSpec::Column(single),
                Err(names) => ValueSpec::Columns(names),
            }
        };

        Ok(Self {
            key_field: key_field.to_string(),
            nested_path,
            value_spec,
        })
    }

    /// Whether `column` is the key field or a keyed nesting field.
    pub fn is_key_column(&self, column: &str) -> bool {
        self.key_field == column
            || self
                .nested_path
                .iter()
                .any(|seg| matches!(seg, PathSegment::Field(f) if f == column))
    }

    /// Nesting depth of the reshaped result (`1 + path length`).
    pub fn depth(&self) -> usize {
        1 + self.nested_path.len()
    }
}

impl FromStr for FormatSpec {
    type Err = TplError;

    fn from_str(s: &str) -> TplResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_field)?;
        for seg in &self.nested_path {
            match seg {
                PathSegment::Field(name) => write!(f, "[{name}]")?,
                PathSegment::Append => f.write_str("[]")?,
            }
        }
        f.write_str("=>")?;
        match &self.value_spec {
            ValueSpec::Wildcard => f.write_str("*"),
            ValueSpec::Column(c) => f.write_str(c),
            ValueSpec::Columns(cs) => f.write_str(&cs.join(";")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_forms() {
        let s = FormatSpec::parse("id=>value").unwrap();
        assert_eq!(s.key_field, "id");
        assert!(s.nested_path.is_empty());
        assert_eq!(s.value_spec, ValueSpec::Column("value".into()));

        let s = FormatSpec::parse("id=>*").unwrap();
        assert_eq!(s.value_spec, ValueSpec::Wildcard);

        let s = FormatSpec::parse("id => value ; type").unwrap();
        assert_eq!(s.value_spec, ValueSpec::Columns(vec!["value".into(), "type".into()]));
    }

    #[test]
    fn parses_nested_path() {
        let s: FormatSpec = "a[b][][c]=>*".parse().unwrap();
        assert_eq!(
            s.nested_path,
            vec![
                PathSegment::Field("b".into()),
                PathSegment::Append,
                PathSegment::Field("c".into())
            ]
        );
        assert_eq!(s.depth(), 4);
        assert!(s.is_key_column("a"));
        assert!(s.is_key_column("c"));
        assert!(!s.is_key_column("d"));
    }

    #[test]
    fn display_round_trips() {
        for f in ["id=>value", "id[]=>a;b", "id[type][]=>*"] {
            assert_eq!(FormatSpec::parse(f).unwrap().to_string(), f);
        }
    }

    #[test]
    fn rejects_malformed() {
        for f in ["", "id", "=>value", "id[=>x", "id[a]b=>x", "id=>", "id=>a;;b", "id=>a;*"] {
            let err = FormatSpec::parse(f).unwrap_err();
            assert!(err.is_invalid_format(), "{f:?} should be rejected");
        }
    }
}
