//! Driver quoting primitive.

use crate::value::Value;

/// Turns a value into a literal the database would accept verbatim.
///
/// The debug renderer takes this as an explicit capability so callers can plug
/// in the quoting rules of whatever connection produced the error.
pub trait Quoter {
    fn quote(&self, value: &Value) -> String;
}

impl<Q: Quoter + ?Sized> Quoter for &Q {
    fn quote(&self, value: &Value) -> String {
        (**self).quote(value)
    }
}

/// Postgres `quote_literal` rules (`standard_conforming_strings = on`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PgQuoter;

impl Quoter for PgQuoter {
    fn quote(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "'t'" } else { "'f'" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(f) => quote_text(&f.to_string()),
            Value::Text(s) => quote_text(s),
            Value::Literal(s) => s.clone(),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| self.quote(v)).collect();
                format!("({})", inner.join(", "))
            }
        }
    }
}

/// Quote a string literal, doubling `'` and, when present, escaping `\` with `E'...'`.
pub fn quote_text(s: &str) -> String {
    let has_backslash = s.contains('\\');
    let mut out = String::with_capacity(s.len() + 3);
    if has_backslash {
        out.push('E');
    }
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_scalars() {
        let q = PgQuoter;
        assert_eq!(q.quote(&Value::Null), "NULL");
        assert_eq!(q.quote(&Value::Int(-3)), "-3");
        assert_eq!(q.quote(&Value::Float(1.5)), "1.5");
        assert_eq!(q.quote(&Value::Bool(true)), "'t'");
        assert_eq!(q.quote(&Value::Text("it's".into())), "'it''s'");
    }

    #[test]
    fn backslashes_use_escape_string_syntax() {
        assert_eq!(quote_text(r"a\b"), r"E'a\\b'");
    }

    #[test]
    fn literals_pass_through() {
        assert_eq!(PgQuoter.quote(&Value::Literal("now()".into())), "now()");
    }

    #[test]
    fn non_finite_floats_are_quoted() {
        assert_eq!(PgQuoter.quote(&Value::Float(f64::INFINITY)), "'inf'");
    }
}
