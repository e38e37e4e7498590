//! Placeholder scanner.
//!
//! Finds `?` and `:name` placeholders in a query template. String literals,
//! quoted identifiers, dollar-quoted bodies, comments and `::` casts are
//! skipped, so `'?'`, `"a:b"` and `x::text` are never treated as placeholders.

use crate::error::{TplError, TplResult};

/// The two placeholder styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// `?`
    Positional,
    /// `:name`
    Named,
}

/// One placeholder occurrence. `start..end` is the byte span in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub kind: PlaceholderKind,
    /// Name without the leading `:`; empty for positional placeholders.
    pub name: &'a str,
    pub start: usize,
    pub end: usize,
}

#[inline]
fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// Scan `sql` and return every placeholder in source order.
pub fn scan_placeholders(sql: &str) -> Vec<Placeholder<'_>> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                // E'...' strings honour backslash escapes.
                let escapes = i > 0
                    && matches!(bytes[i - 1], b'E' | b'e')
                    && (i < 2 || !is_word(bytes[i - 2]));
                i = skip_quoted(bytes, i, b'\'', escapes);
            }
            b'"' => i = skip_quoted(bytes, i, b'"', false),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = match sql[i..].find('\n') {
                    Some(off) => i + off + 1,
                    None => bytes.len(),
                };
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'$' => i = skip_dollar_quoted(sql, i),
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            b':' => {
                let preceded_by_word = i > 0 && is_word(bytes[i - 1]);
                let starts_name = bytes
                    .get(i + 1)
                    .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_');
                if preceded_by_word || !starts_name {
                    i += 1;
                    continue;
                }
                let mut end = i + 1;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                out.push(Placeholder {
                    kind: PlaceholderKind::Named,
                    name: &sql[i + 1..end],
                    start: i,
                    end,
                });
                i = end;
            }
            b'?' => {
                out.push(Placeholder {
                    kind: PlaceholderKind::Positional,
                    name: "",
                    start: i,
                    end: i + 1,
                });
                i += 1;
            }
            _ => i += 1,
        }
    }

    out
}

/// Determine the placeholder style of a template.
///
/// Returns `Ok(None)` when there are no placeholders and
/// [`TplError::MixedPlaceholders`] when both styles appear.
pub fn placeholder_style(sql: &str) -> TplResult<Option<PlaceholderKind>> {
    let mut style = None;
    for ph in scan_placeholders(sql) {
        match style {
            None => style = Some(ph.kind),
            Some(kind) if kind != ph.kind => {
                return Err(TplError::MixedPlaceholders {
                    template: sql.to_string(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(style)
}

fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'/' && bytes[i + 1] == b'*' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

fn skip_dollar_quoted(sql: &str, start: usize) -> usize {
    let bytes = sql.as_bytes();
    if start > 0 && is_word(bytes[start - 1]) {
        return start + 1;
    }
    // $tag$ where tag is empty or an identifier not starting with a digit.
    let mut end = start + 1;
    if bytes.get(end).is_some_and(|b| b.is_ascii_digit()) {
        return start + 1;
    }
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    if bytes.get(end) != Some(&b'$') {
        return start + 1;
    }
    let tag = &sql[start..=end];
    match sql[end + 1..].find(tag) {
        Some(off) => end + 1 + off + tag.len(),
        None => bytes.len(),
    }
}

/// Count placeholders of each kind: `(positional, distinct named)`.
pub fn placeholder_counts(sql: &str) -> (usize, Vec<&str>) {
    let mut positional = 0;
    let mut names: Vec<&str> = Vec::new();
    for ph in scan_placeholders(sql) {
        match ph.kind {
            PlaceholderKind::Positional => positional += 1,
            PlaceholderKind::Named => {
                if !names.contains(&ph.name) {
                    names.push(ph.name);
                }
            }
        }
    }
    (positional, names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sql: &str) -> Vec<&str> {
        scan_placeholders(sql)
            .into_iter()
            .filter(|p| p.kind == PlaceholderKind::Named)
            .map(|p| p.name)
            .collect()
    }

    #[test]
    fn finds_positional_in_order() {
        let found = scan_placeholders("SELECT ? , ?");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].start, 7);
        assert_eq!(found[1].start, 11);
    }

    #[test]
    fn finds_named_as_whole_words() {
        assert_eq!(names("a = :id AND b = :id2 AND c IN (:id,:id)"), vec!["id", "id2", "id", "id"]);
    }

    #[test]
    fn skips_casts_and_slices() {
        assert!(names("SELECT x::text, arr[1:n], arr[lo:hi]").is_empty());
        assert_eq!(names("SELECT :v::int"), vec!["v"]);
    }

    #[test]
    fn skips_literals_identifiers_and_comments() {
        let sql = "SELECT '?', \"a:b\", E'\\'?' -- ?\n /* :x ? */ FROM t WHERE a = ?";
        let found = scan_placeholders(sql);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PlaceholderKind::Positional);
        assert_eq!(found[0].start, sql.len() - 1);
    }

    #[test]
    fn skips_dollar_quoted_bodies() {
        let sql = "SELECT $body$ ? :x $body$, $$?$$, ?";
        let found = scan_placeholders(sql);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, sql.len() - 1);
    }

    #[test]
    fn pg_numbered_params_are_not_dollar_quotes() {
        assert_eq!(scan_placeholders("SELECT $1, ?").len(), 1);
    }

    #[test]
    fn style_detection() {
        assert_eq!(placeholder_style("SELECT 1").unwrap(), None);
        assert_eq!(placeholder_style("a = ?").unwrap(), Some(PlaceholderKind::Positional));
        assert_eq!(placeholder_style("a = :a").unwrap(), Some(PlaceholderKind::Named));
        assert!(matches!(
            placeholder_style("a = ? AND b = :b"),
            Err(TplError::MixedPlaceholders { .. })
        ));
    }

    #[test]
    fn counts_distinct_names() {
        let (pos, named) = placeholder_counts(":a + :b + :a");
        assert_eq!(pos, 0);
        assert_eq!(named, vec!["a", "b"]);
    }
}
