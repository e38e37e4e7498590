use regex::Regex;
use std::sync::OnceLock;

/// Locate the failing span reported in a driver message.
///
/// Returns `(start, end)` as 0-based character offsets, taken from
/// `at character N` (1-based) and the length of the first `"token"` in the
/// message (or `default_len`). `None` when the message carries no offset.
pub(crate) fn error_span(message: &str, default_len: usize) -> Option<(usize, usize)> {
    static AT_CHARACTER: OnceLock<Regex> = OnceLock::new();
    static QUOTED_TOKEN: OnceLock<Regex> = OnceLock::new();

    let at = AT_CHARACTER
        .get_or_init(|| Regex::new(r"at character (\d+)").expect("invalid built-in offset regex"))
        .captures(message)?;
    let position: usize = at[1].parse().ok()?;
    let start = position.saturating_sub(1);

    let len = QUOTED_TOKEN
        .get_or_init(|| Regex::new(r#""([^"]+)""#).expect("invalid built-in token regex"))
        .captures(message)
        .map(|c| c[1].chars().count())
        .unwrap_or(default_len);

    Some((start, start.saturating_add(len)))
}

/// Single-pass output builder.
///
/// Walks the template once, emitting literal text, rendered fragments and the
/// error markers at their character positions. Each fragment advances the
/// column by the width its placeholder has in the executed statement. A marker
/// that would land inside a slot is emitted just before it.
pub(crate) struct Assembler<'a> {
    out: String,
    col: usize,
    markers: Vec<(usize, &'a str)>,
    next: usize,
}

impl<'a> Assembler<'a> {
    pub(crate) fn new(capacity: usize, markers: Vec<(usize, &'a str)>) -> Self {
        Self {
            out: String::with_capacity(capacity),
            col: 0,
            markers,
            next: 0,
        }
    }

    fn flush_markers_before(&mut self, col: usize) {
        while let Some((at, marker)) = self.markers.get(self.next) {
            if *at >= col {
                break;
            }
            self.out.push_str(marker);
            self.next += 1;
        }
    }

    pub(crate) fn text(&mut self, text: &str) {
        for ch in text.chars() {
            self.flush_markers_before(self.col + 1);
            self.out.push(ch);
            self.col += 1;
        }
    }

    pub(crate) fn slot(&mut self, rendered: &str, width: usize) {
        self.flush_markers_before(self.col + width);
        self.out.push_str(rendered);
        self.col += width;
    }

    pub(crate) fn finish(mut self) -> String {
        for (_, marker) in &self.markers[self.next..] {
            self.out.push_str(marker);
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offset_and_token() {
        let msg = r#"syntax error at or near "FORM" at character 10"#;
        assert_eq!(error_span(msg, 5), Some((9, 13)));
    }

    #[test]
    fn falls_back_to_default_length() {
        assert_eq!(error_span("boom at character 1", 5), Some((0, 5)));
    }

    #[test]
    fn no_offset_means_no_span() {
        assert_eq!(error_span(r#"relation "x" does not exist"#, 5), None);
    }

    #[test]
    fn huge_offset_saturates() {
        let msg = "boom at character 18446744073709551615";
        assert_eq!(error_span(msg, 5), Some((usize::MAX - 1, usize::MAX)));
    }

    #[test]
    fn wide_slots_shift_later_markers() {
        let mut asm = Assembler::new(16, vec![(6, "["), (7, "]")]);
        asm.text("a ");
        asm.slot("7", 3);
        asm.text(" xyz");
        // "a $10 xyz": col 6 is `x`.
        assert_eq!(asm.finish(), "a 7 [x]yz");
    }

    #[test]
    fn markers_never_split_a_slot() {
        let mut asm = Assembler::new(16, vec![(3, "["), (4, "]")]);
        asm.text("ab ");
        asm.slot("42", 2);
        let out = asm.finish();
        // col 3 is the start of the slot, col 4 is inside it.
        assert_eq!(out, "ab []42");
    }

    #[test]
    fn trailing_markers_are_appended() {
        let mut asm = Assembler::new(8, vec![(2, "<"), (50, ">")]);
        asm.text("abcd");
        assert_eq!(asm.finish(), "ab<cd>");
    }
}
