//! Splitting raw message text into segment lines and fields, and reading the
//! declared message type out of the header.
//!
//! Only the field separator is interpreted. Component, repetition and escape
//! characters declared in `MSH-2` are left inside the raw field values.

use std::ops::Range;

/// Segment id of the message header.
pub const HEADER_SEGMENT: &str = "MSH";

/// The one delimiter this crate understands.
pub const FIELD_SEPARATOR: char = '|';

/// Token index (segment id at 0) holding the message type in the header.
pub const MESSAGE_TYPE_FIELD: usize = 8;

/// Iterate over every line of `text`, blank or not.
///
/// `\n`, `\r` and `\r\n` all end a line, so line numbers agree with what an
/// editor shows.
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find(['\r', '\n']) {
            Some(end) => {
                let next = if current[end..].starts_with("\r\n") {
                    end + 2
                } else {
                    end + 1
                };
                rest = Some(&current[next..]);
                Some(&current[..end])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Split a message into its segment lines, dropping blank and
/// whitespace-only lines.
///
/// Every line index used elsewhere in this crate is an index into this
/// filtered sequence.
pub fn split(text: &str) -> Vec<&str> {
    lines(text).filter(|line| !is_blank(line)).collect()
}

/// A retained segment line along with the editor line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLine<'t> {
    pub source_line: usize,
    pub text: &'t str,
}

/// Like [`split`], but remembers which editor line each segment sits on.
pub fn segment_lines(text: &str) -> Vec<SegmentLine<'_>> {
    lines(text)
        .enumerate()
        .filter(|(_, line)| !is_blank(line))
        .map(|(source_line, text)| SegmentLine { source_line, text })
        .collect()
}

/// Split a segment line on the field separator. Element 0 is the segment id.
pub fn fields(line: &str) -> Vec<&str> {
    line.split(FIELD_SEPARATOR).collect()
}

/// The leading token of a segment line, whatever it looks like.
pub fn segment_id(line: &str) -> &str {
    line.split_once(FIELD_SEPARATOR).map_or(line, |(id, _)| id)
}

/// Index of the first header line, if any.
pub fn header_index(lines: &[&str]) -> Option<usize> {
    lines
        .iter()
        .position(|line| segment_id(line) == HEADER_SEGMENT)
}

/// Read the declared message type from the first header line.
///
/// The raw token is returned verbatim (`ADT^A01`, `ADT^A01^ADT_A01`, ...) and
/// is used as the trigger event lookup key as-is. `None` when there is no
/// header, when the header is too short to carry `MSH-9`, or when `MSH-9` is
/// empty. Whitespace is a type like any other.
pub fn message_type<'t>(lines: &[&'t str]) -> Option<&'t str> {
    let header = lines[header_index(lines)?];
    header
        .split(FIELD_SEPARATOR)
        .nth(MESSAGE_TYPE_FIELD)
        .filter(|token| !token.is_empty())
}

/// Character ranges of every field in a line, segment id included.
pub fn field_spans(line: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut len = 0;
    for (i, c) in line.chars().enumerate() {
        if c == FIELD_SEPARATOR {
            spans.push(start..i);
            start = i + 1;
        }
        len = i + 1;
    }
    spans.push(start..len);
    spans
}

/// Position of the field containing character `column` (0 = segment id).
pub fn field_position_at(line: &str, column: usize) -> usize {
    line.chars()
        .take(column)
        .filter(|&c| c == FIELD_SEPARATOR)
        .count()
}

/// A (segment line, field position) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Index into the sequence returned by [`split`].
    pub line: usize,
    /// Index into the line's raw field sequence.
    pub field: usize,
}

/// Translate an editor position into a [`Cursor`].
///
/// Returns `None` on blank lines and past the end of the text.
pub fn locate(text: &str, source_line: usize, column: usize) -> Option<Cursor> {
    let mut index = 0;
    for (current, line) in lines(text).enumerate() {
        if current == source_line {
            if is_blank(line) {
                return None;
            }
            return Some(Cursor {
                line: index,
                field: field_position_at(line, column),
            });
        }
        if !is_blank(line) {
            index += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_dropped() {
        let text = "MSH|^~\\&\n\n   \nPID|1\r\n\t\nPV1|1\n";
        assert_eq!(split(text), vec!["MSH|^~\\&", "PID|1", "PV1|1"]);
    }

    #[test]
    fn empty_text_splits_to_nothing() {
        assert!(split("").is_empty());
        assert!(split("\n\r\n  \n").is_empty());
    }

    #[test]
    fn carriage_returns_end_segments() {
        let text = "MSH|a\rPID|b\r\nPV1|c";
        assert_eq!(split(text), vec!["MSH|a", "PID|b", "PV1|c"]);
        assert_eq!(lines(text).count(), 3);
    }

    #[test]
    fn segment_lines_keep_their_source_line() {
        let text = "MSH|a\n\nPID|b";
        let lines = segment_lines(text);
        assert_eq!(lines[0].source_line, 0);
        assert_eq!(lines[1].source_line, 2);
        assert_eq!(lines[1].text, "PID|b");
    }

    #[test]
    fn first_token_is_always_the_segment_id() {
        assert_eq!(segment_id("PID|1|2"), "PID");
        assert_eq!(segment_id("Z"), "Z");
        assert_eq!(segment_id("|x"), "");
        assert_eq!(segment_id("  PIDX  |1"), "  PIDX  ");
        assert_eq!(fields("PID|1||3"), vec!["PID", "1", "", "3"]);
    }

    #[test]
    fn message_type_is_the_ninth_token() {
        let lines = split("MSH|^~\\&|A|B|C|D|20230101120000||ADT^A01^ADT_A01|MSG1|P|2.5");
        assert_eq!(message_type(&lines), Some("ADT^A01^ADT_A01"));
    }

    #[test]
    fn message_type_needs_nine_tokens() {
        // eight tokens: MSH-9 is missing
        let lines = split("MSH|^~\\&|A|B|C|D|20230101120000|");
        assert_eq!(message_type(&lines), None);

        // exactly nine tokens
        let lines = split("MSH|^~\\&|A|B|C|D|20230101120000||ORU^R01");
        assert_eq!(message_type(&lines), Some("ORU^R01"));
    }

    #[test]
    fn message_type_uses_the_first_header() {
        let lines = split("PID|1\nMSH|1|2|3|4|5|6|7|ADT^A04\nMSH|1|2|3|4|5|6|7|ORU^R01");
        assert_eq!(message_type(&lines), Some("ADT^A04"));
        assert_eq!(header_index(&lines), Some(1));
    }

    #[test]
    fn empty_message_type_is_not_a_type() {
        let lines = split("MSH|^~\\&|A|B|C|D|20230101120000|||MSG1");
        assert_eq!(message_type(&lines), None);
    }

    #[test]
    fn whitespace_message_type_is_kept_verbatim() {
        let lines = split("MSH|^~\\&|A|B|C|D|20230101120000|| |MSG1");
        assert_eq!(message_type(&lines), Some(" "));
    }

    #[test]
    fn no_header_no_type() {
        assert_eq!(message_type(&split("PID|1|2|3|4|5|6|7|8|9")), None);
        assert_eq!(message_type(&[]), None);
    }

    #[test]
    fn can_compute_field_spans() {
        assert_eq!(field_spans("PID|1||abc"), vec![0..3, 4..5, 6..6, 7..10]);
        assert_eq!(field_spans(""), vec![0..0]);
        assert_eq!(field_spans("ÄBC|é"), vec![0..3, 4..5]);
    }

    #[test]
    fn can_locate_cursor() {
        let text = "MSH|^~\\&|A\n\nPID|1||SMITH";
        assert_eq!(locate(text, 0, 0), Some(Cursor { line: 0, field: 0 }));
        assert_eq!(locate(text, 0, 5), Some(Cursor { line: 0, field: 1 }));
        assert_eq!(locate(text, 1, 0), None);
        assert_eq!(locate(text, 2, 8), Some(Cursor { line: 1, field: 3 }));
        assert_eq!(locate(text, 2, 4), Some(Cursor { line: 1, field: 1 }));
        assert_eq!(locate(text, 7, 0), None);
    }
}
