use color_eyre::Result;
use hl7_check::message::{self, SegmentLine};
use lsp_server::{RequestId, Response, ResponseError};
use lsp_types::{Position, Range};
use serde::Serialize;

fn position(line: usize, character: usize) -> Position {
    Position {
        line: line as u32,
        character: character as u32,
    }
}

/// The whole of a segment line.
pub fn line_range(line: &SegmentLine<'_>) -> Range {
    Range {
        start: position(line.source_line, 0),
        end: position(line.source_line, line.text.chars().count()),
    }
}

/// The raw field at `field` of a segment line, or an empty range at the end
/// of the line when the line is shorter than that.
pub fn field_range(line: &SegmentLine<'_>, field: usize) -> Range {
    let span = message::field_spans(line.text)
        .into_iter()
        .nth(field)
        .unwrap_or_else(|| {
            let end = line.text.chars().count();
            end..end
        });
    Range {
        start: position(line.source_line, span.start),
        end: position(line.source_line, span.end),
    }
}

pub fn build_response<R: Serialize>(id: RequestId, result: Result<R>) -> Response {
    let result = result.and_then(|result| Ok(serde_json::to_value(result)?));
    let (result, error) = match result {
        Ok(result) => (Some(result), None),
        Err(error) => (
            None,
            Some(ResponseError {
                code: lsp_server::ErrorCode::InternalError as i32,
                message: error.to_string(),
                data: None,
            }),
        ),
    };

    Response { id, result, error }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_calculate_field_ranges() {
        let lines = message::segment_lines("MSH|^~\\&\r\n\r\nPID|1||12345");
        let pid = &lines[1];

        assert_eq!(
            field_range(pid, 3),
            Range {
                start: Position { line: 2, character: 7 },
                end: Position { line: 2, character: 12 },
            }
        );
        assert_eq!(
            field_range(pid, 2),
            Range {
                start: Position { line: 2, character: 6 },
                end: Position { line: 2, character: 6 },
            }
        );
    }

    #[test]
    fn missing_fields_sit_at_the_end_of_the_line() {
        let lines = message::segment_lines("PV1|1");
        assert_eq!(
            field_range(&lines[0], 7),
            Range {
                start: Position { line: 0, character: 5 },
                end: Position { line: 0, character: 5 },
            }
        );
        assert_eq!(
            line_range(&lines[0]),
            Range {
                start: Position { line: 0, character: 0 },
                end: Position { line: 0, character: 5 },
            }
        );
    }

    #[test]
    fn errors_become_error_responses() {
        let response = build_response::<()>(
            RequestId::from(7),
            Err(color_eyre::eyre::eyre!("no document")),
        );
        assert!(response.result.is_none());
        let error = response.error.expect("response carries an error");
        assert_eq!(error.message, "no document");
    }
}
