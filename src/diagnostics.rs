use crate::utils::{field_range, line_range};
use hl7_check::{
    message::{self, SegmentLine, HEADER_SEGMENT, MESSAGE_TYPE_FIELD},
    validation::{Severity, ValidationCode, ValidationError},
};
use lsp_server::{Connection, Message, Notification};
use lsp_types::{
    notification::Notification as _, Diagnostic, DiagnosticSeverity, NumberOrString, Range, Uri,
};

fn severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    }
}

/// Where in the editor a diagnostic belongs.
///
/// Line problems point at the offending field (or the whole line for the
/// segment itself); message problems point at the header, or at its message
/// type field when that is what's wrong.
fn diagnostic_range(lines: &[SegmentLine<'_>], error: &ValidationError) -> Range {
    let header = lines
        .iter()
        .find(|line| message::segment_id(line.text) == HEADER_SEGMENT);

    match error.code {
        ValidationCode::EmptyMessage => Range::default(),
        ValidationCode::MissingHeader => lines.first().map(line_range).unwrap_or_default(),
        ValidationCode::InvalidMessageType | ValidationCode::UnknownMessageType => header
            .map(|header| {
                if message::fields(header.text).len() > MESSAGE_TYPE_FIELD {
                    field_range(header, MESSAGE_TYPE_FIELD)
                } else {
                    line_range(header)
                }
            })
            .unwrap_or_default(),
        ValidationCode::MissingSegment => header.map(line_range).unwrap_or_default(),
        ValidationCode::UnknownSegment | ValidationCode::MissingField => lines
            .get(error.line)
            .map(|line| match error.field {
                0 => line_range(line),
                field => field_range(line, field),
            })
            .unwrap_or_default(),
    }
}

pub fn to_diagnostics(text: &str, errors: &[ValidationError]) -> Vec<Diagnostic> {
    let lines = message::segment_lines(text);
    errors
        .iter()
        .map(|error| Diagnostic {
            range: diagnostic_range(&lines, error),
            severity: Some(severity(error.severity)),
            code: Some(NumberOrString::String(error.code.to_string())),
            source: Some(env!("CARGO_PKG_NAME").to_string()),
            message: error.message.clone(),
            ..Default::default()
        })
        .collect()
}

pub fn clear_diagnostics(connection: &Connection, uri: Uri) {
    publish_diagnostics(connection, uri, Vec::new(), None);
}

pub fn publish_diagnostics(
    connection: &Connection,
    uri: Uri,
    diagnostics: Vec<Diagnostic>,
    version: Option<i32>,
) {
    let publish_diagnostics = lsp_types::PublishDiagnosticsParams {
        uri,
        diagnostics,
        version,
    };
    if let Err(e) = connection
        .sender
        .send(Message::Notification(Notification::new(
            lsp_types::notification::PublishDiagnostics::METHOD.to_string(),
            publish_diagnostics,
        )))
    {
        tracing::error!("Failed to send diagnostics: {e:?}");
    }
}
