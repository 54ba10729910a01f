//! Structural and schema checks over a whole message.

use crate::{
    message::{self, HEADER_SEGMENT},
    registry::{FieldDefinition, SchemaRegistry},
};
use serde::Serialize;
use std::fmt;
use tracing::instrument;

/// Field number reported for message type problems (`MSH-9`).
const MESSAGE_TYPE_POSITION: usize = 9;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of problem a [`ValidationError`] reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    EmptyMessage,
    MissingHeader,
    InvalidMessageType,
    UnknownMessageType,
    MissingSegment,
    UnknownSegment,
    MissingField,
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationCode::EmptyMessage => write!(f, "empty message"),
            ValidationCode::MissingHeader => write!(f, "missing header"),
            ValidationCode::InvalidMessageType => write!(f, "message type"),
            ValidationCode::UnknownMessageType => write!(f, "unknown message type"),
            ValidationCode::MissingSegment => write!(f, "required segment"),
            ValidationCode::UnknownSegment => write!(f, "unknown segment"),
            ValidationCode::MissingField => write!(f, "required field"),
        }
    }
}

/// One diagnostic produced by [`validate`].
///
/// `line` indexes the blank-filtered segment sequence and is 0 for message
/// level problems. `field` is 1-based, with 0 meaning the whole segment or
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub line: usize,
    pub segment: String,
    pub field: usize,
    pub message: String,
    pub severity: Severity,
    #[serde(skip)]
    pub code: ValidationCode,
}

impl ValidationError {
    pub fn error<S: Into<String>>(
        code: ValidationCode,
        line: usize,
        segment: S,
        field: usize,
        message: String,
    ) -> Self {
        ValidationError {
            line,
            segment: segment.into(),
            field,
            message,
            severity: Severity::Error,
            code,
        }
    }

    pub fn warning<S: Into<String>>(
        code: ValidationCode,
        line: usize,
        segment: S,
        field: usize,
        message: String,
    ) -> Self {
        ValidationError {
            severity: Severity::Warning,
            ..ValidationError::error(code, line, segment, field, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// A message is valid when none of its diagnostics is an error.
pub fn is_valid(errors: &[ValidationError]) -> bool {
    !errors.iter().any(ValidationError::is_error)
}

/// Check one field value against its definition.
///
/// Returns the diagnostic text when a required field is absent or blank.
pub(crate) fn check_field(
    segment_id: &str,
    position: usize,
    definition: &FieldDefinition,
    value: Option<&str>,
) -> Option<String> {
    let blank = value.map_or(true, |v| v.trim().is_empty());
    (definition.required && blank).then(|| {
        format!(
            "Required field {segment_id}-{position} ({}) is missing",
            definition.name
        )
    })
}

/// Validate a whole message against `registry`.
///
/// Structural problems (no segments, no header, no message type) end the
/// pass with a single error. Otherwise the result holds, in order: the
/// message type warning or missing required segments, then per-line unknown
/// segment warnings and missing required field errors.
#[instrument(level = "debug", skip_all, fields(length = text.len()))]
pub fn validate(text: &str, registry: &SchemaRegistry) -> Vec<ValidationError> {
    let lines = message::split(text);
    if lines.is_empty() {
        return vec![ValidationError::error(
            ValidationCode::EmptyMessage,
            0,
            "",
            0,
            "Empty message".to_string(),
        )];
    }

    if message::header_index(&lines).is_none() {
        return vec![ValidationError::error(
            ValidationCode::MissingHeader,
            0,
            "",
            0,
            format!("Missing {HEADER_SEGMENT} segment"),
        )];
    }

    let Some(message_type) = message::message_type(&lines) else {
        return vec![ValidationError::error(
            ValidationCode::InvalidMessageType,
            0,
            HEADER_SEGMENT,
            MESSAGE_TYPE_POSITION,
            "Invalid or missing message type".to_string(),
        )];
    };
    tracing::trace!(%message_type, "identified message type");

    let mut errors = Vec::new();
    match registry.trigger_event(message_type) {
        None => errors.push(ValidationError::warning(
            ValidationCode::UnknownMessageType,
            0,
            HEADER_SEGMENT,
            MESSAGE_TYPE_POSITION,
            format!("Unknown message type: {message_type}"),
        )),
        Some(event) => {
            for required in event.required_segments() {
                let present = lines
                    .iter()
                    .any(|line| message::segment_id(line) == required.as_str());
                if !present {
                    errors.push(ValidationError::error(
                        ValidationCode::MissingSegment,
                        0,
                        required.as_str(),
                        0,
                        format!("Required segment {required} is missing"),
                    ));
                }
            }
        }
    }

    for (index, line) in lines.iter().enumerate() {
        let fields = message::fields(line);
        let segment_id = fields[0];
        let Some(definition) = registry.segment(segment_id) else {
            errors.push(ValidationError::warning(
                ValidationCode::UnknownSegment,
                index,
                segment_id,
                0,
                format!("Unknown segment: {segment_id}"),
            ));
            continue;
        };

        for (i, field) in definition.fields.iter().enumerate() {
            let position = i + 1;
            let value = fields.get(position).copied();
            if let Some(message) = check_field(segment_id, position, field, value) {
                errors.push(ValidationError::error(
                    ValidationCode::MissingField,
                    index,
                    segment_id,
                    position,
                    message,
                ));
            }
        }
    }

    tracing::debug!(count = errors.len(), "validated message");
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{SegmentDefinition, TriggerEventDefinition};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn segment(id: &str, fields: Vec<FieldDefinition>) -> SegmentDefinition {
        SegmentDefinition {
            id: id.to_string(),
            name: format!("{id} segment"),
            description: String::new(),
            fields,
        }
    }

    /// MSH with no required fields, a PID with two required fields, and one
    /// trigger event requiring MSH, EVN, PID and PV1.
    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_segment(segment(
                "MSH",
                (0..12)
                    .map(|i| {
                        FieldDefinition::optional(
                            format!("Field {}", i + 1),
                            "ST".to_string(),
                            String::new(),
                        )
                    })
                    .collect(),
            ))
            .with_segment(segment("EVN", vec![]))
            .with_segment(segment(
                "PID",
                vec![
                    FieldDefinition::optional("Set ID", "SI", ""),
                    FieldDefinition::optional("Patient ID", "CX", ""),
                    FieldDefinition::required("Patient Identifier List", "CX", ""),
                    FieldDefinition::optional("Alternate Patient ID", "CX", ""),
                    FieldDefinition::required("Patient Name", "XPN", ""),
                ],
            ))
            .with_segment(segment("PV1", vec![]))
            .with_trigger_event(TriggerEventDefinition::new(
                "ADT^A01",
                "Admit",
                "",
                ids(&["MSH", "EVN", "PID", "PV1"]),
                ids(&["MSH", "EVN", "PID", "PV1"]),
            ))
    }

    const HEADER: &str = "MSH|^~\\&|A|B|C|D|20230101120000||ADT^A01|MSG1|P|2.5";

    #[test]
    fn empty_message_is_a_single_error() {
        assert_eq!(
            validate("", &registry()),
            vec![ValidationError {
                line: 0,
                segment: String::new(),
                field: 0,
                message: "Empty message".to_string(),
                severity: Severity::Error,
                code: ValidationCode::EmptyMessage,
            }]
        );
    }

    #[test]
    fn missing_header_stops_validation() {
        let errors = validate("PID|1||123||DOE^JOHN\nZZZ|1", &registry());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Missing MSH segment");
        assert_eq!(errors[0].segment, "");
        assert!(!is_valid(&errors));
    }

    #[test]
    fn short_header_has_no_message_type() {
        let errors = validate("MSH|^~\\&|A|B|C|D|20230101120000|\nPID|1", &registry());
        assert_eq!(
            errors,
            vec![ValidationError::error(
                ValidationCode::InvalidMessageType,
                0,
                "MSH",
                9,
                "Invalid or missing message type".to_string()
            )]
        );
    }

    #[test]
    fn missing_required_segments_follow_declared_order() {
        let errors = validate(HEADER, &registry());
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Required segment EVN is missing",
                "Required segment PID is missing",
                "Required segment PV1 is missing",
            ]
        );
        assert!(errors.iter().all(|e| e.line == 0 && e.field == 0));
        assert_eq!(errors[1].segment, "PID");
    }

    #[test]
    fn unknown_message_type_is_a_warning_and_skips_segment_checks() {
        let text = "MSH|^~\\&|A|B|C|D|20230101120000||ZZZ^Z99|MSG1|P|2.5\nPID|1||123||DOE^JOHN";
        let errors = validate(text, &registry());
        assert_eq!(
            errors,
            vec![ValidationError::warning(
                ValidationCode::UnknownMessageType,
                0,
                "MSH",
                9,
                "Unknown message type: ZZZ^Z99".to_string()
            )]
        );
        assert!(is_valid(&errors));
    }

    #[test]
    fn composite_message_type_is_looked_up_verbatim() {
        let text = "MSH|^~\\&|A|B|C|D|20230101120000||ADT^A01^ADT_A01|MSG1";
        let errors = validate(text, &registry());
        assert_eq!(errors[0].message, "Unknown message type: ADT^A01^ADT_A01");
    }

    #[test]
    fn whitespace_message_type_is_unknown_not_missing() {
        let text = "MSH|^~\\&|A|B|C|D|20230101120000|| |MSG1|P|2.5\nZZZ|1";
        let errors = validate(text, &registry());
        assert_eq!(
            errors,
            vec![
                ValidationError::warning(
                    ValidationCode::UnknownMessageType,
                    0,
                    "MSH",
                    9,
                    "Unknown message type:  ".to_string()
                ),
                ValidationError::warning(
                    ValidationCode::UnknownSegment,
                    1,
                    "ZZZ",
                    0,
                    "Unknown segment: ZZZ".to_string()
                ),
            ]
        );
        assert!(is_valid(&errors));
    }

    #[test]
    fn unknown_segments_warn_once_and_skip_field_checks() {
        let text = format!("{HEADER}\nEVN|\nPID|1||123||DOE\nPV1|1\nZPI|||");
        let errors = validate(&text, &registry());
        assert_eq!(
            errors,
            vec![ValidationError::warning(
                ValidationCode::UnknownSegment,
                4,
                "ZPI",
                0,
                "Unknown segment: ZPI".to_string()
            )]
        );
    }

    #[test]
    fn required_fields_must_be_non_blank() {
        let text = format!("{HEADER}\n\nEVN|\nPID|1||   \nPV1|1");
        let errors = validate(&text, &registry());
        assert_eq!(
            errors,
            vec![
                ValidationError::error(
                    ValidationCode::MissingField,
                    2,
                    "PID",
                    3,
                    "Required field PID-3 (Patient Identifier List) is missing".to_string()
                ),
                ValidationError::error(
                    ValidationCode::MissingField,
                    2,
                    "PID",
                    5,
                    "Required field PID-5 (Patient Name) is missing".to_string()
                ),
            ]
        );
    }

    #[test]
    fn message_level_problems_come_before_line_problems() {
        let text = format!("{HEADER}\nXYZ|1\nPID|1||123");
        let errors = validate(&text, &registry());
        let codes: Vec<ValidationCode> = errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ValidationCode::MissingSegment,
                ValidationCode::MissingSegment,
                ValidationCode::UnknownSegment,
                ValidationCode::MissingField,
            ]
        );
        assert_eq!(errors[2].line, 1);
        assert_eq!(errors[3].line, 2);
    }

    #[test]
    fn valid_message_has_no_diagnostics() {
        let text = format!("{HEADER}\r\nEVN|A01\r\nPID|1||123||DOE^JOHN\r\nPV1|1|I\r\n");
        let errors = validate(&text, &registry());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(is_valid(&errors));
    }

    #[test]
    fn severities_serialise_as_literal_strings() {
        let errors = validate("", &registry());
        let json = serde_json::to_value(&errors).expect("can serialise diagnostics");
        assert_eq!(
            json,
            serde_json::json!([{
                "line": 0,
                "segment": "",
                "field": 0,
                "message": "Empty message",
                "severity": "error"
            }])
        );
        assert_eq!(Severity::Warning.to_string(), "warning");
    }

    proptest! {
        #[test]
        fn blank_input_is_always_an_empty_message(text in "[ \t\r\n]{0,40}") {
            let errors = validate(&text, &registry());
            prop_assert_eq!(errors.len(), 1);
            prop_assert_eq!(errors[0].message.as_str(), "Empty message");
        }

        #[test]
        fn headerless_input_is_always_missing_msh(
            lines in prop::collection::vec("[A-Z]{2,4}(\\|[a-z0-9 ]{0,5}){0,5}", 1..6)
        ) {
            prop_assume!(!lines.iter().any(|line| message::segment_id(line) == HEADER_SEGMENT));
            let errors = validate(&lines.join("\n"), &registry());
            prop_assert_eq!(errors.len(), 1);
            prop_assert_eq!(errors[0].message.as_str(), "Missing MSH segment");
        }

        #[test]
        fn validation_is_idempotent(text in "[A-Z0-9|^ \r\n]{0,200}") {
            let registry = SchemaRegistry::fallback();
            prop_assert_eq!(validate(&text, &registry), validate(&text, &registry));
        }
    }
}
