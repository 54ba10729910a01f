use hl7_check::{
    field_info::inspect,
    is_valid, message_type,
    registry::{FieldDefinition, SegmentDefinition, TriggerEventDefinition},
    split, validate, SchemaRegistry, Severity, ValidationError,
};
use pretty_assertions::assert_eq;

const HEADER_ONLY: &str = "MSH|^~\\&|A|B|C|D|20230101120000||ADT^A01|MSG1|P|2.5";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn segment(id: &str, name: &str, fields: Vec<FieldDefinition>) -> SegmentDefinition {
    SegmentDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        fields,
    }
}

/// A registry whose MSH only requires fields the sample header fills in, and
/// whose ADT^A01 requires MSH, EVN, PID and PV1.
fn admit_registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_segment(segment(
            "MSH",
            "Message Header",
            vec![
                FieldDefinition::required("Encoding Characters", "ST", ""),
                FieldDefinition::optional("Sending Application", "HD", ""),
                FieldDefinition::optional("Sending Facility", "HD", ""),
                FieldDefinition::optional("Receiving Application", "HD", ""),
                FieldDefinition::optional("Receiving Facility", "HD", ""),
                FieldDefinition::required("Date/Time of Message", "TS", ""),
                FieldDefinition::optional("Security", "ST", ""),
                FieldDefinition::required("Message Type", "MSG", ""),
            ],
        ))
        .with_segment(segment("EVN", "Event Type", vec![]))
        .with_segment(segment(
            "PID",
            "Patient Identification",
            vec![
                FieldDefinition::optional("Set ID", "SI", ""),
                FieldDefinition::optional("Patient ID", "CX", ""),
                FieldDefinition::required("Patient Identifier List", "CX", ""),
            ],
        ))
        .with_segment(segment("PV1", "Patient Visit", vec![]))
        .with_trigger_event(TriggerEventDefinition::new(
            "ADT^A01",
            "Admit/Visit Notification",
            "",
            strings(&["MSH", "EVN", "PID", "PV1"]),
            strings(&["MSH", "EVN", "PID", "PV1"]),
        ))
}

#[test]
fn header_only_admit_is_missing_three_segments() {
    let errors = validate(HEADER_ONLY, &admit_registry());
    assert_eq!(
        errors,
        ["EVN", "PID", "PV1"]
            .into_iter()
            .map(|id| ValidationError::error(
                hl7_check::validation::ValidationCode::MissingSegment,
                0,
                id,
                0,
                format!("Required segment {id} is missing"),
            ))
            .collect::<Vec<_>>()
    );
    assert!(!is_valid(&errors));
}

#[test]
fn empty_text_is_an_empty_message() {
    let json = serde_json::to_value(validate("", &admit_registry())).expect("can serialise");
    assert_eq!(
        json,
        serde_json::json!([
            {"line": 0, "segment": "", "field": 0, "message": "Empty message", "severity": "error"}
        ])
    );
}

#[test]
fn complete_admit_is_valid() {
    let text = format!("{HEADER_ONLY}\r\nEVN|A01\r\n\r\nPID|1||12345\r\nPV1|1|I\r\n");
    assert_eq!(split(&text).len(), 4);
    assert_eq!(message_type(&split(&text)), Some("ADT^A01"));
    let errors = validate(&text, &admit_registry());
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn warnings_do_not_affect_validity() {
    let text = format!("{HEADER_ONLY}\nEVN|A01\nPID|1||12345\nPV1|1|I\nZPI|custom");
    let errors = validate(&text, &admit_registry());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].severity, Severity::Warning);
    assert_eq!(errors[0].line, 4);
    assert!(is_valid(&errors));
}

#[test]
fn inspection_agrees_with_validation() {
    let text = format!("{HEADER_ONLY}\nEVN|A01\nPID|1||  \nPV1|1|I");
    let registry = admit_registry();

    let error = validate(&text, &registry)
        .into_iter()
        .find(|e| e.segment == "PID")
        .expect("PID-3 is blank");
    let info = inspect(&text, error.line, error.field, &registry).expect("PID-3 resolves");

    assert!(!info.is_valid);
    assert_eq!(info.validation_message.as_deref(), Some(error.message.as_str()));
}

#[test]
fn fallback_registry_validates_a_realistic_admit() {
    let text = "MSH|^~\\&|SENDER|FAC|RECEIVER|FAC|20230101120000||ADT^A01^ADT_A01|MSG00001|P|2.5.1\r\
                EVN|A01|20230101120000\r\
                PID|1||12345^^^MRN||DOE^JANE||19800101|F\r\
                PV1|1|I|WARD^101^A";
    let errors = validate(text, &SchemaRegistry::fallback());
    // the composite type isn't a registered trigger event, so only the
    // warning and line checks remain
    assert_eq!(errors[0].message, "Unknown message type: ADT^A01^ADT_A01");
    assert!(errors.iter().skip(1).all(|e| e.segment == "MSH"));
}
