//! Built-in definitions for the most common segments, data types, tables and
//! trigger events, substituted for any collection that fails to load.

use super::{
    CodeTable, DataTypeDefinition, FieldDefinition, SegmentDefinition, TriggerEventDefinition,
};

type F = FieldDefinition;

fn segment(
    id: &str,
    name: &str,
    description: &str,
    fields: Vec<FieldDefinition>,
) -> SegmentDefinition {
    SegmentDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        fields,
    }
}

pub(super) fn segments() -> Vec<SegmentDefinition> {
    vec![
        segment(
            "MSH",
            "Message Header",
            "Defines the intent, source, destination, and some specifics of the syntax of a message.",
            vec![
                F::required(
                    "Field Separator",
                    "ST",
                    "The separator between the segment ID and the first real field.",
                )
                .with_length(1),
                F::required(
                    "Encoding Characters",
                    "ST",
                    "The component separator, repetition separator, escape character, and subcomponent separator.",
                )
                .with_length(4),
                F::optional(
                    "Sending Application",
                    "HD",
                    "Uniquely identifies the sending application.",
                ),
                F::optional("Sending Facility", "HD", "Identifies the sending facility."),
                F::optional(
                    "Receiving Application",
                    "HD",
                    "Uniquely identifies the receiving application.",
                ),
                F::optional(
                    "Receiving Facility",
                    "HD",
                    "Identifies the receiving facility.",
                ),
                F::required(
                    "Date/Time of Message",
                    "TS",
                    "Date and time that the sending system created the message.",
                )
                .with_length(26),
                F::optional(
                    "Security",
                    "ST",
                    "Reserved for implementation-specific security features.",
                )
                .with_length(40),
                F::required(
                    "Message Type",
                    "MSG",
                    "Message type, trigger event, and message structure ID.",
                )
                .with_length(15),
                F::required(
                    "Message Control ID",
                    "ST",
                    "Uniquely identifies the message.",
                )
                .with_length(20),
                F::required(
                    "Processing ID",
                    "PT",
                    "Whether to process the message as defined in the HL7 processing rules.",
                )
                .with_length(3),
                F::required(
                    "Version ID",
                    "VID",
                    "Version of the HL7 standard the message conforms to.",
                )
                .with_length(60),
                F::optional(
                    "Sequence Number",
                    "NM",
                    "Non-negative integer sequence number of the message.",
                )
                .with_length(15),
                F::optional(
                    "Continuation Pointer",
                    "ST",
                    "Continuation pointer for fragmented messages.",
                )
                .with_length(180),
                F::optional(
                    "Accept Acknowledgment Type",
                    "ID",
                    "Conditions under which accept acknowledgments are required.",
                )
                .with_length(2)
                .with_table("0155"),
                F::optional(
                    "Application Acknowledgment Type",
                    "ID",
                    "Conditions under which application acknowledgments are required.",
                )
                .with_length(2)
                .with_table("0155"),
                F::optional("Country Code", "ID", "Country of origin for the message.")
                    .with_length(3)
                    .with_table("0399"),
                F::optional(
                    "Character Set",
                    "ID",
                    "Character set for the entire message.",
                )
                .with_length(16)
                .with_table("0211"),
                F::optional(
                    "Principal Language of Message",
                    "CE",
                    "Principal language of the message.",
                ),
                F::optional(
                    "Alternate Character Set Handling Scheme",
                    "ID",
                    "Alternate character set handling scheme.",
                )
                .with_length(20)
                .with_table("0356"),
            ],
        ),
        segment(
            "EVN",
            "Event Type",
            "Communicates necessary trigger event information to receiving applications.",
            vec![
                F::optional(
                    "Event Type Code",
                    "ID",
                    "Code for the event that triggered this message.",
                )
                .with_length(3)
                .with_table("0003"),
                F::required(
                    "Recorded Date/Time",
                    "TS",
                    "Date and time that the event was recorded.",
                )
                .with_length(26),
                F::optional(
                    "Date/Time Planned Event",
                    "TS",
                    "Date and time that the event is planned to occur.",
                )
                .with_length(26),
                F::optional("Event Reason Code", "IS", "Reason for this event.")
                    .with_length(3)
                    .with_table("0062"),
                F::optional(
                    "Operator ID",
                    "XCN",
                    "Individual responsible for triggering the event.",
                ),
                F::optional(
                    "Event Occurred",
                    "TS",
                    "Date and time that the event actually occurred.",
                )
                .with_length(26),
                F::optional("Event Facility", "HD", "Facility where the event occurred."),
            ],
        ),
        segment(
            "PID",
            "Patient Identification",
            "Primary means of communicating patient identification information.",
            vec![
                F::optional("Set ID - PID", "SI", "Sequence number of this PID segment.")
                    .with_length(4),
                F::optional(
                    "Patient ID",
                    "CX",
                    "Retained for backward compatibility only.",
                ),
                F::required(
                    "Patient Identifier List",
                    "CX",
                    "Identifiers used by the facility to uniquely identify a patient.",
                ),
                F::optional(
                    "Alternate Patient ID - PID",
                    "CX",
                    "Retained for backward compatibility only.",
                ),
                F::required("Patient Name", "XPN", "Names of the patient."),
                F::optional(
                    "Mother's Maiden Name",
                    "XPN",
                    "The mother's maiden (unmarried) name.",
                ),
                F::optional(
                    "Date/Time of Birth",
                    "TS",
                    "Date and time of the patient's birth.",
                )
                .with_length(26),
                F::optional("Administrative Sex", "IS", "The patient's sex.")
                    .with_length(1)
                    .with_table("0001"),
                F::optional(
                    "Patient Alias",
                    "XPN",
                    "Retained for backward compatibility only.",
                ),
                F::optional("Race", "CE", "The patient's race.")
                    .with_table("0005"),
                F::optional("Patient Address", "XAD", "Mailing address of the patient."),
                F::optional(
                    "County Code",
                    "IS",
                    "Retained for backward compatibility only.",
                )
                .with_length(4),
                F::optional(
                    "Phone Number - Home",
                    "XTN",
                    "The patient's personal phone numbers.",
                ),
                F::optional(
                    "Phone Number - Business",
                    "XTN",
                    "The patient's business phone numbers.",
                ),
                F::optional("Primary Language", "CE", "The patient's primary language.")
                    .with_table("0296"),
                F::optional("Marital Status", "CE", "The patient's marital status.")
                    .with_table("0002"),
                F::optional("Religion", "CE", "The patient's religion.")
                    .with_table("0006"),
                F::optional(
                    "Patient Account Number",
                    "CX",
                    "Patient account number assigned by accounting.",
                ),
                F::optional(
                    "SSN Number - Patient",
                    "ST",
                    "Retained for backward compatibility only.",
                )
                .with_length(16),
                F::optional(
                    "Driver's License Number - Patient",
                    "DLN",
                    "The patient's driver's license number.",
                ),
            ],
        ),
        segment(
            "PV1",
            "Patient Visit",
            "Communicates information on an account or visit-specific basis.",
            vec![
                F::optional("Set ID - PV1", "SI", "Sequence number of this PV1 segment.")
                    .with_length(4),
                F::required("Patient Class", "IS", "Categorizes patients by site.")
                    .with_length(1)
                    .with_table("0004"),
                F::optional(
                    "Assigned Patient Location",
                    "PL",
                    "The patient's initial assigned location.",
                ),
                F::optional(
                    "Admission Type",
                    "IS",
                    "Circumstances under which the patient was admitted.",
                )
                .with_length(2)
                .with_table("0007"),
                F::optional(
                    "Preadmit Number",
                    "CX",
                    "Unique identifier assigned to the pre-admission.",
                ),
                F::optional(
                    "Prior Patient Location",
                    "PL",
                    "Prior patient location if the patient is being transferred.",
                ),
                F::optional(
                    "Attending Doctor",
                    "XCN",
                    "Attending physician information.",
                ),
                F::optional(
                    "Referring Doctor",
                    "XCN",
                    "Referring physician information.",
                ),
                F::optional(
                    "Consulting Doctor",
                    "XCN",
                    "Consulting physician information.",
                ),
                F::optional(
                    "Hospital Service",
                    "IS",
                    "Treatment or type of surgery the patient is scheduled to receive.",
                )
                .with_length(3)
                .with_table("0069"),
                F::optional(
                    "Temporary Location",
                    "PL",
                    "Location other than the assigned location.",
                ),
                F::optional(
                    "Preadmit Test Indicator",
                    "IS",
                    "Whether the patient must have pre-admission testing.",
                )
                .with_length(2)
                .with_table("0087"),
                F::optional(
                    "Re-admission Indicator",
                    "IS",
                    "Whether the patient is being re-admitted.",
                )
                .with_length(2)
                .with_table("0092"),
                F::optional("Admit Source", "IS", "Where the patient was admitted from.")
                    .with_length(6)
                    .with_table("0023"),
                F::optional(
                    "Ambulatory Status",
                    "IS",
                    "Permanent or transient handicapped conditions.",
                )
                .with_length(2)
                .with_table("0009"),
                F::optional("VIP Indicator", "IS", "Type of VIP.")
                    .with_length(2)
                    .with_table("0099"),
                F::optional(
                    "Admitting Doctor",
                    "XCN",
                    "Admitting physician information.",
                ),
                F::optional(
                    "Patient Type",
                    "IS",
                    "Site-specific values that identify the patient type.",
                )
                .with_length(2)
                .with_table("0018"),
                F::optional(
                    "Visit Number",
                    "CX",
                    "Unique number assigned to each patient visit.",
                ),
                F::optional(
                    "Financial Class",
                    "FC",
                    "Financial class assigned to the patient.",
                )
                .with_table("0064"),
            ],
        ),
    ]
}

fn data_type(
    id: &str,
    name: &str,
    description: &str,
    components: Vec<FieldDefinition>,
) -> DataTypeDefinition {
    DataTypeDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        components,
    }
}

fn primitive(id: &str, name: &str, description: &str) -> DataTypeDefinition {
    data_type(id, name, description, Vec::new())
}

pub(super) fn data_types() -> Vec<DataTypeDefinition> {
    vec![
        primitive(
            "ST",
            "String Data",
            "Printable characters; leading spaces are significant, trailing spaces are not.",
        ),
        primitive(
            "ID",
            "Coded Value for HL7 Defined Tables",
            "A coded value drawn from an HL7-defined table.",
        ),
        primitive(
            "IS",
            "Coded Value for User-Defined Tables",
            "A coded value drawn from a site-defined table.",
        ),
        primitive(
            "NM",
            "Numeric",
            "A number represented as a series of ASCII numeric characters.",
        ),
        primitive(
            "SI",
            "Sequence ID",
            "A non-negative integer used as a sequence number.",
        ),
        data_type(
            "TS",
            "Time Stamp",
            "A point in time.",
            vec![
                F::required(
                    "Time",
                    "DTM",
                    "YYYY[MM[DD[HH[MM[SS[.S[S[S[S]]]]]]]]][+/-ZZZZ]",
                ),
                F::optional(
                    "Degree of Precision",
                    "ID",
                    "Retained for backward compatibility only.",
                ),
            ],
        ),
        data_type(
            "HD",
            "Hierarchic Designator",
            "Identifies an application, facility or assigning authority.",
            vec![
                F::optional("Namespace ID", "IS", "Locally defined identifier."),
                F::optional("Universal ID", "ST", "Globally unique identifier."),
                F::optional(
                    "Universal ID Type",
                    "ID",
                    "How the universal ID is to be interpreted.",
                )
                .with_table("0301"),
            ],
        ),
        data_type(
            "MSG",
            "Message Type",
            "Message type, trigger event and abstract message structure.",
            vec![
                F::required("Message Code", "ID", "The message type code.")
                    .with_table("0076"),
                F::required("Trigger Event", "ID", "The trigger event code.")
                    .with_table("0003"),
                F::optional(
                    "Message Structure",
                    "ID",
                    "The abstract message structure code.",
                )
                .with_table("0354"),
            ],
        ),
        data_type(
            "PT",
            "Processing Type",
            "Whether a message is part of a production, training, or debugging system.",
            vec![
                F::optional("Processing ID", "ID", "Production, training, or debugging.")
                    .with_table("0103"),
                F::optional(
                    "Processing Mode",
                    "ID",
                    "Archive, restore, initial load or current processing.",
                )
                .with_table("0207"),
            ],
        ),
        data_type(
            "VID",
            "Version Identifier",
            "Identifies the HL7 version.",
            vec![
                F::optional("Version ID", "ID", "The HL7 version number.")
                    .with_table("0104"),
                F::optional(
                    "Internationalization Code",
                    "CE",
                    "Country or region of the version.",
                ),
                F::optional(
                    "International Version ID",
                    "CE",
                    "Internationalized version of the standard.",
                ),
            ],
        ),
        data_type(
            "CE",
            "Coded Element",
            "A code and its text, with an optional alternate code.",
            vec![
                F::optional("Identifier", "ST", "The code."),
                F::optional("Text", "ST", "The descriptive text of the code."),
                F::optional("Name of Coding System", "ID", "The coding system.")
                    .with_table("0396"),
                F::optional("Alternate Identifier", "ST", "An alternate code."),
                F::optional(
                    "Alternate Text",
                    "ST",
                    "Descriptive text of the alternate code.",
                ),
                F::optional(
                    "Name of Alternate Coding System",
                    "ID",
                    "The alternate coding system.",
                )
                .with_table("0396"),
            ],
        ),
        data_type(
            "CX",
            "Extended Composite ID with Check Digit",
            "An identifier with its check digit and assigning authority.",
            vec![
                F::required("ID Number", "ST", "The identifier."),
                F::optional("Check Digit", "ST", "The check digit."),
                F::optional("Check Digit Scheme", "ID", "The check digit algorithm.")
                    .with_table("0061"),
                F::optional(
                    "Assigning Authority",
                    "HD",
                    "The system or organization that created the identifier.",
                ),
                F::optional("Identifier Type Code", "ID", "The type of identifier.")
                    .with_table("0203"),
                F::optional(
                    "Assigning Facility",
                    "HD",
                    "The facility that assigned the identifier.",
                ),
            ],
        ),
        data_type(
            "XPN",
            "Extended Person Name",
            "A person's name.",
            vec![
                F::optional("Family Name", "FN", "The family name."),
                F::optional("Given Name", "ST", "The first name."),
                F::optional(
                    "Second and Further Given Names or Initials Thereof",
                    "ST",
                    "Middle names or initials.",
                ),
                F::optional("Suffix", "ST", "Suffix such as JR or III."),
                F::optional("Prefix", "ST", "Prefix such as DR."),
                F::optional("Degree", "IS", "Retained for backward compatibility only.")
                    .with_table("0360"),
                F::optional("Name Type Code", "ID", "The type of name.")
                    .with_table("0200"),
            ],
        ),
        data_type(
            "XAD",
            "Extended Address",
            "A postal address.",
            vec![
                F::optional("Street Address", "SAD", "Street or mailing address."),
                F::optional("Other Designation", "ST", "Second line of address."),
                F::optional("City", "ST", "City."),
                F::optional("State or Province", "ST", "State or province."),
                F::optional("Zip or Postal Code", "ST", "Zip or postal code."),
                F::optional("Country", "ID", "Country.").with_table("0399"),
                F::optional("Address Type", "ID", "The kind of address.")
                    .with_table("0190"),
            ],
        ),
        data_type(
            "XTN",
            "Extended Telecommunication Number",
            "A phone number or other telecommunication address.",
            vec![
                F::optional(
                    "Telephone Number",
                    "ST",
                    "Retained for backward compatibility only.",
                ),
                F::optional("Telecommunication Use Code", "ID", "Use of the number.")
                    .with_table("0201"),
                F::optional(
                    "Telecommunication Equipment Type",
                    "ID",
                    "Type of equipment.",
                )
                .with_table("0202"),
                F::optional("Email Address", "ST", "An email address."),
            ],
        ),
        data_type(
            "XCN",
            "Extended Composite ID Number and Name for Persons",
            "Identifies a person, usually a care provider.",
            vec![
                F::optional("ID Number", "ST", "The person's identifier."),
                F::optional("Family Name", "FN", "The family name."),
                F::optional("Given Name", "ST", "The first name."),
                F::optional(
                    "Second and Further Given Names or Initials Thereof",
                    "ST",
                    "Middle names or initials.",
                ),
                F::optional("Suffix", "ST", "Suffix such as JR or III."),
                F::optional("Prefix", "ST", "Prefix such as DR."),
            ],
        ),
        data_type(
            "PL",
            "Person Location",
            "A patient's location within a facility.",
            vec![
                F::optional(
                    "Point of Care",
                    "IS",
                    "Nursing unit or other point of care.",
                )
                .with_table("0302"),
                F::optional("Room", "IS", "Patient room.")
                    .with_table("0303"),
                F::optional("Bed", "IS", "Patient bed.").with_table("0304"),
                F::optional("Facility", "HD", "The facility."),
            ],
        ),
    ]
}

fn table(id: &str, name: &str, values: &[(&str, &str)]) -> CodeTable {
    CodeTable {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("HL7 table {id}: {name}"),
        values: values
            .iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect(),
    }
}

pub(super) fn tables() -> Vec<CodeTable> {
    vec![
        table(
            "0001",
            "Administrative Sex",
            &[
                ("F", "Female"),
                ("M", "Male"),
                ("O", "Other"),
                ("U", "Unknown"),
                ("A", "Ambiguous"),
                ("N", "Not applicable"),
            ],
        ),
        table(
            "0002",
            "Marital Status",
            &[
                ("A", "Separated"),
                ("D", "Divorced"),
                ("M", "Married"),
                ("S", "Single"),
                ("W", "Widowed"),
                ("U", "Unknown"),
            ],
        ),
        table(
            "0003",
            "Event Type",
            &[
                ("A01", "ADT/ACK - Admit/visit notification"),
                ("A02", "ADT/ACK - Transfer a patient"),
                ("A03", "ADT/ACK - Discharge/end visit"),
                ("A04", "ADT/ACK - Register a patient"),
                ("A05", "ADT/ACK - Pre-admit a patient"),
                ("A06", "ADT/ACK - Change an outpatient to an inpatient"),
                ("A07", "ADT/ACK - Change an inpatient to an outpatient"),
                ("A08", "ADT/ACK - Update patient information"),
                ("A09", "ADT/ACK - Patient departing - tracking"),
                ("A10", "ADT/ACK - Patient arriving - tracking"),
                ("R01", "ORU/ACK - Unsolicited transmission of an observation message"),
            ],
        ),
        table(
            "0004",
            "Patient Class",
            &[
                ("E", "Emergency"),
                ("I", "Inpatient"),
                ("O", "Outpatient"),
                ("P", "Preadmit"),
                ("R", "Recurring patient"),
                ("B", "Obstetrics"),
                ("C", "Commercial Account"),
                ("N", "Not Applicable"),
                ("U", "Unknown"),
            ],
        ),
        table(
            "0155",
            "Accept/Application Acknowledgment Conditions",
            &[
                ("AL", "Always"),
                ("NE", "Never"),
                ("ER", "Error/reject conditions only"),
                ("SU", "Successful completion only"),
            ],
        ),
    ]
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

pub(super) fn trigger_events() -> Vec<TriggerEventDefinition> {
    let adt = |id: &str, name: &str, description: &str| {
        TriggerEventDefinition::new(
            id,
            name,
            description,
            ids(&["MSH", "EVN", "PID", "PV1"]),
            ids(&["MSH", "PID", "PV1"]),
        )
    };

    vec![
        adt(
            "ADT^A01",
            "Admit/Visit Notification",
            "Sent when a patient is admitted to a healthcare facility.",
        ),
        adt(
            "ADT^A02",
            "Transfer a Patient",
            "Sent when a patient is transferred from one location to another.",
        ),
        adt(
            "ADT^A03",
            "Discharge/End Visit",
            "Sent when a patient leaves a healthcare facility.",
        ),
        adt(
            "ADT^A04",
            "Register a Patient",
            "Sent when a patient is registered as an outpatient or pre-admitted.",
        ),
        TriggerEventDefinition::new(
            "ORU^R01",
            "Unsolicited Observation Message",
            "Sent to transmit results of observations.",
            ids(&["MSH", "PID", "PV1"]),
            ids(&["MSH", "PID"]),
        ),
    ]
}
