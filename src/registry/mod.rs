//! The schema registry: segment, data type, code table and trigger event
//! definitions, looked up by id.
//!
//! A [`SchemaRegistry`] is built once and never mutated afterwards. It is
//! passed by reference into every validation and inspection call, so tests
//! can hand in small synthetic registries.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

mod fallback;
mod loader;
mod source;

pub use loader::{load, load_offline, CollectionStatus, LoadReport, RegistryLoad, RegistryStatus};
pub use source::{
    Collection, CollectionSource, DirectorySource, HttpSource, RegistryError, DEFAULT_REGISTRY_URL,
};

/// One field of a segment, or one component of a data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub data_type: String,
    pub length: Option<usize>,
    pub table: Option<String>,
}

impl FieldDefinition {
    pub fn optional<S: Into<String>>(name: S, data_type: S, description: S) -> Self {
        FieldDefinition {
            name: name.into(),
            description: description.into(),
            required: false,
            data_type: data_type.into(),
            length: None,
            table: None,
        }
    }

    pub fn required<S: Into<String>>(name: S, data_type: S, description: S) -> Self {
        FieldDefinition {
            required: true,
            ..FieldDefinition::optional(name, data_type, description)
        }
    }

    pub fn with_table<S: Into<String>>(mut self, table: S) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }
}

/// A segment definition.
///
/// `fields[i]` describes raw field `i + 1` of a segment line; position 0 of a
/// line is the segment id itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldDefinition>,
}

/// A composite data type. The components are for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTypeDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub components: Vec<FieldDefinition>,
}

/// An enumerated code → label table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeTable {
    pub id: String,
    pub name: String,
    pub description: String,
    pub values: BTreeMap<String, String>,
}

/// Which segments may, and which must, appear in a message of a given type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEventDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    segments: Vec<String>,
    required_segments: Vec<String>,
}

impl TriggerEventDefinition {
    /// Build a trigger event definition.
    ///
    /// Required segment ids missing from `segments` are appended to it, and
    /// duplicate required ids are collapsed, so the required list is always
    /// an ordered subset of the allowed list.
    pub fn new<S: Into<String>>(
        id: S,
        name: S,
        description: S,
        segments: Vec<String>,
        required_segments: Vec<String>,
    ) -> Self {
        let mut segments = segments;
        let mut required = Vec::with_capacity(required_segments.len());
        for segment in required_segments {
            if required.contains(&segment) {
                continue;
            }
            if !segments.contains(&segment) {
                segments.push(segment.clone());
            }
            required.push(segment);
        }

        TriggerEventDefinition {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            segments,
            required_segments: required,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Required segment ids, in declared order.
    pub fn required_segments(&self) -> &[String] {
        &self.required_segments
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRegistry {
    segments: HashMap<String, SegmentDefinition>,
    data_types: HashMap<String, DataTypeDefinition>,
    tables: HashMap<String, CodeTable>,
    trigger_events: HashMap<String, TriggerEventDefinition>,
}

impl SchemaRegistry {
    /// An empty registry, to be filled with the `with_*` methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in minimal registry used when the real one can't be loaded.
    pub fn fallback() -> Self {
        SchemaRegistry {
            segments: index(fallback::segments(), |s| &s.id),
            data_types: index(fallback::data_types(), |d| &d.id),
            tables: index(fallback::tables(), |t| &t.id),
            trigger_events: index(fallback::trigger_events(), |e| &e.id),
        }
    }

    pub(crate) fn from_parts(
        segments: Vec<SegmentDefinition>,
        data_types: Vec<DataTypeDefinition>,
        tables: Vec<CodeTable>,
        trigger_events: Vec<TriggerEventDefinition>,
    ) -> Self {
        SchemaRegistry {
            segments: index(segments, |s| &s.id),
            data_types: index(data_types, |d| &d.id),
            tables: index(tables, |t| &t.id),
            trigger_events: index(trigger_events, |e| &e.id),
        }
    }

    pub fn with_segment(mut self, segment: SegmentDefinition) -> Self {
        self.segments.insert(segment.id.clone(), segment);
        self
    }

    pub fn with_data_type(mut self, data_type: DataTypeDefinition) -> Self {
        self.data_types.insert(data_type.id.clone(), data_type);
        self
    }

    pub fn with_table(mut self, table: CodeTable) -> Self {
        self.tables.insert(table.id.clone(), table);
        self
    }

    pub fn with_trigger_event(mut self, trigger_event: TriggerEventDefinition) -> Self {
        self.trigger_events
            .insert(trigger_event.id.clone(), trigger_event);
        self
    }

    pub fn segment(&self, id: &str) -> Option<&SegmentDefinition> {
        self.segments.get(id)
    }

    pub fn data_type(&self, id: &str) -> Option<&DataTypeDefinition> {
        self.data_types.get(id)
    }

    pub fn table(&self, id: &str) -> Option<&CodeTable> {
        self.tables.get(id)
    }

    pub fn trigger_event(&self, id: &str) -> Option<&TriggerEventDefinition> {
        self.trigger_events.get(id)
    }

    /// All registered segment ids, sorted.
    pub fn segment_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.segments.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
            && self.data_types.is_empty()
            && self.tables.is_empty()
            && self.trigger_events.is_empty()
    }
}

fn index<T, F>(items: Vec<T>, key: F) -> HashMap<String, T>
where
    F: Fn(&T) -> &String,
{
    items
        .into_iter()
        .map(|item| (key(&item).clone(), item))
        .collect()
}
