use super::{
    fallback,
    source::{Collection, CollectionSource, RegistryError},
    CodeTable, DataTypeDefinition, FieldDefinition, SchemaRegistry, SegmentDefinition,
    TriggerEventDefinition,
};
use chrono::{DateTime, Local};
use serde::{de::DeserializeOwned, Deserialize};
use serde_with::{serde_as, DefaultOnError, DefaultOnNull, DisplayFromStr, PickFirst};
use std::{collections::BTreeMap, fmt};
use tracing::instrument;

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldRecord {
    #[serde_as(as = "DefaultOnError<DefaultOnNull>")]
    #[serde(default)]
    name: String,
    #[serde_as(as = "DefaultOnError<DefaultOnNull>")]
    #[serde(default)]
    description: String,
    #[serde_as(as = "DefaultOnError<DefaultOnNull>")]
    #[serde(default)]
    required: bool,
    #[serde_as(as = "DefaultOnError<DefaultOnNull>")]
    #[serde(default)]
    data_type: String,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    length: Option<usize>,
    #[serde_as(as = "DefaultOnError<Option<_>>")]
    #[serde(default)]
    table: Option<String>,
}

impl From<FieldRecord> for FieldDefinition {
    fn from(record: FieldRecord) -> Self {
        FieldDefinition {
            name: record.name,
            description: record.description,
            required: record.required,
            data_type: record.data_type,
            length: record.length,
            table: record.table.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct SegmentRecord {
    id: String,
    #[serde_as(as = "DefaultOnError<DefaultOnNull>")]
    #[serde(default)]
    name: String,
    #[serde_as(as = "DefaultOnError<DefaultOnNull>")]
    #[serde(default)]
    description: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    fields: Vec<FieldRecord>,
}

impl From<SegmentRecord> for SegmentDefinition {
    fn from(record: SegmentRecord) -> Self {
        SegmentDefinition {
            id: record.id,
            name: record.name,
            description: record.description,
            fields: record.fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct DataTypeRecord {
    id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    description: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default, alias = "components")]
    fields: Vec<FieldRecord>,
}

impl From<DataTypeRecord> for DataTypeDefinition {
    fn from(record: DataTypeRecord) -> Self {
        DataTypeDefinition {
            id: record.id,
            name: record.name,
            description: record.description,
            components: record.fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct TableValueRecord {
    id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    description: String,
}

/// Table values arrive either as a `{code: label}` object or as a list of
/// `{id, description}` records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TableValues {
    Map(BTreeMap<String, String>),
    List(Vec<TableValueRecord>),
}

impl Default for TableValues {
    fn default() -> Self {
        TableValues::Map(BTreeMap::new())
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct TableRecord {
    id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    description: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    values: TableValues,
}

impl From<TableRecord> for CodeTable {
    fn from(record: TableRecord) -> Self {
        let values = match record.values {
            TableValues::Map(values) => values,
            TableValues::List(values) => values
                .into_iter()
                .map(|value| (value.id, value.description))
                .collect(),
        };
        CodeTable {
            id: record.id,
            name: record.name,
            description: record.description,
            values,
        }
    }
}

/// A trigger event segment, either a bare id or an `{id, required}` record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SegmentRef {
    Id(String),
    Record {
        id: String,
        #[serde(default)]
        required: Option<bool>,
    },
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerEventRecord {
    id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    description: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    segments: Vec<SegmentRef>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    required_segments: Vec<String>,
}

impl From<TriggerEventRecord> for TriggerEventDefinition {
    fn from(record: TriggerEventRecord) -> Self {
        let mut segments = Vec::with_capacity(record.segments.len());
        let mut required = Vec::new();
        for segment in record.segments {
            match segment {
                SegmentRef::Id(id) => segments.push(id),
                SegmentRef::Record { id, required: flag } => {
                    if flag == Some(true) {
                        required.push(id.clone());
                    }
                    segments.push(id);
                }
            }
        }
        required.extend(record.required_segments);

        TriggerEventDefinition::new(record.id, record.name, record.description, segments, required)
    }
}

/// Parse one collection's JSON array and convert every record.
///
/// An empty array is treated as a failure: a registry collection with nothing
/// in it is never better than the fallback.
fn parse<R, T>(collection: Collection, json: &str) -> Result<Vec<T>, RegistryError>
where
    R: DeserializeOwned,
    T: From<R>,
{
    let records: Vec<R> = serde_json::from_str(json)
        .map_err(|source| RegistryError::Json { collection, source })?;
    if records.is_empty() {
        return Err(RegistryError::Empty(collection));
    }
    Ok(records.into_iter().map(T::from).collect())
}

fn fetch<R, T>(
    source: &dyn CollectionSource,
    collection: Collection,
) -> Result<Vec<T>, RegistryError>
where
    R: DeserializeOwned,
    T: From<R>,
{
    let json = source.fetch(collection)?;
    parse::<R, T>(collection, &json)
}

/// How one collection ended up in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionStatus {
    Loaded { count: usize },
    Fallback { reason: String },
}

/// Overall outcome of a registry load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryStatus {
    /// Every collection came from the configured source.
    Loaded,
    /// At least one collection was replaced by the built-in definitions.
    FallbackEngaged { collections: Vec<Collection> },
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: String,
    pub collections: Vec<(Collection, CollectionStatus)>,
    pub completed_at: DateTime<Local>,
}

impl LoadReport {
    pub fn status(&self) -> RegistryStatus {
        let fallbacks: Vec<Collection> = self
            .collections
            .iter()
            .filter(|(_, status)| matches!(status, CollectionStatus::Fallback { .. }))
            .map(|(collection, _)| *collection)
            .collect();
        if fallbacks.is_empty() {
            RegistryStatus::Loaded
        } else {
            RegistryStatus::FallbackEngaged {
                collections: fallbacks,
            }
        }
    }

    pub fn status_of(&self, collection: Collection) -> Option<&CollectionStatus> {
        self.collections
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, status)| status)
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status() {
            RegistryStatus::Loaded => {
                write!(f, "Loaded HL7 definitions from {}", self.source)?
            }
            RegistryStatus::FallbackEngaged { .. } => write!(
                f,
                "Loaded HL7 definitions from {} (built-in definitions substituted)",
                self.source
            )?,
        }
        for (collection, status) in self.collections.iter() {
            match status {
                CollectionStatus::Loaded { count } => write!(f, "\n  {collection}: {count}")?,
                CollectionStatus::Fallback { reason } => {
                    write!(f, "\n  {collection}: built-in ({reason})")?
                }
            }
        }
        Ok(())
    }
}

/// A freshly built registry along with how it was built.
#[derive(Debug, Clone)]
pub struct RegistryLoad {
    pub registry: SchemaRegistry,
    pub report: LoadReport,
}

fn settle<T>(
    collection: Collection,
    result: Result<Vec<T>, RegistryError>,
    fallback: fn() -> Vec<T>,
) -> (Vec<T>, (Collection, CollectionStatus)) {
    match result {
        Ok(items) => {
            tracing::debug!(%collection, count = items.len(), "collection loaded");
            let count = items.len();
            (items, (collection, CollectionStatus::Loaded { count }))
        }
        Err(error) => {
            tracing::warn!(
                %collection,
                %error,
                "failed to load collection, using built-in definitions"
            );
            (
                fallback(),
                (
                    collection,
                    CollectionStatus::Fallback {
                        reason: error.to_string(),
                    },
                ),
            )
        }
    }
}

/// Build a registry from `source`.
///
/// The four collections are fetched concurrently and independently; any
/// collection that can't be fetched or parsed is replaced with its built-in
/// counterpart, so the result is never empty.
#[instrument(level = "info", skip(source), fields(from = %source.describe()))]
pub fn load(source: &dyn CollectionSource) -> RegistryLoad {
    let (segments, data_types, tables, trigger_events) = std::thread::scope(|scope| {
        let segments =
            scope.spawn(|| fetch::<SegmentRecord, SegmentDefinition>(source, Collection::Segments));
        let data_types = scope.spawn(|| {
            fetch::<DataTypeRecord, DataTypeDefinition>(source, Collection::DataTypes)
        });
        let tables = scope.spawn(|| fetch::<TableRecord, CodeTable>(source, Collection::Tables));
        let trigger_events = scope.spawn(|| {
            fetch::<TriggerEventRecord, TriggerEventDefinition>(source, Collection::TriggerEvents)
        });

        (
            segments.join().unwrap_or_else(|e| std::panic::resume_unwind(e)),
            data_types.join().unwrap_or_else(|e| std::panic::resume_unwind(e)),
            tables.join().unwrap_or_else(|e| std::panic::resume_unwind(e)),
            trigger_events.join().unwrap_or_else(|e| std::panic::resume_unwind(e)),
        )
    });

    let (segments, segments_status) = settle(Collection::Segments, segments, fallback::segments);
    let (data_types, data_types_status) =
        settle(Collection::DataTypes, data_types, fallback::data_types);
    let (tables, tables_status) = settle(Collection::Tables, tables, fallback::tables);
    let (trigger_events, trigger_events_status) =
        settle(Collection::TriggerEvents, trigger_events, fallback::trigger_events);

    let report = LoadReport {
        source: source.describe(),
        collections: vec![
            segments_status,
            data_types_status,
            tables_status,
            trigger_events_status,
        ],
        completed_at: Local::now(),
    };
    tracing::info!(status = ?report.status(), "registry loaded");

    RegistryLoad {
        registry: SchemaRegistry::from_parts(segments, data_types, tables, trigger_events),
        report,
    }
}

/// The built-in registry, reported as a fallback for every collection.
pub fn load_offline() -> RegistryLoad {
    let reason = RegistryError::Offline.to_string();
    RegistryLoad {
        registry: SchemaRegistry::fallback(),
        report: LoadReport {
            source: "built-in definitions".to_string(),
            collections: Collection::ALL
                .iter()
                .map(|collection| {
                    (
                        *collection,
                        CollectionStatus::Fallback {
                            reason: reason.clone(),
                        },
                    )
                })
                .collect(),
            completed_at: Local::now(),
        },
    }
}
