use std::{
    fmt, io,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::instrument;

/// The public HL7 v2.5.1 definition API.
pub const DEFAULT_REGISTRY_URL: &str = "https://hl7-definition.caristix.com/v2-api/1/HL7v2.5.1";

/// The four independently fetched parts of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Segments,
    DataTypes,
    Tables,
    TriggerEvents,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Segments,
        Collection::DataTypes,
        Collection::Tables,
        Collection::TriggerEvents,
    ];

    /// Path segment used by the definition API.
    pub fn endpoint(self) -> &'static str {
        match self {
            Collection::Segments => "Segments",
            Collection::DataTypes => "DataTypes",
            Collection::Tables => "Tables",
            Collection::TriggerEvents => "TriggerEvents",
        }
    }

    /// File name used by [`DirectorySource`].
    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Segments => "segments.json",
            Collection::DataTypes => "data-types.json",
            Collection::Tables => "tables.json",
            Collection::TriggerEvents => "trigger-events.json",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Segments => write!(f, "segments"),
            Collection::DataTypes => write!(f, "data types"),
            Collection::Tables => write!(f, "tables"),
            Collection::TriggerEvents => write!(f, "trigger events"),
        }
    }
}

/// Why a collection could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed {collection} JSON: {source}")]
    Json {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("no {0} were returned")]
    Empty(Collection),
    #[error("offline")]
    Offline,
}

/// Something that can hand over the raw JSON text of a collection.
///
/// Implementations must be shareable between threads: the loader fetches all
/// four collections at once.
pub trait CollectionSource: Send + Sync {
    fn fetch(&self, collection: Collection) -> Result<String, RegistryError>;

    /// Where the collections come from, for logging.
    fn describe(&self) -> String;
}

/// Fetches collections from `{base_url}/{Segments,DataTypes,Tables,TriggerEvents}`.
pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new<S: Into<String>>(
        base_url: S,
        timeout: Option<Duration>,
    ) -> Result<Self, RegistryError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| RegistryError::Http {
            url: base_url.clone(),
            source,
        })?;
        Ok(HttpSource { base_url, client })
    }

    fn url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.endpoint())
    }
}

impl CollectionSource for HttpSource {
    #[instrument(level = "debug", skip(self), fields(base_url = %self.base_url))]
    fn fetch(&self, collection: Collection) -> Result<String, RegistryError> {
        let url = self.url(collection);
        tracing::trace!(%url, "fetching collection");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| RegistryError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .map_err(|source| RegistryError::Http { url, source })
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Reads collections from JSON files in a directory.
pub struct DirectorySource {
    directory: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        DirectorySource {
            directory: directory.as_ref().to_path_buf(),
        }
    }
}

impl CollectionSource for DirectorySource {
    #[instrument(level = "debug", skip(self), fields(directory = ?self.directory))]
    fn fetch(&self, collection: Collection) -> Result<String, RegistryError> {
        let path = self.directory.join(collection.file_name());
        std::fs::read_to_string(&path).map_err(|source| RegistryError::Io { path, source })
    }

    fn describe(&self) -> String {
        self.directory.display().to_string()
    }
}
