use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use hl7_check::config::RegistryOverrides;
use std::{path::PathBuf, time::Duration};

#[derive(Parser, Debug)]
#[command(author = clap::crate_authors!(), version, about, long_about = None, help_template = "\
{before-help}{name} {version}
by {author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
")]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, default_value_t = ColorChoice::Auto)]
    /// Control whether color is used in the output
    pub colour: ColorChoice,

    /// Enable debugging output
    ///
    /// Use multiple times to increase verbosity
    /// (e.g., -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Base URL of the HL7 definition API to load the schema registry from
    #[arg(long, env = "HL7_CHECK_REGISTRY_URL", global = true)]
    pub registry_url: Option<String>,

    /// Load the schema registry from JSON files in this directory instead
    ///
    /// The directory must contain `segments.json`, `data-types.json`,
    /// `tables.json` and `trigger-events.json`; missing files are replaced by
    /// the built-in definitions.
    #[arg(long, env = "HL7_CHECK_REGISTRY_DIR", global = true)]
    pub registry_dir: Option<PathBuf>,

    /// Timeout in seconds for each registry request
    #[arg(long, global = true)]
    pub registry_timeout: Option<u64>,

    /// Don't load the schema registry, use the built-in definitions
    #[arg(long, global = true)]
    pub offline: bool,

    /// Path to an `hl7-check.toml` configuration file
    ///
    /// When not given, `hl7-check.toml` is looked up in the workspace folders
    /// (language server) or in the current directory (check, inspect).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `file:line:field: severity: message` line per diagnostic
    #[default]
    Text,
    /// A JSON array of diagnostics per file
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the language server, logging to standard error (default)
    LogToStderr,

    /// Run the language server, logging to a file
    LogToFile {
        /// Path to the log file
        ///
        /// Log file will be created if it does not exist and appended to if it does.
        log_file: PathBuf,
    },

    /// Validate message files and report their diagnostics
    ///
    /// Exits with a non-zero status if any file has an error.
    Check {
        /// Message files to validate
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print everything known about one field of a message as JSON
    Inspect {
        /// Message file
        file: PathBuf,

        /// Segment line, counted from 0 with blank lines skipped
        line: usize,

        /// Field position, where 0 is the segment id
        field: usize,
    },
}

impl Cli {
    pub fn registry_overrides(&self) -> RegistryOverrides {
        RegistryOverrides {
            url: self.registry_url.clone(),
            directory: self.registry_dir.clone(),
            timeout: self.registry_timeout.map(Duration::from_secs),
            offline: self.offline,
        }
    }
}

pub fn cli() -> Cli {
    Cli::parse()
}
