//! Run configuration for diagmerge

use diagmerge_engine::Policy;
use diagmerge_types::{Attributes, ConfigEntry, StashFlavor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Read-only catalogs
    #[serde(default)]
    pub catalogs: CatalogPaths,

    /// The suite being edited and where results go
    #[serde(default)]
    pub job: JobConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Usage label to stream id
    #[serde(default)]
    pub usage: BTreeMap<String, String>,

    /// Streams approved for creation, by id
    #[serde(default)]
    pub streams: BTreeMap<String, BTreeMap<String, String>>,

    /// Atmosphere code to domain label
    #[serde(default)]
    pub domains: BTreeMap<String, String>,

    /// Domain profiles offered when no store defines a label
    #[serde(default)]
    pub user_domains: Vec<BTreeMap<String, String>>,

    /// Extra descriptor to domain label rows
    #[serde(default)]
    pub descriptors: BTreeMap<String, String>,

    /// Frequency class to usage label
    #[serde(default = "default_usage")]
    pub default_usage: BTreeMap<String, String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            catalogs: CatalogPaths::default(),
            job: JobConfig::default(),
            logging: LoggingConfig::default(),
            usage: BTreeMap::new(),
            streams: BTreeMap::new(),
            domains: BTreeMap::new(),
            user_domains: Vec::new(),
            descriptors: BTreeMap::new(),
            default_usage: default_usage(),
        }
    }
}

/// Catalog locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPaths {
    /// CF mapping files, merged in order
    #[serde(default = "default_mappings")]
    pub mappings: Vec<PathBuf>,

    /// Reference rose app with the standard profiles
    #[serde(default = "default_reference")]
    pub reference: PathBuf,

    #[serde(default = "default_stashmaster")]
    pub stashmaster: PathBuf,

    /// NEMO field definitions
    #[serde(default = "default_ocean_field_def")]
    pub ocean_field_def: PathBuf,

    /// CICE source declaring `icefields_nml`
    #[serde(default = "default_ice_diagnostics")]
    pub ice_diagnostics: PathBuf,
}

impl Default for CatalogPaths {
    fn default() -> Self {
        Self {
            mappings: default_mappings(),
            reference: default_reference(),
            stashmaster: default_stashmaster(),
            ocean_field_def: default_ocean_field_def(),
            ice_diagnostics: default_ice_diagnostics(),
        }
    }
}

/// The suite and request list of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Suite root
    #[serde(default = "default_suite")]
    pub path: PathBuf,

    /// CSV request list
    #[serde(default = "default_requests")]
    pub requests: PathBuf,

    /// Which atmosphere store to edit
    #[serde(default)]
    pub flavor: StashFlavor,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    // Explicit store locations, used instead of the suite layout
    #[serde(default)]
    pub atmosphere_store: Option<PathBuf>,
    #[serde(default)]
    pub ocean_store: Option<PathBuf>,
    #[serde(default)]
    pub ocean_request: Option<PathBuf>,
    #[serde(default)]
    pub ice_store: Option<PathBuf>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            path: default_suite(),
            requests: default_requests(),
            flavor: StashFlavor::default(),
            output_dir: default_output_dir(),
            atmosphere_store: None,
            ocean_store: None,
            ocean_request: None,
            ice_store: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,

    /// Write events to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

// Default value helpers
fn default_usage() -> BTreeMap<String, String> {
    [("mon", "'UPM'"), ("day", "'UPD'")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_mappings() -> Vec<PathBuf> {
    vec![PathBuf::from("mappings/common_mappings.cfg")]
}

fn default_reference() -> PathBuf {
    PathBuf::from("reference/rose-app.conf")
}

fn default_stashmaster() -> PathBuf {
    PathBuf::from("STASHmaster/STASHmaster_A")
}

fn default_ocean_field_def() -> PathBuf {
    PathBuf::from("field_def_nemo-oce.xml")
}

fn default_ice_diagnostics() -> PathBuf {
    PathBuf::from("ice_history_shared.F90")
}

fn default_suite() -> PathBuf {
    PathBuf::from(".")
}

fn default_requests() -> PathBuf {
    PathBuf::from("requests.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RunConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&RunConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // DIAGMERGE_JOB__FLAVOR=um sets job.flavor
        builder = builder.add_source(
            config::Environment::with_prefix("DIAGMERGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Operator overrides handed to the engine.
    pub fn policy(&self) -> Policy {
        let mut policy = Policy::default().with_flavor(self.job.flavor);
        for (descriptor, label) in &self.descriptors {
            policy.descriptors.set(descriptor, label);
        }
        for (frequency, usage) in &self.default_usage {
            policy = policy.with_default_usage(frequency, usage);
        }
        for (code, label) in &self.domains {
            policy = policy.with_domain_override(code, label);
        }
        // Usage labels are upper case in every store.
        for (usage, stream) in &self.usage {
            policy = policy.with_usage_stream(&usage.to_uppercase(), stream);
        }
        for (stream, attributes) in &self.streams {
            let attributes: Attributes = attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            policy = policy.with_approved_stream(stream, attributes);
        }
        for profile in &self.user_domains {
            if let Some(entry) = user_domain_entry(profile) {
                policy = policy.with_user_domain(entry);
            }
        }
        policy
    }
}

/// Domain profile section for a `[[user_domains]]` table; `None` without `dom_name`.
fn user_domain_entry(profile: &BTreeMap<String, String>) -> Option<ConfigEntry> {
    let label = profile.get("dom_name")?.trim().trim_matches('\'');
    let mut attributes = Attributes::new();
    for (key, value) in profile {
        if key == "dom_name" {
            attributes.insert(key.as_str(), format!("'{}'", label));
        } else {
            attributes.insert(key.as_str(), value.as_str());
        }
    }
    Some(ConfigEntry::new(
        format!("namelist:umstash_domain({})", label.to_lowercase()),
        attributes,
    ))
}
