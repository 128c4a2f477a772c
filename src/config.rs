use std::{path::{Path, PathBuf}, time::Duration};

use fxhash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use url::Url;
use validator::Validate;

use crate::locators::SelectorCascade;
use crate::session::{ExtractionPlan, Pacing, SessionOptions, MAX_DELAY_SECS};
use crate::sinks::DEFAULT_SINKS;
use crate::sites::{plan_for, DEFAULT_SITES};


#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("unknown site `{0}`, known sites are {known:?}", known = DEFAULT_SITES)]
    UnknownSite(String),

    #[error("unknown sink `{0}`, known sinks are {known:?}", known = DEFAULT_SINKS)]
    UnknownSink(String),

    #[error("pacing range `{0}` must satisfy 0 <= min_secs <= max_secs <= {max}", max = MAX_DELAY_SECS)]
    Pacing(&'static str),

    #[error("the replay source needs at least one page under [replay.pages]")]
    EmptyReplay
}


/// Where rendered pages come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SourceKind {
    /// A real browser session, needed for the live site
    #[default]
    Chrome,
    /// Pages saved ahead of time, keyed by their URL
    Replay
}


#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RemoteStoreConfig {
    /// Base URL of the document store's REST API
    #[validate(url)]
    pub(crate) endpoint: String,
    /// Name of the environment variable holding the bearer token, if the store needs one.
    ///
    /// The token itself never lives in the configuration file.
    pub(crate) token_env: Option<String>
}


#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReplayConfig {
    /// Saved markup for every URL the run will visit
    #[serde(default)]
    pub(crate) pages: FxHashMap<String, PathBuf>
}


/// Everything a run needs, read from `config.toml`
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct Config {
    /// The first results page. Later pages are derived from it.
    #[validate(url)]
    pub(crate) base_url: String,
    /// Stored on the run record so that runs of different searches can be told apart
    #[validate(length(min = 1))]
    pub(crate) source_label: String,
    #[serde(default = "default_site")]
    pub(crate) site: String,
    #[serde(default)]
    pub(crate) source: SourceKind,
    #[serde(default = "default_true")]
    pub(crate) headless: bool,
    /// How long to wait for each card selector before trying the next one
    #[serde(default = "default_wait_timeout")]
    #[validate(range(min = 1))]
    pub(crate) wait_timeout_secs: u64,
    /// How long to wait for each pagination selector.
    ///
    /// Searches with a single page have no pagination at all, so keep this short.
    #[serde(default = "default_pagination_timeout")]
    #[validate(range(min = 1))]
    pub(crate) pagination_timeout_secs: u64,
    /// Upper bound on the number of results pages visited
    #[validate(range(min = 1))]
    pub(crate) max_pages: Option<u32>,
    #[serde(default = "default_output_dir")]
    pub(crate) output_dir: PathBuf,
    /// File name, without extension, of the CSV and JSON exports
    #[serde(default = "default_export_stem")]
    #[validate(length(min = 1))]
    pub(crate) export_stem: String,
    /// Whether to dump the markup of pages that yielded nothing
    #[serde(default = "default_true")]
    pub(crate) save_diagnostics: bool,
    #[serde(default = "default_diagnostics_dir")]
    pub(crate) diagnostics_dir: PathBuf,
    #[serde(default = "default_sinks")]
    pub(crate) enabled_sinks: FxHashSet<String>,
    /// Replaces the card cascade of the site, most specific selector first
    pub(crate) card_selectors: Option<SelectorCascade>,
    #[serde(default)]
    pub(crate) pacing: Pacing,
    #[validate]
    pub(crate) remote_store: Option<RemoteStoreConfig>,
    #[serde(default)]
    pub(crate) replay: ReplayConfig
}


fn default_site() -> String {
    DEFAULT_SITES[0].to_string()
}


fn default_true() -> bool {
    true
}


fn default_wait_timeout() -> u64 {
    20
}


fn default_pagination_timeout() -> u64 {
    3
}


fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}


fn default_export_stem() -> String {
    "listings".into()
}


fn default_diagnostics_dir() -> PathBuf {
    PathBuf::from("debug")
}


fn default_sinks() -> FxHashSet<String> {
    DEFAULT_SINKS.into_iter().map(String::from).collect()
}


impl Config {
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub(crate) fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        if plan_for(&config.site).is_none() {
            return Err(ConfigError::UnknownSite(config.site));
        }
        if let Some(sink) = config.enabled_sinks.iter().find(|s| !DEFAULT_SINKS.contains(&s.as_str())) {
            return Err(ConfigError::UnknownSink(sink.clone()));
        }
        if let Some(range) = config.pacing.invalid_range() {
            return Err(ConfigError::Pacing(range));
        }
        if config.source == SourceKind::Replay && config.replay.pages.is_empty() {
            return Err(ConfigError::EmptyReplay);
        }
        Ok(config)
    }

    pub(crate) fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    /// The plan of the configured site, with the card cascade overridden if requested
    pub(crate) fn plan(&self) -> Result<ExtractionPlan, ConfigError> {
        let mut plan = plan_for(&self.site).ok_or_else(|| ConfigError::UnknownSite(self.site.clone()))?;
        if let Some(cards) = self.card_selectors.as_ref().filter(|c| !c.is_empty()) {
            plan.cards = cards.clone();
        }
        Ok(plan)
    }

    pub(crate) fn session_options(&self) -> SessionOptions {
        SessionOptions {
            wait_timeout: Duration::from_secs(self.wait_timeout_secs),
            pagination_timeout: Duration::from_secs(self.pagination_timeout_secs),
            max_pages: self.max_pages,
            pacing: self.pacing,
            diagnostics_dir: self.save_diagnostics.then(|| self.diagnostics_dir.clone())
        }
    }
}
