use crate::error::SyncError;
use std::path::PathBuf;
use std::time::Duration;

/// Connection settings for the REST store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Project base URL; tables live under `{url}/rest/v1/`
    pub url: String,

    /// Service key, sent as both `apikey` and bearer token
    pub api_key: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        StoreConfig {
            url: url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configuration for one migration or mirror run.
///
/// Built once by the binaries and passed down; nothing below reads the
/// environment, so a dry run needs no store at all.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Destination store; may be omitted for dry runs
    pub store: Option<StoreConfig>,

    /// Run every step except the mutating write
    pub dry_run: bool,

    /// Legacy source file holding `export const research = [...]`
    pub source_path: PathBuf,

    /// Impact artifact, a JSON object keyed by research id
    pub impacts_path: PathBuf,

    /// Directory for consumption-format output files
    pub output_dir: PathBuf,

    /// Name of the exported array in the source file
    pub array_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            store: None,
            dry_run: false,
            source_path: PathBuf::from("src/data/research.js"),
            impacts_path: PathBuf::from("src/data/reformImpacts.json"),
            output_dir: PathBuf::from("src/data"),
            array_name: String::from("research"),
        }
    }
}

impl SyncConfig {
    /// The configured store, or an error naming how to supply one
    pub fn require_store(&self) -> Result<&StoreConfig, SyncError> {
        self.store.as_ref().ok_or_else(|| {
            SyncError::Configuration(
                "SUPABASE_KEY is not set; pass --store-key or set the variable".to_string(),
            )
        })
    }

    /// A live run needs a store; a dry run needs nothing
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.dry_run {
            self.require_store()?;
        }
        if self.array_name.is_empty() {
            return Err(SyncError::Configuration(
                "source array name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Store options shared by the command-line tools
#[derive(clap::Args, Debug, Clone)]
pub struct StoreArgs {
    /// Store base URL
    #[arg(long, env = "SUPABASE_URL")]
    pub store_url: Option<String>,

    /// Store service key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub store_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl StoreArgs {
    /// `None` when no key was given; a key without a URL is an error
    pub fn resolve(self) -> Result<Option<StoreConfig>, SyncError> {
        let Some(key) = self.store_key.filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        let url = self
            .store_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SyncError::Configuration("store URL is not set".to_string()))?;

        Ok(Some(
            StoreConfig::new(url.trim_end_matches('/'), key)
                .with_timeout(Duration::from_secs(self.timeout_secs)),
        ))
    }
}
