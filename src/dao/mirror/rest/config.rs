use super::error::{RestMirrorError, RestMirrorResult};

const DEFAULT_MATCHES_TABLE: &str = "matches";

/// Runtime configuration describing how to reach the relational mirror.
#[derive(Debug, Clone)]
pub struct RestMirrorConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub matches_table: String,
}

impl RestMirrorConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            matches_table: DEFAULT_MATCHES_TABLE.to_owned(),
        }
    }

    /// Attach the service key sent as both `apikey` and bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> RestMirrorResult<Self> {
        let base_url = std::env::var("MIRROR_BASE_URL").map_err(|_| {
            RestMirrorError::MissingEnvVar {
                var: "MIRROR_BASE_URL",
            }
        })?;

        let mut config = Self::new(base_url);
        if let Some(api_key) = std::env::var("MIRROR_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
        {
            config = config.with_api_key(api_key);
        }
        if let Some(table) = std::env::var("MIRROR_MATCHES_TABLE")
            .ok()
            .filter(|table| !table.is_empty())
        {
            config.matches_table = table;
        }

        Ok(config)
    }
}
