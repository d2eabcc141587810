use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

/// Default local Hasura-style endpoints.
pub const DEFAULT_HTTP_URL: &str = "http://localhost:8080/v1/graphql";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/v1/graphql";

const CONFIG_ENV_PREFIX: &str = "PARLOR_";
const CONFIG_FILE_NAME: &str = "remote.toml";

/// Endpoints of the remote GraphQL backend.
///
/// The subscription transport is a separate URL because the websocket
/// link and the HTTP link are split upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub graphql_http_url: String,
    pub graphql_ws_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            graphql_http_url: DEFAULT_HTTP_URL.to_string(),
            graphql_ws_url: DEFAULT_WS_URL.to_string(),
        }
    }
}

impl RemoteConfig {
    /// Default config file under the user's config directory.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parlor")
            .join(CONFIG_FILE_NAME)
    }

    /// Loads layered configuration: defaults, then the TOML file, then
    /// `PARLOR_*` environment variables.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(Self::default_config_path())
    }

    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(CONFIG_ENV_PREFIX))
            .extract()
            .context(ExtractSnafu {
                stage: "config-extract",
            })
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to load remote configuration"))]
    Extract {
        stage: &'static str,
        source: figment::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
