use crate::config::{
    LiveConfig, WebSocketServerDetails, WebSocketServerOptions, WebSocketServerSetting,
    DEFAULT_CONFIG_FILE,
};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use std::path::Path;

/// Values given on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<String>,
    pub web_socket_server: Option<String>,
    pub path: Option<String>,
}

impl LiveConfig {
    /// Load configuration from multiple sources.
    ///
    /// Priority: overrides > `FOB_LIVE_*` environment > config file > defaults.
    /// An explicit `config_path` must exist; otherwise `fob-live.config.json`
    /// in `cwd` is used when present.
    pub fn load(
        cwd: &Path,
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    cwd.join(path)
                };
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => {
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                default_path.is_file().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading live server config");
            figment = figment.merge(Json::file(path));
        }

        // FOB_LIVE_PORT, FOB_LIVE_CLIENT__TRANSPORT, ...
        figment = figment.merge(Env::prefixed("FOB_LIVE_").split("__"));

        figment = Self::merge_overrides(figment, overrides);

        let mut config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: "Check fob-live.config.json syntax and field types".to_string(),
        })?;

        config.apply_socket_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn merge_overrides(mut figment: Figment, overrides: &ConfigOverrides) -> Figment {
        if let Some(host) = &overrides.host {
            figment = figment.merge(Serialized::default("host", host));
        }
        if let Some(port) = overrides.port {
            figment = figment.merge(Serialized::default("port", port));
        }
        if let Some(transport) = &overrides.transport {
            figment = figment.merge(Serialized::default("client.transport", transport));
        }
        figment
    }

    /// Apply `--server` and `--path` to whatever form `webSocketServer` took.
    ///
    /// Both are merged on the extracted value rather than through figment,
    /// where a nested key would replace a bare-name setting wholesale.
    fn apply_socket_overrides(&mut self, overrides: &ConfigOverrides) {
        if overrides.web_socket_server.is_none() && overrides.path.is_none() {
            return;
        }

        let kind = overrides
            .web_socket_server
            .clone()
            .or_else(|| self.server_type().map(str::to_string));

        let setting = match (self.web_socket_server.take(), &overrides.path) {
            (Some(WebSocketServerSetting::Detailed(mut details)), path) => {
                details.kind = kind;
                if let Some(path) = path {
                    details.options.path = Some(path.clone());
                }
                WebSocketServerSetting::Detailed(details)
            }
            (_, Some(path)) => WebSocketServerSetting::Detailed(WebSocketServerDetails {
                kind,
                options: WebSocketServerOptions {
                    path: Some(path.clone()),
                    ..WebSocketServerOptions::default()
                },
            }),
            (_, None) => match kind {
                Some(kind) => WebSocketServerSetting::Name(kind),
                None => return,
            },
        };

        self.web_socket_server = Some(setting);
    }
}
