/// Socket path used when `webSocketServer.options.path` is unset.
pub const DEFAULT_SOCKET_PATH: &str = "/ws";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fob-live.config.json";

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8080
}

/// Server-side transport when neither `webSocketServer` nor
/// `client.transport` names one.
pub const DEFAULT_SERVER_TYPE: &str = "ws";

pub fn default_true() -> bool {
    true
}
