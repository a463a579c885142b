use crate::config::normalize_socket_path;

/// Parse `--path`, reporting the same problems configuration loading would.
pub fn parse_socket_path(s: &str) -> Result<String, String> {
    normalize_socket_path(s).map_err(|e| e.to_string())
}
