use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::validation::parse_socket_path;
use crate::config::ConfigOverrides;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a directory and push live updates to connected browsers
    ///
    /// Files in DIR are served over HTTP. Every burst of changes is announced
    /// to clients as a rebuild, followed by a content hash of the directory.
    Serve(ServeArgs),

    /// Print the modules to prepend to application entry points
    ///
    /// Output is a JSON array of {"kind", "module"} objects, in injection
    /// order. Pass user entries to get the merged list instead.
    Entries(EntriesArgs),
}

/// Options shared by every subcommand that reads configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the config file (default: ./fob-live.config.json if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// HTTP port (0 picks a free port)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Client transport: "ws", "sockjs", or a path to a client runtime module
    #[arg(short, long, value_name = "TRANSPORT")]
    pub transport: Option<String>,

    /// Server-side transport ("ws" or "sockjs")
    #[arg(long, value_name = "TYPE")]
    pub server: Option<String>,

    /// URL path the socket server binds to
    #[arg(long, value_name = "PATH", value_parser = parse_socket_path)]
    pub path: Option<String>,
}

impl ConfigArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            transport: self.transport.clone(),
            web_socket_server: self.server.clone(),
            path: self.path.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Directory to serve and watch
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Quiet period after the last change before a build is reported (ms)
    #[arg(long, default_value = "100", value_name = "MS")]
    pub settle_ms: u64,

    /// Extra ignore patterns for the watcher ("*.tmp", "cache", ...)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,
}

#[derive(Args, Debug)]
pub struct EntriesArgs {
    /// User entry points to merge the bootstrap entries into
    #[arg(value_name = "ENTRY")]
    pub entries: Vec<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}
