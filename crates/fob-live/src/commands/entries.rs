use crate::bootstrap::prepend_entries;
use crate::cli::EntriesArgs;
use crate::error::Result;
use crate::server::LiveServer;

/// Print the bootstrap entries for the current configuration.
///
/// Without user entries this prints `[{"kind", "module"}, ...]`; with them,
/// the merged list of module specifiers.
pub async fn execute(args: EntriesArgs) -> Result<()> {
    let config = super::load_config(&args.config)?;
    let server = LiveServer::new(config);

    let output = if args.entries.is_empty() {
        serde_json::to_string_pretty(&server.bootstrap_entries()?)?
    } else {
        let flags = server.client_flags()?;
        serde_json::to_string_pretty(&prepend_entries(&flags, &args.entries))?
    };

    println!("{}", output);
    Ok(())
}
