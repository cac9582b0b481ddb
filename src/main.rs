use fabscan::{init_logging, run_from};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging()?;

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    match run_from(config_path.as_deref())? {
        Some(request) if request.restarts_server() => {
            tracing::info!("Host should {} and start the server again", request)
        }
        Some(request) => tracing::info!("Host should {}", request),
        None => {}
    }

    Ok(())
}
