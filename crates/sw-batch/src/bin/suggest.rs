use std::io;

use tracing::error;
use tracing_subscriber::EnvFilter;

use sw_batch::{exit_code, load_request, run, write_response, REQUEST_ENV};
use sw_types::SwError;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let code = match suggest() {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "suggestion failed");
            err.downcast_ref::<SwError>().map(exit_code).unwrap_or(1)
        }
    };
    std::process::exit(code);
}

fn suggest() -> anyhow::Result<()> {
    let path = std::env::var(REQUEST_ENV).ok();
    let request = load_request(path.as_deref())?;
    let response = run(request)?;
    write_response(io::stdout().lock(), &response)?;
    Ok(())
}
