use log::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::RunError;
use crate::registry::DriverRegistry;

/// Opens one session, runs the query, and closes the session on every path.
pub async fn run(registry: &DriverRegistry, settings: &Settings) -> Result<String, RunError> {
    let backend = registry.get(&settings.driver)?;
    debug!("Using backend '{}'", backend.name());

    let mut session = backend.open(&settings.dsn).await?;
    debug!("Connected; running query");

    let outcome = session.query_scalar(&settings.query).await;
    let closed = session.close().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => {
            info!("Query succeeded");
            Ok(value)
        }
        (Ok(value), Err(e)) => {
            warn!("{e}");
            Ok(value)
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            error!("{close_err}");
            Err(e)
        }
    }
}
