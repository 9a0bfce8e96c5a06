use anyhow::Result;

use crate::api;
use crate::cli::actions::Action;

/// Handle the server action
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            backend,
            dsn,
            config,
        } => api::new(port, backend, dsn, config).await,
    }
}
