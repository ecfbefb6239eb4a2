use crate::models::error::SError;
use tokio::task::spawn_blocking;

/// Runs blocking registry or filesystem work off the async runtime.
pub async fn run_blocking<F, R>(f: F) -> Result<R, SError>
where
    F: FnOnce() -> Result<R, SError> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| SError::AsyncRuntimeError(e.to_string()))?
}
