// Scoped cleanup for test deployments

use crate::deployment::{DeploymentClient, Result};
use std::future::Future;
use tracing::warn;

/// Run `body` against deployment `name`, then delete the deployment no matter
/// how `body` finished.
///
/// The body's error wins over a cleanup error; a cleanup failure after a
/// successful body is returned as the result.
pub async fn with_deployment<T, F, Fut>(client: &DeploymentClient, name: &str, body: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcome = body().await;
    let cleanup = client.delete(name).await;

    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!(
                deployment = %name,
                error = %cleanup_err,
                "cleanup failed after an earlier failure"
            );
            Err(e)
        }
    }
}
