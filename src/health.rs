//! Health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Can the service reach its database? |

use tracing::warn;

use crate::cars::CarRepository;
use crate::envelope::{self, Envelope};
use crate::error::ApiError;
use crate::request::Request;
use crate::router::PathArgs;

/// Liveness probe. Always `200`: if the process can answer HTTP, it is alive.
pub async fn liveness<S>(_: S, _: Request, _: PathArgs) -> Envelope {
    Envelope::success("ok", envelope::empty())
}

/// Readiness probe. `503` while the database does not answer.
pub async fn readiness(cars: CarRepository, _: Request, _: PathArgs) -> Result<Envelope, ApiError> {
    match cars.ping().await {
        Ok(()) => Ok(Envelope::success("ready", envelope::empty())),
        Err(e) => {
            warn!(error = %e, "readiness check failed");
            Err(ApiError::Unavailable("database unavailable".to_owned()))
        }
    }
}
