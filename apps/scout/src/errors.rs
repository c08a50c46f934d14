use thiserror::Error;

use crate::jobs::source::JobSourceError;
use crate::notify::SinkError;

/// Run-level error. Anything that reaches `main` as an `AppError` ends the
/// run with a failure notification and a non-zero exit code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Job source error: {0}")]
    JobSource(#[from] JobSourceError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] SinkError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
