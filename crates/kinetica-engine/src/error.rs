//! Engine error types.

use thiserror::Error;

/// Result of invoking an optional capability hook.
pub type HookResult = Result<(), HookError>;

/// Signal from user capability code back to the driver.
///
/// `Unsupported` is the static "this hook is not implemented" marker: the
/// driver memoises it and never calls the hook again for the rest of the
/// run. Anything else terminates the simulation.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("capability hook not implemented")]
    Unsupported,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Terminal simulation failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("node initializer failed: {cause}")]
    Initializer { cause: anyhow::Error },

    #[error("mover failed at t={now}: {cause}")]
    Mover { now: f64, cause: anyhow::Error },

    #[error("algorithm hook failed at t={now}: {cause}")]
    Algorithm { now: f64, cause: anyhow::Error },

    #[error("certificate rebuild failed at t={now}: {cause}")]
    Rebuild { now: f64, cause: anyhow::Error },

    #[error("audit rejected simulation state at t={now}: {cause}")]
    Audit { now: f64, cause: anyhow::Error },

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
