use crate::store::StoreError;

/// Failure taxonomy for the metering core. Nothing here is process-fatal:
/// every path resolves to a typed outcome the presentation layer can render.
#[derive(Debug, thiserror::Error)]
pub enum MeteringError {
    /// No identified user. Recovered locally by metering against a
    /// process-stable anonymous id.
    #[error("no signed-in user")]
    AuthenticationMissing,

    /// Network or store failure on a remote read or write. Propagates; the
    /// coordinator fails closed.
    #[error("counter store unavailable: {0}")]
    RemoteUnavailable(String),

    /// The purchase transaction ledger could not be verified and no prior
    /// verification exists to fall back on.
    #[error("purchase verification failed: {0}")]
    VerificationFailed(String),

    /// A stored counter that cannot even be parsed as a document. Recovered
    /// locally by rebuilding the counter.
    #[error("invalid persisted counter state: {0}")]
    InvalidPersistedState(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for MeteringError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Parse(detail) => MeteringError::InvalidPersistedState(detail),
            other => MeteringError::RemoteUnavailable(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for MeteringError {
    fn from(err: config::ConfigError) -> Self {
        MeteringError::Config(err.to_string())
    }
}
