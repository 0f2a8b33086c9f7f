//! Top-level error types for Driftforge.

use thiserror::Error;

use crate::config::ConfigError;
use crate::connector::ConnectError;
use crate::credentials::CredentialError;
use crate::engine::ReconcileError;
use crate::lifecycle::{LifecycleError, ProviderError};
use crate::session::SessionError;
use crate::store::StoreError;

/// Top-level error type encompassing all Driftforge errors.
#[derive(Debug, Error)]
pub enum DriftforgeError {
    /// Error from secret storage operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("credentials error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("connect error: {0}")]
    Connect(#[from] ConnectError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Error from a reconcile cycle.
    #[error("reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),
}

/// Result alias using [`DriftforgeError`].
pub type Result<T, E = DriftforgeError> = std::result::Result<T, E>;
