//! Unified error type for the Framepump client.

use framepump_dispatch::{DispatchError, RegistryError, RouteError};
use framepump_protocol::ProtocolError;
use framepump_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `framepump` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate; the `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum FramepumpError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A routing error (unknown tag, conversion failure, disconnected).
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A registration error (duplicate tag).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A consumer-side dispatch error (unknown tag, type mismatch).
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
