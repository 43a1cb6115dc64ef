//! Error types for the batch engine.

use astrelis_test_utils::GpuError;

use crate::session::SessionState;
use crate::signature::{ContentHandle, LayoutId, ResourceSignature};

/// A frame-protocol call was made in the wrong session state.
///
/// This is a broken call contract (e.g. `begin_frame` twice, `append` after
/// `end_frame`), not a runtime condition. The session state is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolError {
    /// The operation that was attempted.
    pub operation: &'static str,
    /// The state the session was in.
    pub state: SessionState,
    /// The state the operation requires.
    pub expected: SessionState,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`{}` called while the frame session is {:?} (expected {:?})",
            self.operation, self.state, self.expected
        )
    }
}

impl std::error::Error for ProtocolError {}

/// Why a signature was rejected at append time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidSignatureReason {
    /// The content handle was never registered.
    Unregistered,
    /// The content handle is registered but not ready yet.
    Pending,
    /// The instance type does not match the signature's layout.
    LayoutMismatch { expected: LayoutId, actual: LayoutId },
    /// Another instance type already uses this layout id with a different
    /// stride, shader or attribute set, or the layout has a zero stride.
    LayoutConflict { layout: LayoutId },
}

/// A draw request referenced content that cannot be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSignature {
    pub handle: ContentHandle,
    pub reason: InvalidSignatureReason,
}

impl std::fmt::Display for InvalidSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            InvalidSignatureReason::Unregistered => {
                write!(f, "Content {} is not registered", self.handle)
            }
            InvalidSignatureReason::Pending => {
                write!(f, "Content {} is not ready yet", self.handle)
            }
            InvalidSignatureReason::LayoutMismatch { expected, actual } => write!(
                f,
                "Instance layout {} does not match signature layout {} (content {})",
                actual, expected, self.handle
            ),
            InvalidSignatureReason::LayoutConflict { layout } => write!(
                f,
                "Instance layout {} conflicts with the layout registered under that id (content {})",
                layout, self.handle
            ),
        }
    }
}

impl std::error::Error for InvalidSignature {}

/// Error returned from `append` and the `draw*` helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendError {
    Protocol(ProtocolError),
    InvalidSignature(InvalidSignature),
}

impl std::fmt::Display for AppendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppendError::Protocol(err) => write!(f, "Protocol error: {}", err),
            AppendError::InvalidSignature(err) => write!(f, "Invalid signature: {}", err),
        }
    }
}

impl std::error::Error for AppendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppendError::Protocol(err) => Some(err),
            AppendError::InvalidSignature(err) => Some(err),
        }
    }
}

impl From<ProtocolError> for AppendError {
    fn from(err: ProtocolError) -> Self {
        AppendError::Protocol(err)
    }
}

impl From<InvalidSignature> for AppendError {
    fn from(err: InvalidSignature) -> Self {
        AppendError::InvalidSignature(err)
    }
}

/// Kind of GPU resource that failed to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pipeline,
    InstanceBuffer,
    UniformBuffer,
    UniformBinding,
    /// The content bound to a textured batch went away before flush.
    ContentBinding,
}

/// A pipeline or buffer could not be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCreationError {
    pub resource: ResourceKind,
    pub label: &'static str,
    pub source: GpuError,
}

impl ResourceCreationError {
    pub(crate) fn new(resource: ResourceKind, label: &'static str, source: GpuError) -> Self {
        Self {
            resource,
            label,
            source,
        }
    }
}

impl std::fmt::Display for ResourceCreationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to create {:?} '{}': {}",
            self.resource, self.label, self.source
        )
    }
}

impl std::error::Error for ResourceCreationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A batch whose draw call was skipped during flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawFailure {
    pub signature: ResourceSignature,
    /// Position of the batch in the frame's submission order.
    pub batch_index: usize,
    pub instance_count: u32,
    pub error: ResourceCreationError,
}

impl std::fmt::Display for DrawFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Batch {} ({} instances, {}) was not drawn: {}",
            self.batch_index, self.instance_count, self.signature, self.error
        )
    }
}

impl std::error::Error for DrawFailure {}

/// Errors that can occur when creating a [`GraphicsContext`](crate::GraphicsContext).
#[derive(Debug, Clone)]
pub enum GraphicsError {
    /// No adapter matched the requested options.
    NoAdapter,
    /// The adapter refused to create a device.
    DeviceCreation(String),
}

impl std::fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphicsError::NoAdapter => write!(f, "No suitable GPU adapter found"),
            GraphicsError::DeviceCreation(msg) => write!(f, "Failed to create device: {}", msg),
        }
    }
}

impl std::error::Error for GraphicsError {}
