//! Readiness tracking for content handles.

use astrelis_core::alloc::HashMap;
use astrelis_test_utils::GpuBindGroup;

use crate::error::{InvalidSignature, InvalidSignatureReason};
use crate::signature::ContentHandle;

/// State of a registered content handle.
#[derive(Debug, Clone)]
pub enum ContentBinding {
    /// Registered, but the texture is still loading.
    Pending,
    /// Ready to draw with this bind group at group 1.
    Ready(GpuBindGroup),
}

/// Maps content handles to the bind groups that shade them.
#[derive(Debug, Default)]
pub struct ContentRegistry {
    entries: HashMap<ContentHandle, ContentBinding>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the binding for `handle`.
    pub fn register(&mut self, handle: ContentHandle, binding: ContentBinding) {
        self.entries.insert(handle, binding);
    }

    /// Mark a registered handle as not ready. Unknown handles are registered
    /// as pending.
    pub fn mark_pending(&mut self, handle: ContentHandle) {
        self.entries.insert(handle, ContentBinding::Pending);
    }

    pub fn unregister(&mut self, handle: ContentHandle) -> Option<ContentBinding> {
        self.entries.remove(&handle)
    }

    /// Check that `handle` can be drawn with a layout that does (or does not)
    /// sample content.
    ///
    /// Untextured layouts accept any handle; [`ContentHandle::NONE`] is
    /// accepted by every layout and binds nothing.
    pub fn validate(&self, handle: ContentHandle, textured: bool) -> Result<(), InvalidSignature> {
        if !textured || handle.is_none() {
            return Ok(());
        }
        match self.entries.get(&handle) {
            Some(ContentBinding::Ready(_)) => Ok(()),
            Some(ContentBinding::Pending) => Err(InvalidSignature {
                handle,
                reason: InvalidSignatureReason::Pending,
            }),
            None => Err(InvalidSignature {
                handle,
                reason: InvalidSignatureReason::Unregistered,
            }),
        }
    }

    /// The bind group for a ready handle.
    pub fn binding(&self, handle: ContentHandle) -> Option<&GpuBindGroup> {
        match self.entries.get(&handle) {
            Some(ContentBinding::Ready(bind_group)) => Some(bind_group),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
