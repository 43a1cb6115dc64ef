//! A bounded run of instances sharing one resource signature.

use crate::signature::ResourceSignature;

/// Fixed-capacity CPU staging array for one signature.
///
/// The staging array is sized once at creation (`capacity * stride` bytes)
/// and reused across frames; appends never grow it.
#[derive(Debug)]
pub struct Batch {
    signature: ResourceSignature,
    capacity: u32,
    stride: usize,
    instance_count: u32,
    staging: Vec<u8>,
}

impl Batch {
    /// Create a batch holding up to `capacity` records of `stride` bytes.
    pub fn new(signature: ResourceSignature, stride: usize, capacity: u32) -> Self {
        assert!(stride > 0, "Instance stride must be non-zero");
        assert!(capacity > 0, "Batch capacity must be non-zero");
        Self {
            signature,
            capacity,
            stride,
            instance_count: 0,
            staging: vec![0; stride * capacity as usize],
        }
    }

    pub fn signature(&self) -> ResourceSignature {
        self.signature
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn is_empty(&self) -> bool {
        self.instance_count == 0
    }

    pub fn is_full(&self) -> bool {
        self.instance_count == self.capacity
    }

    /// Byte size of the full staging array.
    pub fn staging_size(&self) -> usize {
        self.staging.len()
    }

    /// Append one instance record.
    ///
    /// Returns `false` when the batch is full; the caller must route the
    /// instance to a new batch.
    ///
    /// # Panics
    ///
    /// Panics if `instance` is not exactly one stride long.
    #[inline]
    pub fn try_append(&mut self, instance: &[u8]) -> bool {
        assert_eq!(
            instance.len(),
            self.stride,
            "Instance data size does not match batch stride"
        );
        self.try_append_with(|dst| dst.copy_from_slice(instance))
    }

    /// Append one instance record written in place by `write`.
    ///
    /// `write` receives exactly one stride of staging memory.
    #[inline]
    pub fn try_append_with(&mut self, write: impl FnOnce(&mut [u8])) -> bool {
        if self.is_full() {
            return false;
        }
        let start = self.instance_count as usize * self.stride;
        write(&mut self.staging[start..start + self.stride]);
        self.instance_count += 1;
        true
    }

    /// Forget all instances. Staging memory is left as is and overwritten by
    /// subsequent appends.
    pub fn reset(&mut self) {
        self.instance_count = 0;
    }

    /// The valid prefix of the staging array.
    pub fn staging_view(&self) -> &[u8] {
        &self.staging[..self.instance_count as usize * self.stride]
    }
}
