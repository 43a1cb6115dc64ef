//! Routes draw requests to the batch that should receive them.
//!
//! Routing is greedy and append-only: an instance joins the most recently
//! opened batch when that batch has the same signature and spare capacity,
//! otherwise a new batch is opened at the end of the submission order. Looking
//! further back would let a later draw land underneath an earlier one, so
//! interleaved signatures (A, B, A, B, ...) deliberately produce one batch per
//! run.

use astrelis_core::alloc::HashMap;

use crate::batch::Batch;
use crate::signature::ResourceSignature;

/// Per-signature bookkeeping.
#[derive(Debug, Default)]
struct SignatureBatches {
    /// Indices into `BatchRouter::active`, in creation order.
    active: Vec<usize>,
    /// Batches from earlier frames, reset and waiting for reuse.
    idle: Vec<Batch>,
    /// Consecutive retired frames in which this signature opened no batch.
    unused_frames: u64,
}

/// Maps signatures to batches for the frame being recorded.
#[derive(Debug, Default)]
pub struct BatchRouter {
    /// Batches in submission order.
    active: Vec<Batch>,
    by_signature: HashMap<ResourceSignature, SignatureBatches>,
    batches_created: u64,
}

impl BatchRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the batch that should receive the next instance for `signature`.
    ///
    /// The returned batch always has spare capacity.
    pub fn route(
        &mut self,
        signature: ResourceSignature,
        stride: usize,
        capacity: u32,
    ) -> &mut Batch {
        let reuse_tail = matches!(
            self.active.last(),
            Some(batch) if batch.signature() == signature && !batch.is_full()
        );

        if !reuse_tail {
            let index = self.active.len();
            let entry = self.by_signature.entry(signature).or_default();
            let batch = match entry.idle.pop() {
                Some(mut batch) if batch.capacity() == capacity && batch.stride() == stride => {
                    batch.reset();
                    batch
                }
                _ => {
                    self.batches_created += 1;
                    tracing::trace!(
                        "Allocating batch #{} for {} ({} x {} bytes)",
                        self.batches_created,
                        signature,
                        capacity,
                        stride
                    );
                    Batch::new(signature, stride, capacity)
                }
            };
            entry.active.push(index);
            self.active.push(batch);
        }

        let tail = self.active.len() - 1;
        &mut self.active[tail]
    }

    /// Active batches in submission order.
    pub fn batches(&self) -> &[Batch] {
        &self.active
    }

    /// Active batches for one signature, in creation order.
    pub fn batches_for(&self, signature: ResourceSignature) -> impl Iterator<Item = &Batch> {
        self.by_signature
            .get(&signature)
            .into_iter()
            .flat_map(move |entry| entry.active.iter().map(move |&index| &self.active[index]))
    }

    /// Move every active batch back to its signature's idle list.
    ///
    /// Allocations (the active list, per-signature lists, staging arrays) are
    /// all kept for the next frame.
    pub fn retire_all(&mut self) {
        for entry in self.by_signature.values_mut() {
            if entry.active.is_empty() {
                entry.unused_frames += 1;
            } else {
                entry.unused_frames = 0;
                entry.active.clear();
            }
        }
        for mut batch in self.active.drain(..) {
            batch.reset();
            if let Some(entry) = self.by_signature.get_mut(&batch.signature()) {
                entry.idle.push(batch);
            }
        }
    }

    /// Drop the idle batches, and the bookkeeping, of every signature that
    /// has not been drawn for more than `max_unused_frames` frames.
    ///
    /// Call between frames, after [`retire_all`](Self::retire_all).
    pub fn evict_idle(&mut self, max_unused_frames: u64) -> usize {
        let mut evicted = 0;
        self.by_signature.retain(|_, entry| {
            if entry.active.is_empty() && entry.unused_frames > max_unused_frames {
                evicted += entry.idle.len();
                false
            } else {
                true
            }
        });
        if evicted > 0 {
            tracing::debug!("Evicted {} idle batches", evicted);
        }
        evicted
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Number of batches opened this frame.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of batches parked for reuse.
    pub fn idle_count(&self) -> usize {
        self.by_signature.values().map(|entry| entry.idle.len()).sum()
    }

    /// Total batches (and staging arrays) ever allocated.
    pub fn batches_created(&self) -> u64 {
        self.batches_created
    }
}
