use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// A held slot; capacity returns to the pool when it is dropped.
pub type Slot = OwnedSemaphorePermit;

/// Fixed-capacity pool of execution slots shared by every batch run.
///
/// Cloning yields another handle to the same slots.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    /// Wait for a free slot. Waiters are served in FIFO order.
    pub async fn acquire(&self) -> Result<Slot, AcquireError> {
        Arc::clone(&self.slots).acquire_owned().await
    }
}
