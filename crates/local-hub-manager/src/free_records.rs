//! Deferred invocation of per-message free callbacks.
//!
//! When an application hands `send_message` a payload together with a free
//! callback, the callback must fire exactly once — after delivery succeeds
//! or fails, never both, never left dangling. Owned by the event-loop task,
//! same rationale as [`crate::ready_events::ReadyEventSubscriptions`].

use tracing::warn;

/// Maximum number of in-flight free-callback records. The original bounds
/// this the same way it bounds every other table; a sender that races past
/// the bound gets its callback invoked immediately instead of queued.
pub const MAX_FREE_RECORDS: usize = 128;

pub type FreeCallback = Box<dyn FnOnce() + Send + 'static>;

struct FreeRecord {
    id: u64,
    callback: FreeCallback,
}

#[derive(Default)]
pub struct MessageFreeRecords {
    records: Vec<FreeRecord>,
    next_id: u64,
}

impl MessageFreeRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a free callback, returning a handle to redeem later. If the
    /// table is full, the callback fires immediately and no handle is
    /// issued.
    pub fn register(&mut self, callback: FreeCallback) -> Option<u64> {
        if self.records.len() >= MAX_FREE_RECORDS {
            warn!("message free-record table full, invoking callback inline");
            callback();
            return None;
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.records.push(FreeRecord { id, callback });
        Some(id)
    }

    /// Invoke and remove the callback for `id`, if still present. Safe to
    /// call more than once for the same id (a no-op after the first).
    pub fn redeem(&mut self, id: u64) {
        if let Some(pos) = self.records.iter().position(|r| r.id == id) {
            let record = self.records.remove(pos);
            (record.callback)();
        }
    }

    pub fn pending(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn redeem_invokes_exactly_once() {
        let mut table = MessageFreeRecords::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counted = count.clone();
        let id = table
            .register(Box::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        table.redeem(id);
        table.redeem(id);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn full_table_runs_inline() {
        let mut table = MessageFreeRecords::new();
        for _ in 0..MAX_FREE_RECORDS {
            table.register(Box::new(|| {})).unwrap();
        }
        let count = Arc::new(AtomicUsize::new(0));
        let counted = count.clone();
        let handle = table.register(Box::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(handle.is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
