//! Cancellable single-shot timers.
//!
//! A [`TimerSlot`] holds at most one scheduled timer. Scheduling replaces
//! (and aborts) whatever was pending, and every timer carries an id so a
//! firing that was already queued when it got replaced can be recognised as
//! stale and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Slot for one outstanding single-shot timer.
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<(TimerId, JoinHandle<()>)>,
    next_id: u64,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to be delivered on `events` after `delay`.
    ///
    /// Any timer already pending in this slot is cancelled first.
    pub fn schedule<E, F>(&mut self, delay: Duration, events: &mpsc::UnboundedSender<E>, event: F) -> TimerId
    where
        E: Send + 'static,
        F: FnOnce(TimerId) -> E + Send + 'static,
    {
        self.cancel();
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let events = events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event(id));
        });
        self.pending = Some((id, handle));
        id
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }
    }

    /// Accept a firing. Returns false (and leaves the slot untouched) when
    /// `id` is not the currently pending timer.
    pub fn fire(&mut self, id: TimerId) -> bool {
        match self.pending {
            Some((current, _)) if current == id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TimerSlot::new();

        let id = slot.schedule(Duration::from_millis(5000), &tx, |id| id);
        assert!(slot.is_pending());

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, id);
        assert!(slot.fire(fired));
        assert!(!slot.is_pending());
        assert!(!slot.fire(fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TimerSlot::new();

        let first = slot.schedule(Duration::from_millis(100), &tx, |id| id);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = slot.schedule(Duration::from_millis(100), &tx, |id| id);
        assert_ne!(first, second);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(rx.try_recv().ok(), Some(second));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerId>();
        let mut slot = TimerSlot::new();

        slot.schedule(Duration::from_millis(100), &tx, |id| id);
        slot.cancel();
        assert!(!slot.is_pending());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_firing_is_rejected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TimerSlot::new();

        let first = slot.schedule(Duration::from_millis(10), &tx, |id| id);
        tokio::time::sleep(Duration::from_millis(20)).await;
        // first has fired and is queued, then gets replaced
        let second = slot.schedule(Duration::from_millis(10), &tx, |id| id);

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued, first);
        assert!(!slot.fire(queued));
        assert!(slot.is_pending());

        let next = rx.recv().await.unwrap();
        assert_eq!(next, second);
        assert!(slot.fire(next));
    }
}
