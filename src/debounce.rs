use std::time::{Duration, Instant};

/// Identifies one scheduled action. Superseded tickets never fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
    ticket: Ticket,
}

/// A cancellable one-shot timer for a single input stream.
///
/// Scheduling replaces whatever was pending, so only the last value scheduled
/// inside the window is ever delivered. Time is passed in by the caller; the
/// event loop polls with `Instant::now()` and tests drive it by hand.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<Pending<T>>,
    next_ticket: u64,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn schedule(&mut self, value: T, now: Instant) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        if self.pending.is_some() {
            tracing::trace!(ticket = ticket.0, "superseding pending debounce");
        }
        self.pending = Some(Pending {
            value,
            deadline: now + self.window,
            ticket,
        });
        ticket
    }

    /// Drop the pending action, if any. Returns whether something was cancelled.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Deliver the pending value once its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.pending.as_ref().is_some_and(|p| now >= p.deadline);
        if due {
            self.flush()
        } else {
            None
        }
    }

    /// Timer-callback style delivery: a stale ticket is a no-op.
    pub fn fire(&mut self, ticket: Ticket) -> Option<T> {
        let current = self.pending.as_ref().is_some_and(|p| p.ticket == ticket);
        if current {
            self.flush()
        } else {
            None
        }
    }

    /// Deliver the pending value now, ignoring the window.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }
}
