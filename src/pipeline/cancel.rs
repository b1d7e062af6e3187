//! Broadcast cancellation for pipeline workers.
//!
//! The signal is a crossbeam channel that never carries a message: dropping
//! the only sender disconnects it, which wakes every worker blocked in a
//! `select!` on a token at once.

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};

/// Owning side of a cancellation signal. Cancelling consumes it.
#[derive(Debug)]
pub struct CancelSource {
    _tx: Sender<()>,
    token: CancelToken,
}

/// Cloneable view of a cancellation signal, handed to every worker.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            _tx: tx,
            token: CancelToken { rx },
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Broadcasts cancellation to every token.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Returns true once the source has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver to place in a `select!`. It becomes ready only on cancellation.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::select;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_token_not_cancelled_initially() {
        let source = CancelSource::new();
        assert!(!source.token().is_cancelled());
    }

    #[test]
    fn test_cancel_reaches_every_token() {
        let source = CancelSource::new();
        let a = source.token();
        let b = a.clone();

        source.cancel();

        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_cancel_wakes_blocked_select() {
        let source = CancelSource::new();
        let token = source.token();
        let (_tx, rx) = bounded::<u32>(1);

        let waiter = thread::spawn(move || {
            select! {
                recv(rx) -> _ => "input",
                recv(token.receiver()) -> _ => "cancelled",
            }
        });

        thread::sleep(Duration::from_millis(20));
        source.cancel();

        assert_eq!(waiter.join().unwrap(), "cancelled");
    }
}
