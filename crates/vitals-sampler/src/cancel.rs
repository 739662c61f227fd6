//! Cooperative cancellation over a `watch` channel.
//!
//! A cancel signal is the receiving half of `tokio::sync::watch::channel(false)`.
//! Flipping the value to `true` or dropping the sender both cancel; every
//! suspension point in this crate selects over [`cancelled`].

use tokio::sync::watch;

/// Whether the signal has already fired.
pub fn is_cancelled(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

/// Resolves once the signal fires or its sender is dropped. Never resolves
/// otherwise, so it is only useful inside `tokio::select!`.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: the owner was torn down.
            return;
        }
    }
}
