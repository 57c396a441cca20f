use parking_lot::Mutex;

use super::Cancellable;

/// A cancellation handle that runs a closure the first time it is cancelled.
///
/// # Examples
///
/// ```rust
/// use std::sync::{
///   atomic::{AtomicUsize, Ordering},
///   Arc,
/// };
///
/// use backpressure_rx::prelude::*;
///
/// let count = Arc::new(AtomicUsize::new(0));
/// let c_count = count.clone();
/// let handle = ClosureCancellable::new(move || {
///   c_count.fetch_add(1, Ordering::SeqCst);
/// });
///
/// handle.cancel();
/// handle.cancel();
/// assert_eq!(count.load(Ordering::SeqCst), 1);
/// ```
pub struct ClosureCancellable<F>(Mutex<Option<F>>);

impl<F> ClosureCancellable<F>
where
  F: FnOnce() + Send,
{
  pub fn new(f: F) -> Self { Self(Mutex::new(Some(f))) }
}

impl<F> Cancellable for ClosureCancellable<F>
where
  F: FnOnce() + Send,
{
  fn cancel(&self) {
    // Release the mutex before running the teardown.
    let f = self.0.lock().take();
    if let Some(f) = f {
      f();
    }
  }
}
