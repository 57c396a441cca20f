use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

use parking_lot::Mutex;

use super::{Cancellable, ClosureCancellable};

type Slot = Arc<Mutex<Option<Arc<dyn Cancellable>>>>;

/// A type-erased, cloneable cancellation handle.
///
/// All clones share one slot. The first `cancel` takes the wrapped handle out
/// of the slot and cancels it; every later call (from any clone or thread)
/// finds the slot empty and does nothing. The wrapped resource is therefore
/// cancelled at most once.
#[derive(Clone)]
pub struct AnyCancellable(Slot);

impl AnyCancellable {
  pub fn new<C: Cancellable + 'static>(cancellable: C) -> Self {
    Self::from_arc(Arc::new(cancellable))
  }

  pub fn from_arc(cancellable: Arc<dyn Cancellable>) -> Self {
    Self(Arc::new(Mutex::new(Some(cancellable))))
  }

  /// Wraps a teardown closure.
  pub fn from_fn<F>(f: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Self::new(ClosureCancellable::new(f))
  }

  /// A handle with nothing to cancel.
  pub fn empty() -> Self { Self(Arc::new(Mutex::new(None))) }

  /// `true` once `cancel` has been called on this handle or any clone.
  pub fn is_cancelled(&self) -> bool { self.0.lock().is_none() }

  /// Activates RAII behavior: the returned guard cancels on drop.
  ///
  /// **Attention:** If you don't bind the guard to a variable, it is dropped
  /// (and cancels) immediately.
  pub fn cancel_on_drop(self) -> CancelGuard { CancelGuard(Some(self)) }
}

impl Cancellable for AnyCancellable {
  fn cancel(&self) {
    let inner = self.0.lock().take();
    if let Some(inner) = inner {
      inner.cancel();
    }
  }
}

impl Debug for AnyCancellable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AnyCancellable")
      .field("is_cancelled", &self.is_cancelled())
      .finish()
  }
}

/// A scoped cancellation handle; cancels when dropped.
#[derive(Debug)]
#[must_use]
pub struct CancelGuard(Option<AnyCancellable>);

impl CancelGuard {
  /// Gives up the RAII behavior and returns the plain handle.
  pub fn into_inner(mut self) -> AnyCancellable {
    self.0.take().unwrap_or_else(AnyCancellable::empty)
  }
}

impl Drop for CancelGuard {
  fn drop(&mut self) {
    if let Some(handle) = self.0.take() {
      handle.cancel();
    }
  }
}
