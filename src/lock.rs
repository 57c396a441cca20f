//! Lock-then-effect state guard.
//!
//! Every state machine in this crate mutates its state inside a
//! [`StateLock`] and hands back an optional [`Effect`]. The effect runs only
//! after the lock has been released, so forwarding demand upstream, calling a
//! downstream subscriber or cancelling a nested subscription can freely call
//! back into the same object without deadlocking.

use std::cell::RefCell;

use parking_lot::ReentrantMutex;

/// A deferred side effect computed under a [`StateLock`] and executed after
/// it is released.
pub type Effect<'a> = Box<dyn FnOnce() + 'a>;

/// Wraps `f` as a deferred effect.
#[inline]
pub fn effect<'a>(f: impl FnOnce() + 'a) -> Option<Effect<'a>> { Some(Box::new(f)) }

/// A recursive mutex around a state block.
///
/// Bodies passed to [`synchronize`](StateLock::synchronize) and
/// [`synchronized`](StateLock::synchronized) receive `&mut T` and must not
/// call back into the same `StateLock`; anything that may re-enter belongs in
/// the returned effect.
pub struct StateLock<T> {
  inner: ReentrantMutex<RefCell<T>>,
}

impl<T> StateLock<T> {
  pub fn new(state: T) -> Self { Self { inner: ReentrantMutex::new(RefCell::new(state)) } }

  /// Runs `body` while holding the lock and returns its value.
  pub fn synchronize<R>(&self, body: impl FnOnce(&mut T) -> R) -> R {
    let guard = self.inner.lock();
    let mut state = guard.borrow_mut();
    body(&mut state)
  }

  /// Runs `body` while holding the lock, then runs the effect it returned
  /// (if any) exactly once after the lock is released.
  pub fn synchronized<'a>(&self, body: impl FnOnce(&mut T) -> Option<Effect<'a>>) {
    if let Some(effect) = self.synchronize(body) {
      effect();
    }
  }

  /// Holds the lock across `body` without borrowing the state.
  ///
  /// Other threads are kept out for the whole call while the current thread
  /// may still re-enter through `synchronize`/`synchronized`. Used to deliver
  /// a value downstream so that no terminal transition can interleave with
  /// the delivery.
  pub fn hold<R>(&self, body: impl FnOnce() -> R) -> R {
    let _guard = self.inner.lock();
    body()
  }
}

impl<T: Default> Default for StateLock<T> {
  fn default() -> Self { Self::new(T::default()) }
}
