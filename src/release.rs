//! Release registry: pending completion callbacks keyed by stable identity.
//!
//! A coordinator that presents something (a screen, a dialog, a child flow)
//! registers a callback and keeps the returned [`ReleaseKey`]. When the
//! presented thing goes away the owner completes that key, or hands the
//! registry the keys that are still alive and lets it release every other one
//! via [`ReleaseRegistry::complete_missing`].
//!
//! The registry is an ordinary owned value: there is no global table, and
//! dropping the registry drops pending callbacks without running them.

use std::{
  convert::Infallible,
  fmt::{Display, Formatter},
  sync::{Arc, Weak},
};

use tracing::trace;

use crate::{
  lock::{effect, StateLock},
  publisher::{Coordinate, CoordinateSubscriber},
  slots::IdSlots,
  subscriber::Completion,
  subscription::AnyCancellable,
};

/// Stable identity of one registered release callback.
///
/// Keys are allocated from a counter and never reused by the same registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseKey(usize);

/// Why a release could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
  /// The key was never issued by this registry.
  UnknownKey(ReleaseKey),
  /// The key was issued but has already been completed or removed.
  NotPending(ReleaseKey),
}

impl Display for ReleaseError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ReleaseError::UnknownKey(key) => write!(f, "release key {} was never issued", key.0),
      ReleaseError::NotPending(key) => {
        write!(f, "release key {} is no longer pending", key.0)
      }
    }
  }
}

impl std::error::Error for ReleaseError {}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// A signal publisher that emits `()` and finishes once its key is released.
pub type ReleaseSignal = Coordinate<(), Infallible>;

/// Owned mapping from [`ReleaseKey`] to a pending completion callback.
#[derive(Default)]
pub struct ReleaseRegistry {
  pending: StateLock<IdSlots<ReleaseFn>>,
}

impl ReleaseRegistry {
  pub fn new() -> Self { Self::default() }

  /// Registers `callback` and returns the key that releases it.
  pub fn register<F>(&self, callback: F) -> ReleaseKey
  where
    F: FnOnce() + Send + 'static,
  {
    let key = ReleaseKey(self.pending.synchronize(|pending| pending.add(Box::new(callback))));
    trace!(key = key.0, "release registered");
    key
  }

  /// Runs the callback for `key` once. Returns `false` if nothing was pending.
  pub fn complete(&self, key: ReleaseKey) -> bool { self.try_complete(key).is_ok() }

  /// Like [`complete`](Self::complete), reporting why nothing ran.
  pub fn try_complete(&self, key: ReleaseKey) -> Result<(), ReleaseError> {
    let callback = self.pending.synchronize(|pending| match pending.remove(key.0) {
      Some(callback) => Ok(callback),
      None if pending.was_issued(key.0) => Err(ReleaseError::NotPending(key)),
      None => Err(ReleaseError::UnknownKey(key)),
    })?;
    trace!(key = key.0, "release completed");
    callback();
    Ok(())
  }

  /// Releases every pending key that is not among `live`, in registration
  /// order, and returns the released keys.
  pub fn complete_missing(&self, live: &[ReleaseKey]) -> Vec<ReleaseKey> {
    let released = self
      .pending
      .synchronize(|pending| pending.extract_unless(|id| live.contains(&ReleaseKey(id))));
    released
      .into_iter()
      .map(|(id, callback)| {
        trace!(key = id, "release completed for missing key");
        callback();
        ReleaseKey(id)
      })
      .collect()
  }

  /// Forgets `key` without running its callback.
  pub fn remove(&self, key: ReleaseKey) -> bool {
    self.pending.synchronize(|pending| pending.remove(key.0).is_some())
  }

  pub fn contains(&self, key: ReleaseKey) -> bool {
    self.pending.synchronize(|pending| pending.contains(key.0))
  }

  /// Pending keys, in registration order.
  pub fn keys(&self) -> Vec<ReleaseKey> {
    self.pending.synchronize(|pending| pending.ids().map(ReleaseKey).collect())
  }

  pub fn len(&self) -> usize { self.pending.synchronize(|pending| pending.len()) }

  pub fn is_empty(&self) -> bool { self.pending.synchronize(|pending| pending.is_empty()) }

  /// Registers a release whose completion is observable as a publisher.
  ///
  /// The returned [`ReleaseSignal`] emits `()` and finishes when the key is
  /// completed; subscribers arriving after that see it immediately. It is
  /// meant to be the signal of a `take_until`.
  pub fn signal(&self) -> (ReleaseKey, ReleaseSignal) {
    let latch = Arc::new(Latch { state: StateLock::new(LatchState::Pending(IdSlots::default())) });
    let c_latch = latch.clone();
    let key = self.register(move || c_latch.release());

    let weak = Arc::downgrade(&latch);
    let signal = Coordinate::new(move |subscriber| match weak.upgrade() {
      Some(latch) => latch.watch(subscriber),
      // The registry (and with it the pending release) is gone: never fires.
      None => AnyCancellable::empty(),
    });
    (key, signal)
  }
}

type Watcher = CoordinateSubscriber<(), Infallible>;

enum LatchState {
  Pending(IdSlots<Watcher>),
  Released,
}

struct Latch {
  state: StateLock<LatchState>,
}

impl Latch {
  fn release(&self) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, LatchState::Released) {
        LatchState::Pending(mut watchers) => {
          let watchers: Vec<_> = watchers.drain().collect();
          effect(move || watchers.iter().for_each(notify))
        }
        LatchState::Released => None,
      }
    });
  }

  fn watch(self: Arc<Self>, watcher: Watcher) -> AnyCancellable {
    let id = self.state.synchronize(|state| match state {
      LatchState::Pending(watchers) => Some(watchers.add(watcher.clone())),
      LatchState::Released => None,
    });
    let Some(id) = id else {
      notify(&watcher);
      return AnyCancellable::empty();
    };

    let latch: Weak<Self> = Arc::downgrade(&self);
    AnyCancellable::from_fn(move || {
      if let Some(latch) = latch.upgrade() {
        latch.state.synchronize(|state| {
          if let LatchState::Pending(watchers) = state {
            watchers.remove(id);
          }
        });
      }
    })
  }
}

fn notify(watcher: &Watcher) {
  watcher.send(());
  watcher.send_completion(Completion::Finished);
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::{
    demand::Demand,
    publisher::{from_iter, Publisher, PublisherExt},
    test_support::RecordingSubscriber,
  };

  fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let c_count = count.clone();
    (count, move || {
      c_count.fetch_add(1, Ordering::SeqCst);
    })
  }

  #[test]
  fn complete_runs_callback_once() {
    let registry = ReleaseRegistry::new();
    let (count, callback) = counter();
    let key = registry.register(callback);

    assert!(registry.contains(key));
    assert!(registry.complete(key));
    assert!(!registry.complete(key));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
  }

  #[test]
  fn try_complete_reports_reason() {
    let registry = ReleaseRegistry::new();
    let key = registry.register(|| {});
    registry.complete(key);

    assert_eq!(registry.try_complete(key), Err(ReleaseError::NotPending(key)));
    let foreign = ReleaseKey(42);
    assert_eq!(registry.try_complete(foreign), Err(ReleaseError::UnknownKey(foreign)));
    assert_eq!(
      ReleaseError::UnknownKey(foreign).to_string(),
      "release key 42 was never issued"
    );
  }

  #[test]
  fn complete_missing_releases_everything_not_live() {
    let registry = ReleaseRegistry::new();
    let (a_count, a) = counter();
    let (b_count, b) = counter();
    let (c_count, c) = counter();
    let a = registry.register(a);
    let b = registry.register(b);
    let c = registry.register(c);

    let released = registry.complete_missing(&[b]);

    assert_eq!(released, vec![a, c]);
    assert_eq!(registry.keys(), vec![b]);
    assert_eq!(a_count.load(Ordering::SeqCst), 1);
    assert_eq!(b_count.load(Ordering::SeqCst), 0);
    assert_eq!(c_count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn remove_forgets_without_running() {
    let registry = ReleaseRegistry::new();
    let (count, callback) = counter();
    let key = registry.register(callback);

    assert!(registry.remove(key));
    assert!(!registry.complete(key));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(registry.len(), 0);
  }

  #[test]
  fn callback_may_register_again() {
    let registry = Arc::new(ReleaseRegistry::new());
    let c_registry = registry.clone();
    let key = registry.register(move || {
      c_registry.register(|| {});
    });

    registry.complete(key);
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn signal_fires_on_release() {
    let registry = ReleaseRegistry::new();
    let (key, signal) = registry.signal();
    let subscriber = RecordingSubscriber::<(), Infallible>::new();
    signal.subscribe(subscriber.clone());
    assert!(subscriber.values().is_empty());

    registry.complete(key);

    assert_eq!(subscriber.values(), vec![()]);
    assert_eq!(subscriber.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn late_signal_subscriber_sees_release() {
    let registry = ReleaseRegistry::new();
    let (key, signal) = registry.signal();
    registry.complete(key);

    let subscriber = RecordingSubscriber::<(), Infallible>::new();
    signal.subscribe(subscriber.clone());
    assert_eq!(subscriber.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn signal_bounds_a_stream() {
    let registry = ReleaseRegistry::new();
    let (key, signal) = registry.signal();
    let subscriber = RecordingSubscriber::<i32, Infallible>::new();

    from_iter(0..).take_until(signal).subscribe(subscriber.clone());
    subscriber.request(Demand::max(2));
    registry.complete(key);
    subscriber.request(Demand::max(2));

    assert_eq!(subscriber.values(), vec![0, 1]);
    assert_eq!(subscriber.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn cancelled_watcher_is_not_notified() {
    let registry = ReleaseRegistry::new();
    let (key, signal) = registry.signal();
    let subscriber = RecordingSubscriber::<(), Infallible>::new();
    signal.subscribe(subscriber.clone());
    subscriber.cancel();

    registry.complete(key);
    assert!(subscriber.values().is_empty());
  }
}
