//! PassthroughSubject: a hot, multicast publisher driven by hand.
//!
//! Values sent through the subject go to every subscriber that currently has
//! outstanding demand; subscribers without demand miss the value. Nothing is
//! buffered. Once the subject completes, later subscribers receive the same
//! completion right after their subscription.

use std::sync::{Arc, Weak};

use crate::{
  demand::Demand,
  lock::{effect, StateLock},
  publisher::Publisher,
  slots::IdSlots,
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription},
};

type DynSubscriber<Output, Failure> = Arc<dyn Subscriber<Input = Output, Failure = Failure>>;

struct SubjectState<Output, Failure> {
  conduits: IdSlots<Arc<Conduit<Output, Failure>>>,
  completion: Option<Completion<Failure>>,
}

struct SubjectCore<Output, Failure> {
  state: StateLock<SubjectState<Output, Failure>>,
}

impl<Output, Failure> SubjectCore<Output, Failure> {
  fn detach(&self, id: usize) { self.state.synchronize(|state| state.conduits.remove(id)); }
}

/// A subject that relays values to subscribers with demand.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use backpressure_rx::prelude::*;
///
/// let subject = PassthroughSubject::<i32, ()>::new();
/// let got = Arc::new(Mutex::new(vec![]));
/// let c_got = got.clone();
/// let _handle = subject.sink(move |v| c_got.lock().unwrap().push(v));
///
/// subject.send(1);
/// subject.send(2);
/// subject.send_completion(Completion::Finished);
/// subject.send(3);
/// assert_eq!(*got.lock().unwrap(), vec![1, 2]);
/// ```
pub struct PassthroughSubject<Output, Failure> {
  core: Arc<SubjectCore<Output, Failure>>,
}

impl<Output, Failure> Clone for PassthroughSubject<Output, Failure> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Output, Failure> Default for PassthroughSubject<Output, Failure> {
  fn default() -> Self {
    Self {
      core: Arc::new(SubjectCore {
        state: StateLock::new(SubjectState { conduits: IdSlots::default(), completion: None }),
      }),
    }
  }
}

impl<Output, Failure> PassthroughSubject<Output, Failure> {
  pub fn new() -> Self { Self::default() }

  /// Number of live subscriptions.
  pub fn subscriber_count(&self) -> usize {
    self.core.state.synchronize(|state| state.conduits.len())
  }

  pub fn is_completed(&self) -> bool {
    self.core.state.synchronize(|state| state.completion.is_some())
  }
}

impl<Output: Clone, Failure> PassthroughSubject<Output, Failure> {
  /// Sends `value` to every subscriber with outstanding demand.
  pub fn send(&self, value: Output) {
    let conduits: Vec<_> = self.core.state.synchronize(|state| {
      if state.completion.is_some() {
        vec![]
      } else {
        state.conduits.iter().cloned().collect()
      }
    });
    for conduit in conduits {
      conduit.offer(value.clone());
    }
  }
}

impl<Output, Failure: Clone> PassthroughSubject<Output, Failure> {
  /// Completes every current subscriber. Later calls are ignored.
  pub fn send_completion(&self, completion: Completion<Failure>) {
    self.core.state.synchronized(|state| {
      if state.completion.is_some() {
        return None;
      }
      state.completion = Some(completion.clone());
      let conduits: Vec<_> = state.conduits.drain().collect();
      effect(move || {
        for conduit in conduits {
          conduit.finish(completion.clone());
        }
      })
    });
  }
}

impl<Output, Failure> Publisher for PassthroughSubject<Output, Failure>
where
  Output: 'static,
  Failure: Clone + Send + 'static,
{
  type Output = Output;
  type Failure = Failure;

  fn subscribe<S>(&self, subscriber: Arc<S>)
  where
    S: Subscriber<Input = Output, Failure = Failure> + 'static,
  {
    let downstream: DynSubscriber<Output, Failure> = subscriber;
    self.core.state.synchronized(|state| {
      if let Some(completion) = state.completion.clone() {
        return effect(move || {
          downstream.on_subscribe(Arc::new(()));
          downstream.on_complete(completion);
        });
      }
      let id = state.conduits.reserve_id();
      let conduit = Arc::new(Conduit {
        id,
        subject: Arc::downgrade(&self.core),
        state: StateLock::new(ConduitState {
          downstream: Some(downstream.clone()),
          demand: Demand::None,
        }),
      });
      state.conduits.insert(id, conduit.clone());
      effect(move || downstream.on_subscribe(conduit))
    });
  }
}

struct ConduitState<Output, Failure> {
  downstream: Option<DynSubscriber<Output, Failure>>,
  demand: Demand,
}

/// One subscriber's subscription to the subject, with its own demand.
struct Conduit<Output, Failure> {
  id: usize,
  subject: Weak<SubjectCore<Output, Failure>>,
  state: StateLock<ConduitState<Output, Failure>>,
}

impl<Output, Failure> Conduit<Output, Failure> {
  fn offer(&self, value: Output) {
    self.state.hold(|| {
      let downstream = self.state.synchronize(|state| {
        if !state.demand.is_positive() {
          return None;
        }
        state.demand -= 1;
        state.downstream.clone()
      });
      if let Some(downstream) = downstream {
        let additional = downstream.on_next(value);
        self.state.synchronize(|state| state.demand += additional);
      }
    });
  }

  fn finish(&self, completion: Completion<Failure>) {
    self.state.synchronized(|state| {
      let downstream = state.downstream.take()?;
      effect(move || downstream.on_complete(completion))
    });
  }
}

impl<Output, Failure: Send> Cancellable for Conduit<Output, Failure> {
  fn cancel(&self) {
    let was_live = self.state.synchronize(|state| state.downstream.take().is_some());
    if was_live {
      if let Some(subject) = self.subject.upgrade() {
        subject.detach(self.id);
      }
    }
  }
}

impl<Output, Failure: Send> Subscription for Conduit<Output, Failure> {
  fn request(&self, demand: Demand) {
    self.state.synchronize(|state| {
      if state.downstream.is_some() {
        state.demand += demand;
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::RecordingSubscriber;

  #[test]
  fn delivers_only_with_demand() {
    let subject = PassthroughSubject::<i32, ()>::new();
    let subscriber = RecordingSubscriber::new();
    subject.subscribe(subscriber.clone());

    subject.send(1);
    subscriber.request(Demand::max(2));
    subject.send(2);
    subject.send(3);
    subject.send(4);

    assert_eq!(subscriber.values(), vec![2, 3]);
  }

  #[test]
  fn multicasts_with_independent_demand() {
    let subject = PassthroughSubject::<i32, ()>::new();
    let a = RecordingSubscriber::new();
    let b = RecordingSubscriber::new();
    subject.subscribe(a.clone());
    subject.subscribe(b.clone());
    a.request(Demand::Unlimited);
    b.request(Demand::max(1));

    subject.send(1);
    subject.send(2);

    assert_eq!(a.values(), vec![1, 2]);
    assert_eq!(b.values(), vec![1]);
    assert_eq!(subject.subscriber_count(), 2);
  }

  #[test]
  fn additional_demand_from_on_next_counts() {
    let subject = PassthroughSubject::<i32, ()>::new();
    let subscriber = RecordingSubscriber::with_additional(Demand::max(1));
    subject.subscribe(subscriber.clone());
    subscriber.request(Demand::max(1));

    for v in 0..5 {
      subject.send(v);
    }
    assert_eq!(subscriber.values(), vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn completion_reaches_current_and_late_subscribers() {
    let subject = PassthroughSubject::<i32, &str>::new();
    let early = RecordingSubscriber::new();
    subject.subscribe(early.clone());

    subject.send_completion(Completion::Failed("gone"));
    subject.send_completion(Completion::Finished);

    let late = RecordingSubscriber::new();
    subject.subscribe(late.clone());

    assert!(subject.is_completed());
    assert_eq!(subject.subscriber_count(), 0);
    assert_eq!(early.completions(), vec![Completion::Failed("gone")]);
    assert_eq!(late.completions(), vec![Completion::Failed("gone")]);
  }

  #[test]
  fn cancel_detaches_subscriber() {
    let subject = PassthroughSubject::<i32, ()>::new();
    let subscriber = RecordingSubscriber::new();
    subject.subscribe(subscriber.clone());
    subscriber.request(Demand::Unlimited);

    subscriber.cancel();
    subscriber.cancel();
    subject.send(1);
    subject.send_completion(Completion::Finished);

    assert_eq!(subject.subscriber_count(), 0);
    assert!(subscriber.values().is_empty());
    assert!(subscriber.completions().is_empty());
  }
}
