//! Recording doubles shared by the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription, SubscriptionRef},
};

/// A subscription that only records what was asked of it.
#[derive(Default)]
pub struct RecordingSubscription {
  requests: Mutex<Vec<Demand>>,
  cancels: Mutex<usize>,
}

impl RecordingSubscription {
  pub fn new() -> Arc<Self> { Arc::default() }

  pub fn requests(&self) -> Vec<Demand> { self.requests.lock().clone() }

  pub fn cancel_count(&self) -> usize { *self.cancels.lock() }
}

impl Cancellable for RecordingSubscription {
  fn cancel(&self) { *self.cancels.lock() += 1; }
}

impl Subscription for RecordingSubscription {
  fn request(&self, demand: Demand) { self.requests.lock().push(demand); }
}

/// A downstream subscriber that records every signal and returns a fixed
/// additional demand from `on_next`.
pub struct RecordingSubscriber<T, E> {
  values: Mutex<Vec<T>>,
  completions: Mutex<Vec<Completion<E>>>,
  subscription: Mutex<Option<SubscriptionRef>>,
  additional: Demand,
}

impl<T, E> RecordingSubscriber<T, E> {
  pub fn new() -> Arc<Self> { Self::with_additional(Demand::None) }

  pub fn with_additional(additional: Demand) -> Arc<Self> {
    Arc::new(Self {
      values: Mutex::new(vec![]),
      completions: Mutex::new(vec![]),
      subscription: Mutex::new(None),
      additional,
    })
  }

  pub fn subscription(&self) -> Option<SubscriptionRef> { self.subscription.lock().clone() }

  pub fn request(&self, demand: Demand) {
    if let Some(subscription) = self.subscription() {
      subscription.request(demand);
    }
  }

  pub fn cancel(&self) {
    if let Some(subscription) = self.subscription() {
      subscription.cancel();
    }
  }

  pub fn values(&self) -> Vec<T>
  where
    T: Clone,
  {
    self.values.lock().clone()
  }

  pub fn completions(&self) -> Vec<Completion<E>>
  where
    E: Clone,
  {
    self.completions.lock().clone()
  }
}

impl<T, E> Subscriber for RecordingSubscriber<T, E>
where
  T: Send,
  E: Send,
{
  type Input = T;
  type Failure = E;

  fn on_subscribe(&self, subscription: SubscriptionRef) {
    *self.subscription.lock() = Some(subscription);
  }

  fn on_next(&self, input: T) -> Demand {
    self.values.lock().push(input);
    self.additional
  }

  fn on_complete(&self, completion: Completion<E>) { self.completions.lock().push(completion); }
}
