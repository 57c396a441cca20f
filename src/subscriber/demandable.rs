//! Demand-forwarding subscriber.
//!
//! [`DemandableSubscriber`] turns a pair of callbacks into a full
//! [`Subscriber`]. It asks for an initial demand as soon as its subscription
//! arrives, forwards later demand through [`request_demand`], and can be
//! cancelled at any time, even before the subscription exists.
//!
//! [`request_demand`]: DemandableSubscriber::request_demand

use tracing::trace;

use super::{Completion, Subscriber};
use crate::{
  demand::Demand,
  lock::{effect, StateLock},
  subscription::{Cancellable, SubscriptionRef},
};

enum SinkState {
  Unsubscribed,
  Subscribed(SubscriptionRef),
  Completed,
}

type ValueFn<Input> = Box<dyn Fn(Input) + Send + Sync>;
type CompletionFn<Failure> = Box<dyn Fn(Completion<Failure>) + Send + Sync>;

/// A thread-safe subscriber that forwards demand to its subscription.
///
/// States move `unsubscribed -> subscribed -> completed` or
/// `unsubscribed -> completed` (cancelled early) and never leave `completed`.
/// Once completed, neither callback fires again and the upstream
/// subscription, if any, has been cancelled at most once.
pub struct DemandableSubscriber<Input, Failure> {
  state: StateLock<SinkState>,
  initial_demand: Demand,
  on_value: ValueFn<Input>,
  on_completion: CompletionFn<Failure>,
}

impl<Input, Failure> DemandableSubscriber<Input, Failure> {
  pub fn new<C, V>(initial_demand: Demand, on_completion: C, on_value: V) -> Self
  where
    C: Fn(Completion<Failure>) + Send + Sync + 'static,
    V: Fn(Input) + Send + Sync + 'static,
  {
    Self {
      state: StateLock::new(SinkState::Unsubscribed),
      initial_demand,
      on_value: Box::new(on_value),
      on_completion: Box::new(on_completion),
    }
  }

  /// Forwards `demand` to the subscription if one is currently held.
  pub fn request_demand(&self, demand: Demand) {
    self.state.synchronized(|state| match state {
      SinkState::Subscribed(subscription) => {
        let subscription = subscription.clone();
        effect(move || subscription.request(demand))
      }
      _ => None,
    });
  }

  pub fn is_subscribed(&self) -> bool {
    self.state.synchronize(|state| matches!(state, SinkState::Subscribed(_)))
  }

  pub fn is_completed(&self) -> bool {
    self.state.synchronize(|state| matches!(state, SinkState::Completed))
  }
}

impl<Input, Failure> Subscriber for DemandableSubscriber<Input, Failure> {
  type Input = Input;
  type Failure = Failure;

  fn on_subscribe(&self, subscription: SubscriptionRef) {
    self.state.synchronized(|state| {
      if matches!(state, SinkState::Unsubscribed) {
        *state = SinkState::Subscribed(subscription.clone());
        let demand = self.initial_demand;
        if demand.is_positive() {
          return effect(move || subscription.request(demand));
        }
        None
      } else {
        // Cancelled before the subscription arrived: never retain it.
        trace!("demandable subscriber received subscription after cancel");
        effect(move || subscription.cancel())
      }
    });
  }

  fn on_next(&self, input: Input) -> Demand {
    self.state.synchronized(|state| match state {
      SinkState::Subscribed(_) => effect(move || (self.on_value)(input)),
      _ => None,
    });
    Demand::None
  }

  fn on_complete(&self, completion: Completion<Failure>) {
    self.state.synchronized(|state| match state {
      SinkState::Subscribed(_) => {
        *state = SinkState::Completed;
        effect(move || (self.on_completion)(completion))
      }
      _ => None,
    });
  }
}

impl<Input, Failure> Cancellable for DemandableSubscriber<Input, Failure> {
  fn cancel(&self) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, SinkState::Completed) {
        SinkState::Subscribed(subscription) => effect(move || subscription.cancel()),
        _ => None,
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;
  use crate::test_support::RecordingSubscription;

  type Log<T> = Arc<Mutex<Vec<T>>>;

  fn recording_sink(initial: Demand) -> (DemandableSubscriber<i32, ()>, Log<i32>, Log<Completion<()>>) {
    let values: Log<i32> = Arc::default();
    let completions: Log<Completion<()>> = Arc::default();
    let c_values = values.clone();
    let c_completions = completions.clone();
    let sink = DemandableSubscriber::new(
      initial,
      move |c| c_completions.lock().push(c),
      move |v| c_values.lock().push(v),
    );
    (sink, values, completions)
  }

  #[test]
  fn requests_initial_demand_on_subscribe() {
    let (sink, _, _) = recording_sink(Demand::max(3));
    let subscription = RecordingSubscription::new();
    sink.on_subscribe(subscription.clone());

    assert!(sink.is_subscribed());
    assert_eq!(subscription.requests(), vec![Demand::max(3)]);
  }

  #[test]
  fn no_request_for_zero_initial_demand() {
    let (sink, _, _) = recording_sink(Demand::None);
    let subscription = RecordingSubscription::new();
    sink.on_subscribe(subscription.clone());

    assert!(subscription.requests().is_empty());
    sink.request_demand(Demand::max(2));
    assert_eq!(subscription.requests(), vec![Demand::max(2)]);
  }

  #[test]
  fn request_demand_before_subscribe_is_dropped() {
    let (sink, _, _) = recording_sink(Demand::max(1));
    sink.request_demand(Demand::max(5));

    let subscription = RecordingSubscription::new();
    sink.on_subscribe(subscription.clone());
    assert_eq!(subscription.requests(), vec![Demand::max(1)]);
  }

  #[test]
  fn forwards_values_and_completion() {
    let (sink, values, completions) = recording_sink(Demand::Unlimited);
    sink.on_subscribe(RecordingSubscription::new());

    assert_eq!(sink.on_next(1), Demand::None);
    sink.on_next(2);
    sink.on_complete(Completion::Finished);
    sink.on_next(3);
    sink.on_complete(Completion::Failed(()));

    assert_eq!(*values.lock(), vec![1, 2]);
    assert_eq!(*completions.lock(), vec![Completion::Finished]);
    assert!(sink.is_completed());
  }

  #[test]
  fn values_before_subscribe_are_ignored() {
    let (sink, values, completions) = recording_sink(Demand::Unlimited);
    sink.on_next(1);
    sink.on_complete(Completion::Finished);

    assert!(values.lock().is_empty());
    assert!(completions.lock().is_empty());
  }

  #[test]
  fn cancel_is_idempotent() {
    let (sink, values, completions) = recording_sink(Demand::Unlimited);
    let subscription = RecordingSubscription::new();
    sink.on_subscribe(subscription.clone());

    sink.cancel();
    sink.cancel();
    sink.cancel();
    sink.on_next(1);
    sink.on_complete(Completion::Finished);
    sink.request_demand(Demand::max(1));

    assert_eq!(subscription.cancel_count(), 1);
    assert_eq!(subscription.requests(), vec![Demand::Unlimited]);
    assert!(values.lock().is_empty());
    assert!(completions.lock().is_empty());
  }

  #[test]
  fn cancel_before_subscribe_cancels_late_subscription() {
    let (sink, _, _) = recording_sink(Demand::max(4));
    sink.cancel();

    let subscription = RecordingSubscription::new();
    sink.on_subscribe(subscription.clone());

    assert_eq!(subscription.cancel_count(), 1);
    assert!(subscription.requests().is_empty());
    assert!(sink.is_completed());
  }

  #[test]
  fn callback_may_reenter_sink() {
    let sink: Arc<Mutex<Option<Arc<DemandableSubscriber<i32, ()>>>>> = Arc::default();
    let c_sink = sink.clone();
    let subscriber = Arc::new(DemandableSubscriber::new(
      Demand::max(1),
      |_| {},
      move |_: i32| {
        let sink = c_sink.lock().clone();
        if let Some(sink) = sink {
          sink.request_demand(Demand::max(1));
        }
      },
    ));
    *sink.lock() = Some(subscriber.clone());

    let subscription = RecordingSubscription::new();
    subscriber.on_subscribe(subscription.clone());
    subscriber.on_next(1);
    subscriber.on_next(2);

    assert_eq!(
      subscription.requests(),
      vec![Demand::max(1), Demand::max(1), Demand::max(1)]
    );
  }
}
