//! TakeUntil operator implementation
//!
//! Republishes values from a source publisher until a second publisher (the
//! signal) emits a value or completes, or until the source itself completes.
//!
//! ## State machine
//!
//! `waiting -> observing -> completed`, all transitions under one
//! [`StateLock`]:
//!
//! - The first `request` builds one [`DemandableSubscriber`] per stream and
//!   subscribes the signal *before* the source. If the signal fires
//!   synchronously while being subscribed, the state is already `completed`
//!   when the re-check runs and the source is never subscribed.
//! - The source sink starts with no demand. Requests made before the source
//!   has been subscribed only accumulate into `remaining`; once it is
//!   subscribed the whole accumulated amount is requested in one go, and
//!   every later request is forwarded as it arrives.
//! - Whichever terminal trigger (source completion, signal value, signal
//!   completion, cancel) observes `observing` first wins. Everyone after it
//!   sees `completed` and does nothing, so downstream receives exactly one
//!   terminal signal.
//!
//! The sinks hold the subscription strongly, so it stays alive while it
//! observes even if the downstream drops its reference. That cycle ends when
//! the state leaves `observing` and the upstreams release the sinks.

use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use crate::{
  demand::Demand,
  lock::{effect, StateLock},
  publisher::Publisher,
  subscriber::{Completion, DemandableSubscriber, Subscriber},
  subscription::{AnyCancellable, Cancellable, Subscription},
};

/// Publisher returned by
/// [`PublisherExt::take_until`](crate::publisher::PublisherExt::take_until).
#[derive(Clone)]
pub struct TakeUntil<Source, Other> {
  pub source: Source,
  pub other: Other,
}

impl<Source, Other> TakeUntil<Source, Other> {
  pub fn new(source: Source, other: Other) -> Self { Self { source, other } }
}

impl<Source, Other> Publisher for TakeUntil<Source, Other>
where
  Source: Publisher + Clone + Send + 'static,
  Other: Publisher<Failure = Source::Failure> + Clone + Send + 'static,
  Source::Output: 'static,
  Source::Failure: 'static,
  Other::Output: 'static,
{
  type Output = Source::Output;
  type Failure = Source::Failure;

  fn subscribe<S>(&self, subscriber: Arc<S>)
  where
    S: Subscriber<Input = Self::Output, Failure = Self::Failure> + 'static,
  {
    let subscription = Arc::new_cyclic(|me| TakeUntilSubscription {
      me: me.clone(),
      state: StateLock::new(TakeUntilState::Waiting {
        downstream: subscriber.clone(),
        source: self.source.clone(),
        other: self.other.clone(),
      }),
    });
    subscriber.on_subscribe(subscription);
  }
}

type Sink<P> = DemandableSubscriber<<P as Publisher>::Output, <P as Publisher>::Failure>;

struct Observing<Source: Publisher, S> {
  downstream: Arc<S>,
  source_sink: Arc<Sink<Source>>,
  source_handle: Option<AnyCancellable>,
  until_handle: Option<AnyCancellable>,
  remaining: Demand,
  /// `source_sink` has been handed to the source.
  source_started: bool,
}

enum TakeUntilState<Source: Publisher, Other, S> {
  Waiting { downstream: Arc<S>, source: Source, other: Other },
  Observing(Observing<Source, S>),
  Completed,
}

/// The subscription handed to a take-until subscriber.
struct TakeUntilSubscription<Source: Publisher, Other, S> {
  me: Weak<Self>,
  state: StateLock<TakeUntilState<Source, Other, S>>,
}

impl<Source, Other, S> TakeUntilSubscription<Source, Other, S>
where
  Source: Publisher + Send + 'static,
  Other: Publisher<Failure = Source::Failure> + Send + 'static,
  Source::Output: 'static,
  Source::Failure: 'static,
  Other::Output: 'static,
  S: Subscriber<Input = Source::Output, Failure = Source::Failure> + 'static,
{
  fn is_observing(&self) -> bool {
    self.state.synchronize(|state| matches!(state, TakeUntilState::Observing(_)))
  }

  fn source_sink(this: &Arc<Self>) -> Arc<Sink<Source>> {
    let on_value = this.clone();
    let on_completion = this.clone();
    Arc::new(DemandableSubscriber::new(
      Demand::None,
      move |completion| on_completion.receive_source_completion(completion),
      move |value| on_value.receive_source_value(value),
    ))
  }

  fn until_sink(this: &Arc<Self>) -> Arc<Sink<Other>> {
    let on_value = this.clone();
    let on_completion = this.clone();
    Arc::new(DemandableSubscriber::new(
      Demand::max(1),
      move |completion| on_completion.receive_until_completion(completion),
      move |_| on_value.receive_until_value(),
    ))
  }

  /// Marks the source as subscribed and requests everything asked for so far.
  fn start_source(&self) {
    self.state.synchronized(|state| match state {
      TakeUntilState::Observing(observing) if !observing.source_started => {
        observing.source_started = true;
        let demand = observing.remaining;
        let sink = observing.source_sink.clone();
        if demand.is_positive() {
          effect(move || sink.request_demand(demand))
        } else {
          None
        }
      }
      _ => None,
    });
  }

  fn receive_source_value(&self, value: Source::Output) {
    // Deliver under the lock so no terminal transition can interleave, but
    // without borrowing the state: downstream may call back into `request`
    // or `cancel` on this thread.
    let follow_up = self.state.hold(|| {
      let downstream = self.state.synchronize(|state| match state {
        TakeUntilState::Observing(observing) if observing.remaining.is_positive() => {
          observing.remaining -= 1;
          Some(observing.downstream.clone())
        }
        _ => None,
      });
      let Some(downstream) = downstream else {
        debug!("take_until dropped a source value without demand or after completion");
        return None;
      };

      let additional = downstream.on_next(value);
      if !additional.is_positive() {
        return None;
      }
      self.state.synchronize(|state| match state {
        TakeUntilState::Observing(observing) => {
          observing.remaining += additional;
          Some(observing.source_sink.clone())
        }
        _ => None,
      })
      .map(|sink| (sink, additional))
    });

    if let Some((sink, additional)) = follow_up {
      sink.request_demand(additional);
    }
  }

  fn receive_source_completion(&self, completion: Completion<Source::Failure>) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, TakeUntilState::Completed) {
        TakeUntilState::Observing(observing) => {
          trace!("take_until source completed");
          let Observing { downstream, until_handle, .. } = observing;
          effect(move || {
            if let Some(until) = until_handle {
              until.cancel();
            }
            downstream.on_complete(completion);
          })
        }
        other => {
          *state = other;
          None
        }
      }
    });
  }

  fn receive_until_value(&self) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, TakeUntilState::Completed) {
        TakeUntilState::Observing(observing) => {
          trace!("take_until signal emitted, finishing");
          let Observing { downstream, source_handle, until_handle, .. } = observing;
          effect(move || {
            if let Some(until) = until_handle {
              until.cancel();
            }
            if let Some(source) = source_handle {
              source.cancel();
            }
            downstream.on_complete(Completion::Finished);
          })
        }
        other => {
          *state = other;
          None
        }
      }
    });
  }

  fn receive_until_completion(&self, completion: Completion<Source::Failure>) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, TakeUntilState::Completed) {
        TakeUntilState::Observing(observing) => {
          trace!("take_until signal completed");
          let Observing { downstream, source_handle, .. } = observing;
          effect(move || {
            if let Some(source) = source_handle {
              source.cancel();
            }
            downstream.on_complete(completion);
          })
        }
        other => {
          *state = other;
          None
        }
      }
    });
  }
}

impl<Source, Other, S> Cancellable for TakeUntilSubscription<Source, Other, S>
where
  Source: Publisher + Send + 'static,
  Other: Publisher<Failure = Source::Failure> + Send + 'static,
  Source::Output: 'static,
  Source::Failure: 'static,
  Other::Output: 'static,
  S: Subscriber<Input = Source::Output, Failure = Source::Failure> + 'static,
{
  fn cancel(&self) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, TakeUntilState::Completed) {
        TakeUntilState::Observing(observing) => {
          trace!("take_until cancelled while observing");
          let Observing { source_handle, until_handle, .. } = observing;
          effect(move || {
            if let Some(source) = source_handle {
              source.cancel();
            }
            if let Some(until) = until_handle {
              until.cancel();
            }
          })
        }
        // Nothing was subscribed yet; dropping the publishers is enough.
        TakeUntilState::Waiting { .. } | TakeUntilState::Completed => None,
      }
    });
  }
}

impl<Source, Other, S> Subscription for TakeUntilSubscription<Source, Other, S>
where
  Source: Publisher + Send + 'static,
  Other: Publisher<Failure = Source::Failure> + Send + 'static,
  Source::Output: 'static,
  Source::Failure: 'static,
  Other::Output: 'static,
  S: Subscriber<Input = Source::Output, Failure = Source::Failure> + 'static,
{
  fn request(&self, demand: Demand) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, TakeUntilState::Completed) {
        TakeUntilState::Waiting { downstream, source, other } => {
          let Some(this) = self.me.upgrade() else {
            *state = TakeUntilState::Waiting { downstream, source, other };
            return None;
          };
          let source_sink = Self::source_sink(&this);
          let until_sink = Self::until_sink(&this);
          *state = TakeUntilState::Observing(Observing {
            downstream,
            source_sink: source_sink.clone(),
            source_handle: Some(AnyCancellable::new(source_sink.clone())),
            until_handle: Some(AnyCancellable::new(until_sink.clone())),
            remaining: demand,
            source_started: false,
          });
          trace!(%demand, "take_until started");
          effect(move || {
            other.subscribe(until_sink);
            // The signal may have fired while being subscribed.
            if this.is_observing() {
              source.subscribe(source_sink);
              this.start_source();
            }
          })
        }
        TakeUntilState::Observing(mut observing) => {
          observing.remaining += demand;
          let forward = observing.source_started.then(|| observing.source_sink.clone());
          *state = TakeUntilState::Observing(observing);
          let sink = forward?;
          effect(move || sink.request_demand(demand))
        }
        TakeUntilState::Completed => None,
      }
    });
  }
}
