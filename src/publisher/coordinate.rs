//! Bridging publisher for one-shot callback-style work.
//!
//! [`Coordinate`] adapts "do something, then report back" operations to the
//! stream protocol without writing a full publisher. Every subscribe runs the
//! handler with a [`CoordinateSubscriber`] handle; the handler sends zero or
//! one value plus a completion through it and returns an [`AnyCancellable`]
//! that tears the work down if the subscription is cancelled first.
//!
//! No demand is tracked here. It is meant for producers of at most one value.

use std::sync::Arc;

use tracing::trace;

use super::Publisher;
use crate::{
  demand::Demand,
  lock::{effect, StateLock},
  subscriber::{Completion, Subscriber},
  subscription::{AnyCancellable, Cancellable, Subscription},
};

type Handler<Output, Failure> =
  dyn Fn(CoordinateSubscriber<Output, Failure>) -> AnyCancellable + Send + Sync;

/// Publisher built from a single subscribe handler.
///
/// # Examples
///
/// ```rust
/// use std::{convert::Infallible, sync::{Arc, Mutex}};
///
/// use backpressure_rx::prelude::*;
///
/// let publisher = coordinate::<_, Infallible, _>(|subscriber| {
///   subscriber.send("done");
///   subscriber.send_completion(Completion::Finished);
///   AnyCancellable::empty()
/// });
///
/// let got = Arc::new(Mutex::new(vec![]));
/// let c_got = got.clone();
/// let _handle = publisher.sink(move |v| c_got.lock().unwrap().push(v));
/// assert_eq!(*got.lock().unwrap(), vec!["done"]);
/// ```
pub struct Coordinate<Output, Failure> {
  handler: Arc<Handler<Output, Failure>>,
}

impl<Output, Failure> Coordinate<Output, Failure> {
  pub fn new<F>(handler: F) -> Self
  where
    F: Fn(CoordinateSubscriber<Output, Failure>) -> AnyCancellable + Send + Sync + 'static,
  {
    Self { handler: Arc::new(handler) }
  }
}

impl<Output, Failure> Clone for Coordinate<Output, Failure> {
  fn clone(&self) -> Self { Self { handler: self.handler.clone() } }
}

/// Shorthand for [`Coordinate::new`].
pub fn coordinate<Output, Failure, F>(handler: F) -> Coordinate<Output, Failure>
where
  F: Fn(CoordinateSubscriber<Output, Failure>) -> AnyCancellable + Send + Sync + 'static,
{
  Coordinate::new(handler)
}

impl<Output, Failure> Publisher for Coordinate<Output, Failure>
where
  Output: 'static,
  Failure: 'static,
{
  type Output = Output;
  type Failure = Failure;

  fn subscribe<S>(&self, subscriber: Arc<S>)
  where
    S: Subscriber<Input = Output, Failure = Failure> + 'static,
  {
    let subscription = Arc::new(CoordinateSubscription {
      state: StateLock::new(Bridge::Live { downstream: subscriber.clone(), teardown: None }),
    });
    subscriber.on_subscribe(subscription.clone());
    if !subscription.is_live() {
      trace!("coordinate cancelled during on_subscribe, handler skipped");
      return;
    }
    let teardown = (self.handler)(CoordinateSubscriber { relay: subscription.clone() });
    subscription.attach(teardown);
  }
}

/// The producer-facing handle given to a [`Coordinate`] handler.
///
/// Cheap to clone and safe to move to another thread. Sends after the
/// subscription has completed or been cancelled are dropped.
pub struct CoordinateSubscriber<Output, Failure> {
  relay: Arc<dyn Relay<Output, Failure>>,
}

impl<Output, Failure> Clone for CoordinateSubscriber<Output, Failure> {
  fn clone(&self) -> Self { Self { relay: self.relay.clone() } }
}

impl<Output, Failure> CoordinateSubscriber<Output, Failure> {
  pub fn send(&self, value: Output) { self.relay.relay_value(value) }

  pub fn send_completion(&self, completion: Completion<Failure>) {
    self.relay.relay_completion(completion)
  }
}

trait Relay<Output, Failure>: Send + Sync {
  fn relay_value(&self, value: Output);
  fn relay_completion(&self, completion: Completion<Failure>);
}

enum Bridge<S> {
  Live { downstream: Arc<S>, teardown: Option<AnyCancellable> },
  Finished,
  Cancelled,
}

struct CoordinateSubscription<S> {
  state: StateLock<Bridge<S>>,
}

impl<S: Subscriber> CoordinateSubscription<S> {
  fn is_live(&self) -> bool { self.state.synchronize(|state| matches!(state, Bridge::Live { .. })) }

  fn attach(&self, handle: AnyCancellable) {
    self.state.synchronized(|state| match state {
      Bridge::Live { teardown, .. } => {
        *teardown = Some(handle);
        None
      }
      Bridge::Cancelled => effect(move || handle.cancel()),
      Bridge::Finished => None,
    });
  }
}

impl<S: Subscriber> Relay<S::Input, S::Failure> for CoordinateSubscription<S> {
  fn relay_value(&self, value: S::Input) {
    self.state.hold(|| {
      let downstream = self.state.synchronize(|state| match state {
        Bridge::Live { downstream, .. } => Some(downstream.clone()),
        _ => None,
      });
      if let Some(downstream) = downstream {
        downstream.on_next(value);
      }
    });
  }

  fn relay_completion(&self, completion: Completion<S::Failure>) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, Bridge::Finished) {
        Bridge::Live { downstream, .. } => effect(move || downstream.on_complete(completion)),
        other => {
          *state = other;
          None
        }
      }
    });
  }
}

impl<S: Subscriber> Cancellable for CoordinateSubscription<S> {
  fn cancel(&self) {
    self.state.synchronized(|state| {
      match std::mem::replace(state, Bridge::Cancelled) {
        Bridge::Live { teardown: Some(teardown), .. } => effect(move || teardown.cancel()),
        Bridge::Live { teardown: None, .. } => None,
        other => {
          *state = other;
          None
        }
      }
    });
  }
}

impl<S: Subscriber> Subscription for CoordinateSubscription<S> {
  fn request(&self, _: Demand) {}
}
