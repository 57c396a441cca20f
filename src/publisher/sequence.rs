//! Demand-driven iterator publisher.
//!
//! Items are pulled from the iterator only while the subscriber has
//! outstanding demand. Completion follows the last item right away when the
//! iterator's `size_hint` says it is exhausted, otherwise on the next request.
//!
//! A `request` made while values are being delivered (for instance from
//! inside `on_next`) only extends the running drain loop; it never recurses
//! into a second one.

use std::{marker::PhantomData, sync::Arc};

use super::Publisher;
use crate::{
  demand::Demand,
  lock::{effect, StateLock},
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription},
};

/// Publishes the items of an iterator, honoring demand.
pub struct Sequence<I, Failure> {
  items: I,
  _failure: PhantomData<fn() -> Failure>,
}

impl<I, Failure> Sequence<I, Failure> {
  pub fn new(items: I) -> Self { Self { items, _failure: PhantomData } }
}

impl<I: Clone, Failure> Clone for Sequence<I, Failure> {
  fn clone(&self) -> Self { Self::new(self.items.clone()) }
}

/// Creates a publisher that emits every item of `items` on demand, then
/// finishes.
pub fn from_iter<I, Failure>(items: I) -> Sequence<I, Failure>
where
  I: IntoIterator + Clone,
{
  Sequence::new(items)
}

impl<I, Failure> Publisher for Sequence<I, Failure>
where
  I: IntoIterator + Clone,
  I::IntoIter: Send + 'static,
  I::Item: 'static,
  Failure: 'static,
{
  type Output = I::Item;
  type Failure = Failure;

  fn subscribe<S>(&self, subscriber: Arc<S>)
  where
    S: Subscriber<Input = I::Item, Failure = Failure> + 'static,
  {
    let subscription = Arc::new(SequenceSubscription {
      state: StateLock::new(SequenceState {
        iter: self.items.clone().into_iter(),
        downstream: Some(subscriber.clone()),
        demand: Demand::None,
        draining: false,
      }),
    });
    subscriber.on_subscribe(subscription);
  }
}

struct SequenceState<It, S> {
  iter: It,
  downstream: Option<Arc<S>>,
  demand: Demand,
  draining: bool,
}

struct SequenceSubscription<It, S> {
  state: StateLock<SequenceState<It, S>>,
}

enum Step<T, S> {
  Emit(T, Arc<S>),
  Finish(Arc<S>),
  Idle,
}

impl<It, S> SequenceSubscription<It, S>
where
  It: Iterator,
  S: Subscriber<Input = It::Item>,
{
  fn drain(&self) {
    loop {
      let step = self.state.synchronize(|state| {
        let Some(downstream) = state.downstream.clone() else {
          state.draining = false;
          return Step::Idle;
        };
        if !state.demand.is_positive() {
          state.draining = false;
          // Finish without waiting for more demand once the iterator reports
          // it is exhausted. Never pulls ahead to find out.
          if state.iter.size_hint().1 == Some(0) {
            state.downstream = None;
            return Step::Finish(downstream);
          }
          return Step::Idle;
        }
        match state.iter.next() {
          Some(item) => {
            state.demand -= 1;
            Step::Emit(item, downstream)
          }
          None => {
            state.downstream = None;
            state.draining = false;
            Step::Finish(downstream)
          }
        }
      });

      match step {
        Step::Emit(item, downstream) => {
          let additional = downstream.on_next(item);
          if additional.is_positive() {
            self.state.synchronize(|state| state.demand += additional);
          }
        }
        Step::Finish(downstream) => {
          downstream.on_complete(Completion::Finished);
          return;
        }
        Step::Idle => return,
      }
    }
  }
}

impl<It, S> Cancellable for SequenceSubscription<It, S>
where
  It: Send,
  S: Subscriber,
{
  fn cancel(&self) {
    self.state.synchronize(|state| {
      state.downstream = None;
    });
  }
}

impl<It, S> Subscription for SequenceSubscription<It, S>
where
  It: Iterator + Send,
  S: Subscriber<Input = It::Item>,
{
  fn request(&self, demand: Demand) {
    self.state.synchronized(|state| {
      if state.downstream.is_none() {
        return None;
      }
      state.demand += demand;
      if state.draining {
        return None;
      }
      state.draining = true;
      effect(move || self.drain())
    });
  }
}
