//! Subscriber trait and terminal completion signal.
//!
//! A [`Subscriber`] receives exactly one subscription, zero or more values and
//! at most one [`Completion`]. All methods take `&self`: the subscriber is
//! shared (behind an `Arc`) between the subscription that drives it and
//! whoever may cancel it, so it guards its own state.

use std::convert::Infallible;

use crate::{demand::Demand, subscription::SubscriptionRef};

mod demandable;

pub use demandable::*;

/// The terminal signal of a stream.
///
/// There is no separate error channel: a stream either finishes normally or
/// finishes with an opaque upstream failure, which operators forward
/// verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion<Failure> {
  Finished,
  Failed(Failure),
}

impl<Failure> Completion<Failure> {
  #[inline]
  pub fn is_finished(&self) -> bool { matches!(self, Completion::Finished) }

  pub fn map_failure<F, E>(self, f: F) -> Completion<E>
  where
    F: FnOnce(Failure) -> E,
  {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failed(err) => Completion::Failed(f(err)),
    }
  }
}

impl Completion<Infallible> {
  /// Re-types a completion that can never fail.
  pub fn never_fails<E>(self) -> Completion<E> {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failed(never) => match never {},
    }
  }
}

/// Subscriber: the consumer side of the stream protocol.
pub trait Subscriber: Send + Sync {
  type Input;
  type Failure;

  /// Receives the subscription. Called once, before any value.
  fn on_subscribe(&self, subscription: SubscriptionRef);

  /// Receives a value and returns the *additional* demand it wants as a
  /// consequence of receiving it.
  fn on_next(&self, input: Self::Input) -> Demand;

  /// Receives the terminal signal. No call follows it.
  fn on_complete(&self, completion: Completion<Self::Failure>);
}

impl<S: Subscriber + ?Sized> Subscriber for std::sync::Arc<S> {
  type Input = S::Input;
  type Failure = S::Failure;

  #[inline]
  fn on_subscribe(&self, subscription: SubscriptionRef) { (**self).on_subscribe(subscription) }

  #[inline]
  fn on_next(&self, input: Self::Input) -> Demand { (**self).on_next(input) }

  #[inline]
  fn on_complete(&self, completion: Completion<Self::Failure>) { (**self).on_complete(completion) }
}
