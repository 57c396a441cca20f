//! Publisher trait, fluent composition and the built-in publishers.
//!
//! A [`Publisher`] is a source of values that hands every subscriber its own
//! [`Subscription`](crate::subscription::Subscription). Nothing is produced
//! until the subscriber requests demand.

use std::sync::Arc;

use crate::{
  demand::Demand,
  ops::take_until::TakeUntil,
  subscriber::{Completion, DemandableSubscriber, Subscriber},
  subscription::AnyCancellable,
};

mod coordinate;
mod sequence;
mod trivial;

pub use coordinate::*;
pub use sequence::*;
pub use trivial::*;

/// Publisher: the producer side of the stream protocol.
pub trait Publisher {
  type Output;
  type Failure;

  /// Attaches `subscriber`, synchronously handing it a subscription.
  fn subscribe<S>(&self, subscriber: Arc<S>)
  where
    S: Subscriber<Input = Self::Output, Failure = Self::Failure> + 'static;
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  #[inline]
  fn subscribe<S>(&self, subscriber: Arc<S>)
  where
    S: Subscriber<Input = Self::Output, Failure = Self::Failure> + 'static,
  {
    (**self).subscribe(subscriber)
  }
}

/// Fluent operators available on every [`Publisher`].
pub trait PublisherExt: Publisher + Sized {
  /// Republishes values until `other` emits a value or completes, or until
  /// this publisher completes.
  ///
  /// # Examples
  ///
  /// ```rust
  /// use std::sync::{Arc, Mutex};
  ///
  /// use backpressure_rx::prelude::*;
  ///
  /// let stop = PassthroughSubject::<(), ()>::new();
  /// let values = Arc::new(Mutex::new(vec![]));
  /// let c_values = values.clone();
  ///
  /// let _handle = from_iter::<_, ()>(0..)
  ///   .take_until(stop.clone())
  ///   .subscribe_with(Demand::max(3), |_| {}, move |v| c_values.lock().unwrap().push(v));
  ///
  /// assert_eq!(*values.lock().unwrap(), vec![0, 1, 2]);
  /// ```
  fn take_until<P>(self, other: P) -> TakeUntil<Self, P>
  where
    P: Publisher<Failure = Self::Failure>,
  {
    TakeUntil::new(self, other)
  }

  /// Subscribes with a [`DemandableSubscriber`] built from the two callbacks,
  /// asking for `initial_demand` up front. The returned handle cancels the
  /// subscription.
  fn subscribe_with<C, V>(&self, initial_demand: Demand, on_completion: C, on_value: V) -> AnyCancellable
  where
    Self::Output: 'static,
    Self::Failure: 'static,
    C: Fn(Completion<Self::Failure>) + Send + Sync + 'static,
    V: Fn(Self::Output) + Send + Sync + 'static,
  {
    let sink = Arc::new(DemandableSubscriber::new(initial_demand, on_completion, on_value));
    self.subscribe(sink.clone());
    AnyCancellable::new(sink)
  }

  /// Subscribes with unlimited demand, ignoring completion.
  fn sink<V>(&self, on_value: V) -> AnyCancellable
  where
    Self::Output: 'static,
    Self::Failure: 'static,
    V: Fn(Self::Output) + Send + Sync + 'static,
  {
    self.subscribe_with(Demand::Unlimited, |_| {}, on_value)
  }

  /// Converts this publisher into a `futures::Stream`, requesting one value per
  /// poll.
  #[cfg(feature = "stream")]
  fn into_stream(self) -> crate::ops::into_stream::IntoStream<Self::Output, Self::Failure>
  where
    Self::Output: Send + 'static,
    Self::Failure: Send + 'static,
  {
    crate::ops::into_stream::IntoStream::new(&self)
  }
}

impl<P: Publisher> PublisherExt for P {}
