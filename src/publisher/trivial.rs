use std::{marker::PhantomData, sync::Arc};

use super::{Publisher, Sequence};
use crate::subscriber::{Completion, Subscriber};

/// A publisher that never emits and never completes.
///
/// Handy as a take-until signal that never fires.
pub struct Never<Output, Failure>(PhantomData<fn() -> (Output, Failure)>);

impl<Output, Failure> Never<Output, Failure> {
  pub fn new() -> Self { Self(PhantomData) }
}

impl<Output, Failure> Default for Never<Output, Failure> {
  fn default() -> Self { Self::new() }
}

impl<Output, Failure> Clone for Never<Output, Failure> {
  fn clone(&self) -> Self { Self::new() }
}

impl<Output, Failure> Publisher for Never<Output, Failure> {
  type Output = Output;
  type Failure = Failure;

  fn subscribe<S>(&self, subscriber: Arc<S>)
  where
    S: Subscriber<Input = Output, Failure = Failure> + 'static,
  {
    subscriber.on_subscribe(Arc::new(()));
  }
}

/// A publisher that completes as soon as it is subscribed, without values.
pub struct Empty<Output, Failure>(PhantomData<fn() -> (Output, Failure)>);

impl<Output, Failure> Empty<Output, Failure> {
  pub fn new() -> Self { Self(PhantomData) }
}

impl<Output, Failure> Default for Empty<Output, Failure> {
  fn default() -> Self { Self::new() }
}

impl<Output, Failure> Clone for Empty<Output, Failure> {
  fn clone(&self) -> Self { Self::new() }
}

impl<Output, Failure> Publisher for Empty<Output, Failure> {
  type Output = Output;
  type Failure = Failure;

  fn subscribe<S>(&self, subscriber: Arc<S>)
  where
    S: Subscriber<Input = Output, Failure = Failure> + 'static,
  {
    subscriber.on_subscribe(Arc::new(()));
    subscriber.on_complete(Completion::Finished);
  }
}

/// Creates a publisher that never emits anything.
pub fn never<Output, Failure>() -> Never<Output, Failure> { Never::new() }

/// Creates a publisher that completes immediately.
pub fn empty<Output, Failure>() -> Empty<Output, Failure> { Empty::new() }

/// Creates a publisher that emits `value` once demand arrives, then finishes.
pub fn just<Output: Clone, Failure>(value: Output) -> Sequence<std::iter::Once<Output>, Failure> {
  Sequence::new(std::iter::once(value))
}
