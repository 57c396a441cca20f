//! IntoStream: consume a publisher as a `futures::Stream`.
//!
//! Demand follows the consumer: every `poll_next` that finds nothing buffered
//! requests exactly one more value, so a slow task never causes the publisher
//! to run ahead of it.
//!
//! # Example
//!
//! ```rust
//! use futures::{executor::block_on, StreamExt};
//! use backpressure_rx::prelude::*;
//!
//! let mut stream = from_iter::<_, ()>(vec![1, 2, 3]).into_stream();
//! let values: Vec<_> = block_on(async {
//!   let mut values = vec![];
//!   while let Some(Ok(v)) = stream.next().await {
//!     values.push(v);
//!   }
//!   values
//! });
//! assert_eq!(values, vec![1, 2, 3]);
//! ```

use std::{
  collections::VecDeque,
  pin::Pin,
  sync::Arc,
  task::{Context as AsyncContext, Poll, Waker},
};

use futures::Stream;
use parking_lot::Mutex;

use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

struct StreamState<T, E> {
  queue: VecDeque<Result<T, E>>,
  waker: Option<Waker>,
  subscription: Option<SubscriptionRef>,
  /// A one-value request is in flight.
  requested: bool,
  is_closed: bool,
}

struct StreamSink<T, E> {
  state: Mutex<StreamState<T, E>>,
}

impl<T, E> StreamSink<T, E> {
  /// Returns the subscription to ask for one more value, if a request is due.
  fn claim_request(&self) -> Option<SubscriptionRef> {
    let mut state = self.state.lock();
    if state.requested || state.is_closed || !state.queue.is_empty() {
      return None;
    }
    let subscription = state.subscription.clone()?;
    state.requested = true;
    Some(subscription)
  }

  fn wake(state: &mut StreamState<T, E>) {
    if let Some(waker) = state.waker.take() {
      waker.wake();
    }
  }
}

impl<T: Send, E: Send> Subscriber for StreamSink<T, E> {
  type Input = T;
  type Failure = E;

  fn on_subscribe(&self, subscription: SubscriptionRef) {
    let mut state = self.state.lock();
    if state.subscription.is_none() && !state.is_closed {
      state.subscription = Some(subscription);
      Self::wake(&mut state);
    } else {
      drop(state);
      subscription.cancel();
    }
  }

  fn on_next(&self, input: T) -> Demand {
    let mut state = self.state.lock();
    if !state.is_closed {
      state.queue.push_back(Ok(input));
      state.requested = false;
      Self::wake(&mut state);
    }
    Demand::None
  }

  fn on_complete(&self, completion: Completion<E>) {
    let mut state = self.state.lock();
    if state.is_closed {
      return;
    }
    if let Completion::Failed(err) = completion {
      state.queue.push_back(Err(err));
    }
    state.is_closed = true;
    state.subscription = None;
    Self::wake(&mut state);
  }
}

/// A `Stream` over the values of a publisher.
///
/// Yields `Ok(value)` per value, then `Err(failure)` if the publisher failed,
/// then ends. Dropping the stream cancels the subscription.
pub struct IntoStream<T, E> {
  sink: Arc<StreamSink<T, E>>,
}

impl<T, E> IntoStream<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  pub fn new<P>(publisher: &P) -> Self
  where
    P: Publisher<Output = T, Failure = E>,
  {
    let sink = Arc::new(StreamSink {
      state: Mutex::new(StreamState {
        queue: VecDeque::new(),
        waker: None,
        subscription: None,
        requested: false,
        is_closed: false,
      }),
    });
    publisher.subscribe(sink.clone());
    IntoStream { sink }
  }
}

impl<T, E> Stream for IntoStream<T, E> {
  type Item = Result<T, E>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut AsyncContext<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    // May deliver synchronously, so it runs with the state unlocked.
    if let Some(subscription) = this.sink.claim_request() {
      subscription.request(Demand::max(1));
    }

    let mut state = this.sink.state.lock();
    if let Some(item) = state.queue.pop_front() {
      return Poll::Ready(Some(item));
    }
    if state.is_closed {
      return Poll::Ready(None);
    }
    state.waker = Some(cx.waker().clone());
    Poll::Pending
  }
}

impl<T, E> Drop for IntoStream<T, E> {
  fn drop(&mut self) {
    let subscription = {
      let mut state = self.sink.state.lock();
      state.is_closed = true;
      state.subscription.take()
    };
    if let Some(subscription) = subscription {
      subscription.cancel();
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use futures::StreamExt;

  use crate::prelude::*;

  #[tokio::test]
  async fn receives_all_values() {
    let mut stream = from_iter::<_, ()>(vec![1, 2, 3]).into_stream();

    let mut values = vec![];
    while let Some(Ok(v)) = stream.next().await {
      values.push(v);
    }
    assert_eq!(values, vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn pulls_one_value_per_poll() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let c_pulled = pulled.clone();
    let source = from_iter::<_, ()>((0..).map(move |v| {
      c_pulled.fetch_add(1, Ordering::SeqCst);
      v
    }));
    let mut stream = source.into_stream();

    assert_eq!(stream.next().await, Some(Ok(0)));
    assert_eq!(stream.next().await, Some(Ok(1)));
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn failure_is_yielded_then_ends() {
    let mut stream = coordinate::<i32, &str, _>(|subscriber| {
      subscriber.send_completion(Completion::Failed("boom"));
      AnyCancellable::empty()
    })
    .into_stream();

    assert_eq!(stream.next().await, Some(Err("boom")));
    assert_eq!(stream.next().await, None);
  }

  #[tokio::test]
  async fn waits_for_values_from_another_thread() {
    let subject = PassthroughSubject::<i32, ()>::new();
    let mut stream = subject.clone().into_stream();

    // The first poll registers demand for one value.
    assert!(futures::poll!(stream.next()).is_pending());
    let producer = subject.clone();
    std::thread::spawn(move || producer.send(7)).join().unwrap();

    assert_eq!(stream.next().await, Some(Ok(7)));
  }

  #[tokio::test]
  async fn drop_cancels_subscription() {
    let subject = PassthroughSubject::<i32, ()>::new();
    let stream = subject.clone().into_stream();
    assert_eq!(subject.subscriber_count(), 1);

    drop(stream);
    assert_eq!(subject.subscriber_count(), 0);
  }
}
