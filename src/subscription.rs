//! Subscription and cancellation handles.
//!
//! A [`Subscription`] is the live binding between one publisher and one
//! subscriber. It carries demand upstream via [`Subscription::request`] and
//! tears the binding down via [`Cancellable::cancel`].

use std::sync::Arc;

use crate::demand::Demand;

mod any_cancellable;
mod closure;

pub use any_cancellable::*;
pub use closure::*;

/// An opaque handle to something that can be stopped.
///
/// `cancel` must be idempotent and callable from any thread at any time,
/// including after the underlying work has already finished.
pub trait Cancellable: Send + Sync {
  fn cancel(&self);
}

/// The binding handed to a subscriber in `on_subscribe`.
pub trait Subscription: Cancellable {
  /// Signals willingness to receive up to `demand` more values. Demand is
  /// cumulative across calls.
  fn request(&self, demand: Demand);
}

/// Shared, type-erased subscription handle.
pub type SubscriptionRef = Arc<dyn Subscription>;

impl<T: Cancellable + ?Sized> Cancellable for Arc<T> {
  #[inline]
  fn cancel(&self) { (**self).cancel() }
}

impl<T: Subscription + ?Sized> Subscription for Arc<T> {
  #[inline]
  fn request(&self, demand: Demand) { (**self).request(demand) }
}

/// Cancelling nothing is always safe.
impl Cancellable for () {
  #[inline]
  fn cancel(&self) {}
}

/// The inert subscription, handed out by publishers that never honor demand.
impl Subscription for () {
  #[inline]
  fn request(&self, _: Demand) {}
}
