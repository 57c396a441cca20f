//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Demand and the locking primitive
pub use crate::demand::Demand;
pub use crate::lock::{effect, Effect, StateLock};
// Operators
#[cfg(feature = "stream")]
pub use crate::ops::into_stream::IntoStream;
pub use crate::ops::take_until::TakeUntil;
// Publishers
pub use crate::publisher::{
  coordinate, empty, from_iter, just, never, Coordinate, CoordinateSubscriber, Empty, Never,
  Publisher, PublisherExt, Sequence,
};
// Release registry
pub use crate::release::{ReleaseError, ReleaseKey, ReleaseRegistry, ReleaseSignal};
// Subjects
pub use crate::subject::PassthroughSubject;
// Subscribers
pub use crate::subscriber::{Completion, DemandableSubscriber, Subscriber};
// Subscriptions
pub use crate::subscription::{
  AnyCancellable, CancelGuard, Cancellable, ClosureCancellable, Subscription, SubscriptionRef,
};
