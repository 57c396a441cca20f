//! # backpressure-rx: demand-driven reactive streams
//!
//! Push-based streams where the consumer decides how much is produced. Every
//! subscriber receives a [`Subscription`] and nothing flows until it requests
//! [`Demand`]; a value delivered to `on_next` may return more demand.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use backpressure_rx::prelude::*;
//!
//! let registry = ReleaseRegistry::new();
//! let (key, dismissed) = registry.signal();
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//!
//! let ticks = PassthroughSubject::<u32, std::convert::Infallible>::new();
//! let _handle = ticks
//!   .clone()
//!   .take_until(dismissed)
//!   .sink(move |v| c_seen.lock().unwrap().push(v));
//!
//! ticks.send(1);
//! ticks.send(2);
//! registry.complete(key);
//! ticks.send(3);
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Publisher`] | Hands each subscriber its own subscription |
//! | [`Subscriber`] | Receives `on_subscribe`, `on_next` and `on_complete` |
//! | [`Subscription`] | Requests demand and cancels |
//! | [`Demand`] | `none`, a finite count, or `unlimited` |
//! | [`StateLock`] | Lock, mutate, release, then run side effects |
//!
//! ## Threading
//!
//! All protocol types are `Send + Sync`. Side effects (calls into another
//! publisher or subscriber) never run while a state lock is borrowed, and
//! every lock is reentrant, so a subscriber may request or cancel from inside
//! its own callbacks.
//!
//! ## Feature Flags
//!
//! - **`stream`** (default): [`PublisherExt::into_stream`], bridging to
//!   `futures::Stream`
//!
//! [`Publisher`]: publisher::Publisher
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`Demand`]: demand::Demand
//! [`StateLock`]: lock::StateLock
//! [`PublisherExt::into_stream`]: publisher::PublisherExt::into_stream

pub mod demand;
pub mod lock;
pub mod ops;
pub mod prelude;
pub mod publisher;
pub mod release;
pub mod subject;
pub mod subscriber;
pub mod subscription;

mod slots;
#[cfg(test)]
mod test_support;

pub use prelude::*;
