//! Operators built on top of [`Publisher`](crate::publisher::Publisher).

#[cfg(feature = "stream")]
pub mod into_stream;
pub mod take_until;
