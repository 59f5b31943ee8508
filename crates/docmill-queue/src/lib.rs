//! Queue broker binding.
//!
//! One durable Redis stream per operation carries job dispatches from the
//! producer to the operation's workers: at-least-once delivery, manual
//! acknowledgment, prefetch of exactly one message per consumer.

pub mod broker;
pub mod error;

pub use broker::{Broker, Delivery, QueueConfig, RedisBroker};
pub use error::{QueueError, QueueResult};
