//! Queue lifecycle
//!
//! [`Discoverer`] tops up the durable queue from candidate sources, and
//! [`Publisher`] drains it one entry per invocation.

pub mod discover;
pub mod publish;

pub use discover::{DiscoveryReport, Discoverer};
pub use publish::{PublishOutcome, PublishReport, PublishState, Publisher};
