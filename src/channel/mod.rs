//! Typed multicast channels.
//!
//! An [`EventChannel`] is the unit every hub event, widget click and
//! selection notification travels through. Registration is idempotent per
//! [`SubscriberKey`], weakly held subscribers are swept lazily, and a publish
//! survives subscribers mutating the table from inside their callbacks.

mod core;

pub use core::{
    ChannelConfig, EventChannel, PublishReport, SubscriberKey, SubscriberKind, SubscriptionHandle,
};
