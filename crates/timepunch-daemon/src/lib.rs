//! Timepunch daemon library.
//!
//! Exposes the offline-resilient punch submission engine: the remote swipe
//! API client, connection state, punch gateway, throttle, photo store, and
//! the sync reconciler with its background tasks.

pub mod connection;
pub mod gateway;
pub mod photos;
pub mod remote;
pub mod sync;
pub mod tasks;
pub mod throttle;
