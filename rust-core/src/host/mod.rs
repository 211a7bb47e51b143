//! Host-side plumbing: idle dispatch and publish/subscribe

pub mod dispatch;
pub mod signal;

pub use dispatch::{idle_channel, DeferredWork, DispatchQueue, DispatchThread, IdleDispatcher};
pub use signal::{Signal, Subscription};
