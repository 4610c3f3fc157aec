//! Secondary delivery channels (email, push).
//!
//! These consume channel-queue work items created by the emitter; nothing
//! here runs on the synchronous request path.

pub mod email;
pub mod push;

pub use email::{EmailConfig, EmailDelivery};
pub use push::{PushConfig, PushDelivery};
