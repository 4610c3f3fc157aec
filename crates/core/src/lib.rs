//! Shared vocabulary for the Relay notification platform.
//!
//! - [`types`] -- database id and timestamp aliases.
//! - [`error`] -- the domain-level [`error::CoreError`] enum.
//! - [`channels`] -- well-known delivery channel name constants.
//! - [`roles`] -- role name constants and directory role mapping.

pub mod channels;
pub mod error;
pub mod roles;
pub mod types;
