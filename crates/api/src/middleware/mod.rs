//! Request guards.
//!
//! - [`auth`] -- JWT-based authentication extractor.
//! - [`csrf`] -- anti-forgery token verification for mutating endpoints.

pub mod auth;
pub mod csrf;
