//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token generation and validation.
//!
//! Session issuance and login flows live outside this subsystem; the API
//! only consumes tokens as an opaque authentication gate.

pub mod jwt;
