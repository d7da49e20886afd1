//! Upstox access token persistence
//!
//! Keeps the current access token in an in-process slot and mirrors it into
//! a flat `KEY=value` env file so it survives restarts.

#![deny(clippy::all)]
#![allow(clippy::multiple_crate_versions)]

pub mod upstox;

pub use upstox::{ACCESS_TOKEN_ENV, AuthError, TOKEN_SAVED_MESSAGE, TokenStore, upsert_env_var};
