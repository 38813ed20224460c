//! Core FetchMate client library (config, session, auth, fetch workflow).

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod guard;
pub mod session;
