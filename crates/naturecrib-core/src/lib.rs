//! Core naturecrib library (auth flow, session store, config).

pub mod auth;
pub mod config;
pub mod logging;
pub mod session;
