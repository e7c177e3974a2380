//! Core docdesk library (session store, authenticated API client, config).

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod session;
