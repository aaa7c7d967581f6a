//! Core NaijaCal library (session, food-log parsing, backend client, config).

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod parse;
pub mod session;

pub use client::NaijaCal;
