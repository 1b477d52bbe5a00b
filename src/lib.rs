//! Parley is a terminal chat client for Telnyx-style streaming inference
//! APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the stream parser and request
//!   dispatcher, the single-generation session guard, persisted
//!   configuration, and the model catalog.
//! - [`ui`] renders the terminal interface and runs the event loop that
//!   drives user input, drains the generation channel, and updates the
//!   display.
//! - [`auth`] stores per-provider API keys in the OS keyring and hosts the
//!   interactive auth/deauth flows.
//! - [`api`] defines the wire payloads exchanged with the inference
//!   endpoint.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into
//! [`ui::chat_loop`] for interactive sessions.

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
