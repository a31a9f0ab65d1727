// crates/habitkit/src/lib.rs
// habitkit - local-first habit tracking engine

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod calendar;
pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod tracker;

pub use error::{HabitError, Result};
pub use habitkit_types as types;
pub use tracker::{HabitTracker, StoreLocation};
