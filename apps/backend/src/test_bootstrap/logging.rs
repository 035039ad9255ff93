#![cfg(test)]

//! Unit-test logging initialization.
//!
//! Idempotent and race-safe; the level is taken from `TEST_LOG`, then
//! `RUST_LOG`, defaulting to quiet.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "warn".to_string());

        fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}
