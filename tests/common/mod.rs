//! Common test utilities with tracing setup.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     // ... test code; structural events appear with --features tracing
//! }
//! ```
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives (e.g. `augbtree=trace`)

#![allow(dead_code)]

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialise a fmt subscriber once per test binary. Safe to call from every
/// test; only the first call installs anything.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
