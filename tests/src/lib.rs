//! # Blocks API Test Suite
//!
//! End-to-end scenarios that drive the full axum router, middleware
//! included, over the in-memory Ledger Store and Counter Store.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Seeded ledger, app builder, request helpers
//! └── integration/
//!     ├── blocks.rs       # /block lookups, ranges, paging
//!     ├── transactions.rs # /transaction lookups and address filters
//!     ├── admission.rs    # per-client daily request limits
//!     └── surface.rs      # gas price, health, body handling, errors
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p blocks-tests
//! cargo test -p blocks-tests integration::admission::
//! ```

pub mod fixtures;
pub mod integration;
