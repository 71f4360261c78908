//! Data layer: core types, loading, classification, and filtering.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  Table    │  ordered named columns, row-aligned
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ classify  │  per-column Kind: categorical / numeric / temporal / text
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  kind-shaped predicates, AND-combined → narrowed Table
//!   └──────────┘
//! ```

pub mod classify;
pub mod filter;
pub mod loader;
pub mod model;
