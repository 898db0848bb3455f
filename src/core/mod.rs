//! # Core Module
//!
//! Shared-state primitives and configuration used throughout the crate.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `EngineConfig`: Heartbeat and session tunables, loadable from JSON
//!
//! ## Usage
//! ```rust
//! use voxel_operations::core::MtResource;
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod config;
pub mod mt_resource;

pub use config::EngineConfig;
pub use mt_resource::MtResource;
