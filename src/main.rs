//! # Voxel Operations Demo
//!
//! Runs the library's headless demo: a tick loop driving bulk edits through
//! the operation runtime.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    voxel_operations::run();
}
