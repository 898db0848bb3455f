//! # Voxels
//!
//! The world-side collaborators the operation engine drives: block palette,
//! chunk storage, the world itself, edit sessions buffering changes, and the
//! geometric pieces (regions, transforms) operations are built from.
//!
//! ## Data Flow
//!
//! 1. Operations read and write through an `EditSession` seen as an `Extent`
//! 2. The session queues changes in an overlay
//! 3. The executor flushes the session once the owning task finishes
//! 4. Flushing commits the overlay into the `World`'s chunks

pub mod block_type;
pub mod chunk;
pub mod edit_session;
pub mod extent;
pub mod region;
pub mod transform;
pub mod world;
