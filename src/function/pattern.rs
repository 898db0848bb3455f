//! Patterns choose which block a replace writes at each position.

use std::sync::Arc;

use cgmath::Point3;
use parking_lot::Mutex;

use crate::voxels::block_type::BlockType;
use crate::voxels::extent::SharedExtent;

/// Chooses a block for a position.
pub trait Pattern: Send + Sync {
    fn apply(&self, position: Point3<i32>) -> BlockType;
}

/// Shared pattern handle.
pub type SharedPattern = Arc<dyn Pattern>;

/// Always the same block.
#[derive(Copy, Clone, Debug)]
pub struct BlockPattern(pub BlockType);

impl Pattern for BlockPattern {
    fn apply(&self, _position: Point3<i32>) -> BlockType {
        self.0
    }
}

/// A random solid block per position, reproducible from its seed.
pub struct RandomPattern {
    rng: Mutex<fastrand::Rng>,
}

impl RandomPattern {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Pattern for RandomPattern {
    fn apply(&self, _position: Point3<i32>) -> BlockType {
        BlockType::get_random_type(&mut self.rng.lock())
    }
}

/// Whatever block another extent holds at the same position.
pub struct ExtentPattern {
    extent: SharedExtent,
}

impl ExtentPattern {
    pub fn new(extent: SharedExtent) -> Self {
        Self { extent }
    }
}

impl Pattern for ExtentPattern {
    fn apply(&self, position: Point3<i32>) -> BlockType {
        self.extent.get().get_block(position)
    }
}
