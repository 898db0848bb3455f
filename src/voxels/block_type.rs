//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides functionality for block type identification, conversion, and random generation.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// Enumerates all possible block types in the voxel world.
///
/// The `FromPrimitive` derive allows conversion from the compact storage id
/// kept inside chunks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum BlockType {
    /// An air block, which is non-solid and transparent.
    AIR,

    /// A basic dirt block, used as a common building material.
    DIRT,

    /// A grass block.
    GRASS,

    /// A wooden block.
    WOOD,

    /// A plain white block, often used for testing.
    WHITE,
}

impl BlockType {
    /// Converts a stored id back into a `BlockType`.
    ///
    /// Unknown ids decode as `AIR`, so a corrupted cell reads as empty rather
    /// than aborting an edit halfway through a region.
    pub fn from_id(id: BlockTypeSize) -> Self {
        BlockType::from_u8(id).unwrap_or(BlockType::AIR)
    }

    /// The compact id stored in chunks.
    pub fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Whether the block occupies its cell.
    pub fn is_solid(self) -> bool {
        self != BlockType::AIR
    }

    /// Generates a random block type (excluding AIR).
    pub fn get_random_type(rng: &mut fastrand::Rng) -> Self {
        BlockType::from_id(rng.u8(1..5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for block in [BlockType::AIR, BlockType::DIRT, BlockType::GRASS, BlockType::WOOD, BlockType::WHITE] {
            assert_eq!(BlockType::from_id(block.id()), block);
        }
        assert_eq!(BlockType::from_id(200), BlockType::AIR);
    }

    #[test]
    fn random_types_are_solid() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..64 {
            assert!(BlockType::get_random_type(&mut rng).is_solid());
        }
    }
}
