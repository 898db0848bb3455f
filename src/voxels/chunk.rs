//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a 16x16x16 block of voxel data.
//!
//! ## Storage
//!
//! Each chunk keeps two parallel views of its cells:
//! - `solid_array`: A bit vector (1 bit per block) indicating which blocks are solid
//! - `blocks`: The block id of every cell, in x-then-z-then-y order
//!
//! The bit vector answers solidity checks (the hot path of existing-block
//! masks) without decoding ids, and gives a cheap solid count.

use bitvec::prelude::BitVec;
use cgmath::Point3;

use super::block_type::{BlockType, BlockTypeSize};

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;

/// Represents a 16x16x16 collection of voxel blocks in the world.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,

    /// One bit per cell, set when the cell holds a solid block.
    pub solid_array: BitVec,

    /// The block id of every cell.
    pub blocks: Vec<BlockTypeSize>,
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air).
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates of the new chunk
    pub fn empty(position: Point3<i32>) -> Self {
        let mut solid_array = BitVec::with_capacity(CHUNK_SIZE as usize);
        solid_array.resize(CHUNK_SIZE as usize, false);
        Chunk {
            position,
            solid_array,
            blocks: vec![BlockType::AIR.id(); CHUNK_SIZE as usize],
        }
    }

    /// Creates a new chunk where every cell holds `block`.
    pub fn filled(position: Point3<i32>, block: BlockType) -> Self {
        let mut solid_array = BitVec::with_capacity(CHUNK_SIZE as usize);
        solid_array.resize(CHUNK_SIZE as usize, block.is_solid());
        Chunk {
            position,
            solid_array,
            blocks: vec![block.id(); CHUNK_SIZE as usize],
        }
    }

    /// Index of a chunk-relative cell in the storage arrays.
    ///
    /// # Panics
    /// Panics in debug builds if the coordinates are outside the chunk.
    fn index(local: Point3<i32>) -> usize {
        debug_assert!((0..CHUNK_DIMENSION).contains(&local.x));
        debug_assert!((0..CHUNK_DIMENSION).contains(&local.y));
        debug_assert!((0..CHUNK_DIMENSION).contains(&local.z));
        (local.x + CHUNK_DIMENSION * local.z + CHUNK_PLANE_SIZE * local.y) as usize
    }

    /// Gets the block at the specified chunk-relative coordinates.
    pub fn get_block_at(&self, local: Point3<i32>) -> BlockType {
        BlockType::from_id(self.blocks[Self::index(local)])
    }

    /// Sets the block at the specified chunk-relative coordinates.
    ///
    /// # Returns
    /// The block that was previously stored there.
    pub fn set_block_at(&mut self, local: Point3<i32>, block: BlockType) -> BlockType {
        let index = Self::index(local);
        let previous = BlockType::from_id(self.blocks[index]);
        self.blocks[index] = block.id();
        self.solid_array.set(index, block.is_solid());
        previous
    }

    /// Checks if the block at the specified chunk-relative coordinates is solid.
    pub fn is_block_solid(&self, local: Point3<i32>) -> bool {
        self.solid_array[Self::index(local)]
    }

    /// Number of solid cells in the chunk.
    pub fn solid_count(&self) -> usize {
        self.solid_array.count_ones()
    }
}
