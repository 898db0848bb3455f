//! # World Module
//!
//! This module provides the `World` struct which manages a collection of chunks in the voxel world.
//!
//! ## Architecture
//!
//! The world uses a sparse storage approach where only chunks that have been
//! written to are kept in memory. Reading a cell in a missing chunk yields air,
//! and writing air into a missing chunk does not allocate it.

use crate::error::OperationError;
use crate::voxels::chunk::{Chunk, CHUNK_DIMENSION};
use crate::voxels::extent::Extent;
use cgmath::Point3;
use std::collections::HashMap;

use super::block_type::BlockType;

/// Represents a voxel world composed of multiple chunks.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_operations::voxels::{block_type::BlockType, extent::Extent, world::World};
///
/// let mut world = World::new();
/// world.set_block(Point3::new(-1, 4, 17), BlockType::GRASS).unwrap();
/// assert_eq!(world.get_block(Point3::new(-1, 4, 17)), BlockType::GRASS);
/// assert_eq!(world.chunks.len(), 1);
/// ```
#[derive(Default)]
pub struct World {
    /// A mapping from chunk coordinates to chunk data.
    pub chunks: HashMap<Point3<i32>, Chunk>,
}

impl World {
    /// Creates a new, empty world.
    pub fn new() -> Self {
        World {
            chunks: HashMap::new(),
        }
    }

    /// Splits a block position into chunk coordinates and chunk-relative coordinates.
    pub fn split_position(position: Point3<i32>) -> (Point3<i32>, Point3<i32>) {
        let chunk = Point3::new(
            position.x.div_euclid(CHUNK_DIMENSION),
            position.y.div_euclid(CHUNK_DIMENSION),
            position.z.div_euclid(CHUNK_DIMENSION),
        );
        let local = Point3::new(
            position.x.rem_euclid(CHUNK_DIMENSION),
            position.y.rem_euclid(CHUNK_DIMENSION),
            position.z.rem_euclid(CHUNK_DIMENSION),
        );
        (chunk, local)
    }

    /// Retrieves the chunk at the specified chunk coordinates.
    pub fn get_chunk_at(&self, pos: Point3<i32>) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    /// Total number of solid blocks across all loaded chunks.
    pub fn solid_count(&self) -> usize {
        self.chunks.values().map(Chunk::solid_count).sum()
    }
}

impl Extent for World {
    fn get_block(&self, position: Point3<i32>) -> BlockType {
        let (chunk, local) = Self::split_position(position);
        self.chunks
            .get(&chunk)
            .map_or(BlockType::AIR, |chunk| chunk.get_block_at(local))
    }

    fn set_block(&mut self, position: Point3<i32>, block: BlockType) -> Result<bool, OperationError> {
        let (chunk_pos, local) = Self::split_position(position);
        if !block.is_solid() && !self.chunks.contains_key(&chunk_pos) {
            return Ok(false);
        }
        let chunk = self
            .chunks
            .entry(chunk_pos)
            .or_insert_with(|| Chunk::empty(chunk_pos));
        Ok(chunk.set_block_at(local, block) != block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_positions_land_in_negative_chunks() {
        let (chunk, local) = World::split_position(Point3::new(-1, 0, -17));
        assert_eq!(chunk, Point3::new(-1, 0, -2));
        assert_eq!(local, Point3::new(15, 0, 15));
    }

    #[test]
    fn writing_air_does_not_allocate() {
        let mut world = World::new();
        assert!(!world.set_block(Point3::new(0, 0, 0), BlockType::AIR).unwrap());
        assert!(world.chunks.is_empty());
    }

    #[test]
    fn rewriting_the_same_block_is_not_a_change() {
        let mut world = World::new();
        let at = Point3::new(2, 3, 4);
        assert!(world.set_block(at, BlockType::DIRT).unwrap());
        assert!(!world.set_block(at, BlockType::DIRT).unwrap());
        assert_eq!(world.solid_count(), 1);
    }
}
