//! # Extent Module
//!
//! An extent is anything blocks can be read from and written to: the world,
//! an edit session buffering changes for the world, or a scratch buffer.
//! Operations only ever see extents through [`SharedExtent`] handles.

use std::collections::HashMap;

use cgmath::Point3;

use crate::core::MtResource;
use crate::error::OperationError;
use crate::voxels::block_type::BlockType;
use crate::voxels::region::{PointSetRegion, Region};

/// A readable and writable space of blocks.
pub trait Extent: Send + Sync {
    /// Gets the block at a position.
    fn get_block(&self, position: Point3<i32>) -> BlockType;

    /// Sets the block at a position.
    ///
    /// # Returns
    /// `Ok(true)` if the block actually changed.
    fn set_block(&mut self, position: Point3<i32>, block: BlockType) -> Result<bool, OperationError>;
}

/// Shared handle through which operations read and write an extent.
pub type SharedExtent = MtResource<dyn Extent>;

/// Views any shared extent as a [`SharedExtent`], keeping it shared.
pub fn share_extent<E: Extent + 'static>(extent: &MtResource<E>) -> SharedExtent {
    MtResource::<dyn Extent>::from_shared(extent.resource.clone())
}

/// An in-memory extent that remembers every block written into it.
///
/// Writes outside the accepted region (if one is given) are dropped and
/// reported as "not changed", so a buffer can sit between a copy and its
/// final destination without growing past the area being moved.
#[derive(Default)]
pub struct ExtentBuffer {
    blocks: HashMap<Point3<i32>, BlockType>,
    accepted: Option<Box<dyn Region>>,
}

impl ExtentBuffer {
    /// Creates an empty buffer accepting writes anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer only accepting writes inside `region`.
    pub fn within(region: Box<dyn Region>) -> Self {
        Self {
            blocks: HashMap::new(),
            accepted: Some(region),
        }
    }

    /// Number of positions written.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The written positions as a region, in y, z, x order.
    pub fn as_region(&self) -> PointSetRegion {
        let mut points: Vec<Point3<i32>> = self.blocks.keys().copied().collect();
        points.sort_by_key(|p| (p.y, p.z, p.x));
        PointSetRegion::new(points)
    }
}

impl Extent for ExtentBuffer {
    fn get_block(&self, position: Point3<i32>) -> BlockType {
        self.blocks.get(&position).copied().unwrap_or(BlockType::AIR)
    }

    fn set_block(&mut self, position: Point3<i32>, block: BlockType) -> Result<bool, OperationError> {
        if let Some(region) = &self.accepted {
            if !region.contains(position) {
                return Ok(false);
            }
        }
        Ok(self.blocks.insert(position, block) != Some(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::region::CuboidRegion;

    #[test]
    fn buffer_drops_writes_outside_its_region() {
        let region = CuboidRegion::new(Point3::new(0, 0, 0), Point3::new(1, 1, 1));
        let mut buffer = ExtentBuffer::within(Box::new(region));
        assert!(buffer.set_block(Point3::new(1, 1, 1), BlockType::WOOD).unwrap());
        assert!(!buffer.set_block(Point3::new(2, 1, 1), BlockType::WOOD).unwrap());
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get_block(Point3::new(2, 1, 1)), BlockType::AIR);
    }

    #[test]
    fn region_view_is_ordered_bottom_up() {
        let mut buffer = ExtentBuffer::new();
        buffer.set_block(Point3::new(0, 5, 0), BlockType::DIRT).unwrap();
        buffer.set_block(Point3::new(3, 1, 0), BlockType::DIRT).unwrap();
        let points: Vec<_> = buffer.as_region().positions().collect();
        assert_eq!(points, vec![Point3::new(3, 1, 0), Point3::new(0, 5, 0)]);
    }
}
