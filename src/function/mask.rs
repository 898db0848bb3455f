//! Masks decide, position by position, whether a region function runs.

use std::sync::Arc;

use cgmath::Point3;

use crate::voxels::block_type::BlockType;
use crate::voxels::extent::SharedExtent;
use crate::voxels::region::Region;

/// A predicate over block positions.
pub trait Mask: Send + Sync {
    /// Returns `true` if the position passes the mask.
    fn test(&self, position: Point3<i32>) -> bool;
}

/// Shared mask handle.
pub type SharedMask = Arc<dyn Mask>;

/// Passes every position.
#[derive(Copy, Clone, Debug, Default)]
pub struct AlwaysTrue;

impl Mask for AlwaysTrue {
    fn test(&self, _position: Point3<i32>) -> bool {
        true
    }
}

/// Passes positions holding a solid block in the extent.
pub struct ExistingBlockMask {
    extent: SharedExtent,
}

impl ExistingBlockMask {
    pub fn new(extent: SharedExtent) -> Self {
        Self { extent }
    }
}

impl Mask for ExistingBlockMask {
    fn test(&self, position: Point3<i32>) -> bool {
        self.extent.get().get_block(position).is_solid()
    }
}

/// Passes positions holding one of the given block types.
pub struct BlockMask {
    extent: SharedExtent,
    blocks: Vec<BlockType>,
}

impl BlockMask {
    pub fn new(extent: SharedExtent, blocks: Vec<BlockType>) -> Self {
        Self { extent, blocks }
    }
}

impl Mask for BlockMask {
    fn test(&self, position: Point3<i32>) -> bool {
        let block = self.extent.get().get_block(position);
        self.blocks.contains(&block)
    }
}

/// Passes positions inside a region.
pub struct RegionMask {
    region: Box<dyn Region>,
}

impl RegionMask {
    pub fn new(region: Box<dyn Region>) -> Self {
        Self { region }
    }
}

impl Mask for RegionMask {
    fn test(&self, position: Point3<i32>) -> bool {
        self.region.contains(position)
    }
}

/// Inverts another mask.
pub struct Negated(pub SharedMask);

impl Mask for Negated {
    fn test(&self, position: Point3<i32>) -> bool {
        !self.0.test(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MtResource;
    use crate::voxels::extent::{share_extent, Extent, ExtentBuffer};

    #[test]
    fn existing_block_mask_follows_the_extent() {
        let buffer = MtResource::new(ExtentBuffer::new());
        let at = Point3::new(0, 1, 0);
        buffer.get_mut().set_block(at, BlockType::DIRT).unwrap();

        let mask = ExistingBlockMask::new(share_extent(&buffer));
        assert!(mask.test(at));
        assert!(!mask.test(Point3::new(0, 2, 0)));
        assert!(Negated(Arc::new(mask)).test(Point3::new(0, 2, 0)));
    }
}
