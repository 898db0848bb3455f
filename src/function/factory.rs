//! # Operation Factory
//!
//! Builds the operation trees behind common edits. Every function returns an
//! operation that has not done any work yet; hand it to an executor, a
//! runtime, or one of the synchronous `complete` helpers.
//!
//! | Edit             | Operation tree                                          |
//! |------------------|---------------------------------------------------------|
//! | `set_blocks`     | visitor → replace                                       |
//! | `replace_blocks` | visitor → mask filter → replace                         |
//! | `count_blocks`   | count delegate ( visitor → mask filter → counter )      |
//! | `stack_region`   | forward copy, one repetition per stacked copy          |
//! | `move_region`    | queue ( copy into buffer + clear source, place buffer ) |

use std::sync::Arc;

use cgmath::{Point3, Vector3};

use crate::core::MtResource;
use crate::error::{OperationError, UsageError};
use crate::function::mask::SharedMask;
use crate::function::pattern::{BlockPattern, ExtentPattern, SharedPattern};
use crate::function::{BlockCounter, BlockReplace, RegionMaskingFilter};
use crate::operation::{
    CountDelegatedOperation, ForwardExtentCopy, Operation, OperationQueue, RegionVisitor, RunContext, Step,
};
use crate::voxels::block_type::BlockType;
use crate::voxels::extent::{share_extent, ExtentBuffer, SharedExtent};
use crate::voxels::region::Region;
use crate::voxels::transform::AffineTransform;

/// Sets every block of `region` from `pattern`.
///
/// The operation's affected count is the number of blocks that changed.
pub fn set_blocks(extent: SharedExtent, region: &dyn Region, pattern: SharedPattern) -> RegionVisitor {
    RegionVisitor::new(region, Arc::new(BlockReplace::new(extent, pattern)))
}

/// Sets the blocks of `region` passing `mask` from `pattern`.
pub fn replace_blocks(
    extent: SharedExtent,
    region: &dyn Region,
    mask: SharedMask,
    pattern: SharedPattern,
) -> RegionVisitor {
    let replace = Arc::new(BlockReplace::new(extent, pattern));
    RegionVisitor::new(region, Arc::new(RegionMaskingFilter::new(mask, replace)))
}

/// Counts the blocks of `region` passing `mask`.
///
/// The returned operation reports the count as its affected count.
pub fn count_blocks(region: &dyn Region, mask: SharedMask) -> Result<CountDelegatedOperation, UsageError> {
    let counter = BlockCounter::new();
    let visitor = RegionVisitor::new(region, Arc::new(RegionMaskingFilter::new(mask, Arc::new(counter.clone()))));
    CountDelegatedOperation::new(Box::new(visitor), Arc::new(counter))
}

/// Repeats `region` `count` times next to itself along `direction`.
///
/// `direction` is a unit step per axis, e.g. `(1, 0, 0)` stacks towards +x.
pub fn stack_region(
    extent: SharedExtent,
    region: Arc<dyn Region>,
    count: usize,
    direction: Vector3<i32>,
) -> ForwardExtentCopy {
    let origin = region.minimum_point();
    let step = stacked_origin(region.as_ref(), 1, direction) - origin;
    ForwardExtentCopy::new(extent.clone(), region, extent, origin)
        .with_repetitions(count)
        .with_transform(AffineTransform::translation(step))
}

/// Moves `region` by `offset`, leaving `replacement` behind.
///
/// Blocks are first copied into a scratch buffer (clearing the source as
/// they go), then placed, so overlapping moves do not read their own output.
pub fn move_region(
    extent: SharedExtent,
    region: Arc<dyn Region>,
    offset: Vector3<i32>,
    replacement: BlockType,
) -> OperationQueue {
    let buffer = MtResource::new(ExtentBuffer::new());
    let to = region.minimum_point() + offset;
    let clear = Arc::new(BlockReplace::new(extent.clone(), Arc::new(BlockPattern(replacement))));
    let lift = ForwardExtentCopy::new(extent.clone(), region, share_extent(&buffer), to).with_source_function(clear);
    OperationQueue::new(vec![
        Box::new(lift),
        Box::new(PlaceBuffer {
            buffer,
            destination: extent,
            visitor: None,
        }),
    ])
}

/// Writes everything a buffer holds into an extent at the same positions.
struct PlaceBuffer {
    buffer: MtResource<ExtentBuffer>,
    destination: SharedExtent,
    visitor: Option<RegionVisitor>,
}

impl Operation for PlaceBuffer {
    fn resume(&mut self, run: &dyn RunContext) -> Result<Step, OperationError> {
        let buffer = &self.buffer;
        let destination = &self.destination;
        let visitor = self.visitor.get_or_insert_with(|| {
            let region = buffer.get().as_region();
            let pattern = Arc::new(ExtentPattern::new(share_extent(buffer)));
            set_blocks(destination.clone(), &region, pattern)
        });
        visitor.resume(run)
    }

    fn cancel(&mut self) {
        if let Some(visitor) = &mut self.visitor {
            visitor.cancel();
        }
    }

    fn affected(&self) -> Option<usize> {
        self.visitor.as_ref().map(RegionVisitor::affected_count)
    }
}

/// Where a stacked copy number `k` (from one) of `region` starts.
pub fn stacked_origin(region: &dyn Region, k: i32, direction: Vector3<i32>) -> Point3<i32> {
    let size = region.dimensions();
    region.minimum_point() + Vector3::new(direction.x * size.x, direction.y * size.y, direction.z * size.z) * k
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::mask::{BlockMask, ExistingBlockMask};
    use crate::operation::complete::complete;
    use crate::voxels::extent::Extent;
    use crate::voxels::region::CuboidRegion;

    fn cube(min: Point3<i32>, size: i32) -> CuboidRegion {
        CuboidRegion::new(min, min + Vector3::new(size - 1, size - 1, size - 1))
    }

    fn buffer_with(region: &CuboidRegion, block: BlockType) -> MtResource<ExtentBuffer> {
        let buffer = MtResource::new(ExtentBuffer::new());
        complete(Box::new(set_blocks(share_extent(&buffer), region, Arc::new(BlockPattern(block))))).unwrap();
        buffer
    }

    #[test]
    fn set_then_count() {
        let region = cube(Point3::new(-2, 0, -2), 4);
        let buffer = buffer_with(&region, BlockType::WOOD);
        let counted = count_blocks(&region, Arc::new(ExistingBlockMask::new(share_extent(&buffer)))).unwrap();
        assert_eq!(complete(Box::new(counted)).unwrap(), Some(64));
    }

    #[test]
    fn replace_only_touches_masked_blocks() {
        let region = cube(Point3::new(0, 0, 0), 2);
        let buffer = buffer_with(&region, BlockType::DIRT);
        buffer.get_mut().set_block(Point3::new(0, 0, 0), BlockType::WOOD).unwrap();

        let replace = replace_blocks(
            share_extent(&buffer),
            &region,
            Arc::new(BlockMask::new(share_extent(&buffer), vec![BlockType::DIRT])),
            Arc::new(BlockPattern(BlockType::GRASS)),
        );
        assert_eq!(complete(Box::new(replace)).unwrap(), Some(7));
        assert_eq!(buffer.get().get_block(Point3::new(0, 0, 0)), BlockType::WOOD);
        assert_eq!(buffer.get().get_block(Point3::new(1, 1, 1)), BlockType::GRASS);
    }

    #[test]
    fn stack_places_copies_side_by_side() {
        let region = cube(Point3::new(0, 0, 0), 3);
        let buffer = buffer_with(&region, BlockType::WHITE);
        let direction = Vector3::new(0, 1, 0);
        let stack = stack_region(share_extent(&buffer), Arc::new(region.clone()), 2, direction);
        assert_eq!(complete(Box::new(stack)).unwrap(), Some(54));

        assert_eq!(stacked_origin(&region, 2, direction), Point3::new(0, 6, 0));
        assert_eq!(buffer.get().get_block(Point3::new(2, 8, 2)), BlockType::WHITE);
        assert_eq!(buffer.get().len(), 81);
    }

    #[test]
    fn move_handles_overlap() {
        let region = cube(Point3::new(0, 0, 0), 2);
        let buffer = buffer_with(&region, BlockType::DIRT);
        let moved = move_region(share_extent(&buffer), Arc::new(region), Vector3::new(1, 0, 0), BlockType::AIR);
        complete(Box::new(moved)).unwrap();

        assert_eq!(buffer.get().get_block(Point3::new(0, 0, 0)), BlockType::AIR);
        assert_eq!(buffer.get().get_block(Point3::new(1, 1, 1)), BlockType::DIRT);
        assert_eq!(buffer.get().get_block(Point3::new(2, 1, 1)), BlockType::DIRT);
    }
}
