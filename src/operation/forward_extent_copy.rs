//! # Forward Extent Copy
//!
//! Copies a region of one extent into another, optionally several times with
//! a transform applied once more per repetition. Each repetition is a full
//! pass of a `RegionVisitor` over the source region; a pass can span several
//! resumptions when the budget runs out part way through.
//!
//! ## Repetitions
//!
//! Repetition `k` (counting from one) places the source through the base
//! transform composed with itself `k` times. With a translation of one region
//! width this stacks copies side by side; with a rotation it fans them out.

use std::sync::Arc;

use cgmath::Point3;
use log::trace;

use crate::error::OperationError;
use crate::function::mask::{AlwaysTrue, SharedMask};
use crate::function::{CombinedRegionFunction, ExtentBlockCopy, RegionMaskingFilter, SharedFunction};
use crate::operation::region_visitor::{RegionVisitor, DEFAULT_CELLS_PER_RESUME};
use crate::operation::{Operation, RunContext, Step};
use crate::voxels::extent::SharedExtent;
use crate::voxels::region::Region;
use crate::voxels::transform::AffineTransform;

/// Copies a source region into a destination extent.
pub struct ForwardExtentCopy {
    source: SharedExtent,
    region: Arc<dyn Region>,
    from: Point3<i32>,
    destination: SharedExtent,
    to: Point3<i32>,
    repetitions: usize,
    transform: AffineTransform,
    current_transform: Option<AffineTransform>,
    source_mask: SharedMask,
    source_function: Option<SharedFunction>,
    cells_per_resume: usize,
    visitor: Option<RegionVisitor>,
    affected: usize,
}

impl ForwardExtentCopy {
    /// Creates a single, untransformed copy.
    ///
    /// # Arguments
    /// * `source` - The extent blocks are read from
    /// * `region` - The source region to copy
    /// * `destination` - The extent blocks are written to
    /// * `to` - Where the region's minimum corner lands in the destination
    pub fn new(
        source: SharedExtent,
        region: Arc<dyn Region>,
        destination: SharedExtent,
        to: Point3<i32>,
    ) -> Self {
        let from = region.minimum_point();
        Self {
            source,
            region,
            from,
            destination,
            to,
            repetitions: 1,
            transform: AffineTransform::identity(),
            current_transform: None,
            source_mask: Arc::new(AlwaysTrue),
            source_function: None,
            cells_per_resume: DEFAULT_CELLS_PER_RESUME,
            visitor: None,
            affected: 0,
        }
    }

    /// Sets how many passes to make.
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Sets the transform composed in once more per repetition.
    pub fn with_transform(mut self, transform: AffineTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Only copies source positions passing `mask`.
    pub fn with_source_mask(mut self, mask: SharedMask) -> Self {
        self.source_mask = mask;
        self
    }

    /// Also applies `function` to every copied source position, after the copy.
    pub fn with_source_function(mut self, function: SharedFunction) -> Self {
        self.source_function = Some(function);
        self
    }

    /// Caps the positions one pass visits per inner step.
    pub fn with_cells_per_resume(mut self, cells: usize) -> Self {
        self.cells_per_resume = cells.max(1);
        self
    }

    /// Passes not started yet.
    pub fn repetitions_left(&self) -> usize {
        self.repetitions
    }

    fn start_pass(&mut self) -> RegionVisitor {
        let transform = *self.current_transform.get_or_insert(self.transform);
        self.current_transform = Some(transform.combine(&self.transform));

        let copy: SharedFunction = Arc::new(ExtentBlockCopy::new(
            self.source.clone(),
            self.from,
            self.destination.clone(),
            self.to,
            transform,
        ));
        let filtered: SharedFunction = Arc::new(RegionMaskingFilter::new(self.source_mask.clone(), copy));
        let function = match &self.source_function {
            Some(extra) => Arc::new(CombinedRegionFunction::new(vec![filtered, extra.clone()])) as SharedFunction,
            None => filtered,
        };
        RegionVisitor::new(self.region.as_ref(), function).with_cells_per_resume(self.cells_per_resume)
    }
}

impl Operation for ForwardExtentCopy {
    fn resume(&mut self, run: &dyn RunContext) -> Result<Step, OperationError> {
        let mut visitor = match self.visitor.take() {
            Some(visitor) => visitor,
            None if self.repetitions == 0 => return Ok(Step::Done),
            None => {
                self.repetitions -= 1;
                self.start_pass()
            }
        };

        loop {
            if visitor.visit_batch()? {
                break;
            }
            if !run.should_continue() {
                self.visitor = Some(visitor);
                return Ok(Step::Continue);
            }
        }

        self.affected += visitor.affected_count();
        trace!(
            "Copy pass finished: {} affected, {} passes left",
            visitor.affected_count(),
            self.repetitions
        );
        if self.repetitions == 0 {
            Ok(Step::Done)
        } else {
            Ok(Step::Continue)
        }
    }

    fn cancel(&mut self) {
        self.visitor = None;
        self.repetitions = 0;
    }

    fn affected(&self) -> Option<usize> {
        Some(self.affected)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;
    use crate::core::MtResource;
    use crate::function::mask::BlockMask;
    use crate::function::BlockCounter;
    use crate::operation::{AffectedCounter, CountdownRunContext, UNCONDITIONAL};
    use crate::voxels::block_type::BlockType;
    use crate::voxels::extent::{share_extent, Extent, ExtentBuffer};
    use crate::voxels::region::CuboidRegion;

    fn filled_cube(size: i32, block: BlockType) -> (MtResource<ExtentBuffer>, Arc<dyn Region>) {
        let region = CuboidRegion::new(Point3::new(0, 0, 0), Point3::new(size - 1, size - 1, size - 1));
        let buffer = MtResource::new(ExtentBuffer::new());
        for position in region.positions() {
            buffer.get_mut().set_block(position, block).unwrap();
        }
        (buffer, Arc::new(region))
    }

    #[test]
    fn each_resume_finishes_one_repetition_when_unbounded() {
        let (source, region) = filled_cube(10, BlockType::DIRT);
        let destination = MtResource::new(ExtentBuffer::new());
        let mut copy = ForwardExtentCopy::new(
            share_extent(&source),
            region,
            share_extent(&destination),
            Point3::new(5, 0, 0),
        )
        .with_repetitions(2);

        assert!(matches!(copy.resume(&UNCONDITIONAL).unwrap(), Step::Continue));
        assert_eq!(copy.affected(), Some(1000));
        assert!(copy.resume(&UNCONDITIONAL).unwrap().is_done());
        assert_eq!(copy.affected(), Some(2000));
        assert_eq!(destination.get().get_block(Point3::new(14, 9, 9)), BlockType::DIRT);
    }

    #[test]
    fn repetitions_compose_the_transform() {
        let (source, region) = filled_cube(2, BlockType::WOOD);
        let destination = MtResource::new(ExtentBuffer::new());
        let mut copy = ForwardExtentCopy::new(
            share_extent(&source),
            region,
            share_extent(&destination),
            Point3::new(0, 0, 0),
        )
        .with_repetitions(3)
        .with_transform(AffineTransform::translation(Vector3::new(2, 0, 0)));

        while !copy.resume(&UNCONDITIONAL).unwrap().is_done() {}

        // Passes land at x offsets 2, 4 and 6.
        assert_eq!(destination.get().len(), 24);
        assert_eq!(destination.get().get_block(Point3::new(7, 1, 1)), BlockType::WOOD);
        assert_eq!(destination.get().get_block(Point3::new(1, 0, 0)), BlockType::AIR);
    }

    #[test]
    fn zero_repetitions_is_done_immediately() {
        let (source, region) = filled_cube(2, BlockType::WOOD);
        let destination = MtResource::new(ExtentBuffer::new());
        let mut copy = ForwardExtentCopy::new(share_extent(&source), region, share_extent(&destination), Point3::new(0, 0, 0))
            .with_repetitions(0);
        assert!(copy.resume(&UNCONDITIONAL).unwrap().is_done());
        assert!(destination.get().is_empty());
    }

    #[test]
    fn pass_resumes_where_the_budget_ran_out() {
        let (source, region) = filled_cube(4, BlockType::GRASS);
        let destination = MtResource::new(ExtentBuffer::new());
        let mut copy = ForwardExtentCopy::new(share_extent(&source), region, share_extent(&destination), Point3::new(0, 8, 0))
            .with_cells_per_resume(10);

        let mut resumes = 0;
        loop {
            resumes += 1;
            // One extra batch per resume: the first always runs, the poll then refuses.
            if copy.resume(&CountdownRunContext::new(0)).unwrap().is_done() {
                break;
            }
        }
        assert_eq!(resumes, 7);
        assert_eq!(copy.affected(), Some(64));
        assert_eq!(destination.get().len(), 64);
    }

    #[test]
    fn mask_and_source_function_shape_the_pass() {
        let (source, region) = filled_cube(2, BlockType::DIRT);
        source.get_mut().set_block(Point3::new(0, 0, 0), BlockType::WOOD).unwrap();
        let destination = MtResource::new(ExtentBuffer::new());
        let counter = BlockCounter::new();

        let mut copy = ForwardExtentCopy::new(
            share_extent(&source),
            region,
            share_extent(&destination),
            Point3::new(0, 5, 0),
        )
        .with_source_mask(Arc::new(BlockMask::new(share_extent(&source), vec![BlockType::WOOD])))
        .with_source_function(Arc::new(counter.clone()));

        assert!(copy.resume(&UNCONDITIONAL).unwrap().is_done());
        assert_eq!(copy.affected(), Some(1));
        assert_eq!(destination.get().len(), 1);
        // The source function sees every visited position, masked or not.
        assert_eq!(counter.affected(), 8);
    }
}
