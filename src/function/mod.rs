//! # Region Functions
//!
//! A region function is the per-cell step of a region visit: replace the
//! block, copy it somewhere else, count it. Functions compose (mask filters,
//! combinations) and are shared behind `Arc` so one function can be reused by
//! every repetition of a copy.
//!
//! ## Key Components
//! - `BlockReplace`: writes a pattern into an extent
//! - `ExtentBlockCopy`: copies a block, through a transform, into another extent
//! - `RegionMaskingFilter`: only runs its function where a mask passes
//! - `CombinedRegionFunction`: runs several functions in order
//! - `BlockCounter`: counts the positions it is applied to

pub mod factory;
pub mod mask;
pub mod pattern;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cgmath::{EuclideanSpace, Point3};

use crate::error::OperationError;
use crate::operation::AffectedCounter;
use crate::voxels::extent::SharedExtent;
use crate::voxels::transform::AffineTransform;
use mask::SharedMask;
use pattern::SharedPattern;

/// A per-position step of a region visit.
pub trait RegionFunction: Send + Sync {
    /// Applies the function at a position.
    ///
    /// # Returns
    /// `Ok(true)` if the position counts as affected.
    fn apply(&self, position: Point3<i32>) -> Result<bool, OperationError>;
}

/// Shared region function handle.
pub type SharedFunction = Arc<dyn RegionFunction>;

/// Replaces blocks with a pattern.
pub struct BlockReplace {
    extent: SharedExtent,
    pattern: SharedPattern,
}

impl BlockReplace {
    pub fn new(extent: SharedExtent, pattern: SharedPattern) -> Self {
        Self { extent, pattern }
    }
}

impl RegionFunction for BlockReplace {
    fn apply(&self, position: Point3<i32>) -> Result<bool, OperationError> {
        let block = self.pattern.apply(position);
        self.extent.get_mut().set_block(position, block)
    }
}

/// Copies blocks from a source extent into a destination extent.
///
/// A source position `p` lands at `to + transform(p - from)`.
pub struct ExtentBlockCopy {
    source: SharedExtent,
    from: Point3<i32>,
    destination: SharedExtent,
    to: Point3<i32>,
    transform: AffineTransform,
}

impl ExtentBlockCopy {
    /// # Arguments
    /// * `source` - The extent blocks are read from
    /// * `from` - The source origin offsets are measured from
    /// * `destination` - The extent blocks are written to
    /// * `to` - Where the source origin lands in the destination
    /// * `transform` - Applied to each offset before it is placed
    pub fn new(
        source: SharedExtent,
        from: Point3<i32>,
        destination: SharedExtent,
        to: Point3<i32>,
        transform: AffineTransform,
    ) -> Self {
        Self {
            source,
            from,
            destination,
            to,
            transform,
        }
    }
}

impl RegionFunction for ExtentBlockCopy {
    fn apply(&self, position: Point3<i32>) -> Result<bool, OperationError> {
        let block = self.source.get().get_block(position);
        let offset = Point3::from_vec(position - self.from);
        let target = self.to + self.transform.apply(offset).to_vec();
        self.destination.get_mut().set_block(target, block)?;
        // Every visited source cell counts, changed or not.
        Ok(true)
    }
}

/// Runs a function only where a mask passes.
pub struct RegionMaskingFilter {
    mask: SharedMask,
    function: SharedFunction,
}

impl RegionMaskingFilter {
    pub fn new(mask: SharedMask, function: SharedFunction) -> Self {
        Self { mask, function }
    }
}

impl RegionFunction for RegionMaskingFilter {
    fn apply(&self, position: Point3<i32>) -> Result<bool, OperationError> {
        if self.mask.test(position) {
            self.function.apply(position)
        } else {
            Ok(false)
        }
    }
}

/// Runs several functions in order; a position is affected if the first one affected it.
///
/// Only the first result counts, not whether any function changed the
/// position. A copy that clears its source as it goes therefore counts each
/// copied block once.
pub struct CombinedRegionFunction {
    functions: Vec<SharedFunction>,
}

impl CombinedRegionFunction {
    pub fn new(functions: Vec<SharedFunction>) -> Self {
        Self { functions }
    }
}

impl RegionFunction for CombinedRegionFunction {
    fn apply(&self, position: Point3<i32>) -> Result<bool, OperationError> {
        let mut affected = None;
        for function in &self.functions {
            let result = function.apply(position)?;
            affected.get_or_insert(result);
        }
        Ok(affected.unwrap_or(false))
    }
}

/// Counts the positions it is applied to. Clones share one count.
#[derive(Clone, Default)]
pub struct BlockCounter {
    count: Arc<AtomicUsize>,
}

impl BlockCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegionFunction for BlockCounter {
    fn apply(&self, _position: Point3<i32>) -> Result<bool, OperationError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }
}

impl AffectedCounter for BlockCounter {
    fn affected(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    fn identity(&self) -> *const () {
        Arc::as_ptr(&self.count) as *const ()
    }
}
