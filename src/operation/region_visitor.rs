//! # Region Visitor
//!
//! Applies a region function to every position of a region, a capped batch of
//! positions per resumption.

use std::iter::Peekable;
use std::sync::Arc;

use crate::error::OperationError;
use crate::function::{RegionFunction, SharedFunction};
use crate::operation::{AffectedCounter, Operation, RunContext, Step};
use crate::voxels::region::{PositionIter, Region};

/// Default number of positions visited per resumption.
pub const DEFAULT_CELLS_PER_RESUME: usize = 4096;

/// Visits a region position by position.
pub struct RegionVisitor {
    positions: Peekable<PositionIter>,
    function: SharedFunction,
    affected: usize,
    cells_per_resume: usize,
}

impl RegionVisitor {
    /// Creates a visitor over every position of `region`.
    ///
    /// # Arguments
    /// * `region` - The region to walk; its iteration order is kept
    /// * `function` - Applied once per position
    pub fn new(region: &dyn Region, function: SharedFunction) -> Self {
        Self {
            positions: region.positions().peekable(),
            function,
            affected: 0,
            cells_per_resume: DEFAULT_CELLS_PER_RESUME,
        }
    }

    /// Caps the positions visited per resumption. A cap of zero is treated as one.
    pub fn with_cells_per_resume(mut self, cells: usize) -> Self {
        self.cells_per_resume = cells.max(1);
        self
    }

    /// Positions the function reported as affected so far.
    pub fn affected_count(&self) -> usize {
        self.affected
    }

    /// Visits the next batch of positions.
    ///
    /// # Returns
    /// `true` once every position has been visited.
    pub fn visit_batch(&mut self) -> Result<bool, OperationError> {
        for _ in 0..self.cells_per_resume {
            let Some(position) = self.positions.next() else {
                return Ok(true);
            };
            if self.function.apply(position)? {
                self.affected += 1;
            }
        }
        Ok(self.positions.peek().is_none())
    }
}

impl Operation for RegionVisitor {
    fn resume(&mut self, _run: &dyn RunContext) -> Result<Step, OperationError> {
        if self.visit_batch()? {
            Ok(Step::Done)
        } else {
            Ok(Step::Continue)
        }
    }

    fn cancel(&mut self) {
        self.positions = (Box::new(std::iter::empty()) as PositionIter).peekable();
    }

    fn affected(&self) -> Option<usize> {
        Some(self.affected)
    }
}

impl AffectedCounter for RegionVisitor {
    fn affected(&self) -> usize {
        self.affected
    }
}

/// Shorthand for a visitor over an owned function.
pub fn visit(region: &dyn Region, function: impl RegionFunction + 'static) -> RegionVisitor {
    RegionVisitor::new(region, Arc::new(function))
}
