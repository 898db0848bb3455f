//! # Edit Session Module
//!
//! An `EditSession` is the mutation buffer operations write through. Changes
//! are queued in an overlay on top of the world: reads see them immediately,
//! the world only sees them once the session is flushed. The executor
//! flushes a task's session after the slice in which the task finished.

use std::collections::HashMap;

use cgmath::Point3;
use log::debug;

use crate::core::MtResource;
use crate::error::OperationError;
use crate::operation::{Session, SharedSession};
use crate::voxels::block_type::BlockType;
use crate::voxels::extent::{Extent, SharedExtent};
use crate::voxels::world::World;

/// A buffer of pending block changes against a shared world.
pub struct EditSession {
    world: MtResource<World>,
    pending: HashMap<Point3<i32>, BlockType>,
    max_changes: Option<usize>,
    changes: usize,
    in_long_operation: bool,
}

impl EditSession {
    /// Creates a session over `world`.
    ///
    /// # Arguments
    /// * `world` - The world changes are committed to on flush
    /// * `max_changes` - Optional cap on the number of changes the session accepts
    pub fn new(world: MtResource<World>, max_changes: Option<usize>) -> Self {
        Self {
            world,
            pending: HashMap::new(),
            max_changes,
            changes: 0,
            in_long_operation: false,
        }
    }

    /// Number of changes accepted so far, flushed or not.
    pub fn change_count(&self) -> usize {
        self.changes
    }

    /// Number of changes waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether an executor is currently working through a long operation on
    /// this session.
    pub fn is_in_long_operation(&self) -> bool {
        self.in_long_operation
    }
}

impl Extent for EditSession {
    fn get_block(&self, position: Point3<i32>) -> BlockType {
        match self.pending.get(&position) {
            Some(block) => *block,
            None => self.world.get().get_block(position),
        }
    }

    fn set_block(&mut self, position: Point3<i32>, block: BlockType) -> Result<bool, OperationError> {
        if self.get_block(position) == block {
            return Ok(false);
        }
        if let Some(limit) = self.max_changes {
            if self.changes >= limit {
                return Err(OperationError::MaxChangesExceeded { limit });
            }
        }
        self.pending.insert(position, block);
        self.changes += 1;
        Ok(true)
    }
}

impl Session for EditSession {
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut world = self.world.get_mut();
        let mut committed = 0;
        for (position, block) in self.pending.drain() {
            // The world never refuses a write; limits live in the session.
            if let Ok(true) = world.set_block(position, block) {
                committed += 1;
            }
        }
        debug!("Flushed {} block changes to the world", committed);
    }

    fn set_in_long_operation(&mut self, in_long_operation: bool) {
        self.in_long_operation = in_long_operation;
    }
}

impl MtResource<EditSession> {
    /// This session seen as an extent operations can read and write.
    pub fn as_extent(&self) -> SharedExtent {
        MtResource::<dyn Extent>::from_shared(self.resource.clone())
    }

    /// This session seen as the mutation buffer of a submitted task.
    pub fn as_session(&self) -> SharedSession {
        MtResource::<dyn Session>::from_shared(self.resource.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(limit: Option<usize>) -> (MtResource<World>, EditSession) {
        let world = MtResource::new(World::new());
        let session = EditSession::new(world.clone(), limit);
        (world, session)
    }

    #[test]
    fn changes_are_visible_before_flush_but_committed_on_flush() {
        let (world, mut session) = session(None);
        let at = Point3::new(1, 2, 3);
        assert!(session.set_block(at, BlockType::WOOD).unwrap());
        assert_eq!(session.get_block(at), BlockType::WOOD);
        assert_eq!(world.get().get_block(at), BlockType::AIR);

        session.flush();
        assert_eq!(world.get().get_block(at), BlockType::WOOD);
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn change_limit_raises_a_domain_failure() {
        let (_world, mut session) = session(Some(2));
        session.set_block(Point3::new(0, 0, 0), BlockType::DIRT).unwrap();
        session.set_block(Point3::new(1, 0, 0), BlockType::DIRT).unwrap();
        // Rewriting an unchanged block is not counted.
        assert!(!session.set_block(Point3::new(1, 0, 0), BlockType::DIRT).unwrap());
        let err = session.set_block(Point3::new(2, 0, 0), BlockType::DIRT).unwrap_err();
        assert_eq!(err, OperationError::MaxChangesExceeded { limit: 2 });
    }
}
