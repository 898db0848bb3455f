#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Operations
//!
//! A resumable, time-sliced execution engine for bulk voxel edits.
//!
//! Large edits (filling, copying, stacking or moving millions of blocks) are
//! expressed as operations that do a bounded slice of work per resumption.
//! An executor advances queued operations only inside a heartbeat the host
//! loop grants it, under a wall-clock or countdown budget, so the host never
//! stalls a tick no matter how large the edit.
//!
//! ## Key Modules
//!
//! * `operation` - The operation contract, composite operations, futures and the executor
//! * `scheduling` - Host platforms and the runtime that keeps the heartbeat armed
//! * `function` - Per-cell region functions, masks, patterns and the operation factory
//! * `voxels` - Blocks, chunks, the world, edit sessions, regions and transforms
//! * `core` - Shared-state handles and engine configuration
//! * `error` - Error types
//!
//! ## Architecture
//!
//! The engine separates:
//! * What an edit does (region functions, masks, patterns)
//! * How it is cut into slices (operations and their `resume` state machines)
//! * When slices run (executor heartbeats scheduled by a host platform)
//!
//! ## Usage
//!
//! ```rust,no_run
//! fn main() {
//!     voxel_operations::run();
//! }
//! ```

use std::sync::Arc;

use cgmath::{Point3, Vector3};
use log::{error, info};

pub mod core;
pub mod error;
pub mod function;
pub mod operation;
pub mod scheduling;
pub mod voxels;

use crate::core::{EngineConfig, MtResource};
use crate::function::factory;
use crate::function::mask::ExistingBlockMask;
use crate::function::pattern::RandomPattern;
use crate::operation::complete::complete;
use crate::operation::{Operation, OperationFuture};
use crate::scheduling::{OperationRuntime, TickScheduler};
use crate::voxels::edit_session::EditSession;
use crate::voxels::extent::share_extent;
use crate::voxels::region::CuboidRegion;
use crate::voxels::world::World;

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_ENV: &str = "VOXEL_OPERATIONS_CONFIG";

/// Ticks the demo runs at most before giving up.
const DEMO_TICK_LIMIT: u64 = 10_000;

/// Initializes logging to stdout, filtered by `RUST_LOG`.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG");
    // A second initialization (tests, embedding hosts) keeps the first logger.
    let _ = log_builder.try_init();
}

/// Loads the configuration named by [`CONFIG_ENV`], falling back to defaults.
pub fn load_config() -> EngineConfig {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => EngineConfig::load(&path).unwrap_or_else(|err| {
            error!("Ignoring configuration {}: {}", path, err);
            EngineConfig::default()
        }),
        Err(_) => EngineConfig::default(),
    }
}

/// Runs a headless demo: a tick loop filling, stacking and counting a patch
/// of the world through the runtime, logging as it goes.
pub fn run() {
    init_logging();
    info!("Logger initialized");

    let config = load_config();
    let world = MtResource::new(World::new());
    let session = MtResource::new(EditSession::new(world.clone(), config.max_changes));
    let scheduler = Arc::new(TickScheduler::new());
    let runtime = OperationRuntime::new(scheduler.clone(), config.clone());

    let base = CuboidRegion::new(Point3::new(0, 0, 0), Point3::new(31, 15, 31));
    let fill = factory::set_blocks(session.as_extent(), &base, Arc::new(RandomPattern::with_seed(7)))
        .with_cells_per_resume(config.cells_per_resume);
    let stack = factory::stack_region(session.as_extent(), Arc::new(base), 3, Vector3::new(0, 1, 0))
        .with_cells_per_resume(config.cells_per_resume);

    let operations: Vec<Box<dyn Operation>> = vec![Box::new(fill), Box::new(stack)];
    let mut futures: Vec<OperationFuture> = Vec::new();
    for operation in operations {
        match runtime.complete_slowly(session.as_session(), operation) {
            Ok(future) => futures.push(future),
            Err(err) => error!("Could not submit operation: {}", err),
        }
    }

    while futures.iter().any(|future| !future.is_done()) && scheduler.current_tick() < DEMO_TICK_LIMIT {
        scheduler.tick();
    }
    for future in &futures {
        match future.try_get() {
            Some(Ok(outcome)) => info!(
                "{} affected {:?} blocks in {:?}",
                future.operation_name(),
                outcome.affected,
                outcome.elapsed
            ),
            Some(Err(err)) => error!("{}", err),
            None => error!("{} did not finish within {} ticks", future.operation_name(), DEMO_TICK_LIMIT),
        }
    }

    let everything = CuboidRegion::new(Point3::new(0, 0, 0), Point3::new(31, 63, 31));
    let mask = Arc::new(ExistingBlockMask::new(share_extent(&world)));
    match factory::count_blocks(&everything, mask).map(|count| complete(Box::new(count))) {
        Ok(Ok(count)) => info!("World holds {:?} solid blocks after {} ticks", count, scheduler.current_tick()),
        Ok(Err(err)) => error!("Counting failed: {}", err),
        Err(err) => error!("{}", err),
    }

    runtime.shutdown();
}
