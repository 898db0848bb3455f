use std::sync::Arc;

use cgmath::{Point3, Vector3};
use proptest::prelude::*;
use voxel_operations::core::MtResource;
use voxel_operations::function::factory;
use voxel_operations::function::pattern::RandomPattern;
use voxel_operations::operation::complete::complete;
use voxel_operations::operation::{CountdownRunContext, Operation, OperationExecutorService, Session};
use voxel_operations::voxels::block_type::BlockType;
use voxel_operations::voxels::edit_session::EditSession;
use voxel_operations::voxels::extent::Extent;
use voxel_operations::voxels::region::{CuboidRegion, Region};
use voxel_operations::voxels::world::World;

struct Scene {
    world: MtResource<World>,
    session: MtResource<EditSession>,
}

impl Scene {
    fn new() -> Self {
        let world = MtResource::new(World::new());
        let session = MtResource::new(EditSession::new(world.clone(), None));
        Self { world, session }
    }

    /// Fills a box with seeded random blocks, then stacks it twice upwards.
    fn edit(&self, size: i32, seed: u64, cells: usize) -> (CuboidRegion, Vec<Box<dyn Operation>>) {
        let region = CuboidRegion::new(Point3::new(0, 0, 0), Point3::new(size - 1, size - 1, size - 1));
        let fill = factory::set_blocks(self.session.as_extent(), &region, Arc::new(RandomPattern::with_seed(seed)))
            .with_cells_per_resume(cells);
        let stack = factory::stack_region(self.session.as_extent(), Arc::new(region), 2, Vector3::new(0, 1, 0))
            .with_cells_per_resume(cells);
        (region, vec![Box::new(fill), Box::new(stack)])
    }

    fn snapshot(&self, region: &CuboidRegion) -> Vec<BlockType> {
        let height = region.dimensions().y * 2;
        let tall = CuboidRegion::new(region.minimum_point(), region.maximum_point() + Vector3::new(0, height, 0));
        let world = self.world.get();
        tall.positions().map(|position| world.get_block(position)).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sliced_execution_matches_unconditional_completion(
        size in 1i32..6,
        seed in any::<u64>(),
        cells in 1usize..40,
        budgets in proptest::collection::vec(2usize..12, 1..8),
    ) {
        let reference = Scene::new();
        let (region, operations) = reference.edit(size, seed, cells);
        for operation in operations {
            complete(operation).unwrap();
        }
        reference.session.get_mut().flush();

        let sliced = Scene::new();
        let (_, operations) = sliced.edit(size, seed, cells);
        let executor = OperationExecutorService::default();
        let futures: Vec<_> = operations
            .into_iter()
            .map(|operation| executor.submit(operation, sliced.session.as_session()).unwrap())
            .collect();

        let mut heartbeats = 0;
        while futures.iter().any(|future| !future.is_done()) {
            let budget = budgets[heartbeats % budgets.len()];
            executor.heartbeat(&CountdownRunContext::new(budget));
            heartbeats += 1;
            prop_assert!(heartbeats < 100_000);
        }

        prop_assert!(futures.iter().all(|future| future.is_success()));
        prop_assert_eq!(reference.snapshot(&region), sliced.snapshot(&region));
    }

    #[test]
    fn same_budgets_take_the_same_number_of_heartbeats(
        size in 1i32..5,
        cells in 1usize..20,
        budget in 2usize..10,
    ) {
        let heartbeats_needed = || {
            let scene = Scene::new();
            let (_, operations) = scene.edit(size, 1, cells);
            let executor = OperationExecutorService::default();
            let futures: Vec<_> = operations
                .into_iter()
                .map(|operation| executor.submit(operation, scene.session.as_session()).unwrap())
                .collect();
            let mut heartbeats = 0usize;
            while futures.iter().any(|future| !future.is_done()) {
                executor.heartbeat(&CountdownRunContext::new(budget));
                heartbeats += 1;
            }
            heartbeats
        };
        prop_assert_eq!(heartbeats_needed(), heartbeats_needed());
    }
}
