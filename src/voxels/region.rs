//! # Region Module
//!
//! Regions describe which positions an operation visits. Visiting is
//! resumable: [`Region::positions`] hands out an owned iterator, so a visitor
//! can stop after any number of cells and pick up again on its next resume.

use cgmath::{Point3, Vector3};

/// An owned iterator over region positions.
pub type PositionIter = Box<dyn Iterator<Item = Point3<i32>> + Send + Sync>;

/// A finite set of block positions.
pub trait Region: Send + Sync {
    /// The lowest corner of the region's bounding box.
    fn minimum_point(&self) -> Point3<i32>;

    /// The highest corner of the region's bounding box.
    fn maximum_point(&self) -> Point3<i32>;

    /// Whether the region contains a position.
    fn contains(&self, position: Point3<i32>) -> bool;

    /// Number of positions in the region.
    fn volume(&self) -> usize;

    /// Iterates every position of the region exactly once.
    fn positions(&self) -> PositionIter;

    /// Size of the bounding box along each axis.
    fn dimensions(&self) -> Vector3<i32> {
        let min = self.minimum_point();
        let max = self.maximum_point();
        Vector3::new(max.x - min.x + 1, max.y - min.y + 1, max.z - min.z + 1)
    }
}

/// An axis-aligned box of positions, both corners inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CuboidRegion {
    min: Point3<i32>,
    max: Point3<i32>,
}

impl CuboidRegion {
    /// Creates a cuboid spanning two corners, in any order.
    pub fn new(a: Point3<i32>, b: Point3<i32>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// The same cuboid moved by `offset`.
    pub fn shifted(&self, offset: Vector3<i32>) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

impl Region for CuboidRegion {
    fn minimum_point(&self) -> Point3<i32> {
        self.min
    }

    fn maximum_point(&self) -> Point3<i32> {
        self.max
    }

    fn contains(&self, p: Point3<i32>) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }

    fn volume(&self) -> usize {
        let d = self.dimensions();
        d.x as usize * d.y as usize * d.z as usize
    }

    fn positions(&self) -> PositionIter {
        Box::new(CuboidIter {
            region: *self,
            next: 0,
            total: self.volume(),
        })
    }
}

/// Walks a cuboid x first, then z, then y.
struct CuboidIter {
    region: CuboidRegion,
    next: usize,
    total: usize,
}

impl Iterator for CuboidIter {
    type Item = Point3<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let d = self.region.dimensions();
        let (width, depth) = (d.x as usize, d.z as usize);
        let index = self.next;
        self.next += 1;
        let x = index % width;
        let z = (index / width) % depth;
        let y = index / (width * depth);
        Some(self.region.min + Vector3::new(x as i32, y as i32, z as i32))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

/// An explicit list of positions.
#[derive(Clone, Debug, Default)]
pub struct PointSetRegion {
    points: Vec<Point3<i32>>,
}

impl PointSetRegion {
    /// Creates a region from positions; duplicates are kept as given.
    pub fn new(points: Vec<Point3<i32>>) -> Self {
        Self { points }
    }
}

impl Region for PointSetRegion {
    fn minimum_point(&self) -> Point3<i32> {
        self.points
            .iter()
            .copied()
            .reduce(|a, b| Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)))
            .unwrap_or(Point3::new(0, 0, 0))
    }

    fn maximum_point(&self) -> Point3<i32> {
        self.points
            .iter()
            .copied()
            .reduce(|a, b| Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)))
            .unwrap_or(Point3::new(0, 0, 0))
    }

    fn contains(&self, position: Point3<i32>) -> bool {
        self.points.contains(&position)
    }

    fn volume(&self) -> usize {
        self.points.len()
    }

    fn positions(&self) -> PositionIter {
        Box::new(self.points.clone().into_iter())
    }
}
