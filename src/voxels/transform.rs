//! # Transform Module
//!
//! Affine transforms applied to offsets inside a copied region. Transforms
//! are plain `cgmath` matrices, so stacking them is a matrix product.

use cgmath::{Deg, Matrix4, Point3, SquareMatrix, Transform as _, Vector3};

/// An affine transform over block offsets.
///
/// # Examples
///
/// ```
/// use cgmath::{Point3, Vector3};
/// use voxel_operations::voxels::transform::AffineTransform;
///
/// let step = AffineTransform::translation(Vector3::new(10, 0, 0));
/// let twice = step.combine(&step);
/// assert_eq!(twice.apply(Point3::new(1, 2, 3)), Point3::new(21, 2, 3));
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix4<f64>,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    /// The transform that leaves every position where it is.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// A pure translation.
    pub fn translation(offset: Vector3<i32>) -> Self {
        Self {
            matrix: Matrix4::from_translation(Vector3::new(
                offset.x as f64,
                offset.y as f64,
                offset.z as f64,
            )),
        }
    }

    /// A rotation around the vertical axis.
    pub fn rotation_y(degrees: f64) -> Self {
        Self {
            matrix: Matrix4::from_angle_y(Deg(degrees)),
        }
    }

    /// A uniform scale.
    pub fn scale(factor: f64) -> Self {
        Self {
            matrix: Matrix4::from_scale(factor),
        }
    }

    /// Returns a transform that first applies `other`, then `self`.
    pub fn combine(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Whether this transform is (numerically) the identity.
    pub fn is_identity(&self) -> bool {
        let identity: Matrix4<f64> = Matrix4::identity();
        let a: &[f64; 16] = self.matrix.as_ref();
        let b: &[f64; 16] = identity.as_ref();
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    /// Applies the transform to a block offset, rounding to the nearest cell.
    pub fn apply(&self, point: Point3<i32>) -> Point3<i32> {
        let p = self
            .matrix
            .transform_point(Point3::new(point.x as f64, point.y as f64, point.z as f64));
        Point3::new(p.x.round() as i32, p.y.round() as i32, p.z.round() as i32)
    }
}
