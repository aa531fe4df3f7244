//! A narrow seam around the dense `Nx x Nx` matmul/LU/solve operations
//! inside `force_direct_single_part`, so a result-identical GPU
//! implementation can be swapped in without touching the algorithm layer.
//!
//! Only [`CpuBackend`] is implemented here; the `gpu` feature is reserved
//! for an out-of-tree implementation.

use crate::error::CoreError;
use crate::types::CDMat;

/// Dense complex matrix operations used by the hot paths of the force
/// evaluator.
pub trait DenseBackend: Send + Sync {
    fn matmul(&self, a: &CDMat, b: &CDMat) -> CDMat;
    fn lu_solve(&self, a: &CDMat, rhs: &CDMat) -> Result<CDMat, CoreError>;
    fn try_inverse(&self, a: &CDMat) -> Result<CDMat, CoreError>;
}

/// Reference implementation built on `nalgebra`'s dense LU.
#[derive(Default, Clone, Copy, Debug)]
pub struct CpuBackend;

impl DenseBackend for CpuBackend {
    fn matmul(&self, a: &CDMat, b: &CDMat) -> CDMat {
        a * b
    }

    fn lu_solve(&self, a: &CDMat, rhs: &CDMat) -> Result<CDMat, CoreError> {
        let lu = nalgebra::linalg::LU::new(a.clone());
        lu.solve(rhs).ok_or(CoreError::SingularMatrix)
    }

    fn try_inverse(&self, a: &CDMat) -> Result<CDMat, CoreError> {
        a.clone().try_inverse().ok_or(CoreError::SingularMatrix)
    }
}
