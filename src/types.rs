//! Semantic aliases for the scalar/tensor types used throughout the core:
//! `DVec`/`CDVec` are length-n contiguous vectors, `DMat`/`CDMat` are dense
//! matrices (nalgebra is column-major internally, which is transparent to
//! every caller here), `DSMat`/`CDSMat` are sparse matrices.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use num_complex::Complex;

/// Real length-n vector.
pub type DVec = DVector<f64>;
/// Complex length-n vector.
pub type CDVec = DVector<Complex<f64>>;
/// Real dense matrix.
pub type DMat = DMatrix<f64>;
/// Complex dense matrix.
pub type CDMat = DMatrix<Complex<f64>>;
/// Real sparse matrix.
pub type DSMat = CsrMatrix<f64>;
/// Complex sparse matrix.
pub type CDSMat = CsrMatrix<Complex<f64>>;
