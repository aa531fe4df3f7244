//! Small conversion/assembly helpers bridging the sparse boundary type
//! (`nalgebra_sparse::CsrMatrix`) and the dense `Nx x Nx` block algebra the
//! rest of the core is built on.

use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num_complex::Complex;

use crate::types::{CDMat, DMat};

/// Dense copy of a real sparse matrix.
pub fn csr_to_dense(m: &CsrMatrix<f64>) -> DMat {
    let mut out = DMat::zeros(m.nrows(), m.ncols());
    for (r, c, v) in m.triplet_iter() {
        out[(r, c)] += *v;
    }
    out
}

/// Dense copy of a complex sparse matrix.
pub fn csr_complex_to_dense(m: &CsrMatrix<Complex<f64>>) -> CDMat {
    let mut out = CDMat::zeros(m.nrows(), m.ncols());
    for (r, c, v) in m.triplet_iter() {
        out[(r, c)] += *v;
    }
    out
}

/// Scales every entry of a real sparse matrix by `factor`.
pub fn scale_csr(m: &CsrMatrix<f64>, factor: f64) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(m.nrows(), m.ncols());
    for (r, c, v) in m.triplet_iter() {
        coo.push(r, c, *v * factor);
    }
    CsrMatrix::from(&coo)
}

/// Writes every nonzero entry of a dense complex block into `coo` at the
/// given block offset (used to assemble the block-sparse `M`/`Q` matrices).
pub(crate) fn push_dense_block(
    coo: &mut CooMatrix<Complex<f64>>,
    block: &CDMat,
    row_off: usize,
    col_off: usize,
) {
    let zero = Complex::new(0.0, 0.0);
    for r in 0..block.nrows() {
        for c in 0..block.ncols() {
            let v = block[(r, c)];
            if v != zero {
                coo.push(row_off + r, col_off + c, v);
            }
        }
    }
}
