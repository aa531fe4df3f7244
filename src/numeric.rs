//! Numerical utilities: first-branch complex log, `logdet`/`ilogdet`, and the
//! spacetime indexing helpers used throughout the rest of the crate.

use std::f64::consts::PI;

use nalgebra::linalg::LU;
use num_complex::Complex;

use crate::error::CoreError;
use crate::types::{CDMat, CDVec};

/// Projects `Im(z)` into `(-PI, PI]`, leaving `Re(z)` untouched.
pub fn to_first_log_branch(z: Complex<f64>) -> Complex<f64> {
    let im = (z.im + PI).rem_euclid(2.0 * PI) - PI;
    Complex::new(z.re, im)
}

/// `log det(a)` via LU with partial pivoting, projected to the first branch.
pub fn logdet(a: &CDMat) -> Result<Complex<f64>, CoreError> {
    let mut scratch = a.clone();
    ilogdet(&mut scratch)
}

/// In-place variant of [`logdet`]: on return, `a` holds the packed LU
/// factorisation (strict lower triangle is `L`, diagonal and upper triangle
/// is `U`).
pub fn ilogdet(a: &mut CDMat) -> Result<Complex<f64>, CoreError> {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols(), "logdet requires a square matrix");

    let lu = LU::new(a.clone());
    let u = lu.u();

    let mut sum = Complex::new(0.0, 0.0);
    for i in 0..n {
        let uii = u[(i, i)];
        if uii.norm() == 0.0 {
            return Err(CoreError::SingularMatrix);
        }
        sum += uii.ln();
    }

    let det_p: f64 = lu.p().determinant();
    if det_p < 0.0 {
        sum += Complex::new(0.0, PI);
    }

    let l = lu.l();
    let mut packed = u.clone();
    for i in 0..n {
        for j in 0..i {
            packed[(i, j)] = l[(i, j)];
        }
    }
    *a = packed;

    Ok(to_first_log_branch(sum))
}

/// `i mod N`, always in `0..N` (periodicity helper; `i` may be negative to
/// express "one step before slice 0").
pub fn loop_idx(i: isize, n: usize) -> usize {
    i.rem_euclid(n as isize) as usize
}

/// Flattens a spacetime coordinate `(i, t)` with `i` spatial, `t` temporal,
/// using the `i*Nt + t` convention.
pub fn spacetime_coord(i: usize, t: usize, nt: usize) -> usize {
    i * nt + t
}

/// Extracts the length-`Nx` spatial slice of `v` at time `t`.
pub fn spacevec(v: &CDVec, t: usize, nx: usize, nt: usize) -> CDVec {
    CDVec::from_iterator(nx, (0..nx).map(|i| v[spacetime_coord(i, t, nt)]))
}

/// Extracts the `Nx x Nx` block at block-row `t1`, block-column `t2` of a
/// dense `(Nx*Nt) x (Nx*Nt)` matrix.
pub fn spacemat(m: &CDMat, t1: usize, t2: usize, nx: usize, nt: usize) -> CDMat {
    CDMat::from_fn(nx, nx, |i, j| {
        m[(spacetime_coord(i, t1, nt), spacetime_coord(j, t2, nt))]
    })
}
