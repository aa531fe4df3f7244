//! Block LU decomposition of `Q` and the associated `logdetQ`/`solveQ`.
//! Three code paths: `Nt=1`, `Nt=2`, `Nt>=3`.

use num_complex::Complex;

use crate::error::CoreError;
use crate::fermion_matrix::HubbardFermiMatrix;
use crate::kernel::Hopping;
use crate::numeric::{logdet, to_first_log_branch};
use crate::types::{CDMat, CDVec};

/// Block lists sized by `Nt`: `dinv[0..Nt-1]` holds `D_i^-1`;
/// `u`/`l` are sized `Nt-1`; `v`/`h` are sized `Nt-2` (empty for `Nt<3`).
pub struct Qlu {
    pub dinv: Vec<CDMat>,
    pub u: Vec<CDMat>,
    pub l: Vec<CDMat>,
    pub v: Vec<CDMat>,
    pub h: Vec<CDMat>,
    nx: usize,
}

impl Qlu {
    /// `Nt`, derived from the block count.
    pub fn nt(&self) -> usize {
        self.dinv.len()
    }

    pub fn nx(&self) -> usize {
        self.nx
    }
}

fn invert(m: &CDMat) -> Result<CDMat, CoreError> {
    m.clone().try_inverse().ok_or(CoreError::SingularMatrix)
}

/// Builds the block LU decomposition of `Q(phi)` without ever assembling
/// the full sparse `Q`.
pub fn decompose<H: Hopping>(hfm: &HubbardFermiMatrix<H>, phi: &CDVec) -> Result<Qlu, CoreError> {
    let nx = hfm.nx();
    if phi.len() % nx != 0 {
        return Err(CoreError::IncompatiblePhiLength { len: phi.len(), nx });
    }
    let nt = phi.len() / nx;
    if nt == 0 {
        return Err(CoreError::NtTooSmallForQlu { nt });
    }

    let p = hfm.p_dense().map(|x| Complex::new(x, 0.0));

    if nt == 1 {
        let tp0 = hfm.tplus_dense(0, phi, nt);
        let tm0 = hfm.tminus_dense(0, phi, nt);
        let d0 = &p + &tp0 + &tm0;
        let dinv0 = invert(&d0)?;
        return Ok(Qlu {
            dinv: vec![dinv0],
            u: vec![],
            l: vec![],
            v: vec![],
            h: vec![],
            nx,
        });
    }

    if nt == 2 {
        let dinv0 = invert(&p)?;
        let tp0 = hfm.tplus_dense(0, phi, nt);
        let tm0 = hfm.tminus_dense(0, phi, nt);
        let u0 = &tp0 + &tm0;
        let tp1 = hfm.tplus_dense(1, phi, nt);
        let tm1 = hfm.tminus_dense(1, phi, nt);
        let l0 = (&tp1 + &tm1) * &dinv0;
        let d1 = &p - &l0 * &u0;
        let dinv1 = invert(&d1)?;
        return Ok(Qlu {
            dinv: vec![dinv0, dinv1],
            u: vec![u0],
            l: vec![l0],
            v: vec![],
            h: vec![],
            nx,
        });
    }

    // Nt >= 3
    let mut dinv = vec![CDMat::zeros(nx, nx); nt];
    let mut u = vec![CDMat::zeros(nx, nx); nt - 1];
    let mut l = vec![CDMat::zeros(nx, nx); nt - 1];
    let mut v = vec![CDMat::zeros(nx, nx); nt - 2];
    let mut h = vec![CDMat::zeros(nx, nx); nt - 2];

    dinv[0] = invert(&p)?;
    u[0] = hfm.tminus_dense(0, phi, nt);
    l[0] = hfm.tplus_dense(1, phi, nt) * &dinv[0];
    v[0] = hfm.tplus_dense(0, phi, nt);
    h[0] = hfm.tminus_dense(nt - 1, phi, nt) * &dinv[0];

    for i in 1..=(nt - 3) {
        dinv[i] = invert(&(&p - &l[i - 1] * &u[i - 1]))?;
        l[i] = hfm.tplus_dense(i + 1, phi, nt) * &dinv[i];
        h[i] = -(&h[i - 1] * &u[i - 1]) * &dinv[i];
        v[i] = -(&l[i - 1] * &v[i - 1]);
        u[i] = hfm.tminus_dense(i, phi, nt);
    }

    dinv[nt - 2] = invert(&(&p - &l[nt - 3] * &u[nt - 3]))?;
    u[nt - 2] = hfm.tminus_dense(nt - 2, phi, nt) - &l[nt - 3] * &v[nt - 3];
    l[nt - 2] = (hfm.tplus_dense(nt - 1, phi, nt) - &h[nt - 3] * &u[nt - 3]) * &dinv[nt - 2];

    let mut sum_hv = CDMat::zeros(nx, nx);
    for j in 0..=(nt - 3) {
        sum_hv += &h[j] * &v[j];
    }
    dinv[nt - 1] = invert(&(&p - &l[nt - 2] * &u[nt - 2] - sum_hv))?;

    Ok(Qlu {
        dinv,
        u,
        l,
        v,
        h,
        nx,
    })
}

/// `logdetQ(lu) = firstLogBranch(-sum_i logdet(dinv_i))`.
pub fn logdet_q(lu: &Qlu) -> Result<Complex<f64>, CoreError> {
    let mut sum = Complex::new(0.0, 0.0);
    for d in &lu.dinv {
        sum += logdet(d)?;
    }
    Ok(to_first_log_branch(-sum))
}

/// Reconstructs `Q` from the block factors, for validation: assembles the
/// block-lower `L` and block-upper `U` matrices explicitly, then multiplies
/// them densely.
pub fn reconstruct(lu: &Qlu) -> Result<CDMat, CoreError> {
    let nt = lu.nt();
    if nt == 0 {
        return Err(CoreError::NtTooSmallForQlu { nt });
    }
    let nx = lu.nx();
    let n = nt * nx;

    let mut l_full = CDMat::identity(n, n);
    let mut u_full = CDMat::zeros(n, n);

    for i in 0..nt {
        let d_i = invert(&lu.dinv[i])?;
        u_full.view_mut((i * nx, i * nx), (nx, nx)).copy_from(&d_i);
    }
    for i in 0..nt.saturating_sub(1) {
        l_full
            .view_mut(((i + 1) * nx, i * nx), (nx, nx))
            .copy_from(&lu.l[i]);
        u_full
            .view_mut((i * nx, (i + 1) * nx), (nx, nx))
            .copy_from(&lu.u[i]);
    }
    for j in 0..nt.saturating_sub(2) {
        l_full
            .view_mut(((nt - 1) * nx, j * nx), (nx, nx))
            .copy_from(&lu.h[j]);
        u_full
            .view_mut((j * nx, (nt - 1) * nx), (nx, nx))
            .copy_from(&lu.v[j]);
    }

    Ok(&l_full * &u_full)
}

/// Two block sweeps solving `Q(phi) * x = rhs` from the factors.
pub fn solve_q(lu: &Qlu, rhs: &CDVec) -> Result<CDVec, CoreError> {
    let nt = lu.nt();
    let nx = lu.nx();
    if rhs.len() != nt * nx {
        return Err(CoreError::IncompatiblePhiLength {
            len: rhs.len(),
            nx,
        });
    }

    let mut y: Vec<CDVec> = vec![CDVec::zeros(nx); nt];
    y[0] = rhs.rows(0, nx).into_owned();
    if nt > 1 {
        for i in 1..(nt - 1) {
            y[i] = rhs.rows(i * nx, nx).into_owned() - &lu.l[i - 1] * &y[i - 1];
        }
        let mut acc = rhs.rows((nt - 1) * nx, nx).into_owned() - &lu.l[nt - 2] * &y[nt - 2];
        if nt >= 3 {
            for j in 0..=(nt - 3) {
                acc -= &lu.h[j] * &y[j];
            }
        }
        y[nt - 1] = acc;
    }

    let mut x: Vec<CDVec> = vec![CDVec::zeros(nx); nt];
    x[nt - 1] = &lu.dinv[nt - 1] * &y[nt - 1];
    if nt > 1 {
        x[nt - 2] = &lu.dinv[nt - 2] * (&y[nt - 2] - &lu.u[nt - 2] * &x[nt - 1]);
        if nt >= 3 {
            for i in (0..=(nt - 3)).rev() {
                x[i] = &lu.dinv[i] * (&y[i] - &lu.u[i] * &x[i + 1] - &lu.v[i] * &x[nt - 1]);
            }
        }
    }

    let mut out = CDVec::zeros(nt * nx);
    for i in 0..nt {
        out.rows_mut(i * nx, nx).copy_from(&x[i]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Dia;
    use nalgebra_sparse::{CooMatrix, CsrMatrix};

    fn two_site_chain() -> crate::types::DSMat {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 1, 1.0);
        coo.push(1, 0, 1.0);
        CsrMatrix::from(&coo)
    }

    #[test]
    fn reconstruct_matches_q_for_small_nt() {
        for &nt in &[2usize, 3, 4, 5] {
            let kappa = two_site_chain();
            let hfm = HubbardFermiMatrix::<Dia>::new(kappa, 0.0, 1.0).unwrap();
            let nx = hfm.nx();
            let phi = CDVec::from_iterator(
                nx * nt,
                (0..nx * nt).map(|k| Complex::new(0.1 * k as f64, -0.05 * k as f64)),
            );
            let lu = decompose(&hfm, &phi).unwrap();
            let reconstructed = reconstruct(&lu).unwrap();
            let q_sparse = hfm.q(&phi).unwrap();
            let q_dense = crate::sparse::csr_complex_to_dense(&q_sparse);
            for r in 0..nx * nt {
                for c in 0..nx * nt {
                    assert!(
                        (reconstructed[(r, c)] - q_dense[(r, c)]).norm() < 1e-8,
                        "mismatch at nt={nt}, ({r},{c})"
                    );
                }
            }
        }
    }

    #[test]
    fn solve_q_inverts_q_apply() {
        let kappa = two_site_chain();
        let hfm = HubbardFermiMatrix::<Dia>::new(kappa, 0.0, 1.0).unwrap();
        let nx = hfm.nx();
        let nt = 4;
        let phi = CDVec::from_iterator(
            nx * nt,
            (0..nx * nt).map(|k| Complex::new(0.05 * k as f64, 0.02 * k as f64)),
        );
        let lu = decompose(&hfm, &phi).unwrap();
        let q_sparse = hfm.q(&phi).unwrap();
        let q_dense = crate::sparse::csr_complex_to_dense(&q_sparse);

        let rhs = CDVec::from_iterator(
            nx * nt,
            (0..nx * nt).map(|k| Complex::new(1.0 + k as f64, -0.5 * k as f64)),
        );
        let x = solve_q(&lu, &rhs).unwrap();
        let check = &q_dense * &x;
        for i in 0..nx * nt {
            assert!((check[i] - rhs[i]).norm() < 1e-8);
        }
    }
}
