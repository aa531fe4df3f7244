//! `HubbardFermiMatrix<H>`: the species-dependent kernel K,
//! its lazily-cached inverse and log-determinant, the per-slice diagonal
//! `F`, the full sparse block matrix `M`, the Schur blocks `P`/`T+`/`T-`,
//! and the block-Schur matrix `Q`.

use std::marker::PhantomData;

use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num_complex::Complex;
use once_cell::sync::OnceCell;
use rayon::prelude::*;

use crate::error::CoreError;
use crate::kernel::{Hopping, Species};
use crate::numeric::{loop_idx, spacevec};
use crate::sparse::{csr_complex_to_dense, csr_to_dense, push_dense_block};
use crate::types::{CDMat, CDSMat, CDVec, DMat, DSMat};

/// Owns kappa, mu, sigma_kappa immutably, plus the lazy `Kinv`/`logdetKinv`
/// caches that `update_kappa`/`update_mu` invalidate.
pub struct HubbardFermiMatrix<H: Hopping> {
    kappa: DSMat,
    kappa_dense: DMat,
    mu: f64,
    sigma_kappa: f64,
    kinv_particle: OnceCell<CDMat>,
    kinv_hole: OnceCell<CDMat>,
    logdet_kinv_particle: OnceCell<Complex<f64>>,
    logdet_kinv_hole: OnceCell<Complex<f64>>,
    _hop: PhantomData<H>,
}

impl<H: Hopping> HubbardFermiMatrix<H> {
    pub fn new(kappa: DSMat, mu: f64, sigma_kappa: f64) -> Result<Self, CoreError> {
        if kappa.nrows() != kappa.ncols() {
            return Err(CoreError::NonSquareKappa {
                rows: kappa.nrows(),
                cols: kappa.ncols(),
            });
        }
        let kappa_dense = csr_to_dense(&kappa);
        Ok(Self {
            kappa,
            kappa_dense,
            mu,
            sigma_kappa,
            kinv_particle: OnceCell::new(),
            kinv_hole: OnceCell::new(),
            logdet_kinv_particle: OnceCell::new(),
            logdet_kinv_hole: OnceCell::new(),
            _hop: PhantomData,
        })
    }

    pub fn nx(&self) -> usize {
        self.kappa.nrows()
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma_kappa(&self) -> f64 {
        self.sigma_kappa
    }

    pub fn kappa(&self) -> &DSMat {
        &self.kappa
    }

    fn kappa_eff(&self) -> DMat {
        H::effective_kappa(&self.kappa_dense)
    }

    fn invalidate_caches(&mut self) {
        self.kinv_particle = OnceCell::new();
        self.kinv_hole = OnceCell::new();
        self.logdet_kinv_particle = OnceCell::new();
        self.logdet_kinv_hole = OnceCell::new();
    }

    pub fn update_kappa(&mut self, kappa: DSMat) -> Result<(), CoreError> {
        if kappa.nrows() != kappa.ncols() {
            return Err(CoreError::NonSquareKappa {
                rows: kappa.nrows(),
                cols: kappa.ncols(),
            });
        }
        self.kappa_dense = csr_to_dense(&kappa);
        self.kappa = kappa;
        self.invalidate_caches();
        Ok(())
    }

    pub fn update_mu(&mut self, mu: f64) {
        self.mu = mu;
        self.invalidate_caches();
    }

    /// `K(species)`: dense real (dense because the EXP discretisation
    /// densifies `kappa` via a matrix exponential; for DIA it stays as
    /// sparse as `kappa` itself, but a uniform dense representation keeps
    /// the two discretisations behind one interface).
    pub fn k_dense(&self, species: Species) -> DMat {
        let n = self.nx();
        let eye = DMat::identity(n, n);
        let kappa_eff = self.kappa_eff();
        match species {
            Species::Particle => &eye * (1.0 + self.mu) - &kappa_eff,
            Species::Hole => &eye * (1.0 - self.mu) - &kappa_eff * self.sigma_kappa,
        }
    }

    /// Lazily-cached `Kinv(species)`.
    pub fn kinv(&self, species: Species) -> Result<CDMat, CoreError> {
        let cell = match species {
            Species::Particle => &self.kinv_particle,
            Species::Hole => &self.kinv_hole,
        };
        if let Some(v) = cell.get() {
            return Ok(v.clone());
        }
        let k = self.k_dense(species);
        let kinv = k.try_inverse().ok_or(CoreError::SingularMatrix)?;
        let kinv_c = kinv.map(|x| Complex::new(x, 0.0));
        let _ = cell.set(kinv_c.clone());
        Ok(kinv_c)
    }

    /// Lazily-cached `logdetKinv(species)`.
    pub fn logdet_kinv(&self, species: Species) -> Result<Complex<f64>, CoreError> {
        let cell = match species {
            Species::Particle => &self.logdet_kinv_particle,
            Species::Hole => &self.logdet_kinv_hole,
        };
        if let Some(v) = cell.get() {
            return Ok(*v);
        }
        let kinv = self.kinv(species)?;
        let ld = crate::numeric::logdet(&kinv)?;
        let _ = cell.set(ld);
        Ok(ld)
    }

    /// `F(t, phi, species, inv)`'s diagonal entries.
    pub fn f_diag(&self, t: usize, phi: &CDVec, species: Species, inv: bool, nt: usize) -> CDVec {
        let n = self.nx();
        let tm1 = loop_idx(t as isize - 1, nt);
        let phi_slice = spacevec(phi, tm1, n, nt);
        let negative = (inv && species == Species::Particle) || (!inv && species == Species::Hole);
        let unit = Complex::new(0.0, if negative { -1.0 } else { 1.0 });
        phi_slice.map(|x| (unit * x).exp())
    }

    /// `F(t, phi, species, inv)` as a dense `Nx x Nx` matrix: the phase
    /// diagonal from [`Self::f_diag`], right-multiplied by the
    /// discretisation's hopping factor (identity for DIA, leaving `F`
    /// diagonal; `exp(kappa)` for EXP, per spec's "EXP variant multiplies by
    /// an exponential hopping factor").
    pub fn f_matrix(&self, t: usize, phi: &CDVec, species: Species, inv: bool, nt: usize) -> CDMat {
        let diag = self.f_diag(t, phi, species, inv, nt);
        let phase = CDMat::from_diagonal(&diag);
        let factor = H::f_hopping_factor(&self.kappa_dense).map(|x| Complex::new(x, 0.0));
        &phase * &factor
    }

    /// `M(phi, species)`: the full `Nx*Nt x Nx*Nt` sparse block matrix.
    pub fn m(&self, phi: &CDVec, species: Species) -> Result<CDSMat, CoreError> {
        let nx = self.nx();
        if phi.len() % nx != 0 {
            return Err(CoreError::IncompatiblePhiLength { len: phi.len(), nx });
        }
        let nt = phi.len() / nx;

        let k = self.k_dense(species).map(|x| Complex::new(x, 0.0));
        let mut coo = CooMatrix::new(nx * nt, nx * nt);

        for t in 0..nt {
            push_dense_block(&mut coo, &k, t * nx, t * nx);
        }
        for t in 1..nt {
            let f_t = self.f_matrix(t, phi, species, false, nt);
            let neg_f_t = f_t.map(|x| -x);
            push_dense_block(&mut coo, &neg_f_t, t * nx, (t - 1) * nx);
        }
        // Anti-periodic boundary: the wraparound block (0, Nt-1) is +F(0),
        // replacing the naive periodic -F(0).
        let f0 = self.f_matrix(0, phi, species, false, nt);
        push_dense_block(&mut coo, &f0, 0, (nt - 1) * nx);

        Ok(CsrMatrix::from(&coo))
    }

    /// Solves `M(phi, species) * x = rhs` for a batch of right-hand-sides,
    /// one independent LU solve per entry. Requires `mu == 0`, same as
    /// `logdetM`. Batches run in parallel; each individual solve stays
    /// single-threaded to avoid nested parallelism against the dense LU.
    pub fn solve_m(&self, phi: &CDVec, species: Species, rhs_batch: &[CDVec]) -> Result<Vec<CDVec>, CoreError> {
        if self.mu != 0.0 {
            return Err(CoreError::NonzeroMuUnsupported { mu: self.mu });
        }
        let m_dense = csr_complex_to_dense(&self.m(phi, species)?);
        let lu = nalgebra::linalg::LU::new(m_dense);

        rhs_batch
            .par_iter()
            .map(|rhs| lu.solve(rhs).ok_or(CoreError::SingularMatrix))
            .collect()
    }

    /// `P`: the Schur-complement kernel, dense real.
    pub fn p_dense(&self) -> DMat {
        let n = self.nx();
        let eye = DMat::identity(n, n);
        let kappa_eff = self.kappa_eff();
        let kappa2 = &kappa_eff * &kappa_eff;
        let mu = self.mu;
        let sk = self.sigma_kappa;
        &eye * (2.0 - mu * mu) - &kappa_eff * (sk * (1.0 + mu) + 1.0 - mu) + &kappa2 * sk
    }

    /// `T+(t, phi)`, dense complex.
    pub fn tplus_dense(&self, t: usize, phi: &CDVec, nt: usize) -> CDMat {
        let n = self.nx();
        let eye = DMat::identity(n, n);
        let kappa_eff = self.kappa_eff();
        let t_real = &kappa_eff * self.sigma_kappa - &eye * (1.0 - self.mu);
        let mut t_complex = t_real.map(|x| Complex::new(x, 0.0));

        let tm1 = loop_idx(t as isize - 1, nt);
        let phi_slice = spacevec(phi, tm1, n, nt);
        let s = if t == 0 { -1.0 } else { 1.0 };
        for xp in 0..n {
            let scale = Complex::new(s, 0.0) * (Complex::new(0.0, 1.0) * phi_slice[xp]).exp();
            for col in 0..n {
                t_complex[(xp, col)] *= scale;
            }
        }
        t_complex
    }

    /// `T-(t, phi)`, dense complex.
    pub fn tminus_dense(&self, t: usize, phi: &CDVec, nt: usize) -> CDMat {
        let n = self.nx();
        let eye = DMat::identity(n, n);
        let kappa_eff = self.kappa_eff();
        let t_real = &kappa_eff - &eye * (1.0 + self.mu);
        let mut t_complex = t_real.map(|x| Complex::new(x, 0.0));

        let phi_slice = spacevec(phi, t, n, nt);
        let s = if t == nt - 1 { -1.0 } else { 1.0 };
        for x in 0..n {
            let scale = Complex::new(s, 0.0) * (Complex::new(0.0, -1.0) * phi_slice[x]).exp();
            for row in 0..n {
                t_complex[(row, x)] *= scale;
            }
        }
        t_complex
    }

    /// `Q(phi)`: the block-cyclic tridiagonal Schur matrix.
    pub fn q(&self, phi: &CDVec) -> Result<CDSMat, CoreError> {
        let nx = self.nx();
        if phi.len() % nx != 0 {
            return Err(CoreError::IncompatiblePhiLength { len: phi.len(), nx });
        }
        let nt = phi.len() / nx;

        let p = self.p_dense().map(|x| Complex::new(x, 0.0));
        let mut coo = CooMatrix::new(nx * nt, nx * nt);

        for t in 0..nt {
            push_dense_block(&mut coo, &p, t * nx, t * nx);

            let tp = self.tplus_dense(t, phi, nt);
            let tm1 = loop_idx(t as isize - 1, nt);
            push_dense_block(&mut coo, &tp, t * nx, tm1 * nx);

            let tn = self.tminus_dense(t, phi, nt);
            let tp1 = (t + 1) % nt;
            push_dense_block(&mut coo, &tn, t * nx, tp1 * nx);
        }

        Ok(CsrMatrix::from(&coo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Dia, Exp};
    use approx::assert_relative_eq;
    use nalgebra_sparse::CooMatrix;

    /// A 2-site chain with kappa_01 = kappa_10 = 1.
    fn two_site_chain() -> DSMat {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 1, 1.0);
        coo.push(1, 0, 1.0);
        CsrMatrix::from(&coo)
    }

    #[test]
    fn empty_hopping_gives_identity_kernel() {
        let nx = 2;
        let kappa = CsrMatrix::from(&CooMatrix::new(nx, nx));
        let hfm = HubbardFermiMatrix::<Dia>::new(kappa, 0.0, 1.0).unwrap();
        let k = hfm.k_dense(Species::Particle);
        assert_relative_eq!(k, DMat::identity(nx, nx));
    }

    #[test]
    fn update_mu_invalidates_logdet_kinv_cache() {
        let kappa = two_site_chain();
        let mut hfm = HubbardFermiMatrix::<Dia>::new(kappa, 0.0, 1.0).unwrap();
        let ld0 = hfm.logdet_kinv(Species::Particle).unwrap();
        hfm.update_mu(0.3);
        let ld1 = hfm.logdet_kinv(Species::Particle).unwrap();
        assert!((ld0 - ld1).norm() > 1e-9);
    }

    #[test]
    fn solve_m_inverts_m_apply() {
        let kappa = two_site_chain();
        let hfm = HubbardFermiMatrix::<Dia>::new(kappa, 0.0, 1.0).unwrap();
        let nt = 3;
        let phi = CDVec::from_fn(2 * nt, |i, _| Complex::new(0.05 * (i as f64 + 1.0), -0.02 * i as f64));
        let m_dense = csr_complex_to_dense(&hfm.m(&phi, Species::Particle).unwrap());

        let rhs_batch = vec![
            CDVec::from_fn(2 * nt, |i, _| Complex::new(1.0 + i as f64, 0.0)),
            CDVec::from_fn(2 * nt, |i, _| Complex::new(0.0, 1.0 - i as f64)),
        ];
        let solved = hfm.solve_m(&phi, Species::Particle, &rhs_batch).unwrap();

        for (rhs, x) in rhs_batch.iter().zip(solved.iter()) {
            let back = &m_dense * x;
            for k in 0..back.len() {
                assert_relative_eq!(back[k].re, rhs[k].re, epsilon = 1e-8);
                assert_relative_eq!(back[k].im, rhs[k].im, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn solve_m_rejects_nonzero_mu() {
        let kappa = two_site_chain();
        let hfm = HubbardFermiMatrix::<Dia>::new(kappa, 0.2, 1.0).unwrap();
        let phi = CDVec::zeros(4);
        let err = hfm.solve_m(&phi, Species::Particle, &[CDVec::zeros(4)]);
        assert!(matches!(err, Err(CoreError::NonzeroMuUnsupported { .. })));
    }

    #[test]
    fn dia_f_matrix_stays_diagonal_while_exp_picks_up_the_hopping_factor() {
        let nx = 2;
        let nt = 3;
        let kappa = two_site_chain();
        let phi = CDVec::from_fn(nx * nt, |i, _| Complex::new(0.1 * (i as f64 + 1.0), 0.0));

        let hfm_dia = HubbardFermiMatrix::<Dia>::new(kappa.clone(), 0.0, 1.0).unwrap();
        let f_dia = hfm_dia.f_matrix(1, &phi, Species::Particle, false, nt);
        assert_relative_eq!(f_dia[(0, 1)].norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(f_dia[(1, 0)].norm(), 0.0, epsilon = 1e-12);

        let hfm_exp = HubbardFermiMatrix::<Exp>::new(kappa, 0.0, 1.0).unwrap();
        let f_exp = hfm_exp.f_matrix(1, &phi, Species::Particle, false, nt);
        assert!(f_exp[(0, 1)].norm() > 1e-6);
        assert!(f_exp[(1, 0)].norm() > 1e-6);
    }
}
