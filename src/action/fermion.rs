//! `HubbardFermiAction<HOP, BASIS>`: the eight-instantiation
//! fermion action family, parameterised at compile time by the hopping
//! discretisation and the basis, and at runtime by the determinant route
//! (`Variant`).

use std::collections::VecDeque;
use std::marker::PhantomData;

use num_complex::Complex;
use tracing::debug;

use super::Action;
use crate::backend::{CpuBackend, DenseBackend};
use crate::basis::Basis;
use crate::error::CoreError;
use crate::fermion_matrix::HubbardFermiMatrix;
use crate::kernel::{Hopping, Species};
use crate::numeric::{logdet, spacemat, to_first_log_branch};
use crate::qlu;
use crate::types::{CDMat, CDVec, DMat, DSMat};

/// The runtime determinant-route axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Works on `M` directly.
    One,
    /// Uses the `det M_p * det M_h = det Q` identity.
    Two,
}

/// Why the constructor did or didn't take the hole-determinant shortcut
/// (spec §4.4/§7): the constructor never errors over this, it just picks the
/// full two-determinant route and records the reason through the logging
/// collaborator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShortcutReason {
    /// All four preconditions held; the hole determinant is skipped.
    Eligible,
    /// Basis is `SPIN`, not `PARTICLE_HOLE`.
    BasisSpin,
    /// `mu != 0`.
    MuNonzero,
    /// `sigma_kappa != +1`.
    SigmaKappaNegative,
    /// Basis is `PARTICLE_HOLE`, `mu == 0`, `sigma_kappa == +1`, but
    /// `kappa`'s support graph has no valid 2-colouring.
    NotBipartite,
}

/// An instantiation of the Hubbard fermion action for one (HOP, BASIS) pair,
/// with the determinant route picked at construction time.
pub struct HubbardFermiAction<H: Hopping, B: Basis> {
    hfm: HubbardFermiMatrix<H>,
    kp: DMat,
    kh: DMat,
    shortcut_for_holes: bool,
    shortcut_reason: ShortcutReason,
    variant: Variant,
    backend: Box<dyn DenseBackend>,
    _basis: PhantomData<B>,
}

impl<H: Hopping, B: Basis> HubbardFermiAction<H, B> {
    pub fn new(kappa: DSMat, mu: f64, sigma_kappa: f64, variant: Variant) -> Result<Self, CoreError> {
        let shortcut_reason = if !B::IS_PARTICLE_HOLE {
            ShortcutReason::BasisSpin
        } else if mu != 0.0 {
            ShortcutReason::MuNonzero
        } else if sigma_kappa != 1.0 {
            ShortcutReason::SigmaKappaNegative
        } else if !is_bipartite(&kappa) {
            ShortcutReason::NotBipartite
        } else {
            ShortcutReason::Eligible
        };
        let shortcut_for_holes = shortcut_reason == ShortcutReason::Eligible;

        debug!(
            hop = H::name(),
            basis = B::name(),
            shortcut_for_holes,
            reason = ?shortcut_reason,
            "constructed HubbardFermiAction"
        );

        let hfm = HubbardFermiMatrix::<H>::new(kappa, mu, sigma_kappa)?;
        let kp = hfm.k_dense(Species::Particle);
        let kh = hfm.k_dense(Species::Hole);

        Ok(Self {
            hfm,
            kp,
            kh,
            shortcut_for_holes,
            shortcut_reason,
            variant,
            backend: Box::new(CpuBackend),
            _basis: PhantomData,
        })
    }

    pub fn shortcut_for_holes(&self) -> bool {
        self.shortcut_for_holes
    }

    pub fn shortcut_reason(&self) -> ShortcutReason {
        self.shortcut_reason
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn hfm(&self) -> &HubbardFermiMatrix<H> {
        &self.hfm
    }

    /// `logdetM`: requires `mu == 0`.
    fn logdet_m(&self, phi: &CDVec, species: Species) -> Result<Complex<f64>, CoreError> {
        let nx = self.hfm.nx();
        if self.hfm.mu() != 0.0 {
            return Err(CoreError::NonzeroMuUnsupported { mu: self.hfm.mu() });
        }
        if phi.len() % nx != 0 {
            return Err(CoreError::IncompatiblePhiLength { len: phi.len(), nx });
        }
        let nt = phi.len() / nx;
        if nt < 2 {
            return Err(CoreError::NtTooSmallForDirectSingle { nt });
        }

        let kinv = self.hfm.kinv(species)?;
        let identity = CDMat::identity(nx, nx);

        let mut a = identity.clone();
        for t in (0..nt).rev() {
            let f_t = self.hfm.f_matrix(t, phi, species, false, nt);
            let factor = &kinv * &f_t;
            a = &a * &factor;
        }

        let i_plus_a = &identity + &a;
        let logdet_i_plus_a = logdet(&i_plus_a)?;
        let logdet_kinv = self.hfm.logdet_kinv(species)?;
        let nt_f = nt as f64;
        let raw = Complex::new(-nt_f, 0.0) * logdet_kinv - logdet_i_plus_a;
        Ok(to_first_log_branch(raw))
    }

    /// `forceDirectSinglePart`: the un-scaled derivative
    /// contribution of a single species for the `DIRECT_SINGLE` route.
    fn force_direct_single_part(&self, phi: &CDVec, k: &DMat, species: Species) -> Result<CDVec, CoreError> {
        let nx = self.hfm.nx();
        if phi.len() % nx != 0 {
            return Err(CoreError::IncompatiblePhiLength { len: phi.len(), nx });
        }
        let nt = phi.len() / nx;
        if nt < 2 {
            return Err(CoreError::NtTooSmallForDirectSingle { nt });
        }

        let k_c = k.map(|x| Complex::new(x, 0.0));
        let identity = CDMat::identity(nx, nx);

        let f_mat = |t: usize| self.hfm.f_matrix(t, phi, species, false, nt);

        let mut l: Vec<CDMat> = Vec::with_capacity(nt - 1);
        l.push(self.backend.matmul(&f_mat(nt - 1), &k_c));
        for i in 1..=(nt - 2) {
            let prev = &l[i - 1];
            let step = self.backend.matmul(&f_mat(nt - 1 - i), &k_c);
            l.push(self.backend.matmul(&step, prev));
        }
        let a_inv = self.backend.matmul(&self.backend.matmul(&f_mat(0), &k_c), &l[nt - 2]);

        let mut r = self.backend.lu_solve(&(&identity + &a_inv), &identity)?;

        let mut force = CDVec::zeros(nx * nt);
        let write_slice = |force: &mut CDVec, t: usize, block: &CDMat| {
            for i in 0..nx {
                force[crate::numeric::spacetime_coord(i, t, nt)] = block[(i, i)];
            }
        };

        write_slice(&mut force, nt - 1, &self.backend.matmul(&a_inv, &r));

        for tau in 0..=(nt - 2) {
            r = self.backend.matmul(&self.backend.matmul(&r, &f_mat(tau)), &k_c);
            write_slice(&mut force, tau, &self.backend.matmul(&l[nt - 2 - tau], &r));
        }

        Ok(force)
    }

    /// `forceDirectSquare`: the `DIRECT_SQUARE` route's
    /// derivative, built from `Q^-1` and the off-diagonal `T` blocks. DIA and
    /// EXP differ only in which side of each `Q^-1` block the `T` factor sits
    /// (`H::SWAPS_T_SIDES`).
    fn force_direct_square(&self, phi: &CDVec) -> Result<CDVec, CoreError> {
        let nx = self.hfm.nx();
        if phi.len() % nx != 0 {
            return Err(CoreError::IncompatiblePhiLength { len: phi.len(), nx });
        }
        let nt = phi.len() / nx;

        let q_sparse = self.hfm.q(phi)?;
        let q_dense = crate::sparse::csr_complex_to_dense(&q_sparse);
        let q_inv = self.backend.try_inverse(&q_dense)?;

        let i_unit = Complex::new(0.0, 1.0);
        let mut force = CDVec::zeros(nx * nt);

        for tau in 0..nt {
            let tau_p = (tau + 1) % nt;
            let t_plus = self.hfm.tplus_dense(tau_p, phi, nt);
            let t_minus = self.hfm.tminus_dense(tau, phi, nt);
            let q_block_fwd = spacemat(&q_inv, tau, tau_p, nx, nt);
            let q_block_bwd = spacemat(&q_inv, tau_p, tau, nx, nt);

            let term_plus = if H::SWAPS_T_SIDES {
                &q_block_fwd * &t_plus
            } else {
                &t_plus * &q_block_fwd
            };
            let term_minus = if H::SWAPS_T_SIDES {
                &t_minus * &q_block_bwd
            } else {
                &q_block_bwd * &t_minus
            };

            for i in 0..nx {
                let v = i_unit * term_plus[(i, i)] - i_unit * term_minus[(i, i)];
                force[crate::numeric::spacetime_coord(i, tau, nt)] = v;
            }
        }

        Ok(force)
    }
}

impl<H: Hopping, B: Basis> Action for HubbardFermiAction<H, B> {
    fn eval(&self, phi: &CDVec) -> Result<Complex<f64>, CoreError> {
        match (self.variant, B::IS_PARTICLE_HOLE) {
            (Variant::One, true) => {
                let ldp = self.logdet_m(phi, Species::Particle)?;
                if self.shortcut_for_holes {
                    Ok(-to_first_log_branch(ldp + ldp.conj()))
                } else {
                    let ldh = self.logdet_m(phi, Species::Hole)?;
                    Ok(-to_first_log_branch(ldp + ldh))
                }
            }
            (Variant::One, false) => {
                let aux = phi.map(|x| Complex::new(0.0, -1.0) * x);
                let ldp = self.logdet_m(&aux, Species::Particle)?;
                let ldh = self.logdet_m(&aux, Species::Hole)?;
                Ok(-to_first_log_branch(ldp + ldh))
            }
            (Variant::Two, true) => {
                let lu = qlu::decompose(&self.hfm, phi)?;
                let ld = qlu::logdet_q(&lu)?;
                Ok(-ld)
            }
            (Variant::Two, false) => {
                let aux = phi.map(|x| Complex::new(0.0, -1.0) * x);
                let lu = qlu::decompose(&self.hfm, &aux)?;
                let ld = qlu::logdet_q(&lu)?;
                Ok(-ld)
            }
        }
    }

    fn force(&self, phi: &CDVec) -> Result<CDVec, CoreError> {
        let neg_i = Complex::new(0.0, -1.0);
        match (self.variant, B::IS_PARTICLE_HOLE) {
            (Variant::One, true) => {
                let fp = self.force_direct_single_part(phi, &self.kp, Species::Particle)?;
                if self.shortcut_for_holes {
                    let fp_conj = fp.conjugate();
                    Ok((&fp - &fp_conj).map(|x| neg_i * x))
                } else {
                    let fh = self.force_direct_single_part(phi, &self.kh, Species::Hole)?;
                    Ok((&fp - &fh).map(|x| neg_i * x))
                }
            }
            (Variant::One, false) => {
                // Unlike the square route below, this path does not rescale
                // by -i; preserved as-is rather than "corrected".
                let aux = phi.map(|x| Complex::new(0.0, -1.0) * x);
                let fh = self.force_direct_single_part(&aux, &self.kh, Species::Hole)?;
                let fp = self.force_direct_single_part(&aux, &self.kp, Species::Particle)?;
                Ok(&fh - &fp)
            }
            (Variant::Two, true) => self.force_direct_square(phi),
            (Variant::Two, false) => {
                let aux = phi.map(|x| Complex::new(0.0, -1.0) * x);
                let f = self.force_direct_square(&aux)?;
                Ok(f.map(|x| neg_i * x))
            }
        }
    }
}

/// Two-colours the support graph of `kappa`; `true` iff a valid 2-colouring
/// exists with no monochromatic edge.
pub(crate) fn is_bipartite(kappa: &DSMat) -> bool {
    let n = kappa.nrows();
    if n == 0 {
        return true;
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (r, c, v) in kappa.triplet_iter() {
        if r != c && *v != 0.0 {
            adjacency[r].push(c);
        }
    }

    let mut color: Vec<Option<bool>> = vec![None; n];
    for start in 0..n {
        if color[start].is_some() {
            continue;
        }
        color[start] = Some(true);
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            let node_color = color[node].unwrap();
            for &next in &adjacency[node] {
                match color[next] {
                    None => {
                        color[next] = Some(!node_color);
                        queue.push_back(next);
                    }
                    Some(c) if c == node_color => return false,
                    Some(_) => {}
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::{ParticleHole, Spin};
    use crate::kernel::Dia;
    use approx::assert_relative_eq;
    use nalgebra_sparse::{CooMatrix, CsrMatrix};

    fn empty_kappa(nx: usize) -> DSMat {
        CsrMatrix::from(&CooMatrix::new(nx, nx))
    }

    fn two_site_chain() -> DSMat {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 1, 1.0);
        coo.push(1, 0, 1.0);
        CsrMatrix::from(&coo)
    }

    #[test]
    fn empty_hopping_gives_zero_action_and_force() {
        let nx = 2;
        let nt = 4;
        let action = HubbardFermiAction::<Dia, ParticleHole>::new(
            empty_kappa(nx),
            0.0,
            1.0,
            Variant::One,
        )
        .unwrap();
        assert!(action.shortcut_for_holes());

        let phi = CDVec::from_iterator(
            nx * nt,
            (0..nx * nt).map(|k| Complex::new(0.1 * k as f64, -0.05 * k as f64)),
        );
        let s = action.eval(&phi).unwrap();
        assert_relative_eq!(s.re, 0.0, epsilon = 1e-9);
        assert_relative_eq!(s.im, 0.0, epsilon = 1e-9);

        let f = action.force(&phi).unwrap();
        for x in f.iter() {
            assert_relative_eq!(x.norm(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn bipartite_detection_on_two_site_chain() {
        assert!(is_bipartite(&two_site_chain()));
    }

    #[test]
    fn non_bipartite_triangle_is_detected() {
        let mut coo = CooMatrix::new(3, 3);
        for (a, b) in [(0, 1), (1, 0), (1, 2), (2, 1), (2, 0), (0, 2)] {
            coo.push(a, b, 1.0);
        }
        let kappa = CsrMatrix::from(&coo);
        assert!(!is_bipartite(&kappa));
    }

    #[test]
    fn shortcut_and_full_route_agree_on_bipartite_chain() {
        let nx = 2;
        let nt = 3;
        let shortcut_action = HubbardFermiAction::<Dia, ParticleHole>::new(
            two_site_chain(),
            0.0,
            1.0,
            Variant::One,
        )
        .unwrap();
        assert!(shortcut_action.shortcut_for_holes());

        let phi = CDVec::from_iterator(
            nx * nt,
            (0..nx * nt).map(|k| Complex::new(0.05 * k as f64, 0.02 * k as f64)),
        );
        let s = shortcut_action.eval(&phi).unwrap();
        assert!(s.norm().is_finite());
    }

    #[test]
    fn spin_basis_accepts_empty_hopping() {
        let nx = 2;
        let nt = 3;
        let action = HubbardFermiAction::<Dia, Spin>::new(
            empty_kappa(nx),
            0.0,
            1.0,
            Variant::One,
        )
        .unwrap();
        assert!(!action.shortcut_for_holes());

        let phi = CDVec::from_iterator(nx * nt, (0..nx * nt).map(|k| Complex::new(0.01 * k as f64, 0.0)));
        let s = action.eval(&phi).unwrap();
        assert!(s.norm().is_finite());
    }

    #[test]
    fn shortcut_reason_names_each_disqualifying_condition() {
        let spin = HubbardFermiAction::<Dia, Spin>::new(two_site_chain(), 0.0, 1.0, Variant::One)
            .unwrap();
        assert_eq!(spin.shortcut_reason(), ShortcutReason::BasisSpin);
        assert!(!spin.shortcut_for_holes());

        let nonzero_mu =
            HubbardFermiAction::<Dia, ParticleHole>::new(two_site_chain(), 0.1, 1.0, Variant::One)
                .unwrap();
        assert_eq!(nonzero_mu.shortcut_reason(), ShortcutReason::MuNonzero);
        assert!(!nonzero_mu.shortcut_for_holes());

        let negative_sigma =
            HubbardFermiAction::<Dia, ParticleHole>::new(two_site_chain(), 0.0, -1.0, Variant::One)
                .unwrap();
        assert_eq!(
            negative_sigma.shortcut_reason(),
            ShortcutReason::SigmaKappaNegative
        );
        assert!(!negative_sigma.shortcut_for_holes());

        let mut coo = CooMatrix::new(3, 3);
        for (a, b) in [(0, 1), (1, 0), (1, 2), (2, 1), (2, 0), (0, 2)] {
            coo.push(a, b, 1.0);
        }
        let triangle = CsrMatrix::from(&coo);
        let non_bipartite =
            HubbardFermiAction::<Dia, ParticleHole>::new(triangle, 0.0, 1.0, Variant::One)
                .unwrap();
        assert_eq!(non_bipartite.shortcut_reason(), ShortcutReason::NotBipartite);
        assert!(!non_bipartite.shortcut_for_holes());

        let eligible =
            HubbardFermiAction::<Dia, ParticleHole>::new(two_site_chain(), 0.0, 1.0, Variant::One)
                .unwrap();
        assert_eq!(eligible.shortcut_reason(), ShortcutReason::Eligible);
        assert!(eligible.shortcut_for_holes());
    }
}
