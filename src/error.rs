//! Typed synchronous failures.
//!
//! Three kinds live here: precondition failures, numerical failures, and the
//! composition algebra's argument-type failure. None of these are retried by
//! the core itself; callers surface them.

/// Failure modes raised by the Hubbard fermion core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// kappa (or an updated kappa) is not square.
    #[error("kappa must be square, got {rows}x{cols}")]
    NonSquareKappa { rows: usize, cols: usize },

    /// phi's length isn't a multiple of Nx.
    #[error("phi length {len} is not a multiple of Nx={nx}")]
    IncompatiblePhiLength { len: usize, nx: usize },

    /// DIRECT_SINGLE (logdetM / solveM / forceDirectSinglePart) requires Nt >= 2.
    #[error("DIRECT_SINGLE requires Nt >= 2, got Nt={nt}")]
    NtTooSmallForDirectSingle { nt: usize },

    /// QLU::reconstruct (and decompose) require Nt >= 1.
    #[error("QLU requires Nt >= 1, got Nt={nt}")]
    NtTooSmallForQlu { nt: usize },

    /// logdetM/solveM refuse to run away from mu == 0 (numerically unstable).
    #[error("logdetM/solveM require mu == 0, got mu={mu}")]
    NonzeroMuUnsupported { mu: f64 },

    /// An LU factorisation hit a (numerically) zero pivot.
    #[error("singular matrix encountered during LU factorisation")]
    SingularMatrix,

    /// The composition algebra was asked to add a term that is neither an
    /// `Action` nor a `SumAction`.
    #[error("cannot add a non-Action, non-SumAction term to a SumAction")]
    InvalidActionTerm,
}
