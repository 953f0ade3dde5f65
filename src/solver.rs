//! Least-squares solvers for the assembled alignment systems.
//!
//! Dense systems go through an SVD-based solve, which handles
//! rank-deficient matrices by thresholding small singular values. Sparse
//! systems use LSMR (Fong & Saunders), an iterative method on the
//! Golub-Kahan bidiagonalization that converges to a minimum-norm
//! least-squares solution from a zero start and tolerates singular input.
//! Neither path fails on ill-conditioned systems.

use crate::system::{LinearSystem, SystemMatrix};
use nalgebra::{DMatrix, DVector};

const SVD_EPS: f64 = 1e-12;
const LSMR_ATOL: f64 = 1e-10;
const LSMR_BTOL: f64 = 1e-10;

/// Solve `A x = b` in the least-squares sense, returning log factors.
pub fn solve(system: &LinearSystem) -> DVector<f64> {
    if system.rows == 0 || system.unknowns == 0 {
        return DVector::zeros(system.unknowns);
    }
    match &system.matrix {
        SystemMatrix::Dense(rows) => solve_dense(rows, &system.rhs, system.unknowns),
        SystemMatrix::Coo {
            values,
            row_indices,
            col_indices,
        } => {
            let coo = CooMatrix {
                values,
                row_indices,
                col_indices,
                nrows: system.rows,
                ncols: system.unknowns,
            };
            lsmr(&coo, &system.rhs)
        }
    }
}

fn solve_dense(rows: &[f64], rhs: &[f64], unknowns: usize) -> DVector<f64> {
    let nrows = rhs.len();
    let a = DMatrix::from_row_slice(nrows, unknowns, rows);
    let b = DVector::from_column_slice(rhs);
    let svd = a.svd(true, true);
    svd.solve(&b, SVD_EPS)
        .unwrap_or_else(|_| DVector::zeros(unknowns))
}

struct CooMatrix<'a> {
    values: &'a [f64],
    row_indices: &'a [usize],
    col_indices: &'a [usize],
    nrows: usize,
    ncols: usize,
}

impl CooMatrix<'_> {
    fn mat_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.nrows);
        for ((&value, &row), &col) in self
            .values
            .iter()
            .zip(self.row_indices)
            .zip(self.col_indices)
        {
            out[row] += value * v[col];
        }
        out
    }

    fn mat_t_vec(&self, u: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.ncols);
        for ((&value, &row), &col) in self
            .values
            .iter()
            .zip(self.row_indices)
            .zip(self.col_indices)
        {
            out[col] += value * u[row];
        }
        out
    }
}

/// Stable Givens rotation: returns (c, s, r) with `c*a + s*b = r` and
/// `-s*a + c*b = 0`.
fn sym_ortho(a: f64, b: f64) -> (f64, f64, f64) {
    if b == 0.0 {
        (1.0f64.copysign(a), 0.0, a.abs())
    } else if a == 0.0 {
        (0.0, b.signum(), b.abs())
    } else if b.abs() > a.abs() {
        let tau = a / b;
        let s = b.signum() / (1.0 + tau * tau).sqrt();
        let c = s * tau;
        (c, s, b / s)
    } else {
        let tau = b / a;
        let c = a.signum() / (1.0 + tau * tau).sqrt();
        let s = c * tau;
        (c, s, a / c)
    }
}

/// LSMR without damping, starting from x = 0.
fn lsmr(a: &CooMatrix<'_>, b: &[f64]) -> DVector<f64> {
    let n = a.ncols;
    let mut x = DVector::zeros(n);

    let mut u = DVector::from_column_slice(b);
    let normb = u.norm();
    let mut beta = normb;
    if beta == 0.0 {
        return x;
    }
    u /= beta;
    let mut v = a.mat_t_vec(&u);
    let mut alpha = v.norm();
    if alpha == 0.0 {
        return x;
    }
    v /= alpha;

    let mut zetabar = alpha * beta;
    let mut alphabar = alpha;
    let mut rho = 1.0f64;
    let mut rhobar = 1.0f64;
    let mut cbar = 1.0f64;
    let mut sbar = 0.0f64;

    let mut h = v.clone();
    let mut hbar = DVector::zeros(n);

    // State for the running residual-norm estimate.
    let mut betadd = beta;
    let mut betad = 0.0f64;
    let mut rhodold = 1.0f64;
    let mut tautildeold = 0.0f64;
    let mut thetatilde = 0.0f64;
    let mut zeta = 0.0f64;
    let mut norm_a2 = alpha * alpha;

    let max_iter = 10 * n.max(a.nrows) + 50;
    for _ in 0..max_iter {
        // Continue the bidiagonalization.
        let av = a.mat_vec(&v);
        u.axpy(1.0, &av, -alpha);
        beta = u.norm();
        if beta > 0.0 {
            u /= beta;
            let atu = a.mat_t_vec(&u);
            v.axpy(1.0, &atu, -beta);
            alpha = v.norm();
            if alpha > 0.0 {
                v /= alpha;
            }
        }

        // Plane rotations collapsing the lower bidiagonal to upper form.
        let rhoold = rho;
        let (c, s, rho_new) = sym_ortho(alphabar, beta);
        rho = rho_new;
        let thetanew = s * alpha;
        alphabar = c * alpha;

        let rhobarold = rhobar;
        let zetaold = zeta;
        let thetabar = sbar * rho;
        let (cbar_new, sbar_new, rhobar_new) = sym_ortho(cbar * rho, thetanew);
        cbar = cbar_new;
        sbar = sbar_new;
        rhobar = rhobar_new;
        zeta = cbar * zetabar;
        zetabar = -sbar * zetabar;

        if rho == 0.0 || rhobar == 0.0 {
            // Exact breakdown: the Krylov space is exhausted.
            break;
        }

        // Update the solution.
        hbar.axpy(1.0, &h, -(thetabar * rho / (rhoold * rhobarold)));
        x.axpy(zeta / (rho * rhobar), &hbar, 1.0);
        h.axpy(1.0, &v, -(thetanew / rho));

        // Estimate ||r|| and ||A^T r|| without forming the residual.
        let betahat = c * betadd;
        betadd = -s * betadd;
        let thetatildeold = thetatilde;
        let (ctildeold, stildeold, rhotildeold) = sym_ortho(rhodold, thetabar);
        thetatilde = stildeold * rhobar;
        rhodold = ctildeold * rhobar;
        betad = -stildeold * betad + ctildeold * betahat;
        tautildeold = (zetaold - thetatildeold * tautildeold) / rhotildeold;
        let taud = (zeta - thetatilde * tautildeold) / rhodold;
        let normr = ((betad - taud).powi(2) + betadd * betadd).sqrt();

        norm_a2 += beta * beta;
        let norma = norm_a2.sqrt();
        norm_a2 += alpha * alpha;
        let normar = zetabar.abs();

        if normar == 0.0 {
            break;
        }
        let normx = x.norm();
        if normr <= LSMR_BTOL * normb + LSMR_ATOL * norma * normx {
            break;
        }
        if normar <= LSMR_ATOL * norma * normr {
            break;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SystemBuilder;

    fn build(sparse: bool, rows: &[(&[(usize, f64)], f64)], unknowns: usize) -> LinearSystem {
        let mut builder = SystemBuilder::new(unknowns, sparse);
        for (coldata, rhs) in rows {
            builder.add_row(coldata.iter().copied(), *rhs);
        }
        builder.finish()
    }

    #[test]
    fn dense_solves_exactly_determined_system() {
        // x0 - x1 = 1, x0 + x1 = 3 -> x = (2, 1)
        let system = build(
            false,
            &[(&[(0, 1.0), (1, -1.0)], 1.0), (&[(0, 1.0), (1, 1.0)], 3.0)],
            2,
        );
        let x = solve(&system);
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn sparse_matches_dense_on_consistent_system() {
        let rows: &[(&[(usize, f64)], f64)] = &[
            (&[(0, 1.0), (1, -1.0)], 0.5),
            (&[(1, 1.0), (2, -1.0)], -0.25),
            (&[(0, 0.5), (1, 0.25), (2, 0.25)], 0.125),
        ];
        let dense = solve(&build(false, rows, 3));
        let sparse = solve(&build(true, rows, 3));
        for i in 0..3 {
            assert!(
                (dense[i] - sparse[i]).abs() < 1e-6,
                "component {}: dense={} sparse={}",
                i,
                dense[i],
                sparse[i]
            );
        }
    }

    #[test]
    fn dense_handles_rank_deficient_system() {
        // Two identical rows, one unknown never constrained.
        let system = build(
            false,
            &[(&[(0, 1.0), (1, -1.0)], 1.0), (&[(0, 1.0), (1, -1.0)], 1.0)],
            3,
        );
        let x = solve(&system);
        assert!(x.iter().all(|v| v.is_finite()));
        assert!((x[0] - x[1] - 1.0).abs() < 1e-10);
        // Minimum-norm solution leaves the free unknown at zero.
        assert!(x[2].abs() < 1e-10);
    }

    #[test]
    fn sparse_handles_rank_deficient_system() {
        let system = build(
            true,
            &[(&[(0, 1.0), (1, -1.0)], 1.0), (&[(0, 1.0), (1, -1.0)], 1.0)],
            3,
        );
        let x = solve(&system);
        assert!(x.iter().all(|v| v.is_finite()));
        assert!((x[0] - x[1] - 1.0).abs() < 1e-8);
        assert!(x[2].abs() < 1e-8);
    }

    #[test]
    fn zero_rhs_yields_zero_solution() {
        let system = build(true, &[(&[(0, 1.0), (1, -1.0)], 0.0)], 2);
        let x = solve(&system);
        assert!(x[0].abs() < 1e-12 && x[1].abs() < 1e-12);
    }

    #[test]
    fn empty_system_yields_zeros() {
        let system = build(false, &[], 2);
        let x = solve(&system);
        assert_eq!(x.len(), 2);
        assert!(x[0] == 0.0 && x[1] == 0.0);
    }

    #[test]
    fn sym_ortho_eliminates_second_component() {
        for &(a, b) in &[(3.0, 4.0), (-2.0, 0.5), (0.0, -7.0), (1e-8, 1e8)] {
            let (c, s, r) = sym_ortho(a, b);
            assert!((c * a + s * b - r).abs() < 1e-9 * r.abs().max(1.0));
            assert!((-s * a + c * b).abs() < 1e-9 * r.abs().max(1.0));
        }
    }
}
