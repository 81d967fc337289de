//! Banded matrix storage and LU factorization
//!
//! # Mathematical background
//!
//! The Jacobian of the multi-domain system is banded: unknowns only couple
//! across a 3-point stencil, so row i touches columns within
//! `kl` below and `ku` above the diagonal. Storing and factoring only the
//! band turns the O(N³) dense solve into O(N·(kl+ku)²), which is what makes
//! Newton iterations on thousands of unknowns cheap.
//!
//! # Storage layout
//!
//! LAPACK band format: entry (i, j) lives at `data[j·ldab + kl + ku + i - j]`
//! with `ldab = 2·kl + ku + 1`. The extra `kl` rows above the assembly band
//! hold the fill-in produced by partial pivoting.
//!
//! # Algorithm
//!
//! Unblocked banded LU with row partial pivoting (the classic `gbtf2`
//! sweep):
//!
//! 1. For each column j, pick the largest-magnitude entry among the `kl`
//!    subdiagonal candidates as pivot.
//! 2. Swap pivot row into place (band columns only — fill space absorbs the
//!    widened upper profile).
//! 3. Scale the multipliers and update the trailing band.
//!
//! Forward/backward substitution then solves `A x = b`; a transposed
//! substitution pass solves `Aᵀ x = b` from the same factorization, which
//! is what the adjoint system `Jᵀ λ = b` needs.

use nalgebra::DMatrix;

use crate::error::{SimError, SimResult};

// =================================================================================================
// BandMatrix
// =================================================================================================

/// Square banded matrix with `kl` sub- and `ku` super-diagonals
#[derive(Debug, Clone)]
pub struct BandMatrix {
    n: usize,
    kl: usize,
    ku: usize,
    ldab: usize,
    data: Vec<f64>,
}

impl BandMatrix {
    /// Creates a zeroed n×n band matrix
    pub fn new(n: usize, kl: usize, ku: usize) -> Self {
        assert!(n > 0, "band matrix needs at least one row");
        let ldab = 2 * kl + ku + 1;
        Self { n, kl, ku, ldab, data: vec![0.0; ldab * n] }
    }

    /// Matrix dimension
    pub fn n(&self) -> usize {
        self.n
    }

    /// Sub-diagonal count
    pub fn kl(&self) -> usize {
        self.kl
    }

    /// Super-diagonal count
    pub fn ku(&self) -> usize {
        self.ku
    }

    /// Whether (i, j) lies within the assembly band
    #[inline]
    pub fn in_band(&self, i: usize, j: usize) -> bool {
        i + self.ku >= j && j + self.kl >= i
    }

    #[inline]
    fn pos(&self, i: usize, j: usize) -> usize {
        // valid for j - (ku + kl) <= i <= j + kl (includes fill space)
        j * self.ldab + self.kl + self.ku + i - j
    }

    /// Entry (i, j); zero outside the band
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if self.in_band(i, j) {
            self.data[self.pos(i, j)]
        } else {
            0.0
        }
    }

    /// Sets entry (i, j); panics outside the band in debug builds
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, v: f64) {
        debug_assert!(self.in_band(i, j), "({}, {}) outside band", i, j);
        let p = self.pos(i, j);
        self.data[p] = v;
    }

    /// Resets every entry to zero
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Dense copy, for tests and small-system diagnostics
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.n, self.n);
        for j in 0..self.n {
            let lo = j.saturating_sub(self.ku);
            let hi = (j + self.kl).min(self.n - 1);
            for i in lo..=hi {
                m[(i, j)] = self.data[self.pos(i, j)];
            }
        }
        m
    }

    /// Factors a copy of the matrix into P·L·U
    ///
    /// # Errors
    ///
    /// [`SimError::Convergence`] on a numerically singular matrix (an exact
    /// zero pivot column).
    pub fn factor(&self) -> SimResult<BandLU> {
        let n = self.n;
        let kl = self.kl;
        let ku = self.ku;
        let mut lu = BandLU {
            n,
            kl,
            ku,
            ldab: self.ldab,
            data: self.data.clone(),
            ipiv: vec![0; n],
        };

        // ju tracks the rightmost column touched by pivoting so row swaps
        // and trailing updates stay inside the fill profile
        let mut ju = 0usize;
        for j in 0..n {
            let km = kl.min(n - 1 - j);

            // Step 1 — pivot search among the kl subdiagonal candidates
            let mut jp = 0;
            let mut amax = 0.0;
            for p in 0..=km {
                let v = lu.data[lu.pos(j + p, j)].abs();
                if v > amax {
                    amax = v;
                    jp = p;
                }
            }
            lu.ipiv[j] = j + jp;
            if amax == 0.0 {
                return Err(SimError::Convergence(format!(
                    "singular Jacobian: zero pivot in column {}",
                    j
                )));
            }
            ju = ju.max((j + ku + jp).min(n - 1));

            // Step 2 — bring the pivot row into place
            if jp != 0 {
                for c in j..=ju {
                    let a = lu.pos(j, c);
                    let b = lu.pos(j + jp, c);
                    lu.data.swap(a, b);
                }
            }

            // Step 3 — scale multipliers and update the trailing band
            if km > 0 {
                let piv = lu.data[lu.pos(j, j)];
                for p in 1..=km {
                    let idx = lu.pos(j + p, j);
                    lu.data[idx] /= piv;
                }
                for c in (j + 1)..=ju {
                    let t = lu.data[lu.pos(j, c)];
                    if t != 0.0 {
                        for p in 1..=km {
                            let m = lu.data[lu.pos(j + p, j)];
                            let idx = lu.pos(j + p, c);
                            lu.data[idx] -= m * t;
                        }
                    }
                }
            }
        }
        Ok(lu)
    }
}

// =================================================================================================
// BandLU
// =================================================================================================

/// Factored form P·L·U of a [`BandMatrix`]
#[derive(Debug, Clone)]
pub struct BandLU {
    n: usize,
    kl: usize,
    ku: usize,
    ldab: usize,
    data: Vec<f64>,
    ipiv: Vec<usize>,
}

impl BandLU {
    #[inline]
    fn pos(&self, i: usize, j: usize) -> usize {
        j * self.ldab + self.kl + self.ku + i - j
    }

    /// Solves `A x = b` in place
    pub fn solve(&self, b: &mut [f64]) {
        debug_assert_eq!(b.len(), self.n);
        let n = self.n;

        // L c = P b (forward, unit diagonal)
        for j in 0..n {
            let p = self.ipiv[j];
            if p != j {
                b.swap(j, p);
            }
            let km = self.kl.min(n - 1 - j);
            for q in 1..=km {
                b[j + q] -= self.data[self.pos(j + q, j)] * b[j];
            }
        }

        // U x = c (backward); U's profile widened to ku + kl by pivoting
        for j in (0..n).rev() {
            b[j] /= self.data[self.pos(j, j)];
            let top = j.saturating_sub(self.ku + self.kl);
            for i in top..j {
                b[i] -= self.data[self.pos(i, j)] * b[j];
            }
        }
    }

    /// Solves `Aᵀ x = b` in place, reusing the same factorization
    pub fn solve_transpose(&self, b: &mut [f64]) {
        debug_assert_eq!(b.len(), self.n);
        let n = self.n;

        // Uᵀ y = b (forward: Uᵀ is lower triangular)
        for j in 0..n {
            let top = j.saturating_sub(self.ku + self.kl);
            let mut sum = b[j];
            for i in top..j {
                sum -= self.data[self.pos(i, j)] * b[i];
            }
            b[j] = sum / self.data[self.pos(j, j)];
        }

        // Lᵀ z = y (backward, unit diagonal), undoing the row interchanges
        // in reverse order
        for j in (0..n.saturating_sub(1)).rev() {
            let km = self.kl.min(n - 1 - j);
            let mut sum = b[j];
            for q in 1..=km {
                sum -= self.data[self.pos(j + q, j)] * b[j + q];
            }
            b[j] = sum;
            let p = self.ipiv[j];
            if p != j {
                b.swap(j, p);
            }
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    /// Deterministic pseudo-random sequence so the tests are reproducible
    /// without a random-number dependency
    struct Lcg(u64);

    impl Lcg {
        fn next_f64(&mut self) -> f64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            // map the top bits into (-1, 1)
            ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        }
    }

    fn random_band(n: usize, kl: usize, ku: usize, seed: u64) -> BandMatrix {
        let mut m = BandMatrix::new(n, kl, ku);
        let mut rng = Lcg(seed);
        for j in 0..n {
            for i in j.saturating_sub(ku)..=(j + kl).min(n - 1) {
                m.set(i, j, rng.next_f64());
            }
        }
        // diagonal dominance is NOT imposed: pivoting has to earn its keep
        m
    }

    #[test]
    fn test_band_get_set_and_outside_band() {
        let mut m = BandMatrix::new(5, 1, 2);
        m.set(2, 3, 7.5);
        assert_eq!(m.get(2, 3), 7.5);
        assert_eq!(m.get(4, 0), 0.0); // below the band
        assert_eq!(m.get(0, 4), 0.0); // above the band
    }

    #[test]
    fn test_solve_matches_dense_lu() {
        let m = random_band(12, 3, 2, 42);
        let dense = m.to_dense();
        let lu = m.factor().unwrap();

        let b: Vec<f64> = (0..12).map(|i| (i as f64 * 0.7).sin()).collect();
        let mut x = b.clone();
        lu.solve(&mut x);

        let xd = dense
            .lu()
            .solve(&DVector::from_vec(b))
            .expect("dense solve failed");
        for i in 0..12 {
            assert!((x[i] - xd[i]).abs() < 1e-10, "x[{}]: {} vs {}", i, x[i], xd[i]);
        }
    }

    #[test]
    fn test_transpose_solve_matches_dense() {
        let m = random_band(15, 2, 4, 7);
        let dense = m.to_dense().transpose();
        let lu = m.factor().unwrap();

        let b: Vec<f64> = (0..15).map(|i| (i as f64 * 1.3).cos()).collect();
        let mut x = b.clone();
        lu.solve_transpose(&mut x);

        let xd = dense
            .lu()
            .solve(&DVector::from_vec(b))
            .expect("dense transpose solve failed");
        for i in 0..15 {
            assert!((x[i] - xd[i]).abs() < 1e-10, "x[{}]: {} vs {}", i, x[i], xd[i]);
        }
    }

    #[test]
    fn test_pivoting_handles_zero_diagonal() {
        // diagonal entry (0,0) is zero; without pivoting this factorization
        // would divide by zero immediately
        let mut m = BandMatrix::new(3, 1, 1);
        m.set(0, 0, 0.0);
        m.set(1, 0, 2.0);
        m.set(0, 1, 1.0);
        m.set(1, 1, 1.0);
        m.set(2, 1, 1.0);
        m.set(1, 2, 3.0);
        m.set(2, 2, 1.0);

        let lu = m.factor().unwrap();
        // A = [[0,1,0],[2,1,3],[0,1,1]], solve A x = [1, 7, 2]
        let mut b = vec![1.0, 7.0, 2.0];
        lu.solve(&mut b);
        let dense = m.to_dense();
        let r = &dense * DVector::from_vec(b.clone()) - DVector::from_vec(vec![1.0, 7.0, 2.0]);
        assert!(r.norm() < 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_reported() {
        let mut m = BandMatrix::new(3, 1, 1);
        // column 1 is identically zero
        m.set(0, 0, 1.0);
        m.set(2, 2, 1.0);
        let err = m.factor().unwrap_err();
        assert!(matches!(err, SimError::Convergence(_)));
    }

    #[test]
    fn test_wide_band_equals_dense_behavior() {
        // kl and ku spanning the whole matrix degenerate into a dense solve
        let m = random_band(6, 5, 5, 99);
        let dense = m.to_dense();
        let lu = m.factor().unwrap();
        let b = vec![1.0, -2.0, 0.5, 3.0, -1.5, 0.25];
        let mut x = b.clone();
        lu.solve(&mut x);
        let xd = dense.lu().solve(&DVector::from_vec(b)).unwrap();
        for i in 0..6 {
            assert!((x[i] - xd[i]).abs() < 1e-10);
        }
    }
}
