//! Systematic `(k, n)` Reed-Solomon erasure coding over `GF(2^8)`.
//!
//! The coding matrix is a Cauchy matrix (guaranteed invertible on any
//! `k`-row subset) normalized so its first `k` rows are the identity —
//! the standard way to make a Cauchy Reed-Solomon code systematic: the
//! first `k` output shares are exactly the input data, and the
//! remaining `n - k` are parity. Reconstruction inverts whichever `k`
//! rows of that same matrix correspond to the shares that actually
//! survived.

use super::error::DaError;

mod gf256 {
    //! `GF(2^8)` arithmetic using the AES/Rijndael reduction polynomial
    //! `x^8 + x^4 + x^3 + x + 1` (0x11d), with log/exp tables built once
    //! at first use.
    use std::sync::OnceLock;

    struct Tables {
        exp: [u8; 512],
        log: [u8; 256],
    }

    fn tables() -> &'static Tables {
        static TABLES: OnceLock<Tables> = OnceLock::new();
        TABLES.get_or_init(|| {
            let mut exp = [0u8; 512];
            let mut log = [0u8; 256];
            let mut x: u16 = 1;
            for i in 0..255usize {
                exp[i] = x as u8;
                log[x as usize] = i as u8;
                x <<= 1;
                if x & 0x100 != 0 {
                    x ^= 0x11d;
                }
            }
            for i in 255..512 {
                exp[i] = exp[i - 255];
            }
            Tables { exp, log }
        })
    }

    pub fn add(a: u8, b: u8) -> u8 {
        a ^ b
    }

    pub fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        let t = tables();
        let la = t.log[a as usize] as usize;
        let lb = t.log[b as usize] as usize;
        t.exp[la + lb]
    }

    pub fn div(a: u8, b: u8) -> u8 {
        assert!(b != 0, "division by zero in GF(2^8)");
        if a == 0 {
            return 0;
        }
        let t = tables();
        let la = t.log[a as usize] as usize;
        let lb = t.log[b as usize] as usize;
        t.exp[255 + la - lb]
    }

    pub fn inv(a: u8) -> u8 {
        div(1, a)
    }
}

/// Inverts a `k x k` matrix over `GF(2^8)` via Gauss-Jordan elimination
/// with partial pivoting. Returns `None` if the matrix is singular
/// (should not happen for any `k`-row subset of the Cauchy matrix this
/// module builds, by construction).
fn invert(matrix: &[Vec<u8>]) -> Option<Vec<Vec<u8>>> {
    let k = matrix.len();
    let mut aug: Vec<Vec<u8>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.resize(2 * k, 0);
            r[k + i] = 1;
            r
        })
        .collect();

    for col in 0..k {
        let pivot_row = (col..k).find(|&r| aug[r][col] != 0)?;
        aug.swap(col, pivot_row);

        let inv_pivot = gf256::inv(aug[col][col]);
        for v in aug[col].iter_mut() {
            *v = gf256::mul(*v, inv_pivot);
        }

        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor == 0 {
                continue;
            }
            for c in 0..2 * k {
                let sub = gf256::mul(factor, aug[col][c]);
                aug[row][c] = gf256::add(aug[row][c], sub);
            }
        }
    }

    Some(aug.into_iter().map(|row| row[k..].to_vec()).collect())
}

fn cauchy_matrix(n: usize, k: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| {
            let x_i = i as u8;
            (0..k)
                .map(|j| {
                    let y_j = (n + j) as u8;
                    gf256::inv(gf256::add(x_i, y_j))
                })
                .collect()
        })
        .collect()
}

fn matrix_mul(a: &[Vec<u8>], b: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let rows = a.len();
    let inner = b.len();
    let cols = b[0].len();
    (0..rows)
        .map(|i| {
            (0..cols)
                .map(|j| {
                    (0..inner).fold(0u8, |acc, x| gf256::add(acc, gf256::mul(a[i][x], b[x][j])))
                })
                .collect()
        })
        .collect()
}

/// A systematic Reed-Solomon `(k, n)` coder: the first `k` produced
/// shares equal the input shares verbatim, and the remaining `n - k`
/// carry parity derived from the normalized Cauchy matrix.
pub struct ErasureCoder {
    k: usize,
    n: usize,
    /// Full `n x k` systematic coding matrix; rows `0..k` are the
    /// identity by construction.
    matrix: Vec<Vec<u8>>,
}

impl ErasureCoder {
    pub fn new(k: usize, n: usize) -> Option<Self> {
        if k == 0 || k > n {
            return None;
        }
        let cauchy = cauchy_matrix(n, k);
        let top: Vec<Vec<u8>> = cauchy[..k].to_vec();
        let top_inv = invert(&top)?;
        let matrix = matrix_mul(&cauchy, &top_inv);
        Some(Self { k, n, matrix })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Splits `data` into `k` equal-length shares (zero-padded to a
    /// multiple of `k`) and produces `n` total shares, the first `k` of
    /// which are exactly those data shares.
    pub fn encode(&self, data: &[u8]) -> Vec<Vec<u8>> {
        let share_len = data.len().div_ceil(self.k).max(1);
        let mut shares: Vec<Vec<u8>> = (0..self.k)
            .map(|i| {
                let start = i * share_len;
                let end = (start + share_len).min(data.len());
                let mut share = if start < data.len() {
                    data[start..end].to_vec()
                } else {
                    Vec::new()
                };
                share.resize(share_len, 0);
                share
            })
            .collect();

        for row in self.matrix.iter().skip(self.k) {
            let mut parity = vec![0u8; share_len];
            for (byte_idx, out) in parity.iter_mut().enumerate() {
                let mut acc = 0u8;
                for (j, coeff) in row.iter().enumerate() {
                    acc = gf256::add(acc, gf256::mul(*coeff, shares[j][byte_idx]));
                }
                *out = acc;
            }
            shares.push(parity);
        }

        shares
    }

    /// Reconstructs the original `k` data shares given any `k` of the
    /// `n` shares, identified by their original share index.
    pub fn reconstruct(
        &self,
        available: &[(usize, Vec<u8>)],
    ) -> Result<Vec<Vec<u8>>, DaError> {
        if available.len() < self.k {
            return Err(DaError::InsufficientShares {
                k: self.k,
                got: available.len(),
            });
        }
        let chosen = &available[..self.k];
        let share_len = chosen[0].1.len();

        let submatrix: Vec<Vec<u8>> = chosen.iter().map(|(idx, _)| self.matrix[*idx].clone()).collect();
        let inverse = invert(&submatrix).ok_or(DaError::InsufficientShares {
            k: self.k,
            got: available.len(),
        })?;

        let mut data_shares = vec![vec![0u8; share_len]; self.k];
        for byte_idx in 0..share_len {
            for (out_row, inv_row) in inverse.iter().enumerate() {
                let mut acc = 0u8;
                for (j, coeff) in inv_row.iter().enumerate() {
                    acc = gf256::add(acc, gf256::mul(*coeff, chosen[j].1[byte_idx]));
                }
                data_shares[out_row][byte_idx] = acc;
            }
        }
        Ok(data_shares)
    }
}
