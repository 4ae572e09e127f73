//! Least-squares projection and annihilation of one matrix onto another.

use nalgebra::DMatrix;

use crate::error::{IvError, Result};

/// Projects each column of `y` onto the column space of `x`.
///
/// Computed as `x · pinv(x) · y` with an SVD-based pseudo-inverse, so
/// rank-deficient `x` is handled without any explicit rank check. A zero
/// column `x` spans only the trivial subspace and yields the zero matrix of
/// `y`'s shape.
pub fn project(y: &DMatrix<f64>, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if y.nrows() != x.nrows() {
        return Err(IvError::dimension_mismatch(
            "projection rows",
            y.nrows(),
            x.nrows(),
        ));
    }
    if x.ncols() == 0 || x.nrows() == 0 {
        return Ok(DMatrix::zeros(y.nrows(), y.ncols()));
    }

    let svd = x.clone().svd(true, true);
    // Singular values below the working precision of the decomposition are
    // treated as zero, matching the conventional pinv cutoff.
    let cutoff = svd.singular_values.max() * f64::EPSILON * x.nrows().max(x.ncols()) as f64;
    let pinv = svd
        .pseudo_inverse(cutoff)
        .map_err(|_| IvError::Numerical {
            context: "pseudo-inverse",
        })?;
    Ok(x * (pinv * y))
}

/// Removes the projection of `y` on `x` from `y`.
///
/// The result is the component of `y` orthogonal to `x`'s column space, i.e.
/// the least-squares residuals when `x` is a design matrix.
pub fn annihilate(y: &DMatrix<f64>, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    Ok(y - project(y, x)?)
}
