use rand::Rng;
use std::ops::{Index, IndexMut};

use crate::error::{Error, Result};

/// Row-major dense matrix. Weight matrices are `[neurons × previous neurons]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Uniform samples in [0, 1).
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);

        for row in res.data.iter_mut() {
            for value in row.iter_mut() {
                *value = rng.gen::<f64>();
            }
        }

        res
    }

    /// Builds a matrix from row vectors. `cols` is taken from the first row;
    /// ragged input is rejected.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = data.first().map_or(0, Vec::len);
        if let Some(row) = data.iter().find(|row| row.len() != cols) {
            return Err(Error::shape("matrix row", cols, row.len()));
        }
        Ok(Matrix {
            rows: data.len(),
            cols,
            data
        })
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    /// `self -= scale * other`, element-wise.
    pub fn scaled_sub_assign(&mut self, other: &Matrix, scale: f64) {
        debug_assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        for (row, other_row) in self.data.iter_mut().zip(other.data.iter()) {
            for (x, g) in row.iter_mut().zip(other_row.iter()) {
                *x -= g * scale;
            }
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i][j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i][j]
    }
}
