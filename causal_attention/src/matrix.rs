//! Dense row-major matrices and uniform batches of them.
//!
//! This is the whole numeric surface the attention module needs: matmul
//! (plain and against a transposed operand), batched matmul, elementwise
//! masking, scaling and row-wise softmax.

use crate::cpu_utils::{dot, softmax_in_place};
use crate::error::{AttentionError, Result};
use rayon::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>, // [rows * cols]
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(AttentionError::LengthMismatch {
                what: "matrix data",
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Build from nested rows; every row must have the width of the first.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(AttentionError::RaggedBatch {
                    index: i,
                    expected: (1, cols),
                    got: (1, row.len()),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.cols + j]
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data.chunks(self.cols).map(|c| c.to_vec()).collect()
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        out
    }

    /// `self · other`
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(AttentionError::MatmulDimMismatch {
                m: self.rows,
                k1: self.cols,
                k2: other.rows,
                n: other.cols,
            });
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            let a_row = self.row(i);
            let out_row = &mut out.data[i * other.cols..(i + 1) * other.cols];
            for (p, a) in a_row.iter().enumerate() {
                let b_row = &other.data[p * other.cols..(p + 1) * other.cols];
                for (o, b) in out_row.iter_mut().zip(b_row) {
                    *o += a * b;
                }
            }
        }
        Ok(out)
    }

    /// `self · otherᵀ` without materializing the transpose.
    pub fn matmul_transposed(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.cols {
            return Err(AttentionError::MatmulDimMismatch {
                m: self.rows,
                k1: self.cols,
                k2: other.cols,
                n: other.rows,
            });
        }
        let mut out = Matrix::zeros(self.rows, other.rows);
        for i in 0..self.rows {
            for j in 0..other.rows {
                out.data[i * other.rows + j] = dot(self.row(i), other.row(j));
            }
        }
        Ok(out)
    }

    pub fn scale_in_place(&mut self, factor: f32) {
        for x in &mut self.data {
            *x *= factor;
        }
    }

    /// Overwrite every entry `(i, j)` for which `predicate(i, j)` holds.
    pub fn masked_fill(&mut self, value: f32, predicate: impl Fn(usize, usize) -> bool) {
        for i in 0..self.rows {
            for j in 0..self.cols {
                if predicate(i, j) {
                    self.data[i * self.cols + j] = value;
                }
            }
        }
    }

    pub fn softmax_rows_in_place(&mut self) {
        if self.cols == 0 {
            return;
        }
        for row in self.data.chunks_mut(self.cols) {
            softmax_in_place(row);
        }
    }
}

/// A stack of equally shaped matrices: (batch_size, rows, cols).
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    items: Vec<Matrix>,
}

impl Batch {
    pub fn new(items: Vec<Matrix>) -> Result<Self> {
        if let Some(first) = items.first() {
            let expected = first.shape();
            for (index, m) in items.iter().enumerate().skip(1) {
                if m.shape() != expected {
                    return Err(AttentionError::RaggedBatch {
                        index,
                        expected,
                        got: m.shape(),
                    });
                }
            }
        }
        Ok(Batch { items })
    }

    /// Build from `[batch][seq][dim]` nested vectors.
    pub fn from_nested(nested: &[Vec<Vec<f32>>]) -> Result<Self> {
        let items = nested
            .iter()
            .map(|seq| Matrix::from_rows(seq))
            .collect::<Result<Vec<_>>>()?;
        Batch::new(items)
    }

    /// `(batch_size, rows, cols)`; rows and cols are 0 for an empty batch.
    pub fn shape(&self) -> (usize, usize, usize) {
        let (rows, cols) = self.items.first().map_or((0, 0), Matrix::shape);
        (self.items.len(), rows, cols)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, b: usize) -> Option<&Matrix> {
        self.items.get(b)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Matrix> {
        self.items.iter()
    }

    pub fn par_iter(&self) -> rayon::slice::Iter<'_, Matrix> {
        self.items.par_iter()
    }

    pub fn to_nested(&self) -> Vec<Vec<Vec<f32>>> {
        self.items.iter().map(Matrix::to_rows).collect()
    }

    /// Per-element `self[b] · other[b]`, computed in parallel.
    pub fn batched_matmul(&self, other: &Batch) -> Result<Batch> {
        if self.len() != other.len() {
            return Err(AttentionError::LengthMismatch {
                what: "batch",
                expected: self.len(),
                got: other.len(),
            });
        }
        let items = self
            .items
            .par_iter()
            .zip(other.items.par_iter())
            .map(|(a, b)| a.matmul(b))
            .collect::<Result<Vec<_>>>()?;
        Batch::new(items)
    }
}
