//! Dense row-major matrices backing batches

use std::fmt;
use std::ops::Range;

use crate::error::{Error, Result};

/// A dense two-dimensional `f64` matrix stored row-major
#[derive(Clone, PartialEq)]
pub struct Matrix {
    /// Row-major values
    data: Vec<f64>,

    /// Number of rows
    rows: usize,

    /// Number of columns
    cols: usize,
}

impl Matrix {
    /// Create a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Create a matrix from row-major values
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::ShapeMismatch {
                matrix: "dense",
                expected: rows * cols,
                actual: data.len(),
                row: 0,
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Stack rows into a matrix; every row must have the same width
    ///
    /// `name` labels the matrix in a [`Error::ShapeMismatch`].
    pub fn from_rows<R: AsRef<[f64]>>(name: &'static str, rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);

        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::ShapeMismatch {
                    matrix: name,
                    expected: cols,
                    actual: row.len(),
                    row: index,
                });
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shape as `[rows, cols]`
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Check if the matrix holds no values
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major values
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major values
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Raw bytes of the values, for handing to native consumers
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Get one row
    pub fn row(&self, index: usize) -> Result<&[f64]> {
        if index >= self.rows {
            return Err(Error::IndexOutOfBounds);
        }
        Ok(&self.data[index * self.cols..(index + 1) * self.cols])
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |i| &self.data[i * self.cols..(i + 1) * self.cols])
    }

    /// Get the value at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    /// Set the value at `(row, col)`; returns `false` when out of bounds
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> bool {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
            true
        } else {
            false
        }
    }

    /// Copy a contiguous range of rows
    pub fn slice_rows(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.rows {
            return Err(Error::IndexOutOfBounds);
        }
        Ok(Self {
            data: self.data[range.start * self.cols..range.end * self.cols].to_vec(),
            rows: range.end - range.start,
            cols: self.cols,
        })
    }

    /// Copy the given rows, in the order given
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let rows = indices
            .iter()
            .map(|&i| self.row(i))
            .collect::<Result<Vec<_>>>()?;
        let mut selected = Self::from_rows("selected", &rows)?;
        selected.cols = self.cols;
        Ok(selected)
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter_rows()).finish()
    }
}
