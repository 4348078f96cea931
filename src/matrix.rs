//! A dense, row-major matrix for quick row and column-based data access
//!
//! The enrichment analysis keeps one row per term and one column per sequence.
//! Rows are contiguous slices, columns are strided iterators.
//!
//! ```
//! use dbbact::matrix::Matrix;
//!
//! // 2 terms x 3 sequences
//! let m = Matrix::from_vec(2, 3, vec![1., 0., 2., 0.5, 0.5, 0.]).unwrap();
//!
//! let term_totals: Vec<f64> = m.rows().map(|row| row.iter().sum()).collect();
//! assert_eq!(term_totals, vec![3.0, 1.0]);
//!
//! let sequence_totals: Vec<f64> = m.cols().map(|col| col.sum()).collect();
//! assert_eq!(sequence_totals, vec![1.5, 0.5, 2.0]);
//! ```
use std::fmt::Debug;
use std::iter::{Skip, StepBy};
use std::ops::{AddAssign, Range};
use std::slice::Iter;

/// A dense `rows x cols` matrix, stored row by row
#[derive(Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Constructs a matrix with all values set to `T::default()`
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    /// Concatenates two matrices with the same number of rows column-wise
    ///
    /// Returns `None` if the number of rows differs
    pub fn hstack(&self, other: &Matrix<T>) -> Option<Self> {
        if self.rows != other.rows {
            return None;
        }
        let cols = self.cols + other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for (left, right) in self.rows().zip(other.rows()) {
            data.extend_from_slice(left);
            data.extend_from_slice(right);
        }
        Some(Self {
            rows: self.rows,
            cols,
            data,
        })
    }

    /// Returns a copy with rows and columns swapped
    ///
    /// The columns of `self` become contiguous rows of the result
    pub fn transposed(&self) -> Self {
        let mut res = Self::zeros(self.cols, self.rows);
        for (row_idx, row) in self.rows().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                res.data[col_idx * self.rows + row_idx] = *value;
            }
        }
        res
    }
}

impl<T> Matrix<T> {
    /// Constructs a matrix from row-major data
    ///
    /// Returns `None` if the data does not match the dimensions
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        if rows * cols != data.len() {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// The number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the matrix has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `(rows, cols)`
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The number of rows
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// The number of columns
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// The value of a single cell, `None` if it is out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    /// The values of a single row
    ///
    /// # Panics
    ///
    /// If the row is out of bounds
    pub fn row(&self, row: usize) -> &[T] {
        &self.data[self.row_range(row)]
    }

    /// The values of a single row, mutable
    ///
    /// # Panics
    ///
    /// If the row is out of bounds
    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let range = self.row_range(row);
        &mut self.data[range]
    }

    /// Iterates the rows, as slices
    pub fn rows(&self) -> Rows<'_, T> {
        Rows {
            matrix: self,
            remaining: 0..self.rows,
        }
    }

    /// Iterates the columns, each column is an iterator of its values
    pub fn cols(&self) -> Columns<'_, T> {
        Columns {
            matrix: self,
            remaining: 0..self.cols,
        }
    }

    /// Applies `f` to every value
    pub fn map_inplace<F: FnMut(&mut T)>(&mut self, f: F) {
        self.data.iter_mut().for_each(f);
    }

    /// Replaces the value of the cell
    ///
    /// # Panics
    ///
    /// If the cell is out of bounds
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let idx = self.cell(row, col);
        self.data[idx] = value;
    }

    fn row_range(&self, row: usize) -> Range<usize> {
        assert!(row < self.rows, "row {row} out of bounds");
        row * self.cols..(row + 1) * self.cols
    }

    fn cell(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "cell ({row}, {col}) out of bounds"
        );
        row * self.cols + col
    }
}

impl<T: AddAssign> Matrix<T> {
    /// Adds `value` to the cell, instead of replacing it
    ///
    /// # Panics
    ///
    /// If the cell is out of bounds
    pub fn add(&mut self, row: usize, col: usize, value: T) {
        let idx = self.cell(row, col);
        self.data[idx] += value;
    }
}

impl<T: Debug> Debug for Matrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Matrix {}x{}", self.rows, self.cols)?;
        self.rows().try_for_each(|row| writeln!(f, "{row:?}"))
    }
}

/// Iterator over the rows of a [`Matrix`]
pub struct Rows<'a, T> {
    matrix: &'a Matrix<T>,
    remaining: Range<usize>,
}

impl<'a, T> Iterator for Rows<'a, T> {
    type Item = &'a [T];
    fn next(&mut self) -> Option<Self::Item> {
        let matrix = self.matrix;
        self.remaining.next().map(|row| matrix.row(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.remaining.size_hint()
    }
}

impl<T> ExactSizeIterator for Rows<'_, T> {}

/// Iterator over the columns of a [`Matrix`]
pub struct Columns<'a, T> {
    matrix: &'a Matrix<T>,
    remaining: Range<usize>,
}

impl<'a, T> Iterator for Columns<'a, T> {
    type Item = Column<'a, T>;
    fn next(&mut self) -> Option<Self::Item> {
        let matrix = self.matrix;
        // a column index only exists if cols > 0, so the step is never 0
        self.remaining.next().map(|col| Column {
            values: matrix.data.iter().skip(col).step_by(matrix.cols),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.remaining.size_hint()
    }
}

impl<T> ExactSizeIterator for Columns<'_, T> {}

/// The values of a single column, from the first to the last row
pub struct Column<'a, T> {
    values: StepBy<Skip<Iter<'a, T>>>,
}

impl<'a, T> Iterator for Column<'a, T> {
    type Item = &'a T;
    fn next(&mut self) -> Option<Self::Item> {
        self.values.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Matrix<f64> {
        Matrix::from_vec(2, 3, vec![1., 2., 3., 4., 5., 6.]).unwrap()
    }

    #[test]
    fn rows() {
        let m = example();
        let mut rows = m.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.next(), Some(&[1., 2., 3.][..]));
        assert_eq!(rows.next(), Some(&[4., 5., 6.][..]));
        assert!(rows.next().is_none());
    }

    #[test]
    fn rows_without_columns() {
        // terms without sequences still yield (empty) rows
        let m: Matrix<f64> = Matrix::zeros(3, 0);
        assert_eq!(m.rows().count(), 3);
        assert!(m.rows().all(<[f64]>::is_empty));
        assert_eq!(m.cols().count(), 0);
    }

    #[test]
    fn columns() {
        let m = example();
        assert_eq!(m.cols().len(), 3);
        let cols: Vec<Vec<f64>> = m.cols().map(|c| c.copied().collect()).collect();
        assert_eq!(cols, vec![vec![1., 4.], vec![2., 5.], vec![3., 6.]]);

        let single: Matrix<f64> = Matrix::from_vec(3, 1, vec![1., 2., 3.]).unwrap();
        let col: Vec<f64> = single.cols().next().unwrap().copied().collect();
        assert_eq!(col, vec![1., 2., 3.]);
    }

    #[test]
    fn accumulate() {
        let mut m: Matrix<f64> = Matrix::zeros(2, 2);
        m.add(0, 1, 1.5);
        m.add(0, 1, 2.0);
        assert_eq!(m.get(0, 1), Some(&3.5));
        assert_eq!(m.get(1, 1), Some(&0.0));
        assert_eq!(m.get(2, 0), None);

        m.set(0, 1, -1.0);
        assert_eq!(m.get(0, 1), Some(&-1.0));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn add_out_of_bounds() {
        let mut m: Matrix<f64> = Matrix::zeros(2, 2);
        m.add(0, 2, 1.0);
    }

    #[test]
    fn hstack() {
        let a = example();
        let b = Matrix::from_vec(2, 1, vec![7., 8.]).unwrap();
        let c = a.hstack(&b).unwrap();
        assert_eq!(c.dim(), (2, 4));
        assert_eq!(c.row(0), &[1., 2., 3., 7.]);
        assert_eq!(c.row(1), &[4., 5., 6., 8.]);

        let d = Matrix::from_vec(1, 1, vec![7.]).unwrap();
        assert!(a.hstack(&d).is_none());
    }

    #[test]
    fn transposed() {
        let t = example().transposed();
        assert_eq!(t.dim(), (3, 2));
        assert_eq!(t.row(0), &[1., 4.]);
        assert_eq!(t.row(2), &[3., 6.]);
    }

    #[test]
    fn row_mut() {
        let mut m = example();
        m.row_mut(1).copy_from_slice(&[0., 0., 0.]);
        assert_eq!(m.row(1), &[0., 0., 0.]);
        assert_eq!(m.len(), 6);
    }

    #[test]
    fn from_vec_checks_dimensions() {
        assert!(Matrix::from_vec(2, 2, vec![1., 2., 3.]).is_none());
    }
}
