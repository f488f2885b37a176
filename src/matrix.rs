//! A dense, row-major floating point matrix.
//!
//! This is a deliberately small adaptation of the teacher's
//! `util::matrix` module, trimmed to the operations the
//! differentiation engine and [`Map`](crate::expr::Expr::Map) rule
//! actually need: construction from rows, element access, and
//! elementwise reconstruction. Row reduction and the generic
//! [`MatrixElement`] abstraction are not needed here.

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
  rows: usize,
  cols: usize,
  data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrregularShape;

impl Matrix {
  pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, IrregularShape> {
    if rows.is_empty() {
      return Err(IrregularShape);
    }
    let cols = rows[0].len();
    if cols == 0 || rows.iter().any(|r| r.len() != cols) {
      return Err(IrregularShape);
    }
    let row_count = rows.len();
    let data = rows.into_iter().flatten().collect();
    Ok(Self { rows: row_count, cols, data })
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn get(&self, r: usize, c: usize) -> f64 {
    self.data[r * self.cols + c]
  }

  /// Builds a same-shape matrix by applying `f` to every entry.
  pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Matrix {
    Matrix {
      rows: self.rows,
      cols: self.cols,
      data: self.data.iter().map(|&x| f(x)).collect(),
    }
  }
}

impl Display for Matrix {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "[")?;
    for r in 0..self.rows {
      if r > 0 { write!(f, "; ")?; }
      write!(f, "[")?;
      for c in 0..self.cols {
        if c > 0 { write!(f, ", ")?; }
        write!(f, "{}", self.get(r, c))?;
      }
      write!(f, "]")?;
    }
    write!(f, "]")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_rows_rejects_irregular_shape() {
    let rows = vec![vec![1.0, 2.0], vec![3.0]];
    assert_eq!(Matrix::from_rows(rows), Err(IrregularShape));
  }

  #[test]
  fn test_from_rows_rejects_empty() {
    assert_eq!(Matrix::from_rows(vec![]), Err(IrregularShape));
  }

  #[test]
  fn test_get_and_map() {
    let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    assert_eq!(m.get(1, 0), 3.0);
    let doubled = m.map(|x| x * 2.0);
    assert_eq!(doubled.get(1, 1), 8.0);
  }
}
