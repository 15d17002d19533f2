//! ScoreComparer - score の順序は外から与える
//!
//! fold は score の中身を見ません。順序付けはすべて comparer に任せます。
//! 順序付けできない組み合わせは `Err`（`DispatchError::Inconsistent`）で報告します。

use std::cmp::Ordering;

use crate::domain::DispatchError;

pub trait ScoreComparer<Score>: Send + Sync {
    /// `Greater` means `one` is the better score.
    fn compare(&self, one: &Score, two: &Score) -> Result<Ordering, DispatchError>;
}

/// Larger numbers are better.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalOrder;

impl ScoreComparer<f64> for NaturalOrder {
    fn compare(&self, one: &f64, two: &f64) -> Result<Ordering, DispatchError> {
        Ok(one.total_cmp(two))
    }
}

/// Every score ties; ranking falls back to declaration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unordered;

impl<Score> ScoreComparer<Score> for Unordered {
    fn compare(&self, _one: &Score, _two: &Score) -> Result<Ordering, DispatchError> {
        Ok(Ordering::Equal)
    }
}

/// Adapts a total order given as a closure.
pub struct CompareWith<F>(pub F);

impl<Score, F> ScoreComparer<Score> for CompareWith<F>
where
    F: Fn(&Score, &Score) -> Ordering + Send + Sync,
{
    fn compare(&self, one: &Score, two: &Score) -> Result<Ordering, DispatchError> {
        Ok((self.0)(one, two))
    }
}
