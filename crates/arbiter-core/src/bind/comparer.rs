//! BindingComparer - overload の半順序
//!
//! 2 つの binding のパラメータ型を先頭から短い方の長さまで比べます。
//! - 同じ型: 情報なし
//! - 一方が他方に代入可能: より具体的な方が勝つ
//! - どちらにも代入できない: 順序付け不能（`Inconsistent`）
//!
//! パラメータごとの向きが食い違っても `Inconsistent`。
//! 最後の tiebreak は必須パラメータ数（多い方がより具体的）です。optional は数えません。
//! cancellation パラメータは engine が渡すものなので比較しません。

use std::cmp::Ordering;

use super::binder::Binding;
use super::method::ParameterKind;
use crate::domain::types::TypeTag;
use crate::domain::DispatchError;
use crate::scorable::ScoreComparer;

#[derive(Debug, Default, Clone, Copy)]
pub struct BindingComparer;

fn signature(binding: &Binding) -> Vec<&'static TypeTag> {
    binding
        .method()
        .parameters()
        .iter()
        .filter(|p| p.kind != ParameterKind::Cancellation)
        .map(|p| p.ty)
        .collect()
}

fn required(binding: &Binding) -> usize {
    binding
        .method()
        .parameters()
        .iter()
        .filter(|p| p.kind == ParameterKind::Required)
        .count()
}

impl ScoreComparer<Binding> for BindingComparer {
    fn compare(&self, one: &Binding, two: &Binding) -> Result<Ordering, DispatchError> {
        let inconsistent = |reason: String| DispatchError::Inconsistent {
            one: one.method().name().to_string(),
            two: two.method().name().to_string(),
            reason,
        };

        let left = signature(one);
        let right = signature(two);

        let mut direction = Ordering::Equal;
        for (a, b) in left.iter().zip(&right) {
            let step = if a == b {
                Ordering::Equal
            } else if a.is_assignable_from(b) {
                Ordering::Less
            } else if b.is_assignable_from(a) {
                Ordering::Greater
            } else {
                return Err(inconsistent(format!("'{a}' and '{b}' are unrelated types")));
            };

            match (direction, step) {
                (_, Ordering::Equal) => {}
                (Ordering::Equal, step) => direction = step,
                (current, step) if current == step => {}
                _ => {
                    return Err(inconsistent(
                        "parameters disagree on which signature is more specific".to_string(),
                    ));
                }
            }
        }

        if direction != Ordering::Equal {
            return Ok(direction);
        }
        Ok(required(one).cmp(&required(two)))
    }
}
