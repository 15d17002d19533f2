//! ScoreTraits - 正規化された score の範囲
//!
//! priority band の中では score を `[minimum, maximum]` に揃えて比較します。
//! - 範囲外の score は設定ミスなので `ScoreOutOfRange` で fold を止める
//! - `maximum` ちょうどの score はそれ以上負けないので、残りの prepare を省略する

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::compare::NaturalOrder;
use super::contract::{DynScorable, Payload, ScorableRef, State};
use super::fold::{FoldPolicy, FoldStage, fold_with};
use crate::domain::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTraits {
    pub minimum: f64,
    pub maximum: f64,
}

impl ScoreTraits {
    pub const NORMALIZED: Self = Self {
        minimum: 0.0,
        maximum: 1.0,
    };

    pub fn contains(&self, score: f64) -> bool {
        self.minimum <= score && score <= self.maximum
    }
}

impl Default for ScoreTraits {
    fn default() -> Self {
        Self::NORMALIZED
    }
}

pub struct TraitsPolicy {
    traits: ScoreTraits,
}

impl TraitsPolicy {
    pub fn new(traits: ScoreTraits) -> Self {
        Self { traits }
    }
}

impl<Item: Payload> FoldPolicy<Item, f64> for TraitsPolicy {
    fn on_stage(
        &self,
        stage: FoldStage,
        _scorable: &dyn DynScorable<Item, f64>,
        _item: &Item,
        _state: &State,
        score: &f64,
    ) -> Result<bool, DispatchError> {
        match stage {
            FoldStage::AfterFold => {
                if !self.traits.contains(*score) {
                    return Err(DispatchError::ScoreOutOfRange {
                        score: *score,
                        minimum: self.traits.minimum,
                        maximum: self.traits.maximum,
                    });
                }
                Ok(*score < self.traits.maximum)
            }
            FoldStage::StartPost => Ok(true),
            FoldStage::AfterPost => Ok(false),
        }
    }
}

/// Winner-take-all fold over normalized scores.
pub fn fold_normalized<Item: Payload>(
    scorables: Vec<ScorableRef<Item, f64>>,
    traits: ScoreTraits,
) -> ScorableRef<Item, f64> {
    fold_with(
        scorables,
        Arc::new(NaturalOrder),
        Arc::new(TraitsPolicy::new(traits)),
    )
}
