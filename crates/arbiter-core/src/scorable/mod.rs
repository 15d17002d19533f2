//! Scorable - candidate のライフサイクルと集約
//!
//! - **contract**: 5 段階の `Scorable` trait と object-safe な `DynScorable`、`try_post`
//! - **fold**: 複数 candidate の集約（安定ランキング、stage policy）
//! - **traits**: 正規化 score の範囲と band 用 fold
//! - **combinators**: where / select による変換
//! - **compare**: score の順序付け
//! - **null**: 決してスコアを持たない candidate

pub mod combinators;
pub mod compare;
pub mod contract;
pub mod fold;
pub mod null;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use self::combinators::ScorableExt;
pub use self::compare::{CompareWith, NaturalOrder, ScoreComparer, Unordered};
pub use self::contract::{
    DispatchHooks, DynScorable, NoHooks, Payload, Scorable, ScorableRef, State, run_with_hooks,
    try_post,
};
pub use self::fold::{
    FirstMatch, Fold, FoldPolicy, FoldStage, OnStage, WinnerTakeAll, first, fold, fold_with,
    try_reduce,
};
pub use self::null::{NullScorable, null_scorable};
pub use self::traits::{ScoreTraits, TraitsPolicy, fold_normalized};
