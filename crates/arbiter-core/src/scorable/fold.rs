//! Fold - 複数の candidate を 1 つの candidate にまとめる
//!
//! # アルゴリズム
//! 1. 宣言順に 1 つずつ prepare する（並行にはしない。共有キャッシュの埋まり方を決定的にするため）
//! 2. prepare 直後に score を持った candidate ごとに `AfterFold` を呼ぶ。false なら残りは prepare しない
//! 3. score 降順で安定ソート（同点は宣言順、score なしは最後）
//! 4. has_score / get_score は先頭に委譲
//! 5. post: 上位から `StartPost` → post → `AfterPost`。`AfterPost` が true なら次の candidate へ
//! 6. done: 宣言順に全員。失敗しても残りを続け、エラーは集約する
//!
//! # 学習ポイント
//! - policy（`FoldPolicy`）を差し替えるだけで winner-take-all / first-match / 帯域ごとの評価を作る
//! - `sort_by` は比較が矛盾すると panic し得るので、`Result` を返す挿入ソートで順位を作る

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::compare::{ScoreComparer, Unordered};
use super::contract::{DynScorable, Payload, Scorable, ScorableRef, State};
use super::null::null_scorable;
use crate::domain::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldStage {
    /// A candidate just scored during preparation. `false` stops preparing.
    AfterFold,
    /// A ranked candidate is about to post. `false` skips it and everything below.
    StartPost,
    /// A ranked candidate posted. `true` continues with the next one.
    AfterPost,
}

pub trait FoldPolicy<Item, Score>: Send + Sync
where
    Item: Payload,
    Score: Payload,
{
    fn on_stage(
        &self,
        stage: FoldStage,
        scorable: &dyn DynScorable<Item, Score>,
        item: &Item,
        state: &State,
        score: &Score,
    ) -> Result<bool, DispatchError>;
}

/// Prepare everyone, post only the best.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinnerTakeAll;

impl<Item: Payload, Score: Payload> FoldPolicy<Item, Score> for WinnerTakeAll {
    fn on_stage(
        &self,
        stage: FoldStage,
        _scorable: &dyn DynScorable<Item, Score>,
        _item: &Item,
        _state: &State,
        _score: &Score,
    ) -> Result<bool, DispatchError> {
        Ok(match stage {
            FoldStage::AfterFold | FoldStage::StartPost => true,
            FoldStage::AfterPost => false,
        })
    }
}

/// Stop preparing at the first candidate that scores.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstMatch;

impl<Item: Payload, Score: Payload> FoldPolicy<Item, Score> for FirstMatch {
    fn on_stage(
        &self,
        stage: FoldStage,
        _scorable: &dyn DynScorable<Item, Score>,
        _item: &Item,
        _state: &State,
        _score: &Score,
    ) -> Result<bool, DispatchError> {
        Ok(stage == FoldStage::StartPost)
    }
}

/// A policy given as a closure over the stage and the score.
pub struct OnStage<F>(pub F);

impl<Item, Score, F> FoldPolicy<Item, Score> for OnStage<F>
where
    Item: Payload,
    Score: Payload,
    F: Fn(FoldStage, &Item, &Score) -> Result<bool, DispatchError> + Send + Sync,
{
    fn on_stage(
        &self,
        stage: FoldStage,
        _scorable: &dyn DynScorable<Item, Score>,
        item: &Item,
        _state: &State,
        score: &Score,
    ) -> Result<bool, DispatchError> {
        (self.0)(stage, item, score)
    }
}

pub struct Fold<Item, Score>
where
    Item: Payload,
    Score: Payload,
{
    scorables: Vec<ScorableRef<Item, Score>>,
    comparer: Arc<dyn ScoreComparer<Score>>,
    policy: Arc<dyn FoldPolicy<Item, Score>>,
    distinct: Option<fn(&Score, &Score) -> bool>,
}

/// Per-item state of a fold: one entry per prepared child, in declaration order.
pub struct FoldState<Score> {
    states: Vec<State>,
    scores: Vec<Option<Score>>,
    ranking: Vec<usize>,
}

impl<Score> FoldState<Score> {
    /// Indices of the prepared children, best first; unscored children last.
    pub fn ranking(&self) -> &[usize] {
        &self.ranking
    }

    pub fn prepared(&self) -> usize {
        self.states.len()
    }
}

impl<Item, Score> Fold<Item, Score>
where
    Item: Payload,
    Score: Payload + Clone,
{
    pub fn new(
        scorables: Vec<ScorableRef<Item, Score>>,
        comparer: Arc<dyn ScoreComparer<Score>>,
        policy: Arc<dyn FoldPolicy<Item, Score>>,
    ) -> Self {
        Self {
            scorables,
            comparer,
            policy,
            distinct: None,
        }
    }

    /// Drops a score from the ranking when an earlier child produced an equal one.
    ///
    /// The duplicate child is still released.
    pub fn distinct(mut self) -> Self
    where
        Score: PartialEq,
    {
        let same: fn(&Score, &Score) -> bool = <Score as PartialEq>::eq;
        self.distinct = Some(same);
        self
    }

    /// Erases the fold, reducing it when it holds fewer than two live children.
    pub fn into_scorable(self) -> ScorableRef<Item, Score> {
        let Self {
            scorables,
            comparer,
            policy,
            distinct,
        } = self;
        match try_reduce(scorables) {
            Ok(one) => one,
            Err(many) => Arc::new(Self {
                scorables: many,
                comparer,
                policy,
                distinct,
            }),
        }
    }

    fn rank(&self, scores: &[Option<Score>]) -> Result<Vec<usize>, DispatchError> {
        let mut ranked: Vec<(usize, &Score)> = Vec::with_capacity(scores.len());
        for (index, score) in scores.iter().enumerate() {
            let Some(score) = score.as_ref() else {
                continue;
            };
            // compared against every ranked entry so an unorderable pair faults
            // wherever it was declared; lands after the last entry that is not
            // strictly worse, keeping ties stable
            let mut at = 0;
            for (position, (_, other)) in ranked.iter().enumerate() {
                if self.comparer.compare(other, score)? != Ordering::Less {
                    at = position + 1;
                }
            }
            ranked.insert(at, (index, score));
        }

        let mut ranking: Vec<usize> = ranked.into_iter().map(|(index, _)| index).collect();
        ranking.extend(
            scores
                .iter()
                .enumerate()
                .filter(|(_, score)| score.is_none())
                .map(|(index, _)| index),
        );
        Ok(ranking)
    }

    async fn done_all(
        &self,
        item: &Item,
        states: Vec<State>,
        token: &CancellationToken,
    ) -> Vec<DispatchError> {
        let mut faults = Vec::new();
        for (scorable, state) in self.scorables.iter().zip(states) {
            if let Err(fault) = scorable.done_dyn(item, state, token).await {
                faults.push(fault);
            }
        }
        faults
    }

    /// Releases the children prepared so far and folds their faults into `fault`.
    async fn abandon(
        &self,
        item: &Item,
        states: Vec<State>,
        token: &CancellationToken,
        fault: DispatchError,
    ) -> DispatchError {
        let cleanup = self.done_all(item, states, token).await;
        if cleanup.is_empty() {
            return fault;
        }
        let mut faults = fault.flatten();
        faults.extend(cleanup.into_iter().flat_map(DispatchError::flatten));
        DispatchError::Aggregate(faults)
    }
}

#[async_trait]
impl<Item, Score> Scorable<Item, Score> for Fold<Item, Score>
where
    Item: Payload,
    Score: Payload + Clone,
{
    type State = FoldState<Score>;

    async fn prepare(
        &self,
        item: &Item,
        token: &CancellationToken,
    ) -> Result<Option<FoldState<Score>>, DispatchError> {
        let mut states: Vec<State> = Vec::with_capacity(self.scorables.len());
        let mut scores: Vec<Option<Score>> = Vec::with_capacity(self.scorables.len());

        for scorable in &self.scorables {
            if token.is_cancelled() {
                return Err(self
                    .abandon(item, states, token, DispatchError::Cancelled)
                    .await);
            }

            let state = match scorable.prepare_dyn(item, token).await {
                Ok(state) => state,
                Err(fault) => return Err(self.abandon(item, states, token, fault).await),
            };

            let score = if scorable.has_score_dyn(item, &state) {
                match scorable.get_score_dyn(item, &state) {
                    Ok(score) => Some(score),
                    Err(fault) => {
                        states.push(state);
                        return Err(self.abandon(item, states, token, fault).await);
                    }
                }
            } else {
                None
            };

            let score = match (score, self.distinct) {
                (Some(score), Some(same)) if scores.iter().flatten().any(|s| same(s, &score)) => {
                    debug!(candidate = %scorable.describe_dyn(), "duplicate score dropped");
                    None
                }
                (score, _) => score,
            };

            let proceed = match &score {
                Some(score) => {
                    self.policy
                        .on_stage(FoldStage::AfterFold, scorable.as_ref(), item, &state, score)
                }
                None => Ok(true),
            };

            states.push(state);
            scores.push(score);

            match proceed {
                Ok(true) => {}
                Ok(false) => {
                    debug!(candidate = %scorable.describe_dyn(), "preparation short-circuited");
                    break;
                }
                Err(fault) => return Err(self.abandon(item, states, token, fault).await),
            }
        }

        let ranking = match self.rank(&scores) {
            Ok(ranking) => ranking,
            Err(fault) => return Err(self.abandon(item, states, token, fault).await),
        };

        Ok(Some(FoldState {
            states,
            scores,
            ranking,
        }))
    }

    fn has_score(&self, _item: &Item, state: &FoldState<Score>) -> bool {
        state
            .ranking
            .first()
            .is_some_and(|&top| state.scores[top].is_some())
    }

    fn get_score(&self, _item: &Item, state: &FoldState<Score>) -> Result<Score, DispatchError> {
        state
            .ranking
            .first()
            .and_then(|&top| state.scores[top].clone())
            .ok_or_else(|| DispatchError::protocol("fold has no ranked score"))
    }

    async fn post(
        &self,
        item: &Item,
        state: &FoldState<Score>,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        for &index in &state.ranking {
            let Some(score) = state.scores[index].as_ref() else {
                break;
            };
            let scorable = &self.scorables[index];
            let child = &state.states[index];

            if !self
                .policy
                .on_stage(FoldStage::StartPost, scorable.as_ref(), item, child, score)?
            {
                debug!(candidate = %scorable.describe_dyn(), "post vetoed");
                break;
            }

            debug!(candidate = %scorable.describe_dyn(), "posting");
            scorable.post_dyn(item, child, token).await?;

            if !self
                .policy
                .on_stage(FoldStage::AfterPost, scorable.as_ref(), item, child, score)?
            {
                break;
            }
        }
        Ok(())
    }

    async fn done(
        &self,
        item: &Item,
        state: Option<FoldState<Score>>,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let Some(state) = state else {
            return Ok(());
        };
        let faults = self.done_all(item, state.states, token).await;
        match DispatchError::aggregate(faults) {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn describe(&self) -> String {
        let children: Vec<String> = self.scorables.iter().map(|s| s.describe_dyn()).collect();
        format!("fold[{}]", children.join(", "))
    }
}

/// Removes null candidates; succeeds when at most one remains.
///
/// Zero survivors reduce to the null scorable, one survivor to itself.
/// Otherwise the survivors are handed back for folding.
pub fn try_reduce<Item, Score>(
    scorables: Vec<ScorableRef<Item, Score>>,
) -> Result<ScorableRef<Item, Score>, Vec<ScorableRef<Item, Score>>>
where
    Item: Payload,
    Score: Payload,
{
    let mut live: Vec<ScorableRef<Item, Score>> =
        scorables.into_iter().filter(|s| !s.is_null_dyn()).collect();
    match live.pop() {
        None => Ok(null_scorable()),
        Some(only) if live.is_empty() => Ok(only),
        Some(last) => {
            live.push(last);
            Err(live)
        }
    }
}

/// Winner-take-all fold ordered by `comparer`.
pub fn fold<Item, Score>(
    scorables: Vec<ScorableRef<Item, Score>>,
    comparer: Arc<dyn ScoreComparer<Score>>,
) -> ScorableRef<Item, Score>
where
    Item: Payload,
    Score: Payload + Clone,
{
    fold_with(scorables, comparer, Arc::new(WinnerTakeAll))
}

pub fn fold_with<Item, Score>(
    scorables: Vec<ScorableRef<Item, Score>>,
    comparer: Arc<dyn ScoreComparer<Score>>,
    policy: Arc<dyn FoldPolicy<Item, Score>>,
) -> ScorableRef<Item, Score>
where
    Item: Payload,
    Score: Payload + Clone,
{
    Fold::new(scorables, comparer, policy).into_scorable()
}

/// The first candidate, in declaration order, that scores.
pub fn first<Item, Score>(scorables: Vec<ScorableRef<Item, Score>>) -> ScorableRef<Item, Score>
where
    Item: Payload,
    Score: Payload + Clone,
{
    fold_with(scorables, Arc::new(Unordered), Arc::new(FirstMatch))
}
