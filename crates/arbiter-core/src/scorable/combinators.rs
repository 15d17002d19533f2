//! Combinators - score / item を変換する wrapper
//!
//! - `where_score`: 条件を満たす score だけを残す
//! - `select_score`: score の型を射影する（例: `PatternMatch` → coverage の `f64`）
//! - `select_item`: item の型を射影する
//!
//! null に対する combinator は null のまま返します（fold の reduction を壊さないため）。

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::contract::{Payload, Scorable, ScorableRef, State};
use super::null::null_scorable;
use crate::domain::DispatchError;

type Predicate<Item, Score> = Arc<dyn Fn(&Item, &Score) -> bool + Send + Sync>;

pub struct WhereScore<Item: Payload, Score: Payload> {
    inner: ScorableRef<Item, Score>,
    predicate: Predicate<Item, Score>,
}

pub struct WhereState {
    inner: State,
    keep: bool,
}

#[async_trait]
impl<Item: Payload, Score: Payload> Scorable<Item, Score> for WhereScore<Item, Score> {
    type State = WhereState;

    async fn prepare(
        &self,
        item: &Item,
        token: &CancellationToken,
    ) -> Result<Option<WhereState>, DispatchError> {
        let inner = self.inner.prepare_dyn(item, token).await?;
        let keep = if self.inner.has_score_dyn(item, &inner) {
            match self.inner.get_score_dyn(item, &inner) {
                Ok(score) => (self.predicate)(item, &score),
                Err(fault) => {
                    // released here because the caller never sees this state
                    return Err(match self.inner.done_dyn(item, inner, token).await {
                        Ok(()) => fault,
                        Err(cleanup) => fault.combine(cleanup),
                    });
                }
            }
        } else {
            false
        };
        Ok(Some(WhereState { inner, keep }))
    }

    fn has_score(&self, _item: &Item, state: &WhereState) -> bool {
        state.keep
    }

    fn get_score(&self, item: &Item, state: &WhereState) -> Result<Score, DispatchError> {
        self.inner.get_score_dyn(item, &state.inner)
    }

    async fn post(
        &self,
        item: &Item,
        state: &WhereState,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.inner.post_dyn(item, &state.inner, token).await
    }

    async fn done(
        &self,
        item: &Item,
        state: Option<WhereState>,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let inner = state.map_or_else(State::none, |state| state.inner);
        self.inner.done_dyn(item, inner, token).await
    }

    fn describe(&self) -> String {
        format!("where({})", self.inner.describe_dyn())
    }
}

pub struct SelectScore<Item: Payload, Source: Payload, Target: Payload> {
    inner: ScorableRef<Item, Source>,
    selector: Arc<dyn Fn(&Item, &Source) -> Target + Send + Sync>,
}

#[async_trait]
impl<Item, Source, Target> Scorable<Item, Target> for SelectScore<Item, Source, Target>
where
    Item: Payload,
    Source: Payload,
    Target: Payload,
{
    type State = State;

    async fn prepare(
        &self,
        item: &Item,
        token: &CancellationToken,
    ) -> Result<Option<State>, DispatchError> {
        Ok(Some(self.inner.prepare_dyn(item, token).await?))
    }

    fn has_score(&self, item: &Item, state: &State) -> bool {
        self.inner.has_score_dyn(item, state)
    }

    fn get_score(&self, item: &Item, state: &State) -> Result<Target, DispatchError> {
        let source = self.inner.get_score_dyn(item, state)?;
        Ok((self.selector)(item, &source))
    }

    async fn post(
        &self,
        item: &Item,
        state: &State,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.inner.post_dyn(item, state, token).await
    }

    async fn done(
        &self,
        item: &Item,
        state: Option<State>,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.inner
            .done_dyn(item, state.unwrap_or_else(State::none), token)
            .await
    }

    fn describe(&self) -> String {
        self.inner.describe_dyn()
    }
}

pub struct SelectItem<Outer: Payload, Inner: Payload, Score: Payload> {
    inner: ScorableRef<Inner, Score>,
    selector: Arc<dyn Fn(&Outer) -> Inner + Send + Sync>,
}

pub struct SelectItemState<Inner> {
    item: Inner,
    inner: State,
}

#[async_trait]
impl<Outer, Inner, Score> Scorable<Outer, Score> for SelectItem<Outer, Inner, Score>
where
    Outer: Payload,
    Inner: Payload,
    Score: Payload,
{
    type State = SelectItemState<Inner>;

    async fn prepare(
        &self,
        item: &Outer,
        token: &CancellationToken,
    ) -> Result<Option<SelectItemState<Inner>>, DispatchError> {
        let projected = (self.selector)(item);
        let inner = self.inner.prepare_dyn(&projected, token).await?;
        Ok(Some(SelectItemState {
            item: projected,
            inner,
        }))
    }

    fn has_score(&self, _item: &Outer, state: &SelectItemState<Inner>) -> bool {
        self.inner.has_score_dyn(&state.item, &state.inner)
    }

    fn get_score(
        &self,
        _item: &Outer,
        state: &SelectItemState<Inner>,
    ) -> Result<Score, DispatchError> {
        self.inner.get_score_dyn(&state.item, &state.inner)
    }

    async fn post(
        &self,
        _item: &Outer,
        state: &SelectItemState<Inner>,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.inner.post_dyn(&state.item, &state.inner, token).await
    }

    async fn done(
        &self,
        _item: &Outer,
        state: Option<SelectItemState<Inner>>,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let Some(SelectItemState { item, inner }) = state else {
            return Ok(());
        };
        self.inner.done_dyn(&item, inner, token).await
    }

    fn describe(&self) -> String {
        self.inner.describe_dyn()
    }
}

/// Combinators on erased scorables.
///
/// # 使用例
/// ```ignore
/// let confident = intent_scorable
///     .where_score(|_, s: &IntentScore| s.confidence() >= 0.5)
///     .select_score(|_, s: &IntentScore| s.confidence());
/// ```
pub trait ScorableExt<Item: Payload, Score: Payload> {
    fn where_score<F>(self, predicate: F) -> ScorableRef<Item, Score>
    where
        F: Fn(&Item, &Score) -> bool + Send + Sync + 'static;

    fn select_score<Target, F>(self, selector: F) -> ScorableRef<Item, Target>
    where
        Target: Payload,
        F: Fn(&Item, &Score) -> Target + Send + Sync + 'static;

    fn select_item<Outer, F>(self, selector: F) -> ScorableRef<Outer, Score>
    where
        Outer: Payload,
        F: Fn(&Outer) -> Item + Send + Sync + 'static;
}

impl<Item: Payload, Score: Payload> ScorableExt<Item, Score> for ScorableRef<Item, Score> {
    fn where_score<F>(self, predicate: F) -> ScorableRef<Item, Score>
    where
        F: Fn(&Item, &Score) -> bool + Send + Sync + 'static,
    {
        if self.is_null_dyn() {
            return self;
        }
        Arc::new(WhereScore {
            inner: self,
            predicate: Arc::new(predicate),
        })
    }

    fn select_score<Target, F>(self, selector: F) -> ScorableRef<Item, Target>
    where
        Target: Payload,
        F: Fn(&Item, &Score) -> Target + Send + Sync + 'static,
    {
        if self.is_null_dyn() {
            return null_scorable();
        }
        Arc::new(SelectScore {
            inner: self,
            selector: Arc::new(selector),
        })
    }

    fn select_item<Outer, F>(self, selector: F) -> ScorableRef<Outer, Score>
    where
        Outer: Payload,
        F: Fn(&Outer) -> Item + Send + Sync + 'static,
    {
        if self.is_null_dyn() {
            return null_scorable();
        }
        Arc::new(SelectItem {
            inner: self,
            selector: Arc::new(selector),
        })
    }
}
