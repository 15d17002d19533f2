//! Scorable contract - candidate の 5 段階ライフサイクル
//!
//! ```text
//! prepare ──▶ has_score ──▶ get_score ──▶ post ──▶ done
//!  (async)      (sync)        (sync)      (async)   (async, 必ず呼ぶ)
//! ```
//!
//! - `prepare`: item を解析して state を作る。対象外なら `None`
//! - `has_score` / `get_score`: prepare 済みの state に対する同期クエリ
//! - `post`: 勝者だけに呼ばれる（handler の実行など）
//! - `done`: prepare が成功した全 candidate に 1 回だけ呼ばれる。`None` で辞退した candidate も
//!   `done(None)` を受け取る
//!
//! # 学習ポイント
//! - ジェネリック trait (`Scorable<Item, Score>`, 関連型 `State`)
//! - Object-safe trait (`DynScorable<Item, Score>`)
//! - Type erasure: 関連型 `State` を `State`（`Box<dyn Any>`）に消去する blanket impl
//! - `done` が state を所有権ごと受け取るので「2 回目の done」は書けない

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{DispatchError, Outcome};

/// Bounds shared by every item and score type flowing through the engine.
pub trait Payload: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Payload for T {}

/// Type-erased prepared state.
///
/// `State::none()` is the sentinel for "prepare declined".
pub struct State(Option<Box<dyn Any + Send + Sync>>);

impl State {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|b| b.downcast_ref::<T>())
    }

    fn into_typed<T: Any>(self) -> Result<Option<T>, DispatchError> {
        match self.0 {
            None => Ok(None),
            Some(boxed) => boxed
                .downcast::<T>()
                .map(|b| Some(*b))
                .map_err(|_| DispatchError::protocol("done received a state of another candidate")),
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("State(none)")
        } else {
            f.write_str("State(..)")
        }
    }
}

/// A candidate offering to handle an item.
///
/// Implementations are stateless and reusable; everything that belongs to one
/// item lives in `Self::State`.
///
/// # 使用例
/// ```ignore
/// struct Always(f64);
///
/// #[async_trait]
/// impl Scorable<ResolverRef, f64> for Always {
///     type State = ();
///
///     async fn prepare(&self, _: &ResolverRef, _: &CancellationToken)
///         -> Result<Option<()>, DispatchError> { Ok(Some(())) }
///     fn has_score(&self, _: &ResolverRef, _: &()) -> bool { true }
///     fn get_score(&self, _: &ResolverRef, _: &()) -> Result<f64, DispatchError> { Ok(self.0) }
///     async fn post(&self, _: &ResolverRef, _: &(), _: &CancellationToken)
///         -> Result<(), DispatchError> { Ok(()) }
///     fn describe(&self) -> String { "always".into() }
/// }
/// ```
#[async_trait]
pub trait Scorable<Item, Score>: Send + Sync
where
    Item: Payload,
    Score: Payload,
{
    type State: Send + Sync + 'static;

    /// Returns `Ok(None)` when the item is clearly not for this candidate.
    ///
    /// On `Err` the candidate must already have released whatever it acquired;
    /// it will not see `done`.
    async fn prepare(
        &self,
        item: &Item,
        token: &CancellationToken,
    ) -> Result<Option<Self::State>, DispatchError>;

    fn has_score(&self, item: &Item, state: &Self::State) -> bool;

    /// Only called after `has_score` returned true.
    fn get_score(&self, item: &Item, state: &Self::State) -> Result<Score, DispatchError>;

    async fn post(
        &self,
        item: &Item,
        state: &Self::State,
        token: &CancellationToken,
    ) -> Result<(), DispatchError>;

    /// Called once for every candidate whose `prepare` returned `Ok`, with
    /// `None` when it declined the item.
    async fn done(
        &self,
        _item: &Item,
        _state: Option<Self::State>,
        _token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        Ok(())
    }

    /// True for candidates that can never score; folds drop them.
    fn is_null(&self) -> bool {
        false
    }

    /// Human-readable name used in logs and ranking faults.
    fn describe(&self) -> String;
}

/// DynScorable は object-safe な Scorable
///
/// `Vec<Arc<dyn DynScorable<Item, Score>>>` に異なる State 型の candidate を混在させるため、
/// State を `State` に消去します。`Scorable` を実装すれば blanket impl で自動的に得られます。
#[async_trait]
pub trait DynScorable<Item, Score>: Send + Sync
where
    Item: Payload,
    Score: Payload,
{
    async fn prepare_dyn(&self, item: &Item, token: &CancellationToken)
    -> Result<State, DispatchError>;

    fn has_score_dyn(&self, item: &Item, state: &State) -> bool;

    fn get_score_dyn(&self, item: &Item, state: &State) -> Result<Score, DispatchError>;

    async fn post_dyn(
        &self,
        item: &Item,
        state: &State,
        token: &CancellationToken,
    ) -> Result<(), DispatchError>;

    async fn done_dyn(
        &self,
        item: &Item,
        state: State,
        token: &CancellationToken,
    ) -> Result<(), DispatchError>;

    fn is_null_dyn(&self) -> bool;

    fn describe_dyn(&self) -> String;
}

pub type ScorableRef<Item, Score> = Arc<dyn DynScorable<Item, Score>>;

#[async_trait]
impl<Item, Score, S> DynScorable<Item, Score> for S
where
    Item: Payload,
    Score: Payload,
    S: Scorable<Item, Score>,
{
    async fn prepare_dyn(
        &self,
        item: &Item,
        token: &CancellationToken,
    ) -> Result<State, DispatchError> {
        Ok(match Scorable::<Item, Score>::prepare(self, item, token).await? {
            Some(state) => State::new(state),
            None => State::none(),
        })
    }

    fn has_score_dyn(&self, item: &Item, state: &State) -> bool {
        state
            .downcast_ref::<S::State>()
            .is_some_and(|s| Scorable::<Item, Score>::has_score(self, item, s))
    }

    fn get_score_dyn(&self, item: &Item, state: &State) -> Result<Score, DispatchError> {
        let typed = scored_state::<Item, Score, S>(self, item, state, "get_score")?;
        Scorable::<Item, Score>::get_score(self, item, typed)
    }

    async fn post_dyn(
        &self,
        item: &Item,
        state: &State,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let typed = scored_state::<Item, Score, S>(self, item, state, "post")?;
        Scorable::<Item, Score>::post(self, item, typed, token).await
    }

    async fn done_dyn(
        &self,
        item: &Item,
        state: State,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let typed = state.into_typed::<S::State>()?;
        Scorable::<Item, Score>::done(self, item, typed, token).await
    }

    fn is_null_dyn(&self) -> bool {
        Scorable::<Item, Score>::is_null(self)
    }

    fn describe_dyn(&self) -> String {
        Scorable::<Item, Score>::describe(self)
    }
}

/// The typed state behind `state`, provided the candidate has a score.
fn scored_state<'s, Item, Score, S>(
    scorable: &S,
    item: &Item,
    state: &'s State,
    call: &str,
) -> Result<&'s S::State, DispatchError>
where
    Item: Payload,
    Score: Payload,
    S: Scorable<Item, Score>,
{
    let typed = state.downcast_ref::<S::State>().ok_or_else(|| {
        DispatchError::protocol(format!(
            "{call} on '{}' without a prepared state",
            Scorable::<Item, Score>::describe(scorable)
        ))
    })?;
    if !Scorable::<Item, Score>::has_score(scorable, item, typed) {
        return Err(DispatchError::protocol(format!(
            "{call} on '{}' while has_score is false",
            Scorable::<Item, Score>::describe(scorable)
        )));
    }
    Ok(typed)
}

/// Extension points around one dispatch pass.
#[async_trait]
pub trait DispatchHooks<Item, Score>: Send + Sync
where
    Item: Payload,
    Score: Payload,
{
    /// Runs after the winner is known, before its `post`.
    async fn before_post(&self, _item: &Item, _score: &Score) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn after_post(&self, _item: &Item) -> Result<(), DispatchError> {
        Ok(())
    }

    /// Runs when no candidate had a score.
    async fn on_unhandled(&self, _item: &Item) -> Result<(), DispatchError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl<Item: Payload, Score: Payload> DispatchHooks<Item, Score> for NoHooks {}

/// Drives one scorable through its whole lifecycle.
pub async fn try_post<Item, Score>(
    scorable: &dyn DynScorable<Item, Score>,
    item: &Item,
    token: &CancellationToken,
) -> Result<Outcome, DispatchError>
where
    Item: Payload,
    Score: Payload,
{
    run_with_hooks(scorable, item, &NoHooks, token).await
}

/// Like [`try_post`], calling `hooks` around the winner's `post`.
///
/// `done` always runs once `prepare` succeeded. Its faults are attached to the
/// outcome when the pass itself succeeded, and aggregated with the pass fault
/// otherwise.
pub async fn run_with_hooks<Item, Score, H>(
    scorable: &dyn DynScorable<Item, Score>,
    item: &Item,
    hooks: &H,
    token: &CancellationToken,
) -> Result<Outcome, DispatchError>
where
    Item: Payload,
    Score: Payload,
    H: DispatchHooks<Item, Score> + ?Sized,
{
    let state = scorable.prepare_dyn(item, token).await?;
    let handled = post_winner(scorable, item, &state, hooks, token).await;
    let cleanup = scorable.done_dyn(item, state, token).await;

    match (handled, cleanup) {
        (Ok(handled), Ok(())) => Ok(outcome(handled)),
        (Ok(handled), Err(fault)) => {
            warn!(error = %fault, "cleanup failed after the pass completed");
            Ok(outcome(handled).with_cleanup_faults(fault.flatten()))
        }
        (Err(fault), Ok(())) => Err(fault),
        (Err(fault), Err(cleanup)) => Err(fault.combine(cleanup)),
    }
}

async fn post_winner<Item, Score, H>(
    scorable: &dyn DynScorable<Item, Score>,
    item: &Item,
    state: &State,
    hooks: &H,
    token: &CancellationToken,
) -> Result<bool, DispatchError>
where
    Item: Payload,
    Score: Payload,
    H: DispatchHooks<Item, Score> + ?Sized,
{
    if !scorable.has_score_dyn(item, state) {
        debug!(candidate = %scorable.describe_dyn(), "no candidate has a score");
        hooks.on_unhandled(item).await?;
        return Ok(false);
    }
    let score = scorable.get_score_dyn(item, state)?;
    hooks.before_post(item, &score).await?;
    scorable.post_dyn(item, state, token).await?;
    hooks.after_post(item).await?;
    Ok(true)
}

fn outcome(handled: bool) -> Outcome {
    if handled {
        Outcome::handled()
    } else {
        Outcome::unhandled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorable::testing::{Probe, log};

    #[tokio::test]
    async fn try_post_runs_the_full_lifecycle() {
        let log = log();
        let probe = Probe::scoring("a", 0.5, &log);

        let outcome = try_post::<_, f64>(&probe, &"item", &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_handled());
        assert_eq!(*log.lock().unwrap(), ["prepare:a", "post:a", "done:a"]);
    }

    #[tokio::test]
    async fn unscored_candidate_is_released_without_post() {
        let log = log();
        let probe = Probe::silent("a", &log);

        let outcome = try_post::<_, f64>(&probe, &"item", &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.is_handled());
        assert_eq!(*log.lock().unwrap(), ["prepare:a", "done:a"]);
    }

    #[tokio::test]
    async fn declining_candidate_is_still_released() {
        let log = log();
        let probe = Probe::declining("a", &log);

        let outcome = try_post::<_, f64>(&probe, &"item", &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.is_handled());
        assert_eq!(*log.lock().unwrap(), ["prepare:a", "done:a"]);
    }

    #[tokio::test]
    async fn declined_state_reaches_done_as_none() {
        let log = log();
        let probe = Probe::declining("a", &log);
        let state = probe
            .prepare_dyn(&"item", &CancellationToken::new())
            .await
            .unwrap();

        assert!(state.is_none());
        probe
            .done_dyn(&"item", state, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), ["prepare:a", "done:a"]);
    }

    #[tokio::test]
    async fn post_fault_is_returned_after_done() {
        let log = log();
        let probe = Probe::scoring("a", 1.0, &log).failing_post();

        let err = try_post::<_, f64>(&probe, &"item", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Other(ref m) if m == "post failed: a"));
        assert_eq!(*log.lock().unwrap(), ["prepare:a", "post:a", "done:a"]);
    }

    #[tokio::test]
    async fn done_fault_does_not_override_success() {
        let log = log();
        let probe = Probe::scoring("a", 1.0, &log).failing_done();

        let outcome = try_post::<_, f64>(&probe, &"item", &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_handled());
        assert_eq!(
            outcome.cleanup_faults,
            vec![DispatchError::other("done failed: a")]
        );
    }

    #[tokio::test]
    async fn post_and_done_faults_are_aggregated() {
        let log = log();
        let probe = Probe::scoring("a", 1.0, &log).failing_post().failing_done();

        let err = try_post::<_, f64>(&probe, &"item", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.flatten().len(), 2);
    }

    #[tokio::test]
    async fn get_score_without_score_is_protocol_misuse() {
        let log = log();
        let probe = Probe::silent("a", &log);
        let item = "item";
        let state = probe
            .prepare_dyn(&item, &CancellationToken::new())
            .await
            .unwrap();

        let err = probe.get_score_dyn(&item, &state).unwrap_err();
        assert!(matches!(err, DispatchError::ProtocolMisuse(_)));

        let err = probe
            .post_dyn(&item, &state, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ProtocolMisuse(_)));
    }

    #[tokio::test]
    async fn foreign_state_is_rejected() {
        let log = log();
        let probe = Probe::scoring("a", 1.0, &log);

        let err = probe
            .done_dyn(&"item", State::new(42u32), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ProtocolMisuse(_)));
        assert!(!probe.has_score_dyn(&"item", &State::new(42u32)));
    }
}
