//! RegexScorable - trigger pattern に一致したら内側の handler group を評価する
//!
//! ```text
//! item (ResolverRef) ──text──▶ Pattern::find ──match──▶ MatchScope ──▶ inner.prepare
//! ```
//!
//! 一致しなければ `prepare` は `None`。一致しても内側の handler が 1 つも
//! 束縛できなければ score は持ちません。
//!
//! MatchScope が答える値:
//! - `PATTERN`: pattern の source
//! - `PATTERN_MATCH`: 一致全体
//! - `CAPTURES`: 名前付き capture の一覧
//! - tag = capture 名: `CAPTURE` またはその `TEXT`

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::bind::Binding;
use crate::domain::types::{self, TypeTag};
use crate::domain::{DispatchError, PatternMatch, Value};
use crate::ports::{Pattern, Resolver, ResolverExt, ResolverRef};
use crate::scorable::{Scorable, ScorableRef, ScoreComparer, State};

/// Child scope visible only to the handlers behind one pattern.
pub struct MatchScope {
    matched: Arc<PatternMatch>,
    inner: ResolverRef,
}

impl MatchScope {
    pub fn new(matched: Arc<PatternMatch>, inner: ResolverRef) -> Self {
        Self { matched, inner }
    }
}

impl Resolver for MatchScope {
    fn try_resolve(&self, ty: &TypeTag, tag: Option<&str>) -> Option<Value> {
        if ty.is_assignable_from(&types::PATTERN) {
            return Some(Value::Text(self.matched.pattern.clone()));
        }
        if ty.is_assignable_from(&types::PATTERN_MATCH) {
            return Some(Value::Match(Arc::clone(&self.matched)));
        }
        if ty.is_assignable_from(&types::CAPTURES) {
            return Some(Value::Captures(self.matched.captures.clone()));
        }
        if let Some(capture) = tag.and_then(|name| self.matched.capture(name)) {
            if ty.is_assignable_from(&types::CAPTURE) {
                return Some(Value::Capture(capture.clone()));
            }
            if ty.is_assignable_from(&types::TEXT) {
                return Some(Value::Text(capture.value.clone()));
            }
        }
        self.inner.try_resolve(ty, tag)
    }
}

pub struct RegexScorable {
    pattern: Arc<dyn Pattern>,
    inner: ScorableRef<ResolverRef, Binding>,
}

pub struct RegexState {
    scope: ResolverRef,
    matched: Arc<PatternMatch>,
    inner: State,
}

impl RegexScorable {
    pub fn new(pattern: Arc<dyn Pattern>, inner: ScorableRef<ResolverRef, Binding>) -> Self {
        Self { pattern, inner }
    }
}

#[async_trait]
impl Scorable<ResolverRef, Arc<PatternMatch>> for RegexScorable {
    type State = RegexState;

    async fn prepare(
        &self,
        item: &ResolverRef,
        token: &CancellationToken,
    ) -> Result<Option<RegexState>, DispatchError> {
        let Some(text) = item.resolve_text() else {
            return Ok(None);
        };
        let Some(matched) = self.pattern.find(&text) else {
            return Ok(None);
        };

        let matched = Arc::new(matched);
        let scope: ResolverRef = Arc::new(MatchScope::new(Arc::clone(&matched), Arc::clone(item)));
        let inner = self.inner.prepare_dyn(&scope, token).await?;
        Ok(Some(RegexState {
            scope,
            matched,
            inner,
        }))
    }

    fn has_score(&self, _item: &ResolverRef, state: &RegexState) -> bool {
        self.inner.has_score_dyn(&state.scope, &state.inner)
    }

    fn get_score(
        &self,
        _item: &ResolverRef,
        state: &RegexState,
    ) -> Result<Arc<PatternMatch>, DispatchError> {
        Ok(Arc::clone(&state.matched))
    }

    async fn post(
        &self,
        _item: &ResolverRef,
        state: &RegexState,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.inner.post_dyn(&state.scope, &state.inner, token).await
    }

    async fn done(
        &self,
        _item: &ResolverRef,
        state: Option<RegexState>,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let Some(RegexState { scope, inner, .. }) = state else {
            return Ok(());
        };
        self.inner.done_dyn(&scope, inner, token).await
    }

    fn describe(&self) -> String {
        format!("regex({}, {})", self.pattern.source(), self.inner.describe_dyn())
    }
}

/// Orders matches by how much of the input they cover.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchComparer;

impl ScoreComparer<Arc<PatternMatch>> for MatchComparer {
    fn compare(
        &self,
        one: &Arc<PatternMatch>,
        two: &Arc<PatternMatch>,
    ) -> Result<Ordering, DispatchError> {
        Ok(one.coverage().total_cmp(&two.coverage()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::bind::{Arguments, Method};
    use crate::candidates::method::MethodScorable;
    use crate::domain::Activity;
    use crate::impls::{ActivityResolver, NullResolver, RegexPattern};
    use crate::scorable::try_post;

    fn item(text: &str) -> ResolverRef {
        let root: ResolverRef = Arc::new(NullResolver);
        Arc::new(ActivityResolver::new(Arc::new(Activity::message(text)), root))
    }

    fn pattern(source: &str) -> Arc<dyn Pattern> {
        match RegexPattern::new(source, true) {
            Ok(p) => Arc::new(p),
            Err(e) => panic!("{e}"),
        }
    }

    #[tokio::test]
    async fn captures_are_bound_by_name() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let method = Method::from_fn("call", move |args: Arguments, _| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock()
                    .unwrap()
                    .push(args.text("who").unwrap_or_default().to_string());
                Ok::<_, DispatchError>(())
            }
        })
        .param("who", &types::TEXT);
        let regex = RegexScorable::new(
            pattern(r"call (?P<who>\w+)"),
            MethodScorable::shared(Arc::new(method)),
        );

        let outcome = try_post::<_, Arc<PatternMatch>>(&regex, &item("please call Alice"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_handled());
        assert_eq!(*seen.lock().unwrap(), ["Alice"]);
    }

    #[tokio::test]
    async fn no_match_means_no_state() {
        let method = Method::from_fn("m", |_, _| async { Ok::<_, DispatchError>(()) });
        let regex = RegexScorable::new(pattern("joke"), MethodScorable::shared(Arc::new(method)));

        let state = Scorable::prepare(&regex, &item("hello"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn match_without_bindable_handler_has_no_score() {
        let method = Method::from_fn("m", |_, _| async { Ok::<_, DispatchError>(()) })
            .param("missing", &types::NUMBER);
        let regex = RegexScorable::new(pattern("joke"), MethodScorable::shared(Arc::new(method)));

        let outcome = try_post::<_, Arc<PatternMatch>>(&regex, &item("a joke"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!outcome.is_handled());
    }

    #[test]
    fn scope_answers_match_values_and_delegates_the_rest() {
        let matched = pattern(r"(?P<n>\d+) apples").find("buy 3 apples").unwrap();
        let scope = MatchScope::new(Arc::new(matched), item("buy 3 apples"));

        assert_eq!(
            scope.try_resolve(&types::PATTERN, None),
            Some(Value::from(r"(?P<n>\d+) apples"))
        );
        assert_eq!(scope.try_resolve(&types::TEXT, Some("n")), Some(Value::from("3")));
        assert!(matches!(
            scope.try_resolve(&types::CAPTURE, Some("n")),
            Some(Value::Capture(c)) if c.start == 4
        ));
        assert!(matches!(scope.try_resolve(&types::CAPTURES, None), Some(Value::Captures(c)) if c.len() == 1));
        // untagged text still comes from the activity
        assert_eq!(scope.resolve_text().as_deref(), Some("buy 3 apples"));
    }

    #[test]
    fn wider_matches_rank_higher() {
        let narrow = Arc::new(pattern("joke").find("tell me a joke").unwrap());
        let wide = Arc::new(pattern("tell me a joke").find("tell me a joke").unwrap());

        assert_eq!(MatchComparer.compare(&wide, &narrow), Ok(Ordering::Greater));
    }
}
