//! IntentScorable - recognizer が特定の intent を返したら内側の handler group を評価する
//!
//! recognizer の呼び出しは pass の `RecognitionCache` を通すので、
//! 同じ recognizer を使う intent candidate が何個あっても外部呼び出しは 1 回です。
//! chain に cache がなければ（単体で使う場合など）直接呼び出します。
//!
//! intent が見つからなければ prepare は `None` を返します。cache のエントリは
//! `done`（`None` でも呼ばれる）で evict します。
//!
//! IntentScope が答える値:
//! - `RECOGNIZER`: recognizer id
//! - `RECOGNITION`: 分類結果全体
//! - `INTENT`: 一致した intent
//! - tag = entity 種別: 1 件なら `ENTITY` / `TEXT`、1 件以上なら `ENTITIES` / `TEXT_LIST`

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::cache::{RecognitionCache, classify};
use crate::bind::Binding;
use crate::domain::types::{self, TypeTag};
use crate::domain::{DispatchError, Entity, IntentScore, Recognition, Value};
use crate::ports::{Recognizer, Resolver, ResolverExt, ResolverRef};
use crate::scorable::{Scorable, ScorableRef, ScoreComparer, State};

/// Child scope visible only to the handlers behind one intent.
pub struct IntentScope {
    recognizer: String,
    recognition: Arc<Recognition>,
    intent: IntentScore,
    inner: ResolverRef,
}

impl IntentScope {
    pub fn new(
        recognizer: impl Into<String>,
        recognition: Arc<Recognition>,
        intent: IntentScore,
        inner: ResolverRef,
    ) -> Self {
        Self {
            recognizer: recognizer.into(),
            recognition,
            intent,
            inner,
        }
    }

    fn entity_value(&self, ty: &TypeTag, kind: &str) -> Option<Value> {
        let entities: Vec<&Entity> = self.recognition.entities_of(kind).collect();
        if let [only] = entities.as_slice() {
            if ty.is_assignable_from(&types::ENTITY) {
                return Some(Value::Entity((*only).clone()));
            }
            if ty.is_assignable_from(&types::TEXT) {
                return Some(Value::Text(only.text.clone()));
            }
        }
        if entities.is_empty() {
            return None;
        }
        if ty.is_assignable_from(&types::ENTITIES) {
            return Some(Value::Entities(entities.into_iter().cloned().collect()));
        }
        if ty.is_assignable_from(&types::TEXT_LIST) {
            return Some(Value::TextList(
                entities.into_iter().map(|e| e.text.clone()).collect(),
            ));
        }
        None
    }
}

impl Resolver for IntentScope {
    fn try_resolve(&self, ty: &TypeTag, tag: Option<&str>) -> Option<Value> {
        if ty.is_assignable_from(&types::RECOGNIZER) {
            return Some(Value::Text(self.recognizer.clone()));
        }
        if ty.is_assignable_from(&types::RECOGNITION) {
            return Some(Value::Recognition(Arc::clone(&self.recognition)));
        }
        if ty.is_assignable_from(&types::INTENT) {
            return Some(Value::Intent(self.intent.clone()));
        }
        tag.and_then(|kind| self.entity_value(ty, kind))
            .or_else(|| self.inner.try_resolve(ty, tag))
    }
}

pub struct IntentScorable {
    recognizer: Arc<dyn Recognizer>,
    intent: String,
    inner: ScorableRef<ResolverRef, Binding>,
}

pub struct IntentState {
    scope: ResolverRef,
    intent: IntentScore,
    inner: State,
}

impl IntentScorable {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        intent: impl Into<String>,
        inner: ScorableRef<ResolverRef, Binding>,
    ) -> Self {
        Self {
            recognizer,
            intent: intent.into(),
            inner,
        }
    }

    async fn recognize(
        &self,
        cache: Option<&RecognitionCache>,
        text: &str,
        token: &CancellationToken,
    ) -> Result<Arc<Recognition>, DispatchError> {
        match cache {
            Some(cache) => {
                cache
                    .get_or_classify(self.recognizer.as_ref(), text, token)
                    .await
            }
            None => classify(self.recognizer.as_ref(), text, token)
                .await
                .map(Arc::new),
        }
    }

    async fn evict(&self, cache: Option<&RecognitionCache>, text: &str) {
        if let Some(cache) = cache {
            cache.evict(self.recognizer.id(), text).await;
        }
    }
}

#[async_trait]
impl Scorable<ResolverRef, IntentScore> for IntentScorable {
    type State = IntentState;

    async fn prepare(
        &self,
        item: &ResolverRef,
        token: &CancellationToken,
    ) -> Result<Option<IntentState>, DispatchError> {
        let Some(text) = item.resolve_text() else {
            return Ok(None);
        };
        let cache = item.resolve_object::<RecognitionCache>(&types::PASS_CACHE);

        let recognition = match self.recognize(cache.as_deref(), &text, token).await {
            Ok(recognition) => recognition,
            Err(fault) => {
                self.evict(cache.as_deref(), &text).await;
                return Err(fault);
            }
        };

        let Some(intent) = recognition.intent(&self.intent).cloned() else {
            return Ok(None);
        };

        let scope: ResolverRef = Arc::new(IntentScope::new(
            self.recognizer.id(),
            recognition,
            intent.clone(),
            Arc::clone(item),
        ));
        let inner = match self.inner.prepare_dyn(&scope, token).await {
            Ok(inner) => inner,
            Err(fault) => {
                self.evict(cache.as_deref(), &text).await;
                return Err(fault);
            }
        };

        Ok(Some(IntentState {
            scope,
            intent,
            inner,
        }))
    }

    fn has_score(&self, _item: &ResolverRef, state: &IntentState) -> bool {
        self.inner.has_score_dyn(&state.scope, &state.inner)
    }

    fn get_score(
        &self,
        _item: &ResolverRef,
        state: &IntentState,
    ) -> Result<IntentScore, DispatchError> {
        Ok(state.intent.clone())
    }

    async fn post(
        &self,
        _item: &ResolverRef,
        state: &IntentState,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.inner.post_dyn(&state.scope, &state.inner, token).await
    }

    async fn done(
        &self,
        item: &ResolverRef,
        state: Option<IntentState>,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        if let Some(text) = item.resolve_text() {
            let cache = item.resolve_object::<RecognitionCache>(&types::PASS_CACHE);
            self.evict(cache.as_deref(), &text).await;
        }
        match state {
            Some(IntentState { scope, inner, .. }) => self.inner.done_dyn(&scope, inner, token).await,
            None => Ok(()),
        }
    }

    fn describe(&self) -> String {
        format!(
            "intent({}:{}, {})",
            self.recognizer.id(),
            self.intent,
            self.inner.describe_dyn()
        )
    }
}

/// Orders intents by confidence; a missing score counts as zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentComparer;

impl ScoreComparer<IntentScore> for IntentComparer {
    fn compare(&self, one: &IntentScore, two: &IntentScore) -> Result<Ordering, DispatchError> {
        Ok(one.confidence().total_cmp(&two.confidence()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::bind::{Arguments, Method};
    use crate::candidates::cache::tests::Counting;
    use crate::candidates::method::MethodScorable;
    use crate::domain::Activity;
    use crate::impls::{ActivityResolver, NullResolver, Service, ServiceResolver};
    use crate::scorable::{first, try_post};

    fn item(text: &str, cache: Option<Arc<RecognitionCache>>) -> ResolverRef {
        let services = cache
            .map(|c| vec![Service::new(&types::PASS_CACHE, Value::Object(c))])
            .unwrap_or_default();
        let root: ResolverRef = Arc::new(NullResolver);
        let services: ResolverRef = Arc::new(ServiceResolver::new(services, root));
        Arc::new(ActivityResolver::new(Arc::new(Activity::message(text)), services))
    }

    fn noop(name: &str) -> ScorableRef<ResolverRef, Binding> {
        MethodScorable::shared(Arc::new(Method::from_fn(name, |_, _| async {
            Ok::<_, DispatchError>(())
        })))
    }

    #[tokio::test]
    async fn recognized_intent_scores_with_its_confidence() {
        let recognizer = Arc::new(Counting::new("r", "Greet", 0.75));
        let scorable = IntentScorable::new(recognizer, "greet", noop("hello"));
        let item = item("hi", None);
        let token = CancellationToken::new();

        let state = Scorable::prepare(&scorable, &item, &token).await.unwrap().unwrap();

        assert!(scorable.has_score(&item, &state));
        assert_eq!(
            scorable.get_score(&item, &state).unwrap(),
            IntentScore::new("Greet", 0.75)
        );
        Scorable::done(&scorable, &item, Some(state), &token).await.unwrap();
    }

    #[tokio::test]
    async fn other_intent_has_no_score() {
        let recognizer = Arc::new(Counting::new("r", "weather", 0.9));
        let scorable = IntentScorable::new(recognizer, "greet", noop("hello"));

        let outcome = try_post::<_, IntentScore>(&scorable, &item("hi", None), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!outcome.is_handled());
    }

    #[tokio::test]
    async fn declined_intent_still_evicts_its_recognition() {
        let recognizer = Arc::new(Counting::new("r", "weather", 0.9));
        let scorable = IntentScorable::new(recognizer, "greet", noop("hello"));
        let cache = Arc::new(RecognitionCache::new());
        let item = item("hi", Some(Arc::clone(&cache)));
        let token = CancellationToken::new();

        let state = Scorable::prepare(&scorable, &item, &token).await.unwrap();
        assert!(state.is_none());
        assert!(!cache.is_empty().await);

        Scorable::done(&scorable, &item, state, &token).await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn candidates_on_one_recognizer_share_one_call() {
        let recognizer = Arc::new(Counting::new("r", "greet", 0.9));
        let cache = Arc::new(RecognitionCache::new());
        let shared: Arc<dyn Recognizer> = recognizer.clone();
        let both: Vec<ScorableRef<ResolverRef, IntentScore>> = vec![
            Arc::new(IntentScorable::new(Arc::clone(&shared), "weather", noop("forecast"))),
            Arc::new(IntentScorable::new(shared, "greet", noop("hello"))),
        ];

        let outcome = try_post(
            first(both).as_ref(),
            &item("hi", Some(Arc::clone(&cache))),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(outcome.is_handled());
        assert_eq!(recognizer.calls(), 1);
        // every candidate evicted its entry in done
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn entities_are_bound_by_kind() {
        struct Booking;

        #[async_trait]
        impl Recognizer for Booking {
            fn id(&self) -> &str {
                "booking"
            }

            async fn classify(
                &self,
                text: &str,
                _token: &CancellationToken,
            ) -> Result<Recognition, DispatchError> {
                Ok(Recognition::new(text)
                    .with_intent(IntentScore::new("book", 0.8))
                    .with_entity(Entity::new("city", "Paris").at(8))
                    .with_entity(Entity::new("date", "monday"))
                    .with_entity(Entity::new("date", "tuesday")))
            }
        }

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let method = Method::from_fn("book", move |args: Arguments, _| {
            let sink = Arc::clone(&sink);
            async move {
                let dates = match args.get("date") {
                    Some(Value::TextList(dates)) => dates.clone(),
                    other => return Err(DispatchError::other(format!("dates: {other:?}"))),
                };
                *sink.lock().unwrap() = Some((args.text("city").map(str::to_string), dates));
                Ok(())
            }
        })
        .param("city", &types::TEXT)
        .param("date", &types::TEXT_LIST);

        let scorable = IntentScorable::new(
            Arc::new(Booking),
            "book",
            MethodScorable::shared(Arc::new(method)),
        );

        let outcome = try_post::<_, IntentScore>(&scorable, &item("book to Paris", None), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_handled());
        assert_eq!(
            *seen.lock().unwrap(),
            Some((
                Some("Paris".to_string()),
                vec!["monday".to_string(), "tuesday".to_string()]
            ))
        );
    }

    #[test]
    fn confidence_orders_intents() {
        let unscored = IntentScore {
            intent: "none".into(),
            score: None,
        };
        assert_eq!(
            IntentComparer.compare(&IntentScore::new("a", 0.1), &unscored),
            Ok(Ordering::Greater)
        );
    }
}
