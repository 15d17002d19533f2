//! Dispatcher - 1 つの activity に対して 1 回の dispatch pass を実行する
//!
//! ```text
//! Activity ──▶ ActivityResolver → ServiceResolver(services + PASS_CACHE) → NullResolver
//!                    │
//!                    ▼
//!          scorable (factory が build 時に組み立て済み)
//!                    │  prepare → has_score → get_score → post → done
//!                    ▼
//!                 Outcome
//! ```
//!
//! # 学習ポイント
//! - Builder パターンと起動時検証（Fail-fast 設計）
//! - pass ごとの `RecognitionCache` を resolver chain 経由で渡す（グローバル状態なし）
//! - `tracing::Instrument` で pass 全体を span に入れる

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use super::config::{ConfigError, DispatchConfig};
use super::factory::ScorableFactory;
use super::registry::{HandlerRegistry, Registration, RegistryError};
use crate::candidates::RecognitionCache;
use crate::domain::types;
use crate::domain::{Activity, DispatchError, Outcome, PassId, Value};
use crate::impls::{ActivityResolver, NullResolver, Service, ServiceResolver};
use crate::ports::ResolverRef;
use crate::scorable::{DispatchHooks, NoHooks, ScorableRef, run_with_hooks};

/// DispatcherBuilder は Dispatcher を構築
///
/// # 使用例
/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .register(Registration::new(joke).in_band(0).on_pattern("joke"))?
///     .register(Registration::new(help).in_band(9))?
///     .expect_handlers(&["joke", "help"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - 名前の重複は register() 時点で `RegistryError`
/// - build() 時に「期待集合 ⊆ 登録済み集合」、pattern のコンパイル、設定値をチェック
pub struct DispatcherBuilder {
    registry: HandlerRegistry,
    config: DispatchConfig,
    hooks: Arc<dyn DispatchHooks<ResolverRef, f64>>,
    services: Vec<Service>,
    expected_handlers: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing handlers: {0:?}. These handlers were expected but not registered.")]
    MissingHandlers(Vec<String>),
    #[error("Invalid trigger pattern: {0}")]
    Pattern(DispatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            config: DispatchConfig::default(),
            hooks: Arc::new(NoHooks),
            services: Vec::new(),
            expected_handlers: None,
        }
    }

    pub fn register(mut self, registration: Registration) -> Result<Self, RegistryError> {
        self.registry.register(registration)?;
        Ok(self)
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hooks(mut self, hooks: impl DispatchHooks<ResolverRef, f64> + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Adds an ambient value every handler can bind.
    pub fn service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn expect_handlers(mut self, names: &[&str]) -> Self {
        self.expected_handlers = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if let Some(expected) = &self.expected_handlers {
            let registered = self.registry.registered_names();
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !registered.contains(name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingHandlers(missing));
            }
        }

        self.config.validate()?;
        let scorable = ScorableFactory::new(self.config.clone())
            .scorable_for(&self.registry)
            .map_err(BuildError::Pattern)?;

        Ok(Dispatcher {
            scorable,
            services: self.services,
            hooks: self.hooks,
            handlers: self.registry.registered_names(),
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatcher は dispatch pass のランタイム
///
/// `dispatch` は `&self` なので、別々の activity の pass を並行に走らせられます。
/// pass 間で共有される可変状態はありません。
pub struct Dispatcher {
    scorable: ScorableRef<ResolverRef, f64>,
    services: Vec<Service>,
    hooks: Arc<dyn DispatchHooks<ResolverRef, f64>>,
    handlers: Vec<String>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Registered handler names in declaration order.
    pub fn handlers(&self) -> &[String] {
        &self.handlers
    }

    /// Runs one pass for `activity`.
    ///
    /// `Ok` reports whether a handler took the activity; `Err` carries the
    /// winner's fault, a ranking inconsistency or a cancellation, aggregated
    /// with any cleanup faults.
    pub async fn dispatch(
        &self,
        activity: Activity,
        token: &CancellationToken,
    ) -> Result<Outcome, DispatchError> {
        let pass = PassId::generate();
        let span = info_span!("dispatch", pass = %pass, activity = %activity.id);
        self.run(Arc::new(activity), token).instrument(span).await
    }

    pub async fn dispatch_text(
        &self,
        text: &str,
        token: &CancellationToken,
    ) -> Result<Outcome, DispatchError> {
        self.dispatch(Activity::message(text), token).await
    }

    /// The resolver chain one pass sees as its item.
    fn item_for(&self, activity: Arc<Activity>, cache: Arc<RecognitionCache>) -> ResolverRef {
        let mut services = self.services.clone();
        services.push(Service::new(&types::PASS_CACHE, Value::Object(cache)));

        let root: ResolverRef = Arc::new(NullResolver);
        let ambient: ResolverRef = Arc::new(ServiceResolver::new(services, root));
        Arc::new(ActivityResolver::new(activity, ambient))
    }

    async fn run(
        &self,
        activity: Arc<Activity>,
        token: &CancellationToken,
    ) -> Result<Outcome, DispatchError> {
        let item = self.item_for(activity, Arc::new(RecognitionCache::new()));
        let result = run_with_hooks(self.scorable.as_ref(), &item, self.hooks.as_ref(), token).await;

        match &result {
            Ok(outcome) => info!(
                outcome = ?outcome.kind,
                cleanup_faults = outcome.cleanup_faults.len(),
                "pass finished"
            ),
            Err(fault) => warn!(error = %fault, "pass failed"),
        }
        result
    }
}
