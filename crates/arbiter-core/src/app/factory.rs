//! ScorableFactory - 登録済み handler から 1 つの scorable を組み立てる
//!
//! ```text
//! first [                                   ← band 間: 最初に score を持った band
//!   fold_normalized [                       ← band 内: 正規化 score で winner-take-all
//!     regex(pattern,  Fold<Method>)  → coverage
//!     intent(r:name,  Fold<Method>)  → confidence (threshold 未満は除外)
//!     plain(          Fold<Method>)  → method_score
//!   ],
//!   ...
//! ]
//! ```
//!
//! - band は番号の昇順。band なしの handler は宣言順にそれぞれ専用の band を持ち、
//!   明示的な band の後ろに並ぶ
//! - band 内の group は最初に宣言された順
//! - group 内の overload は `BindingComparer` で順位付け（重複 binding は除外）
//!
//! 組み立ては build 時に 1 回だけ。scorable は stateless なので全 pass で共有します。

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::config::DispatchConfig;
use super::registry::{HandlerRegistry, IntentTrigger};
use crate::bind::{Binding, BindingComparer, Method};
use crate::candidates::{IntentScorable, MethodScorable, RegexScorable};
use crate::domain::{DispatchError, IntentScore, PatternMatch};
use crate::impls::RegexPattern;
use crate::ports::{Pattern, ResolverRef};
use crate::scorable::{Fold, ScorableExt, ScorableRef, WinnerTakeAll, first, fold_normalized};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BandKey {
    Explicit(i32),
    /// Declaration index of an unbanded handler.
    Implicit(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GroupKey {
    Pattern(String),
    Intent { recognizer: String, intent: String },
    Plain,
}

enum Trigger {
    Pattern(Arc<dyn Pattern>),
    Intent(IntentTrigger),
    Plain,
}

struct Group {
    key: GroupKey,
    trigger: Trigger,
    methods: Vec<Arc<Method>>,
}

#[derive(Default)]
struct Band {
    groups: Vec<Group>,
}

impl Band {
    fn add(&mut self, key: GroupKey, trigger: impl FnOnce() -> Trigger, method: &Arc<Method>) {
        match self.groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.methods.push(Arc::clone(method)),
            None => self.groups.push(Group {
                key,
                trigger: trigger(),
                methods: vec![Arc::clone(method)],
            }),
        }
    }
}

pub struct ScorableFactory {
    config: DispatchConfig,
}

impl ScorableFactory {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Compiles every trigger pattern and folds the handlers into one scorable.
    pub fn scorable_for(
        &self,
        registry: &HandlerRegistry,
    ) -> Result<ScorableRef<ResolverRef, f64>, DispatchError> {
        let mut bands: BTreeMap<BandKey, Band> = BTreeMap::new();

        for (index, registration) in registry.registrations().iter().enumerate() {
            let key = match registration.band {
                Some(band) => BandKey::Explicit(band),
                None => BandKey::Implicit(index),
            };
            let band = bands.entry(key).or_default();
            let method = &registration.method;

            for source in &registration.patterns {
                let pattern: Arc<dyn Pattern> =
                    Arc::new(RegexPattern::new(source, self.config.case_insensitive_patterns)?);
                band.add(GroupKey::Pattern(source.clone()), || Trigger::Pattern(pattern), method);
            }
            for trigger in &registration.intents {
                let key = GroupKey::Intent {
                    recognizer: trigger.recognizer.id().to_string(),
                    intent: trigger.intent.to_lowercase(),
                };
                band.add(key, || Trigger::Intent(trigger.clone()), method);
            }
            if registration.is_plain() {
                band.add(GroupKey::Plain, || Trigger::Plain, method);
            }
        }

        let mut folded = Vec::with_capacity(bands.len());
        for (key, band) in bands {
            debug!(band = ?key, groups = band.groups.len(), "band assembled");
            let groups = band.groups.into_iter().map(|g| self.group(g)).collect();
            folded.push(fold_normalized(groups, self.config.traits));
        }
        Ok(first(folded))
    }

    fn group(&self, group: Group) -> ScorableRef<ResolverRef, f64> {
        let overloads: ScorableRef<ResolverRef, Binding> = Fold::new(
            group.methods.into_iter().map(MethodScorable::shared).collect(),
            Arc::new(BindingComparer),
            Arc::new(WinnerTakeAll),
        )
        .distinct()
        .into_scorable();

        match group.trigger {
            Trigger::Pattern(pattern) => {
                let regex: ScorableRef<ResolverRef, Arc<PatternMatch>> =
                    Arc::new(RegexScorable::new(pattern, overloads));
                regex.select_score(|_, matched: &Arc<PatternMatch>| matched.coverage())
            }
            Trigger::Intent(trigger) => {
                let threshold = self.config.intent_threshold;
                let intent: ScorableRef<ResolverRef, IntentScore> = Arc::new(IntentScorable::new(
                    trigger.recognizer,
                    trigger.intent,
                    overloads,
                ));
                intent
                    .where_score(move |_, score: &IntentScore| score.confidence() >= threshold)
                    .select_score(|_, score: &IntentScore| score.confidence())
            }
            Trigger::Plain => {
                let score = self.config.method_score;
                overloads.select_score(move |_, _: &Binding| score)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::registry::Registration;
    use crate::scorable::DynScorable;

    #[test]
    fn implicit_bands_follow_explicit_ones_in_declaration_order() {
        let mut keys = vec![
            BandKey::Implicit(3),
            BandKey::Explicit(5),
            BandKey::Implicit(0),
            BandKey::Explicit(-1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            [
                BandKey::Explicit(-1),
                BandKey::Explicit(5),
                BandKey::Implicit(0),
                BandKey::Implicit(3)
            ]
        );
    }

    #[test]
    fn invalid_patterns_fail_the_build() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                Registration::new(Method::from_fn("broken", |_, _| async {
                    Ok::<_, DispatchError>(())
                }))
                .on_pattern("(unclosed"),
            )
            .unwrap();

        let result = ScorableFactory::new(DispatchConfig::default()).scorable_for(&registry);

        assert!(matches!(result, Err(DispatchError::InvalidPattern { pattern, .. }) if pattern == "(unclosed"));
    }

    #[test]
    fn empty_registry_folds_to_null() {
        let scorable = ScorableFactory::new(DispatchConfig::default())
            .scorable_for(&HandlerRegistry::new())
            .unwrap();
        assert!(scorable.is_null_dyn());
    }
}
