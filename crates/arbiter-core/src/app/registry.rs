//! HandlerRegistry - handler 宣言の登録
//!
//! 属性による自動発見の代わりに、呼び出し側が `Registration` を組み立てて登録します。
//! 1 つの handler に付けられるもの:
//! - priority band（なければ宣言順の専用 band）
//! - trigger pattern（0 個以上）
//! - (recognizer, intent) の組（0 個以上）
//!
//! # 使用例
//! ```ignore
//! let mut registry = HandlerRegistry::new();
//! registry.register(
//!     Registration::new(Method::from_fn("joke", tell_joke))
//!         .in_band(0)
//!         .on_pattern("joke"),
//! )?;
//! ```
//!
//! # 学習ポイント
//! - 宣言順を保つため `Vec` に積み、名前の重複は `HashSet` で検出する

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::bind::Method;
use crate::ports::Recognizer;

#[derive(Clone)]
pub struct IntentTrigger {
    pub recognizer: Arc<dyn Recognizer>,
    pub intent: String,
}

impl fmt::Debug for IntentTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.recognizer.id(), self.intent)
    }
}

/// One handler declaration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub method: Arc<Method>,
    pub band: Option<i32>,
    pub patterns: Vec<String>,
    pub intents: Vec<IntentTrigger>,
}

impl Registration {
    pub fn new(method: Method) -> Self {
        Self {
            method: Arc::new(method),
            band: None,
            patterns: Vec::new(),
            intents: Vec::new(),
        }
    }

    /// Lower bands are evaluated first.
    pub fn in_band(mut self, band: i32) -> Self {
        self.band = Some(band);
        self
    }

    pub fn on_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn on_intent(mut self, recognizer: Arc<dyn Recognizer>, intent: impl Into<String>) -> Self {
        self.intents.push(IntentTrigger {
            recognizer,
            intent: intent.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        self.method.name()
    }

    /// Neither a pattern nor an intent triggers this handler.
    pub fn is_plain(&self) -> bool {
        self.patterns.is_empty() && self.intents.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Handler declarations in registration order.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
    names: HashSet<String>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: Registration) -> Result<(), RegistryError> {
        let name = registration.name().to_string();
        if !self.names.insert(name.clone()) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.registrations.push(registration);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.name() == name)
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.registrations
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DispatchError;

    fn method(name: &str) -> Method {
        Method::from_fn(name, |_, _| async { Ok::<_, DispatchError>(()) })
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Registration::new(method("joke")).in_band(0).on_pattern("joke"))
            .unwrap();

        let joke = registry.get("joke").unwrap();
        assert_eq!(joke.band, Some(0));
        assert_eq!(joke.patterns, ["joke"]);
        assert!(!joke.is_plain());
    }

    #[test]
    fn test_double_registration() {
        let mut registry = HandlerRegistry::new();
        registry.register(Registration::new(method("help"))).unwrap();

        let result = registry.register(Registration::new(method("help")).in_band(3));

        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(name)) if name == "help"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registered_names_keep_declaration_order() {
        let mut registry = HandlerRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(Registration::new(method(name))).unwrap();
        }
        assert_eq!(registry.registered_names(), ["c", "a", "b"]);
    }
}
