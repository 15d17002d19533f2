//! Method - handler 宣言（パラメータ記述子 + 呼び出し対象）
//!
//! リフレクションの代わりに、パラメータを `(name, &'static TypeTag)` の列で宣言します。
//!
//! # 使用例
//! ```ignore
//! let greet = Method::from_fn("greet", |args: Arguments, _token| async move {
//!     println!("hello {}", args.text("name").unwrap_or("there"));
//!     Ok(())
//! })
//! .param("name", &types::TEXT);
//! ```
//!
//! # 学習ポイント
//! - クロージャを `Handler` trait object に包む（`FnHandler`）
//! - Builder パターンでパラメータを積む

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::types::{self, TypeTag};
use crate::domain::{Activity, DispatchError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// Binding fails when nothing resolves it.
    Required,
    /// Bound to `Value::Absent` when nothing resolves it.
    Optional,
    /// Supplied by the engine; never asked of a resolver.
    Cancellation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: &'static TypeTag,
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn required(name: impl Into<String>, ty: &'static TypeTag) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: ParameterKind::Required,
        }
    }

    pub fn optional(name: impl Into<String>, ty: &'static TypeTag) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: ParameterKind::Optional,
        }
    }

    pub fn cancellation(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: &types::CANCELLATION,
            kind: ParameterKind::Cancellation,
        }
    }
}

/// The body of a handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, args: Arguments, token: &CancellationToken)
    -> Result<(), DispatchError>;
}

/// Adapts an async closure to [`Handler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Arguments, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DispatchError>> + Send + 'static,
{
    async fn invoke(
        &self,
        args: Arguments,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        (self.0)(args, token.clone()).await
    }
}

pub struct Method {
    name: String,
    parameters: Vec<Parameter>,
    handler: Arc<dyn Handler>,
}

impl Method {
    pub fn new(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arguments, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DispatchError>> + Send + 'static,
    {
        Self::new(name, FnHandler(f))
    }

    /// Adds a required parameter.
    pub fn param(self, name: impl Into<String>, ty: &'static TypeTag) -> Self {
        self.with(Parameter::required(name, ty))
    }

    pub fn optional(self, name: impl Into<String>, ty: &'static TypeTag) -> Self {
        self.with(Parameter::optional(name, ty))
    }

    pub fn cancellation(self, name: impl Into<String>) -> Self {
        self.with(Parameter::cancellation(name))
    }

    pub fn with(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Resolved arguments handed to a handler, addressable by parameter name.
#[derive(Debug, Clone)]
pub struct Arguments {
    method: Arc<Method>,
    values: Vec<Value>,
}

impl Arguments {
    pub(crate) fn new(method: Arc<Method>, values: Vec<Value>) -> Self {
        Self { method, values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.method
            .parameters
            .iter()
            .position(|p| p.name == name)
            .and_then(|i| self.values.get(i))
            .filter(|v| !v.is_absent())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn activity(&self, name: &str) -> Option<&Arc<Activity>> {
        self.get(name).and_then(Value::as_activity)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn method_name(&self) -> &str {
        &self.method.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_parameters_in_order() {
        let m = Method::from_fn("m", |_, _| async { Ok::<_, DispatchError>(()) })
            .param("who", &types::TEXT)
            .optional("when", &types::NUMBER)
            .cancellation("token");

        let kinds: Vec<ParameterKind> = m.parameters().iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            [
                ParameterKind::Required,
                ParameterKind::Optional,
                ParameterKind::Cancellation
            ]
        );
        assert_eq!(m.parameters()[2].ty, &types::CANCELLATION);
    }

    #[test]
    fn arguments_are_looked_up_by_name() {
        let m = Arc::new(
            Method::from_fn("m", |_, _| async { Ok::<_, DispatchError>(()) })
                .param("who", &types::TEXT)
                .optional("when", &types::NUMBER),
        );
        let args = Arguments::new(m, vec![Value::from("bob"), Value::Absent]);

        assert_eq!(args.text("who"), Some("bob"));
        assert!(args.get("when").is_none());
        assert!(args.get("missing").is_none());
    }

    #[tokio::test]
    async fn closures_run_as_handlers() {
        let m = Arc::new(
            Method::from_fn("echo", |args: Arguments, _| async move {
                match args.text("what") {
                    Some("ping") => Ok(()),
                    other => Err(DispatchError::other(format!("unexpected {other:?}"))),
                }
            })
            .param("what", &types::TEXT),
        );
        let args = Arguments::new(Arc::clone(&m), vec![Value::from("ping")]);

        m.handler()
            .invoke(args, &CancellationToken::new())
            .await
            .unwrap();
    }
}
