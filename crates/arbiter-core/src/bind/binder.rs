//! Binder - パラメータを resolver から解決して Binding を作る
//!
//! 各パラメータは次の順で引きます。
//! 1. `(型, パラメータ名)`
//! 2. `(型, タグなし)`
//!
//! 必須パラメータが 1 つでも解決できなければ `None`（エラーではなく「参加しない」）。
//! cancellation パラメータは resolver に聞かず、pass の token をそのまま渡します。

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::method::{Arguments, Method, ParameterKind};
use crate::domain::{DispatchError, Value};
use crate::ports::Resolver;

/// A method with every parameter resolved.
#[derive(Clone)]
pub struct Binding {
    method: Arc<Method>,
    arguments: Vec<Value>,
}

impl Binding {
    pub fn method(&self) -> &Arc<Method> {
        &self.method
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Runs the handler; faults other than cancellation become `Invocation`.
    pub async fn invoke(&self, token: &CancellationToken) -> Result<(), DispatchError> {
        let args = Arguments::new(Arc::clone(&self.method), self.arguments.clone());
        self.method
            .handler()
            .invoke(args, token)
            .await
            .map_err(|fault| match fault {
                DispatchError::Cancelled | DispatchError::Invocation { .. } => fault,
                other => DispatchError::Invocation {
                    handler: self.method.name().to_string(),
                    message: other.to_string(),
                },
            })
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.method.handler(), other.method.handler())
            && self.arguments == other.arguments
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("method", &self.method.name())
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// Resolves every parameter of `method`, or returns `None` if a required one is missing.
pub fn try_bind(
    method: &Arc<Method>,
    resolver: &dyn Resolver,
    token: &CancellationToken,
) -> Option<Binding> {
    let mut arguments = Vec::with_capacity(method.parameters().len());
    for parameter in method.parameters() {
        let value = match parameter.kind {
            ParameterKind::Cancellation => Value::Cancellation(token.clone()),
            kind => {
                let found = resolver
                    .try_resolve(parameter.ty, Some(&parameter.name))
                    .or_else(|| resolver.try_resolve(parameter.ty, None));
                match (found, kind) {
                    (Some(value), _) => value,
                    (None, ParameterKind::Optional) => Value::Absent,
                    (None, _) => {
                        trace!(
                            method = method.name(),
                            parameter = %parameter.name,
                            ty = %parameter.ty,
                            "parameter not resolvable"
                        );
                        return None;
                    }
                }
            }
        };
        arguments.push(value);
    }
    Some(Binding {
        method: Arc::clone(method),
        arguments,
    })
}
