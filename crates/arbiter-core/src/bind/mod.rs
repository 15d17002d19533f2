//! Bind - handler 宣言を resolver から束縛する
//!
//! - **method**: `Method`（パラメータ記述子 + `Handler`）と `Arguments`
//! - **binder**: `try_bind` と `Binding`
//! - **comparer**: overload を半順序で比べる `BindingComparer`

pub mod binder;
pub mod comparer;
pub mod method;

pub use self::binder::{Binding, try_bind};
pub use self::comparer::BindingComparer;
pub use self::method::{Arguments, FnHandler, Handler, Method, Parameter, ParameterKind};
