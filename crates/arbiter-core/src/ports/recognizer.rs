//! Recognizer port - intent/entity 分類のバックエンド
//!
//! 外部サービス（統計的 intent 分類など）の wire protocol は扱いません。
//! 開発用の実装は `impls::keyword_recognizer` にあります。

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{DispatchError, Recognition};

#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Stable identifier; part of the pass cache key.
    fn id(&self) -> &str;

    async fn classify(
        &self,
        text: &str,
        token: &CancellationToken,
    ) -> Result<Recognition, DispatchError>;
}
