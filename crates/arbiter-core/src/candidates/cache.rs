//! RecognitionCache - pass 単位の recognizer 呼び出しキャッシュ
//!
//! 同じ pass の中で同じ recognizer に同じテキストを投げる candidate が
//! 複数あっても、外部呼び出しは 1 回だけにします。
//!
//! - キーは `(recognizer id, text)`
//! - 最初に要求した candidate が計算し、他は同じ `OnceCell` を待つ（single writer per key）
//! - キャッシュ自体は pass の開始時に作られ、resolver chain の `PASS_CACHE` として渡される
//! - 各 candidate は `done` で自分のエントリを evict する
//!
//! # 学習ポイント
//! - `tokio::sync::OnceCell::get_or_try_init` で「計算中の値」を共有する
//! - `tokio::select!` で cancellation と recognizer 呼び出しを競わせる

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{DispatchError, Recognition};
use crate::ports::Recognizer;

type Key = (String, String);

#[derive(Default)]
pub struct RecognitionCache {
    entries: Mutex<HashMap<Key, Arc<OnceCell<Arc<Recognition>>>>>,
}

impl RecognitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `text`, or joins a classification already started in this pass.
    ///
    /// A failed classification leaves the entry empty so a later caller retries.
    pub async fn get_or_classify(
        &self,
        recognizer: &dyn Recognizer,
        text: &str,
        token: &CancellationToken,
    ) -> Result<Arc<Recognition>, DispatchError> {
        let key = (recognizer.id().to_string(), text.to_string());
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key).or_default())
        };

        cell.get_or_try_init(|| async {
            debug!(recognizer = recognizer.id(), "classifying");
            classify(recognizer, text, token).await.map(Arc::new)
        })
        .await
        .map(Arc::clone)
    }

    pub async fn evict(&self, recognizer_id: &str, text: &str) {
        let key = (recognizer_id.to_string(), text.to_string());
        self.entries.lock().await.remove(&key);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Runs one classification, racing it against the pass token.
pub async fn classify(
    recognizer: &dyn Recognizer,
    text: &str,
    token: &CancellationToken,
) -> Result<Recognition, DispatchError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(DispatchError::Cancelled),
        result = recognizer.classify(text, token) => result.map_err(|fault| match fault {
            DispatchError::Cancelled | DispatchError::Recognizer { .. } => fault,
            other => DispatchError::Recognizer {
                recognizer: recognizer.id().to_string(),
                message: other.to_string(),
            },
        }),
    }
}
