//! 遅延ロードされる感情分類器。
//!
//! モデルのロードは最初の分類要求で一度だけ行う。並行する呼び出しは
//! 初期化ガードで待たされ、失敗は `reset()` されるまで保持される。
//! モデル側の panic はここで捕捉し、行単位のエラーに変換する。
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{error, info, warn};

use super::label::{ClassifierError, Label, Prediction};
use crate::table::CellValue;

/// A loaded sentiment model. Implementations must be callable from several
/// threads at once.
pub trait SentimentModel: Send + Sync {
    /// # Errors
    /// Returns [`ClassifierError::InferenceFailed`] when the backend cannot
    /// produce a label for `text`.
    fn predict(&self, text: &str) -> Result<Label, ClassifierError>;
}

/// Produces the model on first use.
pub trait ModelLoader: Send + Sync {
    /// # Errors
    /// Any error leaves the classifier in the failed state.
    fn load(&self) -> anyhow::Result<Arc<dyn SentimentModel>>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> anyhow::Result<Arc<dyn SentimentModel>> + Send + Sync,
{
    fn load(&self) -> anyhow::Result<Arc<dyn SentimentModel>> {
        self()
    }
}

enum ModelState {
    Uninitialized,
    Ready(Arc<dyn SentimentModel>),
    Failed(String),
}

/// Externally visible model state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelStatus {
    Uninitialized,
    Ready,
    Failed { reason: String },
}

impl ModelStatus {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

pub struct SentimentClassifier {
    loader: Box<dyn ModelLoader>,
    state: RwLock<ModelState>,
    init_guard: Mutex<()>,
    load_attempts: AtomicUsize,
}

impl fmt::Debug for SentimentClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentimentClassifier")
            .field("status", &self.status())
            .field("load_attempts", &self.load_attempts())
            .finish_non_exhaustive()
    }
}

impl SentimentClassifier {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            state: RwLock::new(ModelState::Uninitialized),
            init_guard: Mutex::new(()),
            load_attempts: AtomicUsize::new(0),
        }
    }

    /// Wraps an already constructed model; no load ever runs.
    pub fn with_model(model: Arc<dyn SentimentModel>) -> Self {
        let loader_model = Arc::clone(&model);
        let classifier = Self::new(move || -> anyhow::Result<Arc<dyn SentimentModel>> {
            Ok(Arc::clone(&loader_model))
        });
        *classifier.state.write() = ModelState::Ready(model);
        classifier
    }

    /// Labels one text. Never panics; failures come back as the row's
    /// [`ClassifierError`].
    pub fn classify(&self, text: &str) -> Prediction {
        let model = self.model()?;
        match catch_unwind(AssertUnwindSafe(|| model.predict(text))) {
            Ok(prediction) => prediction,
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                warn!(error = %detail, "model panicked during inference");
                Err(ClassifierError::InferenceFailed { detail })
            }
        }
    }

    /// Labels a cell after text coercion (empty cells classify as `""`).
    pub fn classify_value(&self, value: &CellValue) -> Prediction {
        self.classify(&value.as_text())
    }

    #[must_use]
    pub fn status(&self) -> ModelStatus {
        match &*self.state.read() {
            ModelState::Uninitialized => ModelStatus::Uninitialized,
            ModelState::Ready(_) => ModelStatus::Ready,
            ModelState::Failed(reason) => ModelStatus::Failed {
                reason: reason.clone(),
            },
        }
    }

    /// Forces the lazy load without classifying anything.
    pub fn warm_up(&self) -> ModelStatus {
        let _ = self.model();
        self.status()
    }

    /// Clears a failed load so the next call tries again. Returns whether
    /// anything was reset.
    pub fn reset(&self) -> bool {
        let _guard = self.init_guard.lock();
        let mut state = self.state.write();
        if matches!(*state, ModelState::Failed(_)) {
            *state = ModelState::Uninitialized;
            info!("sentiment model state reset");
            true
        } else {
            false
        }
    }

    /// Number of load attempts performed so far.
    #[must_use]
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::Acquire)
    }

    fn current(&self) -> Option<Result<Arc<dyn SentimentModel>, ClassifierError>> {
        match &*self.state.read() {
            ModelState::Uninitialized => None,
            ModelState::Ready(model) => Some(Ok(Arc::clone(model))),
            ModelState::Failed(_) => Some(Err(ClassifierError::ModelUnavailable)),
        }
    }

    fn model(&self) -> Result<Arc<dyn SentimentModel>, ClassifierError> {
        if let Some(current) = self.current() {
            return current;
        }

        let _guard = self.init_guard.lock();
        // 待っている間に別スレッドがロードを終えている場合がある
        if let Some(current) = self.current() {
            return current;
        }

        let attempt = self.load_attempts.fetch_add(1, Ordering::AcqRel) + 1;
        info!(attempt, "loading sentiment model");
        let outcome = match catch_unwind(AssertUnwindSafe(|| self.loader.load())) {
            Ok(result) => result.map_err(|err| format!("{err:#}")),
            Err(payload) => Err(format!(
                "model loader panicked: {}",
                panic_message(payload.as_ref())
            )),
        };

        let mut state = self.state.write();
        match outcome {
            Ok(model) => {
                info!(attempt, "sentiment model ready");
                *state = ModelState::Ready(Arc::clone(&model));
                Ok(model)
            }
            Err(reason) => {
                error!(attempt, error = %reason, "sentiment model failed to load");
                *state = ModelState::Failed(reason);
                Err(ClassifierError::ModelUnavailable)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
