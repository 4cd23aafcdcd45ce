use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use parking_lot::Mutex;
use rust_bert::pipelines::common::{ModelResource, ModelType};
use rust_bert::pipelines::sequence_classification::{
    SequenceClassificationConfig, SequenceClassificationModel,
};
use rust_bert::resources::LocalResource;
use tracing::info;

use super::adapter::{ModelLoader, SentimentModel};
use super::label::{ClassifierError, Label};

const CONFIG_FILE: &str = "config.json";
const VOCAB_FILE: &str = "vocab.txt";
const WEIGHTS_FILE: &str = "rust_model.ot";

/// Location and tokenizer options of the fine-tuned BERT sentiment model.
#[derive(Debug, Clone)]
pub struct BertModelSettings {
    model_dir: PathBuf,
    lower_case: bool,
}

impl BertModelSettings {
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>, lower_case: bool) -> Self {
        Self {
            model_dir: model_dir.into(),
            lower_case,
        }
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    fn resource(&self, file: &str) -> Result<PathBuf> {
        let path = self.model_dir.join(file);
        if !path.is_file() {
            bail!("model file {} does not exist", path.display());
        }
        Ok(path)
    }
}

impl ModelLoader for BertModelSettings {
    fn load(&self) -> Result<Arc<dyn SentimentModel>> {
        Ok(Arc::new(RustBertSentimentModel::new(self)?))
    }
}

/// rust-bert sequence classification head over local weights. CPU only.
pub struct RustBertSentimentModel {
    model: Mutex<SequenceClassificationModel>,
}

impl fmt::Debug for RustBertSentimentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RustBertSentimentModel")
            .field("model", &"<SequenceClassificationModel>")
            .finish()
    }
}

impl RustBertSentimentModel {
    /// Loads the model from `settings.model_dir`.
    ///
    /// # Errors
    /// Returns an error when a resource file is missing or libtorch rejects
    /// the weights.
    pub fn new(settings: &BertModelSettings) -> Result<Self> {
        let weights = settings.resource(WEIGHTS_FILE)?;
        let config_path = settings.resource(CONFIG_FILE)?;
        let vocab = settings.resource(VOCAB_FILE)?;
        let lower_case = settings.lower_case;

        let config = SequenceClassificationConfig::new(
            ModelType::Bert,
            ModelResource::Torch(Box::new(LocalResource::from(weights))),
            LocalResource::from(config_path),
            LocalResource::from(vocab),
            None,
            lower_case,
            None,
            None,
        );

        // ロードは重くブロッキングなので専用スレッドで行う
        let model = std::thread::spawn(move || SequenceClassificationModel::new(config))
            .join()
            .map_err(|_| anyhow!("Failed to join model creation thread"))?
            .context("failed to build sequence classification model")?;

        info!(model_dir = %settings.model_dir.display(), "rust-bert sentiment model loaded");
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl SentimentModel for RustBertSentimentModel {
    fn predict(&self, text: &str) -> Result<Label, ClassifierError> {
        let model = self.model.lock();
        let output = model.predict([text]);
        let label = output
            .first()
            .ok_or_else(|| ClassifierError::inference("model returned no label"))?;
        usize::try_from(label.id)
            .ok()
            .and_then(Label::from_model_index)
            .ok_or_else(|| ClassifierError::inference(format!("unexpected class id {}", label.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_resources_fail_the_load() {
        let dir = TempDir::new().expect("tempdir");
        let settings = BertModelSettings::new(dir.path(), true);

        let error = settings.load().err().expect("no weights present");
        assert!(error.to_string().contains(WEIGHTS_FILE));
    }

    #[test]
    fn classifier_reports_missing_model_as_unavailable() {
        let dir = TempDir::new().expect("tempdir");
        let classifier =
            crate::classifier::SentimentClassifier::new(BertModelSettings::new(dir.path(), true));

        assert_eq!(
            classifier.classify("Produk ini bagus"),
            Err(ClassifierError::ModelUnavailable)
        );
        assert!(classifier.status().is_failed());
    }
}
