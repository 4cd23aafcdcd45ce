use std::{
    env,
    net::SocketAddr,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;

use crate::wordcloud::WordCloudConfig;

/// ワードクラウド画像の一辺の上限 (px)。RGBA バッファが 64 MiB を超えないようにする。
const MAX_WORDCLOUD_SIDE: u32 = 4096;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    model_dir: PathBuf,
    model_lower_case: bool,
    model_warmup: bool,
    upload_dir: PathBuf,
    export_dir: PathBuf,
    export_max_age: Duration,
    export_sweep_interval: Duration,
    max_upload_bytes: usize,
    analysis_timeout: Duration,
    labeler_threads: NonZeroUsize,
    wordcloud_width: u32,
    wordcloud_height: u32,
    wordcloud_max_words: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から Sentiment Worker の設定値を読み込み、検証する。
    ///
    /// すべての値にデフォルトがあるため、未設定の変数はエラーにならない。
    ///
    /// # Errors
    /// 数値・アドレス・真偽値のパースに失敗した場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// `lookup` が返す値から設定を構築する。`from_env` の実体。
    ///
    /// # Errors
    /// 値のパースに失敗した場合は [`ConfigError`] を返す。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let http_bind = vars.socket_addr("SENTIMENT_HTTP_BIND", "0.0.0.0:5000")?;
        let model_dir = vars.path("SENTIMENT_MODEL_DIR", "models/indobert-sentiment");
        let model_lower_case = vars.bool("SENTIMENT_MODEL_LOWERCASE", true)?;
        let model_warmup = vars.bool("SENTIMENT_MODEL_WARMUP", false)?;

        let upload_dir = vars.path("SENTIMENT_UPLOAD_DIR", "uploads");
        let export_dir = vars.path("SENTIMENT_EXPORT_DIR", "exports");
        let export_max_age = vars.positive_duration_secs("SENTIMENT_EXPORT_MAX_AGE_SECS", 3600)?;
        let export_sweep_interval =
            vars.positive_duration_secs("SENTIMENT_EXPORT_SWEEP_INTERVAL_SECS", 600)?;

        // 16 MiB
        let max_upload_bytes = vars
            .non_zero_usize("SENTIMENT_MAX_UPLOAD_BYTES", 16 * 1024 * 1024)?
            .get();
        let analysis_timeout = vars.positive_duration_secs("SENTIMENT_ANALYSIS_TIMEOUT_SECS", 300)?;
        let labeler_threads = vars.non_zero_usize("SENTIMENT_LABELER_THREADS", num_cpus::get())?;

        let wordcloud_width =
            vars.bounded_u32("SENTIMENT_WORDCLOUD_WIDTH", 800, MAX_WORDCLOUD_SIDE)?;
        let wordcloud_height =
            vars.bounded_u32("SENTIMENT_WORDCLOUD_HEIGHT", 400, MAX_WORDCLOUD_SIDE)?;
        let wordcloud_max_words = vars.non_zero_usize("SENTIMENT_WORDCLOUD_MAX_WORDS", 200)?;

        Ok(Self {
            http_bind,
            model_dir,
            model_lower_case,
            model_warmup,
            upload_dir,
            export_dir,
            export_max_age,
            export_sweep_interval,
            max_upload_bytes,
            analysis_timeout,
            labeler_threads,
            wordcloud_width,
            wordcloud_height,
            wordcloud_max_words,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    #[must_use]
    pub fn model_lower_case(&self) -> bool {
        self.model_lower_case
    }

    #[must_use]
    pub fn model_warmup(&self) -> bool {
        self.model_warmup
    }

    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    #[must_use]
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    #[must_use]
    pub fn export_max_age(&self) -> Duration {
        self.export_max_age
    }

    #[must_use]
    pub fn export_sweep_interval(&self) -> Duration {
        self.export_sweep_interval
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    #[must_use]
    pub fn analysis_timeout(&self) -> Duration {
        self.analysis_timeout
    }

    #[must_use]
    pub fn labeler_threads(&self) -> NonZeroUsize {
        self.labeler_threads
    }

    /// Word cloud settings; the minimum font size is fixed at 10.
    #[must_use]
    pub fn word_cloud(&self) -> WordCloudConfig {
        WordCloudConfig {
            width: self.wordcloud_width,
            height: self.wordcloud_height,
            max_words: self.wordcloud_max_words.get(),
            ..WordCloudConfig::default()
        }
    }

    /// Overrides the directories, used by tests and embedders.
    #[must_use]
    pub fn with_storage_dirs(
        mut self,
        upload_dir: impl Into<PathBuf>,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        self.upload_dir = upload_dir.into();
        self.export_dir = export_dir.into();
        self
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &'static str, default: impl ToString) -> String {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    fn path(&self, name: &'static str, default: &str) -> PathBuf {
        PathBuf::from(self.raw(name, default))
    }

    fn socket_addr(&self, name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
        let raw = self.raw(name, default);
        raw.parse().map_err(|error| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(error),
        })
    }

    fn u64(&self, name: &'static str, default: u64) -> Result<u64, ConfigError> {
        let raw = self.raw(name, default);
        raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(error),
        })
    }

    fn non_zero_usize(&self, name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
        let raw = self.raw(name, default);
        let parsed = raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(error),
        })?;
        NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be greater than zero"),
        })
    }

    fn positive_u32(&self, name: &'static str, default: u32) -> Result<u32, ConfigError> {
        let raw = self.raw(name, default);
        let parsed = raw.parse::<u32>().map_err(|error| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(error),
        })?;
        if parsed == 0 {
            return Err(ConfigError::Invalid {
                name,
                source: anyhow::anyhow!("must be greater than zero"),
            });
        }
        Ok(parsed)
    }

    fn bounded_u32(
        &self,
        name: &'static str,
        default: u32,
        max: u32,
    ) -> Result<u32, ConfigError> {
        let parsed = self.positive_u32(name, default)?;
        if parsed > max {
            return Err(ConfigError::Invalid {
                name,
                source: anyhow::anyhow!("must be at most {max}"),
            });
        }
        Ok(parsed)
    }

    fn positive_duration_secs(
        &self,
        name: &'static str,
        default_secs: u64,
    ) -> Result<Duration, ConfigError> {
        let value = self.u64(name, default_secs)?;
        if value == 0 {
            return Err(ConfigError::Invalid {
                name,
                source: anyhow::anyhow!("must be greater than zero"),
            });
        }
        Ok(Duration::from_secs(value))
    }

    fn bool(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        let raw = self.raw(name, default);
        match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                source: anyhow::anyhow!("invalid boolean value: {raw}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn set_env(name: &str, value: &str) {
        // SAFETY: tests run sequentially and assign valid UTF-8 values.
        unsafe {
            env::set_var(name, value);
        }
    }

    fn remove_env(name: &str) {
        // SAFETY: tests run sequentially and clean up deterministic keys.
        unsafe {
            env::remove_var(name);
        }
    }

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = from_pairs(&[]).expect("defaults load");

        assert_eq!(config.http_bind(), "0.0.0.0:5000".parse().expect("addr"));
        assert_eq!(config.model_dir(), Path::new("models/indobert-sentiment"));
        assert!(config.model_lower_case());
        assert!(!config.model_warmup());
        assert_eq!(config.export_dir(), Path::new("exports"));
        assert_eq!(config.export_max_age(), Duration::from_secs(3600));
        assert_eq!(config.export_sweep_interval(), Duration::from_secs(600));
        assert_eq!(config.max_upload_bytes(), 16 * 1024 * 1024);
        assert_eq!(config.analysis_timeout(), Duration::from_secs(300));
        assert_eq!(config.labeler_threads().get(), num_cpus::get().max(1));

        let word_cloud = config.word_cloud();
        assert_eq!((word_cloud.width, word_cloud.height), (800, 400));
        assert_eq!(word_cloud.max_words, 200);
        assert_eq!(word_cloud.min_font_size, 10);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_pairs(&[
            ("SENTIMENT_HTTP_BIND", "127.0.0.1:8080"),
            ("SENTIMENT_MODEL_LOWERCASE", "off"),
            ("SENTIMENT_MODEL_WARMUP", "yes"),
            ("SENTIMENT_EXPORT_MAX_AGE_SECS", "60"),
            ("SENTIMENT_LABELER_THREADS", "3"),
            ("SENTIMENT_WORDCLOUD_MAX_WORDS", "50"),
        ])
        .expect("overrides load");

        assert_eq!(config.http_bind().port(), 8080);
        assert!(!config.model_lower_case());
        assert!(config.model_warmup());
        assert_eq!(config.export_max_age(), Duration::from_secs(60));
        assert_eq!(config.labeler_threads().get(), 3);
        assert_eq!(config.word_cloud().max_words, 50);
    }

    #[test]
    fn zero_values_are_rejected() {
        for name in [
            "SENTIMENT_LABELER_THREADS",
            "SENTIMENT_EXPORT_MAX_AGE_SECS",
            "SENTIMENT_WORDCLOUD_WIDTH",
            "SENTIMENT_MAX_UPLOAD_BYTES",
        ] {
            let error = from_pairs(&[(name, "0")]).expect_err("zero rejected");
            assert!(matches!(error, ConfigError::Invalid { name: n, .. } if n == name));
        }
    }

    #[test]
    fn word_cloud_canvas_is_capped() {
        for name in ["SENTIMENT_WORDCLOUD_WIDTH", "SENTIMENT_WORDCLOUD_HEIGHT"] {
            let error = from_pairs(&[(name, "5000")]).expect_err("oversized canvas rejected");
            assert!(matches!(error, ConfigError::Invalid { name: n, .. } if n == name));
            assert!(error.to_string().contains(name));
        }

        let config = from_pairs(&[
            ("SENTIMENT_WORDCLOUD_WIDTH", "4096"),
            ("SENTIMENT_WORDCLOUD_HEIGHT", "4096"),
        ])
        .expect("upper bound is inclusive");
        let word_cloud = config.word_cloud();
        assert_eq!((word_cloud.width, word_cloud.height), (4096, 4096));
    }

    #[test]
    fn invalid_boolean_names_the_variable() {
        let error = from_pairs(&[("SENTIMENT_MODEL_WARMUP", "maybe")]).expect_err("invalid");
        assert!(error.to_string().contains("SENTIMENT_MODEL_WARMUP"));
    }

    #[test]
    fn from_env_reads_process_environment() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        set_env("SENTIMENT_EXPORT_DIR", "/tmp/sentiment-exports");
        set_env("SENTIMENT_ANALYSIS_TIMEOUT_SECS", "42");

        let config = Config::from_env().expect("config loads");
        assert_eq!(config.export_dir(), Path::new("/tmp/sentiment-exports"));
        assert_eq!(config.analysis_timeout(), Duration::from_secs(42));

        remove_env("SENTIMENT_EXPORT_DIR");
        remove_env("SENTIMENT_ANALYSIS_TIMEOUT_SECS");
    }
}
