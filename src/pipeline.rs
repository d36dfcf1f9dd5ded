//! Per-prompt pipeline and batch orchestration.
//!
//! Each prompt runs Enhancing → Providing → Compositing → Exporting in
//! order. A provider or export failure ends that prompt as
//! [`PromptOutcome::Failed`]; the batch moves on to the next prompt.

use crate::compositor::apply_branding;
use crate::config::Config;
use crate::error::{Error, GenerationError, Result};
use crate::export::{export_variants, prepare_output_dirs, VariantResult};
use crate::image::providers::PlaceholderProvider;
use crate::image::{GenerationRequest, ImageProvider, ImageProviderKind};
use crate::notify::{notifier_from_config, Notifier};
use crate::prompt::enhance_prompt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Derived prompt names keep at most this many characters.
pub const MAX_DERIVED_NAME_LEN: usize = 30;

/// One prompt to process, with an optional output name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawJob")]
pub struct PromptJob {
    /// Prompt text as the user wrote it.
    pub prompt: String,
    /// Output name; derived from the prompt when unset or blank.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawJob {
    Text(String),
    Full {
        prompt: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<RawJob> for PromptJob {
    fn from(raw: RawJob) -> Self {
        match raw {
            RawJob::Text(prompt) => Self { prompt, name: None },
            RawJob::Full { prompt, name } => Self { prompt, name },
        }
    }
}

impl PromptJob {
    /// Creates a job whose name is derived from the prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            name: None,
        }
    }

    /// Sets an explicit output name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name used for output files.
    ///
    /// Explicit names get the same separator replacement as derived ones,
    /// so every file lands directly inside its variant directory.
    pub fn resolved_name(&self) -> String {
        match self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => sanitize_name(name),
            None => derive_prompt_name(&self.prompt),
        }
    }

    /// Reads a JSON array of prompts (strings or `{prompt, name}` objects).
    pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Built-in demo batch.
    pub fn samples() -> Vec<Self> {
        [
            ("summer_sale", "Summer sale promotion with beach vibes and tropical elements"),
            ("product_launch", "Modern tech product launch with futuristic design"),
            ("social_media", "Engaging social media post with dynamic composition"),
            ("email_header", "Professional email header with clean corporate aesthetic"),
            ("web_banner", "Eye-catching web banner with bold typography"),
        ]
        .into_iter()
        .map(|(name, prompt)| Self::new(prompt).with_name(name))
        .collect()
    }
}

/// Output name derived from prompt text: spaces (and path separators)
/// become underscores, truncated to [`MAX_DERIVED_NAME_LEN`] characters.
pub fn derive_prompt_name(prompt: &str) -> String {
    sanitize_name(prompt)
        .chars()
        .take(MAX_DERIVED_NAME_LEN)
        .collect()
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// Everything produced for one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Prompt as submitted, before enhancement.
    pub prompt: String,
    /// Name used in output filenames.
    pub name: String,
    /// Completion time, RFC 3339.
    pub timestamp: String,
    /// Provider that produced the base image.
    pub provider: ImageProviderKind,
    /// True when the base image came from the offline renderer.
    pub placeholder: bool,
    /// Model that produced the base image, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Time spent in the provider call, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// One entry per configured variant, in config order.
    pub variants: Vec<VariantResult>,
}

/// Pipeline stage a prompt was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building the brand-aware prompt.
    Enhancing,
    /// Waiting on the base image provider.
    Providing,
    /// Overlaying the logo.
    Compositing,
    /// Resizing and writing variants.
    Exporting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enhancing => write!(f, "enhancing"),
            Self::Providing => write!(f, "providing"),
            Self::Compositing => write!(f, "compositing"),
            Self::Exporting => write!(f, "exporting"),
        }
    }
}

/// A prompt that yielded no result.
#[derive(Debug)]
pub struct PromptFailure {
    /// Prompt as submitted.
    pub prompt: String,
    /// Output name the prompt would have used.
    pub name: String,
    /// Stage that failed.
    pub stage: Stage,
    /// What went wrong.
    pub error: Error,
}

/// Outcome of one prompt in a batch.
#[derive(Debug)]
pub enum PromptOutcome {
    /// Every variant was written.
    Completed(GenerationResult),
    /// The prompt was skipped.
    Failed(PromptFailure),
}

impl PromptOutcome {
    /// The result, if the prompt completed.
    pub fn ok(self) -> Option<GenerationResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Failed(_) => None,
        }
    }

    fn into_result(self) -> Result<GenerationResult> {
        match self {
            Self::Completed(result) => Ok(result),
            Self::Failed(failure) => Err(failure.error),
        }
    }
}

/// Results of a whole batch.
#[derive(Debug)]
pub struct BatchReport {
    /// Number of prompts submitted.
    pub submitted: usize,
    /// Completed prompts, in input order.
    pub results: Vec<GenerationResult>,
    /// Prompts that yielded nothing, in input order.
    pub failures: Vec<PromptFailure>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<PromptOutcome>) -> Self {
        let submitted = outcomes.len();
        let mut results = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                PromptOutcome::Completed(r) => results.push(r),
                PromptOutcome::Failed(f) => failures.push(f),
            }
        }
        Self {
            submitted,
            results,
            failures,
        }
    }

    /// `"Generated X of N image sets"`.
    pub fn summary(&self) -> String {
        format!(
            "Generated {} of {} image sets",
            self.results.len(),
            self.submitted
        )
    }
}

/// Builds the base image provider selected in the config.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn ImageProvider>> {
    match config.api.provider {
        ImageProviderKind::Placeholder => {
            Ok(Box::new(PlaceholderProvider::for_brand(&config.brand)))
        }
        #[cfg(feature = "gemini-image")]
        ImageProviderKind::Gemini => {
            use crate::image::providers::{GeminiModel, GeminiProvider};

            let mut builder = GeminiProvider::builder();
            if let Some(key) = config.api.resolve_gemini_key() {
                builder = builder.api_key(key);
            }
            if let Some(ref model) = config.api.model {
                builder = builder.model(GeminiModel::from_id(model));
            }
            let provider = builder.build().map_err(|e| Error::Config(e.to_string()))?;
            Ok(Box::new(provider))
        }
        #[cfg(not(feature = "gemini-image"))]
        ImageProviderKind::Gemini => Err(Error::Config(
            "Gemini provider not enabled in this build".into(),
        )),
    }
}

/// Sequential branding pipeline bound to one configuration.
pub struct Pipeline {
    config: Config,
    provider: Box<dyn ImageProvider>,
    notifier: Option<Box<dyn Notifier>>,
    timeout: Duration,
}

impl Pipeline {
    /// Validates the config and creates the output tree.
    pub fn new(config: Config, provider: Box<dyn ImageProvider>) -> Result<Self> {
        config.validate()?;
        prepare_output_dirs(&config.storage, &config.image_variants)
            .map_err(|e| Error::Config(format!("cannot prepare output directory: {}", e)))?;

        let timeout = config.api.timeout();
        Ok(Self {
            config,
            provider,
            notifier: None,
            timeout,
        })
    }

    /// Builds provider and notifier from the config itself.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let provider = provider_from_config(&config)?;
        let notifier = notifier_from_config(&config.notification, config.brand.name.clone())?;
        let mut pipeline = Self::new(config, provider)?;
        pipeline.notifier = notifier;
        Ok(pipeline)
    }

    /// Replaces the notifier.
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Overrides the provider call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The active base image provider.
    pub fn provider(&self) -> &dyn ImageProvider {
        self.provider.as_ref()
    }

    /// Runs one prompt end to end.
    ///
    /// Without a `name`, one is derived from the prompt text.
    pub async fn process_prompt(&self, prompt: &str, name: Option<&str>) -> Result<GenerationResult> {
        let job = PromptJob {
            prompt: prompt.to_string(),
            name: name.map(str::to_string),
        };
        self.execute(&job).await.into_result()
    }

    /// Runs every job in order and reports each outcome.
    pub async fn run_batch(&self, jobs: &[PromptJob]) -> Vec<PromptOutcome> {
        warn_on_duplicate_names(jobs);

        let mut outcomes = Vec::with_capacity(jobs.len());
        for (i, job) in jobs.iter().enumerate() {
            tracing::info!(index = i + 1, total = jobs.len(), prompt = %job.prompt, "processing prompt");
            outcomes.push(self.execute(job).await);
        }
        outcomes
    }

    /// Runs every job and returns the completed results in input order.
    pub async fn batch_process(&self, jobs: &[PromptJob]) -> Vec<GenerationResult> {
        self.run_batch(jobs)
            .await
            .into_iter()
            .filter_map(PromptOutcome::ok)
            .collect()
    }

    /// Runs the batch, hands the results to the notifier, and reports.
    pub async fn run(&self, jobs: &[PromptJob]) -> BatchReport {
        let report = BatchReport::from_outcomes(self.run_batch(jobs).await);

        match self.notifier {
            Some(ref notifier) => {
                if let Err(e) = notifier.notify(&report.results).await {
                    tracing::error!("{e}");
                }
            }
            None => tracing::info!("notifications disabled"),
        }

        tracing::info!(
            completed = report.results.len(),
            submitted = report.submitted,
            output = %self.config.storage.output_directory.display(),
            "{}",
            report.summary()
        );
        report
    }

    async fn execute(&self, job: &PromptJob) -> PromptOutcome {
        let name = job.resolved_name();
        let fail = |stage: Stage, error: Error| {
            tracing::error!(prompt = %job.prompt, %stage, "{error}");
            PromptOutcome::Failed(PromptFailure {
                prompt: job.prompt.clone(),
                name: name.clone(),
                stage,
                error,
            })
        };

        let enhanced = enhance_prompt(&job.prompt, &self.config.brand);
        tracing::info!(prompt = %enhanced, provider = self.provider.name(), "generating base image");

        let request = GenerationRequest::new(enhanced);
        let generated = match tokio::time::timeout(self.timeout, self.provider.generate(&request)).await {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => return fail(Stage::Providing, e.into()),
            Err(_) => {
                return fail(
                    Stage::Providing,
                    GenerationError::Timeout(self.timeout).into(),
                )
            }
        };
        let provider = generated.provider;
        let placeholder = generated.is_placeholder();
        let metadata = generated.metadata.clone();

        tracing::debug!(stage = %Stage::Compositing, "applying branding");
        let branded = apply_branding(generated.into_image(), self.config.brand.logo_path.as_deref());

        let variants = match export_variants(
            branded,
            &name,
            &self.config.image_variants,
            &self.config.storage,
        ) {
            Ok(variants) => variants,
            Err(e) => return fail(Stage::Exporting, e),
        };

        PromptOutcome::Completed(GenerationResult {
            prompt: job.prompt.clone(),
            name,
            timestamp: chrono::Local::now().to_rfc3339(),
            provider,
            placeholder,
            model: metadata.model,
            duration_ms: metadata.duration_ms,
            variants,
        })
    }
}

/// Colliding names overwrite each other's files when exported in the same
/// second; this is allowed but worth flagging.
fn warn_on_duplicate_names(jobs: &[PromptJob]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for job in jobs {
        *counts.entry(job.resolved_name()).or_default() += 1;
    }
    for (name, count) in counts.into_iter().filter(|(_, c)| *c > 1) {
        tracing::warn!(name = %name, count, "duplicate prompt name in batch, outputs may collide");
    }
}
