//! Scenario context: step bookkeeping plus shared multi-call helpers.

use std::future::Future;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};

use crate::api::{ApiClient, ExportedImage, TimingApi};
use crate::harness::error::{HarnessError, HarnessResult};
use crate::harness::step::{StepLog, StepTracker};

/// Image format requested from the engine's export endpoint.
pub const EXPORT_FORMAT: &str = "png";

/// Everything a scenario needs: the API, the step log and a work directory.
///
/// Cloning yields another handle onto the same step log.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    scenario: String,
    work_dir: PathBuf,
    timing: TimingApi,
    log: StepLog,
}

impl ScenarioContext {
    /// Creates a context with an empty step log.
    #[must_use]
    pub fn new(scenario: impl Into<String>, work_dir: impl Into<PathBuf>, client: ApiClient) -> Self {
        Self {
            scenario: scenario.into(),
            work_dir: work_dir.into(),
            timing: TimingApi::new(client),
            log: StepLog::new(),
        }
    }

    /// Directory for artifacts such as exported images.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Untyped API client.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        self.timing.client()
    }

    /// Typed timing API.
    #[must_use]
    pub const fn timing(&self) -> &TimingApi {
        &self.timing
    }

    /// The step log shared by every clone of this context.
    #[must_use]
    pub const fn log(&self) -> &StepLog {
        &self.log
    }

    /// Starts a named step. An unresolved previous step becomes abandoned.
    pub fn step(&self, name: impl Into<String>) -> StepTracker {
        self.log.begin(name)
    }

    /// Adds a note to the final report.
    pub fn note(&self, note: impl Into<String>) {
        self.log.note(note);
    }

    /// Runs `work` as one step: passes on `Ok`, records the error as the
    /// failure reason and returns it on `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`.
    pub async fn check<T, E, F>(&self, name: &str, work: F) -> HarnessResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<HarnessError>,
    {
        let step = self.step(name);
        match work.await.map_err(Into::into) {
            Ok(value) => {
                step.pass();
                Ok(value)
            }
            Err(error) => {
                step.fail(error.to_string());
                Err(error)
            }
        }
    }

    /// Triggers the engine's layout for a diagram as the step
    /// "Layout diagram". For timing diagrams the engine only resizes the
    /// frame around the lifelines.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout request fails.
    pub async fn layout_diagram(&self, diagram_id: &str) -> HarnessResult<()> {
        self.check("Layout diagram", async {
            self.timing.layout(diagram_id).await?;
            Ok::<_, HarnessError>(())
        })
        .await
    }

    /// Exports a diagram image as one step and writes it into the work
    /// directory. Returns the path of the written file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the payload is missing, not
    /// base64 or empty, or the file cannot be written.
    pub async fn export_diagram(&self, diagram_id: &str, step_name: &str) -> HarnessResult<PathBuf> {
        self.check(step_name, async {
            let exported = self.timing.export(diagram_id, EXPORT_FORMAT).await?;
            let bytes = decode_image(&exported)?;

            let extension = exported.format.as_deref().unwrap_or(EXPORT_FORMAT);
            let path = self.work_dir.join(format!(
                "{}-{}.{extension}",
                slug(&self.scenario),
                slug(step_name)
            ));

            tokio::fs::create_dir_all(&self.work_dir)
                .await
                .map_err(|source| HarnessError::Io {
                    path: self.work_dir.clone(),
                    source,
                })?;
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|source| HarnessError::Io {
                    path: path.clone(),
                    source,
                })?;

            tracing::info!(path = %path.display(), bytes = bytes.len(), "Exported diagram image");
            Ok::<_, HarnessError>(path)
        })
        .await
    }
}

/// Decodes the base64 image of an export response.
///
/// # Errors
///
/// Returns [`HarnessError::Export`] if the image is missing, not valid
/// base64 or empty.
pub fn decode_image(exported: &ExportedImage) -> HarnessResult<Vec<u8>> {
    let encoded = exported.image.as_deref().ok_or_else(|| HarnessError::Export {
        reason: "response has no image payload".to_string(),
    })?;

    let bytes = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| HarnessError::Export {
            reason: format!("image payload is not valid base64: {e}"),
        })?;

    if bytes.is_empty() {
        return Err(HarnessError::Export {
            reason: "image payload is empty".to_string(),
        });
    }

    Ok(bytes)
}

/// Lower-case, dash-separated file name fragment.
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
