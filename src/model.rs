//! The statistical model is a black box: it is fitted on a feature table and
//! later turns a feature table into a predictions table with one row per
//! feature row, in the same order.

use crate::error::{ExternalProcessError, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A fitted model, identified by the file it was saved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle(PathBuf);

impl ModelHandle {
    /// Refer to an existing model file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(ExternalProcessError::MissingModel(path).into());
        }
        Ok(Self(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

pub trait RecalibrationModel {
    /// Fit on `features` (with the `correct` column filled) and save to `model_out`.
    fn fit(&self, features: &Path, model_out: &Path) -> Result<ModelHandle>;

    /// Write predictions for `features` to `predictions_out`.
    ///
    /// The output is a CSV table with a header row, then `read_id,probability`
    /// per feature row, in feature row order.
    fn predict(&self, model: &ModelHandle, features: &Path, predictions_out: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Fit,
    Predict,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Fit => "fit",
            Mode::Predict => "predict",
        }
    }
}

/// A model run as a subprocess from a command template.
///
/// The template is split on whitespace; the placeholders `{mode}`,
/// `{features}`, `{model}` and `{predictions}` are substituted inside each
/// argument. In fit mode an argument that is exactly `{predictions}` is dropped.
///
/// ```
/// use loqum_rs::model::ExternalModel;
///
/// let model = ExternalModel::from_template("Rscript loqum-internal.R {mode} {features} {model} {predictions}")?;
/// assert_eq!(model.program(), "Rscript");
/// # Ok::<(), loqum_rs::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExternalModel {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ExternalModel {
    pub fn from_template(template: &str) -> Result<Self> {
        let mut words = template.split_whitespace().map(str::to_string);
        let program = words.next().ok_or(ExternalProcessError::EmptyTemplate)?;
        Ok(Self {
            program,
            args: words.collect(),
            timeout: None,
        })
    }

    /// Kill the process and fail the run if it takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn command_args(
        &self,
        mode: Mode,
        features: &Path,
        model: &Path,
        predictions: Option<&Path>,
    ) -> Vec<String> {
        let features = features.display().to_string();
        let model = model.display().to_string();
        let predictions = predictions.map(|p| p.display().to_string());
        self.args
            .iter()
            .filter(|arg| predictions.is_some() || arg.as_str() != "{predictions}")
            .map(|arg| {
                arg.replace("{mode}", mode.as_str())
                    .replace("{features}", &features)
                    .replace("{model}", &model)
                    .replace("{predictions}", predictions.as_deref().unwrap_or(""))
            })
            .collect()
    }

    fn run(&self, args: Vec<String>) -> Result<()> {
        let command = std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::debug!(command = %command, "running model");

        let child = Command::new(&self.program)
            .args(&args)
            .spawn()
            .map_err(|source| ExternalProcessError::Spawn {
                command: command.clone(),
                source,
            })?;
        let status = match self.timeout {
            None => wait(child)?,
            Some(timeout) => wait_with_timeout(child, timeout, &command)?,
        };
        if !status.success() {
            return Err(ExternalProcessError::Failed { command, status }.into());
        }
        Ok(())
    }
}

fn wait(mut child: Child) -> Result<ExitStatus> {
    Ok(child.wait()?)
}

fn wait_with_timeout(mut child: Child, timeout: Duration, command: &str) -> Result<ExitStatus> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExternalProcessError::TimedOut {
                command: command.to_string(),
                timeout,
            }
            .into());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl RecalibrationModel for ExternalModel {
    fn fit(&self, features: &Path, model_out: &Path) -> Result<ModelHandle> {
        self.run(self.command_args(Mode::Fit, features, model_out, None))?;
        ModelHandle::open(model_out)
    }

    fn predict(&self, model: &ModelHandle, features: &Path, predictions_out: &Path) -> Result<()> {
        self.run(self.command_args(
            Mode::Predict,
            features,
            model.path(),
            Some(predictions_out),
        ))
    }
}
