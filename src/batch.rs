//! Parallel `make` + `save` over many paths.
//!
//! Every path is processed independently on the rayon pool: a failure is
//! recorded for that path and the others carry on. Progress is reported as
//! one [`BatchEvent`] per path over an optional channel, so the CLI can print
//! from its own thread while workers run.

use crate::chain::FilterChainConfig;
use crate::error::{ErrorKind, ImageError, Result};
use crate::handler::ImageHandler;
use crate::url::{self, UrlOptions};
use rayon::prelude::*;
use std::path::Path;
use std::sync::mpsc::Sender;

/// Where a batch writes each result.
#[derive(Debug, Clone)]
pub enum OutputNaming {
    /// Next to the input, with the filter chain encoded in the name
    /// (`cat.jpg` → `cat-filters(100x_).jpg`).
    FilterUrl(UrlOptions),
    /// Same file name under this directory of the bound source.
    Directory(String),
}

#[derive(Debug)]
pub struct BatchEvent {
    pub path: String,
    /// Logical output path, when one could be derived.
    pub output: Option<String>,
    /// Dimensions of the saved image.
    pub result: Result<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub saved: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Logical output path for `path`.
pub fn output_path(
    path: &str,
    config: &FilterChainConfig,
    naming: &OutputNaming,
) -> Result<String> {
    let output = match naming {
        OutputNaming::FilterUrl(options) => url::format(path, config, options)?,
        OutputNaming::Directory(dir) => {
            let name = Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| ImageError::InvalidPath(format!("{path} has no file name")))?;
            let dir = dir.trim_end_matches('/');
            if dir.is_empty() {
                name.to_string()
            } else {
                format!("{dir}/{name}")
            }
        }
    };
    if output == path {
        return Err(ImageError::InvalidConfig(format!(
            "output for {path} would overwrite the input"
        )));
    }
    Ok(output)
}

fn make_and_save(
    handler: &ImageHandler,
    path: &str,
    output: &str,
    config: &FilterChainConfig,
) -> Result<(u32, u32)> {
    let image = handler.make(path, config)?;
    handler.save(&image, output)?;
    Ok(image.dimensions())
}

/// Run `config` over every path and save each result as named by `naming`.
///
/// Runs on the global rayon pool; size it with
/// [`effective_threads`](crate::config::effective_threads) beforehand.
pub fn run_batch(
    handler: &ImageHandler,
    paths: &[String],
    config: &FilterChainConfig,
    naming: &OutputNaming,
    events: Option<Sender<BatchEvent>>,
) -> BatchSummary {
    let failures: Vec<Option<BatchFailure>> = paths
        .par_iter()
        .map(|path| {
            let output = output_path(path, config, naming);
            let (output, result) = match output {
                Ok(output) => {
                    let result = make_and_save(handler, path, &output, config);
                    (Some(output), result)
                }
                Err(e) => (None, Err(e)),
            };

            let failure = result.as_ref().err().map(|e| {
                tracing::warn!(path = %path, error = %e, "batch item failed");
                BatchFailure {
                    path: path.clone(),
                    kind: e.kind(),
                    message: e.to_string(),
                }
            });

            if let Some(tx) = &events {
                // A dropped receiver only means nobody is listening.
                tx.send(BatchEvent {
                    path: path.clone(),
                    output,
                    result,
                })
                .ok();
            }
            failure
        })
        .collect();

    let failures: Vec<BatchFailure> = failures.into_iter().flatten().collect();
    let summary = BatchSummary {
        total: paths.len(),
        saved: paths.len() - failures.len(),
        failures,
    };
    tracing::info!(
        total = summary.total,
        saved = summary.saved,
        failed = summary.failures.len(),
        "batch finished"
    );
    summary
}
