//! Signing a batch of files.

use crate::data::{BatchSettings, SigningRequest};
use crate::report::{censored_error, censored_message, Censor, LogSink, Redactions};
use crate::tool::{self, SignError};
use crate::utils::fs::{absolute, replace_file};
use crate::utils::locate::find_java;
use anyhow::{anyhow, Context};
use std::path::Path;
use std::sync::Arc;

mod staging;

pub use staging::*;

const NO_FILES: &str = "No files specified to sign.";

/// Sign all files of the request, replacing each of them with its signed version.
///
/// Everything gets reported, after redaction, to the sink. Returns `true` if all files were
/// signed.
pub async fn sign_files(
    request: &SigningRequest,
    settings: &BatchSettings,
    sink: Arc<dyn LogSink>,
) -> bool {
    let censor = Censor::new(Redactions::from_request(request), sink);

    match try_sign_files(request, settings, &censor).await {
        Ok(success) => success,
        Err(err) => {
            censored_error!(censor, "Exception: {err:#}");
            false
        }
    }
}

async fn try_sign_files(
    request: &SigningRequest,
    settings: &BatchSettings,
    censor: &Censor,
) -> anyhow::Result<bool> {
    if request.files.is_empty() {
        return Ok(if request.error_on_no_files {
            censor.error(NO_FILES);
            false
        } else {
            censor.message(NO_FILES);
            true
        });
    }

    let java = find_java(request.java_home.as_deref(), &settings.environment)?;

    let staging = StagingDirectory::create(&settings.temp_dir)
        .await
        .with_context(|| format!("Create staging directory in {}", settings.temp_dir.display()))?;
    let staging_path = staging.path().to_path_buf();

    let result = sign_all(&java, &staging_path, request, settings, censor).await;
    let cleanup = staging.close();

    if let (Err(_), Err(err)) = (&result, &cleanup) {
        log::warn!(
            "Failed to remove staging directory {}: {err}",
            staging_path.display()
        );
    }

    let success = result?;
    cleanup.context("Remove staging directory")?;

    Ok(success)
}

/// Sign one file after the other, a failed file doesn't stop the others.
async fn sign_all(
    java: &Path,
    output_dir: &Path,
    request: &SigningRequest,
    settings: &BatchSettings,
    censor: &Censor,
) -> anyhow::Result<bool> {
    let mut success = true;

    for file in &request.files {
        let source = absolute(file)?;
        if !source.is_file() {
            return Err(SignError::MissingInput(source).into());
        }

        let outcome =
            tool::sign_file(java, &settings.tool, output_dir, &source, request, censor).await?;

        if !outcome.success {
            log::debug!(
                "Failed to sign - exit code: {:?}, error output: {}, timed out: {}",
                outcome.exit_code,
                outcome.error_output,
                outcome.timed_out
            );
            success = false;
            continue;
        }

        let name = source
            .file_name()
            .ok_or_else(|| anyhow!("Missing file name: {}", source.display()))?;
        let staged = output_dir.join(name);

        replace_file(&staged, &source)?;
        censored_message!(
            censor,
            "Moved file '{}' to {}.",
            staged.display(),
            source.display()
        );
    }

    Ok(success)
}
