//! Model download and installation management.
//!
//! Downloads Whisper models from HuggingFace, verifies their SHA-1 and stores
//! them in the user's cache directory.

use crate::error::{Result, VoicebotError};
use crate::models::catalog::{ModelInfo, get_model, list_models};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sha1::{Digest, Sha1};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Get the directory where models are stored.
///
/// Uses `~/.cache/voicebot/models/` on Linux/Unix.
pub fn models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("voicebot")
        .join("models")
}

/// Get the full path for a model file.
///
/// The file may or may not exist on disk.
pub fn model_path(name: &str) -> PathBuf {
    models_dir().join(format!("ggml-{name}.bin"))
}

pub fn is_model_installed(name: &str) -> bool {
    model_path(name).exists()
}

/// Core download: fetch url, save to path, verify sha1 if non-empty.
async fn download_to_path(
    name: &str,
    url: &str,
    sha1: &str,
    size_mb: u32,
    output_path: &Path,
    progress: bool,
) -> Result<()> {
    let failed = |message: String| VoicebotError::ModelDownload { message };

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| failed(format!("Failed to create models directory: {e}")))?;
    }

    if progress {
        eprintln!("Downloading {name} ({size_mb} MB)...");
    }

    let client = reqwest::Client::builder()
        .user_agent(crate::defaults::USER_AGENT)
        .build()
        .map_err(|e| failed(format!("Failed to build HTTP client: {e}")))?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| failed(format!("Failed to start download: {e}")))?;

    if !response.status().is_success() {
        return Err(failed(format!(
            "Download of {name} failed with status: {}",
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);

    let pb = if progress {
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            // SAFETY: hardcoded template string, always valid
            #[allow(clippy::expect_used)]
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .expect("hardcoded progress bar template")
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    // Write to a temporary name so an interrupted download never looks installed
    let partial_path = output_path.with_extension("part");
    let mut hasher = Sha1::new();
    let mut stream = response.bytes_stream();
    let mut file = fs::File::create(&partial_path)
        .map_err(|e| failed(format!("Failed to create output file: {e}")))?;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| failed(format!("Failed to read download chunk: {e}")))?;

        file.write_all(&chunk)
            .map_err(|e| failed(format!("Failed to write to file: {e}")))?;

        hasher.update(&chunk);

        if let Some(ref pb) = pb {
            pb.inc(chunk.len() as u64);
        }
    }
    drop(file);

    if let Some(pb) = pb {
        pb.finish_with_message("Downloaded");
    }

    if !sha1.is_empty() {
        let calculated_hash = format!("{:x}", hasher.finalize());
        if calculated_hash != sha1 {
            if let Err(e) = fs::remove_file(&partial_path) {
                warn!("failed to remove corrupted download: {e}");
            }
            return Err(failed(format!(
                "SHA-1 checksum mismatch for {name}. Expected: {sha1}, got: {calculated_hash}"
            )));
        }
    }

    fs::rename(&partial_path, output_path)
        .map_err(|e| failed(format!("Failed to move model into place: {e}")))?;

    info!(model = name, path = %output_path.display(), "model installed");
    if progress {
        eprintln!("Model installed to: {}", output_path.display());
    }

    Ok(())
}

/// Download a Whisper model from the catalog, unless it is already installed.
///
/// # Errors
///
/// Returns an error if:
/// - The model is not in the catalog
/// - The download fails
/// - The SHA-1 checksum doesn't match
/// - The file cannot be written
pub async fn download_model(name: &str, progress: bool) -> Result<PathBuf> {
    let info = get_model(name).ok_or_else(|| VoicebotError::ModelNotFound {
        name: name.to_string(),
    })?;

    let path = model_path(name);
    if path.exists() {
        return Ok(path);
    }

    download_to_path(name, &info.url(), info.sha1, info.size_mb, &path, progress).await?;
    Ok(path)
}

/// Path of an installed model, downloading it first when allowed.
pub async fn ensure_model(name: &str, allow_download: bool, progress: bool) -> Result<PathBuf> {
    let path = model_path(name);
    if path.exists() {
        return Ok(path);
    }
    if !allow_download {
        return Err(VoicebotError::ModelNotFound {
            name: format!(
                "{name} (not installed; run 'voicebot models install {name}')"
            ),
        });
    }
    download_model(name, progress).await
}

/// List all installed model names by scanning the models directory.
///
/// Returns names with the `ggml-` prefix and `.bin` suffix stripped, sorted.
pub fn list_installed_models() -> Vec<String> {
    list_installed_in(&models_dir())
}

fn list_installed_in(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let name = entry.file_name();
            let name = name.to_str()?;
            let model = name.strip_prefix("ggml-")?.strip_suffix(".bin")?;
            if entry.path().is_file() {
                Some(model.to_string())
            } else {
                None
            }
        })
        .collect();

    names.sort();
    names
}

/// Format model information for display.
pub fn format_model_info(model: &ModelInfo) -> String {
    let status = if is_model_installed(model.name) {
        "[installed]"
    } else {
        "[not installed]"
    };
    let scope = if model.english_only {
        "english"
    } else {
        "multilingual"
    };
    format!(
        "{:12} {:5} MB   {:13} {}",
        model.name, model.size_mb, scope, status
    )
}

/// Every catalog model, formatted for `models list`.
pub fn format_catalog() -> Vec<String> {
    list_models().iter().map(format_model_info).collect()
}
