//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::config::EngineConfig;
use crate::engine::{checksum, inspect_wav, Codec, Engine};
use crate::state::ProjectDocument;

/// Load the engine configuration, falling back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Render a project document offline and write the encoded result.
///
/// Returns the SHA-256 of the written bytes.
pub fn render(
    config: EngineConfig,
    project_path: &Path,
    output: &Path,
    codec: &str,
    duration: Option<f64>,
) -> Result<String> {
    info!("Rendering project: {}", project_path.display());

    let codec: Codec = codec.parse()?;
    let document = ProjectDocument::load(project_path)
        .with_context(|| format!("failed to load project {}", project_path.display()))?;

    let (engine, _bus) = Engine::new(config)?;
    let base_dir = project_path.parent().unwrap_or_else(|| Path::new("."));
    document
        .load_sources(base_dir, &engine)
        .context("failed to load project sources")?;

    let total = duration.unwrap_or_else(|| document.render_duration());
    let bytes = engine.export_mix(&document.clips, &document.tracks, total, codec)?;
    fs::write(output, &bytes).with_context(|| format!("failed to write {}", output.display()))?;

    let digest = checksum(&bytes);
    println!("Rendered {:.3}s to {}", total, output.display());
    println!("SHA-256: {}", digest);
    Ok(digest)
}

/// Print a WAV file's header fields.
pub fn inspect(path: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let info = inspect_wav(&bytes)?;

    println!("File:        {}", path.display());
    println!("Channels:    {}", info.channels);
    println!("Sample rate: {} Hz", info.sample_rate);
    println!(
        "Format:      {}-bit {}",
        info.bits_per_sample,
        if info.is_float { "float" } else { "PCM" }
    );
    println!("Frames:      {}", info.frames);
    println!("Duration:    {:.3}s", info.duration_secs());
    println!("SHA-256:     {}", checksum(&bytes));
    Ok(())
}
