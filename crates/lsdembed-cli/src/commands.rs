//! Subcommand implementations.
//!
//! Each command reads from and writes to caller-supplied handles so it
//! can be exercised without spawning the binary.

use anyhow::{bail, Context, Result};
use lsdembed_core::{Engine, EngineConfig, Snapshot};
use serde::Deserialize;
use std::io::{BufRead, Write};
use std::path::Path;

/// One input line for `build`.
#[derive(Debug, Deserialize)]
struct Row {
    id: String,
    vector: Vec<f32>,
}

/// Builds an engine from JSON lines.
///
/// The dimensionality is taken from the first row; every other index
/// parameter comes from `config`. Blank lines are skipped.
pub fn build_engine(config: &EngineConfig, input: impl BufRead) -> Result<Engine<String>> {
    let mut engine: Option<Engine<String>> = None;

    for (n, line) in input.lines().enumerate() {
        let line_no = n + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Row = serde_json::from_str(&line)
            .with_context(|| format!("malformed row on line {line_no}"))?;

        if engine.is_none() {
            let mut index = config.index.clone();
            index.dimension = row.vector.len();
            tracing::info!(dimension = index.dimension, "dimension taken from first row");
            engine = Some(Engine::with_maintenance(index, config.maintenance.clone())?);
        }
        if let Some(engine) = &engine {
            engine
                .insert(row.id, &row.vector)
                .with_context(|| format!("cannot insert row on line {line_no}"))?;
        }
    }

    match engine {
        Some(engine) => Ok(engine),
        None => bail!("input contains no rows"),
    }
}

/// `build`: JSON lines in, snapshot file out. Returns the row count.
pub fn build(config: &EngineConfig, input: impl BufRead, output: &Path) -> Result<usize> {
    let engine = build_engine(config, input)?;
    engine
        .snapshot()
        .save(output)
        .with_context(|| format!("cannot write snapshot to {}", output.display()))?;
    tracing::info!(rows = engine.len(), output = %output.display(), "index built");
    Ok(engine.len())
}

/// Loads a snapshot file into a fresh engine.
pub fn open(index: &Path) -> Result<Engine<String>> {
    let snapshot = Snapshot::<String>::load(index)
        .with_context(|| format!("cannot read snapshot {}", index.display()))?;
    Ok(Engine::from_snapshot(snapshot)?)
}

/// `query`: one JSON object per result.
pub fn query(engine: &Engine<String>, vector: &str, k: usize, out: &mut impl Write) -> Result<()> {
    let probe: Vec<f32> =
        serde_json::from_str(vector).context("--vector must be a JSON array of numbers")?;
    for hit in engine.query(&probe, k)? {
        writeln!(out, "{}", serde_json::to_string(&hit)?)?;
    }
    Ok(())
}

/// `stats`: engine statistics as pretty JSON.
pub fn stats(engine: &Engine<String>, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(&engine.stats())?)?;
    Ok(())
}

/// `config`: the effective configuration as TOML.
pub fn show_config(config: &EngineConfig, out: &mut impl Write) -> Result<()> {
    write!(out, "{}", toml::to_string_pretty(config)?)?;
    Ok(())
}
