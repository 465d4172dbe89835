// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! `stratum`: developer CLI for config definitions and payloads.
//!
//! Subcommands:
//! - `verify <def> <path> [value]`: check a field path (and optional leaf literal) against a definition.
//! - `defaults <def> <json>`: backfill schema defaults into one document, print JSON.
//! - `resolve <def> <json>...`: merge payload fragments in order, backfill defaults, print JSON.
//! - `encode <def> <json>...`: as `resolve`, then print the flat text encoding.
//! - `checksum <json>`: MD5 and XXHASH64 of a payload's canonical JSON.
//! - `def-md5 <def>`: normalized checksum of a definition source.
//!
//! Output goes to stdout; diagnostics go through `tracing` (`RUST_LOG`).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use stratum_cache::{definition_md5, PayloadChecksums};
use stratum_payload::{apply_defaults, Document, EncoderOptions, PayloadBuilder, TextEncoder};
use stratum_schema::{parse_definition, ConfigDefinition};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stratum",
    version,
    about = "Inspect Stratum config definitions and payloads",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a field path, and optionally a leaf literal, against a definition.
    Verify {
        /// Definition source (`.def`).
        def: PathBuf,
        /// Field path through nested structs, e.g. `simple.name`.
        path: String,
        /// Leaf literal to validate. Omit to check a complex field.
        value: Option<String>,
    },
    /// Backfill schema defaults into one document and print it.
    Defaults {
        /// Definition source (`.def`).
        def: PathBuf,
        /// Payload JSON file.
        payload: PathBuf,
    },
    /// Merge payload fragments and print the resolved JSON.
    Resolve(PipelineArgs),
    /// Merge payload fragments and print the flat text encoding.
    Encode {
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Reject leaves that do not match their declared type.
        #[arg(long)]
        strict: bool,
    },
    /// Print payload checksums of a JSON document.
    Checksum {
        /// Payload JSON file.
        payload: PathBuf,
    },
    /// Print the normalized MD5 of a definition source.
    DefMd5 {
        /// Definition source (`.def`).
        def: PathBuf,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// Definition source (`.def`).
    def: PathBuf,
    /// Payload fragments, applied in order; later fragments override earlier ones.
    #[arg(required = true)]
    fragments: Vec<PathBuf>,
    /// Skip default backfilling.
    #[arg(long)]
    no_defaults: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Verify { def, path, value } => run_verify(&mut out, &def, &path, value.as_deref()),
        Commands::Defaults { def, payload } => {
            let schema = load_definition(&def)?;
            let mut doc = load_document(&payload)?;
            let filled = apply_defaults(&mut doc, &schema);
            info!(filled, "applied defaults");
            write_json(&mut out, &doc)
        }
        Commands::Resolve(args) => {
            let schema = load_definition(&args.def)?;
            let doc = resolve_fragments(&schema, &args)?;
            write_json(&mut out, &doc)
        }
        Commands::Encode { pipeline, strict } => {
            let schema = load_definition(&pipeline.def)?;
            let doc = resolve_fragments(&schema, &pipeline)?;
            let encoder =
                TextEncoder::with_options(&schema, EncoderOptions { strict_types: strict });
            encoder
                .encode_into(&doc, &mut out)
                .context("encode resolved payload")?;
            Ok(())
        }
        Commands::Checksum { payload } => {
            let doc = load_document(&payload)?;
            let sums = PayloadChecksums::from_payload(&doc);
            writeln!(out, "MD5:{}", sums.md5())?;
            writeln!(out, "XXHASH64:{}", sums.xxhash64())?;
            Ok(())
        }
        Commands::DefMd5 { def } => {
            let source = read_text(&def)?;
            writeln!(out, "{}", definition_md5(source.lines()))?;
            Ok(())
        }
    }
}

fn run_verify(out: &mut impl Write, def: &Path, path: &str, value: Option<&str>) -> Result<()> {
    let schema = load_definition(def)?;
    match value {
        Some(value) => schema
            .verify(path, value)
            .with_context(|| format!("{path} = {value:?}"))?,
        None => schema
            .verify_complex(path)
            .with_context(|| format!("{path} is not a complex field"))?,
    }
    writeln!(out, "ok")?;
    Ok(())
}

fn write_json(out: &mut impl Write, doc: &Document) -> Result<()> {
    let text = serde_json::to_string_pretty(doc).context("render payload")?;
    writeln!(out, "{text}")?;
    Ok(())
}

/// Fold `args.fragments` into one payload the way the resolver does.
fn resolve_fragments(schema: &ConfigDefinition, args: &PipelineArgs) -> Result<Document> {
    let mut merged = PayloadBuilder::bound(schema);
    for path in &args.fragments {
        let doc = load_document(path)?;
        let fragment = PayloadBuilder::from_document_with_schema(&doc, schema)
            .with_context(|| format!("load fragment {}", path.display()))?;
        merged.merge_override(&fragment);
        debug!(fragment = %path.display(), "merged");
    }
    let mut doc = merged.resolve();
    if !args.no_defaults {
        let filled = apply_defaults(&mut doc, schema);
        info!(filled, "applied defaults");
    }
    Ok(doc)
}

fn load_definition(path: &Path) -> Result<ConfigDefinition> {
    let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        bail!("cannot derive a definition name from {}", path.display());
    };
    let source = read_text(path)?;
    parse_definition(name, &source).with_context(|| format!("parse {}", path.display()))
}

fn load_document(path: &Path) -> Result<Document> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("parse JSON {}", path.display()))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}
