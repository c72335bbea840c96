//! Command line: validate documents, generate a value, list references.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use crate::generate::GenerateOptions;
use crate::model::{Model, Space, Validation};
use crate::path_de::{definition_arg, from_file_with_path, from_str_with_path, ndjson_documents};
use crate::references::{Filter, References, ReferencesOptions};
use crate::validate::{ReturnAs, ValidateOptions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON against runtime type definitions, generate minimal values, list referenced types
#[derive(Parser, Debug)]
#[command(name = "json-model")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate each input document against the definition
    Validate(ValidateCmd),
    /// print the minimal value of the definition
    Generate(GenerateCmd),
    /// print the named types the definition references
    References(ReferencesCmd),
}

#[derive(Args, Debug, Clone)]
struct ModelSettings {
    /// definition: inline JSON, a bare expression such as 'user[]', or @file
    #[arg(long = "def")]
    definition: String,

    /// JSON file mapping type names to definitions
    #[arg(long)]
    typespace: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ValidateCmd {
    #[command(flatten)]
    model: ModelSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// accept object keys the definition does not declare
    #[arg(long)]
    ignore_extraneous_keys: bool,

    /// print errors as a JSON object keyed by path
    #[arg(long)]
    map: bool,

    /// JSON file with validate options (ignoreExtraneousKeys, ...)
    #[arg(long, conflicts_with = "ignore_extraneous_keys")]
    options: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct GenerateCmd {
    #[command(flatten)]
    model: ModelSettings,

    /// JSON value substituted for required cycles
    #[arg(long)]
    on_required_cycle: Option<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ReferencesCmd {
    #[command(flatten)]
    model: ModelSettings,

    /// deduplicated flat list
    #[arg(long, conflicts_with = "list")]
    unordered: bool,

    /// flat list in encounter order, duplicates kept
    #[arg(long)]
    list: bool,

    /// only names containing this substring
    #[arg(long)]
    filter: Option<String>,

    /// follow references into the types they name
    #[arg(long)]
    transitive: bool,
}

/// Outcome of one input document.
struct Report {
    source: String,
    errors: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ModelSettings {
    fn load(&self) -> Result<Model> {
        let space = match &self.typespace {
            Some(path) => {
                let raw: Value = from_file_with_path(path)
                    .with_context(|| format!("failed to load typespace {}", path.display()))?;
                Space::new(&raw).with_context(|| format!("invalid typespace {}", path.display()))?
            }
            None => Space::default(),
        };
        let definition = definition_arg(&self.definition).context("failed to load definition")?;
        let model = space.define(definition).context("invalid definition")?;
        debug!(definition = %model.node(), "loaded model");
        Ok(model)
    }
}

impl InputSettings {
    /// Every document, labelled by file (and line for NDJSON).
    fn load(&self) -> Result<Vec<(String, Value)>> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let label = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {label}"))?;
            if self.ndjson {
                let docs = ndjson_documents(&source).with_context(|| format!("failed to parse NDJSON file {label}"))?;
                out.extend(docs.into_iter().enumerate().map(|(i, doc)| (format!("{label}#{}", i + 1), doc)));
            } else {
                let doc = from_str_with_path(&source).with_context(|| format!("failed to parse JSON file {label}"))?;
                out.push((label, doc));
            }
        }
        Ok(out)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Validate(target) => target.run(),
            Command::Generate(target) => target.run(),
            Command::References(target) => target.run(),
        }
    }
}

impl ValidateCmd {
    fn options(&self) -> Result<ValidateOptions> {
        let mut options = match &self.options {
            Some(path) => from_file_with_path::<ValidateOptions>(path)
                .with_context(|| format!("failed to load options {}", path.display()))?,
            None => ValidateOptions { ignore_extraneous_keys: self.ignore_extraneous_keys, ..Default::default() },
        };
        options.return_as = Some(if self.map { ReturnAs::Map } else { ReturnAs::Message });
        Ok(options)
    }

    fn run(&self) -> Result<ExitCode> {
        let model = self.model.load()?;
        let options = self.options()?;
        let documents = self.input_settings.load()?;
        info!(documents = documents.len(), "validating");

        let reports: Vec<Report> = documents
            .into_par_iter()
            .map(|(source, doc)| {
                let errors = match model.validate_with(&doc, &options) {
                    Ok(Validation::Valid) => None,
                    Ok(Validation::Message(message)) => (!message.is_empty()).then_some(message),
                    Ok(Validation::Map(errors)) if errors.is_empty() => None,
                    Ok(Validation::Map(errors)) => Some(serde_json::to_string_pretty(&errors).unwrap_or_default()),
                    Err(failed) => Some(failed.message),
                };
                Report { source, errors }
            })
            .collect();

        let mut failures = 0usize;
        for report in &reports {
            match &report.errors {
                None => println!("{} {}", "✅".green(), report.source),
                Some(errors) => {
                    failures += 1;
                    println!("{} {}", "❌".red(), report.source.bold());
                    for line in errors.lines() {
                        println!("   {line}");
                    }
                }
            }
        }
        info!(total = reports.len(), failures, "validated");
        Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

impl GenerateCmd {
    fn run(&self) -> Result<ExitCode> {
        let model = self.model.load()?;
        let options = GenerateOptions {
            on_required_cycle: match &self.on_required_cycle {
                Some(raw) => Some(definition_arg(raw).context("invalid --on-required-cycle value")?),
                None => None,
            },
        };
        let value = model.generate_with(&options)?;
        let rendered = serde_json::to_string_pretty(&value)?;
        if let Some(out) = self.out.as_ref() {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &rendered).with_context(|| format!("failed to write {}", out.display()))?;
        } else {
            println!("{rendered}");
        }
        Ok(ExitCode::SUCCESS)
    }
}

impl ReferencesCmd {
    fn run(&self) -> Result<ExitCode> {
        let model = self.model.load()?;
        let options = ReferencesOptions {
            as_unordered_list: self.unordered,
            as_list: self.list,
            filter: self.filter.clone().map(Filter::Contains),
            transitive: self.transitive,
        };
        let rendered = serde_json::to_string_pretty(&references_json(&model.references_with(&options)))?;
        println!("{rendered}");
        Ok(ExitCode::SUCCESS)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn references_json(references: &References) -> Value {
    match references {
        References::Names(names) => Value::from(names.clone()),
        References::Shape(members) => {
            Value::Object(members.iter().map(|(k, r)| (k.clone(), references_json(r))).collect())
        }
        References::Slots(slots) => Value::Array(slots.iter().map(references_json).collect()),
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern)? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
