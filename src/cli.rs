//! Minimal CLI: load → (check | modules | resolve)
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::Context;
use clap::{Parser, Subcommand, Args};
use colored::Colorize;
use rayon::prelude::*;
use tracing::info;

use thrift_resolve::{lower_module, FileGroup, GroupConfig, OsSources, ParseError};
use thrift_resolve::ir::EntityKind;
use thrift_resolve::resolver::Symbol;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// resolve IDL schema trees across their includes and report, list or dump the result
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// report unparseable files and unresolved names
    Check(CheckOut),
    /// list every definition with its destination module
    Modules(ModulesOut),
    /// emit the resolved IR as JSON
    Resolve(ResolveOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// extra include search directories, tried in order after the including file's own
    #[arg(long = "include", short = 'I')]
    include_paths: Vec<PathBuf>,

    /// default namespace for files that declare none for the target
    #[arg(long)]
    namespace: Option<String>,

    /// generation target tag used to pick `namespace <target> ...` declarations
    #[arg(long)]
    target: Option<String>,

    /// JSON config file; flags above override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// One or more root schemas. May be literal paths or quoted glob patterns.
    /// Each root is its own compilation unit.
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct ModulesOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct ResolveOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// include every module of the closure, not just the roots
    #[arg(long, default_value_t = false)]
    all_modules: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One root file and what loading it produced.
struct Unit {
    root: PathBuf,
    loaded: Result<(FileGroup, Vec<ParseError>), ParseError>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn config(&self) -> anyhow::Result<GroupConfig> {
        let mut config = match &self.config {
            Some(path) => GroupConfig::from_json_file(path)?,
            None => GroupConfig::default(),
        };
        config.include_paths.extend(self.include_paths.iter().cloned());
        if let Some(namespace) = &self.namespace {
            config.namespace = Some(namespace.clone());
        }
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        Ok(config)
    }

    /// Independent units, loaded in parallel.
    fn load_units(&self) -> anyhow::Result<Vec<Unit>> {
        let config = self.config()?;
        let roots = resolve_file_path_patterns(&self.input)?;
        info!(units = roots.len(), "loading schemas");
        Ok(roots
            .into_par_iter()
            .map(|root| {
                let loaded = FileGroup::load(config.clone(), &OsSources, &root);
                Unit { root, loaded }
            })
            .collect())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => {
                let units = target.input_settings.load_units()?;
                let mut failures = 0usize;
                for unit in &units {
                    let (group, parse_errors) = match &unit.loaded {
                        Ok(loaded) => loaded,
                        Err(error) => {
                            report(&error.to_string());
                            failures += 1;
                            continue;
                        }
                    };
                    for error in parse_errors {
                        report(&error.to_string());
                    }
                    let resolve_errors = group.check();
                    for error in &resolve_errors {
                        report(&format!("{}: {error}", unit.root.display()));
                    }
                    failures += parse_errors.len() + resolve_errors.len();
                }
                if failures == 0 {
                    eprintln!("{} {} unit(s) resolved", "ok:".green().bold(), units.len());
                    Ok(ExitCode::SUCCESS)
                } else {
                    eprintln!("{} {failures} problem(s)", "failed:".red().bold());
                    Ok(ExitCode::FAILURE)
                }
            }
            Command::Modules(target) => {
                for unit in target.input_settings.load_units()? {
                    let (group, _) = unit.loaded?;
                    println!("{}", unit.root.display().to_string().bold());
                    for (key, symbol) in group.resolutions() {
                        let Symbol::Definition(entity) = symbol else { continue };
                        if matches!(entity.kind, EntityKind::EnumValue { .. }) {
                            continue;
                        }
                        let dest = group.dest_module_of(entity)
                            .with_context(|| format!("naming {key}"))?;
                        println!("  {:<40} {dest}", entity.to_string());
                    }
                    for (module, schema) in group.schemas() {
                        if !schema.constants.is_empty() {
                            println!("  {:<40} {}", format!("constants {module}"), group.constants_module(module)?);
                        }
                    }
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Resolve(target) => {
                let mut modules = Vec::new();
                for unit in target.input_settings.load_units()? {
                    let (group, parse_errors) = unit.loaded?;
                    if let Some(error) = parse_errors.into_iter().next() {
                        return Err(error.into());
                    }
                    let names = if target.all_modules {
                        group.schemas().keys().cloned().collect::<Vec<_>>()
                    } else {
                        group.initial_module().map(str::to_string).into_iter().collect()
                    };
                    for name in names {
                        let module = lower_module(&group, &name)
                            .with_context(|| format!("resolving {}", unit.root.display()))?;
                        modules.push(module);
                    }
                }
                let json_src = serde_json::to_string_pretty(&modules)?;
                write_output(target.out.as_deref(), &json_src)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn report(message: &str) {
    eprintln!("{} {message}", "error:".red().bold());
}

fn write_output(out: Option<&Path>, src: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, src).with_context(|| format!("writing {}", out.display()))?;
        }
        None => println!("{src}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
