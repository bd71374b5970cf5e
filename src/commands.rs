//! Subcommand implementations.
//!
//! Every command writes its result to the given writer and returns whether it
//! succeeded; diagnostics that fail a run are not Rust errors.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use anyhow::{anyhow, Context};
use gma_lua_api::{
    emmylua, ApiRegistry, CallChecker, CallManifest, CallSite, Namespace, ProbeRuntime,
    Severity, Signature, ToolConfig, Translator,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::Command;

pub fn execute(
    command: &Command,
    registry: &ApiRegistry,
    config: &ToolConfig,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    match command {
        Command::List { namespace, json } => list(registry, namespace.as_deref(), *json, out),
        Command::Resolve { path, types } => resolve(registry, path, types, out),
        Command::Stubs { output } => stubs(registry, output.as_deref(), out),
        Command::Translate { file, output } => translate(registry, file, output.as_deref(), out),
        Command::Check { manifest, json } => check(registry, config, manifest, *json, out),
        Command::Probe { file, json } => probe(registry, config, file, *json, out),
    }
}

#[derive(Serialize)]
struct ListedNamespace<'a> {
    path: &'a str,
    description: &'a str,
    children: &'a [String],
    functions: Vec<&'a Signature>,
}

impl<'a> From<&'a Namespace> for ListedNamespace<'a> {
    fn from(ns: &'a Namespace) -> Self {
        Self {
            path: &ns.path,
            description: ns.description,
            children: ns.children(),
            functions: ns.entries().map(|(_, sig)| sig).collect(),
        }
    }
}

pub fn list(
    registry: &ApiRegistry,
    namespace: Option<&str>,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let namespaces: Vec<&Namespace> = match namespace {
        Some(path) => vec![registry.namespace(path)?],
        None => registry.namespaces().collect(),
    };

    if json {
        let listed: Vec<ListedNamespace> = namespaces.into_iter().map(Into::into).collect();
        serde_json::to_writer_pretty(&mut *out, &listed)?;
        writeln!(out)?;
        return Ok(true);
    }

    for (i, ns) in namespaces.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{} -- {}", ns.path, ns.description)?;
        for (_, sig) in ns.entries() {
            writeln!(out, "  {sig}")?;
        }
        for child in ns.children() {
            writeln!(out, "  {child}.*")?;
        }
    }
    Ok(true)
}

pub fn resolve(
    registry: &ApiRegistry,
    path: &str,
    types: &[String],
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let args = types
        .iter()
        .map(|name| registry.parse_type(name))
        .collect::<Result<Vec<_>, _>>()?;
    let signature = registry.resolve(path, &args)?;

    writeln!(out, "{signature}")?;
    writeln!(out, "  {}", signature.description)?;
    writeln!(out, "  returns: {}", registry.describe_return(signature))?;
    Ok(true)
}

fn write_output(output: Option<&Path>, text: &str, out: &mut impl Write) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("error writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => out.write_all(text.as_bytes())?,
    }
    Ok(())
}

pub fn stubs(
    registry: &ApiRegistry,
    output: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    write_output(output, &emmylua::generate(registry), out)?;
    Ok(true)
}

fn read_source(file: &Path) -> anyhow::Result<String> {
    fs::read_to_string(file).with_context(|| format!("error reading {}", file.display()))
}

pub fn translate(
    registry: &ApiRegistry,
    file: &Path,
    output: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let source = read_source(file)?;
    let translation = Translator::new(registry)
        .translate(&source)
        .with_context(|| format!("error translating {}", file.display()))?;
    info!(
        "rewrote {} marker call(s) in {}",
        translation.rewrites,
        file.display()
    );
    write_output(output, &translation.source, out)?;
    Ok(true)
}

pub fn check(
    registry: &ApiRegistry,
    config: &ToolConfig,
    manifest: &Path,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let text = read_source(manifest)?;
    let manifest: CallManifest = serde_json::from_str(&text)
        .with_context(|| format!("error parsing {}", manifest.display()))?;

    let sites = manifest
        .calls
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            spec.to_call_site(registry)
                .with_context(|| format!("call #{} ({})", i + 1, spec.path))
        })
        .collect::<anyhow::Result<Vec<CallSite>>>()?;

    let diagnostics = CallChecker::new(registry, config.lint).check_all(&sites);
    let failed = diagnostics.iter().any(|d| d.severity == Severity::Error);

    if json {
        serde_json::to_writer_pretty(&mut *out, &diagnostics)?;
        writeln!(out)?;
    } else {
        for diagnostic in &diagnostics {
            writeln!(out, "{diagnostic}")?;
        }
    }

    if failed {
        warn!("{} call site(s) checked, errors found", sites.len());
    } else {
        info!("{} call site(s) checked", sites.len());
    }
    Ok(!failed)
}

pub fn probe(
    registry: &ApiRegistry,
    config: &ToolConfig,
    file: &Path,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let source = read_source(file)?;
    let translation = Translator::new(registry)
        .translate(&source)
        .with_context(|| format!("error translating {}", file.display()))?;

    let runtime = ProbeRuntime::new(Rc::new(registry.clone()), config.probe.limits())
        .map_err(|e| anyhow!("error creating probe runtime: {}", e))?;
    let result = runtime.run(&translation.source, &file.display().to_string());
    let calls = runtime.calls();

    if json {
        serde_json::to_writer_pretty(&mut *out, &calls)?;
        writeln!(out)?;
    } else {
        for call in &calls {
            writeln!(out, "{}", call.signature)?;
        }
    }

    match result {
        Ok(()) => Ok(true),
        Err(e) => {
            warn!("probe of {} stopped: {}", file.display(), e);
            writeln!(out, "stopped: {e}")?;
            Ok(false)
        }
    }
}
