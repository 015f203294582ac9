//! Subcommand implementations.
//!
//! Each command returns `Ok(true)` on success, `Ok(false)` when it ran to
//! completion but found a problem (an invalid manifest, a failed batch item),
//! and `Err` when it could not run at all.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, info};

use ossa_contracts::{
    error::{OssaError, OssaResult},
    version::{VersionId, VersionTable},
};
use ossa_core::{
    report::render_text,
    run_batch,
    traits::{ManifestRepository, ManifestValidator, RuleChain},
    MigrationPipeline, PipelineReport,
};
use ossa_rules::{MigrationConfig, RuleSet};
use ossa_store::{default_output_path, discover, FsManifestRepository, ManifestFormat};
use ossa_verify::SchemaValidator;

use crate::{BatchArgs, InfoArgs, MigrateArgs, RuleArgs, SchemaArgs, ValidateArgs};

// ── migrate ───────────────────────────────────────────────────────────────────

pub fn migrate(args: MigrateArgs) -> OssaResult<bool> {
    let (rules, target) = load_rules(&args.rules)?;
    let validator = load_validator(&args.schemas)?;
    let pipeline = MigrationPipeline::new(&rules, &validator);
    let repo = FsManifestRepository::new();

    let document = repo.load(&args.source)?;
    let report = pipeline.run(&document, &target)?;
    print_warnings(&report);

    if report.is_noop() {
        if !report.post_validation.valid {
            eprintln!(
                "warning: {} does not validate against {}",
                args.source.display(),
                report.migrated.source_version
            );
            for issue in &report.post_validation.errors {
                eprintln!("  - {issue}");
            }
        }
        if args.json {
            print_json(&migrate_json(&args.source, None, &report));
        } else {
            println!(
                "{} is already at {}; nothing to write",
                args.source.display(),
                report.migrated.source_version
            );
        }
        return Ok(true);
    }

    let output = if args.in_place {
        args.source.clone()
    } else {
        args.output.clone().unwrap_or_else(|| default_output_path(&args.source))
    };

    if args.dry_run {
        let format = ManifestFormat::from_path(&output)
            .or_else(|| ManifestFormat::from_path(&args.source))
            .unwrap_or(ManifestFormat::Yaml);
        let rendered = format.render(report.document()).map_err(|e| OssaError::RepositoryError {
            path: output.display().to_string(),
            reason: e.to_string(),
        })?;
        if args.json {
            print_json(&migrate_json(&args.source, None, &report));
        } else {
            // stdout carries only the document so it can be piped.
            eprint!("{}", render_text(&report.summary));
            print!("{rendered}");
        }
        return Ok(true);
    }

    repo.save(&output, report.document())?;
    info!(source = %args.source.display(), output = %output.display(), "migration written");

    if args.json {
        print_json(&migrate_json(&args.source, Some(&output), &report));
    } else {
        print!("{}", render_text(&report.summary));
        println!("Wrote {}", output.display());
        println!("sha256:{}", report.digest);
    }
    Ok(true)
}

fn migrate_json(source: &Path, output: Option<&Path>, report: &PipelineReport) -> Value {
    json!({
        "source": source.display().to_string(),
        "output": output.map(|p| p.display().to_string()),
        "noop": report.is_noop(),
        "summary": report.summary,
        "warnings": report.post_validation.warnings,
        "digest": report.digest,
    })
}

// ── validate ──────────────────────────────────────────────────────────────────

pub fn validate(args: ValidateArgs) -> OssaResult<bool> {
    let table = VersionTable::builtin();
    let validator = load_validator(&args.schemas)?;
    let document = FsManifestRepository::new().load(&args.path)?;

    let version = match &args.schema_version {
        Some(requested) => resolve_version(&table, requested)?,
        None => ossa_core::detect_version(&document, &table)?,
    };
    let result = validator.validate(&document, &version)?;

    if args.json {
        print_json(&json!({
            "path": args.path.display().to_string(),
            "version": version,
            "valid": result.valid,
            "errors": result.errors,
            "warnings": result.warnings,
        }));
    } else {
        let verdict = if result.valid { "valid" } else { "invalid" };
        println!("{}: {verdict} against {version}", args.path.display());
        for issue in &result.errors {
            println!("  error: {issue}");
        }
        for warning in &result.warnings {
            println!("  warning: {warning}");
        }
    }
    Ok(result.valid)
}

// ── detect ────────────────────────────────────────────────────────────────────

pub fn detect(path: &Path) -> OssaResult<bool> {
    let document = FsManifestRepository::new().load(path)?;
    let version = ossa_core::detect_version(&document, &VersionTable::builtin())?;
    println!("{version}");
    Ok(true)
}

// ── info ──────────────────────────────────────────────────────────────────────

pub fn info(args: InfoArgs) -> OssaResult<bool> {
    let document = FsManifestRepository::new().load(&args.path)?;
    let version = ossa_core::detect_version(&document, &VersionTable::builtin())?;
    let details = ManifestInfo::read(&document);

    if args.json {
        print_json(&json!({
            "path": args.path.display().to_string(),
            "version": version,
            "name": details.name,
            "kind": details.kind,
            "apiVersion": details.api_version,
            "metadataVersion": details.version,
            "description": details.description,
            "llm": details.llm,
            "tools": details.tools,
        }));
        return Ok(true);
    }

    let or_dash = |field: &Option<String>| field.clone().unwrap_or_else(|| "-".to_string());
    println!("Name:        {}", or_dash(&details.name));
    println!("Kind:        {}", or_dash(&details.kind));
    println!("API Version: {}", or_dash(&details.api_version));
    println!("Detected:    {version}");
    if let Some(v) = &details.version {
        println!("Version:     {v}");
    }
    if let Some(description) = &details.description {
        println!("Description: {description}");
    }
    if let Some(llm) = &details.llm {
        println!("LLM:         {llm}");
    }
    if details.tools > 0 {
        println!("Tools:       {}", details.tools);
    }
    Ok(true)
}

/// The identifying fields of a manifest, read from whichever shape it has.
struct ManifestInfo {
    name: Option<String>,
    kind: Option<String>,
    api_version: Option<String>,
    version: Option<String>,
    description: Option<String>,
    /// `provider/model`
    llm: Option<String>,
    tools: usize,
}

impl ManifestInfo {
    fn read(document: &Value) -> Self {
        if let Some(agent) = document.get("agent").filter(|a| a.is_object()) {
            let llm = agent.get("llm").filter(|l| l.is_object()).unwrap_or(agent);
            return Self {
                name: text(agent.get("name")).or_else(|| text(agent.get("id"))),
                kind: Some("Agent".to_string()),
                api_version: None,
                version: text(agent.get("version")),
                description: text(agent.get("description")),
                llm: model_label(llm),
                tools: count(agent.get("tools")),
            };
        }

        let metadata = document.get("metadata");
        let spec = document.get("spec");
        Self {
            name: text(metadata.and_then(|m| m.get("name"))),
            kind: text(document.get("kind")),
            api_version: text(document.get("apiVersion"))
                .or_else(|| text(document.get("ossaVersion"))),
            version: text(metadata.and_then(|m| m.get("version"))),
            description: text(metadata.and_then(|m| m.get("description"))),
            llm: spec.and_then(|s| s.get("llm")).and_then(model_label),
            tools: count(spec.and_then(|s| s.get("tools"))),
        }
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Object(_) | Value::Array(_) => None,
        other => Some(other.to_string()),
    }
}

fn model_label(llm: &Value) -> Option<String> {
    let provider = text(llm.get("provider"));
    let model = text(llm.get("model"));
    if provider.is_none() && model.is_none() {
        return None;
    }
    Some(format!(
        "{}/{}",
        provider.unwrap_or_default(),
        model.unwrap_or_default()
    ))
}

fn count(list: Option<&Value>) -> usize {
    list.and_then(Value::as_array).map_or(0, Vec::len)
}

// ── batch ─────────────────────────────────────────────────────────────────────

pub fn batch(args: BatchArgs) -> OssaResult<bool> {
    let (rules, target) = load_rules(&args.rules)?;
    let validator = load_validator(&args.schemas)?;
    let pipeline = MigrationPipeline::new(&rules, &validator);
    let repo = FsManifestRepository::new();

    let paths = discover(&args.dir)?;
    let mut loaded: Vec<(PathBuf, Value)> = Vec::with_capacity(paths.len());
    let mut failures = 0usize;

    for path in paths {
        match repo.load(&path) {
            Ok(document) => loaded.push((path, document)),
            Err(e) => {
                failures += 1;
                println!("FAIL  {}: {e}", path.display());
            }
        }
    }

    let documents: Vec<Value> = loaded.iter().map(|(_, doc)| doc.clone()).collect();
    let results = run_batch(&pipeline, &documents, &target, args.jobs);
    debug!(files = loaded.len(), jobs = args.jobs, "batch pipeline finished");

    let (mut migrated, mut unchanged) = (0usize, 0usize);
    for ((path, _), result) in loaded.iter().zip(results) {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                failures += 1;
                println!("FAIL  {}: {e}", path.display());
                continue;
            }
        };

        if report.is_noop() {
            unchanged += 1;
            println!("skip  {} (already {})", path.display(), report.migrated.source_version);
            continue;
        }

        let output = default_output_path(path);
        if !args.dry_run {
            if let Err(e) = repo.save(&output, report.document()) {
                failures += 1;
                println!("FAIL  {}: {e}", path.display());
                continue;
            }
        }
        migrated += 1;
        println!(
            "ok    {} -> {} ({} -> {}) sha256:{}",
            path.display(),
            output.display(),
            report.migrated.source_version,
            report.migrated.target_version,
            report.digest
        );
    }

    let verb = if args.dry_run { "would migrate" } else { "migrated" };
    println!("{verb} {migrated}, unchanged {unchanged}, failed {failures}");
    Ok(failures == 0)
}

// ── versions ──────────────────────────────────────────────────────────────────

pub fn versions() -> OssaResult<bool> {
    let rules = RuleSet::builtin(MigrationConfig::default());
    let table = rules.version_table();
    let current = VersionId::current();

    for entry in table.entries() {
        let api = entry.api_version.as_deref().unwrap_or("-");
        println!("{:<10} {:<12} {}", entry.id.as_str(), api, entry.description);

        let chain = rules.get_chain(&entry.id, &current)?;
        if !chain.is_empty() {
            let path: Vec<&str> = table
                .between(&entry.id, &current)
                .iter()
                .map(|e| e.id.as_str())
                .collect();
            println!("{:<10} path: {}", "", path.join(" -> "));
        }
    }
    Ok(true)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_rules(args: &RuleArgs) -> OssaResult<(RuleSet, VersionId)> {
    let config = match &args.config {
        Some(path) => MigrationConfig::from_file(path)?,
        None => MigrationConfig::default(),
    };
    let requested = args.target.clone().unwrap_or_else(|| config.target.clone());
    let rules = RuleSet::builtin(config);
    let target = resolve_version(rules.version_table(), &requested)?;
    Ok((rules, target))
}

fn load_validator(args: &SchemaArgs) -> OssaResult<SchemaValidator> {
    match &args.schema_dir {
        Some(dir) => SchemaValidator::with_schema_dir(dir),
        None => SchemaValidator::new(),
    }
}

fn resolve_version(table: &VersionTable, requested: &str) -> OssaResult<VersionId> {
    table.resolve(requested).ok_or_else(|| OssaError::ConfigError {
        reason: format!("unknown version '{requested}'"),
    })
}

fn print_warnings(report: &PipelineReport) {
    for warning in &report.post_validation.warnings {
        eprintln!("warning: {warning}");
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: failed to render JSON: {e}"),
    }
}
