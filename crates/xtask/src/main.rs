use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("arch-check") => arch_check(),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  arch-check"),
    }
}

#[derive(Deserialize)]
struct Metadata {
    packages: Vec<Package>,
    workspace_root: PathBuf,
}

#[derive(Deserialize)]
struct Package {
    name: String,
    dependencies: Vec<Dependency>,
}

#[derive(Deserialize)]
struct Dependency {
    name: String,
    kind: Option<String>,
}

/// Crates each layer may not depend on (normal dependencies only).
const FORBIDDEN_DEPS: &[(&str, &[&str])] = &[
    (
        "spellbook-domain",
        &["tokio", "async-trait", "futures-util", "spellbook-shared", "spellbook-engine"],
    ),
    ("spellbook-shared", &["tokio", "spellbook-engine"]),
];

/// Source patterns that mean I/O or async leaked into the domain crate.
const DOMAIN_FORBIDDEN_SOURCE: &[&str] = &[r"\basync\s+fn\b", r"\bstd::fs\b", r"\btokio::"];

fn arch_check() -> anyhow::Result<()> {
    let output = std::process::Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed")
    }
    let metadata: Metadata =
        serde_json::from_slice(&output.stdout).context("parsing cargo metadata")?;

    let mut violations = Vec::new();
    for (crate_name, forbidden) in FORBIDDEN_DEPS {
        let Some(package) = metadata.packages.iter().find(|p| &p.name == crate_name) else {
            continue;
        };
        for dep in package
            .dependencies
            .iter()
            .filter(|dep| dep.kind.is_none())
            .filter(|dep| forbidden.contains(&dep.name.as_str()))
        {
            violations.push(format!("{crate_name} depends on {}", dep.name));
        }
    }

    let patterns = DOMAIN_FORBIDDEN_SOURCE
        .iter()
        .map(|pattern| regex_lite::Regex::new(pattern))
        .collect::<Result<Vec<_>, _>>()
        .context("compiling source patterns")?;
    let domain_src = metadata.workspace_root.join("crates/domain/src");
    for file in rust_files(&domain_src)? {
        let source = std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        for (index, line) in source.lines().enumerate() {
            if line.trim_start().starts_with("//") {
                continue;
            }
            if patterns.iter().any(|pattern| pattern.is_match(line)) {
                violations.push(format!("{}:{}: {}", file.display(), index + 1, line.trim()));
            }
        }
    }

    if violations.is_empty() {
        println!("arch-check: ok");
        return Ok(());
    }
    for violation in &violations {
        eprintln!("arch-check: {violation}");
    }
    anyhow::bail!("{} architecture violation(s)", violations.len())
}

fn rust_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(rust_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    Ok(files)
}
