use std::path::Path;

use anyhow::bail;
use serde::Serialize;
use tracing::{debug, warn};

use crate::manifest;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestReport {
    pub file: String,
    pub kind: String,
    pub name: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub manifests: Vec<ManifestReport>,
    /// Files that could not be parsed at all.
    pub unreadable: Vec<String>,
}

impl ValidationReport {
    pub fn invalid_count(&self) -> usize {
        self.manifests.iter().filter(|m| !m.errors.is_empty()).count() + self.unreadable.len()
    }
}

/// Validate every manifest under `path` without printing anything.
pub fn check(path: &Path) -> anyhow::Result<ValidationReport> {
    let mut report = ValidationReport::default();
    for file in manifest::discover(path)? {
        let shown = file.display().to_string();
        let manifests = match manifest::load(&file) {
            Ok(m) => m,
            Err(e) => {
                let message = format!("{e:#}");
                warn!(file = %shown, error = %message, "unreadable manifest");
                report.unreadable.push(format!("{shown}: {message}"));
                continue;
            }
        };
        for m in manifests {
            let errors: Vec<String> = m.validate().iter().map(ToString::to_string).collect();
            debug!(file = %shown, kind = m.kind(), name = m.name(), errors = errors.len(), "validated");
            report.manifests.push(ManifestReport {
                file: shown.clone(),
                kind: m.kind().to_string(),
                name: m.name().to_string(),
                errors,
            });
        }
    }
    Ok(report)
}

pub fn validate(path: &str, format: &str) -> anyhow::Result<()> {
    let report = check(Path::new(path))?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            for m in &report.manifests {
                if m.errors.is_empty() {
                    println!("✓ {} {} ({})", m.kind, m.name, m.file);
                } else {
                    println!("✗ {} {} ({})", m.kind, m.name, m.file);
                    for e in &m.errors {
                        println!("    {e}");
                    }
                }
            }
            for u in &report.unreadable {
                println!("✗ {u}");
            }
        }
    }

    let invalid = report.invalid_count();
    if invalid > 0 {
        bail!("{invalid} invalid manifest(s)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "kind": "StickyBinding",
        "metadata": {"name": "ok"},
        "spec": {"sessionIdentifier": "s1", "targetCluster": "c1", "weight": 75}
    }"#;

    const INVALID: &str = r#"{
        "kind": "StickyBinding",
        "metadata": {"name": "heavy"},
        "spec": {"sessionIdentifier": "s1", "targetCluster": "c1", "weight": 150}
    }"#;

    #[test]
    fn reports_every_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), VALID).unwrap();
        std::fs::write(dir.path().join("b.json"), INVALID).unwrap();

        let report = check(dir.path()).unwrap();
        assert_eq!(report.manifests.len(), 2);
        assert_eq!(report.invalid_count(), 1);
        let heavy = report.manifests.iter().find(|m| m.name == "heavy").unwrap();
        assert_eq!(heavy.errors.len(), 1);
        assert!(heavy.errors[0].starts_with("spec.weight"));
    }

    #[test]
    fn unparseable_file_counts_as_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let report = check(dir.path()).unwrap();
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.invalid_count(), 1);
    }

    #[test]
    fn invalid_manifests_fail_the_command() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), INVALID).unwrap();
        assert!(validate(dir.path().to_str().unwrap(), "text").is_err());

        std::fs::write(dir.path().join("b.json"), VALID).unwrap();
        assert!(validate(dir.path().to_str().unwrap(), "json").is_ok());
    }
}
