//! Input loading: JSON or YAML attack-tree documents from files or strings.

use std::path::Path;

use cyberpath_core::{AttackInput, AttackNodeRecord};

use crate::error::Result;

/// Document encoding of an attack-tree input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    Json,
    Yaml,
}

impl InputFormat {
    /// Guess from the file extension; anything not `.json` is read as YAML,
    /// which also accepts JSON documents.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Parse a document into root records, in declaration order.
pub fn parse_document(text: &str, format: InputFormat) -> Result<Vec<AttackNodeRecord>> {
    let input: AttackInput = match format {
        InputFormat::Json => serde_json::from_str(text)?,
        InputFormat::Yaml => serde_yaml::from_str(text)?,
    };
    let roots = input.into_roots();

    tracing::debug!(roots = roots.len(), format = ?format, "Attack tree document parsed");
    Ok(roots)
}

/// Read and parse a file. `format` overrides extension detection.
pub fn load_file(path: &Path, format: Option<InputFormat>) -> Result<Vec<AttackNodeRecord>> {
    let text = std::fs::read_to_string(path)?;
    let format = format.unwrap_or_else(|| InputFormat::from_path(path));
    parse_document(&text, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML_DOC: &str = r#"
attack_paths:
  - name: Compromise Organization
    severity: 4
    feasibility: 4
    expertise: 3
    subpaths:
      - name: Phish HR
        severity: 4
        feasibility: 3
        expertise: 3
        steps:
          - source: Attacker
            destination: HR mailbox
            action: Send payroll lure
"#;

    #[test]
    fn test_format_from_path() {
        assert_eq!(InputFormat::from_path(Path::new("tree.json")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("tree.JSON")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("tree.yaml")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("tree")), InputFormat::Yaml);
    }

    #[test]
    fn test_parse_yaml_document() {
        let roots = parse_document(YAML_DOC, InputFormat::Yaml).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "Compromise Organization");
        assert_eq!(roots[0].subpaths[0].steps[0].action, "Send payroll lure");
    }

    #[test]
    fn test_parse_json_shapes() {
        let single = r#"{"name": "a", "severity": 1, "feasibility": 1, "expertise": 1}"#;
        assert_eq!(parse_document(single, InputFormat::Json).unwrap().len(), 1);

        let forest = r#"[{"name": "a"}, {"name": "b"}]"#;
        assert_eq!(parse_document(forest, InputFormat::Json).unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(parse_document("{not json", InputFormat::Json).is_err());
        assert!(parse_document("attack_paths: [", InputFormat::Yaml).is_err());
    }

    #[test]
    fn test_yaml_and_json_parse_alike() {
        let from_yaml = parse_document(YAML_DOC, InputFormat::Yaml).unwrap();
        let json = serde_json::to_string(&serde_json::json!({
            "attack_paths": [{
                "name": "Compromise Organization",
                "severity": 4, "feasibility": 4, "expertise": 3,
                "subpaths": [{
                    "name": "Phish HR",
                    "severity": 4, "feasibility": 3, "expertise": 3,
                    "steps": [{
                        "source": "Attacker",
                        "destination": "HR mailbox",
                        "action": "Send payroll lure"
                    }]
                }]
            }]
        }))
        .unwrap();
        let from_json = parse_document(&json, InputFormat::Json).unwrap();

        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.yaml");
        std::fs::write(&path, YAML_DOC).unwrap();

        let roots = load_file(&path, None).unwrap();
        assert_eq!(roots[0].subpaths.len(), 1);

        assert!(load_file(&dir.path().join("missing.yaml"), None).is_err());
    }
}
