use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::columns::ColumnOptions;
use crate::model::ResourceKind;
use crate::sort::SortDirection;

pub const DEFAULT_WIDE_COLUMNS: u16 = 160;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DefaultSort {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigSnapshot {
    pub source: Option<String>,
    pub drawer_enabled: Option<bool>,
    pub wide_columns: Option<u16>,
    pub hidden_columns: HashMap<ResourceKind, HashSet<String>>,
    pub default_sort: HashMap<ResourceKind, DefaultSort>,
    pub aliases: HashMap<String, ResourceKind>,
}

impl RuntimeConfigSnapshot {
    pub fn column_options(&self, kind: ResourceKind) -> ColumnOptions {
        ColumnOptions {
            hidden: self.hidden_columns.get(&kind).cloned().unwrap_or_default(),
        }
    }

    pub fn resolve_kind(&self, token: &str) -> Option<ResourceKind> {
        self.aliases
            .get(&token.to_ascii_lowercase())
            .copied()
            .or_else(|| ResourceKind::from_token(token))
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct CliOverrides {
    pub drawer_enabled: Option<bool>,
    pub wide_columns: Option<u16>,
}

impl CliOverrides {
    pub fn drawer_enabled(&self, file: &RuntimeConfigSnapshot) -> bool {
        self.drawer_enabled
            .or(file.drawer_enabled)
            .unwrap_or(true)
    }

    pub fn wide_columns(&self, file: &RuntimeConfigSnapshot) -> u16 {
        self.wide_columns
            .or(file.wide_columns)
            .unwrap_or(DEFAULT_WIDE_COLUMNS)
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfigWatcher {
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct KubeglanceConfigFile {
    #[serde(default)]
    drawer: DrawerSpec,
    #[serde(default)]
    columns: BTreeMap<String, ColumnSpec>,
    #[serde(default)]
    sort: BTreeMap<String, SortSpec>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct DrawerSpec {
    enabled: Option<bool>,
    #[serde(alias = "wide-columns", alias = "min_width")]
    wide_columns: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ColumnSpec {
    #[serde(default)]
    hidden: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SortSpec {
    column: String,
    #[serde(default = "default_sort_direction")]
    direction: String,
}

impl RuntimeConfigWatcher {
    pub fn discover() -> Self {
        Self {
            path: discover_config_path(),
            modified: None,
        }
    }

    pub fn load_current(&mut self) -> Result<RuntimeConfigSnapshot> {
        let Some(path) = self.path.clone() else {
            return Ok(RuntimeConfigSnapshot::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let mut snapshot = parse_config(&raw)
            .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
        self.modified = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok());

        snapshot.source = Some(path.display().to_string());
        Ok(snapshot)
    }

    pub fn reload_if_changed(&mut self) -> Result<Option<RuntimeConfigSnapshot>> {
        let Some(current_path) = self.path.clone() else {
            self.path = discover_config_path();
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(None);
        };

        if !current_path.exists() {
            self.path = discover_config_path();
            self.modified = None;
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(Some(RuntimeConfigSnapshot::default()));
        }

        let modified = fs::metadata(&current_path)
            .ok()
            .and_then(|meta| meta.modified().ok());
        if modified != self.modified {
            return self.load_current().map(Some);
        }

        Ok(None)
    }
}

/// Unknown kinds, aliases and sort directions are rejected so a typo does not
/// silently fall back to defaults.
fn parse_config(raw: &str) -> Result<RuntimeConfigSnapshot> {
    let parsed: KubeglanceConfigFile = serde_yaml::from_str(raw)?;

    let mut hidden_columns = HashMap::new();
    for (token, spec) in parsed.columns {
        let kind = kind_from_config(&token)?;
        hidden_columns.insert(kind, spec.hidden.into_iter().collect::<HashSet<_>>());
    }

    let mut default_sort = HashMap::new();
    for (token, spec) in parsed.sort {
        let kind = kind_from_config(&token)?;
        let direction = SortDirection::parse(&spec.direction)
            .with_context(|| format!("unknown sort direction {:?}", spec.direction))?;
        default_sort.insert(
            kind,
            DefaultSort {
                column: spec.column,
                direction,
            },
        );
    }

    let mut aliases = HashMap::new();
    for (alias, target) in parsed.aliases {
        let kind = kind_from_config(&target)?;
        aliases.insert(alias.to_ascii_lowercase(), kind);
    }

    Ok(RuntimeConfigSnapshot {
        source: None,
        drawer_enabled: parsed.drawer.enabled,
        wide_columns: parsed.drawer.wide_columns,
        hidden_columns,
        default_sort,
        aliases,
    })
}

fn kind_from_config(token: &str) -> Result<ResourceKind> {
    ResourceKind::from_token(token).with_context(|| format!("unknown resource kind {token:?}"))
}

fn default_sort_direction() -> String {
    "asc".to_string()
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBEGLANCE_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("kubeglance.yaml"),
        PathBuf::from("kubeglance.yml"),
        PathBuf::from(".kubeglance.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/kubeglance/config.yaml"),
            PathBuf::from(&home).join(".config/kubeglance/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{CliOverrides, DEFAULT_WIDE_COLUMNS, RuntimeConfigSnapshot, parse_config};
    use crate::model::ResourceKind;
    use crate::sort::SortDirection;

    #[test]
    fn parses_drawer_columns_sort_and_aliases() {
        let snapshot = parse_config(
            r#"
drawer:
  enabled: false
  wide_columns: 140
columns:
  pods:
    hidden: [ip, nominatedNode]
sort:
  deploy:
    column: pods
    direction: desc
aliases:
  workloads: deployments
"#,
        )
        .unwrap();

        assert_eq!(snapshot.drawer_enabled, Some(false));
        assert_eq!(snapshot.wide_columns, Some(140));
        assert!(
            snapshot
                .column_options(ResourceKind::Pods)
                .hidden
                .contains("ip")
        );
        let sort = &snapshot.default_sort[&ResourceKind::Deployments];
        assert_eq!(sort.column, "pods");
        assert_eq!(sort.direction, SortDirection::Descending);
        assert_eq!(
            snapshot.resolve_kind("Workloads"),
            Some(ResourceKind::Deployments)
        );
        assert_eq!(snapshot.resolve_kind("rs"), Some(ResourceKind::ReplicaSets));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let snapshot = parse_config("{}").unwrap();
        assert_eq!(snapshot.drawer_enabled, None);
        assert!(snapshot.hidden_columns.is_empty());
    }

    #[test]
    fn rejects_unknown_kinds_and_directions() {
        assert!(parse_config("columns:\n  services:\n    hidden: [ip]\n").is_err());
        assert!(parse_config("sort:\n  pods:\n    column: age\n    direction: up\n").is_err());
    }

    #[test]
    fn cli_overrides_beat_file_values() {
        let file = RuntimeConfigSnapshot {
            drawer_enabled: Some(true),
            wide_columns: Some(120),
            ..RuntimeConfigSnapshot::default()
        };
        let overrides = CliOverrides {
            drawer_enabled: Some(false),
            wide_columns: None,
        };
        assert!(!overrides.drawer_enabled(&file));
        assert_eq!(overrides.wide_columns(&file), 120);

        let defaults = CliOverrides::default();
        let empty = RuntimeConfigSnapshot::default();
        assert!(defaults.drawer_enabled(&empty));
        assert_eq!(defaults.wide_columns(&empty), DEFAULT_WIDE_COLUMNS);
    }
}
