use crate::cli::CliArgs;
use crate::model::ResourceKind;
use crate::pagination::DEFAULT_PAGE_SIZE;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub source: Option<String>,
    pub page_size: usize,
    pub fixtures: Option<PathBuf>,
    pub latency: Duration,
    pub start_namespace: Option<String>,
    pub start_view: ResourceKind,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct NsdeckConfigFile {
    #[serde(default, alias = "pageSize")]
    page_size: Option<usize>,
    #[serde(default, alias = "fixture")]
    fixtures: Option<PathBuf>,
    #[serde(default, alias = "latency")]
    latency_ms: Option<u64>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    view: Option<String>,
}

impl RuntimeConfig {
    /// Reads the config file, if one is found, and lays the CLI flags over it.
    pub fn resolve(args: &CliArgs) -> Result<Self> {
        let Some(path) = args.config.clone().or_else(discover_config_path) else {
            return Ok(Self::merge(NsdeckConfigFile::default(), None, args));
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let parsed: NsdeckConfigFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
        Ok(Self::merge(parsed, Some(path.display().to_string()), args))
    }

    fn merge(file: NsdeckConfigFile, source: Option<String>, args: &CliArgs) -> Self {
        let mut page_size = args
            .page_size
            .or(file.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            warn!("page size 0 is not usable, falling back to {DEFAULT_PAGE_SIZE}");
            page_size = DEFAULT_PAGE_SIZE;
        }

        let start_view = match args.view.clone().or(file.view) {
            None => ResourceKind::Deployments,
            Some(token) => match ResourceKind::from_token(&token) {
                Some(kind) => kind,
                None => {
                    warn!("unknown view '{token}', opening deployments");
                    ResourceKind::Deployments
                }
            },
        };

        Self {
            source,
            page_size,
            fixtures: args.fixtures.clone().or(file.fixtures),
            latency: Duration::from_millis(args.latency_ms.or(file.latency_ms).unwrap_or(0)),
            start_namespace: args
                .namespace
                .clone()
                .or(file.namespace)
                .filter(|namespace| !namespace.trim().is_empty()),
            start_view,
        }
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("NSDECK_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("nsdeck.yaml"),
        PathBuf::from("nsdeck.yml"),
        PathBuf::from(".nsdeck.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/nsdeck/config.yaml"),
            PathBuf::from(&home).join(".config/nsdeck/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}
