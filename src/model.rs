use crate::dispatch::OperationId;
use crate::sort::{SortDirection, SortState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Namespaces,
    Deployments,
    ConfigMaps,
    Secrets,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ColumnSpec {
    pub accessor: &'static str,
    pub header: &'static str,
    pub sortable: bool,
}

const fn sortable(accessor: &'static str, header: &'static str) -> ColumnSpec {
    ColumnSpec {
        accessor,
        header,
        sortable: true,
    }
}

const ACTION_COLUMN: ColumnSpec = ColumnSpec {
    accessor: "action",
    header: "Action",
    sortable: false,
};

const NAMESPACE_COLUMNS: [ColumnSpec; 5] = [
    sortable("namespace", "Namespace Name"),
    sortable("pod", "Pod"),
    sortable("app", "App"),
    sortable("cloned", "Cloned"),
    ACTION_COLUMN,
];

const DEPLOYMENT_COLUMNS: [ColumnSpec; 5] = [
    sortable("name", "Deployment"),
    sortable("namespace", "Namespace"),
    sortable("pod", "Pod"),
    sortable("app", "App"),
    ACTION_COLUMN,
];

const KEY_VALUE_COLUMNS: [ColumnSpec; 3] = [
    sortable("key", "Key"),
    sortable("value", "Value"),
    ACTION_COLUMN,
];

impl ResourceKind {
    pub const ALL: [Self; 4] = [
        Self::Namespaces,
        Self::Deployments,
        Self::ConfigMaps,
        Self::Secrets,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Namespaces => "Namespaces",
            Self::Deployments => "Deployments",
            Self::ConfigMaps => "Config Maps",
            Self::Secrets => "Secrets",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "ns" | "namespace" | "namespaces" => Some(Self::Namespaces),
            "deploy" | "deployment" | "deployments" | "dp" => Some(Self::Deployments),
            "cm" | "configmap" | "configmaps" | "config-map" | "config-maps" => {
                Some(Self::ConfigMaps)
            }
            "secret" | "secrets" => Some(Self::Secrets),
            _ => None,
        }
    }

    pub fn list_operation(self) -> OperationId {
        match self {
            Self::Namespaces => OperationId::ListNamespaces,
            Self::Deployments => OperationId::ListDeployments,
            Self::ConfigMaps => OperationId::ListConfigMaps,
            Self::Secrets => OperationId::ListSecrets,
        }
    }

    /// Field that may wrap the list when the server answers with an object.
    pub fn envelope_field(self) -> &'static str {
        match self {
            Self::Namespaces => "namespaces",
            Self::Deployments => "deployments",
            Self::ConfigMaps => "configMaps",
            Self::Secrets => "secrets",
        }
    }

    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            Self::Namespaces => &NAMESPACE_COLUMNS,
            Self::Deployments => &DEPLOYMENT_COLUMNS,
            Self::ConfigMaps | Self::Secrets => &KEY_VALUE_COLUMNS,
        }
    }

    pub fn initial_sort(self) -> SortState {
        let accessors = self
            .columns()
            .iter()
            .filter(|column| column.sortable)
            .map(|column| column.accessor);
        let state = SortState::new(accessors);
        match self {
            Self::Namespaces => state.with_active("app", SortDirection::Ascending),
            Self::Deployments => state.with_active("namespace", SortDirection::Ascending),
            Self::ConfigMaps | Self::Secrets => state.with_active("key", SortDirection::Ascending),
        }
    }
}

/// A server-sourced row. Records are read-only on the client; changes go
/// through write operations followed by a reload.
pub trait Record: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn row_key(&self) -> String;

    fn cell(&self, accessor: &str) -> Option<String>;
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub namespace: String,
    #[serde(default, rename = "Pod", alias = "pod")]
    pub pod: Option<String>,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default, deserialize_with = "flag_string")]
    pub cloned: Option<String>,
}

impl NamespaceRecord {
    pub fn is_cloned(&self) -> bool {
        self.cloned
            .as_deref()
            .is_some_and(|flag| flag.eq_ignore_ascii_case("true"))
    }
}

impl Record for NamespaceRecord {
    const KIND: ResourceKind = ResourceKind::Namespaces;

    fn row_key(&self) -> String {
        self.namespace.clone()
    }

    fn cell(&self, accessor: &str) -> Option<String> {
        match accessor {
            "namespace" => Some(self.namespace.clone()),
            "pod" => self.pod.clone(),
            "app" => self.app.clone(),
            "cloned" => self.cloned.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub pod: Option<String>,
    #[serde(default)]
    pub app: Option<String>,
    /// Each entry maps container name to image.
    #[serde(default)]
    pub containers: Vec<BTreeMap<String, String>>,
    #[serde(default, alias = "Replicas", skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

impl DeploymentRecord {
    /// First container of the first container map; image updates target it.
    pub fn primary_container(&self) -> Option<(&str, &str)> {
        self.containers
            .first()
            .and_then(|containers| containers.iter().next())
            .map(|(name, image)| (name.as_str(), image.as_str()))
    }

    pub fn is_scaled_down(&self) -> bool {
        self.replicas == Some(0)
    }
}

impl Record for DeploymentRecord {
    const KIND: ResourceKind = ResourceKind::Deployments;

    fn row_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    fn cell(&self, accessor: &str) -> Option<String> {
        match accessor {
            "name" => Some(self.name.clone()),
            "namespace" => Some(self.namespace.clone()),
            "pod" => self.pod.clone(),
            "app" => self.app.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfigMapRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Only the first key/value pair of a data map is surfaced.
fn first_entry(data: &BTreeMap<String, String>) -> Option<(&str, &str)> {
    data.iter()
        .next()
        .map(|(key, value)| (key.as_str(), value.as_str()))
}

fn key_value_cell(data: &BTreeMap<String, String>, accessor: &str) -> Option<String> {
    let (key, value) = first_entry(data)?;
    match accessor {
        "key" => Some(key.to_string()),
        "value" => Some(value.to_string()),
        _ => None,
    }
}

impl ConfigMapRecord {
    pub fn entry(&self) -> Option<(&str, &str)> {
        first_entry(&self.data)
    }
}

impl SecretRecord {
    pub fn entry(&self) -> Option<(&str, &str)> {
        first_entry(&self.data)
    }
}

impl Record for ConfigMapRecord {
    const KIND: ResourceKind = ResourceKind::ConfigMaps;

    fn row_key(&self) -> String {
        self.name.clone()
    }

    fn cell(&self, accessor: &str) -> Option<String> {
        key_value_cell(&self.data, accessor)
    }
}

impl Record for SecretRecord {
    const KIND: ResourceKind = ResourceKind::Secrets;

    fn row_key(&self) -> String {
        self.name.clone()
    }

    fn cell(&self, accessor: &str) -> Option<String> {
        key_value_cell(&self.data, accessor)
    }
}

/// Accepts `"true"`, `true` or null for string-typed flags.
fn flag_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(Option::<Flag>::deserialize(deserializer)?.map(|flag| match flag {
        Flag::Bool(value) => value.to_string(),
        Flag::Text(value) => value,
    }))
}
