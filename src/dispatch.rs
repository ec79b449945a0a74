//! Translation of abstract operations into wire-level request descriptors.
//!
//! Everything here is a pure function of its inputs. Failures never panic:
//! they are logged and produce an empty descriptor, which callers must not
//! send.

use crate::error::ClientError;
use crate::sort::SortDirection;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use tracing::warn;

const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum OperationId {
    ListNamespaces,
    ListDeployments,
    ListConfigMaps,
    ListSecrets,
    UpdateDeploymentImage,
    ScaleDeployment,
    UpdateConfigMap,
    UpdateSecret,
    CloneNamespace,
}

impl OperationId {
    pub const ALL: [Self; 9] = [
        Self::ListNamespaces,
        Self::ListDeployments,
        Self::ListConfigMaps,
        Self::ListSecrets,
        Self::UpdateDeploymentImage,
        Self::ScaleDeployment,
        Self::UpdateConfigMap,
        Self::UpdateSecret,
        Self::CloneNamespace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ListNamespaces => "ListNamespaces",
            Self::ListDeployments => "ListDeployments",
            Self::ListConfigMaps => "ListConfigMaps",
            Self::ListSecrets => "ListSecrets",
            Self::UpdateDeploymentImage => "UpdateDeploymentImage",
            Self::ScaleDeployment => "ScaleDeployment",
            Self::UpdateConfigMap => "UpdateConfigMap",
            Self::UpdateSecret => "UpdateSecret",
            Self::CloneNamespace => "CloneNamespace",
        }
    }

    /// Feature identifier used by the backend's own clients.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::ListNamespaces => "FETCH_ALL_NAMESPACES",
            Self::ListDeployments => "FETCH_ALL_NAMESPACE_DEPLOYMENTS",
            Self::ListConfigMaps => "FETCH_ALL_NAMESPACE_CONFIG_MAPS",
            Self::ListSecrets => "FETCH_ALL_NAMESPACE_SECRETS",
            Self::UpdateDeploymentImage => "UPDATE_DEPLOYMENT_IMAGE",
            Self::ScaleDeployment => "INCREASE_DEPLOYMENT_REPLICAS",
            Self::UpdateConfigMap => "UPDATE_CONFIG_MAP",
            Self::UpdateSecret => "UPDATE_SECRET",
            Self::CloneNamespace => "CLONE_NAMESPACE",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.name() == token || op.wire_name().eq_ignore_ascii_case(token))
    }

    pub fn is_write(self) -> bool {
        !matches!(
            self,
            Self::ListNamespaces | Self::ListDeployments | Self::ListConfigMaps | Self::ListSecrets
        )
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty descriptor means "do not send".
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    fn get(path: String) -> Self {
        Self {
            method: Method::Get,
            path,
            body: None,
        }
    }

    fn post(path: String, body: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            path,
            body,
        }
    }
}

impl Display for RequestDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "<empty request>");
        }
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Optional paging and ordering hints for list requests.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: usize,
    pub sort: Option<(String, SortDirection)>,
}

impl ListQuery {
    fn query_string(&self) -> String {
        let mut pairs = vec![
            format!("page={}", self.page),
            format!("limit={}", self.limit),
        ];
        if let Some((accessor, direction)) = &self.sort
            && let Some(order) = direction.query_value()
        {
            pairs.push(format!("sortBy={accessor}"));
            pairs.push(format!("order={order}"));
        }
        pairs.join("&")
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ParamBag {
    pub namespace_name: Option<String>,
    pub deployment: Option<String>,
    pub config_map: Option<String>,
    pub secret: Option<String>,
    pub container: Option<String>,
    pub image: Option<String>,
    pub target_namespace: Option<String>,
    pub update_object: Option<BTreeMap<String, String>>,
    pub list: Option<ListQuery>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace_name = Some(namespace.into());
        self
    }

    pub fn deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    pub fn config_map(mut self, config_map: impl Into<String>) -> Self {
        self.config_map = Some(config_map.into());
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn target_namespace(mut self, target: impl Into<String>) -> Self {
        self.target_namespace = Some(target.into());
        self
    }

    pub fn update_object(mut self, update: BTreeMap<String, String>) -> Self {
        self.update_object = Some(update);
        self
    }

    pub fn list_query(mut self, query: ListQuery) -> Self {
        self.list = Some(query);
        self
    }
}

/// Builds the request for `operation`, logging and returning an empty
/// descriptor when the parameters cannot satisfy it.
pub fn build(operation: OperationId, params: &ParamBag) -> RequestDescriptor {
    match try_build(operation, params) {
        Ok(request) => request,
        Err(error) => {
            warn!(%operation, "request not built: {error}");
            RequestDescriptor::empty()
        }
    }
}

/// Same as [`build`] for callers holding a textual operation identifier.
pub fn build_named(operation: &str, params: &ParamBag) -> RequestDescriptor {
    match OperationId::from_token(operation) {
        Some(operation) => build(operation, params),
        None => {
            let error = ClientError::UnmappedOperation(operation.to_string());
            warn!("{error}");
            RequestDescriptor::empty()
        }
    }
}

pub fn try_build(
    operation: OperationId,
    params: &ParamBag,
) -> Result<RequestDescriptor, ClientError> {
    let request = match operation {
        OperationId::ListNamespaces => {
            RequestDescriptor::get(list_path(format!("{API_PREFIX}/namespaces"), params))
        }
        OperationId::ListDeployments => {
            let namespace = required(operation, "namespaceName", &params.namespace_name)?;
            RequestDescriptor::get(list_path(
                format!("{API_PREFIX}/namespaces/{namespace}/deployments/display"),
                params,
            ))
        }
        OperationId::ListConfigMaps => {
            let namespace = required(operation, "namespaceName", &params.namespace_name)?;
            RequestDescriptor::get(list_path(
                format!("{API_PREFIX}/namespaces/{namespace}/configmaps/display"),
                params,
            ))
        }
        OperationId::ListSecrets => {
            let namespace = required(operation, "namespaceName", &params.namespace_name)?;
            RequestDescriptor::get(list_path(
                format!("{API_PREFIX}/namespaces/{namespace}/secrets/display"),
                params,
            ))
        }
        OperationId::UpdateDeploymentImage => {
            let deployment = required(operation, "deployment", &params.deployment)?;
            let container = required(operation, "container", &params.container)?;
            let image = required(operation, "image", &params.image)?;
            let namespace = required(operation, "namespace", &params.namespace_name)?;
            RequestDescriptor::post(
                format!("{API_PREFIX}/deployments/{deployment}"),
                Some(json!({
                    "container": container,
                    "image": image,
                    "namespace": namespace,
                })),
            )
        }
        OperationId::ScaleDeployment => {
            let deployment = required(operation, "deployment", &params.deployment)?;
            RequestDescriptor::post(format!("{API_PREFIX}/deployments/{deployment}/scaleup"), None)
        }
        OperationId::UpdateConfigMap => {
            let config_map = required(operation, "configMap", &params.config_map)?;
            let (data, namespace) = data_update(operation, params)?;
            RequestDescriptor::post(
                format!("{API_PREFIX}/configmaps/{config_map}"),
                Some(json!({ "data": data, "namespace": namespace })),
            )
        }
        OperationId::UpdateSecret => {
            let secret = required(operation, "secret", &params.secret)?;
            let (data, namespace) = data_update(operation, params)?;
            RequestDescriptor::post(
                format!("{API_PREFIX}/secrets/{secret}"),
                Some(json!({ "data": data, "namespace": namespace })),
            )
        }
        OperationId::CloneNamespace => {
            let namespace = required(operation, "namespaceName", &params.namespace_name)?;
            let target = required(operation, "targetNamespace", &params.target_namespace)?;
            RequestDescriptor::post(
                format!("{API_PREFIX}/namespaces/{namespace}/cloneNamespace"),
                Some(json!({ "targetNamespace": target })),
            )
        }
    };

    Ok(request)
}

fn required<'a>(
    operation: OperationId,
    param: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, ClientError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ClientError::MissingParam {
            operation: operation.name(),
            param,
        }),
    }
}

fn data_update<'a>(
    operation: OperationId,
    params: &'a ParamBag,
) -> Result<(&'a BTreeMap<String, String>, &'a str), ClientError> {
    let data = params
        .update_object
        .as_ref()
        .ok_or(ClientError::MissingParam {
            operation: operation.name(),
            param: "updateObject",
        })?;
    let namespace = required(operation, "namespaceName", &params.namespace_name)?;
    Ok((data, namespace))
}

fn list_path(path: String, params: &ParamBag) -> String {
    match &params.list {
        Some(query) => format!("{path}?{}", query.query_string()),
        None => path,
    }
}
