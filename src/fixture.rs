//! In-memory backend that answers the nine API endpoints the way the cluster
//! service does. Writes are applied to the in-memory data so reloads after a
//! write observe them.

use crate::dispatch::{ListQuery, Method, RequestDescriptor};
use crate::error::TransportError;
use crate::model::{ConfigMapRecord, DeploymentRecord, NamespaceRecord, Record, SecretRecord};
use crate::sort::SortDirection;
use crate::transport::Transport;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const API_PREFIX: &str = "/api/v1/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub namespaces: Vec<NamespaceRecord>,
    #[serde(default)]
    pub deployments: Vec<DeploymentRecord>,
    #[serde(default, alias = "configMaps")]
    pub config_maps: Vec<ConfigMapRecord>,
    #[serde(default)]
    pub secrets: Vec<SecretRecord>,
}

impl FixtureData {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixtures {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse fixtures {}", path.display()))
    }

    /// Built-in data set: more namespaces than fit on one page, two of them
    /// clones with scaled-down workloads.
    pub fn demo() -> Self {
        let teams = [
            ("payments", "ledger"),
            ("checkout", "cart"),
            ("catalog", "products"),
            ("search", "indexer"),
            ("inventory", "stock"),
            ("shipping", "carrier"),
            ("billing", "invoices"),
            ("identity", "auth"),
            ("notifications", "mailer"),
            ("analytics", "events"),
            ("reporting", "exports"),
            ("gateway", "edge"),
        ];

        let mut data = FixtureData::default();
        for (pod, app) in teams {
            data.namespaces.push(namespace(pod, pod, app, false));
        }
        for (name, pod, app) in [
            ("payments-qa", "payments", "ledger"),
            ("checkout-staging", "checkout", "cart"),
        ] {
            data.namespaces.push(namespace(name, pod, app, true));
        }

        data.deployments = vec![
            deployment("payments-qa", "ledger-api", "ledger", "api", "ghcr.io/acme/ledger:2.4.1", 0),
            deployment("payments-qa", "ledger-worker", "ledger", "worker", "ghcr.io/acme/ledger:2.4.1", 0),
            deployment("payments-qa", "fx-rates", "ledger", "rates", "ghcr.io/acme/fx:1.9.0", 1),
            deployment("checkout-staging", "cart-api", "cart", "api", "ghcr.io/acme/cart:5.0.3", 0),
            deployment("checkout-staging", "cart-web", "cart", "web", "nginx:1.25", 1),
            deployment("payments", "ledger-api", "ledger", "api", "ghcr.io/acme/ledger:2.4.1", 3),
        ];

        data.config_maps = vec![
            config_map("payments-qa", "ledger-settings", "LEDGER_CURRENCY", "EUR"),
            config_map("payments-qa", "fx-settings", "FX_PROVIDER", "ecb"),
            config_map("checkout-staging", "cart-settings", "CART_TTL_SECONDS", "900"),
        ];
        data.secrets = vec![
            secret("payments-qa", "ledger-db", "DATABASE_URL", "postgres://ledger@db/ledger"),
            secret("checkout-staging", "cart-redis", "REDIS_PASSWORD", "s3cr3t"),
        ];
        data
    }
}

fn namespace(name: &str, pod: &str, app: &str, cloned: bool) -> NamespaceRecord {
    NamespaceRecord {
        namespace: name.to_string(),
        pod: Some(pod.to_string()),
        app: Some(app.to_string()),
        cloned: Some(cloned.to_string()),
    }
}

fn deployment(
    namespace: &str,
    name: &str,
    pod: &str,
    container: &str,
    image: &str,
    replicas: i32,
) -> DeploymentRecord {
    DeploymentRecord {
        name: name.to_string(),
        namespace: namespace.to_string(),
        pod: Some(pod.to_string()),
        app: Some(name.to_string()),
        containers: vec![BTreeMap::from([(container.to_string(), image.to_string())])],
        replicas: Some(replicas),
    }
}

fn config_map(namespace: &str, name: &str, key: &str, value: &str) -> ConfigMapRecord {
    ConfigMapRecord {
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
        data: BTreeMap::from([(key.to_string(), value.to_string())]),
    }
}

fn secret(namespace: &str, name: &str, key: &str, value: &str) -> SecretRecord {
    SecretRecord {
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
        data: BTreeMap::from([(key.to_string(), value.to_string())]),
    }
}

pub struct FixtureTransport {
    data: Mutex<FixtureData>,
    latency: Duration,
}

impl FixtureTransport {
    pub fn new(data: FixtureData, latency: Duration) -> Self {
        Self {
            data: Mutex::new(data),
            latency,
        }
    }

    fn data(&self) -> Result<MutexGuard<'_, FixtureData>, TransportError> {
        self.data
            .lock()
            .map_err(|_| TransportError::Connection("fixture backend is unavailable".to_string()))
    }

    fn route(&self, request: &RequestDescriptor) -> Result<Value, TransportError> {
        let (path, query) = request
            .path
            .split_once('?')
            .unwrap_or((request.path.as_str(), ""));
        let Some(route) = path.strip_prefix(API_PREFIX) else {
            return Err(not_found(path));
        };
        let segments = route.split('/').collect::<Vec<_>>();
        let window = parse_list_query(query);
        let body = request.body.as_ref();
        let mut data = self.data()?;

        match (request.method, segments.as_slice()) {
            (Method::Get, ["namespaces"]) => list_response(data.namespaces.clone(), window.as_ref()),
            (Method::Get, ["namespaces", namespace, "deployments", "display"]) => {
                ensure_namespace(&data, namespace)?;
                let deployments = data
                    .deployments
                    .iter()
                    .filter(|deployment| deployment.namespace == *namespace)
                    .cloned()
                    .collect::<Vec<_>>();
                if deployments.is_empty() {
                    return Ok(json!({ "message": "No active deployments found" }));
                }
                Ok(json!({ "deployments": list_response(deployments, window.as_ref())? }))
            }
            (Method::Get, ["namespaces", namespace, "configmaps", "display"]) => {
                ensure_namespace(&data, namespace)?;
                let config_maps = data
                    .config_maps
                    .iter()
                    .filter(|config_map| config_map.namespace.as_deref() == Some(*namespace))
                    .cloned()
                    .collect();
                list_response(config_maps, window.as_ref())
            }
            (Method::Get, ["namespaces", namespace, "secrets", "display"]) => {
                ensure_namespace(&data, namespace)?;
                let secrets = data
                    .secrets
                    .iter()
                    .filter(|secret| secret.namespace.as_deref() == Some(*namespace))
                    .cloned()
                    .collect();
                list_response(secrets, window.as_ref())
            }
            (Method::Post, ["deployments", name]) => update_image(&mut data, name, body),
            (Method::Post, ["deployments", name, "scaleup"]) => scale_up(&mut data, name),
            (Method::Post, ["configmaps", name]) => {
                let (namespace, update) = data_update(body)?;
                let config_map = data
                    .config_maps
                    .iter_mut()
                    .find(|cm| cm.name == *name && cm.namespace.as_deref() == Some(namespace))
                    .ok_or_else(|| not_found(&format!("configmap {namespace}/{name}")))?;
                config_map.data.extend(update);
                Ok(json!({ "message": format!("ConfigMap {name} updated") }))
            }
            (Method::Post, ["secrets", name]) => {
                let (namespace, update) = data_update(body)?;
                let secret = data
                    .secrets
                    .iter_mut()
                    .find(|s| s.name == *name && s.namespace.as_deref() == Some(namespace))
                    .ok_or_else(|| not_found(&format!("secret {namespace}/{name}")))?;
                secret.data.extend(update);
                Ok(json!({ "message": format!("Secret {name} updated") }))
            }
            (Method::Post, ["namespaces", source, "cloneNamespace"]) => {
                let target = body_str(body, "targetNamespace")?;
                clone_namespace(&mut data, source, target)
            }
            _ => Err(not_found(path)),
        }
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value, TransportError> {
        if request.is_empty() {
            return Err(TransportError::Rejected("empty request descriptor".to_string()));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = self.route(request);
        debug!(%request, ok = result.is_ok(), "fixture request served");
        result
    }
}

fn not_found(what: &str) -> TransportError {
    TransportError::Status {
        status: 404,
        message: format!("{what} not found"),
    }
}

fn bad_request(message: impl Into<String>) -> TransportError {
    TransportError::Status {
        status: 400,
        message: message.into(),
    }
}

fn ensure_namespace(data: &FixtureData, namespace: &str) -> Result<(), TransportError> {
    if data.namespaces.iter().any(|ns| ns.namespace == namespace) {
        Ok(())
    } else {
        Err(not_found(&format!("namespace {namespace}")))
    }
}

fn body_str<'a>(body: Option<&'a Value>, field: &str) -> Result<&'a str, TransportError> {
    body.and_then(|body| body.get(field))
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| bad_request(format!("missing field '{field}'")))
}

fn data_update(body: Option<&Value>) -> Result<(&str, BTreeMap<String, String>), TransportError> {
    let namespace = body_str(body, "namespace")?;
    let Some(Value::Object(fields)) = body.and_then(|body| body.get("data")) else {
        return Err(bad_request("missing field 'data'"));
    };
    let update = fields
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect();
    Ok((namespace, update))
}

fn update_image(
    data: &mut FixtureData,
    name: &str,
    body: Option<&Value>,
) -> Result<Value, TransportError> {
    let container = body_str(body, "container")?;
    let image = body_str(body, "image")?;
    let namespace = body_str(body, "namespace")?;

    let deployment = data
        .deployments
        .iter_mut()
        .find(|deployment| deployment.name == name && deployment.namespace == namespace)
        .ok_or_else(|| not_found(&format!("deployment {namespace}/{name}")))?;
    let slot = deployment
        .containers
        .iter_mut()
        .find_map(|containers| containers.get_mut(container))
        .ok_or_else(|| bad_request(format!("container {container} not found in {name}")))?;
    *slot = image.to_string();
    Ok(json!({ "message": format!("Deployment {name} updated to {image}") }))
}

/// The scale-up endpoint carries no namespace; a scaled-down deployment of
/// that name wins over one that is already running.
fn scale_up(data: &mut FixtureData, name: &str) -> Result<Value, TransportError> {
    let index = data
        .deployments
        .iter()
        .position(|deployment| deployment.name == name && deployment.is_scaled_down())
        .or_else(|| {
            data.deployments
                .iter()
                .position(|deployment| deployment.name == name)
        })
        .ok_or_else(|| not_found(&format!("deployment {name}")))?;
    data.deployments[index].replicas = Some(1);
    Ok(json!({ "message": format!("Deployment {name} scaled to 1 replica") }))
}

fn clone_namespace(
    data: &mut FixtureData,
    source: &str,
    target: &str,
) -> Result<Value, TransportError> {
    if source == target {
        return Err(bad_request(
            "Source and target namespaces cannot be the same",
        ));
    }
    if data.namespaces.iter().any(|ns| ns.namespace == target) {
        return Err(TransportError::Status {
            status: 409,
            message: format!("namespace {target} already exists"),
        });
    }
    let Some(origin) = data.namespaces.iter().find(|ns| ns.namespace == source) else {
        return Err(not_found(&format!("namespace {source}")));
    };

    let mut clone = origin.clone();
    clone.namespace = target.to_string();
    clone.cloned = Some("true".to_string());
    data.namespaces.push(clone);

    let deployments = data
        .deployments
        .iter()
        .filter(|deployment| deployment.namespace == source)
        .map(|deployment| DeploymentRecord {
            namespace: target.to_string(),
            replicas: Some(0),
            ..deployment.clone()
        })
        .collect::<Vec<_>>();
    data.deployments.extend(deployments);

    let config_maps = data
        .config_maps
        .iter()
        .filter(|config_map| config_map.namespace.as_deref() == Some(source))
        .map(|config_map| ConfigMapRecord {
            namespace: Some(target.to_string()),
            ..config_map.clone()
        })
        .collect::<Vec<_>>();
    data.config_maps.extend(config_maps);

    let secrets = data
        .secrets
        .iter()
        .filter(|secret| secret.namespace.as_deref() == Some(source))
        .map(|secret| SecretRecord {
            namespace: Some(target.to_string()),
            ..secret.clone()
        })
        .collect::<Vec<_>>();
    data.secrets.extend(secrets);

    Ok(json!({
        "message": format!("Namespace {source} cloned to {target}. Setting Replicas to zero.")
    }))
}

fn parse_list_query(query: &str) -> Option<ListQuery> {
    if query.is_empty() {
        return None;
    }

    let pairs = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect::<BTreeMap<_, _>>();
    let page = pairs.get("page").and_then(|value| value.parse().ok())?;
    let limit = pairs.get("limit").and_then(|value| value.parse().ok())?;
    let direction = match pairs.get("order").copied() {
        Some("asc") => SortDirection::Ascending,
        Some("desc") => SortDirection::Descending,
        _ => SortDirection::None,
    };
    let sort = pairs
        .get("sortBy")
        .map(|accessor| (accessor.to_string(), direction));

    Some(ListQuery { page, limit, sort })
}

fn list_response<T: Record>(
    mut items: Vec<T>,
    window: Option<&ListQuery>,
) -> Result<Value, TransportError> {
    if let Some(window) = window {
        if let Some((accessor, direction)) = &window.sort
            && direction.is_active()
        {
            items.sort_by(|left, right| {
                let ordering = compare_cells(left.cell(accessor), right.cell(accessor));
                match direction {
                    SortDirection::Descending => ordering.reverse(),
                    _ => ordering,
                }
            });
        }
        let skip = (window.page.max(1) as usize - 1)
            .checked_mul(window.limit)
            .ok_or_else(|| {
                bad_request(format!(
                    "page {} with limit {} is out of range",
                    window.page, window.limit
                ))
            })?;
        items = items.into_iter().skip(skip).take(window.limit).collect();
    }

    serde_json::to_value(items).map_err(|error| TransportError::Status {
        status: 500,
        message: error.to_string(),
    })
}

fn compare_cells(left: Option<String>, right: Option<String>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::{FixtureData, FixtureTransport};
    use crate::dispatch::{ListQuery, Method, OperationId, ParamBag, RequestDescriptor, build};
    use crate::error::TransportError;
    use crate::model::{ConfigMapRecord, DeploymentRecord, NamespaceRecord};
    use crate::sort::SortDirection;
    use crate::store::normalize;
    use crate::transport::Transport;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn backend() -> FixtureTransport {
        FixtureTransport::new(FixtureData::demo(), Duration::ZERO)
    }

    async fn send(
        backend: &FixtureTransport,
        operation: OperationId,
        params: ParamBag,
    ) -> Result<Value, TransportError> {
        backend.execute(&build(operation, &params)).await
    }

    fn page(page: u32, limit: usize, accessor: &str, direction: SortDirection) -> ListQuery {
        ListQuery {
            page,
            limit,
            sort: Some((accessor.to_string(), direction)),
        }
    }

    #[tokio::test]
    async fn namespaces_are_sorted_and_paged() {
        let backend = backend();
        let first = send(
            &backend,
            OperationId::ListNamespaces,
            ParamBag::new().list_query(page(1, 10, "namespace", SortDirection::Ascending)),
        )
        .await
        .unwrap();
        let first: Vec<NamespaceRecord> = normalize(first);
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].namespace, "analytics");

        let second = send(
            &backend,
            OperationId::ListNamespaces,
            ParamBag::new().list_query(page(2, 10, "namespace", SortDirection::Ascending)),
        )
        .await
        .unwrap();
        let second: Vec<NamespaceRecord> = normalize(second);
        assert_eq!(second.len(), 4);

        let descending = send(
            &backend,
            OperationId::ListNamespaces,
            ParamBag::new().list_query(page(1, 3, "namespace", SortDirection::Descending)),
        )
        .await
        .unwrap();
        let descending: Vec<NamespaceRecord> = normalize(descending);
        assert_eq!(descending[0].namespace, "shipping");
    }

    #[tokio::test]
    async fn deployments_are_wrapped_and_empty_namespaces_answer_with_a_message() {
        let backend = backend();
        let listed = send(
            &backend,
            OperationId::ListDeployments,
            ParamBag::new().namespace("payments-qa"),
        )
        .await
        .unwrap();
        assert!(listed.get("deployments").is_some());
        assert_eq!(normalize::<DeploymentRecord>(listed).len(), 3);

        let empty = send(
            &backend,
            OperationId::ListDeployments,
            ParamBag::new().namespace("search"),
        )
        .await
        .unwrap();
        assert!(empty.get("message").is_some());

        let missing = send(
            &backend,
            OperationId::ListDeployments,
            ParamBag::new().namespace("nope"),
        )
        .await;
        assert!(matches!(missing, Err(TransportError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn clone_copies_resources_scaled_down() {
        let backend = backend();
        send(
            &backend,
            OperationId::CloneNamespace,
            ParamBag::new().namespace("payments").target_namespace("payments-dev"),
        )
        .await
        .unwrap();

        let deployments = send(
            &backend,
            OperationId::ListDeployments,
            ParamBag::new().namespace("payments-dev"),
        )
        .await
        .unwrap();
        let deployments: Vec<DeploymentRecord> = normalize(deployments);
        assert_eq!(deployments.len(), 1);
        assert_eq!(deployments[0].replicas, Some(0));

        let again = send(
            &backend,
            OperationId::CloneNamespace,
            ParamBag::new().namespace("payments").target_namespace("payments-dev"),
        )
        .await;
        assert!(matches!(again, Err(TransportError::Status { status: 409, .. })));

        let onto_self = send(
            &backend,
            OperationId::CloneNamespace,
            ParamBag::new().namespace("payments").target_namespace("payments"),
        )
        .await;
        assert!(matches!(onto_self, Err(TransportError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn writes_are_visible_to_the_next_read() {
        let backend = backend();
        send(
            &backend,
            OperationId::UpdateDeploymentImage,
            ParamBag::new()
                .deployment("cart-web")
                .container("web")
                .image("nginx:1.27")
                .namespace("checkout-staging"),
        )
        .await
        .unwrap();
        send(
            &backend,
            OperationId::ScaleDeployment,
            ParamBag::new().deployment("cart-api"),
        )
        .await
        .unwrap();
        send(
            &backend,
            OperationId::UpdateConfigMap,
            ParamBag::new()
                .config_map("cart-settings")
                .namespace("checkout-staging")
                .update_object(BTreeMap::from([(
                    "CART_TTL_SECONDS".to_string(),
                    "60".to_string(),
                )])),
        )
        .await
        .unwrap();

        let deployments: Vec<DeploymentRecord> = normalize(
            send(
                &backend,
                OperationId::ListDeployments,
                ParamBag::new().namespace("checkout-staging"),
            )
            .await
            .unwrap(),
        );
        let web = deployments.iter().find(|d| d.name == "cart-web").unwrap();
        assert_eq!(web.primary_container(), Some(("web", "nginx:1.27")));
        let api = deployments.iter().find(|d| d.name == "cart-api").unwrap();
        assert_eq!(api.replicas, Some(1));

        let config_maps: Vec<ConfigMapRecord> = normalize(
            send(
                &backend,
                OperationId::ListConfigMaps,
                ParamBag::new().namespace("checkout-staging"),
            )
            .await
            .unwrap(),
        );
        assert_eq!(config_maps[0].entry(), Some(("CART_TTL_SECONDS", "60")));
    }

    #[tokio::test]
    async fn unknown_container_is_rejected() {
        let backend = backend();
        let result = send(
            &backend,
            OperationId::UpdateDeploymentImage,
            ParamBag::new()
                .deployment("cart-web")
                .container("sidecar")
                .image("envoy:1.30")
                .namespace("checkout-staging"),
        )
        .await;
        assert!(matches!(result, Err(TransportError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn out_of_range_page_window_is_a_bad_request() {
        let request = RequestDescriptor {
            method: Method::Get,
            path: format!("/api/v1/namespaces?page={}&limit={}", u32::MAX, usize::MAX),
            body: None,
        };
        let result = backend().execute(&request).await;
        assert!(matches!(result, Err(TransportError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn empty_descriptor_is_rejected() {
        let result = backend().execute(&RequestDescriptor::empty()).await;
        assert!(matches!(result, Err(TransportError::Rejected(_))));
    }

    #[test]
    fn fixtures_parse_from_yaml() {
        let raw = r#"
namespaces:
  - namespace: team-a
    Pod: payments
    app: ledger
    cloned: "true"
deployments:
  - name: api
    namespace: team-a
    containers:
      - web: nginx:1.25
    replicas: 0
configMaps:
  - name: settings
    namespace: team-a
    data:
      MODE: strict
"#;
        let data: FixtureData = serde_yaml::from_str(raw).unwrap();
        assert!(data.namespaces[0].is_cloned());
        assert!(data.deployments[0].is_scaled_down());
        assert_eq!(data.config_maps[0].entry(), Some(("MODE", "strict")));
        assert!(data.secrets.is_empty());
    }
}
