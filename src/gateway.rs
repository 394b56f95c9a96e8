// Gateway module: finds the deployed entry API through the gateway's
// management REST surface and turns its id into the two base URLs the
// command loop works with. Probing resources and methods only feeds the
// diagnostic listing printed at startup and by the `check` command.

use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::Endpoints;
use crate::config::Settings;
use crate::error::{GatewayError, ResolveError};

/// HTTP methods probed on every resource.
pub const PROBED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RestApi {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub path: String,
}

/// Collection envelope used by the management API. An empty collection
/// comes back without the `item` key at all.
#[derive(Deserialize, Debug)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    item: Vec<T>,
}

/// The three control-plane calls discovery needs.
pub trait ControlPlane {
    fn rest_apis(&self) -> Result<Vec<RestApi>, GatewayError>;
    fn resources(&self, api_id: &str) -> Result<Vec<Resource>, GatewayError>;
    /// `Err(GatewayError::NotFound)` when `verb` is not bound on the resource.
    fn method(&self, api_id: &str, resource_id: &str, verb: &Method) -> Result<(), GatewayError>;
}

/// Blocking client for the gateway management API.
pub struct GatewayClient {
    client: Client,
    base_url: String,
    region: String,
    access_key_id: String,
}

impl GatewayClient {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to build control-plane HTTP client")?;
        Ok(GatewayClient {
            client,
            base_url: settings.control_plane_url.clone(),
            region: settings.region.clone(),
            access_key_id: settings.access_key_id.clone(),
        })
    }

    /// The emulator reads account and region from the credential scope and
    /// does not check the signature, so an unsigned scope is enough.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let scope = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}/{}/apigateway/aws4_request, SignedHeaders=host, Signature=unsigned",
            self.access_key_id,
            chrono::Utc::now().format("%Y%m%d"),
            self.region,
        );
        match HeaderValue::from_str(&scope) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(err) => tracing::warn!(error = %err, "credential scope is not a valid header"),
        }
        headers
    }

    fn get(&self, path: &str, what: &str) -> Result<Response, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "control plane request");
        let res = self.client.get(&url).headers(self.auth_headers()).send()?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound { what: what.into() });
        }
        if !status.is_success() {
            let body = res.text().unwrap_or_else(|_| "".into());
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }

    fn get_items<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<Vec<T>, GatewayError> {
        let collection: Collection<T> = self.get(path, what)?.json()?;
        Ok(collection.item)
    }
}

impl ControlPlane for GatewayClient {
    fn rest_apis(&self) -> Result<Vec<RestApi>, GatewayError> {
        self.get_items("/restapis", "REST API listing")
    }

    fn resources(&self, api_id: &str) -> Result<Vec<Resource>, GatewayError> {
        self.get_items(
            &format!("/restapis/{api_id}/resources"),
            &format!("resources of API {api_id}"),
        )
    }

    fn method(&self, api_id: &str, resource_id: &str, verb: &Method) -> Result<(), GatewayError> {
        self.get(
            &format!("/restapis/{api_id}/resources/{resource_id}/methods/{verb}"),
            &format!("method {verb} on resource {resource_id}"),
        )
        .map(drop)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSurface {
    pub id: String,
    pub path: String,
    pub methods: Vec<Method>,
}

/// Diagnostic picture of one API: its resources and the methods bound on each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSurface {
    pub api: RestApi,
    pub resources: Vec<ResourceSurface>,
}

/// Outcome of startup discovery.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub api: RestApi,
    pub endpoints: Endpoints,
    pub surfaces: Vec<ApiSurface>,
}

/// Probe every resource of `api` for the methods in [`PROBED_METHODS`].
/// Never fails: problems are logged and leave gaps in the picture.
pub fn probe_surface(gateway: &dyn ControlPlane, api: &RestApi) -> ApiSurface {
    let resources = match gateway.resources(&api.id) {
        Ok(resources) => resources,
        Err(err) => {
            tracing::warn!(api_id = %api.id, error = %err, "failed to get resources");
            Vec::new()
        }
    };

    let resources = resources
        .into_iter()
        .map(|resource| {
            let methods = PROBED_METHODS
                .iter()
                .filter(|verb| match gateway.method(&api.id, &resource.id, verb) {
                    Ok(()) => true,
                    Err(err) if err.is_not_found() => false,
                    Err(err) => {
                        tracing::warn!(
                            method = %verb,
                            path = %resource.path,
                            error = %err,
                            "failed to get method"
                        );
                        false
                    }
                })
                .cloned()
                .collect();
            ResourceSurface {
                id: resource.id,
                path: resource.path,
                methods,
            }
        })
        .collect();

    ApiSurface {
        api: api.clone(),
        resources,
    }
}

/// Pick the API to talk to. A selector matches an id first, then a name.
/// Without one the first listed API is used; listing order is up to the
/// gateway, so several deployed APIs make that choice arbitrary.
pub fn select_api(mut apis: Vec<RestApi>, selector: Option<&str>) -> Result<RestApi, ResolveError> {
    if apis.is_empty() {
        return Err(ResolveError::NoApiFound);
    }
    if let Some(selector) = selector {
        let index = apis
            .iter()
            .position(|api| api.id == selector)
            .or_else(|| apis.iter().position(|api| api.name == selector));
        return match index {
            Some(index) => Ok(apis.swap_remove(index)),
            None => Err(ResolveError::ApiNotFound {
                selector: selector.to_string(),
            }),
        };
    }

    if apis.len() > 1 {
        tracing::warn!(
            count = apis.len(),
            "several REST APIs deployed; using the first listed (set ENTRIES_API to choose)"
        );
    }
    Ok(apis.swap_remove(0))
}

/// List the deployed APIs, probe each one, select one and build its endpoints.
pub fn resolve(gateway: &dyn ControlPlane, settings: &Settings) -> Result<Discovery, ResolveError> {
    let apis = gateway.rest_apis().map_err(ResolveError::ListApis)?;
    tracing::debug!(count = apis.len(), "listed REST APIs");

    let surfaces = apis.iter().map(|api| probe_surface(gateway, api)).collect();
    let api = select_api(apis, settings.api_selector.as_deref())?;
    let endpoints = Endpoints::for_api(&api.id, &settings.execute_api_host, &settings.stage)?;

    Ok(Discovery {
        api,
        endpoints,
        surfaces,
    })
}
