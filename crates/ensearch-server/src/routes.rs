//! HTTP routes
//!
//! Public routes serve lookups, bulk lookups (whole or streamed) and search.
//! Admin routes (reload, metrics) are built separately so they can be bound
//! to a private listener.

use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, RawQuery, State};
use axum::http::Uri;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use ensearch_core::{BulkEntry, BulkKind, BulkPlan, BulkResponse, ErrorBody, Lookup, Profile};
use futures::future::join_all;
use futures::stream::{BoxStream, FuturesUnordered, StreamExt};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use url::form_urlencoded;

use crate::error::{Result, ServerError};
use crate::directory::Directory;
use crate::metrics;
use crate::resolver::ProfileResolver;
use crate::state::{ReloadResult, SharedState};

type BulkBody = Json<BulkResponse<BulkEntry<Profile>>>;
type EntryStream = Sse<BoxStream<'static, std::result::Result<Event, Infallible>>>;

/// Interval between keep-alive comments on an idle event stream
const KEEP_ALIVE: Duration = Duration::from_secs(1);

/// One event of a streamed bulk lookup, sent as soon as its input resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub query: String,
    pub response: BulkEntry<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub s: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub profiles: usize,
    pub loaded_at: i64,
}

/// Lookup, bulk, search and health routes with tracing, CORS and a
/// concurrency limit applied
pub fn create_public_router(state: SharedState) -> Router {
    let max_concurrency = state.config.max_concurrency;
    Router::new()
        .route("/n/:name", get(name_handler))
        .route("/a/:address", get(address_handler))
        .route("/u/:query", get(universal_handler))
        .route("/bulk/n", get(bulk_names_handler))
        .route("/bulk/a", get(bulk_addresses_handler))
        .route("/bulk/u", get(bulk_universal_handler))
        .route("/sse/:kind", get(stream_query_handler).post(stream_body_handler))
        .route("/v2/discover/search", get(search_handler))
        .route("/health", get(health_handler))
        .fallback(unknown_route_handler)
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(max_concurrency))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Directory reload, plus `/metrics` when a Prometheus handle is given
pub fn create_admin_router(state: SharedState, prometheus: Option<PrometheusHandle>) -> Router {
    let router = Router::new()
        .route("/admin/reload", post(reload_handler))
        .with_state(state);

    let router = match prometheus {
        Some(handle) => router.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        ),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

/// Public and admin routes on one router, without metrics.
///
/// This serves the unauthenticated `POST /admin/reload` next to the public
/// API; bind it only where that is acceptable.
pub fn create_router(state: SharedState) -> Router {
    create_public_router(state.clone()).merge(create_admin_router(state, None))
}

pub fn create_router_with_metrics(state: SharedState, prometheus: PrometheusHandle) -> Router {
    create_public_router(state.clone()).merge(create_admin_router(state, Some(prometheus)))
}

async fn name_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Profile>> {
    let result = state.directory().resolve_name(&name).await;
    observe("name", result).map(Json)
}

async fn address_handler(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Json<Profile>> {
    let result = state.directory().resolve_address(&address).await;
    observe("address", result).map(Json)
}

async fn universal_handler(
    State(state): State<SharedState>,
    Path(query): Path<String>,
) -> Result<Json<Profile>> {
    let result = match Lookup::guess(&query) {
        Ok(lookup) => state.directory().resolve(&lookup).await,
        Err(e) => Err(e.into()),
    };
    observe("universal", result).map(Json)
}

async fn bulk_names_handler(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> Result<BulkBody> {
    bulk(state, BulkKind::Names, query.as_deref()).await
}

async fn bulk_addresses_handler(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> Result<BulkBody> {
    bulk(state, BulkKind::Addresses, query.as_deref()).await
}

async fn bulk_universal_handler(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> Result<BulkBody> {
    bulk(state, BulkKind::Universal, query.as_deref()).await
}

/// Resolve each distinct entry once, then replay outcomes in request order
async fn bulk(state: SharedState, kind: BulkKind, query: Option<&str>) -> Result<BulkBody> {
    let (_, param) = kind.route();
    let inputs = bulk_inputs(query, param);
    let plan = BulkPlan::new(&inputs, state.config.bulk_limit)?;
    metrics::record_bulk(kind.label(), plan.len(), plan.unique().len());

    let directory = state.directory();
    let resolved: Vec<BulkEntry<Profile>> = join_all(
        plan.unique()
            .iter()
            .map(|input| resolve_entry(&directory, kind, input)),
    )
    .await;

    Ok(Json(plan.expand(&resolved).into()))
}

async fn resolve_entry(directory: &Directory, kind: BulkKind, input: &str) -> BulkEntry<Profile> {
    let result = match kind.lookup(input) {
        Ok(lookup) => directory.resolve(&lookup).await,
        Err(e) => Err(ServerError::from(e)),
    };
    BulkEntry::from(result.map_err(|e| ErrorBody::from(&e)))
}

async fn stream_query_handler(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<EntryStream> {
    let kind = BulkKind::from_path(&kind).ok_or(ServerError::UnknownRoute)?;
    let (_, param) = kind.route();
    stream(state, kind, bulk_inputs(query.as_deref(), param))
}

/// Body form of the event stream: `{"names": [...]}`, `{"addresses": [...]}`
/// or `{"queries": [...]}`
async fn stream_body_handler(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    Json(body): Json<HashMap<String, Vec<String>>>,
) -> Result<EntryStream> {
    let kind = BulkKind::from_path(&kind).ok_or(ServerError::UnknownRoute)?;
    let (_, param) = kind.route();
    let inputs = body
        .get(param.trim_end_matches("[]"))
        .or_else(|| body.get(param))
        .cloned()
        .unwrap_or_default();
    stream(state, kind, inputs)
}

/// Emit one event per distinct input in completion order. The limit is
/// checked up front, so an oversized request gets a plain error response.
fn stream(state: SharedState, kind: BulkKind, inputs: Vec<String>) -> Result<EntryStream> {
    let plan = BulkPlan::new(&inputs, state.config.bulk_limit)?;
    metrics::record_bulk(kind.label(), plan.len(), plan.unique().len());

    let directory = state.directory();
    let pending: FuturesUnordered<_> = plan
        .unique()
        .iter()
        .cloned()
        .map(|query| {
            let directory = directory.clone();
            async move {
                let response = resolve_entry(&directory, kind, &query).await;
                let event = Event::default()
                    .json_data(StreamEntry { query, response })
                    .unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "Failed to encode stream entry");
                        Event::default().event("error").data(e.to_string())
                    });
                Ok::<_, Infallible>(event)
            }
        })
        .collect();

    Ok(Sse::new(pending.boxed()).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}

/// Values of a repeated query parameter. The bracketless spelling
/// (`names=`) is accepted alongside `names[]=`.
fn bulk_inputs(query: Option<&str>, param: &str) -> Vec<String> {
    let bare = param.trim_end_matches("[]");
    form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .filter(|(key, _)| key == param || key == bare)
        .map(|(_, value)| value.into_owned())
        .collect()
}

async fn search_handler(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Profile>>> {
    let results = state
        .directory()
        .search(&params.s, state.config.search_limit)
        .await?;
    metrics::record_search(results.len());
    Ok(Json(results))
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let directory = state.directory();
    Json(HealthResponse {
        status: "ok".to_string(),
        profiles: directory.len(),
        loaded_at: directory.loaded_at(),
    })
}

async fn reload_handler(State(state): State<SharedState>) -> Result<Json<ReloadResult>> {
    let result = tokio::task::spawn_blocking(move || state.reload())
        .await
        .map_err(|e| ServerError::Internal(format!("reload task: {e}")))??;
    Ok(Json(result))
}

async fn unknown_route_handler(uri: Uri) -> ServerError {
    tracing::debug!(path = %uri.path(), "Unknown route");
    ServerError::UnknownRoute
}

fn observe(kind: &'static str, result: Result<Profile>) -> Result<Profile> {
    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.status().as_u16(),
    };
    metrics::record_lookup(kind, status);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::directory::Directory;
    use crate::state::create_shared_state;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const LUC: &str = "0x225f137127d9067788314bc7fcc1f36746a3c3B5";
    const NICK: &str = "0xb8c2C29ee19D8307cb7255e1Cd9CbDE883A267d5";

    fn router() -> Router {
        let directory = Directory::from_profiles([
            Profile {
                name: "luc.eth".into(),
                address: Some(LUC.into()),
                ..Default::default()
            },
            Profile {
                name: "nick.eth".into(),
                address: Some(NICK.into()),
                ..Default::default()
            },
        ])
        .unwrap();
        create_router(create_shared_state(directory, ServerConfig::default()))
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let resp = router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Decoded `data:` payloads of an event stream response
    async fn stream_entries(request: Request<Body>) -> Vec<StreamEntry> {
        let resp = router().oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).unwrap())
            .collect()
    }

    #[test]
    fn test_bulk_inputs_repeated_keys() {
        let inputs = bulk_inputs(
            Some("names[]=luc.eth&names%5B%5D=nick.eth&names=a.eth&other=x"),
            "names[]",
        );
        assert_eq!(inputs, vec!["luc.eth", "nick.eth", "a.eth"]);
        assert!(bulk_inputs(None, "names[]").is_empty());
    }

    #[tokio::test]
    async fn test_name_and_address_routes() {
        let (status, body) = get_json("/n/luc.eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], LUC);

        let (status, body) = get_json(&format!("/a/{NICK}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "nick.eth");

        let (status, body) = get_json("/a/hi").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        let (status, _) = get_json("/a/0x0000000000000000000000000000000000000001").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_universal_route() {
        let (status, body) = get_json(&format!("/u/{}", LUC.to_lowercase())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "luc.eth");

        let (status, _) = get_json("/u/vitalik").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bulk_replays_duplicates() {
        let (status, body) =
            get_json("/bulk/n?names%5B%5D=luc.eth&names%5B%5D=nick.eth&names%5B%5D=NICK.eth&names%5B%5D=gone.eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response_length"], 4);

        let entries = body["response"].as_array().unwrap();
        assert_eq!(entries[0]["type"], "success");
        assert_eq!(entries[0]["address"], LUC);
        assert_eq!(entries[1], entries[2]);
        assert_eq!(entries[3]["type"], "error");
        assert_eq!(entries[3]["status"], 404);
    }

    #[tokio::test]
    async fn test_bulk_universal_mixed() {
        let (status, body) = get_json(&format!("/bulk/u?queries%5B%5D=luc.eth&queries%5B%5D={NICK}&queries%5B%5D=hi")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"][0]["address"], LUC);
        assert_eq!(body["response"][1]["name"], "nick.eth");
        assert_eq!(body["response"][2]["status"], 400);
    }

    #[tokio::test]
    async fn test_bulk_over_limit_rejected_whole() {
        let query: Vec<String> = (0..11).map(|i| format!("names%5B%5D=n{i}.eth")).collect();
        let (status, body) = get_json(&format!("/bulk/n?{}", query.join("&"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body.get("response").is_none());
    }

    #[tokio::test]
    async fn test_search_and_health() {
        let (status, body) = get_json("/v2/discover/search?s=ni").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["name"], "nick.eth");
        assert_eq!(body[0]["address"], NICK);

        let (_, body) = get_json("/v2/discover/search").await;
        assert_eq!(body, json!([]));

        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profiles"], 2);
    }

    #[tokio::test]
    async fn test_reload_without_source_conflicts() {
        let resp = router()
            .oneshot(Request::post("/admin/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_stream_emits_each_distinct_entry() {
        let request = Request::get("/sse/n?names%5B%5D=luc.eth&names%5B%5D=LUC.eth&names%5B%5D=nick.eth&names%5B%5D=gone.eth")
            .body(Body::empty())
            .unwrap();
        let mut entries = stream_entries(request).await;
        entries.sort_by(|a, b| a.query.cmp(&b.query));

        let queries: Vec<&str> = entries.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["gone.eth", "luc.eth", "nick.eth"]);
        assert!(matches!(entries[0].response, BulkEntry::Error(ErrorBody { status: 404, .. })));
        match &entries[1].response {
            BulkEntry::Success(profile) => assert_eq!(profile.address.as_deref(), Some(LUC)),
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_accepts_json_body() {
        let body = json!({ "queries": [NICK, "hi"] }).to_string();
        let request = Request::post("/sse/u")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let entries = stream_entries(request).await;
        assert_eq!(entries.len(), 2);

        let nick = entries.iter().find(|e| e.query == NICK).unwrap();
        assert!(matches!(&nick.response, BulkEntry::Success(p) if p.name == "nick.eth"));
        let bad = entries.iter().find(|e| e.query == "hi").unwrap();
        assert!(matches!(bad.response, BulkEntry::Error(ErrorBody { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_stream_limit_and_unknown_kind() {
        let query: Vec<String> = (0..11).map(|i| format!("names%5B%5D=n{i}.eth")).collect();
        let (status, body) = get_json(&format!("/sse/n?{}", query.join("&"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        let (status, body) = get_json("/sse/x?names%5B%5D=luc.eth").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = get_json("/nope/luc.eth").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "status": 404, "error": "Unknown route" }));
    }

    #[tokio::test]
    async fn test_public_router_has_no_admin_routes() {
        let directory = Directory::from_profiles(Vec::new()).unwrap();
        let public = create_public_router(create_shared_state(directory, ServerConfig::default()));
        let resp = public
            .oneshot(Request::post("/admin/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
