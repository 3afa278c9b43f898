//! Client and orchestrator against a live reference server

use std::sync::Arc;
use std::time::Duration;

use ensearch::client::{
    ClientBuilder, ClientError, Orchestrator, OrchestratorConfig, OrchestratorHandle, PointLookup,
    ResolutionClient, SearchPhase, SearchState,
};
use ensearch::core::{BulkEntry, Resolved};
use ensearch::server::{create_router, ServerConfig, ServerState};
use serde_json::json;
use tokio::net::TcpListener;

const LUC: &str = "0x225f137127d9067788314bc7fcc1f36746a3c3B5";
const NICK: &str = "0xb8c2C29ee19D8307cb7255e1Cd9CbDE883A267d5";
const ANTONY: &str = "0x2B5c7025998f88550Ef2fEce8bf87935f542C190";
const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/directory.json");

async fn spawn_client() -> ResolutionClient {
    let state = ServerState::from_file(SAMPLE, ServerConfig::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state.into())).await.unwrap();
    });

    ClientBuilder::new(format!("http://{addr}"))
        // Nothing listens here; social stats must degrade to None
        .social_url("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

/// Client for a backend that answers with projected fields only
async fn spawn_projecting_client() -> ResolutionClient {
    let app = axum::Router::new()
        .route(
            "/bulk/u",
            axum::routing::get(|| async {
                axum::Json(json!({
                    "response_length": 2,
                    "response": [
                        {"type": "success", "address": LUC},
                        {"type": "success", "name": "nick.eth"}
                    ]
                }))
            }),
        )
        .route(
            "/n/:name",
            axum::routing::get(|| async { axum::Json(json!({ "address": LUC })) }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ClientBuilder::new(format!("http://{addr}")).build().unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Wait for a state matching `done`, failing after a few seconds
async fn wait_for(handle: &OrchestratorHandle, done: impl Fn(&SearchState) -> bool) -> SearchState {
    let mut states = handle.subscribe();
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = states.borrow_and_update();
                if done(&state) {
                    return state.clone();
                }
            }
            if states.changed().await.is_err() {
                return handle.state();
            }
        }
    })
    .await;
    result.unwrap_or_else(|_| panic!("timed out, last state {:?}", handle.state()))
}

fn settled(state: &SearchState, query: &str) -> bool {
    state.settled.as_deref() == Some(query) && !state.phase.is_loading()
}

#[tokio::test]
async fn test_profile_lookups() {
    let client = spawn_client().await;

    let luc = client.profile("luc.eth").await.unwrap();
    assert_eq!(luc.address.as_deref(), Some(LUC));
    assert_eq!(luc.records.github.as_deref(), Some("lucemans"));

    let nick = client.profile(&NICK.to_lowercase()).await.unwrap();
    assert_eq!(nick.name, "nick.eth");

    let err = client
        .profile("0x000000000000000000000000000000000000dEaD")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
    assert!(err.is_no_profile());

    assert!(client.social_stats("luc.eth").await.is_none());
}

#[tokio::test]
async fn test_resolve_projects_direction() {
    let client = spawn_client().await;

    assert_eq!(
        client.resolve("luc.eth").await.unwrap(),
        BulkEntry::Success(Resolved::Address {
            address: LUC.to_string()
        })
    );
    assert_eq!(
        client.resolve(NICK).await.unwrap(),
        BulkEntry::Success(Resolved::Name {
            name: "nick.eth".to_string()
        })
    );

    match client.resolve("hi").await.unwrap() {
        BulkEntry::Error(body) => assert_eq!(body.status, 400),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_bulk_universal_with_duplicates() {
    let client = spawn_client().await;

    let response = client
        .bulk_universal(&strings(&["luc.eth", NICK, "LUC.eth", "gone.eth"]))
        .await
        .unwrap();

    assert_eq!(response.response_length, 4);
    assert_eq!(
        response.response[0],
        BulkEntry::Success(Resolved::Address {
            address: LUC.to_string()
        })
    );
    assert_eq!(
        response.response[1],
        BulkEntry::Success(Resolved::Name {
            name: "nick.eth".to_string()
        })
    );
    assert_eq!(response.response[2], response.response[0]);
    match &response.response[3] {
        BulkEntry::Error(body) => assert_eq!(body.status, 404),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_projected_only_backend() {
    let client = spawn_projecting_client().await;

    let response = client
        .bulk_universal(&strings(&["luc.eth", NICK]))
        .await
        .unwrap();
    assert_eq!(
        response.response,
        vec![
            BulkEntry::Success(Resolved::Address {
                address: LUC.to_string()
            }),
            BulkEntry::Success(Resolved::Name {
                name: "nick.eth".to_string()
            }),
        ]
    );

    assert_eq!(
        client.resolve("luc.eth").await.unwrap(),
        BulkEntry::Success(Resolved::Address {
            address: LUC.to_string()
        })
    );
}

#[tokio::test]
async fn test_bulk_limit_checked_locally() {
    let client = spawn_client().await;

    let names: Vec<String> = (0..11).map(|i| format!("n{i}.eth")).collect();
    assert!(matches!(
        client.bulk_names(&names).await,
        Err(ClientError::TooManyInputs { count: 11, max: 10 })
    ));
}

#[tokio::test]
async fn test_orchestrator_exact_result() {
    let client = Arc::new(spawn_client().await);
    let config = OrchestratorConfig {
        debounce: Duration::from_millis(20),
    };
    let (handle, _task) = Orchestrator::spawn(client, config);

    handle.input("nick.eth");
    let state = wait_for(&handle, |s| settled(s, "nick.eth")).await;

    match state.phase {
        SearchPhase::HasResults(results) => assert_eq!(results[0].name, "nick.eth"),
        other => panic!("unexpected phase {other:?}"),
    }
    assert_eq!(handle.location().as_deref(), Some("?q=nick.eth"));
}

#[tokio::test]
async fn test_orchestrator_address_gets_suggested_match() {
    let client = Arc::new(spawn_client().await);
    let config = OrchestratorConfig {
        debounce: Duration::from_millis(20),
    };
    let (handle, _task) = Orchestrator::spawn(client, config);

    handle.input(ANTONY);
    let state = wait_for(&handle, |s| {
        settled(s, ANTONY)
            && !matches!(
                s.phase,
                SearchPhase::HasResultsWithSuggestedMatch {
                    point: PointLookup::Pending,
                    ..
                }
            )
    })
    .await;

    match state.phase {
        SearchPhase::HasResultsWithSuggestedMatch {
            results,
            point: PointLookup::Found(profile),
        } => {
            assert_eq!(results[0].name, "antony.sh");
            assert_eq!(profile.name, "antony.sh");
        }
        other => panic!("unexpected phase {other:?}"),
    }
}

#[tokio::test]
async fn test_orchestrator_fallback_and_suggestion() {
    let client = Arc::new(spawn_client().await);
    let config = OrchestratorConfig {
        debounce: Duration::from_millis(20),
    };
    let (handle, _task) = Orchestrator::spawn(client, config);

    // Plain word with a registered .eth name: results plus a suggestion
    handle.input("nick");
    let state = wait_for(&handle, |s| settled(s, "nick") && s.suggestion.is_some()).await;
    assert!(matches!(state.phase, SearchPhase::HasResults(_)));
    assert_eq!(state.suggestion.as_deref(), Some("nick.eth"));

    // Well-formed name with no search hits: the point lookup also misses
    handle.input("nobody.eth");
    let state = wait_for(&handle, |s| settled(s, "nobody.eth")).await;
    assert_eq!(state.phase, SearchPhase::NoResultsFallback(PointLookup::NotFound));
    assert_eq!(state.suggestion, None);
}
