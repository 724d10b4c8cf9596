//! Route tests against an in-memory data set.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use navgraph_core::storage::{MemoryDriver, StorageManager};
use navgraph_core::{EngineConfig, QueryEngine};
use navgraph_gateway::{create_router, AppState, GatewayConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn metadata() -> Value {
    json!({"Entities": [
        {"description": {
            "shortName": "Location", "defaultResourceName": "Locations",
            "key": {"propertyRef": {"name": "LocationID"}},
            "dataProperties": [
                {"name": "LocationID", "dataType": "Int32"},
                {"name": "Town", "dataType": "String"}
            ],
            "navigationProperties": [
                {"name": "Contacts", "entityTypeName": "Contact:#Crm.Model",
                 "isScalar": false, "invForeignKeyNames": ["LocationID"]}
            ]
        }},
        {"description": {
            "shortName": "Contact", "defaultResourceName": "Contacts",
            "key": {"propertyRef": {"name": "ContactID"}},
            "dataProperties": [
                {"name": "ContactID", "dataType": "Int32"},
                {"name": "LocationID", "dataType": "Int32"},
                {"name": "Name", "dataType": "String"}
            ]
        }}
    ]})
}

fn server() -> TestServer {
    let engine_config = EngineConfig::default()
        .with_default_container("memory.crm")
        .with_batch_size(2);
    let storage = Arc::new(StorageManager::new(&engine_config));
    storage.register(
        "memory.metadata",
        Arc::new(MemoryDriver::from_json(metadata()).unwrap()),
    );
    storage.register(
        "memory.crm",
        Arc::new(
            MemoryDriver::from_json(json!({
                "Locations": [
                    {"LocationID": 1, "Town": "Leeds"},
                    {"LocationID": 2, "Town": "York"},
                    {"LocationID": 3, "Town": "Hull"}
                ],
                "Contacts": [
                    {"ContactID": 10, "LocationID": 2, "Name": "O'Brien"},
                    {"ContactID": 11, "LocationID": 2, "Name": "Ann"},
                    {"ContactID": 12, "LocationID": 3, "Name": "Bob"}
                ]
            }))
            .unwrap(),
        ),
    );

    let engine = QueryEngine::new(&engine_config, storage);
    let state = AppState::new(engine, engine_config, GatewayConfig::default());
    TestServer::new(create_router(state)).unwrap()
}

fn towns(body: &Value) -> Vec<String> {
    let mut towns: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["Town"].as_str().unwrap().to_string())
        .collect();
    towns.sort();
    towns
}

#[tokio::test]
async fn test_health() {
    let response = server().get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["metadata_available"], true);
}

#[tokio::test]
async fn test_filter_returns_array() {
    let response = server()
        .get("/Locations")
        .add_query_param("$filter", "(LocationID gt 1)")
        .await;
    response.assert_status_ok();
    assert_eq!(towns(&response.json()), vec!["Hull", "York"]);
}

#[tokio::test]
async fn test_without_filter_returns_everything() {
    let response = server().get("/Locations").await;
    response.assert_status_ok();
    assert_eq!(towns(&response.json()), vec!["Hull", "Leeds", "York"]);
}

#[tokio::test]
async fn test_expand_nests_navigation() {
    let response = server()
        .get("/Locations")
        .add_query_param("$filter", "(Contacts/Name eq 'O''Brien')")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!([{
            "LocationID": 2,
            "Town": "York",
            "Contacts": [{"ContactID": 10, "LocationID": 2, "Name": "O'Brien"}]
        }])
    );
}

#[tokio::test]
async fn test_projection_with_select() {
    let response = server()
        .get("/Locations")
        .add_query_param("$filter", "(startswith(Contacts%2FName,'b') eq true)")
        .add_query_param("$select", "Town,Contacts%2FName")
        .add_query_param("$mode", "projection")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!([{"Town": "Hull", "Contacts.Name": "Bob"}]));
}

#[tokio::test]
async fn test_scan_error_is_bad_request() {
    let response = server()
        .get("/Locations")
        .add_query_param("$filter", "(Town eq 'Leeds)")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains('^'));
}

#[tokio::test]
async fn test_or_is_bad_request() {
    let response = server()
        .get("/Locations")
        .add_query_param("$filter", "(LocationID eq 1) or (LocationID eq 2)")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_entity_set_is_not_found() {
    let response = server().get("/Planets").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bad_mode_is_bad_request() {
    let response = server()
        .get("/Locations")
        .add_query_param("$mode", "sideways")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
