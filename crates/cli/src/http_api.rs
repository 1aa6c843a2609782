use crate::service::{OrgChartService, Status};
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{Response as HttpResponse, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use orgchart_protocol::{serialize_json, ConnectionsRequest, PreferenceUpdate};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

type SharedService = Arc<OrgChartService>;

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/orgchart/connections", post(connections))
        .route("/orgchart/manages/:id", get(children))
        .route("/orgchart/details/:node_type/:id", get(details))
        .route(
            "/orgchart/preference/:identity_name",
            get(preference).post(set_preference),
        )
        .route("/orgchart/:id", get(tree))
        .route("/health", get(health))
        .with_state(service)
}

async fn tree(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> Result<Response, StatusCode> {
    let pretty = service.settings().pretty_json;
    let reply = blocking(service, move |svc| svc.tree(&id)).await?;
    build_response(reply.status, &reply.body, pretty)
}

async fn children(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> Result<Response, StatusCode> {
    let pretty = service.settings().pretty_json;
    let reply = blocking(service, move |svc| svc.children(&id)).await?;
    build_response(reply.status, &reply.body, pretty)
}

async fn details(
    State(service): State<SharedService>,
    Path((_node_type, id)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    let pretty = service.settings().pretty_json;
    let reply = blocking(service, move |svc| svc.details(&id)).await?;
    build_response(reply.status, &reply.body, pretty)
}

async fn connections(
    State(service): State<SharedService>,
    body: Bytes,
) -> Result<Response, StatusCode> {
    let pretty = service.settings().pretty_json;
    let request: ConnectionsRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            log::debug!("Rejecting connections body: {e}");
            return build_response(
                Status::BadRequest,
                &json!({"connections": [], "message": format!("Invalid request body: {e}")}),
                pretty,
            );
        }
    };
    let reply = blocking(service, move |svc| svc.connections(&request)).await?;
    build_response(reply.status, &reply.body, pretty)
}

async fn preference(
    State(service): State<SharedService>,
    Path(identity_name): Path<String>,
) -> Result<Response, StatusCode> {
    let pretty = service.settings().pretty_json;
    let name = identity_name.clone();
    let reply = blocking(service, move |svc| svc.preference(&name)).await?;
    match reply.body {
        Some(body) => build_response(reply.status, &body, pretty),
        None => build_response(reply.status, &missing_identity(&identity_name), pretty),
    }
}

async fn set_preference(
    State(service): State<SharedService>,
    Path(identity_name): Path<String>,
    body: Bytes,
) -> Result<Response, StatusCode> {
    let pretty = service.settings().pretty_json;
    let update: PreferenceUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            log::debug!("Rejecting preference body: {e}");
            return build_response(
                Status::BadRequest,
                &json!({"message": format!("Invalid request body: {e}")}),
                pretty,
            );
        }
    };
    let name = identity_name.clone();
    let status = blocking(service, move |svc| svc.set_preference(&name, update)).await?;
    if status.is_success() {
        build_response(status, &serde_json::Value::Null, pretty)
    } else {
        build_response(status, &missing_identity(&identity_name), pretty)
    }
}

async fn health(State(service): State<SharedService>) -> Result<Response, StatusCode> {
    let body = json!({"status": "ok", "identities": service.identity_count()});
    build_response(Status::Ok, &body, false)
}

fn missing_identity(identity_name: &str) -> serde_json::Value {
    json!({"message": format!("Can not find identity object: {identity_name}")})
}

/// Run a synchronous engine call off the async workers
async fn blocking<T, F>(service: SharedService, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&OrgChartService) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| {
            log::error!("Request worker failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

pub(crate) fn build_response<T: Serialize>(
    status: Status,
    body: &T,
    pretty: bool,
) -> Result<Response, StatusCode> {
    let bytes = serialize_json(body, pretty)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();
    let status =
        StatusCode::from_u16(status.http_code()).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::service;
    use axum::body::to_bytes;
    use axum::http::{Method, Request};
    use orgchart_graph::OrgChartSettings;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(settings: OrgChartSettings) -> Router {
        router(Arc::new(service(settings)))
    }

    async fn call(app: Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_tree_route() {
        let (status, body) = call(
            app(OrgChartSettings::default()),
            Method::GET,
            "/orgchart/p1",
            "",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], Value::Null);
        let nodes = body["nodes"].as_array().unwrap();
        let root = nodes.iter().find(|n| n["id"] == "ceo").unwrap();
        assert_eq!(root["parentId"], Value::Null);
    }

    #[tokio::test]
    async fn test_tree_route_missing_record() {
        let (status, body) = call(
            app(OrgChartSettings::default()),
            Method::GET,
            "/orgchart/ghost",
            "",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["nodes"], Value::Null);
        assert_eq!(body["message"], "Can not find identity object: ghost");
    }

    #[tokio::test]
    async fn test_manages_route() {
        let (status, body) = call(
            app(OrgChartSettings::default()),
            Method::GET,
            "/orgchart/manages/m1",
            "",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "g1"]);
    }

    #[tokio::test]
    async fn test_details_route() {
        let (status, body) = call(
            app(OrgChartSettings::default()),
            Method::GET,
            "/orgchart/details/workgroup/g1",
            "",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["details"]["members"], serde_json::json!(["paul"]));
    }

    #[tokio::test]
    async fn test_connections_route() {
        let settings = OrgChartSettings {
            connection_rule: "Backups".into(),
            ..Default::default()
        };
        let (status, body) = call(
            app(settings.clone()),
            Method::POST,
            "/orgchart/connections",
            r#"{"allNodeIds": ["p1", "p2"]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections"][0]["label"], "backup");

        let (status, body) = call(app(settings), Method::POST, "/orgchart/connections", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "allNodeIds is missing");
    }

    #[tokio::test]
    async fn test_preference_routes() {
        let app = app(OrgChartSettings::default());
        let (status, _) = call(
            app.clone(),
            Method::POST,
            "/orgchart/preference/paul",
            r#"{"orgChartPluginGuideTourInactive": true}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(app.clone(), Method::GET, "/orgchart/preference/paul", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["preference"]["orgChartPluginGuideTourInactive"], true);
        assert_eq!(body["nodeTypes"]["none"], "None");

        let (status, _) = call(app, Method::GET, "/orgchart/preference/nobody", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_preference_body() {
        let (status, body) = call(
            app(OrgChartSettings::default()),
            Method::POST,
            "/orgchart/preference/paul",
            "{not json",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_connections_route_forwards_extra_keys() {
        let settings = OrgChartSettings {
            connection_rule: "Backups".into(),
            ..Default::default()
        };
        let (status, body) = call(
            app(settings),
            Method::POST,
            "/orgchart/connections",
            r#"{"allNodeIds": ["p1", "p2"], "label": "mentor"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections"], serde_json::json!([]));
    }
}
