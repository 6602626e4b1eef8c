//! HTTP Endpoint Tests
//!
//! Drives the full router (CORS, tracing, workspace middleware, handlers)
//! in-process with `tower::ServiceExt::oneshot`.

#[cfg(test)]
mod node_endpoints_tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
        Router,
    };
    use flowtree_server::{create_router, AppState, WORKSPACE_COOKIE};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt; // for `oneshot`

    const ORIGIN: &str = "http://localhost:3000";

    async fn test_app() -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::open(temp_dir.path().join("http.db")).await.unwrap();
        let app = create_router(state, ORIGIN).unwrap();
        (app, temp_dir)
    }

    fn request(method: Method, uri: &str, workspace: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(workspace) = workspace {
            builder = builder.header(header::COOKIE, format!("{}={}", WORKSPACE_COOKIE, workspace));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Workspace id from the response's Set-Cookie header
    fn issued_workspace(response: &Response) -> String {
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("Set-Cookie present")
            .to_str()
            .unwrap();
        let first = cookie.split(';').next().unwrap();
        let (name, value) = first.split_once('=').unwrap();
        assert_eq!(name, WORKSPACE_COOKIE);
        value.to_string()
    }

    async fn create(app: &Router, workspace: &str, body: Value) -> Value {
        let response = send(app, request(Method::POST, "/api/nodes", Some(workspace), Some(body))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_health_issues_workspace_cookie() {
        let (app, _temp) = test_app().await;

        let response = send(&app, request(Method::GET, "/api/health", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=31536000"));
        assert!(cookie.contains("Path=/"));

        let workspace = issued_workspace(&response);
        assert_eq!(workspace.len(), 36);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_existing_cookie_is_reused() {
        let (app, _temp) = test_app().await;

        let response = send(&app, request(Method::GET, "/api/nodes", Some("my-ws"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(issued_workspace(&response), "my-ws");
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let (app, _temp) = test_app().await;

        let node = create(&app, "ws", json!({"value": 7, "name": "seven", "type": "input"})).await;
        let id = node["id"].as_i64().unwrap();
        assert_eq!(node["value"], 7);
        assert_eq!(node["type"], "input");
        assert!(node["left_child_id"].is_null());
        assert!(node["created_at"].is_string());
        assert!(node.get("workspace_id").is_none());

        let response = send(&app, request(Method::GET, &format!("/api/nodes/{}", id), Some("ws"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, node);

        let response = send(&app, request(Method::GET, "/api/nodes", Some("ws"), None)).await;
        let list = json_body(response).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_workspaces_are_isolated_over_http() {
        let (app, _temp) = test_app().await;

        let node = create(&app, "ws-a", json!({"value": 1})).await;
        let id = node["id"].as_i64().unwrap();

        let response = send(&app, request(Method::GET, &format!("/api/nodes/{}", id), Some("ws-b"), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NODE_NOT_FOUND");

        let response = send(&app, request(Method::GET, "/api/nodes", Some("ws-b"), None)).await;
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_reference_errors_map_to_bad_request() {
        let (app, _temp) = test_app().await;

        let a = create(&app, "ws", json!({"value": 1})).await;
        let b = create(&app, "ws", json!({"value": 2})).await;
        let c = create(&app, "ws", json!({"value": 3})).await;
        let (a_id, b_id, c_id) = (
            a["id"].as_i64().unwrap(),
            b["id"].as_i64().unwrap(),
            c["id"].as_i64().unwrap(),
        );

        let response = send(
            &app,
            request(Method::PATCH, &format!("/api/nodes/{}", a_id), Some("ws"), Some(json!({"left_child_id": b_id}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app,
            request(Method::PATCH, &format!("/api/nodes/{}", c_id), Some("ws"), Some(json!({"left_child_id": b_id}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "ALREADY_CHILD");
        assert!(body["details"].as_str().unwrap().contains(&format!("parent_id: {}", a_id)));

        let response = send(
            &app,
            request(Method::PATCH, &format!("/api/nodes/{}", b_id), Some("ws"), Some(json!({"right_child_id": a_id}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "CIRCULAR_REFERENCE");

        let response = send(
            &app,
            request(Method::PATCH, &format!("/api/nodes/{}", c_id), Some("ws"), Some(json!({"parent_id": c_id}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "SELF_REFERENCE");

        let response = send(
            &app,
            request(
                Method::POST,
                "/api/nodes",
                Some("ws"),
                Some(json!({"value": 4, "left_child_id": c_id, "right_child_id": c_id})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "DUPLICATE_CHILDREN");
    }

    #[tokio::test]
    async fn test_missing_reference_is_not_found() {
        let (app, _temp) = test_app().await;

        let response = send(
            &app,
            request(Method::POST, "/api/nodes", Some("ws"), Some(json!({"value": 1, "parent_id": 4242}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_shape_errors() {
        let (app, _temp) = test_app().await;

        // Missing value
        let response = send(&app, request(Method::POST, "/api/nodes", Some("ws"), Some(json!({"name": "x"})))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // Unknown type literal
        let response = send(
            &app,
            request(Method::POST, "/api/nodes", Some("ws"), Some(json!({"value": 1, "type": "sink"}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // Name too long
        let response = send(
            &app,
            request(
                Method::POST,
                "/api/nodes",
                Some("ws"),
                Some(json!({"value": 1, "name": "n".repeat(256)})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");

        // Explicit null value on update
        let node = create(&app, "ws", json!({"value": 1})).await;
        let response = send(
            &app,
            request(
                Method::PATCH,
                &format!("/api/nodes/{}", node["id"]),
                Some("ws"),
                Some(json!({"value": null})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_patch_null_clears_and_omitted_keeps() {
        let (app, _temp) = test_app().await;

        let child = create(&app, "ws", json!({"value": 1})).await;
        let parent = create(
            &app,
            "ws",
            json!({"value": 2, "name": "p", "left_child_id": child["id"], "parent_id": child["id"]}),
        )
        .await;

        let response = send(
            &app,
            request(
                Method::PATCH,
                &format!("/api/nodes/{}", parent["id"]),
                Some("ws"),
                Some(json!({"left_child_id": null, "name": null})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = json_body(response).await;
        assert!(updated["left_child_id"].is_null());
        assert!(updated["name"].is_null());
        assert_eq!(updated["parent_id"], child["id"]);
        assert_eq!(updated["value"], 2);
    }

    #[tokio::test]
    async fn test_delete_clears_references() {
        let (app, _temp) = test_app().await;

        let target = create(&app, "ws", json!({"value": 1})).await;
        let holder = create(&app, "ws", json!({"value": 2, "right_child_id": target["id"]})).await;

        let response = send(
            &app,
            request(Method::DELETE, &format!("/api/nodes/{}", target["id"]), Some("ws"), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"ok": true}));

        let response = send(
            &app,
            request(Method::GET, &format!("/api/nodes/{}", holder["id"]), Some("ws"), None),
        )
        .await;
        assert!(json_body(response).await["right_child_id"].is_null());

        let response = send(
            &app,
            request(Method::DELETE, &format!("/api/nodes/{}", target["id"]), Some("ws"), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_credentials() {
        let (app, _temp) = test_app().await;

        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/nodes")
            .header(header::ORIGIN, ORIGIN)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, req).await;

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            ORIGIN
        );
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }
}
