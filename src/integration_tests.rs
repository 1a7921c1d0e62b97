// ABOUTME: Integration tests for API endpoints
// ABOUTME: Drives the real router: authentication, envelopes, validation details and pagination

#[cfg(test)]
mod tests {
    use super::super::app::{router, AppState};
    use super::super::config::Config;
    use super::super::storage::Storage;
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn create_test_app_with(config: Config) -> (TestServer, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("test.db").display());
        let storage = Storage::connect(&db_url).await.unwrap();

        let app = router(AppState::new(storage, config));
        (TestServer::new(app).unwrap(), temp_dir)
    }

    async fn create_test_app() -> (TestServer, TempDir) {
        create_test_app_with(Config::default()).await
    }

    fn bearer(api_key: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", api_key)).unwrap()
    }

    /// Registers a user and returns (user id, api key).
    async fn register(server: &TestServer, name: &str) -> (String, String) {
        let response = server.post("/users").json(&json!({ "name": name })).await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        (
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
            body["data"]["apiKey"].as_str().unwrap().to_string(),
        )
    }

    async fn create_workspace(server: &TestServer, key: &str, name: &str) -> String {
        let response = server
            .post("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(key))
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_note(server: &TestServer, key: &str, workspace_id: &str, title: &str, content: &str) -> Value {
        let response = server
            .post(&format!("/workspaces/{}/notes", workspace_id))
            .add_header(header::AUTHORIZATION, bearer(key))
            .json(&json!({ "title": title, "content": content }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["data"].clone()
    }

    fn assert_error(body: &Value, code: &str) {
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!(code));
        assert!(!body["error"]["message"].as_str().unwrap().is_empty());
        assert!(body["error"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (server, _temp_dir) = create_test_app().await;

        let response = server.get("/health").await;
        response.assert_status_ok();
        response.assert_json(&json!({ "success": true, "data": { "status": "ok" } }));
        assert_eq!(response.header("x-content-type-options"), "nosniff");
    }

    #[tokio::test]
    async fn test_missing_or_bad_credential_is_unauthorized() {
        let (server, _temp_dir) = create_test_app().await;

        let response = server.get("/workspaces").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_error(&response.json(), "UNAUTHORIZED");

        let response = server
            .get("/workspaces")
            .add_header(header::AUTHORIZATION, bearer("nsk_not-a-real-key"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_error(&response.json(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_me_hides_api_key() {
        let (server, _temp_dir) = create_test_app().await;
        let (user_id, key) = register(&server, "alice").await;

        let response = server
            .get("/me")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["id"], json!(user_id));
        assert_eq!(body["data"]["name"], json!("alice"));
        assert!(body["data"].get("apiKey").is_none());
    }

    #[tokio::test]
    async fn test_forbidden_versus_not_found() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, alice) = register(&server, "alice").await;
        let (_, bob) = register(&server, "bob").await;
        let workspace_id = create_workspace(&server, &alice, "Research").await;

        let response = server
            .get(&format!("/workspaces/{}", workspace_id))
            .add_header(header::AUTHORIZATION, bearer(&bob))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_error(&response.json(), "FORBIDDEN");

        let response = server
            .get(&format!("/workspaces/{}", Uuid::new_v4()))
            .add_header(header::AUTHORIZATION, bearer(&bob))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_error(&response.json(), "NOT_FOUND");

        let response = server
            .get(&format!("/workspaces/{}", workspace_id))
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["name"], json!("Research"));
    }

    #[tokio::test]
    async fn test_validation_reports_every_field() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;
        let workspace_id = create_workspace(&server, &key, "Docs").await;
        let note = create_note(&server, &key, &workspace_id, "Note", "abc").await;

        let response = server
            .post(&format!("/notes/{}/diffs", note["id"].as_str().unwrap()))
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "position": -1, "length": -1 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_error(&body, "VALIDATION_FAILED");
        let paths: Vec<&str> = body["error"]["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["position", "length", "newText"]);

        let response = server
            .post(&format!("/workspaces/{}/notes", workspace_id))
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "content": "no title" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["details"][0]["path"], json!("title"));
        assert_eq!(body["error"]["details"][0]["code"], json!("required"));
    }

    #[tokio::test]
    async fn test_wrong_types_are_reported_per_field() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;

        let response = server
            .post("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "name": 5, "description": 7 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_error(&body, "VALIDATION_FAILED");
        let details: Vec<(&str, &str)> = body["error"]["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| (d["path"].as_str().unwrap(), d["code"].as_str().unwrap()))
            .collect();
        assert_eq!(
            details,
            vec![("name", "invalid_type"), ("description", "invalid_type")]
        );
    }

    #[tokio::test]
    async fn test_huge_page_is_rejected() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;
        create_workspace(&server, &key, "Docs").await;

        let response = server
            .get("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .add_query_param("page", i64::MAX)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_error(&body, "VALIDATION_FAILED");
        assert_eq!(body["error"]["details"][0]["path"], json!("page"));

        let response = server
            .get("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .add_query_param("page", "first")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["details"][0]["code"], json!("invalid_type"));
    }

    #[tokio::test]
    async fn test_empty_description_clears_it() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;

        let response = server
            .post("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "name": "Described", "description": "Team notes" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let workspace_id = body["data"]["id"].as_str().unwrap().to_string();

        let response = server
            .patch(&format!("/workspaces/{}", workspace_id))
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "description": "" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["name"], json!("Described"));
        assert!(body["data"]["description"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_input_uses_error_envelope() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;

        let response = server
            .post("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .content_type("application/json")
            .bytes("{not json".into())
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error(&response.json(), "VALIDATION_FAILED");

        let response = server
            .get("/notes/not-a-uuid")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error(&response.json(), "VALIDATION_FAILED");

        let response = server
            .get("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .add_query_param("limit", 1000)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["details"][0]["path"], json!("limit"));
    }

    #[tokio::test]
    async fn test_note_listing_pagination_meta() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;
        let workspace_id = create_workspace(&server, &key, "Bulk").await;
        for i in 0..15 {
            create_note(&server, &key, &workspace_id, &format!("Note {}", i), "").await;
        }

        let response = server
            .get(&format!("/workspaces/{}/notes", workspace_id))
            .add_header(header::AUTHORIZATION, bearer(&key))
            .add_query_param("page", 2)
            .add_query_param("limit", 10)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"].as_array().unwrap().len(), 5);
        assert_eq!(
            body["pagination"],
            json!({
                "page": 2,
                "limit": 10,
                "total": 15,
                "totalPages": 2,
                "hasNext": false,
                "hasPrev": true
            })
        );

        let response = server
            .get(&format!("/workspaces/{}/notes", workspace_id))
            .add_header(header::AUTHORIZATION, bearer(&key))
            .add_query_param("orderBy", "content")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_diff_endpoint_updates_note() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;
        let workspace_id = create_workspace(&server, &key, "Docs").await;
        let note = create_note(&server, &key, &workspace_id, "Greeting", "Hello world").await;
        let note_id = note["id"].as_str().unwrap();

        let response = server
            .post(&format!("/notes/{}/diffs", note_id))
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "position": 6, "length": 5, "newText": "there", "expectedVersion": 1 }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["note"]["content"], json!("Hello there"));
        assert_eq!(body["data"]["note"]["version"], json!(2));
        assert_eq!(body["data"]["diff"]["newText"], json!("there"));

        // Same expected version again is now stale
        let response = server
            .post(&format!("/notes/{}/diffs", note_id))
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "position": 0, "newText": "Oh, ", "expectedVersion": 1 }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_error(&response.json(), "CONFLICT");

        let response = server
            .get(&format!("/notes/{}/diffs", note_id))
            .add_header(header::AUTHORIZATION, bearer(&key))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], json!(1));
    }

    #[tokio::test]
    async fn test_read_only_member_gets_forbidden_on_update() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, alice) = register(&server, "alice").await;
        let (carol_id, carol) = register(&server, "carol").await;
        let workspace_id = create_workspace(&server, &alice, "Shared").await;
        let note = create_note(&server, &alice, &workspace_id, "Plan", "original").await;
        let note_id = note["id"].as_str().unwrap();

        server
            .put(&format!("/workspaces/{}/permissions", workspace_id))
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .json(&json!({ "userId": carol_id, "canWrite": false }))
            .await
            .assert_status_ok();

        let response = server
            .put(&format!("/notes/{}", note_id))
            .add_header(header::AUTHORIZATION, bearer(&carol))
            .json(&json!({ "content": "changed" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server
            .get(&format!("/notes/{}", note_id))
            .add_header(header::AUTHORIZATION, bearer(&carol))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["content"], json!("original"));
        assert_eq!(body["data"]["version"], json!(1));
    }

    #[tokio::test]
    async fn test_conflict_detail_only_outside_production() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;
        create_workspace(&server, &key, "Taken").await;

        let response = server
            .post("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "name": "Taken" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_error(&body, "CONFLICT");
        assert!(body["error"]["detail"].is_string());

        let production = Config {
            app_env: "production".to_string(),
            ..Config::default()
        };
        let (server, _temp_dir) = create_test_app_with(production).await;
        let (_, key) = register(&server, "alice").await;
        create_workspace(&server, &key, "Taken").await;

        let response = server
            .post("/workspaces")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "name": "Taken" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_error(&body, "CONFLICT");
        assert!(body["error"].get("detail").is_none());
    }

    #[tokio::test]
    async fn test_self_link_rejected_over_http() {
        let (server, _temp_dir) = create_test_app().await;
        let (_, key) = register(&server, "alice").await;
        let workspace_id = create_workspace(&server, &key, "Graph").await;
        let note = create_note(&server, &key, &workspace_id, "Loop", "").await;

        let response = server
            .post("/links")
            .add_header(header::AUTHORIZATION, bearer(&key))
            .json(&json!({ "sourceNoteId": note["id"], "targetNoteId": note["id"] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["details"][0]["path"], json!("targetNoteId"));
    }

    #[tokio::test]
    async fn test_unknown_route_uses_envelope() {
        let (server, _temp_dir) = create_test_app().await;

        let response = server.get("/nowhere").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_error(&response.json(), "NOT_FOUND");
    }
}
