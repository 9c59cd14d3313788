use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use pipeline_core::{
    config::GitHubConfig, CodeHost, CommitState, CommitStatus, PipelineError,
};
use pipeline_github::{app_jwt, AppClaims, GitHubClient};

const PRIVATE_KEY: &str = include_str!("fixtures/app-key.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/app-key.pub.pem");

fn token_client(server: &MockServer) -> GitHubClient {
    GitHubClient::with_token(&server.uri(), "acme", "app", "ghp_test".to_string()).unwrap()
}

#[test]
fn test_app_jwt_is_rs256_signed() {
    let escaped = PRIVATE_KEY.trim().replace('\n', "\\n");
    let token = app_jwt("4242", &escaped, Utc::now()).unwrap();

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&["4242"]);
    let decoded = decode::<AppClaims>(
        &token,
        &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
        &validation,
    )
    .unwrap();
    assert_eq!(decoded.claims.exp - decoded.claims.iat, 600);
}

#[tokio::test]
async fn test_app_installation_token_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_installation",
            "expires_at": "2030-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/commits/abc123/pulls"))
        .and(header("Authorization", "Bearer ghs_installation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 17, "state": "open", "title": "Login flow"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = GitHubConfig {
        api_url: server.uri(),
        app_id: Some("4242".to_string()),
        installation_id: Some("99".to_string()),
        private_key: Some(PRIVATE_KEY.to_string()),
        ..GitHubConfig::default()
    };
    let client = GitHubClient::connect(&config, "acme", "app").await.unwrap();
    let prs = client.pull_requests_for_commit("abc123").await.unwrap();
    assert_eq!(prs.len(), 1);
    assert!(prs[0].is_open());
}

#[tokio::test]
async fn test_failed_token_exchange_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let config = GitHubConfig {
        api_url: server.uri(),
        app_id: Some("4242".to_string()),
        installation_id: Some("99".to_string()),
        private_key: Some(PRIVATE_KEY.to_string()),
        ..GitHubConfig::default()
    };
    let err = GitHubClient::connect(&config, "acme", "app").await.err().unwrap();
    let err = PipelineError::from(err);
    assert!(matches!(err, PipelineError::Authentication(_)));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_missing_repository() {
    let config = GitHubConfig {
        token: Some("ghp_test".to_string()),
        ..GitHubConfig::default()
    };
    let err = GitHubClient::connect(&config, "", "app").await.err().unwrap();
    assert!(PipelineError::from(err).is_configuration());
}

#[tokio::test]
async fn test_comments_are_paginated() {
    let server = MockServer::start().await;
    let first_page: Vec<_> = (0..100)
        .map(|i| json!({"id": i, "body": format!("comment {i}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/issues/7/comments"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/issues/7/comments"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 500, "body": "<!-- e2e-pipeline:sticky-report -->\nold"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let comments = token_client(&server).list_issue_comments(7).await.unwrap();
    assert_eq!(comments.len(), 101);
    assert_eq!(comments[100].id, 500);
}

#[tokio::test]
async fn test_create_and_update_comment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/issues/7/comments"))
        .and(body_json(json!({"body": "hello"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "body": "hello"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/app/issues/comments/1"))
        .and(body_json(json!({"body": "again"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "body": "again"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let created = client.create_issue_comment(7, "hello").await.unwrap();
    assert_eq!(created.id, 1);
    let updated = client.update_issue_comment(1, "again").await.unwrap();
    assert_eq!(updated.body, "again");
}

#[tokio::test]
async fn test_commit_status_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/statuses/abc123"))
        .and(body_json(json!({
            "state": "failure",
            "description": "2 failing tests",
            "context": "e2e/tests"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let status = CommitStatus {
        state: CommitState::Failure,
        description: "2 failing tests".to_string(),
        context: "e2e/tests".to_string(),
        target_url: None,
    };
    token_client(&server)
        .create_commit_status("abc123", &status)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_success_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/issues/7/comments"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = token_client(&server)
        .create_issue_comment(7, "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Remote { status: Some(502), .. }));
}

#[tokio::test]
async fn test_stalled_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/commits/abc123/pulls"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = token_client(&server).with_request_timeout(Duration::from_millis(200));
    let err = client.pull_requests_for_commit("abc123").await.unwrap_err();
    assert!(matches!(err, PipelineError::Remote { status: None, .. }));
    assert!(err.to_string().contains("/repos/acme/app/commits/abc123/pulls"));
}

#[tokio::test]
async fn test_unknown_commit_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/commits/deadbeef/pulls"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "No commit found for SHA: deadbeef"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = token_client(&server)
        .pull_requests_for_commit("deadbeef")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
