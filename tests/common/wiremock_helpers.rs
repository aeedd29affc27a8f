use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a mock analysis service whose `POST /analyze` answers with `body`.
pub async fn mock_analysis_server(body: Value) -> MockServer {
    let server = MockServer::start().await;
    mount_analyze(&server, 200, body, Duration::ZERO).await;
    server
}

/// Mounts `POST /analyze` on an existing server.
pub async fn mount_analyze(server: &MockServer, status: u16, body: Value, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Mounts `POST /analyze-har` on an existing server.
pub async fn mount_analyze_har(server: &MockServer, status: u16, body: Value, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/analyze-har"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Creates a mock HTTP server that returns the specified HTTP error status code
/// with an empty body for every request.
pub async fn mock_error_server(status_code: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status_code))
        .mount(&server)
        .await;

    server
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_analysis_server_returns_body() {
        let server = mock_analysis_server(serde_json::json!({"case_id": "C-9"})).await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/analyze", server.uri()))
            .json(&serde_json::json!({"url": "https://example.com"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["case_id"], "C-9");
    }

    #[tokio::test]
    async fn test_mock_error_server_returns_status_code() {
        let server = mock_error_server(503).await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/analyze", server.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 503);
    }
}
