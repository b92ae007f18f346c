use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tripplan_core::{ApiError, HttpTransport, PlannerClient, TripplanConfig};

/// Accepts a single connection, answers it with `status` and `body`, and
/// yields the raw request text.
async fn serve_once(status: &'static str, body: &'static str) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);
            if request_complete(&buf) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    });
    (addr, handle)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buf.len() >= header_end + 4 + content_length
}

fn planner_for(addr: SocketAddr, token: Option<&str>) -> PlannerClient {
    let mut config = TripplanConfig::for_base_url(format!("http://{addr}"));
    config.auth.token = token.map(str::to_string);
    config
        .backend
        .headers
        .insert("X-Client".into(), "integration".into());
    let transport = HttpTransport::from_config(&config).unwrap();
    PlannerClient::new(Arc::new(transport))
}

#[tokio::test]
async fn server_error_surfaces_as_status_error() {
    let (addr, server) = serve_once("500 Internal Server Error", "{\"error\":\"boom\"}").await;

    let err = planner_for(addr, None)
        .delete_itinerary("abc")
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "{\"error\":\"boom\"}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let request = server.await.unwrap();
    assert!(request.starts_with("DELETE /api/itinerary/delete?id=abc HTTP/1.1"));
}

#[tokio::test]
async fn voice_plan_sends_json_body_and_configured_headers() {
    let (addr, server) = serve_once("200 OK", "{\"destination\":\"Paris\",\"schedule\":[]}").await;

    let payload = planner_for(addr, Some("t0ken"))
        .voice_plan("take me to Paris")
        .await
        .unwrap();

    assert_eq!(
        payload.as_value(),
        &json!({"destination": "Paris", "schedule": []})
    );
    assert!(payload.itinerary().is_some());
    let request = server.await.unwrap();
    let lower = request.to_ascii_lowercase();
    assert!(request.starts_with("POST /api/itinerary/generate HTTP/1.1"));
    assert!(lower.contains("authorization: bearer t0ken"));
    assert!(lower.contains("x-client: integration"));
    assert!(lower.contains("content-type: application/json"));
    assert!(request.ends_with("{\"voiceText\":\"take me to Paris\"}"));
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let (addr, server) = serve_once("200 OK", "not json").await;

    let err = planner_for(addr, None)
        .search_pois("museum", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Decode(_)));
    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/planner/pois?keywords=museum HTTP/1.1"));
}

#[tokio::test]
async fn refused_connection_is_an_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = planner_for(addr, None)
        .get_itinerary("it-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Http(_)));
}

#[tokio::test]
async fn silent_backend_times_out_as_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });
    let mut config = TripplanConfig::for_base_url(format!("http://{addr}"));
    config.backend.timeout_seconds = 1;
    let planner = PlannerClient::new(Arc::new(HttpTransport::from_config(&config).unwrap()));

    let started = Instant::now();
    let err = planner.list_itineraries("u-1").await.unwrap_err();

    match err {
        ApiError::Http(source) => assert!(source.is_timeout(), "not a timeout: {source}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(4));
    server.abort();
}
