mod common;

use std::net::SocketAddr;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{at, event, TestApp};
use event_board::client::{EventsFilterClient, FilterUpdate, HttpTransport};
use event_board::models::Category;

async fn serve(app: &TestApp) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn client_drives_filters_and_paging_against_live_server() {
    let app = TestApp::new().await;
    for i in 0..3 {
        app.insert_event(event(&format!("Dinner {i}"), Category::Dining, at(18, 18 + i))).await;
    }
    for i in 0..2 {
        let mut tech = event(&format!("Meetup {i}"), Category::Tech, at(19, 18 + i));
        tech.tags = vec!["Workshop".into()];
        app.insert_event(tech).await;
    }
    let addr = serve(&app).await;

    let client = EventsFilterClient::new(HttpTransport::new(&format!("http://{addr}")).unwrap(), 2);

    client
        .apply_filters(vec![FilterUpdate::Category("DINING".into())])
        .await;
    let snapshot = client.snapshot();
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.events.len(), 2);
    assert_eq!(snapshot.pagination.total_count, 3);
    assert_eq!(snapshot.pagination.total_pages, 2);
    assert_eq!(client.active_filters_count(), 1);

    client.load_page(7).await;
    let snapshot = client.snapshot();
    assert_eq!(snapshot.pagination.current_page, 2);
    assert_eq!(snapshot.events.len(), 1);
    assert_eq!(snapshot.events[0].title, "Dinner 2");

    client
        .apply_filters(vec![
            FilterUpdate::Category("anything".into()),
            FilterUpdate::Tags(vec!["Workshop".into()]),
        ])
        .await;
    let snapshot = client.snapshot();
    assert_eq!(snapshot.pagination.total_count, 2);
    assert!(snapshot.events.iter().all(|e| e.category == "TECH"));

    client.clear_filters().await;
    let snapshot = client.snapshot();
    assert_eq!(snapshot.pagination.total_count, 5);
    assert_eq!(snapshot.pagination.current_page, 1);
    assert_eq!(client.active_filters_count(), 0);

    client.search("no such thing").await;
    let snapshot = client.snapshot();
    assert!(snapshot.events.is_empty());
    assert_eq!(snapshot.pagination.total_count, 0);
    assert_eq!(snapshot.error, None);
}

#[tokio::test]
async fn server_errors_surface_in_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "error": "Failed to filter events",
            "code": "INTERNAL",
        })))
        .mount(&server)
        .await;

    let client = EventsFilterClient::new(HttpTransport::new(&server.uri()).unwrap(), 20);
    client.refetch().await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.error.as_deref(), Some("Failed to filter events"));
    assert!(snapshot.events.is_empty());
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn non_json_failure_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = EventsFilterClient::new(HttpTransport::new(&server.uri()).unwrap(), 20);
    client.search("jazz").await;

    assert_eq!(client.snapshot().error.as_deref(), Some("HTTP 502"));
}
