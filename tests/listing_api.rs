mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{at, event, TestApp};
use event_board::models::Category;

fn titles(body: &Value) -> Vec<String> {
    body["data"]["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap().to_string())
        .collect()
}

fn query(pairs: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(pairs).unwrap()
}

#[tokio::test]
async fn category_and_week_filter_paginates_over_full_count() {
    let app = TestApp::new().await;

    for i in 0..25u32 {
        // 14..20 января, вся текущая неделя
        app.insert_event(event(&format!("Tech talk {i:02}"), Category::Tech, at(14 + i % 7, 9 + i % 10)))
            .await;
    }
    for day in [6, 10, 13, 21, 25] {
        app.insert_event(event("Out of week", Category::Tech, at(day, 10))).await;
    }
    app.insert_event(event("Other category", Category::Dining, at(16, 10))).await;
    let mut hidden = event("Not approved yet", Category::Tech, at(16, 10));
    hidden.admin_approved = false;
    app.insert_event(hidden).await;

    let (status, body) = app
        .get("/api/events?category=TECH&timeFilter=thisWeek&page=1&limit=20", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 20);

    let pagination = &body["data"]["pagination"];
    assert_eq!(pagination["currentPage"], 1);
    assert_eq!(pagination["totalPages"], 2);
    assert_eq!(pagination["totalCount"], 25);
    assert_eq!(pagination["limit"], 20);
    assert_eq!(pagination["hasNextPage"], true);
    assert_eq!(pagination["hasPrevPage"], false);
    assert!(titles(&body).iter().all(|t| t.starts_with("Tech talk")));

    let (_, second) = app
        .get("/api/events?category=tech&timeFilter=thisWeek&page=2&limit=20", None)
        .await;
    assert_eq!(second["data"]["events"].as_array().unwrap().len(), 5);
    assert_eq!(second["data"]["pagination"]["hasNextPage"], false);
    assert_eq!(second["data"]["pagination"]["hasPrevPage"], true);

    let mut all = titles(&body);
    all.extend(titles(&second));
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 25);
}

#[tokio::test]
async fn events_are_ordered_by_start_time() {
    let app = TestApp::new().await;
    app.insert_event(event("Late", Category::Stay, at(20, 18))).await;
    app.insert_event(event("Early", Category::Stay, at(15, 8))).await;
    app.insert_event(event("Middle", Category::Stay, at(17, 12))).await;

    let (_, body) = app.get("/api/events", None).await;
    assert_eq!(titles(&body), vec!["Early", "Middle", "Late"]);
}

#[tokio::test]
async fn tags_in_any_form_give_the_same_page() {
    let app = TestApp::new().await;
    for (title, tags) in [
        ("Gallery night", vec!["Art"]),
        ("Stand-up", vec!["Comedy", "Entertainment"]),
        ("Picnic", vec!["Free", "Family & Kids"]),
        ("Sculpture walk", vec!["Art", "Free"]),
    ] {
        let mut new = event(title, Category::Weekends, at(18, 15));
        new.tags = tags.into_iter().map(str::to_string).collect();
        app.insert_event(new).await;
    }

    let json_tags = query(&[("tags", r#"["Art","Comedy"]"#)]);
    let (status, from_json) = app.get(&format!("/api/events?{json_tags}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let comma_tags = query(&[("tags", "Art, Comedy")]);
    let (_, from_comma) = app.get(&format!("/api/events?{comma_tags}"), None).await;

    let (status, from_post) = app
        .json(Method::POST, "/api/events", None, json!({ "tags": ["Art", "Comedy"] }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let mut expected = titles(&from_json);
    expected.sort();
    assert_eq!(expected, vec!["Gallery night", "Sculpture walk", "Stand-up"]);

    assert_eq!(from_json["data"]["events"], from_comma["data"]["events"]);
    assert_eq!(from_json["data"]["events"], from_post["data"]["events"]);
    assert_eq!(from_json["data"]["pagination"], from_post["data"]["pagination"]);
    assert_eq!(from_post["data"]["appliedFilters"]["tags"], json!(["Art", "Comedy"]));
    assert_eq!(from_comma["data"]["filters"]["tags"], "Art, Comedy");
}

#[tokio::test]
async fn location_and_search_match_substrings_case_insensitively() {
    let app = TestApp::new().await;
    let mut harbor = event("Harbor Lights", Category::Weekends, at(19, 20));
    harbor.venue = "Old Harbor Pier".into();
    app.insert_event(harbor).await;
    let mut jazz = event("Evening set", Category::Weekends, at(19, 21));
    jazz.description = "Smooth JAZZ with a view".into();
    app.insert_event(jazz).await;
    app.insert_event(event("Plain", Category::Weekends, at(19, 22))).await;

    let (_, body) = app.get("/api/events?location=harbor", None).await;
    assert_eq!(titles(&body), vec!["Harbor Lights"]);

    let (_, body) = app.get("/api/events?search=jazz", None).await;
    assert_eq!(titles(&body), vec!["Evening set"]);

    let (_, body) = app.get("/api/events?location=anywhere", None).await;
    assert_eq!(titles(&body).len(), 3);
}

#[tokio::test]
async fn wildcards_in_search_are_literal() {
    let app = TestApp::new().await;
    app.insert_event(event("100% vinyl", Category::Shopping, at(18, 11))).await;
    app.insert_event(event("1000 records", Category::Shopping, at(18, 12))).await;

    let search = query(&[("search", "100%")]);
    let (_, body) = app.get(&format!("/api/events?{search}"), None).await;
    assert_eq!(titles(&body), vec!["100% vinyl"]);

    let (_, body) = app.get("/api/events?search=_", None).await;
    assert!(titles(&body).is_empty());
}

#[tokio::test]
async fn unknown_category_is_an_empty_page_not_an_error() {
    let app = TestApp::new().await;
    app.insert_event(event("Sushi", Category::Dining, at(18, 19))).await;

    let (status, body) = app.get("/api/events?category=CONCERTS", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(titles(&body).is_empty());
    assert_eq!(body["data"]["pagination"]["totalCount"], 0);
    assert_eq!(body["data"]["pagination"]["totalPages"], 0);
    assert_eq!(body["data"]["pagination"]["hasPrevPage"], false);
}

#[tokio::test]
async fn unrepresentable_custom_end_is_no_constraint() {
    let app = TestApp::new().await;
    app.insert_event(event("Far future", Category::Stay, at(22, 10))).await;

    let (status, body) = app
        .get("/api/events?timeFilter=custom&endDate=%2B262142-12-31", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Far future"]);

    let (status, body) = app
        .get("/api/events?timeFilter=custom&startDate=2024-01-20&endDate=%2B262142-12-31", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Far future"]);
}

#[tokio::test]
async fn page_past_the_end_keeps_the_total() {
    let app = TestApp::new().await;
    for i in 0..3 {
        app.insert_event(event(&format!("Market {i}"), Category::Shopping, at(20, 9 + i))).await;
    }

    let (status, body) = app.get("/api/events?page=5&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(titles(&body).is_empty());
    assert_eq!(body["data"]["pagination"]["totalCount"], 3);
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);
    assert_eq!(body["data"]["pagination"]["hasNextPage"], false);
}

#[tokio::test]
async fn malformed_post_body_is_a_validation_error() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(Method::POST, "/api/events", None, json!({ "tags": 42 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn search_requires_a_term() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "error": "Query parameter q is required", "code": "VALIDATION" })
    );

    let (status, _) = app.get("/api/search?q=%20%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_matches_tags_with_a_smaller_default_page() {
    let app = TestApp::new().await;
    for i in 0..12 {
        let mut new = event(&format!("Open air {i:02}"), Category::Weekends, at(21, 8 + i));
        new.tags = vec!["Festival".into(), "Free".into()];
        app.insert_event(new).await;
    }
    app.insert_event(event("Quiet reading", Category::Stay, at(21, 9))).await;

    let (status, body) = app.get("/api/search?q=festival", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 10);
    assert_eq!(body["data"]["pagination"]["limit"], 10);
    assert_eq!(body["data"]["pagination"]["totalCount"], 12);
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);

    let (_, body) = app.get("/api/search?q=festival&page=2", None).await;
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn health_and_root_respond() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}
