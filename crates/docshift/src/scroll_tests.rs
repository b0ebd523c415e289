//! Tests for the cursor walker.

use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page_body(cursor: Option<&str>, ids: &[&str]) -> Value {
    let hits: Vec<Value> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| json!({"_id": id, "_source": {"name": id}, "sort": [i]}))
        .collect();
    let mut body = json!({"hits": {"total": ids.len(), "hits": hits}});
    if let Some(cursor) = cursor {
        body["_scroll_id"] = json!(cursor);
    }
    body
}

async fn mount_advance(server: &MockServer, cursor: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/_search/scroll"))
        .and(body_partial_json(json!({"scroll_id": cursor})))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_clear(server: &MockServer, cursor: &str) {
    Mock::given(method("DELETE"))
        .and(path("/_search/scroll"))
        .and(body_partial_json(json!({"scroll_id": [cursor]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"succeeded": true})))
        .expect(1)
        .mount(server)
        .await;
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn ids(page: &Page) -> Vec<String> {
    page.hits.iter().map(|h| h.id.clone()).collect()
}

#[tokio::test]
async fn test_walk_delivers_pages_in_order() {
    let server = MockServer::start().await;
    mount_advance(&server, "c0", ok(page_body(Some("c1"), &["a", "b"])), 1).await;
    mount_advance(&server, "c1", ok(page_body(Some("c2"), &["c"])), 1).await;
    mount_advance(&server, "c2", ok(page_body(Some("c3"), &[])), 1).await;

    let client = StoreClient::new(server.uri());
    let mut seen = Vec::new();
    walk(&client, "c0", Duration::ZERO, |page| {
        seen.push(ids(&page));
        async { Ok(()) }
    })
    .await
    .unwrap();

    assert_eq!(
        seen,
        vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()]
        ]
    );
}

#[tokio::test]
async fn test_walk_stops_when_hits_field_is_absent() {
    let server = MockServer::start().await;
    mount_advance(&server, "c0", ok(json!({"_scroll_id": "c1"})), 1).await;

    let client = StoreClient::new(server.uri());
    let mut calls = 0;
    walk(&client, "c0", Duration::ZERO, |_page| {
        calls += 1;
        async { Ok(()) }
    })
    .await
    .unwrap();

    assert_eq!(calls, 0);
}

#[tokio::test]
async fn test_walk_fetch_error_propagates_after_earlier_pages() {
    let server = MockServer::start().await;
    mount_advance(&server, "c0", ok(page_body(Some("c1"), &["a"])), 1).await;
    mount_advance(&server, "c1", ResponseTemplate::new(500), 1).await;
    mount_clear(&server, "c1").await;

    let client = StoreClient::new(server.uri());
    let mut seen = Vec::new();
    let result = walk(&client, "c0", Duration::ZERO, |page| {
        seen.push(ids(&page));
        async { Ok(()) }
    })
    .await;

    assert!(matches!(result, Err(Error::Status { status: 500, .. })));
    assert_eq!(seen, vec![vec!["a".to_string()]]);
}

#[tokio::test]
async fn test_walk_stops_on_handler_error() {
    let server = MockServer::start().await;
    mount_advance(&server, "c0", ok(page_body(Some("c1"), &["a"])), 1).await;
    mount_advance(&server, "c1", ok(page_body(Some("c2"), &["b"])), 0).await;
    mount_clear(&server, "c1").await;

    let client = StoreClient::new(server.uri());
    let result = walk(&client, "c0", Duration::ZERO, |page| async move {
        Err(Error::transform(page.hits[0].id.clone(), "handler failed"))
    })
    .await;

    assert!(matches!(result, Err(Error::Transform { .. })));
}

#[tokio::test]
async fn test_walk_waits_between_pages() {
    let server = MockServer::start().await;
    mount_advance(&server, "c0", ok(page_body(Some("c1"), &["a"])), 1).await;
    mount_advance(&server, "c1", ok(page_body(Some("c2"), &["b"])), 1).await;
    mount_advance(&server, "c2", ok(page_body(Some("c3"), &[])), 1).await;

    let client = StoreClient::new(server.uri());
    let start = std::time::Instant::now();
    walk(&client, "c0", Duration::from_millis(60), |_page| async { Ok(()) })
        .await
        .unwrap();

    // Two pauses: after page 1 and after page 2.
    assert!(start.elapsed() >= Duration::from_millis(120));
}

#[tokio::test]
async fn test_walk_uses_newest_cursor() {
    let server = MockServer::start().await;
    mount_advance(&server, "c0", ok(page_body(Some("fresh"), &["a"])), 1).await;
    mount_advance(&server, "fresh", ok(page_body(None, &[])), 1).await;

    let client = StoreClient::new(server.uri());
    walk(&client, "c0", Duration::ZERO, |_page| async { Ok(()) })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_open_hands_out_opening_hits_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/idx/_search"))
        .and(query_param("scroll", "5m"))
        .respond_with(ok(page_body(Some("c0"), &["a"])))
        .expect(1)
        .mount(&server)
        .await;
    mount_advance(&server, "c0", ok(page_body(Some("c1"), &["b"])), 1).await;
    mount_advance(&server, "c1", ok(page_body(Some("c2"), &[])), 1).await;

    let client = StoreClient::new(server.uri());
    let mut scroll = Scroll::open(
        &client,
        "idx/_search",
        &json!({"sort": ["_doc"]}),
        Duration::from_secs(300),
        ScrollOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(scroll.total_hits(), Some(1));

    let first = scroll.next_page().await.unwrap().unwrap();
    assert_eq!(first.number, 1);
    assert_eq!(ids(&first), vec!["a"]);

    let second = scroll.next_page().await.unwrap().unwrap();
    assert_eq!(second.number, 2);
    assert_eq!(ids(&second), vec!["b"]);

    assert!(scroll.next_page().await.unwrap().is_none());
    assert!(scroll.is_finished());
    // Exhaustion is reported once; later calls never reach the store.
    assert!(scroll.next_page().await.unwrap().is_none());
    assert_eq!(scroll.pages(), 2);
}

#[tokio::test]
async fn test_open_without_cursor_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/idx/_search"))
        .respond_with(ok(page_body(None, &["a"])))
        .mount(&server)
        .await;

    let client = StoreClient::new(server.uri());
    let result = Scroll::open(
        &client,
        "idx/_search",
        &json!({}),
        Duration::from_secs(60),
        ScrollOptions::default(),
    )
    .await;

    assert!(matches!(result, Err(Error::MissingField("_scroll_id"))));
}

#[tokio::test]
async fn test_close_releases_cursor_once() {
    let server = MockServer::start().await;
    mount_advance(&server, "c0", ok(page_body(Some("c1"), &["a"])), 1).await;
    mount_clear(&server, "c1").await;

    let client = StoreClient::new(server.uri());
    let mut scroll = Scroll::resume(&client, "c0", ScrollOptions::default());
    assert!(scroll.next_page().await.unwrap().is_some());

    scroll.close().await;
    assert!(scroll.is_finished());
    scroll.close().await;
    assert!(scroll.next_page().await.unwrap().is_none());
}

#[test]
fn test_page_sort_span() {
    let mut first = Hit::new("a", json!({}));
    first.sort = Some(vec![json!(10)]);
    let mut last = Hit::new("b", json!({}));
    last.sort = Some(vec![json!(42)]);

    let page = Page {
        number: 1,
        hits: vec![first, last],
    };
    let (begin, end) = page.sort_span().unwrap();
    assert_eq!(begin, &json!(10));
    assert_eq!(end, &json!(42));

    let unsorted = Page {
        number: 1,
        hits: vec![Hit::new("a", json!({}))],
    };
    assert!(unsorted.sort_span().is_none());
}

#[test]
fn test_total_hits_both_shapes() {
    let old: SearchResponse = serde_json::from_value(json!({"hits": {"total": 7, "hits": []}})).unwrap();
    assert_eq!(old.total_hits(), Some(7));

    let new: SearchResponse =
        serde_json::from_value(json!({"hits": {"total": {"value": 9, "relation": "eq"}}})).unwrap();
    assert_eq!(new.total_hits(), Some(9));
    assert!(new.into_hits().is_empty());
}

#[test]
fn test_hit_deserialization() {
    let json = r#"{"_index":"idx","_type":"doc","_id":"doc1","_score":null,"_source":{"title":"T"},"sort":[0]}"#;
    let hit: Hit = serde_json::from_str(json).unwrap();
    assert_eq!(hit.id, "doc1");
    assert_eq!(hit.index.as_deref(), Some("idx"));
    assert_eq!(hit.source["title"], "T");
}
