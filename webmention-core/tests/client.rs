use serde_json::json;
use time::macros::datetime;
use webmention_core::{Cursor, FetchError, MentionsClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page_zero() -> serde_json::Value {
    json!({
        "links": [
            {
                "id": 21,
                "source": "https://a.example/reply",
                "target": "https://b.example/posts/2020/microblog-is-bad/",
                "verified_date": "2020-05-05T14:54:13Z"
            },
            {
                "id": 22,
                "source": "https://a.example/like",
                "target": "https://b.example/posts/2020/microblog-is-bad/",
                "verified_date": "2020-05-06T09:00:00Z"
            }
        ]
    })
}

#[tokio::test]
async fn fetch_since_id_pulls_pages_until_one_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("since_id", "20"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_zero()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("since_id", "20"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"links": []})))
        .mount(&server)
        .await;

    let client = MentionsClient::with_base_url(&server.uri(), None, None, false).unwrap();
    let mentions = client.fetch_since(Cursor::Id(20)).await.unwrap();

    assert_eq!(mentions.len(), 2);
    assert_eq!(mentions[0].id(), Some(21));
    assert_eq!(mentions[1].id(), Some(22));
}

#[tokio::test]
async fn fetch_since_is_deterministic_for_a_fixed_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_zero()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"links": []})))
        .mount(&server)
        .await;

    let client = MentionsClient::with_base_url(&server.uri(), None, None, false).unwrap();
    let first = client.fetch_since(Cursor::Id(20)).await.unwrap();
    let second = client.fetch_since(Cursor::Id(20)).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn fetch_since_timestamp_sets_the_since_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("since", "2018-01-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = MentionsClient::with_base_url(&server.uri(), None, None, false).unwrap();
    let mentions = client
        .fetch_since(Cursor::Since(datetime!(2018-01-01 00:00:00 UTC)))
        .await
        .unwrap();

    assert!(mentions.is_empty());
}

#[tokio::test]
async fn fetch_concatenates_pages_across_wire_shapes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"links": [{"id": 1}]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"type": "feed", "name": "Webmentions", "children": []})),
        )
        .mount(&server)
        .await;

    let client = MentionsClient::with_base_url(&server.uri(), None, None, false).unwrap();
    let mentions = client.fetch_since(Cursor::Id(0)).await.unwrap();

    assert_eq!(mentions.len(), 2);
    assert_eq!(mentions[0].id(), Some(1));
    assert_eq!(mentions[1].id(), Some(2));
}

#[tokio::test]
async fn fetch_forwards_token_and_domain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("token", "t0K3n"))
        .and(query_param("domain", "example.org"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = MentionsClient::with_base_url(
        &server.uri(),
        Some("t0K3n".to_string()),
        Some("example.org".to_string()),
        false,
    )
    .unwrap();

    assert!(client.fetch_since(Cursor::Id(0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn an_error_status_aborts_the_whole_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"links": [{"id": 1}]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = MentionsClient::with_base_url(&server.uri(), None, None, false).unwrap();
    let error = client.fetch_since(Cursor::Id(0)).await.unwrap_err();

    assert!(matches!(error, FetchError::Api { .. }));
}

#[tokio::test]
async fn an_unparseable_page_aborts_the_whole_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"not a feed\""))
        .mount(&server)
        .await;

    let client = MentionsClient::with_base_url(&server.uri(), None, None, false).unwrap();
    let error = client.fetch_since(Cursor::Id(0)).await.unwrap_err();

    assert!(matches!(error, FetchError::Feed(_)));
}
