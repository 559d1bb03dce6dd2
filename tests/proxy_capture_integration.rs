// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! End-to-end capture tests: real sockets, a mock backend, a live proxy.

mod common;

use common::spawn_proxy;
use docurift::analyzer::Analyzer;
use hyper::{Body, Client, Request};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn observed_traffic_builds_the_registry() -> anyhow::Result<()> {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 123, "name": "John"})),
        )
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 124})))
        .mount(&backend)
        .await;

    let analyzer = Arc::new(Analyzer::new());
    let proxy_addr = spawn_proxy(backend.uri(), analyzer.clone()).await?;
    let client = Client::new();

    let resp = client
        .request(
            Request::builder()
                .method("GET")
                .uri(format!("http://{proxy_addr}/api/users/123?verbose=true"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    let bytes = hyper::body::to_bytes(resp.into_body()).await?;
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&bytes)?,
        json!({"id": 123, "name": "John"})
    );

    let resp = client
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("http://{proxy_addr}/api/users"))
                .header("content-type", "application/json")
                .header("x-client", "integration")
                .body(Body::from(serde_json::to_vec(&json!({"name": "Jane"}))?))?,
        )
        .await?;
    assert_eq!(resp.status().as_u16(), 201);

    let snapshot = analyzer.snapshot();

    let get = snapshot
        .get("GET /api/users/{id}")
        .expect("numeric segment is normalized");
    assert_eq!(
        get.url_parameters.examples.get("verbose"),
        Some(&vec![json!("true")])
    );
    let slot = get.response_statuses.get(&200).expect("200 slot");
    assert_eq!(slot.payload.examples.get("id"), Some(&vec![json!(123)]));
    assert_eq!(
        slot.payload.examples.get("name"),
        Some(&vec![json!("John")])
    );

    let post = snapshot.get("POST /api/users").expect("post endpoint");
    assert_eq!(
        post.request_payload.examples.get("name"),
        Some(&vec![json!("Jane")])
    );
    assert_eq!(
        post.request_headers.examples.get("x-client"),
        Some(&vec![json!("integration")])
    );

    Ok(())
}

#[tokio::test]
async fn error_responses_pass_through_without_capture() -> anyhow::Result<()> {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&backend)
        .await;

    let analyzer = Arc::new(Analyzer::new());
    let proxy_addr = spawn_proxy(backend.uri(), analyzer.clone()).await?;

    let resp = Client::new()
        .request(
            Request::builder()
                .method("POST")
                .uri(format!("http://{proxy_addr}/x"))
                .body(Body::from("{}"))?,
        )
        .await?;
    assert_eq!(resp.status().as_u16(), 500);
    let bytes = hyper::body::to_bytes(resp.into_body()).await?;
    assert_eq!(&bytes[..], b"boom");

    assert!(analyzer.snapshot().is_empty());
    Ok(())
}

#[tokio::test]
async fn gzip_responses_are_decoded_for_analysis_but_relayed_raw() -> anyhow::Result<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&serde_json::to_vec(&json!({"compressed": true}))?)?;
    let compressed = encoder.finish()?;

    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(compressed.clone()),
        )
        .mount(&backend)
        .await;

    let analyzer = Arc::new(Analyzer::new());
    let proxy_addr = spawn_proxy(backend.uri(), analyzer.clone()).await?;

    let resp = Client::new()
        .request(
            Request::builder()
                .method("GET")
                .uri(format!("http://{proxy_addr}/gz"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    let bytes = hyper::body::to_bytes(resp.into_body()).await?;
    assert_eq!(&bytes[..], &compressed[..], "proxy must not reencode");

    let snapshot = analyzer.snapshot();
    let endpoint = snapshot.get("GET /gz").expect("endpoint captured");
    let slot = endpoint.response_statuses.get(&200).expect("200 slot");
    assert_eq!(
        slot.payload.examples.get("compressed"),
        Some(&vec![json!(true)])
    );
    Ok(())
}

#[tokio::test]
async fn repeated_traffic_respects_example_distinctness() -> anyhow::Result<()> {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "ok"})))
        .mount(&backend)
        .await;

    let analyzer = Arc::new(Analyzer::new());
    let proxy_addr = spawn_proxy(backend.uri(), analyzer.clone()).await?;
    let client = Client::new();

    for _ in 0..5 {
        let resp = client
            .request(
                Request::builder()
                    .method("GET")
                    .uri(format!("http://{proxy_addr}/api/status"))
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(resp.status().as_u16(), 200);
    }

    let snapshot = analyzer.snapshot();
    let endpoint = snapshot.get("GET /api/status").expect("endpoint captured");
    let slot = endpoint.response_statuses.get(&200).expect("200 slot");
    assert_eq!(
        slot.payload.examples.get("state"),
        Some(&vec![json!("ok")]),
        "identical responses collapse to one example"
    );
    Ok(())
}
