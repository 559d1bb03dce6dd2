// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! HTTP server for the generated documentation.

use crate::analyzer::Analyzer;
use crate::openapi::generate_openapi;
use crate::postman::generate_postman;
use hyper::service::{make_service_fn, service_fn};
use hyper::{header, Body, Method, Request, Response, Server, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

struct Shared {
    analyzer: Arc<Analyzer>,
    proxy_port: u16,
}

/// Serve the documentation API until the task is dropped or the bind fails.
pub async fn run_api_server(
    listen: SocketAddr,
    analyzer: Arc<Analyzer>,
    proxy_port: u16,
) -> anyhow::Result<()> {
    let shared = Arc::new(Shared {
        analyzer,
        proxy_port,
    });

    let make_svc = make_service_fn(move |_conn| {
        let shared = shared.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle_request(req, shared.clone()))) }
    });

    let server = Server::try_bind(&listen)?.serve(make_svc);
    info!(%listen, "documentation server listening");
    server.await?;
    Ok(())
}

async fn handle_request(
    req: Request<Body>,
    shared: Arc<Shared>,
) -> Result<Response<Body>, Infallible> {
    let path = req.uri().path();

    if req.method() == Method::OPTIONS && path.starts_with("/api/") {
        return Ok(empty_response(StatusCode::OK));
    }

    if req.method() != Method::GET {
        return Ok(text_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
        ));
    }

    let response = match path {
        "/api/health" => json_response(&serde_json::json!({"status": "healthy"}), None),
        "/api/analyzer" => json_response(&shared.analyzer.snapshot(), None),
        "/api/openapi.json" => json_response(&generate_openapi(&shared.analyzer), None),
        "/api/postman.json" => json_response(
            &generate_postman(&shared.analyzer, shared.proxy_port),
            Some("attachment; filename=api-collection.json"),
        ),
        _ => text_response(StatusCode::NOT_FOUND, "Not found"),
    };

    Ok(response)
}

fn cors(builder: hyper::http::response::Builder) -> hyper::http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
}

fn empty_response(status: StatusCode) -> Response<Body> {
    cors(Response::builder().status(status))
        .body(Body::empty())
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

fn text_response(status: StatusCode, message: &'static str) -> Response<Body> {
    cors(Response::builder().status(status))
        .body(Body::from(message))
        .unwrap_or_else(|_| Response::new(Body::from(message)))
}

fn json_response<T: Serialize>(data: &T, disposition: Option<&'static str>) -> Response<Body> {
    let body = match serde_json::to_vec(data) {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "failed to serialize documentation response");
            return text_response(StatusCode::INTERNAL_SERVER_ERROR, "serialization error");
        }
    };

    let mut builder = cors(Response::builder().status(StatusCode::OK))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(disposition) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, disposition);
    }
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
