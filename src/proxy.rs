// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Reverse proxy that feeds observed exchanges to the analyzer.
//!
//! Bodies are buffered in full so the analyzer sees materialized bytes; the
//! analyzer call happens after the upstream response is complete and never
//! fails the proxied request.

use crate::analyzer::Analyzer;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Client, Request, Response, Server, Uri};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

struct Shared {
    client: Client<hyper::client::HttpConnector>,
    backend: Uri,
    analyzer: Arc<Analyzer>,
}

/// Run the proxy listener, forwarding everything to `backend_url`.
pub async fn run_proxy(
    listen: SocketAddr,
    backend_url: &str,
    analyzer: Arc<Analyzer>,
) -> anyhow::Result<()> {
    let backend: Uri = backend_url.parse()?;
    if backend.authority().is_none() {
        anyhow::bail!("backend URL has no host: {backend_url}");
    }

    let shared = Arc::new(Shared {
        client: Client::new(),
        backend,
        analyzer,
    });

    let make_svc = make_service_fn(move |_conn| {
        let shared = shared.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle_request(req, shared.clone()))) }
    });

    let server = Server::try_bind(&listen)?.serve(make_svc);
    info!(%listen, "proxy listening");
    server.await?;
    Ok(())
}

async fn handle_request(
    req: Request<Body>,
    shared: Arc<Shared>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let req_headers = req.headers().clone();
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let upstream_uri = match build_upstream_uri(&shared.backend, &path_and_query) {
        Ok(uri) => uri,
        Err(e) => {
            error!(%e, "failed to build upstream URI");
            return Ok(error_response(500, "request build error"));
        }
    };

    let request_body = match hyper::body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(%e, "failed to read request body");
            return Ok(error_response(500, "request build error"));
        }
    };

    let mut builder = Request::builder()
        .method(method.clone())
        .uri(upstream_uri.clone());
    for (name, value) in req_headers.iter() {
        builder = builder.header(name, value);
    }
    let upstream_req = match builder.body(Body::from(request_body.clone())) {
        Ok(request) => request,
        Err(e) => {
            error!(%e, "failed to build upstream request");
            return Ok(error_response(500, "request build error"));
        }
    };

    debug!(%method, uri = %upstream_uri, "forwarding request");

    let upstream_resp = match shared.client.request(upstream_req).await {
        Ok(response) => response,
        Err(e) => {
            error!(%e, uri = %upstream_uri, "upstream request failed");
            return Ok(error_response(502, "upstream error"));
        }
    };

    let status = upstream_resp.status();
    let resp_headers = upstream_resp.headers().clone();
    let response_body = match hyper::body::to_bytes(upstream_resp.into_body()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(%e, "failed to read upstream response body");
            return Ok(error_response(502, "upstream error"));
        }
    };

    shared.analyzer.process(
        method.as_str(),
        &upstream_uri.to_string(),
        &req_headers,
        &request_body,
        status.as_u16(),
        &resp_headers,
        &response_body,
    );

    let mut builder = Response::builder().status(status);
    for (name, value) in resp_headers.iter() {
        builder = builder.header(name, value);
    }
    Ok(builder
        .body(Body::from(response_body))
        .unwrap_or_else(|_| Response::new(Body::from("internal error"))))
}

/// Graft the request's path and query onto the backend's scheme and host.
fn build_upstream_uri(backend: &Uri, path_and_query: &str) -> anyhow::Result<Uri> {
    let scheme = backend.scheme_str().unwrap_or("http");
    let authority = backend
        .authority()
        .map(|authority| authority.as_str())
        .ok_or_else(|| anyhow::anyhow!("backend URL missing authority"))?;
    Ok(format!("{scheme}://{authority}{path_and_query}").parse()?)
}

fn error_response(status: u16, message: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(message))
        .unwrap_or_else(|_| Response::new(Body::from(message)))
}
