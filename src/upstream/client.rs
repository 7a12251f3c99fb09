// reqwest-backed upstream
// One client per process; redirects are followed up to the configured limit

use async_trait::async_trait;
use futures::StreamExt;
use hyper::body::Bytes;
use hyper::ext::ReasonPhrase;
use reqwest::redirect::Policy;
use std::time::Duration;

use super::{ProxyError, Upstream, UpstreamRequest, UpstreamResponse};
use crate::config::ProxyConfig;

pub struct HttpUpstream {
    client: reqwest::Client,
    max_response_size: u64,
}

impl HttpUpstream {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::limited(config.max_redirects))
            .no_proxy();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build().map_err(ProxyError::Client)?;
        Ok(Self {
            client,
            max_response_size: config.max_response_size,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ProxyError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }
        let response = builder.send().await.map_err(ProxyError::Request)?;

        let status = response.status();
        let reason = response.extensions().get::<ReasonPhrase>().cloned();
        let headers = response.headers().clone();
        let body = read_capped(response, self.max_response_size).await?;

        Ok(UpstreamResponse {
            status,
            reason,
            headers,
            body,
        })
    }
}

/// Read the body chunk by chunk, failing as soon as it grows past `limit`
async fn read_capped(response: reqwest::Response, limit: u64) -> Result<Bytes, ProxyError> {
    if response.content_length().is_some_and(|len| len > limit) {
        return Err(ProxyError::TooLarge { limit });
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ProxyError::Body)?;
        if u64::try_from(body.len() + chunk.len()).unwrap_or(u64::MAX) > limit {
            return Err(ProxyError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::header::{HeaderMap, HeaderValue};
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Method, Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use tokio::net::TcpListener;

    /// Echo server: reflects method, body and selected request headers
    async fn spawn_echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let service = service_fn(|req: Request<hyper::body::Incoming>| async move {
                        if req.uri().path() == "/moved" {
                            return Ok::<_, Infallible>(
                                Response::builder()
                                    .status(302)
                                    .header("location", "/final")
                                    .body(Full::new(Bytes::new()))
                                    .expect("redirect response"),
                            );
                        }
                        let method = req.method().to_string();
                        let path = req.uri().path().to_string();
                        let seen_origin = req.headers().contains_key("origin");
                        let token = req
                            .headers()
                            .get("x-token")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-")
                            .to_string();
                        let body = req.into_body().collect().await.map(|c| c.to_bytes()).unwrap_or_default();
                        Ok(Response::builder()
                            .status(201)
                            .header("x-echo-method", method)
                            .header("x-echo-path", path)
                            .header("x-echo-origin", seen_origin.to_string())
                            .header("x-echo-token", token)
                            .body(Full::new(body))
                            .expect("echo response"))
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_fetch_forwards_method_headers_and_body() {
        let base = spawn_echo_server().await;
        let upstream = HttpUpstream::new(&ProxyConfig::default()).expect("client");

        let mut headers = HeaderMap::new();
        headers.insert("x-token", HeaderValue::from_static("abc"));
        let response = upstream
            .fetch(UpstreamRequest {
                method: Method::POST,
                url: format!("{base}/submit"),
                headers,
                body: Bytes::from_static(b"payload"),
            })
            .await
            .expect("upstream reachable");

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.headers["x-echo-method"], "POST");
        assert_eq!(response.headers["x-echo-token"], "abc");
        assert_eq!(response.headers["x-echo-origin"], "false");
        assert_eq!(response.body, Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let base = spawn_echo_server().await;
        let upstream = HttpUpstream::new(&ProxyConfig::default()).expect("client");

        let response = upstream
            .fetch(UpstreamRequest {
                method: Method::GET,
                url: format!("{base}/moved"),
                headers: HeaderMap::new(),
                body: Bytes::new(),
            })
            .await
            .expect("upstream reachable");

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.headers["x-echo-path"], "/final");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_request_error() {
        // Bind then drop to obtain a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let upstream = HttpUpstream::new(&ProxyConfig::default()).expect("client");
        let err = upstream
            .fetch(UpstreamRequest {
                method: Method::GET,
                url: format!("http://{addr}/"),
                headers: HeaderMap::new(),
                body: Bytes::new(),
            })
            .await
            .expect_err("nothing listening");
        assert!(matches!(err, ProxyError::Request(_)));
    }

    /// Answer one connection with a canned raw HTTP/1.1 response
    async fn spawn_raw_upstream(raw: &'static [u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(raw).await;
            let _ = stream.shutdown().await;
        });
        format!("http://{addr}/")
    }

    fn get(url: String) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_fetch_keeps_custom_reason_phrase() {
        let url = spawn_raw_upstream(
            b"HTTP/1.1 200 Custom Reason\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        )
        .await;
        let upstream = HttpUpstream::new(&ProxyConfig::default()).expect("client");

        let response = upstream.fetch(get(url)).await.expect("upstream reachable");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.reason.as_ref().map(ReasonPhrase::as_bytes),
            Some(&b"Custom Reason"[..])
        );
        assert_eq!(response.body, Bytes::from_static(b"ok"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_declared_oversize_body() {
        let url = spawn_raw_upstream(
            b"HTTP/1.1 200 OK\r\nContent-Length: 64\r\nConnection: close\r\n\r\n0123456789abcdef",
        )
        .await;
        let upstream = HttpUpstream::new(&ProxyConfig {
            max_response_size: 16,
            ..ProxyConfig::default()
        })
        .expect("client");

        let err = upstream.fetch(get(url)).await.expect_err("over the cap");
        assert!(matches!(err, ProxyError::TooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn test_fetch_rejects_streamed_oversize_body() {
        let url = spawn_raw_upstream(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n\
              10\r\n0123456789abcdef\r\n10\r\n0123456789abcdef\r\n0\r\n\r\n",
        )
        .await;
        let upstream = HttpUpstream::new(&ProxyConfig {
            max_response_size: 20,
            ..ProxyConfig::default()
        })
        .expect("client");

        let err = upstream.fetch(get(url)).await.expect_err("over the cap");
        assert!(matches!(err, ProxyError::TooLarge { limit: 20 }));
    }
}
