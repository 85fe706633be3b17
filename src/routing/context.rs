//! Per-request context handed to middleware and handlers.

use axum::body::{Body, Bytes};
use axum::http::{Extensions, HeaderMap, HeaderValue, Method, Request, Uri};
use axum::response::Response;
use url::Url;

use crate::error::EdgeError;
use crate::http::request::{request_id_of, ClientIdentity};
use crate::routing::matcher::PathParams;

/// Mutable scratch state for one request.
///
/// Never shared across requests. Middleware may set response headers in the
/// accumulator and attach typed data in the extensions; handlers fold the
/// accumulator into their response with [`Context::finish`].
#[derive(Debug)]
pub struct Context {
    request_id: String,
    method: Method,
    uri: Uri,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    params: PathParams,
    response_headers: HeaderMap,
    extensions: Extensions,
}

impl Context {
    /// Build a context from an incoming request, buffering at most `body_limit` bytes.
    pub async fn from_request(request: Request<Body>, body_limit: usize) -> Result<Self, EdgeError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, body_limit)
            .await
            .map_err(|_| EdgeError::PayloadTooLarge { limit: body_limit })?;
        let url = derive_url(&parts.uri, &parts.headers)?;
        let request_id = request_id_of(&parts.headers)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(Self {
            request_id,
            method: parts.method,
            uri: parts.uri,
            url,
            headers: parts.headers,
            body,
            params: PathParams::new(),
            response_headers: HeaderMap::new(),
            extensions: parts.extensions,
        })
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Absolute URL derived from the request line and `Host`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    /// Client identity attached by the dispatcher, if any.
    pub fn client(&self) -> Option<&ClientIdentity> {
        self.extensions.get::<ClientIdentity>()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Headers to be merged into the final response.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn set_response_header(&mut self, name: &'static str, value: HeaderValue) {
        self.response_headers.insert(name, value);
    }

    /// Merge accumulated headers into `response`; headers the handler set win.
    pub fn finish(&self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        for (name, value) in &self.response_headers {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        response
    }
}

fn derive_url(uri: &Uri, headers: &HeaderMap) -> Result<Url, EdgeError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|p| *p == "http" || *p == "https")
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");
    let host = uri
        .authority()
        .map(|a| a.as_str())
        .or_else(|| headers.get("host").and_then(|h| h.to_str().ok()))
        .unwrap_or("localhost");

    Url::parse(&format!("{scheme}://{host}{path_and_query}"))
        .map_err(|e| EdgeError::BadRequest(format!("cannot derive request URL: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_from_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/items?page=2")
            .header("host", "edge.example.com")
            .header("x-request-id", "req-1")
            .body(Body::from("payload"))
            .unwrap();

        let ctx = Context::from_request(request, 1024).await.unwrap();
        assert_eq!(ctx.request_id(), "req-1");
        assert_eq!(*ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/api/items");
        assert_eq!(ctx.url().as_str(), "http://edge.example.com/api/items?page=2");
        assert_eq!(ctx.body().as_ref(), b"payload");
        assert!(ctx.params().is_empty());
    }

    #[tokio::test]
    async fn test_forwarded_proto() {
        let request = Request::builder()
            .uri("/")
            .header("host", "edge.example.com")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();

        let ctx = Context::from_request(request, 1024).await.unwrap();
        assert_eq!(ctx.url().as_str(), "https://edge.example.com/");
        // No inbound id: one is generated
        assert!(!ctx.request_id().is_empty());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let request = Request::builder()
            .uri("/upload")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();

        let err = Context::from_request(request, 16).await.unwrap_err();
        assert!(matches!(err, EdgeError::PayloadTooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn test_finish_merges_accumulator() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let mut ctx = Context::from_request(request, 16).await.unwrap();
        ctx.set_response_header("x-edge-region", HeaderValue::from_static("eu"));
        ctx.set_response_header("content-type", HeaderValue::from_static("text/plain"));

        let mut response = Response::new(Body::empty());
        response
            .headers_mut()
            .insert("content-type", HeaderValue::from_static("application/json"));

        let response = ctx.finish(response);
        assert_eq!(response.headers()["x-edge-region"], "eu");
        assert_eq!(response.headers()["content-type"], "application/json");
    }
}
