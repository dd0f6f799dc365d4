//! Framework-independent HTTP value types.
//!
//! The router, middleware chain, and handlers all operate on these plain
//! values. The `server` crate owns the translation between a real HTTP
//! framework and this module, which keeps the whole pipeline testable
//! without any socket or framework machinery.

use crate::principal::Principal;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// HTTP methods understood by the router.
///
/// `Options` exists so the CORS middleware can short-circuit preflight
/// requests; application routes are registered under the other five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// Parses a method name (case-insensitive). Methods the pipeline does not
    /// route (HEAD, TRACE, ...) return `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An inbound request, already decoded from the transport.
///
/// Header names are stored lower-cased; lookups are case-insensitive.
/// The body, when present, is the parsed JSON document (form-encoded bodies
/// are converted to a JSON object by the server adapter before dispatch).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub client_ip: IpAddr,
    /// Session identifier extracted from the admin cookie, if any.
    pub session_id: Option<String>,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: None,
            client_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            session_id: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = ip;
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn insert_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The request body as a JSON object map. Missing or non-object bodies
    /// yield an empty map so validation reports `required` failures instead
    /// of a parse error.
    #[must_use]
    pub fn body_object(&self) -> Map<String, Value> {
        match &self.body {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Whether the client should receive a JSON error body rather than HTML.
    ///
    /// True for anything under the API prefix and for clients that ask for
    /// JSON explicitly via `Accept`.
    #[must_use]
    pub fn wants_json(&self, api_prefix: &str) -> bool {
        if !api_prefix.is_empty() && self.path.starts_with(api_prefix) {
            return true;
        }
        self.header("accept")
            .is_some_and(|accept| accept.contains("application/json"))
    }
}

/// Per-request state threaded through the middleware chain into the handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request: HttpRequest,
    /// Path parameters extracted by the router. Values are raw strings;
    /// numeric coercion is the handler's responsibility.
    pub params: HashMap<String, String>,
    /// Authenticated identity, populated by the auth middleware.
    pub principal: Option<Principal>,
}

impl RequestContext {
    #[must_use]
    pub fn new(request: HttpRequest) -> Self {
        Self { request, params: HashMap::new(), principal: None }
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The authenticated principal, or an unauthorized error when the route
    /// was reached without one (a middleware wiring mistake, not user error).
    ///
    /// # Errors
    /// Returns a 401 `HttpError` if no principal is attached.
    pub fn require_principal(&self) -> Result<&Principal, crate::error::HttpError> {
        self.principal
            .as_ref()
            .ok_or_else(|| crate::error::HttpError::unauthorized("authentication required"))
    }
}

/// Response payload variants the pipeline can produce.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Json(Value),
    Html(String),
    Empty,
}

/// An outbound response as plain data. The server adapter maps this onto the
/// framework response type and derives `Content-Type` from the body variant.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self { status, headers: Vec::new(), body: ResponseBody::Empty }
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, headers: Vec::new(), body: ResponseBody::Json(body) }
    }

    #[must_use]
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: Vec::new(), body: ResponseBody::Html(body.into()) }
    }

    /// 200 envelope: `{"success": true, "data": ...}`.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self::json(200, json!({ "success": true, "data": data }))
    }

    /// 200 envelope with a message instead of a payload.
    #[must_use]
    pub fn success_message(message: &str) -> Self {
        Self::json(200, json!({ "success": true, "message": message }))
    }

    /// 201 envelope for newly created resources.
    #[must_use]
    pub fn created(data: Value) -> Self {
        Self::json(201, json!({ "success": true, "data": data }))
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204)
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets a header, replacing any existing value under the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let lower = name.to_ascii_lowercase();
        self.headers.retain(|(n, _)| *n != lower);
        self.headers.push((lower, value.into()));
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}
