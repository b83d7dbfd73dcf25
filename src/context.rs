//! Request Context (§3, §4.F): owns the captured path params and lazily materialises
//! query map, headers, and parsed body. Grounded in the teacher's `ParsedRequest`
//! (`server/request.rs`: `parse_query_params`, `parse_cookies`, memoised body) but
//! generalised onto a single mutable context object instead of a server-owned struct.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::router::ParamVec;

/// Raw inbound request as handed to the core by the transport (§6 Transport boundary).
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

fn parse_query_params(url: &str) -> ParamVec {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

fn parse_cookies(headers: &[(String, String)]) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("cookie") {
            for pair in value.split(';') {
                if let Some((k, v)) = pair.trim().split_once('=') {
                    cookies.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }
    }
    cookies
}

/// Per-request state. Lifetime = single request; released when the response is
/// produced (§5 Shared-resource policy). Body-parse is memoised (testable property #7).
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    pub raw: RawRequest,
    path_params: ParamVec,
    query_params: RefCell<Option<ParamVec>>,
    cookies: RefCell<Option<HashMap<String, String>>>,
    parsed_body: RefCell<Option<Result<Option<Value>, String>>>,
    status_override: Cell<Option<u16>>,
    response_headers: RefCell<Vec<(String, String)>>,
    /// Per-request DI scope map, created at request start and discarded at request end
    /// (§3 Provider Record, §5 Ordering guarantees (c)).
    pub di_scope: RefCell<HashMap<String, Arc<dyn std::any::Any + Send + Sync>>>,
    /// Values the Handler Compiler has already extracted and run through a validator
    /// adapter, keyed by parameter position (§4.B Binding rule: "the validated value is
    /// bound instead").
    validated_params: RefCell<HashMap<usize, Value>>,
}

impl RequestContext {
    pub fn new(raw: RawRequest, path: String, path_params: ParamVec) -> Self {
        Self {
            request_id: RequestId::new(),
            method: raw.method.clone(),
            path,
            raw,
            path_params,
            query_params: RefCell::new(None),
            cookies: RefCell::new(None),
            parsed_body: RefCell::new(None),
            status_override: Cell::new(None),
            response_headers: RefCell::new(Vec::new()),
            di_scope: RefCell::new(HashMap::new()),
            validated_params: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        if self.query_params.borrow().is_none() {
            *self.query_params.borrow_mut() = Some(parse_query_params(&self.raw.url));
        }
        self.query_params
            .borrow()
            .as_ref()
            .unwrap()
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.clone())
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        if self.cookies.borrow().is_none() {
            *self.cookies.borrow_mut() = Some(parse_cookies(&self.raw.headers));
        }
        self.cookies.borrow().as_ref().unwrap().get(name).cloned()
    }

    /// Parse the body as JSON exactly once; subsequent calls return the cached value
    /// (testable property #7: `parseBody()` called twice invokes the parser once).
    pub fn parse_body(&self) -> Result<Option<Value>, DispatchError> {
        if self.parsed_body.borrow().is_none() {
            let result = if self.raw.body.is_empty() {
                Ok(None)
            } else {
                serde_json::from_slice::<Value>(&self.raw.body)
                    .map(Some)
                    .map_err(|e| e.to_string())
            };
            *self.parsed_body.borrow_mut() = Some(result);
        }
        self.parsed_body
            .borrow()
            .as_ref()
            .unwrap()
            .clone()
            .map_err(|e| crate::error::HttpException::bad_request(e).into())
    }

    pub fn set_status(&self, status: u16) {
        self.status_override.set(Some(status));
    }

    pub fn status_override(&self) -> Option<u16> {
        self.status_override.get()
    }

    pub fn set_response_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.response_headers.borrow_mut().push((name.into(), value.into()));
    }

    pub fn response_headers(&self) -> Vec<(String, String)> {
        self.response_headers.borrow().clone()
    }

    pub fn set_validated_param(&self, position: usize, value: Value) {
        self.validated_params.borrow_mut().insert(position, value);
    }

    #[must_use]
    pub fn validated_param(&self, position: usize) -> Option<Value> {
        self.validated_params.borrow().get(&position).cloned()
    }
}
