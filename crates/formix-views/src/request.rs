//! HTTP request type and the authenticated user attached to it.

use std::collections::{HashMap, HashSet};

use http::{HeaderMap, Method};

use formix_core::{FormixError, FormixResult};

/// The authenticated user attached to a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The username.
    pub username: String,
    /// Permission codenames granted to the user.
    pub permissions: HashSet<String>,
}

impl AuthUser {
    /// Creates a user with no permissions.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            permissions: HashSet::new(),
        }
    }

    /// Grants a permission.
    #[must_use]
    pub fn with_permission(mut self, perm: impl Into<String>) -> Self {
        self.permissions.insert(perm.into());
        self
    }

    /// Checks whether the user holds the given permission.
    pub fn has_perm(&self, perm: &str) -> bool {
        self.permissions.contains(perm)
    }
}

/// An HTTP request as seen by a view.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Vec<u8>,
    user: Option<AuthUser>,
}

impl HttpRequest {
    /// Creates a request with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            user: None,
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::try_from(name),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the JSON request body, serializing the value.
    #[must_use]
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.body(value.to_string().into_bytes())
            .header("content-type", "application/json")
    }

    /// Attaches an authenticated user.
    #[must_use]
    pub fn user(mut self, user: AuthUser) -> Self {
        self.user = Some(user);
        self
    }

    /// The request method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The authenticated user, if any.
    pub const fn auth_user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    /// Returns a query parameter by name.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Returns `true` when the request carries the XMLHttpRequest
    /// marker header.
    pub fn is_ajax(&self) -> bool {
        self.headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    /// Parses the request body as JSON.
    ///
    /// # Errors
    ///
    /// [`FormixError::ParseError`] for invalid JSON.
    pub fn json_body(&self) -> FormixResult<serde_json::Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| FormixError::ParseError(format!("invalid JSON body: {e}")))
    }
}
