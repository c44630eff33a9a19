use crate::fields::{FieldContainer, FieldValue};
use crate::ids::DispatchId;
use http::Method;
use tracing::debug;

/// Per-call request descriptor.
///
/// Built once by the transport adapter and then only read by handlers. A
/// clone is fully independent, which is what fan-out branches rely on.
#[derive(Debug, Clone)]
pub struct Request {
    /// Merged query and body parameters
    pub fields: FieldContainer,
    pub body: String,
    pub cookies: FieldContainer,
    /// CGI style metadata (`HTTP_*` header keys, `CONTENT_TYPE`, ...)
    pub meta: FieldContainer,
    pub files: FieldContainer,
    pub path: String,
    pub method: Method,
    /// Authenticated user reference, if the transport knows one
    pub user: Option<String>,
    pub dispatch_id: DispatchId,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Empty GET request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: FieldContainer::new(),
            body: String::new(),
            cookies: FieldContainer::new(),
            meta: FieldContainer::new(),
            files: FieldContainer::new(),
            path: String::new(),
            method: Method::GET,
            user: None,
            dispatch_id: DispatchId::new(),
        }
    }

    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// GET request carrying `fields`.
    #[must_use]
    pub fn with_fields(fields: FieldContainer) -> Self {
        Self {
            fields,
            ..Self::new()
        }
    }

    /// True if the request is explicitly flagged as an XMLHttpRequest
    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.meta.get_str("HTTP_X_REQUESTED_WITH") == "XMLHttpRequest"
    }

    /// Build a request from an inbound `http` request.
    ///
    /// Fields are the form-urlencoded body merged with the query string, the
    /// query string winning on conflicts. Headers land in `meta` under CGI
    /// style keys and the `Cookie` header is split into `cookies`.
    pub fn from_http<B: AsRef<[u8]>>(request: &http::Request<B>) -> Self {
        let mut meta = FieldContainer::new();
        for (name, value) in request.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).to_string();
            meta.append(meta_key(name.as_str()), value);
        }

        // HTTP/2 splits cookies across several headers
        let cookies = parse_cookies(&meta.get_list("HTTP_COOKIE").join("; "));
        let body = String::from_utf8_lossy(request.body().as_ref()).to_string();

        let mut fields = FieldContainer::new();
        let is_form = meta
            .get_str("CONTENT_TYPE")
            .to_ascii_lowercase()
            .starts_with("application/x-www-form-urlencoded");
        if is_form {
            fields = parse_form(&body);
        }
        if let Some(query) = request.uri().query() {
            fields.extend_from(&parse_form(query));
        }

        debug!(
            method = %request.method(),
            path = %request.uri().path(),
            field_count = fields.len(),
            cookie_count = cookies.len(),
            "Request adapted from transport"
        );

        Self {
            fields,
            body,
            cookies,
            dispatch_id: DispatchId::from_header_or_new(
                Some(meta.get_str("HTTP_X_REQUEST_ID")).filter(|v| !v.is_empty()),
            ),
            meta,
            files: FieldContainer::new(),
            path: request.uri().path().to_string(),
            method: request.method().clone(),
            user: None,
        }
    }
}

/// Builder for requests assembled in code (tests, embedding hosts).
#[derive(Debug, Default)]
pub struct RequestBuilder {
    request: Option<Request>,
}

impl RequestBuilder {
    fn request(&mut self) -> &mut Request {
        self.request.get_or_insert_with(Request::new)
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.request().fields.insert(key, value);
        self
    }

    pub fn cookie(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request().cookies.insert(key, value.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request().meta.insert(key, value.into());
        self
    }

    pub fn file(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request().files.insert(key, value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.request().body = body.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request().path = path.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.request().method = method;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.request().user = Some(user.into());
        self
    }

    #[must_use]
    pub fn build(mut self) -> Request {
        self.request.take().unwrap_or_default()
    }
}

/// CGI style metadata key for a header name (`x-requested-with` ->
/// `HTTP_X_REQUESTED_WITH`, `content-type` -> `CONTENT_TYPE`).
fn meta_key(header: &str) -> String {
    let upper = header.to_ascii_uppercase().replace('-', "_");
    match upper.as_str() {
        "CONTENT_TYPE" | "CONTENT_LENGTH" => upper,
        _ => format!("HTTP_{upper}"),
    }
}

fn parse_form(encoded: &str) -> FieldContainer {
    let mut fields = FieldContainer::new();
    for (key, value) in url::form_urlencoded::parse(encoded.as_bytes()) {
        fields.append(key.into_owned(), value.into_owned());
    }
    fields
}

/// Split a `Cookie` header into name/value pairs.
pub fn parse_cookies(header: &str) -> FieldContainer {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_empty_get() {
        let request = Request::new();
        assert!(request.fields.is_empty());
        assert!(request.cookies.is_empty());
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "");
    }

    #[test]
    fn test_is_ajax() {
        assert!(!Request::new().is_ajax());
        let ajax = Request::builder()
            .meta("HTTP_X_REQUESTED_WITH", "XMLHttpRequest")
            .build();
        assert!(ajax.is_ajax());
    }

    #[test]
    fn test_clone_is_independent() {
        let first = Request::builder()
            .field("field", "data")
            .method(Method::POST)
            .build();
        let mut second = first.clone();
        assert_eq!(second.method, Method::POST);
        assert_eq!(second.fields.get_str("field"), "data");

        second.method = Method::GET;
        second.fields.insert("field", "newData");
        assert_eq!(second.fields.get_str("field"), "newData");
        assert_eq!(first.method, Method::POST);
        assert_eq!(first.fields.get_str("field"), "data");
    }

    #[test]
    fn test_meta_key() {
        assert_eq!(meta_key("x-requested-with"), "HTTP_X_REQUESTED_WITH");
        assert_eq!(meta_key("content-type"), "CONTENT_TYPE");
        assert_eq!(meta_key("Cookie"), "HTTP_COOKIE");
    }

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("sid=abc; theme = dark;;flag");
        assert_eq!(cookies.get_str("sid"), "abc");
        assert_eq!(cookies.get_str("theme"), "dark");
        assert_eq!(cookies.get_str("flag"), "");
        assert_eq!(cookies.len(), 3);
    }
}
