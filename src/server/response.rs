use http::StatusCode;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 8;

/// Header storage; names keep their original case, lookups ignore it.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Content types used by the dispatch core
pub mod content_type {
    pub const HTML: &str = "text/html;charset=UTF-8";
    pub const JSON: &str = "application/json";
    pub const TEXT: &str = "text/plain;charset=UTF-8";
}

/// A cookie to set on the outbound response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub key: String,
    pub value: String,
    /// Lifetime in seconds
    pub max_age: Option<i64>,
    /// Pre-formatted HTTP date
    pub expires: Option<String>,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            max_age: None,
            expires: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn expires(mut self, date: impl Into<String>) -> Self {
        self.expires = Some(date.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Value of a `Set-Cookie` header for this cookie
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.key, self.value);
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(expires) = &self.expires {
            out.push_str(&format!("; Expires={expires}"));
        }
        if !self.path.is_empty() {
            out.push_str(&format!("; Path={}", self.path));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={domain}"));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

/// Response-scoped accumulator for client-side script snippets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptContainer {
    scripts: Vec<String>,
}

impl ScriptContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_script(&mut self, script: impl Into<String>) {
        let script = script.into();
        if !script.is_empty() {
            self.scripts.push(script);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    #[must_use]
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// One `<script>` block holding every snippet, or nothing when empty.
    #[must_use]
    pub fn to_html(&self) -> String {
        if self.scripts.is_empty() {
            return String::new();
        }
        format!(
            "<script type=\"text/javascript\">\n{}\n</script>",
            self.scripts.join("\n")
        )
    }
}

/// Transport-neutral form of a response, as embedded in fan-out bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedResponse {
    pub response_text: String,
    pub content_type: String,
    pub status: u16,
}

/// Mutable response accumulator owned by one dispatch call.
#[derive(Debug, Clone)]
pub struct Response {
    pub content: String,
    pub content_type: String,
    pub status: StatusCode,
    headers: HeaderVec,
    cookies: BTreeMap<String, Cookie>,
    /// Script accumulator; created lazily by whoever renders first
    pub scripts: Option<ScriptContainer>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty dynamic HTML response with status 200.
    #[must_use]
    pub fn new() -> Self {
        Self::with_content(String::new())
    }

    /// Dynamic HTML response; caching is disabled.
    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        let mut response = Self::static_content(content);
        response.set_header("Cache-Control", "no-cache, must-revalidate");
        response.set_header("Pragma", "no-cache");
        // Some time in the past
        response.set_header("Expires", "Thu, 01 DEC 1994 01:00:00 GMT");
        response
    }

    /// Response without the no-cache headers.
    #[must_use]
    pub fn static_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type::HTML.to_string(),
            status: StatusCode::OK,
            headers: HeaderVec::new(),
            cookies: BTreeMap::new(),
            scripts: None,
        }
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
    }

    /// Remove a header; absent headers are ignored
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Store a cookie, replacing any with the same key.
    pub fn set_cookie(&mut self, cookie: Cookie) -> &Cookie {
        let key = cookie.key.clone();
        self.cookies.insert(key.clone(), cookie);
        &self.cookies[&key]
    }

    #[must_use]
    pub fn cookies(&self) -> &BTreeMap<String, Cookie> {
        &self.cookies
    }

    /// Script container for this response, created on first use.
    pub fn scripts_mut(&mut self) -> &mut ScriptContainer {
        self.scripts.get_or_insert_with(ScriptContainer::new)
    }

    #[must_use]
    pub fn serialize(&self) -> SerializedResponse {
        SerializedResponse {
            response_text: self.content.clone(),
            content_type: self.content_type.clone(),
            status: self.status.as_u16(),
        }
    }

    /// Convert into an `http` response for the hosting transport.
    pub fn into_http(self) -> anyhow::Result<http::Response<String>> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .header(http::header::CONTENT_TYPE, self.content_type.as_str());
        for (name, value) in &self.headers {
            builder = builder.header(name.as_ref(), value.as_str());
        }
        for cookie in self.cookies.values() {
            builder = builder.header(http::header::SET_COOKIE, cookie.to_header_value());
        }
        Ok(builder.body(self.content)?)
    }
}
