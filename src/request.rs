use std::fmt;

/// An already-parsed HTTP request, owned by the connection pipeline.
///
/// This is the native side of the bridge: the pipeline parses a request,
/// builds one of these, binds it into a [`RequestSlot`](crate::RequestSlot)
/// for the duration of exactly one handler invocation, and takes it back
/// when the handler returns. Scripts never see this type directly - they go
/// through [`RequestProxy`](crate::RequestProxy), which copies data out.
///
/// All fields are byte spans as received on the wire. Headers keep their
/// wire-receipt order, duplicate names included. The yield flag starts
/// `false` and is the one piece of mutable state a handler may set.
///
/// # Examples
///
/// ```
/// use request_bridge::NativeRequest;
///
/// let request = NativeRequest::builder("GET", "/users/42")
///     .query("full=true")
///     .header("Host", "example.org")
///     .parameter("42")
///     .build();
///
/// assert_eq!(request.method(), b"GET");
/// assert_eq!(request.header(b"host"), Some(&b"example.org"[..]));
/// assert!(!request.yield_requested());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct NativeRequest {
    method: Vec<u8>,
    url: Vec<u8>,
    query: Vec<u8>,
    headers: Vec<(Vec<u8>, Vec<u8>)>,
    parameters: Vec<Vec<u8>>,
    yield_flag: bool,
}

impl NativeRequest {
    /// Starts building a request with the given method and URL path.
    pub fn builder(method: impl Into<Vec<u8>>, url: impl Into<Vec<u8>>) -> RequestBuilder {
        RequestBuilder {
            method: method.into(),
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Returns the request method bytes.
    pub fn method(&self) -> &[u8] {
        &self.method
    }

    /// Returns the URL path bytes.
    pub fn url(&self) -> &[u8] {
        &self.url
    }

    /// Returns the whole raw query string, without the leading `?`.
    pub fn query(&self) -> &[u8] {
        &self.query
    }

    /// Looks up a header value by name, case-insensitively.
    ///
    /// Returns the first matching value in wire-receipt order, or `None`
    /// if no header has that name.
    pub fn header(&self, name: &[u8]) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Iterates header `(name, value)` pairs in wire-receipt order.
    ///
    /// Duplicate names are yielded as often as they were received.
    pub fn headers(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.headers.iter().map(|(n, v)| (n.as_slice(), v.as_slice()))
    }

    /// Looks up the first value for a query key.
    ///
    /// Keys are matched exactly (query keys, unlike header names, are
    /// case-sensitive) and values are returned undecoded. A key present
    /// without `=` yields an empty value.
    pub fn query_value(&self, key: &[u8]) -> Option<&[u8]> {
        self.query.split(|&b| b == b'&').find_map(|pair| {
            let (name, value) = match pair.iter().position(|&b| b == b'=') {
                Some(idx) => (&pair[..idx], &pair[idx + 1..]),
                None => (pair, &pair[pair.len()..]),
            };
            (name == key).then_some(value)
        })
    }

    /// Returns the path parameter at `index`, as bound by the router.
    ///
    /// `None` for an out-of-range index; which indices exist is decided by
    /// the route that matched, not by this type.
    pub fn parameter(&self, index: usize) -> Option<&[u8]> {
        self.parameters.get(index).map(|p| p.as_slice())
    }

    /// Sets the yield flag.
    ///
    /// Handlers set this through the proxy; the pipeline reads it after the
    /// handler returns to decide whether to fall through to the next route.
    pub fn set_yield(&mut self, flag: bool) {
        self.yield_flag = flag;
    }

    /// Returns the current yield flag. Defaults to `false`.
    pub fn yield_requested(&self) -> bool {
        self.yield_flag
    }
}

impl fmt::Debug for NativeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRequest")
            .field("method", &String::from_utf8_lossy(&self.method))
            .field("url", &String::from_utf8_lossy(&self.url))
            .field("query", &String::from_utf8_lossy(&self.query))
            .field("headers", &self.headers.len())
            .field("parameters", &self.parameters.len())
            .field("yield", &self.yield_flag)
            .finish()
    }
}

/// Builder for [`NativeRequest`], used by the pipeline after parsing.
///
/// Headers and parameters are appended in call order, which becomes the
/// wire-receipt order observed by iteration.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Vec<u8>,
    url: Vec<u8>,
    query: Vec<u8>,
    headers: Vec<(Vec<u8>, Vec<u8>)>,
    parameters: Vec<Vec<u8>>,
}

impl RequestBuilder {
    /// Sets the raw query string (without the leading `?`).
    pub fn query(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.query = raw.into();
        self
    }

    /// Appends a header pair.
    pub fn header(mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends a path parameter extracted by the router.
    pub fn parameter(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.parameters.push(value.into());
        self
    }

    /// Finishes the request. The yield flag starts out `false`.
    pub fn build(self) -> NativeRequest {
        NativeRequest {
            method: self.method,
            url: self.url,
            query: self.query,
            headers: self.headers,
            parameters: self.parameters,
            yield_flag: false,
        }
    }
}
