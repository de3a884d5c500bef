use crate::error::{Error, MarshalError};
use crate::marshal;
use crate::request::NativeRequest;
use crate::slot::SharedSlot;

/// The scripting-visible request object.
///
/// A `RequestProxy` holds no request data of its own - only a shared,
/// liveness-checked reference to the slot its [`RequestSlot`] owns. Every
/// accessor performs exactly one liveness check and then copies the value
/// out through the marshaling layer, so no script-visible string ever
/// aliases native request storage.
///
/// # Safety Properties
///
/// - The slot is either currently bound or empty; there is no dangling
///   state a proxy could observe.
/// - An accessor called while the slot is empty returns
///   [`Error::ExpiredRequest`] and touches nothing else. A script that
///   retains its request past the handler return gets a catchable error,
///   never stale data and never a crash.
/// - Proxies cannot be constructed by scripts; only
///   [`RequestSlot::proxy`](crate::RequestSlot::proxy) produces them.
///
/// # Examples
///
/// ```
/// use request_bridge::{NativeRequest, RequestSlot};
///
/// let slot = RequestSlot::new();
/// let proxy = slot.proxy();
///
/// slot.bind(
///     NativeRequest::builder("GET", "/users/7")
///         .header("Accept", "text/html")
///         .build(),
/// );
///
/// assert_eq!(proxy.url().unwrap(), "/users/7");
/// assert_eq!(proxy.header("accept").unwrap(), "text/html");
///
/// slot.unbind();
/// assert!(proxy.url().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RequestProxy {
    slot: SharedSlot,
}

impl RequestProxy {
    /// Creates a proxy over a slot. Only `RequestSlot` can call this.
    pub(crate) fn new(slot: SharedSlot) -> Self {
        Self { slot }
    }

    /// The liveness check every accessor goes through, exactly once.
    fn with_request<R>(&self, f: impl FnOnce(&NativeRequest) -> R) -> Result<R, Error> {
        match &*self.slot.borrow() {
            Some(request) => Ok(f(request)),
            None => Err(Error::ExpiredRequest),
        }
    }

    /// Mutating counterpart of [`with_request`](Self::with_request).
    fn with_request_mut<R>(&self, f: impl FnOnce(&mut NativeRequest) -> R) -> Result<R, Error> {
        match &mut *self.slot.borrow_mut() {
            Some(request) => Ok(f(request)),
            None => Err(Error::ExpiredRequest),
        }
    }

    /// Returns the request method as validated text.
    pub fn method(&self) -> Result<String, Error> {
        self.with_request(|request| marshal::to_text(request.method()))?
    }

    /// Returns the URL path as validated text.
    pub fn url(&self) -> Result<String, Error> {
        self.with_request(|request| marshal::to_text(request.url()))?
    }

    /// Returns a header value as byte-preserving raw text.
    ///
    /// Matching is case-insensitive; an absent header yields empty text
    /// rather than an error. That empty-on-absent contract is observable
    /// API and is preserved deliberately.
    pub fn header(&self, name: &str) -> Result<String, Error> {
        self.with_request(|request| {
            request
                .header(name.as_bytes())
                .map(marshal::to_raw_text)
                .unwrap_or_default()
        })
    }

    /// Returns the path parameter at `index` as validated text.
    ///
    /// Which indices exist is route-dependent and enforced by the routing
    /// collaborator; an index it never bound yields empty text.
    pub fn parameter(&self, index: usize) -> Result<String, Error> {
        self.with_request(|request| match request.parameter(index) {
            Some(value) => marshal::to_text(value),
            None => Ok(String::new()),
        })?
    }

    /// Returns the whole raw query string as validated text.
    pub fn query_string(&self) -> Result<String, Error> {
        self.with_request(|request| marshal::to_text(request.query()))?
    }

    /// Returns the first query value for `key` as validated text.
    ///
    /// An absent key yields empty text.
    pub fn query_value(&self, key: &str) -> Result<String, Error> {
        self.with_request(|request| match request.query_value(key.as_bytes()) {
            Some(value) => marshal::to_text(value),
            None => Ok(String::new()),
        })?
    }

    /// Sets the yield flag on the bound request.
    ///
    /// The pipeline reads the flag after the handler returns to decide
    /// whether to fall through to the next matching route.
    pub fn set_yield(&self, flag: bool) -> Result<(), Error> {
        self.with_request_mut(|request| request.set_yield(flag))
    }

    /// Snapshots all header entries for iteration.
    ///
    /// One liveness check covers the whole snapshot. Names are validated
    /// text, values are byte-preserving raw text, and entries keep their
    /// wire-receipt order with duplicates intact. The snapshot is taken
    /// before any callback runs, so an iteration callback is free to
    /// re-enter the proxy (for example to call `setYield`).
    pub fn header_entries(&self) -> Result<Vec<(String, String)>, Error> {
        self.with_request(|request| {
            request
                .headers()
                .map(|(name, value)| Ok((marshal::to_text(name)?, marshal::to_raw_text(value))))
                .collect::<Result<Vec<_>, Error>>()
        })?
    }

    /// Converts a script-supplied parameter index, rejecting shapes that
    /// cannot be an index at all.
    pub(crate) fn script_index(index: i64) -> Result<usize, Error> {
        usize::try_from(index).map_err(|_| {
            Error::Marshal(MarshalError::new(format!(
                "parameter index {} is negative",
                index
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::NativeRequest;
    use crate::slot::RequestSlot;

    fn bound_slot() -> (RequestSlot, RequestProxy) {
        let slot = RequestSlot::new();
        let proxy = slot.proxy();
        slot.bind(
            NativeRequest::builder("GET", "/items")
                .query("a=1&b=2")
                .header("a", "1")
                .header("b", "2")
                .header("a", "3")
                .parameter("42")
                .build(),
        );
        (slot, proxy)
    }

    #[test]
    fn accessors_return_native_values() {
        let (_slot, proxy) = bound_slot();

        assert_eq!(proxy.method().unwrap(), "GET");
        assert_eq!(proxy.url().unwrap(), "/items");
        assert_eq!(proxy.query_string().unwrap(), "a=1&b=2");
        assert_eq!(proxy.query_value("a").unwrap(), "1");
        assert_eq!(proxy.query_value("c").unwrap(), "");
        assert_eq!(proxy.parameter(0).unwrap(), "42");
        assert_eq!(proxy.header("A").unwrap(), "1");
    }

    #[test]
    fn every_accessor_expires_after_unbind() {
        let (slot, proxy) = bound_slot();
        slot.unbind();

        assert_eq!(proxy.method(), Err(Error::ExpiredRequest));
        assert_eq!(proxy.url(), Err(Error::ExpiredRequest));
        assert_eq!(proxy.header("a"), Err(Error::ExpiredRequest));
        assert_eq!(proxy.parameter(0), Err(Error::ExpiredRequest));
        assert_eq!(proxy.query_string(), Err(Error::ExpiredRequest));
        assert_eq!(proxy.query_value("a"), Err(Error::ExpiredRequest));
        assert_eq!(proxy.set_yield(true), Err(Error::ExpiredRequest));
        assert_eq!(proxy.header_entries(), Err(Error::ExpiredRequest));
    }

    #[test]
    fn missing_header_is_empty_text_not_an_error() {
        let (_slot, proxy) = bound_slot();
        assert_eq!(proxy.header("X-Missing").unwrap(), "");
    }

    #[test]
    fn header_value_bytes_survive_raw_marshaling() {
        let slot = RequestSlot::new();
        let proxy = slot.proxy();
        slot.bind(
            NativeRequest::builder("GET", "/")
                .header("X-Binary", vec![0x00, 0x80, 0xff])
                .build(),
        );

        let raw = proxy.header("x-binary").unwrap();
        assert_eq!(
            crate::marshal::raw_text_bytes(&raw).unwrap(),
            vec![0x00, 0x80, 0xff]
        );
    }

    #[test]
    fn invalid_utf8_in_text_field_is_a_marshal_error() {
        let slot = RequestSlot::new();
        let proxy = slot.proxy();
        slot.bind(NativeRequest::builder(vec![0xff, 0xfe], "/").build());

        let err = proxy.method().unwrap_err();
        assert_eq!(err.kind(), "marshal");
    }

    #[test]
    fn out_of_range_parameter_is_empty_text() {
        let (_slot, proxy) = bound_slot();
        assert_eq!(proxy.parameter(5).unwrap(), "");
    }

    #[test]
    fn header_entries_snapshot_keeps_order_and_duplicates() {
        let (_slot, proxy) = bound_slot();

        let entries = proxy.header_entries().unwrap();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn snapshot_allows_reentrant_proxy_use() {
        let (slot, proxy) = bound_slot();

        // A callback consuming the snapshot may call back into the proxy.
        for (name, _value) in proxy.header_entries().unwrap() {
            if name == "b" {
                proxy.set_yield(true).unwrap();
            }
        }

        assert!(slot.unbind().unwrap().yield_requested());
    }

    #[test]
    fn script_index_rejects_negative_values() {
        let err = RequestProxy::script_index(-1).unwrap_err();
        assert_eq!(err.kind(), "marshal");
        assert_eq!(RequestProxy::script_index(3).unwrap(), 3);
    }
}
