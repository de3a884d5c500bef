use std::cell::RefCell;
use std::rc::Rc;

use crate::proxy::RequestProxy;
use crate::request::NativeRequest;

/// The shared, rebindable slot a proxy checks on every access.
pub(crate) type SharedSlot = Rc<RefCell<Option<NativeRequest>>>;

/// A rebindable request slot bracketing one handler invocation.
///
/// The slot is the safety mechanism of the whole bridge. The pipeline calls
/// [`bind`](RequestSlot::bind) with a parsed request immediately before
/// invoking a handler script, and [`unbind`](RequestSlot::unbind)
/// immediately after the invocation returns - success or script error - to
/// take the request back. In between, every [`RequestProxy`] cloned from
/// this slot can reach the request; before and after, every proxy access
/// yields [`Error::ExpiredRequest`](crate::Error::ExpiredRequest).
///
/// A slot is reused across many sequential requests; at most one binding is
/// active at any instant. Rebinding a slot that was never unbound is a
/// pipeline-level logic error (the displaced request is dropped).
///
/// # Examples
///
/// ```
/// use request_bridge::{NativeRequest, RequestSlot};
///
/// let slot = RequestSlot::new();
/// let proxy = slot.proxy();
///
/// slot.bind(NativeRequest::builder("GET", "/").build());
/// assert_eq!(proxy.method().unwrap(), "GET");
///
/// let request = slot.unbind().expect("was bound");
/// assert!(proxy.method().is_err());
/// assert!(!request.yield_requested());
/// ```
#[derive(Debug, Default)]
pub struct RequestSlot {
    shared: SharedSlot,
}

impl RequestSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(None)),
        }
    }

    /// Returns a proxy handle sharing this slot.
    ///
    /// Proxies are cheap to clone and all observe the same binding state.
    /// This is the only way to produce one: scripts cannot construct
    /// instances.
    pub fn proxy(&self) -> RequestProxy {
        RequestProxy::new(Rc::clone(&self.shared))
    }

    /// Places a request into the slot, immediately before the handler call.
    pub fn bind(&self, request: NativeRequest) {
        tracing::trace!(request = ?request, "binding request into slot");
        let previous = self.shared.borrow_mut().replace(request);

        debug_assert!(previous.is_none(), "rebinding an already-bound slot");
        if previous.is_some() {
            tracing::warn!("slot rebound while still holding a request; previous request dropped");
        }
    }

    /// Empties the slot, immediately after the handler call returns.
    ///
    /// Returns the request so the pipeline can read the yield flag and
    /// finish the response. Returns `None` if the slot was already empty.
    pub fn unbind(&self) -> Option<NativeRequest> {
        let request = self.shared.borrow_mut().take();
        tracing::trace!(was_bound = request.is_some(), "unbound request slot");
        request
    }

    /// Whether a request is currently bound.
    pub fn is_bound(&self) -> bool {
        self.shared.borrow().is_some()
    }
}
