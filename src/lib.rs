//! Lifetime-guarded bridge exposing HTTP requests to embedded handler scripts.
//!
//! An HTTP pipeline parses a request, hands it to this crate for the
//! duration of exactly one synchronous handler invocation, and takes it
//! back the moment the handler returns. Inside that window, a Rhai script
//! sees the request as an `HttpRequest` object; outside it, every access
//! raises a catchable expired-request error instead of reading stale data.
//!
//! # Core Types
//!
//! - [`NativeRequest`]: the pipeline-owned, already-parsed request
//! - [`RequestSlot`]: the rebindable slot bracketing one handler invocation
//! - [`RequestProxy`]: the script-visible handle; every access is
//!   liveness-checked and copies data out
//! - [`HandlerEngine`]: the long-lived engine with the `HttpRequest`
//!   method table registered
//! - [`Dispatcher`]: bind → evaluate → unconditionally unbind
//!
//! # Examples
//!
//! ```
//! use request_bridge::{Dispatcher, HandlerEngine, NativeRequest};
//!
//! let mut dispatcher = Dispatcher::new(HandlerEngine::new());
//! let handler = dispatcher
//!     .engine()
//!     .compile("api-gate", r#"
//!         if request.getHeader("x-api-key") == "" {
//!             request.setYield(true); // let the next route answer
//!         }
//!     "#)
//!     .expect("valid handler");
//!
//! let request = NativeRequest::builder("GET", "/v1/items")
//!     .query("page=2")
//!     .header("X-Api-Key", "k-123")
//!     .build();
//!
//! let outcome = dispatcher.dispatch(request, &handler);
//! assert!(outcome.is_success());
//! assert!(!outcome.yielded);
//! ```
//!
//! String values cross the boundary in one of two modes, never mixed:
//! validated UTF-8 text for methods, URLs, query strings, and path
//! parameters, and byte-preserving raw text for header values, which must
//! round-trip arbitrary client bytes exactly. See [`marshal`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod marshal;
mod proxy;
mod request;
pub mod script;
mod slot;

pub use error::{Error, MarshalError, EXPIRED_REQUEST_KIND, MARSHAL_KIND};
pub use proxy::RequestProxy;
pub use request::{NativeRequest, RequestBuilder};
pub use script::{
    ChainOutcome, DispatchOutcome, Dispatcher, HandlerEngine, HandlerScript, SandboxLimits,
};
pub use slot::RequestSlot;

/// Re-export of the embedded scripting engine, so integrations can name
/// `rhai` types (scopes, dynamic values, error results) without pinning a
/// second copy of the crate.
pub use rhai;
