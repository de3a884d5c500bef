//! Scripting runtime integration surface.
//!
//! This module is the boundary between the native request pipeline and Rhai
//! handler scripts. It handles:
//! - Registering the `HttpRequest` method table on an engine (once per
//!   engine; the engine is the long-lived, shared descriptor)
//! - Compiling handler scripts to reusable ASTs under sandbox limits
//! - Bracketing each handler invocation with bind/unbind on a request slot
//!
//! # Design Principles
//!
//! 1. **One descriptor, many bindings**: the engine with its registered
//!    method table is built once and carries no per-request data. Per-request
//!    state lives only in the slot a [`Dispatcher`] binds and unbinds.
//!
//! 2. **Scripts cannot mint requests**: no `HttpRequest` constructor is
//!    registered. The only way a script sees a request is the `request`
//!    variable a dispatcher pushes into its scope.
//!
//! 3. **Unbind is unconditional**: the dispatcher empties the slot when the
//!    handler invocation returns, whether the script succeeded or raised.
//!    This is the sole mechanism keeping retained proxies from reading a
//!    request the pipeline has taken back.
//!
//! # Example Flow
//!
//! ```
//! use request_bridge::{Dispatcher, HandlerEngine, NativeRequest};
//!
//! let mut dispatcher = Dispatcher::new(HandlerEngine::new());
//! let handler = dispatcher
//!     .engine()
//!     .compile("greeter", r#"request.getHeader("x-greeting")"#)
//!     .expect("valid script");
//!
//! let request = NativeRequest::builder("GET", "/greet")
//!     .header("X-Greeting", "hello")
//!     .build();
//!
//! let outcome = dispatcher.dispatch(request, &handler);
//! assert!(outcome.is_success());
//! assert!(!outcome.yielded);
//! ```

mod api;
mod dispatch;
mod engine;

pub use api::register_request_api;
pub use dispatch::{ChainOutcome, DispatchOutcome, Dispatcher};
pub use engine::{HandlerEngine, HandlerScript, SandboxLimits};
