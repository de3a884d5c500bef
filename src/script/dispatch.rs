//! The handler-invocation bracket: bind, evaluate, unconditionally unbind.

use rhai::{EvalAltResult, Scope};

use super::engine::{HandlerEngine, HandlerScript};
use crate::request::NativeRequest;
use crate::slot::RequestSlot;

/// What one handler invocation produced.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// The request, back in the pipeline's hands after unbinding
    pub request: NativeRequest,
    /// The yield flag as the handler left it
    pub yielded: bool,
    /// The script error, if the handler raised one
    pub error: Option<Box<EvalAltResult>>,
}

impl DispatchOutcome {
    /// Whether the handler ran to completion without raising.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// What a handler chain produced.
#[derive(Debug)]
pub struct ChainOutcome {
    /// The request after the last handler that ran
    pub request: NativeRequest,
    /// Whether some handler completed without yielding
    pub handled: bool,
    /// How many handlers were invoked
    pub attempts: usize,
    /// The script error that stopped the chain, if any
    pub error: Option<Box<EvalAltResult>>,
}

/// Invokes handler scripts against requests, one at a time.
///
/// A dispatcher owns one [`RequestSlot`] and reuses it (and its proxy) for
/// every sequential request it dispatches, so per-request work is just the
/// bind, the synchronous evaluation, and the unbind. The unbind always
/// happens - success or script error - which is what turns a retained
/// `request` value inside a later script into a catchable expired-request
/// error instead of stale data.
///
/// # Examples
///
/// ```
/// use request_bridge::{Dispatcher, HandlerEngine, NativeRequest};
///
/// let mut dispatcher = Dispatcher::new(HandlerEngine::new());
/// let handler = dispatcher
///     .engine()
///     .compile("defer-posts", r#"
///         if request.getMethod() == "POST" {
///             request.setYield(true);
///         }
///     "#)
///     .expect("valid script");
///
/// let outcome = dispatcher.dispatch(
///     NativeRequest::builder("POST", "/submit").build(),
///     &handler,
/// );
/// assert!(outcome.is_success());
/// assert!(outcome.yielded);
/// ```
pub struct Dispatcher {
    engine: HandlerEngine,
    slot: RequestSlot,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("slot_bound", &self.slot.is_bound())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher around a configured engine.
    pub fn new(engine: HandlerEngine) -> Self {
        Self {
            engine,
            slot: RequestSlot::new(),
        }
    }

    /// Returns the engine, e.g. for compiling handlers.
    pub fn engine(&self) -> &HandlerEngine {
        &self.engine
    }

    /// Mutable engine access, for registering extra host functions.
    pub fn engine_mut(&mut self) -> &mut HandlerEngine {
        &mut self.engine
    }

    /// Runs one handler invocation against one request.
    ///
    /// The request is bound immediately before evaluation and unbound
    /// immediately after it returns, regardless of outcome; the outcome
    /// hands the request back along with the yield flag and any script
    /// error. Evaluation is fully synchronous on the calling thread.
    pub fn dispatch(&mut self, request: NativeRequest, handler: &HandlerScript) -> DispatchOutcome {
        self.slot.bind(request);

        let mut scope = Scope::new();
        scope.push("request", self.slot.proxy());

        tracing::debug!(handler = %handler.name(), "invoking handler script");
        let result = self.engine.eval(&mut scope, handler);

        // Nothing a script can reach is able to empty the slot.
        let request = self
            .slot
            .unbind()
            .expect("request slot emptied while the handler ran");

        let error = match result {
            Ok(_) => {
                tracing::debug!(
                    handler = %handler.name(),
                    yielded = request.yield_requested(),
                    "handler script completed"
                );
                None
            }
            Err(err) => {
                tracing::warn!(handler = %handler.name(), error = %err, "handler script raised");
                Some(err)
            }
        };

        DispatchOutcome {
            yielded: request.yield_requested(),
            request,
            error,
        }
    }

    /// Runs handlers in order until one completes without yielding.
    ///
    /// The yield flag is reset before each attempt, so a handler only falls
    /// through by explicitly calling `setYield(true)`. A script error stops
    /// the chain and is surfaced; handlers after it do not run.
    pub fn dispatch_chain(
        &mut self,
        request: NativeRequest,
        handlers: &[HandlerScript],
    ) -> ChainOutcome {
        let mut request = request;
        let mut attempts = 0;

        for handler in handlers {
            request.set_yield(false);
            attempts += 1;

            let outcome = self.dispatch(request, handler);
            request = outcome.request;

            if outcome.error.is_some() {
                return ChainOutcome {
                    request,
                    handled: false,
                    attempts,
                    error: outcome.error,
                };
            }
            if !outcome.yielded {
                return ChainOutcome {
                    request,
                    handled: true,
                    attempts,
                    error: None,
                };
            }
        }

        tracing::debug!(attempts, "every handler in the chain yielded");
        ChainOutcome {
            request,
            handled: false,
            attempts,
            error: None,
        }
    }
}
