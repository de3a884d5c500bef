//! Engine construction, sandbox limits, and handler compilation.

use rhai::{Dynamic, Engine, EvalAltResult, ParseError, Scope, AST};

use super::api;

/// Resource ceilings applied to every handler evaluation.
///
/// Handler scripts run inside the connection pipeline, so a runaway script
/// must be cut off rather than stall the connection's thread. A value of
/// `0` disables the corresponding limit.
///
/// # Examples
///
/// ```
/// use request_bridge::{HandlerEngine, SandboxLimits};
///
/// let limits = SandboxLimits {
///     max_operations: 10_000,
///     ..SandboxLimits::default()
/// };
/// let engine = HandlerEngine::with_limits(limits);
/// assert!(engine.compile("spin", "loop {}").is_ok()); // compiles; evaluation is cut off
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    /// Maximum abstract operations per evaluation
    pub max_operations: u64,
    /// Maximum nested function-call levels
    pub max_call_levels: usize,
    /// Maximum expression nesting depth
    pub max_expr_depth: usize,
    /// Maximum script string size in bytes
    pub max_string_size: usize,
}

impl SandboxLimits {
    /// Limits suitable for request handlers: generous for real handler
    /// logic, tight enough to stop accidental infinite loops quickly.
    pub fn default_limits() -> Self {
        Self {
            max_operations: 100_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 1024 * 1024,
        }
    }

    /// No ceilings at all. For trusted handler sources only.
    pub fn unrestricted() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 0,
            max_expr_depth: 0,
            max_string_size: 0,
        }
    }
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self::default_limits()
    }
}

/// A handler script compiled once and evaluated per request.
///
/// Compiling per request would re-parse the source on every connection;
/// the pipeline compiles each handler at route-registration time instead
/// and reuses the AST for every dispatch.
#[derive(Debug, Clone)]
pub struct HandlerScript {
    name: String,
    ast: AST,
}

impl HandlerScript {
    /// Returns the handler's registration name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

/// The long-lived scripting engine with the request API registered.
///
/// One `HandlerEngine` is the shared descriptor for every proxy it will
/// ever evaluate against: the method table is registered once at
/// construction and carries no per-request data. Engines hold no mutable
/// state across evaluations, so a pipeline typically builds one per worker
/// thread and reuses it for that thread's whole lifetime.
pub struct HandlerEngine {
    engine: Engine,
}

impl std::fmt::Debug for HandlerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEngine").finish_non_exhaustive()
    }
}

impl HandlerEngine {
    /// Builds an engine with [`SandboxLimits::default_limits`].
    pub fn new() -> Self {
        Self::with_limits(SandboxLimits::default_limits())
    }

    /// Builds an engine with explicit sandbox limits.
    pub fn with_limits(limits: SandboxLimits) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(limits.max_operations);
        // For call levels zero would forbid calls outright, not lift the cap.
        if limits.max_call_levels > 0 {
            engine.set_max_call_levels(limits.max_call_levels);
        }
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth);
        engine.set_max_string_size(limits.max_string_size);

        api::register_request_api(&mut engine);

        Self { engine }
    }

    /// Compiles a named handler script to a reusable AST.
    ///
    /// # Errors
    ///
    /// Returns the parse error verbatim; compilation failures are a
    /// deployment-time concern, not part of the per-request error taxonomy.
    pub fn compile(&self, name: impl Into<String>, source: &str) -> Result<HandlerScript, ParseError> {
        let name = name.into();
        let ast = self.engine.compile(source).map_err(|e| {
            tracing::warn!(handler = %name, error = %e, "handler script failed to compile");
            e
        })?;

        tracing::debug!(handler = %name, "compiled handler script");
        Ok(HandlerScript { name, ast })
    }

    /// Evaluates a compiled handler against the given scope.
    ///
    /// The dispatcher uses this with a scope holding the bound `request`
    /// proxy; it is public so integrations with their own binding scheme
    /// (or tests) can drive evaluation directly.
    pub fn eval(
        &self,
        scope: &mut Scope<'_>,
        handler: &HandlerScript,
    ) -> Result<Dynamic, Box<EvalAltResult>> {
        self.engine.eval_ast_with_scope::<Dynamic>(scope, handler.ast())
    }

    /// Read access to the underlying engine.
    pub fn raw_engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access to the underlying engine, for registering extra host
    /// functions next to the request API.
    pub fn raw_engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
}

impl Default for HandlerEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_accepts_valid_scripts() {
        let engine = HandlerEngine::new();
        let handler = engine.compile("ok", "1 + 1").expect("valid");
        assert_eq!(handler.name(), "ok");
    }

    #[test]
    fn compile_reports_parse_errors() {
        let engine = HandlerEngine::new();
        assert!(engine.compile("broken", "if {").is_err());
    }

    #[test]
    fn compiled_ast_is_reusable() {
        let engine = HandlerEngine::new();
        let handler = engine.compile("sum", "40 + 2").expect("valid");

        for _ in 0..3 {
            let mut scope = Scope::new();
            let result = engine.eval(&mut scope, &handler).expect("evaluates");
            assert_eq!(result.cast::<i64>(), 42);
        }
    }

    #[test]
    fn operation_limit_stops_runaway_scripts() {
        let engine = HandlerEngine::with_limits(SandboxLimits {
            max_operations: 1_000,
            ..SandboxLimits::default_limits()
        });
        let handler = engine.compile("spin", "loop {}").expect("compiles");

        let mut scope = Scope::new();
        assert!(engine.eval(&mut scope, &handler).is_err());
    }

    #[test]
    fn unrestricted_limits_disable_the_ceilings() {
        let limits = SandboxLimits::unrestricted();
        assert_eq!(limits.max_operations, 0);

        // Still evaluates ordinary scripts fine.
        let engine = HandlerEngine::with_limits(limits);
        let handler = engine.compile("ok", "\"done\"").expect("valid");
        let mut scope = Scope::new();
        assert_eq!(
            engine.eval(&mut scope, &handler).unwrap().cast::<String>(),
            "done"
        );
    }
}
