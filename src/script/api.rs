//! Method-table registration for the script-visible `HttpRequest` type.

use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, NativeCallContext};

use crate::proxy::RequestProxy;

/// Registers the `HttpRequest` type and its method table on an engine.
///
/// This is the one-time descriptor setup: every proxy instance shares the
/// table registered here, and the table carries no per-request data.
/// Intentionally absent is any constructor - scripts receive a bound
/// `request` variable from the dispatcher or nothing at all.
///
/// The registered surface, all methods:
///
/// | script call | behavior |
/// |---|---|
/// | `getMethod()` | validated text |
/// | `getUrl()` | validated text |
/// | `getHeader(name)` | byte-preserving raw text; `""` when absent |
/// | `getParameter(index)` | validated text; negative index is a marshal error |
/// | `getQuery()` | the whole raw query string |
/// | `getQuery(key)` | first value for the key; `""` when absent |
/// | `setYield(flag)` | sets the yield flag, returns the receiver |
/// | `forEach(callback)` | calls back per header entry in wire order |
///
/// Every method checks liveness first; on an unbound slot it raises the
/// catchable expired-request error and does nothing else.
pub fn register_request_api(engine: &mut Engine) {
    engine.register_type_with_name::<RequestProxy>("HttpRequest");

    engine.register_fn(
        "getMethod",
        |proxy: &mut RequestProxy| -> Result<String, Box<EvalAltResult>> {
            proxy.method().map_err(Into::into)
        },
    );

    engine.register_fn(
        "getUrl",
        |proxy: &mut RequestProxy| -> Result<String, Box<EvalAltResult>> {
            proxy.url().map_err(Into::into)
        },
    );

    engine.register_fn(
        "getHeader",
        |proxy: &mut RequestProxy, name: &str| -> Result<String, Box<EvalAltResult>> {
            proxy.header(name).map_err(Into::into)
        },
    );

    engine.register_fn(
        "getParameter",
        |proxy: &mut RequestProxy, index: i64| -> Result<String, Box<EvalAltResult>> {
            let index = RequestProxy::script_index(index)?;
            proxy.parameter(index).map_err(Into::into)
        },
    );

    // Two statically registered arities, one script-visible name.
    engine.register_fn(
        "getQuery",
        |proxy: &mut RequestProxy| -> Result<String, Box<EvalAltResult>> {
            proxy.query_string().map_err(Into::into)
        },
    );
    engine.register_fn(
        "getQuery",
        |proxy: &mut RequestProxy, key: &str| -> Result<String, Box<EvalAltResult>> {
            proxy.query_value(key).map_err(Into::into)
        },
    );

    engine.register_fn(
        "setYield",
        |proxy: &mut RequestProxy, flag: bool| -> Result<RequestProxy, Box<EvalAltResult>> {
            proxy.set_yield(flag)?;
            Ok(proxy.clone())
        },
    );

    engine.register_fn(
        "forEach",
        |context: NativeCallContext,
         proxy: &mut RequestProxy,
         callback: FnPtr|
         -> Result<(), Box<EvalAltResult>> {
            // One liveness check covers the snapshot; callbacks then run
            // with no borrow held and may re-enter the proxy.
            let entries = proxy.header_entries()?;
            for (name, value) in entries {
                // Callback errors propagate to the caller unmodified.
                let _: Dynamic = callback.call_within_context(&context, (name, value))?;
            }
            Ok(())
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::NativeRequest;
    use crate::slot::RequestSlot;
    use rhai::Scope;

    fn engine() -> Engine {
        let mut engine = Engine::new();
        register_request_api(&mut engine);
        engine
    }

    fn eval_with_request(script: &str, request: NativeRequest) -> Dynamic {
        let engine = engine();
        let slot = RequestSlot::new();
        slot.bind(request);

        let mut scope = Scope::new();
        scope.push("request", slot.proxy());

        let result = engine
            .eval_with_scope::<Dynamic>(&mut scope, script)
            .expect("script should succeed");
        slot.unbind();
        result
    }

    #[test]
    fn method_table_is_reachable_from_script() {
        let request = NativeRequest::builder("PATCH", "/things/9")
            .query("v=2")
            .parameter("9")
            .build();

        let result = eval_with_request(
            r#"
                request.getMethod() + " " + request.getUrl()
                    + "?" + request.getQuery()
                    + " id=" + request.getParameter(0)
            "#,
            request,
        );

        assert_eq!(result.cast::<String>(), "PATCH /things/9?v=2 id=9");
    }

    #[test]
    fn get_query_dispatches_on_arity() {
        let request = NativeRequest::builder("GET", "/").query("a=1&b=2").build();

        let result = eval_with_request(
            r#"request.getQuery() + "|" + request.getQuery("b") + "|" + request.getQuery("c")"#,
            request,
        );

        assert_eq!(result.cast::<String>(), "a=1&b=2|2|");
    }

    #[test]
    fn set_yield_returns_the_receiver_for_chaining() {
        let request = NativeRequest::builder("GET", "/").build();

        let result = eval_with_request(
            // Chained call proves the return value is the request itself.
            "request.setYield(true).getMethod()",
            request,
        );

        assert_eq!(result.cast::<String>(), "GET");
    }

    #[test]
    fn negative_parameter_index_raises_marshal_error() {
        let engine = engine();
        let slot = RequestSlot::new();
        slot.bind(NativeRequest::builder("GET", "/").parameter("x").build());

        let mut scope = Scope::new();
        scope.push("request", slot.proxy());

        let caught = engine
            .eval_with_scope::<String>(
                &mut scope,
                r#"try { request.getParameter(-1); "no-error" } catch (err) { err.kind }"#,
            )
            .expect("catch should handle the error");

        assert_eq!(caught, "marshal");
        slot.unbind();
    }

    #[test]
    fn no_constructor_is_registered() {
        let engine = engine();
        let result = engine.eval::<Dynamic>("HttpRequest()");
        assert!(result.is_err());
    }
}
