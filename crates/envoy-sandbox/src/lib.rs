pub mod error;
mod http_capability;

pub use error::{Result, SandboxError};

use std::collections::HashMap;
use std::time::Duration;

use rquickjs::{async_with, AsyncContext, AsyncRuntime, CatchResultExt, Object};
use tracing::warn;

/// 30 second hard bound on a single sandboxed invocation, per the tool
/// execution contract: if the body never returns, the caller gets
/// "Error executing tool: timed out" rather than hanging forever.
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

fn wrap(code: &str, input: &serde_json::Value, env: &HashMap<String, String>) -> String {
    let input_json = serde_json::to_string(input).unwrap_or_else(|_| "null".to_string());
    let env_json = serde_json::to_string(env).unwrap_or_else(|_| "{}".to_string());
    format!(
        "(async function(input, env) {{\n{code}\n}})({input_json}, {env_json})"
    )
}

/// Parses `code` as the body of an async function without running it.
/// Used by meta-tools before persisting a new or updated tool, so a bad
/// snippet is rejected at creation time rather than at first invocation.
pub async fn compile_check(code: &str) -> Result<()> {
    let source = wrap(code, &serde_json::Value::Null, &HashMap::new());
    let runtime = AsyncRuntime::new().map_err(|e| SandboxError::Compile(e.to_string()))?;
    let context = AsyncContext::full(&runtime)
        .await
        .map_err(|e| SandboxError::Compile(e.to_string()))?;

    let outcome: std::result::Result<(), String> = async_with!(context => |ctx| {
        ctx.compile::<_, _, rquickjs::Module<_>>("tool", source)
            .catch(&ctx)
            .map(|_| ())
            .map_err(|e| e.to_string())
    })
    .await;

    outcome.map_err(SandboxError::Compile)
}

/// Runs `code` (the body of an async function with free names `input`,
/// `http`, and `env`) against `input`, racing it against
/// [`EXECUTION_TIMEOUT`]. This never returns an `Err`: compile failures,
/// thrown exceptions, and timeouts are all coerced into an in-band
/// "Error ..." string, per the contract that tool failures are data fed
/// back to the model, not control flow raised to the caller.
pub async fn execute(code: &str, input: serde_json::Value, env: &HashMap<String, String>) -> String {
    let source = wrap(code, &input, env);

    let run = async {
        let runtime = match AsyncRuntime::new() {
            Ok(rt) => rt,
            Err(e) => return format!("Error: failed to start sandbox: {e}"),
        };
        let context = match AsyncContext::full(&runtime).await {
            Ok(ctx) => ctx,
            Err(e) => return format!("Error: failed to start sandbox: {e}"),
        };

        let result: std::result::Result<String, String> = async_with!(context => |ctx| {
            if let Err(e) = http_capability::install(&ctx) {
                return Err(format!("{e}"));
            }
            let value: rquickjs::Result<rquickjs::Value> = (|| {
                let promise: rquickjs::Promise = ctx.eval(source)?;
                Ok(promise.into_value())
            })();

            match value {
                Ok(v) => Ok(coerce(&ctx, v)),
                Err(e) => Err(format!("{e}")),
            }
        })
        .await;

        // Drive any pending microtasks/promise resolution to completion.
        let _ = runtime.idle().await;

        match result {
            Ok(s) => s,
            Err(msg) => format!("Error executing tool: {msg}"),
        }
    };

    match tokio::time::timeout(EXECUTION_TIMEOUT, run).await {
        Ok(output) => output,
        Err(_) => {
            warn!("sandboxed tool execution timed out after {EXECUTION_TIMEOUT:?}");
            format!(
                "Error executing tool: timed out after {} seconds",
                EXECUTION_TIMEOUT.as_secs()
            )
        }
    }
}

/// undefined/null -> a friendly default; string -> pass through;
/// anything else -> pretty-printed via JSON.stringify.
fn coerce(ctx: &rquickjs::Ctx<'_>, value: rquickjs::Value) -> String {
    if value.is_undefined() || value.is_null() {
        return "Tool executed successfully (no return value)".to_string();
    }
    if let Some(s) = value.as_string() {
        return s.to_string().unwrap_or_default();
    }

    let globals = ctx.globals();
    if let Ok(json) = globals.get::<_, Object>("JSON") {
        if let Ok(stringify) = json.get::<_, rquickjs::Function>("stringify") {
            if let Ok(s) = stringify.call::<_, String>((value.clone(), rquickjs::Undefined, 2)) {
                return s;
            }
        }
    }
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_plain_string() {
        let out = execute("return 'hello';", serde_json::json!({}), &HashMap::new()).await;
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn coerces_undefined_to_friendly_message() {
        let out = execute("return;", serde_json::json!({}), &HashMap::new()).await;
        assert_eq!(out, "Tool executed successfully (no return value)");
    }

    #[tokio::test]
    async fn exceptions_become_error_strings() {
        let out = execute("throw new Error('boom');", serde_json::json!({}), &HashMap::new()).await;
        assert!(out.starts_with("Error executing tool:"));
    }

    #[tokio::test]
    async fn reads_input_and_env() {
        let mut env = HashMap::new();
        env.insert("TOKEN".to_string(), "abc123".to_string());
        let out = execute(
            "return input.city + ':' + env.TOKEN;",
            serde_json::json!({"city": "nyc"}),
            &env,
        )
        .await;
        assert_eq!(out, "nyc:abc123");
    }

    #[tokio::test]
    async fn compile_check_rejects_bad_syntax() {
        let err = compile_check("this is not js(").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn compile_check_accepts_valid_body() {
        compile_check("return 1 + 1;").await.unwrap();
    }
}
