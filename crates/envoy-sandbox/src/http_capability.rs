use rquickjs::{Ctx, Function, Object, Result as JsResult};

/// Binds a single `http.fetch(url, options?)` async function into `global`.
/// `options` is an optional JSON object `{method, headers, body}`; the
/// response body is returned as a string. Network errors surface as a
/// rejected promise, which the caller's catch turns into an
/// "Error executing tool: ..." string — never a Rust panic.
pub fn install(ctx: &Ctx<'_>) -> JsResult<()> {
    let http = Object::new(ctx.clone())?;
    let fetch = Function::new(ctx.clone(), fetch_impl)?;
    http.set("fetch", fetch)?;
    ctx.globals().set("http", http)?;
    Ok(())
}

#[rquickjs::function]
async fn fetch_impl(url: String, options: Option<String>) -> String {
    let client = reqwest::Client::new();
    let mut method = reqwest::Method::GET;
    let mut body: Option<String> = None;
    let mut headers = reqwest::header::HeaderMap::new();

    if let Some(raw) = options {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&raw) {
            if let Some(m) = parsed.get("method").and_then(|v| v.as_str()) {
                method = m.parse().unwrap_or(reqwest::Method::GET);
            }
            if let Some(b) = parsed.get("body").and_then(|v| v.as_str()) {
                body = Some(b.to_string());
            }
            if let Some(h) = parsed.get("headers").and_then(|v| v.as_object()) {
                for (k, v) in h {
                    if let Some(v) = v.as_str() {
                        if let (Ok(name), Ok(value)) = (
                            reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                            reqwest::header::HeaderValue::from_str(v),
                        ) {
                            headers.insert(name, value);
                        }
                    }
                }
            }
        }
    }

    let mut req = client.request(method, &url).headers(headers);
    if let Some(b) = body {
        req = req.body(b);
    }

    match req.send().await {
        Ok(resp) => resp.text().await.unwrap_or_default(),
        Err(err) => format!("Error: request failed: {err}"),
    }
}
