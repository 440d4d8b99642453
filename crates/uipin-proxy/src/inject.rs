//! Overlay bootstrap injection into proxied HTML.
//!
//! The injected block sets `window.__UIPIN_*` globals and loads the
//! overlay bundle from the bridge. Values are JSON-encoded and then
//! escaped for inline-script safety: `<`, `>`, `&` and the U+2028/U+2029
//! line separators become `\uXXXX` escapes, so attacker-controlled config
//! values can never close the script tag.

use uipin_core::ProviderName;

/// Attribute marking an already-injected document.
pub const OVERLAY_MARKER: &str = "data-uipin-overlay";

fn escape_inline_script_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003C"),
            '>' => escaped.push_str("\\u003E"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn serialize_inline_script_value(value: &str) -> String {
    escape_inline_script_json(&serde_json::Value::String(value.to_string()).to_string())
}

/// Insert the overlay bootstrap block into an HTML document.
///
/// Preferred insertion point is just before `</head>`, then `</body>`,
/// then appended to the end of the document. Callers are responsible for
/// skipping documents that already carry [`OVERLAY_MARKER`].
pub fn inject_overlay_script(
    html: &str,
    bridge_port: u16,
    provider: ProviderName,
    model: &str,
) -> String {
    let bridge_url = format!("http://localhost:{}", bridge_port);
    let inject_block = [
        format!(
            "<script>window.__UIPIN_BRIDGE_URL = {};</script>",
            serialize_inline_script_value(&bridge_url)
        ),
        format!(
            "<script>window.__UIPIN_PROVIDER = {};</script>",
            serialize_inline_script_value(provider.as_str())
        ),
        format!(
            "<script>window.__UIPIN_MODEL = {};</script>",
            serialize_inline_script_value(model)
        ),
        format!(
            "<script src=\"{}/overlay.js\" {}=\"true\"></script>",
            bridge_url, OVERLAY_MARKER
        ),
    ]
    .join("\n");

    if html.contains("</head>") {
        return html.replacen("</head>", &format!("{}\n</head>", inject_block), 1);
    }
    if html.contains("</body>") {
        return html.replacen("</body>", &format!("{}\n</body>", inject_block), 1);
    }
    format!("{}\n{}", html, inject_block)
}
