//! Snapshot rendering for `rousectl status`

use rouse_common::StateSnapshot;
use serde_json::json;

/// Sorted `key: value` lines
pub fn render_text(snapshot: &StateSnapshot) -> String {
    snapshot
        .entries()
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// JSON object, keys sorted, two-space indent
pub fn render_json(snapshot: &StateSnapshot) -> String {
    let value = json!({
        "relay": snapshot.relay.to_string(),
        "target": snapshot.target.to_string(),
    });
    format!("{:#}", value)
}
