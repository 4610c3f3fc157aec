//! Well-known delivery channel name constants.
//!
//! These must match the channel values stored in the `channel_queue.channel`
//! column and the channel lists kept on subscription rows.

/// In-app (web) notification, persisted and pushed over the live stream.
pub const CHANNEL_WEB: &str = "web";

/// Email notification delivered via SMTP by the queue dispatcher.
pub const CHANNEL_EMAIL: &str = "email";

/// Push notification delivered to registered devices via the push gateway.
pub const CHANNEL_PUSH: &str = "push";

/// Parse a jsonb channel list (as stored on subscription rows) into names.
///
/// Unknown names are kept as-is; non-array or non-string values yield an
/// empty list rather than an error so a malformed row degrades to
/// "no channels" instead of failing delivery for the whole batch.
pub fn parse_channel_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_array() {
        let value = serde_json::json!(["web", "email"]);
        assert_eq!(parse_channel_list(&value), vec!["web", "email"]);
    }

    #[test]
    fn non_array_yields_empty_list() {
        assert!(parse_channel_list(&serde_json::json!("web")).is_empty());
        assert!(parse_channel_list(&serde_json::json!(null)).is_empty());
    }

    #[test]
    fn non_string_entries_are_dropped() {
        let value = serde_json::json!(["web", 42, {"x": 1}, "push"]);
        assert_eq!(parse_channel_list(&value), vec!["web", "push"]);
    }
}
