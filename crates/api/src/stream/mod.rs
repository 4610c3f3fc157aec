//! Server-sent event streaming for live notification delivery.
//!
//! Each connection gets an independent polling loop over shared storage --
//! there is no in-process bus between emitters and streams, so any server
//! process can serve any connection for the same user without coordination.
//! Latency is bounded by the poll interval; the trade is operational
//! simplicity and horizontal scalability.
//!
//! Wire protocol (reconnect-friendly):
//! - `hello` -- ack carrying the resolved resume cursor;
//! - `notify` -- one notification, frame id = fan-out row id (the cursor);
//! - `count` -- unread-count updates on the sibling stream;
//! - `bye` -- graceful close with the final cursor after the wall-clock
//!   budget, forcing the client to reconnect;
//! - comment frames (`: ping`) -- heartbeats that keep intermediaries from
//!   timing the connection out.
//!
//! Clients resume via the standard `Last-Event-ID` header or an explicit
//! `cursor` query parameter; the header wins when both are present.

pub mod counter;
pub mod device;
pub mod feed;

use axum::http::HeaderMap;
use axum::response::sse::Event;

use relay_core::types::DbId;

/// How often at most the device row's `last_seen_at` is refreshed.
pub(crate) const DEVICE_TOUCH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Resolve the resume cursor for a new connection.
///
/// `Last-Event-ID` takes precedence over the `cursor` query parameter; both
/// default to 0. Unparseable values fall through rather than erroring so a
/// client with a corrupt cursor restarts from the beginning instead of
/// being locked out.
pub(crate) fn resolve_cursor(headers: &HeaderMap, query_cursor: Option<DbId>) -> DbId {
    let header_cursor = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<DbId>().ok());

    header_cursor.or(query_cursor).unwrap_or(0).max(0)
}

/// Build the `hello` ack frame carrying the resolved cursor.
pub(crate) fn hello_event(cursor: DbId) -> Event {
    Event::default()
        .event("hello")
        .data(serde_json::json!({ "cursor": cursor }).to_string())
}

/// Build the terminal `bye` frame carrying the final cursor.
pub(crate) fn bye_event(cursor: DbId) -> Event {
    Event::default()
        .event("bye")
        .data(serde_json::json!({ "cursor": cursor }).to_string())
}

/// Build a comment-only heartbeat frame.
pub(crate) fn heartbeat_event() -> Event {
    Event::default().comment("ping")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_last_event_id(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("last-event-id", value.parse().unwrap());
        headers
    }

    #[test]
    fn header_takes_precedence_over_query() {
        let headers = headers_with_last_event_id("42");
        assert_eq!(resolve_cursor(&headers, Some(7)), 42);
    }

    #[test]
    fn query_parameter_is_the_fallback() {
        assert_eq!(resolve_cursor(&HeaderMap::new(), Some(7)), 7);
    }

    #[test]
    fn defaults_to_zero() {
        assert_eq!(resolve_cursor(&HeaderMap::new(), None), 0);
    }

    #[test]
    fn unparseable_header_falls_through_to_query() {
        let headers = headers_with_last_event_id("not-a-number");
        assert_eq!(resolve_cursor(&headers, Some(7)), 7);
        assert_eq!(resolve_cursor(&headers, None), 0);
    }

    #[test]
    fn negative_cursors_clamp_to_zero() {
        assert_eq!(resolve_cursor(&HeaderMap::new(), Some(-5)), 0);
    }
}
