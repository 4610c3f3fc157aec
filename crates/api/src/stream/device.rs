//! Device registration for streaming connections.
//!
//! A device row identifies a browser session for push-capable delivery.
//! The fingerprint is deterministic over (user id, session id, truncated
//! client address, user agent), so reconnects from the same browser collapse
//! to one row instead of accumulating.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use relay_core::types::DbId;
use relay_db::repositories::DeviceRepo;
use relay_db::DbPool;

/// Device kind recorded for SSE connections.
const DEVICE_KIND: &str = "browser";

/// How many leading characters of the client address participate in the
/// fingerprint. Truncation keeps the fingerprint stable across dynamic
/// suffix churn within a household/NAT while still separating networks.
const ADDR_PREFIX_LEN: usize = 9;

/// Derive the deterministic device fingerprint.
pub(crate) fn device_fingerprint(
    user_id: DbId,
    session_id: &str,
    client_addr: &str,
    user_agent: &str,
) -> String {
    let truncated_addr: String = client_addr.chars().take(ADDR_PREFIX_LEN).collect();

    let mut hasher = Sha256::new();
    hasher.update(user_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(session_id.as_bytes());
    hasher.update(b"|");
    hasher.update(truncated_addr.as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Best-effort client address: first hop of `X-Forwarded-For`, else empty.
pub(crate) fn client_addr(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// The request's user agent, else empty.
pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Register (or refresh) the device row for a new streaming connection.
///
/// Device bookkeeping is never allowed to break delivery: failures are
/// logged and swallowed, and the fingerprint is still returned so the loop
/// can keep touching it.
pub(crate) async fn register_device(
    pool: &DbPool,
    user_id: DbId,
    session_id: &str,
    headers: &HeaderMap,
) -> String {
    let agent = user_agent(headers);
    let fingerprint = device_fingerprint(user_id, session_id, &client_addr(headers), &agent);

    let agent_opt = (!agent.is_empty()).then_some(agent.as_str());
    if let Err(e) = DeviceRepo::upsert_touch(pool, user_id, DEVICE_KIND, &fingerprint, agent_opt).await
    {
        tracing::warn!(user_id, error = %e, "Device registration failed");
    }

    fingerprint
}

/// Refresh the device row's `last_seen_at`, swallowing failures.
pub(crate) async fn touch_device(pool: &DbPool, fingerprint: &str) {
    if let Err(e) = DeviceRepo::touch(pool, fingerprint).await {
        tracing::warn!(error = %e, "Device touch failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = device_fingerprint(7, "session-1", "203.0.113.9", "Mozilla/5.0");
        let b = device_fingerprint(7, "session-1", "203.0.113.9", "Mozilla/5.0");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_varies_with_each_input() {
        let base = device_fingerprint(7, "session-1", "203.0.113.9", "Mozilla/5.0");
        assert_ne!(base, device_fingerprint(8, "session-1", "203.0.113.9", "Mozilla/5.0"));
        assert_ne!(base, device_fingerprint(7, "session-2", "203.0.113.9", "Mozilla/5.0"));
        assert_ne!(base, device_fingerprint(7, "session-1", "198.51.100.1", "Mozilla/5.0"));
        assert_ne!(base, device_fingerprint(7, "session-1", "203.0.113.9", "curl/8.0"));
    }

    #[test]
    fn address_is_truncated_before_hashing() {
        // Same 9-char prefix, different suffix: collapses to one fingerprint.
        let a = device_fingerprint(7, "s", "203.0.113.41", "ua");
        let b = device_fingerprint(7, "s", "203.0.113.57", "ua");
        assert_eq!(a, b);
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.9, 10.0.0.1".parse().unwrap(),
        );
        assert_eq!(client_addr(&headers), "203.0.113.9");
        assert_eq!(client_addr(&HeaderMap::new()), "");
    }
}
