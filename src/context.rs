// 🧵 Request context
//
// Created at request entry (HTTP handler, CLI command, chat turn) and passed
// down explicitly. Recorded on the dispatch span so every log line of a call
// carries the request id and user id.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Principal used for internal service-to-service calls
pub const SYSTEM_USER: &str = "system";

#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        RequestContext {
            request_id: Uuid::new_v4(),
            user_id: user_id.into(),
            started_at: Utc::now(),
        }
    }

    /// Context for internal callers
    pub fn system() -> Self {
        Self::new(SYSTEM_USER)
    }

    /// Reuse an id supplied by the caller (e.g. an incoming X-Request-ID)
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_get_distinct_ids() {
        let a = RequestContext::new("officer-1");
        let b = RequestContext::new("officer-1");

        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.user_id, "officer-1");
        assert!(a.elapsed_ms() >= 0);
    }

    #[test]
    fn test_request_id_override() {
        let id = Uuid::new_v4();
        let ctx = RequestContext::system().with_request_id(id);

        assert_eq!(ctx.request_id, id);
        assert_eq!(ctx.user_id, SYSTEM_USER);
    }
}
