//! User-Agent string sent with every catalog and image request.
//!
//! The catalog asks clients to identify themselves; requests without a
//! meaningful User-Agent may be rejected.

/// Project URL included in the User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/fbufler/mangadex";

/// Default User-Agent (tool name, crate version, project URL).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("mangadex-dl/{version} (+{PROJECT_UA_URL})")
}
