//! Command-line rendering of contexts.

use url::Url;

use super::{AuthContext, ContextKind};

pub(super) fn curl_args(context: &AuthContext, url: &Url, reveal: bool) -> Vec<String> {
    if !context.is_url_domain(url) {
        return Vec::new();
    }
    match context.kind() {
        ContextKind::Basic(c) => c.cli_args(reveal),
        ContextKind::Cookie(c) => c.cli_args(url, reveal),
        // certificate lives only in memory
        ContextKind::X509(_) | ContextKind::Anonymous { .. } => Vec::new(),
    }
}
