//! Canonical dashboard routes.
//!
//! The classifier service links merchants into the admin dashboard. Links
//! are only checked for plausibility here: a dashboard URL must point at a
//! known section root or somewhere below it.

use std::collections::BTreeMap;
use url::Url;

pub const DASH_BASE: &str = "https://dash.tiktak.space";

const ROUTES: &[(&str, &str)] = &[
    ("orders", "/orders"),
    ("products", "/products"),
    ("builder", "/content-management"),
    ("settings", "/settings"),
    ("shipping", "/shipping"),
    ("payments", "/payments"),
    ("billing", "/settings"),
    ("pos", "/pos"),
    ("apps", "/apps-store"),
    ("customers", "/customers"),
    ("auth", "/settings"),
    ("inventory", "/stock-management"),
    ("domains", "/domains"),
    ("notifications", "/settings"),
    ("general", "/settings"),
];

/// Outcome of checking one link against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCheck {
    /// Points into the dashboard at a known section.
    Valid,
    /// Points into the dashboard at an unknown path.
    UnknownPath(String),
    /// Does not point into the dashboard at all.
    External,
}

#[derive(Debug, Clone)]
pub struct RoutingTable {
    base: Url,
    routes: BTreeMap<String, String>,
}

impl RoutingTable {
    pub fn builtin() -> Self {
        RoutingTable {
            base: Url::parse(DASH_BASE).expect("dashboard base url"),
            routes: ROUTES
                .iter()
                .map(|(ctx, path)| (ctx.to_string(), path.to_string()))
                .collect(),
        }
    }

    pub fn base(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Dashboard path for a routing context (`orders`, `domains`, ...).
    pub fn path_for(&self, context: &str) -> Option<&str> {
        self.routes.get(context).map(String::as_str)
    }

    /// `true` for the dashboard root, a section root, or anything below a
    /// section root.
    pub fn is_valid_path(&self, path: &str) -> bool {
        if path.is_empty() || path == "/" {
            return true;
        }
        self.routes.values().any(|root| {
            path == root
                || path
                    .strip_prefix(root.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Check a link that claims to be a dashboard link. Anything that does
    /// not parse, or lives on another host, is an unknown path.
    pub fn check_dashboard_link(&self, link: &str) -> LinkCheck {
        match Url::parse(link) {
            Ok(url) if url.host_str() == self.base.host_str() => {
                let path = url.path();
                if self.is_valid_path(path) {
                    LinkCheck::Valid
                } else {
                    LinkCheck::UnknownPath(path.to_string())
                }
            }
            _ => LinkCheck::UnknownPath(link.to_string()),
        }
    }

    /// Check a route link returned by the service. Links under the
    /// dashboard base are validated; other `http` links are external.
    pub fn check_route_link(&self, link: &str) -> LinkCheck {
        if link.starts_with(self.base()) {
            self.check_dashboard_link(link)
        } else if link.starts_with("http") {
            LinkCheck::External
        } else {
            LinkCheck::UnknownPath(link.to_string())
        }
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_roots_and_sub_paths_are_valid() {
        let t = RoutingTable::builtin();
        assert!(t.is_valid_path("/orders"));
        assert!(t.is_valid_path("/orders/123"));
        assert!(t.is_valid_path("/"));
        assert!(t.is_valid_path(""));
        assert!(!t.is_valid_path("/ordersx"));
        assert!(!t.is_valid_path("/ai-settings"));
    }

    #[test]
    fn dashboard_link_query_and_fragment_are_ignored() {
        let t = RoutingTable::builtin();
        assert_eq!(
            t.check_dashboard_link("https://dash.tiktak.space/settings/domain?tab=dns#top"),
            LinkCheck::Valid
        );
        assert_eq!(
            t.check_dashboard_link("https://dash.tiktak.space"),
            LinkCheck::Valid
        );
    }

    #[test]
    fn unknown_dashboard_path_is_reported() {
        let t = RoutingTable::builtin();
        assert_eq!(
            t.check_dashboard_link("https://dash.tiktak.space/marketing/ai"),
            LinkCheck::UnknownPath("/marketing/ai".into())
        );
    }

    #[test]
    fn route_link_outside_dashboard_is_external() {
        let t = RoutingTable::builtin();
        assert_eq!(
            t.check_route_link("https://docs.tiktak.space/guide"),
            LinkCheck::External
        );
        assert_eq!(
            t.check_route_link("/orders"),
            LinkCheck::UnknownPath("/orders".into())
        );
        assert_eq!(
            t.check_route_link("https://dash.tiktak.space/domains"),
            LinkCheck::Valid
        );
    }

    #[test]
    fn billing_routes_to_settings() {
        let t = RoutingTable::builtin();
        assert_eq!(t.path_for("billing"), Some("/settings"));
        assert_eq!(t.path_for("builder"), Some("/content-management"));
        assert_eq!(t.path_for("astrology"), None);
    }
}
