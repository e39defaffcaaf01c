use crate::config::UpstreamConfig;

/// One entry in the gateway routing table.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Path prefix the entry matches.
    pub prefix: String,
    /// Base URL of the owning service.
    pub upstream: String,
    /// Whether a valid token is required before forwarding.
    pub protected: bool,
}

/// Ordered, immutable routing table.
///
/// Built once at startup from configuration and never mutated. Resolution
/// picks the longest matching prefix, so `/cart/add` beats `/cart` when
/// both are present.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Build the table from explicit entries; sorts most-specific-first.
    pub fn new(mut entries: Vec<RouteEntry>) -> Self {
        entries.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { entries }
    }

    /// The production routing table.
    pub fn from_config(upstreams: &UpstreamConfig) -> Self {
        let route = |prefix: &str, upstream: &str, protected: bool| RouteEntry {
            prefix: prefix.to_string(),
            upstream: upstream.to_string(),
            protected,
        };

        Self::new(vec![
            // Public: registration, login, product browsing
            route("/register", &upstreams.user_service_url, false),
            route("/login", &upstreams.user_service_url, false),
            route("/products/get", &upstreams.product_service_url, false),
            route("/products/search", &upstreams.product_service_url, false),
            // Protected
            route("/profile", &upstreams.user_service_url, true),
            route("/users/", &upstreams.user_service_url, true),
            route("/orders", &upstreams.order_service_url, true),
            route("/cart", &upstreams.cart_service_url, true),
            route("/payments", &upstreams.payment_service_url, true),
            route("/notifications", &upstreams.notification_service_url, true),
        ])
    }

    /// Resolve a request path to its route entry, longest prefix first.
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|e| path.starts_with(&e.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            RouteEntry {
                prefix: "/cart".into(),
                upstream: "http://cart:8084".into(),
                protected: true,
            },
            RouteEntry {
                prefix: "/cart/add".into(),
                upstream: "http://cart-add:9000".into(),
                protected: true,
            },
            RouteEntry {
                prefix: "/products/get".into(),
                upstream: "http://products:8082".into(),
                protected: false,
            },
        ])
    }

    #[test]
    fn longest_prefix_wins() {
        let table = table();
        assert_eq!(
            table.resolve("/cart/add").unwrap().upstream,
            "http://cart-add:9000"
        );
        assert_eq!(
            table.resolve("/cart/getcart").unwrap().upstream,
            "http://cart:8084"
        );
    }

    #[test]
    fn unmatched_path_resolves_to_none() {
        assert!(table().resolve("/admin/secrets").is_none());
    }

    #[test]
    fn protection_flag_carried_through() {
        let table = table();
        assert!(table.resolve("/cart").unwrap().protected);
        assert!(!table.resolve("/products/get?id=1").unwrap().protected);
    }

    #[test]
    fn production_table_marks_auth_routes() {
        let upstreams = crate::config::UpstreamConfig {
            user_service_url: "http://user".into(),
            product_service_url: "http://product".into(),
            order_service_url: "http://order".into(),
            cart_service_url: "http://cart".into(),
            payment_service_url: "http://payment".into(),
            notification_service_url: "http://notification".into(),
            auth_service_url: "http://auth".into(),
        };
        let table = RouteTable::from_config(&upstreams);
        assert!(!table.resolve("/login").unwrap().protected);
        assert!(!table.resolve("/register").unwrap().protected);
        assert!(table.resolve("/payments/intent").unwrap().protected);
        assert!(table.resolve("/cart/remove/abc").unwrap().protected);
        assert!(table.resolve("/made/up/path").is_none());
    }
}
