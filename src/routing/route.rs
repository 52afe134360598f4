use std::collections::HashSet;

use crate::http::escape_html;

/// Routing configuration: the controller whitelist and the fallbacks.
///
/// The whitelist is the sole authorization gate for dispatch; names are
/// sanitized on construction so the comparison space matches the sanitized
/// path segments.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    allowed_controllers: HashSet<String>,
    default_controller: String,
    default_action: String,
}

impl RouteConfig {
    pub fn new<I, S>(allowed: I, default_controller: &str, default_action: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_controllers = allowed
            .into_iter()
            .map(|name| sanitize_segment(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();

        RouteConfig {
            allowed_controllers,
            default_controller: sanitize_segment(default_controller),
            default_action: sanitize_segment(default_action),
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.allowed_controllers.split(','),
            &config.default_controller,
            &config.default_action,
        )
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed_controllers.contains(name)
    }

    pub fn default_controller(&self) -> &str {
        &self.default_controller
    }

    pub fn default_action(&self) -> &str {
        &self.default_action
    }
}

/// A parsed route: controller, action and the remaining path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub controller: String,
    pub action: String,
    pub params: Vec<String>,
}

impl Route {
    /// Parse a logical path into a route.
    ///
    /// The first segment is accepted as the controller only when its
    /// sanitized form is non-empty and whitelisted; otherwise the default
    /// controller applies and the rejected segment is discarded, never
    /// reused as the action. The next segment is accepted as the action
    /// only when its sanitized form is non-empty; otherwise the default
    /// action applies and the segment stays in `params`. Remaining
    /// segments become HTML-escaped positional parameters.
    pub fn parse(raw_path: &str, config: &RouteConfig) -> Route {
        let trimmed = raw_path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Route {
                controller: config.default_controller.clone(),
                action: config.default_action.clone(),
                params: Vec::new(),
            };
        }

        let mut segments = trimmed.split('/');

        let first = segments.next().unwrap_or("");
        let candidate = sanitize_segment(first);
        let controller = if !candidate.is_empty() && config.is_allowed(&candidate) {
            candidate
        } else {
            config.default_controller.clone()
        };

        let mut rest: Vec<&str> = segments.collect();

        let mut action = config.default_action.clone();
        if let Some(second) = rest.first() {
            let sanitized = sanitize_segment(second);
            if !sanitized.is_empty() {
                action = sanitized;
                rest.remove(0);
            }
        }

        let params = rest.into_iter().map(escape_html).collect();

        Route {
            controller,
            action,
            params,
        }
    }
}

/// Reduce a path segment to a lowercase `[a-z0-9_]` token
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> RouteConfig {
        RouteConfig::new(["start", "post"], "start", "index")
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("Post"), "post");
        assert_eq!(sanitize_segment("my_page2"), "my_page2");
        assert_eq!(sanitize_segment("ev!l-c0de<x>"), "evlc0dex");
        assert_eq!(sanitize_segment("../../etc"), "etc");
        assert_eq!(sanitize_segment("<>!?"), "");
    }

    #[test]
    fn test_full_route() {
        let route = Route::parse("post/show/42", &config());
        assert_eq!(
            route,
            Route {
                controller: "post".to_string(),
                action: "show".to_string(),
                params: vec!["42".to_string()],
            }
        );
    }

    #[test]
    fn test_empty_path_uses_defaults() {
        let route = Route::parse("", &config());
        assert_eq!(route.controller, "start");
        assert_eq!(route.action, "index");
        assert!(route.params.is_empty());

        // A bare run of slashes is the same as empty
        let route = Route::parse("///", &config());
        assert_eq!(route.controller, "start");
        assert_eq!(route.action, "index");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let route = Route::parse("post/show/42/", &config());
        assert_eq!(route.params, vec!["42".to_string()]);
    }

    #[test]
    fn test_rejected_controller_is_discarded_not_reused_as_action() {
        let route = Route::parse("evil_controller/index", &config());
        assert_eq!(route.controller, "start");
        assert_eq!(route.action, "index");
        assert!(route.params.is_empty());
    }

    #[test]
    fn test_rejected_controller_alone() {
        let route = Route::parse("evil_controller", &config());
        assert_eq!(route.controller, "start");
        assert_eq!(route.action, "index");
        assert!(route.params.is_empty());
    }

    #[test]
    fn test_controller_name_is_case_insensitive() {
        let route = Route::parse("Post/Show", &config());
        assert_eq!(route.controller, "post");
        assert_eq!(route.action, "show");
    }

    #[test]
    fn test_unsanitizable_action_falls_back_and_stays_in_params() {
        // "<>" sanitizes to empty: the default action applies and the
        // segment remains a (now escaped) parameter.
        let route = Route::parse("post/<>/next", &config());
        assert_eq!(route.action, "index");
        assert_eq!(route.params, vec!["&lt;&gt;".to_string(), "next".to_string()]);
    }

    #[test]
    fn test_params_are_html_escaped() {
        let route = Route::parse("post/show/<script>", &config());
        assert_eq!(route.params, vec!["&lt;script&gt;".to_string()]);
    }

    #[test]
    fn test_whitelist_names_sanitized_on_construction() {
        let config = RouteConfig::new(["Start!", "POST"], "Start!", "Index");
        assert!(config.is_allowed("start"));
        assert!(config.is_allowed("post"));
        assert_eq!(config.default_controller(), "start");
        assert_eq!(config.default_action(), "index");
    }
}
