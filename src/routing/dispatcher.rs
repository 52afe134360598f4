use tracing::{debug, error};

use crate::context::RequestContext;
use crate::http::escape_html;
use crate::routing::registry::ControllerRegistry;
use crate::routing::route::{Route, RouteConfig};
use crate::{BlogError, Result};

/// Name the error fallback looks up in the registry. Not part of the
/// whitelist, so it is never URL-addressable directly.
const ERROR_CONTROLLER: &str = "error";

/// Static last-resort page when no error controller is registered or the
/// registered one fails.
const FALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>404 - Page not found</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }
        .error-container { max-width: 600px; margin: 0 auto; padding: 20px; }
        h1 { color: #d9534f; }
    </style>
</head>
<body>
    <div class="error-container">
        <h1>404 - Page not found</h1>
        <p>The requested page could not be found.</p>
    </div>
</body>
</html>"#;

/// The front controller: parses the inbound path, resolves the
/// controller/action pair against the whitelist and registry, invokes it,
/// and routes every failure to the error fallback.
pub struct Dispatcher {
    registry: ControllerRegistry,
    routes: RouteConfig,
    debug_display: bool,
}

impl Dispatcher {
    pub fn new(registry: ControllerRegistry, routes: RouteConfig, debug_display: bool) -> Self {
        Dispatcher {
            registry,
            routes,
            debug_display,
        }
    }

    pub fn routes(&self) -> &RouteConfig {
        &self.routes
    }

    /// Run one dispatch cycle. This is the sole top-level error boundary:
    /// no failure from controller invocation escapes it.
    pub fn dispatch(&self, raw_path: &str, ctx: &mut RequestContext) {
        let route = Route::parse(raw_path, &self.routes);
        debug!(
            controller = %route.controller,
            action = %route.action,
            params = route.params.len(),
            "dispatching"
        );

        if let Err(err) = self.invoke(&route, ctx) {
            self.handle_error(&err, ctx);
        }
    }

    fn invoke(&self, route: &Route, ctx: &mut RequestContext) -> Result<()> {
        let mut controller = self
            .registry
            .resolve(&route.controller)
            .ok_or_else(|| BlogError::ControllerNotFound(route.controller.clone()))?;

        controller.handle(ctx, &route.action, &route.params)
    }

    /// Emit the 404 error page. Must never propagate a failure; a broken
    /// error controller degrades to the static page.
    fn handle_error(&self, err: &BlogError, ctx: &mut RequestContext) {
        // Validation misses are expected request outcomes, not failures
        match err {
            BlogError::Validation(_) => {
                debug!(error = %err, "request failed validation")
            }
            _ => error!(error = %err, status = err.http_status(), "dispatch failed"),
        }

        let message = if self.debug_display {
            err.to_string()
        } else {
            "The requested page could not be found.".to_string()
        };

        ctx.response.reset();
        ctx.response.set_status(404);

        if let Some(mut error_controller) = self.registry.resolve(ERROR_CONTROLLER) {
            let params = [escape_html(&message)];
            if error_controller
                .handle(ctx, self.routes.default_action(), &params)
                .is_ok()
            {
                ctx.response.set_status(404);
                return;
            }
            error!("error controller failed, falling back to static page");
            ctx.response.reset();
            ctx.response.set_status(404);
        }

        ctx.response.write(FALLBACK_PAGE);
    }
}
