use crate::context::RequestContext;
use crate::controllers::layout;
use crate::routing::Controller;
use crate::{BlogError, Result};

/// Error page rendered by the dispatcher's fallback. The message arrives
/// pre-escaped as the first parameter.
pub struct ErrorPageController;

impl Controller for ErrorPageController {
    fn handle(&mut self, ctx: &mut RequestContext, action: &str, params: &[String]) -> Result<()> {
        match action {
            "index" => self.index(ctx, params),
            other => Err(BlogError::ActionNotFound(other.to_string())),
        }
    }
}

impl ErrorPageController {
    fn index(&self, ctx: &mut RequestContext, params: &[String]) -> Result<()> {
        let message = params
            .first()
            .map(String::as_str)
            .unwrap_or("The requested page could not be found.");
        let body = format!("<h1>404 - Page not found</h1>\n<p>{message}</p>");
        ctx.response.write(&layout("404 - Page not found", &body));
        Ok(())
    }
}
