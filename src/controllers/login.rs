use crate::context::RequestContext;
use crate::controllers::layout;
use crate::error::{HttpError, ValidationError};
use crate::http::escape_html;
use crate::routing::Controller;
use crate::{BlogError, Result};

/// Login form and session lifecycle. The submit action takes the CSRF
/// token and the username as positional path parameters.
pub struct LoginController;

impl Controller for LoginController {
    fn handle(&mut self, ctx: &mut RequestContext, action: &str, params: &[String]) -> Result<()> {
        match action {
            "index" => self.index(ctx),
            "submit" => self.submit(ctx, params),
            "logout" => self.logout(ctx),
            other => Err(BlogError::ActionNotFound(other.to_string())),
        }
    }
}

impl LoginController {
    fn index(&self, ctx: &mut RequestContext) -> Result<()> {
        let token = ctx.session.issue_csrf_token();
        let body = format!(
            "<h1>Login</h1>\n<p>Token: <code>{}</code></p>\n<p>Submit via /?url=login/submit/&lt;token&gt;/&lt;username&gt;</p>",
            escape_html(&token)
        );
        ctx.response.write(&layout("Login", &body));
        Ok(())
    }

    fn submit(&self, ctx: &mut RequestContext, params: &[String]) -> Result<()> {
        let token = params
            .first()
            .ok_or_else(|| BlogError::from(HttpError::forbidden("missing csrf token")))?;
        if !ctx.session.validate_csrf_token(token) {
            return Err(HttpError::forbidden("invalid csrf token").into());
        }

        let username = params
            .get(1)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BlogError::from(ValidationError::required("username")))?;

        ctx.session.set("user", username.as_str());
        let body = format!("<h1>Welcome, {username}</h1>\n<p><a href=\"/?url=start\">Home</a></p>");
        ctx.response.write(&layout("Welcome", &body));
        Ok(())
    }

    fn logout(&self, ctx: &mut RequestContext) -> Result<()> {
        ctx.session.destroy();
        ctx.response
            .write(&layout("Logged out", "<h1>Logged out</h1>"));
        Ok(())
    }
}
