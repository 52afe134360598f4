use crate::context::RequestContext;
use crate::controllers::layout;
use crate::http::escape_html;
use crate::routing::Controller;
use crate::{BlogError, Result};

/// The landing page: lists every post, newest first.
pub struct StartController;

impl Controller for StartController {
    fn handle(&mut self, ctx: &mut RequestContext, action: &str, _params: &[String]) -> Result<()> {
        match action {
            "index" => self.index(ctx),
            other => Err(BlogError::ActionNotFound(other.to_string())),
        }
    }
}

impl StartController {
    fn index(&self, ctx: &mut RequestContext) -> Result<()> {
        let posts = ctx.db.get_rows(
            "SELECT id, title, created_at FROM posts ORDER BY created_at DESC, id DESC",
            &[],
        )?;

        let mut body = String::from("<h1>lightblog</h1>\n<ul>\n");
        for post in &posts {
            let id = post.get_i64("id").unwrap_or_default();
            let title = post.get_str("title").unwrap_or_default();
            let created = post.get_str("created_at").unwrap_or_default();
            body.push_str(&format!(
                "<li><a href=\"/?url=post/show/{id}\">{}</a> <small>{}</small></li>\n",
                escape_html(title),
                escape_html(created)
            ));
        }
        if posts.is_empty() {
            body.push_str("<li>No posts yet.</li>\n");
        }
        body.push_str("</ul>");

        ctx.response.write(&layout("lightblog", &body));
        Ok(())
    }
}
