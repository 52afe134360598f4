use crate::context::RequestContext;
use crate::controllers::layout;
use crate::db::SqlValue;
use crate::error::{HttpError, ValidationError};
use crate::http::escape_html;
use crate::routing::Controller;
use crate::{BlogError, Result};

/// Single-post pages.
pub struct PostController;

impl Controller for PostController {
    fn handle(&mut self, ctx: &mut RequestContext, action: &str, params: &[String]) -> Result<()> {
        match action {
            "index" => self.index(ctx),
            "show" => self.show(ctx, params),
            other => Err(BlogError::ActionNotFound(other.to_string())),
        }
    }
}

impl PostController {
    fn index(&self, ctx: &mut RequestContext) -> Result<()> {
        let posts = ctx
            .db
            .get_rows("SELECT id, title FROM posts ORDER BY id DESC", &[])?;

        let mut body = String::from("<h1>Posts</h1>\n<ul>\n");
        for post in &posts {
            let id = post.get_i64("id").unwrap_or_default();
            let title = post.get_str("title").unwrap_or_default();
            body.push_str(&format!(
                "<li><a href=\"/?url=post/show/{id}\">{}</a></li>\n",
                escape_html(title)
            ));
        }
        body.push_str("</ul>");

        ctx.response.write(&layout("Posts", &body));
        Ok(())
    }

    fn show(&self, ctx: &mut RequestContext, params: &[String]) -> Result<()> {
        let raw_id = params
            .first()
            .ok_or_else(|| BlogError::from(ValidationError::required("id")))?;
        let id: i64 = raw_id
            .parse()
            .map_err(|_| BlogError::from(ValidationError::invalid_format("id")))?;

        let post = ctx
            .db
            .get_row(
                "SELECT title, body, created_at FROM posts WHERE id = ?",
                &[SqlValue::from(id)],
            )?
            .ok_or_else(|| BlogError::from(HttpError::not_found(format!("no post with id {id}"))))?;

        let title = escape_html(post.get_str("title").unwrap_or_default());
        let body_text = escape_html(post.get_str("body").unwrap_or_default());
        let created = escape_html(post.get_str("created_at").unwrap_or_default());

        let body = format!(
            "<h1>{title}</h1>\n<p><small>{created}</small></p>\n<p>{body_text}</p>\n<p><a href=\"/?url=start\">Back</a></p>"
        );
        ctx.response.write(&layout(&title, &body));
        Ok(())
    }
}
