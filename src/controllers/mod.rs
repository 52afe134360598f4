// Module for the blog's controllers
pub mod error_page;
pub mod login;
pub mod post;
pub mod start;

pub use error_page::ErrorPageController;
pub use login::LoginController;
pub use post::PostController;
pub use start::StartController;

use crate::routing::ControllerRegistry;

/// Register every controller the application ships. The registry is the
/// only name-to-type mapping; it is filled here, once, at startup.
pub fn default_registry() -> ControllerRegistry {
    let mut registry = ControllerRegistry::new();
    registry.register("start", || StartController);
    registry.register("post", || PostController);
    registry.register("login", || LoginController);
    registry.register("error", || ErrorPageController);
    registry
}

/// Wrap a page body in the shared document shell
pub(crate) fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n{body}\n</body>\n</html>"
    )
}
