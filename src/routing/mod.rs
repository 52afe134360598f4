// Module for URL routing and controller dispatch
pub mod dispatcher;
pub mod registry;
pub mod route;

pub use dispatcher::Dispatcher;
pub use registry::{Controller, ControllerRegistry};
pub use route::{Route, RouteConfig, sanitize_segment};
