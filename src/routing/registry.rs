use std::collections::HashMap;

use crate::Result;
use crate::context::RequestContext;

/// A named unit of request-handling logic.
///
/// Implementations match on the action name and return
/// `BlogError::ActionNotFound` for anything else, so the set of
/// URL-addressable actions is exactly the set the implementation names.
/// Internal helpers stay internal; there is no runtime visibility check.
pub trait Controller {
    fn handle(&mut self, ctx: &mut RequestContext, action: &str, params: &[String]) -> Result<()>;
}

type ControllerFactory = Box<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// Startup-time mapping from controller name to factory.
///
/// Populated exhaustively before the first request; the dispatcher performs
/// only lookups, never name-to-type resolution from user input.
#[derive(Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, C>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        self.factories.insert(
            name.to_string(),
            Box::new(move || Box::new(factory()) as Box<dyn Controller>),
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(name).map(|factory| factory())
    }
}
