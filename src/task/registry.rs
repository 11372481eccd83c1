use std::sync::Arc;

use tracing::{debug, info};

use crate::task::handlers::{
    EraBond, EraHandler, EraMerge, EraNew, EraSkipBond, EraUnbond, EraUpdateActive, EraUpdateRate,
    EraWithdraw,
};

/// Ordered set of era handlers, fixed once the task is built
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn EraHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// The registered era lifecycle, in execution order
    pub fn lifecycle() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EraNew));
        registry.register(Arc::new(EraBond));
        registry.register(Arc::new(EraUnbond));
        registry.register(Arc::new(EraUpdateActive));
        registry.register(Arc::new(EraUpdateRate));
        registry.register(Arc::new(EraMerge));
        registry.register(Arc::new(EraWithdraw));
        debug!(handler = EraSkipBond.name(), "era handler left out of the lifecycle");
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn EraHandler>) {
        info!("Registering era handler: {}", handler.name());
        self.handlers.push(handler);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn EraHandler>> {
        self.handlers.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
