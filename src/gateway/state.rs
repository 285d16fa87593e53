use std::sync::Arc;

use crate::pipeline::RagService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<RagService>,
}

impl GatewayState {
    pub fn new(service: Arc<RagService>) -> Self {
        Self { service }
    }
}
