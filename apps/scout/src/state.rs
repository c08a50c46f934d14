use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::notify::MessageSink;

/// Shared services for one run, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn TextGenerator>,
    pub sink: Arc<dyn MessageSink>,
    pub config: Config,
}
