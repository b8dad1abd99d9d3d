use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::pipeline::artifacts::ArtifactStore;
use crate::pipeline::compile::LatexCompiler;
use crate::pipeline::templates::TemplateCatalog;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything in here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub templates: TemplateCatalog,
    pub artifacts: ArtifactStore,
    /// Generation service. `LlmClient` in production, a stub in tests.
    pub generator: Arc<dyn TextGenerator>,
    /// LaTeX compiler. `PdfLatex` in production, a stub in tests.
    pub compiler: Arc<dyn LatexCompiler>,
}

impl AppState {
    pub fn new(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        compiler: Arc<dyn LatexCompiler>,
    ) -> Self {
        Self {
            templates: TemplateCatalog::new(config.templates_dir.clone()),
            artifacts: ArtifactStore::new(config.outputs_dir.clone(), config.retention),
            config: Arc::new(config),
            generator,
            compiler,
        }
    }
}
