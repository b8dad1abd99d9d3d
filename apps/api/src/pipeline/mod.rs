// Resume render pipeline.
// upload → extract → sanitize → prompt → generate → repair → compile → serve.
// All generation calls go through llm_client::TextGenerator; all compiler runs
// go through compile::LatexCompiler.

pub mod artifacts;
pub mod compile;
pub mod extract;
pub mod handlers;
pub mod prompts;
pub mod renderer;
pub mod repair;
pub mod sanitize;
pub mod templates;
