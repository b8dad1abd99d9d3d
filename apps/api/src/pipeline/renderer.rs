//! Render pipeline: one request, start to finish.
//!
//! Flow: Received → Extracted → Sanitized → Prompted → Generated → Repaired →
//!       Compiled → Served. Any stage may fail; the failure is logged with its
//!       stage and surfaces as an `AppError` whose response carries no detail.
//!
//! Both external calls (generation, compilation) run under explicit timeouts.

use std::fmt;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::render::RenderRequest;
use crate::pipeline::artifacts::{ArtifactId, ArtifactSet};
use crate::pipeline::compile::CompileError;
use crate::pipeline::extract::extract_text;
use crate::pipeline::prompts::{assemble_prompt, edit_parts, EDIT_SYSTEM_INSTRUCTION};
use crate::pipeline::repair::{repair_latex, RepairProfile};
use crate::pipeline::sanitize::sanitize;
use crate::state::AppState;

/// Position of a request in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Extracted,
    Sanitized,
    Prompted,
    Generated,
    Repaired,
    Compiled,
    Served,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Extracted => "extracted",
            Stage::Sanitized => "sanitized",
            Stage::Prompted => "prompted",
            Stage::Generated => "generated",
            Stage::Repaired => "repaired",
            Stage::Compiled => "compiled",
            Stage::Served => "served",
        };
        f.write_str(name)
    }
}

/// Tracks the last completed stage so a failure can be reported as `Failed(stage, reason)`.
struct Progress<'a> {
    id: &'a ArtifactId,
    stage: Stage,
    started: Instant,
}

impl<'a> Progress<'a> {
    fn new(id: &'a ArtifactId) -> Self {
        Self {
            id,
            stage: Stage::Received,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, stage: Stage) {
        self.stage = stage;
        info!(
            "[{}] stage {} after {}ms",
            self.id,
            stage,
            self.started.elapsed().as_millis()
        );
    }

    /// Logs the failure against the stage that was running and passes it on.
    fn check<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        result.map_err(|e| {
            error!("[{}] failed after stage {}: {e}", self.id, self.stage);
            e
        })
    }
}

/// A compiled resume, read into memory before its artifacts are released.
#[derive(Debug)]
pub struct RenderedResume {
    pub artifact_id: ArtifactId,
    pub pdf: Vec<u8>,
}

/// Runs the full `/generate-resume` pipeline.
pub async fn render_resume(
    state: &AppState,
    request: RenderRequest,
) -> Result<RenderedResume, AppError> {
    let artifacts = state.artifacts.allocate();
    let mut progress = Progress::new(artifacts.id());

    info!(
        "[{}] render request: template={:?} variant={:?} upload={} bytes",
        artifacts.id(),
        request.template_id,
        request.variant,
        request.resume_pdf.len()
    );

    // Unknown templates stop here, before any external call.
    let template = progress.check(state.templates.load(&request.template_id).await)?;

    let raw_text = progress.check(
        extract_text(request.resume_pdf)
            .await
            .map_err(|e| AppError::Extraction(e.to_string())),
    )?;
    progress.advance(Stage::Extracted);

    let resume_text = sanitize(&raw_text);
    if resume_text.trim().is_empty() {
        warn!("[{}] no usable text extracted from upload", artifacts.id());
    }
    progress.advance(Stage::Sanitized);

    let prompt = assemble_prompt(request.variant, &template.source, &resume_text);
    progress.advance(Stage::Prompted);

    let generated = progress.check(generate(state, None, vec![prompt]).await)?;
    progress.advance(Stage::Generated);

    let latex = repair_latex(&generated, Some(&template.id), RepairProfile::Generation);
    progress.advance(Stage::Repaired);

    let pdf = progress.check(compile(state, &artifacts, &latex).await)?;
    progress.advance(Stage::Compiled);

    progress.advance(Stage::Served);
    Ok(RenderedResume {
        artifact_id: artifacts.id().clone(),
        pdf,
    })
}

/// Result of the `/edit-latex` flow.
#[derive(Debug)]
pub struct EditedLatex {
    pub latex: String,
    pub pdf: Option<Vec<u8>>,
}

/// Asks the generation service to apply `instruction` to `latex`, repairs the
/// reply, and optionally compiles it.
pub async fn edit_latex(
    state: &AppState,
    latex: &str,
    instruction: &str,
    compile_pdf: bool,
) -> Result<EditedLatex, AppError> {
    let artifacts = state.artifacts.allocate();
    let mut progress = Progress::new(artifacts.id());

    info!(
        "[{}] edit request: {} bytes of LaTeX, compile={}",
        artifacts.id(),
        latex.len(),
        compile_pdf
    );

    let parts = edit_parts(latex, instruction);
    progress.advance(Stage::Prompted);

    let generated = progress.check(generate(state, Some(EDIT_SYSTEM_INSTRUCTION), parts).await)?;
    progress.advance(Stage::Generated);

    let edited = repair_latex(&generated, None, RepairProfile::Edit);
    progress.advance(Stage::Repaired);

    let pdf = if compile_pdf {
        let pdf = progress.check(compile(state, &artifacts, &edited).await)?;
        progress.advance(Stage::Compiled);
        Some(pdf)
    } else {
        None
    };

    progress.advance(Stage::Served);
    Ok(EditedLatex { latex: edited, pdf })
}

/// One bounded call to the generation service.
async fn generate(
    state: &AppState,
    system: Option<&str>,
    parts: Vec<String>,
) -> Result<String, AppError> {
    let limit = state.config.generation_timeout;

    match tokio::time::timeout(limit, state.generator.generate(system, &parts)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(AppError::Generation(e.to_string())),
        Err(_) => Err(AppError::Generation(format!("timed out after {limit:?}"))),
    }
}

/// Writes `latex` into the request's artifact set, compiles it under a timeout and
/// reads the PDF back. Only a zero exit plus an existing, non-empty PDF counts.
async fn compile(
    state: &AppState,
    artifacts: &ArtifactSet,
    latex: &str,
) -> Result<Vec<u8>, AppError> {
    let tex_path = artifacts.tex_path();
    tokio::fs::write(&tex_path, latex).await?;

    let limit = state.config.compile_timeout;
    let result =
        match tokio::time::timeout(limit, state.compiler.compile(&tex_path, artifacts.dir())).await
        {
            Ok(result) => result,
            Err(_) => Err(CompileError::TimedOut(limit)),
        };

    if let Err(e) = result {
        if let Some(output) = e.output() {
            error!("[{}] compiler output:\n{output}", artifacts.id());
        }
        return Err(AppError::Compilation(e.to_string()));
    }

    let pdf_path = artifacts.pdf_path();
    match tokio::fs::read(&pdf_path).await {
        Ok(pdf) if !pdf.is_empty() => {
            info!("[{}] compiled {} byte PDF", artifacts.id(), pdf.len());
            Ok(pdf)
        }
        Ok(_) => Err(AppError::Compilation(format!(
            "compiler produced an empty PDF at {}",
            pdf_path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::Compilation(
            CompileError::MissingOutput(pdf_path).to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}
