//! Axum route handlers for the render pipeline.

use axum::{
    extract::{multipart::Field, rejection::JsonRejection, Multipart, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;
use crate::models::render::{
    EditLatexRequest, EditLatexResponse, RenderRequest, TemplateListResponse,
};
use crate::pipeline::prompts::InstructionVariant;
use crate::pipeline::renderer::{edit_latex, render_resume};
use crate::state::AppState;

/// File name the browser saves the result under.
pub const DOWNLOAD_FILENAME: &str = "generated_resume.pdf";

const DEFAULT_TEMPLATE_ID: &str = "1";
const DEFAULT_SINGLE_PAGE: &str = "true";

/// POST /generate-resume
///
/// Multipart form: `file` (PDF), `template_id`, `single_page`.
/// Returns the compiled PDF as an attachment.
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let request = read_render_form(multipart).await?;
    let rendered = render_resume(&state, request).await?;

    info!(
        "[{}] serving {} byte PDF",
        rendered.artifact_id,
        rendered.pdf.len()
    );
    Ok(pdf_attachment(rendered.pdf))
}

/// POST /edit-latex
///
/// Applies a natural-language edit to a LaTeX document; optionally compiles it.
pub async fn handle_edit_latex(
    State(state): State<AppState>,
    payload: Result<Json<EditLatexRequest>, JsonRejection>,
) -> Result<Json<EditLatexResponse>, AppError> {
    let Json(request) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e.body_text())))?;

    let (latex, prompt) = match (request.latex, request.prompt) {
        (Some(latex), Some(prompt)) if !latex.trim().is_empty() && !prompt.trim().is_empty() => {
            (latex, prompt)
        }
        _ => {
            return Err(AppError::BadRequest(
                "latex and prompt are required".to_string(),
            ))
        }
    };

    let edited = edit_latex(&state, &latex, &prompt, request.compile).await?;

    Ok(Json(EditLatexResponse {
        latex: edited.latex,
        pdf_base64: edited.pdf.map(|pdf| STANDARD.encode(pdf)),
    }))
}

/// GET /templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<TemplateListResponse>, AppError> {
    let templates = state.templates.list().await?;
    Ok(Json(TemplateListResponse { templates }))
}

/// Reads the multipart body. Unknown fields are ignored; camelCase aliases are accepted.
async fn read_render_form(mut multipart: Multipart) -> Result<RenderRequest, AppError> {
    let mut file: Option<Bytes> = None;
    let mut template_id: Option<String> = None;
    let mut single_page: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file = Some(field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Invalid file upload: {}", e.body_text()))
                })?);
            }
            "template_id" | "templateId" => template_id = Some(field_text(field).await?),
            "single_page" | "singlePage" => single_page = Some(field_text(field).await?),
            _ => {}
        }
    }

    let resume_pdf = file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("file is required".to_string()))?;

    let template_id = template_id.unwrap_or_else(|| DEFAULT_TEMPLATE_ID.to_string());
    let single_page = single_page.unwrap_or_else(|| DEFAULT_SINGLE_PAGE.to_string());

    Ok(RenderRequest {
        template_id,
        variant: InstructionVariant::from_flag(&single_page),
        resume_pdf,
    })
}

async fn field_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {}", e.body_text())))
}

fn pdf_attachment(pdf: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{DOWNLOAD_FILENAME}\"");
    let mut response = pdf.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
