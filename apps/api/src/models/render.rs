use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::pipeline::prompts::InstructionVariant;

/// One `/generate-resume` request after the multipart body has been read.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub template_id: String,
    pub variant: InstructionVariant,
    pub resume_pdf: Bytes,
}

/// Body of `POST /edit-latex`. Fields are optional so a missing one gets a clean 400.
#[derive(Debug, Clone, Deserialize)]
pub struct EditLatexRequest {
    pub latex: Option<String>,
    pub prompt: Option<String>,
    #[serde(default)]
    pub compile: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditLatexResponse {
    pub latex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<String>,
}
