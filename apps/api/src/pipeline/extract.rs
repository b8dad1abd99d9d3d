//! Text extraction from an uploaded PDF.
//!
//! `pdf-extract` is CPU-bound and can panic on malformed input, so the parse
//! runs on the blocking pool and a panic there is reported as a parse failure.

use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("upload is not a PDF document")]
    NotPdf,

    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF parser panicked")]
    Panicked,
}

/// Extracts the text of every page in document order, concatenated with no separator.
pub async fn extract_text(pdf: bytes::Bytes) -> Result<String, ExtractError> {
    match tokio::task::spawn_blocking(move || extract_text_blocking(&pdf)).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ExtractError::Panicked),
        Err(e) => Err(ExtractError::Parse(e.to_string())),
    }
}

fn extract_text_blocking(pdf: &[u8]) -> Result<String, ExtractError> {
    if !looks_like_pdf(pdf) {
        return Err(ExtractError::NotPdf);
    }

    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf)
        .map_err(|e| ExtractError::Parse(e.to_string()))?;

    Ok(pages.concat())
}

/// PDF readers tolerate leading junk before the header, so only the first KiB is searched.
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}


#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_extracts_single_page() {
        let pdf = fixtures::text_pdf(&["Jane Doe Rust Engineer"]);
        let text = extract_text(Bytes::from(pdf)).await.unwrap();
        assert!(text.contains("Jane Doe Rust Engineer"), "got {text:?}");
    }

    #[tokio::test]
    async fn test_pages_in_document_order() {
        let pdf = fixtures::text_pdf(&["FirstPageMarker", "SecondPageMarker"]);
        let text = extract_text(Bytes::from(pdf)).await.unwrap();
        let first = text.find("FirstPageMarker").unwrap();
        let second = text.find("SecondPageMarker").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_rejects_non_pdf() {
        let err = extract_text(Bytes::from_static(b"hello, not a pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotPdf));
    }

    #[tokio::test]
    async fn test_rejects_truncated_pdf() {
        let err = extract_text(Bytes::from_static(b"%PDF-1.5\n1 0 obj\n<<"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Parse(_) | ExtractError::Panicked
        ));
    }

    #[test]
    fn test_magic_detection() {
        assert!(looks_like_pdf(b"%PDF-1.7\n"));
        assert!(looks_like_pdf(b"\xef\xbb\xbf%PDF-1.4"));
        assert!(!looks_like_pdf(b""));
        assert!(!looks_like_pdf(b"PK\x03\x04"));
    }
}
