// Instruction blocks and prompt assembly for the render pipeline.
// Cross-cutting fragments live in llm_client::prompts.

use crate::llm_client::prompts::{COMPILABLE_INSTRUCTION, REWRITE_INSTRUCTION};

/// Label placed before the template's LaTeX source.
pub const TEMPLATE_LABEL: &str = "Here is the resume template:";

/// Label placed before the sanitized resume text.
pub const RESUME_LABEL: &str = "Here is my resume content:";

/// Content-trimming rules for the one-page variant.
const SINGLE_PAGE_RULES: &str = "\
strictly keep the resume output single page. you can cut down on content from my resume or summarize or pick the good parts based on standard swe job guidelines.

if there is too much info you need it to only include:
    strictly 2 max highest education level for one page.
    recent experience,
    2 projects,
    skills,
    summarized achievements
Summarize my resume to Fit the template.";

/// Standing instruction for the LaTeX edit flow.
pub const EDIT_SYSTEM_INSTRUCTION: &str = "\
You are editing an existing LaTeX resume document. Apply the user's requested changes precisely and return only valid, compilable LaTeX code. Do not add explanations.

CRITICAL: Generate ONLY valid LaTeX code that compiles without errors:
- Use only standard LaTeX document classes (article, report, etc.)
- Escape special characters: & becomes \\&, % becomes \\%, $ becomes \\$, # becomes \\#
- Use \\section{} for section titles, not \\section{Achievements & Leadership}
- Do not reference custom .cls files that don't exist
- Use proper LaTeX syntax for all commands";

/// Which instruction block heads the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionVariant {
    /// Trim and summarize so the result fits on one page.
    SinglePage,
    /// Carry the resume content over without trimming instructions.
    Verbatim,
}

impl InstructionVariant {
    /// Parses the `single_page` form value. Only the exact string `"false"` opts out.
    pub fn from_flag(raw: &str) -> Self {
        if raw == "false" {
            InstructionVariant::Verbatim
        } else {
            InstructionVariant::SinglePage
        }
    }

    pub fn instructions(self) -> String {
        match self {
            InstructionVariant::SinglePage => format!(
                "{REWRITE_INSTRUCTION}\n{SINGLE_PAGE_RULES}\n{COMPILABLE_INSTRUCTION}"
            ),
            InstructionVariant::Verbatim => {
                format!("{REWRITE_INSTRUCTION}\n{COMPILABLE_INSTRUCTION}")
            }
        }
    }
}

/// Builds the generation prompt. The template source is inserted byte-for-byte.
pub fn assemble_prompt(
    variant: InstructionVariant,
    template_source: &str,
    resume_text: &str,
) -> String {
    format!(
        "{}\n{TEMPLATE_LABEL}\n{template_source}\n{RESUME_LABEL}\n{resume_text}",
        variant.instructions()
    )
}

/// Content parts for the edit flow: the current document, then the requested change.
pub fn edit_parts(latex: &str, request: &str) -> Vec<String> {
    vec![
        format!("Original LaTeX:\n\n{latex}"),
        format!("Edit request:\n\n{request}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\\documentclass{article}\n\\begin{document}\n{NAME} #1 & $\n\\end{document}";

    #[test]
    fn test_flag_parsing() {
        assert_eq!(InstructionVariant::from_flag("false"), InstructionVariant::Verbatim);
        assert_eq!(InstructionVariant::from_flag(" false "), InstructionVariant::SinglePage);
        assert_eq!(InstructionVariant::from_flag("true"), InstructionVariant::SinglePage);
        assert_eq!(InstructionVariant::from_flag(""), InstructionVariant::SinglePage);
        assert_eq!(InstructionVariant::from_flag("False"), InstructionVariant::SinglePage);
    }

    #[test]
    fn test_single_page_has_trimming_rules() {
        let prompt = assemble_prompt(InstructionVariant::SinglePage, TEMPLATE, "resume");
        assert!(prompt.contains("strictly keep the resume output single page"));
        assert!(prompt.contains("2 projects"));
        assert!(prompt.starts_with(REWRITE_INSTRUCTION));
    }

    #[test]
    fn test_verbatim_has_no_trimming_rules() {
        let prompt = assemble_prompt(InstructionVariant::Verbatim, TEMPLATE, "resume");
        assert!(!prompt.contains("single page"));
        assert!(prompt.contains(COMPILABLE_INSTRUCTION));
    }

    #[test]
    fn test_template_inserted_unmodified_between_labels() {
        for variant in [InstructionVariant::SinglePage, InstructionVariant::Verbatim] {
            let prompt = assemble_prompt(variant, TEMPLATE, "Jane Doe");
            let expected = format!("{TEMPLATE_LABEL}\n{TEMPLATE}\n{RESUME_LABEL}\nJane Doe");
            assert!(prompt.ends_with(&expected));
        }
    }

    #[test]
    fn test_edit_parts_order() {
        let parts = edit_parts("\\section{A}", "rename A to B");
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("Original LaTeX:"));
        assert!(parts[0].ends_with("\\section{A}"));
        assert!(parts[1].starts_with("Edit request:"));
    }
}
