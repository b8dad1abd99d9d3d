// Shared prompt fragments.
// The pipeline defines its own instruction blocks in pipeline/prompts.rs;
// this file holds the pieces every LaTeX-producing prompt repeats.

/// Opening line of every resume rewrite instruction.
pub const REWRITE_INSTRUCTION: &str = "Here is a famous resume template, replace the template's content with picked details from my resume and give me the latex code only as output.";

/// Closing line of every LaTeX-producing instruction.
pub const COMPILABLE_INSTRUCTION: &str =
    "Make sure I don't get errors when compiling your latex code.";
