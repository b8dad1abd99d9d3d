//! Output repair: heuristic rewrites for LaTeX the generation service gets wrong.
//!
//! Rules are data: ordered tables of [`RepairRule`]s applied to the raw text.

use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

use crate::pipeline::sanitize::strip_non_ascii;

/// Canonical color package invocation.
pub const CANONICAL_COLOR_PACKAGE: &str = "\\usepackage[usenames,dvipsnames]{color}";

/// Option-token misspellings observed in generated preambles.
pub const DVIPSNAMES_MISSPELLINGS: &[&str] = &["dvipsyn", "dvipsypes", "dvipsines", "dvipshade"];

/// One rewrite step.
pub enum RepairRule {
    /// Replace every occurrence of a literal string.
    Literal {
        from: &'static str,
        to: &'static str,
    },
    /// Replace every match of a pattern with a literal string (no `$` expansion).
    Pattern { regex: Regex, to: &'static str },
    /// Escape bare `&` inside the brace argument of matching commands.
    /// The regex must capture the command head in group 1 and the argument in group 2.
    EscapeAmpersands { regex: Regex },
}

impl RepairRule {
    fn literal(from: &'static str, to: &'static str) -> Self {
        RepairRule::Literal { from, to }
    }

    fn pattern(pattern: &str, to: &'static str) -> Self {
        RepairRule::Pattern {
            regex: compile(pattern),
            to,
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match self {
            RepairRule::Literal { from, to } => text.replace(*from, to),
            RepairRule::Pattern { regex, to } => regex.replace_all(text, NoExpand(*to)).into_owned(),
            RepairRule::EscapeAmpersands { regex } => regex
                .replace_all(text, |caps: &Captures| {
                    format!("{}{{{}}}", &caps[1], escape_bare_ampersands(&caps[2]))
                })
                .into_owned(),
        }
    }
}

// Rule patterns are compile-time constants; a bad one is a programming error.
fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => panic!("invalid repair pattern {pattern:?}: {e}"),
    }
}

/// Fences wrapping the reply; `latex`-tagged first so its tag goes with it.
static FENCE_RULES: Lazy<Vec<RepairRule>> = Lazy::new(|| {
    vec![
        RepairRule::literal("```latex", ""),
        RepairRule::literal("```tex", ""),
        RepairRule::literal("```", ""),
    ]
});

static MISSPELLING_RULES: Lazy<Vec<RepairRule>> =
    Lazy::new(|| vec![RepairRule::pattern(&DVIPSNAMES_MISSPELLINGS.join("|"), "dvipsnames")]);

/// Rules that only make sense for one template's preamble, keyed by template id.
static TEMPLATE_RULES: Lazy<HashMap<&'static str, Vec<RepairRule>>> = Lazy::new(|| {
    HashMap::from([(
        "1",
        vec![RepairRule::pattern(
            r"\\usepackage\[usenames,[^\]\n]*?,dvipsnames\]",
            "\\usepackage[usenames,dvipsnames]",
        )],
    )])
});

static COLOR_PACKAGE_RULES: Lazy<Vec<RepairRule>> = Lazy::new(|| {
    vec![RepairRule::pattern(
        r"\\usepackage\[usenames,dvips[^\]]*\]\{color\}",
        CANONICAL_COLOR_PACKAGE,
    )]
});

/// Additional rules for documents coming back from the edit flow.
static EDIT_RULES: Lazy<Vec<RepairRule>> = Lazy::new(|| {
    vec![
        RepairRule::EscapeAmpersands {
            regex: compile(r"(\\(?:sub){0,2}section\*?)\{([^}]*&[^}]*)\}"),
        },
        RepairRule::pattern(
            r"\\documentclass\{(?:developercv|resume|cv)\}",
            "\\documentclass{article}",
        ),
    ]
});

/// Which rule set a repair pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairProfile {
    /// Output of the resume rewrite.
    Generation,
    /// Output of the edit flow: the generation rules plus sectioning and class fixes.
    Edit,
}

/// Repairs generated LaTeX.
///
/// Order: strip fences, drop non-ASCII, fix option misspellings, template-specific
/// rules, canonical color package, then (edit profile only) the edit rules.
pub fn repair_latex(text: &str, template_id: Option<&str>, profile: RepairProfile) -> String {
    let mut out = apply_all(&FENCE_RULES, text).trim().to_string();
    out = strip_non_ascii(&out);
    out = apply_all(&MISSPELLING_RULES, &out);

    if let Some(rules) = template_id.and_then(|id| TEMPLATE_RULES.get(id)) {
        out = apply_all(rules, &out);
    }

    out = apply_all(&COLOR_PACKAGE_RULES, &out);

    if profile == RepairProfile::Edit {
        out = apply_all(&EDIT_RULES, &out);
    }

    out
}

fn apply_all(rules: &[RepairRule], text: &str) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

/// `&` → `\&` unless already escaped.
fn escape_bare_ampersands(arg: &str) -> Cow<'_, str> {
    if !arg.contains('&') {
        return Cow::Borrowed(arg);
    }
    let mut out = String::with_capacity(arg.len() + 4);
    let mut prev = None;
    for c in arg.chars() {
        if c == '&' && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    Cow::Owned(out)
}
