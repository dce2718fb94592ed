//! Removal of protocol and metadata residue from reconstructed reply text.
//!
//! Cleaning is an ordered list of named passes. Structural removals run
//! before the generic bracket/quote collapse so that fragments are removed
//! whole instead of being half-stripped. Every pass only deletes text, and
//! [`sanitize`] repeats the list until nothing changes, which makes it
//! idempotent.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// One named cleaning step.
#[derive(Clone, Copy)]
pub struct SanitizePass {
    pub name: &'static str,
    apply: for<'a> fn(&'a str) -> Cow<'a, str>,
}

impl SanitizePass {
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        (self.apply)(text)
    }
}

impl std::fmt::Debug for SanitizePass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SanitizePass").field(&self.name).finish()
    }
}

const PASSES: &[SanitizePass] = &[
    SanitizePass {
        name: "entity_objects",
        apply: entity_objects,
    },
    SanitizePass {
        name: "entity_arrays",
        apply: entity_arrays,
    },
    SanitizePass {
        name: "indexed_reference_remnants",
        apply: indexed_reference_remnants,
    },
    SanitizePass {
        name: "citation_markers",
        apply: citation_markers,
    },
    SanitizePass {
        name: "bracket_quote_runs",
        apply: bracket_quote_runs,
    },
    SanitizePass {
        name: "dangling_conjunction",
        apply: dangling_conjunction,
    },
    SanitizePass {
        name: "excess_newlines",
        apply: excess_newlines,
    },
    SanitizePass {
        name: "space_runs",
        apply: space_runs,
    },
    SanitizePass {
        name: "trim",
        apply: trim,
    },
];

pub fn passes() -> &'static [SanitizePass] {
    PASSES
}

pub fn sanitize(text: &str) -> String {
    let mut current = run_passes(text);
    loop {
        let next = run_passes(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn run_passes(text: &str) -> String {
    PASSES
        .iter()
        .fold(text.to_string(), |acc, pass| match pass.apply(&acc) {
            Cow::Borrowed(_) => acc,
            Cow::Owned(changed) => changed,
        })
}

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("sanitizer pattern"))
}

/// `{"selections": ...}`, `{"type": "product", ...}` and similar objects.
fn entity_objects(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(
        &RE,
        r#"(?i)\{[^{}\n]*"(?:selections|products?|entit(?:y|ies))"[^{}\n]*\},?"#,
    )
    .replace_all(text, "")
}

/// `entity[...]` markup, `["turn0product3","Name"]` pairs, bare turn
/// reference arrays, and arrays tagged `"product"`/`"entity"`.
fn entity_arrays(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(
        &RE,
        concat!(
            r#"(?i)\bentity\s*\[[^\[\]\n]*\]"#,
            r#"|\["[^"\n]*","[^"\n]*"\],?\s*"#,
            r#"|\["turn\d+[^"\]]*"(?:,"[^"\n]*")*\],?\s*"#,
            r#"|\["turn\d+[^"\]]*\]?,?\s*"#,
            r#"|\[[^\[\]\n]*"(?:product|entity)"[^\[\]\n]*\],?\s*"#,
        ),
    )
    .replace_all(text, "")
}

/// `product3","Name"],` left over once the surrounding array is gone.
fn indexed_reference_remnants(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r#"(?i)product\d+","[^"]*"\],?\s*"#).replace_all(text, "")
}

/// `【turn0search1†source】` and private-use `\u{e200}cite\u{e202}...\u{e201}`.
fn citation_markers(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(
        &RE,
        r"【[^】\n]*】|\x{E200}[^\x{E201}]*\x{E201}|[\x{E200}-\x{E2FF}]",
    )
    .replace_all(text, "")
}

fn bracket_quote_runs(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r#"[\[\]"]{2,}"#).replace_all(text, "")
}

/// A lone "For" ending a line once the list it introduced was removed.
fn dangling_conjunction(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"(?m)[ \t]*(?:\bFor[ \t]*)+$").replace_all(text, "")
}

fn excess_newlines(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\n{3,}").replace_all(text, "\n\n")
}

fn space_runs(text: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r" {2,}").replace_all(text, " ")
}

fn trim(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim();
    if trimmed.len() == text.len() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(trimmed.to_string())
    }
}
