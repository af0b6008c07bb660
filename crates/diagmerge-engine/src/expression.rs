//! Mapping expression expansion.
//!
//! An expression such as
//!
//! ```text
//! (m01s03i236[lbproc=128] - TDEGC) * land_class_mean(m01s03i395, mask=areacella) + evspsbl_0
//! ```
//!
//! is split into four token classes:
//!
//! - atmosphere codes, with or without bracketed attributes
//! - function applications (`name(`), dropped
//! - operators and separators, dropped
//! - identifiers; lowercase ones that are not keyword arguments, masks or
//!   `_0` placeholders are residual sub-diagnostics
//!
//! Numeric literals, quoted strings and all-uppercase constants carry no
//! diagnostic and are ignored.

use diagmerge_types::{AtmosphereCode, ResolveError, ResolveResult};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static BRACKETED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"m\d{2}s\d{2}i\d{3}\[.*?\]").expect("bracketed code pattern is valid")
});

static BARE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"m\d{2}s\d{2}i\d{3}").expect("bare code pattern is valid"));

static FUNCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9A-Za-z_]+\(").expect("function pattern is valid"));

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+(?:\.\d*)?(?:[eE][-+]?\d+)?\b|\.\d+(?:[eE][-+]?\d+)?")
        .expect("number pattern is valid")
});

static QUALIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("qualifier pattern is valid"));

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

const OPERATORS: [char; 7] = ['*', ',', '+', '-', '/', '(', ')'];

/// What one mapping expression refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Atmosphere codes: bracketed ones first, then bare, each in source order.
    pub codes: Vec<AtmosphereCode>,
    /// Sub-diagnostics still to be resolved.
    pub residuals: BTreeSet<String>,
    /// The expression names only the diagnostic itself.
    pub terminal: bool,
}

/// Expands the mapping expression of `name`.
pub fn resolve_expression(name: &str, expression: &str) -> ResolveResult<Expansion> {
    let mut text = expression.replace(['\n', '\r', '\t'], " ");
    let mut codes: Vec<AtmosphereCode> = Vec::new();

    for pattern in [&*BRACKETED_CODE_RE, &*BARE_CODE_RE] {
        for found in pattern.find_iter(&text) {
            let code: AtmosphereCode =
                found
                    .as_str()
                    .parse()
                    .map_err(|e: ResolveError| ResolveError::MalformedExpression {
                        name: name.to_string(),
                        detail: e.to_string(),
                    })?;
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        text = pattern.replace_all(&text, " ").into_owned();
    }

    text = FUNCTION_RE.replace_all(&text, " ").into_owned();
    // Qualifiers go before numbers so `[depth<2000]` is removed whole.
    text = QUALIFIER_RE.replace_all(&text, "").into_owned();
    text = NUMBER_RE.replace_all(&text, " ").into_owned();
    let text: String = text
        .chars()
        .map(|c| if OPERATORS.contains(&c) { ' ' } else { c })
        .collect();

    let mut residuals = BTreeSet::new();
    for token in text.split_whitespace() {
        if token.starts_with('\'') || token.starts_with('"') {
            continue;
        }
        if !token.chars().any(|c| c.is_ascii_lowercase()) {
            continue;
        }
        if token.contains('=') || token.contains("mask") || token.ends_with("_0") {
            continue;
        }
        if !IDENTIFIER_RE.is_match(token) {
            return Err(ResolveError::MalformedExpression {
                name: name.to_string(),
                detail: format!("unrecognised token '{}'", token),
            });
        }
        residuals.insert(token.to_string());
    }

    let terminal = codes.is_empty() && residuals.len() == 1 && residuals.contains(name);
    Ok(Expansion {
        codes,
        residuals,
        terminal,
    })
}
