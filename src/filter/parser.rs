// src/filter/parser.rs

//! Filter expression syntax.
//!
//! ```text
//! term   := ["!"] ["^"] ["..."] target ["..."]
//! target := "[" ref "]"          change-set predicate (e.g. [main...HEAD])
//!         | "{" glob "}"         unit path glob
//!         | "name=" glob         glob on the last path component
//!         | "external=" bool
//!         | "flag=" name         every unit while the flag is enabled
//!         | glob                 unit path glob
//! ```
//!
//! - leading `...`: add transitive dependents of the matches
//! - trailing `...`: add transitive dependencies of the matches
//! - `^`: drop the matches themselves after traversal
//! - `!`: subtract the term from the overall selection

use globset::{GlobBuilder, GlobMatcher};

use crate::errors::{Result, RundagError};

const TRAVERSE: &str = "...";

/// Compiled unit glob.
#[derive(Debug, Clone)]
pub struct UnitPattern {
    raw: String,
    matcher: GlobMatcher,
}

impl UnitPattern {
    pub fn new(raw: &str) -> std::result::Result<Self, String> {
        let normalized = normalize_path(raw);
        if normalized.is_empty() {
            return Err("empty unit pattern".to_string());
        }
        let glob = GlobBuilder::new(normalized)
            .literal_separator(true)
            .build()
            .map_err(|e| format!("invalid glob '{raw}': {e}"))?;
        Ok(Self {
            raw: raw.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.matcher.is_match(normalize_path(candidate))
    }
}

impl PartialEq for UnitPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

/// Strip a leading `./` and trailing `/` so `./apps/vpc/` and `apps/vpc` agree.
pub fn normalize_path(p: &str) -> &str {
    let p = p.trim();
    let p = p.strip_prefix("./").unwrap_or(p);
    p.trim_end_matches('/')
}

/// What a term matches before traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Path(UnitPattern),
    Name(UnitPattern),
    External(bool),
    Flag(String),
    Changed(String),
}

/// A single parsed filter term.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    pub raw: String,
    pub negated: bool,
    pub exclude_target: bool,
    pub dependents: bool,
    pub dependencies: bool,
    pub target: Target,
}

pub fn parse_filter(expr: &str) -> Result<FilterExpr> {
    let fail = |message: &str| RundagError::FilterParse {
        expr: expr.to_string(),
        message: message.to_string(),
    };

    let mut rest = expr.trim();
    if rest.is_empty() {
        return Err(fail("empty expression"));
    }

    let negated = match rest.strip_prefix('!') {
        Some(r) => {
            rest = r;
            true
        }
        None => false,
    };
    let exclude_target = match rest.strip_prefix('^') {
        Some(r) => {
            rest = r;
            true
        }
        None => false,
    };
    let dependents = match rest.strip_prefix(TRAVERSE) {
        Some(r) => {
            rest = r;
            true
        }
        None => false,
    };

    let (target, dependencies) = match rest.chars().next() {
        Some('[') => {
            let (inner, tail) = split_delimited(rest, ']').ok_or_else(|| fail("unclosed '['"))?;
            let reference = inner.trim();
            if reference.is_empty() {
                return Err(fail("empty change-set reference"));
            }
            if reference.starts_with('-') {
                return Err(fail("change-set reference may not start with '-'"));
            }
            (Target::Changed(reference.to_string()), parse_tail(tail).ok_or_else(|| fail("unexpected text after ']'"))?)
        }
        Some('{') => {
            let (inner, tail) = split_delimited(rest, '}').ok_or_else(|| fail("unclosed '{'"))?;
            let pattern = UnitPattern::new(inner).map_err(|e| fail(&e))?;
            (Target::Path(pattern), parse_tail(tail).ok_or_else(|| fail("unexpected text after '}'"))?)
        }
        Some(_) => {
            let (token, dependencies) = match rest.strip_suffix(TRAVERSE) {
                Some(t) => (t, true),
                None => (rest, false),
            };
            (parse_token(token).map_err(|e| fail(&e))?, dependencies)
        }
        None => return Err(fail("missing target")),
    };

    if exclude_target && !dependents && !dependencies {
        return Err(fail("'^' requires a '...' traversal"));
    }

    Ok(FilterExpr {
        raw: expr.to_string(),
        negated,
        exclude_target,
        dependents,
        dependencies,
        target,
    })
}

pub fn parse_filters<S: AsRef<str>>(exprs: &[S]) -> Result<Vec<FilterExpr>> {
    exprs.iter().map(|e| parse_filter(e.as_ref())).collect()
}

/// Split `"[inner]tail"` at the first `close`.
fn split_delimited(s: &str, close: char) -> Option<(&str, &str)> {
    let end = s.find(close)?;
    Some((&s[1..end], &s[end + close.len_utf8()..]))
}

/// Whatever follows a delimited target may only be a traversal marker.
fn parse_tail(tail: &str) -> Option<bool> {
    match tail.trim() {
        "" => Some(false),
        TRAVERSE => Some(true),
        _ => None,
    }
}

fn parse_token(token: &str) -> std::result::Result<Target, String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("missing target".to_string());
    }
    if token.contains(TRAVERSE) {
        return Err("misplaced '...'".to_string());
    }

    let Some((key, value)) = token.split_once('=') else {
        return Ok(Target::Path(UnitPattern::new(token)?));
    };

    let value = value.trim();
    match key.trim() {
        "name" => Ok(Target::Name(UnitPattern::new(value)?)),
        "path" => Ok(Target::Path(UnitPattern::new(value)?)),
        "external" => match value {
            "true" => Ok(Target::External(true)),
            "false" => Ok(Target::External(false)),
            other => Err(format!("external= expects true or false, got '{other}'")),
        },
        "flag" if !value.is_empty() => Ok(Target::Flag(value.to_string())),
        "flag" => Err("flag= expects a flag name".to_string()),
        other => Err(format!("unknown attribute '{other}'")),
    }
}
