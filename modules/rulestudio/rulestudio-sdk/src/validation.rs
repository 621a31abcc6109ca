//! SQL validation for rule queries.
//!
//! The engine's `POST /rules/validate` is asked first. Engines without that
//! endpoint, or that cannot be reached, fall through to local heuristics,
//! which always produce a verdict. Heuristic errors block submission;
//! warnings are advisory only.

use std::sync::LazyLock;

use http::StatusCode;
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};

use crate::client::EngineClient;
use crate::error::{ClientError, Result};
use crate::fallback::{Attempt, run_chain};

/// Which validator produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSource {
    /// Engine validation endpoint
    Server,
    /// Local checks
    Heuristic,
}

/// Outcome of validating a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub source: ValidationSource,
    /// Validators tried, in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<Attempt<ValidationSource>>,
}

impl ValidationReport {
    fn verdict(source: ValidationSource, errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            source,
            attempts: Vec::new(),
        }
    }
}

/// Default order: engine first, then local heuristics.
pub const DEFAULT_CHAIN: [ValidationSource; 2] =
    [ValidationSource::Server, ValidationSource::Heuristic];

/// Validate `sql`, degrading from the engine to local checks.
///
/// Never fails: the heuristic step always answers.
pub async fn validate_sql(client: &EngineClient, sql: &str) -> ValidationReport {
    validate_with_chain(client, sql, &DEFAULT_CHAIN).await
}

/// Validate with an explicit strategy order.
pub async fn validate_with_chain(
    client: &EngineClient,
    sql: &str,
    chain: &[ValidationSource],
) -> ValidationReport {
    let result = run_chain(chain, |source| async move {
        match source {
            ValidationSource::Server => server_check(client, sql).await,
            ValidationSource::Heuristic => Ok(heuristic_check(sql)),
        }
    })
    .await;

    let attempts = result.attempts;
    match result.outcome {
        Ok((_, mut report)) => {
            report.attempts = attempts;
            report
        }
        // Only reachable when the chain has no heuristic step.
        Err(e) => ValidationReport {
            valid: false,
            errors: vec![format!("validation unavailable: {}", e.message())],
            warnings: Vec::new(),
            source: chain.last().copied().unwrap_or(ValidationSource::Server),
            attempts,
        },
    }
}

/// Ask the engine.
///
/// A 2xx answer or a 400/422 rejection is a verdict. Anything else means
/// the endpoint is unavailable and is returned as an error so the chain
/// moves on. A verdict carries the local advisory warnings; they never
/// change `valid`.
///
/// # Errors
/// Returns the transport error when the engine gives no verdict.
pub async fn server_check(client: &EngineClient, sql: &str) -> Result<ValidationReport> {
    let probe = json!({
        "id": "__rulestudio_validate__",
        "sql": sql,
        "actions": [{"log": {}}],
    });

    match client.rules().validate(&probe).await {
        Ok(body) => {
            let rejected = body.get("valid").and_then(Value::as_bool) == Some(false);
            let errors = if rejected {
                vec![
                    body.get("error")
                        .or_else(|| body.get("message"))
                        .and_then(Value::as_str)
                        .unwrap_or("rejected by engine")
                        .to_string(),
                ]
            } else {
                Vec::new()
            };
            Ok(ValidationReport::verdict(
                ValidationSource::Server,
                errors,
                advisory_warnings(sql),
            ))
        }
        Err(e) if is_verdict(&e) => Ok(ValidationReport::verdict(
            ValidationSource::Server,
            vec![e.message()],
            advisory_warnings(sql),
        )),
        Err(e) => Err(e),
    }
}

fn is_verdict(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::Api { status, .. } | ClientError::Http { status, .. }
            if *status == StatusCode::BAD_REQUEST || *status == StatusCode::UNPROCESSABLE_ENTITY
    )
}

static SELECT_START: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^\s*SELECT\b"));
static FROM_WORD: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bFROM\b"));
static SELECT_STAR: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bSELECT\s+\*"));
static GROUP_BY: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bGROUP\s+BY\b"));
static JOIN_WORD: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\b(CROSS\s+)?JOIN\b"));
static JOIN_CONDITION: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\b(ON|USING)\b"));

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

/// Local checks.
///
/// Blocking: must start with `SELECT`, must contain `FROM`, parentheses
/// must balance. Advisory: `SELECT *` with `GROUP BY`, and a `JOIN` with no
/// `ON`/`USING` condition. Quoted text is ignored by every check.
#[must_use]
pub fn heuristic_check(sql: &str) -> ValidationReport {
    let masked = mask_quoted(sql);
    let mut errors = Vec::new();

    if masked.trim().is_empty() {
        errors.push("SQL statement is empty".to_string());
        return ValidationReport::verdict(ValidationSource::Heuristic, errors, Vec::new());
    }

    if !SELECT_START.is_match(&masked) {
        errors.push("SQL must start with SELECT".to_string());
    }
    if !FROM_WORD.is_match(&masked) {
        errors.push("SQL must contain a FROM clause".to_string());
    }
    if let Some(problem) = paren_balance(&masked) {
        errors.push(problem);
    }

    ValidationReport::verdict(ValidationSource::Heuristic, errors, masked_warnings(&masked))
}

/// Advisory findings only: `SELECT *` with `GROUP BY`, and a `JOIN` with no
/// condition.
#[must_use]
pub fn advisory_warnings(sql: &str) -> Vec<String> {
    masked_warnings(&mask_quoted(sql))
}

fn masked_warnings(masked: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    if SELECT_STAR.is_match(masked) && GROUP_BY.is_match(masked) {
        warnings.push(
            "SELECT * combined with GROUP BY selects columns that are not aggregated".to_string(),
        );
    }
    if has_unconditioned_join(masked) {
        warnings.push("JOIN without ON condition produces a cartesian product".to_string());
    }
    warnings
}

fn paren_balance(sql: &str) -> Option<String> {
    let mut depth: i64 = 0;
    for (pos, ch) in sql.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Some(format!(
                        "Unbalanced parentheses: unexpected ')' at position {pos}"
                    ));
                }
            }
            _ => {}
        }
    }
    (depth != 0).then(|| format!("Unbalanced parentheses: {depth} unclosed '('"))
}

fn has_unconditioned_join(sql: &str) -> bool {
    let joins: Vec<_> = JOIN_WORD.captures_iter(sql).collect();
    joins.iter().enumerate().any(|(i, caps)| {
        if caps.get(1).is_some() {
            return false;
        }
        let Some(whole) = caps.get(0) else {
            return false;
        };
        let end = joins
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(sql.len(), |m| m.start());
        !JOIN_CONDITION.is_match(&sql[whole.end()..end])
    })
}

/// Replace the content of quoted literals and identifiers with spaces.
fn mask_quoted(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    for ch in sql.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                out.push(ch);
            }
            Some(_) => out.push(' '),
            None => {
                if matches!(ch, '\'' | '"' | '`') {
                    quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_is_clean() {
        let r = heuristic_check("SELECT * FROM s");
        assert!(r.valid);
        assert!(r.errors.is_empty());
        assert!(r.warnings.is_empty());
        assert_eq!(r.source, ValidationSource::Heuristic);
    }

    #[test]
    fn non_select_is_blocked() {
        let r = heuristic_check("UPDATE s SET x=1");
        assert!(!r.valid);
        assert!(r.errors.iter().any(|e| e.contains("SELECT")));
    }

    #[test]
    fn join_without_on_warns_but_passes() {
        let r = heuristic_check("SELECT * FROM a JOIN b");
        assert!(r.valid);
        assert_eq!(r.warnings.len(), 1);
        assert!(r.warnings[0].contains("cartesian"));
    }

    #[test]
    fn join_with_on_and_cross_join_do_not_warn() {
        assert!(heuristic_check("SELECT a.x FROM a INNER JOIN b ON a.id = b.id")
            .warnings
            .is_empty());
        assert!(heuristic_check("SELECT * FROM a CROSS JOIN b").warnings.is_empty());
        let r = heuristic_check("SELECT * FROM a LEFT JOIN b ON a.k = b.k JOIN c");
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn unbalanced_parentheses() {
        let r = heuristic_check("SELECT * FROM s WHERE (a");
        assert!(!r.valid);
        assert!(r.errors.iter().any(|e| e.contains("Unbalanced")));

        let r = heuristic_check("SELECT count(*)) FROM s");
        assert!(r.errors.iter().any(|e| e.contains("unexpected ')'")));
    }

    #[test]
    fn quoted_text_is_ignored() {
        let r = heuristic_check("SELECT * FROM s WHERE name = 'a (b' AND note = \"join\"");
        assert!(r.valid, "{:?}", r.errors);
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn select_star_with_group_by_warns() {
        let r = heuristic_check("SELECT * FROM s GROUP BY TumblingWindow(ss, 10)");
        assert!(r.valid);
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert!(heuristic_check("  select a from s").valid);
        assert!(!heuristic_check("SELECT 1").valid);
    }
}
