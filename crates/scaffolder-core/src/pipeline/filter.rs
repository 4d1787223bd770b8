//! File filter rules and the filter stage

use super::condition::Condition;
use super::sequence::{fan_out, FanOutError};
use crate::error::{GenerateError, SchemaError};
use crate::metadata::{FileCollection, Metadata};
use glob::{MatchOptions, Pattern};
use indexmap::IndexMap;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;

/// `*` stays within one path segment, `**` crosses segments, dotfiles match
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Remove files matching `glob` unless `when` holds
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub glob: String,
    pub when: Condition,
    patterns: Vec<Pattern>,
}

impl FilterRule {
    /// Compile a glob. Brace sets (`src/{a,b}.js`) expand into one pattern
    /// per alternative.
    pub fn new(glob: &str, when: Condition) -> Result<Self, SchemaError> {
        let patterns = expand_braces(glob)?
            .iter()
            .map(|alternative| {
                Pattern::new(alternative).map_err(|source| SchemaError::Glob {
                    pattern: glob.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            glob: glob.to_string(),
            when,
            patterns,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(path, MATCH_OPTIONS))
    }

    /// Paths this rule removes given the current metadata
    fn rejected<'p>(&self, paths: &[&'p str], metadata: &Metadata) -> Vec<&'p str> {
        if self.when.evaluate(metadata) {
            return Vec::new();
        }
        paths.iter().copied().filter(|p| self.matches(p)).collect()
    }
}

/// Expand the first brace set of `glob` and recurse into each alternative.
/// A set without a top-level comma is literal text.
fn expand_braces(glob: &str) -> Result<Vec<String>, SchemaError> {
    let Some(open) = glob.find('{') else {
        return Ok(vec![glob.to_string()]);
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut commas = Vec::new();
    for (i, c) in glob[open..].char_indices() {
        let at = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(at);
                    break;
                }
            }
            ',' if depth == 1 => commas.push(at),
            _ => {}
        }
    }
    let close = close.ok_or_else(|| SchemaError::UnclosedBrace(glob.to_string()))?;

    let prefix = &glob[..open];
    let suffix = &glob[close + 1..];

    if commas.is_empty() {
        let literal = &glob[..=close];
        return Ok(expand_braces(suffix)?
            .into_iter()
            .map(|rest| format!("{}{}", literal, rest))
            .collect());
    }

    let mut bounds = vec![open];
    bounds.extend(commas);
    bounds.push(close);

    let mut expanded = Vec::new();
    for pair in bounds.windows(2) {
        let alternative = &glob[pair[0] + 1..pair[1]];
        expanded.extend(expand_braces(&format!("{}{}{}", prefix, alternative, suffix))?);
    }
    Ok(expanded)
}

/// Filter rules in declaration order.
///
/// In a schema each rule is keyed by its glob and written either as a bare
/// condition (`"test/**": "unitTests"`) or as `{ "when": "unitTests" }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "IndexMap<String, RuleDef>")]
pub struct FilterRules(Vec<FilterRule>);

/// Schema form of a single rule
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RuleDef {
    Bare(Condition),
    Detailed { when: Condition },
}

impl TryFrom<IndexMap<String, RuleDef>> for FilterRules {
    type Error = SchemaError;

    fn try_from(defs: IndexMap<String, RuleDef>) -> Result<Self, Self::Error> {
        defs.into_iter()
            .map(|(glob, def)| {
                let when = match def {
                    RuleDef::Bare(when) | RuleDef::Detailed { when } => when,
                };
                FilterRule::new(&glob, when)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl FilterRules {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self(rules)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterRule> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Remove every file matched by a rule whose condition is false.
///
/// Rules only read metadata and removal is monotonic, so a file survives only
/// if every rule matching it holds; rule order does not matter. Returns the
/// number of files removed.
pub async fn filter(
    files: &mut FileCollection,
    rules: &FilterRules,
    metadata: &Metadata,
    cancel: &CancellationToken,
) -> Result<usize, GenerateError> {
    if rules.is_empty() {
        return Ok(0);
    }

    let doomed: Vec<String> = {
        let paths: Vec<&str> = files.paths().collect();
        let paths = paths.as_slice();

        let per_rule = fan_out(rules.iter(), cancel, |rule| async move {
            Ok::<_, Infallible>(rule.rejected(paths, metadata))
        })
        .await
        .map_err(|err| match err {
            FanOutError::Failed { error, .. } => match error {},
            FanOutError::Cancelled { .. } => GenerateError::Cancelled,
        })?;

        per_rule.into_iter().flatten().map(str::to_string).collect()
    };

    let mut removed = 0;
    for path in doomed {
        if files.remove(&path).is_some() {
            tracing::debug!(path = %path, "filtered out");
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rules(source: &str) -> FilterRules {
        serde_json::from_str(source).unwrap()
    }

    fn metadata(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    fn files(paths: &[&str]) -> FileCollection {
        paths.iter().map(|p| (*p, "")).collect()
    }

    fn remaining(files: &FileCollection) -> Vec<&str> {
        files.paths().collect()
    }

    #[tokio::test]
    async fn test_false_condition_removes_matches() {
        let rules = rules(r#"{ "test/**": { "when": "useTests" } }"#);
        let mut files = files(&["README.md", "src/main.js", "test/unit.spec", "test/e2e/run.js"]);

        let removed = filter(
            &mut files,
            &rules,
            &metadata(json!({ "useTests": false })),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(remaining(&files), vec!["README.md", "src/main.js"]);
    }

    #[tokio::test]
    async fn test_true_condition_keeps_matches() {
        let rules = rules(r#"{ "test/**": "useTests" }"#);
        let mut files = files(&["test/unit.spec"]);

        let removed = filter(
            &mut files,
            &rules,
            &metadata(json!({ "useTests": true })),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(removed, 0);
        assert!(files.contains("test/unit.spec"));
    }

    #[tokio::test]
    async fn test_glob_matching_nothing_is_noop() {
        let rules = rules(r#"{ "docs/**": "docs" }"#);
        let mut files = files(&["a.txt"]);

        let removed = filter(&mut files, &rules, &Metadata::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(removed, 0);
        assert_eq!(remaining(&files), vec!["a.txt"]);
    }

    #[tokio::test]
    async fn test_overlapping_rules_remove_if_any_is_false() {
        let rules = rules(
            r#"{
                "src/**": "keepSources",
                "src/*.ts": "typescript"
            }"#,
        );
        let mut files = files(&["src/main.ts", "src/main.js"]);

        filter(
            &mut files,
            &rules,
            &metadata(json!({ "keepSources": true, "typescript": false })),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(remaining(&files), vec!["src/main.js"]);
    }

    #[test]
    fn test_glob_semantics() {
        let rule = FilterRule::new("*.md", Condition::parse("x").unwrap()).unwrap();
        assert!(rule.matches("README.md"));
        assert!(!rule.matches("docs/guide.md"));

        let dot = FilterRule::new("**/.eslintrc*", Condition::parse("x").unwrap()).unwrap();
        assert!(dot.matches("packages/app/.eslintrc.json"));
    }

    #[test]
    fn test_brace_sets_expand() {
        let when = Condition::parse("x").unwrap();

        let rule = FilterRule::new("src/{a,b}.js", when.clone()).unwrap();
        assert!(rule.matches("src/a.js"));
        assert!(rule.matches("src/b.js"));
        assert!(!rule.matches("src/c.js"));

        let nested = FilterRule::new("{lib,test/{unit,e2e}}/*.ts", when.clone()).unwrap();
        assert!(nested.matches("lib/index.ts"));
        assert!(nested.matches("test/e2e/app.ts"));
        assert!(!nested.matches("test/index.ts"));

        let literal = FilterRule::new("docs/{draft}.md", when).unwrap();
        assert!(literal.matches("docs/{draft}.md"));
    }

    #[tokio::test]
    async fn test_brace_rule_removes_every_alternative() {
        let rules = rules(r#"{ "src/{router,store}/**": "extras" }"#);
        let mut files = files(&["src/router/index.js", "src/store/index.js", "src/main.js"]);

        let removed = filter(&mut files, &rules, &Metadata::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(remaining(&files), vec!["src/main.js"]);
    }

    #[test]
    fn test_unclosed_brace_rejected_at_load() {
        let parsed: Result<FilterRules, _> = serde_json::from_str(r#"{ "src/{a,b.js": "x" }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_invalid_glob_rejected_at_load() {
        let parsed: Result<FilterRules, _> = serde_json::from_str(r#"{ "src/[": "x" }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_rule_order_preserved() {
        let rules = rules(r#"{ "b/**": "b", "a/**": "a" }"#);
        let globs: Vec<&str> = rules.iter().map(|r| r.glob.as_str()).collect();
        assert_eq!(globs, vec!["b/**", "a/**"]);
    }
}
