//! Catalog label selectors.
//!
//! A selector is a conjunction of exact label matches and set-based
//! expressions. The textual form accepted by [`LabelSelector::from_str`] is a
//! comma separated list of terms:
//!
//! | Term | Meaning |
//! |---|---|
//! | `tier=community` / `tier==community` | label equals value |
//! | `env!=dev` | label is absent or differs |
//! | `region in (us,eu)` | label is one of the values |
//! | `region notin (us,eu)` | label is absent or none of the values |
//! | `legacy` | label is present |
//! | `!legacy` | label is absent |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static LABEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").unwrap());
static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});
static SET_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(in|notin)\s*\((.*)\)$").unwrap());

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRequirement {
    pub key: String,
    pub operator: SelectorOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

impl SelectorRequirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            SelectorOperator::In => value.is_some_and(|v| self.values.contains(v)),
            SelectorOperator::NotIn => value.is_none_or(|v| !self.values.contains(v)),
            SelectorOperator::Exists => value.is_some(),
            SelectorOperator::DoesNotExist => value.is_none(),
        }
    }
}

/// Selects catalogs by their labels. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub match_expressions: Vec<SelectorRequirement>,
}

impl LabelSelector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    pub fn with_expression(
        mut self,
        key: impl Into<String>,
        operator: SelectorOperator,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.match_expressions.push(SelectorRequirement {
            key: key.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Check keys, values and operator arity.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.match_labels {
            validate_key(key)?;
            validate_value(key, value)?;
        }
        for req in &self.match_expressions {
            validate_key(&req.key)?;
            match req.operator {
                SelectorOperator::In | SelectorOperator::NotIn if req.values.is_empty() => {
                    return Err(invalid(format!(
                        "values: Required value: must be specified when `operator` is 'In' or 'NotIn' (key {:?})",
                        req.key
                    )));
                }
                SelectorOperator::Exists | SelectorOperator::DoesNotExist
                    if !req.values.is_empty() =>
                {
                    return Err(invalid(format!(
                        "values: Forbidden: may not be specified when `operator` is 'Exists' or 'DoesNotExist' (key {:?})",
                        req.key
                    )));
                }
                _ => {}
            }
            for value in &req.values {
                validate_value(&req.key, value)?;
            }
        }
        Ok(())
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
            && self.match_expressions.iter().all(|r| r.matches(labels))
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidSelector { reason }
}

fn validate_key(key: &str) -> Result<()> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    let bad_prefix = prefix.is_some_and(|p| {
        p.is_empty() || p.len() > MAX_PREFIX_LEN || !LABEL_PREFIX.is_match(p)
    });
    if bad_prefix {
        return Err(invalid(format!("key {key:?}: prefix must be a DNS subdomain")));
    }
    if name.is_empty() || name.len() > MAX_NAME_LEN || !LABEL_NAME.is_match(name) {
        return Err(invalid(format!(
            "key {key:?}: name must be at most {MAX_NAME_LEN} alphanumeric characters, '-', '_' or '.', starting and ending with an alphanumeric character"
        )));
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > MAX_NAME_LEN || !LABEL_NAME.is_match(value) {
        return Err(invalid(format!("value {value:?} for key {key:?} is not a valid label value")));
    }
    Ok(())
}

impl FromStr for LabelSelector {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let mut selector = Self::default();
        for term in split_terms(input) {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            if let Some(caps) = SET_TERM.captures(term) {
                let operator = if &caps[2] == "in" {
                    SelectorOperator::In
                } else {
                    SelectorOperator::NotIn
                };
                let values: Vec<String> = caps[3]
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                selector = selector.with_expression(&caps[1], operator, values);
            } else if let Some((key, value)) = term.split_once("!=") {
                selector = selector.with_expression(key.trim(), SelectorOperator::NotIn, [value.trim()]);
            } else if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
                selector = selector.with_label(key.trim(), value.trim());
            } else if let Some(key) = term.strip_prefix('!') {
                selector = selector.with_expression(
                    key.trim(),
                    SelectorOperator::DoesNotExist,
                    Vec::<String>::new(),
                );
            } else {
                selector = selector.with_expression(term, SelectorOperator::Exists, Vec::<String>::new());
            }
        }
        selector.validate()?;
        Ok(selector)
    }
}

/// Split on commas that are not inside parentheses.
fn split_terms(input: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                terms.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&input[start..]);
    terms
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        for req in &self.match_expressions {
            terms.push(match req.operator {
                SelectorOperator::In => format!("{} in ({})", req.key, req.values.join(",")),
                SelectorOperator::NotIn => format!("{} notin ({})", req.key, req.values.join(",")),
                SelectorOperator::Exists => req.key.clone(),
                SelectorOperator::DoesNotExist => format!("!{}", req.key),
            });
        }
        f.write_str(&terms.join(","))
    }
}
