//! Row filters for `--where` expressions.
//!
//! The grammar is a conjunction of comparisons:
//!
//! ```text
//! filter  := clause ( "and" clause )*
//! clause  := attr op literal
//! op      := "=" | "!=" | "<" | "<=" | ">" | ">="
//! literal := 'string' | "string" | number | true | false | null
//! ```
//!
//! Numbers compare numerically and strings lexicographically. A row without
//! the attribute fails every clause except `attr = null`.

use anyhow::Result;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;

use crate::core::FixtureError;

/// Comparison operator of a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(op)
    }
}

/// One `attr OP literal` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub attr: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Clause {
    fn matches(&self, row: &IndexMap<String, Value>) -> bool {
        let actual = row.get(&self.attr).unwrap_or(&Value::Null);
        match self.op {
            CompareOp::Eq => values_equal(actual, &self.value),
            CompareOp::Ne => !values_equal(actual, &self.value),
            CompareOp::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            CompareOp::Le => {
                matches!(compare(actual, &self.value), Some(Ordering::Less | Ordering::Equal))
            }
            CompareOp::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            CompareOp::Ge => {
                matches!(compare(actual, &self.value), Some(Ordering::Greater | Ordering::Equal))
            }
        }
    }
}

/// A parsed `--where` expression. The empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Parse a filter expression.
    ///
    /// A blank expression yields the match-all filter. Anything that does not
    /// follow the grammar is a [`FixtureError::Usage`] error.
    ///
    /// ```rust
    /// use fixturegen::handler::Filter;
    /// use indexmap::IndexMap;
    /// use serde_json::json;
    ///
    /// let filter = Filter::parse("price >= 10 and name != 'parka'")?;
    /// let row: IndexMap<String, serde_json::Value> =
    ///     [("price".to_string(), json!(12)), ("name".to_string(), json!("jersey"))].into();
    /// assert!(filter.matches(&row));
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn parse(expr: &str) -> Result<Self> {
        let clause_re = Regex::new(
            r#"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(<=|>=|!=|=|<|>)\s*('(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|true|false|null)\s*"#,
        )?;
        let and_re = Regex::new(r"^(?i:and)\s+")?;

        let mut clauses = Vec::new();
        let mut rest = expr.trim();
        if rest.is_empty() {
            return Ok(Self::default());
        }

        loop {
            let caps = clause_re.captures(rest).ok_or_else(|| {
                FixtureError::usage(format!("invalid filter expression near '{rest}'"))
            })?;
            let whole = caps.get(0).map_or(0, |m| m.end());
            let attr = caps[1].to_string();
            let op = CompareOp::parse(&caps[2])
                .ok_or_else(|| FixtureError::usage(format!("unknown operator '{}'", &caps[2])))?;
            let value = parse_literal(&caps[3])?;
            clauses.push(Clause {
                attr,
                op,
                value,
            });

            rest = &rest[whole..];
            if rest.is_empty() {
                break;
            }
            let Some(and) = and_re.find(rest) else {
                return Err(FixtureError::usage(format!(
                    "expected 'and' between filter clauses, found '{rest}'"
                ))
                .into());
            };
            rest = &rest[and.end()..];
        }

        Ok(Self {
            clauses,
        })
    }

    /// Whether every clause holds for `row`.
    pub fn matches(&self, row: &IndexMap<String, Value>) -> bool {
        self.clauses.iter().all(|clause| clause.matches(row))
    }

    /// Parsed clauses, in source order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether this filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

fn parse_literal(literal: &str) -> Result<Value> {
    if literal.starts_with(['\'', '"']) {
        let inner = &literal[1..literal.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(escaped) => out.push(escaped),
                    None => out.push('\\'),
                }
            } else {
                out.push(c);
            }
        }
        return Ok(Value::String(out));
    }

    Ok(serde_json::from_str(literal)
        .map_err(|e| FixtureError::usage(format!("invalid filter literal '{literal}': {e}")))?)
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Some(Ordering::Equal),
        _ => actual == expected,
    }
}

/// Integers compare exactly; anything involving a float compares as `f64`.
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    fn integer(n: &Number) -> Option<i128> {
        n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))
    }

    match (integer(a), integer(b)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
