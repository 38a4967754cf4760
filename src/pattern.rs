//! Graph patterns: conjunctions of goals evaluated by a [`crate::store::TripleStore`].
//!
//! Patterns are parsed once (with the pest grammar in `pattern.pest`) and then
//! specialised structurally: [`Pattern::bind`] replaces a variable by a value
//! in the syntax tree, so no value is ever spliced into pattern text.

use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest_derive::Parser;

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, XcatError};
use crate::term::{Value, unescape};

#[derive(Parser)]
#[grammar = "pattern.pest"]
struct PatternParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Var(String),
    Const(Value),
    List(Vec<Term>),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }
    pub fn value(value: impl Into<Value>) -> Self {
        Term::Const(value.into())
    }
    /// The value of a ground term. Lists become list values.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Term::Const(value) => Some(value),
            Term::List(terms) => terms
                .into_iter()
                .map(Term::into_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            Term::Var(_) => None,
        }
    }
    fn bind(&self, variable: &str, value: &Value) -> Term {
        match self {
            Term::Var(name) if name == variable => Term::Const(value.clone()),
            Term::List(terms) => {
                Term::List(terms.iter().map(|t| t.bind(variable, value)).collect())
            }
            other => other.clone(),
        }
    }
    fn collect_variables(&self, variables: &mut Vec<String>) {
        match self {
            Term::Var(name) => {
                if !variables.contains(name) {
                    variables.push(name.clone());
                }
            }
            Term::List(terms) => terms.iter().for_each(|t| t.collect_variables(variables)),
            Term::Const(_) => (),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Var(name) => write!(f, "{}", name),
            Term::Const(value) => write!(f, "{}", value.to_pattern_literal()),
            Term::List(terms) => {
                let rendered: Vec<String> = terms.iter().map(Term::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    name: String,
    args: Vec<Term>,
}

impl Goal {
    pub fn new(name: impl Into<String>, args: Vec<Term>) -> Self {
        Self { name: name.into(), args }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn args(&self) -> &[Term] {
        &self.args
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.args.is_empty() {
            return write!(f, "{}", self.name);
        }
        let rendered: Vec<String> = self.args.iter().map(Term::to_string).collect();
        write!(f, "{}({})", self.name, rendered.join(", "))
    }
}

/// A conjunction of goals. An empty pattern is trivially true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    goals: Vec<Goal>,
    distinct: bool,
}

impl Pattern {
    pub fn parse(text: &str) -> Result<Self> {
        let root = parse_rule(Rule::pattern, text)?;
        let mut fresh = 0usize;
        let mut patterns = build_conjunctions(root, &mut fresh)?;
        Ok(patterns.pop().unwrap_or_default())
    }
    /// Parses a script of conjunctions separated by `;`. Text after a `%`
    /// is a comment up to the end of the line.
    pub fn parse_script(text: &str) -> Result<Vec<Pattern>> {
        let root = parse_rule(Rule::script, text)?;
        let mut fresh = 0usize;
        build_conjunctions(root, &mut fresh)
    }
    pub fn from_goals(goals: Vec<Goal>) -> Self {
        Self { goals, distinct: false }
    }
    /// Joins several patterns into one conjunction, left to right.
    pub fn conjunction(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        let mut joined = Pattern::default();
        for pattern in patterns {
            joined.distinct |= pattern.distinct;
            joined.goals.extend(pattern.goals);
        }
        joined
    }
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }
    pub fn push(&mut self, goal: Goal) {
        self.goals.push(goal);
    }
    pub fn extend(&mut self, goals: impl IntoIterator<Item = Goal>) {
        self.goals.extend(goals);
    }
    /// Asks the store to drop duplicate solutions.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }
    /// Fixes `variable` to `value` everywhere it occurs.
    pub fn bind(&self, variable: &str, value: &Value) -> Pattern {
        Pattern {
            goals: self
                .goals
                .iter()
                .map(|g| Goal {
                    name: g.name.clone(),
                    args: g.args.iter().map(|t| t.bind(variable, value)).collect(),
                })
                .collect(),
            distinct: self.distinct,
        }
    }
    /// Variables in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut variables = Vec::new();
        for goal in &self.goals {
            goal.args.iter().for_each(|t| t.collect_variables(&mut variables));
        }
        variables
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rendered: Vec<String> = self.goals.iter().map(Goal::to_string).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

impl FromStr for Pattern {
    type Err = XcatError;
    fn from_str(s: &str) -> Result<Self> {
        Pattern::parse(s)
    }
}

/// Anything a pattern can be taken from: pattern text or a built pattern.
pub trait IntoPattern {
    fn into_pattern(self) -> Result<Pattern>;
}

impl IntoPattern for Pattern {
    fn into_pattern(self) -> Result<Pattern> {
        Ok(self)
    }
}
impl IntoPattern for &Pattern {
    fn into_pattern(self) -> Result<Pattern> {
        Ok(self.clone())
    }
}
impl IntoPattern for &str {
    fn into_pattern(self) -> Result<Pattern> {
        Pattern::parse(self)
    }
}
impl IntoPattern for String {
    fn into_pattern(self) -> Result<Pattern> {
        Pattern::parse(&self)
    }
}
impl IntoPattern for Goal {
    fn into_pattern(self) -> Result<Pattern> {
        Ok(Pattern::from_goals(vec![self]))
    }
}

/// Reads a ground value from the start of `text`, returning it with the rest
/// of the text. `None` if `text` does not start with a value literal.
pub fn parse_value_prefix(text: &str) -> Result<Option<(Value, &str)>> {
    let Ok(mut pairs) = PatternParser::parse(Rule::value_prefix, text) else {
        return Ok(None);
    };
    let root = pairs
        .next()
        .ok_or_else(|| XcatError::Invariant("value parser produced no root".into()))?;
    let end = root.as_span().end();
    let literal = root
        .into_inner()
        .next()
        .ok_or_else(|| XcatError::Invariant("value parser produced no literal".into()))?;
    let mut fresh = 0usize;
    let value = build_term(literal, &mut fresh)?.into_value().ok_or_else(|| XcatError::Parse {
        message: format!("`{}` does not start with a ground value", text),
        line: None,
        col: None,
    })?;
    Ok(Some((value, &text[end..])))
}

fn parse_rule(rule: Rule, text: &str) -> Result<Pair<'_, Rule>> {
    let mut pairs = PatternParser::parse(rule, text).map_err(|e| {
        let (line, col) = match e.line_col {
            LineColLocation::Pos((l, c)) | LineColLocation::Span((l, c), _) => (l, c),
        };
        XcatError::Parse {
            message: format!("invalid pattern `{}`: {}", text, e.variant.message()),
            line: Some(line),
            col: Some(col),
        }
    })?;
    pairs
        .next()
        .ok_or_else(|| XcatError::Invariant("pattern parser produced no root".into()))
}

fn build_conjunctions(root: Pair<Rule>, fresh: &mut usize) -> Result<Vec<Pattern>> {
    let mut patterns = Vec::new();
    for conjunction in root.into_inner().filter(|p| p.as_rule() == Rule::conjunction) {
        let goals = conjunction
            .into_inner()
            .filter(|p| p.as_rule() == Rule::goal)
            .map(|goal| build_goal(goal, fresh))
            .collect::<Result<Vec<_>>>()?;
        patterns.push(Pattern::from_goals(goals));
    }
    Ok(patterns)
}

fn build_goal(pair: Pair<Rule>, fresh: &mut usize) -> Result<Goal> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| XcatError::Invariant("goal without a name".into()))?
        .as_str()
        .to_owned();
    let args = inner.map(|arg| build_term(arg, fresh)).collect::<Result<Vec<_>>>()?;
    Ok(Goal { name, args })
}

fn build_term(pair: Pair<Rule>, fresh: &mut usize) -> Result<Term> {
    match pair.as_rule() {
        Rule::variable => {
            if pair.as_str() == "_" {
                *fresh += 1;
                Ok(Term::Var(format!("_G{}", fresh)))
            } else {
                Ok(Term::Var(pair.as_str().to_owned()))
            }
        }
        Rule::name => Ok(Term::Const(Value::Resource(pair.as_str().to_owned()))),
        Rule::atom => Ok(Term::Const(Value::Resource(quoted_text(pair)))),
        Rule::string => Ok(Term::Const(Value::Text(quoted_text(pair)))),
        Rule::integer => pair
            .as_str()
            .parse::<i64>()
            .map(|n| Term::Const(Value::Integer(n)))
            .map_err(|e| XcatError::Parse {
                message: format!("integer `{}` out of range: {}", pair.as_str(), e),
                line: Some(pair.as_span().start_pos().line_col().0),
                col: Some(pair.as_span().start_pos().line_col().1),
            }),
        Rule::typed => {
            let mut inner = pair.into_inner();
            let (lexical, datatype) = match (inner.next(), inner.next()) {
                (Some(l), Some(d)) => (l, d),
                _ => return Err(XcatError::Invariant("typed literal without datatype".into())),
            };
            let lexical = match lexical.as_rule() {
                Rule::integer => lexical.as_str().to_owned(),
                _ => quoted_text(lexical),
            };
            Ok(Term::Const(Value::Typed { lexical, datatype: quoted_text(datatype) }))
        }
        Rule::list => Ok(Term::List(
            pair.into_inner().map(|p| build_term(p, fresh)).collect::<Result<Vec<_>>>()?,
        )),
        other => Err(XcatError::Invariant(format!("unexpected pattern rule {:?}", other))),
    }
}

fn quoted_text(pair: Pair<Rule>) -> String {
    pair.into_inner().next().map(|body| unescape(body.as_str())).unwrap_or_default()
}
