//! Display formats for query results.
//!
//! A [`FormatTemplate`] is compiled once, from one of:
//! * a list of variable names, rendered pipe-joined (`A | B | C`),
//! * a format string with `{Var}` placeholders, where an empty `{}` gets an
//!   anonymous name (`RPQ_A`, `RPQ_B`, ...),
//! * a function over the whole binding row.
//!
//! Rendering never fails: a variable without a binding renders as `"."`.

use lazy_static::lazy_static;
use regex::Regex;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::binding::KEY_TYPE_VARIABLE;
use crate::error::{Result, XcatError};
use crate::term::{Row, Value};

lazy_static! {
    static ref SLOT: Regex = Regex::new(r"\{[^{}]*\}").expect("slot pattern compiles");
}

pub const MISSING: &str = ".";
const ANONYMOUS_PREFIX: &str = "RPQ_";
const ANONYMOUS_NAMES: u8 = 25;

type RenderFn = dyn Fn(&Row) -> String + Send + Sync;

#[derive(Clone)]
enum Piece {
    Text(String),
    Slot,
}

#[derive(Clone)]
enum Render {
    Pieces(Vec<Piece>),
    Function(Arc<RenderFn>),
}

#[derive(Clone)]
pub struct FormatTemplate {
    variables: Vec<String>,
    render: Render,
}

impl FormatTemplate {
    pub fn list<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        let mut pieces = Vec::new();
        for i in 0..variables.len() {
            if i > 0 {
                pieces.push(Piece::Text(" | ".into()));
            }
            pieces.push(Piece::Slot);
        }
        Self { variables, render: Render::Pieces(pieces) }
    }

    pub fn parse(format: &str) -> Result<Self> {
        let mut variables: Vec<String> = Vec::new();
        let mut pieces = Vec::new();
        let mut anonymous_start = 0u8;
        let mut last = 0;
        for slot in SLOT.find_iter(format) {
            if slot.start() > last {
                pieces.push(Piece::Text(format[last..slot.start()].to_owned()));
            }
            let name = &slot.as_str()[1..slot.as_str().len() - 1];
            if name.is_empty() {
                variables.push(anonymous_variable(&mut anonymous_start, &variables)?);
            } else if is_identifier(name) {
                variables.push(name.to_owned());
            } else {
                return Err(XcatError::Format(format!(
                    "{} is not a valid variable name",
                    slot.as_str()
                )));
            }
            pieces.push(Piece::Slot);
            last = slot.end();
        }
        if last < format.len() {
            pieces.push(Piece::Text(format[last..].to_owned()));
        }
        Ok(Self { variables, render: Render::Pieces(pieces) })
    }

    /// Uses `format` as-is with positional slots, filled from `variables`
    /// in order regardless of what the braces contain.
    pub fn with_variables<I, S>(format: &str, variables: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        let mut pieces = Vec::new();
        let mut last = 0;
        let mut slots = 0;
        for slot in SLOT.find_iter(format) {
            if slot.start() > last {
                pieces.push(Piece::Text(format[last..slot.start()].to_owned()));
            }
            pieces.push(Piece::Slot);
            slots += 1;
            last = slot.end();
        }
        if last < format.len() {
            pieces.push(Piece::Text(format[last..].to_owned()));
        }
        if slots > variables.len() {
            return Err(XcatError::Format(format!(
                "`{}` has {} slots but only {} variables were given",
                format,
                slots,
                variables.len()
            )));
        }
        Ok(Self { variables, render: Render::Pieces(pieces) })
    }

    pub fn function<I, S, F>(variables: I, render: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Row) -> String + Send + Sync + 'static,
    {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            render: Render::Function(Arc::new(render)),
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Renders a result. Named bindings are applied first; positional values
    /// then fill the declared variables that are still unset, in order.
    pub fn result(&self, positional: &[Value], named: &Row) -> QueryResult {
        let mut slots: Vec<(String, Option<Value>)> =
            self.variables.iter().map(|v| (v.clone(), None)).collect();
        for (name, value) in named {
            let value = value.clone().normalized();
            match slots.iter_mut().find(|(declared, _)| declared == name) {
                Some(slot) => slot.1 = Some(value),
                None => slots.push((name.clone(), Some(value))),
            }
        }
        let mut positional = positional.iter();
        for slot in slots.iter_mut().filter(|(_, value)| value.is_none()) {
            match positional.next() {
                Some(value) => slot.1 = Some(value.clone().normalized()),
                None => break,
            }
        }
        let bindings: Row = slots
            .into_iter()
            .map(|(name, value)| (name, value.unwrap_or_else(|| Value::Text(MISSING.into()))))
            .collect();
        let display = match &self.render {
            Render::Function(render) => (**render)(&bindings),
            Render::Pieces(pieces) => {
                let mut values = self.variables.iter().map(|v| bindings.get(v));
                let mut display = String::new();
                for piece in pieces {
                    match piece {
                        Piece::Text(text) => display.push_str(text),
                        Piece::Slot => match values.next().flatten() {
                            Some(value) => display.push_str(&value.display_text()),
                            None => display.push_str(MISSING),
                        },
                    }
                }
                display
            }
        };
        QueryResult::new(display, bindings)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn anonymous_variable(start: &mut u8, taken: &[String]) -> Result<String> {
    for i in 0..ANONYMOUS_NAMES.saturating_sub(*start) {
        let candidate = format!("{}{}", ANONYMOUS_PREFIX, (b'A' + *start + i) as char);
        if !taken.contains(&candidate) {
            *start += i + 1;
            return Ok(candidate);
        }
    }
    Err(XcatError::Format(format!("out of anonymous variables (total: {})", start)))
}

impl std::str::FromStr for FormatTemplate {
    type Err = XcatError;
    fn from_str(s: &str) -> Result<Self> {
        FormatTemplate::parse(s)
    }
}

impl fmt::Display for FormatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.render {
            Render::Function(_) => write!(f, "<function on {:?}>", self.variables),
            Render::Pieces(pieces) => {
                let mut variables = self.variables.iter();
                write!(f, "\"")?;
                for piece in pieces {
                    match piece {
                        Piece::Text(text) => write!(f, "{}", text)?,
                        Piece::Slot => {
                            let name = variables.next().map(String::as_str).unwrap_or("");
                            write!(f, "{{{}}}", name)?
                        }
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

impl fmt::Debug for FormatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FormatTemplate({})", self)
    }
}

// ------------- QueryResult -------------
/// A formatted row. Equality and ordering look at the display string only.
#[derive(Clone)]
pub struct QueryResult {
    display: String,
    bindings: Row,
    resource_type: Option<Value>,
}

impl QueryResult {
    pub fn new(display: String, bindings: Row) -> Self {
        let resource_type = bindings.get(KEY_TYPE_VARIABLE).cloned();
        Self { display, bindings, resource_type }
    }
    pub fn display(&self) -> &str {
        &self.display
    }
    pub fn bindings(&self) -> &Row {
        &self.bindings
    }
    pub fn resource_type(&self) -> Option<&Value> {
        self.resource_type.as_ref()
    }
    pub fn get(&self, variable: &str) -> Option<&Value> {
        self.bindings.get(variable)
    }
    pub fn into_display(self) -> String {
        self.display
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.resource_type {
            Some(rdf_type) => write!(f, "<QueryResult {:?} {}>", self.display, rdf_type),
            None => write!(f, "<QueryResult {:?}>", self.display),
        }
    }
}

impl PartialEq for QueryResult {
    fn eq(&self, other: &Self) -> bool {
        self.display == other.display
    }
}
impl Eq for QueryResult {}
impl Ord for QueryResult {
    fn cmp(&self, other: &Self) -> Ordering {
        self.display.cmp(&other.display)
    }
}
impl PartialOrd for QueryResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Hash for QueryResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.display.hash(state);
    }
}
