//! How a query receives its parameter and what it returns as keys.
//!
//! Both descriptors have a canonical text form that round-trips through
//! `Display`/`FromStr`:
//!
//! * parent: `VAR EQUALS RESOURCE`, `VAR EQUALS RESOURCE::TYPE`, `VAR EQUALS ::TYPE`
//! * child: `VAR`, `[VAR]`, `VAR::TYPE`, `[VAR]::False`
//!
//! A type of `False` disables the type constraint. The parent's resource is
//! written as a pattern literal (`'ex:a'`, `"text"`, `5`); a bare resource
//! such as `ex:a` is also accepted when parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, XcatError};
use crate::pattern::{Goal, Term, parse_value_prefix};
use crate::term::Value;

/// The variable the child's resolved type is bound to.
pub const KEY_TYPE_VARIABLE: &str = "RPQ_KeyType";

const EQUALS: &str = "EQUALS";
const NO_TYPE: &str = "False";
const TYPE_SEPARATOR: &str = "::";

/// An RDF type usable in a descriptor's `::TYPE` suffix. It is never empty,
/// never `False` and never contains `::`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfType(String);

impl RdfType {
    pub fn new(iri: impl Into<String>) -> Result<Self> {
        let iri = iri.into();
        if iri.is_empty() || iri == NO_TYPE || iri.contains(TYPE_SEPARATOR) {
            return Err(XcatError::Parse {
                message: format!("`{}` cannot be written as a type constraint", iri),
                line: None,
                col: None,
            });
        }
        Ok(Self(iri))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RdfType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeConstraint {
    #[default]
    Unconstrained,
    NoType,
    Exact(RdfType),
}

impl TypeConstraint {
    pub fn exact(iri: impl Into<String>) -> Result<Self> {
        RdfType::new(iri).map(TypeConstraint::Exact)
    }
    fn parse(text: &str) -> Result<Self> {
        match text {
            "" => Ok(TypeConstraint::Unconstrained),
            NO_TYPE => Ok(TypeConstraint::NoType),
            iri => TypeConstraint::exact(iri),
        }
    }
    fn suffix(&self) -> String {
        match self {
            TypeConstraint::Unconstrained => String::new(),
            TypeConstraint::NoType => format!("{}{}", TYPE_SEPARATOR, NO_TYPE),
            TypeConstraint::Exact(rdf_type) => format!("{}{}", TYPE_SEPARATOR, rdf_type),
        }
    }
}

fn check_variable(variable: &str, expression: &str) -> Result<()> {
    let mut chars = variable.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_uppercase() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(XcatError::Parse {
            message: format!("`{}` is not a pattern variable in `{}`", variable, expression),
            line: None,
            col: None,
        })
    }
}

// ------------- ParentBinding -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentBinding {
    variable: String,
    type_constraint: TypeConstraint,
    resource: Option<Value>,
}

impl ParentBinding {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            type_constraint: TypeConstraint::Unconstrained,
            resource: None,
        }
    }
    pub fn with_resource(mut self, resource: impl Into<Value>) -> Self {
        self.resource = Some(resource.into().normalized());
        self
    }
    pub fn with_type(mut self, type_constraint: TypeConstraint) -> Self {
        self.type_constraint = type_constraint;
        self
    }
    /// A copy of this binding fixed to `resource`; `self` is left untouched.
    pub fn rebound(&self, resource: Value) -> Self {
        Self { resource: Some(resource.normalized()), ..self.clone() }
    }
    pub fn variable(&self) -> &str {
        &self.variable
    }
    pub fn type_constraint(&self) -> &TypeConstraint {
        &self.type_constraint
    }
    pub fn resource(&self) -> Option<&Value> {
        self.resource.as_ref()
    }
}

impl fmt::Display for ParentBinding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let resource = self.resource.as_ref().map(Value::to_pattern_literal).unwrap_or_default();
        let value = format!("{}{}", resource, self.type_constraint.suffix());
        if value.is_empty() {
            write!(f, "{} {}", self.variable, EQUALS)
        } else {
            write!(f, "{} {} {}", self.variable, EQUALS, value)
        }
    }
}

impl FromStr for ParentBinding {
    type Err = XcatError;
    fn from_str(expression: &str) -> Result<Self> {
        let mut words = expression.trim().splitn(2, char::is_whitespace);
        let variable = words.next().unwrap_or_default();
        let rest = words.next().unwrap_or_default().trim_start();
        let value = match rest.strip_prefix(EQUALS) {
            Some(value) if value.is_empty() || value.starts_with(char::is_whitespace) => {
                value.trim()
            }
            _ => {
                return Err(XcatError::Parse {
                    message: format!(
                        "invalid parent syntax, expected `VAR EQUALS VALUE`: {}",
                        expression
                    ),
                    line: None,
                    col: None,
                });
            }
        };
        check_variable(variable, expression)?;
        let (resource, type_text) = split_parent_value(value, expression)?;
        Ok(Self {
            variable: variable.to_owned(),
            type_constraint: TypeConstraint::parse(type_text)?,
            resource,
        })
    }
}

/// Splits `RESOURCE::TYPE` into the resource and the type text.
fn split_parent_value<'a>(value: &'a str, expression: &str) -> Result<(Option<Value>, &'a str)> {
    if let Some((resource, rest)) = parse_value_prefix(value)? {
        let rest = rest.trim();
        if rest.is_empty() {
            return Ok((Some(resource), ""));
        }
        if let Some(type_text) = rest.strip_prefix(TYPE_SEPARATOR) {
            return Ok((Some(resource), type_text.trim()));
        }
    }
    if value.starts_with(['\'', '"', '[']) {
        return Err(XcatError::Parse {
            message: format!("invalid parent value `{}` in `{}`", value, expression),
            line: None,
            col: None,
        });
    }
    // a bare resource cannot contain `::`, the last one starts the type
    let (resource, type_text) = match value.rfind(TYPE_SEPARATOR) {
        Some(index) => (&value[..index], &value[index + TYPE_SEPARATOR.len()..]),
        None => (value, ""),
    };
    let resource = (!resource.is_empty()).then(|| Value::Resource(resource.to_owned()));
    Ok((resource, type_text))
}

// ------------- ChildSpec -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
    variable: String,
    type_constraint: TypeConstraint,
    unpack_list: bool,
}

impl ChildSpec {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            type_constraint: TypeConstraint::Unconstrained,
            unpack_list: false,
        }
    }
    pub fn with_type(mut self, type_constraint: TypeConstraint) -> Self {
        self.type_constraint = type_constraint;
        self
    }
    pub fn unpacked(mut self) -> Self {
        self.unpack_list = true;
        self
    }
    pub fn variable(&self) -> &str {
        &self.variable
    }
    pub fn type_constraint(&self) -> &TypeConstraint {
        &self.type_constraint
    }
    pub fn unpack_list(&self) -> bool {
        self.unpack_list
    }
    /// Goals restricting the child to typed resources, binding the type to
    /// [`KEY_TYPE_VARIABLE`]. `None` when type checking is disabled.
    pub fn type_join(&self) -> Option<Vec<Goal>> {
        let key_type = Term::var(KEY_TYPE_VARIABLE);
        let mut goals = vec![Goal::new(
            "type",
            vec![Term::var(self.variable.as_str()), key_type.clone()],
        )];
        match &self.type_constraint {
            TypeConstraint::NoType => return None,
            TypeConstraint::Exact(rdf_type) => {
                goals.push(Goal::new(
                    "subclass_of",
                    vec![key_type, Term::value(rdf_type.as_str())],
                ));
            }
            TypeConstraint::Unconstrained => (),
        }
        Some(goals)
    }
}

impl fmt::Display for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.unpack_list {
            write!(f, "[{}]{}", self.variable, self.type_constraint.suffix())
        } else {
            write!(f, "{}{}", self.variable, self.type_constraint.suffix())
        }
    }
}

impl FromStr for ChildSpec {
    type Err = XcatError;
    fn from_str(expression: &str) -> Result<Self> {
        let expression = expression.trim();
        let (variable, type_constraint) = match expression.split_once(TYPE_SEPARATOR) {
            Some((variable, rdf_type)) => (variable, TypeConstraint::parse(rdf_type)?),
            None => (expression, TypeConstraint::Unconstrained),
        };
        let unpacked = variable.strip_prefix('[').and_then(|v| v.strip_suffix(']'));
        let (variable, unpack_list) = match unpacked {
            Some(inner) => (inner, true),
            None => (variable, false),
        };
        check_variable(variable, expression)?;
        Ok(Self {
            variable: variable.to_owned(),
            type_constraint,
            unpack_list,
        })
    }
}
