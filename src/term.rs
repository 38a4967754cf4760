// used for persistence
use rusqlite::types::{ToSql, ToSqlOutput};

// rows keep the order in which variables were bound
use indexmap::IndexMap;
use seahash::SeaHasher;
use std::hash::BuildHasherDefault;

// used to print out readable forms of a value
use std::fmt;

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

/// One solution of a pattern: variable name to bound value, in binding order.
pub type Row = IndexMap<String, Value, OtherHasher>;

/// A value as it crosses the store boundary.
///
/// The store hands back resources, plain and typed literals, integers, raw
/// bytes and list values. Everything downstream matches on this union instead
/// of sniffing what came back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// An IRI or a blank node identifier (`_:genid…`).
    Resource(String),
    Text(String),
    Bytes(Vec<u8>),
    Integer(i64),
    Typed { lexical: String, datatype: String },
    List(Vec<Value>),
}

pub const BNODE_PREFIX: &str = "_:";

impl Value {
    pub fn resource(iri: impl Into<String>) -> Self {
        Value::Resource(iri.into())
    }
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }
    pub fn typed(lexical: impl ToString, datatype: impl Into<String>) -> Self {
        Value::Typed { lexical: lexical.to_string(), datatype: datatype.into() }
    }
    pub fn is_bnode(&self) -> bool {
        matches!(self, Value::Resource(iri) if iri.starts_with(BNODE_PREFIX))
    }
    pub fn as_resource(&self) -> Option<&str> {
        match self {
            Value::Resource(iri) => Some(iri),
            _ => None,
        }
    }
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(elements) => Some(elements),
            _ => None,
        }
    }
    /// Converts raw bytes to text once, at the edge. Everything else is
    /// already in its normal form.
    pub fn normalized(self) -> Value {
        match self {
            Value::Bytes(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
            Value::List(elements) => {
                Value::List(elements.into_iter().map(Value::normalized).collect())
            }
            other => other,
        }
    }
    /// The printable form used by format templates.
    pub fn display_text(&self) -> String {
        match self {
            Value::Resource(s) | Value::Text(s) => s.clone(),
            Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Value::Integer(n) => n.to_string(),
            Value::Typed { lexical, .. } => lexical.clone(),
            Value::List(elements) => {
                let texts: Vec<String> = elements.iter().map(Value::display_text).collect();
                format!("[{}]", texts.join(", "))
            }
        }
    }
    /// Renders the value as a pattern literal. This is the only place values
    /// are embedded into pattern text, so all quoting happens here.
    pub fn to_pattern_literal(&self) -> String {
        match self {
            Value::Resource(iri) => quote(iri, '\''),
            Value::Text(text) => quote(text, '"'),
            Value::Bytes(bytes) => quote(&String::from_utf8_lossy(bytes), '"'),
            Value::Integer(n) => n.to_string(),
            Value::Typed { lexical, datatype } => {
                format!("{}^^{}", quote(lexical, '\''), quote(datatype, '\''))
            }
            Value::List(elements) => {
                let literals: Vec<String> =
                    elements.iter().map(Value::to_pattern_literal).collect();
                format!("[{}]", literals.join(", "))
            }
        }
    }
}

fn quote(raw: &str, delimiter: char) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push(delimiter);
    for c in raw.chars() {
        if c == delimiter || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push(delimiter);
    quoted
}

/// Reverses the escaping done by [`Value::to_pattern_literal`].
pub fn unescape(quoted_body: &str) -> String {
    let mut raw = String::with_capacity(quoted_body.len());
    let mut chars = quoted_body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                raw.push(escaped);
            }
        } else {
            raw.push(c);
        }
    }
    raw
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_text())
    }
}

impl From<&str> for Value {
    fn from(iri: &str) -> Self {
        Value::Resource(iri.to_owned())
    }
}
impl From<String> for Value {
    fn from(iri: String) -> Self {
        Value::Resource(iri)
    }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Resource(s) | Value::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            Value::Typed { lexical, .. } => Ok(ToSqlOutput::from(lexical.as_str())),
            Value::Bytes(bytes) => Ok(ToSqlOutput::from(bytes.as_slice())),
            Value::Integer(n) => Ok(ToSqlOutput::from(*n)),
            Value::List(_) => Err(rusqlite::Error::ToSqlConversionFailure(
                "list values are expanded into sequences before they are stored".into(),
            )),
        }
    }
}
