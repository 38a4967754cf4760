// used for persistence
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params};
use tracing::debug;

use crate::error::{Result, XcatError};
use crate::store::{Thing, Triple};
use crate::term::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

// term kinds as stored in the Term table
const RESOURCE: i64 = 1;
const TEXT: i64 = 2;
const BYTES: i64 = 3;
const INTEGER: i64 = 4;
const TYPED: i64 = 5;

// ------------- Persistence -------------
/// Durable storage for terms and triples. In [`PersistenceMode::InMemory`]
/// there is no connection and every write is a no-op.
pub struct Persistor {
    db: Option<Connection>,
}

impl Persistor {
    pub fn new(mode: &PersistenceMode) -> Result<Self> {
        let db = match mode {
            PersistenceMode::InMemory => None,
            PersistenceMode::File(path) => {
                let connection = Connection::open(path)?;
                connection.execute_batch(
                    "
                create table if not exists Term (
                    Term_Identity integer not null,
                    Kind integer not null,
                    Lexical any not null,
                    Datatype text not null default '',
                    constraint referenceable_Term_Identity primary key (
                        Term_Identity
                    )
                );
                create table if not exists Triple (
                    Subject_Identity integer not null,
                    Predicate_Identity integer not null,
                    Object_Identity integer not null,
                    constraint Subject_is_Term foreign key (
                        Subject_Identity
                    ) references Term(Term_Identity),
                    constraint Predicate_is_Term foreign key (
                        Predicate_Identity
                    ) references Term(Term_Identity),
                    constraint Object_is_Term foreign key (
                        Object_Identity
                    ) references Term(Term_Identity),
                    constraint unique_Triple primary key (
                        Subject_Identity,
                        Predicate_Identity,
                        Object_Identity
                    )
                );
                ",
                )?;
                Some(connection)
            }
        };
        Ok(Self { db })
    }
    pub fn persist_term(&mut self, term: Thing, value: &Value) -> Result<()> {
        let Some(db) = &self.db else { return Ok(()) };
        let (kind, datatype) = match value {
            Value::Resource(_) => (RESOURCE, ""),
            Value::Text(_) => (TEXT, ""),
            Value::Bytes(_) => (BYTES, ""),
            Value::Integer(_) => (INTEGER, ""),
            Value::Typed { datatype, .. } => (TYPED, datatype.as_str()),
            Value::List(_) => {
                return Err(XcatError::Persistence(format!(
                    "cannot store the list {} as a term",
                    value
                )));
            }
        };
        db.prepare_cached(
            "
            insert or ignore into Term (
                Term_Identity,
                Kind,
                Lexical,
                Datatype
            ) values (?, ?, ?, ?)
        ",
        )?
        .execute(params![term, kind, value, datatype])?;
        Ok(())
    }
    pub fn persist_triple(&mut self, triple: &Triple) -> Result<()> {
        let Some(db) = &self.db else { return Ok(()) };
        db.prepare_cached(
            "
            insert or ignore into Triple (
                Subject_Identity,
                Predicate_Identity,
                Object_Identity
            ) values (?, ?, ?)
        ",
        )?
        .execute(params![triple.subject, triple.predicate, triple.object])?;
        Ok(())
    }
    pub fn forget_triple(&mut self, triple: &Triple) -> Result<()> {
        let Some(db) = &self.db else { return Ok(()) };
        db.prepare_cached(
            "
            delete from Triple
                where Subject_Identity = ?
                and Predicate_Identity = ?
                and Object_Identity = ?
        ",
        )?
        .execute(params![triple.subject, triple.predicate, triple.object])?;
        Ok(())
    }
    pub fn restore_terms(&self) -> Result<Vec<(Thing, Value)>> {
        let Some(db) = &self.db else { return Ok(Vec::new()) };
        let mut statement = db.prepare(
            "
            select Term_Identity, Kind, Lexical, Datatype
                from Term
                order by Term_Identity
        ",
        )?;
        let mut rows = statement.query([])?;
        let mut terms = Vec::new();
        while let Some(row) = rows.next()? {
            let thing: Thing = row.get(0)?;
            let kind: i64 = row.get(1)?;
            let lexical: SqlValue = row.get(2)?;
            let datatype: String = row.get(3)?;
            terms.push((thing, restore_value(thing, kind, lexical, datatype)?));
        }
        debug!(terms = terms.len(), "restored terms");
        Ok(terms)
    }
    pub fn restore_triples(&self) -> Result<Vec<Triple>> {
        let Some(db) = &self.db else { return Ok(Vec::new()) };
        let mut statement = db.prepare(
            "
            select Subject_Identity, Predicate_Identity, Object_Identity
                from Triple
                order by rowid
        ",
        )?;
        let triples = statement
            .query_map([], |row| {
                Ok(Triple {
                    subject: row.get(0)?,
                    predicate: row.get(1)?,
                    object: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(triples = triples.len(), "restored triples");
        Ok(triples)
    }
}

fn restore_value(thing: Thing, kind: i64, lexical: SqlValue, datatype: String) -> Result<Value> {
    let corrupt = || XcatError::Persistence(format!("term {} has an unreadable value", thing));
    Ok(match (kind, lexical) {
        (RESOURCE, SqlValue::Text(s)) => Value::Resource(s),
        (TEXT, SqlValue::Text(s)) => Value::Text(s),
        (BYTES, SqlValue::Blob(b)) => Value::Bytes(b),
        (INTEGER, SqlValue::Integer(n)) => Value::Integer(n),
        (TYPED, SqlValue::Text(s)) => Value::Typed { lexical: s, datatype },
        _ => return Err(corrupt()),
    })
}
