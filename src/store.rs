//! The triple store seen by the query engine, and an in-memory store backing it.
//!
//! The engine only needs [`TripleStore`]: evaluate a [`Pattern`] into rows and
//! switch between read and write mode. [`Store`] is the reference
//! implementation. Terms are interned into [`Thing`] identities, triples are
//! indexed per position with roaring bitmaps, and the goals listed below are
//! evaluated breadth-wise, one goal at a time over all partial solutions.
//!
//! | goal | meaning |
//! |---|---|
//! | `rdf(S, P, O)` | a stored triple |
//! | `type(X, T)` | `rdf(X, rdf:type, T)` |
//! | `subclass_of(C, D)` | reflexive-transitive `rdfs:subClassOf` |
//! | `individual_of(X, C)` | `type(X, T), subclass_of(T, C)` |
//! | `label(X, L)` | `rdfs:label`, or the local name of `X` when it has none |
//! | `seq(S, L)` | the members `rdf:_1, rdf:_2, ...` of `S` as a list |
//! | `member(X, L)` | each element of the list `L` |
//! | `neq(A, B)` | `A` and `B` differ |
//! | `assert(S, P, O)` | add a triple (write mode) |
//! | `retract(S, P, O)` | remove every matching triple (write mode) |
//! | `bnode(X)` | a fresh blank node (write mode) |
//! | `seq_assert(X, L)` | store `L` as an `rdf:Seq` named `X` (write mode) |
//! | `merge_into(Old, New)` | move every triple of `Old` onto `New` (write mode) |
//!
//! Variables starting with `_` are not reported in the result rows.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

// used to keep the one-to-one mapping between terms and their assigned identities
use bimap::BiMap;

// every triple gets an identity, so positional indexes are bitsets that can be intersected
use roaring::RoaringTreemap;

use core::hash::BuildHasherDefault;
use seahash::SeaHasher;

use tracing::{debug, info};

use crate::error::{Result, XcatError};
use crate::pattern::{Goal, Pattern, Term};
use crate::persist::{PersistenceMode, Persistor};
use crate::term::{BNODE_PREFIX, Row, Value};
use crate::vocab;

/// The query interface the engine consumes.
pub trait TripleStore {
    /// Evaluates `pattern` and returns one row per solution, variables in
    /// order of first binding.
    fn execute(&self, pattern: &Pattern) -> Result<Vec<Row>>;
    fn enter_write_mode(&self) -> Result<()>;
    fn exit_write_mode(&self) -> Result<()>;
    fn in_write_mode(&self) -> bool;
}

// ------------- Thing -------------
pub type Thing = u64;

pub type ThingHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: Thing = 0;

#[derive(Debug, Default)]
pub struct ThingGenerator {
    lower_bound: Thing,
}

impl ThingGenerator {
    pub fn new() -> Self {
        Self { lower_bound: GENESIS }
    }
    // The retain function is necessary when restoring an existing
    // persisted database, so that new identities start above the old ones.
    pub fn retain(&mut self, t: Thing) {
        if t > self.lower_bound {
            self.lower_bound = t;
        }
    }
    pub fn generate(&mut self) -> Thing {
        self.lower_bound += 1;
        self.lower_bound
    }
}

// ------------- Terms -------------
#[derive(Debug)]
pub struct TermKeeper {
    kept: BiMap<Value, Thing>,
    generator: ThingGenerator,
}

impl TermKeeper {
    pub fn new() -> Self {
        Self {
            kept: BiMap::new(),
            generator: ThingGenerator::new(),
        }
    }
    /// Returns the identity of `value` and whether it was previously kept.
    pub fn keep(&mut self, value: Value) -> (Thing, bool) {
        if let Some(thing) = self.kept.get_by_left(&value) {
            return (*thing, true);
        }
        let thing = self.generator.generate();
        self.kept.insert(value, thing);
        (thing, false)
    }
    pub fn restore(&mut self, thing: Thing, value: Value) {
        self.generator.retain(thing);
        self.kept.insert(value, thing);
    }
    pub fn thing(&self, value: &Value) -> Option<Thing> {
        self.kept.get_by_left(value).copied()
    }
    pub fn value(&self, thing: Thing) -> Option<&Value> {
        self.kept.get_by_right(&thing)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
}

// ------------- Triples -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Thing,
    pub predicate: Thing,
    pub object: Thing,
}

type Lookup = HashMap<Thing, RoaringTreemap, ThingHasher>;

#[derive(Debug)]
pub struct TripleKeeper {
    kept: BiMap<Triple, Thing>,
    generator: ThingGenerator,
    by_subject: Lookup,
    by_predicate: Lookup,
    by_object: Lookup,
}

impl TripleKeeper {
    pub fn new() -> Self {
        Self {
            kept: BiMap::new(),
            generator: ThingGenerator::new(),
            by_subject: Lookup::default(),
            by_predicate: Lookup::default(),
            by_object: Lookup::default(),
        }
    }
    pub fn keep(&mut self, triple: Triple) -> (Thing, bool) {
        if let Some(id) = self.kept.get_by_left(&triple) {
            return (*id, true);
        }
        let id = self.generator.generate();
        self.kept.insert(triple, id);
        self.by_subject.entry(triple.subject).or_default().insert(id);
        self.by_predicate.entry(triple.predicate).or_default().insert(id);
        self.by_object.entry(triple.object).or_default().insert(id);
        (id, false)
    }
    pub fn forget(&mut self, triple: &Triple) -> bool {
        let Some((_, id)) = self.kept.remove_by_left(triple) else {
            return false;
        };
        for (index, thing) in [
            (&mut self.by_subject, triple.subject),
            (&mut self.by_predicate, triple.predicate),
            (&mut self.by_object, triple.object),
        ] {
            if let Some(ids) = index.get_mut(&thing) {
                ids.remove(id);
                if ids.is_empty() {
                    index.remove(&thing);
                }
            }
        }
        true
    }
    /// Triples matching the bound positions, in the order they were kept.
    pub fn matching(
        &self,
        subject: Option<Thing>,
        predicate: Option<Thing>,
        object: Option<Thing>,
    ) -> Vec<Triple> {
        let mut selected: Option<RoaringTreemap> = None;
        for (position, index) in [
            (subject, &self.by_subject),
            (predicate, &self.by_predicate),
            (object, &self.by_object),
        ] {
            if let Some(thing) = position {
                let Some(ids) = index.get(&thing) else {
                    return Vec::new();
                };
                selected = Some(match selected {
                    Some(acc) => acc & ids,
                    None => ids.clone(),
                });
            }
        }
        match selected {
            Some(ids) => ids.iter().filter_map(|id| self.kept.get_by_right(&id).copied()).collect(),
            None => {
                let mut all: Vec<(Thing, Triple)> =
                    self.kept.iter().map(|(triple, id)| (*id, *triple)).collect();
                all.sort_unstable_by_key(|(id, _)| *id);
                all.into_iter().map(|(_, triple)| triple).collect()
            }
        }
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
}

// ------------- Evaluation -------------
fn resolve(term: &Term, row: &Row) -> Result<Option<Value>> {
    match term {
        Term::Var(name) => Ok(row.get(name).cloned()),
        Term::Const(value) => Ok(Some(value.clone())),
        Term::List(terms) => {
            let mut elements = Vec::with_capacity(terms.len());
            for term in terms {
                match resolve(term, row)? {
                    Some(value) => elements.push(value),
                    None => {
                        return Err(XcatError::Execution(format!(
                            "list argument {} is not ground",
                            term
                        )));
                    }
                }
            }
            Ok(Some(Value::List(elements)))
        }
    }
}

fn unify(row: &mut Row, term: &Term, value: &Value) -> bool {
    match term {
        Term::Var(name) => match row.get(name) {
            Some(bound) => bound == value,
            None => {
                row.insert(name.clone(), value.clone());
                true
            }
        },
        Term::Const(constant) => constant == value,
        Term::List(terms) => match value.as_list() {
            Some(elements) if elements.len() == terms.len() => {
                terms.iter().zip(elements).all(|(term, element)| unify(row, term, element))
            }
            _ => false,
        },
    }
}

fn ground(goal: &Goal, term: &Term, row: &Row) -> Result<Value> {
    resolve(term, row)?
        .ok_or_else(|| XcatError::Execution(format!("{} needs {} to be bound", goal, term)))
}

/// The last segment of an IRI, used as a label of last resort.
pub fn local_name(value: &Value) -> String {
    match value {
        Value::Resource(iri) => match iri.rfind(['#', '/']) {
            Some(index) if index + 1 < iri.len() => iri[index + 1..].to_owned(),
            _ => iri.clone(),
        },
        other => other.display_text(),
    }
}

struct Graph {
    terms: TermKeeper,
    triples: TripleKeeper,
    persistor: Persistor,
    bnodes: u64,
    fresh: usize,
}

impl Graph {
    fn new(persistor: Persistor) -> Self {
        Self {
            terms: TermKeeper::new(),
            triples: TripleKeeper::new(),
            persistor,
            bnodes: 0,
            fresh: 0,
        }
    }
    fn restore(&mut self) -> Result<()> {
        for (thing, value) in self.persistor.restore_terms()? {
            if let Some(n) = value
                .as_resource()
                .and_then(|iri| iri.strip_prefix(BNODE_PREFIX))
                .and_then(|id| id.strip_prefix("genid"))
                .and_then(|n| n.parse::<u64>().ok())
            {
                self.bnodes = self.bnodes.max(n);
            }
            self.terms.restore(thing, value);
        }
        for triple in self.persistor.restore_triples()? {
            self.triples.keep(triple);
        }
        Ok(())
    }
    fn value(&self, thing: Thing) -> Result<&Value> {
        self.terms
            .value(thing)
            .ok_or_else(|| XcatError::Invariant(format!("triple refers to unknown term {}", thing)))
    }
    fn keep_term(&mut self, value: &Value) -> Result<Thing> {
        if let Value::List(_) = value {
            return Err(XcatError::Execution(format!(
                "the list {} cannot be stored as a term, use seq_assert",
                value.to_pattern_literal()
            )));
        }
        let (thing, previously_kept) = self.terms.keep(value.clone());
        if !previously_kept {
            self.persistor.persist_term(thing, value)?;
        }
        Ok(thing)
    }
    fn insert(&mut self, subject: &Value, predicate: &Value, object: &Value) -> Result<bool> {
        let triple = Triple {
            subject: self.keep_term(subject)?,
            predicate: self.keep_term(predicate)?,
            object: self.keep_term(object)?,
        };
        let (_, previously_kept) = self.triples.keep(triple);
        if !previously_kept {
            self.persistor.persist_triple(&triple)?;
        }
        Ok(!previously_kept)
    }
    fn remove(&mut self, triple: &Triple) -> Result<()> {
        if self.triples.forget(triple) {
            self.persistor.forget_triple(triple)?;
        }
        Ok(())
    }
    fn new_bnode(&mut self) -> Value {
        loop {
            self.bnodes += 1;
            let candidate = Value::Resource(format!("{}genid{}", BNODE_PREFIX, self.bnodes));
            if self.terms.thing(&candidate).is_none() {
                return candidate;
            }
        }
    }
    fn fresh_variable(&mut self) -> Term {
        self.fresh += 1;
        Term::Var(format!("_S{}", self.fresh))
    }

    fn solve(&mut self, goals: &[Goal], mut rows: Vec<Row>, write: bool) -> Result<Vec<Row>> {
        for goal in goals {
            let mut next = Vec::new();
            for row in &rows {
                next.extend(self.evaluate(goal, row, write)?);
            }
            rows = next;
            if rows.is_empty() {
                break;
            }
        }
        Ok(rows)
    }

    fn evaluate(&mut self, goal: &Goal, row: &Row, write: bool) -> Result<Vec<Row>> {
        let needs_write = matches!(
            goal.name(),
            "assert" | "retract" | "bnode" | "seq_assert" | "merge_into"
        );
        if needs_write && !write {
            return Err(XcatError::Execution(format!("{} requires write mode", goal)));
        }
        match (goal.name(), goal.args()) {
            ("rdf", [s, p, o]) => {
                Ok(self.matches(s, p, o, row)?.into_iter().map(|(_, row)| row).collect())
            }
            ("type", [x, t]) => {
                let rdf_type = Term::value(vocab::RDF_TYPE);
                Ok(self.matches(x, &rdf_type, t, row)?.into_iter().map(|(_, row)| row).collect())
            }
            ("subclass_of", [c, d]) => self.subclass_of(c, d, row),
            ("individual_of", [x, c]) => {
                let t = self.fresh_variable();
                let expanded = [
                    Goal::new("type", vec![x.clone(), t.clone()]),
                    Goal::new("subclass_of", vec![t, c.clone()]),
                ];
                self.solve(&expanded, vec![row.clone()], write)
            }
            ("label", [x, l]) => self.label(x, l, row),
            ("seq", [s, l]) => self.seq(s, l, row),
            ("member", [x, l]) => {
                let list = ground(goal, l, row)?;
                let Some(elements) = list.as_list() else {
                    return Err(XcatError::Execution(format!(
                        "{} expects a list, got {}",
                        goal, list
                    )));
                };
                Ok(elements
                    .iter()
                    .filter_map(|element| {
                        let mut extended = row.clone();
                        unify(&mut extended, x, element).then_some(extended)
                    })
                    .collect())
            }
            ("neq", [a, b]) => {
                let (a, b) = (ground(goal, a, row)?, ground(goal, b, row)?);
                Ok(if a != b { vec![row.clone()] } else { Vec::new() })
            }
            ("assert", [s, p, o]) => {
                let (s, p, o) =
                    (ground(goal, s, row)?, ground(goal, p, row)?, ground(goal, o, row)?);
                self.insert(&s, &p, &o)?;
                Ok(vec![row.clone()])
            }
            ("retract", [s, p, o]) => {
                for (triple, _) in self.matches(s, p, o, row)? {
                    self.remove(&triple)?;
                }
                Ok(vec![row.clone()])
            }
            ("bnode", [x]) => {
                if resolve(x, row)?.is_some() {
                    return Err(XcatError::Execution(format!(
                        "{} expects an unbound variable",
                        goal
                    )));
                }
                let bnode = self.new_bnode();
                let mut extended = row.clone();
                unify(&mut extended, x, &bnode);
                Ok(vec![extended])
            }
            ("seq_assert", [x, l]) => {
                let list = ground(goal, l, row)?;
                let Some(elements) = list.as_list() else {
                    return Err(XcatError::Execution(format!(
                        "{} expects a list, got {}",
                        goal, list
                    )));
                };
                let seq = match resolve(x, row)? {
                    Some(seq) => seq,
                    None => self.new_bnode(),
                };
                let (rdf_type, rdf_seq) =
                    (Value::resource(vocab::RDF_TYPE), Value::resource(vocab::RDF_SEQ));
                self.insert(&seq, &rdf_type, &rdf_seq)?;
                for (i, element) in elements.iter().enumerate() {
                    self.insert(&seq, &Value::Resource(vocab::member(i + 1)), element)?;
                }
                let mut extended = row.clone();
                Ok(if unify(&mut extended, x, &seq) { vec![extended] } else { Vec::new() })
            }
            ("merge_into", [old, new]) => {
                let (old, new) = (ground(goal, old, row)?, ground(goal, new, row)?);
                self.merge_into(&old, &new)?;
                Ok(vec![row.clone()])
            }
            (name, args) => {
                Err(XcatError::Execution(format!("unknown goal {}/{}", name, args.len())))
            }
        }
    }

    fn matches(&self, s: &Term, p: &Term, o: &Term, row: &Row) -> Result<Vec<(Triple, Row)>> {
        let mut positions = [None; 3];
        for (position, term) in positions.iter_mut().zip([s, p, o]) {
            if let Some(value) = resolve(term, row)? {
                match self.terms.thing(&value) {
                    Some(thing) => *position = Some(thing),
                    None => return Ok(Vec::new()),
                }
            }
        }
        let mut found = Vec::new();
        for triple in self.triples.matching(positions[0], positions[1], positions[2]) {
            let mut extended = row.clone();
            if unify(&mut extended, s, self.value(triple.subject)?)
                && unify(&mut extended, p, self.value(triple.predicate)?)
                && unify(&mut extended, o, self.value(triple.object)?)
            {
                found.push((triple, extended));
            }
        }
        Ok(found)
    }

    /// `start` and everything reachable over `rdfs:subClassOf`, upward
    /// (superclasses) or downward (subclasses), breadth first.
    fn closure(&self, start: &Value, upward: bool) -> Result<Vec<Value>> {
        let mut reached = vec![start.clone()];
        let Some(subclass_of) = self.terms.thing(&Value::resource(vocab::RDFS_SUBCLASS_OF)) else {
            return Ok(reached);
        };
        let mut next = 0;
        while next < reached.len() {
            if let Some(current) = self.terms.thing(&reached[next]) {
                let neighbours = if upward {
                    self.triples.matching(Some(current), Some(subclass_of), None)
                } else {
                    self.triples.matching(None, Some(subclass_of), Some(current))
                };
                for triple in neighbours {
                    let end = if upward { triple.object } else { triple.subject };
                    let neighbour = self.value(end)?;
                    if !reached.contains(neighbour) {
                        reached.push(neighbour.clone());
                    }
                }
            }
            next += 1;
        }
        Ok(reached)
    }

    fn classes(&self) -> Result<Vec<Value>> {
        let mut classes: Vec<Value> = Vec::new();
        let mut note = |value: &Value| {
            if !classes.contains(value) {
                classes.push(value.clone());
            }
        };
        if let Some(subclass_of) = self.terms.thing(&Value::resource(vocab::RDFS_SUBCLASS_OF)) {
            for triple in self.triples.matching(None, Some(subclass_of), None) {
                note(self.value(triple.subject)?);
                note(self.value(triple.object)?);
            }
        }
        if let Some(rdf_type) = self.terms.thing(&Value::resource(vocab::RDF_TYPE)) {
            for triple in self.triples.matching(None, Some(rdf_type), None) {
                note(self.value(triple.object)?);
            }
        }
        Ok(classes)
    }

    fn subclass_of(&self, c: &Term, d: &Term, row: &Row) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        match (resolve(c, row)?, resolve(d, row)?) {
            (Some(class), _) => {
                for ancestor in self.closure(&class, true)? {
                    let mut extended = row.clone();
                    if unify(&mut extended, d, &ancestor) {
                        rows.push(extended);
                    }
                }
            }
            (None, Some(class)) => {
                for descendant in self.closure(&class, false)? {
                    let mut extended = row.clone();
                    if unify(&mut extended, c, &descendant) {
                        rows.push(extended);
                    }
                }
            }
            (None, None) => {
                for class in self.classes()? {
                    for ancestor in self.closure(&class, true)? {
                        let mut extended = row.clone();
                        if unify(&mut extended, c, &class) && unify(&mut extended, d, &ancestor) {
                            rows.push(extended);
                        }
                    }
                }
            }
        }
        Ok(rows)
    }

    fn label(&self, x: &Term, l: &Term, row: &Row) -> Result<Vec<Row>> {
        let rdfs_label = Term::value(vocab::RDFS_LABEL);
        let labelled = self.matches(x, &rdfs_label, l, row)?;
        if !labelled.is_empty() {
            return Ok(labelled.into_iter().map(|(_, row)| row).collect());
        }
        let Some(subject) = resolve(x, row)? else {
            return Ok(Vec::new());
        };
        if self.terms.thing(&subject).is_some()
            && !self.matches(x, &rdfs_label, &Term::var("_Label"), row)?.is_empty()
        {
            return Ok(Vec::new());
        }
        let mut extended = row.clone();
        Ok(if unify(&mut extended, l, &Value::Text(local_name(&subject))) {
            vec![extended]
        } else {
            Vec::new()
        })
    }

    fn members(&self, seq: &Value) -> Result<Vec<Value>> {
        let mut members = Vec::new();
        let Some(subject) = self.terms.thing(seq) else {
            return Ok(members);
        };
        for n in 1.. {
            let Some(predicate) = self.terms.thing(&Value::Resource(vocab::member(n))) else {
                break;
            };
            match self.triples.matching(Some(subject), Some(predicate), None).first() {
                Some(triple) => members.push(self.value(triple.object)?.clone()),
                None => break,
            }
        }
        Ok(members)
    }

    fn seq(&self, s: &Term, l: &Term, row: &Row) -> Result<Vec<Row>> {
        let sequences = match resolve(s, row)? {
            Some(seq) => vec![seq],
            None => {
                let mut sequences = Vec::new();
                if let Some(first) = self.terms.thing(&Value::Resource(vocab::member(1))) {
                    for triple in self.triples.matching(None, Some(first), None) {
                        let seq = self.value(triple.subject)?;
                        if !sequences.contains(seq) {
                            sequences.push(seq.clone());
                        }
                    }
                }
                sequences
            }
        };
        let mut rows = Vec::new();
        for seq in sequences {
            let members = self.members(&seq)?;
            if members.is_empty() {
                continue;
            }
            let mut extended = row.clone();
            if unify(&mut extended, s, &seq) && unify(&mut extended, l, &Value::List(members)) {
                rows.push(extended);
            }
        }
        Ok(rows)
    }

    fn merge_into(&mut self, old: &Value, new: &Value) -> Result<()> {
        if old == new {
            return Ok(());
        }
        let Some(thing) = self.terms.thing(old) else {
            return Ok(());
        };
        for triple in self.triples.matching(Some(thing), None, None) {
            let predicate = self.value(triple.predicate)?.clone();
            let object = self.value(triple.object)?.clone();
            self.remove(&triple)?;
            self.insert(new, &predicate, &object)?;
        }
        for triple in self.triples.matching(None, None, Some(thing)) {
            let subject = self.value(triple.subject)?.clone();
            let predicate = self.value(triple.predicate)?.clone();
            self.remove(&triple)?;
            self.insert(&subject, &predicate, new)?;
        }
        Ok(())
    }
}

// ------------- Store -------------
/// In-memory triple store, optionally backed by SQLite.
pub struct Store {
    graph: Mutex<Graph>,
    write_mode: AtomicBool,
}

impl Store {
    pub fn new(mode: PersistenceMode) -> Result<Self> {
        let persistor = Persistor::new(&mode)?;
        let mut graph = Graph::new(persistor);
        graph.restore()?;
        info!(
            ?mode,
            terms = graph.terms.len(),
            triples = graph.triples.len(),
            "opened store"
        );
        Ok(Self {
            graph: Mutex::new(graph),
            write_mode: AtomicBool::new(false),
        })
    }
    fn graph(&self) -> Result<MutexGuard<'_, Graph>> {
        self.graph.lock().map_err(|e| XcatError::Lock(e.to_string()))
    }
    /// Adds a triple regardless of write mode. Returns false if it was
    /// already present.
    pub fn add_triple(
        &self,
        subject: impl Into<Value>,
        predicate: impl Into<Value>,
        object: impl Into<Value>,
    ) -> Result<bool> {
        self.graph()?.insert(&subject.into(), &predicate.into(), &object.into())
    }
    pub fn contains(
        &self,
        subject: impl Into<Value>,
        predicate: impl Into<Value>,
        object: impl Into<Value>,
    ) -> Result<bool> {
        let graph = self.graph()?;
        let things = [subject.into(), predicate.into(), object.into()]
            .map(|value| graph.terms.thing(&value));
        match things {
            [Some(s), Some(p), Some(o)] => {
                Ok(!graph.triples.matching(Some(s), Some(p), Some(o)).is_empty())
            }
            _ => Ok(false),
        }
    }
    pub fn len(&self) -> Result<usize> {
        Ok(self.graph()?.triples.len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl TripleStore for Store {
    fn execute(&self, pattern: &Pattern) -> Result<Vec<Row>> {
        let write = self.in_write_mode();
        let solutions = self.graph()?.solve(pattern.goals(), vec![Row::default()], write)?;
        let mut seen: HashSet<Vec<(String, Value)>> = HashSet::new();
        let mut rows = Vec::with_capacity(solutions.len());
        for mut row in solutions {
            row.retain(|variable, _| !variable.starts_with('_'));
            if pattern.is_distinct() {
                let key = row.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                if !seen.insert(key) {
                    continue;
                }
            }
            rows.push(row);
        }
        debug!(%pattern, rows = rows.len(), "executed");
        Ok(rows)
    }
    fn enter_write_mode(&self) -> Result<()> {
        self.write_mode.store(true, Ordering::SeqCst);
        Ok(())
    }
    fn exit_write_mode(&self) -> Result<()> {
        self.write_mode.store(false, Ordering::SeqCst);
        Ok(())
    }
    fn in_write_mode(&self) -> bool {
        self.write_mode.load(Ordering::SeqCst)
    }
}
