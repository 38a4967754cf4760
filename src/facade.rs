//! The store facade used by calling code: query construction, ad hoc
//! questions, write batches, and the catalog helpers built on top of them.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, XcatError};
use crate::pattern::{Goal, IntoPattern, Pattern, Term};
use crate::query::{BoundQuery, QueryTemplate, Stage};
use crate::store::TripleStore;
use crate::term::{Row, Value};
use crate::vocab;

/// When the store is switched into write mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteModePolicy {
    /// Each assert batch enters write mode and leaves it afterwards.
    #[default]
    PerBatch,
    /// Write mode is entered once, when the facade is created.
    Always,
}

/// The answer to [`Rpq::simple_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleValue {
    None,
    One(Value),
    Many(Vec<Value>),
}

impl SimpleValue {
    pub fn one(self) -> Option<Value> {
        match self {
            SimpleValue::One(value) => Some(value),
            _ => None,
        }
    }
}

fn render_rows(rows: &[Row]) -> String {
    rows.iter()
        .map(|row| {
            let pairs: Vec<String> = row.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            format!("{{{}}}", pairs.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ------------- AssertBatch -------------
/// A group of write statements executed as one conjunction.
///
/// The batch is not transactional: if a statement fails, the statements
/// before it stay applied.
#[derive(Debug, Clone, Default)]
pub struct AssertBatch {
    statements: Pattern,
}

impl AssertBatch {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn parse(statements: &str) -> Result<Self> {
        Ok(Self { statements: Pattern::parse(statements)? })
    }
    pub fn statement(mut self, statement: impl IntoPattern) -> Result<Self> {
        self.statements.extend(statement.into_pattern()?.goals().iter().cloned());
        Ok(self)
    }
    pub fn goal(mut self, goal: Goal) -> Self {
        self.statements.push(goal);
        self
    }
    pub fn assert(
        self,
        subject: impl Into<Value>,
        predicate: impl Into<Value>,
        object: impl Into<Value>,
    ) -> Self {
        self.goal(Goal::new(
            "assert",
            vec![Term::value(subject), Term::value(predicate), Term::value(object)],
        ))
    }
    pub fn retract(
        self,
        subject: impl Into<Value>,
        predicate: impl Into<Value>,
        object: impl Into<Value>,
    ) -> Self {
        self.goal(Goal::new(
            "retract",
            vec![Term::value(subject), Term::value(predicate), Term::value(object)],
        ))
    }
    pub fn merge_into(self, old: impl Into<Value>, new: impl Into<Value>) -> Self {
        self.goal(Goal::new("merge_into", vec![Term::value(old), Term::value(new)]))
    }
    pub fn is_empty(&self) -> bool {
        self.statements.goals().is_empty()
    }
    pub fn len(&self) -> usize {
        self.statements.goals().len()
    }

    pub fn execute(&self, store: &dyn TripleStore, policy: WriteModePolicy) -> Result<Vec<Row>> {
        let bracket = policy == WriteModePolicy::PerBatch;
        if bracket {
            store.enter_write_mode()?;
        }
        debug!(batch = %self.statements, "ASSERT");
        let outcome = store.execute(&self.statements);
        if bracket {
            match (&outcome, store.exit_write_mode()) {
                (Ok(_), Err(e)) => return Err(e),
                (Err(_), Err(e)) => {
                    warn!(error = %e, "could not leave write mode after a failed batch")
                }
                _ => (),
            }
        }
        outcome
    }
}

// ------------- Source priority -------------
/// Host fragments in order of preference when several resources describe the
/// same thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePriority(Vec<String>);

impl SourcePriority {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(sources.into_iter().map(Into::into).collect())
    }
    pub fn rank(&self, iri: &str) -> Option<usize> {
        self.0.iter().position(|source| iri.contains(source.as_str()))
    }
    /// Orders `resources` by source, failing on a resource from no known
    /// source. A source contributing several resources is logged.
    pub fn sort(&self, resources: Vec<Value>) -> Result<Vec<Value>> {
        let mut ranked = Vec::with_capacity(resources.len());
        for resource in resources {
            let rank = self.rank(&resource.display_text()).ok_or_else(|| {
                XcatError::Execution(format!("{} is not from a known source", resource))
            })?;
            ranked.push((rank, resource));
        }
        ranked.sort_by_key(|(rank, _)| *rank);
        let mut per_source: HashMap<usize, Vec<&Value>> = HashMap::new();
        for (rank, resource) in &ranked {
            per_source.entry(*rank).or_default().push(resource);
        }
        for (rank, resources) in per_source.iter().filter(|(_, resources)| resources.len() > 1) {
            warn!(
                source = %self.0[*rank],
                ?resources,
                "several resources from one source, keeping the first"
            );
        }
        Ok(ranked.into_iter().map(|(_, resource)| resource).collect())
    }
}

impl Default for SourcePriority {
    fn default() -> Self {
        Self::new(["musicbrainz.org", "discogs.com", "bandcamp.com"])
    }
}

// ------------- Partial dates -------------
/// A date known down to some precision: every part after the first missing
/// one is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateParts {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

impl DateParts {
    pub fn year(year: i32) -> Self {
        Self { year: Some(year), ..Self::default() }
    }
    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }
    pub fn day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }
    pub fn hour(mut self, hour: u32) -> Self {
        self.hour = Some(hour);
        self
    }
    pub fn minute(mut self, minute: u32) -> Self {
        self.minute = Some(minute);
        self
    }
    pub fn second(mut self, second: u32) -> Self {
        self.second = Some(second);
        self
    }
    /// The known parts, most significant first, with their property and
    /// datatype. A part of 0 is known: midnight names `….00.00.00`.
    fn known(&self) -> Vec<(&'static str, &'static str, i64)> {
        let parts = [
            ("year", vocab::XSD_GYEAR, self.year.map(i64::from)),
            ("month", vocab::XSD_GMONTH, self.month.map(i64::from)),
            ("day", vocab::XSD_GDAY, self.day.map(i64::from)),
            ("hour", vocab::XSD_NON_NEGATIVE_INTEGER, self.hour.map(i64::from)),
            ("minute", vocab::XSD_NON_NEGATIVE_INTEGER, self.minute.map(i64::from)),
            ("second", vocab::XSD_NON_NEGATIVE_INTEGER, self.second.map(i64::from)),
        ];
        parts
            .into_iter()
            .map_while(|(name, datatype, value)| value.map(|value| (name, datatype, value)))
            .collect()
    }
    /// `ldatetime.2024.03.09` and so on, one segment per known part.
    pub fn resource(&self) -> String {
        self.known()
            .iter()
            .fold(String::from("ldatetime"), |uri, (_, _, value)| format!("{}.{:02}", uri, value))
    }
}

impl From<NaiveDate> for DateParts {
    fn from(date: NaiveDate) -> Self {
        DateParts::year(date.year()).month(date.month()).day(date.day())
    }
}

impl From<NaiveDateTime> for DateParts {
    fn from(datetime: NaiveDateTime) -> Self {
        DateParts::from(datetime.date())
            .hour(datetime.hour())
            .minute(datetime.minute())
            .second(datetime.second())
    }
}

// ------------- Tracklists -------------
/// Collects the tracks of each release during one import run, until the
/// release's expected track count is reached.
#[derive(Debug, Default)]
pub struct TracklistAccumulator {
    pending: HashMap<Value, Vec<(u32, Value)>>,
}

impl TracklistAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
    /// Records `track` at `position`. Returns the full tracklist, ordered by
    /// position, once `expected` tracks have been seen for `release`.
    pub fn add(
        &mut self,
        release: &Value,
        expected: usize,
        position: u32,
        track: Value,
    ) -> Option<Vec<Value>> {
        let tracks = self.pending.entry(release.clone()).or_default();
        tracks.push((position, track));
        if tracks.len() < expected {
            return None;
        }
        let mut tracks = self.pending.remove(release)?;
        tracks.sort_by_key(|(position, _)| *position);
        Some(tracks.into_iter().map(|(_, track)| track).collect())
    }
    /// Releases still waiting for tracks.
    pub fn pending(&self) -> impl Iterator<Item = &Value> {
        self.pending.keys()
    }
    /// Ends the run, returning what was never completed.
    pub fn finish(self) -> HashMap<Value, Vec<(u32, Value)>> {
        if !self.pending.is_empty() {
            warn!(releases = self.pending.len(), "import run ended with incomplete tracklists");
        }
        self.pending
    }
}

// ------------- Rpq -------------
/// Entry point over a [`TripleStore`].
pub struct Rpq {
    store: Arc<dyn TripleStore>,
    policy: WriteModePolicy,
    source_priority: SourcePriority,
}

impl Rpq {
    pub fn new(store: Arc<dyn TripleStore>, policy: WriteModePolicy) -> Result<Self> {
        if policy == WriteModePolicy::Always {
            store.enter_write_mode()?;
        }
        Ok(Self {
            store,
            policy,
            source_priority: SourcePriority::default(),
        })
    }
    pub fn with_source_priority(mut self, source_priority: SourcePriority) -> Self {
        self.source_priority = source_priority;
        self
    }
    pub fn store(&self) -> &Arc<dyn TripleStore> {
        &self.store
    }
    pub fn policy(&self) -> WriteModePolicy {
        self.policy
    }

    /// Binds `template` to its own parent resource, if it has one.
    pub fn query(&self, template: QueryTemplate) -> BoundQuery {
        BoundQuery::new(Arc::clone(&self.store), Arc::new(template))
    }

    /// Links the stages into a chain and binds the first one.
    pub fn query_chain<I, S>(&self, stages: I) -> Result<BoundQuery>
    where
        I: IntoIterator<Item = S>,
        S: Into<Stage>,
    {
        let templates = stages
            .into_iter()
            .map(|stage| stage.into().into_template())
            .collect::<Result<Vec<_>>>()?;
        let first = QueryTemplate::chain(templates)
            .ok_or_else(|| XcatError::Binding("a query chain needs at least one stage".into()))?;
        Ok(BoundQuery::new(Arc::clone(&self.store), first))
    }

    /// True if the conjunction of `goals` has a solution.
    pub fn boolquery<I, P>(&self, goals: I) -> Result<bool>
    where
        I: IntoIterator<Item = P>,
        P: IntoPattern,
    {
        let pattern = conjunction(goals)?;
        Ok(!self.store.execute(&pattern)?.is_empty())
    }

    /// True on exactly one distinct solution, false on none.
    pub fn boolquery_unique<I, P>(&self, goals: I) -> Result<bool>
    where
        I: IntoIterator<Item = P>,
        P: IntoPattern,
    {
        let pattern = conjunction(goals)?.distinct();
        let rows = self.store.execute(&pattern)?;
        match rows.len() {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(XcatError::NotUnique {
                pattern: pattern.to_string(),
                results: render_rows(&rows),
            }),
        }
    }

    /// The first variable of each solution.
    pub fn simple_query(&self, pattern: impl IntoPattern, unique: bool) -> Result<SimpleValue> {
        let pattern = pattern.into_pattern()?;
        let mut values: Vec<Value> = self
            .store
            .execute(&pattern)?
            .into_iter()
            .filter_map(|row| row.into_iter().next().map(|(_, value)| value.normalized()))
            .collect();
        match values.len() {
            0 => Ok(SimpleValue::None),
            1 => Ok(SimpleValue::One(values.remove(0))),
            _ if unique => {
                let shown: Vec<String> = values.iter().map(Value::display_text).collect();
                Err(XcatError::NotUnique {
                    pattern: pattern.to_string(),
                    results: format!("[{}]", shown.join(", ")),
                })
            }
            _ => Ok(SimpleValue::Many(values)),
        }
    }

    pub fn uns_query(&self, pattern: impl IntoPattern) -> Result<Vec<Row>> {
        self.store.execute(&pattern.into_pattern()?)
    }

    pub fn rassert(&self, batch: &AssertBatch) -> Result<Vec<Row>> {
        batch.execute(self.store.as_ref(), self.policy)
    }

    fn asserted_variable(&self, batch: AssertBatch, variable: &str) -> Result<Value> {
        self.rassert(&batch)?
            .into_iter()
            .next()
            .and_then(|mut row| row.swap_remove(variable))
            .ok_or_else(|| XcatError::Execution(format!("the store did not bind {}", variable)))
    }

    pub fn new_bnode(&self) -> Result<Value> {
        let bnode = Goal::new("bnode", vec![Term::var("X")]);
        self.asserted_variable(AssertBatch::new().goal(bnode), "X")
    }

    pub fn new_seq(&self, terms: &[Value]) -> Result<Value> {
        let list = Term::List(terms.iter().cloned().map(Term::Const).collect());
        self.asserted_variable(
            AssertBatch::new().goal(Goal::new("seq_assert", vec![Term::var("X"), list])),
            "X",
        )
    }

    /// Stores `terms` as the tracklist of `release`.
    pub fn track_list(&self, release: &Value, terms: &[Value]) -> Result<Value> {
        let seq = self.new_seq(terms)?;
        self.rassert(
            &AssertBatch::new()
                .retract(seq.clone(), vocab::RDF_TYPE, vocab::RDF_SEQ)
                .assert(seq.clone(), vocab::RDF_TYPE, vocab::XCAT_TRACK_LIST)
                .assert(release.clone(), vocab::XCAT_TRACKLIST, seq.clone()),
        )?;
        Ok(seq)
    }

    /// The resource for a partial date, created on first use.
    pub fn ldatetime(&self, parts: impl Into<DateParts>) -> Result<Value> {
        let parts = parts.into();
        let known = parts.known();
        if known.is_empty() {
            return Err(XcatError::Execution("a date needs at least a year".into()));
        }
        let resource = Value::Resource(parts.resource());
        let exists = Goal::new(
            "rdf",
            vec![
                Term::Const(resource.clone()),
                Term::value(vocab::RDF_TYPE),
                Term::value(vocab::XCAT_LDATETIME),
            ],
        );
        if !self.boolquery([exists])? {
            let mut batch =
                AssertBatch::new().assert(resource.clone(), vocab::RDF_TYPE, vocab::XCAT_LDATETIME);
            for (name, datatype, value) in known {
                let literal = Value::typed(value, datatype);
                batch = batch.assert(resource.clone(), vocab::xcat(name), literal);
            }
            self.rassert(&batch)?;
        }
        Ok(resource)
    }

    /// `class` followed by its superclasses, nearest first.
    pub fn all_classes(&self, class: &Value) -> Result<Vec<Value>> {
        let mut classes = vec![class.clone()];
        let mut current = class.clone();
        loop {
            let superclass = Goal::new(
                "rdf",
                vec![Term::Const(current), Term::value(vocab::RDFS_SUBCLASS_OF), Term::var("X")],
            );
            match self.simple_query(superclass, true)? {
                SimpleValue::One(superclass) if !classes.contains(&superclass) => {
                    classes.push(superclass.clone());
                    current = superclass;
                }
                _ => break,
            }
        }
        Ok(classes)
    }

    /// Collapses `terms` into one resource: blank nodes and lower priority
    /// resources are merged into the preferred named resource.
    pub fn unify(&self, terms: &[Value]) -> Result<Value> {
        let (bnodes, resources): (Vec<Value>, Vec<Value>) =
            terms.iter().cloned().partition(Value::is_bnode);
        debug!(?bnodes, ?resources, "unifying");
        let resources = match resources.len() {
            0 => {
                return Err(XcatError::Execution(
                    "there is no named resource to unify into".into(),
                ));
            }
            1 => resources,
            _ => self.source_priority.sort(resources)?,
        };
        let target = resources[0].clone();
        let mut batch = AssertBatch::new();
        for node in bnodes.into_iter().chain(resources.into_iter().skip(1)) {
            batch = batch.merge_into(node, target.clone());
        }
        if !batch.is_empty() {
            self.rassert(&batch)?;
        }
        Ok(target)
    }

    /// Runs a script of assert batches separated by `;`. Text after a `%` is
    /// a comment. The whole script is parsed before the first batch runs.
    /// Returns the number of batches run.
    pub fn load_statements(&self, script: &str) -> Result<usize> {
        let batches = Pattern::parse_script(script)?;
        for statements in &batches {
            self.rassert(&AssertBatch::new().statement(statements)?)?;
        }
        debug!(batches = batches.len(), "loaded statements");
        Ok(batches.len())
    }
}

impl Drop for Rpq {
    fn drop(&mut self) {
        if self.policy == WriteModePolicy::Always {
            if let Err(e) = self.store.exit_write_mode() {
                warn!(error = %e, "could not leave write mode");
            }
        }
    }
}

fn conjunction<I, P>(goals: I) -> Result<Pattern>
where
    I: IntoIterator<Item = P>,
    P: IntoPattern,
{
    Ok(Pattern::conjunction(
        goals.into_iter().map(IntoPattern::into_pattern).collect::<Result<Vec<_>>>()?,
    ))
}
