//! Query templates and their bound, memoized executions.
//!
//! A [`QueryTemplate`] describes a parameterized query once:
//!
//! ```text
//! WITH Parent EQUALS <resource>   -- the parameter
//! SELECT Child                    -- the key of each result
//! AS "{Label}"                    -- how results are displayed
//! FROM rdf(Parent, made, Child)   -- the primary pattern
//! BY "{Label}"                    -- how results are sorted
//! WHERE label(Child, Label)       -- per-key enrichment
//! ```
//!
//! Binding a template to a parent resource gives a [`BoundQuery`], which runs
//! against a [`TripleStore`] the first time its results are needed and keeps
//! them. [`BoundQuery::child_query`] descends: a recursive template rebinds
//! itself to the key, otherwise the next stage of the chain is bound to it.

use indexmap::IndexMap;

use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::binding::{ChildSpec, ParentBinding, TypeConstraint};
use crate::error::{Result, XcatError};
use crate::pattern::{Goal, Pattern, Term};
use crate::store::TripleStore;
use crate::template::{FormatTemplate, QueryResult};
use crate::term::{OtherHasher, Row, Value};

/// How results are ordered.
#[derive(Debug, Clone, Default)]
pub enum ByFormat {
    /// Sort by the displayed string.
    #[default]
    SameAsOutput,
    /// Sort by a separately rendered string.
    Template(FormatTemplate),
    /// Keep the order in which the store produced the keys.
    Disabled,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub by: ByFormat,
    pub unique: bool,
    pub recursive: bool,
    pub null_allowed: bool,
}

// ------------- QueryTemplate -------------
/// An immutable, parsed query description. Copies are produced, never edits.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    child: ChildSpec,
    from: Pattern,
    format: FormatTemplate,
    parent: Option<ParentBinding>,
    filter: Option<Pattern>,
    options: QueryOptions,
    next: Option<Arc<QueryTemplate>>,
}

impl QueryTemplate {
    pub fn builder(child: &str, from: &str) -> QueryTemplateBuilder {
        QueryTemplateBuilder::new(child, from)
    }
    pub fn child(&self) -> &ChildSpec {
        &self.child
    }
    pub fn from(&self) -> &Pattern {
        &self.from
    }
    pub fn format(&self) -> &FormatTemplate {
        &self.format
    }
    pub fn parent(&self) -> Option<&ParentBinding> {
        self.parent.as_ref()
    }
    pub fn filter(&self) -> Option<&Pattern> {
        self.filter.as_ref()
    }
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }
    pub fn next(&self) -> Option<&Arc<QueryTemplate>> {
        self.next.as_ref()
    }
    pub fn with_next(&self, next: Option<Arc<QueryTemplate>>) -> QueryTemplate {
        QueryTemplate { next, ..self.clone() }
    }
    pub fn with_parent(&self, parent: Option<ParentBinding>) -> QueryTemplate {
        QueryTemplate { parent, ..self.clone() }
    }

    /// Links `stages` so that each one's `next` is the following stage, and
    /// returns the first. Linking happens back to front, so every stage shares
    /// its successors.
    pub fn chain(stages: impl IntoIterator<Item = QueryTemplate>) -> Option<Arc<QueryTemplate>> {
        let stages: Vec<QueryTemplate> = stages.into_iter().collect();
        let mut next: Option<Arc<QueryTemplate>> = None;
        for stage in stages.into_iter().rev() {
            next = Some(Arc::new(QueryTemplate { next: next.take(), ..stage }));
        }
        next
    }

    fn describe(
        &self,
        parent: Option<&ParentBinding>,
        f: &mut fmt::Formatter,
        depth: usize,
    ) -> fmt::Result {
        let indent = "    ".repeat(depth);
        if let Some(parent) = parent {
            write!(f, "{}WITH {}\n{}", indent, parent, indent)?;
        } else {
            write!(f, "{}", indent)?;
        }
        write!(f, "SELECT {} AS {} FROM {}", self.child, self.format, self.from)?;
        match &self.options.by {
            ByFormat::SameAsOutput => (),
            ByFormat::Template(by) => write!(f, " BY {}", by)?,
            ByFormat::Disabled => write!(f, " BY NOTHING")?,
        }
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter)?;
        }
        if self.options.unique {
            write!(f, " UNIQUE")?;
        }
        if self.options.null_allowed {
            write!(f, " NULL ALLOWED")?;
        }
        if self.options.recursive {
            write!(f, " RECURSIVE")?;
        } else if let Some(next) = &self.next {
            writeln!(f, " THEN")?;
            next.describe(next.parent(), f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for QueryTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.describe(self.parent.as_ref(), f, 0)
    }
}

/// Collects the pieces of a [`QueryTemplate`]. Text arguments are parsed
/// immediately; the first failure is reported by [`QueryTemplateBuilder::build`].
pub struct QueryTemplateBuilder {
    child: Result<ChildSpec>,
    from: Result<Pattern>,
    format: Option<Result<FormatTemplate>>,
    parent: Option<Result<ParentBinding>>,
    filter: Option<Result<Pattern>>,
    by: Option<Result<ByFormat>>,
    options: QueryOptions,
}

impl QueryTemplateBuilder {
    pub fn new(child: &str, from: &str) -> Self {
        Self {
            child: child.parse(),
            from: Pattern::parse(from),
            format: None,
            parent: None,
            filter: None,
            by: None,
            options: QueryOptions::default(),
        }
    }
    pub fn child_spec(mut self, child: ChildSpec) -> Self {
        self.child = Ok(child);
        self
    }
    pub fn pattern(mut self, from: Pattern) -> Self {
        self.from = Ok(from);
        self
    }
    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(FormatTemplate::parse(format));
        self
    }
    pub fn format_template(mut self, format: FormatTemplate) -> Self {
        self.format = Some(Ok(format));
        self
    }
    pub fn parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.parse());
        self
    }
    pub fn parent_binding(mut self, parent: ParentBinding) -> Self {
        self.parent = Some(Ok(parent));
        self
    }
    pub fn filter(mut self, filter: &str) -> Self {
        self.filter = Some(Pattern::parse(filter));
        self
    }
    pub fn by(mut self, by: &str) -> Self {
        self.by = Some(FormatTemplate::parse(by).map(ByFormat::Template));
        self
    }
    pub fn by_format(mut self, by: ByFormat) -> Self {
        self.by = Some(Ok(by));
        self
    }
    pub fn unsorted(self) -> Self {
        self.by_format(ByFormat::Disabled)
    }
    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }
    pub fn recursive(mut self) -> Self {
        self.options.recursive = true;
        self
    }
    pub fn null_allowed(mut self) -> Self {
        self.options.null_allowed = true;
        self
    }
    pub fn build(self) -> Result<QueryTemplate> {
        let child = self.child?;
        let format = match self.format {
            Some(format) => format?,
            None => FormatTemplate::list([child.variable()]),
        };
        let mut options = self.options;
        if let Some(by) = self.by {
            options.by = by?;
        }
        Ok(QueryTemplate {
            from: self.from?,
            format,
            parent: self.parent.transpose()?,
            filter: self.filter.transpose()?,
            options,
            next: None,
            child,
        })
    }
}

/// One stage of a query chain: a finished template or a builder still to be
/// built.
pub enum Stage {
    Template(QueryTemplate),
    Builder(QueryTemplateBuilder),
}

impl Stage {
    pub fn into_template(self) -> Result<QueryTemplate> {
        match self {
            Stage::Template(template) => Ok(template),
            Stage::Builder(builder) => builder.build(),
        }
    }
}

impl From<QueryTemplate> for Stage {
    fn from(template: QueryTemplate) -> Self {
        Stage::Template(template)
    }
}
impl From<QueryTemplateBuilder> for Stage {
    fn from(builder: QueryTemplateBuilder) -> Self {
        Stage::Builder(builder)
    }
}

// ------------- ResultSet -------------
/// Results keyed by resource, in display order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: IndexMap<Value, QueryResult, OtherHasher>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, QueryResult> {
        self.entries.iter()
    }
    pub fn keys(&self) -> indexmap::map::Keys<'_, Value, QueryResult> {
        self.entries.keys()
    }
    pub fn values(&self) -> indexmap::map::Values<'_, Value, QueryResult> {
        self.entries.values()
    }
    pub fn get(&self, key: &Value) -> Option<&QueryResult> {
        self.entries.get(key)
    }
    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }
    pub fn index_of(&self, key: &Value) -> Option<usize> {
        self.entries.get_index_of(key)
    }
    pub fn get_index(&self, index: usize) -> Option<(&Value, &QueryResult)> {
        self.entries.get_index(index)
    }
    pub fn first(&self) -> Option<(&Value, &QueryResult)> {
        self.entries.first()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = (&'a Value, &'a QueryResult);
    type IntoIter = indexmap::map::Iter<'a, Value, QueryResult>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ------------- BoundQuery -------------
/// A template bound to a parent resource, with its results computed at most
/// once and its child queries cached per key.
pub struct BoundQuery {
    store: Arc<dyn TripleStore>,
    template: Option<Arc<QueryTemplate>>,
    parent: Option<ParentBinding>,
    results: OnceCell<ResultSet>,
    children: RefCell<HashMap<Value, Rc<BoundQuery>, OtherHasher>>,
}

impl BoundQuery {
    /// Binds `template` to the parent it carries, if any.
    pub fn new(store: Arc<dyn TripleStore>, template: Arc<QueryTemplate>) -> Self {
        let parent = template.parent.clone();
        Self::with_parent(store, Some(template), parent)
    }
    /// A node without a template. It has no results and no children.
    pub fn leaf(store: Arc<dyn TripleStore>) -> Self {
        Self::with_parent(store, None, None)
    }
    fn with_parent(
        store: Arc<dyn TripleStore>,
        template: Option<Arc<QueryTemplate>>,
        parent: Option<ParentBinding>,
    ) -> Self {
        Self {
            store,
            template,
            parent,
            results: OnceCell::new(),
            children: RefCell::new(HashMap::default()),
        }
    }
    pub fn template(&self) -> Option<&Arc<QueryTemplate>> {
        self.template.as_ref()
    }
    pub fn parent(&self) -> Option<&ParentBinding> {
        self.parent.as_ref()
    }
    pub fn is_leaf(&self) -> bool {
        self.template.is_none()
    }
    pub fn is_computed(&self) -> bool {
        self.results.get().is_some()
    }

    /// The same template bound to `resource`, with a cold cache. `None`
    /// keeps the current parent binding.
    pub fn copy(&self, resource: Option<Value>) -> Result<BoundQuery> {
        let parent = match resource {
            None => self.parent.clone(),
            Some(resource) => match (&self.parent, &self.template) {
                (Some(parent), _) => Some(parent.rebound(resource)),
                (None, Some(template)) => {
                    return Err(XcatError::Binding(format!(
                        "cannot bind {} to a query without a parent variable:\n{}",
                        resource, template
                    )));
                }
                (None, None) => None,
            },
        };
        Ok(Self::with_parent(Arc::clone(&self.store), self.template.clone(), parent))
    }

    pub fn results(&self) -> Result<&ResultSet> {
        if let Some(results) = self.results.get() {
            return Ok(results);
        }
        let computed = match &self.template {
            Some(template) => self.execute(template)?,
            None => ResultSet::default(),
        };
        Ok(self.results.get_or_init(|| computed))
    }
    pub fn items(&self) -> Result<indexmap::map::Iter<'_, Value, QueryResult>> {
        Ok(self.results()?.iter())
    }
    pub fn keys(&self) -> Result<indexmap::map::Keys<'_, Value, QueryResult>> {
        Ok(self.results()?.keys())
    }
    pub fn values(&self) -> Result<indexmap::map::Values<'_, Value, QueryResult>> {
        Ok(self.results()?.values())
    }
    pub fn len(&self) -> Result<usize> {
        Ok(self.results()?.len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.results()?.is_empty())
    }
    pub fn first_item(&self) -> Result<Option<(&Value, &QueryResult)>> {
        Ok(self.results()?.first())
    }
    pub fn get(&self, key: &Value) -> Result<Option<&QueryResult>> {
        Ok(self.results()?.get(key))
    }
    pub fn index(&self, key: &Value) -> Result<&QueryResult> {
        self.results()?
            .get(key)
            .ok_or_else(|| XcatError::Binding(format!("{} is not a key of this query", key)))
    }

    /// The query one level below `key`. Repeated calls return the same node.
    pub fn child_query(&self, key: &Value) -> Result<Rc<BoundQuery>> {
        if !self.results()?.contains_key(key) {
            return Err(XcatError::Binding(format!("{} is not a key of this query", key)));
        }
        if let Some(child) = self.children.borrow().get(key) {
            return Ok(Rc::clone(child));
        }
        let child = match &self.template {
            Some(template) if template.options.recursive => self.copy(Some(key.clone()))?,
            Some(template) => match &template.next {
                Some(next) => {
                    let parent = next.parent.as_ref().ok_or_else(|| {
                        XcatError::Binding(format!(
                            "the stage after {} has no parent variable:\n{}",
                            key, next
                        ))
                    })?;
                    Self::with_parent(
                        Arc::clone(&self.store),
                        Some(Arc::clone(next)),
                        Some(parent.rebound(key.clone())),
                    )
                }
                None => Self::leaf(Arc::clone(&self.store)),
            },
            None => Self::leaf(Arc::clone(&self.store)),
        };
        let child = Rc::new(child);
        self.children.borrow_mut().insert(key.clone(), Rc::clone(&child));
        Ok(child)
    }

    fn execute(&self, template: &QueryTemplate) -> Result<ResultSet> {
        let child = &template.child;
        let mut from = template.from.clone();
        let mut filter = template.filter.clone();
        if let Some(parent) = &self.parent {
            let resource = parent.resource().ok_or_else(|| {
                XcatError::Binding(format!(
                    "parent variable {} has no resource",
                    parent.variable()
                ))
            })?;
            from = from.bind(parent.variable(), resource);
            filter = filter.map(|filter| filter.bind(parent.variable(), resource));
            // a typed parent must be an instance of its type before anything runs
            if let TypeConstraint::Exact(rdf_type) = parent.type_constraint() {
                let check = Goal::new(
                    "individual_of",
                    vec![Term::Const(resource.clone()), Term::value(rdf_type.as_str())],
                );
                from = Pattern::conjunction([Pattern::from_goals(vec![check]), from]);
            }
        }
        if let Some(join) = child.type_join() {
            match filter.as_mut() {
                Some(filter) if child.unpack_list() => filter.extend(join),
                _ => from.extend(join),
            }
        }

        debug!(pattern = %from, "primary pattern");
        let mut keyed: IndexMap<Value, Row, OtherHasher> = IndexMap::default();
        for row in self.store.execute(&from)? {
            let value = row.get(child.variable()).cloned().ok_or_else(|| {
                XcatError::Execution(format!(
                    "a solution of {} does not bind {}",
                    from,
                    child.variable()
                ))
            })?;
            match value {
                Value::List(elements) if child.unpack_list() => {
                    for element in elements {
                        let element = element.normalized();
                        let mut unpacked = row.clone();
                        unpacked.insert(child.variable().to_owned(), element.clone());
                        keyed.insert(element, unpacked);
                    }
                }
                value => {
                    keyed.insert(value.normalized(), row);
                }
            }
        }

        let mut solutions = Vec::with_capacity(keyed.len());
        for (key, mut row) in keyed {
            if let Some(filter) = &filter {
                let bound = filter.bind(child.variable(), &key);
                match self.store.execute(&bound)?.into_iter().next() {
                    Some(extra) => row.extend(extra),
                    None if template.options.null_allowed => (),
                    None => continue,
                }
            }
            solutions.push((key, row));
        }

        let sort_template = match &template.options.by {
            ByFormat::SameAsOutput => Some(None),
            ByFormat::Template(by) => Some(Some(by)),
            ByFormat::Disabled => None,
        };
        let mut rendered: Vec<(Value, QueryResult, String)> = solutions
            .into_iter()
            .map(|(key, row)| {
                let result = template.format.result(&[], &row);
                let sort_key = match sort_template {
                    Some(Some(by)) => by.result(&[], &row).into_display(),
                    Some(None) => result.display().to_owned(),
                    None => String::new(),
                };
                (key, result, sort_key)
            })
            .collect();
        if sort_template.is_some() {
            rendered.sort_by(|a, b| a.2.cmp(&b.2));
        }

        let mut entries: IndexMap<Value, QueryResult, OtherHasher> = IndexMap::default();
        let mut seen: HashSet<String> = HashSet::new();
        for (key, result, _) in rendered {
            if template.options.unique && !seen.insert(result.display().to_owned()) {
                continue;
            }
            entries.insert(key, result);
        }
        debug!(results = entries.len(), "query computed");
        Ok(ResultSet { entries })
    }
}

impl fmt::Display for BoundQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.template {
            Some(template) => template.describe(self.parent.as_ref(), f, 0),
            None => write!(f, "<leaf>"),
        }
    }
}

impl fmt::Debug for BoundQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BoundQuery")
            .field("parent", &self.parent)
            .field("computed", &self.is_computed())
            .finish()
    }
}

// ------------- QueryNode -------------
/// What a tree view needs from a node: its entries and a way down.
pub trait QueryNode {
    fn entries(&self) -> Result<Vec<(Value, QueryResult)>>;
    fn descend(&self, key: &Value) -> Result<Rc<Self>>
    where
        Self: Sized;
    fn is_leaf(&self) -> bool;
}

impl QueryNode for BoundQuery {
    fn entries(&self) -> Result<Vec<(Value, QueryResult)>> {
        Ok(self.items()?.map(|(key, result)| (key.clone(), result.clone())).collect())
    }
    fn descend(&self, key: &Value) -> Result<Rc<Self>> {
        self.child_query(key)
    }
    fn is_leaf(&self) -> bool {
        BoundQuery::is_leaf(self)
    }
}
