use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use xcat::pattern::Pattern;
use xcat::persist::PersistenceMode;
use xcat::query::{BoundQuery, QueryTemplate};
use xcat::store::{Store, TripleStore};
use xcat::term::{Row, Value};
use xcat::vocab;

// Counts how often the engine reaches the store.
struct CountingStore {
    inner: Store,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TripleStore for CountingStore {
    fn execute(&self, pattern: &Pattern) -> xcat::Result<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(pattern)
    }
    fn enter_write_mode(&self) -> xcat::Result<()> {
        self.inner.enter_write_mode()
    }
    fn exit_write_mode(&self) -> xcat::Result<()> {
        self.inner.exit_write_mode()
    }
    fn in_write_mode(&self) -> bool {
        self.inner.in_write_mode()
    }
}

fn setup() -> Arc<CountingStore> {
    let inner = Store::new(PersistenceMode::InMemory).expect("store");
    for (child, parent) in [("ex:B", "ex:A"), ("ex:C", "ex:A"), ("ex:D", "ex:B")] {
        inner.add_triple(child, vocab::RDFS_SUBCLASS_OF, parent).expect("triple");
    }
    Arc::new(CountingStore { inner, calls: AtomicUsize::new(0) })
}

fn hierarchy(store: &Arc<CountingStore>, with_labels: bool) -> BoundQuery {
    let mut builder = QueryTemplate::builder(
        "Class::False",
        "rdf(Class, 'http://www.w3.org/2000/01/rdf-schema#subClassOf', Parent)",
    )
    .parent("Parent EQUALS ex:A")
    .recursive();
    if with_labels {
        builder = builder.format("{Label}").filter("label(Class, Label)");
    }
    let template = builder.build().expect("template");
    BoundQuery::new(Arc::clone(store) as Arc<dyn TripleStore>, Arc::new(template))
}

#[test]
fn results_are_computed_once() {
    let store = setup();
    let query = hierarchy(&store, false);
    assert!(!query.is_computed());
    assert_eq!(store.calls(), 0);
    assert_eq!(query.len().expect("len"), 2);
    assert!(query.is_computed());
    query.keys().expect("keys").count();
    query.first_item().expect("first");
    query.index(&Value::resource("ex:B")).expect("index");
    assert_eq!(store.calls(), 1);
}

#[test]
fn where_patterns_run_once_per_key() {
    let store = setup();
    let query = hierarchy(&store, true);
    query.values().expect("values").count();
    assert_eq!(store.calls(), 3);
    query.values().expect("values").count();
    assert_eq!(store.calls(), 3);
}

#[test]
fn child_queries_are_cached_per_key() {
    let store = setup();
    let query = hierarchy(&store, false);
    let key = Value::resource("ex:B");
    let first = query.child_query(&key).expect("child");
    assert_eq!(first.len().expect("len"), 1);
    let calls = store.calls();
    let second = query.child_query(&key).expect("child");
    assert!(Rc::ptr_eq(&first, &second));
    assert!(second.is_computed());
    assert_eq!(second.len().expect("len"), 1);
    assert_eq!(store.calls(), calls);
}

#[test]
fn failures_leave_the_cache_empty() {
    let store = setup();
    let template = QueryTemplate::builder("X", "no_such_goal(X)").build().expect("template");
    let query = BoundQuery::new(Arc::clone(&store) as Arc<dyn TripleStore>, Arc::new(template));
    assert!(query.len().is_err());
    assert!(!query.is_computed());
    // a failed attempt is retried, not remembered
    assert!(query.len().is_err());
    assert_eq!(store.calls(), 2);
}

#[test]
fn caches_do_not_see_later_writes() {
    let store = setup();
    let query = hierarchy(&store, false);
    assert_eq!(query.len().expect("len"), 2);
    store.inner.add_triple("ex:E", vocab::RDFS_SUBCLASS_OF, "ex:A").expect("triple");
    assert_eq!(query.len().expect("len"), 2);
    assert_eq!(query.copy(None).expect("copy").len().expect("len"), 3);
}
