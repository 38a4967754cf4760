//! xcat – a music catalog kept as RDF triples, browsed through declarative
//! query templates.
//!
//! Calling code describes a parameterized graph-pattern query once, then binds
//! it to different parent resources to build trees, lists and display strings:
//! * A [`query::QueryTemplate`] names the parent variable, the child (key)
//!   variable, a primary pattern, an optional per-key `where` pattern, display
//!   and sort formats, and the flags `unique`, `recursive` and `null_allowed`.
//! * A [`query::BoundQuery`] is a template bound to a parent resource. It runs
//!   against a [`store::TripleStore`] the first time it is read, keeps its
//!   results, and hands out cached child queries one level down.
//! * Templates linked with [`query::QueryTemplate::chain`] form a multi-level
//!   browse (artist → release → track); a recursive template descends into
//!   itself (class hierarchies).
//!
//! ## Modules
//! * [`term`] – the [`term::Value`] union crossing the store boundary, and rows.
//! * [`pattern`] – pest-parsed graph patterns with structural variable binding.
//! * [`binding`] – parent and child descriptors with their text forms.
//! * [`template`] – display formats and [`template::QueryResult`].
//! * [`query`] – templates, bound queries, result sets, the tree-node trait.
//! * [`store`] – the store contract plus an in-memory store with roaring indexes.
//! * [`persist`] – SQLite persistence for the in-memory store.
//! * [`facade`] – [`facade::Rpq`]: queries, yes/no questions, assert batches,
//!   catalog helpers (tracklists, partial dates, unification).
//! * [`views`] – ready-made browse templates and tree rendering.
//! * [`settings`] – layered configuration.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use xcat::facade::{Rpq, WriteModePolicy};
//! use xcat::persist::PersistenceMode;
//! use xcat::query::QueryTemplate;
//! use xcat::store::Store;
//!
//! let store = Arc::new(Store::new(PersistenceMode::InMemory).unwrap());
//! let rpq = Rpq::new(store, WriteModePolicy::PerBatch).unwrap();
//! rpq.load_statements(
//!     "assert('ex:a', 'ex:made', 'ex:r'),
//!      assert('ex:r', 'http://www.w3.org/2000/01/rdf-schema#label', \"Debut\")",
//! )
//! .unwrap();
//! let template = QueryTemplate::builder("R::False", "rdf(A, 'ex:made', R)")
//!     .parent("A EQUALS ex:a")
//!     .format("{Title}")
//!     .filter("label(R, Title)")
//!     .build()
//!     .unwrap();
//! let releases = rpq.query(template);
//! let (_, first) = releases.first_item().unwrap().unwrap();
//! assert_eq!(first.display(), "Debut");
//! ```

pub mod binding;
pub mod error;
pub mod facade;
pub mod pattern;
pub mod persist;
pub mod query;
pub mod settings;
pub mod store;
pub mod template;
pub mod term;
pub mod views;
pub mod vocab;

pub use error::{Result, XcatError};
