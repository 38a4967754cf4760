//! Reusable query descriptions for browsing the catalog, and tree rendering
//! for anything implementing [`QueryNode`].

use serde_json::json;

use std::fmt::Write;

use crate::binding::{ChildSpec, ParentBinding, TypeConstraint};
use crate::error::{Result, XcatError};
use crate::query::{QueryNode, QueryTemplate};
use crate::term::Value;
use crate::vocab;

fn lit(iri: &str) -> String {
    Value::resource(iri).to_pattern_literal()
}

/// Subclasses of `root`, recursively, displayed by label.
pub fn class_hierarchy(root: Option<&str>) -> Result<QueryTemplate> {
    let pattern = format!("rdf(Class, {}, Parent)", lit(vocab::RDFS_SUBCLASS_OF));
    let root = root.unwrap_or(vocab::RDFS_RESOURCE);
    QueryTemplate::builder("Class::False", &pattern)
        .parent_binding(ParentBinding::new("Parent").with_resource(root))
        .format("{Label}")
        .filter("label(Class, Label)")
        .recursive()
        .build()
}

/// Everything that is an instance of `class` or one of its subclasses.
pub fn instance_list(class: &str) -> Result<QueryTemplate> {
    QueryTemplate::builder("Instance::False", "individual_of(Instance, Class)")
        .parent_binding(ParentBinding::new("Class").with_resource(class))
        .format("{Label}")
        .filter("label(Instance, Label)")
        .null_allowed()
        .build()
}

/// Artists, then their releases, then each release's tracks in tracklist order.
pub fn artist_releases() -> Result<Vec<QueryTemplate>> {
    let pattern = format!("type(Artist, {})", lit(vocab::XCAT_ARTIST));
    let artists = QueryTemplate::builder("Artist", &pattern)
        .format("{Name}")
        .filter("label(Artist, Name)")
        .build()?;
    let pattern = format!("rdf(Artist, {}, Release)", lit(vocab::XCAT_MADE));
    let release_type = TypeConstraint::exact(vocab::XCAT_RELEASE)?;
    let releases = QueryTemplate::builder("Release", &pattern)
        .child_spec(ChildSpec::new("Release").with_type(release_type))
        .parent("Artist EQUALS")
        .format("{Title}")
        .filter("label(Release, Title)")
        .build()?;
    let tracks = QueryTemplate::builder(
        "[Track]",
        &format!("rdf(Release, {}, List), seq(List, Track)", lit(vocab::XCAT_TRACKLIST)),
    )
    .parent("Release EQUALS")
    .format("{Title}")
    .filter("label(Track, Title)")
    .unsorted()
    .build()?;
    Ok(vec![artists, releases, tracks])
}

/// Every property of `resource`, as `label: value`.
pub fn instance_properties(resource: &str) -> Result<QueryTemplate> {
    QueryTemplate::builder("Object::False", "rdf(Subject, Property, Object), label(Property, Name)")
        .parent_binding(ParentBinding::new("Subject").with_resource(resource))
        .format("{Name}: {Object}")
        .build()
}

/// Renders `root` and its descendants, one indented line per result, down to
/// `max_depth` levels.
pub fn render_tree<N: QueryNode>(root: &N, max_depth: usize) -> Result<String> {
    let mut out = String::new();
    render_level(root, 0, max_depth, &mut out)?;
    Ok(out)
}

fn render_level<N: QueryNode>(
    node: &N,
    depth: usize,
    max_depth: usize,
    out: &mut String,
) -> Result<()> {
    if depth >= max_depth {
        return Ok(());
    }
    for (key, result) in node.entries()? {
        writeln!(out, "{}{}", "  ".repeat(depth), result.display())
            .map_err(|e| XcatError::Invariant(e.to_string()))?;
        let child = node.descend(&key)?;
        if !child.is_leaf() {
            render_level(child.as_ref(), depth + 1, max_depth, out)?;
        }
    }
    Ok(())
}

/// The same tree as [`render_tree`], as JSON.
pub fn tree_json<N: QueryNode>(root: &N, max_depth: usize) -> Result<serde_json::Value> {
    if max_depth == 0 {
        return Ok(json!([]));
    }
    let mut nodes = Vec::new();
    for (key, result) in root.entries()? {
        let child = root.descend(&key)?;
        let children = if child.is_leaf() {
            json!([])
        } else {
            tree_json(child.as_ref(), max_depth - 1)?
        };
        nodes.push(json!({
            "key": key.display_text(),
            "display": result.display(),
            "type": result.resource_type().map(Value::display_text),
            "children": children,
        }));
    }
    Ok(serde_json::Value::Array(nodes))
}
