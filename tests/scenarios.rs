use std::sync::Arc;

use xcat::facade::{Rpq, WriteModePolicy};
use xcat::persist::PersistenceMode;
use xcat::query::QueryTemplate;
use xcat::store::Store;
use xcat::term::Value;
use xcat::views;
use xcat::vocab;

fn lit(iri: &str) -> String {
    Value::resource(iri).to_pattern_literal()
}

// Two artists, three releases, one tracklist, and a small class tree.
fn catalog() -> Rpq {
    let store = Arc::new(Store::new(PersistenceMode::InMemory).expect("store"));
    let agent = vocab::xcat("Agent");
    let album = vocab::xcat("Album");
    let schema = [
        (vocab::XCAT_ARTIST, vocab::RDFS_SUBCLASS_OF, agent.as_str()),
        (agent.as_str(), vocab::RDFS_SUBCLASS_OF, vocab::RDFS_RESOURCE),
        (vocab::XCAT_RELEASE, vocab::RDFS_SUBCLASS_OF, vocab::RDFS_RESOURCE),
        (album.as_str(), vocab::RDFS_SUBCLASS_OF, vocab::XCAT_RELEASE),
        (vocab::XCAT_TRACK, vocab::RDFS_SUBCLASS_OF, vocab::RDFS_RESOURCE),
    ];
    for (s, p, o) in schema {
        store.add_triple(s, p, o).expect("schema");
    }
    let things = [
        ("ex:artist/1", vocab::XCAT_ARTIST, "Broadcast"),
        ("ex:artist/2", vocab::XCAT_ARTIST, "Autechre"),
        ("ex:release/1", vocab::XCAT_RELEASE, "Tender Buttons"),
        ("ex:release/2", vocab::XCAT_RELEASE, "Haha Sound"),
        ("ex:release/3", album.as_str(), "Confield"),
        ("ex:track/1", vocab::XCAT_TRACK, "Black Cat"),
        ("ex:track/2", vocab::XCAT_TRACK, "Tears in the Typing Pool"),
        ("ex:track/3", vocab::XCAT_TRACK, "America's Boy"),
    ];
    for (resource, class, label) in things {
        store.add_triple(resource, vocab::RDF_TYPE, class).expect("type");
        store.add_triple(resource, vocab::RDFS_LABEL, Value::text(label)).expect("label");
    }
    for (artist, release) in [
        ("ex:artist/1", "ex:release/1"),
        ("ex:artist/1", "ex:release/2"),
        ("ex:artist/2", "ex:release/3"),
    ] {
        store.add_triple(artist, vocab::XCAT_MADE, release).expect("made");
    }
    let rpq = Rpq::new(store, WriteModePolicy::PerBatch).expect("rpq");
    rpq.track_list(
        &Value::resource("ex:release/1"),
        &[
            Value::resource("ex:track/2"),
            Value::resource("ex:track/1"),
            Value::resource("ex:track/3"),
        ],
    )
    .expect("tracklist");
    rpq
}

fn displays(query: &xcat::query::BoundQuery) -> Vec<String> {
    query.values().expect("values").map(|r| r.display().to_owned()).collect()
}

#[test]
fn artist_to_releases() {
    let rpq = catalog();
    let made = format!("rdf(Artist, {}, Release)", lit(vocab::XCAT_MADE));
    let template = QueryTemplate::builder("Release", &made)
        .parent("Artist EQUALS ex:artist/1")
        .format("{Title}")
        .filter("label(Release, Title)")
        .build()
        .expect("template");
    let releases = rpq.query(template);
    assert_eq!(displays(&releases), ["Haha Sound", "Tender Buttons"]);
    let keys: Vec<&Value> = releases.keys().expect("keys").collect();
    assert_eq!(keys, [&Value::resource("ex:release/2"), &Value::resource("ex:release/1")]);
    let (_, first) = releases.first_item().expect("first").expect("non-empty");
    assert_eq!(first.resource_type(), Some(&Value::resource(vocab::XCAT_RELEASE)));

    // the same template, rebound to the other artist
    let other = releases.copy(Some(Value::resource("ex:artist/2"))).expect("copy");
    assert_eq!(displays(&other), ["Confield"]);
    assert_eq!(
        other.index(&Value::resource("ex:release/3")).expect("index").resource_type(),
        Some(&Value::resource(vocab::xcat("Album")))
    );
}

#[test]
fn exact_type_admits_subclasses() {
    let rpq = catalog();
    let template = QueryTemplate::builder(
        &format!("Release::{}", vocab::XCAT_RELEASE),
        &format!("rdf(_, {}, Release)", lit(vocab::XCAT_MADE)),
    )
    .format("{Title}")
    .filter("label(Release, Title)")
    .build()
    .expect("template");
    assert_eq!(displays(&rpq.query(template)), ["Confield", "Haha Sound", "Tender Buttons"]);
}

#[test]
fn chain_descends_artist_release_track() {
    let rpq = catalog();
    let artists = rpq.query_chain(views::artist_releases().expect("view")).expect("chain");
    assert_eq!(displays(&artists), ["Autechre", "Broadcast"]);

    let releases = artists.child_query(&Value::resource("ex:artist/1")).expect("releases");
    assert_eq!(displays(&releases), ["Haha Sound", "Tender Buttons"]);

    let tracks = releases.child_query(&Value::resource("ex:release/1")).expect("tracks");
    // tracklist order, not alphabetical
    assert_eq!(displays(&tracks), ["Tears in the Typing Pool", "Black Cat", "America's Boy"]);

    let leaf = tracks.child_query(&Value::resource("ex:track/3")).expect("leaf");
    assert!(leaf.is_leaf());
    assert_eq!(leaf.len().expect("len"), 0);

    // a release without a tracklist has no tracks
    let none = releases.child_query(&Value::resource("ex:release/2")).expect("tracks");
    assert!(none.is_empty().expect("empty"));
}

#[test]
fn recursive_class_hierarchy_ends_at_leaves() {
    let rpq = catalog();
    let classes = rpq.query(views::class_hierarchy(None).expect("view"));
    assert_eq!(displays(&classes), ["Agent", "Release", "Track"]);

    let agent = classes.child_query(&Value::resource(vocab::xcat("Agent"))).expect("agent");
    assert_eq!(displays(&agent), ["Artist"]);
    let artist = agent.child_query(&Value::resource(vocab::XCAT_ARTIST)).expect("artist");
    assert!(artist.is_empty().expect("empty"));

    let tree = views::render_tree(&classes, 8).expect("tree");
    assert_eq!(tree, "Agent\n  Artist\nRelease\n  Album\nTrack\n");
}

#[test]
fn views_render_as_json() {
    let rpq = catalog();
    let classes = rpq.query(views::class_hierarchy(Some(vocab::XCAT_RELEASE)).expect("view"));
    let json = views::tree_json(&classes, 4).expect("json");
    assert_eq!(json[0]["display"], "Album");
    assert_eq!(json[0]["key"], vocab::xcat("Album"));
    assert_eq!(json[0]["children"].as_array().map(Vec::len), Some(0));
}

#[test]
fn instances_and_properties() {
    let rpq = catalog();
    let agents = rpq.query(views::instance_list(&vocab::xcat("Agent")).expect("view"));
    assert_eq!(displays(&agents), ["Autechre", "Broadcast"]);

    let properties = rpq.query(views::instance_properties("ex:artist/2").expect("view"));
    let shown = displays(&properties);
    assert!(shown.contains(&"label: Autechre".to_string()), "{:?}", shown);
    assert!(shown.contains(&"made: ex:release/3".to_string()), "{:?}", shown);
}

#[test]
fn quoted_resources_survive_binding() {
    let rpq = catalog();
    let store = rpq.store();
    let odd = "ex:artist/O'Hara";
    rpq.load_statements(&format!(
        "assert({}, {}, 'ex:release/odd'), assert('ex:release/odd', {}, \"It's\")",
        lit(odd),
        lit(vocab::XCAT_MADE),
        lit(vocab::RDFS_LABEL)
    ))
    .expect("load");
    let made = format!("rdf(Artist, {}, Release)", lit(vocab::XCAT_MADE));
    let template = QueryTemplate::builder("Release::False", &made)
        .parent("Artist EQUALS")
        .format("{Title}")
        .filter("label(Release, Title)")
        .build()
        .expect("template");
    let bound = rpq.query(template).copy(Some(Value::resource(odd))).expect("copy");
    assert_eq!(displays(&bound), ["It's"]);
    assert!(!store.in_write_mode());
}
