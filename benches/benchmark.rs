use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use xcat::facade::{Rpq, WriteModePolicy};
use xcat::pattern::Pattern;
use xcat::persist::PersistenceMode;
use xcat::query::{BoundQuery, QueryTemplate};
use xcat::store::{Store, TripleStore};
use xcat::term::Value;
use xcat::views;
use xcat::vocab;

// n artists with three releases each, every release with a five track list
fn catalog(artists: usize) -> Arc<Store> {
    let store = Arc::new(Store::new(PersistenceMode::InMemory).expect("store"));
    let shared = Arc::clone(&store) as Arc<dyn TripleStore>;
    let rpq = Rpq::new(shared, WriteModePolicy::Always).expect("rpq");
    for a in 0..artists {
        let artist = format!("ex:artist/{}", a);
        store.add_triple(artist.as_str(), vocab::RDF_TYPE, vocab::XCAT_ARTIST).expect("type");
        let name = Value::text(format!("Artist {}", a));
        store.add_triple(artist.as_str(), vocab::RDFS_LABEL, name).expect("label");
        for r in 0..3 {
            let release = format!("ex:release/{}/{}", a, r);
            store.add_triple(release.as_str(), vocab::RDF_TYPE, vocab::XCAT_RELEASE).expect("type");
            let title = Value::text(format!("Release {}", r));
            store.add_triple(release.as_str(), vocab::RDFS_LABEL, title).expect("label");
            store.add_triple(artist.as_str(), vocab::XCAT_MADE, release.as_str()).expect("made");
            let tracks: Vec<Value> = (0..5)
                .map(|t| {
                    let track = format!("ex:track/{}/{}/{}", a, r, t);
                    let title = Value::text(format!("Track {}", t));
                    let track_type = vocab::XCAT_TRACK;
                    store.add_triple(track.as_str(), vocab::RDF_TYPE, track_type).expect("type");
                    store.add_triple(track.as_str(), vocab::RDFS_LABEL, title).expect("label");
                    Value::resource(track)
                })
                .collect();
            rpq.track_list(&Value::resource(release), &tracks).expect("tracklist");
        }
    }
    store
}

fn releases(store: &Arc<Store>) -> BoundQuery {
    let template = QueryTemplate::builder(
        "Release",
        &format!(
            "rdf(Artist, {}, Release)",
            Value::resource(vocab::XCAT_MADE).to_pattern_literal()
        ),
    )
    .parent("Artist EQUALS ex:artist/0")
    .format("{Title}")
    .filter("label(Release, Title)")
    .build()
    .expect("template");
    BoundQuery::new(Arc::clone(store) as Arc<dyn TripleStore>, Arc::new(template))
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let store = catalog(100);
    let made = Pattern::parse(&format!(
        "rdf(A, {}, R)",
        Value::resource(vocab::XCAT_MADE).to_pattern_literal()
    ))
    .expect("pattern");
    c.bench_function("rdf 300", |b| b.iter(|| store.execute(black_box(&made))));

    let artists = Pattern::parse(&format!(
        "individual_of(X, {})",
        Value::resource(vocab::XCAT_ARTIST).to_pattern_literal()
    ))
    .expect("pattern");
    c.bench_function("individual_of 100", |b| b.iter(|| store.execute(black_box(&artists))));

    let bound = releases(&store);
    c.bench_function("bound query 3", |b| {
        b.iter(|| bound.copy(None).and_then(|query| query.len()))
    });

    let shared = Arc::clone(&store) as Arc<dyn TripleStore>;
    let rpq = Rpq::new(shared, WriteModePolicy::PerBatch).expect("rpq");
    c.bench_function("chain descent", |b| {
        b.iter(|| {
            let artists = rpq.query_chain(views::artist_releases().expect("view")).expect("chain");
            let releases = artists.child_query(&Value::resource("ex:artist/42")).expect("releases");
            let tracks = releases.child_query(&Value::resource("ex:release/42/1")).expect("tracks");
            black_box(tracks.len())
        })
    });

    let big = catalog(1000);
    c.bench_function("rdf 3k", |b| b.iter(|| big.execute(black_box(&made))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
