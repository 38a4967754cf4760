use xcat::XcatError;
use xcat::binding::{ChildSpec, KEY_TYPE_VARIABLE, ParentBinding, TypeConstraint};
use xcat::pattern::Term;
use xcat::term::Value;

fn exact(iri: &str) -> TypeConstraint {
    TypeConstraint::exact(iri).expect("type")
}

#[test]
fn parent_forms_round_trip() {
    let forms = [
        ParentBinding::new("Artist").with_resource("http://musicbrainz.org/artist/1"),
        ParentBinding::new("Release")
            .with_resource("ex:release")
            .with_type(exact("http://xeroxc.at/schema#Release")),
        ParentBinding::new("Class").with_type(exact("ex:Class")),
        ParentBinding::new("Parent"),
        ParentBinding::new("Untyped").with_resource("ex:x").with_type(TypeConstraint::NoType),
        ParentBinding::new("Year").with_resource(Value::Integer(5)),
        ParentBinding::new("Year").with_resource(Value::Integer(-12)).with_type(exact("ex:T")),
        ParentBinding::new("Title").with_resource(Value::text("Love; Hate::Reprise")),
        ParentBinding::new("Odd").with_resource("urn:a::b"),
        ParentBinding::new("Odd").with_resource("urn:a::b").with_type(exact("ex:T")),
        ParentBinding::new("Quoted").with_resource("ex:O'Hara"),
        ParentBinding::new("Date").with_resource(Value::typed(3, "ex:gMonth")),
        ParentBinding::new("Seq").with_resource(Value::List(vec![
            Value::resource("ex:t1"),
            Value::Integer(2),
        ])),
    ];
    for parent in forms {
        let text = parent.to_string();
        let parsed: ParentBinding = text.parse().unwrap_or_else(|e| panic!("{text}: {e}"));
        assert_eq!(parsed, parent, "round trip of {text}");
    }
}

#[test]
fn parent_text_forms() {
    let parent: ParentBinding = "X EQUALS ex:a::ex:T".parse().expect("parent");
    assert_eq!(parent.variable(), "X");
    assert_eq!(parent.resource(), Some(&Value::resource("ex:a")));
    assert_eq!(parent.type_constraint(), &exact("ex:T"));

    let type_only: ParentBinding = "X EQUALS ::ex:T".parse().expect("parent");
    assert_eq!(type_only.resource(), None);
    assert_eq!(type_only.to_string(), "X EQUALS ::ex:T");

    let unset: ParentBinding = "Release EQUALS".parse().expect("parent");
    assert_eq!(unset.resource(), None);
    assert_eq!(unset.to_string(), "Release EQUALS");
}

#[test]
fn parent_values_are_pattern_literals() {
    let number: ParentBinding = "X EQUALS 5".parse().expect("parent");
    assert_eq!(number.resource(), Some(&Value::Integer(5)));

    let quoted: ParentBinding = "X EQUALS 'urn:a::b'::ex:T".parse().expect("parent");
    assert_eq!(quoted.resource(), Some(&Value::resource("urn:a::b")));
    assert_eq!(quoted.type_constraint(), &exact("ex:T"));

    let text: ParentBinding = "X EQUALS \"Love; Hate\"".parse().expect("parent");
    assert_eq!(text.resource(), Some(&Value::text("Love; Hate")));

    let bound = ParentBinding::new("X").rebound(Value::Integer(1997));
    assert_eq!(bound.to_string(), "X EQUALS 1997");
    assert_eq!(ParentBinding::new("X").with_resource("ex:a").to_string(), "X EQUALS 'ex:a'");

    // raw bytes are stored as the text they decode to
    let bytes = ParentBinding::new("X").with_resource(Value::Bytes(b"raw".to_vec()));
    assert_eq!(bytes.resource(), Some(&Value::text("raw")));
    assert_eq!(bytes.to_string().parse::<ParentBinding>().expect("parent"), bytes);

    assert!("X EQUALS 'unterminated".parse::<ParentBinding>().is_err());
}

#[test]
fn unwritable_types_are_rejected() {
    for iri in ["", "False", "ex:a::b"] {
        assert!(
            matches!(TypeConstraint::exact(iri), Err(XcatError::Parse { .. })),
            "{iri:?} was accepted"
        );
    }
    assert!("X::ex:a::b".parse::<ChildSpec>().is_err());
    assert!("X EQUALS 'ex:a'::ex:b::c".parse::<ParentBinding>().is_err());
    let child: ChildSpec = "X::".parse().expect("child");
    assert_eq!(child.type_constraint(), &TypeConstraint::Unconstrained);
}

#[test]
fn parent_without_equals_is_rejected() {
    assert!(matches!("X ex:a".parse::<ParentBinding>(), Err(XcatError::Parse { .. })));
    assert!(matches!("X EQUALSex:a".parse::<ParentBinding>(), Err(XcatError::Parse { .. })));
    assert!(matches!(
        "lowercase EQUALS ex:a".parse::<ParentBinding>(),
        Err(XcatError::Parse { .. })
    ));
}

#[test]
fn rebinding_leaves_the_original_untouched() {
    let template = ParentBinding::new("Artist");
    let bound = template.rebound(Value::resource("ex:a"));
    assert_eq!(template.resource(), None);
    assert_eq!(bound.resource(), Some(&Value::resource("ex:a")));
    assert_eq!(bound.variable(), "Artist");
}

#[test]
fn child_forms_round_trip() {
    let forms = [
        "Track",
        "[Track]",
        "Release::ex:Release",
        "[Track]::ex:Track",
        "Class::False",
        "[M]::False",
    ];
    for text in forms {
        let child: ChildSpec = text.parse().unwrap_or_else(|e| panic!("{text}: {e}"));
        assert_eq!(child.to_string(), text);
        assert_eq!(child.to_string().parse::<ChildSpec>().expect("child"), child);
    }
}

#[test]
fn child_text_forms() {
    let child: ChildSpec = "[Track]::False".parse().expect("child");
    assert_eq!(child.variable(), "Track");
    assert!(child.unpack_list());
    assert_eq!(child.type_constraint(), &TypeConstraint::NoType);

    let child: ChildSpec = "Release::ex:Release".parse().expect("child");
    assert!(!child.unpack_list());
    assert_eq!(child.type_constraint(), &exact("ex:Release"));

    assert!("[bad]".parse::<ChildSpec>().is_err());
}

#[test]
fn type_join_follows_the_constraint() {
    let key_type = Term::var(KEY_TYPE_VARIABLE);

    let plain = ChildSpec::new("X").type_join().expect("join");
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].name(), "type");
    assert_eq!(plain[0].args(), [Term::var("X"), key_type.clone()]);

    let typed = ChildSpec::new("X").with_type(exact("ex:T")).type_join().expect("join");
    assert_eq!(typed.len(), 2);
    assert_eq!(typed[1].name(), "subclass_of");
    assert_eq!(typed[1].args(), [key_type, Term::value("ex:T")]);

    assert!(ChildSpec::new("X").with_type(TypeConstraint::NoType).type_join().is_none());
}

#[test]
fn descriptors_are_independent_copies() {
    let child = ChildSpec::new("X");
    let unpacked = child.clone().unpacked();
    assert!(!child.unpack_list());
    assert!(unpacked.unpack_list());
}
