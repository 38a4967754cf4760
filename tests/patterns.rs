use xcat::XcatError;
use xcat::pattern::{Pattern, Term, parse_value_prefix};
use xcat::term::Value;

#[test]
fn parses_goals_and_arguments() {
    let text = "rdf(Artist, 'http://xeroxc.at/schema#made', Release), label(Release, Title).";
    let pattern = Pattern::parse(text).expect("pattern");
    assert_eq!(pattern.goals().len(), 2);
    assert_eq!(pattern.goals()[0].name(), "rdf");
    assert_eq!(
        pattern.goals()[0].args(),
        [Term::var("Artist"), Term::value("http://xeroxc.at/schema#made"), Term::var("Release")]
    );
    assert_eq!(pattern.variables(), ["Artist", "Release", "Title"]);
}

#[test]
fn parses_literals() {
    let text = r#"p("text", 42, -1, '2024'^^'xsd:gYear', 3^^'xsd:gMonth', [a, 'b', X], name)"#;
    let pattern = Pattern::parse(text).expect("pattern");
    let args = pattern.goals()[0].args();
    assert_eq!(args[0], Term::Const(Value::text("text")));
    assert_eq!(args[1], Term::Const(Value::Integer(42)));
    assert_eq!(args[2], Term::Const(Value::Integer(-1)));
    assert_eq!(args[3], Term::Const(Value::typed("2024", "xsd:gYear")));
    assert_eq!(args[4], Term::Const(Value::typed("3", "xsd:gMonth")));
    assert_eq!(args[5], Term::List(vec![Term::value("a"), Term::value("b"), Term::var("X")]));
    assert_eq!(args[6], Term::value("name"));
}

#[test]
fn single_quotes_are_escaped_and_recovered() {
    let tricky = Value::resource("http://example.org/O'Brien\\n");
    let literal = tricky.to_pattern_literal();
    assert_eq!(literal, r"'http://example.org/O\'Brien\\n'");
    let pattern = Pattern::parse(&format!("rdf({}, P, O)", literal)).expect("pattern");
    assert_eq!(pattern.goals()[0].args()[0], Term::Const(tricky));
}

#[test]
fn binding_is_structural() {
    let pattern = Pattern::parse("rdf(A, 'ex:made', R), label(R, T)").expect("pattern");
    let hostile = Value::resource("ex:a'), retract(X, Y, Z), rdf('ex:b");
    let bound = pattern.bind("A", &hostile);
    assert_eq!(bound.goals().len(), 2);
    assert_eq!(bound.goals()[0].args()[0], Term::Const(hostile.clone()));
    assert_eq!(bound.variables(), ["R", "T"]);
    // rendering and parsing again yields the same pattern
    let reparsed = Pattern::parse(&bound.to_string()).expect("pattern");
    assert_eq!(reparsed, bound);
}

#[test]
fn anonymous_variables_are_distinct() {
    let pattern = Pattern::parse("rdf(_, P, _)").expect("pattern");
    let variables = pattern.variables();
    assert_eq!(variables.len(), 3);
    assert_ne!(variables[0], variables[2]);
    assert!(variables[0].starts_with('_'));
}

#[test]
fn syntax_errors_carry_a_position() {
    match Pattern::parse("rdf(A, B\n, ") {
        Err(XcatError::Parse { line, col, .. }) => {
            assert_eq!(line, Some(2));
            assert!(col.is_some());
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
    assert!(Pattern::parse("Rdf(A)").is_err());
    assert!(Pattern::parse("").is_err());
}

#[test]
fn conjunction_keeps_goal_order() {
    let first = Pattern::parse("a(X)").expect("pattern");
    let second = Pattern::parse("b(X), c(Y)").expect("pattern").distinct();
    let joined = Pattern::conjunction([first, second]);
    let names: Vec<&str> = joined.goals().iter().map(|g| g.name()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert!(joined.is_distinct());
}

#[test]
fn scripts_split_on_semicolons_outside_literals() {
    let script = "
        % header; not a batch
        a('x;y'), b(\"1;2\");
        c(X).
        ;
        d
    ";
    let batches = Pattern::parse_script(script).expect("script");
    let names: Vec<Vec<&str>> = batches
        .iter()
        .map(|batch| batch.goals().iter().map(|g| g.name()).collect())
        .collect();
    assert_eq!(names, [vec!["a", "b"], vec!["c"], vec!["d"]]);
    assert_eq!(batches[0].goals()[0].args(), [Term::value("x;y")]);
    assert!(Pattern::parse_script("").expect("empty script").is_empty());
    assert!(Pattern::parse_script("a(X); b(").is_err());
}

#[test]
fn value_prefixes_stop_at_the_literal() {
    let (value, rest) = parse_value_prefix("'urn:a::b'::ex:T").expect("parse").expect("value");
    assert_eq!(value, Value::resource("urn:a::b"));
    assert_eq!(rest, "::ex:T");
    let (value, rest) = parse_value_prefix("[1, \"two\"]").expect("parse").expect("value");
    assert_eq!(value, Value::List(vec![Value::Integer(1), Value::text("two")]));
    assert_eq!(rest, "");
    assert!(parse_value_prefix("ex:a").expect("parse").is_none());
    // lists with variables are not values
    assert!(parse_value_prefix("[X]").is_err());
}
