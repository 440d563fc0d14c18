use crate::compiler_frontend::types::{
    IType, NullPolicy, TypedSockets, WILDCARD_SPECIFICITY_COST, check_type_compatibility,
    check_type_compatibility_with, infer_abstract_type, replace_abstract_type, specificity_cost,
};
use proptest::prelude::*;

fn parse(text: &str) -> IType {
    text.parse().expect("type should parse")
}

fn arb_type() -> impl Strategy<Value = IType> {
    let leaf = prop_oneof![
        Just(IType::Number),
        Just(IType::String),
        Just(IType::Boolean),
        Just(IType::Timestamp),
        Just(IType::Null),
        Just(IType::Wildcard),
        "[A-Z][a-z]{0,6}".prop_map(IType::Enum),
        "(?s).{0,8}".prop_map(IType::Enum),
        "(?s).{0,8}".prop_map(IType::Hierarchy),
    ];

    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(IType::nullable),
            inner.clone().prop_map(IType::list),
            inner.clone().prop_map(IType::event),
            inner.clone().prop_map(IType::interval),
            inner.clone().prop_map(IType::timeline),
            prop::collection::vec(inner.clone(), 0..4).prop_map(IType::Union),
            prop::collection::btree_map("(?s).{0,6}", inner, 0..4)
                .prop_map(IType::Struct),
        ]
    })
}

proptest! {
    #[test]
    fn canonical_string_round_trips(ty in arb_type()) {
        let text = ty.to_string();
        let parsed: IType = text.parse().expect("canonical string should parse");
        prop_assert_eq!(parsed, ty);
    }

    #[test]
    fn wildcard_requirement_accepts_everything(ty in arb_type()) {
        prop_assert!(check_type_compatibility(&IType::Wildcard, &ty));
    }

    #[test]
    fn every_type_is_compatible_with_itself(ty in arb_type()) {
        prop_assert!(check_type_compatibility(&ty, &ty));
    }
}

#[test]
fn names_that_need_quoting_round_trip() {
    let quoted = IType::structure([
        ("first name", IType::Enum(String::from("My Enum"))),
        ("", IType::Hierarchy(String::from("a<b>,c:*"))),
        ("say \"hi\"", IType::Enum(String::from("back\\slash"))),
    ]);

    let text = quoted.to_string();
    assert_eq!(parse(&text), quoted);
    assert_eq!(IType::Enum(String::from("My Enum")).to_string(), "enum<\"My Enum\">");
    assert_eq!(IType::Enum(String::new()).to_string(), "enum<\"\">");
    assert_eq!(IType::Enum(String::from("Plain")).to_string(), "enum<Plain>");

    assert!("enum<\"open".parse::<IType>().is_err());
}

#[test]
fn empty_union_round_trips() {
    assert_eq!(IType::Union(Vec::new()).to_string(), "union<>");
    assert_eq!(parse("union<>"), IType::Union(Vec::new()));
    assert_eq!(parse("list<union< >>"), IType::list(IType::Union(Vec::new())));
}

#[test]
fn parses_nested_types() {
    assert_eq!(
        parse("list<nullable<number>>"),
        IType::list(IType::nullable(IType::Number))
    );
    assert_eq!(
        parse("struct<b:string,a:*>"),
        IType::structure([("a", IType::Wildcard), ("b", IType::String)])
    );
    assert_eq!(parse(" union< number , string >").to_string(), "union<number,string>");
    assert_eq!(parse("enum<Colour>"), IType::Enum("Colour".to_owned()));
}

#[test]
fn rejects_malformed_type_strings() {
    assert!("list<number".parse::<IType>().is_err());
    assert!("lists<number>".parse::<IType>().is_err());
    assert!("number>".parse::<IType>().is_err());
    assert!("".parse::<IType>().is_err());
}

#[test]
fn union_requirement_accepts_member() {
    let union = parse("union<number,string>");
    assert!(check_type_compatibility(&union, &IType::Number));
    assert!(!check_type_compatibility(&union, &IType::Boolean));
}

#[test]
fn union_candidate_needs_every_member_to_fit() {
    let union = parse("union<number,string>");
    assert!(!check_type_compatibility(&IType::Number, &union));

    let same_members = parse("union<number,number>");
    assert!(check_type_compatibility(&IType::Number, &same_members));

    let wider = parse("union<number,string,boolean>");
    assert!(check_type_compatibility(&wider, &union));
    assert!(!check_type_compatibility(&union, &wider));
}

#[test]
fn nullable_rules_are_directional() {
    let nullable_number = IType::nullable(IType::Number);

    // A plain value always satisfies a nullable socket
    assert!(check_type_compatibility(&nullable_number, &IType::Number));
    assert!(check_type_compatibility(&nullable_number, &IType::Null));

    // A nullable value only satisfies a plain socket when widening is allowed
    assert!(!check_type_compatibility(&IType::Number, &nullable_number));
    assert!(check_type_compatibility_with(
        &IType::Number,
        &nullable_number,
        NullPolicy::AllowNullWidening
    ));
}

#[test]
fn parametric_types_need_same_constructor() {
    assert!(check_type_compatibility(
        &parse("list<*>"),
        &parse("list<number>")
    ));
    assert!(!check_type_compatibility(
        &parse("list<number>"),
        &parse("event<number>")
    ));
    assert!(check_type_compatibility(
        &parse("struct<a:number,b:*>"),
        &parse("struct<a:number,b:string>")
    ));
    assert!(!check_type_compatibility(
        &parse("struct<a:number>"),
        &parse("struct<a:number,b:string>")
    ));
    assert!(!check_type_compatibility(
        &IType::Enum("A".to_owned()),
        &IType::Enum("B".to_owned())
    ));
}

#[test]
fn specificity_prefers_narrow_types() {
    assert_eq!(specificity_cost(&IType::Number), 1);
    assert_eq!(specificity_cost(&parse("union<number,string,boolean>")), 3);
    assert_eq!(specificity_cost(&IType::Wildcard), WILDCARD_SPECIFICITY_COST);
}

#[test]
fn infers_wildcard_binding() {
    assert_eq!(
        infer_abstract_type(&parse("list<*>"), &parse("list<number>")),
        Some(IType::Number)
    );
    assert_eq!(
        infer_abstract_type(&IType::Wildcard, &parse("list<number>")),
        Some(parse("list<number>"))
    );
    assert_eq!(
        infer_abstract_type(&parse("struct<a:*,b:*>"), &parse("struct<a:number,b:string>")),
        None
    );
    assert_eq!(
        infer_abstract_type(&parse("list<*>"), &IType::Number),
        None
    );
    assert_eq!(
        infer_abstract_type(&IType::Number, &IType::Number),
        Some(IType::Number)
    );
}

#[test]
fn replaces_every_wildcard() {
    assert_eq!(
        replace_abstract_type(&parse("struct<a:*,b:list<*>>"), &IType::Number),
        parse("struct<a:number,b:list<number>>")
    );
}

#[test]
fn typed_sockets_share_inferred_type() {
    let mut sockets = TypedSockets::new([
        ("items", parse("list<*>")),
        ("needle", IType::Wildcard),
        ("count", IType::Number),
    ]);

    assert!(sockets.set_type("items", &parse("list<string>")));
    assert_eq!(sockets.socket_type("needle"), Some(&IType::String));
    assert_eq!(sockets.socket_type("count"), Some(&IType::Number));

    // An incompatible connection is refused without touching the current types
    assert!(!sockets.set_type("items", &IType::Boolean));
    assert_eq!(sockets.socket_type("items"), Some(&parse("list<string>")));

    sockets.reset_types();
    assert_eq!(sockets.socket_type("needle"), Some(&IType::Wildcard));
}

#[test]
fn types_serialize_as_canonical_strings() {
    let ty = parse("nullable<list<number>>");
    let json = serde_json::to_string(&ty).expect("type should serialize");
    assert_eq!(json, "\"nullable<list<number>>\"");

    let back: IType = serde_json::from_str(&json).expect("type should deserialize");
    assert_eq!(back, ty);
}
