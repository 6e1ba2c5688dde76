use std::{
    fs,
    io::{self, BufRead, Cursor},
};

use idlc::{
    error::Diagnostics,
    model::{Enum, Module, Primitive, Struct, Type, TypeDef, TypeKind},
    parse::{open_file, parse, parse_with, ParseError, Session},
};

fn parse_str(text: &str) -> Module {
    parse(text.as_bytes(), "test.idl").expect("parse failed")
}

fn elements(module: &Module, name: &str) -> Vec<String> {
    match module.lookup(name).map(Type::kind) {
        Some(TypeKind::Enum(Enum { elements, .. })) => elements.clone(),
        other => panic!("{} is not an enum: {:?}", name, other),
    }
}

fn fields(module: &Module, name: &str) -> Vec<(String, Type)> {
    match module.lookup(name).map(Type::kind) {
        Some(TypeKind::Struct(Struct { fields, .. })) => fields
            .iter()
            .map(|field| (field.name.clone(), field.of.clone()))
            .collect(),

        other => panic!("{} is not a struct: {:?}", name, other),
    }
}

/// Resolvedor en memoria.
fn files(
    files: &'static [(&'static str, &'static str)],
) -> impl FnMut(&str) -> io::Result<Option<Box<dyn BufRead>>> {
    move |path: &str| {
        let found = files.iter().find(|(name, _)| *name == path);
        Ok(found.map(|(_, text)| Box::new(Cursor::new(*text)) as Box<dyn BufRead>))
    }
}

#[test]
fn enum_layout_does_not_matter() {
    let layouts = [
        "enum E { A, B, C };",
        "enum E\n{\n  A,\n  B,\n  C\n};",
        "enum E {\n  A,\n  B,\n  C,\n};",
        "enum E { A, B, C, };",
        "enum E {A,B,C};",
    ];

    for layout in layouts {
        assert_eq!(elements(&parse_str(layout), "E"), vec!["A", "B", "C"], "{}", layout);
    }

    assert_eq!(elements(&parse_str("enum One { Only };"), "One"), vec!["Only"]);
    assert_eq!(elements(&parse_str("enum One {\n Only,\n};"), "One"), vec!["Only"]);
}

#[test]
fn nested_modules() {
    let root = parse_str("module A { module B { enum E {X,Y}; }; };");

    let a = root.submodule("A").expect("no module A");
    assert!(a.types().is_empty());

    let b = a.submodule("B").expect("no module B");
    assert_eq!(elements(b, "E"), vec!["X", "Y"]);
    assert_eq!(b.qualified_name(), "A::B");
}

#[test]
fn reopened_modules_merge() {
    let root = parse_str(
        r"
        module A { struct S { long x; }; };
        module B { };
        module A { enum E { One }; };
        ",
    );

    let names: Vec<_> = root.submodules().map(Module::name).collect();
    assert_eq!(names, vec!["A", "B"]);

    let a = root.submodule("A").unwrap();
    let types: Vec<_> = a.types().names().collect();
    assert_eq!(types, vec!["S", "E"]);
}

#[test]
fn untagged_inline_typedef() {
    let root = parse_str("typedef struct { long id; } Rec;");

    assert_eq!(root.types().len(), 1);
    assert_eq!(
        fields(&root, "Rec"),
        vec![(String::from("id"), Type::from(Primitive::Long))]
    );
}

#[test]
fn tagged_inline_typedef() {
    let root = parse_str("typedef struct Tag { long id; } Rec;");

    assert_eq!(root.types().len(), 2);
    assert_eq!(
        fields(&root, "Tag"),
        vec![(String::from("id"), Type::from(Primitive::Long))]
    );

    match root.lookup("Rec").map(Type::kind) {
        Some(TypeKind::TypeDef(TypeDef { target, .. })) => assert_eq!(target.name(), "Tag"),
        other => panic!("Rec is not an alias: {:?}", other),
    }
}

#[test]
fn long_long_widths() {
    let root = parse_str(
        "struct W { long a; unsigned long b; long long c; unsigned long long d; };",
    );

    let kinds: Vec<_> = fields(&root, "W").into_iter().map(|(_, of)| of).collect();
    assert_eq!(
        kinds,
        vec![
            Type::from(Primitive::Long),
            Type::from(Primitive::ULong),
            Type::from(Primitive::LongLong),
            Type::from(Primitive::ULongLong),
        ]
    );
}

#[test]
fn self_include_is_a_noop() {
    const TEXT: &str = "#include \"self.idl\"\nstruct S { long x; };\n";

    let mut session = Session::new().with_resolver(files(&[("self.idl", TEXT)]));

    let root = parse_with(TEXT.as_bytes(), "self.idl", &mut session).unwrap();
    assert!(root.lookup("S").is_some());

    let included: Vec<_> = session.included().collect();
    assert_eq!(included, vec!["self.idl"]);
}

#[test]
fn included_declarations_land_in_scope() {
    let mut session = Session::new().with_resolver(files(&[("inner.idl", "enum Inner { I };")]));

    let root = parse_with(
        "module M {\n#include <inner.idl>\nstruct S { Inner i; };\n};".as_bytes(),
        "outer.idl",
        &mut session,
    )
    .unwrap();

    let m = root.submodule("M").unwrap();
    let types: Vec<_> = m.types().names().collect();
    assert_eq!(types, vec!["Inner", "S"]);
    assert!(root.types().is_empty());
}

#[test]
fn filesystem_includes() {
    let dir = tempfile::tempdir().unwrap();
    let search = dir.path().join("search");
    fs::create_dir(&search).unwrap();

    fs::write(dir.path().join("sibling.idl"), "struct Sibling { long x; };").unwrap();
    fs::write(search.join("common.idl"), "enum Common { C };").unwrap();

    let main = dir.path().join("main.idl");
    fs::write(&main, "#include \"sibling.idl\"\n#include <common.idl>\n").unwrap();

    let mut session = Session::new().with_resolver(open_file).include_dir(&search);
    let file = io::BufReader::new(fs::File::open(&main).unwrap());
    let root = parse_with(file, &main.display().to_string(), &mut session).unwrap();

    assert!(root.lookup("Sibling").is_some());
    assert!(root.lookup("Common").is_some());
}

#[test]
fn includes_fail_without_resolver() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("x.idl"), "struct FromDisk { long x; };").unwrap();

    let main = dir.path().join("main.idl");
    let mut session = Session::new().include_dir(dir.path());
    let error = parse_with(
        "#include \"x.idl\"\n".as_bytes(),
        &main.display().to_string(),
        &mut session,
    )
    .unwrap_err();

    assert!(matches!(error.as_ref(), ParseError::IncludeNotFound(path) if path == "x.idl"));
}

#[test]
fn resolver_takes_precedence() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("dup.idl"), "struct FromDisk { long x; };").unwrap();

    let mut session = Session::new()
        .include_dir(dir.path())
        .with_resolver(files(&[("dup.idl", "struct FromResolver { long x; };")]));

    let root = parse_with("#include \"dup.idl\"".as_bytes(), "t.idl", &mut session).unwrap();
    assert!(root.lookup("FromResolver").is_some());
    assert!(root.lookup("FromDisk").is_none());
}

#[test]
fn case_variants_of_keywords_are_identifiers() {
    let root = parse_str(
        "enum Dir { IN, OUT, INOUT }; struct String { long Module; boolean Case; };",
    );

    assert_eq!(elements(&root, "Dir"), vec!["IN", "OUT", "INOUT"]);

    let names: Vec<_> = fields(&root, "String").into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["Module", "Case"]);
}

#[test]
fn missing_include() {
    let error = parse(
        "struct A { long x; };\n#include \"nowhere.idl\"\n".as_bytes(),
        "t.idl",
    )
    .unwrap_err();

    assert!(matches!(error.as_ref(), ParseError::IncludeNotFound(path) if path == "nowhere.idl"));
    assert_eq!(error.location().line(), 2);
}

#[test]
fn pragma_id_after_declaration() {
    let root = parse_str(
        r#"
        module Mod { interface Widget {}; };
        #pragma ID Mod::Widget "IDL:custom/Widget:2.0"
        "#,
    );

    let widget = root.find(&["Mod"]).unwrap().lookup("Widget").unwrap();
    assert_eq!(widget.repository_id(), "IDL:custom/Widget:2.0");
}

#[test]
fn pragma_id_before_declaration_has_no_effect() {
    let root = parse_str(
        r#"
        #pragma ID Mod::Widget "IDL:custom/Widget:2.0"
        module Mod { interface Widget {}; };
        "#,
    );

    let widget = root.find(&["Mod"]).unwrap().lookup("Widget").unwrap();
    assert_eq!(widget.repository_id(), "");
}

#[test]
fn pragma_prefix_and_version() {
    let root = parse_str(
        r#"
        module Mod {
            #pragma prefix "example.org"
            #pragma version Mod 1.1
            struct S { long x; };
        };
        "#,
    );

    let m = root.find(&["Mod"]).unwrap();
    assert_eq!(m.prefix(), "example.org");
    assert_eq!(root.prefix(), "");
}

#[test]
fn missing_field_terminator() {
    let error = parse("module M { struct Broken { long x }; };".as_bytes(), "t.idl").unwrap_err();
    assert_eq!(error.as_ref().kind(), "syntax error");
    assert!(error.to_string().contains("Expected `;`"));
}

#[test]
fn malformed_include_fails_the_whole_parse() {
    let mut session = Session::new().with_resolver(files(&[("broken.idl", "struct Broken { long x };")]));

    let error = parse_with(
        "struct Fine { long x; };\n#include \"broken.idl\"\n".as_bytes(),
        "t.idl",
        &mut session,
    )
    .unwrap_err();

    assert_eq!(error.location().file(), "broken.idl");
    assert!(matches!(error.as_ref(), ParseError::UnexpectedToken(..)));
}

#[test]
fn diagnostics_quote_the_source() {
    let error = parse("struct S {\n    long x\n};\n".as_bytes(), "test.idl").unwrap_err();
    let report = Diagnostics::from(error).to_string();

    assert!(report.starts_with("test.idl:3:0: syntax error: Expected `;`"), "{}", report);
    assert!(report.contains("3 | };"), "{}", report);
    assert!(report.contains("  | ^"), "{}", report);
    assert!(report.ends_with("Compilation failed with 1 error\n"), "{}", report);
}

#[test]
fn lexical_errors_surface_through_the_parser() {
    let error = parse("const string S = \"open;".as_bytes(), "t.idl").unwrap_err();
    assert_eq!(error.as_ref().kind(), "lexical error");
    assert!(matches!(error.as_ref(), ParseError::Lexical(_)));
}
