use std::{fs, path::Path};

use idlc::{
    codegen::{
        format::{External, Format},
        generate, GenerateError, GenerateFlags, Options,
    },
    model::Module,
    parse::parse,
};

fn parse_str(text: &str) -> Module {
    parse(text.as_bytes(), "test.idl").expect("parse failed")
}

/// Archivos generados, relativos a `root` y ordenados.
fn tree(root: &Path) -> Vec<String> {
    fn visit(dir: &Path, root: &Path, files: &mut Vec<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                visit(&path, root, files);
            } else {
                let relative = path.strip_prefix(root).unwrap();
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut files = Vec::new();
    visit(root, root, &mut files);
    files.sort();
    files
}

#[test]
fn one_struct_one_artifact() {
    let root = parse_str("module TestMod { struct S { long x; }; };");
    let output = tempfile::tempdir().unwrap();

    let report = generate(&root, output.path(), &Options::new("demo")).unwrap();
    assert!(report.is_success());
    assert_eq!(report.written, vec![output.path().join("testmod").join("s.go")]);
    assert_eq!(tree(output.path()), vec!["testmod/s.go"]);
}

#[test]
fn struct_artifact_content() {
    let root = parse_str(
        r#"
        #pragma prefix "example.org"
        module TestMod { struct Point { long x; double y; }; };
        "#,
    );

    let output = tempfile::tempdir().unwrap();
    let mut options = Options::new("demo");
    options.dependencies.push(String::from("example.org/shared"));

    generate(&root, output.path(), &options).unwrap();
    let text = fs::read_to_string(output.path().join("testmod/point.go")).unwrap();

    assert!(text.starts_with(
        "// Code generated by idlc from TestMod::Point. DO NOT EDIT.\n\npackage demo\n"
    ));
    assert!(text.contains("import (\n\t\"example.org/shared\"\n\t\"idl/runtime\"\n)\n"));
    assert!(text.contains("type Point struct {\n\tX int32\n\tY float64\n}\n"));
    assert!(text.contains("func NewPoint() *Point {\n"));
    assert!(text.contains("return \"IDL:example.org/TestMod/Point:1.0\""));
}

#[test]
fn nested_modules_nest_directories() {
    let root = parse_str(
        r"
        enum Top { T };
        module Outer {
            module Inner { union U switch (long) { case 1: long a; default: string b; }; };
            interface Service { void run(); };
        };
        ",
    );

    let output = tempfile::tempdir().unwrap();
    generate(&root, output.path(), &Options::new("demo")).unwrap();

    assert_eq!(
        tree(output.path()),
        vec!["outer/inner/u.go", "outer/service.go", "top.go"]
    );
}

#[test]
fn empty_modules_create_nothing() {
    let root = parse_str("module Empty { module AlsoEmpty { }; };");
    let output = tempfile::tempdir().unwrap();

    let report = generate(&root, output.path(), &Options::new("demo")).unwrap();
    assert!(report.written.is_empty());
    assert!(!output.path().join("empty").exists());
}

#[test]
fn interface_artifact_content() {
    let root = parse_str(
        r"
        module Bank {
            interface Account {
                readonly attribute long balance;
                void deposit(in long amount);
                struct Receipt { long id; };
            };
        };
        ",
    );

    let output = tempfile::tempdir().unwrap();
    generate(&root, output.path(), &Options::new("bank")).unwrap();

    let text = fs::read_to_string(output.path().join("bank/account.go")).unwrap();
    assert!(text.contains("type Account interface {\n\tDeposit(amount int32) error\n\tGetBalance() (int32, error)\n}\n"));
    assert!(text.contains("type AccountStub struct {\n\tRef runtime.Handle\n}\n"));
    assert!(text.contains("func (s *AccountServant) Dispatch(operation string, args []interface{}) (interface{}, error) {\n"));
    assert!(text.contains("\tcase \"_get_balance\":\n"));

    assert_eq!(
        tree(output.path()),
        vec!["bank/account.go", "bank/account_receipt.go"]
    );
}

#[test]
fn nested_types_can_be_skipped() {
    let root = parse_str("interface I { enum Mode { On, Off }; };");
    let output = tempfile::tempdir().unwrap();

    let mut options = Options::new("demo");
    options.flags |= GenerateFlags::SKIP_NESTED;

    generate(&root, output.path(), &options).unwrap();
    assert_eq!(tree(output.path()), vec!["i.go"]);
}

#[test]
fn unformatted_text_is_kept_and_reported() {
    let root = parse_str("struct A { long x; }; struct B { long y; };");
    let output = tempfile::tempdir().unwrap();

    let mut options = Options::new("demo");
    let missing: Box<dyn Format> = Box::new(External::new("idlc-formatter-that-does-not-exist"));
    options.formatters = vec![missing];

    let report = generate(&root, output.path(), &options).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failed.len(), 2);

    let text = fs::read_to_string(output.path().join("a.go")).unwrap();
    assert!(text.contains("type A struct {\n\tX int32\n}\n"));
}

#[test]
fn fail_fast_stops_at_first_failure() {
    let root = parse_str("struct A { long x; }; struct B { long y; };");
    let output = tempfile::tempdir().unwrap();

    let mut options = Options::new("demo");
    options.flags |= GenerateFlags::FAIL_FAST;
    options.formatters = vec![Box::new(External::new("idlc-formatter-that-does-not-exist"))];

    let error = generate(&root, output.path(), &options).unwrap_err();
    match error {
        GenerateError::Format { path, .. } => assert_eq!(path, output.path().join("a.go")),
        other => panic!("unexpected {:?}", other),
    }

    assert!(output.path().join("a.go").exists());
    assert!(!output.path().join("b.go").exists());
}

#[test]
fn raw_output_skips_formatters() {
    let root = parse_str("struct A { long x; };");
    let output = tempfile::tempdir().unwrap();

    let mut options = Options::new("demo");
    options.flags |= GenerateFlags::NO_FORMAT;
    options.formatters = vec![Box::new(External::new("idlc-formatter-that-does-not-exist"))];

    let report = generate(&root, output.path(), &options).unwrap();
    assert!(report.is_success());
}

#[test]
fn constants_do_not_overwrite_a_constants_type() {
    let root = parse_str("module M { struct Constants { long x; }; const long Max = 1; };");
    let output = tempfile::tempdir().unwrap();

    let report = generate(&root, output.path(), &Options::new("demo")).unwrap();
    assert!(report.is_success());
    assert_eq!(tree(output.path()), vec!["m/constants.go", "m/module.constants.go"]);

    let types = fs::read_to_string(output.path().join("m/constants.go")).unwrap();
    assert!(types.contains("type Constants struct {\n\tX int32\n}\n"));

    let consts = fs::read_to_string(output.path().join("m/module.constants.go")).unwrap();
    assert!(consts.contains("Max"));
}

#[test]
fn clashing_file_names_are_rejected() {
    let root = parse_str("interface I { struct T { long x; }; }; struct I_T { long y; };");
    let output = tempfile::tempdir().unwrap();

    let error = generate(&root, output.path(), &Options::new("demo")).unwrap_err();
    match error {
        GenerateError::Collision { path } => assert_eq!(path, output.path().join("i_t.go")),
        other => panic!("unexpected {:?}", other),
    }

    assert!(tree(output.path()).is_empty());
}

#[test]
fn nested_types_carry_their_interface_name() {
    let root = parse_str("interface A { enum Mode { On }; }; interface B { enum Mode { Off }; };");
    let output = tempfile::tempdir().unwrap();

    generate(&root, output.path(), &Options::new("demo")).unwrap();
    assert_eq!(
        tree(output.path()),
        vec!["a.go", "a_mode.go", "b.go", "b_mode.go"]
    );

    let a = fs::read_to_string(output.path().join("a_mode.go")).unwrap();
    assert!(a.contains("type AMode int32\n"));
    assert!(a.contains("AModeOn AMode = 0"));
    assert!(a.contains("type AModeHelper struct"));
    assert!(a.contains("return \"Mode\""));

    let b = fs::read_to_string(output.path().join("b_mode.go")).unwrap();
    assert!(b.contains("type BMode int32\n"));
    assert!(!b.contains("type Mode "));
}
