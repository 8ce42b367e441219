// Integration tests for the Rill front end

use rill::parser::{parse_source, ErrorKind, Node, NodeKind};

fn parse(source: &str) -> Node<'_> {
    parse_source("test.rill", source).expect("parse failed")
}

#[test]
fn test_whole_module_tree() {
    let source = r#"
import "io" as io;

fn Int add(Int a, Int b) {
    return a + b;
}
"#;
    let module = parse(source);
    assert_eq!(
        module.to_tree_string(),
        "\
Module:
  ImportDecl:
    String: io
    Ident: io
  FuncDecl:
    Ident: Int
    Ident: add
    Params:
      VarDecl:
        Ident: Int
        Ident: a
        (empty)
      VarDecl:
        Ident: Int
        Ident: b
        (empty)
    Block:
      Return:
        Add:
          Ident: a
          Ident: b
"
    );
}

#[test]
fn test_struct_and_interface() {
    let source = r#"
struct Pair<T> {
    T first;
    T second;
}

interface Container<T> {
    size Int();
    get T(Int index);
}
"#;
    let module = parse(source);
    let strukt = module.children()[0].as_ref().unwrap();
    assert_eq!(strukt.kind(), NodeKind::StructDecl);
    assert_eq!(strukt.children().len(), 4);
    let iface = module.children()[1].as_ref().unwrap();
    assert_eq!(iface.kind(), NodeKind::InterfaceDecl);
    // ident, type params, no base, two prototypes
    assert_eq!(iface.children().len(), 5);
    assert!(iface.children()[2].is_none());
}

#[test]
fn test_control_flow_statements() {
    let source = r#"
fn Int classify(Int n) {
    var Int result = 0;
    if n < 0 {
        result = -1;
    } else {
        result = 1;
    }
    switch n {
    case 0:
        result = 0;
    default:
        break;
    }
    for i in 0..n {
        result += i;
    }
    while result > 100 {
        result /= 2;
    }
    return result;
}
"#;
    let module = parse(source);
    let body = module.children()[0].as_ref().unwrap().children()[3]
        .as_ref()
        .unwrap();
    let kinds: Vec<NodeKind> = body
        .children()
        .iter()
        .map(|c| c.as_ref().unwrap().kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::VarDecl,
            NodeKind::If,
            NodeKind::Switch,
            NodeKind::For,
            NodeKind::While,
            NodeKind::Return,
        ]
    );
}

#[test]
fn test_expression_precedence_end_to_end() {
    let module = parse("let x = 1 + 2 * 3 == 7 && !done;");
    let decl = module.children()[0].as_ref().unwrap();
    assert_eq!(
        decl.to_tree_string(),
        "\
LetDecl:
  Ident: x
  And:
    Eq:
      Add:
        Int: 1
        Mul:
          Int: 2
          Int: 3
      Int: 7
    Not:
      Ident: done
"
    );
}

#[test]
fn test_higher_order_functions() {
    let source = r#"
let twice = fn Int(fn Int(Int) f, Int x) {
    return f(f(x));
};
"#;
    let module = parse(source);
    let decl = module.children()[0].as_ref().unwrap();
    assert_eq!(decl.kind(), NodeKind::LetDecl);
    let func = decl.children()[1].as_ref().unwrap();
    assert_eq!(func.kind(), NodeKind::FuncDecl);
    assert!(func.children()[1].is_none(), "anonymous function has no name");
    let params = func.children()[2].as_ref().unwrap();
    let first = params.children()[0].as_ref().unwrap();
    assert_eq!(
        first.children()[0].as_ref().unwrap().kind(),
        NodeKind::FuncType
    );
}

#[test]
fn test_syntax_error_position() {
    let err = parse_source("bad.rill", "fn Int f() {\n    return 1 +;\n}").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.file, "bad.rill");
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 15);
    assert_eq!(
        err.to_string(),
        "ERROR: unexpected token ';'\n--> bad.rill:2:15"
    );
}

#[test]
fn test_lexical_error_position() {
    let err = parse_source("bad.rill", "let x = 007;").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Lexical);
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 9);
    assert!(err.message.contains("leading zero"));
}

#[test]
fn test_no_partial_tree_on_error() {
    // The error comes from the second declaration; nothing of the first
    // survives.
    let result = parse_source("test.rill", "let a = 1;\nlet b = ;\n");
    assert!(result.is_err());
}

#[test]
fn test_empty_module() {
    let module = parse("");
    assert_eq!(module.kind(), NodeKind::Module);
    assert_eq!(module.children().len(), 0);
    assert_eq!(module.to_tree_string(), "Module:\n");
}
