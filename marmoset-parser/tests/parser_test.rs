// marmoset-parser - Parser tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use marmoset_parser::ast::{Expression, Statement};
use marmoset_parser::Parser;

fn parse(source: &str) -> marmoset_parser::Program {
    Parser::parse_str(source).expect("parse error")
}

/// Parse a single statement and render it canonically.
fn parse_display(source: &str) -> String {
    parse(source).to_string()
}

#[test]
fn test_let_statements() {
    let program = parse("let x = 5; let y = true; let foobar = y;");
    assert_eq!(program.statements.len(), 3);

    let expected = [
        ("x", Expression::IntegerLiteral(5)),
        ("y", Expression::BooleanLiteral(true)),
        ("foobar", Expression::Identifier("y".to_string())),
    ];
    for (statement, (name, value)) in program.statements.iter().zip(expected) {
        match statement {
            Statement::Let {
                name: bound,
                value: bound_value,
            } => {
                assert_eq!(bound, name);
                assert_eq!(bound_value, &value);
            }
            other => panic!("expected let statement, got {:?}", other),
        }
    }
}

#[test]
fn test_return_statements() {
    let program = parse("return 5; return x + y;");
    assert_eq!(program.statements.len(), 2);
    for statement in &program.statements {
        assert!(matches!(statement, Statement::Return(_)));
    }
}

#[test]
fn test_operator_precedence() {
    let cases = [
        ("-a * b", "((-a) * b)"),
        ("!-a", "(!(-a))"),
        ("a + b + c", "((a + b) + c)"),
        ("a + b - c", "((a + b) - c)"),
        ("a * b * c", "((a * b) * c)"),
        ("a + b * c", "(a + (b * c))"),
        ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))"),
        ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4))"),
        ("(5 + 5) * 2", "((5 + 5) * 2)"),
        ("-(5 + 5)", "(-(5 + 5))"),
        ("!(true == true)", "(!(true == true))"),
        ("a + add(b * c) + d", "((a + add((b * c))) + d)"),
        ("a * [1, 2, 3, 4][b * c] * d", "((a * ([1, 2, 3, 4][(b * c)])) * d)"),
        ("add(a * b[2], b[1], 2 * [1, 2][1])", "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])))"),
    ];
    for (source, expected) in cases {
        assert_eq!(parse_display(source), expected, "source: {}", source);
    }
}

#[test]
fn test_if_else_expression() {
    let program = parse("if (x < y) { x } else { y }");
    match &program.statements[0] {
        Statement::Expression(Expression::If {
            condition,
            consequence,
            alternative,
        }) => {
            assert_eq!(condition.to_string(), "(x < y)");
            assert_eq!(consequence.statements.len(), 1);
            assert!(alternative.is_some());
        }
        other => panic!("expected if expression, got {:?}", other),
    }
}

#[test]
fn test_function_literal() {
    let program = parse("fn(x, y) { x + y; }");
    match &program.statements[0] {
        Statement::Expression(Expression::Function {
            name,
            parameters,
            body,
        }) => {
            assert_eq!(name, &None);
            assert_eq!(parameters, &["x", "y"]);
            assert_eq!(body.statements.len(), 1);
        }
        other => panic!("expected function literal, got {:?}", other),
    }
}

#[test]
fn test_function_literal_binding_name() {
    let program = parse("let double = fn(x) { x * 2 };");
    match &program.statements[0] {
        Statement::Let { value, .. } => match value {
            Expression::Function { name, .. } => {
                assert_eq!(name.as_deref(), Some("double"));
            }
            other => panic!("expected function literal, got {:?}", other),
        },
        other => panic!("expected let statement, got {:?}", other),
    }
}

#[test]
fn test_call_expression() {
    let program = parse("add(1, 2 * 3, 4 + 5)");
    match &program.statements[0] {
        Statement::Expression(Expression::Call {
            function,
            arguments,
        }) => {
            assert_eq!(function.to_string(), "add");
            assert_eq!(arguments.len(), 3);
            assert_eq!(arguments[1].to_string(), "(2 * 3)");
        }
        other => panic!("expected call expression, got {:?}", other),
    }
}

#[test]
fn test_string_literal_with_escapes() {
    let program = parse(r#""hello \"world\"\n""#);
    match &program.statements[0] {
        Statement::Expression(Expression::StringLiteral(value)) => {
            assert_eq!(value, "hello \"world\"\n");
        }
        other => panic!("expected string literal, got {:?}", other),
    }
}

#[test]
fn test_array_and_hash_literals() {
    let program = parse("[1, 2 * 2, 3 + 3]");
    match &program.statements[0] {
        Statement::Expression(Expression::ArrayLiteral(elements)) => {
            assert_eq!(elements.len(), 3);
        }
        other => panic!("expected array literal, got {:?}", other),
    }

    let program = parse(r#"{"one": 1, "two": 2}"#);
    match &program.statements[0] {
        Statement::Expression(Expression::HashLiteral(pairs)) => {
            assert_eq!(pairs.len(), 2);
            assert_eq!(pairs[0].0.to_string(), "one");
        }
        other => panic!("expected hash literal, got {:?}", other),
    }

    let program = parse("{}");
    match &program.statements[0] {
        Statement::Expression(Expression::HashLiteral(pairs)) => {
            assert!(pairs.is_empty());
        }
        other => panic!("expected hash literal, got {:?}", other),
    }
}

#[test]
fn test_parse_errors() {
    assert!(Parser::parse_str("let x 5;").is_err());
    assert!(Parser::parse_str("let = 5;").is_err());
    assert!(Parser::parse_str("fn(x { x }").is_err());
    assert!(Parser::parse_str("\"unterminated").is_err());
    assert!(Parser::parse_str("if (x { 1 }").is_err());
    assert!(Parser::parse_str("@").is_err());
}
