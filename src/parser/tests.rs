//! Parser tests.

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::error::ParserError;
    use crate::lexer::Scanner;
    use crate::parser::Parser;

    fn parse(source: &str) -> Program {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn parse_expr(source: &str) -> Expr {
        match parse(source).statements.into_iter().next().unwrap().kind {
            StmtKind::Expression(expr) => expr,
            _ => panic!("Expected expression statement"),
        }
    }

    #[test]
    fn test_binary_expr() {
        let expr = parse_expr("1 + 2");
        match expr.kind {
            ExprKind::Binary { operator, .. } => assert_eq!(operator, BinaryOp::Add),
            _ => panic!("Expected binary expression"),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 should parse as 1 + (2 * 3)
        let expr = parse_expr("1 + 2 * 3");
        match expr.kind {
            ExprKind::Binary {
                operator: BinaryOp::Add,
                right,
                ..
            } => match right.kind {
                ExprKind::Binary {
                    operator: BinaryOp::Multiply,
                    ..
                } => {}
                _ => panic!("Expected multiply on right"),
            },
            _ => panic!("Expected add at top"),
        }
    }

    #[test]
    fn test_power_is_right_associative_and_beats_negation() {
        let expr = parse_expr("-2 ^ 3 ^ 2");
        let ExprKind::Unary {
            operator: UnaryOp::Negate,
            operand,
        } = expr.kind
        else {
            panic!("Expected negation at top");
        };
        let ExprKind::Binary {
            operator: BinaryOp::Power,
            right,
            ..
        } = operand.kind
        else {
            panic!("Expected power under negation");
        };
        assert!(matches!(
            right.kind,
            ExprKind::Binary {
                operator: BinaryOp::Power,
                ..
            }
        ));
    }

    #[test]
    fn test_logical_ops() {
        let expr = parse_expr("a or b and c");
        match expr.kind {
            ExprKind::LogicalOr { right, .. } => {
                assert!(matches!(right.kind, ExprKind::LogicalAnd { .. }))
            }
            _ => panic!("Expected or at top"),
        }
    }

    #[test]
    fn test_call_and_index() {
        let expr = parse_expr("foo(1, 2)[0]");
        match expr.kind {
            ExprKind::Index { object, .. } => match object.kind {
                ExprKind::Call { arguments, .. } => assert_eq!(arguments.len(), 2),
                _ => panic!("Expected call under index"),
            },
            _ => panic!("Expected index expression"),
        }
    }

    #[test]
    fn test_table_literal() {
        let program = parse(r#"t = {"a": 1, "b": [2, 3]}"#);
        match &program.statements[0].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::Table(pairs) => assert_eq!(pairs.len(), 2),
                _ => panic!("Expected table literal"),
            },
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_if_elseif_else_chain() {
        let program = parse("if a { x = 1 } elseif b { x = 2 } elseif c { x = 3 } else { x = 4 }");
        match &program.statements[0].kind {
            StmtKind::If {
                branches,
                else_branch,
            } => {
                assert_eq!(branches.len(), 3);
                assert!(else_branch.is_some());
            }
            _ => panic!("Expected if statement"),
        }
    }

    #[test]
    fn test_statements_with_semicolons() {
        let program = parse("x = 1; while x < 5 { print(x); x = x + 1 }");
        assert_eq!(program.statements.len(), 2);
        match &program.statements[1].kind {
            StmtKind::While { body, .. } => assert_eq!(body.len(), 2),
            _ => panic!("Expected while loop"),
        }
    }

    #[test]
    fn test_function_declaration() {
        let program = parse("function add(a, b) { return a + b }");
        match &program.statements[0].kind {
            StmtKind::Function(decl) => {
                assert_eq!(decl.name, "add");
                assert_eq!(decl.params.len(), 2);
                assert!(matches!(decl.body[0].kind, StmtKind::Return(Some(_))));
            }
            _ => panic!("Expected function declaration"),
        }
    }

    #[test]
    fn test_bare_return() {
        let program = parse("function f() { return }");
        match &program.statements[0].kind {
            StmtKind::Function(decl) => assert!(matches!(decl.body[0].kind, StmtKind::Return(None))),
            _ => panic!("Expected function declaration"),
        }
    }

    #[test]
    fn test_for_loop_and_loop_control() {
        let program = parse("for c in \"abc\" { if c == \"b\" { continue } break }");
        match &program.statements[0].kind {
            StmtKind::For { variable, body, .. } => {
                assert_eq!(variable, "c");
                assert!(matches!(body[1].kind, StmtKind::Break));
            }
            _ => panic!("Expected for loop"),
        }
    }

    #[test]
    fn test_import() {
        let program = parse("import \"lib/math\"");
        assert_eq!(
            program.statements[0].kind,
            StmtKind::Import("lib/math".to_string())
        );
    }

    #[test]
    fn test_any_expression_is_accepted_as_assignment_target() {
        let program = parse("f() = 1");
        assert!(matches!(program.statements[0].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn test_unclosed_block_is_eof_error() {
        let tokens = Scanner::new("while true { x = 1").scan_tokens().unwrap();
        let err = Parser::new(tokens).parse().unwrap_err();
        assert!(matches!(err, ParserError::UnexpectedEof(_)));
    }
}
