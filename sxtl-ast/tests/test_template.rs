use insta::assert_snapshot;
use sxtl_ast::ast::{self, BlockKind};
use sxtl_ast::{parse, ParseError, Span};

fn kinds(nodes: &[ast::NodeS]) -> Vec<&'static str> {
    nodes
        .iter()
        .map(|node| match node.value {
            ast::Node::Text(_) => "text",
            ast::Node::Output(_) => "output",
            ast::Node::If(_) => "if",
            ast::Node::For(_) => "for",
            ast::Node::Assign(_) => "assign",
            ast::Node::Def(_) => "def",
            ast::Node::Render(_) => "render",
            ast::Node::Break => "break",
            ast::Node::Continue => "continue",
        })
        .collect()
}

#[test]
fn test_text_and_output() {
    let template = parse("Hello <?print name?>!").unwrap();
    assert_eq!(kinds(&template.body), vec!["text", "output", "text"]);
    assert_eq!(template.body[1].span, Span::from(6..20));
    assert_eq!(template.span, Span::from(0..21));
}

#[test]
fn test_empty_template() {
    let template = parse("").unwrap();
    assert!(template.body.is_empty());
}

#[test]
fn test_output_forms() {
    let template = parse("<?= a?><?print a?><?printx a?>{{ a }}").unwrap();
    let escapes = template
        .body
        .iter()
        .map(|node| match &node.value {
            ast::Node::Output(output) => output.escape,
            _ => unreachable!(),
        })
        .collect::<Vec<_>>();
    assert_eq!(escapes, vec![false, false, true, false]);
}

#[test]
fn test_note_produces_nothing() {
    let template = parse("a<?note ignored ?>b").unwrap();
    assert_eq!(kinds(&template.body), vec!["text", "text"]);
}

#[test]
fn test_for_with_body() {
    let template = parse("<?for x in xs?><?= x?>,<?end for?>").unwrap();
    let ast::Node::For(for_) = &template.body[0].value else {
        panic!("expected a for node");
    };
    assert_eq!(for_.var_name.value, "x");
    assert_eq!(kinds(&for_.body), vec!["output", "text"]);
    assert_eq!(template.body[0].span, Span::from(0..34));
}

#[test]
fn test_elif_nests_in_else() {
    let template = parse("<?if a?>1<?elif b?>2<?else?>3<?end if?>").unwrap();
    let ast::Node::If(outer) = &template.body[0].value else {
        panic!("expected an if node");
    };
    assert_eq!(kinds(&outer.then), vec!["text"]);
    assert_eq!(kinds(&outer.else_), vec!["if"]);
    let ast::Node::If(inner) = &outer.else_[0].value else {
        panic!("expected a nested if node");
    };
    assert_eq!(inner.condition.value, ast::Expr::Var("b".to_string()));
    assert_eq!(kinds(&inner.else_), vec!["text"]);
}

#[test]
fn test_bare_end_closes_innermost() {
    let template = parse("<?for x in xs?><?if x?>y<?end?><?end?>").unwrap();
    assert_eq!(kinds(&template.body), vec!["for"]);
}

#[test]
fn test_code_and_augmented_assignment() {
    let template = parse("<?code total = 0?><?code total += x?>").unwrap();
    let operators = template
        .body
        .iter()
        .map(|node| match &node.value {
            ast::Node::Assign(assign) => assign.operator,
            _ => unreachable!(),
        })
        .collect::<Vec<_>>();
    assert_eq!(
        operators,
        vec![ast::AssignOperator::Assign, ast::AssignOperator::Add]
    );
}

#[test]
fn test_def_and_render() {
    let template = parse("<?def greet(who)?>Hi <?= who?><?end def?><?render greet('x')?>").unwrap();
    assert_eq!(kinds(&template.body), vec!["def", "render"]);
    let ast::Node::Def(def) = &template.body[0].value else {
        panic!("expected a def node");
    };
    assert_eq!(def.name.value, "greet");
    assert_eq!(
        def.params.iter().map(|p| p.value.as_str()).collect::<Vec<_>>(),
        vec!["who"]
    );
}

#[test]
fn test_def_without_parameters() {
    let template = parse("<?def banner?>==<?end def?><?render banner?>").unwrap();
    assert_eq!(kinds(&template.body), vec!["def", "render"]);
}

#[test]
fn test_break_and_continue() {
    let template = parse("<?for x in xs?><?if x?><?break?><?else?><?continue?><?end if?><?end for?>")
        .unwrap();
    assert_eq!(kinds(&template.body), vec!["for"]);
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(
        parse("a<?break?>"),
        Err(ParseError::LoopControlOutsideLoop {
            directive: "break".to_string(),
            span: (1..10).into()
        })
    );
}

#[test]
fn test_loop_control_does_not_cross_def() {
    let result = parse("<?for x in xs?><?def f()?><?continue?><?end def?><?end for?>");
    assert!(matches!(
        result,
        Err(ParseError::LoopControlOutsideLoop { .. })
    ));
}

#[test]
fn test_unclosed_block() {
    assert_eq!(
        parse("<?if a?>yes"),
        Err(ParseError::UnclosedBlock {
            expected: BlockKind::If,
            span: (0..8).into()
        })
    );
}

#[test]
fn test_mismatched_end() {
    assert_eq!(
        parse("<?for x in xs?><?end if?>"),
        Err(ParseError::MismatchedEnd {
            expected: BlockKind::For,
            found: BlockKind::If,
            span: (15..25).into()
        })
    );
}

#[test]
fn test_unmatched_end() {
    assert_eq!(
        parse("x<?end?>"),
        Err(ParseError::UnmatchedEnd {
            found: "end".to_string(),
            span: (1..8).into()
        })
    );
}

#[test]
fn test_else_after_else() {
    let result = parse("<?if a?>1<?else?>2<?else?>3<?end if?>");
    assert_eq!(
        result,
        Err(ParseError::ElseAfterElse {
            found: "else".to_string(),
            span: (18..26).into()
        })
    );
}

#[test]
fn test_unknown_directive() {
    assert_eq!(
        parse("<?frobnicate x?>"),
        Err(ParseError::UnknownDirective {
            name: "frobnicate".to_string(),
            span: (2..12).into()
        })
    );
}

#[test]
fn test_for_missing_in() {
    let error = parse("<?for x xs?>").unwrap_err();
    assert_eq!(error.span(), Span::from(8..10));
    assert_eq!(error.to_string(), "expected `in`, found name `xs`");
}

#[test]
fn test_missing_expression() {
    let error = parse("<?print ?>").unwrap_err();
    assert_eq!(error.span(), Span::from(8..10));
    assert!(error.to_string().ends_with("found end of directive"));
}

#[test]
fn test_lex_error_is_reported() {
    let error = parse("ok <?if x").unwrap_err();
    assert!(matches!(error, ParseError::Lex(_)));
    assert_eq!(error.span(), Span::from(3..9));
}

#[test]
fn test_output_close_inside_directive_is_a_syntax_error() {
    let error = parse("<?print x}}?>").unwrap_err();
    assert!(matches!(error, ParseError::ExpectedFound { .. }));
    assert_eq!(error.span(), Span::from(9..11));
}

#[test]
fn test_error_messages() {
    let message = |src: &str| parse(src).unwrap_err().to_string();
    assert_snapshot!(message("<?if a?>"), @"`if` block is never closed");
    assert_snapshot!(message("<?for x in xs?><?end def?>"), @"`end def` cannot close an open `for` block");
    assert_snapshot!(message("<?else?>"), @"`else` without an open block");
    assert_snapshot!(message("<?continue?>"), @"`continue` outside of a loop");
    assert_snapshot!(message("<?shout x?>"), @"unknown directive `shout`");
}

fn collect_node_spans(nodes: &[ast::NodeS], spans: &mut Vec<Span>) {
    for node in nodes {
        spans.push(node.span);
        match &node.value {
            ast::Node::Text(_) | ast::Node::Break | ast::Node::Continue => {}
            ast::Node::Output(output) => collect_expr_spans(&output.expr, spans),
            ast::Node::If(if_) => {
                collect_expr_spans(&if_.condition, spans);
                collect_node_spans(&if_.then, spans);
                collect_node_spans(&if_.else_, spans);
            }
            ast::Node::For(for_) => {
                spans.push(for_.var_name.span);
                collect_expr_spans(&for_.iterable, spans);
                collect_node_spans(&for_.body, spans);
            }
            ast::Node::Assign(assign) => {
                spans.push(assign.name.span);
                collect_expr_spans(&assign.value, spans);
            }
            ast::Node::Def(def) => {
                spans.push(def.name.span);
                spans.extend(def.params.iter().map(|param| param.span));
                collect_node_spans(&def.body, spans);
            }
            ast::Node::Render(render) => {
                spans.push(render.name.span);
                for argument in &render.arguments {
                    collect_expr_spans(argument, spans);
                }
            }
        }
    }
}

fn collect_expr_spans(expr: &ast::ExprS, spans: &mut Vec<Span>) {
    spans.push(expr.span);
    match &expr.value {
        ast::Expr::Literal(_) | ast::Expr::Var(_) => {}
        ast::Expr::List(items) => {
            for item in items {
                collect_expr_spans(item, spans);
            }
        }
        ast::Expr::Unary(unary) => collect_expr_spans(&unary.operand, spans),
        ast::Expr::Binary(binary) => {
            collect_expr_spans(&binary.left, spans);
            collect_expr_spans(&binary.right, spans);
        }
        ast::Expr::Call(call) => {
            spans.push(call.name.span);
            for argument in &call.arguments {
                collect_expr_spans(argument, spans);
            }
        }
        ast::Expr::Attr(attr) => {
            collect_expr_spans(&attr.object, spans);
            spans.push(attr.name.span);
        }
        ast::Expr::Index(index) => {
            collect_expr_spans(&index.object, spans);
            collect_expr_spans(&index.index, spans);
        }
    }
}

#[test]
fn test_spans_within_source() {
    let src = "<?def row(r, i)?><li>{{ i }}: {{ r.name }}</li><?end def?>\
<?code total = 0?>\
<?for r in rows?>\
<?if r['n'] > 10 and not r.hidden?><?render row(r, len(rows))?>\
<?elif r.n in [1, 2, -3]?>{{ upper(r.name) }}<?continue?>\
<?elif r.n == 0?><?break?>\
<?else?><?printx r.name ?><?end?>\
<?code total += r.n * 2?>\
<?end for?>{{ total // 3 }}";
    let template = parse(src).unwrap();
    let mut spans = vec![template.span];
    collect_node_spans(&template.body, &mut spans);
    assert!(spans.len() > 40);
    for span in spans {
        assert!(span.start <= span.end, "{:?}", span);
        assert!(span.end <= src.len(), "{:?}", span);
    }
}
