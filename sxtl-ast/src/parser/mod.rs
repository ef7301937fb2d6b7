mod parser_core;
mod template;
mod types;

use chumsky::input::Stream;
use chumsky::{input::ValueInput, prelude::*};
use sxtl_lexer::{tokenize, tokenize_expression, LexError, SpannedToken, Token};

use crate::ast;
use crate::ast::Span;
use crate::error::{ParseError, ParserError, Result};
use crate::span::WithSpan;

use self::parser_core::{parser, Directive};
use self::template::{items, Entry, Item, TemplateParser};
use self::types::BoxedParser;

fn tokens<'a>(
    tokens: Vec<(Token<'a>, Span)>,
    eoi: Span,
) -> impl ValueInput<'a, Token = Token<'a>, Span = Span> {
    Stream::from_iter(tokens.into_iter()).spanned(eoi)
}

fn parse<'a, I, T>(parser: BoxedParser<'a, I, T>, input: I) -> Result<T>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    parser
        .parse(input)
        .into_result()
        .map_err(|errors: Vec<ParserError<'a>>| match errors.into_iter().next() {
            Some(error) => error.into(),
            None => ParseError::ExpectedFound {
                span: (0..0).into(),
                expected: Vec::new(),
                found: None,
            },
        })
}

fn parse_directive<'a>(
    output: bool,
    directive_tokens: Vec<(Token<'a>, Span)>,
    close: Span,
) -> Result<Directive> {
    if output {
        let expr = parse(parser().expr, tokens(directive_tokens, close))?;
        return Ok(Directive::Print {
            expr,
            escape: false,
        });
    }
    // a name where a directive keyword belongs is an unknown directive, not
    // a syntax error
    match directive_tokens.first() {
        Some((Token::Name(name), span)) => Err(ParseError::UnknownDirective {
            name: name.to_string(),
            span: *span,
        }),
        None => Err(ParseError::UnknownDirective {
            name: String::new(),
            span: close,
        }),
        Some(_) => parse(parser().directive, tokens(directive_tokens, close)),
    }
}

/// Parse a template from an already lexed token stream.
pub fn parse_tokens<'a>(
    src: &'a str,
    tokens: impl Iterator<Item = std::result::Result<SpannedToken<'a>, LexError>>,
) -> Result<ast::Template> {
    let entries = items(src, tokens)?
        .into_iter()
        .map(|item| match item {
            Item::Text(text, span) => Ok(Entry::Text(
                ast::Node::Text(text.to_string()).with_span(span),
            )),
            Item::Directive {
                output,
                tokens,
                close,
                span,
            } => Ok(Entry::Directive(parse_directive(output, tokens, close)?, span)),
        })
        .collect::<Result<Vec<_>>>()?;
    let body = TemplateParser::new(entries).parse_template()?;
    Ok(ast::Template {
        body,
        span: (0..src.len()).into(),
    })
}

impl ast::Template {
    pub fn parse(src: &str) -> Result<Self> {
        parse_tokens(src, tokenize(src))
    }
}

impl ast::Expr {
    /// Parse a standalone expression, as it would appear inside a directive.
    pub fn parse(src: &str) -> Result<ast::ExprS> {
        let expr_tokens = tokenize_expression(src)
            .map(|token| token.map(|(token, span)| (token, span.into())))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        parse(
            parser().expr,
            tokens(expr_tokens, (src.len()..src.len()).into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ordered_float::OrderedFloat;

    fn expr(src: &str) -> ast::Expr {
        ast::Expr::parse(src).unwrap().value
    }

    fn var(name: &str, span: std::ops::Range<usize>) -> Box<ast::ExprS> {
        Box::new(ast::Expr::Var(name.to_string()).with_span(span))
    }

    fn int(i: i64, span: std::ops::Range<usize>) -> Box<ast::ExprS> {
        Box::new(ast::Expr::Literal(ast::Literal::Integer(i)).with_span(span))
    }

    #[test]
    fn test_literals() {
        assert_eq!(expr("none"), ast::Expr::Literal(ast::Literal::None));
        assert_eq!(expr("true"), ast::Expr::Literal(ast::Literal::Bool(true)));
        assert_eq!(expr("42"), ast::Expr::Literal(ast::Literal::Integer(42)));
        assert_eq!(
            expr("1.5"),
            ast::Expr::Literal(ast::Literal::Float(OrderedFloat(1.5)))
        );
        assert_eq!(
            expr("'hi'"),
            ast::Expr::Literal(ast::Literal::String("hi".to_string()))
        );
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(
            expr("a + 2 * b"),
            ast::Expr::Binary(ast::BinaryExpr {
                operator: ast::BinaryOperator::Add,
                left: var("a", 0..1),
                right: Box::new(
                    ast::Expr::Binary(ast::BinaryExpr {
                        operator: ast::BinaryOperator::Mul,
                        left: int(2, 4..5),
                        right: var("b", 8..9),
                    })
                    .with_span(4..9)
                ),
            })
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        assert_eq!(
            expr("a - b - c"),
            ast::Expr::Binary(ast::BinaryExpr {
                operator: ast::BinaryOperator::Sub,
                left: Box::new(
                    ast::Expr::Binary(ast::BinaryExpr {
                        operator: ast::BinaryOperator::Sub,
                        left: var("a", 0..1),
                        right: var("b", 4..5),
                    })
                    .with_span(0..5)
                ),
                right: var("c", 8..9),
            })
        );
    }

    #[test]
    fn test_not_in() {
        assert_eq!(
            expr("x not in xs"),
            ast::Expr::Binary(ast::BinaryExpr {
                operator: ast::BinaryOperator::NotIn,
                left: var("x", 0..1),
                right: var("xs", 9..11),
            })
        );
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        assert_eq!(
            expr("not a == b"),
            ast::Expr::Unary(ast::UnaryExpr {
                operator: ast::UnaryOperator::Not,
                operand: Box::new(
                    ast::Expr::Binary(ast::BinaryExpr {
                        operator: ast::BinaryOperator::Eq,
                        left: var("a", 4..5),
                        right: var("b", 9..10),
                    })
                    .with_span(4..10)
                ),
            })
        );
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(
            expr("-x"),
            ast::Expr::Unary(ast::UnaryExpr {
                operator: ast::UnaryOperator::Neg,
                operand: var("x", 1..2),
            })
        );
    }

    #[test]
    fn test_postfix_chain() {
        assert_eq!(
            expr("user.tags[0]"),
            ast::Expr::Index(ast::IndexExpr {
                object: Box::new(
                    ast::Expr::Attr(ast::AttrExpr {
                        object: var("user", 0..4),
                        name: "tags".to_string().with_span(5..9),
                    })
                    .with_span(0..9)
                ),
                index: int(0, 10..11),
            })
        );
    }

    #[test]
    fn test_call_and_list() {
        assert_eq!(
            expr("len([1, 2,])"),
            ast::Expr::Call(ast::FunctionCall {
                name: "len".to_string().with_span(0..3),
                arguments: vec![ast::Expr::List(vec![*int(1, 5..6), *int(2, 8..9)])
                    .with_span(4..11)],
            })
        );
    }

    #[test]
    fn test_parenthesized_span_includes_parens() {
        let parsed = ast::Expr::parse("(a)").unwrap();
        assert_eq!(parsed, ast::Expr::Var("a".to_string()).with_span(0..3));
    }

    #[test]
    fn test_comparison_does_not_chain() {
        assert!(matches!(
            ast::Expr::parse("a < b < c"),
            Err(ParseError::ExpectedFound { .. })
        ));
    }

    #[test]
    fn test_expression_lex_error() {
        assert_eq!(
            ast::Expr::parse("a $ b"),
            Err(ParseError::Lex(LexError::UnexpectedCharacter {
                found: '$',
                span: 2..3
            }))
        );
    }
}
