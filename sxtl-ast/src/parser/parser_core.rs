use chumsky::{input::ValueInput, prelude::*};
use ordered_float::OrderedFloat;
use sxtl_lexer::Token;

use crate::ast;
use crate::ast::{BlockKind, Span};
use crate::span::WithSpan;

use super::types::BoxedParser;

/// The parsed content of a single `<? ... ?>` or `{{ ... }}` directive.
///
/// Block structure is not known at this level; the template parser pairs
/// openers with their `End`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Directive {
    Print { expr: ast::ExprS, escape: bool },
    If(ast::ExprS),
    Elif(ast::ExprS),
    Else,
    End(Option<BlockKind>),
    For {
        var_name: ast::NameS,
        iterable: ast::ExprS,
    },
    Break,
    Continue,
    Code(ast::Assign),
    Def {
        name: ast::NameS,
        params: Vec<ast::NameS>,
    },
    Render(ast::Render),
}

#[derive(Clone)]
pub(crate) struct ParserOutput<'a, I>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    pub(crate) expr: BoxedParser<'a, I, ast::ExprS>,
    pub(crate) directive: BoxedParser<'a, I, Directive>,
}

enum Postfix {
    Attr(ast::NameS, Span),
    Index(ast::ExprS, Span),
}

pub(crate) fn parser<'a, I>() -> ParserOutput<'a, I>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    let name = select! {
        Token::Name(name) => name.to_string(),
    }
    .map_with(|name, extra| name.with_span(extra.span()))
    .boxed();

    let expr = recursive(|expr| {
        let literal = select! {
            Token::None => ast::Literal::None,
            Token::True => ast::Literal::Bool(true),
            Token::False => ast::Literal::Bool(false),
            Token::Integer(i) => ast::Literal::Integer(i),
            Token::Float(f) => ast::Literal::Float(OrderedFloat(f)),
            Token::String(s) => ast::Literal::String(s.into_owned()),
        }
        .map_with(|literal, extra| ast::Expr::Literal(literal).with_span(extra.span()))
        .boxed();

        let arguments = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LeftParen), just(Token::RightParen))
            .boxed();

        let function_call = name
            .clone()
            .then(arguments)
            .map_with(|(name, arguments), extra| {
                ast::Expr::Call(ast::FunctionCall { name, arguments }).with_span(extra.span())
            })
            .boxed();

        let var_ref = name
            .clone()
            .map(|name| ast::Expr::Var(name.value).with_span(name.span))
            .boxed();

        let list = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LeftBracket), just(Token::RightBracket))
            .map_with(|items, extra| ast::Expr::List(items).with_span(extra.span()))
            .boxed();

        let parenthesized = expr
            .clone()
            .delimited_by(just(Token::LeftParen), just(Token::RightParen))
            .map_with(|expr: ast::ExprS, extra| expr.value.with_span(extra.span()))
            .boxed();

        let primary = literal
            .or(function_call)
            .or(var_ref)
            .or(list)
            .or(parenthesized)
            .boxed();

        let attr = just(Token::Dot)
            .ignore_then(name.clone())
            .map_with(|name, extra| Postfix::Attr(name, extra.span()))
            .boxed();
        let index = expr
            .clone()
            .delimited_by(just(Token::LeftBracket), just(Token::RightBracket))
            .map_with(|index, extra| Postfix::Index(index, extra.span()))
            .boxed();

        let postfix_expr = primary
            .foldl(attr.or(index).repeated(), |object, postfix| match postfix {
                Postfix::Attr(name, span) => {
                    let span: Span = (object.span.start..span.end).into();
                    ast::Expr::Attr(ast::AttrExpr {
                        object: Box::new(object),
                        name,
                    })
                    .with_span(span)
                }
                Postfix::Index(index, span) => {
                    let span: Span = (object.span.start..span.end).into();
                    ast::Expr::Index(ast::IndexExpr {
                        object: Box::new(object),
                        index: Box::new(index),
                    })
                    .with_span(span)
                }
            })
            .boxed();

        let negation = unary_expr(postfix_expr, Token::Minus, ast::UnaryOperator::Neg);

        let multiplicative = binary_expr_op(
            negation,
            choice::<_>([
                just(Token::Asterisk).to(ast::BinaryOperator::Mul),
                just(Token::Slash).to(ast::BinaryOperator::Div),
                just(Token::DoubleSlash).to(ast::BinaryOperator::FloorDiv),
                just(Token::Percent).to(ast::BinaryOperator::Mod),
            ])
            .boxed(),
        );

        let additive = binary_expr_op(
            multiplicative,
            choice::<_>([
                just(Token::Plus).to(ast::BinaryOperator::Add),
                just(Token::Minus).to(ast::BinaryOperator::Sub),
            ])
            .boxed(),
        );

        let comparison_operator = choice::<_>([
            just(Token::Equal).to(ast::BinaryOperator::Eq),
            just(Token::NotEqual).to(ast::BinaryOperator::Ne),
            just(Token::LessThanEqual).to(ast::BinaryOperator::Le),
            just(Token::LessThan).to(ast::BinaryOperator::Lt),
            just(Token::GreaterThanEqual).to(ast::BinaryOperator::Ge),
            just(Token::GreaterThan).to(ast::BinaryOperator::Gt),
            just(Token::In).to(ast::BinaryOperator::In),
        ])
        .or(just(Token::Not)
            .then(just(Token::In))
            .to(ast::BinaryOperator::NotIn))
        .boxed();

        // comparisons do not chain: `a < b < c` is a syntax error
        let comparison = additive
            .clone()
            .then(comparison_operator.then(additive).or_not())
            .map(|(left, right)| match right {
                None => left,
                Some((operator, right)) => binary(left, operator, right),
            })
            .boxed();

        let not_expr = unary_expr(comparison, Token::Not, ast::UnaryOperator::Not);
        let and_expr = binary_expr(not_expr, Token::And, ast::BinaryOperator::And);
        binary_expr(and_expr, Token::Or, ast::BinaryOperator::Or)
    })
    .boxed();

    let arguments = expr
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LeftParen), just(Token::RightParen))
        .boxed();

    let block_kind = choice::<_>([
        just(Token::If).to(BlockKind::If),
        just(Token::For).to(BlockKind::For),
        just(Token::Def).to(BlockKind::Def),
    ]);

    let print = just(Token::Assign)
        .or(just(Token::Print))
        .ignore_then(expr.clone())
        .map(|expr| Directive::Print {
            expr,
            escape: false,
        })
        .boxed();
    let printx = just(Token::Printx)
        .ignore_then(expr.clone())
        .map(|expr| Directive::Print { expr, escape: true })
        .boxed();
    let if_ = just(Token::If)
        .ignore_then(expr.clone())
        .map(Directive::If)
        .boxed();
    let elif = just(Token::Elif)
        .ignore_then(expr.clone())
        .map(Directive::Elif)
        .boxed();
    let else_ = just(Token::Else).to(Directive::Else).boxed();
    let end_ = just(Token::End)
        .ignore_then(block_kind.or_not())
        .map(Directive::End)
        .boxed();

    let for_ = just(Token::For)
        .ignore_then(name.clone())
        .then_ignore(just(Token::In))
        .then(expr.clone())
        .map(|(var_name, iterable)| Directive::For { var_name, iterable })
        .boxed();
    let break_ = just(Token::Break).to(Directive::Break).boxed();
    let continue_ = just(Token::Continue).to(Directive::Continue).boxed();

    let assign_operator = choice::<_>([
        just(Token::Assign).to(ast::AssignOperator::Assign),
        just(Token::PlusAssign).to(ast::AssignOperator::Add),
        just(Token::MinusAssign).to(ast::AssignOperator::Sub),
        just(Token::AsteriskAssign).to(ast::AssignOperator::Mul),
        just(Token::SlashAssign).to(ast::AssignOperator::Div),
        just(Token::DoubleSlashAssign).to(ast::AssignOperator::FloorDiv),
        just(Token::PercentAssign).to(ast::AssignOperator::Mod),
    ]);
    let code = just(Token::Code)
        .ignore_then(name.clone())
        .then(assign_operator)
        .then(expr.clone())
        .map(|((name, operator), value)| {
            Directive::Code(ast::Assign {
                name,
                operator,
                value,
            })
        })
        .boxed();

    // `<?def name?>` takes no parameters; the parentheses are optional
    let params = name
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LeftParen), just(Token::RightParen))
        .or_not()
        .map(Option::unwrap_or_default)
        .boxed();
    let def = just(Token::Def)
        .ignore_then(name.clone())
        .then(params)
        .map(|(name, params)| Directive::Def { name, params })
        .boxed();

    let render = just(Token::Render)
        .ignore_then(name.clone())
        .then(arguments.or_not().map(Option::unwrap_or_default))
        .map(|(name, arguments)| Directive::Render(ast::Render { name, arguments }))
        .boxed();

    let directive = print
        .or(printx)
        .or(if_)
        .or(elif)
        .or(else_)
        .or(end_)
        .or(for_)
        .or(break_)
        .or(continue_)
        .or(code)
        .or(def)
        .or(render)
        .then_ignore(end())
        .boxed();

    let expr = expr.then_ignore(end()).boxed();

    ParserOutput { expr, directive }
}

fn binary(left: ast::ExprS, operator: ast::BinaryOperator, right: ast::ExprS) -> ast::ExprS {
    let span: Span = (left.span.start..right.span.end).into();
    ast::Expr::Binary(ast::BinaryExpr {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
    .with_span(span)
}

fn unary_expr<'a, I>(
    sub_expr: BoxedParser<'a, I, ast::ExprS>,
    operator_token: Token<'a>,
    operator: ast::UnaryOperator,
) -> BoxedParser<'a, I, ast::ExprS>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    just(operator_token)
        .map_with(|_, extra| extra.span())
        .repeated()
        .foldr(sub_expr, move |operator_span: Span, operand| {
            let span: Span = (operator_span.start..operand.span.end).into();
            ast::Expr::Unary(ast::UnaryExpr {
                operator,
                operand: Box::new(operand),
            })
            .with_span(span)
        })
        .boxed()
}

fn binary_expr<'a, I>(
    sub_expr: BoxedParser<'a, I, ast::ExprS>,
    operator_token: Token<'a>,
    operator: ast::BinaryOperator,
) -> BoxedParser<'a, I, ast::ExprS>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    binary_expr_op(
        sub_expr,
        just(operator_token).map(move |_| operator).boxed(),
    )
}

fn binary_expr_op<'a, I>(
    sub_expr: BoxedParser<'a, I, ast::ExprS>,
    operator: BoxedParser<'a, I, ast::BinaryOperator>,
) -> BoxedParser<'a, I, ast::ExprS>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    sub_expr
        .clone()
        .foldl(
            operator.then(sub_expr).repeated(),
            move |left, (operator, right)| binary(left, operator, right),
        )
        .boxed()
}
