use std::vec;

use sxtl_lexer::{LexError, SpannedToken, Token};

use crate::ast;
use crate::ast::{BlockKind, Span};
use crate::error::{ParseError, Result};
use crate::span::WithSpan;

use super::parser_core::Directive;

/// One literal run or one directive of the template, in source order.
pub(crate) enum Item<'a> {
    Text(&'a str, Span),
    Directive {
        output: bool,
        tokens: Vec<(Token<'a>, Span)>,
        close: Span,
        span: Span,
    },
}

/// Split a token stream into literal runs and directives.
pub(crate) fn items<'a>(
    src: &'a str,
    tokens: impl Iterator<Item = std::result::Result<SpannedToken<'a>, LexError>>,
) -> Result<Vec<Item<'a>>> {
    let mut tokens = tokens;
    let mut items = Vec::new();
    while let Some(token) = tokens.next() {
        let (token, span) = token?;
        let output = match token {
            Token::Text(text) => {
                items.push(Item::Text(text, span.into()));
                continue;
            }
            Token::DirectiveOpen => false,
            Token::OutputOpen => true,
            other => {
                return Err(ParseError::ExpectedFound {
                    span: span.into(),
                    expected: vec!["text".to_string(), "directive".to_string()],
                    found: Some(other.to_string()),
                })
            }
        };
        let mut inner = Vec::new();
        let close = loop {
            let (token, token_span) = match tokens.next() {
                Some(token) => token?,
                None => {
                    return Err(LexError::UnterminatedDirective {
                        span: span.start..src.len(),
                    }
                    .into())
                }
            };
            let closes = if output {
                token == Token::OutputClose
            } else {
                token == Token::DirectiveClose
            };
            if closes {
                break token_span;
            }
            inner.push((token, token_span.into()));
        };
        items.push(Item::Directive {
            output,
            tokens: inner,
            close: close.clone().into(),
            span: (span.start..close.end).into(),
        });
    }
    Ok(items)
}

/// The end of a block: the directive that stopped `parse_block`.
enum Terminator {
    Elif(ast::ExprS),
    Else,
    End(Option<BlockKind>),
}

impl Terminator {
    fn keyword(&self) -> String {
        match self {
            Terminator::Elif(_) => "elif".to_string(),
            Terminator::Else => "else".to_string(),
            Terminator::End(None) => "end".to_string(),
            Terminator::End(Some(kind)) => format!("end {}", kind),
        }
    }
}

/// An item whose directive, if any, has been parsed.
pub(crate) enum Entry {
    Text(ast::NodeS),
    Directive(Directive, Span),
}

/// Pairs block openers with their `elif`, `else` and `end` directives.
pub(crate) struct TemplateParser {
    entries: vec::IntoIter<Entry>,
    loop_depth: usize,
}

impl TemplateParser {
    pub(crate) fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries: entries.into_iter(),
            loop_depth: 0,
        }
    }

    pub(crate) fn parse_template(mut self) -> Result<Vec<ast::NodeS>> {
        let (body, terminator) = self.parse_block()?;
        match terminator {
            None => Ok(body),
            Some((terminator, span)) => Err(ParseError::UnmatchedEnd {
                found: terminator.keyword(),
                span,
            }),
        }
    }

    fn parse_block(&mut self) -> Result<(Vec<ast::NodeS>, Option<(Terminator, Span)>)> {
        let mut nodes = Vec::new();
        while let Some(entry) = self.entries.next() {
            let (directive, span) = match entry {
                Entry::Text(node) => {
                    nodes.push(node);
                    continue;
                }
                Entry::Directive(directive, span) => (directive, span),
            };
            match directive {
                Directive::Print { expr, escape } => {
                    nodes.push(ast::Node::Output(ast::Output { expr, escape }).with_span(span))
                }
                Directive::If(condition) => nodes.push(self.parse_if(condition, span)?),
                Directive::For { var_name, iterable } => {
                    nodes.push(self.parse_for(var_name, iterable, span)?)
                }
                Directive::Def { name, params } => nodes.push(self.parse_def(name, params, span)?),
                Directive::Code(assign) => nodes.push(ast::Node::Assign(assign).with_span(span)),
                Directive::Render(render) => nodes.push(ast::Node::Render(render).with_span(span)),
                Directive::Break => nodes.push(self.loop_control(ast::Node::Break, "break", span)?),
                Directive::Continue => {
                    nodes.push(self.loop_control(ast::Node::Continue, "continue", span)?)
                }
                Directive::Elif(condition) => {
                    return Ok((nodes, Some((Terminator::Elif(condition), span))))
                }
                Directive::Else => return Ok((nodes, Some((Terminator::Else, span)))),
                Directive::End(kind) => return Ok((nodes, Some((Terminator::End(kind), span)))),
            }
        }
        Ok((nodes, None))
    }

    fn loop_control(&self, node: ast::Node, keyword: &str, span: Span) -> Result<ast::NodeS> {
        if self.loop_depth == 0 {
            return Err(ParseError::LoopControlOutsideLoop {
                directive: keyword.to_string(),
                span,
            });
        }
        Ok(node.with_span(span))
    }

    fn parse_if(&mut self, condition: ast::ExprS, open: Span) -> Result<ast::NodeS> {
        let (then, terminator) = self.parse_block()?;
        let (else_, end) = match terminator {
            None => return Err(unclosed(BlockKind::If, open)),
            Some((Terminator::End(kind), span)) => {
                check_end(BlockKind::If, kind, span)?;
                (Vec::new(), span)
            }
            Some((Terminator::Elif(condition), span)) => {
                let nested = self.parse_if(condition, span)?;
                let end = nested.span;
                (vec![nested], end)
            }
            Some((Terminator::Else, _)) => {
                let (else_, terminator) = self.parse_block()?;
                match terminator {
                    None => return Err(unclosed(BlockKind::If, open)),
                    Some((Terminator::End(kind), span)) => {
                        check_end(BlockKind::If, kind, span)?;
                        (else_, span)
                    }
                    Some((terminator, span)) => {
                        return Err(ParseError::ElseAfterElse {
                            found: terminator.keyword(),
                            span,
                        })
                    }
                }
            }
        };
        Ok(ast::Node::If(ast::If {
            condition,
            then,
            else_,
        })
        .with_span(open.start..end.end))
    }

    fn parse_for(
        &mut self,
        var_name: ast::NameS,
        iterable: ast::ExprS,
        open: Span,
    ) -> Result<ast::NodeS> {
        self.loop_depth += 1;
        let (body, terminator) = self.parse_block()?;
        self.loop_depth -= 1;
        let end = self.expect_end(BlockKind::For, terminator, open)?;
        Ok(ast::Node::For(ast::For {
            var_name,
            iterable,
            body,
        })
        .with_span(open.start..end.end))
    }

    fn parse_def(
        &mut self,
        name: ast::NameS,
        params: Vec<ast::NameS>,
        open: Span,
    ) -> Result<ast::NodeS> {
        // loop control never crosses a sub-template boundary
        let loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        let (body, terminator) = self.parse_block()?;
        self.loop_depth = loop_depth;
        let end = self.expect_end(BlockKind::Def, terminator, open)?;
        Ok(ast::Node::Def(ast::Def { name, params, body }).with_span(open.start..end.end))
    }

    fn expect_end(
        &self,
        kind: BlockKind,
        terminator: Option<(Terminator, Span)>,
        open: Span,
    ) -> Result<Span> {
        match terminator {
            None => Err(unclosed(kind, open)),
            Some((Terminator::End(found), span)) => {
                check_end(kind, found, span)?;
                Ok(span)
            }
            Some((terminator, span)) => Err(ParseError::UnmatchedEnd {
                found: terminator.keyword(),
                span,
            }),
        }
    }
}

fn check_end(expected: BlockKind, found: Option<BlockKind>, span: Span) -> Result<()> {
    match found {
        Some(found) if found != expected => Err(ParseError::MismatchedEnd {
            expected,
            found,
            span,
        }),
        _ => Ok(()),
    }
}

fn unclosed(expected: BlockKind, span: Span) -> ParseError {
    ParseError::UnclosedBlock { expected, span }
}
