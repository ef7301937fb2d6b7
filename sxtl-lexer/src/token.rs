use std::borrow::Cow;
use std::fmt;

use logos::{Lexer, Logos};

/// Why `logos` refused a piece of directive input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[default]
    UnexpectedCharacter,
    InvalidNumber,
}

/// A template token.
///
/// `Text`, `DirectiveOpen` and `OutputOpen` are produced by the literal mode
/// scanner; everything else is lexed inside a directive.
#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(error = TokenError)]
#[logos(skip r"[ \t\r\n\f]+")]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Token<'a> {
    Text(&'a str),
    DirectiveOpen,
    OutputOpen,

    #[token("?>")]
    DirectiveClose,
    #[token("}}")]
    OutputClose,

    #[regex(r"[0-9]+", integer_literal)]
    Integer(i64),
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", float_literal)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", float_literal)]
    Float(f64),
    #[regex(r#""([^"\\]|\\.)*""#, string_literal)]
    #[regex(r#"'([^'\\]|\\.)*'"#, string_literal)]
    String(Cow<'a, str>),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name(&'a str),

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    AsteriskAssign,
    #[token("/=")]
    SlashAssign,
    #[token("//=")]
    DoubleSlashAssign,
    #[token("%=")]
    PercentAssign,

    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanEqual,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,

    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("none")]
    None,

    #[token("print")]
    Print,
    #[token("printx")]
    Printx,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("for")]
    For,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("code")]
    Code,
    #[token("def")]
    Def,
    #[token("render")]
    Render,
}

impl Token<'_> {
    /// The keyword text of a directive-starting token, if it is one.
    pub fn directive_name(&self) -> Option<&'static str> {
        Some(match self {
            Token::Print => "print",
            Token::Printx => "printx",
            Token::If => "if",
            Token::Elif => "elif",
            Token::Else => "else",
            Token::End => "end",
            Token::For => "for",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Code => "code",
            Token::Def => "def",
            Token::Render => "render",
            _ => return None,
        })
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.directive_name() {
            return write!(f, "`{}`", name);
        }
        match self {
            Token::Text(_) => write!(f, "text"),
            Token::DirectiveOpen => write!(f, "`<?`"),
            Token::OutputOpen => write!(f, "`{{{{`"),
            Token::DirectiveClose => write!(f, "`?>`"),
            Token::OutputClose => write!(f, "`}}}}`"),
            Token::Integer(i) => write!(f, "integer {}", i),
            Token::Float(d) => write!(f, "float {}", d),
            Token::String(s) => write!(f, "string {:?}", s),
            Token::Name(n) => write!(f, "name `{}`", n),
            Token::LeftParen => write!(f, "`(`"),
            Token::RightParen => write!(f, "`)`"),
            Token::LeftBracket => write!(f, "`[`"),
            Token::RightBracket => write!(f, "`]`"),
            Token::Comma => write!(f, "`,`"),
            Token::Dot => write!(f, "`.`"),
            Token::Assign => write!(f, "`=`"),
            Token::PlusAssign => write!(f, "`+=`"),
            Token::MinusAssign => write!(f, "`-=`"),
            Token::AsteriskAssign => write!(f, "`*=`"),
            Token::SlashAssign => write!(f, "`/=`"),
            Token::DoubleSlashAssign => write!(f, "`//=`"),
            Token::PercentAssign => write!(f, "`%=`"),
            Token::Equal => write!(f, "`==`"),
            Token::NotEqual => write!(f, "`!=`"),
            Token::LessThan => write!(f, "`<`"),
            Token::LessThanEqual => write!(f, "`<=`"),
            Token::GreaterThan => write!(f, "`>`"),
            Token::GreaterThanEqual => write!(f, "`>=`"),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Asterisk => write!(f, "`*`"),
            Token::Slash => write!(f, "`/`"),
            Token::DoubleSlash => write!(f, "`//`"),
            Token::Percent => write!(f, "`%`"),
            Token::And => write!(f, "`and`"),
            Token::Or => write!(f, "`or`"),
            Token::Not => write!(f, "`not`"),
            Token::In => write!(f, "`in`"),
            Token::True => write!(f, "`true`"),
            Token::False => write!(f, "`false`"),
            Token::None => write!(f, "`none`"),
            // directive keywords are handled above
            _ => write!(f, "{:?}", self),
        }
    }
}

fn integer_literal<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Result<i64, TokenError> {
    lex.slice().parse().map_err(|_| TokenError::InvalidNumber)
}

fn float_literal<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Result<f64, TokenError> {
    lex.slice().parse().map_err(|_| TokenError::InvalidNumber)
}

fn string_literal<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, str> {
    let slice = lex.slice();
    let s = &slice[1..slice.len() - 1];
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut unescaped = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        // the regex guarantees a character follows every backslash
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    Cow::Owned(unescaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Result<Token, TokenError>> {
        Token::lexer(src).collect()
    }

    #[test]
    fn test_keyword_beats_name() {
        assert_eq!(lex("for"), vec![Ok(Token::For)]);
        assert_eq!(lex("format"), vec![Ok(Token::Name("format"))]);
        assert_eq!(lex("printx"), vec![Ok(Token::Printx)]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("12 1.5 2e3"),
            vec![Ok(Token::Integer(12)), Ok(Token::Float(1.5)), Ok(Token::Float(2000.0))]
        );
    }

    #[test]
    fn test_integer_overflow() {
        assert_eq!(
            lex("99999999999999999999"),
            vec![Err(TokenError::InvalidNumber)]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            lex(r#"'a\'b' "x\ny""#),
            vec![
                Ok(Token::String(Cow::Owned("a'b".to_string()))),
                Ok(Token::String(Cow::Owned("x\ny".to_string()))),
            ]
        );
    }

    #[test]
    fn test_string_borrowed() {
        let tokens = lex("'plain'");
        assert!(matches!(&tokens[0], Ok(Token::String(Cow::Borrowed("plain")))));
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            lex("//= // / <= =="),
            vec![
                Ok(Token::DoubleSlashAssign),
                Ok(Token::DoubleSlash),
                Ok(Token::Slash),
                Ok(Token::LessThanEqual),
                Ok(Token::Equal),
            ]
        );
    }
}
