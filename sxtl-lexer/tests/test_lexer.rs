use std::borrow::Cow;

use sxtl_lexer::{tokenize, LexError, Token};

#[test]
fn test_text_only() {
    let mut lex = tokenize("Hello world");
    assert_eq!(lex.next(), Some(Ok((Token::Text("Hello world"), 0..11))));
    assert_eq!(lex.next(), None);
}

#[test]
fn test_empty() {
    let mut lex = tokenize("");
    assert_eq!(lex.next(), None);
}

#[test]
fn test_print_shorthand() {
    let mut lex = tokenize("Hello <?=name?>!");
    assert_eq!(lex.next(), Some(Ok((Token::Text("Hello "), 0..6))));
    assert_eq!(lex.next(), Some(Ok((Token::DirectiveOpen, 6..8))));
    assert_eq!(lex.next(), Some(Ok((Token::Assign, 8..9))));
    assert_eq!(lex.next(), Some(Ok((Token::Name("name"), 9..13))));
    assert_eq!(lex.next(), Some(Ok((Token::DirectiveClose, 13..15))));
    assert_eq!(lex.next(), Some(Ok((Token::Text("!"), 15..16))));
    assert_eq!(lex.next(), None);
}

#[test]
fn test_output_braces() {
    let mut lex = tokenize("{{ x }}");
    assert_eq!(lex.next(), Some(Ok((Token::OutputOpen, 0..2))));
    assert_eq!(lex.next(), Some(Ok((Token::Name("x"), 3..4))));
    assert_eq!(lex.next(), Some(Ok((Token::OutputClose, 5..7))));
    assert_eq!(lex.next(), None);
}

#[test]
fn test_for_directive() {
    let tokens = tokenize("<?for x in items?>")
        .map(|t| t.map(|(token, _)| token))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::DirectiveOpen,
            Token::For,
            Token::Name("x"),
            Token::In,
            Token::Name("items"),
            Token::DirectiveClose,
        ]
    );
}

#[test]
fn test_close_delimiter_inside_string() {
    let tokens = tokenize("<?print '?>'?>after")
        .map(|t| t.map(|(token, _)| token))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::DirectiveOpen,
            Token::Print,
            Token::String(Cow::Borrowed("?>")),
            Token::DirectiveClose,
            Token::Text("after"),
        ]
    );
}

#[test]
fn test_note_is_skipped() {
    let mut lex = tokenize("a<?note anything {{ goes <? here?>b");
    assert_eq!(lex.next(), Some(Ok((Token::Text("a"), 0..1))));
    assert_eq!(lex.next(), Some(Ok((Token::Text("b"), 34..35))));
    assert_eq!(lex.next(), None);
}

#[test]
fn test_unterminated_directive() {
    let mut lex = tokenize("abc <?if x");
    assert_eq!(lex.next(), Some(Ok((Token::Text("abc "), 0..4))));
    assert_eq!(lex.next(), Some(Ok((Token::DirectiveOpen, 4..6))));
    assert_eq!(lex.next(), Some(Ok((Token::If, 6..8))));
    assert_eq!(lex.next(), Some(Ok((Token::Name("x"), 9..10))));
    assert_eq!(
        lex.next(),
        Some(Err(LexError::UnterminatedDirective { span: 4..10 }))
    );
    // the stream is fused after an error
    assert_eq!(lex.next(), None);
}

#[test]
fn test_unterminated_note() {
    let mut lex = tokenize("<?note forever");
    assert_eq!(
        lex.next(),
        Some(Err(LexError::UnterminatedDirective { span: 0..14 }))
    );
}

#[test]
fn test_unexpected_character() {
    let mut lex = tokenize("<?print $x?>");
    assert_eq!(lex.next(), Some(Ok((Token::DirectiveOpen, 0..2))));
    assert_eq!(lex.next(), Some(Ok((Token::Print, 2..7))));
    assert_eq!(
        lex.next(),
        Some(Err(LexError::UnexpectedCharacter {
            found: '$',
            span: 8..9
        }))
    );
    assert_eq!(lex.next(), None);
}

#[test]
fn test_invalid_number() {
    let result = tokenize("{{ 123456789012345678901234 }}").collect::<Result<Vec<_>, _>>();
    assert_eq!(result, Err(LexError::InvalidNumber { span: 3..27 }));
}

#[test]
fn test_restartable() {
    let lex = tokenize("a{{b}}c");
    let first = lex.clone().collect::<Vec<_>>();
    let second = lex.collect::<Vec<_>>();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[test]
fn test_mismatched_close_stays_in_directive() {
    // `}}` does not end a `<?` directive; the parser rejects it later
    let tokens = tokenize("<?print x}}?>y")
        .map(|t| t.map(|(token, _)| token))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::DirectiveOpen,
            Token::Print,
            Token::Name("x"),
            Token::OutputClose,
            Token::DirectiveClose,
            Token::Text("y"),
        ]
    );
}
