//! Tokenizer for task expressions

use chumsky::prelude::*;
use std::ops::Range;

/// One lexical token
///
/// Numbers keep their source text so tokens stay `Eq + Hash`; the parser
/// converts them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Number(String),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(text) => write!(f, "{}", text),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Punct(p) => write!(f, "{}", p),
        }
    }
}

/// Character offsets of a token in the source
pub type Span = Range<usize>;

// Longest first, so that `===` wins over `==` and `=`
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "...", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "(", ")", "[", "]", "{", "}", ",",
    ".", "?", ":", "!", "<", ">", "+", "-", "*", "/", "%", ";", "=",
];

const INVALID: &str = "SyntaxError: Invalid or unexpected token";

fn is_digit(c: &char) -> bool {
    c.is_ascii_digit()
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

/// A quoted string; strings may not span lines
fn string_literal(quote: char) -> impl Parser<char, String, Error = Simple<char>> + Clone {
    let escape = just('\\').ignore_then(any().map(unescape));
    just(quote)
        .ignore_then(
            filter(move |c: &char| *c != quote && *c != '\\' && *c != '\n')
                .or(escape)
                .repeated(),
        )
        .then_ignore(just(quote))
        .collect()
}

/// Create a lexer for task expressions
pub fn lexer() -> impl Parser<char, Vec<(Token, Span)>, Error = Simple<char>> {
    // `1`, `1.5`, `.5`, `2e3`
    let exponent = one_of("eE")
        .chain(one_of("+-").or_not())
        .chain::<char, _, _>(filter(is_digit).repeated())
        .or_not()
        .map(Option::unwrap_or_default);
    let number = filter(is_digit)
        .or(just('.').then_ignore(filter(is_digit).rewind()))
        .chain::<char, _, _>(filter(|c: &char| c.is_ascii_digit() || *c == '.').repeated())
        .chain::<char, _, _>(exponent)
        .collect::<String>()
        .try_map(|text, span| match text.parse::<f64>() {
            Ok(_) => Ok(Token::Number(text)),
            Err(_) => Err(Simple::custom(span, INVALID)),
        });

    let string = string_literal('"').or(string_literal('\'')).map(Token::Str);

    let identifier = filter(|c: &char| c.is_alphabetic() || *c == '_' || *c == '$')
        .chain(filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '$').repeated())
        .collect::<String>()
        .map(Token::Ident);

    let punctuation = choice(
        PUNCTUATORS
            .iter()
            .map(|p| just::<char, _, Simple<char>>(*p).to(Token::Punct(*p)))
            .collect::<Vec<_>>(),
    );

    choice((number, string, identifier, punctuation))
        .map_with_span(|token, span| (token, span))
        .padded()
        .repeated()
        .then_ignore(end())
}

/// Splits `source` into spanned tokens
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>, String> {
    lexer().parse(source).map_err(|_| INVALID.to_string())
}
