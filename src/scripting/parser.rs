//! Expression syntax tree and parser
//!
//! The accepted language is a small expression subset: literals, array
//! literals, identifiers, property access, calls, arrow functions with an
//! expression body, unary, binary and logical operators, and the ternary.
//! Statements are not accepted, so a leading `return` is a syntax error.

use chumsky::prelude::*;
use chumsky::Stream;

use super::lexer::{tokenize, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Array(Vec<Expr>),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Arrow {
        params: Vec<String>,
        body: Box<Expr>,
    },
}

impl Expr {
    /// Source-like rendering used in runtime error messages
    pub fn describe(&self) -> String {
        match self {
            Expr::Ident(name) => name.clone(),
            Expr::Member { object, property, .. } => format!("{}.{}", object.describe(), property),
            Expr::Index { object, .. } => format!("{}[...]", object.describe()),
            Expr::Call { callee, .. } => format!("{}(...)", callee.describe()),
            _ => "(intermediate value)".to_string(),
        }
    }
}

// Words that start statements or declarations
const RESERVED: &[&str] = &[
    "return", "function", "let", "const", "var", "if", "else", "for", "while", "do", "new", "class", "delete",
    "switch", "throw", "try", "catch", "this", "import", "export", "await", "yield", "void", "in", "instanceof",
];

/// Parses a complete expression.
///
/// Errors are JavaScript-style messages such as
/// `SyntaxError: Unexpected token 'return'`.
pub fn parse(source: &str) -> Result<Expr, String> {
    let tokens = tokenize(source)?;
    let len = source.chars().count();

    parser()
        .parse(Stream::from_iter(len..len + 1, tokens.into_iter()))
        .map_err(|errors| {
            errors
                .iter()
                .max_by_key(|error| error.span().start)
                .map(describe_error)
                .unwrap_or_else(|| "SyntaxError: Unexpected end of input".to_string())
        })
}

fn describe_error(error: &Simple<Token>) -> String {
    match error.found() {
        None => "SyntaxError: Unexpected end of input".to_string(),
        Some(Token::Str(_)) => "SyntaxError: Unexpected string".to_string(),
        Some(Token::Number(_)) => "SyntaxError: Unexpected number".to_string(),
        Some(Token::Ident(name)) if !RESERVED.contains(&name.as_str()) => {
            "SyntaxError: Unexpected identifier".to_string()
        }
        Some(other) => format!("SyntaxError: Unexpected token '{}'", other),
    }
}

/// Tail operations after an atom: `.name`, `?.name`, `[index]`, `(args)`
#[derive(Clone)]
enum Postfix {
    Member { property: String, optional: bool },
    Index(Expr),
    Call(Vec<Expr>),
}

// ============================================================================
// Helpers
// ============================================================================

fn punct(p: &'static str) -> impl Parser<Token, Token, Error = Simple<Token>> + Clone {
    just(Token::Punct(p))
}

fn word(w: &str) -> impl Parser<Token, Token, Error = Simple<Token>> + Clone {
    just(Token::Ident(w.to_string()))
}

/// A name usable as a variable or parameter
fn identifier() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    filter_map(|span, token| match token {
        Token::Ident(name) if !RESERVED.contains(&name.as_str()) => Ok(name),
        other => Err(Simple::expected_input_found(span, None, Some(other))),
    })
}

/// Any name after `.`; reserved words are allowed as properties
fn property_name() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    select! { Token::Ident(name) => name }
}

fn number() -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone {
    filter_map(|span, token| match token {
        Token::Number(text) => match text.parse::<f64>() {
            Ok(n) => Ok(Expr::Literal(Literal::Number(n))),
            Err(_) => Err(Simple::expected_input_found(span, None, Some(Token::Number(text)))),
        },
        other => Err(Simple::expected_input_found(span, None, Some(other))),
    })
}

/// One left-associative level of binary operators over `operand`
fn binary_level<P>(
    operand: P,
    operators: &[(&'static str, BinaryOp)],
) -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone
where
    P: Parser<Token, Expr, Error = Simple<Token>> + Clone,
{
    let operator = choice(
        operators
            .iter()
            .map(|&(p, op)| punct(p).to(op))
            .collect::<Vec<_>>(),
    );
    operand
        .clone()
        .then(operator.then(operand).repeated())
        .foldl(|left, (op, right)| Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
}

/// One left-associative level of a short-circuit operator
fn logical_level<P>(operand: P, p: &'static str, op: LogicalOp) -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone
where
    P: Parser<Token, Expr, Error = Simple<Token>> + Clone,
{
    operand
        .clone()
        .then(punct(p).ignore_then(operand).repeated())
        .foldl(move |left, right| Expr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
}

// ============================================================================
// Expressions
// ============================================================================

/// Create a parser for a complete expression, allowing trailing `;`
fn parser() -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone {
    expression()
        .then_ignore(punct(";").repeated())
        .then_ignore(end())
}

fn expression() -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone {
    recursive(|expr| {
        let literal = choice((
            number(),
            select! { Token::Str(s) => Expr::Literal(Literal::Str(s)) },
            word("true").to(Expr::Literal(Literal::Bool(true))),
            word("false").to(Expr::Literal(Literal::Bool(false))),
            word("null").to(Expr::Literal(Literal::Null)),
            word("undefined").to(Expr::Literal(Literal::Undefined)),
        ));

        let items = expr
            .clone()
            .separated_by(punct(","))
            .allow_trailing();

        let array = items
            .clone()
            .delimited_by(punct("["), punct("]"))
            .map(Expr::Array);

        let paren = expr.clone().delimited_by(punct("("), punct(")"));

        let atom = choice((literal, identifier().map(Expr::Ident), array, paren));

        let postfix = choice((
            punct(".")
                .to(false)
                .or(punct("?.").to(true))
                .then(property_name())
                .map(|(optional, property)| Postfix::Member { property, optional }),
            expr.clone()
                .delimited_by(punct("["), punct("]"))
                .map(Postfix::Index),
            items.delimited_by(punct("("), punct(")")).map(Postfix::Call),
        ));

        let call_chain = atom.then(postfix.repeated()).foldl(|object, op| match op {
            Postfix::Member { property, optional } => Expr::Member {
                object: Box::new(object),
                property,
                optional,
            },
            Postfix::Index(index) => Expr::Index {
                object: Box::new(object),
                index: Box::new(index),
            },
            Postfix::Call(args) => Expr::Call {
                callee: Box::new(object),
                args,
            },
        });

        let unary = choice((
            punct("!").to(UnaryOp::Not),
            punct("-").to(UnaryOp::Negate),
            punct("+").to(UnaryOp::Plus),
            word("typeof").to(UnaryOp::TypeOf),
        ))
        .repeated()
        .then(call_chain)
        .foldr(|op, operand| Expr::Unary {
            op,
            operand: Box::new(operand),
        })
        .boxed();

        let multiplicative = binary_level(
            unary,
            &[
                ("*", BinaryOp::Multiply),
                ("/", BinaryOp::Divide),
                ("%", BinaryOp::Remainder),
            ],
        )
        .boxed();
        let additive = binary_level(multiplicative, &[("+", BinaryOp::Add), ("-", BinaryOp::Subtract)]).boxed();
        let relational = binary_level(
            additive,
            &[
                ("<=", BinaryOp::LessOrEqual),
                (">=", BinaryOp::GreaterOrEqual),
                ("<", BinaryOp::Less),
                (">", BinaryOp::Greater),
            ],
        )
        .boxed();
        let equality = binary_level(
            relational,
            &[
                ("===", BinaryOp::StrictEqual),
                ("!==", BinaryOp::StrictNotEqual),
                ("==", BinaryOp::Equal),
                ("!=", BinaryOp::NotEqual),
            ],
        )
        .boxed();

        // `??` binds loosest, then `||`, then `&&`
        let and = logical_level(equality, "&&", LogicalOp::And).boxed();
        let or = logical_level(and, "||", LogicalOp::Or).boxed();
        let nullish = logical_level(or, "??", LogicalOp::Nullish).boxed();

        let conditional = nullish
            .then(
                punct("?")
                    .ignore_then(expr.clone())
                    .then_ignore(punct(":"))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(test, branches)| match branches {
                Some((consequent, alternate)) => Expr::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
                None => test,
            });

        // `x => body` or `(a, b) => body`; a `{` body is rejected by `expr`
        let params = identifier().map(|name| vec![name]).or(identifier()
            .separated_by(punct(","))
            .delimited_by(punct("("), punct(")")));
        let arrow = params
            .then_ignore(punct("=>"))
            .then(expr)
            .map(|(params, body)| Expr::Arrow {
                params,
                body: Box::new(body),
            });

        choice((arrow, conditional))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    #[test]
    fn member_access_chain() {
        assert_eq!(
            parse("task.due.category").unwrap(),
            Expr::Member {
                object: Box::new(Expr::Member {
                    object: ident("task"),
                    property: "due".to_string(),
                    optional: false,
                }),
                property: "category".to_string(),
                optional: false,
            }
        );
    }

    #[test]
    fn multiplication_binds_tighter() {
        let Expr::Binary { op, right, .. } = parse("1 + 2 * 3").unwrap() else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Multiply, .. }));
    }

    #[test]
    fn arrow_functions() {
        let expr = parse("task.tags.filter( (tag) => ! tag.includes('#x') )").unwrap();
        let Expr::Call { args, .. } = expr else {
            panic!("expected call");
        };
        assert!(matches!(&args[0], Expr::Arrow { params, .. } if params == &["tag".to_string()]));
        assert!(matches!(parse("t => t").unwrap(), Expr::Arrow { .. }));
    }

    #[test]
    fn parenthesised_expression_is_not_an_arrow() {
        assert!(matches!(parse("(a) + 1").unwrap(), Expr::Binary { .. }));
    }

    #[test]
    fn ternary_and_logical() {
        assert!(matches!(
            parse("task.isDone ? 'a' : 'b'").unwrap(),
            Expr::Conditional { .. }
        ));
        assert!(matches!(
            parse("null || 'No value'").unwrap(),
            Expr::Logical { op: LogicalOp::Or, .. }
        ));
    }

    #[test]
    fn return_is_rejected() {
        assert_eq!(parse("return 42").unwrap_err(), "SyntaxError: Unexpected token 'return'");
    }

    #[test]
    fn unbalanced_parentheses() {
        assert_eq!(parse("x(").unwrap_err(), "SyntaxError: Unexpected end of input");
        assert_eq!(parse("x())").unwrap_err(), "SyntaxError: Unexpected token ')'");
    }

    #[test]
    fn arrays_optional_members_and_unary() {
        assert!(matches!(parse("[1, 2,]").unwrap(), Expr::Array(items) if items.len() == 2));
        assert!(matches!(
            parse("task.due?.moment").unwrap(),
            Expr::Member { optional: true, .. }
        ));
        assert!(matches!(
            parse("typeof task.id").unwrap(),
            Expr::Unary { op: UnaryOp::TypeOf, .. }
        ));
        assert_eq!(parse("!!task.isDone;").unwrap(), parse("!(!task.isDone)").unwrap());
    }

    #[test]
    fn object_body_in_arrow_is_rejected() {
        assert_eq!(parse("t => { t }").unwrap_err(), "SyntaxError: Unexpected token '{'");
    }

    #[test]
    fn assignment_is_rejected() {
        assert_eq!(parse("a = 1").unwrap_err(), "SyntaxError: Unexpected token '='");
    }
}
