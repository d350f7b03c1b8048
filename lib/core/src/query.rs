//! Boolean term queries over the [`TermIndex`].
//!
//! Queries are whitespace-separated words joined by `AND`, `OR` and `NOT`
//! (case-insensitive) with optional parentheses. Operators are applied left
//! to right with no precedence; only parentheses group.
//!
//! - `a AND b` intersects, `a OR b` unions, `a NOT b` subtracts.
//! - `NOT` in operand position complements against the whole catalog, so
//!   `a AND NOT b` is the same set as `a NOT b`.
//! - Unknown words match nothing. An empty query matches nothing.
//! - A trailing operator with no operand is ignored, as is an operator slot
//!   holding a plain word (the pair is skipped).
//!
//! Evaluation never touches the index, so the same index can serve any
//! number of concurrent queries.

use crate::term_index::{IdSet, TermIndex};

// Nesting deeper than this is cut off rather than risking the stack.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Term(String),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// Left minus right.
    Not(Box<Expr>, Box<Expr>),
    /// Everything in the catalog except the operand.
    Complement(Box<Expr>),
}

impl Expr {
    pub fn evaluate(&self, index: &TermIndex) -> IdSet {
        match self {
            Expr::Term(word) => index.lookup(word).clone(),
            Expr::And(l, r) => {
                let left = l.evaluate(index);
                if left.is_empty() {
                    return left;
                }
                let right = r.evaluate(index);
                left.into_iter().filter(|id| right.contains(id)).collect()
            }
            Expr::Or(l, r) => {
                let mut left = l.evaluate(index);
                left.extend(r.evaluate(index));
                left
            }
            Expr::Not(l, r) => {
                let left = l.evaluate(index);
                if left.is_empty() {
                    return left;
                }
                let right = r.evaluate(index);
                left.into_iter().filter(|id| !right.contains(id)).collect()
            }
            Expr::Complement(inner) => {
                let excluded = inner.evaluate(index);
                index
                    .universe()
                    .iter()
                    .filter(|id| !excluded.contains(*id))
                    .cloned()
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Word(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
    Not,
}

impl Op {
    fn parse(word: &str) -> Option<Op> {
        if word.eq_ignore_ascii_case("and") {
            Some(Op::And)
        } else if word.eq_ignore_ascii_case("or") {
            Some(Op::Or)
        } else if word.eq_ignore_ascii_case("not") {
            Some(Op::Not)
        } else {
            None
        }
    }

    fn apply(self, left: Expr, right: Expr) -> Expr {
        let (l, r) = (Box::new(left), Box::new(right));
        match self {
            Op::And => Expr::And(l, r),
            Op::Or => Expr::Or(l, r),
            Op::Not => Expr::Not(l, r),
        }
    }
}

fn lex(query: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    for c in query.chars() {
        match c {
            '(' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Open);
            }
            ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Close);
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// expr := operand (op operand)*
    fn expr(&mut self, depth: usize) -> Option<Expr> {
        let mut left = self.operand(depth)?;

        loop {
            let op = match self.peek() {
                Some(Token::Word(w)) => Op::parse(w),
                // `)` closes this group; `(` cannot stand in operator position
                Some(Token::Close) | Some(Token::Open) | None => break,
            };
            self.pos += 1;

            let Some(right) = self.operand(depth) else {
                break;
            };
            if let Some(op) = op {
                left = op.apply(left, right);
            }
        }
        Some(left)
    }

    /// operand := NOT operand | '(' expr ')' | word
    fn operand(&mut self, depth: usize) -> Option<Expr> {
        if depth > MAX_DEPTH {
            return None;
        }
        match self.peek()? {
            Token::Close => None,
            Token::Open => {
                self.pos += 1;
                let inner = self.expr(depth + 1);
                if self.peek() == Some(&Token::Close) {
                    self.pos += 1;
                }
                inner
            }
            Token::Word(w) if Op::parse(w) == Some(Op::Not) => {
                self.pos += 1;
                let inner = self.operand(depth + 1)?;
                Some(Expr::Complement(Box::new(inner)))
            }
            Token::Word(_) => match self.next() {
                Some(Token::Word(w)) => Some(Expr::Term(w.to_lowercase())),
                _ => None,
            },
        }
    }
}

/// Parse a query into an expression tree. `None` for an empty query.
pub fn parse(query: &str) -> Option<Expr> {
    let mut parser = Parser {
        tokens: lex(query),
        pos: 0,
    };
    parser.expr(0)
}

/// Evaluate a query string against the index.
pub fn evaluate(query: &str, index: &TermIndex) -> IdSet {
    parse(query)
        .map(|expr| expr.evaluate(index))
        .unwrap_or_default()
}
