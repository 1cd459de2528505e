//! Tokenizer and recursive-descent parser for the XPath 1.0 grammar.
//!
//! The parser produces the [`Expr`] AST consumed by the evaluator. It covers
//! location paths over all thirteen axes (including the `//`, `.`, `..` and
//! `@` abbreviations), node tests, predicates, filter expressions, unions,
//! boolean/relational/arithmetic operators, literals and function calls.
//! Variable references are rejected: this engine has no variable bindings.

use compact_str::CompactString;
use core::fmt;

/// XPath axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    Parent,
    Ancestor,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Attribute,
    Namespace,
    SelfAxis,
    DescendantOrSelf,
    AncestorOrSelf,
}

impl Axis {
    fn from_name(name: &str) -> Option<Axis> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            "attribute" => Axis::Attribute,
            "namespace" => Axis::Namespace,
            "self" => Axis::SelfAxis,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            _ => return None,
        })
    }

    /// Reverse axes yield positions in reverse document order.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::Preceding
                | Axis::PrecedingSibling
        )
    }
}

/// Node test applied to the nodes an axis yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `name` or `prefix:name`.
    Name {
        prefix: Option<CompactString>,
        local: CompactString,
    },
    /// `*`
    AnyName,
    /// `prefix:*`
    PrefixedAny(CompactString),
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()` with an optional target literal.
    Pi(Option<CompactString>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn abbreviated(axis: Axis) -> Step {
        Step {
            axis,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Literal(String),
    /// A location path. Absolute paths start at the effective document.
    Path { absolute: bool, steps: Vec<Step> },
    /// A primary expression filtered by predicates and/or continued with
    /// path steps, e.g. `concat(...)[1]/child::a` (rare but grammatical).
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Call {
        name: CompactString,
        args: Vec<Expr>,
    },
    Union(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

/// Syntax error with the byte offset it was detected at.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(f64),
    Literal(String),
    Name(CompactString),
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Dot,
    DotDot,
    Comma,
    Pipe,
    Colon,
    DoubleColon,
    Star,
    Plus,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn err(message: impl Into<String>, offset: usize) -> ParseError {
    ParseError {
        message: message.into(),
        offset,
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn lex(input: &str) -> Result<Vec<(Tok, usize)>, ParseError> {
    let mut toks = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    // Offsets are character offsets; close enough for diagnostics.
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    toks.push((Tok::DoubleSlash, start));
                    i += 2;
                } else {
                    toks.push((Tok::Slash, start));
                    i += 1;
                }
            }
            '[' => {
                toks.push((Tok::LBracket, start));
                i += 1;
            }
            ']' => {
                toks.push((Tok::RBracket, start));
                i += 1;
            }
            '(' => {
                toks.push((Tok::LParen, start));
                i += 1;
            }
            ')' => {
                toks.push((Tok::RParen, start));
                i += 1;
            }
            '@' => {
                toks.push((Tok::At, start));
                i += 1;
            }
            ',' => {
                toks.push((Tok::Comma, start));
                i += 1;
            }
            '|' => {
                toks.push((Tok::Pipe, start));
                i += 1;
            }
            '*' => {
                toks.push((Tok::Star, start));
                i += 1;
            }
            '+' => {
                toks.push((Tok::Plus, start));
                i += 1;
            }
            '-' => {
                toks.push((Tok::Minus, start));
                i += 1;
            }
            '=' => {
                toks.push((Tok::Eq, start));
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push((Tok::Ne, start));
                    i += 2;
                } else {
                    return Err(err("unexpected `!`", start));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push((Tok::Le, start));
                    i += 2;
                } else {
                    toks.push((Tok::Lt, start));
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push((Tok::Ge, start));
                    i += 2;
                } else {
                    toks.push((Tok::Gt, start));
                    i += 1;
                }
            }
            ':' => {
                if chars.get(i + 1) == Some(&':') {
                    toks.push((Tok::DoubleColon, start));
                    i += 2;
                } else {
                    toks.push((Tok::Colon, start));
                    i += 1;
                }
            }
            '$' => {
                return Err(err("variable references are not supported", start));
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => return Err(err("unterminated string literal", start)),
                    }
                }
                toks.push((Tok::Literal(s), start));
            }
            '.' => {
                if chars.get(i + 1).is_some_and(char::is_ascii_digit) {
                    let (n, next) = lex_number(&chars, i);
                    toks.push((Tok::Number(n), start));
                    i = next;
                } else if chars.get(i + 1) == Some(&'.') {
                    toks.push((Tok::DotDot, start));
                    i += 2;
                } else {
                    toks.push((Tok::Dot, start));
                    i += 1;
                }
            }
            c if c.is_ascii_digit() => {
                let (n, next) = lex_number(&chars, i);
                toks.push((Tok::Number(n), start));
                i = next;
            }
            c if is_name_start(c) => {
                let mut name = String::new();
                while i < chars.len() && is_name_char(chars[i]) {
                    name.push(chars[i]);
                    i += 1;
                }
                toks.push((Tok::Name(name.into()), start));
            }
            other => return Err(err(format!("unexpected character `{other}`"), start)),
        }
    }
    Ok(toks)
}

fn lex_number(chars: &[char], mut i: usize) -> (f64, usize) {
    let start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    let text: String = chars[start..i].iter().collect();
    // Digits and at most one dot cannot fail to parse.
    (text.parse::<f64>().unwrap_or(f64::NAN), i)
}

/// Parse an XPath 1.0 expression into its AST.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let toks = lex(input)?;
    let mut p = Parser {
        toks,
        pos: 0,
        end: input.chars().count(),
    };
    let expr = p.parse_or()?;
    if let Some((tok, off)) = p.toks.get(p.pos) {
        return Err(err(format!("unexpected trailing token {tok:?}"), *off));
    }
    Ok(expr)
}

struct Parser {
    toks: Vec<(Tok, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|(t, _)| t)
    }

    fn peek2(&self) -> Option<&Tok> {
        self.toks.get(self.pos + 1).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.toks.get(self.pos).map_or(self.end, |(_, o)| *o)
    }

    fn bump(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).map(|(t, _)| t.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok, what: &str) -> Result<(), ParseError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(err(format!("expected {what}"), self.offset()))
        }
    }

    /// True when the current token is the given operator name in operator
    /// position (`and`, `or`, `div`, `mod`).
    fn eat_op_name(&mut self, name: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Name(n)) if n.as_str() == name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_op_name("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat_op_name("and") {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Eq) => CompOp::Eq,
                Some(Tok::Ne) => CompOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_relational()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Lt) => CompOp::Lt,
                Some(Tok::Le) => CompOp::Le,
                Some(Tok::Gt) => CompOp::Gt,
                Some(Tok::Ge) => CompOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_additive()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => ArithOp::Add,
                Some(Tok::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat(&Tok::Star) {
                ArithOp::Mul
            } else if self.eat_op_name("div") {
                ArithOp::Div
            } else if self.eat_op_name("mod") {
                ArithOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Tok::Minus) {
            let inner = self.parse_unary()?;
            Ok(Expr::Neg(Box::new(inner)))
        } else {
            self.parse_union()
        }
    }

    fn parse_union(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_path()?;
        while self.eat(&Tok::Pipe) {
            let right = self.parse_path()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Names that introduce a kind test rather than a function call.
    fn is_node_type_name(name: &str) -> bool {
        matches!(
            name,
            "node" | "text" | "comment" | "processing-instruction"
        )
    }

    fn starts_location_path(&self) -> bool {
        match self.peek() {
            Some(Tok::Slash | Tok::DoubleSlash | Tok::Dot | Tok::DotDot | Tok::At | Tok::Star) => {
                true
            }
            Some(Tok::Name(n)) => match self.peek2() {
                // `name(` is a function call unless it is a kind test.
                Some(Tok::LParen) => Self::is_node_type_name(n.as_str()),
                _ => true,
            },
            _ => false,
        }
    }

    fn parse_path(&mut self) -> Result<Expr, ParseError> {
        if self.starts_location_path() {
            return self.parse_location_path();
        }

        // FilterExpr: primary predicates* ('/' | '//') relative-path
        let primary = self.parse_primary()?;
        let mut predicates = Vec::new();
        while self.eat(&Tok::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Tok::RBracket, "`]`")?;
        }
        let mut steps = Vec::new();
        if self.eat(&Tok::Slash) {
            self.parse_relative_path(&mut steps)?;
        } else if self.eat(&Tok::DoubleSlash) {
            steps.push(Step::abbreviated(Axis::DescendantOrSelf));
            self.parse_relative_path(&mut steps)?;
        }
        if predicates.is_empty() && steps.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter {
                primary: Box::new(primary),
                predicates,
                steps,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        match self.bump() {
            Some(Tok::Number(n)) => Ok(Expr::Number(n)),
            Some(Tok::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Tok::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Tok::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Tok::Name(name)) => {
                self.expect(&Tok::LParen, "`(` after function name")?;
                let mut args = Vec::new();
                if !self.eat(&Tok::RParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat(&Tok::Comma) {
                            continue;
                        }
                        self.expect(&Tok::RParen, "`)` after function arguments")?;
                        break;
                    }
                }
                Ok(Expr::Call { name, args })
            }
            other => Err(err(
                format!("expected expression, found {other:?}"),
                offset,
            )),
        }
    }

    fn parse_location_path(&mut self) -> Result<Expr, ParseError> {
        let mut steps = Vec::new();
        let absolute;
        if self.eat(&Tok::DoubleSlash) {
            absolute = true;
            steps.push(Step::abbreviated(Axis::DescendantOrSelf));
            self.parse_relative_path(&mut steps)?;
        } else if self.eat(&Tok::Slash) {
            absolute = true;
            // A bare `/` selects the document itself.
            if self.starts_step() {
                self.parse_relative_path(&mut steps)?;
            }
        } else {
            absolute = false;
            self.parse_relative_path(&mut steps)?;
        }
        Ok(Expr::Path { absolute, steps })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Tok::Dot | Tok::DotDot | Tok::At | Tok::Star | Tok::Name(_))
        )
    }

    fn parse_relative_path(&mut self, steps: &mut Vec<Step>) -> Result<(), ParseError> {
        steps.push(self.parse_step()?);
        loop {
            if self.eat(&Tok::Slash) {
                steps.push(self.parse_step()?);
            } else if self.eat(&Tok::DoubleSlash) {
                steps.push(Step::abbreviated(Axis::DescendantOrSelf));
                steps.push(self.parse_step()?);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn parse_step(&mut self) -> Result<Step, ParseError> {
        if self.eat(&Tok::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Tok::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Tok::At) {
            Axis::Attribute
        } else if let (Some(Tok::Name(n)), Some(Tok::DoubleColon)) = (self.peek(), self.peek2()) {
            let offset = self.offset();
            let axis = Axis::from_name(n.as_str())
                .ok_or_else(|| err(format!("unknown axis `{n}`"), offset))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.parse_node_test()?;
        let mut predicates = Vec::new();
        while self.eat(&Tok::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Tok::RBracket, "`]`")?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, ParseError> {
        let offset = self.offset();
        if self.eat(&Tok::Star) {
            return Ok(NodeTest::AnyName);
        }
        let Some(Tok::Name(name)) = self.peek().cloned() else {
            return Err(err("expected node test", offset));
        };
        self.pos += 1;

        if self.peek() == Some(&Tok::LParen) && Self::is_node_type_name(&name) {
            self.pos += 1;
            return match name.as_str() {
                "node" => {
                    self.expect(&Tok::RParen, "`)`")?;
                    Ok(NodeTest::Node)
                }
                "text" => {
                    self.expect(&Tok::RParen, "`)`")?;
                    Ok(NodeTest::Text)
                }
                "comment" => {
                    self.expect(&Tok::RParen, "`)`")?;
                    Ok(NodeTest::Comment)
                }
                _ => {
                    // processing-instruction, optionally with a target literal
                    let target = match self.peek().cloned() {
                        Some(Tok::Literal(s)) => {
                            self.pos += 1;
                            Some(CompactString::from(s))
                        }
                        _ => None,
                    };
                    self.expect(&Tok::RParen, "`)`")?;
                    Ok(NodeTest::Pi(target))
                }
            };
        }

        if self.eat(&Tok::Colon) {
            if self.eat(&Tok::Star) {
                return Ok(NodeTest::PrefixedAny(name));
            }
            let offset = self.offset();
            let Some(Tok::Name(local)) = self.peek().cloned() else {
                return Err(err("expected local name after `:`", offset));
            };
            self.pos += 1;
            return Ok(NodeTest::Name {
                prefix: Some(name),
                local,
            });
        }

        Ok(NodeTest::Name {
            prefix: None,
            local: name,
        })
    }
}
