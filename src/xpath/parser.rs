//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions.

use super::lexer::{Lexer, Token};

/// XPath expression AST node
#[derive(Debug, Clone)]
pub enum Expr {
    /// The document node (`/`)
    Root,
    /// Location step relative to the context node
    Step(Step),
    /// `base/step`
    Path(Box<Expr>, Step),
    /// Predicate applied to a primary expression
    Filter(Box<Expr>, Box<Expr>),
    Function(String, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Number(f64),
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn bare(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    SelfAxis,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            "self" => Axis::SelfAxis,
            "attribute" => Axis::Attribute,
            "namespace" => Axis::Namespace,
            _ => return None,
        })
    }

    /// Reverse axes number their nodes from the context outwards
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `*`
    Any,
    /// Unprefixed name, matched against the local name
    Name(String),
    /// `prefix:local`, matched against the qualified name
    QName(String),
    /// `prefix:*`
    Prefix(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, String> {
        Ok(Parser {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
        })
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(&mut self) -> Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("Empty expression".to_string());
        }
        let expr = self.parse_or_expr()?;
        match self.current() {
            None => Ok(expr),
            Some(t) => Err(format!("Unexpected token {:?}", t)),
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn at(&self, token: &Token) -> bool {
        self.current() == Some(token)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, token: Token) -> Result<(), String> {
        if self.at(&token) {
            self.advance();
            Ok(())
        } else {
            Err(format!("Expected {:?}, found {:?}", token, self.current()))
        }
    }

    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, String>,
        op_for: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, String> {
        let mut left = next(self)?;
        while let Some(op) = self.current().and_then(op_for) {
            self.advance();
            let right = next(self)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, String> {
        self.parse_binary_level(Self::parse_and_expr, |t| {
            matches!(t, Token::Or).then_some(BinaryOp::Or)
        })
    }

    fn parse_and_expr(&mut self) -> Result<Expr, String> {
        self.parse_binary_level(Self::parse_equality_expr, |t| {
            matches!(t, Token::And).then_some(BinaryOp::And)
        })
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, String> {
        self.parse_binary_level(Self::parse_relational_expr, |t| match t {
            Token::Eq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            _ => None,
        })
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, String> {
        self.parse_binary_level(Self::parse_additive_expr, |t| match t {
            Token::Lt => Some(BinaryOp::Lt),
            Token::LtEq => Some(BinaryOp::LtEq),
            Token::Gt => Some(BinaryOp::Gt),
            Token::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        })
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, String> {
        self.parse_binary_level(Self::parse_multiplicative_expr, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, String> {
        self.parse_binary_level(Self::parse_unary_expr, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Div => Some(BinaryOp::Div),
            Token::Mod => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, String> {
        if self.at(&Token::Minus) {
            self.advance();
            Ok(Expr::Negate(Box::new(self.parse_unary_expr()?)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path_expr()?;
        while self.at(&Token::Pipe) {
            self.advance();
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Whether the current token can begin a location step
    fn at_step_start(&self) -> bool {
        match self.current() {
            Some(Token::Name(_)) => !matches!(self.peek(), Some(Token::LeftParen)),
            Some(
                Token::QName(_)
                | Token::Star
                | Token::At
                | Token::Dot
                | Token::DoubleDot
                | Token::Axis(_)
                | Token::NodeType(_),
            ) => true,
            _ => false,
        }
    }

    fn parse_path_expr(&mut self) -> Result<Expr, String> {
        let base = match self.current() {
            Some(Token::Slash) => {
                self.advance();
                if !self.at_step_start() {
                    return Ok(Expr::Root);
                }
                Expr::Path(Box::new(Expr::Root), self.parse_step()?)
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                let dos = Step::bare(Axis::DescendantOrSelf, NodeTest::Node);
                let root = Expr::Path(Box::new(Expr::Root), dos);
                Expr::Path(Box::new(root), self.parse_step()?)
            }
            _ if self.at_step_start() => Expr::Step(self.parse_step()?),
            _ => self.parse_filter_expr()?,
        };
        self.parse_path_tail(base)
    }

    /// Continue a path with `/step` and `//step`
    fn parse_path_tail(&mut self, mut expr: Expr) -> Result<Expr, String> {
        loop {
            match self.current() {
                Some(Token::Slash) => {
                    self.advance();
                    expr = Expr::Path(Box::new(expr), self.parse_step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    let dos = Step::bare(Axis::DescendantOrSelf, NodeTest::Node);
                    expr = Expr::Path(Box::new(Expr::Path(Box::new(expr), dos)), self.parse_step()?);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_filter_expr(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_primary_expr()?;
        while self.at(&Token::LeftBracket) {
            let predicate = self.parse_predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(predicate));
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, String> {
        match self.current().cloned() {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Some(Token::Literal(s)) => {
                self.advance();
                Ok(Expr::Literal(s))
            }
            Some(Token::LeftParen) => {
                self.advance();
                let expr = self.parse_or_expr()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Some(Token::Name(name)) => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let args = self.parse_function_args()?;
                Ok(Expr::Function(name, args))
            }
            other => Err(format!("Unexpected token {:?}", other)),
        }
    }

    fn parse_predicate(&mut self) -> Result<Expr, String> {
        self.expect(Token::LeftBracket)?;
        let expr = self.parse_or_expr()?;
        self.expect(Token::RightBracket)?;
        Ok(expr)
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        let axis = match self.current().cloned() {
            Some(Token::Dot) => {
                self.advance();
                return Ok(Step::bare(Axis::SelfAxis, NodeTest::Node));
            }
            Some(Token::DoubleDot) => {
                self.advance();
                return Ok(Step::bare(Axis::Parent, NodeTest::Node));
            }
            Some(Token::At) => {
                self.advance();
                Axis::Attribute
            }
            Some(Token::Axis(name)) => {
                self.advance();
                Axis::from_name(&name).ok_or_else(|| format!("Unknown axis: {}", name))?
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while self.at(&Token::LeftBracket) {
            predicates.push(self.parse_predicate()?);
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, String> {
        let test = match self.current().cloned() {
            Some(Token::Star) => NodeTest::Any,
            Some(Token::Name(name)) => NodeTest::Name(name),
            Some(Token::QName(qname)) => match qname.strip_suffix(":*") {
                Some(prefix) => NodeTest::Prefix(prefix.to_string()),
                None => NodeTest::QName(qname),
            },
            Some(Token::NodeType(kind)) => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let target = match self.current().cloned() {
                    Some(Token::Literal(s)) if kind == "processing-instruction" => {
                        self.advance();
                        Some(s)
                    }
                    _ => None,
                };
                self.expect(Token::RightParen)?;
                return Ok(match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::ProcessingInstruction(target),
                });
            }
            other => return Err(format!("Expected node test, found {:?}", other)),
        };
        self.advance();
        Ok(test)
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if !self.at(&Token::RightParen) {
            args.push(self.parse_or_expr()?);
            while self.at(&Token::Comma) {
                self.advance();
                args.push(self.parse_or_expr()?);
            }
        }
        self.expect(Token::RightParen)?;
        Ok(args)
    }
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, String> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        let expr = parse("/root/child").unwrap();
        let Expr::Path(base, step) = expr else {
            panic!("expected path");
        };
        assert!(matches!(*base, Expr::Path(..)));
        assert_eq!(step.node_test, NodeTest::Name("child".to_string()));
    }

    #[test]
    fn test_relative_step_with_predicate() {
        let expr = parse("item[normalize-space(name)=\"ge-0/0/0\"]").unwrap();
        let Expr::Step(step) = expr else {
            panic!("expected step");
        };
        assert_eq!(step.axis, Axis::Child);
        assert_eq!(step.predicates.len(), 1);
        assert!(matches!(step.predicates[0], Expr::Binary(_, BinaryOp::Eq, _)));
    }

    #[test]
    fn test_abbreviations() {
        let Expr::Path(base, step) = parse("../name").unwrap() else {
            panic!("expected path");
        };
        assert!(matches!(*base, Expr::Step(Step { axis: Axis::Parent, .. })));
        assert_eq!(step.axis, Axis::Child);

        let Expr::Step(step) = parse("@style").unwrap() else {
            panic!("expected step");
        };
        assert_eq!(step.axis, Axis::Attribute);
    }

    #[test]
    fn test_descendant() {
        assert!(matches!(parse("//item").unwrap(), Expr::Path(..)));
    }

    #[test]
    fn test_function() {
        let expr = parse("count(//item)").unwrap();
        assert!(matches!(expr, Expr::Function(name, args) if name == "count" && args.len() == 1));
    }

    #[test]
    fn test_star_is_context_sensitive() {
        assert!(matches!(parse("2 * 3").unwrap(), Expr::Binary(_, BinaryOp::Mul, _)));
        assert!(matches!(parse("*").unwrap(), Expr::Step(Step { node_test: NodeTest::Any, .. })));
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("item[").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("bogus::x").is_err());
    }
}
