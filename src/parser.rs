//! Recursive-descent parser (§4.4).
//!
//! The grammar, loosest to tightest binding:
//!
//! ```text
//! list   := expr (',' expr)*
//! expr   := logic (('&&' | '||' | '^^') logic)*
//! logic  := bitw (('&' | '|' | 'xor') bitw)*
//! bitw   := test (('<' | '<=' | '>' | '>=' | '==' | '!=' | '<>') test)*
//! test   := shift (('<<' | '>>') shift)*
//! shift  := sum (('+' | '-') sum)*
//! sum    := term (('*' | '/' | '%') term)*
//! term   := power
//! power  := unary ('^' power)?          // right-assoc by default
//! unary  := ('+' | '-' | '!' | '~')* base
//! base   := number | call | '(' list ')'
//! ```
//!
//! `unary` folds a run of sign/logical/bitwise-not tokens down to one of the
//! eight canonical [`UnaryOp`] forms (or nests when logical and bitwise
//! operators are mixed in the same run, which the canonical forms don't
//! cover) before ever constructing a node, so the tree never holds a chain
//! of single-child unary wrappers.

use crate::ast::{FunctionNode, InfixOp, Node, OpTag, UnaryOp};
use crate::bindings::{Binding, Bindings, Purity};
use crate::error::{CalcError, Span};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::options::{CompileOptions, ExponentAssociativity, LogBase};
use crate::registry;

struct Parser<'h, 'b> {
    tokens: Vec<Token>,
    pos: usize,
    bindings: &'b Bindings<'h>,
    options: CompileOptions,
    node_count: usize,
}

/// Parse `input` against `bindings` under `options`, returning the root of
/// a compiled tree.
///
/// # Errors
///
/// Returns [`CalcError::EmptyFormula`] for blank input, lex/parse errors for
/// malformed syntax, [`CalcError::UnknownName`] for unresolved identifiers,
/// and [`CalcError::MaxDepthExceeded`] / [`CalcError::MaxNodesExceeded`] if
/// the compiled tree would exceed the configured limits.
pub fn parse<'h, 'b>(
    input: &str,
    bindings: &'b Bindings<'h>,
    options: CompileOptions,
) -> Result<Node<'h>, CalcError> {
    if input.trim().is_empty() {
        return Err(CalcError::EmptyFormula);
    }
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0, bindings, options, node_count: 0 };
    let root = parser.parse_list()?;
    match parser.peek_kind() {
        TokenKind::End => {}
        _ => {
            return Err(CalcError::ParseError {
                msg: "trailing input after a complete expression".to_string(),
                span: parser.peek_span(),
            })
        }
    }
    if root.max_depth() > options.depth_limit() {
        return Err(CalcError::MaxDepthExceeded);
    }
    if root.node_count() > options.node_limit() {
        return Err(CalcError::MaxNodesExceeded);
    }
    Ok(root)
}

impl<'h, 'b> Parser<'h, 'b> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_span(&self) -> Span {
        self.peek().span
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn is_operator(&self, sym: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Operator(s) if *s == sym)
    }

    /// Whether the current token is an identifier spelled exactly `word`,
    /// used for the word-form `xor` operator (bitwise xor can't use `^`
    /// since that's already taken by the power operator).
    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(s) if s == word)
    }

    fn make_infix(&mut self, op: InfixOp, lhs: Node<'h>, rhs: Node<'h>) -> Node<'h> {
        self.node_count += 1;
        Node::Function(FunctionNode { tag: OpTag::Infix(op), args: vec![lhs, rhs], purity: Purity::Pure })
    }

    fn parse_list(&mut self) -> Result<Node<'h>, CalcError> {
        let mut node = self.parse_expr()?;
        while self.is_operator(",") {
            self.advance();
            let rhs = self.parse_expr()?;
            node = self.make_infix(InfixOp::Comma, node, rhs);
        }
        Ok(node)
    }

    fn parse_expr(&mut self) -> Result<Node<'h>, CalcError> {
        let mut node = self.parse_logic()?;
        loop {
            let op = if self.is_operator("&&") {
                InfixOp::And
            } else if self.is_operator("||") {
                InfixOp::Or
            } else if self.is_operator("^^") {
                InfixOp::Xor
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_logic()?;
            node = self.make_infix(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_logic(&mut self) -> Result<Node<'h>, CalcError> {
        let mut node = self.parse_bitw()?;
        loop {
            let op = if self.is_operator("&") {
                InfixOp::BitAnd
            } else if self.is_operator("|") {
                InfixOp::BitOr
            } else if self.is_keyword("xor") {
                InfixOp::BitXor
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_bitw()?;
            node = self.make_infix(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_bitw(&mut self) -> Result<Node<'h>, CalcError> {
        let mut node = self.parse_test()?;
        loop {
            let op = if self.is_operator("<") {
                InfixOp::Lt
            } else if self.is_operator("<=") {
                InfixOp::Le
            } else if self.is_operator(">") {
                InfixOp::Gt
            } else if self.is_operator(">=") {
                InfixOp::Ge
            } else if self.is_operator("==") {
                InfixOp::Eq
            } else if self.is_operator("!=") || self.is_operator("<>") {
                InfixOp::Ne
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_test()?;
            node = self.make_infix(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_test(&mut self) -> Result<Node<'h>, CalcError> {
        let mut node = self.parse_shift()?;
        loop {
            let op = if self.is_operator("<<") {
                InfixOp::Shl
            } else if self.is_operator(">>") {
                InfixOp::Shr
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_shift()?;
            node = self.make_infix(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_shift(&mut self) -> Result<Node<'h>, CalcError> {
        let mut node = self.parse_sum()?;
        loop {
            let op = if self.is_operator("+") {
                InfixOp::Add
            } else if self.is_operator("-") {
                InfixOp::Sub
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_sum()?;
            node = self.make_infix(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_sum(&mut self) -> Result<Node<'h>, CalcError> {
        let mut node = self.parse_term()?;
        loop {
            let op = if self.is_operator("*") {
                InfixOp::Mul
            } else if self.is_operator("/") {
                InfixOp::Div
            } else if self.is_operator("%") {
                InfixOp::Mod
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_term()?;
            node = self.make_infix(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Node<'h>, CalcError> {
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Node<'h>, CalcError> {
        match self.options.exponent_associativity() {
            ExponentAssociativity::Right => self.parse_power_right(),
            ExponentAssociativity::Left => self.parse_power_left(),
        }
    }

    /// Right-associative power: `2^3^2 == 2^(3^2)`, and a leading unary
    /// binds *looser* than `^` (`-a^b == -(a^b)`), since the unary run is
    /// collected before the base and only folded onto the finished chain.
    /// The right-hand operand of each `^` recurses back into this same
    /// method, so it may carry its own leading unary (`2^-3 == 2^(-3)`).
    fn parse_power_right(&mut self) -> Result<Node<'h>, CalcError> {
        let tokens = self.collect_unary_tokens();
        let base = self.parse_base()?;
        let node = if self.is_operator("^") || self.is_operator("**") {
            self.advance();
            let rhs = self.parse_power_right()?;
            self.make_infix(InfixOp::Pow, base, rhs)
        } else {
            base
        };
        Ok(self.wrap_unary(&tokens, node))
    }

    /// Left-associative power: `2^3^2 == (2^3)^2`, and a leading unary
    /// binds *tighter* than `^` (`-a^b == (-a)^b`), folding onto each
    /// operand (via [`Self::parse_unary`]) before the chain is built.
    fn parse_power_left(&mut self) -> Result<Node<'h>, CalcError> {
        let mut node = self.parse_unary()?;
        while self.is_operator("^") || self.is_operator("**") {
            self.advance();
            let rhs = self.parse_unary()?;
            node = self.make_infix(InfixOp::Pow, node, rhs);
        }
        Ok(node)
    }

    fn collect_unary_tokens(&mut self) -> Vec<UnaryTok> {
        let mut tokens = Vec::new();
        loop {
            let tok = if self.is_operator("+") {
                UnaryTok::Plus
            } else if self.is_operator("-") {
                UnaryTok::Minus
            } else if self.is_operator("!") {
                UnaryTok::Bang
            } else if self.is_operator("~") {
                UnaryTok::Tilde
            } else {
                break;
            };
            self.advance();
            tokens.push(tok);
        }
        tokens
    }

    /// Fold a collected unary-token run onto `operand`, innermost-first.
    fn wrap_unary(&mut self, tokens: &[UnaryTok], operand: Node<'h>) -> Node<'h> {
        if tokens.is_empty() {
            return operand;
        }
        // `ops` is outer-to-inner (first entry applies last); build the
        // tree innermost-first by walking it in reverse.
        let ops = fold_unary_ops(tokens);
        let mut node = operand;
        for op in ops.into_iter().rev() {
            self.node_count += 1;
            node = Node::Function(FunctionNode { tag: OpTag::Unary(op), args: vec![node], purity: Purity::Pure });
        }
        node
    }

    fn parse_unary(&mut self) -> Result<Node<'h>, CalcError> {
        let tokens = self.collect_unary_tokens();
        let operand = self.parse_base()?;
        Ok(self.wrap_unary(&tokens, operand))
    }

    fn parse_base(&mut self) -> Result<Node<'h>, CalcError> {
        match self.peek_kind().clone() {
            TokenKind::Number(v) => {
                self.advance();
                self.node_count += 1;
                Ok(Node::Constant(v))
            }
            TokenKind::Open => {
                self.advance();
                let inner = self.parse_list()?;
                if !matches!(self.peek_kind(), TokenKind::Close) {
                    return Err(CalcError::ParseError {
                        msg: "expected closing ')'".to_string(),
                        span: self.peek_span(),
                    });
                }
                self.advance();
                Ok(inner)
            }
            TokenKind::Identifier(name) => self.parse_identifier(&name),
            _ => Err(CalcError::ParseError {
                msg: "expected a number, identifier, or '('".to_string(),
                span: self.peek_span(),
            }),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Node<'h>>, CalcError> {
        self.advance(); // '('
        let mut args = Vec::new();
        if matches!(self.peek_kind(), TokenKind::Close) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if matches!(self.peek_kind(), TokenKind::Sep) {
                self.advance();
                continue;
            }
            break;
        }
        if !matches!(self.peek_kind(), TokenKind::Close) {
            return Err(CalcError::ParseError {
                msg: "expected ',' or ')' in argument list".to_string(),
                span: self.peek_span(),
            });
        }
        self.advance();
        Ok(args)
    }

    fn parse_identifier(&mut self, name: &str) -> Result<Node<'h>, CalcError> {
        let name_span = self.peek_span();
        self.advance();
        let has_parens = matches!(self.peek_kind(), TokenKind::Open);

        if let Some(binding) = self.bindings.get(name) {
            return match binding {
                Binding::Variable(cell) => {
                    if has_parens {
                        return Err(CalcError::ParseError {
                            msg: format!("'{name}' is a variable, not callable"),
                            span: name_span,
                        });
                    }
                    self.node_count += 1;
                    Ok(Node::Variable(cell))
                }
                Binding::Function(f, purity) => {
                    let args = self.parse_args_for_arity(name, f.arity(), has_parens, name_span)?;
                    self.node_count += 1;
                    Ok(Node::Function(FunctionNode { tag: OpTag::Host(*f), args, purity: *purity }))
                }
                Binding::Closure(c, purity) => {
                    let args = self.parse_args_for_arity(name, c.arity(), has_parens, name_span)?;
                    self.node_count += 1;
                    Ok(Node::Function(FunctionNode { tag: OpTag::HostClosure(*c), args, purity: *purity }))
                }
            };
        }

        if let Some(entry) = registry::lookup(name) {
            let resolved_func = resolve_log_alias(name, entry.func, self.options.log_base());
            let args = self.parse_args_for_arity(name, resolved_func.arity(), has_parens, name_span)?;
            self.node_count += 1;
            return Ok(Node::Function(FunctionNode {
                tag: OpTag::Builtin(resolved_func),
                args,
                purity: entry.purity,
            }));
        }

        Err(CalcError::UnknownName { name: name.to_string(), span: name_span })
    }

    fn parse_args_for_arity(
        &mut self,
        name: &str,
        arity: usize,
        has_parens: bool,
        name_span: Span,
    ) -> Result<Vec<Node<'h>>, CalcError> {
        if arity == 0 {
            if has_parens {
                let args = self.parse_call_args()?;
                if !args.is_empty() {
                    return Err(CalcError::ParseError {
                        msg: format!("'{name}' takes no arguments"),
                        span: name_span,
                    });
                }
            }
            return Ok(Vec::new());
        }
        if !has_parens {
            return Err(CalcError::ParseError {
                msg: format!("'{name}' requires {arity} argument(s)"),
                span: name_span,
            });
        }
        let args = self.parse_call_args()?;
        if args.len() != arity {
            return Err(CalcError::ParseError {
                msg: format!("'{name}' expects {arity} argument(s), got {}", args.len()),
                span: name_span,
            });
        }
        Ok(args)
    }
}

/// Resolve the `log` builtin's base according to [`CompileOptions`]. All
/// other builtins pass through unchanged.
fn resolve_log_alias(name: &str, func: registry::BuiltinFn, base: LogBase) -> registry::BuiltinFn {
    if name == "log" && base == LogBase::Natural {
        registry::BuiltinFn::Fn1(f64::ln)
    } else {
        func
    }
}

/// A single raw unary-prefix token, in the order it was consumed (leftmost
/// token is outermost, i.e. applied last).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryTok {
    Plus,
    Minus,
    Bang,
    Tilde,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryCategory {
    Sign,
    Logical,
    Bitwise,
}

fn category(tok: UnaryTok) -> UnaryCategory {
    match tok {
        UnaryTok::Plus | UnaryTok::Minus => UnaryCategory::Sign,
        UnaryTok::Bang => UnaryCategory::Logical,
        UnaryTok::Tilde => UnaryCategory::Bitwise,
    }
}

/// Partition a token run into maximal consecutive same-category groups,
/// preserving order. `"!~-x"` (three different categories) becomes three
/// singleton groups; `"--!!x"` becomes a sign group of 2 followed by a
/// logical group of 2.
fn group_tokens(tokens: &[UnaryTok]) -> Vec<(UnaryCategory, Vec<UnaryTok>)> {
    let mut groups: Vec<(UnaryCategory, Vec<UnaryTok>)> = Vec::new();
    for &tok in tokens {
        let cat = category(tok);
        if let Some(last) = groups.last_mut() {
            if last.0 == cat {
                last.1.push(tok);
                continue;
            }
        }
        groups.push((cat, vec![tok]));
    }
    groups
}

/// Reduce one same-category group to a canonical op. A sign group with an
/// even number of `-` contributes nothing (`None`): a run of only `+`, or
/// an even number of `-`, has no observable effect on its own.
fn reduce_group(cat: UnaryCategory, toks: &[UnaryTok]) -> Option<UnaryOp> {
    match cat {
        UnaryCategory::Sign => {
            let minus_count = toks.iter().filter(|t| **t == UnaryTok::Minus).count();
            (minus_count % 2 == 1).then_some(UnaryOp::Negate)
        }
        UnaryCategory::Logical => {
            Some(if toks.len() % 2 == 1 { UnaryOp::LogicalNot } else { UnaryOp::LogicalNotNot })
        }
        UnaryCategory::Bitwise => {
            Some(if toks.len() % 2 == 1 { UnaryOp::BitwiseNot } else { UnaryOp::BitwiseNotNot })
        }
    }
}

/// Reduce a run of sign/logical/bitwise-not tokens to a sequence of
/// [`UnaryOp`]s, outer-to-inner (the first entry is applied last, to the
/// result of everything after it).
///
/// Each maximal same-category group collapses to one of the eight
/// canonical forms on its own. A sign group immediately followed by a
/// logical group additionally fuses into the combined
/// `NegateLogicalNot`/`NegateLogicalNotNot` forms, since that's exactly
/// what those two canonical forms mean (`-!x` is `Negate(LogicalNot(x))`).
/// No other adjacency fuses — a sign run next to a bitwise run, or a
/// logical run next to a bitwise run, nests as separate operators in
/// their actual left-to-right order instead, since the eight canonical
/// forms don't cover those combinations.
fn fold_unary_ops(tokens: &[UnaryTok]) -> Vec<UnaryOp> {
    let groups = group_tokens(tokens);
    let reduced: Vec<(UnaryCategory, Option<UnaryOp>)> =
        groups.iter().map(|(cat, toks)| (*cat, reduce_group(*cat, toks))).collect();

    let mut ops = Vec::new();
    let mut i = 0;
    while i < reduced.len() {
        let (cat, op) = reduced[i];
        if cat == UnaryCategory::Sign
            && op == Some(UnaryOp::Negate)
            && i + 1 < reduced.len()
            && reduced[i + 1].0 == UnaryCategory::Logical
        {
            let combined = match reduced[i + 1].1 {
                Some(UnaryOp::LogicalNot) => UnaryOp::NegateLogicalNot,
                Some(UnaryOp::LogicalNotNot) => UnaryOp::NegateLogicalNotNot,
                _ => unreachable!("logical group always reduces to LogicalNot or LogicalNotNot"),
            };
            ops.push(combined);
            i += 2;
            continue;
        }
        if let Some(op) = op {
            ops.push(op);
        }
        i += 1;
    }

    if ops.is_empty() {
        ops.push(UnaryOp::Identity);
    }

    ops
}
