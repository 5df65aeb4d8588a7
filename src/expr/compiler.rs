//! Expression compiler: shunting-yard reduction of infix source to postfix
//! bytecode, plus the static stack-depth proof.
//!
//! The compiler resolves bare identifiers against the named fields visible
//! at the embedding point through a [`FieldResolver`]; `$name` identifiers
//! become externally supplied values and the bare `$` identifier denotes the
//! stream position counter.

use crate::expr::bytecode::{encode_ops, BinaryOp, CompiledExpr, ExprOp, FieldRef, UnaryOp};
use crate::expr::error::{ExprError, ExprErrorKind};
use crate::expr::token::{tokenize, OpToken, Token, TokenKind};

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

/// Resolution result for one normalized field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLookup {
    /// Index into the producer's named-field table.
    pub index: u32,
    /// Whether the field is array-typed or lives inside an array.
    pub array: bool,
}

/// Name-resolution seam between the compiler and the schema producer.
///
/// Paths arrive trimmed and ASCII-lowercased; lookup must be exact.
pub trait FieldResolver {
    /// Resolves a normalized dotted path, or `None` when no field matches.
    fn resolve(&self, path: &str) -> Option<FieldLookup>;
}

/// Simple list-backed resolver for producers and tests.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    entries: Vec<(String, bool)>,
}

impl FieldTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field path; `array` marks array-typed fields.
    pub fn add(&mut self, path: &str, array: bool) -> &mut Self {
        self.entries
            .push((path.trim().to_ascii_lowercase(), array));
        self
    }
}

impl FieldResolver for FieldTable {
    fn resolve(&self, path: &str) -> Option<FieldLookup> {
        self.entries
            .iter()
            .position(|(entry, _)| entry == path)
            .map(|index| FieldLookup {
                index: index as u32,
                array: self.entries[index].1,
            })
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Pending unary operator, held until its operand arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Plus,
    Neg,
    Not,
}

/// Operator stack entry; the bracket sentinel stops priority pops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackEntry {
    Bracket,
    Unary(UnaryOp),
    Binary(BinaryOp),
}

struct Compiler<'a> {
    source: &'a str,
    resolver: &'a dyn FieldResolver,
    ops: Vec<ExprOp>,
    stack: Vec<StackEntry>,
    pending: Option<(Pending, usize)>,
    expect_operand: bool,
    fields: Vec<FieldRef>,
    externals: Vec<String>,
}

/// Compiles expression source into postfix bytecode with a proven maximum
/// stack depth.
pub fn compile(source: &str, resolver: &dyn FieldResolver) -> Result<CompiledExpr, ExprError> {
    let tokens = tokenize(source)?;
    let mut compiler = Compiler {
        source,
        resolver,
        ops: Vec::new(),
        stack: Vec::new(),
        pending: None,
        expect_operand: true,
        fields: Vec::new(),
        externals: Vec::new(),
    };
    for token in &tokens {
        compiler.step(token)?;
    }
    compiler.finish()
}

impl Compiler<'_> {
    fn step(&mut self, token: &Token) -> Result<(), ExprError> {
        match &token.kind {
            TokenKind::Integer(value) => self.on_integer(*value),
            TokenKind::Identifier(text) => self.on_identifier(text, token.offset)?,
            TokenKind::Operator(op) => self.on_operator(*op, token.offset)?,
            TokenKind::LParen => self.on_open_bracket(),
            TokenKind::RParen => self.on_close_bracket(token.offset)?,
        }
        Ok(())
    }

    // -- operands -----------------------------------------------------------

    fn on_integer(&mut self, value: i32) {
        match self.pending.take() {
            // Negation folds into the literal instead of a runtime negate.
            Some((Pending::Neg, _)) => self.ops.push(ExprOp::Const(-value)),
            Some((Pending::Not, _)) => {
                self.ops.push(ExprOp::Const(value));
                self.ops.push(ExprOp::Unary(UnaryOp::Not));
            }
            Some((Pending::Plus, _)) | None => self.ops.push(ExprOp::Const(value)),
        }
        self.expect_operand = false;
    }

    fn on_identifier(&mut self, text: &str, offset: usize) -> Result<(), ExprError> {
        let normalized = text.trim().to_ascii_lowercase();
        let operand = if normalized == "$" {
            ExprOp::External(self.intern_external("$"))
        } else if let Some(name) = normalized.strip_prefix('$') {
            ExprOp::External(self.intern_external(name))
        } else {
            let lookup = self.resolver.resolve(&normalized).ok_or_else(|| {
                ExprError::compile(
                    ExprErrorKind::UnknownField,
                    offset,
                    format!("no visible field matches '{normalized}'"),
                    self.source,
                )
            })?;
            if lookup.array {
                return Err(ExprError::compile(
                    ExprErrorKind::ArrayFieldReference,
                    offset,
                    format!("field '{normalized}' is array-typed and has no scalar value"),
                    self.source,
                ));
            }
            ExprOp::Field(self.intern_field(lookup.index, &normalized))
        };
        self.ops.push(operand);
        match self.pending.take() {
            Some((Pending::Neg, _)) => self.ops.push(ExprOp::Unary(UnaryOp::Neg)),
            Some((Pending::Not, _)) => self.ops.push(ExprOp::Unary(UnaryOp::Not)),
            Some((Pending::Plus, _)) | None => {}
        }
        self.expect_operand = false;
        Ok(())
    }

    fn intern_field(&mut self, index: u32, path: &str) -> u32 {
        if let Some(pos) = self.fields.iter().position(|f| f.index == index) {
            return pos as u32;
        }
        self.fields.push(FieldRef {
            index,
            path: path.to_string(),
        });
        (self.fields.len() - 1) as u32
    }

    fn intern_external(&mut self, name: &str) -> u32 {
        if let Some(pos) = self.externals.iter().position(|n| n == name) {
            return pos as u32;
        }
        self.externals.push(name.to_string());
        (self.externals.len() - 1) as u32
    }

    // -- operators ----------------------------------------------------------

    fn on_operator(&mut self, op: OpToken, offset: usize) -> Result<(), ExprError> {
        let binary = if self.expect_operand {
            None
        } else {
            Self::as_binary(op)
        };
        match binary {
            Some(binary) => {
                while let Some(top) = self.stack.last() {
                    match *top {
                        StackEntry::Bracket => break,
                        StackEntry::Unary(unary) => {
                            self.ops.push(ExprOp::Unary(unary));
                            self.stack.pop();
                        }
                        StackEntry::Binary(stacked) => {
                            if stacked.priority() >= binary.priority() {
                                self.ops.push(ExprOp::Binary(stacked));
                                self.stack.pop();
                            } else {
                                break;
                            }
                        }
                    }
                }
                self.stack.push(StackEntry::Binary(binary));
                self.expect_operand = true;
            }
            None => {
                // Operand position: the operator is unary.
                let unary = Self::as_unary(op).ok_or_else(|| {
                    ExprError::compile(
                        ExprErrorKind::InvalidUnaryOperator,
                        offset,
                        "only + - ~ may be unary",
                        self.source,
                    )
                })?;
                if let Some((prev, _)) = self.pending.take() {
                    self.flush_pending(prev);
                }
                self.pending = Some((unary, offset));
            }
        }
        Ok(())
    }

    fn flush_pending(&mut self, pending: Pending) {
        match pending {
            Pending::Plus => {}
            Pending::Neg => self.stack.push(StackEntry::Unary(UnaryOp::Neg)),
            Pending::Not => self.stack.push(StackEntry::Unary(UnaryOp::Not)),
        }
    }

    fn as_binary(op: OpToken) -> Option<BinaryOp> {
        match op {
            OpToken::Plus => Some(BinaryOp::Add),
            OpToken::Minus => Some(BinaryOp::Sub),
            OpToken::Star => Some(BinaryOp::Mul),
            OpToken::Slash => Some(BinaryOp::Div),
            OpToken::Percent => Some(BinaryOp::Mod),
            OpToken::Amp => Some(BinaryOp::And),
            OpToken::Pipe => Some(BinaryOp::Or),
            OpToken::Caret => Some(BinaryOp::Xor),
            OpToken::Shl => Some(BinaryOp::Shl),
            OpToken::Shr => Some(BinaryOp::Shr),
            OpToken::ShrU => Some(BinaryOp::ShrU),
            OpToken::Tilde => None,
        }
    }

    fn as_unary(op: OpToken) -> Option<Pending> {
        match op {
            OpToken::Plus => Some(Pending::Plus),
            OpToken::Minus => Some(Pending::Neg),
            OpToken::Tilde => Some(Pending::Not),
            _ => None,
        }
    }

    // -- brackets -----------------------------------------------------------

    fn on_open_bracket(&mut self) {
        if let Some((pending, _)) = self.pending.take() {
            self.flush_pending(pending);
        }
        self.stack.push(StackEntry::Bracket);
        self.expect_operand = true;
    }

    fn on_close_bracket(&mut self, offset: usize) -> Result<(), ExprError> {
        if let Some((_, pending_offset)) = self.pending {
            return Err(ExprError::compile(
                ExprErrorKind::DanglingUnary,
                pending_offset,
                "unary operator has no operand",
                self.source,
            ));
        }
        loop {
            match self.stack.pop() {
                Some(StackEntry::Bracket) => break,
                Some(StackEntry::Unary(unary)) => self.ops.push(ExprOp::Unary(unary)),
                Some(StackEntry::Binary(binary)) => self.ops.push(ExprOp::Binary(binary)),
                None => {
                    return Err(ExprError::compile(
                        ExprErrorKind::UnbalancedBracket,
                        offset,
                        "')' has no matching '('",
                        self.source,
                    ));
                }
            }
        }
        self.expect_operand = false;
        Ok(())
    }

    // -- completion ---------------------------------------------------------

    fn finish(mut self) -> Result<CompiledExpr, ExprError> {
        if let Some((_, offset)) = self.pending {
            return Err(ExprError::compile(
                ExprErrorKind::DanglingUnary,
                offset,
                "unary operator has no operand",
                self.source,
            ));
        }
        while let Some(entry) = self.stack.pop() {
            match entry {
                StackEntry::Bracket => {
                    return Err(ExprError::compile(
                        ExprErrorKind::UnbalancedBracket,
                        self.source.len(),
                        "'(' is never closed",
                        self.source,
                    ));
                }
                StackEntry::Unary(unary) => self.ops.push(ExprOp::Unary(unary)),
                StackEntry::Binary(binary) => self.ops.push(ExprOp::Binary(binary)),
            }
        }
        if self.ops.is_empty() {
            return Err(ExprError::empty_expression(self.source));
        }
        let max_depth = prove_stack_depth(&self.ops, self.source)?;
        Ok(CompiledExpr {
            code: encode_ops(&self.ops),
            fields: self.fields,
            externals: self.externals,
            max_depth,
            source: self.source.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Stack-depth proof
// ---------------------------------------------------------------------------

/// Computes the exact maximum operand-stack depth of a postfix program.
///
/// This is a proof, not an estimate: operand underflow at any operator or a
/// final depth other than one fails compilation, and the returned bound
/// sizes the evaluation stack with no further checks.
fn prove_stack_depth(ops: &[ExprOp], source: &str) -> Result<usize, ExprError> {
    let mut depth: usize = 0;
    let mut max_depth: usize = 0;
    for item in ops {
        match item {
            ExprOp::Const(_) | ExprOp::Field(_) | ExprOp::External(_) => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ExprOp::Unary(_) => {
                if depth < 1 {
                    return Err(ExprError::stack_proof(
                        "unary operator has no operand on the stack",
                        source,
                    ));
                }
            }
            ExprOp::Binary(_) => {
                if depth < 2 {
                    return Err(ExprError::stack_proof(
                        "binary operator needs two operands on the stack",
                        source,
                    ));
                }
                depth -= 1;
            }
        }
    }
    if depth != 1 {
        return Err(ExprError::stack_proof(
            format!("expression leaves {depth} values instead of one"),
            source,
        ));
    }
    Ok(max_depth)
}
