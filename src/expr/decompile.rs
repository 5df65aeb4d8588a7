//! Decompilation: replaying compiled postfix bytecode through a visitor,
//! and the infix renderer that reconstructs a bracketed source form.

use crate::expr::bytecode::{
    CompiledExpr, ExprOp, FieldRef, OpReader, Operator, LEAF_PRIORITY, UNARY_PRIORITY,
};
use crate::expr::error::ExprError;

/// Field-reference event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ref<'a> {
    /// Reference to a named field of the schema.
    Field(&'a FieldRef),
    /// Reference to an externally supplied named value.
    External(&'a str),
}

/// Visitor over one compiled expression, driven in exact postfix order.
///
/// `begin` and `end` bracket the replay; between them each operand or
/// operator produces one callback. The stream position counter is reported
/// through `special_value`, never as an external reference.
pub trait ExprVisitor {
    /// Replay starts.
    fn begin(&mut self);
    /// The stream position counter operand.
    fn special_value(&mut self);
    /// A named-field or external-value operand.
    fn field_ref(&mut self, reference: Ref<'_>);
    /// A unary or binary operator.
    fn operator(&mut self, operator: Operator);
    /// An immediate constant operand.
    fn constant(&mut self, value: i32);
    /// Replay is complete.
    fn end(&mut self);
}

/// Replays compiled bytecode through a visitor.
///
/// A malformed stream here is a compiler bug, reported as
/// [`crate::expr::error::ExprErrorKind::MalformedBytecode`].
pub fn decompile(expr: &CompiledExpr, visitor: &mut dyn ExprVisitor) -> Result<(), ExprError> {
    visitor.begin();
    for item in OpReader::new(expr) {
        match item? {
            ExprOp::Const(value) => visitor.constant(value),
            ExprOp::Field(index) => {
                visitor.field_ref(Ref::Field(&expr.fields[index as usize]));
            }
            ExprOp::External(index) => {
                let name = &expr.externals[index as usize];
                if name == "$" {
                    visitor.special_value();
                } else {
                    visitor.field_ref(Ref::External(name));
                }
            }
            ExprOp::Unary(unary) => visitor.operator(Operator::Unary(unary)),
            ExprOp::Binary(binary) => visitor.operator(Operator::Binary(binary)),
        }
    }
    visitor.end();
    Ok(())
}

// ---------------------------------------------------------------------------
// Infix renderer
// ---------------------------------------------------------------------------

/// One partially rendered subtree.
struct Node {
    text: String,
    priority: u8,
}

/// Rebuilds a bracketed infix string from the postfix replay.
///
/// A child is bracketed whenever its priority is lower than or equal to its
/// parent's. Same-priority chains therefore re-bracket defensively; in
/// particular the three shift operators, which are mutually non-associative
/// in the source grammar, never render flat against each other. Output is
/// not character-minimal but always recompiles to the same value.
#[derive(Default)]
pub struct InfixRenderer {
    nodes: Vec<Node>,
    underflow: bool,
}

impl InfixRenderer {
    /// Creates an empty renderer.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_leaf(&mut self, text: String) {
        self.nodes.push(Node {
            text,
            priority: LEAF_PRIORITY,
        });
    }

    fn pop_node(&mut self) -> Node {
        match self.nodes.pop() {
            Some(node) => node,
            None => {
                self.underflow = true;
                Node {
                    text: String::new(),
                    priority: LEAF_PRIORITY,
                }
            }
        }
    }

    fn child_text(node: &Node, parent_priority: u8) -> String {
        if node.priority <= parent_priority {
            format!("({})", node.text)
        } else {
            node.text.clone()
        }
    }

    /// Consumes the renderer, returning the finished expression string.
    pub fn finish(mut self) -> Result<String, ExprError> {
        if self.underflow {
            return Err(ExprError::malformed_bytecode(
                "operator found with too few rendered operands",
            ));
        }
        if self.nodes.len() != 1 {
            return Err(ExprError::malformed_bytecode(format!(
                "{} rendered fragments instead of one",
                self.nodes.len()
            )));
        }
        Ok(self.nodes.pop().expect("length checked above").text)
    }
}

impl ExprVisitor for InfixRenderer {
    fn begin(&mut self) {}

    fn special_value(&mut self) {
        self.push_leaf("$".to_string());
    }

    fn field_ref(&mut self, reference: Ref<'_>) {
        match reference {
            Ref::Field(field) => self.push_leaf(field.path.clone()),
            Ref::External(name) => self.push_leaf(format!("${name}")),
        }
    }

    fn operator(&mut self, operator: Operator) {
        match operator {
            Operator::Unary(unary) => {
                let child = self.pop_node();
                let text = format!(
                    "{}{}",
                    unary.symbol(),
                    Self::child_text(&child, UNARY_PRIORITY)
                );
                self.nodes.push(Node {
                    text,
                    priority: UNARY_PRIORITY,
                });
            }
            Operator::Binary(binary) => {
                let rhs = self.pop_node();
                let lhs = self.pop_node();
                let priority = binary.priority();
                let text = format!(
                    "{}{}{}",
                    Self::child_text(&lhs, priority),
                    binary.symbol(),
                    Self::child_text(&rhs, priority)
                );
                self.nodes.push(Node { text, priority });
            }
        }
    }

    fn constant(&mut self, value: i32) {
        self.push_leaf(value.to_string());
    }

    fn end(&mut self) {}
}

/// Renders a compiled expression back to bracketed infix source.
pub fn render_infix(expr: &CompiledExpr) -> Result<String, ExprError> {
    let mut renderer = InfixRenderer::new();
    decompile(expr, &mut renderer)?;
    renderer.finish()
}
