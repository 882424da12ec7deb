use std::cmp::Ordering;

use ember_core::{InternalDispatch, ResponseContext, ScriptError};
use ember_dsa::NamedStacks;

use crate::builtins::{self, Builtin};
use crate::document::{Document, Element, ForLoop, Node, Operand};
use crate::value::{BinaryOp, Value};

/// Name of the private stack echo expressions are evaluated on.
pub const EVAL_STACK: &str = "temp";

/// Tree-walking interpreter for [`Document`]s.
///
/// Loop variables live on named stacks keyed by the variable name; echo
/// expressions use the separate [`EVAL_STACK`]. Stacks are reset at the
/// start of every [`execute`](Self::execute) and stay inspectable until
/// the next run.
pub struct ScriptEngine<'d> {
    stacks: NamedStacks<Value>,
    dispatch: Option<&'d dyn InternalDispatch>,
}

impl<'d> ScriptEngine<'d> {
    pub fn new() -> Self {
        Self {
            stacks: NamedStacks::new(),
            dispatch: None,
        }
    }

    /// Enables the `include` builtin through `dispatch`.
    pub fn with_dispatch(dispatch: &'d dyn InternalDispatch) -> Self {
        Self {
            stacks: NamedStacks::new(),
            dispatch: Some(dispatch),
        }
    }

    pub fn stacks(&self) -> &NamedStacks<Value> {
        &self.stacks
    }

    /// Runs `document` against `ctx`. Any error aborts the whole run;
    /// output already written stays written.
    pub fn execute(
        &mut self,
        document: &Document,
        ctx: &mut ResponseContext<'_>,
    ) -> Result<(), ScriptError> {
        let result = self.visit(&document.nodes, ctx);
        self.stacks = NamedStacks::new();
        result
    }

    fn visit(&mut self, nodes: &[Node], ctx: &mut ResponseContext<'_>) -> Result<(), ScriptError> {
        for node in nodes {
            match node {
                Node::Text(text) => emit(ctx, text),
                Node::For(for_loop) => self.run_loop(for_loop, ctx)?,
                Node::Echo(elements) => self.echo(elements, ctx)?,
            }
        }
        Ok(())
    }

    fn run_loop(&mut self, l: &ForLoop, ctx: &mut ResponseContext<'_>) -> Result<(), ScriptError> {
        let start = self.operand(&l.start)?;
        let end = self.operand(&l.end)?;
        let step = match &l.step {
            Some(step) => self.operand(step)?,
            None => Value::Int(1),
        };
        if step.numeric_compare(&Value::Int(0))? != Ordering::Greater {
            return Err(ScriptError::Arithmetic(format!(
                "loop over '{}' needs a positive step, got {}",
                l.variable, step
            )));
        }

        self.stacks.push(&l.variable, start);
        while self.stacks.peek(&l.variable)?.numeric_compare(&end)? != Ordering::Greater {
            self.visit(&l.body, ctx)?;
            self.stacks.peek_mut(&l.variable)?.add(&step)?;
        }
        self.stacks.pop(&l.variable)?;
        Ok(())
    }

    fn echo(&mut self, elements: &[Element], ctx: &mut ResponseContext<'_>) -> Result<(), ScriptError> {
        for element in elements {
            match element {
                Element::Literal(text) => self.stacks.push(EVAL_STACK, Value::Str(text.clone())),
                Element::Variable(name) => {
                    let value = self.stacks.peek(name)?.clone();
                    self.stacks.push(EVAL_STACK, value);
                }
                Element::Operator(symbol) => {
                    let op = BinaryOp::from_symbol(symbol).ok_or_else(|| {
                        ScriptError::UnsupportedOperation(format!("operator '{}'", symbol))
                    })?;
                    let rhs = self.stacks.pop(EVAL_STACK)?;
                    let lhs = self.stacks.pop(EVAL_STACK)?;
                    self.stacks.push(EVAL_STACK, lhs.combine(op, &rhs)?);
                }
                Element::Function(name) => {
                    let builtin = Builtin::lookup(name).ok_or_else(|| {
                        ScriptError::UnsupportedOperation(format!("function '{}'", name))
                    })?;
                    builtins::call(builtin, &mut self.stacks, EVAL_STACK, ctx, self.dispatch)?;
                }
            }
        }

        let output: String = self
            .stacks
            .drain(EVAL_STACK)
            .map(|value| value.to_string())
            .collect();
        if !output.is_empty() {
            emit(ctx, &output);
        }
        Ok(())
    }

    fn operand(&self, operand: &Operand) -> Result<Value, ScriptError> {
        match operand {
            Operand::Literal(text) => Ok(Value::Str(text.clone())),
            Operand::Variable(name) => Ok(self.stacks.peek(name)?.clone()),
        }
    }
}

impl Default for ScriptEngine<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort output: dynamic text is not retried.
fn emit(ctx: &mut ResponseContext<'_>, text: &str) {
    if let Err(e) = ctx.write_str(text) {
        tracing::warn!("dropping {} bytes of script output: {}", text.len(), e);
    }
}
