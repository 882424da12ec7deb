//! # ember-script: the template language
//!
//! A [`Document`] is a tree of text, bounded for-loops and postfix echo
//! expressions. [`ScriptEngine`] walks it and writes through a
//! [`ResponseContext`](ember_core::ResponseContext).

pub mod builtins;
pub mod document;
pub mod engine;
pub mod parser;
pub mod value;

pub use builtins::Builtin;
pub use document::{Document, Element, ForLoop, Node, NodeKind, Operand};
pub use engine::{ScriptEngine, EVAL_STACK};
pub use parser::{DocumentParser, TemplateParser};
pub use value::{BinaryOp, Value};

use ember_core::{InternalDispatch, ResponseContext, ScriptError};

/// One-shot execution: the engine and its stacks are dropped afterwards.
pub fn execute(
    document: &Document,
    ctx: &mut ResponseContext<'_>,
    dispatch: Option<&dyn InternalDispatch>,
) -> Result<(), ScriptError> {
    let mut engine = match dispatch {
        Some(dispatch) => ScriptEngine::with_dispatch(dispatch),
        None => ScriptEngine::new(),
    };
    engine.execute(document, ctx)
}
