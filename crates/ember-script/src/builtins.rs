//! Functions callable from echo expressions.
//!
//! Each builtin pops a fixed number of operands from the evaluation stack
//! (first pushed = first argument) and pushes its results, if any.

use ember_core::{InternalDispatch, ResponseContext, ScriptError};
use ember_dsa::NamedStacks;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// ( x -- sin(x) )
    Sin,
    /// ( x -- "x.xx" )
    Format,
    /// ( a -- a a )
    Dup,
    /// ( a b -- b a )
    Swap,
    /// ( type -- )
    Mime,
    /// ( name default -- value )
    Param,
    /// ( name default -- value )
    Temp,
    /// ( name value -- )
    TempSet,
    /// ( name -- )
    TempDel,
    /// ( name default -- value )
    Session,
    /// ( name value -- )
    SessionSet,
    /// ( name -- )
    SessionDel,
    /// ( path -- )
    Include,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        let builtin = match name {
            "sin" => Builtin::Sin,
            "format" => Builtin::Format,
            "dup" => Builtin::Dup,
            "swap" => Builtin::Swap,
            "mime" => Builtin::Mime,
            "param" => Builtin::Param,
            "temp" => Builtin::Temp,
            "temp.set" => Builtin::TempSet,
            "temp.del" => Builtin::TempDel,
            "session" => Builtin::Session,
            "session.set" => Builtin::SessionSet,
            "session.del" => Builtin::SessionDel,
            "include" => Builtin::Include,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::Sin
            | Builtin::Format
            | Builtin::Dup
            | Builtin::Mime
            | Builtin::TempDel
            | Builtin::SessionDel
            | Builtin::Include => 1,
            Builtin::Swap
            | Builtin::Param
            | Builtin::Temp
            | Builtin::TempSet
            | Builtin::Session
            | Builtin::SessionSet => 2,
        }
    }
}

/// Pops `builtin.arity()` operands from `stack`, runs it and pushes results.
pub(crate) fn call(
    builtin: Builtin,
    stacks: &mut NamedStacks<Value>,
    stack: &str,
    ctx: &mut ResponseContext<'_>,
    dispatch: Option<&dyn InternalDispatch>,
) -> Result<(), ScriptError> {
    let mut args = Vec::with_capacity(builtin.arity());
    for _ in 0..builtin.arity() {
        args.push(stacks.pop(stack)?);
    }
    args.reverse();
    let mut args = args.into_iter();
    let mut next = || args.next().ok_or_else(|| ScriptError::EmptyStack(stack.to_string()));

    match builtin {
        Builtin::Sin => {
            let x = next()?.as_f64()?;
            stacks.push(stack, Value::Float(x.sin()));
        }
        Builtin::Format => {
            let x = next()?.as_f64()?;
            stacks.push(stack, Value::Str(format!("{:.2}", x)));
        }
        Builtin::Dup => {
            let a = next()?;
            stacks.push(stack, a.clone());
            stacks.push(stack, a);
        }
        Builtin::Swap => {
            let a = next()?;
            let b = next()?;
            stacks.push(stack, b);
            stacks.push(stack, a);
        }
        Builtin::Mime => {
            let mime = next()?.to_string();
            ctx.set_mime_type(mime)?;
        }
        Builtin::Param => {
            let name = next()?.to_string();
            let default = next()?;
            let value = ctx.parameter(&name).map(Value::from).unwrap_or(default);
            stacks.push(stack, value);
        }
        Builtin::Temp => {
            let name = next()?.to_string();
            let default = next()?;
            let value = ctx.temporary_parameter(&name).map(Value::from).unwrap_or(default);
            stacks.push(stack, value);
        }
        Builtin::TempSet => {
            let name = next()?.to_string();
            let value = next()?.to_string();
            ctx.set_temporary_parameter(name, value);
        }
        Builtin::TempDel => {
            let name = next()?.to_string();
            ctx.remove_temporary_parameter(&name);
        }
        Builtin::Session => {
            let name = next()?.to_string();
            let default = next()?;
            let value = ctx.persistent_parameter(&name).map(Value::from).unwrap_or(default);
            stacks.push(stack, value);
        }
        Builtin::SessionSet => {
            let name = next()?.to_string();
            let value = next()?.to_string();
            ctx.set_persistent_parameter(name, value);
        }
        Builtin::SessionDel => {
            let name = next()?.to_string();
            ctx.remove_persistent_parameter(&name);
        }
        Builtin::Include => {
            let path = next()?.to_string();
            let dispatch = dispatch.ok_or_else(|| {
                ScriptError::UnsupportedOperation("include needs an internal dispatcher".into())
            })?;
            dispatch.include(&path, ctx)?;
        }
    }
    Ok(())
}
