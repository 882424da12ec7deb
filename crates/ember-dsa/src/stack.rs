use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

/// Raised when a named stack is absent or has nothing left on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackUnderflow {
    pub name: String,
}

impl fmt::Display for StackUnderflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack '{}' is empty", self.name)
    }
}

impl core::error::Error for StackUnderflow {}

/// A registry of independent LIFO stacks keyed by name.
///
/// The script engine keeps one stack per loop variable plus a private
/// evaluation stack, so nested loops over distinct names never see each
/// other's entries. Pushing the same name twice shadows the earlier entry
/// until the matching `pop`.
pub struct NamedStacks<T> {
    stacks: BTreeMap<String, Vec<T>>,
}

impl<T> NamedStacks<T> {
    pub fn new() -> Self {
        Self {
            stacks: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: T) {
        match self.stacks.get_mut(name) {
            Some(stack) => stack.push(value),
            None => {
                let mut stack = Vec::with_capacity(4);
                stack.push(value);
                self.stacks.insert(name.to_string(), stack);
            }
        }
    }

    /// Removes and returns the top entry of `name`.
    pub fn pop(&mut self, name: &str) -> Result<T, StackUnderflow> {
        self.stacks
            .get_mut(name)
            .and_then(Vec::pop)
            .ok_or_else(|| underflow(name))
    }

    /// Returns the top entry of `name` without removing it.
    pub fn peek(&self, name: &str) -> Result<&T, StackUnderflow> {
        self.stacks
            .get(name)
            .and_then(|stack| stack.last())
            .ok_or_else(|| underflow(name))
    }

    /// Mutable access to the top entry; used for in-place loop stepping.
    pub fn peek_mut(&mut self, name: &str) -> Result<&mut T, StackUnderflow> {
        self.stacks
            .get_mut(name)
            .and_then(|stack| stack.last_mut())
            .ok_or_else(|| underflow(name))
    }

    /// An absent stack counts as empty.
    pub fn is_empty(&self, name: &str) -> bool {
        self.depth(name) == 0
    }

    pub fn depth(&self, name: &str) -> usize {
        self.stacks.get(name).map_or(0, Vec::len)
    }

    /// Empties `name`, yielding its entries in pop order (top first).
    pub fn drain(&mut self, name: &str) -> impl Iterator<Item = T> {
        let entries = self
            .stacks
            .get_mut(name)
            .map(core::mem::take)
            .unwrap_or_default();
        entries.into_iter().rev()
    }
}

impl<T> Default for NamedStacks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for NamedStacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, stack) in &self.stacks {
            map.entry(name, &stack.len());
        }
        map.finish()
    }
}

fn underflow(name: &str) -> StackUnderflow {
    StackUnderflow {
        name: name.to_string(),
    }
}
