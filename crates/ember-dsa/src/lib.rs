#![no_std]
extern crate alloc;

pub mod stack;

pub use stack::{NamedStacks, StackUnderflow};
