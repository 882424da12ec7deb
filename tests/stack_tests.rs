//! # Named Stack Tests
//!
//! Validates per-name isolation, shadowing, underflow reporting and
//! drain order of `NamedStacks`.

use ember_dsa::{NamedStacks, StackUnderflow};
use std::time::Instant;

#[test]
fn test_stacks_are_independent() {
    let t = Instant::now();

    let mut stacks = NamedStacks::new();
    stacks.push("i", 1);
    stacks.push("j", 10);
    stacks.push("i", 2);

    assert_eq!(stacks.depth("i"), 2);
    assert_eq!(stacks.depth("j"), 1);
    assert_eq!(stacks.pop("i"), Ok(2));
    assert_eq!(*stacks.peek("i").unwrap(), 1);
    assert_eq!(stacks.pop("j"), Ok(10));
    assert!(stacks.is_empty("j"));

    let overhead = t.elapsed();
    println!("test_stacks_are_independent: Testing Overhead = {:?}", overhead);
}

#[test]
fn test_underflow_names_the_stack() {
    let mut stacks: NamedStacks<i32> = NamedStacks::new();
    let err = stacks.pop("missing").unwrap_err();
    assert_eq!(
        err,
        StackUnderflow {
            name: "missing".to_string()
        }
    );
    assert_eq!(err.to_string(), "stack 'missing' is empty");

    stacks.push("once", 1);
    stacks.pop("once").unwrap();
    assert!(stacks.peek("once").is_err());
    assert!(stacks.peek_mut("once").is_err());
}

#[test]
fn test_peek_mut_updates_top() {
    let mut stacks = NamedStacks::new();
    stacks.push("x", 5);
    *stacks.peek_mut("x").unwrap() += 1;
    assert_eq!(stacks.pop("x"), Ok(6));
}

/// Drain yields the same order repeated pops would.
#[test]
fn test_drain_in_pop_order() {
    let t = Instant::now();

    let mut stacks = NamedStacks::new();
    for v in ["a", "b", "c"] {
        stacks.push("temp", v);
    }
    let drained: Vec<_> = stacks.drain("temp").collect();
    assert_eq!(drained, vec!["c", "b", "a"]);
    assert!(stacks.is_empty("temp"));
    assert_eq!(stacks.drain("never-used").count(), 0);

    let overhead = t.elapsed();
    println!("test_drain_in_pop_order: Testing Overhead = {:?}", overhead);
}
