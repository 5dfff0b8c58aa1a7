//! A single IPPcode19 scope.
//!
//! A `Frame` is a mapping from identifier to variable slot. It knows
//! nothing about which kind of frame it is (global/temporary/local) —
//! that bookkeeping lives in `FrameSet`. Kept as its own type so that
//! `PUSHFRAME`/`POPFRAME` can move a `Frame` by value instead of copying
//! its contents.

use indexmap::IndexMap;

use super::value::Value;

/// A scope: identifier -> value slot.
///
/// Insertion order is preserved (via `IndexMap`) purely so `BREAK`'s
/// diagnostic dump is stable and readable; it has no semantic effect.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    slots: IndexMap<String, Value>,
}

impl Frame {
    /// An empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name`, giving it an `Uninitialized` slot.
    ///
    /// Returns `false` if `name` is already defined in this frame —
    /// callers turn that into error 52 (redefinition).
    pub fn define(
        &mut self,
        name: &str,
    ) -> bool {
        if self.slots.contains_key(name) {
            return false;
        }
        self.slots.insert(name.to_string(), Value::Uninitialized);
        true
    }

    /// Overwrites the slot for `name`.
    ///
    /// Returns `false` if `name` was never defined — callers turn that
    /// into error 54.
    pub fn assign(
        &mut self,
        name: &str,
        value: Value,
    ) -> bool {
        match self.slots.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Reads the current value of `name`, including `Uninitialized`.
    ///
    /// `None` means the variable was never defined — callers turn that
    /// into error 54. A successful read of an `Uninitialized` slot is
    /// returned as `Some(Value::Uninitialized)`; classifying that as
    /// error 56 is the caller's job (only at use sites, not at `TYPE`).
    pub fn read(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.slots.get(name)
    }

    /// Iterates `(name, value)` pairs in definition order, for `BREAK`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }
}
