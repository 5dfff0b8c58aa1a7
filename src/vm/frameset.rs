//! Ownership of the global frame, the temporary frame and the local
//! frame stack.
//!
//! `FrameSet` is the only thing in the interpreter that knows how a
//! scoped name (`GF@x`, `TF@x`, `LF@x`) resolves to a concrete `Frame`.
//! `PUSHFRAME`/`POPFRAME` are modeled as moves: the `Frame` itself
//! changes owner, its `IndexMap` is never cloned, so writes made through
//! `LF@` after a `PUSHFRAME` are visible again through `TF@` after the
//! matching `POPFRAME`.

use super::errors::VMError;
use super::frame::Frame;
use super::value::Value;

/// Which of the three scopes a variable name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Temporary,
    Local,
}

impl Scope {
    pub fn parse(prefix: &str) -> Option<Scope> {
        match prefix {
            "GF" => Some(Scope::Global),
            "TF" => Some(Scope::Temporary),
            "LF" => Some(Scope::Local),
            _ => None,
        }
    }
}

/// The three-scope frame system: one permanent global frame, at most one
/// temporary frame, and a stack of local frames.
#[derive(Debug, Default)]
pub struct FrameSet {
    global: Frame,
    temporary: Option<Frame>,
    local_stack: Vec<Frame>,
}

impl FrameSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn frame_mut(
        &mut self,
        scope: Scope,
    ) -> Result<&mut Frame, VMError> {
        match scope {
            Scope::Global => Ok(&mut self.global),
            Scope::Temporary => self.temporary.as_mut().ok_or(VMError::NoFrame),
            Scope::Local => self.local_stack.last_mut().ok_or(VMError::NoFrame),
        }
    }

    fn frame(
        &self,
        scope: Scope,
    ) -> Result<&Frame, VMError> {
        match scope {
            Scope::Global => Ok(&self.global),
            Scope::Temporary => self.temporary.as_ref().ok_or(VMError::NoFrame),
            Scope::Local => self.local_stack.last().ok_or(VMError::NoFrame),
        }
    }

    /// `DEFVAR scope@name`. Error 52 if already defined, error 55 if the
    /// chosen frame doesn't exist.
    pub fn define(
        &mut self,
        scope: Scope,
        name: &str,
    ) -> Result<(), VMError> {
        if !self.frame_mut(scope)?.define(name) {
            return Err(VMError::VariableRedefinition(name.to_string()));
        }
        Ok(())
    }

    /// Overwrites `scope@name`. Error 54 if undefined, error 55 if the
    /// chosen frame doesn't exist.
    pub fn assign(
        &mut self,
        scope: Scope,
        name: &str,
        value: Value,
    ) -> Result<(), VMError> {
        if !self.frame_mut(scope)?.assign(name, value) {
            return Err(VMError::UndefinedVariable(name.to_string()));
        }
        Ok(())
    }

    /// Reads `scope@name`, including `Uninitialized`. Error 54/55 as
    /// above; classifying `Uninitialized` as error 56 is the caller's
    /// job, not this function's.
    pub fn read(
        &self,
        scope: Scope,
        name: &str,
    ) -> Result<&Value, VMError> {
        self.frame(scope)?
            .read(name)
            .ok_or_else(|| VMError::UndefinedVariable(name.to_string()))
    }

    /// `CREATEFRAME`: discards any existing temporary frame and creates
    /// a fresh, empty one.
    pub fn create_temporary(&mut self) {
        self.temporary = Some(Frame::new());
    }

    /// `PUSHFRAME`: moves the temporary frame onto the local stack.
    /// Error 55 if there is no temporary frame.
    pub fn push_temporary(&mut self) -> Result<(), VMError> {
        let frame = self.temporary.take().ok_or(VMError::NoFrame)?;
        self.local_stack.push(frame);
        Ok(())
    }

    /// `POPFRAME`: moves the top local frame into the temporary frame
    /// slot, replacing whatever was there. Error 55 if the local stack
    /// is empty.
    pub fn pop_local(&mut self) -> Result<(), VMError> {
        let frame = self.local_stack.pop().ok_or(VMError::NoFrame)?;
        self.temporary = Some(frame);
        Ok(())
    }

    /// The current local frame, for `BREAK`.
    pub fn local_stack(&self) -> &[Frame] {
        &self.local_stack
    }

    /// The global frame, for `BREAK`.
    pub fn global(&self) -> &Frame {
        &self.global
    }

    /// The temporary frame, for `BREAK`.
    pub fn temporary(&self) -> Option<&Frame> {
        self.temporary.as_ref()
    }
}
