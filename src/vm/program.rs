//! The static program representation: opcodes, instructions and labels.
//!
//! Everything here is built once by `vm::loader` and never mutated by
//! the executor — operand literals are decoded and syntax-checked up
//! front so the dispatch loop never has to re-parse a string.

use std::collections::BTreeMap;
use std::collections::HashMap;

use smallvec::SmallVec;

use super::frameset::Scope;
use super::value::Value;

/// The fixed IPPcode19 opcode set (spec §4.5). No extension point exists
/// by design — adding an opcode means touching this enum, the signature
/// table below, and `vm::executor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    CreateFrame,
    PushFrame,
    PopFrame,
    Return,
    Break,
    DefVar,
    Label,
    Jump,
    Call,
    Pushs,
    Pops,
    Write,
    Exit,
    DPrint,
    Move,
    Int2Char,
    Read,
    StrLen,
    Type,
    Add,
    Sub,
    Mul,
    IDiv,
    Lt,
    Gt,
    Eq,
    And,
    Or,
    Not,
    Stri2Int,
    Concat,
    GetChar,
    SetChar,
    JumpIfEq,
    JumpIfNeq,
}

impl Opcode {
    /// Case-insensitive lookup by mnemonic, as it appears in the `opcode`
    /// XML attribute.
    pub fn parse(name: &str) -> Option<Opcode> {
        use Opcode::*;
        Some(match name.to_ascii_uppercase().as_str() {
            "CREATEFRAME" => CreateFrame,
            "PUSHFRAME" => PushFrame,
            "POPFRAME" => PopFrame,
            "RETURN" => Return,
            "BREAK" => Break,
            "DEFVAR" => DefVar,
            "LABEL" => Label,
            "JUMP" => Jump,
            "CALL" => Call,
            "PUSHS" => Pushs,
            "POPS" => Pops,
            "WRITE" => Write,
            "EXIT" => Exit,
            "DPRINT" => DPrint,
            "MOVE" => Move,
            "INT2CHAR" => Int2Char,
            "READ" => Read,
            "STRLEN" => StrLen,
            "TYPE" => Type,
            "ADD" => Add,
            "SUB" => Sub,
            "MUL" => Mul,
            "IDIV" => IDiv,
            "LT" => Lt,
            "GT" => Gt,
            "EQ" => Eq,
            "AND" => And,
            "OR" => Or,
            "NOT" => Not,
            "STRI2INT" => Stri2Int,
            "CONCAT" => Concat,
            "GETCHAR" => GetChar,
            "SETCHAR" => SetChar,
            "JUMPIFEQ" => JumpIfEq,
            "JUMPIFNEQ" => JumpIfNeq,
            _ => return None,
        })
    }

    /// The expected operand signature, in order.
    pub fn signature(self) -> &'static [ArgKind] {
        use ArgKind::*;
        use Opcode::*;
        match self {
            CreateFrame | PushFrame | PopFrame | Return | Break => &[],
            DefVar => &[Var],
            Label | Jump | Call => &[ArgKind::Label],
            Pushs | Write | Exit | DPrint => &[Symb],
            Pops => &[Var],
            Move | Int2Char | StrLen | Type | Not => &[Var, Symb],
            Read => &[Var, ArgKind::Type],
            Add | Sub | Mul | IDiv | Lt | Gt | Eq | And | Or | Stri2Int | Concat | GetChar
            | SetChar => &[Var, Symb, Symb],
            JumpIfEq | JumpIfNeq => &[ArgKind::Label, Symb, Symb],
        }
    }
}

/// The kind a signature slot expects. `Symb` accepts any of `Var`,
/// `int`, `bool`, `string` or `nil` at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Var,
    Label,
    Type,
    Symb,
}

/// A fully resolved, syntax-checked operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A variable reference, already split into scope + identifier.
    Var(Scope, String),
    /// A label name (for `LABEL`/`JUMP`/`CALL`/`JUMPIFEQ`/`JUMPIFNEQ`).
    Label(String),
    /// A type name, for `READ`'s second argument (`int`/`bool`/`string`).
    Type(String),
    /// A decoded literal constant.
    Literal(Value),
}

/// One instruction: its position in program order, opcode and operands.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub order: i64,
    pub opcode: Opcode,
    pub operands: SmallVec<[Operand; 3]>,
}

/// The whole program: instructions keyed by `order`, plus the label
/// table built while loading.
#[derive(Debug, Default)]
pub struct Program {
    instructions: BTreeMap<i64, Instruction>,
    labels: HashMap<String, i64>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        instr: Instruction,
    ) -> Option<Instruction> {
        self.instructions.insert(instr.order, instr)
    }

    pub fn define_label(
        &mut self,
        name: String,
        order: i64,
    ) -> Result<(), ()> {
        if self.labels.contains_key(&name) {
            return Err(());
        }
        self.labels.insert(name, order);
        Ok(())
    }

    pub fn label(
        &self,
        name: &str,
    ) -> Option<i64> {
        self.labels.get(name).copied()
    }

    pub fn get(
        &self,
        order: i64,
    ) -> Option<&Instruction> {
        self.instructions.get(&order)
    }

    /// The smallest order in the program, the executor's start point.
    pub fn first_order(&self) -> Option<i64> {
        self.instructions.keys().next().copied()
    }

    /// The smallest order strictly greater than `order`, i.e. the
    /// naturally-sequenced successor of the instruction at `order`.
    pub fn next_order(
        &self,
        order: i64,
    ) -> Option<i64> {
        self.instructions
            .range((std::ops::Bound::Excluded(order), std::ops::Bound::Unbounded))
            .next()
            .map(|(&k, _)| k)
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_parse_is_case_insensitive() {
        assert_eq!(Opcode::parse("move"), Some(Opcode::Move));
        assert_eq!(Opcode::parse("MOVE"), Some(Opcode::Move));
        assert_eq!(Opcode::parse("MoVe"), Some(Opcode::Move));
        assert_eq!(Opcode::parse("nonsense"), None);
    }

    #[test]
    fn next_order_skips_gaps() {
        let mut p = Program::new();
        p.insert(Instruction {
            order: 1,
            opcode: Opcode::Break,
            operands: SmallVec::new(),
        });
        p.insert(Instruction {
            order: 10,
            opcode: Opcode::Break,
            operands: SmallVec::new(),
        });
        assert_eq!(p.first_order(), Some(1));
        assert_eq!(p.next_order(1), Some(10));
        assert_eq!(p.next_order(10), None);
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut p = Program::new();
        assert!(p.define_label("l".to_string(), 1).is_ok());
        assert!(p.define_label("l".to_string(), 2).is_err());
    }
}
