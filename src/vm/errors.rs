//! Error taxonomy for the interpreter.
//!
//! IPPcode19 defines its error classes by process exit code rather than
//! by error "kind" in the usual sense, so both error enums carry an
//! `exit_code` mapping straight onto that taxonomy (spec §6). Load-time
//! failures (`LoadError`) and runtime failures (`VMError`) are kept
//! separate because they occur in different phases — no interpreted
//! side effect has happened yet when a `LoadError` is raised.

use thiserror::Error;

/// Errors raised while turning an XML document into a `Program`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    CannotOpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML: {0}")]
    MalformedXml(String),

    #[error("missing or incorrect language attribute")]
    BadLanguageAttribute,

    #[error("unrecognized attribute `{0}` on the program element")]
    UnknownProgramAttribute(String),

    #[error("the program element must contain only <instruction> children")]
    UnexpectedElement(String),

    #[error("instruction is missing its order attribute")]
    MissingOrder,

    #[error("order attribute `{0}` is not a positive integer")]
    InvalidOrder(String),

    #[error("duplicate instruction order {0}")]
    DuplicateOrder(i64),

    #[error("instruction {order} is missing its opcode attribute")]
    MissingOpcode { order: i64 },

    #[error("instruction {order} has unknown opcode `{opcode}`")]
    UnknownOpcode { order: i64, opcode: String },

    #[error("instruction {order} has argument gaps or duplicates")]
    BadArgumentLayout { order: i64 },

    #[error("instruction {order} argument {index} is missing its type attribute")]
    MissingArgType { order: i64, index: usize },

    #[error("instruction {order} argument {index} has the wrong kind for {opcode}")]
    WrongArgKind {
        order: i64,
        index: usize,
        opcode: String,
    },

    #[error("instruction {order} argument {index}: `{text}` is not a valid {kind} literal")]
    BadLiteralSyntax {
        order: i64,
        index: usize,
        kind: &'static str,
        text: String,
    },

    #[error("instruction {order} argument {index}: `{text}` is not a valid variable name")]
    BadVariableSyntax {
        order: i64,
        index: usize,
        text: String,
    },

    #[error("instruction {order} argument {index}: `{text}` is not a valid label name")]
    BadLabelSyntax {
        order: i64,
        index: usize,
        text: String,
    },

    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
}

impl LoadError {
    /// The process exit code this failure maps to (spec §6).
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::CannotOpenFile { .. } => 11,
            LoadError::MalformedXml(_) => 31,
            LoadError::DuplicateLabel(_) => 52,
            _ => 32,
        }
    }
}

/// Errors raised while executing an already-loaded `Program`.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum VMError {
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),

    #[error("variable `{0}` is already defined in this frame")]
    VariableRedefinition(String),

    #[error("operand type mismatch")]
    TypeMismatch,

    #[error("variable `{0}` does not exist in the given frame")]
    UndefinedVariable(String),

    #[error("no such frame (temporary frame absent or local stack empty)")]
    NoFrame,

    #[error("read of an uninitialized variable")]
    UninitializedVariable,

    #[error("RETURN with an empty call stack")]
    EmptyCallStack,

    #[error("division by zero")]
    DivisionByZero,

    #[error("exit code {0} is out of range [0, 49]")]
    ExitCodeOutOfRange(i64),

    #[error("string operation index out of range")]
    StringIndexOutOfRange,

    #[error("{0} is not a valid Unicode code point")]
    NotAUnicodeScalar(i64),

    #[error("data stack is empty")]
    DataStackUnderflow,
}

impl VMError {
    /// The process exit code this failure maps to (spec §6).
    pub fn exit_code(&self) -> i32 {
        match self {
            VMError::UndefinedLabel(_) | VMError::VariableRedefinition(_) => 52,
            VMError::TypeMismatch => 53,
            VMError::UndefinedVariable(_) => 54,
            VMError::NoFrame => 55,
            VMError::UninitializedVariable
            | VMError::EmptyCallStack
            | VMError::DataStackUnderflow => 56,
            VMError::DivisionByZero | VMError::ExitCodeOutOfRange(_) => 57,
            VMError::StringIndexOutOfRange | VMError::NotAUnicodeScalar(_) => 58,
        }
    }
}
