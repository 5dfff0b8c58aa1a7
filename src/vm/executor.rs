//! The dispatch loop and per-opcode semantics.
//!
//! `Executor` owns everything that changes while a program runs: the
//! frame set, the call stack, the `PUSHS`/`POPS` data stack, the input
//! source and the stdout sink. `vm::program`/`vm::loader` never mutate
//! after load, so none of that state leaks back into them.

use std::io::{BufRead, Write};

use super::data_stack::DataStack;
use super::errors::VMError;
use super::frameset::{FrameSet, Scope};
use super::program::{Instruction, Opcode, Operand, Program};
use super::value::{self, Value};

/// Runs `program` to completion, reading `input` for `READ` and writing
/// to `stdout`/`stderr`. Returns the process exit code on success (0 for
/// normal termination, the `EXIT` argument otherwise) or a `VMError` on
/// failure — the caller is responsible for turning that into the matching
/// exit code via [`VMError::exit_code`].
pub fn run(
    program: &Program,
    input: &mut dyn BufRead,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<i32, VMError> {
    let mut exec = Executor {
        program,
        frames: FrameSet::new(),
        call_stack: Vec::new(),
        data_stack: DataStack::new(),
        input,
        stdout,
        stderr,
    };
    exec.run()
}

struct Executor<'a> {
    program: &'a Program,
    frames: FrameSet,
    call_stack: Vec<Option<i64>>,
    data_stack: DataStack,
    input: &'a mut dyn BufRead,
    stdout: &'a mut dyn Write,
    stderr: &'a mut dyn Write,
}

/// What an instruction asks the dispatch loop to do next.
enum Flow {
    Continue,
    Jump(i64),
    /// `RETURN` past the last instruction in the program: terminate
    /// normally rather than jumping anywhere.
    Terminate,
    Exit(i32),
}

impl<'a> Executor<'a> {
    fn run(&mut self) -> Result<i32, VMError> {
        let Some(mut current) = self.program.first_order() else {
            return Ok(0);
        };

        loop {
            let instr = self
                .program
                .get(current)
                .expect("current order always names a real instruction");
            let next_order = self.program.next_order(current);

            match self.exec(instr)? {
                Flow::Exit(code) => {
                    self.stdout.flush().ok();
                    return Ok(code);
                }
                Flow::Jump(target) => current = target,
                Flow::Terminate => {
                    self.stdout.flush().ok();
                    return Ok(0);
                }
                Flow::Continue => match next_order {
                    Some(n) => current = n,
                    None => {
                        self.stdout.flush().ok();
                        return Ok(0);
                    }
                },
            }
        }
    }

    fn exec(
        &mut self,
        instr: &Instruction,
    ) -> Result<Flow, VMError> {
        use Opcode::*;

        match instr.opcode {
            CreateFrame => {
                self.frames.create_temporary();
                Ok(Flow::Continue)
            }
            PushFrame => {
                self.frames.push_temporary()?;
                Ok(Flow::Continue)
            }
            PopFrame => {
                self.frames.pop_local()?;
                Ok(Flow::Continue)
            }
            Return => {
                let target = self.call_stack.pop().ok_or(VMError::EmptyCallStack)?;
                match target {
                    Some(order) => Ok(Flow::Jump(order)),
                    None => Ok(Flow::Terminate),
                }
            }
            Break => {
                self.dump_state(instr.order);
                Ok(Flow::Continue)
            }
            DefVar => {
                let (scope, name) = self.var_operand(&instr.operands[0]);
                self.frames.define(scope, name)?;
                Ok(Flow::Continue)
            }
            Label => Ok(Flow::Continue),
            Jump => {
                let label = self.label_operand(&instr.operands[0]);
                let target = self
                    .program
                    .label(label)
                    .ok_or_else(|| VMError::UndefinedLabel(label.to_string()))?;
                Ok(Flow::Jump(target))
            }
            Call => {
                let label = self.label_operand(&instr.operands[0]);
                let target = self
                    .program
                    .label(label)
                    .ok_or_else(|| VMError::UndefinedLabel(label.to_string()))?;
                let resume = self.program.next_order(instr.order);
                self.call_stack.push(resume);
                Ok(Flow::Jump(target))
            }
            Pushs => {
                let v = self.read_symb(&instr.operands[0])?;
                self.data_stack.push(v);
                Ok(Flow::Continue)
            }
            Pops => {
                let v = self.data_stack.pop().ok_or(VMError::DataStackUnderflow)?;
                let (scope, name) = self.var_operand(&instr.operands[0]);
                self.frames.assign(scope, name, v)?;
                Ok(Flow::Continue)
            }
            Write => {
                let v = self.read_symb(&instr.operands[0])?;
                write!(self.stdout, "{v}").ok();
                Ok(Flow::Continue)
            }
            Exit => {
                let v = self.read_symb(&instr.operands[0])?;
                let code = match v {
                    Value::Int(n) => n,
                    _ => return Err(VMError::TypeMismatch),
                };
                if !(0..=49).contains(&code) {
                    return Err(VMError::ExitCodeOutOfRange(code));
                }
                Ok(Flow::Exit(code as i32))
            }
            DPrint => {
                let v = self.read_symb(&instr.operands[0])?;
                write!(self.stderr, "{v}").ok();
                Ok(Flow::Continue)
            }
            Move => {
                let v = self.read_symb(&instr.operands[1])?;
                let (scope, name) = self.var_operand(&instr.operands[0]);
                self.frames.assign(scope, name, v)?;
                Ok(Flow::Continue)
            }
            Int2Char => {
                let v = self.read_symb(&instr.operands[1])?;
                let code = match v {
                    Value::Int(n) => n,
                    _ => return Err(VMError::TypeMismatch),
                };
                let ch = u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(VMError::NotAUnicodeScalar(code))?;
                self.assign(&instr.operands[0], Value::String(ch.to_string()))?;
                Ok(Flow::Continue)
            }
            Read => {
                let ty = match &instr.operands[1] {
                    Operand::Type(t) => t.as_str(),
                    _ => unreachable!("loader guarantees a type operand here"),
                };
                let value = self.read_input(ty);
                self.assign(&instr.operands[0], value)?;
                Ok(Flow::Continue)
            }
            StrLen => {
                let v = self.read_symb(&instr.operands[1])?;
                let s = match v {
                    Value::String(s) => s,
                    _ => return Err(VMError::TypeMismatch),
                };
                self.assign(&instr.operands[0], Value::Int(s.chars().count() as i64))?;
                Ok(Flow::Continue)
            }
            Type => {
                let v = self.read_symb_allow_uninitialized(&instr.operands[1])?;
                self.assign(
                    &instr.operands[0],
                    Value::String(v.type_name().to_string()),
                )?;
                Ok(Flow::Continue)
            }
            Add | Sub | Mul | IDiv => {
                let a = self.int_operand(&instr.operands[1])?;
                let b = self.int_operand(&instr.operands[2])?;
                let result = match instr.opcode {
                    Add => a.checked_add(b),
                    Sub => a.checked_sub(b),
                    Mul => a.checked_mul(b),
                    IDiv => {
                        if b == 0 {
                            return Err(VMError::DivisionByZero);
                        }
                        Some(a / b)
                    }
                    _ => unreachable!(),
                };
                self.assign(&instr.operands[0], Value::Int(result.unwrap_or(0)))?;
                Ok(Flow::Continue)
            }
            Lt | Gt => {
                let a = self.read_symb(&instr.operands[1])?;
                let b = self.read_symb(&instr.operands[2])?;
                if matches!(a, Value::Nil) || matches!(b, Value::Nil) {
                    return Err(VMError::TypeMismatch);
                }
                let ord = value::compare(&a, &b).ok_or(VMError::TypeMismatch)?;
                let result = if instr.opcode == Lt {
                    ord == std::cmp::Ordering::Less
                } else {
                    ord == std::cmp::Ordering::Greater
                };
                self.assign(&instr.operands[0], Value::Bool(result))?;
                Ok(Flow::Continue)
            }
            Eq => {
                let a = self.read_symb(&instr.operands[1])?;
                let b = self.read_symb(&instr.operands[2])?;
                let result = value::equal(&a, &b).ok_or(VMError::TypeMismatch)?;
                self.assign(&instr.operands[0], Value::Bool(result))?;
                Ok(Flow::Continue)
            }
            And | Or => {
                let a = self.bool_operand(&instr.operands[1])?;
                let b = self.bool_operand(&instr.operands[2])?;
                let result = if instr.opcode == And { a && b } else { a || b };
                self.assign(&instr.operands[0], Value::Bool(result))?;
                Ok(Flow::Continue)
            }
            Not => {
                let a = self.bool_operand(&instr.operands[1])?;
                self.assign(&instr.operands[0], Value::Bool(!a))?;
                Ok(Flow::Continue)
            }
            Stri2Int => {
                let s = self.string_operand(&instr.operands[1])?;
                let idx = self.int_operand(&instr.operands[2])?;
                let ch = char_at(&s, idx).ok_or(VMError::StringIndexOutOfRange)?;
                self.assign(&instr.operands[0], Value::Int(ch as i64))?;
                Ok(Flow::Continue)
            }
            Concat => {
                let a = self.string_operand(&instr.operands[1])?;
                let b = self.string_operand(&instr.operands[2])?;
                self.assign(&instr.operands[0], Value::String(a + &b))?;
                Ok(Flow::Continue)
            }
            GetChar => {
                let s = self.string_operand(&instr.operands[1])?;
                let idx = self.int_operand(&instr.operands[2])?;
                let ch = char_at(&s, idx).ok_or(VMError::StringIndexOutOfRange)?;
                self.assign(&instr.operands[0], Value::String(ch.to_string()))?;
                Ok(Flow::Continue)
            }
            SetChar => {
                let (scope, name) = self.var_operand(&instr.operands[0]);
                let target = self.frames.read(scope, name)?.clone();
                let mut chars: Vec<char> = match target {
                    Value::String(s) => s.chars().collect(),
                    Value::Uninitialized => return Err(VMError::UninitializedVariable),
                    _ => return Err(VMError::TypeMismatch),
                };
                let idx = self.int_operand(&instr.operands[1])?;
                let replacement = self.string_operand(&instr.operands[2])?;
                let first = replacement
                    .chars()
                    .next()
                    .ok_or(VMError::StringIndexOutOfRange)?;
                let idx = usize::try_from(idx).map_err(|_| VMError::StringIndexOutOfRange)?;
                let slot = chars.get_mut(idx).ok_or(VMError::StringIndexOutOfRange)?;
                *slot = first;
                self.frames
                    .assign(scope, name, Value::String(chars.into_iter().collect()))?;
                Ok(Flow::Continue)
            }
            JumpIfEq | JumpIfNeq => {
                let a = self.read_symb(&instr.operands[1])?;
                let b = self.read_symb(&instr.operands[2])?;
                let eq = value::equal(&a, &b).ok_or(VMError::TypeMismatch)?;
                let taken = if instr.opcode == JumpIfEq { eq } else { !eq };
                if taken {
                    let label = self.label_operand(&instr.operands[0]);
                    let target = self
                        .program
                        .label(label)
                        .ok_or_else(|| VMError::UndefinedLabel(label.to_string()))?;
                    Ok(Flow::Jump(target))
                } else {
                    Ok(Flow::Continue)
                }
            }
        }
    }

    fn var_operand<'op>(
        &self,
        operand: &'op Operand,
    ) -> (Scope, &'op str) {
        match operand {
            Operand::Var(scope, name) => (*scope, name.as_str()),
            _ => unreachable!("loader guarantees a var operand here"),
        }
    }

    fn label_operand<'op>(
        &self,
        operand: &'op Operand,
    ) -> &'op str {
        match operand {
            Operand::Label(name) => name.as_str(),
            _ => unreachable!("loader guarantees a label operand here"),
        }
    }

    fn assign(
        &mut self,
        operand: &Operand,
        value: Value,
    ) -> Result<(), VMError> {
        let (scope, name) = self.var_operand(operand);
        self.frames.assign(scope, name, value)
    }

    /// Resolves a `symb` operand, rejecting `Uninitialized` (error 56).
    fn read_symb(
        &self,
        operand: &Operand,
    ) -> Result<Value, VMError> {
        let v = self.read_symb_allow_uninitialized(operand)?;
        if matches!(v, Value::Uninitialized) {
            return Err(VMError::UninitializedVariable);
        }
        Ok(v)
    }

    /// Resolves a `symb` operand without rejecting `Uninitialized` — only
    /// `TYPE` is allowed to see it.
    fn read_symb_allow_uninitialized(
        &self,
        operand: &Operand,
    ) -> Result<Value, VMError> {
        match operand {
            Operand::Var(scope, name) => self.frames.read(*scope, name).cloned(),
            Operand::Literal(v) => Ok(v.clone()),
            Operand::Label(_) | Operand::Type(_) => {
                unreachable!("loader guarantees a symb operand here")
            }
        }
    }

    fn int_operand(
        &self,
        operand: &Operand,
    ) -> Result<i64, VMError> {
        match self.read_symb(operand)? {
            Value::Int(n) => Ok(n),
            _ => Err(VMError::TypeMismatch),
        }
    }

    fn bool_operand(
        &self,
        operand: &Operand,
    ) -> Result<bool, VMError> {
        match self.read_symb(operand)? {
            Value::Bool(b) => Ok(b),
            _ => Err(VMError::TypeMismatch),
        }
    }

    fn string_operand(
        &self,
        operand: &Operand,
    ) -> Result<String, VMError> {
        match self.read_symb(operand)? {
            Value::String(s) => Ok(s),
            _ => Err(VMError::TypeMismatch),
        }
    }

    /// `READ var type`. EOF or a line that doesn't parse under `type`
    /// falls back to the type's default rather than erroring.
    fn read_input(
        &mut self,
        ty: &str,
    ) -> Value {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).unwrap_or(0);
        if read == 0 {
            return default_for_type(ty);
        }
        let line = line.trim_end_matches(['\n', '\r']);
        match ty {
            "int" => line.parse::<i64>().map(Value::Int).unwrap_or(Value::Int(0)),
            "bool" => Value::Bool(line.eq_ignore_ascii_case("true")),
            "string" => Value::String(line.to_string()),
            _ => unreachable!("loader only accepts int/bool/string as a type literal"),
        }
    }

    fn dump_state(
        &mut self,
        order: i64,
    ) {
        writeln!(self.stderr, "-- BREAK at instruction {order} --").ok();
        writeln!(self.stderr, "call stack: {:?}", self.call_stack).ok();
        writeln!(self.stderr, "global frame:").ok();
        for (name, value) in self.frames.global().iter() {
            writeln!(self.stderr, "  GF@{name} = {value:?}").ok();
        }
        if let Some(temp) = self.frames.temporary() {
            writeln!(self.stderr, "temporary frame:").ok();
            for (name, value) in temp.iter() {
                writeln!(self.stderr, "  TF@{name} = {value:?}").ok();
            }
        } else {
            writeln!(self.stderr, "temporary frame: absent").ok();
        }
        writeln!(self.stderr, "local frames: {} deep", self.frames.local_stack().len()).ok();
    }
}

fn default_for_type(ty: &str) -> Value {
    match ty {
        "int" => Value::Int(0),
        "bool" => Value::Bool(false),
        "string" => Value::String(String::new()),
        _ => unreachable!("loader only accepts int/bool/string as a type literal"),
    }
}

fn char_at(
    s: &str,
    idx: i64,
) -> Option<char> {
    let idx = usize::try_from(idx).ok()?;
    s.chars().nth(idx)
}
