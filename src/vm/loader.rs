//! Turns an IPPcode19 XML document into a [`Program`].
//!
//! This is the only place in the crate that looks at XML. Everything
//! downstream (`vm::executor`) only ever sees the validated,
//! already-typed [`Instruction`]/[`Operand`] representation built here.
//!
//! Structural violations (bad attributes, unknown opcodes, wrong arity,
//! malformed literals, bad identifier syntax, duplicate labels) are all
//! reported through [`LoadError`], which carries its own exit code
//! (spec §6): malformed XML is 31, everything else structural is 32,
//! duplicate labels are 52.

use std::io::BufRead;
use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use super::errors::LoadError;
use super::frameset::Scope;
use super::program::{ArgKind, Instruction, Opcode, Operand, Program};
use super::value::Value;

const ALLOWED_PROGRAM_ATTRS: &[&str] = &["language", "name", "description"];

fn var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_\-$&%*][A-Za-z0-9_\-$&%*]*$").unwrap())
}

fn label_re() -> &'static Regex {
    // Labels share the identifier grammar of variables (spec §3/GLOSSARY);
    // the scope prefix simply doesn't apply.
    var_re()
}

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?[0-9]+$").unwrap())
}

/// Reverses the `\ddd` three-digit decimal code-point escapes IPPcode19
/// string literals use, leaving everything else untouched.
fn decode_escapes(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1..i + 4].iter().all(u8::is_ascii_digit) {
            let code: u32 = s[i + 1..i + 4].parse().unwrap();
            if let Some(ch) = char::from_u32(code) {
                out.push(ch);
                i += 4;
                continue;
            }
        }
        // Safe: we only ever skip whole escape runs above, so this always
        // lands on a char boundary.
        let ch = s[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Loads a [`Program`] from an XML document read from `source`.
pub fn load(source: impl BufRead) -> Result<Program, LoadError> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| LoadError::MalformedXml(e.to_string()))?
        {
            Event::Start(start) if tag_name(&start) == "program" => {
                check_program_attrs(&start)?;
                return load_instructions(&mut reader);
            }
            Event::Empty(start) if tag_name(&start) == "program" => {
                check_program_attrs(&start)?;
                return Ok(Program::new());
            }
            Event::Eof => {
                return Err(LoadError::MalformedXml(
                    "document has no <program> root element".to_string(),
                ))
            }
            Event::Comment(_) | Event::Decl(_) | Event::DocType(_) | Event::PI(_) => {}
            other => {
                return Err(LoadError::MalformedXml(format!(
                    "unexpected content before <program>: {other:?}"
                )))
            }
        }
        buf.clear();
    }
}

fn load_instructions(reader: &mut Reader<impl BufRead>) -> Result<Program, LoadError> {
    let mut program = Program::new();
    let mut buf = Vec::new();
    let mut seen = 0i64;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| LoadError::MalformedXml(e.to_string()))?
        {
            Event::Start(start) if tag_name(&start) == "instruction" => {
                seen += 1;
                let instr = parse_instruction(reader, &start, false, seen)?;
                register_instruction(&mut program, instr)?;
            }
            Event::Empty(start) if tag_name(&start) == "instruction" => {
                seen += 1;
                let instr = parse_instruction(reader, &start, true, seen)?;
                register_instruction(&mut program, instr)?;
            }
            Event::End(end) if tag_name_bytes(end.name().as_ref()) == "program" => {
                return Ok(program);
            }
            Event::Comment(_) => {}
            Event::Eof => {
                return Err(LoadError::MalformedXml(
                    "unexpected end of document inside <program>".to_string(),
                ))
            }
            other => {
                return Err(LoadError::UnexpectedElement(format!("{other:?}")));
            }
        }
        buf.clear();
    }
}

fn register_instruction(
    program: &mut Program,
    instr: Instruction,
) -> Result<(), LoadError> {
    if instr.opcode == Opcode::Label {
        if let Some(Operand::Label(name)) = instr.operands.first() {
            program
                .define_label(name.clone(), instr.order)
                .map_err(|_| LoadError::DuplicateLabel(name.clone()))?;
        }
    }
    let order = instr.order;
    if program.insert(instr).is_some() {
        return Err(LoadError::DuplicateOrder(order));
    }
    Ok(())
}

fn parse_instruction(
    reader: &mut Reader<impl BufRead>,
    start: &BytesStart,
    self_closing: bool,
    idx: i64,
) -> Result<Instruction, LoadError> {
    let order = attr(start, "order")
        .ok_or(LoadError::MissingOrder)
        .and_then(|v| {
            v.parse::<i64>()
                .map_err(|_| LoadError::InvalidOrder(v.clone()))
                .and_then(|n| {
                    if n > 0 {
                        Ok(n)
                    } else {
                        Err(LoadError::InvalidOrder(v))
                    }
                })
        })?;

    let opcode_text = attr(start, "opcode").ok_or(LoadError::MissingOpcode { order: idx })?;
    let opcode = Opcode::parse(&opcode_text).ok_or_else(|| LoadError::UnknownOpcode {
        order,
        opcode: opcode_text.clone(),
    })?;

    let mut slots: [Option<(String, String)>; 3] = [None, None, None];

    if !self_closing {
        let mut buf = Vec::new();
        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| LoadError::MalformedXml(e.to_string()))?
            {
                Event::Start(arg) => {
                    let idx = arg_index(&arg, order)?;
                    if slots[idx].is_some() {
                        return Err(LoadError::BadArgumentLayout { order });
                    }
                    let ty = attr(&arg, "type")
                        .ok_or(LoadError::MissingArgType { order, index: idx + 1 })?;
                    let text = read_arg_text(reader, order)?;
                    slots[idx] = Some((text, ty));
                }
                Event::Empty(arg) => {
                    let idx = arg_index(&arg, order)?;
                    if slots[idx].is_some() {
                        return Err(LoadError::BadArgumentLayout { order });
                    }
                    let ty = attr(&arg, "type")
                        .ok_or(LoadError::MissingArgType { order, index: idx + 1 })?;
                    slots[idx] = Some((String::new(), ty));
                }
                Event::End(end) if tag_name_bytes(end.name().as_ref()) == "instruction" => break,
                Event::Comment(_) => {}
                Event::Eof => {
                    return Err(LoadError::MalformedXml(format!(
                        "unexpected end of document inside instruction {order}"
                    )))
                }
                other => return Err(LoadError::UnexpectedElement(format!("{other:?}"))),
            }
            buf.clear();
        }
    }

    let signature = opcode.signature();
    let arity = signature.len();
    for (i, slot) in slots.iter().enumerate() {
        if i < arity && slot.is_none() {
            return Err(LoadError::BadArgumentLayout { order });
        }
        if i >= arity && slot.is_some() {
            return Err(LoadError::BadArgumentLayout { order });
        }
    }

    let mut operands = smallvec::SmallVec::new();
    for (i, expected) in signature.iter().enumerate() {
        let (text, ty) = slots[i].take().unwrap();
        operands.push(parse_operand(order, i, &text, &ty, *expected)?);
    }

    Ok(Instruction {
        order,
        opcode,
        operands,
    })
}

fn read_arg_text(
    reader: &mut Reader<impl BufRead>,
    order: i64,
) -> Result<String, LoadError> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| LoadError::MalformedXml(e.to_string()))?
        {
            Event::Text(t) => {
                let decoded = t
                    .unescape()
                    .map_err(|e| LoadError::MalformedXml(e.to_string()))?;
                text.push_str(&decoded);
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(LoadError::MalformedXml(format!(
                    "unexpected end of document inside an argument of instruction {order}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn arg_index(
    arg: &BytesStart,
    order: i64,
) -> Result<usize, LoadError> {
    match tag_name(arg).as_str() {
        "arg1" => Ok(0),
        "arg2" => Ok(1),
        "arg3" => Ok(2),
        _ => Err(LoadError::BadArgumentLayout { order }),
    }
}

fn parse_operand(
    order: i64,
    index: usize,
    text: &str,
    ty: &str,
    expected: ArgKind,
) -> Result<Operand, LoadError> {
    let ordinal = index + 1;
    match (ty, expected) {
        ("var", ArgKind::Var) | ("var", ArgKind::Symb) => {
            let bad_syntax = || LoadError::BadVariableSyntax {
                order,
                index: ordinal,
                text: text.to_string(),
            };
            let (prefix, name) = text.split_once('@').ok_or_else(bad_syntax)?;
            let scope = Scope::parse(prefix).ok_or_else(bad_syntax)?;
            if !var_re().is_match(name) {
                return Err(bad_syntax());
            }
            Ok(Operand::Var(scope, name.to_string()))
        }
        ("label", ArgKind::Label) => {
            if !label_re().is_match(text) {
                return Err(LoadError::BadLabelSyntax {
                    order,
                    index: ordinal,
                    text: text.to_string(),
                });
            }
            Ok(Operand::Label(text.to_string()))
        }
        ("type", ArgKind::Type) => {
            if matches!(text, "int" | "bool" | "string") {
                Ok(Operand::Type(text.to_string()))
            } else {
                Err(LoadError::BadLiteralSyntax {
                    order,
                    index: ordinal,
                    kind: "type",
                    text: text.to_string(),
                })
            }
        }
        ("int", ArgKind::Symb) => {
            if !int_re().is_match(text) {
                return Err(LoadError::BadLiteralSyntax {
                    order,
                    index: ordinal,
                    kind: "int",
                    text: text.to_string(),
                });
            }
            let n: i64 = text.parse().map_err(|_| LoadError::BadLiteralSyntax {
                order,
                index: ordinal,
                kind: "int",
                text: text.to_string(),
            })?;
            Ok(Operand::Literal(Value::Int(n)))
        }
        ("bool", ArgKind::Symb) => match text {
            "true" => Ok(Operand::Literal(Value::Bool(true))),
            "false" => Ok(Operand::Literal(Value::Bool(false))),
            _ => Err(LoadError::BadLiteralSyntax {
                order,
                index: ordinal,
                kind: "bool",
                text: text.to_string(),
            }),
        },
        ("string", ArgKind::Symb) => Ok(Operand::Literal(Value::String(decode_escapes(text)))),
        ("nil", ArgKind::Symb) => {
            if text == "nil" {
                Ok(Operand::Literal(Value::Nil))
            } else {
                Err(LoadError::BadLiteralSyntax {
                    order,
                    index: ordinal,
                    kind: "nil",
                    text: text.to_string(),
                })
            }
        }
        (other, _) => Err(LoadError::WrongArgKind {
            order,
            index: ordinal,
            opcode: other.to_string(),
        }),
    }
}

fn check_program_attrs(start: &BytesStart) -> Result<(), LoadError> {
    let language = attr(start, "language").ok_or(LoadError::BadLanguageAttribute)?;
    if !language.eq_ignore_ascii_case("ippcode19") {
        return Err(LoadError::BadLanguageAttribute);
    }
    for a in start.attributes() {
        let a = a.map_err(|e| LoadError::MalformedXml(e.to_string()))?;
        let name = String::from_utf8_lossy(a.key.as_ref()).to_string();
        if !ALLOWED_PROGRAM_ATTRS.contains(&name.as_str()) {
            return Err(LoadError::UnknownProgramAttribute(name));
        }
    }
    Ok(())
}

fn attr(
    start: &BytesStart,
    name: &str,
) -> Option<String> {
    start.attributes().filter_map(Result::ok).find_map(|a| {
        if a.key.as_ref() == name.as_bytes() {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn tag_name(start: &BytesStart) -> String {
    tag_name_bytes(start.name().as_ref())
}

fn tag_name_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_str(xml: &str) -> Result<Program, LoadError> {
        load(xml.as_bytes())
    }

    #[test]
    fn rejects_missing_language() {
        let err = load_str(r#"<program name="x"></program>"#).unwrap_err();
        assert!(matches!(err, LoadError::BadLanguageAttribute));
    }

    #[test]
    fn accepts_case_insensitive_language() {
        let xml = r#"<program language="ippCODE19"></program>"#;
        assert!(load_str(xml).is_ok());
    }

    #[test]
    fn rejects_unknown_program_attribute() {
        let xml = r#"<program language="IPPcode19" bogus="1"></program>"#;
        assert!(matches!(
            load_str(xml),
            Err(LoadError::UnknownProgramAttribute(_))
        ));
    }

    #[test]
    fn parses_a_simple_instruction() {
        let xml = r#"
            <program language="IPPcode19">
                <instruction order="1" opcode="DEFVAR">
                    <arg1 type="var">GF@a</arg1>
                </instruction>
                <instruction order="2" opcode="MOVE">
                    <arg1 type="var">GF@a</arg1>
                    <arg2 type="int">5</arg2>
                </instruction>
            </program>
        "#;
        let program = load_str(xml).unwrap();
        assert_eq!(program.len(), 2);
        let second = program.get(2).unwrap();
        assert_eq!(second.opcode, Opcode::Move);
        assert_eq!(second.operands.len(), 2);
    }

    #[test]
    fn rejects_argument_gap() {
        let xml = r#"
            <program language="IPPcode19">
                <instruction order="1" opcode="MOVE">
                    <arg2 type="int">5</arg2>
                </instruction>
            </program>
        "#;
        assert!(matches!(
            load_str(xml),
            Err(LoadError::BadArgumentLayout { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_labels() {
        let xml = r#"
            <program language="IPPcode19">
                <instruction order="1" opcode="LABEL">
                    <arg1 type="label">l</arg1>
                </instruction>
                <instruction order="2" opcode="LABEL">
                    <arg1 type="label">l</arg1>
                </instruction>
            </program>
        "#;
        assert!(matches!(load_str(xml), Err(LoadError::DuplicateLabel(_))));
    }

    #[test]
    fn decodes_numeric_escapes() {
        assert_eq!(decode_escapes(r"a\035b"), "a#b");
        assert_eq!(decode_escapes(r"\092"), "\\");
        assert_eq!(decode_escapes("plain"), "plain");
    }
}
