//! Whole-program integration tests, one per scenario in the interpreter's
//! testable-properties catalogue.

use std::io::Cursor;

fn run(xml: &str, input: &str) -> (i32, String, String) {
    let mut input = Cursor::new(input.as_bytes().to_vec());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = match ippcode19::run_str(xml, &mut input, &mut stdout, &mut stderr) {
        Ok(code) => code,
        Err(e) => e.exit_code(),
    };
    (
        code,
        String::from_utf8(stdout).unwrap(),
        String::from_utf8(stderr).unwrap(),
    )
}

#[test]
fn move_int_then_write() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@a</arg1></instruction>
            <instruction order="2" opcode="MOVE">
                <arg1 type="var">GF@a</arg1>
                <arg2 type="int">5</arg2>
            </instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@a</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "5");
}

#[test]
fn write_before_assignment_is_error_56() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@a</arg1></instruction>
            <instruction order="2" opcode="WRITE"><arg1 type="var">GF@a</arg1></instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 56);
}

#[test]
fn strlen_of_string_literal_move() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@a</arg1></instruction>
            <instruction order="2" opcode="MOVE">
                <arg1 type="var">GF@a</arg1><arg2 type="string">hello</arg2>
            </instruction>
            <instruction order="3" opcode="DEFVAR"><arg1 type="var">GF@b</arg1></instruction>
            <instruction order="4" opcode="STRLEN">
                <arg1 type="var">GF@b</arg1><arg2 type="var">GF@a</arg2>
            </instruction>
            <instruction order="5" opcode="WRITE"><arg1 type="var">GF@b</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "5");
}

#[test]
fn countdown_loop_with_labels_and_jumpifeq() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="LABEL"><arg1 type="label">L</arg1></instruction>
            <instruction order="2" opcode="DEFVAR"><arg1 type="var">GF@i</arg1></instruction>
            <instruction order="3" opcode="MOVE">
                <arg1 type="var">GF@i</arg1><arg2 type="int">3</arg2>
            </instruction>
            <instruction order="4" opcode="LABEL"><arg1 type="label">loop</arg1></instruction>
            <instruction order="5" opcode="JUMPIFEQ">
                <arg1 type="label">end</arg1>
                <arg2 type="var">GF@i</arg2>
                <arg3 type="int">0</arg3>
            </instruction>
            <instruction order="6" opcode="WRITE"><arg1 type="var">GF@i</arg1></instruction>
            <instruction order="7" opcode="SUB">
                <arg1 type="var">GF@i</arg1>
                <arg2 type="var">GF@i</arg2>
                <arg3 type="int">1</arg3>
            </instruction>
            <instruction order="8" opcode="JUMP"><arg1 type="label">loop</arg1></instruction>
            <instruction order="9" opcode="LABEL"><arg1 type="label">end</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "321");
}

#[test]
fn pushframe_popframe_keeps_variable_identity() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="CREATEFRAME"></instruction>
            <instruction order="2" opcode="DEFVAR"><arg1 type="var">TF@x</arg1></instruction>
            <instruction order="3" opcode="MOVE">
                <arg1 type="var">TF@x</arg1><arg2 type="bool">true</arg2>
            </instruction>
            <instruction order="4" opcode="PUSHFRAME"></instruction>
            <instruction order="5" opcode="WRITE"><arg1 type="var">LF@x</arg1></instruction>
            <instruction order="6" opcode="POPFRAME"></instruction>
            <instruction order="7" opcode="WRITE"><arg1 type="var">TF@x</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "truetrue");
}

#[test]
fn idiv_by_zero_is_error_57() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@q</arg1></instruction>
            <instruction order="2" opcode="IDIV">
                <arg1 type="var">GF@q</arg1>
                <arg2 type="int">7</arg2>
                <arg3 type="int">0</arg3>
            </instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 57);
}

#[test]
fn exit_out_of_range_is_error_57() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="EXIT"><arg1 type="int">50</arg1></instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 57);
}

#[test]
fn exit_zero_is_normal_termination() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="WRITE"><arg1 type="string">before</arg1></instruction>
            <instruction order="2" opcode="EXIT"><arg1 type="int">0</arg1></instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="string">after</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "before");
}

#[test]
fn getchar_out_of_range_is_error_58() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@c</arg1></instruction>
            <instruction order="2" opcode="GETCHAR">
                <arg1 type="var">GF@c</arg1>
                <arg2 type="string">abc</arg2>
                <arg3 type="int">10</arg3>
            </instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 58);
}

#[test]
fn read_int_defaults_to_zero_on_eof() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@n</arg1></instruction>
            <instruction order="2" opcode="READ">
                <arg1 type="var">GF@n</arg1>
                <arg2 type="type">int</arg2>
            </instruction>
            <instruction order="3" opcode="WRITE"><arg1 type="var">GF@n</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "0");
}

#[test]
fn read_reads_one_line_per_call() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@a</arg1></instruction>
            <instruction order="2" opcode="DEFVAR"><arg1 type="var">GF@b</arg1></instruction>
            <instruction order="3" opcode="READ">
                <arg1 type="var">GF@a</arg1><arg2 type="type">string</arg2>
            </instruction>
            <instruction order="4" opcode="READ">
                <arg1 type="var">GF@b</arg1><arg2 type="type">int</arg2>
            </instruction>
            <instruction order="5" opcode="WRITE"><arg1 type="var">GF@a</arg1></instruction>
            <instruction order="6" opcode="WRITE"><arg1 type="var">GF@b</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "hello\n42\n");
    assert_eq!(code, 0);
    assert_eq!(out, "hello42");
}

#[test]
fn call_and_return_resume_at_next_order() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="CALL"><arg1 type="label">sub</arg1></instruction>
            <instruction order="2" opcode="WRITE"><arg1 type="string">done</arg1></instruction>
            <instruction order="3" opcode="JUMP"><arg1 type="label">end</arg1></instruction>
            <instruction order="4" opcode="LABEL"><arg1 type="label">sub</arg1></instruction>
            <instruction order="5" opcode="WRITE"><arg1 type="string">sub</arg1></instruction>
            <instruction order="6" opcode="RETURN"></instruction>
            <instruction order="7" opcode="LABEL"><arg1 type="label">end</arg1></instruction>
        </program>
    "#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "subdone");
}

#[test]
fn return_with_empty_call_stack_is_error_56() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="RETURN"></instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 56);
}

#[test]
fn duplicate_label_is_error_52() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="LABEL"><arg1 type="label">l</arg1></instruction>
            <instruction order="2" opcode="LABEL"><arg1 type="label">l</arg1></instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 52);
}

#[test]
fn pushframe_without_createframe_is_error_55() {
    let xml = r#"
        <program language="IPPcode19">
            <instruction order="1" opcode="PUSHFRAME"></instruction>
        </program>
    "#;
    let (code, _, _) = run(xml, "");
    assert_eq!(code, 55);
}

#[test]
fn empty_program_terminates_normally() {
    let xml = r#"<program language="IPPcode19"></program>"#;
    let (code, out, _) = run(xml, "");
    assert_eq!(code, 0);
    assert_eq!(out, "");
}
