//! An interpreter for IPPcode19, a three-address intermediate code
//! delivered as an XML document.
//!
//! # Example
//!
//! ```no_run
//! use ippcode19::{run_str, Result};
//!
//! fn main() -> Result<()> {
//!     let xml = r#"
//!         <program language="IPPcode19">
//!             <instruction order="1" opcode="WRITE">
//!                 <arg1 type="string">hello</arg1>
//!             </instruction>
//!         </program>
//!     "#;
//!     let mut input = std::io::empty();
//!     let mut stdout = std::io::stdout();
//!     let mut stderr = std::io::stderr();
//!     let code = ippcode19::run_str(xml, &mut input, &mut stdout, &mut stderr)?;
//!     std::process::exit(code);
//! }
//! ```

#![warn(rust_2018_idioms)]

pub mod util;
pub mod vm;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

use std::io::{BufRead, Write};
use std::path::Path;

use tracing::debug;
use vm::{LoadError, VMError};

/// Interpreter version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Interpreter name.
pub const NAME: &str = "IPPcode19 interpreter";

/// Any failure that can end the interpreter's run before normal
/// termination: a malformed/structurally invalid program, or a runtime
/// error during execution. Each variant carries its own process exit
/// code (spec §6), exposed through [`RunError::exit_code`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Vm(#[from] VMError),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Load(e) => e.exit_code(),
            RunError::Vm(e) => e.exit_code(),
        }
    }
}

/// Loads and runs an IPPcode19 program from an in-memory XML document.
/// Returns the process exit code on normal or `EXIT`-triggered
/// termination.
pub fn run_str(
    xml: &str,
    input: &mut dyn BufRead,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<i32, RunError> {
    debug!("loading program ({} bytes of XML)", xml.len());
    let program = vm::loader::load(xml.as_bytes())?;
    debug!("program loaded, {} instructions", program.len());
    let code = vm::run(&program, input, stdout, stderr)?;
    debug!("program terminated with exit code {code}");
    Ok(code)
}

/// Loads and runs an IPPcode19 program from a source file, optionally
/// reading `READ`'s input from another file instead of stdin.
pub fn run_file(
    source_path: &Path,
    input_path: Option<&Path>,
) -> anyhow::Result<i32> {
    let xml = std::fs::read_to_string(source_path)
        .with_context(|| format!("cannot open source file: {}", source_path.display()))?;

    let mut input: Box<dyn BufRead> = match input_path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("cannot open input file: {}", path.display()))?;
            Box::new(std::io::BufReader::new(file))
        }
        None => Box::new(std::io::BufReader::new(std::io::stdin())),
    };

    let mut stdout = std::io::BufWriter::new(std::io::stdout());
    let mut stderr = std::io::stderr();

    match run_str(&xml, &mut input, &mut stdout, &mut stderr) {
        Ok(code) => Ok(code),
        Err(e) => {
            use std::io::Write as _;
            writeln!(std::io::stderr(), "{e}").ok();
            Ok(e.exit_code())
        }
    }
}
