use std::fmt::Write;

use crate::constant::Constant;
use crate::context::Context;
use crate::function::Function;
use crate::instruction::{decode_instructions, jump_target, Instruction};

use super::{Renderer, Runnable};

/// The bytecode format version this crate emits.
pub const FORMAT_VERSION: u16 = 1;

/// A compiled template.
///
/// The last function is the main template body; sub-templates come first,
/// in definition order. A program is immutable once emitted and can be
/// rendered from several threads at once.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Program {
    version: u16,
    pub constants: Vec<Constant>,
    pub names: Vec<String>,
    pub functions: Vec<Function>,
}

static_assertions::assert_impl_all!(Program: Send, Sync);

impl Program {
    pub fn new() -> Self {
        Self::with_version(FORMAT_VERSION)
    }

    /// An empty program tagged with a specific format version.
    pub fn with_version(version: u16) -> Self {
        Program {
            version,
            constants: Vec::new(),
            names: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    /// The index of the main function.
    pub fn main_id(&self) -> Option<usize> {
        self.functions.len().checked_sub(1)
    }

    /// Obtain a runnable version of this program, with a particular context.
    ///
    /// The runnable uses a default [`Renderer`]; use
    /// [`Renderer::runnable`] for other settings.
    pub fn runnable<'a>(&'a self, context: &'a Context) -> Runnable<'a> {
        Runnable::new(self, context, Renderer::default())
    }

    /// A human-readable listing of the constant pool, the name table and
    /// the instructions of every function.
    pub fn disassemble(&self) -> String {
        let mut s = String::new();
        // writing to a String cannot fail
        let _ = self.write_disassembly(&mut s);
        s
    }

    fn write_disassembly(&self, s: &mut String) -> std::fmt::Result {
        writeln!(s, "version {}", self.version)?;
        writeln!(s, "constants")?;
        for (i, constant) in self.constants.iter().enumerate() {
            writeln!(s, "  {} {}", i, constant)?;
        }
        writeln!(s, "names")?;
        for (i, name) in self.names.iter().enumerate() {
            writeln!(s, "  {} {}", i, name)?;
        }
        for function in &self.functions {
            let params = function
                .params
                .iter()
                .map(|param| self.name(*param))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(s, "function {}({})", function.name, params)?;
            let Some(instructions) = decode_instructions(&function.chunk) else {
                writeln!(s, "  <invalid bytecode>")?;
                continue;
            };
            for (offset, instruction) in instructions {
                write!(s, "  {:>4} {:?}", offset, instruction)?;
                if let Some(annotation) = self.annotation(offset, &instruction, function) {
                    write!(s, " ; {}", annotation)?;
                }
                if let Some(span) = function.span(offset) {
                    write!(s, " @{}..{}", span.start, span.end)?;
                }
                writeln!(s)?;
            }
        }
        Ok(())
    }

    fn annotation(
        &self,
        offset: usize,
        instruction: &Instruction,
        function: &Function,
    ) -> Option<String> {
        match instruction {
            Instruction::Const(index) => self
                .constants
                .get(*index as usize)
                .map(|constant| constant.to_string()),
            Instruction::LoadVar(name)
            | Instruction::StoreVar(name)
            | Instruction::Attr(name)
            | Instruction::CallFn(name, _) => Some(self.name(*name).to_string()),
            Instruction::DefaultVar(name, _) | Instruction::ForIterNext(name, _) => Some(format!(
                "{} -> {}",
                self.name(*name),
                self.target(offset, instruction, function)
            )),
            Instruction::Render(index, _) => self
                .functions
                .get(*index as usize)
                .map(|function| function.name.clone()),
            instruction if instruction.displacement().is_some() => Some(format!(
                "-> {}",
                self.target(offset, instruction, function)
            )),
            _ => None,
        }
    }

    fn name(&self, index: u16) -> &str {
        self.names.get(index as usize).map_or("?", String::as_str)
    }

    fn target(&self, offset: usize, instruction: &Instruction, function: &Function) -> String {
        jump_target(offset, instruction, function.chunk.len())
            .map_or_else(|| "?".to_string(), |target| target.to_string())
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
