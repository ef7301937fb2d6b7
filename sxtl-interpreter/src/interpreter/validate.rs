use crate::error::{Error, RenderError, RenderResult};
use crate::function::Function;
use crate::instruction::{decode_instructions, jump_target, Instruction};

use super::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Scope,
    Loop,
}

impl Program {
    /// Check the structure of the program before it is run.
    ///
    /// Every chunk must decode into whole instructions ending with `Return`,
    /// every jump must land on an instruction boundary of its own function,
    /// every operand index must exist, and scope and loop markers must be
    /// balanced.
    pub fn validate(&self) -> RenderResult<()> {
        if self.functions.is_empty() {
            return Err(Error::InvalidProgram.into());
        }
        for function in &self.functions {
            self.validate_function(function)?;
        }
        Ok(())
    }

    fn validate_function(&self, function: &Function) -> RenderResult<()> {
        let fail = |error: Error, offset: Option<usize>| RenderError {
            error,
            function: Some(function.name.clone()),
            offset,
            span: offset.and_then(|offset| function.span(offset)),
        };

        if function.spans.len() != function.chunk.len() {
            return Err(fail(Error::InvalidProgram, None));
        }
        if function
            .params
            .iter()
            .any(|param| *param as usize >= self.names.len())
        {
            return Err(fail(Error::InvalidProgram, None));
        }
        let instructions =
            decode_instructions(&function.chunk).ok_or_else(|| fail(Error::InvalidProgram, None))?;
        match instructions.last() {
            Some((_, Instruction::Return)) => {}
            last => {
                return Err(fail(
                    Error::InvalidProgram,
                    last.map(|(offset, _)| *offset),
                ))
            }
        }

        let mut boundaries = vec![false; function.chunk.len()];
        for (offset, _) in &instructions {
            boundaries[*offset] = true;
        }

        let mut markers = Vec::new();
        for (offset, instruction) in &instructions {
            let offset = *offset;
            if instruction.displacement().is_some() {
                match jump_target(offset, instruction, function.chunk.len()) {
                    Some(target) if boundaries[target] => {}
                    _ => return Err(fail(Error::JumpOutOfBounds, Some(offset))),
                }
            }
            if !self.operands_exist(instruction) {
                return Err(fail(Error::InvalidProgram, Some(offset)));
            }
            let balanced = match instruction {
                Instruction::ScopeBegin => {
                    markers.push(Marker::Scope);
                    true
                }
                Instruction::ForIterBegin => {
                    markers.push(Marker::Loop);
                    true
                }
                Instruction::ScopeEnd => markers.pop() == Some(Marker::Scope),
                Instruction::ForIterEnd(_) => markers.pop() == Some(Marker::Loop),
                Instruction::ForIterNext(..) | Instruction::ForIterBreak(_) => {
                    markers.contains(&Marker::Loop)
                }
                _ => true,
            };
            if !balanced {
                return Err(fail(Error::InvalidProgram, Some(offset)));
            }
        }
        if !markers.is_empty() {
            return Err(fail(Error::InvalidProgram, None));
        }
        Ok(())
    }

    fn operands_exist(&self, instruction: &Instruction) -> bool {
        match instruction {
            Instruction::Const(index) => (*index as usize) < self.constants.len(),
            Instruction::LoadVar(name)
            | Instruction::StoreVar(name)
            | Instruction::DefaultVar(name, _)
            | Instruction::Attr(name)
            | Instruction::CallFn(name, _)
            | Instruction::ForIterNext(name, _) => (*name as usize) < self.names.len(),
            Instruction::Render(index, _) => (*index as usize) < self.functions.len(),
            _ => true,
        }
    }
}
