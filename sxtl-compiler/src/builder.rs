use sxtl_ast::Span;
use sxtl_interpreter::instruction::{encode_instruction, Instruction};
use sxtl_interpreter::{Constant, Function, Program};

use crate::error::{EmitError, Result};

// A jump emitted before its target is known. `operand` is where its
// displacement is stored, `next` the offset of the following instruction.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ForwardJumpRef {
    operand: usize,
    next: usize,
    span: Span,
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BackwardJumpRef(usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum JumpCondition {
    Always,
    False,
    // short-circuit: the value stays on the stack when jumping
    TrueKeep,
    FalseKeep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Scope,
    Loop,
}

pub struct FunctionBuilder<'a> {
    program: &'a mut Program,
    compiled: Vec<u8>,
    spans: Vec<Span>,
    markers: Vec<Marker>,
    unbalanced: Option<Span>,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(program: &'a mut Program) -> Self {
        FunctionBuilder {
            program,
            compiled: Vec::new(),
            spans: Vec::new(),
            markers: Vec::new(),
            unbalanced: None,
        }
    }

    pub(crate) fn emit(&mut self, instruction: Instruction, span: Span) {
        self.track_marker(&instruction, span);
        for _ in 0..instruction.size() {
            self.spans.push(span);
        }
        encode_instruction(instruction, &mut self.compiled);
    }

    fn track_marker(&mut self, instruction: &Instruction, span: Span) {
        let balanced = match instruction {
            Instruction::ScopeBegin => {
                self.markers.push(Marker::Scope);
                true
            }
            Instruction::ForIterBegin => {
                self.markers.push(Marker::Loop);
                true
            }
            Instruction::ScopeEnd => self.markers.pop() == Some(Marker::Scope),
            Instruction::ForIterEnd(_) => self.markers.pop() == Some(Marker::Loop),
            Instruction::ForIterNext(..) | Instruction::ForIterBreak(_) => {
                self.markers.contains(&Marker::Loop)
            }
            _ => true,
        };
        if !balanced && self.unbalanced.is_none() {
            self.unbalanced = Some(span);
        }
    }

    pub(crate) fn add_constant(&mut self, constant: Constant, span: Span) -> Result<u16> {
        let constants = &mut self.program.constants;
        let index = match constants.iter().position(|c| c.identical(&constant)) {
            Some(index) => index,
            None => {
                constants.push(constant);
                constants.len() - 1
            }
        };
        u16::try_from(index).map_err(|_| EmitError::TooMany {
            what: "constants",
            span,
        })
    }

    pub(crate) fn emit_constant(&mut self, constant: Constant, span: Span) -> Result<()> {
        let index = self.add_constant(constant, span)?;
        self.emit(Instruction::Const(index), span);
        Ok(())
    }

    pub(crate) fn add_name(&mut self, name: &str, span: Span) -> Result<u16> {
        let names = &mut self.program.names;
        let index = match names.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                names.push(name.to_string());
                names.len() - 1
            }
        };
        u16::try_from(index).map_err(|_| EmitError::TooMany {
            what: "names",
            span,
        })
    }

    pub(crate) fn loop_start(&self) -> BackwardJumpRef {
        BackwardJumpRef(self.compiled.len())
    }

    fn emit_forward(&mut self, instruction: Instruction, span: Span) -> ForwardJumpRef {
        let start = self.compiled.len();
        let size = instruction.size();
        self.emit(instruction, span);
        // the displacement is always the last operand
        ForwardJumpRef {
            operand: start + size - 2,
            next: start + size,
            span,
        }
    }

    pub(crate) fn emit_jump_forward(
        &mut self,
        condition: JumpCondition,
        span: Span,
    ) -> ForwardJumpRef {
        let instruction = match condition {
            JumpCondition::Always => Instruction::Jump(0),
            JumpCondition::False => Instruction::JumpIfFalse(0),
            JumpCondition::TrueKeep => Instruction::JumpIfTrueKeep(0),
            JumpCondition::FalseKeep => Instruction::JumpIfFalseKeep(0),
        };
        self.emit_forward(instruction, span)
    }

    /// Push a bound, non-null variable and jump over the fallback code that
    /// follows.
    pub(crate) fn emit_default_var(&mut self, name: u16, span: Span) -> ForwardJumpRef {
        self.emit_forward(Instruction::DefaultVar(name, 0), span)
    }

    /// Bind the next item, or jump out of the loop when done.
    pub(crate) fn emit_for_iter_next(&mut self, name: u16, span: Span) -> ForwardJumpRef {
        self.emit_forward(Instruction::ForIterNext(name, 0), span)
    }

    pub(crate) fn emit_for_iter_break(&mut self, span: Span) -> ForwardJumpRef {
        self.emit_forward(Instruction::ForIterBreak(0), span)
    }

    /// End an iteration, jumping back to the loop start.
    pub(crate) fn emit_for_iter_end(&mut self, jump_ref: BackwardJumpRef, span: Span) -> Result<()> {
        let next = self.compiled.len() + Instruction::ForIterEnd(0).size();
        let displacement = jump_ref.0 as i64 - next as i64;
        let displacement =
            i16::try_from(displacement).map_err(|_| EmitError::JumpTooFar { span })?;
        self.emit(Instruction::ForIterEnd(displacement), span);
        Ok(())
    }

    /// Point a forward jump at the current end of the code.
    pub(crate) fn patch_jump(&mut self, jump_ref: ForwardJumpRef) -> Result<()> {
        let current = self.compiled.len();
        let displacement = i16::try_from(current - jump_ref.next)
            .map_err(|_| EmitError::JumpTooFar {
                span: jump_ref.span,
            })?;
        let bytes = displacement.to_le_bytes();
        self.compiled[jump_ref.operand] = bytes[0];
        self.compiled[jump_ref.operand + 1] = bytes[1];
        Ok(())
    }

    /// Complete the function with a return.
    pub(crate) fn finish(mut self, name: String, params: Vec<u16>, span: Span) -> Result<Function> {
        self.emit(Instruction::Return, span);
        if let Some(span) = self.unbalanced {
            return Err(EmitError::UnbalancedBlock { span });
        }
        if !self.markers.is_empty() {
            return Err(EmitError::UnbalancedBlock { span });
        }
        Ok(Function {
            name,
            params,
            chunk: self.compiled,
            spans: self.spans,
        })
    }
}

#[cfg(test)]
mod tests {
    use sxtl_interpreter::instruction::decode_instructions;

    use super::*;

    fn span() -> Span {
        Span::from(0..0)
    }

    #[test]
    fn test_constants_deduplicated_by_type() {
        let mut program = Program::new();
        let mut builder = FunctionBuilder::new(&mut program);
        assert_eq!(builder.add_constant(Constant::Int(1), span()), Ok(0));
        assert_eq!(builder.add_constant(Constant::Str("1".to_string()), span()), Ok(1));
        assert_eq!(builder.add_constant(Constant::Int(1), span()), Ok(0));
        assert_eq!(
            builder.add_constant(Constant::Float(1.0.into()), span()),
            Ok(2)
        );
    }

    #[test]
    fn test_patch_forward_jump() {
        let mut program = Program::new();
        let mut builder = FunctionBuilder::new(&mut program);
        let jump = builder.emit_jump_forward(JumpCondition::False, span());
        builder.emit(Instruction::Pop, span());
        builder.patch_jump(jump).unwrap();
        let function = builder.finish("main".to_string(), vec![], span()).unwrap();
        assert_eq!(
            decode_instructions(&function.chunk),
            Some(vec![
                (0, Instruction::JumpIfFalse(1)),
                (3, Instruction::Pop),
                (4, Instruction::Return),
            ])
        );
        assert_eq!(function.spans.len(), function.chunk.len());
    }

    #[test]
    fn test_loop_jumps() {
        let mut program = Program::new();
        let mut builder = FunctionBuilder::new(&mut program);
        builder.emit(Instruction::ForIterBegin, span());
        let start = builder.loop_start();
        let exit = builder.emit_for_iter_next(0, span());
        builder.emit_for_iter_end(start, span()).unwrap();
        builder.patch_jump(exit).unwrap();
        let function = builder.finish("main".to_string(), vec![], span()).unwrap();
        assert_eq!(
            decode_instructions(&function.chunk),
            Some(vec![
                (0, Instruction::ForIterBegin),
                (1, Instruction::ForIterNext(0, 3)),
                (6, Instruction::ForIterEnd(-8)),
                (9, Instruction::Return),
            ])
        );
    }

    #[test]
    fn test_unbalanced_end_marker() {
        let mut program = Program::new();
        let mut builder = FunctionBuilder::new(&mut program);
        builder.emit(Instruction::ScopeEnd, Span::from(3..5));
        assert_eq!(
            builder.finish("main".to_string(), vec![], span()),
            Err(EmitError::UnbalancedBlock {
                span: Span::from(3..5)
            })
        );
    }

    #[test]
    fn test_open_marker_at_function_end() {
        let mut program = Program::new();
        let mut builder = FunctionBuilder::new(&mut program);
        builder.emit(Instruction::ForIterBegin, span());
        builder.emit(Instruction::ScopeBegin, span());
        builder.emit(Instruction::ScopeEnd, span());
        assert_eq!(
            builder.finish("main".to_string(), vec![], Span::from(0..9)),
            Err(EmitError::UnbalancedBlock {
                span: Span::from(0..9)
            })
        );
    }

    #[test]
    fn test_jump_too_far() {
        let mut program = Program::new();
        let mut builder = FunctionBuilder::new(&mut program);
        let jump = builder.emit_jump_forward(JumpCondition::Always, Span::from(1..2));
        for _ in 0..40_000 {
            builder.emit(Instruction::Pop, span());
        }
        assert_eq!(
            builder.patch_jump(jump),
            Err(EmitError::JumpTooFar {
                span: Span::from(1..2)
            })
        );
    }
}
