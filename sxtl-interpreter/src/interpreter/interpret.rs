use std::cmp::Ordering;

use ahash::AHashMap;

use crate::error::{Error, RenderError, RenderResult, Result};
use crate::function::Function;
use crate::instruction::{decode_instruction, Instruction};
use crate::library;
use crate::value::{
    compare_values, op_add, op_attr, op_contains, op_div, op_floor_div, op_index, op_mod,
    op_multiply, op_negate, op_subtract, values_equal, xml_escape, Value,
};

use super::runnable::Runnable;
use super::state::State;

pub struct Interpreter<'a> {
    runnable: &'a Runnable<'a>,
    state: State,
    // the function and offset of the instruction being executed
    location: Option<(usize, usize)>,
}

impl<'a> Interpreter<'a> {
    pub fn new(runnable: &'a Runnable<'a>) -> Self {
        Interpreter {
            runnable,
            state: State::new(),
            location: None,
        }
    }

    pub fn state(self) -> State {
        self.state
    }

    /// Enter the main function.
    pub fn start(&mut self) -> RenderResult<()> {
        let main = self
            .runnable
            .program()
            .main_id()
            .ok_or(Error::InvalidProgram)?;
        self.state
            .push_frame(main, AHashMap::new())
            .map_err(RenderError::from)
    }

    pub fn run(&mut self) -> RenderResult<()> {
        // annotate run with the location of the failing instruction
        self.run_actual().map_err(|e| self.err(e))
    }

    fn run_actual(&mut self) -> Result<()> {
        let max_steps = self.runnable.renderer().max_steps();
        // every function ends with a return instruction, so this ends once
        // main returns
        loop {
            self.state.step(max_steps)?;
            let instruction = self.read_instruction()?;
            #[cfg(feature = "trace-stderr")]
            self.trace(&instruction);
            match instruction {
                Instruction::Const(index) => {
                    let value = self
                        .runnable
                        .constant(index)
                        .ok_or(Error::InvalidProgram)?;
                    self.state.push(value);
                }
                Instruction::LoadVar(name) => {
                    let value = self.lookup(name).ok_or_else(|| Error::UndefinedVariable {
                        name: self.name(name).unwrap_or_default().to_string(),
                    })?;
                    self.state.push(value);
                }
                Instruction::StoreVar(name) => {
                    let value = self.state.pop()?;
                    let global = self.runnable.context().contains(self.name(name)?);
                    self.state.store(name, value, global)?;
                }
                Instruction::DefaultVar(name, displacement) => {
                    if let Some(value) = self.lookup(name).filter(|value| !value.is_null()) {
                        self.state.push(value);
                        self.jump(displacement)?;
                    }
                }
                Instruction::Add => self.binary(op_add)?,
                Instruction::Sub => self.binary(op_subtract)?,
                Instruction::Mul => self.binary(op_multiply)?,
                Instruction::Div => self.binary(op_div)?,
                Instruction::FloorDiv => self.binary(op_floor_div)?,
                Instruction::Mod => self.binary(op_mod)?,
                Instruction::Eq => self.binary(|a, b| Ok(Value::Bool(values_equal(a, b))))?,
                Instruction::Ne => self.binary(|a, b| Ok(Value::Bool(!values_equal(a, b))))?,
                Instruction::Lt => self.compare(|ordering| ordering == Ordering::Less)?,
                Instruction::Le => self.compare(|ordering| ordering != Ordering::Greater)?,
                Instruction::Gt => self.compare(|ordering| ordering == Ordering::Greater)?,
                Instruction::Ge => self.compare(|ordering| ordering != Ordering::Less)?,
                Instruction::In => self.binary(|a, b| Ok(Value::Bool(op_contains(b, a)?)))?,
                Instruction::NotIn => self.binary(|a, b| Ok(Value::Bool(!op_contains(b, a)?)))?,
                Instruction::Not => {
                    let value = self.state.pop()?;
                    self.state.push(Value::Bool(!value.is_truthy()));
                }
                Instruction::Neg => {
                    let value = self.state.pop()?;
                    self.state.push(op_negate(&value)?);
                }
                Instruction::List(count) => {
                    let items = self.state.pop_many(count as usize)?;
                    self.state.push(Value::from(items));
                }
                Instruction::Attr(name) => {
                    let object = self.state.pop()?;
                    let value = op_attr(&object, self.name(name)?)?;
                    self.state.push(value);
                }
                Instruction::Index => {
                    let index = self.state.pop()?;
                    let object = self.state.pop()?;
                    self.state.push(op_index(&object, &index)?);
                }
                Instruction::CallFn(name, arity) => {
                    let name = self.name(name)?;
                    let builtin = library::lookup(name).ok_or_else(|| Error::UnknownFunction {
                        name: name.to_string(),
                    })?;
                    let arguments = self.state.pop_many(arity as usize)?;
                    self.state.push(builtin.call(&arguments)?);
                }
                Instruction::Render(index, arity) => {
                    self.render_function(index as usize, arity as usize)?;
                }
                Instruction::EmitText => {
                    let value = self.state.pop()?;
                    self.state.emit(&value.to_string());
                }
                Instruction::EmitEscaped => {
                    let value = self.state.pop()?;
                    self.state.emit(&xml_escape(&value.to_string()));
                }
                Instruction::Jump(displacement) => {
                    self.jump(displacement)?;
                }
                Instruction::JumpIfFalse(displacement) => {
                    if !self.state.pop()?.is_truthy() {
                        self.jump(displacement)?;
                    }
                }
                Instruction::JumpIfTrue(displacement) => {
                    if self.state.pop()?.is_truthy() {
                        self.jump(displacement)?;
                    }
                }
                Instruction::JumpIfFalseKeep(displacement) => {
                    if self.state.top()?.is_truthy() {
                        self.state.pop()?;
                    } else {
                        self.jump(displacement)?;
                    }
                }
                Instruction::JumpIfTrueKeep(displacement) => {
                    if self.state.top()?.is_truthy() {
                        self.jump(displacement)?;
                    } else {
                        self.state.pop()?;
                    }
                }
                Instruction::ScopeBegin => {
                    self.state.scope_begin();
                }
                Instruction::ScopeEnd => {
                    self.state.scope_end()?;
                }
                Instruction::ForIterBegin => {
                    let iterable = self.state.pop()?;
                    self.state.loop_begin(iterable.iterate()?);
                }
                Instruction::ForIterNext(name, exit) => {
                    if !self.state.loop_next(name)? {
                        self.jump(exit)?;
                    }
                }
                Instruction::ForIterEnd(back) => {
                    self.state.loop_iteration_end()?;
                    self.jump(back)?;
                }
                Instruction::ForIterBreak(exit) => {
                    self.state.loop_break()?;
                    self.jump(exit)?;
                }
                Instruction::Pop => {
                    self.state.pop()?;
                }
                Instruction::Return => {
                    if self.state.pop_frame() {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn render_function(&mut self, index: usize, arity: usize) -> Result<()> {
        let program = self.runnable.program();
        let function = program.functions.get(index).ok_or(Error::InvalidProgram)?;
        if function.arity() != arity {
            return Err(Error::ArityMismatch {
                name: function.name.clone(),
                found: arity,
            });
        }
        let arguments = self.state.pop_many(arity)?;
        let bindings = function.params.iter().copied().zip(arguments).collect();
        self.state.push_frame(index, bindings)
    }

    // Variables bound in the current function shadow the context globals.
    fn lookup(&self, name: u16) -> Option<Value> {
        if let Some(value) = self.state.lookup(name) {
            return Some(value.clone());
        }
        let name = self.runnable.program().names.get(name as usize)?;
        self.runnable.context().get(name).cloned()
    }

    fn binary<F>(&mut self, op: F) -> Result<()>
    where
        F: Fn(&Value, &Value) -> Result<Value>,
    {
        let b = self.state.pop()?;
        let a = self.state.pop()?;
        self.state.push(op(&a, &b)?);
        Ok(())
    }

    fn compare<F>(&mut self, accept: F) -> Result<()>
    where
        F: Fn(Ordering) -> bool,
    {
        // an unordered pair (involving NaN) compares false
        self.binary(|a, b| Ok(Value::Bool(compare_values(a, b)?.is_some_and(&accept))))
    }

    fn name(&self, index: u16) -> Result<&'a str> {
        self.runnable
            .program()
            .names
            .get(index as usize)
            .map(String::as_str)
            .ok_or(Error::InvalidProgram)
    }

    fn current_function(&self) -> Result<&'a Function> {
        let frame = self.state.frame().ok_or(Error::InvalidProgram)?;
        self.runnable
            .program()
            .functions
            .get(frame.function())
            .ok_or(Error::InvalidProgram)
    }

    fn read_instruction(&mut self) -> Result<Instruction> {
        let function = self.current_function()?;
        let frame = self.state.frame_mut()?;
        let bytes = function
            .chunk
            .get(frame.ip..)
            .ok_or(Error::InvalidProgram)?;
        let (instruction, size) = decode_instruction(bytes).ok_or(Error::InvalidProgram)?;
        self.location = Some((frame.function(), frame.ip));
        frame.ip += size;
        Ok(instruction)
    }

    // Displacements are relative to the end of the jumping instruction,
    // which is where the ip already points.
    fn jump(&mut self, displacement: i16) -> Result<()> {
        let frame = self.state.frame_mut()?;
        let target = frame.ip as i64 + displacement as i64;
        frame.ip = usize::try_from(target).map_err(|_| Error::JumpOutOfBounds)?;
        Ok(())
    }

    #[cfg(feature = "trace-stderr")]
    fn trace(&self, instruction: &Instruction) {
        if let Some((function, offset)) = self.location {
            let name = self
                .runnable
                .program()
                .functions
                .get(function)
                .map_or("?", |function| function.name.as_str());
            eprintln!("{}:{:>4} {:?}", name, offset, instruction);
        }
    }

    // The interpreter can fail on any instruction in any function. We wrap
    // the error code with the function, offset and span of that
    // instruction.
    pub(crate) fn err(&self, error: Error) -> RenderError {
        let Some((function, offset)) = self.location else {
            return error.into();
        };
        let function = self.runnable.program().functions.get(function);
        RenderError {
            error,
            function: function.map(|function| function.name.clone()),
            offset: Some(offset),
            span: function.and_then(|function| function.span(offset)),
        }
    }
}
