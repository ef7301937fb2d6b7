use ahash::AHashMap;
use arrayvec::ArrayVec;

use crate::error::{Error, Result};
use crate::value::Value;

const FRAMES_MAX: usize = 64;

type Scope = AHashMap<u16, Value>;

#[derive(Debug, Clone)]
pub(crate) struct Frame {
    function: usize,
    // the first scope and loop that belong to this call
    scope_base: usize,
    loop_base: usize,
    pub(crate) ip: usize,
}

impl Frame {
    pub(crate) fn function(&self) -> usize {
        self.function
    }
}

#[derive(Debug)]
struct Loop {
    items: Vec<Value>,
    position: usize,
    scope_depth: usize,
}

#[derive(Debug, Default)]
pub struct State {
    stack: Vec<Value>,
    scopes: Vec<Scope>,
    loops: Vec<Loop>,
    frames: ArrayVec<Frame, FRAMES_MAX>,
    output: String,
    steps: u64,
}

impl State {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or(Error::InvalidProgram)
    }

    pub(crate) fn top(&self) -> Result<&Value> {
        self.stack.last().ok_or(Error::InvalidProgram)
    }

    /// Pop the top `count` values, in push order.
    pub(crate) fn pop_many(&mut self, count: usize) -> Result<Vec<Value>> {
        let start = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(Error::InvalidProgram)?;
        Ok(self.stack.split_off(start))
    }

    /// Enter a function, with its parameters bound in a fresh scope.
    pub(crate) fn push_frame(&mut self, function: usize, bindings: Scope) -> Result<()> {
        let frame = Frame {
            function,
            scope_base: self.scopes.len(),
            loop_base: self.loops.len(),
            ip: 0,
        };
        self.frames
            .try_push(frame)
            .map_err(|_| Error::StackOverflow)?;
        self.scopes.push(bindings);
        Ok(())
    }

    /// Leave the current function. Returns `true` when it was the last one.
    pub(crate) fn pop_frame(&mut self) -> bool {
        match self.frames.pop() {
            Some(frame) => {
                self.scopes.truncate(frame.scope_base);
                self.loops.truncate(frame.loop_base);
                self.frames.is_empty()
            }
            None => true,
        }
    }

    pub(crate) fn frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or(Error::InvalidProgram)
    }

    fn scope_base(&self) -> usize {
        self.frames.last().map_or(0, |frame| frame.scope_base)
    }

    pub(crate) fn scope_begin(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub(crate) fn scope_end(&mut self) -> Result<()> {
        if self.scopes.len() <= self.scope_base() + 1 {
            return Err(Error::InvalidProgram);
        }
        self.scopes.pop();
        Ok(())
    }

    /// The innermost binding of a name visible to the current function.
    pub(crate) fn lookup(&self, name: u16) -> Option<&Value> {
        self.scopes
            .get(self.scope_base()..)?
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name))
    }

    /// Assign to a name: the nearest existing binding is rebound, otherwise
    /// the name is bound in the function's base scope when `global` or in
    /// the innermost scope.
    pub(crate) fn store(&mut self, name: u16, value: Value, global: bool) -> Result<()> {
        let base = self.scope_base();
        let scopes = self.scopes.get_mut(base..).ok_or(Error::InvalidProgram)?;
        if let Some(scope) = scopes.iter_mut().rev().find(|scope| scope.contains_key(&name)) {
            scope.insert(name, value);
            return Ok(());
        }
        let scope = if global {
            scopes.first_mut()
        } else {
            scopes.last_mut()
        };
        scope.ok_or(Error::InvalidProgram)?.insert(name, value);
        Ok(())
    }

    pub(crate) fn loop_begin(&mut self, items: Vec<Value>) {
        self.loops.push(Loop {
            items,
            position: 0,
            scope_depth: self.scopes.len(),
        });
    }

    // The innermost loop, which must have been started by the current
    // function inside its own scopes.
    fn current_loop(&self) -> Result<usize> {
        let index = self.loops.len().checked_sub(1).ok_or(Error::InvalidProgram)?;
        let loop_base = self.frames.last().map_or(0, |frame| frame.loop_base);
        if index < loop_base || self.loops[index].scope_depth <= self.scope_base() {
            return Err(Error::InvalidProgram);
        }
        Ok(index)
    }

    /// Bind the next item of the innermost loop in a fresh iteration scope.
    /// Returns `false` and ends the loop once all items are visited.
    pub(crate) fn loop_next(&mut self, name: u16) -> Result<bool> {
        let index = self.current_loop()?;
        let current = &mut self.loops[index];
        self.scopes.truncate(current.scope_depth);
        if let Some(item) = current.items.get(current.position) {
            let mut scope = Scope::new();
            scope.insert(name, item.clone());
            current.position += 1;
            self.scopes.push(scope);
            Ok(true)
        } else {
            self.loops.pop();
            Ok(false)
        }
    }

    /// Drop the iteration scope of the innermost loop.
    pub(crate) fn loop_iteration_end(&mut self) -> Result<()> {
        let index = self.current_loop()?;
        self.scopes.truncate(self.loops[index].scope_depth);
        Ok(())
    }

    /// Leave the innermost loop early.
    pub(crate) fn loop_break(&mut self) -> Result<()> {
        self.current_loop()?;
        if let Some(current) = self.loops.pop() {
            self.scopes.truncate(current.scope_depth);
        }
        Ok(())
    }

    pub(crate) fn emit(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Count an executed instruction against the budget.
    pub(crate) fn step(&mut self, max_steps: Option<u64>) -> Result<()> {
        self.steps += 1;
        match max_steps {
            Some(max_steps) if self.steps > max_steps => Err(Error::StepLimitExceeded),
            _ => Ok(()),
        }
    }

    pub(crate) fn output(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_innermost_first() {
        let mut state = State::new();
        state.push_frame(0, Scope::new()).unwrap();
        state.store(0, Value::Int(1), false).unwrap();
        state.scope_begin();
        state.store(1, Value::Int(2), false).unwrap();
        // rebinds the outer binding
        state.store(0, Value::Int(3), false).unwrap();
        state.scope_end().unwrap();
        assert_eq!(state.lookup(0), Some(&Value::Int(3)));
        assert_eq!(state.lookup(1), None);
    }

    #[test]
    fn test_global_store_goes_to_base_scope() {
        let mut state = State::new();
        state.push_frame(0, Scope::new()).unwrap();
        state.scope_begin();
        state.store(0, Value::Int(1), true).unwrap();
        state.scope_end().unwrap();
        assert_eq!(state.lookup(0), Some(&Value::Int(1)));
    }

    #[test]
    fn test_frames_isolate_scopes() {
        let mut state = State::new();
        state.push_frame(1, Scope::new()).unwrap();
        state.store(0, Value::Int(1), false).unwrap();
        state.push_frame(0, Scope::new()).unwrap();
        assert_eq!(state.lookup(0), None);
        assert!(!state.pop_frame());
        assert_eq!(state.lookup(0), Some(&Value::Int(1)));
    }

    #[test]
    fn test_loop_iteration_scopes() {
        let mut state = State::new();
        state.push_frame(0, Scope::new()).unwrap();
        state.loop_begin(vec![Value::Int(1), Value::Int(2)]);
        assert!(state.loop_next(0).unwrap());
        state.store(1, Value::Int(10), false).unwrap();
        state.loop_iteration_end().unwrap();
        assert!(state.loop_next(0).unwrap());
        assert_eq!(state.lookup(0), Some(&Value::Int(2)));
        assert_eq!(state.lookup(1), None);
        state.loop_iteration_end().unwrap();
        assert!(!state.loop_next(0).unwrap());
        assert_eq!(state.lookup(0), None);
    }

    #[test]
    fn test_loop_of_caller_is_not_visible() {
        let mut state = State::new();
        state.push_frame(1, Scope::new()).unwrap();
        state.loop_begin(vec![Value::Int(1)]);
        assert!(state.loop_next(0).unwrap());
        state.push_frame(0, Scope::new()).unwrap();
        assert_eq!(state.loop_next(0), Err(Error::InvalidProgram));
        assert_eq!(state.loop_iteration_end(), Err(Error::InvalidProgram));
        assert_eq!(state.loop_break(), Err(Error::InvalidProgram));
        assert!(!state.pop_frame());
        assert_eq!(state.lookup(0), Some(&Value::Int(1)));
    }

    #[test]
    fn test_stack_overflow() {
        let mut state = State::new();
        for _ in 0..FRAMES_MAX {
            state.push_frame(0, Scope::new()).unwrap();
        }
        assert_eq!(
            state.push_frame(0, Scope::new()),
            Err(Error::StackOverflow)
        );
    }

    #[test]
    fn test_step_limit() {
        let mut state = State::new();
        assert_eq!(state.step(Some(1)), Ok(()));
        assert_eq!(state.step(Some(1)), Err(Error::StepLimitExceeded));
        assert_eq!(state.step(None), Ok(()));
    }
}
