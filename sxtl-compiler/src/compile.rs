use ahash::AHashMap;

use sxtl_ast::ast;
use sxtl_ast::Span;
use sxtl_interpreter::instruction::Instruction;
use sxtl_interpreter::{Constant, Function, Program};

use crate::builder::{ForwardJumpRef, FunctionBuilder, JumpCondition};
use crate::error::{EmitError, Result};
use crate::options::CompileOptions;
use crate::scope;

pub(crate) type Scopes = scope::Scopes<ast::Name>;

/// Compile a parsed template into a bytecode program.
///
/// Sub-template definitions are hoisted: each becomes a function of the
/// program wherever it appears in the template, in source order, followed
/// by the main function.
pub fn compile(template: &ast::Template, options: &CompileOptions) -> Result<Program> {
    let mut definitions = Vec::new();
    collect_definitions(&template.body, &mut definitions);
    let templates = Templates::new(&definitions)?;

    let mut program = Program::new();
    for definition in &definitions {
        let builder = FunctionBuilder::new(&mut program);
        let mut compiler = TemplateCompiler::new(builder, &templates, options);
        let params = definition
            .params
            .iter()
            .map(|param| {
                compiler.scopes.push_name(&param.value);
                compiler.builder.add_name(&param.value, param.span)
            })
            .collect::<Result<Vec<_>>>()?;
        compiler.compile_nodes(&definition.body)?;
        let function = compiler.finish(definition.name.value.clone(), params, definition.span)?;
        program.functions.push(function);
    }

    let builder = FunctionBuilder::new(&mut program);
    let mut compiler = TemplateCompiler::new(builder, &templates, options);
    compiler.compile_nodes(&template.body)?;
    let function = compiler.finish("main".to_string(), Vec::new(), template.span)?;
    program.functions.push(function);
    Ok(program)
}

struct Definition<'a> {
    name: &'a ast::NameS,
    params: &'a [ast::NameS],
    body: &'a [ast::NodeS],
    span: Span,
}

fn collect_definitions<'a>(nodes: &'a [ast::NodeS], definitions: &mut Vec<Definition<'a>>) {
    for node in nodes {
        match &node.value {
            ast::Node::Def(def) => {
                definitions.push(Definition {
                    name: &def.name,
                    params: &def.params,
                    body: &def.body,
                    span: node.span,
                });
                collect_definitions(&def.body, definitions);
            }
            ast::Node::If(if_) => {
                collect_definitions(&if_.then, definitions);
                collect_definitions(&if_.else_, definitions);
            }
            ast::Node::For(for_) => collect_definitions(&for_.body, definitions),
            _ => {}
        }
    }
}

// sub-template names to function ids
struct Templates<'a> {
    ids: AHashMap<&'a str, u16>,
}

impl<'a> Templates<'a> {
    fn new(definitions: &[Definition<'a>]) -> Result<Self> {
        let mut ids = AHashMap::new();
        for (i, definition) in definitions.iter().enumerate() {
            let name = definition.name;
            // the main function takes the last id
            let id = u16::try_from(i)
                .ok()
                .filter(|id| *id < u16::MAX)
                .ok_or(EmitError::TooMany {
                    what: "templates",
                    span: name.span,
                })?;
            if ids.insert(name.value.as_str(), id).is_some() {
                return Err(EmitError::DuplicateTemplate {
                    name: name.value.clone(),
                    span: name.span,
                });
            }
        }
        Ok(Templates { ids })
    }

    fn get(&self, name: &str) -> Option<u16> {
        self.ids.get(name).copied()
    }
}

#[derive(Default)]
struct LoopJumps {
    breaks: Vec<ForwardJumpRef>,
    continues: Vec<ForwardJumpRef>,
}

struct TemplateCompiler<'a> {
    builder: FunctionBuilder<'a>,
    scopes: Scopes,
    templates: &'a Templates<'a>,
    options: &'a CompileOptions,
    loops: Vec<LoopJumps>,
}

impl<'a> TemplateCompiler<'a> {
    fn new(
        builder: FunctionBuilder<'a>,
        templates: &'a Templates<'a>,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            builder,
            scopes: Scopes::new(),
            templates,
            options,
            loops: Vec::new(),
        }
    }

    fn finish(self, name: String, params: Vec<u16>, span: Span) -> Result<Function> {
        self.builder.finish(name, params, span)
    }

    fn compile_nodes(&mut self, nodes: &[ast::NodeS]) -> Result<()> {
        for node in nodes {
            self.compile_node(node)?;
        }
        Ok(())
    }

    fn compile_node(&mut self, node: &ast::NodeS) -> Result<()> {
        let span = node.span;
        match &node.value {
            ast::Node::Text(text) => {
                if !text.is_empty() {
                    self.builder
                        .emit_constant(Constant::Str(text.clone()), span)?;
                    self.builder.emit(Instruction::EmitText, span);
                }
                Ok(())
            }
            ast::Node::Output(output) => {
                self.compile_expr(&output.expr)?;
                let instruction = if output.escape {
                    Instruction::EmitEscaped
                } else {
                    Instruction::EmitText
                };
                self.builder.emit(instruction, span);
                Ok(())
            }
            ast::Node::If(if_) => self.compile_if(if_, span),
            ast::Node::For(for_) => self.compile_for(for_, span),
            ast::Node::Assign(assign) => self.compile_assign(assign, span),
            // compiled separately as functions
            ast::Node::Def(_) => Ok(()),
            ast::Node::Render(render) => self.compile_render(render, span),
            ast::Node::Break => {
                let jump = self.builder.emit_for_iter_break(span);
                self.current_loop(span)?.breaks.push(jump);
                Ok(())
            }
            ast::Node::Continue => {
                let jump = self.builder.emit_jump_forward(JumpCondition::Always, span);
                self.current_loop(span)?.continues.push(jump);
                Ok(())
            }
        }
    }

    fn current_loop(&mut self, span: Span) -> Result<&mut LoopJumps> {
        self.loops
            .last_mut()
            .ok_or(EmitError::UnbalancedBlock { span })
    }

    fn compile_if(&mut self, if_: &ast::If, span: Span) -> Result<()> {
        self.compile_expr(&if_.condition)?;
        let jump_else = self.builder.emit_jump_forward(JumpCondition::False, span);
        self.compile_arm(&if_.then, span)?;
        if if_.else_.is_empty() {
            self.builder.patch_jump(jump_else)?;
        } else {
            let jump_end = self.builder.emit_jump_forward(JumpCondition::Always, span);
            self.builder.patch_jump(jump_else)?;
            self.compile_arm(&if_.else_, span)?;
            self.builder.patch_jump(jump_end)?;
        }
        Ok(())
    }

    fn compile_arm(&mut self, nodes: &[ast::NodeS], span: Span) -> Result<()> {
        self.builder.emit(Instruction::ScopeBegin, span);
        self.scopes.push_scope();
        self.compile_nodes(nodes)?;
        self.scopes.pop_scope();
        self.builder.emit(Instruction::ScopeEnd, span);
        Ok(())
    }

    fn compile_for(&mut self, for_: &ast::For, span: Span) -> Result<()> {
        self.compile_expr(&for_.iterable)?;
        self.builder.emit(Instruction::ForIterBegin, span);
        let name = self
            .builder
            .add_name(&for_.var_name.value, for_.var_name.span)?;
        let loop_start = self.builder.loop_start();
        let jump_exit = self.builder.emit_for_iter_next(name, span);

        self.scopes.push_scope();
        self.scopes.push_name(&for_.var_name.value);
        self.loops.push(LoopJumps::default());
        self.compile_nodes(&for_.body)?;
        let jumps = self.loops.pop().unwrap_or_default();
        self.scopes.pop_scope();

        for jump in jumps.continues {
            self.builder.patch_jump(jump)?;
        }
        self.builder.emit_for_iter_end(loop_start, span)?;
        self.builder.patch_jump(jump_exit)?;
        for jump in jumps.breaks {
            self.builder.patch_jump(jump)?;
        }
        Ok(())
    }

    fn compile_assign(&mut self, assign: &ast::Assign, span: Span) -> Result<()> {
        let name = &assign.name;
        if let Some(instruction) = assign.operator.binary().and_then(binary_instruction) {
            self.compile_variable(&name.value, name.span)?;
            self.compile_expr(&assign.value)?;
            self.builder.emit(instruction, span);
        } else {
            self.compile_expr(&assign.value)?;
        }
        let index = self.builder.add_name(&name.value, name.span)?;
        self.builder.emit(Instruction::StoreVar(index), span);
        self.scopes.assign(&name.value);
        Ok(())
    }

    fn compile_render(&mut self, render: &ast::Render, span: Span) -> Result<()> {
        let id = self
            .templates
            .get(&render.name.value)
            .ok_or_else(|| EmitError::UnknownTemplate {
                name: render.name.value.clone(),
                span: render.name.span,
            })?;
        let arity = self.compile_arguments(&render.arguments, span)?;
        self.builder.emit(Instruction::Render(id, arity), span);
        Ok(())
    }

    fn compile_arguments(&mut self, arguments: &[ast::ExprS], span: Span) -> Result<u8> {
        let arity = u8::try_from(arguments.len()).map_err(|_| EmitError::TooMany {
            what: "arguments",
            span,
        })?;
        for argument in arguments {
            self.compile_expr(argument)?;
        }
        Ok(arity)
    }

    fn compile_expr(&mut self, expr: &ast::ExprS) -> Result<()> {
        let span = expr.span;
        match &expr.value {
            ast::Expr::Literal(literal) => self.builder.emit_constant(constant(literal), span),
            ast::Expr::Var(name) => self.compile_variable(name, span),
            ast::Expr::List(items) => {
                let count = u16::try_from(items.len()).map_err(|_| EmitError::TooMany {
                    what: "list items",
                    span,
                })?;
                for item in items {
                    self.compile_expr(item)?;
                }
                self.builder.emit(Instruction::List(count), span);
                Ok(())
            }
            ast::Expr::Unary(unary) => {
                self.compile_expr(&unary.operand)?;
                let instruction = match unary.operator {
                    ast::UnaryOperator::Neg => Instruction::Neg,
                    ast::UnaryOperator::Not => Instruction::Not,
                };
                self.builder.emit(instruction, span);
                Ok(())
            }
            ast::Expr::Binary(binary) => self.compile_binary(binary, span),
            ast::Expr::Call(call) => self.compile_call(call, span),
            ast::Expr::Attr(attr) => {
                self.compile_expr(&attr.object)?;
                let name = self.builder.add_name(&attr.name.value, attr.name.span)?;
                self.builder.emit(Instruction::Attr(name), span);
                Ok(())
            }
            ast::Expr::Index(index) => {
                self.compile_expr(&index.object)?;
                self.compile_expr(&index.index)?;
                self.builder.emit(Instruction::Index, span);
                Ok(())
            }
        }
    }

    fn compile_variable(&mut self, name: &ast::Name, span: Span) -> Result<()> {
        if self.options.strict_variables()
            && !self.scopes.is_bound(name)
            && !self.options.is_global(name)
        {
            return Err(EmitError::UndefinedVariable {
                name: name.clone(),
                span,
            });
        }
        let index = self.builder.add_name(name, span)?;
        self.builder.emit(Instruction::LoadVar(index), span);
        Ok(())
    }

    fn compile_binary(&mut self, binary: &ast::BinaryExpr, span: Span) -> Result<()> {
        self.compile_expr(&binary.left)?;
        if binary.operator.is_short_circuit() {
            // `and` and `or` result in the operand that decides
            let condition = if binary.operator == ast::BinaryOperator::And {
                JumpCondition::FalseKeep
            } else {
                JumpCondition::TrueKeep
            };
            let jump_end = self.builder.emit_jump_forward(condition, span);
            self.compile_expr(&binary.right)?;
            return self.builder.patch_jump(jump_end);
        }
        self.compile_expr(&binary.right)?;
        if let Some(instruction) = binary_instruction(binary.operator) {
            self.builder.emit(instruction, span);
        }
        Ok(())
    }

    fn compile_call(&mut self, call: &ast::FunctionCall, span: Span) -> Result<()> {
        // `default(name, fallback)` tests the variable without requiring it
        // to be bound
        if let ("default", [variable, fallback]) = (call.name.value.as_str(), &call.arguments[..])
        {
            if let ast::Expr::Var(name) = &variable.value {
                let index = self.builder.add_name(name, variable.span)?;
                let jump_end = self.builder.emit_default_var(index, span);
                self.compile_expr(fallback)?;
                return self.builder.patch_jump(jump_end);
            }
        }
        let name = self.builder.add_name(&call.name.value, call.name.span)?;
        let arity = self.compile_arguments(&call.arguments, span)?;
        self.builder.emit(Instruction::CallFn(name, arity), span);
        Ok(())
    }
}

fn constant(literal: &ast::Literal) -> Constant {
    match literal {
        ast::Literal::None => Constant::None,
        ast::Literal::Bool(b) => Constant::Bool(*b),
        ast::Literal::Integer(i) => Constant::Int(*i),
        ast::Literal::Float(f) => Constant::Float(*f),
        ast::Literal::String(s) => Constant::Str(s.clone()),
    }
}

// `None` for the short-circuit operators, which compile to jumps
fn binary_instruction(operator: ast::BinaryOperator) -> Option<Instruction> {
    let instruction = match operator {
        ast::BinaryOperator::Add => Instruction::Add,
        ast::BinaryOperator::Sub => Instruction::Sub,
        ast::BinaryOperator::Mul => Instruction::Mul,
        ast::BinaryOperator::Div => Instruction::Div,
        ast::BinaryOperator::FloorDiv => Instruction::FloorDiv,
        ast::BinaryOperator::Mod => Instruction::Mod,
        ast::BinaryOperator::Eq => Instruction::Eq,
        ast::BinaryOperator::Ne => Instruction::Ne,
        ast::BinaryOperator::Lt => Instruction::Lt,
        ast::BinaryOperator::Le => Instruction::Le,
        ast::BinaryOperator::Gt => Instruction::Gt,
        ast::BinaryOperator::Ge => Instruction::Ge,
        ast::BinaryOperator::In => Instruction::In,
        ast::BinaryOperator::NotIn => Instruction::NotIn,
        ast::BinaryOperator::And | ast::BinaryOperator::Or => return None,
    };
    Some(instruction)
}
