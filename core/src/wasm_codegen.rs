/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Funny Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

use crate::ast::{
    ArithOp, AssignKind, Assignment, CompareOp, Condition, Expr, FunctionCall, FunctionDef, LogicOp,
    Module, Statement,
};
use crate::checker::LENGTH_BUILTIN;
use crate::config::CodegenOptions;
use crate::types::VarType;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, instrument};
use wasm_encoder::{
    BlockType, CodeSection, ExportKind, ExportSection, Function, FunctionSection, Instruction, MemArg,
    MemorySection, MemoryType, TypeSection, ValType,
};

// =============================================================================
// Error Types
// =============================================================================

/// Internal failure of the code generator. On a validated module these only
/// signal a broken checker/codegen contract or an unsupported construct.
#[derive(Debug, Clone)]
pub struct WasmCompileError {
    pub message: String,
    pub context: String,
}

impl WasmCompileError {
    fn new(message: impl Into<String>, context: &str) -> Self {
        WasmCompileError {
            message: message.into(),
            context: context.to_string(),
        }
    }
}

impl fmt::Display for WasmCompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WASM compile error: {} ({})", self.message, self.context)
    }
}

impl std::error::Error for WasmCompileError {}

// =============================================================================
// Value Representation
// =============================================================================

// Every Funny value is an i32. An `int[]` value is the byte address of
// element 0 in memory 0; element i lives at base + 4 * i.
const ELEMENT_SIZE: i32 = 4;

const WORD: MemArg = MemArg {
    offset: 0,
    align: 2,
    memory_index: 0,
};

/// Export name of linear memory.
pub const MEMORY_EXPORT: &str = "memory";

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    pub bytes: Vec<u8>,
    /// Exported function names, in function index order.
    pub exports: Vec<String>,
    /// SHA-256 of `bytes`, hex encoded.
    pub digest: String,
}

// =============================================================================
// Scope & Local Variable Tracking
// =============================================================================

/// Variable name → local slot. Parameters, returns and locals share one
/// numbering: parameters first, then returns, then locals.
#[derive(Debug, Clone)]
struct LocalScope {
    slots: HashMap<String, (u32, VarType)>,
    param_count: u32,
    slot_count: u32,
}

impl LocalScope {
    fn for_function(func: &FunctionDef) -> Self {
        let mut slots = HashMap::new();
        let mut next = 0u32;
        for decl in func.declarations() {
            slots.insert(decl.name.clone(), (next, decl.var_type));
            next += 1;
        }
        LocalScope {
            slots,
            param_count: func.parameters.len() as u32,
            slot_count: next,
        }
    }

    fn slot(&self, name: &str) -> Result<u32, WasmCompileError> {
        self.slots
            .get(name)
            .map(|(idx, _)| *idx)
            .ok_or_else(|| WasmCompileError::new(format!("Undefined var '{}'", name), "LocalScope::slot"))
    }

    fn array_slot(&self, name: &str) -> Result<u32, WasmCompileError> {
        match self.slots.get(name) {
            Some((idx, VarType::IntArray)) => Ok(*idx),
            _ => Err(WasmCompileError::new(
                format!("Undefined array '{}'", name),
                "LocalScope::array_slot",
            )),
        }
    }

    /// Locals declared in the code section (returns and locals).
    fn extra_local_count(&self) -> u32 {
        self.slot_count.saturating_sub(self.param_count)
    }
}

// =============================================================================
// Function Compilation Context
// =============================================================================

struct FuncContext {
    scope: LocalScope,
    instructions: Vec<Instruction<'static>>,
}

impl FuncContext {
    fn new(func: &FunctionDef) -> Self {
        Self {
            scope: LocalScope::for_function(func),
            instructions: Vec::new(),
        }
    }

    fn emit(&mut self, instr: Instruction<'static>) {
        self.instructions.push(instr);
    }

    /// Leaves `base + 4 * index` on the stack.
    fn emit_element_address(
        &mut self,
        array: &str,
        index: &Expr,
        func_map: &HashMap<String, Callee>,
    ) -> Result<(), WasmCompileError> {
        let base = self.scope.array_slot(array)?;
        self.emit(Instruction::LocalGet(base));
        WasmCodegen::compile_expr(self, index, func_map)?;
        self.emit(Instruction::I32Const(ELEMENT_SIZE));
        self.emit(Instruction::I32Mul);
        self.emit(Instruction::I32Add);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Callee {
    index: u32,
    results: usize,
}

// =============================================================================
// WASM Code Generator
// =============================================================================

/// Lowers a validated Funny module to a WebAssembly binary. Contracts are
/// ignored.
pub struct WasmCodegen {
    options: CodegenOptions,
    /// Type section: one signature per function, same index
    types: Vec<(Vec<ValType>, Vec<ValType>)>,
    /// Functions: (type_index, name, func_context)
    functions: Vec<(u32, String, FuncContext)>,
    func_index_map: HashMap<String, Callee>,
}

impl Default for WasmCodegen {
    fn default() -> Self {
        Self::new(CodegenOptions::default())
    }
}

impl WasmCodegen {
    pub fn new(options: CodegenOptions) -> Self {
        Self {
            options,
            types: Vec::new(),
            functions: Vec::new(),
            func_index_map: HashMap::new(),
        }
    }

    // =========================================================================
    // Public API
    // =========================================================================

    #[instrument(level = "info", skip_all, fields(functions = module.functions.len()))]
    pub fn compile(self, module: &Module) -> Result<CompiledModule, WasmCompileError> {
        let codegen = self.lower(module)?;
        let bytes = codegen.emit_module();

        if codegen.options.validate_output {
            wasmparser::Validator::new()
                .validate_all(&bytes)
                .map_err(|e| WasmCompileError::new(e.to_string(), "WasmCodegen::validate"))?;
        }

        let exports = codegen.functions.iter().map(|(_, name, _)| name.clone()).collect();
        let digest = hex::encode(Sha256::digest(&bytes));
        info!(bytes = bytes.len(), digest = %digest, "module emitted");

        Ok(CompiledModule { bytes, exports, digest })
    }

    /// Compile with default options and return only the raw bytes.
    pub fn compile_to_bytes(module: &Module) -> Result<Vec<u8>, WasmCompileError> {
        Self::default().compile(module).map(|compiled| compiled.bytes)
    }

    /// Signatures first, then bodies, so calls may go forward.
    fn lower(mut self, module: &Module) -> Result<Self, WasmCompileError> {
        for func in &module.functions {
            self.register_function(func)?;
        }
        self.compile_collected_functions(module)?;
        Ok(self)
    }

    fn register_function(&mut self, func: &FunctionDef) -> Result<(), WasmCompileError> {
        if self.options.export_memory && func.name == MEMORY_EXPORT {
            return Err(WasmCompileError::new(
                format!("Function '{}' clashes with the exported linear memory", func.name),
                "WasmCodegen::register_function",
            ));
        }

        let func_idx = self.functions.len() as u32;
        let callee = Callee {
            index: func_idx,
            results: func.returns.len(),
        };
        if self.func_index_map.insert(func.name.clone(), callee).is_some() {
            return Err(WasmCompileError::new(
                format!("Duplicate function '{}'", func.name),
                "WasmCodegen::register_function",
            ));
        }

        let params = vec![ValType::I32; func.parameters.len()];
        let results = vec![ValType::I32; func.returns.len()];
        let type_idx = self.types.len() as u32;
        self.types.push((params, results));

        self.functions.push((type_idx, func.name.clone(), FuncContext::new(func)));
        Ok(())
    }

    // =========================================================================
    // Function Body Compilation
    // =========================================================================

    fn compile_collected_functions(&mut self, module: &Module) -> Result<(), WasmCompileError> {
        let func_map = &self.func_index_map;

        for (func, (_, _, ctx)) in module.functions.iter().zip(self.functions.iter_mut()) {
            Self::compile_stmt(ctx, &func.body, func_map)?;

            // Results are the return slots, in declared order.
            for ret in &func.returns {
                let idx = ctx.scope.slot(&ret.name)?;
                ctx.emit(Instruction::LocalGet(idx));
            }
            ctx.emit(Instruction::End);

            debug!(
                function = %func.name,
                locals = ctx.scope.extra_local_count(),
                instructions = ctx.instructions.len(),
                "function lowered"
            );
        }
        Ok(())
    }

    fn compile_stmt(
        ctx: &mut FuncContext,
        stmt: &Statement,
        func_map: &HashMap<String, Callee>,
    ) -> Result<(), WasmCompileError> {
        match stmt {
            Statement::Block { statements } => {
                for s in statements {
                    Self::compile_stmt(ctx, s, func_map)?;
                }
                Ok(())
            }

            Statement::Assign(assign) => Self::compile_assign(ctx, assign, func_map),

            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                Self::compile_condition(ctx, condition, func_map)?;
                ctx.emit(Instruction::If(BlockType::Empty));
                Self::compile_stmt(ctx, then_branch, func_map)?;
                if let Some(else_branch) = else_branch {
                    ctx.emit(Instruction::Else);
                    Self::compile_stmt(ctx, else_branch, func_map)?;
                }
                ctx.emit(Instruction::End);
                Ok(())
            }

            // block
            //   loop
            //     condition
            //     i32.eqz
            //     br_if 1
            //     body
            //     br 0
            //   end
            // end
            Statement::While { condition, body, .. } => {
                ctx.emit(Instruction::Block(BlockType::Empty));
                ctx.emit(Instruction::Loop(BlockType::Empty));

                // A literal `true` loop has no way out.
                if !matches!(condition, Condition::Bool { value: true }) {
                    Self::compile_condition(ctx, condition, func_map)?;
                    ctx.emit(Instruction::I32Eqz);
                    ctx.emit(Instruction::BrIf(1));
                }

                Self::compile_stmt(ctx, body, func_map)?;

                ctx.emit(Instruction::Br(0));
                ctx.emit(Instruction::End);
                ctx.emit(Instruction::End);
                Ok(())
            }

            Statement::Call { call } => {
                let results = Self::compile_call(ctx, call, func_map)?;
                for _ in 0..results {
                    ctx.emit(Instruction::Drop);
                }
                Ok(())
            }
        }
    }

    fn compile_assign(
        ctx: &mut FuncContext,
        assign: &Assignment,
        func_map: &HashMap<String, Callee>,
    ) -> Result<(), WasmCompileError> {
        let first_target = || {
            assign
                .targets
                .first()
                .ok_or_else(|| WasmCompileError::new("Assignment without target", "compile_assign"))
        };

        match assign.kind {
            AssignKind::Simple => {
                let idx = ctx.scope.slot(first_target()?)?;
                Self::compile_expr(ctx, &assign.value, func_map)?;
                ctx.emit(Instruction::LocalSet(idx));
                Ok(())
            }
            AssignKind::Array => {
                let index = assign
                    .indices
                    .first()
                    .ok_or_else(|| WasmCompileError::new("Array assignment without index", "compile_assign"))?;
                ctx.emit_element_address(first_target()?, index, func_map)?;
                Self::compile_expr(ctx, &assign.value, func_map)?;
                ctx.emit(Instruction::I32Store(WORD));
                Ok(())
            }
            AssignKind::Tuple => {
                let call = match &assign.value {
                    Expr::Call(call) => call,
                    _ => {
                        return Err(WasmCompileError::new(
                            "Tuple assignment requires a function call",
                            "compile_assign",
                        ))
                    }
                };
                let results = Self::compile_call(ctx, call, func_map)?;
                if results != assign.targets.len() {
                    return Err(WasmCompileError::new(
                        format!(
                            "Function '{}' returns {} value(s), {} target(s) given",
                            call.name,
                            results,
                            assign.targets.len()
                        ),
                        "compile_assign",
                    ));
                }
                // The last result is on top of the stack.
                for target in assign.targets.iter().rev() {
                    let idx = ctx.scope.slot(target)?;
                    ctx.emit(Instruction::LocalSet(idx));
                }
                Ok(())
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn compile_expr(
        ctx: &mut FuncContext,
        expr: &Expr,
        func_map: &HashMap<String, Callee>,
    ) -> Result<(), WasmCompileError> {
        match expr {
            Expr::Num { value } => {
                ctx.emit(Instruction::I32Const(*value));
                Ok(())
            }
            Expr::Var { name } => {
                let idx = ctx.scope.slot(name)?;
                ctx.emit(Instruction::LocalGet(idx));
                Ok(())
            }
            Expr::Binary { op, left, right } => {
                Self::compile_expr(ctx, left, func_map)?;
                Self::compile_expr(ctx, right, func_map)?;
                ctx.emit(match op {
                    ArithOp::Add => Instruction::I32Add,
                    ArithOp::Sub => Instruction::I32Sub,
                    ArithOp::Mul => Instruction::I32Mul,
                    // Traps on a zero divisor and on i32::MIN / -1.
                    ArithOp::Div => Instruction::I32DivS,
                });
                Ok(())
            }
            Expr::Neg { argument } => {
                ctx.emit(Instruction::I32Const(-1));
                Self::compile_expr(ctx, argument, func_map)?;
                ctx.emit(Instruction::I32Mul);
                Ok(())
            }
            Expr::ArrayAccess { name, index } => {
                ctx.emit_element_address(name, index, func_map)?;
                ctx.emit(Instruction::I32Load(WORD));
                Ok(())
            }
            Expr::Call(call) => {
                let results = Self::compile_call(ctx, call, func_map)?;
                if results != 1 {
                    return Err(WasmCompileError::new(
                        format!("Call to '{}' yields {} values in expression", call.name, results),
                        "compile_expr",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Pushes the arguments left to right, then calls. Returns the number of
    /// results left on the stack.
    fn compile_call(
        ctx: &mut FuncContext,
        call: &FunctionCall,
        func_map: &HashMap<String, Callee>,
    ) -> Result<usize, WasmCompileError> {
        if call.name == LENGTH_BUILTIN {
            return Err(WasmCompileError::new(
                format!("Builtin '{}' is not supported by the WebAssembly backend", LENGTH_BUILTIN),
                "compile_call",
            ));
        }

        let callee = *func_map
            .get(&call.name)
            .ok_or_else(|| WasmCompileError::new(format!("Unknown function '{}'", call.name), "compile_call"))?;

        for arg in &call.args {
            Self::compile_expr(ctx, arg, func_map)?;
        }
        ctx.emit(Instruction::Call(callee.index));
        Ok(callee.results)
    }

    // =========================================================================
    // Conditions
    // =========================================================================

    /// Leaves 0 or 1 on the stack.
    fn compile_condition(
        ctx: &mut FuncContext,
        cond: &Condition,
        func_map: &HashMap<String, Callee>,
    ) -> Result<(), WasmCompileError> {
        match cond {
            Condition::Bool { value } => {
                ctx.emit(Instruction::I32Const(*value as i32));
                Ok(())
            }
            Condition::Comp(comp) => {
                Self::compile_expr(ctx, &comp.left, func_map)?;
                Self::compile_expr(ctx, &comp.right, func_map)?;
                ctx.emit(match comp.op {
                    CompareOp::Eq => Instruction::I32Eq,
                    CompareOp::Ne => Instruction::I32Ne,
                    CompareOp::Lt => Instruction::I32LtS,
                    CompareOp::Le => Instruction::I32LeS,
                    CompareOp::Gt => Instruction::I32GtS,
                    CompareOp::Ge => Instruction::I32GeS,
                });
                Ok(())
            }
            Condition::Not { argument } => {
                Self::compile_condition(ctx, argument, func_map)?;
                ctx.emit(Instruction::I32Eqz);
                Ok(())
            }
            // Value-selecting `if`: only one side runs.
            //   and: if l then r else 0
            //   or:  if l then 1 else r
            //   ->:  if l then r else 1
            Condition::BinCond { op, left, right } => {
                Self::compile_condition(ctx, left, func_map)?;
                ctx.emit(Instruction::If(BlockType::Result(ValType::I32)));
                match op {
                    LogicOp::And => {
                        Self::compile_condition(ctx, right, func_map)?;
                        ctx.emit(Instruction::Else);
                        ctx.emit(Instruction::I32Const(0));
                    }
                    LogicOp::Or => {
                        ctx.emit(Instruction::I32Const(1));
                        ctx.emit(Instruction::Else);
                        Self::compile_condition(ctx, right, func_map)?;
                    }
                    LogicOp::Implies => {
                        Self::compile_condition(ctx, right, func_map)?;
                        ctx.emit(Instruction::Else);
                        ctx.emit(Instruction::I32Const(1));
                    }
                }
                ctx.emit(Instruction::End);
                Ok(())
            }
        }
    }

    // =========================================================================
    // Module Emission
    // =========================================================================

    fn emit_module(&self) -> Vec<u8> {
        let mut module = wasm_encoder::Module::new();

        // --- Type Section ---
        let mut types = TypeSection::new();
        for (params, results) in &self.types {
            types.ty().function(params.clone(), results.clone());
        }
        module.section(&types);

        // --- Function Section ---
        let mut functions = FunctionSection::new();
        for (type_idx, _, _) in &self.functions {
            functions.function(*type_idx);
        }
        module.section(&functions);

        // --- Memory Section ---
        let mut memories = MemorySection::new();
        memories.memory(MemoryType {
            minimum: self.options.memory_pages,
            maximum: self.options.max_memory_pages,
            memory64: false,
            shared: false,
            page_size_log2: None,
        });
        module.section(&memories);

        // --- Export Section ---
        let mut exports = ExportSection::new();
        if self.options.export_memory {
            exports.export(MEMORY_EXPORT, ExportKind::Memory, 0);
        }
        for (i, (_, name, _)) in self.functions.iter().enumerate() {
            exports.export(name, ExportKind::Func, i as u32);
        }
        module.section(&exports);

        // --- Code Section ---
        let mut codes = CodeSection::new();
        for (_, _, ctx) in &self.functions {
            let extra_locals = ctx.scope.extra_local_count();
            let locals: Vec<(u32, ValType)> = if extra_locals > 0 {
                vec![(extra_locals, ValType::I32)]
            } else {
                vec![]
            };
            let mut func = Function::new(locals);
            for instr in &ctx.instructions {
                func.instruction(instr);
            }
            codes.function(&func);
        }
        module.section(&codes);

        module.finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
