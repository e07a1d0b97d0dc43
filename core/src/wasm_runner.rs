/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * Wasmtime host adapter for compiled Funny modules.
 *
 * Funny binaries import nothing. Every export is a function over i32 values,
 * plus (by default) the linear memory under `memory`, through which the host
 * hands over arrays: an `int[]` argument is the byte address of element 0.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 */

use crate::wasm_codegen::MEMORY_EXPORT;
use std::fmt;
use tracing::debug;
use wasmtime::{Engine, Instance, Linker, Memory, Module, Store, Trap, Val};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Clone)]
pub struct WasmRunError {
    pub message: String,
    pub context: String,
}

impl fmt::Display for WasmRunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.context, self.message)
    }
}

impl std::error::Error for WasmRunError {}

impl WasmRunError {
    /// True when the guest trapped (divide by zero, out-of-bounds access, ...).
    pub fn is_trap(&self) -> bool {
        self.context.ends_with("trap")
    }
}

// =============================================================================
// Instance
// =============================================================================

/// One instantiated Funny module with its own store.
pub struct FunnyInstance {
    store: Store<()>,
    instance: Instance,
    memory: Option<Memory>,
}

impl FunnyInstance {
    pub fn instantiate(bytes: &[u8]) -> Result<Self, WasmRunError> {
        let engine = Engine::default();
        let module = Module::from_binary(&engine, bytes).map_err(|e| WasmRunError {
            message: format!("Failed to load WASM module: {}", e),
            context: "instantiate::load".to_string(),
        })?;

        let linker = Linker::<()>::new(&engine);
        let mut store = Store::new(&engine, ());

        let instance = linker.instantiate(&mut store, &module).map_err(|e| WasmRunError {
            message: format!("Failed to instantiate: {}", e),
            context: "instantiate::link".to_string(),
        })?;
        let memory = instance.get_memory(&mut store, MEMORY_EXPORT);

        Ok(FunnyInstance {
            store,
            instance,
            memory,
        })
    }

    /// Names of the exported functions, in export order.
    pub fn exported_functions(&mut self) -> Vec<String> {
        self.instance
            .exports(&mut self.store)
            .filter_map(|export| {
                let name = export.name().to_string();
                export.into_func().map(|_| name)
            })
            .collect()
    }

    /// Call export `name`. Returns one value per declared return, in order.
    pub fn call(&mut self, name: &str, args: &[i32]) -> Result<Vec<i32>, WasmRunError> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| WasmRunError {
                message: format!("Export '{}' not found", name),
                context: "call::get_func".to_string(),
            })?;

        let func_type = func.ty(&self.store);
        if func_type.params().len() != args.len() {
            return Err(WasmRunError {
                message: format!(
                    "Function '{}' expects {} argument(s), got {}",
                    name,
                    func_type.params().len(),
                    args.len()
                ),
                context: "call::arity".to_string(),
            });
        }

        let params: Vec<Val> = args.iter().map(|&v| Val::I32(v)).collect();
        let mut results = vec![Val::I32(0); func_type.results().len()];

        func.call(&mut self.store, &params, &mut results)
            .map_err(|e| match e.downcast_ref::<Trap>() {
                Some(trap) => WasmRunError {
                    message: format!("Call to '{}' trapped: {}", name, trap),
                    context: "call::trap".to_string(),
                },
                None => WasmRunError {
                    message: format!("Call to '{}' failed: {}", name, e),
                    context: "call::invoke".to_string(),
                },
            })?;

        debug!(function = name, args = ?args, results = results.len(), "export called");

        results
            .iter()
            .map(|val| {
                val.i32().ok_or_else(|| WasmRunError {
                    message: format!("Function '{}' returned a non-i32 value", name),
                    context: "call::results".to_string(),
                })
            })
            .collect()
    }

    fn memory(&self) -> Result<Memory, WasmRunError> {
        self.memory.ok_or_else(|| WasmRunError {
            message: format!("Module does not export '{}'", MEMORY_EXPORT),
            context: "memory".to_string(),
        })
    }

    /// Store `values` as consecutive little-endian i32s starting at `addr`.
    pub fn write_array(&mut self, addr: u32, values: &[i32]) -> Result<(), WasmRunError> {
        let memory = self.memory()?;
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        memory
            .write(&mut self.store, addr as usize, &bytes)
            .map_err(|e| WasmRunError {
                message: format!("Cannot write {} element(s) at {}: {}", values.len(), addr, e),
                context: "write_array".to_string(),
            })
    }

    pub fn read_array(&self, addr: u32, len: usize) -> Result<Vec<i32>, WasmRunError> {
        let memory = self.memory()?;
        let mut bytes = vec![0u8; len * 4];
        memory
            .read(&self.store, addr as usize, &mut bytes)
            .map_err(|e| WasmRunError {
                message: format!("Cannot read {} element(s) at {}: {}", len, addr, e),
                context: "read_array".to_string(),
            })?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Current size of linear memory in bytes; 0 without an exported memory.
    pub fn memory_size(&self) -> usize {
        self.memory.map(|m| m.data_size(&self.store)).unwrap_or(0)
    }
}

/// Instantiate `bytes` and call one export.
pub fn call_exported(bytes: &[u8], name: &str, args: &[i32]) -> Result<Vec<i32>, WasmRunError> {
    FunnyInstance::instantiate(bytes)?.call(name, args)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArithOp, CompareOp, Condition, Expr, FunctionDef, Statement, VarDecl};
    use crate::wasm_codegen::WasmCodegen;

    fn compile(functions: Vec<FunctionDef>) -> Vec<u8> {
        WasmCodegen::compile_to_bytes(&crate::ast::Module { functions }).expect("compile failed")
    }

    fn func(
        name: &str,
        parameters: Vec<VarDecl>,
        returns: Vec<VarDecl>,
        locals: Vec<VarDecl>,
        body: Vec<Statement>,
    ) -> FunctionDef {
        FunctionDef {
            name: name.to_string(),
            parameters,
            returns,
            locals,
            requires: None,
            ensures: None,
            body: Statement::block(body),
        }
    }

    fn div() -> FunctionDef {
        func(
            "div",
            vec![VarDecl::int("a"), VarDecl::int("b")],
            vec![VarDecl::int("q")],
            vec![],
            vec![Statement::assign("q", Expr::binary(ArithOp::Div, Expr::var("a"), Expr::var("b")))],
        )
    }

    #[test]
    fn test_call_exported_function() {
        let wasm = compile(vec![div()]);
        assert_eq!(call_exported(&wasm, "div", &[-7, 2]).unwrap(), vec![-3]);
    }

    #[test]
    fn test_divide_by_zero_traps() {
        let wasm = compile(vec![div()]);
        let err = call_exported(&wasm, "div", &[1, 0]).unwrap_err();
        assert!(err.is_trap(), "expected a trap, got {}", err);
        assert_eq!(err.context, "call::trap");
    }

    #[test]
    fn test_arity_and_missing_export() {
        let wasm = compile(vec![div()]);
        let mut instance = FunnyInstance::instantiate(&wasm).unwrap();

        let err = instance.call("div", &[1]).unwrap_err();
        assert_eq!(err.context, "call::arity");

        let err = instance.call("mod", &[1, 2]).unwrap_err();
        assert_eq!(err.context, "call::get_func");
    }

    #[test]
    fn test_exported_functions_skip_memory() {
        let wasm = compile(vec![
            div(),
            func("noop", vec![], vec![], vec![], vec![]),
        ]);
        let mut instance = FunnyInstance::instantiate(&wasm).unwrap();
        assert_eq!(instance.exported_functions(), vec!["div".to_string(), "noop".to_string()]);
        assert_eq!(instance.memory_size(), 65536);
    }

    #[test]
    fn test_array_round_trip_through_memory() {
        // fill(a, n): a[i] = i * i for i in 0..n
        let wasm = compile(vec![func(
            "fill",
            vec![VarDecl::array("a"), VarDecl::int("n")],
            vec![],
            vec![VarDecl::int("i")],
            vec![Statement::while_loop(
                Condition::compare(CompareOp::Lt, Expr::var("i"), Expr::var("n")),
                Statement::block(vec![
                    Statement::assign_index(
                        "a",
                        Expr::var("i"),
                        Expr::binary(ArithOp::Mul, Expr::var("i"), Expr::var("i")),
                    ),
                    Statement::assign("i", Expr::binary(ArithOp::Add, Expr::var("i"), Expr::num(1))),
                ]),
            )],
        )]);
        let mut instance = FunnyInstance::instantiate(&wasm).unwrap();
        instance.write_array(64, &[-1; 6]).unwrap();

        assert!(instance.call("fill", &[64, 5]).unwrap().is_empty());
        assert_eq!(instance.read_array(64, 6).unwrap(), vec![0, 1, 4, 9, 16, -1]);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let wasm = compile(vec![func(
            "peek",
            vec![VarDecl::array("a")],
            vec![VarDecl::int("v")],
            vec![],
            vec![Statement::assign("v", Expr::index("a", Expr::num(0)))],
        )]);
        let mut instance = FunnyInstance::instantiate(&wasm).unwrap();
        assert!(instance.call("peek", &[70000]).unwrap_err().is_trap());
        assert!(instance.write_array(65534, &[1]).is_err());
        assert!(instance.read_array(65536, 1).is_err());
    }
}
