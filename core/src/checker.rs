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

use crate::ast::{AssignKind, Assignment, Condition, Expr, FunctionCall, FunctionDef, Module, Statement};
use crate::diagnostic::{ErrorKind, FunnyError};
use crate::types::{Scope, VarOrigin, VarType};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Builtin recognised by the checker. Takes one argument, returns one value.
pub const LENGTH_BUILTIN: &str = "length";

/// A parameter or local that is never read inside its function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedVariable {
    pub function: String,
    pub name: String,
    pub origin: VarOrigin,
}

/// Flat scope of `func`: parameters, then returns, then locals.
pub(crate) fn function_scope(func: &FunctionDef, source: &str) -> Result<Scope<'static>, FunnyError> {
    let mut scope = Scope::new();
    let groups = [
        (&func.parameters, VarOrigin::Param),
        (&func.returns, VarOrigin::Return),
        (&func.locals, VarOrigin::Local),
    ];
    for (decls, origin) in groups {
        for decl in decls.iter() {
            if scope.declare(&decl.name, origin, decl.var_type).is_err() {
                return Err(FunnyError::at(
                    ErrorKind::VariableRedefinition,
                    format!("{} '{}' is already declared", origin, decl.name),
                    source,
                    &decl.name,
                ));
            }
        }
    }
    Ok(scope)
}

/// Scope and type checker for a whole module.
///
/// Stops at the first error. The `used` flags it sets live in its own scope
/// tables; the AST is never modified.
pub struct SemanticChecker<'m> {
    source: &'m str,
    functions: HashMap<&'m str, &'m FunctionDef>,
    unused: Vec<UnusedVariable>,
}

impl<'m> SemanticChecker<'m> {
    pub fn new(source: &'m str) -> Self {
        SemanticChecker {
            source,
            functions: HashMap::new(),
            unused: Vec::new(),
        }
    }

    pub fn unused_variables(&self) -> &[UnusedVariable] {
        &self.unused
    }

    #[instrument(level = "info", skip_all, fields(functions = module.functions.len()))]
    pub fn check_module(&mut self, module: &'m Module) -> Result<(), FunnyError> {
        // All signatures first: duplicates surface before any body is walked
        // and calls may target functions declared further down.
        for func in &module.functions {
            if self.functions.insert(func.name.as_str(), func).is_some() {
                return Err(self.error_at(
                    ErrorKind::DuplicateFunction,
                    format!("Function '{}' is already defined", func.name),
                    &func.name,
                ));
            }
        }

        for func in &module.functions {
            self.check_function(func)?;
        }
        Ok(())
    }

    pub fn check_function(&mut self, func: &FunctionDef) -> Result<(), FunnyError> {
        let mut scope = function_scope(func, self.source)?;

        self.check_statement(&func.body, &mut scope)?;

        for decl in func.parameters.iter().chain(func.locals.iter()) {
            if let Some(entry) = scope.get(&decl.name) {
                if !entry.used {
                    warn!(function = %func.name, variable = %decl.name, origin = %entry.origin, "variable is never read");
                    self.unused.push(UnusedVariable {
                        function: func.name.clone(),
                        name: decl.name.clone(),
                        origin: entry.origin,
                    });
                }
            }
        }

        debug!(function = %func.name, slots = scope.len(), "function validated");
        Ok(())
    }

    fn error_at(&self, kind: ErrorKind, message: String, identifier: &str) -> FunnyError {
        FunnyError::at(kind, message, self.source, identifier)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn check_statement(&self, stmt: &Statement, scope: &mut Scope<'_>) -> Result<(), FunnyError> {
        match stmt {
            Statement::Block { statements } => {
                for s in statements {
                    self.check_statement(s, scope)?;
                }
                Ok(())
            }
            Statement::Assign(assign) => self.check_assignment(assign, scope),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition, scope)?;
                self.check_statement(then_branch, scope)?;
                if let Some(else_branch) = else_branch {
                    self.check_statement(else_branch, scope)?;
                }
                Ok(())
            }
            // Invariants are the resolver's job.
            Statement::While { condition, body, .. } => {
                self.check_condition(condition, scope)?;
                self.check_statement(body, scope)
            }
            Statement::Call { call } => self.check_call(call, scope, false),
        }
    }

    fn check_assignment(&self, assign: &Assignment, scope: &mut Scope<'_>) -> Result<(), FunnyError> {
        match assign.kind {
            AssignKind::Simple | AssignKind::Array => {
                let target = assign.targets.first().ok_or_else(|| {
                    FunnyError::new(ErrorKind::UndeclaredIdentifier, "Assignment has no target")
                })?;
                let var_type = self.writable_target(target, scope)?;

                if assign.kind == AssignKind::Array {
                    if !var_type.is_array() {
                        return Err(self.error_at(
                            ErrorKind::TypeMismatch,
                            format!("Cannot index non-array variable '{}'", target),
                            target,
                        ));
                    }
                    let index = assign.indices.first().ok_or_else(|| {
                        self.error_at(
                            ErrorKind::TypeMismatch,
                            format!("Array assignment to '{}' has no index", target),
                            target,
                        )
                    })?;
                    self.check_expression(index, scope)?;
                }

                self.check_expression(&assign.value, scope)
            }
            AssignKind::Tuple => {
                for target in &assign.targets {
                    self.writable_target(target, scope)?;
                }

                let call = match &assign.value {
                    Expr::Call(call) => call,
                    _ => {
                        return Err(FunnyError::new(
                            ErrorKind::ReturnCountMismatch,
                            format!(
                                "Assignment to {} targets requires a function call",
                                assign.targets.len()
                            ),
                        ))
                    }
                };

                let returns = self.return_count(call)?;
                if returns != assign.targets.len() {
                    return Err(self.error_at(
                        ErrorKind::ReturnCountMismatch,
                        format!(
                            "Function '{}' returns {} value(s), but {} target(s) provided",
                            call.name,
                            returns,
                            assign.targets.len()
                        ),
                        &call.name,
                    ));
                }

                self.check_call(call, scope, false)
            }
        }
    }

    /// Declared, not a parameter.
    fn writable_target(&self, name: &str, scope: &Scope<'_>) -> Result<VarType, FunnyError> {
        let entry = scope.get(name).ok_or_else(|| {
            self.error_at(
                ErrorKind::UndeclaredIdentifier,
                format!("Undeclared identifier '{}'", name),
                name,
            )
        })?;
        if entry.origin == VarOrigin::Param {
            return Err(self.error_at(
                ErrorKind::AssignToParameter,
                format!("Cannot assign to parameter '{}'", name),
                name,
            ));
        }
        Ok(entry.var_type)
    }

    // =========================================================================
    // Conditions & Expressions
    // =========================================================================

    fn check_condition(&self, cond: &Condition, scope: &mut Scope<'_>) -> Result<(), FunnyError> {
        match cond {
            Condition::Bool { .. } => Ok(()),
            Condition::Comp(comp) => {
                self.check_expression(&comp.left, scope)?;
                self.check_expression(&comp.right, scope)
            }
            Condition::Not { argument } => self.check_condition(argument, scope),
            Condition::BinCond { left, right, .. } => {
                self.check_condition(left, scope)?;
                self.check_condition(right, scope)
            }
        }
    }

    fn check_expression(&self, expr: &Expr, scope: &mut Scope<'_>) -> Result<(), FunnyError> {
        match expr {
            Expr::Num { .. } => Ok(()),
            Expr::Var { name } => self.read_var(name, scope).map(|_| ()),
            Expr::ArrayAccess { name, index } => {
                if !self.read_var(name, scope)?.is_array() {
                    return Err(self.error_at(
                        ErrorKind::TypeMismatch,
                        format!("Cannot index non-array variable '{}'", name),
                        name,
                    ));
                }
                self.check_expression(index, scope)
            }
            Expr::Binary { left, right, .. } => {
                self.check_expression(left, scope)?;
                self.check_expression(right, scope)
            }
            Expr::Neg { argument } => self.check_expression(argument, scope),
            Expr::Call(call) => self.check_call(call, scope, true),
        }
    }

    fn read_var(&self, name: &str, scope: &mut Scope<'_>) -> Result<VarType, FunnyError> {
        match scope.mark_used(name) {
            Some(entry) => Ok(entry.var_type),
            None => Err(self.error_at(
                ErrorKind::UndeclaredIdentifier,
                format!("Undeclared identifier '{}'", name),
                name,
            )),
        }
    }

    /// Tuple position only knows user functions; `length` is undeclared here.
    fn return_count(&self, call: &FunctionCall) -> Result<usize, FunnyError> {
        self.functions
            .get(call.name.as_str())
            .map(|callee| callee.returns.len())
            .ok_or_else(|| self.undeclared_function(call))
    }

    fn undeclared_function(&self, call: &FunctionCall) -> FunnyError {
        self.error_at(
            ErrorKind::UndeclaredFunction,
            format!("Undeclared function '{}'", call.name),
            &call.name,
        )
    }

    /// `in_expression` is false for call statements and tuple assignments,
    /// where any number of results is acceptable.
    fn check_call(&self, call: &FunctionCall, scope: &mut Scope<'_>, in_expression: bool) -> Result<(), FunnyError> {
        if call.name == LENGTH_BUILTIN {
            if call.args.len() != 1 {
                return Err(self.error_at(
                    ErrorKind::ArgumentCountMismatch,
                    format!("Function '{}' expects 1 argument, got {}", LENGTH_BUILTIN, call.args.len()),
                    LENGTH_BUILTIN,
                ));
            }
            return self.check_expression(&call.args[0], scope);
        }

        let callee = *self
            .functions
            .get(call.name.as_str())
            .ok_or_else(|| self.undeclared_function(call))?;

        if in_expression && callee.returns.len() != 1 {
            return Err(self.error_at(
                ErrorKind::ReturnCountMismatch,
                format!(
                    "Function '{}' returns {} values, cannot be used in expression",
                    call.name,
                    callee.returns.len()
                ),
                &call.name,
            ));
        }

        if callee.parameters.len() != call.args.len() {
            return Err(self.error_at(
                ErrorKind::ArgumentCountMismatch,
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    call.name,
                    callee.parameters.len(),
                    call.args.len()
                ),
                &call.name,
            ));
        }

        for arg in &call.args {
            self.check_expression(arg, scope)?;
        }
        Ok(())
    }
}

/// Validate `module`, returning it unchanged on success.
pub fn validate<'m>(module: &'m Module, source: &str) -> Result<&'m Module, FunnyError> {
    let mut checker = SemanticChecker::new(source);
    checker.check_module(module)?;
    Ok(module)
}
