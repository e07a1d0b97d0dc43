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

//! Name resolution for contracts: `requires`, `ensures` and loop invariants.
//!
//! Predicates are only scoped here. Nothing is proved or evaluated.

use crate::ast::{Expr, FunctionDef, Module, Predicate, Statement};
use crate::checker::function_scope;
use crate::diagnostic::{ErrorKind, FunnyError};
use crate::types::{Scope, VarOrigin};
use tracing::{debug, instrument};

pub struct ContractResolver<'s> {
    source: &'s str,
}

impl<'s> ContractResolver<'s> {
    pub fn new(source: &'s str) -> Self {
        ContractResolver { source }
    }

    #[instrument(level = "info", skip_all, fields(functions = module.functions.len()))]
    pub fn resolve_module(&self, module: &Module) -> Result<(), FunnyError> {
        for func in &module.functions {
            let predicates = self.resolve_function(func)?;
            debug!(function = %func.name, predicates, "contracts resolved");
        }
        Ok(())
    }

    /// Returns how many predicates were checked.
    pub fn resolve_function(&self, func: &FunctionDef) -> Result<usize, FunnyError> {
        let scope = function_scope(func, self.source)?;
        let mut checked = 0;

        for pred in func.requires.iter().chain(func.ensures.iter()) {
            self.resolve_predicate(pred, &scope)?;
            checked += 1;
        }

        checked += self.resolve_invariants(&func.body, &scope)?;
        Ok(checked)
    }

    fn resolve_invariants(&self, stmt: &Statement, scope: &Scope<'_>) -> Result<usize, FunnyError> {
        match stmt {
            Statement::Block { statements } => {
                let mut checked = 0;
                for s in statements {
                    checked += self.resolve_invariants(s, scope)?;
                }
                Ok(checked)
            }
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                let mut checked = self.resolve_invariants(then_branch, scope)?;
                if let Some(else_branch) = else_branch {
                    checked += self.resolve_invariants(else_branch, scope)?;
                }
                Ok(checked)
            }
            Statement::While { body, invariant, .. } => {
                let mut checked = 0;
                if let Some(invariant) = invariant {
                    self.resolve_predicate(invariant, scope)?;
                    checked += 1;
                }
                Ok(checked + self.resolve_invariants(body, scope)?)
            }
            Statement::Assign(_) | Statement::Call { .. } => Ok(0),
        }
    }

    fn resolve_predicate(&self, pred: &Predicate, scope: &Scope<'_>) -> Result<(), FunnyError> {
        match pred {
            Predicate::Bool { .. } => Ok(()),
            Predicate::Comp(comp) => {
                self.resolve_expression(&comp.left, scope)?;
                self.resolve_expression(&comp.right, scope)
            }
            Predicate::Not { argument } => self.resolve_predicate(argument, scope),
            Predicate::BinPred { left, right, .. } => {
                self.resolve_predicate(left, scope)?;
                self.resolve_predicate(right, scope)
            }
            Predicate::Quantifier { variable, body, .. } => {
                let mut inner = Scope::with_parent(scope);
                inner.bind(&variable.name, VarOrigin::Bound, variable.var_type);
                self.resolve_predicate(body, &inner)
            }
            Predicate::FormulaRef { args, .. } => {
                for arg in args {
                    self.resolve_expression(arg, scope)?;
                }
                Ok(())
            }
        }
    }

    fn resolve_expression(&self, expr: &Expr, scope: &Scope<'_>) -> Result<(), FunnyError> {
        match expr {
            Expr::Num { .. } => Ok(()),
            Expr::Var { name } => {
                if scope.contains(name) {
                    Ok(())
                } else {
                    Err(FunnyError::at(
                        ErrorKind::UndeclaredIdentifier,
                        format!("Undeclared variable '{}' in predicate", name),
                        self.source,
                        name,
                    ))
                }
            }
            Expr::ArrayAccess { name, index } => {
                let entry = scope.get(name).ok_or_else(|| {
                    FunnyError::at(
                        ErrorKind::UndeclaredIdentifier,
                        format!("Undeclared array '{}' in predicate", name),
                        self.source,
                        name,
                    )
                })?;
                if !entry.var_type.is_array() {
                    return Err(FunnyError::at(
                        ErrorKind::TypeMismatch,
                        format!("Cannot index non-array variable '{}'", name),
                        self.source,
                        name,
                    ));
                }
                self.resolve_expression(index, scope)
            }
            Expr::Binary { left, right, .. } => {
                self.resolve_expression(left, scope)?;
                self.resolve_expression(right, scope)
            }
            Expr::Neg { argument } => self.resolve_expression(argument, scope),
            // Callee names in predicates are not resolved.
            Expr::Call(call) => {
                for arg in &call.args {
                    self.resolve_expression(arg, scope)?;
                }
                Ok(())
            }
        }
    }
}

/// Resolve every contract of `module`, returning it unchanged on success.
pub fn resolve<'m>(module: &'m Module, source: &str) -> Result<&'m Module, FunnyError> {
    ContractResolver::new(source).resolve_module(module)?;
    Ok(module)
}
