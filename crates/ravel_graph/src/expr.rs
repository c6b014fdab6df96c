// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sandboxed arithmetic expressions for function and list nodes.

use crate::evaluation::EvaluationError;
use rhai::{Dynamic, Engine, Scope, AST};

const MAX_OPERATIONS: u64 = 10_000;
const MAX_EXPR_DEPTH: usize = 64;
const MAX_CALL_LEVELS: usize = 16;

/// A parsed expression ready for repeated evaluation
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    ast: AST,
}

impl CompiledExpression {
    /// Source text the expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Expression engine shared by every node of a graph
pub struct ExpressionEngine {
    engine: Engine,
}

impl ExpressionEngine {
    /// Create an engine with operation and depth limits applied
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_expr_depths(MAX_EXPR_DEPTH, MAX_EXPR_DEPTH);
        engine.set_max_call_levels(MAX_CALL_LEVELS);
        engine.set_max_string_size(256);
        engine.set_max_array_size(1024);
        Self { engine }
    }

    /// Parse a single expression
    pub fn compile(&self, source: &str) -> Result<CompiledExpression, EvaluationError> {
        let ast = self
            .engine
            .compile_expression(source)
            .map_err(|e| EvaluationError::Expression(format!("'{source}': {e}")))?;
        Ok(CompiledExpression {
            source: source.to_string(),
            ast,
        })
    }

    /// Evaluate with the given variable bindings. Integer and boolean results
    /// are widened to floats.
    pub fn eval(&self, expression: &CompiledExpression, vars: &[(&str, f64)]) -> Result<f64, EvaluationError> {
        let mut scope = Scope::new();
        for (name, value) in vars {
            scope.push_constant(*name, *value);
        }
        let result: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, &expression.ast)
            .map_err(|e| EvaluationError::Expression(format!("'{}': {e}", expression.source)))?;

        if let Ok(value) = result.as_float() {
            Ok(value)
        } else if let Ok(value) = result.as_int() {
            Ok(value as f64)
        } else if let Ok(value) = result.as_bool() {
            Ok(if value { 1.0 } else { 0.0 })
        } else {
            Err(EvaluationError::Expression(format!(
                "'{}' produced {} instead of a number",
                expression.source,
                result.type_name()
            )))
        }
    }
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExpressionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionEngine")
            .field("max_operations", &MAX_OPERATIONS)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_with_bindings() {
        let engine = ExpressionEngine::new();
        let expr = engine.compile("x * 2.0 + y").unwrap();
        let value = engine.eval(&expr, &[("x", 1.5), ("y", 0.25)]).unwrap();
        assert!((value - 3.25).abs() < 1e-9);
    }

    #[test]
    fn test_integer_result_is_widened() {
        let engine = ExpressionEngine::new();
        let expr = engine.compile("3 + 4").unwrap();
        assert_eq!(engine.eval(&expr, &[]).unwrap(), 7.0);
    }

    #[test]
    fn test_math_functions_available() {
        let engine = ExpressionEngine::new();
        let expr = engine.compile("sin(x) + sqrt(4.0)").unwrap();
        let value = engine.eval(&expr, &[("x", 0.0)]).unwrap();
        assert!((value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let engine = ExpressionEngine::new();
        let err = engine.compile("x * (").unwrap_err();
        assert!(matches!(err, EvaluationError::Expression(_)));
    }

    #[test]
    fn test_unbound_variable_is_an_error() {
        let engine = ExpressionEngine::new();
        let expr = engine.compile("q + 1.0").unwrap();
        assert!(engine.eval(&expr, &[("x", 1.0)]).is_err());
    }

    #[test]
    fn test_non_numeric_result_rejected() {
        let engine = ExpressionEngine::new();
        let expr = engine.compile("\"text\"").unwrap();
        assert!(engine.eval(&expr, &[]).is_err());
    }
}
