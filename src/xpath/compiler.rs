//! XPath Expression Compiler
//!
//! Lowers the parsed AST into a flat stack program. Tables evaluate the same
//! handful of expressions once per item, so compiled programs are kept in a
//! per-thread LRU cache keyed by the expression text.

use super::functions::Function;
use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// Compiled programs kept per thread
pub const CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with one location step
    Step {
        axis: Axis,
        test: NodeTest,
        predicates: Vec<CompiledExpr>,
    },
    /// Filter the node-set on top of the stack
    Filter(CompiledExpr),
    Union,
    Number(f64),
    Literal(String),
    Call(Function, usize),
    Binary(BinaryOp),
    Negate,
}

impl CompiledExpr {
    pub fn compile(expr: &Expr) -> Result<Self, String> {
        let mut ops = Vec::new();
        compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }
}

fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) -> Result<(), String> {
    match expr {
        Expr::Root => ops.push(Op::Root),
        Expr::Number(n) => ops.push(Op::Number(*n)),
        Expr::Literal(s) => ops.push(Op::Literal(s.clone())),
        Expr::Negate(inner) => {
            compile_expr(inner, ops)?;
            ops.push(Op::Negate);
        }
        Expr::Binary(left, op, right) => {
            compile_expr(left, ops)?;
            compile_expr(right, ops)?;
            ops.push(Op::Binary(*op));
        }
        Expr::Union(left, right) => {
            compile_expr(left, ops)?;
            compile_expr(right, ops)?;
            ops.push(Op::Union);
        }
        Expr::Step(step) => {
            ops.push(Op::Context);
            compile_step(step, ops)?;
        }
        Expr::Path(base, step) => {
            compile_expr(base, ops)?;
            compile_step(step, ops)?;
        }
        Expr::Filter(base, predicate) => {
            compile_expr(base, ops)?;
            ops.push(Op::Filter(CompiledExpr::compile(predicate)?));
        }
        Expr::Function(name, args) => {
            let function =
                Function::from_name(name).ok_or_else(|| format!("Unknown function: {}()", name))?;
            let (min, max) = function.arity();
            if args.len() < min || args.len() > max {
                return Err(format!(
                    "{}() called with {} argument(s)",
                    name,
                    args.len()
                ));
            }
            for arg in args {
                compile_expr(arg, ops)?;
            }
            ops.push(Op::Call(function, args.len()));
        }
    }
    Ok(())
}

fn compile_step(step: &Step, ops: &mut Vec<Op>) -> Result<(), String> {
    let predicates = step
        .predicates
        .iter()
        .map(CompiledExpr::compile)
        .collect::<Result<Vec<_>, _>>()?;
    ops.push(Op::Step {
        axis: step.axis,
        test: step.node_test.clone(),
        predicates,
    });
    Ok(())
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, String> {
    let expr = super::parser::parse(xpath).map_err(|e| format!("{}: {}", xpath, e))?;
    CompiledExpr::compile(&expr).map_err(|e| format!("{}: {}", xpath, e))
}

thread_local! {
    static CACHE: RefCell<LruCache<String, Rc<CompiledExpr>>> = RefCell::new(LruCache::new(
        NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
    ));
}

/// Compile through the per-thread cache
pub fn compile_cached(xpath: &str) -> Result<Rc<CompiledExpr>, String> {
    if let Some(hit) = CACHE.with(|c| c.borrow_mut().get(xpath).cloned()) {
        return Ok(hit);
    }
    tracing::trace!(xpath, "compiling path expression");
    let compiled = Rc::new(compile(xpath)?);
    CACHE.with(|c| c.borrow_mut().put(xpath.to_string(), Rc::clone(&compiled)));
    Ok(compiled)
}

/// Number of programs cached on the current thread
pub fn cached_count() -> usize {
    CACHE.with(|c| c.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_absolute() {
        let compiled = compile("/root").unwrap();
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(compiled.ops[1], Op::Step { axis: Axis::Child, .. }));
    }

    #[test]
    fn test_relative_step_starts_at_context() {
        let compiled = compile("name").unwrap();
        assert!(matches!(compiled.ops[0], Op::Context));
    }

    #[test]
    fn test_predicates_are_nested_programs() {
        let compiled = compile("item[name='x'][2]").unwrap();
        let Op::Step { predicates, .. } = &compiled.ops[1] else {
            panic!("expected step");
        };
        assert_eq!(predicates.len(), 2);
    }

    #[test]
    fn test_unknown_function_fails_at_compile_time() {
        let err = compile("frobnicate(.)").unwrap_err();
        assert!(err.contains("Unknown function"));
        assert!(compile("concat('a')").is_err());
    }

    #[test]
    fn test_cache_reuses_programs() {
        let a = compile_cached("physical-interface/name").unwrap();
        let b = compile_cached("physical-interface/name").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(cached_count() >= 1);
    }
}
