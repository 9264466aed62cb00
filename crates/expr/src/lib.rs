//! A minimal predicate AST and evaluator.
//!
//! A record manager with nothing to drive its scan operator can't be
//! exercised end to end, so this crate supplies a small predicate
//! collaborator to make `recordmgr::Scan` testable: column references,
//! comparisons, and boolean connectives over a decoded `Row`. It is not
//! a SQL front end, there is no tokenizer or grammar here, and columns
//! are referenced by their ordinal position in a single fixed schema
//! rather than by qualified `table.column` name.

#[cfg(test)]
mod tests;

use common::{DbError, DbResult, Row};
use std::cmp::Ordering;
use types::Value;

/// Binary comparison and logical operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators (currently just logical NOT).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Not,
}

/// Predicate expression tree evaluated over a row's positional attributes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Value),
    /// Reference to an attribute by its ordinal position in the schema.
    Column(usize),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn column(idx: usize) -> Self {
        Expr::Column(idx)
    }

    pub fn lit(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(expr),
        }
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

/// Evaluate an expression against a decoded row.
///
/// Per the `evalExpr` contract a well-formed predicate always reduces
/// to `Value::Bool`, but nested literal and column sub-expressions may
/// evaluate to any `Value`.
pub fn eval(expr: &Expr, row: &Row) -> DbResult<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Column(idx) => row
            .values()
            .get(*idx)
            .cloned()
            .ok_or_else(|| DbError::RecordMgr(format!("column index {idx} out of range"))),
        Expr::Unary { op, expr } => {
            let v = eval(expr, row)?;
            match op {
                UnaryOp::Not => {
                    let b = v
                        .as_bool()
                        .ok_or_else(|| DbError::RecordMgr(format!("NOT expects bool, got {v:?}")))?;
                    Ok(Value::Bool(!b))
                }
            }
        }
        Expr::Binary { left, op, right } => {
            let lv = eval(left, row)?;
            let rv = eval(right, row)?;
            eval_binary(&lv, *op, &rv)
        }
    }
}

fn eval_binary(l: &Value, op: BinaryOp, r: &Value) -> DbResult<Value> {
    use BinaryOp::*;

    if matches!(op, And | Or) {
        let lb = l
            .as_bool()
            .ok_or_else(|| DbError::RecordMgr(format!("AND/OR expects bools, got {l:?}")))?;
        let rb = r
            .as_bool()
            .ok_or_else(|| DbError::RecordMgr(format!("AND/OR expects bools, got {r:?}")))?;
        return Ok(Value::Bool(match op {
            And => lb && rb,
            Or => lb || rb,
            _ => unreachable!(),
        }));
    }

    let ord = l
        .cmp_same_type(r)
        .ok_or_else(|| DbError::RecordMgr(format!("incompatible types for {op:?}: {l:?}, {r:?}")))?;

    let result = match op {
        Eq => ord == Ordering::Equal,
        Ne => ord != Ordering::Equal,
        Lt => ord == Ordering::Less,
        Le => ord != Ordering::Greater,
        Gt => ord == Ordering::Greater,
        Ge => ord != Ordering::Less,
        _ => unreachable!(),
    };

    Ok(Value::Bool(result))
}
