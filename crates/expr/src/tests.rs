use super::*;
use types::Value::*;

#[test]
fn eval_literals_and_columns() {
    let row = Row::new(vec![Int(1), Text("Will".into()), Bool(true)]);

    assert_eq!(eval(&Expr::lit(Int(42)), &row).unwrap(), Int(42));
    assert_eq!(eval(&Expr::column(1), &row).unwrap(), Text("Will".into()));
}

#[test]
fn unknown_column_errors() {
    let row = Row::new(vec![Int(1)]);
    let err = eval(&Expr::column(5), &row).unwrap_err();
    assert!(format!("{err}").contains("out of range"));
}

#[test]
fn eval_comparisons() {
    let row = Row::new(vec![Int(10), Int(20)]);
    let lt = Expr::binary(Expr::column(0), BinaryOp::Lt, Expr::column(1));
    assert_eq!(eval(&lt, &row).unwrap(), Bool(true));
}

#[test]
fn eval_logical_ops() {
    let row = Row::new(vec![Bool(true), Bool(false)]);
    let expr = Expr::binary(Expr::column(0), BinaryOp::And, Expr::column(1));
    assert_eq!(eval(&expr, &row).unwrap(), Bool(false));
}

#[test]
fn not_operator() {
    let row = Row::new(vec![Bool(false)]);
    let expr = Expr::not(Expr::column(0));
    assert_eq!(eval(&expr, &row).unwrap(), Bool(true));
}

#[test]
fn mismatched_types_fail() {
    let row = Row::new(vec![Int(1), Text("hi".into())]);
    let expr = Expr::binary(Expr::column(0), BinaryOp::Eq, Expr::column(1));

    let err = eval(&expr, &row).unwrap_err();
    assert!(format!("{err}").contains("incompatible types"));
}

#[test]
fn float_and_all_comparison_ops() {
    let row = Row::new(vec![Float(1.5), Float(2.5)]);
    assert_eq!(
        eval(&Expr::binary(Expr::column(0), BinaryOp::Le, Expr::column(1)), &row).unwrap(),
        Bool(true)
    );
    assert_eq!(
        eval(&Expr::binary(Expr::column(0), BinaryOp::Ge, Expr::column(1)), &row).unwrap(),
        Bool(false)
    );
    assert_eq!(
        eval(&Expr::binary(Expr::column(0), BinaryOp::Ne, Expr::column(1)), &row).unwrap(),
        Bool(true)
    );
}
