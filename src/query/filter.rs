//! MapFilter: evaluates an expression AST against the row; a filter step
//! discards rows where it evaluates false, a map step appends a computed
//! column (§4.8 step 7).

use serde_json::Value;

use crate::error::Error;
use crate::rlookup::RLookupKey;

use super::context::QueryContext;
use super::processor::{check_deadline, NextResult, ResultProcessor};
use super::result::SearchResult;

#[derive(Debug, Clone)]
pub enum Expr {
    Const(Value),
    Field(RLookupKey),
    Not(Box<Expr>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64()
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Evaluate `expr` against `row`. Errors map to `Error::Expr` per §7.
pub fn eval(expr: &Expr, row: &crate::rlookup::RLookupRow) -> Result<Value, Error> {
    match expr {
        Expr::Const(v) => Ok(v.clone()),
        Expr::Field(key) => Ok(row.get(*key).cloned().unwrap_or(Value::Null)),
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, row)?))),
        Expr::BinOp(op, lhs, rhs) => {
            let l = eval(lhs, row)?;
            let r = eval(rhs, row)?;
            match op {
                BinOp::And => Ok(Value::Bool(truthy(&l) && truthy(&r))),
                BinOp::Or => Ok(Value::Bool(truthy(&l) || truthy(&r))),
                BinOp::Eq => Ok(Value::Bool(l == r)),
                BinOp::Ne => Ok(Value::Bool(l != r)),
                _ => {
                    let (a, b) = match (as_f64(&l), as_f64(&r)) {
                        (Some(a), Some(b)) => (a, b),
                        _ => {
                            return Err(Error::Expr(format!(
                                "non-numeric operands for {op:?}"
                            )))
                        }
                    };
                    Ok(match op {
                        BinOp::Add => Value::from(a + b),
                        BinOp::Sub => Value::from(a - b),
                        BinOp::Mul => Value::from(a * b),
                        BinOp::Div => {
                            if b == 0.0 {
                                return Err(Error::Expr("division by zero".into()));
                            }
                            Value::from(a / b)
                        }
                        BinOp::Lt => Value::Bool(a < b),
                        BinOp::Le => Value::Bool(a <= b),
                        BinOp::Gt => Value::Bool(a > b),
                        BinOp::Ge => Value::Bool(a >= b),
                        BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => unreachable!(),
                    })
                }
            }
        }
    }
}

pub enum Step {
    Filter(Expr),
    Map { expr: Expr, alias: RLookupKey },
}

pub struct MapFilter {
    upstream: Box<dyn ResultProcessor + Send>,
    step: Step,
}

impl MapFilter {
    pub fn new(upstream: Box<dyn ResultProcessor + Send>, step: Step) -> Self {
        Self { upstream, step }
    }
}

impl ResultProcessor for MapFilter {
    fn next(&mut self, ctx: &mut QueryContext, out: &mut Option<SearchResult>) -> NextResult {
        if let Some(terminal) = check_deadline(ctx) {
            return terminal;
        }
        loop {
            match self.upstream.next(ctx, out) {
                NextResult::Ok => {
                    let result = out.as_mut().expect("Ok implies a result");
                    match &self.step {
                        Step::Filter(expr) => match eval(expr, &result.row) {
                            Ok(v) if truthy(&v) => return NextResult::Ok,
                            Ok(_) => {
                                *out = None;
                                continue;
                            }
                            Err(e) => {
                                ctx.error = Some(e.clone());
                                return NextResult::Error(e);
                            }
                        },
                        Step::Map { expr, alias } => match eval(expr, &result.row) {
                            Ok(v) => {
                                result.row.set(*alias, v);
                                return NextResult::Ok;
                            }
                            Err(e) => {
                                ctx.error = Some(e.clone());
                                return NextResult::Error(e);
                            }
                        },
                    }
                }
                other => return other,
            }
        }
    }

    fn free(&mut self) {
        self.upstream.free();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexResult, ResultKind, VecIterator};
    use crate::query::policy::{OomPolicy, TimeoutPolicy};
    use crate::query::scan::Scanner;
    use crate::rlookup::RLookupTable;

    fn docs(n: u64) -> VecIterator {
        VecIterator::new((0..n).map(|i| IndexResult::leaf(ResultKind::Term, i, 1, 1, 1.0)).collect())
    }

    #[test]
    fn filter_discards_rows_failing_the_predicate() {
        let mut table = RLookupTable::new();
        let price = table.get_key("price");
        let scanner = Scanner::new(Box::new(docs(3)));
        let expr = Expr::BinOp(BinOp::Gt, Box::new(Expr::Field(price)), Box::new(Expr::Const(Value::from(1))));
        let mut filter = MapFilter::new(Box::new(scanner), Step::Filter(expr));
        let mut ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);

        // No row has `price` set, so Field evaluates to Null and the
        // comparison is non-numeric, producing a terminal Expr error.
        let mut out = None;
        assert!(matches!(filter.next(&mut ctx, &mut out), NextResult::Error(_)));
    }

    #[test]
    fn map_appends_a_computed_column() {
        let mut table = RLookupTable::new();
        let doubled = table.get_key("doubled");
        let scanner = Scanner::new(Box::new(docs(1)));
        let expr = Expr::BinOp(BinOp::Mul, Box::new(Expr::Const(Value::from(21))), Box::new(Expr::Const(Value::from(2))));
        let mut mapper = MapFilter::new(Box::new(scanner), Step::Map { expr, alias: doubled });
        let mut ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);

        let mut out = None;
        assert!(matches!(mapper.next(&mut ctx, &mut out), NextResult::Ok));
        assert_eq!(out.unwrap().row.get(doubled), Some(&Value::from(42.0)));
    }
}
