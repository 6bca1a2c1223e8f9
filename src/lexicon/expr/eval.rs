//! Evaluation of checked expressions against world objects.

use super::ast::{Attr, BinOp, Expr, Func, Literal, UnaryOp, Var};
use crate::world::WorldObject;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    Pos(i64, i64),
    List(Vec<Value>),
    Null,
}

/// Runtime failures. A predicate that fails to evaluate is simply false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    Unbound(&'static str),
    DivisionByZero,
    Overflow,
    Type(&'static str),
}

/// Objects bound to the expression variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bindings<'a> {
    pub obj: Option<&'a WorldObject>,
    pub obj1: Option<&'a WorldObject>,
    pub obj2: Option<&'a WorldObject>,
}

impl<'a> Bindings<'a> {
    pub fn unary(obj: &'a WorldObject) -> Self {
        Self {
            obj: Some(obj),
            ..Self::default()
        }
    }

    pub fn binary(left: &'a WorldObject, right: &'a WorldObject) -> Self {
        Self {
            obj1: Some(left),
            obj2: Some(right),
            ..Self::default()
        }
    }

    fn get(&self, var: Var) -> Result<&'a WorldObject, EvalError> {
        let slot = match var {
            Var::Obj => self.obj,
            Var::Obj1 => self.obj1,
            Var::Obj2 => self.obj2,
        };
        slot.ok_or(EvalError::Unbound(var.as_str()))
    }
}

fn attribute(obj: &WorldObject, attr: Attr) -> Value {
    match attr {
        Attr::Name => Value::Str(obj.name.clone()),
        Attr::Shape => Value::Str(obj.shape.clone()),
        Attr::Color => Value::Str(obj.color.clone()),
        Attr::Size => Value::Int(obj.size),
        Attr::Material => Value::Str(obj.material.clone()),
        Attr::Position => match obj.position {
            Some((x, y)) => Value::Pos(x, y),
            None => Value::Null,
        },
        Attr::Owner => Value::Str(obj.owner.as_label().to_string()),
    }
}

pub fn eval(expr: &Expr, env: &Bindings<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::Int(*n),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Null => Value::Null,
        }),
        Expr::Attr { var, attr } => Ok(attribute(env.get(*var)?, *attr)),
        Expr::Index { target, index } => {
            let target = eval(target, env)?;
            let Value::Int(i) = eval(index, env)? else {
                return Err(EvalError::Type("index"));
            };
            Ok(match target {
                Value::Pos(x, _) if i == 0 => Value::Int(x),
                Value::Pos(_, y) if i == 1 => Value::Int(y),
                Value::Str(s) => usize::try_from(i)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            })
        }
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| eval(item, env))
                .collect::<Result<_, _>>()?,
        )),
        Expr::Unary { op, operand } => match (op, eval(operand, env)?) {
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
            (_, Value::Null) => Ok(Value::Null),
            _ => Err(EvalError::Type("unary operand")),
        },
        Expr::Binary { left, op, right } => match op {
            BinOp::And => {
                if eval(left, env)? != Value::Bool(true) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(eval(right, env)? == Value::Bool(true)))
            }
            BinOp::Or => {
                if eval(left, env)? == Value::Bool(true) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(eval(right, env)? == Value::Bool(true)))
            }
            _ => binary(*op, eval(left, env)?, eval(right, env)?),
        },
        Expr::Call { func, args } => {
            let values = args
                .iter()
                .map(|a| eval(a, env))
                .collect::<Result<Vec<_>, _>>()?;
            call(*func, values)
        }
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    use BinOp::*;
    match op {
        Eq => Ok(Value::Bool(l == r)),
        Ne => Ok(Value::Bool(l != r)),
        Lt | Le | Gt | Ge => {
            let ordering = match (&l, &r) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                // Missing coordinates never compare.
                _ => return Ok(Value::Bool(false)),
            };
            Ok(Value::Bool(match op {
                Lt => ordering.is_lt(),
                Le => ordering.is_le(),
                Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        Add => match (l, r) {
            (Value::Int(a), Value::Int(b)) => a.checked_add(b).map(Value::Int).ok_or(EvalError::Overflow),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            _ => Err(EvalError::Type("+")),
        },
        Sub | Mul | Div | Rem => {
            let (a, b) = match (l, r) {
                (Value::Int(a), Value::Int(b)) => (a, b),
                (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
                _ => return Err(EvalError::Type("arithmetic")),
            };
            let out = match op {
                Sub => a.checked_sub(b),
                Mul => a.checked_mul(b),
                Div if b == 0 => return Err(EvalError::DivisionByZero),
                Rem if b == 0 => return Err(EvalError::DivisionByZero),
                Div => a.checked_div_euclid(b),
                _ => a.checked_rem_euclid(b),
            };
            out.map(Value::Int).ok_or(EvalError::Overflow)
        }
        In => match r {
            Value::List(items) => Ok(Value::Bool(items.contains(&l))),
            Value::Str(haystack) => match l {
                Value::Str(needle) => Ok(Value::Bool(haystack.contains(&needle))),
                _ => Ok(Value::Bool(false)),
            },
            _ => Ok(Value::Bool(false)),
        },
        And | Or => Err(EvalError::Type("connective")),
    }
}

fn call(func: Func, args: Vec<Value>) -> Result<Value, EvalError> {
    let ints = || -> Result<Vec<i64>, EvalError> {
        args.iter()
            .map(|v| match v {
                Value::Int(n) => Ok(*n),
                _ => Err(EvalError::Type("int argument")),
            })
            .collect()
    };
    match func {
        Func::Abs => {
            let [n] = ints()?[..] else {
                return Err(EvalError::Type("abs arity"));
            };
            n.checked_abs().map(Value::Int).ok_or(EvalError::Overflow)
        }
        Func::Min => ints()?.into_iter().min().map(Value::Int).ok_or(EvalError::Type("min arity")),
        Func::Max => ints()?.into_iter().max().map(Value::Int).ok_or(EvalError::Type("max arity")),
        Func::Len => match args.first() {
            Some(Value::Str(s)) => Ok(Value::Int(s.chars().count() as i64)),
            Some(Value::List(items)) => Ok(Value::Int(items.len() as i64)),
            _ => Err(EvalError::Type("len argument")),
        },
    }
}
