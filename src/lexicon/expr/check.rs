//! Static checking: variable scope per arity and operand types.

use super::ExprError;
use super::ast::{Attr, BinOp, Expr, Func, Literal, UnaryOp, Var};
use super::Arity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    Bool,
    Int,
    Str,
    Pos,
    List,
    Null,
}

impl Ty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "string",
            Self::Pos => "position",
            Self::List => "list",
            Self::Null => "None",
        }
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn attr_type(attr: Attr) -> Ty {
    match attr {
        Attr::Size => Ty::Int,
        Attr::Position => Ty::Pos,
        Attr::Name | Attr::Shape | Attr::Color | Attr::Material | Attr::Owner => Ty::Str,
    }
}

/// Check `expr` as a predicate of the given arity. The root must be boolean.
pub fn check_predicate(expr: &Expr, arity: Arity) -> Result<(), ExprError> {
    match type_of(expr, arity)? {
        Ty::Bool => Ok(()),
        found => Err(ExprError::NotPredicate {
            found: found.to_string(),
        }),
    }
}

fn mismatch(op: &str, left: Ty, right: Ty) -> ExprError {
    ExprError::TypeMismatch {
        message: format!("`{op}` cannot combine {left} and {right}"),
    }
}

fn type_of(expr: &Expr, arity: Arity) -> Result<Ty, ExprError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Bool(_) => Ty::Bool,
            Literal::Int(_) => Ty::Int,
            Literal::Str(_) => Ty::Str,
            Literal::Null => Ty::Null,
        }),
        Expr::Attr { var, attr } => {
            let allowed = match arity {
                Arity::Unary => *var == Var::Obj,
                Arity::Binary => matches!(var, Var::Obj1 | Var::Obj2),
            };
            if !allowed {
                return Err(ExprError::WrongVariable {
                    var: var.as_str(),
                    arity: arity.as_str(),
                });
            }
            Ok(attr_type(*attr))
        }
        Expr::Index { target, index } => {
            let target_ty = type_of(target, arity)?;
            let index_ty = type_of(index, arity)?;
            if index_ty != Ty::Int {
                return Err(mismatch("[]", target_ty, index_ty));
            }
            match target_ty {
                Ty::Pos => {
                    if let Expr::Literal(Literal::Int(n)) = index.as_ref() {
                        if !(0..=1).contains(n) {
                            return Err(ExprError::TypeMismatch {
                                message: format!("position has two coordinates, index {n} is out of range"),
                            });
                        }
                    }
                    Ok(Ty::Int)
                }
                Ty::Str => Ok(Ty::Str),
                other => Err(mismatch("[]", other, index_ty)),
            }
        }
        Expr::List(items) => {
            for item in items {
                type_of(item, arity)?;
            }
            Ok(Ty::List)
        }
        Expr::Unary { op, operand } => {
            let ty = type_of(operand, arity)?;
            match (op, ty) {
                (UnaryOp::Not, Ty::Bool) => Ok(Ty::Bool),
                (UnaryOp::Neg, Ty::Int) => Ok(Ty::Int),
                (UnaryOp::Not, other) => Err(ExprError::TypeMismatch {
                    message: format!("`not` expects bool, found {other}"),
                }),
                (UnaryOp::Neg, other) => Err(ExprError::TypeMismatch {
                    message: format!("unary `-` expects int, found {other}"),
                }),
            }
        }
        Expr::Binary { left, op, right } => {
            let l = type_of(left, arity)?;
            let r = type_of(right, arity)?;
            binary_type(*op, l, r)
        }
        Expr::Call { func, args } => {
            let tys = args
                .iter()
                .map(|a| type_of(a, arity))
                .collect::<Result<Vec<_>, _>>()?;
            call_type(*func, &tys)
        }
    }
}

fn binary_type(op: BinOp, l: Ty, r: Ty) -> Result<Ty, ExprError> {
    use BinOp::*;
    match op {
        And | Or => {
            if l == Ty::Bool && r == Ty::Bool {
                Ok(Ty::Bool)
            } else {
                Err(mismatch(op.symbol(), l, r))
            }
        }
        Eq | Ne => {
            if l == r || l == Ty::Null || r == Ty::Null {
                Ok(Ty::Bool)
            } else {
                Err(mismatch(op.symbol(), l, r))
            }
        }
        Lt | Le | Gt | Ge => match (l, r) {
            (Ty::Int, Ty::Int) | (Ty::Str, Ty::Str) => Ok(Ty::Bool),
            _ => Err(mismatch(op.symbol(), l, r)),
        },
        Add => match (l, r) {
            (Ty::Int, Ty::Int) => Ok(Ty::Int),
            (Ty::Str, Ty::Str) => Ok(Ty::Str),
            _ => Err(mismatch(op.symbol(), l, r)),
        },
        Sub | Mul | Div | Rem => match (l, r) {
            (Ty::Int, Ty::Int) => Ok(Ty::Int),
            _ => Err(mismatch(op.symbol(), l, r)),
        },
        In => match (l, r) {
            (_, Ty::List) | (Ty::Str, Ty::Str) => Ok(Ty::Bool),
            _ => Err(mismatch(op.symbol(), l, r)),
        },
    }
}

fn call_type(func: Func, args: &[Ty]) -> Result<Ty, ExprError> {
    let bad = || ExprError::TypeMismatch {
        message: format!(
            "{}() cannot take ({})",
            func.as_str(),
            args.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
        ),
    };
    match func {
        Func::Abs => match args {
            [Ty::Int] => Ok(Ty::Int),
            _ => Err(bad()),
        },
        Func::Min | Func::Max => {
            if !args.is_empty() && args.iter().all(|t| *t == Ty::Int) {
                Ok(Ty::Int)
            } else {
                Err(bad())
            }
        }
        Func::Len => match args {
            [Ty::Str] | [Ty::List] => Ok(Ty::Int),
            _ => Err(bad()),
        },
    }
}
