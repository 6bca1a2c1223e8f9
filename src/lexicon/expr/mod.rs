//! Sandboxed meaning-expression language.
//!
//! Teachers describe words with small predicate expressions such as
//! `obj.color == 'red'` or `obj1.size > obj2.size`. An expression is compiled
//! once, at teach time, into a [`Predicate`]: it is tokenized, parsed into an
//! AST, and statically checked against the closed object schema. Evaluation
//! only ever walks that AST; there is no path to a general-purpose evaluator.
//!
//! The language:
//! - variables `obj` (unary words) or `obj1` / `obj2` (relations), always
//!   followed by an attribute: `name shape color size material position owner`
//! - literals: `'text'`, `"text"`, integers, `True` / `False`, `None`, `[a, b]`
//! - `== != < <= > >=`, `in`, `and or not` (also `&& || !`), `+ - * / %`
//! - `position[0]`, `position[1]`
//! - functions `abs`, `min`, `max`, `len`

mod ast;
mod check;
mod eval;
mod lexer;
mod parser;

use miette::Diagnostic;
use thiserror::Error;

use crate::world::WorldObject;

pub use ast::{Attr, BinOp, Expr, Literal, Var};
pub use eval::Value;

use eval::Bindings;

#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum ExprError {
    #[error("empty expression")]
    #[diagnostic(
        code(lexagent::expr::empty),
        help("Write a predicate such as obj.color == 'red'.")
    )]
    Empty,

    #[error("unexpected character '{ch}' at offset {offset}")]
    #[diagnostic(
        code(lexagent::expr::unexpected_char),
        help("Expressions use comparisons, and/or/not, arithmetic and quoted strings only.")
    )]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    #[diagnostic(
        code(lexagent::expr::unterminated_string),
        help("Close the string with the same quote character it opened with.")
    )]
    UnterminatedString { offset: usize },

    #[error("number {literal} at offset {offset} is out of range")]
    #[diagnostic(code(lexagent::expr::number_range), help("Integers must fit in 64 bits."))]
    NumberOutOfRange { literal: String, offset: usize },

    #[error("expected {expected}, found {found} at offset {offset}")]
    #[diagnostic(
        code(lexagent::expr::syntax),
        help("Check the expression syntax, e.g. obj.size > 3 and obj.shape == 'box'.")
    )]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("expression is nested too deeply at offset {offset}")]
    #[diagnostic(
        code(lexagent::expr::too_deep),
        help("Meanings may nest at most 64 levels; teach the parts as separate words.")
    )]
    TooDeep { offset: usize },

    #[error("comparison operators cannot be chained (offset {offset})")]
    #[diagnostic(
        code(lexagent::expr::chained_comparison),
        help("Combine comparisons with `and`: obj.size > 1 and obj.size < 5.")
    )]
    ChainedComparison { offset: usize },

    #[error("unknown attribute \"{attr}\" at offset {offset}")]
    #[diagnostic(
        code(lexagent::expr::unknown_attribute),
        help("Objects only have: name, shape, color, size, material, position, owner.")
    )]
    UnknownAttribute { attr: String, offset: usize },

    #[error("unknown name \"{name}\" at offset {offset}")]
    #[diagnostic(
        code(lexagent::expr::unknown_name),
        help("Refer to objects through obj (or obj1/obj2 for relations) and an attribute, e.g. obj.color.")
    )]
    UnknownName { name: String, offset: usize },

    #[error("unknown function \"{name}\" at offset {offset}")]
    #[diagnostic(
        code(lexagent::expr::unknown_function),
        help("Available functions: abs, min, max, len.")
    )]
    UnknownFunction { name: String, offset: usize },

    #[error("variable `{var}` cannot be used in a {arity} expression")]
    #[diagnostic(
        code(lexagent::expr::wrong_variable),
        help("Nouns and properties use `obj`; relations use `obj1` and `obj2`.")
    )]
    WrongVariable {
        var: &'static str,
        arity: &'static str,
    },

    #[error("type error: {message}")]
    #[diagnostic(
        code(lexagent::expr::type_mismatch),
        help("size and position coordinates are integers; every other attribute is text.")
    )]
    TypeMismatch { message: String },

    #[error("expression evaluates to {found}, not a truth value")]
    #[diagnostic(
        code(lexagent::expr::not_predicate),
        help("A word meaning must be a condition, e.g. obj.size > 3 rather than obj.size.")
    )]
    NotPredicate { found: String },
}

/// How many objects a predicate talks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
}

impl Arity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "single-object",
            Self::Binary => "two-object",
        }
    }
}

/// A simple attribute requirement extracted from a predicate, used to
/// synthesize objects that satisfy a description.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Equals(Attr, Literal),
    SizeAtLeast(i64),
    SizeAtMost(i64),
}

/// A compiled, checked meaning expression.
#[derive(Debug, Clone)]
pub struct Predicate {
    arity: Arity,
    root: Expr,
    source: String,
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity && self.source == other.source
    }
}

impl Predicate {
    pub fn compile(source: &str, arity: Arity) -> Result<Self, ExprError> {
        let tokens = lexer::tokenize(source)?;
        let root = parser::Parser::new(tokens).parse()?;
        check::check_predicate(&root, arity)?;
        Ok(Self {
            arity,
            root,
            source: source.trim().to_string(),
        })
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Evaluate a unary predicate. Runtime failures count as false.
    pub fn test(&self, obj: &WorldObject) -> bool {
        self.truth(&Bindings::unary(obj))
    }

    /// Evaluate a relation with `obj1 = left`, `obj2 = right`.
    pub fn test_pair(&self, left: &WorldObject, right: &WorldObject) -> bool {
        self.truth(&Bindings::binary(left, right))
    }

    fn truth(&self, env: &Bindings<'_>) -> bool {
        match eval::eval(&self.root, env) {
            Ok(Value::Bool(b)) => b,
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(expression = %self.source, error = ?e, "predicate evaluation failed");
                false
            }
        }
    }

    /// Attribute requirements of a unary predicate, when it is a conjunction
    /// of simple comparisons. `None` means the shape is too complex to
    /// solve directly.
    pub fn constraints(&self) -> Option<Vec<Constraint>> {
        if self.arity != Arity::Unary {
            return None;
        }
        let mut out = Vec::new();
        collect_constraints(&self.root, &mut out).then_some(out)
    }
}

fn collect_constraints(expr: &Expr, out: &mut Vec<Constraint>) -> bool {
    match expr {
        Expr::Literal(Literal::Bool(true)) => true,
        Expr::Binary {
            left,
            op: BinOp::And,
            right,
        } => collect_constraints(left, out) && collect_constraints(right, out),
        Expr::Binary { left, op, right } => {
            // Normalize to `obj.attr <op> literal`.
            let (attr, op, lit) = match (left.as_ref(), right.as_ref()) {
                (Expr::Attr { attr, .. }, Expr::Literal(lit)) => (*attr, *op, lit),
                (Expr::Literal(lit), Expr::Attr { attr, .. }) => match flip(*op) {
                    Some(flipped) => (*attr, flipped, lit),
                    None => return false,
                },
                (Expr::Attr { attr, .. }, Expr::List(items)) if *op == BinOp::In => {
                    return match items.first() {
                        Some(Expr::Literal(lit)) => {
                            out.push(Constraint::Equals(*attr, lit.clone()));
                            true
                        }
                        _ => false,
                    };
                }
                _ => return false,
            };
            match (op, attr, lit) {
                (BinOp::Eq, _, lit) => out.push(Constraint::Equals(attr, lit.clone())),
                (BinOp::Gt, Attr::Size, Literal::Int(n)) => out.push(Constraint::SizeAtLeast(n.saturating_add(1))),
                (BinOp::Ge, Attr::Size, Literal::Int(n)) => out.push(Constraint::SizeAtLeast(*n)),
                (BinOp::Lt, Attr::Size, Literal::Int(n)) => out.push(Constraint::SizeAtMost(n.saturating_sub(1))),
                (BinOp::Le, Attr::Size, Literal::Int(n)) => out.push(Constraint::SizeAtMost(*n)),
                _ => return false,
            }
            true
        }
        _ => false,
    }
}

fn flip(op: BinOp) -> Option<BinOp> {
    match op {
        BinOp::Eq => Some(BinOp::Eq),
        BinOp::Lt => Some(BinOp::Gt),
        BinOp::Le => Some(BinOp::Ge),
        BinOp::Gt => Some(BinOp::Lt),
        BinOp::Ge => Some(BinOp::Le),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ObjectId, ObjectSpec, Owner};

    fn object(spec: ObjectSpec) -> WorldObject {
        spec.build(ObjectId(1), "thing", Some((2, 3)))
    }

    #[test]
    fn unary_property() {
        let red = Predicate::compile("obj.color == 'red'", Arity::Unary).unwrap();
        assert!(red.test(&object(ObjectSpec::default().color("red"))));
        assert!(!red.test(&object(ObjectSpec::default().color("blue"))));
    }

    #[test]
    fn relation_compares_two_objects() {
        let bigger = Predicate::compile("obj1.size > obj2.size", Arity::Binary).unwrap();
        let a = object(ObjectSpec::default().size(8));
        let b = object(ObjectSpec::default().size(3));
        assert!(bigger.test_pair(&a, &b));
        assert!(!bigger.test_pair(&b, &a));
    }

    #[test]
    fn wrong_variable_for_arity() {
        assert!(matches!(
            Predicate::compile("obj1.size > 3", Arity::Unary),
            Err(ExprError::WrongVariable { var: "obj1", .. })
        ));
        assert!(matches!(
            Predicate::compile("obj.size > 3", Arity::Binary),
            Err(ExprError::WrongVariable { var: "obj", .. })
        ));
    }

    #[test]
    fn non_boolean_rejected() {
        assert!(matches!(
            Predicate::compile("obj.size + 1", Arity::Unary),
            Err(ExprError::NotPredicate { .. })
        ));
    }

    #[test]
    fn type_mismatch_rejected() {
        assert!(matches!(
            Predicate::compile("obj.size == 'big'", Arity::Unary),
            Err(ExprError::TypeMismatch { .. })
        ));
        assert!(matches!(
            Predicate::compile("obj.color and obj.size > 1", Arity::Unary),
            Err(ExprError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn position_coordinates_and_membership() {
        let left = Predicate::compile("obj.position[0] < 3", Arity::Unary).unwrap();
        assert!(left.test(&object(ObjectSpec::default())));

        let boxy = Predicate::compile("obj.shape in ['box', 'crate']", Arity::Unary).unwrap();
        assert!(boxy.test(&object(ObjectSpec::default().shape("crate"))));
        assert!(!boxy.test(&object(ObjectSpec::default().shape("ball"))));
    }

    #[test]
    fn contained_objects_have_no_coordinates() {
        let left = Predicate::compile("obj.position[0] < 3", Arity::Unary).unwrap();
        let hidden = ObjectSpec::default().build(ObjectId(2), "x", None);
        assert!(!left.test(&hidden));
    }

    #[test]
    fn runtime_failure_is_false() {
        let odd = Predicate::compile("obj.size / (obj.size - 5) == 1", Arity::Unary).unwrap();
        assert!(!odd.test(&object(ObjectSpec::default().size(5))));
    }

    #[test]
    fn owner_compares_as_label() {
        let mine = Predicate::compile("obj.owner == 'agent'", Arity::Unary).unwrap();
        assert!(mine.test(&object(ObjectSpec::default().owner(Owner::Agent))));
    }

    #[test]
    fn constraints_from_conjunction() {
        let p = Predicate::compile(
            "obj.shape == 'box' and obj.size > 6 and 'red' == obj.color",
            Arity::Unary,
        )
        .unwrap();
        assert_eq!(
            p.constraints().unwrap(),
            vec![
                Constraint::Equals(Attr::Shape, Literal::Str("box".into())),
                Constraint::SizeAtLeast(7),
                Constraint::Equals(Attr::Color, Literal::Str("red".into())),
            ]
        );
    }

    #[test]
    fn disjunction_has_no_direct_constraints() {
        let p = Predicate::compile("obj.color == 'red' or obj.color == 'blue'", Arity::Unary).unwrap();
        assert!(p.constraints().is_none());
    }
}
