//! Syntax tree for meaning expressions.

/// Object variables an expression may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    /// The single object of a noun or property.
    Obj,
    /// Left operand of a relation.
    Obj1,
    /// Right operand of a relation.
    Obj2,
}

impl Var {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "obj" => Some(Self::Obj),
            "obj1" => Some(Self::Obj1),
            "obj2" => Some(Self::Obj2),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Obj => "obj",
            Self::Obj1 => "obj1",
            Self::Obj2 => "obj2",
        }
    }
}

/// The closed object-attribute schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attr {
    Name,
    Shape,
    Color,
    Size,
    Material,
    Position,
    Owner,
}

impl Attr {
    pub const ALL: [Attr; 7] = [
        Attr::Name,
        Attr::Shape,
        Attr::Color,
        Attr::Size,
        Attr::Material,
        Attr::Position,
        Attr::Owner,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Shape => "shape",
            Self::Color => "color",
            Self::Size => "size",
            Self::Material => "material",
            Self::Position => "position",
            Self::Owner => "owner",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Str(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    In,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::And => "and",
            Self::Or => "or",
            Self::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Abs,
    Min,
    Max,
    Len,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(Self::Abs),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "len" => Some(Self::Len),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Len => "len",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Attr { var: Var, attr: Attr },
    Index { target: Box<Expr>, index: Box<Expr> },
    List(Vec<Expr>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { left: Box<Expr>, op: BinOp, right: Box<Expr> },
    Call { func: Func, args: Vec<Expr> },
}
