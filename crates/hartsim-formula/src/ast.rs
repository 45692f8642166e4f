//! Expression Abstract Syntax Tree types

use hartsim_core::CellId;

/// Expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal (including resolved `math.*` constants)
    Number(f64),
    /// Dotted `Table.Column.Row` cell reference
    CellRef(CellId),
    /// Binary operation
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    /// Call of an allowlisted function
    Function { function: Function, args: Vec<Expr> },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
}

/// The closed allowlist of callable functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Exp,
    Log,
    Abs,
    Int,
}

impl Function {
    /// Look up a function by its source name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "sqrt" => Some(Function::Sqrt),
            "exp" => Some(Function::Exp),
            "log" => Some(Function::Log),
            "abs" => Some(Function::Abs),
            "int" => Some(Function::Int),
            _ => None,
        }
    }

    /// Source name, for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sqrt => "sqrt",
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Abs => "abs",
            Function::Int => "int",
        }
    }
}
