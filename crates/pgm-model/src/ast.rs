/// A loop-relative or literal index into a declared array, e.g. the `i` and `i - 1` in
/// `x[i] <- x[i - 1] + 1` (§6 "Model language").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexExpr {
    /// The enclosing `for`-loop's current counter value.
    LoopVar,
    /// The enclosing `for`-loop's counter plus a constant offset (negative for lag terms).
    LoopVarOffset(i64),
    /// A fixed 1-based position, independent of any loop.
    Literal(usize),
}

/// The left-hand side of an assignment or stochastic draw: a bare name for a scalar, or a
/// name plus an index for one element of a declared array.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub index: Option<IndexExpr>,
}

impl Target {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self { name: name.into(), index: None }
    }

    pub fn indexed(name: impl Into<String>, index: IndexExpr) -> Self {
        Self { name: name.into(), index: Some(index) }
    }
}

/// A right-hand side reference: a numeric literal, or a previously-defined variable
/// (optionally indexed the same way a [Target] is).
#[derive(Debug, Clone)]
pub enum Expr {
    Const(f64),
    Ref(Target),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Ref(Target::scalar(name))
    }

    pub fn indexed(name: impl Into<String>, index: IndexExpr) -> Self {
        Expr::Ref(Target::indexed(name, index))
    }
}

/// One statement of a model body. `For` bodies may nest further statements but this
/// language only needs one loop level for every scenario in §8, so loops do not nest.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `target <- function(args...)` (§6).
    Logical { target: Target, function: String, args: Vec<Expr> },
    /// `target ~ distribution(args...)`, optionally truncated `T(lo, hi)`.
    Stochastic {
        target: Target,
        distribution: String,
        args: Vec<Expr>,
        truncation: Option<(Expr, Expr)>,
    },
    For { var: String, lo: i64, hi: i64, body: Vec<Stmt> },
}

/// A complete model: the statements that build it. A variable's shape and extent are never
/// declared up front — the compiler infers a name's element dimension from the distribution
/// or function that first produces it, and its length from how many positions get written.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub statements: Vec<Stmt>,
}
