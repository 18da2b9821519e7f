use std::rc::Rc;

use crate::runtime::{Class, Comparator, ObjectHolder};

/// A statement node.
///
/// Expressions and statements share one node set: every node executes
/// against a closure and yields a value (none for the statement-like ones).
/// See [`Stmt::execute`](crate::ast::Stmt::execute).
#[derive(Debug)]
pub enum Stmt {
    /// Literal value embedded by the parser; executing it shares the value.
    Const(ObjectHolder),

    /// A dotted chain `a.b.c`: the first name is looked up in the current
    /// closure, later names in the fields of the instance found so far.
    Variable(Vec<String>),

    /// `name = rhs` in the current closure.
    Assign(String, Box<Stmt>),

    /// `object_path.field = rhs` in the fields of the resolved instance.
    FieldAssign(Vec<String>, String, Box<Stmt>),

    /// `print arg, arg, ...` to the context's output sink.
    Print(Vec<Stmt>),

    If(Box<Stmt>, Box<Stmt>, Option<Box<Stmt>>),

    /// `object.method(args)`.
    MethodCall(Box<Stmt>, String, Vec<Stmt>),

    /// `ClassName(args)`: a fresh instance per execution, with `__init__`
    /// invoked when the class has one of matching arity.
    NewInstance(Rc<Class>, Vec<Stmt>),

    /// Non-local exit carrying the value up to the enclosing method body.
    Return(Box<Stmt>),

    /// The boundary that turns a return signal into an ordinary result.
    MethodBody(Box<Stmt>),

    Compound(Vec<Stmt>),

    /// Binds the class value under its own name.
    ClassDef(Rc<Class>),

    Not(Box<Stmt>),

    /// `str(x)`: renders a value the way print would.
    Stringify(Box<Stmt>),

    Add(Box<Stmt>, Box<Stmt>),
    Sub(Box<Stmt>, Box<Stmt>),
    Mul(Box<Stmt>, Box<Stmt>),
    Div(Box<Stmt>, Box<Stmt>),

    // Both operands are evaluated before combining; there is no
    // short-circuit at the language level.
    And(Box<Stmt>, Box<Stmt>),
    Or(Box<Stmt>, Box<Stmt>),

    Comparison(Comparator, Box<Stmt>, Box<Stmt>),
}
