//! Runtime value model: dynamic values, shared ownership, classes and the
//! comparison protocol.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use crate::ast::Stmt;

pub const SELF_NAME: &str = "self";
pub const INIT_METHOD: &str = "__init__";
pub const STR_METHOD: &str = "__str__";
pub const EQ_METHOD: &str = "__eq__";
pub const LT_METHOD: &str = "__lt__";
pub const ADD_METHOD: &str = "__add__";

/// Execution context for a running program.
///
/// Everything a `print` statement writes goes through the output sink
/// supplied here.
pub trait Context {
    fn output(&mut self) -> &mut dyn Write;
}

/// Context writing program output to a borrowed sink.
pub struct SimpleContext<'a, W: Write> {
    output: &'a mut W,
}

impl<'a, W: Write> SimpleContext<'a, W> {
    pub fn new(output: &'a mut W) -> SimpleContext<'a, W> {
        SimpleContext { output }
    }
}

impl<W: Write> Context for SimpleContext<'_, W> {
    fn output(&mut self) -> &mut dyn Write {
        self.output
    }
}

impl<W: Write> fmt::Debug for SimpleContext<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleContext").finish()
    }
}

/// Context collecting output in memory; used as the scratch sink when
/// rendering a value to a string and in tests.
#[derive(Debug, Default)]
pub struct DummyContext {
    pub output: Vec<u8>,
}

impl DummyContext {
    pub fn new() -> DummyContext {
        DummyContext::default()
    }

    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Context for DummyContext {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

/// A dynamic value.  The language's none is not a variant: it is represented
/// by an empty [`ObjectHolder`].
#[derive(Debug)]
pub enum Object {
    Number(i32),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(ClassInstance),
}

/// Shared handle to a value; the empty handle is the none value.
///
/// Cloning a holder shares the underlying object, so two variables bound to
/// the same instance observe each other's field mutations.  Cloning is also
/// how `self` is injected into method closures without duplicating
/// ownership.
#[derive(Debug, Clone)]
pub struct ObjectHolder(Option<Rc<Object>>);

/// Table of variable bindings forming one scope.
pub type Closure = HashMap<String, ObjectHolder>;

/// A method of a user-defined class.
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Stmt,
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("formal_params", &self.formal_params)
            .finish()
    }
}

/// Metadata of a user-defined class.
///
/// The method table is flattened at construction: it starts as a copy of the
/// parent's table (which already contains every ancestor method) and own
/// methods overlay it, shadowing by name.  The table never changes
/// afterwards.
pub struct Class {
    name: String,
    parent: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Method>>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Class {
        let mut table = match &parent {
            Some(parent) => parent.methods.clone(),
            None => HashMap::new(),
        };
        for method in methods {
            table.insert(method.name.clone(), Rc::new(method));
        }
        Class {
            name,
            parent,
            methods: table,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves a method by name, through the flattened ancestor table.
    pub fn method(&self, name: &str) -> Option<&Rc<Method>> {
        self.methods.get(name)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An object of a user-defined class: a class reference plus a field table.
pub struct ClassInstance {
    class: Rc<Class>,
    fields: RefCell<Closure>,
}

impl ClassInstance {
    pub fn new(class: Rc<Class>) -> ClassInstance {
        ClassInstance {
            class,
            fields: RefCell::new(Closure::new()),
        }
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    /// True when the class has a method of that name taking `arity`
    /// parameters.
    pub fn has_method(&self, name: &str, arity: usize) -> bool {
        match self.class.method(name) {
            Some(method) => method.formal_params.len() == arity,
            None => false,
        }
    }

    pub fn fields(&self) -> Ref<'_, Closure> {
        self.fields.borrow()
    }

    pub fn fields_mut(&self) -> RefMut<'_, Closure> {
        self.fields.borrow_mut()
    }
}

impl fmt::Debug for ClassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInstance")
            .field("class", &self.class.name())
            .finish()
    }
}

impl ObjectHolder {
    /// Takes ownership of a freshly constructed value.
    pub fn own(object: Object) -> ObjectHolder {
        ObjectHolder(Some(Rc::new(object)))
    }

    /// The empty holder, i.e. the none value.
    pub fn none() -> ObjectHolder {
        ObjectHolder(None)
    }

    pub fn get(&self) -> Option<&Object> {
        self.0.as_deref()
    }

    pub fn as_instance(&self) -> Option<&ClassInstance> {
        match self.get() {
            Some(Object::Instance(instance)) => Some(instance),
            _ => None,
        }
    }

    /// The truthiness rule: nonzero numbers, non-empty strings and true are
    /// truthy; everything else, instances and classes included, is not.
    pub fn is_true(&self) -> bool {
        match self.get() {
            Some(Object::Number(n)) => *n != 0,
            Some(Object::String(s)) => !s.is_empty(),
            Some(Object::Bool(b)) => *b,
            _ => false,
        }
    }

    /// Calls a method of the held instance.
    ///
    /// A fresh closure is populated with `self` (a shared handle to this
    /// very instance) and the formal parameters bound to `actual_args`, then
    /// the method body runs against it.
    pub fn call(
        &self,
        method: &str,
        actual_args: &[ObjectHolder],
        context: &mut dyn Context,
    ) -> ExecResult {
        let instance = match self.as_instance() {
            Some(instance) => instance,
            None => return Err(RuntimeError::NotAnInstance.into()),
        };
        let resolved = match instance.class.method(method) {
            Some(resolved) if resolved.formal_params.len() == actual_args.len() => {
                Rc::clone(resolved)
            }
            _ => return Err(RuntimeError::UnknownMethod(method.to_string()).into()),
        };

        let mut closure = Closure::new();
        closure.insert(SELF_NAME.to_string(), self.clone());
        for (param, value) in resolved.formal_params.iter().zip(actual_args) {
            closure.insert(param.clone(), value.clone());
        }
        resolved.body.execute(&mut closure, context)
    }

    /// Prints the held value to the context's output sink.
    ///
    /// The empty holder prints `None`; instances print through `__str__`
    /// when the class provides it and fall back to their address otherwise.
    pub fn print_to(&self, context: &mut dyn Context) -> Result<(), Interrupt> {
        match self.get() {
            None => write!(context.output(), "None")?,
            Some(Object::Number(n)) => write!(context.output(), "{}", n)?,
            Some(Object::String(s)) => write!(context.output(), "{}", s)?,
            Some(Object::Bool(true)) => write!(context.output(), "True")?,
            Some(Object::Bool(false)) => write!(context.output(), "False")?,
            Some(Object::Class(class)) => write!(context.output(), "Class {}", class.name())?,
            Some(Object::Instance(instance)) => {
                if instance.has_method(STR_METHOD, 0) {
                    let rendered = self.call(STR_METHOD, &[], context)?;
                    rendered.print_to(context)?;
                } else {
                    write!(context.output(), "{:p}", instance)?;
                }
            }
        }
        Ok(())
    }
}

/// Why the execution of a statement stopped before producing a value.
///
/// `Return` is the non-local exit raised by a `return` statement; only the
/// method-body boundary turns it back into a normal result.  Everything
/// else is a genuine failure.
#[derive(Debug)]
pub enum Interrupt {
    Return(ObjectHolder),
    Error(RuntimeError),
}

pub type ExecResult = Result<ObjectHolder, Interrupt>;

impl From<RuntimeError> for Interrupt {
    fn from(e: RuntimeError) -> Interrupt {
        Interrupt::Error(e)
    }
}

impl From<io::Error> for Interrupt {
    fn from(e: io::Error) -> Interrupt {
        Interrupt::Error(RuntimeError::Io(e))
    }
}

#[derive(Debug)]
pub enum RuntimeError {
    UnknownVariable(String),
    UnknownMethod(String),
    NotAnInstance,
    NotComparable,
    DivisionByZero,
    BadOperands(&'static str),
    ReturnOutsideMethod,
    Io(io::Error),
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnknownVariable(name) => write!(f, "unknown variable: {}", name),
            RuntimeError::UnknownMethod(name) => write!(f, "unknown method: {}", name),
            RuntimeError::NotAnInstance => write!(f, "value is not a class instance"),
            RuntimeError::NotComparable => write!(f, "cannot compare objects"),
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::BadOperands(op) => write!(f, "incorrect {} operands", op),
            RuntimeError::ReturnOutsideMethod => write!(f, "return outside of a method"),
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> RuntimeError {
        RuntimeError::Io(e)
    }
}

/// Equality of two values.
///
/// Two nones are equal; numbers, strings and bools compare by value; an
/// instance on the left is asked through `__eq__`, which must yield a Bool.
/// Every other pairing cannot be compared.
pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Interrupt> {
    match (lhs.get(), rhs.get()) {
        (None, None) => Ok(true),
        (Some(Object::Number(l)), Some(Object::Number(r))) => Ok(l == r),
        (Some(Object::String(l)), Some(Object::String(r))) => Ok(l == r),
        (Some(Object::Bool(l)), Some(Object::Bool(r))) => Ok(l == r),
        _ => dunder_compare(lhs, rhs, EQ_METHOD, context),
    }
}

/// Strict ordering of two values.
///
/// Unlike [`equal`], two nones do not compare: none on either side is an
/// error.
pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Interrupt> {
    match (lhs.get(), rhs.get()) {
        (Some(Object::Number(l)), Some(Object::Number(r))) => Ok(l < r),
        (Some(Object::String(l)), Some(Object::String(r))) => Ok(l < r),
        (Some(Object::Bool(l)), Some(Object::Bool(r))) => Ok(l < r),
        _ => dunder_compare(lhs, rhs, LT_METHOD, context),
    }
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Interrupt> {
    Ok(!equal(lhs, rhs, context)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Interrupt> {
    Ok(!less(lhs, rhs, context)? && !equal(lhs, rhs, context)?)
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Interrupt> {
    Ok(less(lhs, rhs, context)? || equal(lhs, rhs, context)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Interrupt> {
    Ok(!less(lhs, rhs, context)?)
}

fn dunder_compare(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    method: &str,
    context: &mut dyn Context,
) -> Result<bool, Interrupt> {
    if let Some(instance) = lhs.as_instance() {
        if instance.has_method(method, 1) {
            let result = lhs.call(method, &[rhs.clone()], context)?;
            return match result.get() {
                Some(Object::Bool(b)) => Ok(*b),
                _ => Err(RuntimeError::NotComparable.into()),
            };
        }
    }
    Err(RuntimeError::NotComparable.into())
}

/// The comparison applied by a comparison expression.
///
/// Only [`equal`] and [`less`] touch the values; the other four are derived
/// from them, so user classes drive all six operators with `__eq__` and
/// `__lt__` alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl Comparator {
    pub fn apply(
        &self,
        lhs: &ObjectHolder,
        rhs: &ObjectHolder,
        context: &mut dyn Context,
    ) -> Result<bool, Interrupt> {
        match self {
            Comparator::Equal => equal(lhs, rhs, context),
            Comparator::NotEqual => not_equal(lhs, rhs, context),
            Comparator::Less => less(lhs, rhs, context),
            Comparator::Greater => greater(lhs, rhs, context),
            Comparator::LessOrEqual => less_or_equal(lhs, rhs, context),
            Comparator::GreaterOrEqual => greater_or_equal(lhs, rhs, context),
        }
    }
}
