//! Tree-walking execution of the statement nodes.

use crate::ast::Stmt;
use crate::runtime::{
    ClassInstance, Closure, Context, DummyContext, ExecResult, Interrupt, Object, ObjectHolder,
    RuntimeError, ADD_METHOD, INIT_METHOD,
};

impl Stmt {
    /// Executes the node against `closure`, producing a value.
    ///
    /// Statements that have nothing to produce yield the none holder.  The
    /// error channel carries both runtime failures and the in-flight
    /// `return` signal; the latter is consumed by the `MethodBody` arm.
    pub fn execute(&self, closure: &mut Closure, context: &mut dyn Context) -> ExecResult {
        match self {
            Stmt::Const(value) => Ok(value.clone()),

            Stmt::Variable(ids) => Ok(resolve_variable(ids, closure)?),

            Stmt::Assign(name, rhs) => {
                let value = rhs.execute(closure, context)?;
                closure.insert(name.clone(), value.clone());
                Ok(value)
            }

            Stmt::FieldAssign(path, field, rhs) => {
                let object = resolve_variable(path, closure)?;
                let value = rhs.execute(closure, context)?;
                match object.as_instance() {
                    Some(instance) => {
                        instance.fields_mut().insert(field.clone(), value.clone());
                        Ok(value)
                    }
                    None => Err(RuntimeError::NotAnInstance.into()),
                }
            }

            Stmt::Print(args) => {
                let mut last = ObjectHolder::none();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(context.output(), " ")?;
                    }
                    last = arg.execute(closure, context)?;
                    last.print_to(context)?;
                }
                writeln!(context.output())?;
                Ok(last)
            }

            Stmt::If(condition, then_body, else_body) => {
                let condition = condition.execute(closure, context)?;
                if condition.is_true() {
                    then_body.execute(closure, context)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, context)
                } else {
                    Ok(ObjectHolder::none())
                }
            }

            Stmt::MethodCall(object, method, args) => {
                let object = object.execute(closure, context)?;
                let actual_args = eval_args(args, closure, context)?;
                object.call(method, &actual_args, context)
            }

            Stmt::NewInstance(class, args) => {
                let actual_args = eval_args(args, closure, context)?;
                let instance =
                    ObjectHolder::own(Object::Instance(ClassInstance::new(class.clone())));
                let has_init = instance
                    .as_instance()
                    .map_or(false, |i| i.has_method(INIT_METHOD, actual_args.len()));
                if has_init {
                    instance.call(INIT_METHOD, &actual_args, context)?;
                }
                Ok(instance)
            }

            Stmt::Return(expr) => {
                let value = expr.execute(closure, context)?;
                Err(Interrupt::Return(value))
            }

            Stmt::MethodBody(body) => match body.execute(closure, context) {
                Ok(_) => Ok(ObjectHolder::none()),
                Err(Interrupt::Return(value)) => Ok(value),
                Err(e) => Err(e),
            },

            Stmt::Compound(stmts) => {
                for stmt in stmts {
                    stmt.execute(closure, context)?;
                }
                Ok(ObjectHolder::none())
            }

            Stmt::ClassDef(class) => {
                closure.insert(
                    class.name().to_string(),
                    ObjectHolder::own(Object::Class(class.clone())),
                );
                Ok(ObjectHolder::none())
            }

            Stmt::Not(arg) => {
                let value = arg.execute(closure, context)?;
                Ok(ObjectHolder::own(Object::Bool(!value.is_true())))
            }

            Stmt::Stringify(arg) => {
                let value = arg.execute(closure, context)?;
                let mut scratch = DummyContext::new();
                value.print_to(&mut scratch)?;
                Ok(ObjectHolder::own(Object::String(scratch.into_string())))
            }

            Stmt::Add(lhs, rhs) => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                match (lhs.get(), rhs.get()) {
                    (Some(Object::Number(l)), Some(Object::Number(r))) => {
                        Ok(ObjectHolder::own(Object::Number(l + r)))
                    }
                    (Some(Object::String(l)), Some(Object::String(r))) => Ok(ObjectHolder::own(
                        Object::String(format!("{}{}", l, r)),
                    )),
                    (Some(Object::Instance(instance)), _)
                        if instance.has_method(ADD_METHOD, 1) =>
                    {
                        lhs.call(ADD_METHOD, &[rhs.clone()], context)
                    }
                    _ => Err(RuntimeError::BadOperands("add").into()),
                }
            }

            Stmt::Sub(lhs, rhs) => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                match (lhs.get(), rhs.get()) {
                    (Some(Object::Number(l)), Some(Object::Number(r))) => {
                        Ok(ObjectHolder::own(Object::Number(l - r)))
                    }
                    _ => Err(RuntimeError::BadOperands("sub").into()),
                }
            }

            Stmt::Mul(lhs, rhs) => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                match (lhs.get(), rhs.get()) {
                    (Some(Object::Number(l)), Some(Object::Number(r))) => {
                        Ok(ObjectHolder::own(Object::Number(l * r)))
                    }
                    _ => Err(RuntimeError::BadOperands("mult").into()),
                }
            }

            Stmt::Div(lhs, rhs) => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                match (lhs.get(), rhs.get()) {
                    (Some(Object::Number(_)), Some(Object::Number(0))) => {
                        Err(RuntimeError::DivisionByZero.into())
                    }
                    (Some(Object::Number(l)), Some(Object::Number(r))) => {
                        Ok(ObjectHolder::own(Object::Number(l / r)))
                    }
                    _ => Err(RuntimeError::BadOperands("div").into()),
                }
            }

            Stmt::And(lhs, rhs) => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                Ok(ObjectHolder::own(Object::Bool(
                    lhs.is_true() && rhs.is_true(),
                )))
            }

            Stmt::Or(lhs, rhs) => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                Ok(ObjectHolder::own(Object::Bool(
                    lhs.is_true() || rhs.is_true(),
                )))
            }

            Stmt::Comparison(comparator, lhs, rhs) => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                let result = comparator.apply(&lhs, &rhs, context)?;
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
        }
    }
}

fn eval_args(
    args: &[Stmt],
    closure: &mut Closure,
    context: &mut dyn Context,
) -> Result<Vec<ObjectHolder>, Interrupt> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(arg.execute(closure, context)?);
    }
    Ok(values)
}

/// Walks a dotted chain.
///
/// The chain stops early when a link resolves to something that is not a
/// class instance: that value is the result, exactly as a single-name
/// lookup would be.
fn resolve_variable(ids: &[String], closure: &Closure) -> Result<ObjectHolder, RuntimeError> {
    let (first, rest) = match ids.split_first() {
        Some(parts) => parts,
        None => return Err(RuntimeError::UnknownVariable(String::new())),
    };
    let mut value = match closure.get(first) {
        Some(value) => value.clone(),
        None => return Err(RuntimeError::UnknownVariable(first.clone())),
    };
    for name in rest {
        let next = match value.get() {
            Some(Object::Instance(instance)) => match instance.fields().get(name) {
                Some(field) => field.clone(),
                None => return Err(RuntimeError::UnknownVariable(name.clone())),
            },
            _ => return Ok(value),
        };
        value = next;
    }
    Ok(value)
}
