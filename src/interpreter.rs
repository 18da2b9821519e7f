//! API to control the interpreter.

use std::error::Error;
use std::fmt;
use std::io::prelude::*;

use crate::lexer::{Lexer, LexerError};
use crate::parser::{parse_program, ParserError};
use crate::runtime::{Closure, Interrupt, RuntimeError, SimpleContext};

/// Tree-walk interpreter.
///
/// Program output goes to the sink supplied at construction; global
/// variables persist across [`eval`](Interpreter::eval) calls.
///
/// # Example
///
/// ```
/// # use pyrite::interpreter::{Interpreter, PyriteError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let program = "\
/// class Greeter:
///   def greet(name):
///     return 'hello, ' + name
///
/// g = Greeter()
/// print g.greet('world')
/// ";
/// interp.eval(program.as_bytes())?;
///
/// assert_eq!(output, b"hello, world\n");
/// # Ok::<(), PyriteError>(())
/// ```
pub struct Interpreter<'t, W: Write> {
    output: &'t mut W,
    globals: Closure,
}

/// Errors the interpreter can raise.
#[derive(Debug)]
pub enum PyriteError {
    /// Error occurring during lexical analysis.
    Lexer(LexerError),

    /// Error occurring during syntactic analysis.
    Parse(ParserError),

    /// Error occurring during evaluation.
    Runtime(RuntimeError),
}

impl fmt::Display for PyriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PyriteError::Lexer(e) => write!(f, "lexer error: {}", e),
            PyriteError::Parse(e) => write!(f, "parse error: {}", e),
            PyriteError::Runtime(e) => write!(f, "runtime error: {}", e),
        }
    }
}

impl Error for PyriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PyriteError::Lexer(e) => Some(e),
            PyriteError::Parse(e) => Some(e),
            PyriteError::Runtime(e) => Some(e),
        }
    }
}

impl From<LexerError> for PyriteError {
    fn from(e: LexerError) -> PyriteError {
        PyriteError::Lexer(e)
    }
}

impl From<ParserError> for PyriteError {
    fn from(e: ParserError) -> PyriteError {
        PyriteError::Parse(e)
    }
}

impl From<RuntimeError> for PyriteError {
    fn from(e: RuntimeError) -> PyriteError {
        PyriteError::Runtime(e)
    }
}

impl<'t, W: Write> Interpreter<'t, W> {
    pub fn new(output: &'t mut W) -> Interpreter<'t, W> {
        Interpreter {
            output,
            globals: Closure::new(),
        }
    }

    /// Lexes, parses and executes one program against the global scope.
    pub fn eval<R: BufRead>(&mut self, input: R) -> Result<(), PyriteError> {
        let mut lexer = Lexer::new(input)?;
        let program = parse_program(&mut lexer)?;

        let mut context = SimpleContext::new(&mut *self.output);
        match program.execute(&mut self.globals, &mut context) {
            Ok(_) => Ok(()),
            // A return that reached the top of the program has no method
            // body to stop at.
            Err(Interrupt::Return(_)) => Err(RuntimeError::ReturnOutsideMethod.into()),
            Err(Interrupt::Error(e)) => Err(e.into()),
        }
    }
}

impl<W: Write> fmt::Debug for Interpreter<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("globals", &self.globals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn interpret(input: &str) -> Result<String, PyriteError> {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        interp.eval(input.as_bytes())?;
        let output = String::from_utf8(raw_output).expect("cannot convert output to string");
        Ok(output)
    }

    #[test]
    fn simple_prints() -> Result<(), PyriteError> {
        let program = "\
print 57
print 10, 24, -8
print 'hello'
print \"world\"
print True, False
print
print None
";
        assert_eq!(
            interpret(program)?,
            "57\n10 24 -8\nhello\nworld\nTrue False\n\nNone\n"
        );
        Ok(())
    }

    #[test]
    fn assignments_rebind_across_types() -> Result<(), PyriteError> {
        let program = "\
x = 57
print x
x = 'C++ black belt'
print x
y = False
x = y
print x
x = None
print x, y
";
        assert_eq!(interpret(program)?, "57\nC++ black belt\nFalse\nNone False\n");
        Ok(())
    }

    #[test]
    fn arithmetic_with_precedence() -> Result<(), PyriteError> {
        assert_eq!(
            interpret("print 1+2+3+4+5, 1*2*3*4*5, 1-2-3-4-5, 36/4/3, 2*5+10/2")?,
            "15 120 -13 3 15\n"
        );
        Ok(())
    }

    #[test]
    fn variables_are_pointers() -> Result<(), PyriteError> {
        let program = "\
class Counter:
  def __init__():
    self.value = 0

  def add():
    self.value = self.value + 1

class Dummy:
  def do_add(counter):
    counter.add()

x = Counter()
y = x

x.add()
y.add()

print x.value

d = Dummy()
d.do_add(x)

print y.value
";
        assert_eq!(interpret(program)?, "2\n3\n");
        Ok(())
    }

    #[test]
    fn user_defined_comparisons_drive_all_six_operators() -> Result<(), PyriteError> {
        let program = "\
class Rating:
  def __init__(value):
    self.value = value

  def __eq__(rhs):
    return self.value == rhs.value

  def __lt__(rhs):
    return self.value < rhs.value

a = Rating(1)
b = Rating(2)
print a == b, a != b
print a < b, a > b
print a <= b, a >= b
print (a > b) == (not (a < b) and not (a == b))
";
        assert_eq!(
            interpret(program)?,
            "False True\nTrue False\nTrue False\nTrue\n"
        );
        Ok(())
    }

    #[test]
    fn return_exits_only_the_enclosing_method() -> Result<(), PyriteError> {
        let program = "\
class T:
  def f():
    if True: return 1
    print 666

t = T()
print t.f()
";
        assert_eq!(interpret(program)?, "1\n");
        Ok(())
    }

    #[test]
    fn return_at_top_level_is_a_runtime_error() {
        match interpret("return 1\n") {
            Err(PyriteError::Runtime(RuntimeError::ReturnOutsideMethod)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn methods_resolve_through_the_inheritance_chain() -> Result<(), PyriteError> {
        let program = "\
class Animal:
  def sound():
    return '...'

  def legs():
    return 4

class Cat(Animal):
  def sound():
    return 'meow'

class Kitten(Cat):
  def describe():
    return self.sound() + ' on ' + str(self.legs()) + ' legs'

k = Kitten()
print k.describe()
";
        assert_eq!(interpret(program)?, "meow on 4 legs\n");
        Ok(())
    }

    #[test]
    fn printing_an_instance_uses_dunder_str() -> Result<(), PyriteError> {
        let program = "\
class Point:
  def __init__(x, y):
    self.x = x
    self.y = y

  def __str__():
    return '(' + str(self.x) + ', ' + str(self.y) + ')'

p = Point(1, -2)
print p
print 'p is', p
";
        assert_eq!(interpret(program)?, "(1, -2)\np is (1, -2)\n");
        Ok(())
    }

    #[test]
    fn printing_a_class_shows_its_name() -> Result<(), PyriteError> {
        let program = "\
class Counter:
  def add():
    self.value = 1

print Counter
";
        assert_eq!(interpret(program)?, "Class Counter\n");
        Ok(())
    }

    #[test]
    fn stringify_of_none_and_primitives() -> Result<(), PyriteError> {
        assert_eq!(
            interpret("print str(None), str(7), str(True), str('x')\n")?,
            "None 7 True x\n"
        );
        Ok(())
    }

    #[test]
    fn none_comparisons() -> Result<(), PyriteError> {
        assert_eq!(interpret("print None == None, None != None\n")?, "True False\n");
        Ok(())
    }

    #[test]
    fn comparing_none_for_order_is_an_error() {
        match interpret("print None < None\n") {
            Err(PyriteError::Runtime(RuntimeError::NotComparable)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn comparing_none_to_a_number_is_an_error() {
        match interpret("print None == 1\n") {
            Err(PyriteError::Runtime(RuntimeError::NotComparable)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn instances_are_not_truthy() -> Result<(), PyriteError> {
        let program = "\
class Box:
  def f():
    return 1

b = Box()
if b:
  print 'truthy'
else:
  print 'falsy'
";
        assert_eq!(interpret(program)?, "falsy\n");
        Ok(())
    }

    #[test]
    fn logical_connectives_evaluate_both_sides() -> Result<(), PyriteError> {
        let program = "\
class Tracker:
  def mark():
    self.seen = 1
    return 0

t = Tracker()
print 0 and t.mark()
print t.seen
";
        assert_eq!(interpret(program)?, "False\n1\n");
        Ok(())
    }

    #[test]
    fn string_comparison_is_lexicographic() -> Result<(), PyriteError> {
        assert_eq!(
            interpret("print 'abc' < 'abd', 'abc' == 'abc', 'b' >= 'a'\n")?,
            "True True True\n"
        );
        Ok(())
    }

    #[test]
    fn fields_are_per_instance() -> Result<(), PyriteError> {
        let program = "\
class Counter:
  def __init__():
    self.value = 0

  def add():
    self.value = self.value + 1

a = Counter()
b = Counter()
a.add()
a.add()
b.add()
print a.value, b.value
";
        assert_eq!(interpret(program)?, "2 1\n");
        Ok(())
    }

    #[test]
    fn dunder_add_on_instances() -> Result<(), PyriteError> {
        let program = "\
class Money:
  def __init__(amount):
    self.amount = amount

  def __add__(rhs):
    return self.amount + rhs.amount

print Money(3) + Money(4)
";
        assert_eq!(interpret(program)?, "7\n");
        Ok(())
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() -> Result<(), PyriteError> {
        let program = "\
# a leading comment
x = 1

# a comment between statements
if x:
  # a comment inside a block

  print 'ok'
";
        assert_eq!(interpret(program)?, "ok\n");
        Ok(())
    }

    #[test]
    fn unknown_variable_is_a_runtime_error() {
        match interpret("print ghost\n") {
            Err(PyriteError::Runtime(RuntimeError::UnknownVariable(name))) if name == "ghost" => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        match interpret("print 1/0\n") {
            Err(PyriteError::Runtime(RuntimeError::DivisionByZero)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn globals_persist_across_eval_calls() -> Result<(), PyriteError> {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        interp.eval("x = 41\n".as_bytes())?;
        interp.eval("print x + 1\n".as_bytes())?;
        let output = String::from_utf8(raw_output).expect("cannot convert output to string");
        assert_eq!(output, "42\n");
        Ok(())
    }

    #[test]
    fn uninitialized_instances_have_no_fields() {
        let program = "\
class Person:
  def set_name(name):
    self.name = name

p = Person()
print p.name
";
        match interpret(program) {
            Err(PyriteError::Runtime(RuntimeError::UnknownVariable(name))) if name == "name" => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }
}
