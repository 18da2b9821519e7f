//! Recursive-descent parser from the token stream to the statement tree.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::lexer::{Lexer, LexerError};
use crate::runtime::{Class, Comparator, Method, Object, ObjectHolder};
use crate::token::Token;

#[derive(Debug)]
pub enum ParserError {
    Lexer(LexerError),
    ExpectedPrimary(String),
    ExpectedLvalue,
    UnknownClass(String),
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::Lexer(e) => write!(f, "{}", e),
            ParserError::ExpectedPrimary(found) => {
                write!(f, "expected expression, found '{}'", found)
            }
            ParserError::ExpectedLvalue => write!(f, "expected lvalue expression"),
            ParserError::UnknownClass(name) => write!(f, "unknown class: {}", name),
        }
    }
}

impl Error for ParserError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParserError::Lexer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexerError> for ParserError {
    fn from(e: LexerError) -> ParserError {
        ParserError::Lexer(e)
    }
}

/// Parses a whole program into one compound statement.
pub fn parse_program(lexer: &mut Lexer) -> Result<Stmt, ParserError> {
    Parser::new(lexer).program()
}

struct Parser<'a> {
    lexer: &'a mut Lexer,

    // Classes declared so far, so `Name(...)` can resolve at parse time.
    classes: HashMap<String, Rc<Class>>,
}

impl<'a> Parser<'a> {
    fn new(lexer: &'a mut Lexer) -> Parser<'a> {
        Parser {
            lexer,
            classes: HashMap::new(),
        }
    }

    fn program(&mut self) -> Result<Stmt, ParserError> {
        let mut stmts = vec![];
        while *self.lexer.current() != Token::Eof {
            if *self.lexer.current() == Token::Newline {
                self.lexer.advance();
                continue;
            }
            stmts.push(self.statement()?);
        }
        Ok(Stmt::Compound(stmts))
    }

    fn statement(&mut self) -> Result<Stmt, ParserError> {
        match self.lexer.current() {
            Token::Class => self.class_definition(),
            Token::If => self.if_statement(),
            Token::Print => self.print_statement(),
            Token::Return => self.return_statement(),
            _ => self.expression_statement(),
        }
    }

    /// `class Name: ...` or `class Name(Parent): ...`; the body is a block
    /// of method definitions.
    fn class_definition(&mut self) -> Result<Stmt, ParserError> {
        let name = self.lexer.expect_next_identifier()?.to_string();
        self.lexer.advance();

        let parent = if *self.lexer.current() == Token::Char('(') {
            let parent_name = self.lexer.expect_next_identifier()?.to_string();
            self.lexer.advance();
            self.consume(Token::Char(')'))?;
            match self.classes.get(&parent_name) {
                Some(parent) => Some(Rc::clone(parent)),
                None => return Err(ParserError::UnknownClass(parent_name)),
            }
        } else {
            None
        };

        self.consume(Token::Char(':'))?;
        self.consume(Token::Newline)?;
        self.consume(Token::Indent)?;
        let mut methods = vec![];
        while *self.lexer.current() == Token::Def {
            methods.push(self.method_definition()?);
        }
        self.consume(Token::Dedent)?;

        let class = Rc::new(Class::new(name.clone(), methods, parent));
        self.classes.insert(name, Rc::clone(&class));
        Ok(Stmt::ClassDef(class))
    }

    fn method_definition(&mut self) -> Result<Method, ParserError> {
        let name = self.lexer.expect_next_identifier()?.to_string();
        self.lexer.advance();
        self.consume(Token::Char('('))?;
        let mut formal_params = vec![];
        if *self.lexer.current() != Token::Char(')') {
            loop {
                formal_params.push(self.lexer.expect_identifier()?.to_string());
                self.lexer.advance();
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.lexer.advance();
            }
        }
        self.consume(Token::Char(')'))?;
        self.consume(Token::Char(':'))?;
        let body = self.suite()?;
        Ok(Method {
            name,
            formal_params,
            body: Stmt::MethodBody(Box::new(body)),
        })
    }

    /// A block after `:` — either statements indented on the following
    /// lines, or a single statement on the same line.
    fn suite(&mut self) -> Result<Stmt, ParserError> {
        if *self.lexer.current() != Token::Newline {
            return self.statement();
        }
        self.lexer.advance();
        self.consume(Token::Indent)?;
        let mut stmts = vec![];
        while *self.lexer.current() != Token::Dedent {
            stmts.push(self.statement()?);
        }
        self.consume(Token::Dedent)?;
        Ok(Stmt::Compound(stmts))
    }

    fn if_statement(&mut self) -> Result<Stmt, ParserError> {
        self.lexer.advance();
        let condition = self.expression()?;
        self.consume(Token::Char(':'))?;
        let then_body = self.suite()?;
        let else_body = if *self.lexer.current() == Token::Else {
            self.lexer.advance();
            self.consume(Token::Char(':'))?;
            Some(Box::new(self.suite()?))
        } else {
            None
        };
        Ok(Stmt::If(Box::new(condition), Box::new(then_body), else_body))
    }

    fn print_statement(&mut self) -> Result<Stmt, ParserError> {
        self.lexer.advance();
        let mut args = vec![];
        if *self.lexer.current() != Token::Newline {
            loop {
                args.push(self.expression()?);
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.lexer.advance();
            }
        }
        self.consume(Token::Newline)?;
        Ok(Stmt::Print(args))
    }

    fn return_statement(&mut self) -> Result<Stmt, ParserError> {
        self.lexer.advance();
        let value = if *self.lexer.current() == Token::Newline {
            Stmt::Const(ObjectHolder::none())
        } else {
            self.expression()?
        };
        self.consume(Token::Newline)?;
        Ok(Stmt::Return(Box::new(value)))
    }

    /// An expression used as a statement; when followed by `=` it becomes a
    /// variable or field assignment (the parsed expression must then be a
    /// dotted-name chain).
    fn expression_statement(&mut self) -> Result<Stmt, ParserError> {
        let expr = self.expression()?;
        let stmt = if *self.lexer.current() == Token::Char('=') {
            self.lexer.advance();
            let rhs = Box::new(self.expression()?);
            match expr {
                Stmt::Variable(mut ids) => match ids.pop() {
                    Some(last) if ids.is_empty() => Stmt::Assign(last, rhs),
                    Some(last) => Stmt::FieldAssign(ids, last, rhs),
                    None => return Err(ParserError::ExpectedLvalue),
                },
                _ => return Err(ParserError::ExpectedLvalue),
            }
        } else {
            expr
        };
        self.consume(Token::Newline)?;
        Ok(stmt)
    }

    fn expression(&mut self) -> Result<Stmt, ParserError> {
        let mut expr = self.and_test()?;
        while *self.lexer.current() == Token::Or {
            self.lexer.advance();
            expr = Stmt::Or(Box::new(expr), Box::new(self.and_test()?));
        }
        Ok(expr)
    }

    fn and_test(&mut self) -> Result<Stmt, ParserError> {
        let mut expr = self.not_test()?;
        while *self.lexer.current() == Token::And {
            self.lexer.advance();
            expr = Stmt::And(Box::new(expr), Box::new(self.not_test()?));
        }
        Ok(expr)
    }

    fn not_test(&mut self) -> Result<Stmt, ParserError> {
        if *self.lexer.current() == Token::Not {
            self.lexer.advance();
            Ok(Stmt::Not(Box::new(self.not_test()?)))
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<Stmt, ParserError> {
        let lhs = self.sum()?;
        let comparator = match self.lexer.current() {
            Token::Eq => Comparator::Equal,
            Token::NotEq => Comparator::NotEqual,
            Token::Char('<') => Comparator::Less,
            Token::Char('>') => Comparator::Greater,
            Token::LessOrEq => Comparator::LessOrEqual,
            Token::GreaterOrEq => Comparator::GreaterOrEqual,
            _ => return Ok(lhs),
        };
        self.lexer.advance();
        let rhs = self.sum()?;
        Ok(Stmt::Comparison(comparator, Box::new(lhs), Box::new(rhs)))
    }

    fn sum(&mut self) -> Result<Stmt, ParserError> {
        let mut expr = self.term()?;
        loop {
            match self.lexer.current() {
                Token::Char('+') => {
                    self.lexer.advance();
                    expr = Stmt::Add(Box::new(expr), Box::new(self.term()?));
                }
                Token::Char('-') => {
                    self.lexer.advance();
                    expr = Stmt::Sub(Box::new(expr), Box::new(self.term()?));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Stmt, ParserError> {
        let mut expr = self.factor()?;
        loop {
            match self.lexer.current() {
                Token::Char('*') => {
                    self.lexer.advance();
                    expr = Stmt::Mul(Box::new(expr), Box::new(self.factor()?));
                }
                Token::Char('/') => {
                    self.lexer.advance();
                    expr = Stmt::Div(Box::new(expr), Box::new(self.factor()?));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Stmt, ParserError> {
        if *self.lexer.current() == Token::Char('-') {
            self.lexer.advance();
            // Unary minus: there is no dedicated node, so negate via zero.
            let operand = self.factor()?;
            return Ok(Stmt::Sub(
                Box::new(Stmt::Const(ObjectHolder::own(Object::Number(0)))),
                Box::new(operand),
            ));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Stmt, ParserError> {
        let mut expr = self.primary()?;
        while *self.lexer.current() == Token::Char('.') {
            let method = self.lexer.expect_next_identifier()?.to_string();
            self.lexer.advance();
            self.consume(Token::Char('('))?;
            let args = self.call_args()?;
            expr = Stmt::MethodCall(Box::new(expr), method, args);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Stmt, ParserError> {
        match self.lexer.current().clone() {
            Token::Number(n) => {
                self.lexer.advance();
                Ok(Stmt::Const(ObjectHolder::own(Object::Number(n))))
            }
            Token::String(s) => {
                self.lexer.advance();
                Ok(Stmt::Const(ObjectHolder::own(Object::String(s))))
            }
            Token::True => {
                self.lexer.advance();
                Ok(Stmt::Const(ObjectHolder::own(Object::Bool(true))))
            }
            Token::False => {
                self.lexer.advance();
                Ok(Stmt::Const(ObjectHolder::own(Object::Bool(false))))
            }
            Token::None => {
                self.lexer.advance();
                Ok(Stmt::Const(ObjectHolder::none()))
            }
            Token::Char('(') => {
                self.lexer.advance();
                let expr = self.expression()?;
                self.consume(Token::Char(')'))?;
                Ok(expr)
            }
            Token::Identifier(_) => self.name_expression(),
            other => Err(ParserError::ExpectedPrimary(other.to_string())),
        }
    }

    /// A dotted-name chain, optionally called: a plain chain is a variable
    /// reference; a called single name is `str(...)` or a class
    /// instantiation; a called dotted name is a method call.
    fn name_expression(&mut self) -> Result<Stmt, ParserError> {
        let mut ids = vec![self.lexer.expect_identifier()?.to_string()];
        self.lexer.advance();
        while *self.lexer.current() == Token::Char('.') {
            ids.push(self.lexer.expect_next_identifier()?.to_string());
            self.lexer.advance();
        }

        if *self.lexer.current() != Token::Char('(') {
            return Ok(Stmt::Variable(ids));
        }
        self.lexer.advance();
        let mut args = self.call_args()?;

        match ids.pop() {
            Some(last) if ids.is_empty() => {
                if last == "str" && args.len() == 1 {
                    Ok(Stmt::Stringify(Box::new(args.remove(0))))
                } else {
                    match self.classes.get(&last) {
                        Some(class) => Ok(Stmt::NewInstance(Rc::clone(class), args)),
                        None => Err(ParserError::UnknownClass(last)),
                    }
                }
            }
            Some(last) => Ok(Stmt::MethodCall(Box::new(Stmt::Variable(ids)), last, args)),
            None => Err(ParserError::ExpectedLvalue),
        }
    }

    /// Comma-separated call arguments; consumes the closing parenthesis.
    fn call_args(&mut self) -> Result<Vec<Stmt>, ParserError> {
        let mut args = vec![];
        if *self.lexer.current() != Token::Char(')') {
            loop {
                args.push(self.expression()?);
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.lexer.advance();
            }
        }
        self.consume(Token::Char(')'))?;
        Ok(args)
    }

    fn consume(&mut self, expected: Token) -> Result<(), ParserError> {
        self.lexer.expect(&expected)?;
        self.lexer.advance();
        Ok(())
    }
}
