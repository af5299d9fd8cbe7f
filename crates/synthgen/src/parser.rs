//! A minimal recursive-descent front end producing conforming [`Node`] trees.
//!
//! `spec.md` §1 treats the grammar/parser as a collaborator outside this
//! spec's scope — "only the AST node contract is in scope." This module is
//! not that grammar's authority; it exists so the evaluator can be exercised
//! end to end from real source text (tests, the CLI) without inventing a
//! second, hand-built `Node` tree for every case. Its surface syntax is
//! intentionally small: entity blocks, field declarations, `<<`
//! inheritance, `generate(...)`, `import "...";`, and literals.

use std::rc::Rc;

use crate::{
    error::InterpretError,
    node::{LiteralKind, Node, NodeKind, SourcePos, Value},
    timestamp,
};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    /// Inner text of an `@"..."` date literal, parsed lazily so the error
    /// carries the literal's own source position.
    DateLiteral(String),
    True,
    False,
    Null,
    KwEntity,
    KwImport,
    KwGenerate,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Colon,
    Comma,
    Semicolon,
    Lt,
    Gt,
    ShiftLeft,
    Eof,
}

struct Lexed {
    token: Token,
    pos: SourcePos,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    file: Rc<str>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, file: Rc<str>) -> Self {
        Self { chars: src.char_indices().peekable(), file, line: 1, column: 1 }
    }

    fn pos(&self) -> SourcePos {
        SourcePos::new(self.file.clone(), self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn tokenize(mut self) -> Result<Vec<Lexed>, InterpretError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let pos = self.pos();
            let Some(c) = self.peek() else {
                tokens.push(Lexed { token: Token::Eof, pos });
                break;
            };
            let token = match c {
                '{' => {
                    self.bump();
                    Token::LBrace
                }
                '}' => {
                    self.bump();
                    Token::RBrace
                }
                '(' => {
                    self.bump();
                    Token::LParen
                }
                ')' => {
                    self.bump();
                    Token::RParen
                }
                ':' => {
                    self.bump();
                    Token::Colon
                }
                ',' => {
                    self.bump();
                    Token::Comma
                }
                ';' => {
                    self.bump();
                    Token::Semicolon
                }
                '<' => {
                    self.bump();
                    if self.peek() == Some('<') {
                        self.bump();
                        Token::ShiftLeft
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    self.bump();
                    Token::Gt
                }
                '@' => {
                    self.bump();
                    if self.peek() != Some('"') {
                        return Err(InterpretError::shape(pos, "Expected a quoted timestamp after `@`"));
                    }
                    let s = self.lex_string(&pos)?;
                    Token::DateLiteral(s)
                }
                '"' => Token::Str(self.lex_string(&pos)?),
                c if c.is_ascii_digit() || (c == '-' && self.looks_like_number()) => self.lex_number(&pos)?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.lex_ident(),
                other => return Err(InterpretError::shape(pos, format!("Unexpected character '{other}'"))),
            };
            tokens.push(Lexed { token, pos });
        }
        Ok(tokens)
    }

    fn looks_like_number(&mut self) -> bool {
        // Only called when the current char is '-'; a minus starts a number
        // literal if followed directly by a digit.
        let mut clone = self.chars.clone();
        clone.next();
        matches!(clone.peek(), Some((_, c)) if c.is_ascii_digit())
    }

    fn lex_string(&mut self, pos: &SourcePos) -> Result<String, InterpretError> {
        self.bump(); // opening quote
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(s),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(other) => s.push(other),
                    None => return Err(InterpretError::shape(pos.clone(), "Unterminated string literal")),
                },
                Some(c) => s.push(c),
                None => return Err(InterpretError::shape(pos.clone(), "Unterminated string literal")),
            }
        }
    }

    fn lex_number(&mut self, pos: &SourcePos) -> Result<Token, InterpretError> {
        let mut s = String::new();
        if self.peek() == Some('-') {
            s.push(self.bump().unwrap());
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            s.push(self.bump().unwrap());
        }
        if self.peek() == Some('.') {
            s.push(self.bump().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                s.push(self.bump().unwrap());
            }
            return s
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| InterpretError::shape(pos.clone(), format!("Invalid decimal literal '{s}'")));
        }
        s.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| InterpretError::shape(pos.clone(), format!("Invalid integer literal '{s}'")))
    }

    fn lex_ident(&mut self) -> Token {
        let mut s = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '$') {
            s.push(self.bump().unwrap());
        }
        match s.as_str() {
            "entity" => Token::KwEntity,
            "import" => Token::KwImport,
            "generate" => Token::KwGenerate,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Ident(s),
        }
    }
}

struct Parser {
    tokens: Vec<Lexed>,
    index: usize,
    file: Rc<str>,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.index].token
    }

    fn pos(&self) -> SourcePos {
        self.tokens[self.index].pos.clone()
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.index].token.clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), InterpretError> {
        if self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(InterpretError::shape(self.pos(), format!("Expected {what}, but got {:?}", self.peek())))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, InterpretError> {
        match self.bump() {
            Token::Ident(s) => Ok(s),
            other => Err(InterpretError::shape(self.pos(), format!("Expected {what}, but got {other:?}"))),
        }
    }

    fn parse_program(&mut self) -> Result<Node, InterpretError> {
        let pos = self.pos();
        let mut children = Vec::new();
        while *self.peek() != Token::Eof {
            children.push(self.parse_statement()?);
        }
        Ok(Node::new(NodeKind::Root, pos).with_children(children))
    }

    fn parse_statement(&mut self) -> Result<Node, InterpretError> {
        match self.peek() {
            Token::KwImport => self.parse_import(),
            Token::KwEntity => self.parse_entity(),
            Token::KwGenerate => self.parse_generation(),
            other => Err(InterpretError::shape(self.pos(), format!("Unexpected token {other:?} at statement position"))),
        }
    }

    fn parse_import(&mut self) -> Result<Node, InterpretError> {
        let pos = self.pos();
        self.bump();
        let path = match self.bump() {
            Token::Str(s) => s,
            other => return Err(InterpretError::shape(self.pos(), format!("Expected a string path, but got {other:?}"))),
        };
        self.expect(&Token::Semicolon, "`;`")?;
        Ok(Node::new(NodeKind::Import, pos).with_value(Value::Str(path)))
    }

    fn parse_entity(&mut self) -> Result<Node, InterpretError> {
        let pos = self.pos();
        self.bump(); // "entity"

        let name = if let Token::Ident(_) = self.peek() {
            Some(self.expect_ident("an entity name")?)
        } else {
            None
        };

        let related = if *self.peek() == Token::ShiftLeft {
            self.bump();
            let parent_pos = self.pos();
            let parent_name = self.expect_ident("a parent entity name")?;
            Some(Node::new(NodeKind::Identifier, parent_pos).with_value(Value::Str(parent_name)))
        } else {
            None
        };

        self.expect(&Token::LBrace, "`{`")?;
        let mut fields = Vec::new();
        while *self.peek() != Token::RBrace {
            fields.push(self.parse_field()?);
            if *self.peek() == Token::Comma {
                self.bump();
            }
        }
        self.expect(&Token::RBrace, "`}`")?;

        let mut node = Node::new(NodeKind::Entity, pos).with_children(fields);
        if let Some(name) = name {
            node = node.with_name(name);
        }
        if let Some(related) = related {
            node = node.with_related(related);
        }
        Ok(node)
    }

    fn parse_field(&mut self) -> Result<Node, InterpretError> {
        let pos = self.pos();
        let name = self.expect_ident("a field name")?;
        self.expect(&Token::Colon, "`:`")?;
        let (value, args) = self.parse_field_value()?;

        let bound = if *self.peek() == Token::Lt {
            self.bump();
            let mut values = vec![self.parse_int_literal()?];
            if *self.peek() == Token::Comma {
                self.bump();
                values.push(self.parse_int_literal()?);
            }
            self.expect(&Token::Gt, "`>`")?;
            Some(values)
        } else {
            None
        };

        let mut node = Node::new(NodeKind::Field, pos)
            .with_name(name)
            .with_value(Value::Node(Box::new(value)))
            .with_args(args);
        if let Some(bound) = bound {
            node = node.with_bound(bound);
        }
        Ok(node)
    }

    /// Returns the field's value node plus its (possibly empty) argument list.
    fn parse_field_value(&mut self) -> Result<(Node, Vec<Node>), InterpretError> {
        let pos = self.pos();
        match self.peek().clone() {
            Token::Str(s) => {
                self.bump();
                Ok((Node::new(NodeKind::Literal(LiteralKind::Str), pos).with_value(Value::Str(s)), Vec::new()))
            }
            Token::Int(i) => {
                self.bump();
                Ok((Node::new(NodeKind::Literal(LiteralKind::Integer), pos).with_value(Value::Int(i)), Vec::new()))
            }
            Token::Float(f) => {
                self.bump();
                Ok((Node::new(NodeKind::Literal(LiteralKind::Decimal), pos).with_value(Value::Float(f)), Vec::new()))
            }
            Token::DateLiteral(raw) => {
                self.bump();
                let ts = timestamp::parse_date_like_js(&raw).map_err(|msg| InterpretError::type_mismatch(pos.clone(), msg))?;
                Ok((Node::new(NodeKind::Literal(LiteralKind::Date), pos).with_value(Value::Timestamp(ts)), Vec::new()))
            }
            Token::True => {
                self.bump();
                Ok((Node::new(NodeKind::Literal(LiteralKind::Bool), pos).with_value(Value::Bool(true)), Vec::new()))
            }
            Token::False => {
                self.bump();
                Ok((Node::new(NodeKind::Literal(LiteralKind::Bool), pos).with_value(Value::Bool(false)), Vec::new()))
            }
            Token::Null => {
                self.bump();
                Ok((Node::new(NodeKind::Literal(LiteralKind::Null), pos).with_value(Value::Null), Vec::new()))
            }
            Token::KwEntity => {
                let entity = self.parse_entity()?;
                Ok((entity, Vec::new()))
            }
            Token::Ident(name) => {
                self.bump();
                let args = self.parse_optional_args()?;
                // `string`, `integer`, `decimal`, `date`, `dict` are builtin
                // type names whether or not call args follow (`spec.md` §8
                // scenario 1 uses bare `string` with no parens at all);
                // anything else is a reference to a previously declared
                // entity.
                if crate::generator::PrimitiveFieldType::from_name(&name).is_some() {
                    Ok((Node::new(NodeKind::Builtin, pos).with_value(Value::Str(name)), args))
                } else {
                    Ok((Node::new(NodeKind::Identifier, pos).with_value(Value::Str(name)), args))
                }
            }
            other => Err(InterpretError::shape(pos, format!("Unexpected field value {other:?}"))),
        }
    }

    fn parse_optional_args(&mut self) -> Result<Vec<Node>, InterpretError> {
        if *self.peek() != Token::LParen {
            return Ok(Vec::new());
        }
        self.bump();
        let mut args = Vec::new();
        while *self.peek() != Token::RParen {
            let (value, _) = self.parse_field_value()?;
            args.push(value);
            if *self.peek() == Token::Comma {
                self.bump();
            }
        }
        self.expect(&Token::RParen, "`)`")?;
        Ok(args)
    }

    fn parse_int_literal(&mut self) -> Result<Node, InterpretError> {
        let pos = self.pos();
        match self.bump() {
            Token::Int(i) => Ok(Node::new(NodeKind::Literal(LiteralKind::Integer), pos).with_value(Value::Int(i))),
            other => Err(InterpretError::type_mismatch(pos, format!("Expected an integer, but got {other:?}"))),
        }
    }

    fn parse_generation(&mut self) -> Result<Node, InterpretError> {
        let pos = self.pos();
        self.bump(); // "generate"
        self.expect(&Token::LParen, "`(`")?;

        let target_pos = self.pos();
        let target = match self.peek().clone() {
            Token::Ident(name) => {
                self.bump();
                Node::new(NodeKind::Identifier, target_pos).with_value(Value::Str(name))
            }
            Token::KwEntity => self.parse_entity()?,
            other => return Err(InterpretError::shape(target_pos, format!("Expected an entity reference, but got {other:?}"))),
        };
        self.expect(&Token::Comma, "`,`")?;
        let count = self.parse_int_literal()?;
        self.expect(&Token::RParen, "`)`")?;
        self.expect(&Token::Semicolon, "`;`")?;

        Ok(Node::new(NodeKind::Generation, pos)
            .with_value(Value::Node(Box::new(target)))
            .with_args(vec![count]))
    }
}

/// Parses `source` (from file `filename`, used only for source positions)
/// into a `root` node.
pub fn parse(source: &str, filename: &str) -> Result<Node, InterpretError> {
    let file: Rc<str> = Rc::from(filename);
    let tokens = Lexer::new(source, file.clone()).tokenize()?;
    let mut parser = Parser { tokens, index: 0, file };
    parser.parse_program()
}
