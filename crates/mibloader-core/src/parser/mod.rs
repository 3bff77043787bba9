//! MIB parser module.
//!
//! Recursive descent over the token stream. Macro invocations are parsed
//! generically: a clause is a keyword followed by content whose shape is
//! looked up in [`CLAUSES`], so new SMI macros need no parser changes.

// Allow truncation casts - source size is limited to u32::MAX bytes
#![allow(clippy::cast_possible_truncation)]

use crate::ast::{
    Assignment, AssignmentKind, ClauseBody, ClauseSyntax, Component, Field, Ident, ImportClause,
    MacroInvocation, Module, NamedNumber, QuotedString, TypeSyntax, ValueSyntax,
};
use crate::lexer::{Comment, Diagnostic, Lexer, Span, Token, TokenKind};
use crate::model::{Bound, Constraint, Tag, TagClass, TagMode, ValueRange};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Content shape of a macro clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClauseShape {
    /// A type.
    Type,
    /// A quoted string.
    Text,
    /// A bare identifier.
    Ident,
    /// `{ value, ... }`
    ValueList,
    /// `{ value }`
    BracedValue,
    /// A value.
    Value,
    /// An optional module name.
    ModuleRef,
}

/// Clause keywords of the SMIv1/SMIv2 macros.
static CLAUSES: &[(&str, ClauseShape)] = &[
    ("SYNTAX", ClauseShape::Type),
    ("WRITE-SYNTAX", ClauseShape::Type),
    ("DESCRIPTION", ClauseShape::Text),
    ("REFERENCE", ClauseShape::Text),
    ("UNITS", ClauseShape::Text),
    ("DISPLAY-HINT", ClauseShape::Text),
    ("ORGANIZATION", ClauseShape::Text),
    ("CONTACT-INFO", ClauseShape::Text),
    ("LAST-UPDATED", ClauseShape::Text),
    ("REVISION", ClauseShape::Text),
    ("PRODUCT-RELEASE", ClauseShape::Text),
    ("STATUS", ClauseShape::Ident),
    ("ACCESS", ClauseShape::Ident),
    ("MAX-ACCESS", ClauseShape::Ident),
    ("MIN-ACCESS", ClauseShape::Ident),
    ("INDEX", ClauseShape::ValueList),
    ("OBJECTS", ClauseShape::ValueList),
    ("NOTIFICATIONS", ClauseShape::ValueList),
    ("VARIABLES", ClauseShape::ValueList),
    ("MANDATORY-GROUPS", ClauseShape::ValueList),
    ("INCLUDES", ClauseShape::ValueList),
    ("CREATION-REQUIRES", ClauseShape::ValueList),
    ("AUGMENTS", ClauseShape::BracedValue),
    ("DEFVAL", ClauseShape::BracedValue),
    ("ENTERPRISE", ClauseShape::Value),
    ("GROUP", ClauseShape::Value),
    ("VARIATION", ClauseShape::Value),
    ("MODULE", ClauseShape::ModuleRef),
    ("SUPPORTS", ClauseShape::ModuleRef),
];

fn clause_shape(keyword: &str) -> Option<ClauseShape> {
    CLAUSES
        .iter()
        .find(|(text, _)| *text == keyword)
        .map(|&(_, shape)| shape)
}

/// MIB parser.
///
/// Lenient: syntax errors are collected and the parser resumes at the next
/// assignment. Only an unreadable module header aborts the parse.
pub struct Parser<'src> {
    /// Source text.
    source: &'src str,
    /// Tokens from the lexer.
    tokens: Vec<Token>,
    /// Comments from the lexer.
    comments: Vec<Comment>,
    /// Current position in the token stream.
    pos: usize,
    /// Collected diagnostics (lexer + parser).
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Parser<'src> {
    /// Create a new parser for the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let lexed = Lexer::new(source).tokenize();
        Self {
            source,
            tokens: lexed.tokens,
            comments: lexed.comments,
            pos: 0,
            diagnostics: lexed.diagnostics,
        }
    }

    /// Parse a complete module.
    ///
    /// # Errors
    ///
    /// Returns every diagnostic collected so far if the module header cannot
    /// be parsed.
    pub fn parse_module(mut self) -> Result<Module, Vec<Diagnostic>> {
        let start = self.current_span().start;
        let (name, tagging) = match self.parse_module_header() {
            Ok(header) => header,
            Err(diag) => {
                self.diagnostics.push(diag);
                return Err(self.diagnostics);
            }
        };

        let mut module = Module::new(name, Span::new(start, start));
        module.tagging = tagging;

        self.skip_exports();
        if self.check(TokenKind::KwImports) {
            let before = self.pos;
            match self.parse_imports() {
                Ok(imports) => module.imports = imports,
                Err(diag) => {
                    self.diagnostics.push(diag);
                    self.recover_to_assignment(before);
                }
            }
        }

        while !self.check(TokenKind::KwEnd) && !self.is_eof() {
            if self.skip_exports() {
                continue;
            }
            let before = self.pos;
            match self.parse_assignment() {
                Ok(assignment) => module.body.push(assignment),
                Err(diag) => {
                    self.diagnostics.push(diag);
                    self.recover_to_assignment(before);
                }
            }
        }

        if self.check(TokenKind::KwEnd) {
            let end = self.advance();
            module.span.end = end.span.end;
            if !self.is_eof() {
                let span = self.current_span();
                self.diagnostics
                    .push(Diagnostic::warning(span, "content after END ignored"));
            }
        } else {
            module.span.end = self.current_span().end;
            let diag = self.error("expected END");
            self.diagnostics.push(diag);
        }

        module.comments = self.comments;
        module.diagnostics = self.diagnostics;
        Ok(module)
    }

    // token cursor

    fn eof_token(&self) -> Token {
        let end = u32::try_from(self.source.len()).unwrap_or(u32::MAX);
        Token::new(TokenKind::Eof, Span::new(end, end))
    }

    fn is_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Token {
        self.tokens
            .get(self.pos + n)
            .copied()
            .unwrap_or_else(|| self.eof_token())
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(&format!("expected {kind:?}, found {:?}", self.peek().kind)))
        }
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    /// End of the last consumed token.
    fn prev_end(&self) -> u32 {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.span.end)
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    fn text(&self, span: Span) -> &'src str {
        span.slice(self.source)
    }

    fn ident(&self, token: Token) -> Ident {
        Ident::new(self.text(token.span), token.span)
    }

    fn error(&self, message: &str) -> Diagnostic {
        Diagnostic::error(self.current_span(), message)
    }

    fn error_at(span: Span, message: &str) -> Diagnostic {
        Diagnostic::error(span, message)
    }

    /// Whether the token at `offset` starts a macro clause.
    fn is_clause_start(&self, offset: usize) -> bool {
        let token = self.peek_nth(offset);
        match token.kind {
            TokenKind::UppercaseIdent => clause_shape(self.text(token.span)).is_some(),
            TokenKind::KwObject => self.peek_nth(offset + 1).kind != TokenKind::KwIdentifier,
            _ => false,
        }
    }

    /// Whether a newline separates the current token from the previous one.
    fn starts_line(&self) -> bool {
        let from = self.prev_end() as usize;
        let to = self.current_span().start as usize;
        self.source
            .get(from..to)
            .is_some_and(|gap| gap.contains('\n'))
            || self.pos == 0
    }

    // grammar

    /// `ModuleName [{ oid }] DEFINITIONS [EXPLICIT|IMPLICIT TAGS] ::= BEGIN`
    fn parse_module_header(&mut self) -> Result<(Ident, Option<TagMode>), Diagnostic> {
        let name = if self.peek().kind.is_identifier() {
            let token = self.advance();
            self.ident(token)
        } else {
            return Err(self.error("expected module name"));
        };

        if self.check(TokenKind::LBrace) {
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
        }

        self.expect(TokenKind::KwDefinitions)?;

        let tagging = match self.peek().kind {
            TokenKind::KwExplicit => Some(TagMode::Explicit),
            TokenKind::KwImplicit => Some(TagMode::Implicit),
            _ => None,
        };
        if tagging.is_some() {
            self.advance();
            self.expect(TokenKind::KwTags)?;
        }

        self.expect(TokenKind::ColonColonEqual)?;
        self.expect(TokenKind::KwBegin)?;
        Ok((name, tagging))
    }

    /// Skip an `EXPORTS ...;` clause; the lexer has already dropped its body.
    fn skip_exports(&mut self) -> bool {
        if !self.check(TokenKind::KwExports) {
            return false;
        }
        self.advance();
        if self.check(TokenKind::Semicolon) {
            self.advance();
        }
        true
    }

    /// `IMPORTS a, b FROM M c FROM N ;`
    fn parse_imports(&mut self) -> Result<Vec<ImportClause>, Diagnostic> {
        self.expect(TokenKind::KwImports)?;
        let mut imports = Vec::new();

        loop {
            if self.check(TokenKind::Semicolon) {
                self.advance();
                break;
            }
            if self.is_eof() || self.check(TokenKind::KwEnd) {
                return Err(self.error("unexpected end of imports"));
            }

            let start = self.current_span().start;
            let mut symbols = Vec::new();
            while !self.check(TokenKind::KwFrom) {
                let token = self.peek();
                if !token.kind.is_identifier() && !token.kind.is_keyword() {
                    return Err(self.error("expected symbol or FROM"));
                }
                if token.kind == TokenKind::KwEnd || token.kind == TokenKind::KwImports {
                    return Err(self.error("expected symbol or FROM"));
                }
                self.advance();
                symbols.push(self.ident(token));
                if self.check(TokenKind::Comma) {
                    self.advance();
                }
            }
            self.expect(TokenKind::KwFrom)?;

            let module_token = self.expect(TokenKind::UppercaseIdent)?;
            let from_module = self.ident(module_token);
            if self.check(TokenKind::LBrace) {
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
            }

            imports.push(ImportClause {
                symbols,
                from_module,
                span: self.span_from(start),
            });
        }

        Ok(imports)
    }

    /// One assignment of the module body.
    fn parse_assignment(&mut self) -> Result<Assignment, Diagnostic> {
        let start = self.current_span().start;
        let first = self.peek();

        let (name, kind) = match first.kind {
            TokenKind::UppercaseIdent => {
                self.advance();
                let name = self.ident(first);
                if self.check(TokenKind::KwMacro) {
                    self.advance();
                    self.expect(TokenKind::KwEnd)?;
                    (name, AssignmentKind::Macro)
                } else {
                    self.expect(TokenKind::ColonColonEqual)?;
                    let syntax = self.parse_type(true)?;
                    (name, AssignmentKind::Type(syntax))
                }
            }
            TokenKind::LowercaseIdent => {
                self.advance();
                let name = self.ident(first);
                let syntax = self.parse_type(true)?;
                self.expect(TokenKind::ColonColonEqual)?;
                let value = self.parse_value()?;
                (name, AssignmentKind::Value { syntax, value })
            }
            _ => {
                return Err(self.error(&format!(
                    "expected assignment, found {:?}",
                    first.kind
                )))
            }
        };

        Ok(Assignment {
            name,
            kind,
            span: self.span_from(start),
        })
    }

    /// A type, followed by an optional constraint.
    ///
    /// `allow_macro` enables macro-invocation detection, which is only
    /// unambiguous at the top of an assignment.
    fn parse_type(&mut self, allow_macro: bool) -> Result<TypeSyntax, Diagnostic> {
        let start = self.current_span().start;
        let token = self.peek();

        let base = match token.kind {
            TokenKind::LBracket => return self.parse_tagged(),
            TokenKind::KwInteger => {
                self.advance();
                let values = if self.check(TokenKind::LBrace) {
                    self.parse_named_numbers()?
                } else {
                    Vec::new()
                };
                TypeSyntax::Integer {
                    values,
                    span: self.span_from(start),
                }
            }
            TokenKind::KwBits => {
                self.advance();
                let values = if self.check(TokenKind::LBrace) {
                    self.parse_named_numbers()?
                } else {
                    Vec::new()
                };
                TypeSyntax::Bits {
                    values,
                    span: self.span_from(start),
                }
            }
            TokenKind::KwOctet => {
                self.advance();
                self.expect(TokenKind::KwString)?;
                TypeSyntax::OctetString(self.span_from(start))
            }
            TokenKind::KwObject => {
                self.advance();
                self.expect(TokenKind::KwIdentifier)?;
                TypeSyntax::ObjectIdentifier(self.span_from(start))
            }
            TokenKind::KwNull => {
                self.advance();
                TypeSyntax::Null(token.span)
            }
            TokenKind::KwBoolean => {
                self.advance();
                TypeSyntax::Boolean(token.span)
            }
            TokenKind::KwReal => {
                self.advance();
                TypeSyntax::Real(token.span)
            }
            TokenKind::KwSequence => {
                self.advance();
                if self.check(TokenKind::KwOf) {
                    self.advance();
                    let element = self.parse_type(false)?;
                    TypeSyntax::SequenceOf {
                        element: Box::new(element),
                        span: self.span_from(start),
                    }
                } else {
                    let fields = self.parse_fields()?;
                    TypeSyntax::Sequence {
                        fields,
                        span: self.span_from(start),
                    }
                }
            }
            TokenKind::KwChoice => {
                self.advance();
                let fields = self.parse_fields()?;
                TypeSyntax::Choice {
                    fields,
                    span: self.span_from(start),
                }
            }
            TokenKind::KwSet => {
                self.advance();
                let construct = if self.check(TokenKind::KwOf) {
                    self.advance();
                    self.parse_type(false)?;
                    "SET OF"
                } else {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                    "SET"
                };
                TypeSyntax::Unsupported {
                    construct,
                    span: self.span_from(start),
                }
            }
            TokenKind::KwEnumerated => {
                self.advance();
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                TypeSyntax::Unsupported {
                    construct: "ENUMERATED",
                    span: self.span_from(start),
                }
            }
            TokenKind::KwAny => {
                self.advance();
                if self.check(TokenKind::UppercaseIdent)
                    && self.text(self.current_span()) == "DEFINED"
                {
                    self.advance();
                    self.advance();
                    self.advance();
                }
                TypeSyntax::Unsupported {
                    construct: "ANY",
                    span: self.span_from(start),
                }
            }
            TokenKind::LowercaseIdent if self.peek_nth(1).kind == TokenKind::Less => {
                self.advance();
                self.advance();
                self.parse_type(false)?;
                TypeSyntax::Unsupported {
                    construct: "selection type",
                    span: self.span_from(start),
                }
            }
            TokenKind::UppercaseIdent if allow_macro && self.is_clause_start(1) => {
                return self.parse_macro_invocation().map(TypeSyntax::Macro);
            }
            TokenKind::UppercaseIdent => {
                self.advance();
                let mut module = None;
                let mut name = self.ident(token);
                if self.check(TokenKind::Dot) && self.peek_nth(1).kind == TokenKind::UppercaseIdent
                {
                    self.advance();
                    let qualified = self.advance();
                    module = Some(name);
                    name = self.ident(qualified);
                }
                let values = if self.check(TokenKind::LBrace) {
                    self.parse_named_numbers()?
                } else {
                    Vec::new()
                };
                TypeSyntax::Reference {
                    module,
                    name,
                    values,
                    span: self.span_from(start),
                }
            }
            _ => return Err(self.error(&format!("expected type, found {:?}", token.kind))),
        };

        self.parse_constraint_suffix(base, start)
    }

    /// Wrap `base` in a trailing `( ... )` constraint, if present.
    fn parse_constraint_suffix(
        &mut self,
        base: TypeSyntax,
        start: u32,
    ) -> Result<TypeSyntax, Diagnostic> {
        if !self.check(TokenKind::LParen) {
            return Ok(base);
        }
        if self.peek_nth(1).kind == TokenKind::KwWith {
            self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
            return Ok(TypeSyntax::Unsupported {
                construct: "WITH COMPONENTS",
                span: self.span_from(start),
            });
        }
        let constraint = self.parse_constraint()?;
        Ok(TypeSyntax::Constrained {
            base: Box::new(base),
            constraint,
            span: self.span_from(start),
        })
    }

    /// `[APPLICATION 1] IMPLICIT T`
    fn parse_tagged(&mut self) -> Result<TypeSyntax, Diagnostic> {
        let start = self.current_span().start;
        self.expect(TokenKind::LBracket)?;
        let class = match self.peek().kind {
            TokenKind::KwUniversal => TagClass::Universal,
            TokenKind::KwApplication => TagClass::Application,
            TokenKind::KwPrivate => TagClass::Private,
            _ => TagClass::Context,
        };
        if class != TagClass::Context {
            self.advance();
        }
        let number_token = self.expect(TokenKind::Number)?;
        let number = self.parse_u32(number_token.span, "tag number");
        self.expect(TokenKind::RBracket)?;

        let mode = match self.peek().kind {
            TokenKind::KwImplicit => Some(TagMode::Implicit),
            TokenKind::KwExplicit => Some(TagMode::Explicit),
            _ => None,
        };
        if mode.is_some() {
            self.advance();
        }

        let inner = self.parse_type(false)?;
        Ok(TypeSyntax::Tagged {
            tag: Tag::new(class, number),
            mode,
            inner: Box::new(inner),
            span: self.span_from(start),
        })
    }

    /// `(SIZE (0..255))` or `(0..10 | 20)`
    fn parse_constraint(&mut self) -> Result<Constraint, Diagnostic> {
        self.expect(TokenKind::LParen)?;
        let constraint = if self.check(TokenKind::KwSize) {
            self.advance();
            self.expect(TokenKind::LParen)?;
            let ranges = self.parse_ranges()?;
            self.expect(TokenKind::RParen)?;
            Constraint::Size(ranges)
        } else {
            Constraint::Values(self.parse_ranges()?)
        };
        self.expect(TokenKind::RParen)?;
        Ok(constraint)
    }

    fn parse_ranges(&mut self) -> Result<Vec<ValueRange>, Diagnostic> {
        let mut ranges = Vec::new();
        loop {
            let lower = self.parse_bound()?;
            let upper = if self.check(TokenKind::DotDot) {
                self.advance();
                Some(self.parse_bound()?)
            } else {
                None
            };
            ranges.push(ValueRange { lower, upper });
            if self.check(TokenKind::Pipe) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(ranges)
    }

    fn parse_bound(&mut self) -> Result<Bound, Diagnostic> {
        let token = self.peek();
        match token.kind {
            TokenKind::KwMin => {
                self.advance();
                Ok(Bound::Min)
            }
            TokenKind::KwMax => {
                self.advance();
                Ok(Bound::Max)
            }
            TokenKind::Number | TokenKind::NegativeNumber => {
                self.advance();
                Ok(Bound::Number(self.parse_i128(token.span, "range bound")))
            }
            TokenKind::HexString | TokenKind::BinString => {
                self.advance();
                let (digits, radix) = self.binary_digits(token);
                match i128::from_str_radix(&digits, radix) {
                    Ok(n) => Ok(Bound::Number(n)),
                    Err(_) => Err(Self::error_at(token.span, "invalid range bound")),
                }
            }
            _ => Err(self.error("expected range bound")),
        }
    }

    /// `{ label(1), other(2) }`
    fn parse_named_numbers(&mut self) -> Result<Vec<NamedNumber>, Diagnostic> {
        self.expect(TokenKind::LBrace)?;
        let mut values = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let start = self.current_span().start;
            let label = self.peek();
            if !label.kind.is_identifier() {
                return Err(self.error("expected enumeration label"));
            }
            self.advance();
            self.expect(TokenKind::LParen)?;
            let number = self.peek();
            if !matches!(number.kind, TokenKind::Number | TokenKind::NegativeNumber) {
                return Err(self.error("expected number"));
            }
            self.advance();
            let value = self.parse_i128(number.span, "enumeration value");
            self.expect(TokenKind::RParen)?;
            values.push(NamedNumber {
                name: self.ident(label),
                value,
                span: self.span_from(start),
            });
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(values)
    }

    /// `{ name Type, ... }` of a SEQUENCE or CHOICE.
    fn parse_fields(&mut self) -> Result<Vec<Field>, Diagnostic> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let name_token = self.expect(TokenKind::LowercaseIdent)?;
            let syntax = self.parse_type(false)?;
            if self.check(TokenKind::UppercaseIdent) {
                match self.text(self.current_span()) {
                    "OPTIONAL" => {
                        self.advance();
                    }
                    "DEFAULT" => {
                        self.advance();
                        self.parse_value()?;
                    }
                    _ => {}
                }
            }
            fields.push(Field {
                name: self.ident(name_token),
                syntax,
            });
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(fields)
    }

    /// `MACRO-NAME clause*`
    fn parse_macro_invocation(&mut self) -> Result<MacroInvocation, Diagnostic> {
        let start = self.current_span().start;
        let name_token = self.advance();
        let mut clauses = Vec::new();

        while self.is_clause_start(0) {
            let keyword_token = self.advance();
            let keyword = self.ident(keyword_token);
            let shape = if keyword_token.kind == TokenKind::KwObject {
                ClauseShape::Value
            } else {
                clause_shape(&keyword.name).unwrap_or(ClauseShape::Value)
            };

            let body = match shape {
                ClauseShape::Type => ClauseBody::Type(self.parse_type(false)?),
                ClauseShape::Text => ClauseBody::Text(self.parse_quoted_string()?),
                ClauseShape::Ident => {
                    let token = self.peek();
                    if !token.kind.is_identifier() {
                        return Err(self.error(&format!("expected identifier after {}", keyword.name)));
                    }
                    self.advance();
                    ClauseBody::Ident(self.ident(token))
                }
                ClauseShape::ValueList => ClauseBody::Values(self.parse_value_list()?),
                ClauseShape::BracedValue => {
                    self.expect(TokenKind::LBrace)?;
                    let value = self.parse_value()?;
                    self.expect(TokenKind::RBrace)?;
                    ClauseBody::Value(value)
                }
                ClauseShape::Value => ClauseBody::Value(self.parse_value()?),
                ClauseShape::ModuleRef => {
                    let name = if self.check(TokenKind::UppercaseIdent) && !self.is_clause_start(0)
                    {
                        let token = self.advance();
                        Some(self.ident(token))
                    } else {
                        None
                    };
                    let oid = if name.is_some() && self.check(TokenKind::LBrace) {
                        Some(self.parse_value()?)
                    } else {
                        None
                    };
                    ClauseBody::Module { name, oid }
                }
            };
            clauses.push(ClauseSyntax { keyword, body });
        }

        Ok(MacroInvocation {
            name: self.ident(name_token),
            clauses,
            span: self.span_from(start),
        })
    }

    /// `{ a, IMPLIED b }`
    fn parse_value_list(&mut self) -> Result<Vec<ValueSyntax>, Diagnostic> {
        self.expect(TokenKind::LBrace)?;
        let mut values = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.check(TokenKind::UppercaseIdent) && self.text(self.current_span()) == "IMPLIED"
            {
                self.advance();
            }
            values.push(self.parse_value()?);
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(values)
    }

    /// A single value.
    fn parse_value(&mut self) -> Result<ValueSyntax, Diagnostic> {
        let token = self.peek();
        match token.kind {
            TokenKind::Number | TokenKind::NegativeNumber => {
                self.advance();
                Ok(ValueSyntax::Number(
                    self.parse_i128(token.span, "number"),
                    token.span,
                ))
            }
            TokenKind::HexString | TokenKind::BinString => {
                self.advance();
                let (digits, radix) = self.binary_digits(token);
                Ok(ValueSyntax::Binary {
                    digits,
                    radix,
                    span: token.span,
                })
            }
            TokenKind::QuotedString => self.parse_quoted_string().map(ValueSyntax::String),
            TokenKind::KwTrue | TokenKind::KwFalse => {
                self.advance();
                Ok(ValueSyntax::Boolean(
                    token.kind == TokenKind::KwTrue,
                    token.span,
                ))
            }
            TokenKind::KwNull => {
                self.advance();
                Ok(ValueSyntax::Null(token.span))
            }
            TokenKind::LBrace => self.parse_braced_value(),
            TokenKind::UppercaseIdent | TokenKind::LowercaseIdent => {
                self.advance();
                let first = self.ident(token);
                if self.check(TokenKind::Dot) && self.peek_nth(1).kind.is_identifier() {
                    self.advance();
                    let name_token = self.advance();
                    return Ok(ValueSyntax::Reference {
                        module: Some(first),
                        name: self.ident(name_token),
                    });
                }
                Ok(ValueSyntax::Reference {
                    module: None,
                    name: first,
                })
            }
            _ => Err(self.error(&format!("expected value, found {:?}", token.kind))),
        }
    }

    /// `{ iso org(3) 6 }` or `{ bit1, bit2 }`
    fn parse_braced_value(&mut self) -> Result<ValueSyntax, Diagnostic> {
        let start = self.current_span().start;
        self.expect(TokenKind::LBrace)?;
        let mut components = Vec::new();
        let mut separated = false;

        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let token = self.peek();
            let component_start = token.span.start;
            let component = match token.kind {
                TokenKind::Number => {
                    self.advance();
                    Component {
                        module: None,
                        name: None,
                        number: Some(self.parse_u32(token.span, "object identifier arc")),
                        span: token.span,
                    }
                }
                kind if kind.is_identifier() => {
                    self.advance();
                    let mut module = None;
                    let mut name = self.ident(token);
                    if self.check(TokenKind::Dot) && self.peek_nth(1).kind.is_identifier() {
                        self.advance();
                        let qualified = self.advance();
                        module = Some(name);
                        name = self.ident(qualified);
                    }
                    let number = if self.check(TokenKind::LParen) {
                        self.advance();
                        let number_token = self.expect(TokenKind::Number)?;
                        self.expect(TokenKind::RParen)?;
                        Some(self.parse_u32(number_token.span, "object identifier arc"))
                    } else {
                        None
                    };
                    Component {
                        module,
                        name: Some(name),
                        number,
                        span: self.span_from(component_start),
                    }
                }
                _ => return Err(self.error("expected object identifier component or label")),
            };
            components.push(component);
            if self.check(TokenKind::Comma) {
                separated = true;
                self.advance();
            }
        }

        self.expect(TokenKind::RBrace)?;
        Ok(ValueSyntax::Braced {
            components,
            separated,
            span: self.span_from(start),
        })
    }

    fn parse_quoted_string(&mut self) -> Result<QuotedString, Diagnostic> {
        let token = self.expect(TokenKind::QuotedString)?;
        let raw = self.text(token.span);
        let inner = raw.strip_prefix('"').unwrap_or(raw);
        let inner = inner.strip_suffix('"').unwrap_or(inner);
        Ok(QuotedString {
            value: inner.replace("\"\"", "\""),
            span: token.span,
        })
    }

    /// Digits and radix of a `'..'H` or `'..'B` token.
    fn binary_digits(&self, token: Token) -> (String, u32) {
        let text = self.text(token.span);
        let radix = if token.kind == TokenKind::HexString { 16 } else { 2 };
        let digits = text
            .trim_start_matches('\'')
            .trim_end_matches(|c| matches!(c, '\'' | 'H' | 'h' | 'B' | 'b'));
        (digits.chars().filter(|c| !c.is_whitespace()).collect(), radix)
    }

    /// Parse a u32, emitting a diagnostic and returning 0 on failure.
    fn parse_u32(&mut self, span: Span, context: &str) -> u32 {
        if let Ok(v) = self.text(span).parse::<u32>() {
            v
        } else {
            self.diagnostics
                .push(Self::error_at(span, &format!("invalid {context} (not a valid u32)")));
            0
        }
    }

    /// Parse an i128, emitting a diagnostic and returning 0 on failure.
    fn parse_i128(&mut self, span: Span, context: &str) -> i128 {
        if let Ok(v) = self.text(span).parse::<i128>() {
            v
        } else {
            self.diagnostics
                .push(Self::error_at(span, &format!("invalid {context}")));
            0
        }
    }

    /// Skip a balanced `open ... close` group.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> Result<(), Diagnostic> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.is_eof() {
                return Err(self.error(&format!("expected {close:?}")));
            }
            let kind = self.advance().kind;
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
            }
        }
        Ok(())
    }

    /// Skip to the next token that looks like the start of an assignment:
    /// an identifier first on its line, followed by `::=`, `MACRO` or a type.
    fn recover_to_assignment(&mut self, before: usize) {
        if self.pos == before {
            self.advance();
        }
        while !self.is_eof() && !self.check(TokenKind::KwEnd) {
            if self.at_assignment_start() {
                break;
            }
            self.advance();
        }
    }

    fn at_assignment_start(&self) -> bool {
        if !self.peek().kind.is_identifier() || self.is_clause_start(0) || !self.starts_line() {
            return false;
        }
        matches!(
            self.peek_nth(1).kind,
            TokenKind::ColonColonEqual
                | TokenKind::KwMacro
                | TokenKind::UppercaseIdent
                | TokenKind::KwObject
                | TokenKind::KwInteger
                | TokenKind::KwOctet
                | TokenKind::KwBits
                | TokenKind::KwSequence
                | TokenKind::KwNull
                | TokenKind::KwBoolean
                | TokenKind::KwReal
                | TokenKind::KwChoice
                | TokenKind::LBracket
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Severity;

    fn parse(source: &str) -> Module {
        Parser::new(source).parse_module().unwrap()
    }

    fn errors(module: &Module) -> Vec<&str> {
        module
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.as_str())
            .collect()
    }

    #[test]
    fn test_parse_empty_module() {
        let module = parse("TEST-MIB DEFINITIONS ::= BEGIN END");
        assert_eq!(module.name.name, "TEST-MIB");
        assert_eq!(module.tagging, None);
        assert!(module.body.is_empty());
        assert!(!module.has_errors());
    }

    #[test]
    fn test_parse_header_tagging() {
        let module = parse("M DEFINITIONS EXPLICIT TAGS ::= BEGIN END");
        assert_eq!(module.tagging, Some(TagMode::Explicit));
    }

    #[test]
    fn test_bad_header_aborts() {
        let diagnostics = Parser::new("M ::= BEGIN END").parse_module().unwrap_err();
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_parse_imports() {
        let module = parse(
            "TEST-MIB DEFINITIONS ::= BEGIN
            IMPORTS
                MODULE-IDENTITY, OBJECT-TYPE, mib-2 FROM SNMPv2-SMI
                DisplayString FROM SNMPv2-TC;
            END",
        );
        assert_eq!(module.imports.len(), 2);
        assert_eq!(module.imports[0].from_module.name, "SNMPv2-SMI");
        let names: Vec<_> = module.imports[0]
            .symbols
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["MODULE-IDENTITY", "OBJECT-TYPE", "mib-2"]);
        assert_eq!(module.imports[1].symbols[0].name, "DisplayString");
    }

    #[test]
    fn test_parse_value_assignment() {
        let module = parse("M DEFINITIONS ::= BEGIN ex OBJECT IDENTIFIER ::= { iso org(3) 6 } END");
        let AssignmentKind::Value { syntax, value } = &module.body[0].kind else {
            panic!("expected value assignment");
        };
        assert!(matches!(syntax, TypeSyntax::ObjectIdentifier(_)));
        let ValueSyntax::Braced {
            components,
            separated,
            ..
        } = value
        else {
            panic!("expected braced value");
        };
        assert!(!separated);
        assert_eq!(components.len(), 3);
        assert_eq!(components[0].name.as_ref().unwrap().name, "iso");
        assert_eq!(components[1].number, Some(3));
        assert_eq!(components[2].number, Some(6));
    }

    #[test]
    fn test_parse_tagged_type() {
        let module = parse(
            "M DEFINITIONS ::= BEGIN
            IpAddress ::= [APPLICATION 0] IMPLICIT OCTET STRING (SIZE (4))
            END",
        );
        let AssignmentKind::Type(TypeSyntax::Tagged {
            tag, mode, inner, ..
        }) = &module.body[0].kind
        else {
            panic!("expected tagged type");
        };
        assert_eq!(*tag, Tag::new(TagClass::Application, 0));
        assert_eq!(*mode, Some(TagMode::Implicit));
        assert!(matches!(
            inner.as_ref(),
            TypeSyntax::Constrained {
                constraint: Constraint::Size(_),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_object_type_clauses() {
        let module = parse(
            r#"M DEFINITIONS ::= BEGIN
            ifAdminStatus OBJECT-TYPE
                SYNTAX  INTEGER { up(1), down(2) }
                MAX-ACCESS  read-write
                STATUS  current
                DESCRIPTION "The ""desired"" state."
                DEFVAL { up }
                ::= { ifEntry 7 }
            END"#,
        );
        assert!(errors(&module).is_empty(), "{:?}", errors(&module));
        let AssignmentKind::Value {
            syntax: TypeSyntax::Macro(invocation),
            ..
        } = &module.body[0].kind
        else {
            panic!("expected macro invocation");
        };
        assert_eq!(invocation.name.name, "OBJECT-TYPE");
        let keywords: Vec<_> = invocation
            .clauses
            .iter()
            .map(|c| c.keyword.name.as_str())
            .collect();
        assert_eq!(
            keywords,
            vec!["SYNTAX", "MAX-ACCESS", "STATUS", "DESCRIPTION", "DEFVAL"]
        );
        let ClauseBody::Text(text) = &invocation.clauses[3].body else {
            panic!("expected text");
        };
        assert_eq!(text.value, "The \"desired\" state.");
    }

    #[test]
    fn test_syntax_reference_not_taken_as_macro() {
        let module = parse(
            "M DEFINITIONS ::= BEGIN
            ifDescr OBJECT-TYPE
                SYNTAX DisplayString
                MAX-ACCESS read-only
                STATUS current
                ::= { ifEntry 2 }
            END",
        );
        let AssignmentKind::Value {
            syntax: TypeSyntax::Macro(invocation),
            ..
        } = &module.body[0].kind
        else {
            panic!("expected macro invocation");
        };
        assert_eq!(invocation.clauses.len(), 3);
        assert!(matches!(
            &invocation.clauses[0].body,
            ClauseBody::Type(TypeSyntax::Reference { name, .. }) if name.name == "DisplayString"
        ));
    }

    #[test]
    fn test_parse_textual_convention() {
        let module = parse(
            r#"M DEFINITIONS ::= BEGIN
            DisplayString ::= TEXTUAL-CONVENTION
                DISPLAY-HINT "255a"
                STATUS       current
                DESCRIPTION  "text"
                SYNTAX       OCTET STRING (SIZE (0..255))
            PhysAddress ::= OCTET STRING
            END"#,
        );
        assert_eq!(module.body.len(), 2);
        assert!(matches!(
            &module.body[0].kind,
            AssignmentKind::Type(TypeSyntax::Macro(m)) if m.clauses.len() == 4
        ));
    }

    #[test]
    fn test_parse_compliance_module_clause() {
        let module = parse(
            r#"M DEFINITIONS ::= BEGIN
            c MODULE-COMPLIANCE
                STATUS current
                DESCRIPTION "x"
                MODULE -- this module
                    MANDATORY-GROUPS { g1 }
                MODULE IF-MIB
                    GROUP ifGroup
                    DESCRIPTION "y"
                OBJECT ifAdminStatus
                    MIN-ACCESS read-only
                ::= { m 1 }
            END"#,
        );
        assert!(errors(&module).is_empty(), "{:?}", errors(&module));
        let AssignmentKind::Value {
            syntax: TypeSyntax::Macro(m),
            ..
        } = &module.body[0].kind
        else {
            panic!("expected macro invocation");
        };
        let modules: Vec<_> = m
            .clauses
            .iter()
            .filter_map(|c| match &c.body {
                ClauseBody::Module { name, .. } => Some(name.as_ref().map(|n| n.name.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(modules, vec![None, Some("IF-MIB")]);
        assert_eq!(m.clauses.last().unwrap().keyword.name, "MIN-ACCESS");
    }

    #[test]
    fn test_parse_bits_value() {
        let module = parse(
            "M DEFINITIONS ::= BEGIN
            x OBJECT-TYPE SYNTAX BITS { a(0), b(1) } DEFVAL { { a, b } } ::= { y 1 }
            END",
        );
        let AssignmentKind::Value {
            syntax: TypeSyntax::Macro(m),
            ..
        } = &module.body[0].kind
        else {
            panic!("expected macro invocation");
        };
        assert!(matches!(
            &m.clauses[1].body,
            ClauseBody::Value(ValueSyntax::Braced { separated: true, components, .. })
                if components.len() == 2
        ));
    }

    #[test]
    fn test_parse_unsupported_constructs() {
        let module = parse(
            "M DEFINITIONS ::= BEGIN
            A ::= SET OF INTEGER
            B ::= ENUMERATED { a(1) }
            C ::= ANY
            D ::= Foo (WITH COMPONENTS { a PRESENT })
            E ::= x < F
            END",
        );
        let constructs: Vec<_> = module
            .body
            .iter()
            .filter_map(|a| match &a.kind {
                AssignmentKind::Type(TypeSyntax::Unsupported { construct, .. }) => Some(*construct),
                _ => None,
            })
            .collect();
        assert_eq!(
            constructs,
            vec!["SET OF", "ENUMERATED", "ANY", "WITH COMPONENTS", "selection type"]
        );
    }

    #[test]
    fn test_recovery_to_next_assignment() {
        let module = parse(
            "M DEFINITIONS ::= BEGIN
            a OBJECT IDENTIFIER ::= { iso 1 ]
            b OBJECT IDENTIFIER ::= { iso 2 }
            END",
        );
        assert_eq!(errors(&module).len(), 1);
        assert_eq!(module.body.len(), 1);
        assert_eq!(module.body[0].name.name, "b");
    }

    #[test]
    fn test_macro_definition() {
        let module = parse(
            "M DEFINITIONS ::= BEGIN
            OBJECT-TYPE MACRO ::= BEGIN TYPE NOTATION ::= \"SYNTAX\" type(Syntax) END
            END",
        );
        assert!(matches!(module.body[0].kind, AssignmentKind::Macro));
        assert_eq!(module.body[0].name.name, "OBJECT-TYPE");
    }

    #[test]
    fn test_content_after_end_warns() {
        let module = parse("M DEFINITIONS ::= BEGIN END trailing");
        assert!(!module.has_errors());
        assert_eq!(module.diagnostics.len(), 1);
        assert_eq!(module.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_assignment_span_covers_text() {
        let source = "M DEFINITIONS ::= BEGIN\nT ::= INTEGER (0..7)\nEND";
        let module = parse(source);
        assert_eq!(module.body[0].span.slice(source), "T ::= INTEGER (0..7)");
    }
}
