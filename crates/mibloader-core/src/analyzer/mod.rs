//! Syntax tree to module.
//!
//! The analyzer creates the symbols of one parsed module. Every named type or
//! value becomes an unresolved reference that captures the context in effect
//! where it was written:
//!
//! ```text
//! own symbols → import 0 → ... → import n → default roots
//! ```
//!
//! Nested sub-scopes extend that chain for their extent only. A `MODULE`
//! clause of a compliance statement makes the named module's whole namespace
//! visible to the clauses that follow it, and a `DEFVAL` sees the labels of
//! the enclosing `SYNTAX`.

use crate::ast::{self, AssignmentKind, ClauseBody, TypeSyntax, ValueSyntax};
use crate::context::{Anchor, Context};
use crate::diag::{Log, Location};
use crate::lexer::{self, Span};
use crate::loader::Origin;
use crate::model::{
    Clause, ClauseContent, Deferred, Field, Import, MacroType, Module, ModuleId, NamedNumber,
    OidArc, OidComponents, SmiVersion, Symbol, SymbolKind, TagMode, Type, TypeKind, Value,
    ValueKind, ValueReference,
};
use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Base modules whose import marks a module as SMIv2.
const SMIV2_BASE_MODULES: [&str; 3] = ["SNMPv2-SMI", "SNMPv2-TC", "SNMPv2-CONF"];

/// Longest descriptor RFC 2578 allows.
const MAX_DESCRIPTOR_LEN: usize = 64;

/// Build the module for a parsed syntax tree.
///
/// Syntax diagnostics carried by the tree and every semantic problem found
/// while building are appended to `log`. `default_tagging` applies when the
/// module header does not name a tagging mode.
pub fn analyze(
    tree: &ast::Module,
    id: ModuleId,
    origin: Option<&Origin>,
    text: String,
    default_tagging: TagMode,
    log: &mut Log,
) -> Module {
    let file = origin.map(ToString::to_string);
    let mut module = Module::new(id, tree.name.name.as_str(), file, text);
    module.on_disk = matches!(origin, Some(Origin::File(_)));
    module.tagging = tree.tagging.unwrap_or(default_tagging);

    let mut analyzer = Analyzer {
        module,
        log,
        stack: Vec::new(),
    };
    analyzer.report_syntax(&tree.diagnostics);
    analyzer.add_imports(&tree.imports);
    analyzer.module.smi_version = detect_version(tree);
    analyzer.attach_module_comments(tree);

    let standing = analyzer.module.context.clone();
    analyzer.stack.push(standing);
    let mut previous_end = tree
        .imports
        .last()
        .map_or(tree.name.span.end, |i| i.span.end);
    for assignment in &tree.body {
        let comment = comments_between(&tree.comments, previous_end, assignment.span.start);
        analyzer.add_assignment(assignment, comment);
        previous_end = assignment.span.end;
    }
    analyzer.module
}

/// SMIv2 if the module declares a `MODULE-IDENTITY`, imports from an SMIv2
/// base module, or is itself named like one.
fn detect_version(tree: &ast::Module) -> SmiVersion {
    let identity = tree.body.iter().any(|a| {
        matches!(
            &a.kind,
            AssignmentKind::Value {
                syntax: TypeSyntax::Macro(m),
                ..
            } if m.name.name == "MODULE-IDENTITY"
        )
    });
    let imports_v2 = tree
        .imports
        .iter()
        .any(|i| SMIV2_BASE_MODULES.contains(&i.from_module.name.as_str()));
    if identity || imports_v2 || tree.name.name.starts_with("SNMPv2-") {
        SmiVersion::V2
    } else {
        SmiVersion::V1
    }
}

/// Comments lying entirely inside `[from, to)`, joined by newlines.
fn comments_between(comments: &[lexer::Comment], from: u32, to: u32) -> Option<String> {
    let parts: Vec<&str> = comments
        .iter()
        .filter(|c| c.span.start >= from && c.span.end <= to && !c.text.is_empty())
        .map(|c| c.text.as_str())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

struct Analyzer<'log> {
    module: Module,
    log: &'log mut Log,
    /// Context stack; the top is in effect.
    stack: Vec<Rc<Context>>,
}

impl Analyzer<'_> {
    fn location(&self, span: Span) -> Location {
        self.module.location(span)
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        let location = self.location(span);
        self.log.add_error(location, message);
    }

    fn warning(&mut self, span: Span, message: impl Into<String>) {
        let location = self.location(span);
        self.log.add_warning(location, message);
    }

    fn current(&self) -> Rc<Context> {
        self.stack
            .last()
            .cloned()
            .unwrap_or_else(|| self.module.context.clone())
    }

    /// Run `f` with `context` pushed; popped on every exit path of `f`.
    fn scoped<R>(&mut self, context: Rc<Context>, f: impl FnOnce(&mut Self) -> R) -> R {
        self.stack.push(context);
        let result = f(self);
        self.stack.pop();
        result
    }

    fn report_syntax(&mut self, diagnostics: &[lexer::Diagnostic]) {
        for diag in diagnostics {
            match diag.severity {
                lexer::Severity::Error => self.error(diag.span, diag.message.as_str()),
                lexer::Severity::Warning => self.warning(diag.span, diag.message.as_str()),
            }
        }
    }

    /// Record the explicit imports and build the standing context chain.
    fn add_imports(&mut self, clauses: &[ast::ImportClause]) {
        for clause in clauses {
            let location = self.location(clause.from_module.span);
            let symbols = clause.symbols.iter().map(|s| s.name.clone()).collect();
            self.module.imports.push(Import::new(
                clause.from_module.name.as_str(),
                Some(symbols),
                location,
            ));
        }

        let id = self.module.id;
        let mut chain = Rc::new(Context::Default);
        for index in (0..self.module.imports.len()).rev() {
            chain = Context::compound(Rc::new(Context::Import { module: id, index }), chain);
        }
        self.module.context = Context::compound(Rc::new(Context::Module(id)), chain);
    }

    fn attach_module_comments(&mut self, tree: &ast::Module) {
        self.module.header_comment = comments_between(&tree.comments, 0, tree.span.start);
        let body_end = tree.body.last().map_or(tree.span.start, |a| a.span.end);
        self.module.footer_comment = comments_between(&tree.comments, body_end, u32::MAX);
    }

    /// Context of import `index`.
    fn import_context(&self, index: usize) -> Rc<Context> {
        Rc::new(Context::Import {
            module: self.module.id,
            index,
        })
    }

    /// Index of the import of `name`, adding an implicit one if the module
    /// does not import from it.
    fn import_index(&mut self, name: &ast::Ident) -> usize {
        match self.module.imports.iter().position(|i| i.name == name.name) {
            Some(index) => index,
            None => self.implicit_import_index(name),
        }
    }

    /// Index of the implicit, unrestricted import of `name`, added on first
    /// use.
    fn implicit_import_index(&mut self, name: &ast::Ident) -> usize {
        if let Some(index) = self
            .module
            .imports
            .iter()
            .position(|i| i.implicit && i.name == name.name)
        {
            return index;
        }
        let mut import = Import::new(name.name.as_str(), None, self.location(name.span));
        import.implicit = true;
        self.module.imports.push(import);
        self.module.imports.len() - 1
    }

    /// Context for a name qualified by `module`, or the current context.
    fn qualified(&mut self, module: Option<&ast::Ident>) -> Rc<Context> {
        match module {
            Some(module) => {
                let index = self.import_index(module);
                self.import_context(index)
            }
            None => self.current(),
        }
    }

    fn check_naming(&mut self, name: &ast::Ident) {
        if name.name.contains('_') {
            self.warning(
                name.span,
                format!("identifier '{}' contains an underscore", name.name),
            );
        }
        if name.name.ends_with('-') {
            self.warning(
                name.span,
                format!("identifier '{}' ends with a hyphen", name.name),
            );
        }
        if name.name.len() > MAX_DESCRIPTOR_LEN {
            self.warning(
                name.span,
                format!(
                    "identifier '{}' is longer than {MAX_DESCRIPTOR_LEN} characters",
                    name.name
                ),
            );
        }
    }

    fn add_assignment(&mut self, assignment: &ast::Assignment, comment: Option<String>) {
        let name = &assignment.name;
        if self.module.by_name.contains_key(&name.name) {
            self.error(
                name.span,
                format!("duplicate definition of '{}'", name.name),
            );
            return;
        }
        self.check_naming(name);

        let kind = match &assignment.kind {
            AssignmentKind::Type(syntax) => {
                SymbolKind::Type(Deferred::Unresolved(self.lower_type(syntax)))
            }
            AssignmentKind::Value { syntax, value } => {
                let ty = self.lower_type(syntax);
                let value = self.lower_value(value);
                SymbolKind::Value {
                    ty: Deferred::Unresolved(ty),
                    value: Deferred::Unresolved(value),
                }
            }
            AssignmentKind::Macro => SymbolKind::Macro,
        };

        let mut symbol = Symbol::new(name.name.as_str(), Some(self.module.id), kind);
        symbol.location = self.location(assignment.span);
        symbol.end_line = self.module.end_line(assignment.span);
        symbol.span = assignment.span;
        symbol.comment = comment;
        if self.module.add_symbol(symbol).is_none() {
            self.log.add_internal_error(
                self.module.location(name.span),
                format!("symbol table of module {} is full", self.module.name),
            );
        }
    }

    /// Create local label symbols for an enumeration or bit list.
    fn lower_named_numbers(&mut self, values: &[ast::NamedNumber]) -> Vec<NamedNumber> {
        let mut lowered: Vec<NamedNumber> = Vec::with_capacity(values.len());
        for value in values {
            if lowered.iter().any(|n| n.name == value.name.name) {
                self.error(
                    value.name.span,
                    format!("duplicate enumeration label '{}'", value.name.name),
                );
                continue;
            }
            let mut label = Symbol::new(
                value.name.name.as_str(),
                Some(self.module.id),
                SymbolKind::Value {
                    ty: Deferred::Resolved(Type::integer()),
                    value: Deferred::Resolved(Value::number(value.value)),
                },
            );
            label.location = self.location(value.span);
            label.end_line = label.location.line;
            label.span = value.span;
            let symbol = self.module.add_local(label);
            lowered.push(NamedNumber {
                name: value.name.name.clone(),
                value: value.value,
                symbol,
            });
        }
        lowered
    }

    fn lower_fields(&mut self, fields: &[ast::Field]) -> Vec<Field> {
        fields
            .iter()
            .map(|f| Field {
                name: f.name.name.clone(),
                ty: self.lower_type(&f.syntax),
            })
            .collect()
    }

    fn lower_type(&mut self, syntax: &TypeSyntax) -> Type {
        match syntax {
            TypeSyntax::Reference {
                module,
                name,
                values,
                ..
            } => {
                let context = self.qualified(module.as_ref());
                let mut ty = Type::reference(context, name.name.as_str(), name.span);
                if !values.is_empty() {
                    let values = self.lower_named_numbers(values);
                    if let TypeKind::Reference(r) = &mut ty.kind {
                        r.modifiers.values = Some(values);
                    }
                }
                ty
            }
            TypeSyntax::Integer { values, .. } => Type::new(TypeKind::Integer {
                values: self.lower_named_numbers(values),
            }),
            TypeSyntax::Bits { values, .. } => Type::new(TypeKind::Bits {
                values: self.lower_named_numbers(values),
            }),
            TypeSyntax::OctetString(_) => Type::new(TypeKind::OctetString),
            TypeSyntax::ObjectIdentifier(_) => Type::new(TypeKind::ObjectIdentifier),
            TypeSyntax::Null(_) => Type::new(TypeKind::Null),
            TypeSyntax::Boolean(_) => Type::new(TypeKind::Boolean),
            TypeSyntax::Real(_) => Type::new(TypeKind::Real),
            TypeSyntax::Sequence { fields, .. } => Type::new(TypeKind::Sequence {
                fields: self.lower_fields(fields),
            }),
            TypeSyntax::SequenceOf { element, .. } => {
                Type::new(TypeKind::SequenceOf(Box::new(self.lower_type(element))))
            }
            TypeSyntax::Choice { fields, .. } => Type::new(TypeKind::Choice {
                fields: self.lower_fields(fields),
            }),
            TypeSyntax::Tagged {
                tag, mode, inner, ..
            } => {
                let mode = mode.unwrap_or(self.module.tagging);
                let mut ty = self.lower_type(inner);
                match &mut ty.kind {
                    TypeKind::Reference(r) => r.modifiers.tags.push((mode, *tag)),
                    _ => ty.apply_tag(mode, *tag),
                }
                ty
            }
            TypeSyntax::Constrained {
                base, constraint, ..
            } => {
                let mut ty = self.lower_type(base);
                match &mut ty.kind {
                    TypeKind::Reference(r) => r.modifiers.constraint = Some(constraint.clone()),
                    _ => ty.constraint = Some(constraint.clone()),
                }
                ty
            }
            TypeSyntax::Macro(invocation) => {
                Type::new(TypeKind::Macro(self.lower_macro(invocation)))
            }
            TypeSyntax::Unsupported { construct, span } => {
                self.error(*span, format!("unsupported construct: {construct}"));
                Type::placeholder()
            }
        }
    }

    /// Lower the clauses of a macro invocation.
    ///
    /// Clauses following a `MODULE Name` clause are lowered with that
    /// module's namespace on top of the stack, up to the next `MODULE`.
    fn lower_macro(&mut self, invocation: &ast::MacroInvocation) -> MacroType {
        let mut lowered = MacroType::new(invocation.name.name.as_str());
        let mut rest = invocation.clauses.as_slice();

        while let Some(first) = rest.first() {
            let end = rest[1..]
                .iter()
                .position(|c| matches!(c.body, ClauseBody::Module { .. }))
                .map_or(rest.len(), |p| p + 1);
            let (group, next) = rest.split_at(end);

            if let ClauseBody::Module { name, .. } = &first.body {
                lowered.clauses.push(Clause {
                    keyword: first.keyword.name.clone(),
                    content: ClauseContent::Module(name.as_ref().map(|n| n.name.clone())),
                });
                let context = match name {
                    Some(name) if name.name != self.module.name => {
                        let index = self.implicit_import_index(name);
                        Context::compound(self.import_context(index), self.module.context.clone())
                    }
                    _ => self.module.context.clone(),
                };
                let clauses = self.scoped(context, |this| this.lower_clauses(&group[1..]));
                lowered.clauses.extend(clauses);
            } else {
                let clauses = self.lower_clauses(group);
                lowered.clauses.extend(clauses);
            }
            rest = next;
        }
        lowered
    }

    fn lower_clauses(&mut self, clauses: &[ast::ClauseSyntax]) -> Vec<Clause> {
        let mut lowered = Vec::with_capacity(clauses.len());
        let mut syntax: Option<Type> = None;

        for clause in clauses {
            let keyword = clause.keyword.name.clone();
            let content = match &clause.body {
                ClauseBody::Type(ty) => {
                    let ty = self.lower_type(ty);
                    if keyword == "SYNTAX" {
                        syntax = Some(ty.clone());
                    }
                    ClauseContent::Type(ty)
                }
                ClauseBody::Text(text) => ClauseContent::Text(text.value.clone()),
                ClauseBody::Ident(ident) => ClauseContent::Ident(ident.name.clone()),
                ClauseBody::Values(values) => {
                    ClauseContent::Values(values.iter().map(|v| self.lower_value(v)).collect())
                }
                ClauseBody::Value(value) if keyword == "DEFVAL" => {
                    let value = match &syntax {
                        Some(ty) => {
                            let labels = Rc::new(Context::Type(Anchor::Type(Box::new(ty.clone()))));
                            let context = Context::compound(labels, self.current());
                            self.scoped(context, |this| this.lower_value(value))
                        }
                        None => self.lower_value(value),
                    };
                    ClauseContent::Value(value)
                }
                ClauseBody::Value(value) => ClauseContent::Value(self.lower_value(value)),
                ClauseBody::Module { name, .. } => {
                    ClauseContent::Module(name.as_ref().map(|n| n.name.clone()))
                }
            };
            lowered.push(Clause { keyword, content });
        }
        lowered
    }

    fn lower_value(&mut self, syntax: &ValueSyntax) -> Value {
        match syntax {
            ValueSyntax::Reference { module, name } => {
                let context = self.qualified(module.as_ref());
                Value::reference(context, name.name.as_str(), name.span)
            }
            ValueSyntax::Number(n, _) => Value::number(*n),
            ValueSyntax::Binary { digits, radix, .. } => Value::binary(digits.as_str(), *radix),
            ValueSyntax::String(s) => Value::string(s.value.as_str()),
            ValueSyntax::Boolean(b, _) => Value::new(ValueKind::Boolean(*b)),
            ValueSyntax::Null(_) => Value::new(ValueKind::Null),
            ValueSyntax::Braced {
                components,
                separated,
                span,
            } => {
                if *separated || components.is_empty() {
                    self.lower_bits(components, *span)
                } else {
                    self.lower_oid(components)
                }
            }
        }
    }

    /// `{ a, b }`: a set of bit labels.
    fn lower_bits(&mut self, components: &[ast::Component], span: Span) -> Value {
        let mut labels = Vec::with_capacity(components.len());
        for component in components {
            match (&component.name, component.number, &component.module) {
                (Some(name), None, None) => labels.push(name.name.clone()),
                _ => {
                    self.error(span, "invalid bit label in value");
                    return Value::placeholder();
                }
            }
        }
        Value::new(ValueKind::Bits(labels))
    }

    /// `{ parent name(1) 2 }`: object identifier components.
    fn lower_oid(&mut self, components: &[ast::Component]) -> Value {
        let mut parent = None;
        let mut arcs = Vec::with_capacity(components.len());

        for (position, component) in components.iter().enumerate() {
            match (&component.name, component.number) {
                (name, Some(number)) => arcs.push(OidArc {
                    name: name.as_ref().map(|n| n.name.clone()),
                    number,
                }),
                (Some(name), None) if position == 0 => {
                    let context = self.qualified(component.module.as_ref());
                    parent = Some(ValueReference {
                        context,
                        name: name.name.clone(),
                        span: name.span,
                    });
                }
                (Some(name), None) => {
                    self.error(
                        component.span,
                        format!("object identifier component '{}' has no number", name.name),
                    );
                    return Value::placeholder();
                }
                (None, None) => {
                    self.error(component.span, "empty object identifier component");
                    return Value::placeholder();
                }
            }
        }
        Value::new(ValueKind::OidComponents(OidComponents { parent, arcs }))
    }
}
