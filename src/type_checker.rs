use std::collections::{HashMap, HashSet};

use crate::{
    ast::{
        Access, Binding, BinaryOperator, Block, Class, Expr, ExprKind, Ident, Member, MemberKind,
        Method, Param, Program, Stmt, StmtKind, Symbol, TypeName, Typed, UnaryOperator, Untyped,
        VarDecl,
    },
    diagnostic::{Classify, DiagnosticKind},
    token::{Span, Spanned},
    types::{ClassInfo, ClassTable, MemberInfo, MemberInfoKind, Signature, Type},
};

pub type CheckResult = Result<(Program<Typed>, ClassTable), Vec<Spanned<Error>>>;

/// The semantic checker.
///
/// Every error found in the program is recorded, in source order. A typed
/// program is only produced if there are none.
pub struct Checker {
    classes: ClassTable,
    /// Every class name declared in the program, known before the class table
    /// is complete so that types may refer to classes declared later.
    declared: HashSet<Symbol>,
    errors: Vec<Spanned<Error>>,
    scopes: Vec<HashMap<Symbol, (Type, Binding)>>,
    current_class: Symbol,
    return_ty: Type,
}

impl Default for Checker {
    fn default() -> Self {
        Checker::new()
    }
}

impl Checker {
    pub fn new() -> Checker {
        Checker {
            classes: ClassTable::with_capacity(16),
            declared: HashSet::with_capacity(16),
            errors: Vec::with_capacity(8),
            scopes: Vec::with_capacity(8),
            current_class: Symbol::from(""),
            return_ty: Type::Void,
        }
    }

    pub fn check(mut self, program: Program<Untyped>) -> CheckResult {
        let classes = self.collect_classes(&program);
        let parents = self.resolve_parents(&classes);
        if self.reject_cycles(&classes, &parents) {
            return Err(self.into_errors());
        }
        self.build_class_table(&classes, &parents);
        log::debug!("class table built with {} classes", self.classes.len());

        // Later definitions of a duplicated class were already reported.
        let mut checked = HashSet::with_capacity(program.classes.len());
        let classes = program
            .classes
            .into_iter()
            .filter(|class| checked.insert(class.name.name.clone()))
            .map(|class| self.check_class(class))
            .collect();

        log::debug!("checking finished with {} errors", self.errors.len());
        if self.errors.is_empty() {
            Ok((Program { classes }, self.classes))
        } else {
            Err(self.into_errors())
        }
    }

    fn into_errors(mut self) -> Vec<Spanned<Error>> {
        self.errors.sort_by_key(|error| error.span.lo);
        self.errors
    }

    fn error(&mut self, span: Span, error: Error) {
        self.errors.push(span.wrap(error));
    }
}

/// Class table construction.
impl Checker {
    /// Records every class name, reporting duplicates. The first definition
    /// of a name wins.
    fn collect_classes<'p>(
        &mut self,
        program: &'p Program<Untyped>,
    ) -> HashMap<Symbol, &'p Class<Untyped>> {
        let mut map = HashMap::with_capacity(program.classes.len());
        for class in &program.classes {
            let name = &class.name;
            if map.contains_key(&name.name) {
                self.error(name.span, Error::DuplicateClass(name.name.clone()));
                continue;
            }
            self.declared.insert(name.name.clone());
            map.insert(name.name.clone(), class);
        }
        map
    }

    /// Maps each class to its parent, leaving out (and reporting) parents
    /// which aren't defined.
    fn resolve_parents(&mut self, classes: &ClassMap<'_>) -> HashMap<Symbol, Symbol> {
        let mut parents = HashMap::with_capacity(classes.len());
        for class in declaration_order(classes) {
            let Some(parent) = &class.parent else {
                continue;
            };
            if classes.contains_key(&parent.name) {
                parents.insert(class.name.name.clone(), parent.name.clone());
            } else {
                let error = Error::UndefinedParent {
                    class: class.name.name.clone(),
                    parent: parent.name.clone(),
                };
                self.error(parent.span, error);
            }
        }
        parents
    }

    /// Reports every inheritance cycle once. Returns true if there was any.
    fn reject_cycles(&mut self, classes: &ClassMap<'_>, parents: &HashMap<Symbol, Symbol>) -> bool {
        // Classes already known to be acyclic or already reported.
        let mut settled = HashSet::with_capacity(classes.len());
        let mut found = false;

        for class in declaration_order(classes) {
            let mut path: Vec<Symbol> = Vec::new();
            let mut curr = Some(class.name.name.clone());
            while let Some(name) = curr {
                if settled.contains(&name) {
                    break;
                }
                if let Some(start) = path.iter().position(|seen| *seen == name) {
                    let mut cycle = path.split_off(start);
                    cycle.push(name);
                    let span = classes[&cycle[0]]
                        .parent
                        .as_ref()
                        .map_or(Span::default(), |parent| parent.span);
                    self.error(span, Error::InheritanceCycle(cycle.clone()));
                    settled.extend(cycle);
                    found = true;
                    break;
                }
                curr = parents.get(&name).cloned();
                path.push(name);
            }
            settled.extend(path);
        }
        found
    }

    fn build_class_table(&mut self, classes: &ClassMap<'_>, parents: &HashMap<Symbol, Symbol>) {
        for class in declaration_order(classes) {
            self.define_class(classes, parents, class);
        }
    }

    /// Defines the given class, defining its ancestors first.
    fn define_class(
        &mut self,
        classes: &ClassMap<'_>,
        parents: &HashMap<Symbol, Symbol>,
        class: &Class<Untyped>,
    ) {
        let name = &class.name.name;
        if self.classes.has(name) {
            return;
        }
        let parent = parents.get(name).cloned();
        let mut members = HashMap::new();
        if let Some(parent) = &parent {
            if !self.classes.has(parent) {
                self.define_class(classes, parents, classes[parent]);
            }
            if let Some(info) = self.classes.get(parent) {
                members.clone_from(&info.members);
            }
        }

        let mut constructor = None;
        for member in &class.members {
            match &member.kind {
                MemberKind::Method(method) if method.name.name == *name => {
                    if let Some(ty) = &method.return_ty {
                        self.error(ty.span, Error::ConstructorReturnType(name.clone()));
                    }
                    let params = self.resolve_params(&method.params);
                    if constructor.is_some() {
                        let error = Error::DuplicateMember {
                            class: name.clone(),
                            member: name.clone(),
                        };
                        self.error(method.name.span, error);
                    } else {
                        let signature = Signature {
                            params,
                            ret: Type::Void,
                        };
                        constructor = Some((member.access, signature));
                    }
                }
                MemberKind::Method(method) => {
                    let params = self.resolve_params(&method.params);
                    let ret = match &method.return_ty {
                        Some(ty) => self.resolve_type(ty),
                        None => Type::Void,
                    };
                    let kind = MemberInfoKind::Method(Signature { params, ret });
                    self.add_member(&mut members, name, &method.name, member.access, kind);
                }
                MemberKind::Property(property) => {
                    if property.name.name == *name {
                        let error = Error::PropertyNamedAfterClass(name.clone());
                        self.error(property.name.span, error);
                    }
                    let ty = self.resolve_var_type(&property.ty, &property.name);
                    let kind = MemberInfoKind::Property(ty);
                    self.add_member(&mut members, name, &property.name, member.access, kind);
                }
            }
        }

        log::trace!("defining class {name}");
        let defined = self.classes.define(ClassInfo {
            name: name.clone(),
            parent,
            span: class.name.span,
            constructor,
            members,
        });
        debug_assert!(defined.is_ok(), "ancestors are defined first");
    }

    fn add_member(
        &mut self,
        members: &mut HashMap<Symbol, MemberInfo>,
        class: &Symbol,
        member: &Ident,
        access: Access,
        kind: MemberInfoKind,
    ) {
        let error = match members.get(&member.name) {
            None => {
                let info = MemberInfo {
                    owner: class.clone(),
                    access,
                    span: member.span,
                    kind,
                };
                members.insert(member.name.clone(), info);
                return;
            }
            Some(prev) if prev.owner == *class => Error::DuplicateMember {
                class: class.clone(),
                member: member.name.clone(),
            },
            Some(prev) => Error::RedeclaredInherited {
                member: member.name.clone(),
                owner: prev.owner.clone(),
            },
        };
        self.error(member.span, error);
    }

    fn resolve_params(&mut self, params: &[Param]) -> Vec<Type> {
        let mut seen = HashSet::with_capacity(params.len());
        let mut types = Vec::with_capacity(params.len());
        for param in params {
            if !seen.insert(param.name.name.clone()) {
                let error = Error::DuplicateParam(param.name.name.clone());
                self.error(param.name.span, error);
            }
            types.push(self.resolve_var_type(&param.ty, &param.name));
        }
        types
    }
}

type ClassMap<'p> = HashMap<Symbol, &'p Class<Untyped>>;

/// Classes in declaration order. Duplicate definitions were left out of the
/// map, so each class shows up once.
fn declaration_order<'p>(classes: &ClassMap<'p>) -> Vec<&'p Class<Untyped>> {
    let mut order: Vec<_> = classes.values().copied().collect();
    order.sort_by_key(|class| class.name.span.lo);
    order
}

/// Type resolution.
impl Checker {
    /// Resolves a written type, without reporting anything. Undefined classes
    /// resolve to [`Type::Unknown`].
    fn lookup_type(&self, ty: &TypeName) -> Type {
        match &ty.ty {
            Type::Class(name) if !self.declared.contains(name) => Type::Unknown,
            ty => ty.clone(),
        }
    }

    fn resolve_type(&mut self, ty: &TypeName) -> Type {
        let resolved = self.lookup_type(ty);
        if let (Type::Unknown, Type::Class(name)) = (&resolved, &ty.ty) {
            self.error(ty.span, Error::UndefinedType(name.clone()));
        }
        resolved
    }

    /// Resolves the type of a property, parameter or local variable, none of
    /// which may be `void`.
    fn resolve_var_type(&mut self, ty: &TypeName, name: &Ident) -> Type {
        match self.resolve_type(ty) {
            Type::Void => {
                self.error(ty.span, Error::VoidVariable(name.name.clone()));
                Type::Unknown
            }
            ty => ty,
        }
    }

    fn expect_assignable(&mut self, actual: &Type, expected: &Type, span: Span) {
        if !self.classes.is_assignable(actual, expected) {
            let error = Error::Mismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            };
            self.error(span, error);
        }
    }
}

/// Body checking.
impl Checker {
    fn check_class(&mut self, class: Class<Untyped>) -> Class<Typed> {
        self.current_class = class.name.name.clone();
        let members = class
            .members
            .into_iter()
            .map(|member| {
                let kind = match member.kind {
                    MemberKind::Property(property) => {
                        MemberKind::Property(self.check_property(property))
                    }
                    MemberKind::Method(method) => MemberKind::Method(self.check_method(method)),
                };
                Member {
                    access: member.access,
                    kind,
                }
            })
            .collect();
        Class {
            name: class.name,
            parent: class.parent,
            members,
        }
    }

    fn check_property(&mut self, property: VarDecl<Untyped>) -> VarDecl<Typed> {
        // Already reported while building the class table.
        let ty = match self.lookup_type(&property.ty) {
            Type::Void => Type::Unknown,
            ty => ty,
        };
        self.scopes = vec![HashMap::new()];
        self.return_ty = Type::Void;
        let initializer = property.initializer.map(|init| {
            let init = self.check_expr(init);
            self.expect_assignable(&init.ty, &ty, init.span);
            init
        });
        VarDecl {
            ty: property.ty,
            name: property.name,
            initializer,
        }
    }

    fn check_method(&mut self, method: Method<Untyped>) -> Method<Typed> {
        let mut params = HashMap::with_capacity(method.params.len());
        for param in &method.params {
            let ty = self.lookup_type(&param.ty);
            params
                .entry(param.name.name.clone())
                .or_insert((ty, Binding::Param));
        }
        self.scopes = vec![params];
        self.return_ty = match &method.return_ty {
            Some(ty) => self.lookup_type(ty),
            None => Type::Void,
        };

        // The body shares the parameters' scope, so a local can't shadow a
        // parameter.
        let Block { stmts, span } = method.body;
        let body = Block {
            stmts: self.check_stmts(stmts),
            span,
        };
        self.scopes.clear();

        Method {
            name: method.name,
            params: method.params,
            return_ty: method.return_ty,
            body,
        }
    }

    fn check_block(&mut self, block: Block<Untyped>) -> Block<Typed> {
        self.scopes.push(HashMap::new());
        let stmts = self.check_stmts(block.stmts);
        self.scopes.pop();
        Block {
            stmts,
            span: block.span,
        }
    }

    fn check_stmts(&mut self, stmts: Vec<Stmt<Untyped>>) -> Vec<Stmt<Typed>> {
        stmts.into_iter().map(|stmt| self.check_stmt(stmt)).collect()
    }

    fn check_stmt(&mut self, stmt: Stmt<Untyped>) -> Stmt<Typed> {
        let span = stmt.span;
        let kind = match stmt.kind {
            StmtKind::If {
                predicate,
                then_block,
                else_block,
            } => StmtKind::If {
                predicate: self.check_condition(predicate),
                then_block: self.check_block(then_block),
                else_block: else_block.map(|block| self.check_block(block)),
            },
            StmtKind::While { predicate, body } => StmtKind::While {
                predicate: self.check_condition(predicate),
                body: self.check_block(body),
            },
            StmtKind::For {
                init,
                predicate,
                update,
                body,
            } => {
                // The loop variable lives in the same scope as the body's
                // outermost statements.
                self.scopes.push(HashMap::new());
                let init = Box::new(self.check_stmt(*init));
                let predicate = self.check_condition(predicate);
                let update = self.check_expr(update);
                let body = Block {
                    stmts: self.check_stmts(body.stmts),
                    span: body.span,
                };
                self.scopes.pop();
                StmtKind::For {
                    init,
                    predicate,
                    update,
                    body,
                }
            }
            StmtKind::Return(value) => {
                let value = value.map(|value| self.check_expr(value));
                match (&value, self.return_ty.clone()) {
                    (Some(value), Type::Void) => {
                        self.error(value.span, Error::UnexpectedReturnValue);
                    }
                    (Some(value), ret) => self.expect_assignable(&value.ty, &ret, value.span),
                    (None, Type::Void | Type::Unknown) => {}
                    (None, ret) => self.error(span, Error::MissingReturnValue(ret)),
                }
                StmtKind::Return(value)
            }
            StmtKind::VarDecl(decl) => StmtKind::VarDecl(self.check_local(decl)),
            StmtKind::Print(args) => {
                let args = args
                    .into_iter()
                    .map(|arg| {
                        let arg = self.check_expr(arg);
                        if !arg.ty.is_primitive() {
                            self.error(arg.span, Error::InvalidPrint(arg.ty.clone()));
                        }
                        arg
                    })
                    .collect();
                StmtKind::Print(args)
            }
            StmtKind::Block(block) => StmtKind::Block(self.check_block(block)),
            StmtKind::Expr(expr) => StmtKind::Expr(self.check_expr(expr)),
        };
        Stmt { kind, span }
    }

    fn check_local(&mut self, decl: VarDecl<Untyped>) -> VarDecl<Typed> {
        let ty = self.resolve_var_type(&decl.ty, &decl.name);
        // The initializer can't see the variable being declared.
        let initializer = decl.initializer.map(|init| {
            let init = self.check_expr(init);
            self.expect_assignable(&init.ty, &ty, init.span);
            init
        });
        self.declare(&decl.name, ty);
        VarDecl {
            ty: decl.ty,
            name: decl.name,
            initializer,
        }
    }

    fn declare(&mut self, name: &Ident, ty: Type) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.contains_key(&name.name) {
            self.error(name.span, Error::DuplicateLocal(name.name.clone()));
        } else {
            scope.insert(name.name.clone(), (ty, Binding::Local));
        }
    }

    fn check_condition(&mut self, predicate: Expr<Untyped>) -> Expr<Typed> {
        let predicate = self.check_expr(predicate);
        self.expect_assignable(&predicate.ty, &Type::Bool, predicate.span);
        predicate
    }

    fn check_expr(&mut self, expr: Expr<Untyped>) -> Expr<Typed> {
        let span = expr.span;
        let (kind, ty) = match expr.kind {
            ExprKind::Int(val) => (ExprKind::Int(val), Type::Int),
            ExprKind::Float(val) => (ExprKind::Float(val), Type::Float),
            ExprKind::String(val) => (ExprKind::String(val), Type::String),
            ExprKind::Bool(val) => (ExprKind::Bool(val), Type::Bool),
            ExprKind::This => (ExprKind::This, Type::Class(self.current_class.clone())),
            ExprKind::Id(ident, ()) => {
                let (ty, binding) = self.resolve_name(&ident);
                (ExprKind::Id(ident, binding), ty)
            }
            ExprKind::Unary { op, expr } => {
                let expr = self.check_expr(*expr);
                let ty = self.check_unary(op, &expr.ty, span);
                let expr = Box::new(expr);
                (ExprKind::Unary { op, expr }, ty)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.check_expr(*lhs);
                let rhs = self.check_expr(*rhs);
                let ty = self.check_binary(op, &lhs.ty, &rhs.ty, span);
                let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
                (ExprKind::Binary { op, lhs, rhs }, ty)
            }
            ExprKind::Assignment { target, value } => {
                let target = self.check_expr(*target);
                let value = self.check_expr(*value);
                self.expect_assignable(&value.ty, &target.ty, value.span);
                let ty = target.ty.clone();
                let (target, value) = (Box::new(target), Box::new(value));
                (ExprKind::Assignment { target, value }, ty)
            }
            ExprKind::Call {
                receiver,
                method,
                args,
                binding: (),
            } => {
                let receiver = receiver.map(|receiver| Box::new(self.check_expr(*receiver)));
                let args: Vec<_> = args.into_iter().map(|arg| self.check_expr(arg)).collect();
                let (ty, binding) = self.check_call(receiver.as_deref(), &method, &args, span);
                let call = ExprKind::Call {
                    receiver,
                    method,
                    args,
                    binding,
                };
                (call, ty)
            }
            ExprKind::MemberAccess { object, member } => {
                let object = Box::new(self.check_expr(*object));
                let ty = self.check_member_access(&object, &member);
                (ExprKind::MemberAccess { object, member }, ty)
            }
            ExprKind::New { class, args } => {
                let args: Vec<_> = args.into_iter().map(|arg| self.check_expr(arg)).collect();
                let ty = self.check_new(&class, &args, span);
                (ExprKind::New { class, args }, ty)
            }
        };
        Expr { kind, span, ty }
    }

    /// Resolves a bare name: enclosing scopes first, then the members of the
    /// current class (inherited ones included).
    fn resolve_name(&mut self, ident: &Ident) -> (Type, Binding) {
        for scope in self.scopes.iter().rev() {
            if let Some((ty, binding)) = scope.get(&ident.name) {
                return (ty.clone(), binding.clone());
            }
        }
        let member = self
            .classes
            .get(&self.current_class)
            .and_then(|class| class.member(&ident.name))
            .cloned();
        match member {
            Some(MemberInfo {
                owner,
                access,
                kind: MemberInfoKind::Property(ty),
                ..
            }) => {
                self.check_access(&owner, access, ident);
                (ty, Binding::Property { owner })
            }
            Some(MemberInfo {
                kind: MemberInfoKind::Method(_),
                ..
            }) => {
                self.error(ident.span, Error::NotAValue(ident.name.clone()));
                (Type::Unknown, Binding::Unresolved)
            }
            None => {
                self.error(ident.span, Error::UndefinedName(ident.name.clone()));
                (Type::Unknown, Binding::Unresolved)
            }
        }
    }

    fn check_call(
        &mut self,
        receiver: Option<&Expr<Typed>>,
        method: &Ident,
        args: &[Expr<Typed>],
        span: Span,
    ) -> (Type, Binding) {
        let class = match receiver {
            None => Some(self.current_class.clone()),
            Some(receiver) => self.class_of(receiver),
        };
        let Some(info) = class.and_then(|class| self.find_member(&class, method)) else {
            return (Type::Unknown, Binding::Unresolved);
        };
        match info.kind {
            MemberInfoKind::Method(signature) => {
                self.check_access(&info.owner, info.access, method);
                self.check_args(&method.name, &signature.params, args, span);
                (signature.ret, Binding::Method { owner: info.owner })
            }
            MemberInfoKind::Property(_) => {
                self.error(method.span, Error::NotAMethod(method.name.clone()));
                (Type::Unknown, Binding::Unresolved)
            }
        }
    }

    fn check_member_access(&mut self, object: &Expr<Typed>, member: &Ident) -> Type {
        let Some(class) = self.class_of(object) else {
            return Type::Unknown;
        };
        let Some(info) = self.find_member(&class, member) else {
            return Type::Unknown;
        };
        match info.kind {
            MemberInfoKind::Property(ty) => {
                self.check_access(&info.owner, info.access, member);
                ty
            }
            MemberInfoKind::Method(_) => {
                self.error(member.span, Error::NotAValue(member.name.clone()));
                Type::Unknown
            }
        }
    }

    fn check_new(&mut self, class: &Ident, args: &[Expr<Typed>], span: Span) -> Type {
        let Some(info) = self.classes.get(&class.name) else {
            self.error(class.span, Error::UndefinedClass(class.name.clone()));
            return Type::Unknown;
        };
        match info.constructor.clone() {
            Some((access, signature)) => {
                if access == Access::Private && class.name != self.current_class {
                    let error = Error::PrivateConstructor(class.name.clone());
                    self.error(class.span, error);
                }
                self.check_args(&class.name, &signature.params, args, span);
            }
            None => self.check_args(&class.name, &[], args, span),
        }
        Type::Class(class.name.clone())
    }

    /// Returns the class of a value whose members are being accessed.
    fn class_of(&mut self, object: &Expr<Typed>) -> Option<Symbol> {
        match &object.ty {
            Type::Class(name) => Some(name.clone()),
            Type::Unknown => None,
            ty => {
                self.error(object.span, Error::NotAClass(ty.clone()));
                None
            }
        }
    }

    fn find_member(&mut self, class: &Symbol, member: &Ident) -> Option<MemberInfo> {
        let info = self
            .classes
            .get(class)
            .and_then(|info| info.member(&member.name))
            .cloned();
        if info.is_none() {
            let error = Error::UndefinedMember {
                class: class.clone(),
                member: member.name.clone(),
            };
            self.error(member.span, error);
        }
        info
    }

    /// Private members are only reachable from the class which declared them.
    fn check_access(&mut self, owner: &Symbol, access: Access, member: &Ident) {
        if access == Access::Private && *owner != self.current_class {
            let error = Error::PrivateMember {
                class: owner.clone(),
                member: member.name.clone(),
            };
            self.error(member.span, error);
        }
    }

    fn check_args(&mut self, name: &Symbol, params: &[Type], args: &[Expr<Typed>], span: Span) {
        if params.len() != args.len() {
            let error = Error::ArityMismatch {
                name: name.clone(),
                expected: params.len(),
                actual: args.len(),
            };
            self.error(span, error);
            return;
        }
        for (position, (param, arg)) in params.iter().zip(args).enumerate() {
            if !self.classes.is_assignable(&arg.ty, param) {
                let error = Error::ArgumentMismatch {
                    name: name.clone(),
                    position: position + 1,
                    expected: param.clone(),
                    actual: arg.ty.clone(),
                };
                self.error(arg.span, error);
            }
        }
    }

    fn check_unary(&mut self, op: UnaryOperator, ty: &Type, span: Span) -> Type {
        let (valid, result) = match op {
            UnaryOperator::Neg => (ty.is_numeric(), ty.clone()),
            UnaryOperator::Not => (is_bool(ty), Type::Bool),
        };
        if valid {
            return result;
        }
        let error = Error::InvalidOperand {
            op: op.symbol(),
            ty: ty.clone(),
        };
        self.error(span, error);
        match op {
            UnaryOperator::Neg => Type::Unknown,
            UnaryOperator::Not => Type::Bool,
        }
    }

    fn check_binary(&mut self, op: BinaryOperator, lhs: &Type, rhs: &Type, span: Span) -> Type {
        let valid = if op.is_arithmetic() {
            lhs.is_numeric() && rhs.is_numeric()
        } else if op.is_logical() {
            is_bool(lhs) && is_bool(rhs)
        } else if op.is_relational() {
            lhs.is_primitive() && rhs.is_primitive() && comparable(lhs, rhs)
        } else {
            *lhs != Type::Void && *rhs != Type::Void && comparable(lhs, rhs)
        };

        if !valid {
            let error = Error::InvalidOperands {
                op: op.symbol(),
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            };
            self.error(span, error);
        }

        if !op.is_arithmetic() {
            Type::Bool
        } else if !valid || lhs.is_unknown() || rhs.is_unknown() {
            Type::Unknown
        } else if *lhs == Type::Float || *rhs == Type::Float {
            Type::Float
        } else {
            Type::Int
        }
    }
}

fn is_bool(ty: &Type) -> bool {
    matches!(ty, Type::Bool | Type::Unknown)
}

/// Operands of a comparison must have the same type. Unlike arithmetic, `int`
/// does not widen to `float` here.
fn comparable(lhs: &Type, rhs: &Type) -> bool {
    lhs.is_unknown() || rhs.is_unknown() || lhs == rhs
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("class {0} is already defined")]
    DuplicateClass(Symbol),
    #[error("class {class} extends undefined class {parent}")]
    UndefinedParent { class: Symbol, parent: Symbol },
    #[error("inheritance cycle: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<Symbol>),
    #[error("undefined type {0}")]
    UndefinedType(Symbol),
    #[error("undefined class {0}")]
    UndefinedClass(Symbol),
    #[error("member {member} is already defined in class {class}")]
    DuplicateMember { class: Symbol, member: Symbol },
    #[error("member {member} is already inherited from class {owner}")]
    RedeclaredInherited { member: Symbol, owner: Symbol },
    #[error("property {0} cannot be named after its class")]
    PropertyNamedAfterClass(Symbol),
    #[error("parameter {0} is already defined")]
    DuplicateParam(Symbol),
    #[error("variable {0} is already defined in this scope")]
    DuplicateLocal(Symbol),
    #[error("undefined name {0}")]
    UndefinedName(Symbol),
    #[error("class {class} has no member {member}")]
    UndefinedMember { class: Symbol, member: Symbol },

    #[error("member {member} of class {class} is private")]
    PrivateMember { class: Symbol, member: Symbol },
    #[error("constructor of class {0} is private")]
    PrivateConstructor(Symbol),

    #[error("expected type {expected}, but found {actual}")]
    Mismatch { expected: Type, actual: Type },
    #[error("variable {0} cannot have type void")]
    VoidVariable(Symbol),
    #[error("constructor of class {0} cannot declare a return type")]
    ConstructorReturnType(Symbol),
    #[error("operator {op} cannot be applied to {ty}")]
    InvalidOperand { op: &'static str, ty: Type },
    #[error("operator {op} cannot be applied to {lhs} and {rhs}")]
    InvalidOperands {
        op: &'static str,
        lhs: Type,
        rhs: Type,
    },
    #[error("{name} expects {expected} argument(s), but got {actual}")]
    ArityMismatch {
        name: Symbol,
        expected: usize,
        actual: usize,
    },
    #[error("argument {position} of {name} expects type {expected}, but found {actual}")]
    ArgumentMismatch {
        name: Symbol,
        position: usize,
        expected: Type,
        actual: Type,
    },
    #[error("missing return value of type {0}")]
    MissingReturnValue(Type),
    #[error("cannot return a value from a void method")]
    UnexpectedReturnValue,
    #[error("{0} is a property, not a method")]
    NotAMethod(Symbol),
    #[error("method {0} cannot be used as a value")]
    NotAValue(Symbol),
    #[error("type {0} has no members")]
    NotAClass(Type),
    #[error("cannot print a value of type {0}")]
    InvalidPrint(Type),
}

impl Classify for Error {
    fn kind(&self) -> DiagnosticKind {
        use Error::*;
        match self {
            DuplicateClass(_)
            | UndefinedParent { .. }
            | InheritanceCycle(_)
            | UndefinedType(_)
            | UndefinedClass(_)
            | DuplicateMember { .. }
            | RedeclaredInherited { .. }
            | PropertyNamedAfterClass(_)
            | DuplicateParam(_)
            | DuplicateLocal(_)
            | UndefinedName(_)
            | UndefinedMember { .. } => DiagnosticKind::NameError,
            PrivateMember { .. } | PrivateConstructor(_) => DiagnosticKind::AccessError,
            Mismatch { .. }
            | VoidVariable(_)
            | ConstructorReturnType(_)
            | InvalidOperand { .. }
            | InvalidOperands { .. }
            | ArityMismatch { .. }
            | ArgumentMismatch { .. }
            | MissingReturnValue(_)
            | UnexpectedReturnValue
            | NotAMethod(_)
            | NotAValue(_)
            | NotAClass(_)
            | InvalidPrint(_) => DiagnosticKind::TypeError,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{lexer, parser, util::test_utils::tree_tests};

    fn check(src: &str) -> CheckResult {
        let tokens = lexer::tokenize(src).expect("failed to lex");
        let program = parser::parse_program(src, &tokens).expect("failed to parse");
        Checker::new().check(program)
    }

    fn error_kinds(src: &str) -> Vec<DiagnosticKind> {
        match check(src) {
            Ok(_) => vec![],
            Err(errors) => errors.iter().map(|e| e.inner.kind()).collect(),
        }
    }

    #[test]
    fn class_table_is_topologically_ordered() {
        let (_, table) = check(
            "
            class Cow extends Mob {}
            class Block extends Entity {}
            class Entity {}
            class Mob extends Entity {}
            ",
        )
        .expect("program is well formed");
        let order: Vec<_> = table.order().iter().map(|name| &**name).collect();
        assert_eq!(order, ["Entity", "Mob", "Cow", "Block"]);
        assert!(table.is_subclass_of("Cow", "Entity"));
        assert!(!table.is_subclass_of("Block", "Mob"));
    }

    #[test]
    fn members_are_flattened_along_the_chain() {
        let (_, table) = check(
            "
            class A { private: int secret; public: func get(): int { return secret; } }
            class B extends A { public: float extra; }
            ",
        )
        .expect("program is well formed");
        let b = table.get("B").expect("B is defined");
        assert_eq!(b.members.len(), 3);
        let secret = b.member("secret").expect("inherited");
        assert_eq!(&*secret.owner, "A");
        assert_eq!(secret.access, Access::Private);
        assert_eq!(secret.kind, MemberInfoKind::Property(Type::Int));
        assert!(b.constructor.is_none());
    }

    #[test]
    fn private_member_is_visible_inside_its_class() {
        let src = "
            class A {
            private:
                int s;
            public:
                func get(): int { return s; }
                func peek(A other): int { return other.s + this.s; }
            }
        ";
        assert_eq!(error_kinds(src), []);
    }

    #[test]
    fn widening_and_subclass_assignment() {
        let src = "
            class Shape { public: func area(): float { return 1; } }
            class Square extends Shape {}
            class Main {
            public:
                func main() {
                    float f = 3;
                    float g = f * 2 + 1;
                    Shape s = new Square();
                    f = s.area();
                }
            }
        ";
        assert_eq!(error_kinds(src), []);
    }

    #[test]
    fn subclass_is_not_assignable_from_superclass() {
        let src = "
            class Shape {}
            class Square extends Shape {}
            class Main { public: func main() { Square s = new Shape(); } }
        ";
        assert_eq!(error_kinds(src), [DiagnosticKind::TypeError]);
    }

    #[test]
    fn mixed_numeric_comparison_is_rejected() {
        let src = "
            class A {
            public:
                func f(float x): bool { return x > 0; }
                func g(): bool { return 1 == 1.5; }
                func h(float x, int y): float { return x + y; }
            }
        ";
        assert_eq!(
            error_kinds(src),
            [DiagnosticKind::TypeError, DiagnosticKind::TypeError]
        );
    }

    #[test]
    fn errors_do_not_cascade() {
        let src = "class A { public: func f(): int { int x = y + 1; return x * 2; } }";
        assert_eq!(error_kinds(src), [DiagnosticKind::NameError]);
    }

    #[test]
    fn checking_is_deterministic() {
        let src = "
            class B extends A { public: int x = true; func f() { q = 1; } }
            class A { private: int p; public: int x; }
            class C { public: func g() { B b = new B(1); b.p = 2; } }
        ";
        let first = check(src).err().expect("program has errors");
        let second = check(src).err().expect("program has errors");
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].span.lo <= w[1].span.lo));
    }

    tree_tests!(
        use checker;

        fn test_calc_is_annotated() {
            let program = "
                class Calc {
                public:
                    int r;
                    func Calc() { r = 0; }
                    func add(int a, int b): int {
                        r = a + b;
                        return r;
                    }
                }
            ";
            let tree_ok = "
                class Calc
                  public property r: int
                  public method Calc()
                    assignment : int
                      ident r [property of Calc] : int
                      int 0 : int
                  public method add(a: int, b: int): int
                    assignment : int
                      ident r [property of Calc] : int
                      binary Add : int
                        ident a [param] : int
                        ident b [param] : int
                    return
                      ident r [property of Calc] : int
            ";
        }

        fn test_inherited_calls_and_widening() {
            let program = "
                class Shape {
                public:
                    func area(): float { return 0; }
                }
                class Circle extends Shape {
                private:
                    float r = 1;
                public:
                    func Circle(float radius) { this.r = radius; }
                    func scaled(int k): Circle { return new Circle(r * k); }
                    func total(Shape s): float { return s.area() + area(); }
                }
            ";
            let tree_ok = "
                class Shape
                  public method area(): float
                    return
                      int 0 : int
                class Circle extends Shape
                  private property r: float
                    int 1 : int
                  public method Circle(radius: float)
                    assignment : float
                      member r : float
                        this : Circle
                      ident radius [param] : float
                  public method scaled(k: int): Circle
                    return
                      new Circle : Circle
                        binary Mul : float
                          ident r [property of Circle] : float
                          ident k [param] : int
                  public method total(s: Shape): float
                    return
                      binary Add : float
                        call area [method of Shape] : float
                          receiver
                            ident s [param] : Shape
                        call area [method of Shape] : float
            ";
        }

        fn test_locals_and_loops() {
            let program = "
                class L {
                public:
                    func sum(int n): int {
                        int total = 0;
                        for (int i = 0; i < n; i = i + 1) { total = total + i; }
                        return total;
                    }
                }
            ";
            let tree_ok = "
                class L
                  public method sum(n: int): int
                    var total: int
                      int 0 : int
                    for
                      init
                        var i: int
                          int 0 : int
                      binary Lt : bool
                        ident i [local] : int
                        ident n [param] : int
                      update
                        assignment : int
                          ident i [local] : int
                          binary Add : int
                            ident i [local] : int
                            int 1 : int
                      do
                        assignment : int
                          ident total [local] : int
                          binary Add : int
                            ident total [local] : int
                            ident i [local] : int
                    return
                      ident total [local] : int
            ";
        }

        fn test_block_scope_ends_at_brace() {
            let program = "class A { public: func f() { { int x = 1; } x = 2; } }";
            let expected_errors = &["1:45: NameError: undefined name x"];
        }

        fn test_private_property_from_other_class() {
            let program = "class A { private: int s; } class B { public: func f(A a): int { return a.s; } }";
            let expected_errors = &["1:75: AccessError: member s of class A is private"];
        }

        fn test_private_property_from_subclass() {
            let program = "class A { private: int x; } class B extends A { public: func f(): int { return x; } }";
            let expected_errors = &["1:80: AccessError: member x of class A is private"];
        }

        fn test_widening_rules() {
            let program = "class A { public: func f() { float f = 3; bool b = 3; string s = 3; } }";
            let expected_errors = &[
                "1:52: TypeError: expected type bool, but found int",
                "1:66: TypeError: expected type string, but found int",
            ];
        }

        fn test_call_arity_and_argument_types() {
            let program = "class C { public: func add(int a, int b): int { return a + b; } func g() { add(1); add(1, \"x\"); } }";
            let expected_errors = &[
                "1:76: TypeError: add expects 2 argument(s), but got 1",
                "1:91: TypeError: argument 2 of add expects type int, but found string",
            ];
        }

        fn test_inheritance_cycle() {
            let program = "class A extends B {} class B extends A {}";
            let expected_errors = &["1:17: NameError: inheritance cycle: A -> B -> A"];
        }

        fn test_cycle_stops_member_checking() {
            let program = "class A extends A { public: int x = true; }";
            let expected_errors = &["1:17: NameError: inheritance cycle: A -> A"];
        }

        fn test_undefined_classes() {
            let program = "class A {} class A {} class B extends Z { public: Q q; }";
            let expected_errors = &[
                "1:18: NameError: class A is already defined",
                "1:39: NameError: class B extends undefined class Z",
                "1:51: NameError: undefined type Q",
            ];
        }

        fn test_redeclared_inherited_member() {
            let program = "class A { public: int x; } class B extends A { public: float x; }";
            let expected_errors = &["1:62: NameError: member x is already inherited from class A"];
        }

        fn test_operator_errors() {
            let program = "class A { public: func f() { bool b = 1 + true; int n = -\"s\"; if (1) {} } }";
            let expected_errors = &[
                "1:39: TypeError: operator + cannot be applied to int and bool",
                "1:57: TypeError: operator - cannot be applied to string",
                "1:67: TypeError: expected type bool, but found int",
            ];
        }

        fn test_comparison_needs_identical_types() {
            let program = "class A { public: func f(float x): bool { return x > 0; } func g(): bool { return 1 == 1.5; } }";
            let expected_errors = &[
                "1:50: TypeError: operator > cannot be applied to float and int",
                "1:83: TypeError: operator == cannot be applied to int and float",
            ];
        }

        fn test_second_constructor() {
            let program = "class P { public: func P() {} func P(int a) {} }";
            let expected_errors = &["1:36: NameError: member P is already defined in class P"];
        }

        fn test_return_checks() {
            let program = "class A { public: func f(): int { return; } func g() { return 1; } }";
            let expected_errors = &[
                "1:35: TypeError: missing return value of type int",
                "1:63: TypeError: cannot return a value from a void method",
            ];
        }

        fn test_private_constructor() {
            let program = "class P { private: func P() {} } class Q { public: func f() { P p = new P(); } }";
            let expected_errors = &["1:73: AccessError: constructor of class P is private"];
        }

        fn test_constructor_with_return_type() {
            let program = "class P { public: func P(): int {} }";
            let expected_errors = &["1:29: TypeError: constructor of class P cannot declare a return type"];
        }

        fn test_methods_and_properties_are_not_interchangeable() {
            let program = "class A { public: int x; func m() { int y = m; x(); } }";
            let expected_errors = &[
                "1:45: TypeError: method m cannot be used as a value",
                "1:48: TypeError: x is a property, not a method",
            ];
        }

        fn test_duplicate_params_and_locals() {
            let program = "class A { public: func f(int a, int a) { int b = 1; int b = 2; { int b = 3; } } }";
            let expected_errors = &[
                "1:37: NameError: parameter a is already defined",
                "1:57: NameError: variable b is already defined in this scope",
            ];
        }

        fn test_member_lookup_errors() {
            let program = "class A { public: func f(int n) { print(n.x, this.y, f(1)); } }";
            let expected_errors = &[
                "1:41: TypeError: type int has no members",
                "1:51: NameError: class A has no member y",
                "1:54: TypeError: cannot print a value of type void",
            ];
        }
    );
}
