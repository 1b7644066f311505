use std::{collections::HashMap, fmt};

use crate::{
    ast::{Access, Symbol},
    token::Span,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Void,
    Class(Symbol),
    /// The type of an expression whose checking already failed. It is
    /// compatible with everything, so that a single mistake is reported once.
    /// Never reaches code generation.
    Unknown,
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Unknown)
    }

    /// `int`, `float`, `string` and `bool`.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Int | Type::Float | Type::String | Type::Bool | Type::Unknown
        )
    }

    pub fn is_unknown(&self) -> bool {
        *self == Type::Unknown
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::String => f.write_str("string"),
            Type::Bool => f.write_str("bool"),
            Type::Void => f.write_str("void"),
            Type::Class(name) => f.write_str(name),
            Type::Unknown => f.write_str("<unknown>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub ret: Type,
}

/// An entry of a flattened member table.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    /// The class which declared the member.
    pub owner: Symbol,
    pub access: Access,
    pub span: Span,
    pub kind: MemberInfoKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberInfoKind {
    Property(Type),
    Method(Signature),
}

#[derive(Debug)]
pub struct ClassInfo {
    pub name: Symbol,
    pub parent: Option<Symbol>,
    /// Class definition site.
    pub span: Span,
    /// Constructors are not inherited, hence not part of `members`.
    pub constructor: Option<(Access, Signature)>,
    /// Own members plus every member inherited along the parent chain.
    pub members: HashMap<Symbol, MemberInfo>,
}

impl ClassInfo {
    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.get(name)
    }
}

/// Maps class names to their records. Single inheritance makes the
/// hierarchy a forest; parents are referred to by name only.
#[derive(Debug)]
pub struct ClassTable {
    map: HashMap<Symbol, ClassInfo>,
    /// Definition order. Since a class can only be defined after its parent,
    /// this is a topological order of the hierarchy.
    order: Vec<Symbol>,
}

impl ClassTable {
    pub fn with_capacity(capacity: usize) -> ClassTable {
        ClassTable {
            map: HashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.map.get(name)
    }

    pub fn order(&self) -> &[Symbol] {
        &self.order
    }

    /// Attempts to define the provided class.
    ///
    /// Fails if the class is already defined, or if its parent isn't.
    pub fn define(&mut self, info: ClassInfo) -> Result<(), ClassInfo> {
        let parent_missing = info.parent.as_ref().is_some_and(|p| !self.has(p));
        if self.has(&info.name) || parent_missing {
            return Err(info);
        }
        self.order.push(info.name.clone());
        self.map.insert(info.name.clone(), info);
        Ok(())
    }

    /// Walks the parent chain of `class`, starting at `class` itself.
    pub fn ancestors<'a>(&'a self, class: &str) -> impl Iterator<Item = &'a ClassInfo> + 'a {
        let mut curr = self.get(class);
        std::iter::from_fn(move || {
            let this = curr?;
            curr = this.parent.as_ref().and_then(|p| self.get(p));
            Some(this)
        })
    }

    /// Reflexive: every class is a subclass of itself.
    pub fn is_subclass_of(&self, class: &str, other: &str) -> bool {
        self.ancestors(class).any(|ancestor| &*ancestor.name == other)
    }

    /// Whether a value of type `src` may be used where `dst` is expected.
    pub fn is_assignable(&self, src: &Type, dst: &Type) -> bool {
        match (src, dst) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (Type::Int, Type::Float) => true,
            (Type::Class(src), Type::Class(dst)) => self.is_subclass_of(src, dst),
            (src, dst) => src == dst,
        }
    }
}
