//! Hydrated entity graphs.
//!
//! Entities are shared through [`EntityRef`] (`Rc<RefCell<Entity>>`) so that
//! one hydration pass can hand out the same instance along several
//! association paths, including cyclic ones.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::identifier::Identifier;
use crate::value::Value;

/// Shared, mutable handle to an entity instance.
pub type EntityRef = Rc<RefCell<Entity>>;

/// Unresolved pointer to an entity, dereferenced on demand by the
/// persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub entity_type: String,
    pub identifier: Identifier,
}

impl Reference {
    #[must_use]
    pub fn new(entity_type: impl Into<String>, identifier: Identifier) -> Self {
        Self {
            entity_type: entity_type.into(),
            identifier,
        }
    }
}

/// Target of a to-one association.
#[derive(Clone)]
pub enum Related {
    /// Placeholder resolvable later.
    Reference(Reference),
    /// An instance already in memory (live or hydrated).
    Loaded(EntityRef),
}

impl Related {
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        match self {
            Self::Reference(r) => r.identifier.clone(),
            Self::Loaded(entity) => entity.borrow().identifier().clone(),
        }
    }

    #[must_use]
    pub fn entity_type(&self) -> String {
        match self {
            Self::Reference(r) => r.entity_type.clone(),
            Self::Loaded(entity) => entity.borrow().entity_type().to_string(),
        }
    }

    /// Reduce to a plain reference, dropping any loaded instance.
    #[must_use]
    pub fn to_reference(&self) -> Reference {
        match self {
            Self::Reference(r) => r.clone(),
            Self::Loaded(_) => Reference::new(self.entity_type(), self.identifier()),
        }
    }
}

// Two targets are the same association value when they point at the same
// type and identity; a loaded instance equals a reference to it.
impl PartialEq for Related {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type() == other.entity_type()
            && self.identifier().key() == other.identifier().key()
    }
}

// Loaded entities are printed by identity only: graphs may be cyclic.
impl fmt::Debug for Related {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference(r) => f.debug_tuple("Reference").field(r).finish(),
            Self::Loaded(_) => write!(f, "Loaded({} {})", self.entity_type(), self.identifier()),
        }
    }
}

/// An uninitialized to-many collection; its elements are loaded from live
/// state by the persistence layer, never from history.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyCollection {
    pub owner: Reference,
    pub association: String,
    pub target_type: String,
}

/// Value held by one entity member.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    ToOne(Option<Related>),
    ToMany(LazyCollection),
}

impl FieldValue {
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_related(&self) -> Option<&Related> {
        match self {
            Self::ToOne(Some(r)) => Some(r),
            _ => None,
        }
    }

    /// True for `NULL` scalars and absent to-ones.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null) | Self::ToOne(None))
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        Self::Scalar(v)
    }
}

impl From<Reference> for FieldValue {
    fn from(r: Reference) -> Self {
        Self::ToOne(Some(Related::Reference(r)))
    }
}

impl From<EntityRef> for FieldValue {
    fn from(entity: EntityRef) -> Self {
        Self::ToOne(Some(Related::Loaded(entity)))
    }
}

/// An instance of an entity type: its identity plus named member values.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    entity_type: String,
    identifier: Identifier,
    fields: BTreeMap<String, FieldValue>,
}

impl Entity {
    /// A bare instance with no members set.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, identifier: Identifier) -> Self {
        Self {
            entity_type: entity_type.into(),
            identifier,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn into_ref(self) -> EntityRef {
        Rc::new(RefCell::new(self))
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(FieldValue::as_scalar)
    }

    #[must_use]
    pub fn related(&self, name: &str) -> Option<&Related> {
        self.get(name).and_then(FieldValue::as_related)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style [`Entity::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn reference(&self) -> Reference {
        Reference::new(self.entity_type.clone(), self.identifier.clone())
    }
}
