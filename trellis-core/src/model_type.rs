//! Runtime descriptions of bindable types.
//!
//! Binding is driven by the *shape* of the target type. Every type that can
//! be bound implements [`Bindable`], which returns a [`ModelType`]: the
//! `TypeId`, the type name and a [`TypeShape`]. Nested types are referenced
//! through plain function pointers so recursive graphs (a `Node` holding a
//! `Vec<Node>`) can be described without building an infinite value.
//!
//! ```
//! use trellis_core::model_type::{Attribute, Bindable, ModelType};
//!
//! #[derive(serde::Deserialize)]
//! struct Address {
//!     street: String,
//!     zip: Option<u32>,
//! }
//!
//! impl Bindable for Address {
//!     fn model_type() -> ModelType {
//!         ModelType::complex::<Self>()
//!             .property::<String>("street")
//!             .property_with::<Option<u32>>("zip", [Attribute::DisplayName("Postal code".into())])
//!             .build()
//!     }
//! }
//!
//! let ty = Address::model_type();
//! assert!(ty.is_complex());
//! assert_eq!(ty.default_value(), serde_json::json!({"street": "", "zip": null}));
//! ```

use crate::binding_source::{BindingSource, EmptyBodyBehavior};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Lazily evaluated reference to a nested type
pub type TypeFn = fn() -> ModelType;

/// Types that can be the target of model binding
pub trait Bindable: 'static {
    fn model_type() -> ModelType;
}

/// Kinds of single-valued types produced by string conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Char,
    String,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Uuid,
    /// `chrono::DateTime<Utc>`
    DateTime,
    /// `chrono::NaiveDate`
    Date,
    /// Unit-variant enum, serialized by variant name
    Enum(&'static [&'static str]),
}

impl ScalarKind {
    pub fn is_floating_point(&self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarKind::I8
                | ScalarKind::I16
                | ScalarKind::I32
                | ScalarKind::I64
                | ScalarKind::I128
                | ScalarKind::Isize
                | ScalarKind::U8
                | ScalarKind::U16
                | ScalarKind::U32
                | ScalarKind::U64
                | ScalarKind::U128
                | ScalarKind::Usize
        )
    }

    fn default_value(&self) -> Value {
        match self {
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::Char => Value::String("\0".to_string()),
            ScalarKind::String => Value::String(String::new()),
            ScalarKind::F32 | ScalarKind::F64 => Value::from(0.0),
            ScalarKind::Uuid => Value::String(uuid::Uuid::nil().to_string()),
            ScalarKind::DateTime => Value::String("1970-01-01T00:00:00Z".to_string()),
            ScalarKind::Date => Value::String("1970-01-01".to_string()),
            ScalarKind::Enum(variants) => variants
                .first()
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),
            _ => Value::from(0),
        }
    }
}

/// Declarative binding attributes attached to properties and types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Never bind this property
    BindNever,
    /// Binding must produce a value, otherwise a model error is recorded
    BindRequired,
    /// Property has no setter; it is skipped by the complex binder
    ReadOnly,
    /// Bind only from `source`, optionally under an alias
    From {
        source: BindingSource,
        name: Option<String>,
    },
    /// Body binding with an explicit empty-body policy
    FromBody(EmptyBodyBehavior),
    /// Use the custom binder registered under this name
    ModelBinder(String),
    DisplayName(String),
    DisplayFormat {
        display: Option<String>,
        edit: Option<String>,
    },
    NullDisplayText(String),
    ConvertEmptyStringToNull(bool),
    Required,
    ValidateNever,
}

impl Attribute {
    pub fn from_query(name: Option<&str>) -> Self {
        Self::from_source(BindingSource::Query, name)
    }

    pub fn from_route(name: Option<&str>) -> Self {
        Self::from_source(BindingSource::Path, name)
    }

    pub fn from_form(name: Option<&str>) -> Self {
        Self::from_source(BindingSource::Form, name)
    }

    pub fn from_header(name: Option<&str>) -> Self {
        Self::from_source(BindingSource::Header, name)
    }

    pub fn from_body() -> Self {
        Self::from_source(BindingSource::Body, None)
    }

    pub fn from_services() -> Self {
        Self::from_source(BindingSource::Services, None)
    }

    fn from_source(source: BindingSource, name: Option<&str>) -> Self {
        Attribute::From {
            source,
            name: name.map(str::to_string),
        }
    }
}

/// A settable member of a complex type
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub property_type: TypeFn,
    pub attributes: Vec<Attribute>,
}

impl PropertyDescriptor {
    pub fn model_type(&self) -> ModelType {
        (self.property_type)()
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Structure of a complex (property-bearing) type
#[derive(Debug, Clone)]
pub struct ComplexType {
    pub properties: Vec<PropertyDescriptor>,
    pub attributes: Vec<Attribute>,
    /// Whether a default instance can be created when no data was bound
    pub constructible: bool,
}

impl ComplexType {
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Structural shape of a type; binder selection is driven by this alone
#[derive(Clone)]
pub enum TypeShape {
    Scalar(ScalarKind),
    Nullable(TypeFn),
    /// Fixed sequence (`Box<[T]>`)
    Array(TypeFn),
    /// Growable sequence or set (`Vec<T>`, `HashSet<T>`, ...)
    Collection(TypeFn),
    Dictionary {
        key: TypeFn,
        value: TypeFn,
        entry: TypeFn,
    },
    KeyValuePair {
        key: TypeFn,
        value: TypeFn,
    },
    Complex(Arc<ComplexType>),
    /// Base64-encoded binary value
    Bytes,
    FormFile,
    FormFileCollection,
    FormCollection,
    /// Not constructible from request data; resolved from services
    Opaque,
}

impl fmt::Debug for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Scalar(kind) => write!(f, "Scalar({:?})", kind),
            TypeShape::Nullable(inner) => write!(f, "Nullable({})", inner().name()),
            TypeShape::Array(elem) => write!(f, "Array({})", elem().name()),
            TypeShape::Collection(elem) => write!(f, "Collection({})", elem().name()),
            TypeShape::Dictionary { key, value, .. } => {
                write!(f, "Dictionary({}, {})", key().name(), value().name())
            }
            TypeShape::KeyValuePair { key, value } => {
                write!(f, "KeyValuePair({}, {})", key().name(), value().name())
            }
            TypeShape::Complex(c) => write!(f, "Complex({} properties)", c.properties.len()),
            TypeShape::Bytes => write!(f, "Bytes"),
            TypeShape::FormFile => write!(f, "FormFile"),
            TypeShape::FormFileCollection => write!(f, "FormFileCollection"),
            TypeShape::FormCollection => write!(f, "FormCollection"),
            TypeShape::Opaque => write!(f, "Opaque"),
        }
    }
}

/// Runtime description of a bindable type
#[derive(Clone)]
pub struct ModelType {
    id: TypeId,
    name: &'static str,
    shape: TypeShape,
}

impl ModelType {
    pub fn of<T: Bindable>() -> Self {
        T::model_type()
    }

    pub fn new<T: 'static>(shape: TypeShape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            shape,
        }
    }

    pub fn scalar<T: 'static>(kind: ScalarKind) -> Self {
        Self::new::<T>(TypeShape::Scalar(kind))
    }

    /// A unit-variant enum bound by variant name (or by index)
    pub fn enumeration<T: 'static>(variants: &'static [&'static str]) -> Self {
        Self::new::<T>(TypeShape::Scalar(ScalarKind::Enum(variants)))
    }

    /// A type that only the services binding source can supply
    pub fn opaque<T: 'static>() -> Self {
        Self::new::<T>(TypeShape::Opaque)
    }

    pub fn complex<T: 'static>() -> ComplexTypeBuilder {
        ComplexTypeBuilder {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            complex: ComplexType {
                properties: Vec::new(),
                attributes: Vec::new(),
                constructible: true,
            },
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path, e.g. `Order` for `shop::models::Order`
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    pub fn as_complex(&self) -> Option<&ComplexType> {
        match &self.shape {
            TypeShape::Complex(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.shape, TypeShape::Complex(_))
    }

    /// Scalar kind of this type, looking through `Option`
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match &self.shape {
            TypeShape::Scalar(kind) => Some(*kind),
            TypeShape::Nullable(inner) => inner().scalar_kind(),
            _ => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self.shape, TypeShape::Nullable(_))
    }

    /// Whether `null` is a legal bound value
    pub fn accepts_null(&self) -> bool {
        matches!(self.shape, TypeShape::Nullable(_) | TypeShape::Opaque)
    }

    /// Unwrap one level of `Option`
    pub fn underlying(&self) -> ModelType {
        match &self.shape {
            TypeShape::Nullable(inner) => inner(),
            _ => self.clone(),
        }
    }

    /// Element type for enumerable shapes
    pub fn element_type(&self) -> Option<ModelType> {
        match &self.shape {
            TypeShape::Array(elem) | TypeShape::Collection(elem) => Some(elem()),
            TypeShape::Dictionary { entry, .. } => Some(entry()),
            TypeShape::FormFileCollection => Some(crate::form::FormFile::model_type()),
            TypeShape::Nullable(inner) => inner().element_type(),
            _ => None,
        }
    }

    /// JSON value of the type's default instance
    pub fn default_value(&self) -> Value {
        self.default_value_at_depth(0)
    }

    fn default_value_at_depth(&self, depth: usize) -> Value {
        if depth > 64 {
            return Value::Null;
        }
        match &self.shape {
            TypeShape::Scalar(kind) => kind.default_value(),
            TypeShape::Nullable(_) | TypeShape::Opaque | TypeShape::FormFile => Value::Null,
            TypeShape::Array(_)
            | TypeShape::Collection(_)
            | TypeShape::Bytes
            | TypeShape::FormFileCollection => Value::Array(Vec::new()),
            TypeShape::Dictionary { .. } | TypeShape::FormCollection => Value::Object(Map::new()),
            TypeShape::KeyValuePair { key, value } => {
                let mut map = Map::new();
                map.insert("Key".to_string(), key().default_value_at_depth(depth + 1));
                map.insert("Value".to_string(), value().default_value_at_depth(depth + 1));
                Value::Object(map)
            }
            TypeShape::Complex(complex) => {
                let map = complex
                    .properties
                    .iter()
                    .map(|p| (p.name.clone(), p.model_type().default_value_at_depth(depth + 1)))
                    .collect();
                Value::Object(map)
            }
        }
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModelType {}

impl Hash for ModelType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .finish()
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Builder returned by [`ModelType::complex`]
pub struct ComplexTypeBuilder {
    id: TypeId,
    name: &'static str,
    complex: ComplexType,
}

impl ComplexTypeBuilder {
    pub fn property<P: Bindable>(self, name: &str) -> Self {
        self.property_with::<P>(name, [])
    }

    pub fn property_with<P: Bindable>(
        mut self,
        name: &str,
        attributes: impl IntoIterator<Item = Attribute>,
    ) -> Self {
        self.complex.properties.push(PropertyDescriptor {
            name: name.to_string(),
            property_type: P::model_type,
            attributes: attributes.into_iter().collect(),
        });
        self
    }

    /// Attribute applying to the type as a whole
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.complex.attributes.push(attribute);
        self
    }

    /// Mark the type as impossible to default-construct
    pub fn not_constructible(mut self) -> Self {
        self.complex.constructible = false;
        self
    }

    pub fn build(self) -> ModelType {
        ModelType {
            id: self.id,
            name: self.name,
            shape: TypeShape::Complex(Arc::new(self.complex)),
        }
    }
}

/// Key/value pair bound from `name.Key` / `name.Value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValuePair<K, V> {
    #[serde(rename = "Key")]
    pub key: K,
    #[serde(rename = "Value")]
    pub value: V,
}

impl<K: Bindable, V: Bindable> Bindable for KeyValuePair<K, V> {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::KeyValuePair {
            key: K::model_type,
            value: V::model_type,
        })
    }
}

/// Binary payload submitted as base64 text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteArray(pub Vec<u8>);

impl Bindable for ByteArray {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::Bytes)
    }
}

macro_rules! scalar_bindable {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Bindable for $ty {
                fn model_type() -> ModelType {
                    ModelType::scalar::<$ty>(ScalarKind::$kind)
                }
            }
        )*
    };
}

scalar_bindable! {
    bool => Bool,
    char => Char,
    String => String,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    uuid::Uuid => Uuid,
    chrono::DateTime<chrono::Utc> => DateTime,
    chrono::NaiveDate => Date,
}

impl<T: Bindable> Bindable for Option<T> {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::Nullable(T::model_type))
    }
}

impl<T: Bindable> Bindable for Box<[T]> {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::Array(T::model_type))
    }
}

macro_rules! collection_bindable {
    ($($coll:ident),*) => {
        $(
            impl<T: Bindable> Bindable for $coll<T> {
                fn model_type() -> ModelType {
                    ModelType::new::<Self>(TypeShape::Collection(T::model_type))
                }
            }
        )*
    };
}

collection_bindable!(Vec, VecDeque, HashSet, BTreeSet);

impl<K: Bindable, V: Bindable> Bindable for HashMap<K, V> {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::Dictionary {
            key: K::model_type,
            value: V::model_type,
            entry: KeyValuePair::<K, V>::model_type,
        })
    }
}

impl<K: Bindable, V: Bindable> Bindable for BTreeMap<K, V> {
    fn model_type() -> ModelType {
        ModelType::new::<Self>(TypeShape::Dictionary {
            key: K::model_type,
            value: V::model_type,
            entry: KeyValuePair::<K, V>::model_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    enum Color {
        Red,
        Green,
    }

    impl Bindable for Color {
        fn model_type() -> ModelType {
            ModelType::enumeration::<Self>(&["Red", "Green"])
        }
    }

    struct Node;

    impl Bindable for Node {
        fn model_type() -> ModelType {
            ModelType::complex::<Self>()
                .property::<String>("Name")
                .property::<Vec<Node>>("Children")
                .property::<Option<Color>>("Color")
                .build()
        }
    }

    #[test]
    fn test_scalar_shapes() {
        assert_eq!(i32::model_type().scalar_kind(), Some(ScalarKind::I32));
        assert_eq!(Option::<f64>::model_type().scalar_kind(), Some(ScalarKind::F64));
        assert!(Option::<f64>::model_type().accepts_null());
        assert!(!String::model_type().accepts_null());
    }

    #[test]
    fn test_element_type_of_generic_element() {
        let ty = Vec::<HashMap<String, i32>>::model_type();
        let elem = ty.element_type().unwrap();
        assert_eq!(elem, HashMap::<String, i32>::model_type());
    }

    #[test]
    fn test_dictionary_element_is_pair() {
        let ty = HashMap::<String, i32>::model_type();
        assert_eq!(ty.element_type().unwrap(), KeyValuePair::<String, i32>::model_type());
    }

    #[test]
    fn test_recursive_type_description() {
        let ty = Node::model_type();
        let complex = ty.as_complex().unwrap();
        let children = complex.property("Children").unwrap().model_type();
        assert_eq!(children.element_type().unwrap(), Node::model_type());
        assert_eq!(
            ty.default_value(),
            json!({"Name": "", "Children": [], "Color": null})
        );
    }

    #[test]
    fn test_enum_default_is_first_variant() {
        assert_eq!(Color::model_type().default_value(), json!("Red"));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(Node::model_type().short_name(), "Node");
        assert_eq!(Vec::<i32>::model_type().short_name(), "Vec");
    }
}
