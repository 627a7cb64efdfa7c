//! Per-type dispatch tables.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use super::kind::ArgKind;
use super::value::Value;

/// Shared handle to a live inspectable object.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Outcome of a member invocation.
pub type MemberResult = Result<Value, Box<dyn Error + Send + Sync>>;

type Invoker = Arc<dyn Fn(&(dyn Any + Send + Sync), Arguments<'_>) -> MemberResult + Send + Sync>;
type PropertyReader = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<Value> + Send + Sync>;

/// Typed view over the coerced arguments of one call.
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    values: &'a [Value],
}

impl<'a> Arguments<'a> {
    /// Wraps already-coerced values.
    #[must_use]
    pub const fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    /// Number of arguments.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the call carries no arguments.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Missing`] when `index` is out of range.
    pub fn value(&self, index: usize) -> Result<&'a Value, ArgumentError> {
        self.values
            .get(index)
            .ok_or(ArgumentError::Missing { index })
    }

    /// Text argument at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the argument is missing or not text.
    pub fn str(&self, index: usize) -> Result<&'a str, ArgumentError> {
        let value = self.value(index)?;
        value
            .as_str()
            .ok_or_else(|| ArgumentError::wrong_kind(index, ArgKind::Str, value))
    }

    /// Integer argument at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the argument is missing or not an
    /// integer.
    pub fn int(&self, index: usize) -> Result<i64, ArgumentError> {
        let value = self.value(index)?;
        value
            .as_i64()
            .ok_or_else(|| ArgumentError::wrong_kind(index, ArgKind::Int, value))
    }

    /// Numeric argument at `index`, widening integers.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the argument is missing or not numeric.
    pub fn float(&self, index: usize) -> Result<f64, ArgumentError> {
        let value = self.value(index)?;
        value
            .as_f64()
            .ok_or_else(|| ArgumentError::wrong_kind(index, ArgKind::Float, value))
    }

    /// Boolean argument at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] when the argument is missing or not a
    /// boolean.
    pub fn bool(&self, index: usize) -> Result<bool, ArgumentError> {
        let value = self.value(index)?;
        value
            .as_bool()
            .ok_or_else(|| ArgumentError::wrong_kind(index, ArgKind::Bool, value))
    }
}

/// Raised by [`Arguments`] accessors inside member bodies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgumentError {
    /// No argument at the requested position.
    #[error("argument {index} is missing")]
    Missing {
        /// Zero-based position.
        index: usize,
    },
    /// The argument holds a different kind of value.
    #[error("argument {index} is a {found}, expected {expected}")]
    WrongKind {
        /// Zero-based position.
        index: usize,
        /// Kind the member body asked for.
        expected: ArgKind,
        /// Kind actually present.
        found: &'static str,
    },
}

impl ArgumentError {
    fn wrong_kind(index: usize, expected: ArgKind, value: &Value) -> Self {
        Self::WrongKind {
            index,
            expected,
            found: value.kind_name(),
        }
    }
}

#[derive(Debug, Error)]
#[error("instance is not a {type_name}")]
struct InstanceMismatch {
    type_name: String,
}

/// One overload of a named member.
#[derive(Clone)]
pub struct Member {
    name: String,
    params: Vec<ArgKind>,
    invoker: Invoker,
}

impl Member {
    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter kinds, in order.
    #[must_use]
    pub fn params(&self) -> &[ArgKind] {
        &self.params
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Runs the member body against `instance` with coerced `args`.
    ///
    /// # Errors
    ///
    /// Returns whatever the body returns, or a mismatch error when
    /// `instance` is not of the descriptor's type.
    pub fn invoke(&self, instance: &Instance, args: &[Value]) -> MemberResult {
        (self.invoker)(instance.as_ref(), Arguments::new(args))
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Member")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Describes one inspectable type: its name, member overloads and readable
/// properties.
pub struct TypeDescriptor {
    name: String,
    type_id: TypeId,
    members: BTreeMap<String, Vec<Member>>,
    properties: BTreeMap<String, PropertyReader>,
}

impl TypeDescriptor {
    /// Starts a descriptor for `T` registered under `name`, without
    /// surrounding whitespace.
    pub fn builder<T>(name: impl Into<String>) -> TypeDescriptorBuilder<T>
    where
        T: Any + Send + Sync,
    {
        let name: String = name.into();
        TypeDescriptorBuilder {
            name: name.trim().to_owned(),
            members: BTreeMap::new(),
            properties: BTreeMap::new(),
            _marker: PhantomData,
        }
    }

    /// Fully qualified type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when `instance` is of the described type.
    #[must_use]
    pub fn matches_instance(&self, instance: &Instance) -> bool {
        Any::type_id(instance.as_ref()) == self.type_id
    }

    /// All overloads named `name`, ordered by arity.
    #[must_use]
    pub fn overloads(&self, name: &str) -> &[Member] {
        self.members.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// The overload of `name` taking exactly `arity` arguments.
    #[must_use]
    pub fn member(&self, name: &str, arity: usize) -> Option<&Member> {
        self.overloads(name)
            .iter()
            .find(|member| member.arity() == arity)
    }

    /// Names of all members.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Names of all readable properties.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Reads property `name` from `instance`.
    ///
    /// Returns `None` when the property is unknown or the instance is of a
    /// different type.
    #[must_use]
    pub fn read_property(&self, instance: &Instance, name: &str) -> Option<Value> {
        let reader = self.properties.get(name)?;
        reader(instance.as_ref())
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builds a [`TypeDescriptor`] with members typed against `T`.
pub struct TypeDescriptorBuilder<T> {
    name: String,
    members: BTreeMap<String, Vec<Member>>,
    properties: BTreeMap<String, PropertyReader>,
    _marker: PhantomData<fn(&T)>,
}

impl<T> TypeDescriptorBuilder<T>
where
    T: Any + Send + Sync,
{
    /// Adds an overload of `name` taking `params`.
    ///
    /// A second overload with the same arity replaces the first.
    #[must_use]
    pub fn method<F>(mut self, name: &str, params: &[ArgKind], body: F) -> Self
    where
        F: Fn(&T, Arguments<'_>) -> MemberResult + Send + Sync + 'static,
    {
        let type_name = self.name.clone();
        let invoker = erase_invoker(move |instance, args| {
            let target = instance
                .downcast_ref::<T>()
                .ok_or_else(|| InstanceMismatch {
                    type_name: type_name.clone(),
                })?;
            body(target, args)
        });
        let member = Member {
            name: name.to_owned(),
            params: params.to_vec(),
            invoker,
        };
        let overloads = self.members.entry(name.to_owned()).or_default();
        overloads.retain(|existing| existing.arity() != member.arity());
        overloads.push(member);
        overloads.sort_by_key(Member::arity);
        self
    }

    /// Adds a readable property.
    #[must_use]
    pub fn property<F>(mut self, name: &str, reader: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let erased = erase_reader(move |instance| instance.downcast_ref::<T>().map(&reader));
        self.properties.insert(name.to_owned(), erased);
        self
    }

    /// Freezes the descriptor.
    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            name: self.name,
            type_id: TypeId::of::<T>(),
            members: self.members,
            properties: self.properties,
        }
    }
}

fn erase_invoker<F>(invoker: F) -> Invoker
where
    F: Fn(&(dyn Any + Send + Sync), Arguments<'_>) -> MemberResult + Send + Sync + 'static,
{
    Arc::new(invoker)
}

fn erase_reader<F>(reader: F) -> PropertyReader
where
    F: Fn(&(dyn Any + Send + Sync)) -> Option<Value> + Send + Sync + 'static,
{
    Arc::new(reader)
}
