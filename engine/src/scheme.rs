use crate::op::OrderingOp;
use fnv::FnvBuildHasher;
use indexmap::map::{Entry, IndexMap};
use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display, Formatter},
    marker::PhantomData,
    str::FromStr,
};
use thiserror::Error;

/// An error that occurs if an unregistered field name was queried from a
/// [`Scheme`].
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("field '{name}' not found")]
pub struct UnknownFieldError {
    /// The name that failed to resolve.
    pub name: String,
}

/// An error that occurs when registering the same field name twice.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("attempt to redefine field {0}")]
pub struct FieldRedefinitionError(pub String);

/// A value type a field can hold.
///
/// Literals are converted with [`FromStr`] and compared with
/// [`PartialOrd`], so numbers compare numerically and strings
/// lexicographically, whatever the literal looks like.
pub trait FieldValue: Sized {
    /// Converts a literal into a value of this type.
    fn parse_literal(literal: &str) -> Result<Self, String>;

    /// Orders `self` relative to a parsed literal.
    fn compare(&self, literal: &Self) -> Option<Ordering>;
}

impl<T> FieldValue for T
where
    T: FromStr + PartialOrd,
    T::Err: Display,
{
    fn parse_literal(literal: &str) -> Result<Self, String> {
        literal.parse().map_err(|err: T::Err| err.to_string())
    }

    fn compare(&self, literal: &Self) -> Option<Ordering> {
        self.partial_cmp(literal)
    }
}

/// Fetch and compare, erased over the field's value type.
trait Comparator<O>: Send + Sync {
    fn compare(&self, object: &O, op: OrderingOp, literal: &str) -> Result<bool, String>;
}

struct Accessor<F, T> {
    fetch: F,
    value: PhantomData<fn() -> T>,
}

impl<O, F, T> Comparator<O> for Accessor<F, T>
where
    F: Fn(&O) -> Option<T> + Send + Sync,
    T: FieldValue,
{
    fn compare(&self, object: &O, op: OrderingOp, literal: &str) -> Result<bool, String> {
        let value = match (self.fetch)(object) {
            Some(value) => value,
            None => return Ok(false),
        };
        let literal = T::parse_literal(literal)?;
        Ok(op.matches_opt(value.compare(&literal)))
    }
}

/// How to read one named field out of an object of type `O`.
pub struct Field<O> {
    binding: Box<dyn Comparator<O>>,
}

impl<O> Field<O> {
    /// A field that can always be read.
    ///
    /// ```
    /// use fieldexpr::Field;
    ///
    /// struct Packet {
    ///     port: u16,
    /// }
    ///
    /// let port = Field::new(|packet: &Packet| packet.port);
    /// # let _ = port;
    /// ```
    pub fn new<T, F>(fetch: F) -> Self
    where
        F: Fn(&O) -> T + Send + Sync + 'static,
        T: FieldValue + 'static,
    {
        Self::checked(move |object: &O| Some(fetch(object)))
    }

    /// A field that may have no meaningful value for some objects.
    ///
    /// When `fetch` returns `None` every comparison on the field is false,
    /// whatever the operator and literal.
    pub fn checked<T, F>(fetch: F) -> Self
    where
        F: Fn(&O) -> Option<T> + Send + Sync + 'static,
        T: FieldValue + 'static,
    {
        Field {
            binding: Box::new(Accessor {
                fetch,
                value: PhantomData,
            }),
        }
    }

    /// Reads the field from `object` and compares it against `literal`
    /// converted to the field's type.
    ///
    /// Fails with a description of the problem if the literal cannot be
    /// converted.
    pub(crate) fn compare(&self, object: &O, op: OrderingOp, literal: &str) -> Result<bool, String> {
        self.binding.compare(object, op, literal)
    }
}

impl<O> Debug for Field<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").finish_non_exhaustive()
    }
}

/// The registry of named fields readable from objects of type `O`.
pub struct Scheme<O> {
    fields: IndexMap<String, Field<O>, FnvBuildHasher>,
}

impl<O> Default for Scheme<O> {
    fn default() -> Self {
        Scheme {
            fields: IndexMap::default(),
        }
    }
}

impl<O> Debug for Scheme<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fields.keys()).finish()
    }
}

impl<O> Scheme<O> {
    /// Creates an empty scheme.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a scheme out of `(name, field)` pairs.
    pub fn from_fields<I, S>(fields: I) -> Result<Self, FieldRedefinitionError>
    where
        I: IntoIterator<Item = (S, Field<O>)>,
        S: Into<String>,
    {
        let mut scheme = Self::new();
        for (name, field) in fields {
            scheme.add_field(name, field)?;
        }
        Ok(scheme)
    }

    /// Registers a new field.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        field: Field<O>,
    ) -> Result<(), FieldRedefinitionError> {
        match self.fields.entry(name.into()) {
            Entry::Occupied(entry) => Err(FieldRedefinitionError(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(field);
                Ok(())
            }
        }
    }

    /// Looks a field up by name.
    pub fn get_field(&self, name: &str) -> Result<&Field<O>, UnknownFieldError> {
        self.fields.get(name).ok_or_else(|| UnknownFieldError {
            name: name.to_owned(),
        })
    }

    /// Checks whether a field is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Registered field names, in registration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns the number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Checks whether no fields are registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
