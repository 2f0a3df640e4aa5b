//! Record reflection: named, typed field access over caller-defined records.
//!
//! A record exposes its fields through [`Fields`], indexed in declaration order.
//! Static record types get their implementation from [`record!`](crate::record),
//! which generates a per-type descriptor table ([`FieldSpec`]s) together with the
//! matching accessors. [`DynRecord`] implements the same capability for shapes
//! assembled at runtime.

use std::{borrow::Cow, rc::Rc};

use crate::value::{Datum, ScalarType, Slot, Value};

/// A named field set whose members are one of the supported scalar types.
///
/// Indices run from `0` to `field_count() - 1` in declaration order. Accessors
/// return `None` for an out-of-range index.
pub trait Fields {
    fn field_count(&self) -> usize;

    fn field_name(&self, index: usize) -> Option<&str>;

    /// Typed mutable slot for the column readers.
    fn field_slot(&mut self, index: usize) -> Option<Slot<'_>>;

    /// Typed value for the binders.
    fn field_value(&self, index: usize) -> Option<Value<'_>>;
}

/// A field set that can be constructed fresh for every row.
pub trait Record: Fields + Default {}

impl<T: Fields + Default> Record for T {}

/// Rust types usable as record fields.
pub trait Scalar {
    const TYPE: ScalarType;

    fn slot(&mut self) -> Slot<'_>;

    fn value(&self) -> Value<'_>;
}

impl Scalar for i32 {
    const TYPE: ScalarType = ScalarType::Int;

    fn slot(&mut self) -> Slot<'_> {
        Slot::Int(self)
    }

    fn value(&self) -> Value<'_> {
        Value::Int(*self)
    }
}

impl Scalar for i64 {
    const TYPE: ScalarType = ScalarType::Int64;

    fn slot(&mut self) -> Slot<'_> {
        Slot::Int64(self)
    }

    fn value(&self) -> Value<'_> {
        Value::Int64(*self)
    }
}

impl Scalar for f32 {
    const TYPE: ScalarType = ScalarType::Float;

    fn slot(&mut self) -> Slot<'_> {
        Slot::Float(self)
    }

    fn value(&self) -> Value<'_> {
        Value::Double(f64::from(*self))
    }
}

impl Scalar for f64 {
    const TYPE: ScalarType = ScalarType::Double;

    fn slot(&mut self) -> Slot<'_> {
        Slot::Double(self)
    }

    fn value(&self) -> Value<'_> {
        Value::Double(*self)
    }
}

impl Scalar for String {
    const TYPE: ScalarType = ScalarType::Text;

    fn slot(&mut self) -> Slot<'_> {
        Slot::Text(self)
    }

    fn value(&self) -> Value<'_> {
        Value::Text(self)
    }
}

/// Name and type of one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    pub name: Cow<'static, str>,
    pub ty: ScalarType,
}

impl FieldSpec {
    pub fn new(name: impl Into<Cow<'static, str>>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub const fn borrowed(name: &'static str, ty: ScalarType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            ty,
        }
    }

    pub fn int(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ScalarType::Int)
    }

    pub fn int64(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ScalarType::Int64)
    }

    pub fn float(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ScalarType::Float)
    }

    pub fn double(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ScalarType::Double)
    }

    pub fn text(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ScalarType::Text)
    }
}

/// Declare a record struct together with its [`Fields`] implementation.
///
/// The struct derives `Default`; further derives go on the declaration as usual.
/// Field types must implement [`Scalar`].
///
/// ```
/// sqlrec::record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Person {
///         pub id: i32,
///         pub name: String,
///     }
/// }
///
/// assert_eq!(Person::FIELDS[1].name, "name");
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name {
            $($(#[$fmeta])* $fvis $field: $ty,)*
        }

        impl $name {
            /// Field descriptors in declaration order.
            pub const FIELDS: &'static [$crate::FieldSpec] = &[
                $($crate::FieldSpec::borrowed(
                    stringify!($field),
                    <$ty as $crate::Scalar>::TYPE,
                ),)*
            ];
        }

        impl $crate::Fields for $name {
            fn field_count(&self) -> usize {
                Self::FIELDS.len()
            }

            fn field_name(&self, index: usize) -> Option<&str> {
                Self::FIELDS.get(index).map(|f| &*f.name)
            }

            #[allow(unused_mut, unused_assignments, unused_variables)]
            fn field_slot(&mut self, index: usize) -> Option<$crate::Slot<'_>> {
                let mut i = 0usize;
                $(
                    if i == index {
                        return Some($crate::Scalar::slot(&mut self.$field));
                    }
                    i += 1;
                )*
                None
            }

            #[allow(unused_mut, unused_assignments, unused_variables)]
            fn field_value(&self, index: usize) -> Option<$crate::Value<'_>> {
                let mut i = 0usize;
                $(
                    if i == index {
                        return Some($crate::Scalar::value(&self.$field));
                    }
                    i += 1;
                )*
                None
            }
        }
    };
}

/// A record whose shape is given at runtime by a list of [`FieldSpec`]s.
///
/// Every field starts at the zero value of its type.
#[derive(Debug, Clone, PartialEq)]
pub struct DynRecord {
    shape: Rc<[FieldSpec]>,
    values: Vec<Datum>,
}

impl DynRecord {
    pub fn new(specs: &[FieldSpec]) -> Self {
        Self::with_shape(Rc::from(specs))
    }

    pub(crate) fn with_shape(shape: Rc<[FieldSpec]>) -> Self {
        let values = shape.iter().map(|f| Datum::zero(f.ty)).collect();
        Self { shape, values }
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.shape
    }

    /// First field called `name`.
    pub fn get(&self, name: &str) -> Option<&Datum> {
        self.shape
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.values[i])
    }

    pub fn values(&self) -> &[Datum] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Datum> {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.shape
            .iter()
            .map(|f| &*f.name)
            .zip(self.values.iter())
    }
}

impl Fields for DynRecord {
    fn field_count(&self) -> usize {
        self.values.len()
    }

    fn field_name(&self, index: usize) -> Option<&str> {
        self.shape.get(index).map(|f| &*f.name)
    }

    fn field_slot(&mut self, index: usize) -> Option<Slot<'_>> {
        self.values.get_mut(index).map(Datum::as_slot)
    }

    fn field_value(&self, index: usize) -> Option<Value<'_>> {
        self.values.get(index).map(Datum::as_value)
    }
}
