//! Positional argument lists.

use crate::{
    error::Result,
    record::Fields,
    value::{ToSql, Value},
};

/// An ordered list of arguments, bound left to right to placeholders `1..=n`.
///
/// Implemented for `()`, tuples of [`ToSql`] values up to twelve elements,
/// slices, arrays and vectors of [`ToSql`] values, and [`RecordParams`].
pub trait Params {
    /// Feed every argument, in order, to `bind`. Stops at the first error.
    fn bind_each(&self, bind: &mut dyn FnMut(Value<'_>) -> Result<()>) -> Result<()>;
}

impl Params for () {
    fn bind_each(&self, _bind: &mut dyn FnMut(Value<'_>) -> Result<()>) -> Result<()> {
        Ok(())
    }
}

impl<P: Params + ?Sized> Params for &P {
    fn bind_each(&self, bind: &mut dyn FnMut(Value<'_>) -> Result<()>) -> Result<()> {
        (**self).bind_each(bind)
    }
}

impl<T: ToSql> Params for [T] {
    fn bind_each(&self, bind: &mut dyn FnMut(Value<'_>) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|v| bind(v.to_sql()))
    }
}

impl<T: ToSql, const N: usize> Params for [T; N] {
    fn bind_each(&self, bind: &mut dyn FnMut(Value<'_>) -> Result<()>) -> Result<()> {
        self.as_slice().bind_each(bind)
    }
}

impl<T: ToSql> Params for Vec<T> {
    fn bind_each(&self, bind: &mut dyn FnMut(Value<'_>) -> Result<()>) -> Result<()> {
        self.as_slice().bind_each(bind)
    }
}

macro_rules! tuple_params {
    ($($name:ident)+) => {
        impl<$($name: ToSql),+> Params for ($($name,)+) {
            #[allow(non_snake_case)]
            fn bind_each(&self, bind: &mut dyn FnMut(Value<'_>) -> Result<()>) -> Result<()> {
                let ($($name,)+) = self;
                $(bind($name.to_sql())?;)+
                Ok(())
            }
        }
    };
}

tuple_params!(A);
tuple_params!(A B);
tuple_params!(A B C);
tuple_params!(A B C D);
tuple_params!(A B C D E);
tuple_params!(A B C D E F);
tuple_params!(A B C D E F G);
tuple_params!(A B C D E F G H);
tuple_params!(A B C D E F G H I);
tuple_params!(A B C D E F G H I J);
tuple_params!(A B C D E F G H I J K);
tuple_params!(A B C D E F G H I J K L);

/// Binds a record's fields in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct RecordParams<'a, R: ?Sized>(pub &'a R);

impl<R: Fields + ?Sized> Params for RecordParams<'_, R> {
    fn bind_each(&self, bind: &mut dyn FnMut(Value<'_>) -> Result<()>) -> Result<()> {
        (0..self.0.field_count())
            .filter_map(|i| self.0.field_value(i))
            .try_for_each(|v| bind(v))
    }
}

/// Heterogeneous argument slice: `params![42, "Ada", 1.5]`.
#[macro_export]
macro_rules! params {
    () => {
        &[] as &[&dyn $crate::ToSql]
    };
    ($($arg:expr),+ $(,)?) => {
        &[$(&$arg as &dyn $crate::ToSql),+] as &[&dyn $crate::ToSql]
    };
}
