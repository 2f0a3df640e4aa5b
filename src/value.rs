use std::fmt;

/// The scalar types a record field may have.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int,
    Int64,
    Float,
    Double,
    Text,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScalarType::Int => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::Text => "text",
        };
        f.write_str(s)
    }
}

/// A borrowed scalar, as handed to the binders.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Int(i32),
    Int64(i64),
    Double(f64),
    Text(&'a str),
}

/// A typed mutable view of one record field, as filled by the column readers.
#[derive(Debug)]
pub enum Slot<'a> {
    Int(&'a mut i32),
    Int64(&'a mut i64),
    /// Read through the double reader and narrowed.
    Float(&'a mut f32),
    Double(&'a mut f64),
    Text(&'a mut String),
}

impl Slot<'_> {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Slot::Int(_) => ScalarType::Int,
            Slot::Int64(_) => ScalarType::Int64,
            Slot::Float(_) => ScalarType::Float,
            Slot::Double(_) => ScalarType::Double,
            Slot::Text(_) => ScalarType::Text,
        }
    }
}

/// An owned scalar. Backs the fields of [`DynRecord`](crate::DynRecord).
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Text(String),
}

impl Datum {
    /// The zero value of `ty`: what a field holds before any column fills it.
    pub fn zero(ty: ScalarType) -> Self {
        match ty {
            ScalarType::Int => Datum::Int(0),
            ScalarType::Int64 => Datum::Int64(0),
            ScalarType::Float => Datum::Float(0.0),
            ScalarType::Double => Datum::Double(0.0),
            ScalarType::Text => Datum::Text(String::new()),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Datum::Int(_) => ScalarType::Int,
            Datum::Int64(_) => ScalarType::Int64,
            Datum::Float(_) => ScalarType::Float,
            Datum::Double(_) => ScalarType::Double,
            Datum::Text(_) => ScalarType::Text,
        }
    }

    pub fn as_value(&self) -> Value<'_> {
        match self {
            Datum::Int(v) => Value::Int(*v),
            Datum::Int64(v) => Value::Int64(*v),
            Datum::Float(v) => Value::Double(f64::from(*v)),
            Datum::Double(v) => Value::Double(*v),
            Datum::Text(v) => Value::Text(v),
        }
    }

    pub fn as_slot(&mut self) -> Slot<'_> {
        match self {
            Datum::Int(v) => Slot::Int(v),
            Datum::Int64(v) => Slot::Int64(v),
            Datum::Float(v) => Slot::Float(v),
            Datum::Double(v) => Slot::Double(v),
            Datum::Text(v) => Slot::Text(v),
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Datum::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int64(v) => Some(*v),
            Datum::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Double(v) => Some(*v),
            Datum::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// A value that can be bound to a statement placeholder.
pub trait ToSql {
    fn to_sql(&self) -> Value<'_>;
}

impl ToSql for i32 {
    fn to_sql(&self) -> Value<'_> {
        Value::Int(*self)
    }
}

impl ToSql for i64 {
    fn to_sql(&self) -> Value<'_> {
        Value::Int64(*self)
    }
}

impl ToSql for f64 {
    fn to_sql(&self) -> Value<'_> {
        Value::Double(*self)
    }
}

impl ToSql for f32 {
    fn to_sql(&self) -> Value<'_> {
        Value::Double(f64::from(*self))
    }
}

impl ToSql for str {
    fn to_sql(&self) -> Value<'_> {
        Value::Text(self)
    }
}

impl ToSql for String {
    fn to_sql(&self) -> Value<'_> {
        Value::Text(self)
    }
}

impl ToSql for Datum {
    fn to_sql(&self) -> Value<'_> {
        self.as_value()
    }
}

impl ToSql for Value<'_> {
    fn to_sql(&self) -> Value<'_> {
        *self
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Value<'_> {
        match self {
            Some(v) => v.to_sql(),
            None => Value::Null,
        }
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Value<'_> {
        (**self).to_sql()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binders_follow_rust_type() {
        assert_eq!(7i32.to_sql(), Value::Int(7));
        assert_eq!(7i64.to_sql(), Value::Int64(7));
        assert_eq!(1.5f32.to_sql(), Value::Double(1.5));
        assert_eq!("a\0b".to_sql(), Value::Text("a\0b"));
        assert_eq!(None::<i32>.to_sql(), Value::Null);
        assert_eq!(Some(String::from("x")).to_sql(), Value::Text("x"));
    }

    #[test]
    fn datum_slot_writes_through() {
        let mut d = Datum::zero(ScalarType::Text);
        if let Slot::Text(s) = d.as_slot() {
            s.push_str("Ada");
        }
        assert_eq!(d.as_str(), Some("Ada"));

        let mut d = Datum::zero(ScalarType::Int);
        assert_eq!(d.as_slot().scalar_type(), ScalarType::Int);
        if let Slot::Int(v) = d.as_slot() {
            *v = 42;
        }
        assert_eq!(d.as_i32(), Some(42));
        assert_eq!(d.as_i64(), Some(42));
    }

    #[test]
    fn float_datum_binds_as_double() {
        let mut d = Datum::zero(ScalarType::Float);
        if let Slot::Float(v) = d.as_slot() {
            *v = 0.25;
        }
        assert_eq!(d.as_value(), Value::Double(0.25));
        assert_eq!(d.as_f64(), Some(0.25));
        assert_eq!(d.scalar_type().to_string(), "float");
    }
}
