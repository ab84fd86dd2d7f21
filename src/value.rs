use rusqlite::types::{Value, ValueRef};

/// A single typed value travelling between the caller and the engine.
///
/// The engine stores integers as 64-bit and reals as 64-bit; narrower widths
/// widen on the way in and are range-checked on the way out. `Null` is a
/// distinct value, not an absent one: the optional bind variants map `None`
/// here.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Text value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// SQL NULL
    Null,
}

impl SqlValue {
    /// Check if this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Widen into the engine's storage classes.
    pub(crate) fn to_engine(&self) -> Value {
        match self {
            SqlValue::Int8(v) => Value::Integer(i64::from(*v)),
            SqlValue::Int16(v) => Value::Integer(i64::from(*v)),
            SqlValue::Int32(v) => Value::Integer(i64::from(*v)),
            SqlValue::Int64(v) => Value::Integer(*v),
            SqlValue::Float(v) => Value::Real(f64::from(*v)),
            SqlValue::Double(v) => Value::Real(*v),
            SqlValue::Text(v) => Value::Text(v.clone()),
            SqlValue::Blob(v) => Value::Blob(v.clone()),
            SqlValue::Null => Value::Null,
        }
    }

    /// Materialize a column value out of the engine. Result rows only ever
    /// contain the storage-class variants (`Int64`, `Double`, `Text`, `Blob`,
    /// `Null`).
    pub(crate) fn from_engine(value: ValueRef<'_>) -> SqlValue {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Int64(i),
            ValueRef::Real(f) => SqlValue::Double(f),
            ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
        }
    }
}
