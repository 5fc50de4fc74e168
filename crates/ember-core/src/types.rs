//! Value types, tensor dtypes, operator attributes, and source locations.

/// Data types carried by tensor values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    F32,
    F16,
    I32,
    I64,
    U8,
    U32,
    Bool,
}

impl DataType {
    /// Size of this data type in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
            DataType::F16 => 2,
            DataType::I64 => 8,
            DataType::U8 | DataType::Bool => 1,
        }
    }
}

/// Shape and dtype of a tensor value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorMeta {
    /// Element data type.
    pub dtype: DataType,

    /// Dimensions, outermost first. Traced graphs always carry concrete
    /// shapes; symbolic dimensions do not survive tracing.
    pub shape: Vec<usize>,
}

/// Type of a single value produced by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// An ordinary tensor value.
    Tensor(TensorMeta),

    /// An opaque side-channel value on certain multi-output nodes. A node
    /// whose handle output is consumed cannot be lowered; its semantics are
    /// unknown without the consumer.
    Handle,

    /// Marker type for a multi-output node itself. The individual results
    /// are projected by `Select` consumers, each carrying its own type.
    Multi,
}

impl ValueType {
    /// Create a tensor value type.
    pub fn tensor(dtype: DataType, shape: Vec<usize>) -> Self {
        ValueType::Tensor(TensorMeta { dtype, shape })
    }

    /// Check if this is the opaque handle type.
    pub fn is_handle(&self) -> bool {
        matches!(self, ValueType::Handle)
    }

    /// Check if this is the multi-output marker type.
    pub fn is_multi(&self) -> bool {
        matches!(self, ValueType::Multi)
    }
}

/// Attribute value types.
///
/// Also doubles as the scalar-literal argument representation for externally
/// defined operator instances (the 's' entries of a calling convention).
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    String(String),
    Tensor(Vec<u8>),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
}

impl TryFrom<AttributeValue> for f32 {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::Float(v) => Ok(v),
            _ => Err("Not a float".to_string()),
        }
    }
}

impl TryFrom<AttributeValue> for i64 {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::Int(v) => Ok(v),
            _ => Err("Not an int".to_string()),
        }
    }
}

impl TryFrom<AttributeValue> for String {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::String(v) => Ok(v),
            _ => Err("Not a string".to_string()),
        }
    }
}

impl TryFrom<AttributeValue> for Vec<i64> {
    type Error = String;

    fn try_from(value: AttributeValue) -> std::result::Result<Self, Self::Error> {
        match value {
            AttributeValue::Ints(v) => Ok(v),
            _ => Err("Not an int array".to_string()),
        }
    }
}

/// Where in the traced program a node came from.
///
/// Carried through lowering: every node a symbolic rule creates inherits the
/// source location of the node being lowered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Human-readable description (typically a host-language stack excerpt).
    pub description: String,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_conversions() {
        let kernel: Vec<i64> = AttributeValue::Ints(vec![3, 3]).try_into().unwrap();
        assert_eq!(kernel, vec![3, 3]);

        let alpha: f32 = AttributeValue::Float(0.5).try_into().unwrap();
        assert_eq!(alpha, 0.5);

        let result: Result<i64, _> = AttributeValue::Float(1.0).try_into();
        assert!(result.is_err());
    }

    #[test]
    fn test_value_type_predicates() {
        assert!(ValueType::Handle.is_handle());
        assert!(ValueType::Multi.is_multi());

        let tensor = ValueType::tensor(DataType::F32, vec![2, 3]);
        assert!(!tensor.is_handle());
        assert!(!tensor.is_multi());
    }

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(DataType::F32.size(), 4);
        assert_eq!(DataType::F16.size(), 2);
        assert_eq!(DataType::I64.size(), 8);
    }
}
