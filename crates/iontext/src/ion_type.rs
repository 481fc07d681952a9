use core::fmt;

/// The Ion data types.
///
/// Shared by every reader of the format: the text reader in this crate and
/// any binary codec or document loader built on the same pull API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IonType {
    /// The untyped `null`.
    Null,
    /// `true` or `false`.
    Bool,
    /// Arbitrary-precision integer.
    Int,
    /// 64-bit binary floating point.
    Float,
    /// Arbitrary-precision decimal.
    Decimal,
    /// Point in time.
    Timestamp,
    /// Symbolic atom.
    Symbol,
    /// Unicode text.
    String,
    /// Character large object.
    Clob,
    /// Binary large object.
    Blob,
    /// Ordered collection.
    List,
    /// S-expression.
    Sexp,
    /// Collection of named fields.
    Struct,
}

impl IonType {
    /// Looks up the type named in a typed null such as `null.int`.
    pub fn from_keyword(name: &str) -> Option<Self> {
        let ty = match name {
            "null" => IonType::Null,
            "bool" => IonType::Bool,
            "int" => IonType::Int,
            "float" => IonType::Float,
            "decimal" => IonType::Decimal,
            "timestamp" => IonType::Timestamp,
            "symbol" => IonType::Symbol,
            "string" => IonType::String,
            "clob" => IonType::Clob,
            "blob" => IonType::Blob,
            "list" => IonType::List,
            "sexp" => IonType::Sexp,
            "struct" => IonType::Struct,
            _ => return None,
        };
        Some(ty)
    }

    /// The keyword for this type, as written after `null.`.
    pub fn as_str(self) -> &'static str {
        match self {
            IonType::Null => "null",
            IonType::Bool => "bool",
            IonType::Int => "int",
            IonType::Float => "float",
            IonType::Decimal => "decimal",
            IonType::Timestamp => "timestamp",
            IonType::Symbol => "symbol",
            IonType::String => "string",
            IonType::Clob => "clob",
            IonType::Blob => "blob",
            IonType::List => "list",
            IonType::Sexp => "sexp",
            IonType::Struct => "struct",
        }
    }

    /// Whether values of this type can be stepped into.
    pub fn is_container(self) -> bool {
        matches!(self, IonType::List | IonType::Sexp | IonType::Struct)
    }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
