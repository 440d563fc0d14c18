//! Structural type values for block sockets and AST nodes.
//!
//! Every type has one canonical string form. It is the map key used by the transformer
//! registry and the wire format of persisted socket checks, so `Display` and `FromStr`
//! must round-trip exactly.

pub mod compatibility;
pub mod inference;
pub mod parse_types;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use compatibility::{
    NullPolicy, WILDCARD_SPECIFICITY_COST, check_type_compatibility,
    check_type_compatibility_with, specificity_cost,
};
pub use inference::{TypedSockets, infer_abstract_type, replace_abstract_type};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IType {
    Number,
    String,
    Boolean,
    Timestamp,
    Null,

    // Parametric placeholder, bound by inference
    Wildcard,

    Nullable(Box<IType>),
    Union(Vec<IType>),
    List(Box<IType>),

    // Fields are kept sorted so the canonical string is stable
    Struct(BTreeMap<String, IType>),

    Enum(String),
    Hierarchy(String),

    Event(Box<IType>),
    Interval(Box<IType>),
    Timeline(Box<IType>),
}

impl IType {
    pub fn nullable(inner: IType) -> IType {
        IType::Nullable(Box::new(inner))
    }

    pub fn list(inner: IType) -> IType {
        IType::List(Box::new(inner))
    }

    pub fn event(inner: IType) -> IType {
        IType::Event(Box::new(inner))
    }

    pub fn interval(inner: IType) -> IType {
        IType::Interval(Box::new(inner))
    }

    pub fn timeline(inner: IType) -> IType {
        IType::Timeline(Box::new(inner))
    }

    pub fn union(members: impl IntoIterator<Item = IType>) -> IType {
        IType::Union(members.into_iter().collect())
    }

    pub fn structure<K: Into<String>>(fields: impl IntoIterator<Item = (K, IType)>) -> IType {
        IType::Struct(
            fields
                .into_iter()
                .map(|(name, field_type)| (name.into(), field_type))
                .collect(),
        )
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            IType::Number | IType::String | IType::Boolean | IType::Timestamp | IType::Null
        )
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, IType::Wildcard)
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, IType::Nullable(_))
    }

    pub fn is_union(&self) -> bool {
        matches!(self, IType::Union(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, IType::List(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, IType::Struct(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, IType::Enum(_))
    }

    pub fn is_hierarchy(&self) -> bool {
        matches!(self, IType::Hierarchy(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self, IType::Event(_))
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, IType::Interval(_))
    }

    pub fn is_timeline(&self) -> bool {
        matches!(self, IType::Timeline(_))
    }

    /// True if a wildcard appears anywhere inside this type.
    pub fn contains_wildcard(&self) -> bool {
        match self {
            IType::Wildcard => true,
            IType::Nullable(inner)
            | IType::List(inner)
            | IType::Event(inner)
            | IType::Interval(inner)
            | IType::Timeline(inner) => inner.contains_wildcard(),
            IType::Union(members) => members.iter().any(IType::contains_wildcard),
            IType::Struct(fields) => fields.values().any(IType::contains_wildcard),
            _ => false,
        }
    }

    /// The canonical string of this type.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IType::Number => write!(f, "number"),
            IType::String => write!(f, "string"),
            IType::Boolean => write!(f, "boolean"),
            IType::Timestamp => write!(f, "timestamp"),
            IType::Null => write!(f, "null"),
            IType::Wildcard => write!(f, "*"),
            IType::Nullable(inner) => write!(f, "nullable<{}>", inner),
            IType::List(inner) => write!(f, "list<{}>", inner),
            IType::Event(inner) => write!(f, "event<{}>", inner),
            IType::Interval(inner) => write!(f, "interval<{}>", inner),
            IType::Timeline(inner) => write!(f, "timeline<{}>", inner),
            IType::Enum(name) => {
                write!(f, "enum<")?;
                write_name(f, name)?;
                write!(f, ">")
            }
            IType::Hierarchy(name) => {
                write!(f, "hierarchy<")?;
                write_name(f, name)?;
                write!(f, ">")
            }
            IType::Union(members) => {
                write!(f, "union<")?;
                for (index, member) in members.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", member)?;
                }
                write!(f, ">")
            }
            IType::Struct(fields) => {
                write!(f, "struct<")?;
                for (index, (name, field_type)) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    write_name(f, name)?;
                    write!(f, ":{}", field_type)?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Names are written bare unless the parser would split them, then they are quoted with
/// `"` and `\` escaped.
fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if !name.is_empty() && !name.chars().any(parse_types::is_name_delimiter) {
        return write!(f, "{}", name);
    }

    write!(f, "\"")?;
    for ch in name.chars() {
        if matches!(ch, '"' | '\\') {
            write!(f, "\\")?;
        }
        write!(f, "{}", ch)?;
    }
    write!(f, "\"")
}

impl FromStr for IType {
    type Err = crate::compiler_frontend::compiler_errors::CompilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_types::parse_type(s)
    }
}

impl Serialize for IType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_types::parse_type(&text).map_err(|e| serde::de::Error::custom(e.msg))
    }
}
