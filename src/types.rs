use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Canonical scalar representation used in output rows.
///
/// Source values are normalized before they enter a row: booleans become the
/// strings "True"/"False", null and absent fields become `None`, numbers and
/// strings pass through, and composite values that reach a scalar position
/// are stringified. Synthetic identities carry their own variant so they are
/// distinguishable from source strings.
#[derive(Debug, Clone)]
pub enum DataValue {
    /// Sentinel for null or absent source values.
    None,
    Int(i64),
    Float(f64),
    Str(String),
    /// Synthetic content-hash identity (truncated SHA-256).
    Id(u64),
}

/// One translated row: an ordered tuple of normalized scalars.
pub type Row = Vec<DataValue>;

/// Per-table state: table name to the set of rows currently in that table.
/// Duplicate identical rows collapse; row order carries no meaning.
pub type TableState = HashMap<String, HashSet<Row>>;

impl DataValue {
    /// Normalize an arbitrary source value into its canonical scalar form.
    pub fn normalize(value: &Value) -> DataValue {
        match value {
            Value::Null => DataValue::None,
            Value::Bool(true) => DataValue::Str("True".to_string()),
            Value::Bool(false) => DataValue::Str("False".to_string()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DataValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    DataValue::Float(f)
                } else {
                    DataValue::Str(n.to_string())
                }
            }
            Value::String(s) => DataValue::Str(s.clone()),
            // Composite values in a scalar position are carried as their
            // compact JSON text.
            other => DataValue::Str(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DataValue::None => 0,
            DataValue::Int(_) => 1,
            DataValue::Float(_) => 2,
            DataValue::Str(_) => 3,
            DataValue::Id(_) => 4,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::None => write!(f, "None"),
            DataValue::Int(i) => write!(f, "{}", i),
            DataValue::Float(x) => write!(f, "{}", x),
            DataValue::Str(s) => write!(f, "{}", s),
            DataValue::Id(id) => write!(f, "{:016x}", id),
        }
    }
}

// Rows live in hash sets and get sorted before hashing, so the scalar needs
// total equality and a total order. Floats compare by bit pattern for
// equality and by total_cmp for ordering.
impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataValue::None, DataValue::None) => true,
            (DataValue::Int(a), DataValue::Int(b)) => a == b,
            (DataValue::Float(a), DataValue::Float(b)) => a.to_bits() == b.to_bits(),
            (DataValue::Str(a), DataValue::Str(b)) => a == b,
            (DataValue::Id(a), DataValue::Id(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            DataValue::None => {}
            DataValue::Int(i) => i.hash(state),
            DataValue::Float(f) => f.to_bits().hash(state),
            DataValue::Str(s) => s.hash(state),
            DataValue::Id(id) => id.hash(state),
        }
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DataValue::Int(a), DataValue::Int(b)) => a.cmp(b),
            (DataValue::Float(a), DataValue::Float(b)) => a.total_cmp(b),
            (DataValue::Str(a), DataValue::Str(b)) => a.cmp(b),
            (DataValue::Id(a), DataValue::Id(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

// Rows cross the process boundary as plain JSON scalars: identities render
// as their 16-hex-digit form, everything else as itself.
impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DataValue::None => serializer.serialize_unit(),
            DataValue::Int(i) => serializer.serialize_i64(*i),
            DataValue::Float(f) => serializer.serialize_f64(*f),
            DataValue::Str(s) => serializer.serialize_str(s),
            DataValue::Id(id) => serializer.serialize_str(&format!("{:016x}", id)),
        }
    }
}

struct DataValueVisitor;

impl<'de> Visitor<'de> for DataValueVisitor {
    type Value = DataValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON scalar")
    }

    fn visit_unit<E: de::Error>(self) -> Result<DataValue, E> {
        Ok(DataValue::None)
    }

    fn visit_none<E: de::Error>(self) -> Result<DataValue, E> {
        Ok(DataValue::None)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<DataValue, E> {
        Ok(DataValue::Str(if b { "True" } else { "False" }.to_string()))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<DataValue, E> {
        Ok(DataValue::Int(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<DataValue, E> {
        match i64::try_from(u) {
            Ok(i) => Ok(DataValue::Int(i)),
            Err(_) => Ok(DataValue::Float(u as f64)),
        }
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<DataValue, E> {
        Ok(DataValue::Float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<DataValue, E> {
        Ok(DataValue::Str(s.to_string()))
    }
}

// Synthetic identities come back as their string rendering; nothing in the
// scalar's wire form marks them apart from ordinary strings.
impl<'de> Deserialize<'de> for DataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DataValueVisitor)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::Str(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::Str(s)
    }
}

impl From<i64> for DataValue {
    fn from(i: i64) -> Self {
        DataValue::Int(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_scalars() {
        assert_eq!(DataValue::normalize(&json!("FOO")), DataValue::Str("FOO".into()));
        assert_eq!(DataValue::normalize(&json!(123)), DataValue::Int(123));
        assert_eq!(DataValue::normalize(&json!(null)), DataValue::None);
    }

    #[test]
    fn test_normalize_booleans_to_strings() {
        assert_eq!(DataValue::normalize(&json!(true)), DataValue::Str("True".into()));
        assert_eq!(DataValue::normalize(&json!(false)), DataValue::Str("False".into()));
    }

    #[test]
    fn test_normalize_composite_stringifies() {
        let v = DataValue::normalize(&json!({"a": 1}));
        assert_eq!(v, DataValue::Str("{\"a\":1}".into()));
    }

    #[test]
    fn test_serializes_as_plain_scalars() {
        assert_eq!(serde_json::to_value(DataValue::Int(1)).unwrap(), json!(1));
        assert_eq!(serde_json::to_value(DataValue::None).unwrap(), json!(null));
        assert_eq!(
            serde_json::to_value(DataValue::Id(0xabc)).unwrap(),
            json!("0000000000000abc")
        );
    }

    #[test]
    fn test_deserializes_scalars() {
        assert_eq!(
            serde_json::from_value::<DataValue>(json!(null)).unwrap(),
            DataValue::None
        );
        assert_eq!(
            serde_json::from_value::<DataValue>(json!(123)).unwrap(),
            DataValue::Int(123)
        );
        assert_eq!(
            serde_json::from_value::<DataValue>(json!(true)).unwrap(),
            DataValue::Str("True".into())
        );
        assert_eq!(
            serde_json::from_value::<DataValue>(json!(1.5)).unwrap(),
            DataValue::Float(1.5)
        );
    }

    #[test]
    fn test_rows_collapse_in_sets() {
        let mut set: HashSet<Row> = HashSet::new();
        set.insert(vec![DataValue::Int(1), DataValue::from("x")]);
        set.insert(vec![DataValue::Int(1), DataValue::from("x")]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ordering_is_total() {
        let mut values = vec![
            DataValue::Str("b".into()),
            DataValue::Int(2),
            DataValue::None,
            DataValue::Float(1.5),
            DataValue::Str("a".into()),
        ];
        values.sort();
        assert_eq!(values[0], DataValue::None);
        assert_eq!(values[1], DataValue::Int(2));
    }
}
