//! Uniform view of VCF INFO and per-sample FORMAT values.
//!
//! The parsers in this module tree are pure functions; they consume this
//! owned representation rather than the reader's record types so that they
//! stay independent of the I/O layer and easy to exercise in tests.

use indexmap::IndexMap;
use noodles::vcf;

/// One typed INFO or FORMAT value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Flag,
    Integer(i64),
    Float(f64),
    String(String),
    IntegerArray(Vec<Option<i64>>),
    FloatArray(Vec<Option<f64>>),
    StringArray(Vec<Option<String>>),
}

impl Value {
    /// Convert from a noodles record buffer INFO value.
    pub fn from_info(value: &vcf::variant::record_buf::info::field::Value) -> Self {
        use vcf::variant::record_buf::info::field::{value::Array, Value as V};
        match value {
            V::Flag => Value::Flag,
            V::Integer(v) => Value::Integer(*v as i64),
            V::Float(v) => Value::Float(*v as f64),
            V::Character(v) => Value::String(v.to_string()),
            V::String(v) => Value::String(v.clone()),
            V::Array(Array::Integer(vs)) => {
                Value::IntegerArray(vs.iter().map(|v| v.map(|v| v as i64)).collect())
            }
            V::Array(Array::Float(vs)) => {
                Value::FloatArray(vs.iter().map(|v| v.map(|v| v as f64)).collect())
            }
            V::Array(Array::Character(vs)) => {
                Value::StringArray(vs.iter().map(|v| v.map(|v| v.to_string())).collect())
            }
            V::Array(Array::String(vs)) => Value::StringArray(vs.clone()),
        }
    }

    /// Convert from a noodles record buffer sample value.
    pub fn from_sample(value: &vcf::variant::record_buf::samples::sample::Value) -> Self {
        use vcf::variant::record_buf::samples::sample::{value::Array, Value as V};
        match value {
            V::Integer(v) => Value::Integer(*v as i64),
            V::Float(v) => Value::Float(*v as f64),
            V::Character(v) => Value::String(v.to_string()),
            V::String(v) => Value::String(v.clone()),
            V::Genotype(genotype) => {
                Value::String(crate::common::genotype_to_string(genotype).unwrap_or_default())
            }
            V::Array(Array::Integer(vs)) => {
                Value::IntegerArray(vs.iter().map(|v| v.map(|v| v as i64)).collect())
            }
            V::Array(Array::Float(vs)) => {
                Value::FloatArray(vs.iter().map(|v| v.map(|v| v as f64)).collect())
            }
            V::Array(Array::Character(vs)) => {
                Value::StringArray(vs.iter().map(|v| v.map(|v| v.to_string())).collect())
            }
            V::Array(Array::String(vs)) => Value::StringArray(vs.clone()),
        }
    }
}

/// Key-value view over INFO or one sample's FORMAT values.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldMap {
    values: IndexMap<String, Value>,
}

impl FieldMap {
    /// Build from `(key, value)` pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Insert one value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Whether a key is present (flags included).
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Iterate over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// String rendition of a scalar value; arrays join on `,`.
    pub fn get_string(&self, key: &str) -> Option<String> {
        let render = |v: &Value| -> Option<String> {
            match v {
                Value::Flag => None,
                Value::Integer(v) => Some(v.to_string()),
                Value::Float(v) => Some(v.to_string()),
                Value::String(v) => Some(v.clone()),
                _ => None,
            }
        };
        match self.values.get(key)? {
            Value::IntegerArray(vs) => Some(
                vs.iter()
                    .map(|v| v.map_or_else(|| String::from("."), |v| v.to_string()))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Value::FloatArray(vs) => Some(
                vs.iter()
                    .map(|v| v.map_or_else(|| String::from("."), |v| v.to_string()))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Value::StringArray(vs) => Some(
                vs.iter()
                    .map(|v| v.clone().unwrap_or_else(|| String::from(".")))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            value => render(value),
        }
    }

    /// Integer lookup; numeric strings and single-element arrays coerce.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            Value::Integer(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::String(v) => v.trim().parse().ok(),
            Value::IntegerArray(vs) => vs.first().copied().flatten(),
            Value::FloatArray(vs) => vs.first().copied().flatten().map(|v| v as i64),
            Value::StringArray(vs) => vs
                .first()
                .and_then(|v| v.as_deref())
                .and_then(|v| v.trim().parse().ok()),
            Value::Flag => None,
        }
    }

    /// Float lookup; numeric strings and single-element arrays coerce.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(v) => v.trim().parse().ok(),
            Value::IntegerArray(vs) => vs.first().copied().flatten().map(|v| v as f64),
            Value::FloatArray(vs) => vs.first().copied().flatten(),
            Value::StringArray(vs) => vs
                .first()
                .and_then(|v| v.as_deref())
                .and_then(|v| v.trim().parse().ok()),
            Value::Flag => None,
        }
    }

    /// Integer list; scalars become one-element lists, `.` entries drop.
    pub fn get_i64_list(&self, key: &str) -> Option<Vec<i64>> {
        match self.values.get(key)? {
            Value::Integer(v) => Some(vec![*v]),
            Value::IntegerArray(vs) => Some(vs.iter().copied().flatten().collect()),
            Value::FloatArray(vs) => {
                Some(vs.iter().copied().flatten().map(|v| v as i64).collect())
            }
            Value::String(v) => Some(
                v.split(',')
                    .filter_map(|v| v.trim().parse().ok())
                    .collect(),
            ),
            Value::StringArray(vs) => Some(
                vs.iter()
                    .flatten()
                    .filter_map(|v| v.trim().parse().ok())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// String list; scalars split on `,`.
    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.values.get(key)? {
            Value::String(v) => Some(v.split(',').map(|v| v.trim().to_string()).collect()),
            Value::StringArray(vs) => Some(vs.iter().flatten().cloned().collect()),
            Value::IntegerArray(vs) => Some(
                vs.iter()
                    .flatten()
                    .map(|v| v.to_string())
                    .collect(),
            ),
            Value::Integer(v) => Some(vec![v.to_string()]),
            _ => None,
        }
    }
}
