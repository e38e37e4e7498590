//! Bound parameter sets.

use crate::error::{TplError, TplResult};
use crate::value::Value;
use std::collections::BTreeMap;

/// The values bound to a query template.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// No parameters were supplied; the template is used verbatim.
    #[default]
    None,
    /// Values for `?` placeholders, in order.
    Positional(Vec<Value>),
    /// Values for `:name` placeholders.
    Named(BTreeMap<String, Value>),
}

impl Params {
    /// Build a positional parameter set.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Build a named parameter set.
    pub fn named<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Params::Named(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// `true` for [`Params::None`] and for empty sets.
    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(values) => values.is_empty(),
            Params::Named(values) => values.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Positional(values) => values.len(),
            Params::Named(values) => values.len(),
        }
    }

    /// Append a positional value. Turns [`Params::None`] into a positional set.
    pub fn push(&mut self, value: impl Into<Value>) -> TplResult<()> {
        match self {
            Params::None => {
                *self = Params::Positional(vec![value.into()]);
                Ok(())
            }
            Params::Positional(values) => {
                values.push(value.into());
                Ok(())
            }
            Params::Named(_) => Err(TplError::MixedPlaceholders {
                template: "positional value bound to a named parameter set".to_string(),
            }),
        }
    }

    /// Insert a named value. Turns [`Params::None`] into a named set.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> TplResult<()> {
        match self {
            Params::None => {
                *self = Params::Named(BTreeMap::from([(name.into(), value.into())]));
                Ok(())
            }
            Params::Named(values) => {
                values.insert(name.into(), value.into());
                Ok(())
            }
            Params::Positional(_) => Err(TplError::MixedPlaceholders {
                template: "named value bound to a positional parameter set".to_string(),
            }),
        }
    }

    /// JSON view of the parameters (for error reports and the CLI).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Params::None => serde_json::Value::Null,
            Params::Positional(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
            Params::Named(values) => serde_json::Value::Object(
                values
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<serde_json::Value> for Params {
    type Error = TplError;

    /// Arrays become positional sets, objects named sets, `null` no parameters,
    /// and any other scalar a single positional value.
    fn try_from(v: serde_json::Value) -> TplResult<Self> {
        match v {
            serde_json::Value::Null => Ok(Params::None),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<TplResult<Vec<_>>>()
                .map(Params::Positional),
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
                .collect::<TplResult<BTreeMap<_, _>>>()
                .map(Params::Named),
            scalar => Ok(Params::Positional(vec![Value::try_from(scalar)?])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_insert_promote_none() {
        let mut p = Params::None;
        p.push(1).unwrap();
        p.push("a").unwrap();
        assert_eq!(p, Params::positional([Value::Int(1), Value::Text("a".into())]));
        assert!(p.insert("x", 1).is_err());

        let mut n = Params::None;
        n.insert("id", 5).unwrap();
        assert_eq!(n.len(), 1);
        assert!(n.push(1).is_err());
    }

    #[test]
    fn from_json_shapes() {
        assert_eq!(Params::try_from(serde_json::Value::Null).unwrap(), Params::None);
        assert_eq!(
            Params::try_from(serde_json::json!(7)).unwrap(),
            Params::positional([7])
        );
        assert_eq!(
            Params::try_from(serde_json::json!({"ids": [1, 2]})).unwrap(),
            Params::named([("ids", vec![1, 2])])
        );
    }
}
