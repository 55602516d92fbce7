//! Serde helpers for 128-bit naturals.
//!
//! Encoded as decimal strings; decoded from either a string or a JSON number.

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NatRepr {
    Number(u64),
    Text(String),
}

impl NatRepr {
    fn into_u128<E: serde::de::Error>(self) -> Result<u128, E> {
        match self {
            Self::Number(value) => Ok(u128::from(value)),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("'{text}' is not a natural number"))),
        }
    }
}

pub(crate) fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    NatRepr::deserialize(deserializer)?.into_u128()
}

pub(crate) mod option {
    use super::NatRepr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(
        value: &Option<u128>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        Option::<NatRepr>::deserialize(deserializer)?
            .map(NatRepr::into_u128)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super")]
        required: u128,
        #[serde(default, with = "super::option")]
        optional: Option<u128>,
    }

    #[test]
    fn test_large_values_survive() {
        let holder = Holder {
            required: u128::MAX,
            optional: Some(1 << 100),
        };
        let wire = serde_json::to_value(&holder).unwrap();
        assert_eq!(wire["required"], json!(u128::MAX.to_string()));
        assert_eq!(serde_json::from_value::<Holder>(wire).unwrap(), holder);
    }

    #[test]
    fn test_accepts_plain_numbers() {
        let holder: Holder = serde_json::from_value(json!({"required": 5})).unwrap();
        assert_eq!(holder.required, 5);
        assert_eq!(holder.optional, None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_value::<Holder>(json!({"required": "-1"})).is_err());
    }
}
