use std::fmt;

use serde::Deserialize;

/// A declared type, as supplied by route and entity descriptors.
///
/// String forms: `"Integer"`, `"[String]"` or `"Array[String]"` for arrays,
/// `"[String, Integer]"` for a value admitting several types. In manifests a
/// list of one type is an array and a list of several is a multi-type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawToken")]
pub enum TypeToken {
    Named(String),
    ArrayOf(Box<TypeToken>),
    OneOf(Vec<TypeToken>),
}

impl TypeToken {
    pub fn named(name: &str) -> Self {
        TypeToken::Named(name.to_string())
    }

    pub fn array_of(inner: TypeToken) -> Self {
        TypeToken::ArrayOf(Box::new(inner))
    }

    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();

        if let Some(inner) = trimmed
            .strip_prefix("Array[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return TypeToken::array_of(Self::parse_or_string(inner));
        }

        if let Some(inner) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let mut parts: Vec<TypeToken> = split_top_level(inner)
                .into_iter()
                .map(TypeToken::parse)
                .collect();
            return match parts.len() {
                0 => TypeToken::array_of(TypeToken::named("String")),
                1 => TypeToken::array_of(parts.remove(0)),
                _ => TypeToken::OneOf(parts),
            };
        }

        TypeToken::Named(trimmed.to_string())
    }

    fn parse_or_string(input: &str) -> Self {
        if input.trim().is_empty() {
            TypeToken::named("String")
        } else {
            TypeToken::parse(input)
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeToken::Named(name) => f.write_str(name),
            TypeToken::ArrayOf(inner) => write!(f, "[{inner}]"),
            TypeToken::OneOf(variants) => {
                let parts: Vec<String> = variants.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for TypeToken {
    fn from(value: &str) -> Self {
        TypeToken::parse(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawToken {
    One(String),
    Many(Vec<RawToken>),
}

impl From<RawToken> for TypeToken {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::One(s) => TypeToken::parse(&s),
            RawToken::Many(items) => {
                let mut parts: Vec<TypeToken> = items.into_iter().map(TypeToken::from).collect();
                match parts.len() {
                    0 => TypeToken::array_of(TypeToken::named("String")),
                    1 => TypeToken::array_of(parts.remove(0)),
                    _ => TypeToken::OneOf(parts),
                }
            }
        }
    }
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = input[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts.retain(|p| !p.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named() {
        assert_eq!(TypeToken::parse(" Integer "), TypeToken::named("Integer"));
        assert_eq!(
            TypeToken::parse("API::Entities::User"),
            TypeToken::named("API::Entities::User")
        );
    }

    #[test]
    fn test_parse_arrays() {
        let expected = TypeToken::array_of(TypeToken::named("Integer"));
        assert_eq!(TypeToken::parse("[Integer]"), expected);
        assert_eq!(TypeToken::parse("Array[Integer]"), expected);
        assert_eq!(
            TypeToken::parse("Array[]"),
            TypeToken::array_of(TypeToken::named("String"))
        );
    }

    #[test]
    fn test_parse_multi_type_keeps_order_and_duplicates() {
        assert_eq!(
            TypeToken::parse("[String, Integer, String]"),
            TypeToken::OneOf(vec![
                TypeToken::named("String"),
                TypeToken::named("Integer"),
                TypeToken::named("String"),
            ])
        );
    }

    #[test]
    fn test_parse_nested_array_in_multi_type() {
        assert_eq!(
            TypeToken::parse("[[Integer], String]"),
            TypeToken::OneOf(vec![
                TypeToken::array_of(TypeToken::named("Integer")),
                TypeToken::named("String"),
            ])
        );
    }

    #[test]
    fn test_deserialize_list_forms() {
        let multi: TypeToken = serde_json::from_str(r#"["String", "Integer"]"#).unwrap();
        assert_eq!(
            multi,
            TypeToken::OneOf(vec![TypeToken::named("String"), TypeToken::named("Integer")])
        );
        let array: TypeToken = serde_json::from_str(r#"["Node"]"#).unwrap();
        assert_eq!(array, TypeToken::array_of(TypeToken::named("Node")));
        let named: TypeToken = serde_json::from_str(r#""Boolean""#).unwrap();
        assert_eq!(named, TypeToken::named("Boolean"));
    }

    #[test]
    fn test_display_round_trips_shape() {
        let token = TypeToken::parse("[String, [Integer]]");
        assert_eq!(token.to_string(), "[String, [Integer]]");
    }
}
