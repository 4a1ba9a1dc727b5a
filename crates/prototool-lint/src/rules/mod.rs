mod comments;
mod naming;
mod structure;

use crate::registry::Rule;

/// Every known rule. Registry construction sorts by id.
pub fn all() -> Vec<Rule> {
    let mut rules = Vec::new();
    rules.extend(naming::rules());
    rules.extend(structure::rules());
    rules.extend(comments::rules());
    rules
}

// Case helpers shared by the naming rules.

pub(crate) fn is_capitalized(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// UpperCamelCase: alphanumeric with no underscores.
pub(crate) fn is_camel_case(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

pub(crate) fn is_lower_snake_case(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub(crate) fn is_upper_snake_case(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// `TripUpdate` -> `TRIP_UPDATE`; used for enum value prefixes.
pub(crate) fn to_upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase()
            && i > 0
            && (chars[i - 1].is_ascii_lowercase()
                || chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase()))
            && !out.ends_with('_')
        {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_snake_conversion() {
        assert_eq!(to_upper_snake("TripUpdate"), "TRIP_UPDATE");
        assert_eq!(to_upper_snake("HTTPStatus"), "HTTP_STATUS");
        assert_eq!(to_upper_snake("Foo"), "FOO");
    }

    #[test]
    fn case_predicates() {
        assert!(is_camel_case("TripUpdate"));
        assert!(!is_camel_case("Trip_Update"));
        assert!(is_lower_snake_case("trip_id"));
        assert!(!is_lower_snake_case("TripId"));
        assert!(is_upper_snake_case("TRIP_ID"));
        assert!(!is_upper_snake_case("trip_id"));
    }
}
