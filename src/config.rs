use std::env;
use std::fmt::Debug;
use std::str::FromStr;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Returns the value of the named environment variable, treating an
/// empty value as absent.
pub fn get_optional_variable(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the value of the named environment variable or the default.
pub fn get_variable_or(name: &str, default: &str) -> String {
    get_optional_variable(name).unwrap_or_else(|| default.to_owned())
}

/// Parses the named environment variable, falling back to the default
/// if it is absent. Panics if it is present but unparsable.
pub fn parse_variable_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Debug,
{
    match get_optional_variable(name) {
        Some(value) => value
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("parse {} ({:?}): {:?}", name, value, e)),
        None => default,
    }
}

/// Reads a boolean flag written as `1`/`0` or `true`/`false`.
pub fn parse_flag_or(name: &str, default: bool) -> bool {
    match get_optional_variable(name).as_deref().map(str::trim) {
        Some("1") | Some("true") => true,
        Some("0") | Some("false") => false,
        Some(other) => panic!("parse {} ({:?}) as a flag", name, other),
        None => default,
    }
}
