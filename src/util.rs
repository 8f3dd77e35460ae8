//! Shared utility functions
//!
//! Case conversion used by the template filters and the built-in path
//! templates. IDL names arrive in PascalCase (`SayHello`), snake_case or a
//! mix with acronyms (`GetHTTPStatus`).

/// Split an identifier into lowercase words.
///
/// Word boundaries are underscores, hyphens, lower-to-upper transitions and
/// the last capital of an acronym run (`HTTPServer` -> `http`, `server`).
fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert to PascalCase
///
/// # Examples
/// ```
/// use layergen::util::to_pascal_case;
/// assert_eq!(to_pascal_case("say_hello"), "SayHello");
/// assert_eq!(to_pascal_case("SayHello"), "SayHello");
/// ```
pub fn to_pascal_case(s: &str) -> String {
    words(s).iter().map(|w| capitalize(w)).collect()
}

/// Convert to camelCase
///
/// # Examples
/// ```
/// use layergen::util::to_camel_case;
/// assert_eq!(to_camel_case("SayHello"), "sayHello");
/// ```
pub fn to_camel_case(s: &str) -> String {
    words(s)
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
        .collect()
}

/// Convert to snake_case
///
/// # Examples
/// ```
/// use layergen::util::to_snake_case;
/// assert_eq!(to_snake_case("SayHello"), "say_hello");
/// assert_eq!(to_snake_case("GetHTTPStatus"), "get_http_status");
/// ```
pub fn to_snake_case(s: &str) -> String {
    words(s).join("_")
}

/// Convert to UPPER_SNAKE_CASE
pub fn to_upper_snake_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

/// Last `/`-separated segment of an import path
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("hello_world"), "HelloWorld");
        assert_eq!(to_pascal_case("SayHello"), "SayHello");
        assert_eq!(to_pascal_case("greeter"), "Greeter");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("hello_world"), "helloWorld");
        assert_eq!(to_camel_case("SayHello"), "sayHello");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("SayHello"), "say_hello");
        assert_eq!(to_snake_case("fooBar"), "foo_bar");
        assert_eq!(to_snake_case("GetHTTPStatus"), "get_http_status");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("V2Api"), "v2_api");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn test_to_upper_snake_case() {
        assert_eq!(to_upper_snake_case("SayHello"), "SAY_HELLO");
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("github.com/acme/greeter/biz/model"), "model");
        assert_eq!(last_segment("model"), "model");
    }
}
