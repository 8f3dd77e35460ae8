//! Custom MiniJinja filters for code generation
//!
//! Case conversion for IDL identifiers, plus `last_segment` for turning an
//! import path into a package name.

use crate::util;
use minijinja::Environment;

/// Register the identifier filters on a render environment
pub fn register_filters(env: &mut Environment<'_>) {
    env.add_filter("pascal_case", pascal);
    env.add_filter("camel_case", camel);
    env.add_filter("snake_case", snake);
    env.add_filter("upper_snake_case", upper_snake);
    env.add_filter("last_segment", last_segment);
}

fn pascal(value: &str) -> String {
    util::to_pascal_case(value)
}

fn camel(value: &str) -> String {
    util::to_camel_case(value)
}

fn snake(value: &str) -> String {
    util::to_snake_case(value)
}

fn upper_snake(value: &str) -> String {
    util::to_upper_snake_case(value)
}

/// `github.com/acme/model` -> `model`
fn last_segment(value: &str) -> String {
    util::last_segment(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> String {
        let mut env = Environment::new();
        register_filters(&mut env);
        env.render_str(source, ()).unwrap()
    }

    #[test]
    fn test_case_filters() {
        assert_eq!(render("{{ 'SayHello' | snake_case }}"), "say_hello");
        assert_eq!(render("{{ 'say_hello' | pascal_case }}"), "SayHello");
        assert_eq!(render("{{ 'SayHello' | camel_case }}"), "sayHello");
        assert_eq!(render("{{ 'SayHello' | upper_snake_case }}"), "SAY_HELLO");
    }

    #[test]
    fn test_last_segment_filter() {
        assert_eq!(render("{{ 'github.com/acme/model' | last_segment }}"), "model");
    }
}
