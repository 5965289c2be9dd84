//! HTML escaping of dynamic values

use std::borrow::Cow;

use crate::value::Value;

/// Escapes a string for safe interpolation into HTML content
pub fn html_str(input: &str) -> Cow<'_, str> {
    html_escape::encode_safe(input)
}

/// Escapes a value's text form; non-scalar values produce nothing
pub fn html(value: &Value) -> String {
    if !value.is_scalar() {
        return String::new();
    }
    html_str(&value.to_string()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_markup_characters() {
        assert_eq!(
            html_str(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;&#x2F;a&gt;"
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_str("plain text"), "plain text");
    }

    #[test]
    fn test_scalar_values_escape() {
        assert_eq!(html(&Value::from("<b>")), "&lt;b&gt;");
        assert_eq!(html(&Value::from(12)), "12");
        assert_eq!(html(&Value::from(false)), "false");
    }

    #[test]
    fn test_non_scalar_values_are_empty() {
        assert_eq!(html(&Value::Null), "");
        assert_eq!(html(&Value::List(vec![Value::from(1)])), "");
    }
}
