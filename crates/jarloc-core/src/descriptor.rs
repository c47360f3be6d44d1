//! Java-source rendering of field and method descriptors.
//!
//! `main([Ljava/lang/String;)V` renders as `void main(String[])`.

use crate::error::{Error, Result};

const JAVA_LANG: &str = "java.lang.";

/// Renders one field descriptor, e.g. `[[I` as `int[][]`
pub fn pretty_type(descriptor: &str) -> Result<String> {
    let (rendered, rest) = parse_field(descriptor, 0)?;
    if !rest.is_empty() {
        return Err(Error::decode(
            descriptor.len() - rest.len(),
            format!("trailing characters in field descriptor {:?}", descriptor),
        ));
    }
    Ok(rendered)
}

/// Renders a method as `return name(params)`
pub fn pretty_method(name: &str, descriptor: &str) -> Result<String> {
    let Some(mut rest) = descriptor.strip_prefix('(') else {
        return Err(Error::decode(
            0,
            format!("method descriptor {:?} does not start with '('", descriptor),
        ));
    };

    let mut params = Vec::new();
    loop {
        if let Some(after) = rest.strip_prefix(')') {
            rest = after;
            break;
        }
        let offset = descriptor.len() - rest.len();
        let (param, after) = parse_field(rest, offset)?;
        params.push(param);
        rest = after;
    }

    let return_type = if rest == "V" {
        "void".to_string()
    } else {
        pretty_type(rest).map_err(|_| {
            Error::decode(
                descriptor.len() - rest.len(),
                format!("bad return type in method descriptor {:?}", descriptor),
            )
        })?
    };

    Ok(format!("{} {}({})", return_type, name, params.join(", ")))
}

/// Parses one field type off the front of `input`; `offset` positions errors
fn parse_field(input: &str, offset: usize) -> Result<(String, &str)> {
    let dimensions = input.bytes().take_while(|b| *b == b'[').count();
    let rest = &input[dimensions..];
    let at = offset + dimensions;

    let (base, rest) = match rest.as_bytes().first() {
        Some(b'B') => ("byte".to_string(), &rest[1..]),
        Some(b'C') => ("char".to_string(), &rest[1..]),
        Some(b'D') => ("double".to_string(), &rest[1..]),
        Some(b'F') => ("float".to_string(), &rest[1..]),
        Some(b'I') => ("int".to_string(), &rest[1..]),
        Some(b'J') => ("long".to_string(), &rest[1..]),
        Some(b'S') => ("short".to_string(), &rest[1..]),
        Some(b'Z') => ("boolean".to_string(), &rest[1..]),
        Some(b'L') => {
            let end = rest
                .find(';')
                .ok_or_else(|| Error::decode(at, "unterminated class type"))?;
            let binary_name = rest[1..end].replace('/', ".");
            if binary_name.is_empty() {
                return Err(Error::decode(at, "empty class name"));
            }
            let simple = match binary_name.strip_prefix(JAVA_LANG) {
                Some(name) if !name.contains('.') => name.to_string(),
                _ => binary_name,
            };
            (simple, &rest[end + 1..])
        }
        Some(_) => {
            let ch = rest.chars().next().unwrap_or('?');
            return Err(Error::decode(at, format!("unexpected {:?} in descriptor", ch)));
        }
        None => return Err(Error::decode(at, "descriptor ends before a type")),
    };

    Ok((format!("{}{}", base, "[]".repeat(dimensions)), rest))
}
