use serde_json::Value;
use std::io::{self, Read};

/// Read a piped JSON (or YAML) document from stdin.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse(&buffer)
}

fn parse(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        // Not JSON: YAML is a superset, so give it a go
        Err(json_err) => serde_yaml::from_str(trimmed)
            .map(Some)
            .map_err(|_| json_err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_and_yaml() {
        let json = parse(r#"{"base_price": 1000000}"#).unwrap().unwrap();
        assert_eq!(json["base_price"], 1000000);

        let yaml = parse("base_price: 1000000\nbooking_month: 3\n").unwrap().unwrap();
        assert_eq!(yaml["booking_month"], 3);
    }

    #[test]
    fn test_blank_input_is_none() {
        assert!(parse("   \n").unwrap().is_none());
    }
}
