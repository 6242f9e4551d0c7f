//! Minimal `key=value` config file reader, one setting per line, `#`
//! starts a comment, blank lines are ignored.

use std::collections::HashMap;
use std::fs;

pub fn read_key_values(path: &str) -> Result<HashMap<String, String>, String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("cannot read config file '{path}': {e}"))?;

    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("malformed config line '{line}'"))?;
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{remove_file, write};

    fn temp_path(name: &str) -> String {
        format!("{}/{name}", std::env::temp_dir().display())
    }

    #[test]
    fn parses_simple_key_values() {
        let path = temp_path("scribe_config_parser_test1.conf");
        write(&path, "port=9001\n# a comment\n\nroot_path=/tmp/s\n").unwrap();
        let map = read_key_values(&path).unwrap();
        assert_eq!(map.get("port").unwrap(), "9001");
        assert_eq!(map.get("root_path").unwrap(), "/tmp/s");
        remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_malformed_line() {
        let path = temp_path("scribe_config_parser_test2.conf");
        write(&path, "not_a_key_value_line\n").unwrap();
        assert!(read_key_values(&path).is_err());
        remove_file(&path).unwrap();
    }
}
