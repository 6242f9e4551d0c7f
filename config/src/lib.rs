pub mod parser;
pub mod size;

use protocol::tls::TlsFiles;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_CLI_PORT: u16 = 4242;
const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_EVICTION_THRESHOLD: u32 = 1;

fn get<'a>(map: &'a HashMap<String, String>, key: &str) -> Result<&'a str, String> {
    map.get(key)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("missing required config key '{key}'"))
}

fn get_opt<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key).map(|s| s.as_str())
}

fn parse_port(map: &HashMap<String, String>, key: &str) -> Result<u16, String> {
    let raw = get(map, key)?;
    let port: u16 = raw
        .parse()
        .map_err(|_| format!("invalid port value '{raw}' for '{key}'"))?;
    if port == 0 {
        return Err(format!("'{key}' must not be 0"));
    }
    Ok(port)
}

fn parse_tls(map: &HashMap<String, String>) -> Result<TlsFiles, String> {
    let files = TlsFiles {
        cert: get_opt(map, "tls.cert").map(str::to_string),
        key: get_opt(map, "tls.key").map(str::to_string),
        ca: get_opt(map, "tls.ca").map(str::to_string),
    };
    if !files.is_empty() && !files.is_complete() {
        return Err("tls.cert, tls.key and tls.ca must be supplied together or not at all".to_string());
    }
    Ok(files)
}

/// Configuration recognized by a Scribe agent.
#[derive(Debug, Clone)]
pub struct ScribeConfig {
    pub port: u16,
    pub cli_port: u16,
    pub root_path: String,
    pub max_size: i64,
    pub mediator_addr: Option<SocketAddr>,
    pub tls: TlsFiles,
}

impl ScribeConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let map = parser::read_key_values(path)?;
        Self::from_map(&map)
    }

    fn from_map(map: &HashMap<String, String>) -> Result<Self, String> {
        let port = parse_port(map, "port")?;
        let cli_port = match get_opt(map, "cli_port") {
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("invalid cli_port value '{raw}'"))?,
            None => DEFAULT_CLI_PORT,
        };
        let root_path = get(map, "root_path")?.to_string();
        if root_path.is_empty() {
            return Err("root_path must not be empty".to_string());
        }
        let max_size = size::lexical_to_number(get(map, "max_size")?)?;

        let mediator_addr = match get_opt(map, "mediator_addr") {
            Some(raw) if !raw.is_empty() => Some(
                raw.parse::<SocketAddr>()
                    .map_err(|_| format!("invalid mediator_addr '{raw}'"))?,
            ),
            _ => None,
        };

        let tls = parse_tls(map)?;

        Ok(ScribeConfig {
            port,
            cli_port,
            root_path,
            max_size,
            mediator_addr,
            tls,
        })
    }
}

/// Configuration recognized by a Mediator.
#[derive(Debug, Clone)]
pub struct MediatorConfig {
    pub port: u16,
    pub cli_port: u16,
    pub tls: TlsFiles,
    pub probe_interval: Duration,
    pub eviction_threshold: u32,
}

impl MediatorConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let map = parser::read_key_values(path)?;
        Self::from_map(&map)
    }

    fn from_map(map: &HashMap<String, String>) -> Result<Self, String> {
        let port = parse_port(map, "port")?;
        let cli_port = match get_opt(map, "cli_port") {
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("invalid cli_port value '{raw}'"))?,
            None => DEFAULT_CLI_PORT,
        };
        let tls = parse_tls(map)?;

        let probe_interval = match get_opt(map, "probe_interval_ms") {
            Some(raw) => {
                let ms: u64 = raw
                    .parse()
                    .map_err(|_| format!("invalid probe_interval_ms '{raw}'"))?;
                if ms == 0 {
                    return Err("probe_interval_ms must be greater than 0".to_string());
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_PROBE_INTERVAL,
        };

        let eviction_threshold = match get_opt(map, "eviction_threshold") {
            Some(raw) => {
                let n: u32 = raw
                    .parse()
                    .map_err(|_| format!("invalid eviction_threshold '{raw}'"))?;
                if n == 0 {
                    return Err("eviction_threshold must be at least 1".to_string());
                }
                n
            }
            None => DEFAULT_EVICTION_THRESHOLD,
        };

        Ok(MediatorConfig {
            port,
            cli_port,
            tls,
            probe_interval,
            eviction_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{remove_file, write};

    fn temp_path(name: &str) -> String {
        format!("{}/{name}", std::env::temp_dir().display())
    }

    fn write_config(path: &str, contents: &str) {
        write(path, contents).unwrap();
    }

    #[test]
    fn parses_minimal_scribe_config() {
        let path = temp_path("scribe_cfg_test1.conf");
        write_config(&path, "port=9001\nroot_path=/tmp/s\nmax_size=-1\n");
        let cfg = ScribeConfig::from_file(&path).unwrap();
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.cli_port, DEFAULT_CLI_PORT);
        assert_eq!(cfg.root_path, "/tmp/s");
        assert_eq!(cfg.max_size, -1);
        assert!(cfg.mediator_addr.is_none());
        remove_file(&path).unwrap();
    }

    #[test]
    fn parses_scribe_config_with_mediator_and_size() {
        let path = temp_path("scribe_cfg_test2.conf");
        write_config(
            &path,
            "port=9001\ncli_port=4242\nroot_path=/tmp/s\nmax_size=100KB\nmediator_addr=127.0.0.1:8000\n",
        );
        let cfg = ScribeConfig::from_file(&path).unwrap();
        assert_eq!(cfg.max_size, 100_000);
        assert_eq!(cfg.mediator_addr.unwrap().to_string(), "127.0.0.1:8000");
        remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_partial_tls_set() {
        let path = temp_path("scribe_cfg_test3.conf");
        write_config(
            &path,
            "port=9001\nroot_path=/tmp/s\nmax_size=-1\ntls.cert=/a/cert.pem\n",
        );
        let err = ScribeConfig::from_file(&path).unwrap_err();
        assert!(err.contains("together"));
        remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_port_zero() {
        let path = temp_path("scribe_cfg_test4.conf");
        write_config(&path, "port=0\nroot_path=/tmp/s\nmax_size=-1\n");
        assert!(ScribeConfig::from_file(&path).is_err());
        remove_file(&path).unwrap();
    }

    #[test]
    fn mediator_config_defaults_probe_interval() {
        let path = temp_path("mediator_cfg_test1.conf");
        write_config(&path, "port=8000\n");
        let cfg = MediatorConfig::from_file(&path).unwrap();
        assert_eq!(cfg.probe_interval, DEFAULT_PROBE_INTERVAL);
        assert_eq!(cfg.eviction_threshold, 1);
        remove_file(&path).unwrap();
    }

    #[test]
    fn mediator_config_honors_overrides() {
        let path = temp_path("mediator_cfg_test2.conf");
        write_config(&path, "port=8000\nprobe_interval_ms=2000\neviction_threshold=3\n");
        let cfg = MediatorConfig::from_file(&path).unwrap();
        assert_eq!(cfg.probe_interval, Duration::from_millis(2000));
        assert_eq!(cfg.eviction_threshold, 3);
        remove_file(&path).unwrap();
    }
}
