use regex::Regex;
use std::fs;
use std::path::Path;

fn config_candidates() -> Vec<String> {
    let mut files: Vec<String> = ["config.toml", "config.example.toml", ".env.example"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if let Ok(entries) = fs::read_dir(".") {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str()
                && name.starts_with("config.")
                && name.ends_with(".toml")
                && !files.iter().any(|f| f == name)
            {
                files.push(name.to_string());
            }
        }
    }
    files
}

/// Fail CI if config files contain keypair bytes, base58 secret keys or routing credentials.
#[test]
fn no_committed_secrets_in_configs() {
    let keypair_bytes = Regex::new(r"\[\s*(\d{1,3}\s*,\s*){63}\d{1,3}\s*\]").unwrap();
    let base58_secret = Regex::new(r"\b[1-9A-HJ-NP-Za-km-z]{86,88}\b").unwrap();
    let api_key = Regex::new(r#"(?i)jupiter_api_key\s*[=:]\s*"?[A-Za-z0-9-]{16,}"#).unwrap();
    for file in config_candidates() {
        if !Path::new(&file).exists() {
            continue;
        }
        let body = fs::read_to_string(&file).expect("read config");
        for (idx, line) in body.lines().enumerate() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            if keypair_bytes.is_match(line) || base58_secret.is_match(line) {
                panic!("Secret-looking key material in {} at line {}", file, idx + 1);
            }
            if api_key.is_match(line) {
                panic!("Routing API key committed in {} at line {}", file, idx + 1);
            }
        }
    }
}

#[test]
fn guard_patterns_catch_keypair_arrays() {
    let keypair_bytes = Regex::new(r"\[\s*(\d{1,3}\s*,\s*){63}\d{1,3}\s*\]").unwrap();
    let bytes = vec!["7"; 64].join(",");
    assert!(keypair_bytes.is_match(&format!("[{bytes}]")));
    assert!(!keypair_bytes.is_match("[50, 100, 300]"));
}
