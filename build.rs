use std::{collections::HashMap, env, fs, path::Path, path::PathBuf};

const WIFI_KEYS: [&str; 2] = ["STATION_WIFI_SSID", "STATION_WIFI_PASSWORD"];

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    println!("cargo:rerun-if-changed=src/");

    let mut file_cfg = HashMap::new();
    if let Some(manifest_dir) = env::var_os("CARGO_MANIFEST_DIR").map(PathBuf::from) {
        let env_path = manifest_dir.join(".env");
        if env_path.exists() {
            println!("cargo:rerun-if-changed={}", env_path.display());
            file_cfg = load_env_file(&env_path);
        }
    }

    for key in WIFI_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
        match get_wifi_cfg(key, &file_cfg) {
            Some(value) => println!("cargo:rustc-env={key}={value}"),
            None => {
                eprintln!("error: Wi-Fi config missing. Set {key} in .env or environment.");
                std::process::exit(1);
            }
        }
    }
}

fn load_env_file(path: &Path) -> HashMap<String, String> {
    let mut map = HashMap::new();

    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return map,
    };

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            if !key.is_empty() && !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }

    map
}

fn get_wifi_cfg(key: &str, file_cfg: &HashMap<String, String>) -> Option<String> {
    if let Ok(v) = env::var(key) {
        let v = v.trim();
        if !v.is_empty() {
            return Some(v.to_string());
        }
    }

    file_cfg
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
