//! Fns to read variables from the environment more conveniently, and the config the stats job
//! runs with.

use std::env;

use lazy_static::lazy_static;
use tracing::debug;

// RPC provider URLs often embed an API key in the path.
const SECRET_LOG_BLACKLIST: [&str; 1] = ["RPC_URL"];

const DEFAULT_RPC_URL: &str = "https://rpc.ankr.com/eth";
const DEFAULT_ABI_DIR: &str = "abis";
const DEFAULT_OUTPUT_DIR: &str = ".";
const DEFAULT_BURN_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

lazy_static! {
    pub static ref ENV_CONFIG: EnvConfig = get_env_config();
}

fn obfuscate_if_secret(blacklist: &[&str], key: &str, value: &str) -> String {
    if blacklist.contains(&key) {
        let mut last_four = value.to_string();
        last_four.drain(0..value.len().saturating_sub(4));
        format!("****{last_four}")
    } else {
        value.to_string()
    }
}

/// Get an environment variable, encoding found or missing as Option, and panic otherwise.
pub fn get_env_var(key: &str) -> Option<String> {
    let var = match env::var(key) {
        Err(env::VarError::NotPresent) => None,
        Err(e) => panic!("{e}"),
        Ok(var) => Some(var),
    };

    if let Some(ref existing_var) = var {
        let output = obfuscate_if_secret(&SECRET_LOG_BLACKLIST, key, existing_var);
        debug!("env var {key}: {output}");
    } else {
        debug!("env var {key} requested but not found")
    };

    var
}

pub fn get_env_bool(key: &str) -> Option<bool> {
    get_env_var(key).map(|var| match var.to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        "t" => true,
        "f" => false,
        "1" => true,
        "0" => false,
        str => panic!("invalid bool value {str} for {key}"),
    })
}

pub struct EnvConfig {
    pub abi_dir: String,
    /// Holder whose token balance counts as burned.
    pub burn_address: String,
    pub log_json: bool,
    pub log_perf: bool,
    pub output_dir: String,
    pub rpc_url: String,
}

pub fn get_env_config() -> EnvConfig {
    EnvConfig {
        abi_dir: get_env_var("ABI_DIR").unwrap_or_else(|| DEFAULT_ABI_DIR.to_string()),
        burn_address: get_env_var("BURN_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BURN_ADDRESS.to_string()),
        log_json: get_env_bool("LOG_JSON").unwrap_or(false),
        log_perf: get_env_bool("LOG_PERF").unwrap_or(false),
        output_dir: get_env_var("OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        rpc_url: get_env_var("RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
    }
}
