//! Loads contract ABIs from disk and knows how to unwrap ABIs that were saved straight from an
//! explorer's RPC style response, i.e. `{"result": "<abi as a json string>"}`.
use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_json_abi::{Function, JsonAbi};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::contracts::Contract;

const ENVELOPE_KEY: &str = "result";

#[derive(Debug, Error)]
pub enum AbiError {
    #[error("failed to read abi file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse abi json in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("function {function} not found in abi of {contract}")]
    FunctionNotInAbi {
        contract: &'static str,
        function: String,
    },
}

fn read_json(path: &Path) -> Result<Value, AbiError> {
    let text = fs::read_to_string(path).map_err(|source| AbiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AbiError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the inner ABI json if `value` is an RPC envelope.
fn unwrap_envelope(value: &Value) -> Option<Result<Value, serde_json::Error>> {
    match value.get(ENVELOPE_KEY) {
        Some(Value::String(raw_abi)) => Some(serde_json::from_str(raw_abi)),
        // Some explorers hand back the ABI already decoded.
        Some(inner @ Value::Array(_)) => Some(Ok(inner.clone())),
        _ => None,
    }
}

pub fn load_abi(path: &Path) -> Result<JsonAbi, AbiError> {
    let value = read_json(path)?;
    let to_json_error = |source| AbiError::Json {
        path: path.to_path_buf(),
        source,
    };

    let abi_value = match unwrap_envelope(&value) {
        Some(inner) => {
            debug!(path = %path.display(), "abi file is wrapped in an rpc envelope, unwrapping");
            inner.map_err(to_json_error)?
        }
        None => value,
    };

    serde_json::from_value(abi_value).map_err(to_json_error)
}

/// The ABIs for every contract the stats job reads from.
#[derive(Debug)]
pub struct ContractAbis {
    q_contract: JsonAbi,
    q_erc20: JsonAbi,
}

impl ContractAbis {
    pub fn new(q_contract: JsonAbi, q_erc20: JsonAbi) -> Self {
        Self {
            q_contract,
            q_erc20,
        }
    }

    pub fn load(abi_dir: impl AsRef<Path>) -> Result<Self, AbiError> {
        let abi_dir = abi_dir.as_ref();
        let q_contract = load_abi(&abi_dir.join(Contract::QContract.abi_file_name()))?;
        let q_erc20 = load_abi(&abi_dir.join(Contract::QErc20.abi_file_name()))?;
        Ok(Self::new(q_contract, q_erc20))
    }

    fn abi(&self, contract: Contract) -> &JsonAbi {
        match contract {
            Contract::QContract => &self.q_contract,
            Contract::QErc20 => &self.q_erc20,
        }
    }

    /// Looks up `function` in the contract's ABI. Overloads are not used by the Q contracts, the
    /// first definition wins.
    pub fn function(&self, contract: Contract, function: &str) -> Result<&Function, AbiError> {
        self.abi(contract)
            .function(function)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| AbiError::FunctionNotInAbi {
                contract: contract.name(),
                function: function.to_string(),
            })
    }
}

#[derive(Debug, PartialEq)]
pub enum ReformatOutcome {
    Reformatted,
    AlreadyFormatted,
    ParseFailed(String),
}

fn to_pretty_json(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut bytes, formatter);
    value.serialize(&mut serializer)?;
    Ok(bytes)
}

/// Rewrites an ABI file saved inside an RPC envelope as the plain ABI, pretty printed with four
/// space indentation. Files without an envelope are left untouched.
pub fn reformat_abi_file(path: &Path) -> Result<ReformatOutcome, AbiError> {
    let value = match read_json(path) {
        Ok(value) => value,
        Err(AbiError::Json { source, .. }) => {
            return Ok(ReformatOutcome::ParseFailed(source.to_string()))
        }
        Err(err) => return Err(err),
    };

    let raw_abi = match value.get(ENVELOPE_KEY) {
        Some(Value::String(raw_abi)) => raw_abi,
        _ => return Ok(ReformatOutcome::AlreadyFormatted),
    };

    let formatted_abi = match serde_json::from_str::<Value>(raw_abi) {
        Ok(formatted_abi) => formatted_abi,
        Err(err) => return Ok(ReformatOutcome::ParseFailed(err.to_string())),
    };

    let bytes = to_pretty_json(&formatted_abi).map_err(|source| AbiError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| AbiError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(ReformatOutcome::Reformatted)
}

/// Applies [`reformat_abi_file`] to every `.json` file in `dir`, in file name order.
pub fn reformat_abi_dir(dir: &Path) -> Result<Vec<(String, ReformatOutcome)>, AbiError> {
    let to_io_error = |source| AbiError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = fs::read_dir(dir)
        .map_err(to_io_error)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_io_error)?;
    paths.retain(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"));
    paths.sort();

    let mut outcomes = Vec::with_capacity(paths.len());
    for path in paths {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let outcome = reformat_abi_file(&path)?;
        match &outcome {
            ReformatOutcome::Reformatted => info!(%file_name, "reformatted abi"),
            ReformatOutcome::AlreadyFormatted => info!(
                %file_name,
                "file is already in correct format or does not contain the expected structure"
            ),
            ReformatOutcome::ParseFailed(error) => {
                warn!(%file_name, %error, "failed to parse json from file")
            }
        }
        outcomes.push((file_name, outcome));
    }

    Ok(outcomes)
}
