use ethers::types::Bytes;
use passafe_types::{PassafeError, PassafeResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum Bytecode {
    Hex(String),
    Object { object: String },
}

#[derive(Deserialize)]
struct ArtifactFile {
    bytecode: Bytecode,
}

/// Creation bytecode of the passkey module, read from a compiler artifact.
/// Both Hardhat (`"bytecode": "0x.."`) and Foundry
/// (`"bytecode": {"object": "0x.."}`) layouts are accepted.
#[derive(Clone, Debug)]
pub struct ModuleArtifact {
    pub bytecode: Bytes,
}

impl ModuleArtifact {
    pub fn load(path: impl AsRef<Path>) -> PassafeResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PassafeError::Config(format!("Failed to read module artifact: {}", e)))?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> PassafeResult<Self> {
        let file: ArtifactFile = serde_json::from_str(json)
            .map_err(|e| PassafeError::Config(format!("Failed to parse module artifact: {}", e)))?;
        let hex_code = match file.bytecode {
            Bytecode::Hex(code) => code,
            Bytecode::Object { object } => object,
        };
        let code = hex::decode(hex_code.trim_start_matches("0x"))
            .map_err(|e| PassafeError::Config(format!("Invalid module bytecode: {}", e)))?;
        if code.is_empty() {
            return Err(PassafeError::Config("Module artifact has no bytecode".into()));
        }
        Ok(Self {
            bytecode: Bytes::from(code),
        })
    }
}
