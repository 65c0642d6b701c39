//! Compiled contract artifacts in the Hardhat output layout.
//!
//! ```text
//! artifacts/
//!   build-info/<id>.json              solc version + standard JSON input
//!   contracts/<Source>.sol/<Name>.json      abi + creation bytecode
//!   contracts/<Source>.sol/<Name>.dbg.json  pointer to the build-info file
//! ```

use std::path::{Path, PathBuf};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::ConstructorArg;

const BUILD_INFO_DIR: &str = "build-info";

/// A compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    /// Path of the source file relative to the project root.
    pub source_name: String,
    pub abi: JsonAbi,
    /// Creation bytecode.
    pub bytecode: Bytes,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

/// Compiler metadata a verification service needs to rebuild the contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    /// Standard JSON compiler input.
    pub input: serde_json::Value,
}

impl BuildInfo {
    /// Compiler version in the `v0.8.17+commit.8df45f5f` form explorers expect.
    pub fn compiler_version(&self) -> String {
        format!("v{}", self.solc_long_version)
    }
}

impl ContractArtifact {
    /// Fully qualified name, e.g. `contracts/CryptoHands.sol:CryptoHands`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// ABI-encode constructor arguments (no selector).
    pub fn encode_constructor_args(&self, args: &[ConstructorArg]) -> Result<Vec<u8>> {
        match &self.abi.constructor {
            Some(constructor) => {
                let values = coerce_args(&constructor.inputs, args)
                    .with_context(|| format!("Invalid {} constructor arguments", self.contract_name))?;
                constructor
                    .abi_encode_input(&values)
                    .with_context(|| format!("Failed to encode {} constructor", self.contract_name))
            }
            None if args.is_empty() => Ok(Vec::new()),
            None => anyhow::bail!(
                "{} has no constructor but {} arguments were given",
                self.contract_name,
                args.len()
            ),
        }
    }

    /// Creation transaction input: bytecode followed by encoded constructor arguments.
    pub fn deployment_data(&self, args: &[ConstructorArg]) -> Result<Bytes> {
        if self.bytecode.is_empty() {
            anyhow::bail!(
                "{} has no creation bytecode (abstract contract or interface?)",
                self.contract_name
            );
        }

        let mut data = self.bytecode.to_vec();
        data.extend(self.encode_constructor_args(args)?);
        Ok(data.into())
    }

    /// Calldata for `function(args)`, selecting the overload whose arity matches.
    pub fn encode_call(&self, function: &str, args: &[ConstructorArg]) -> Result<Bytes> {
        let overloads = self
            .abi
            .function(function)
            .with_context(|| format!("{} has no function named {}", self.contract_name, function))?;

        let function_abi = overloads
            .iter()
            .find(|f| f.inputs.len() == args.len())
            .with_context(|| {
                format!(
                    "{}.{} takes no overload with {} arguments",
                    self.contract_name,
                    function,
                    args.len()
                )
            })?;

        let values = coerce_args(&function_abi.inputs, args)?;
        let data = function_abi
            .abi_encode_input(&values)
            .with_context(|| format!("Failed to encode {}.{}", self.contract_name, function))?;
        Ok(data.into())
    }

    /// Load the build-info file referenced by the sibling `.dbg.json`.
    pub fn build_info(&self) -> Result<BuildInfo> {
        let dbg_path = self.path.with_extension("dbg.json");
        let dbg: DebugFile = read_json(&dbg_path)?;

        let parent = dbg_path
            .parent()
            .context("Artifact path must have a parent directory")?;
        read_json(&parent.join(dbg.build_info))
    }
}

fn coerce_args(params: &[Param], args: &[ConstructorArg]) -> Result<Vec<DynSolValue>> {
    if params.len() != args.len() {
        anyhow::bail!("expected {} arguments, got {}", params.len(), args.len());
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .with_context(|| format!("Unsupported ABI type {}", param.ty))?;
            coerce_arg(&ty, arg).with_context(|| {
                format!("Cannot use {:?} as {} ({})", arg.to_string(), param.ty, param.name)
            })
        })
        .collect()
}

/// Values already of the parameter's type are used as is. Anything else is
/// parsed from its text form, e.g. decimal wei amounts for `uint256`.
fn coerce_arg(ty: &DynSolType, arg: &ConstructorArg) -> Result<DynSolValue> {
    let value = match (ty, arg) {
        (DynSolType::String, ConstructorArg::String(value)) => DynSolValue::String(value.clone()),
        (DynSolType::Address, ConstructorArg::Address(value)) => DynSolValue::Address(*value),
        (DynSolType::Bool, ConstructorArg::Bool(value)) => DynSolValue::Bool(*value),
        (DynSolType::Uint(256), ConstructorArg::Uint(value)) => DynSolValue::Uint(*value, 256),
        (ty, arg) => ty.coerce_str(&arg.to_string())?,
    };
    Ok(value)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Looks up artifacts by contract name under an artifacts directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the artifact of `contract_name`.
    pub fn load(&self, contract_name: &str) -> Result<ContractArtifact> {
        let path = self.find(contract_name)?;
        let mut artifact: ContractArtifact = read_json(&path)?;
        artifact.path = path;
        tracing::debug!(
            contract = %contract_name,
            path = %artifact.path.display(),
            "Loaded contract artifact"
        );
        Ok(artifact)
    }

    fn find(&self, contract_name: &str) -> Result<PathBuf> {
        let file_name = format!("{contract_name}.json");
        let mut matches = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read artifacts directory {}", dir.display()))?;

            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    if path.file_name().is_some_and(|n| n != BUILD_INFO_DIR) {
                        pending.push(path);
                    }
                } else if path.file_name().is_some_and(|n| n == file_name.as_str())
                    && path
                        .parent()
                        .and_then(|p| p.extension())
                        .is_some_and(|ext| ext == "sol")
                {
                    matches.push(path);
                }
            }
        }

        match matches.len() {
            0 => anyhow::bail!(
                "No artifact for {} under {} - did you compile the contracts?",
                contract_name,
                self.root.display()
            ),
            1 => Ok(matches.remove(0)),
            _ => anyhow::bail!(
                "Ambiguous artifact name {}: found {} candidates",
                contract_name,
                matches.len()
            ),
        }
    }
}
