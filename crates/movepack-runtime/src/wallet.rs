use crate::toolchain::Toolchain;
use crate::RuntimeError;
use serde::Serialize;
use tracing::info;

/// The only network with a faucet the wallet is funded from.
pub const DEVNET: &str = "devnet";

/// Position of the key in the `aptos init` arguments.
const PRIVATE_KEY_ARG: usize = 2;

/// Credentials and target network for on-chain deployment.
#[derive(Clone, PartialEq, Eq)]
pub struct Deployment {
    private_key: String,
    network: String,
}

impl Deployment {
    pub fn new(private_key: &str, network: &str) -> Result<Self, RuntimeError> {
        if private_key.trim().is_empty() {
            return Err(RuntimeError::MissingPrivateKey);
        }
        Ok(Self {
            private_key: private_key.to_owned(),
            network: network.to_owned(),
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("private_key", &"<redacted>")
            .field("network", &self.network)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletInitResult {
    pub success: bool,
    pub network: String,
    pub funded: bool,
}

/// Initialize the toolchain's default account, funding it on devnet.
pub fn initialize_wallet(
    toolchain: &Toolchain<'_>,
    deployment: &Deployment,
) -> Result<WalletInitResult, RuntimeError> {
    info!("initializing wallet on {}", deployment.network);
    toolchain.run_redacted(
        &[
            "init",
            "--private-key",
            &deployment.private_key,
            "--assume-yes",
            "--network",
            &deployment.network,
        ],
        &[PRIVATE_KEY_ARG],
    )?;

    let funded = deployment.network == DEVNET;
    if funded {
        info!("funding default account from the {DEVNET} faucet");
        toolchain.run(&["account", "fund-with-faucet", "--account", "default"])?;
    }

    Ok(WalletInitResult {
        success: true,
        network: deployment.network.clone(),
        funded,
    })
}
