use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::info;

use crate::error::{RelayError, RelayResult};

/// Either a single solana-keygen keypair or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum KeystoreFile {
    Single(Vec<u8>),
    Many(Vec<Vec<u8>>),
}

/// Signing keys available to the relay, indexed by public key
pub struct Keystore {
    keys: HashMap<Pubkey, Arc<Keypair>>,
}

impl Keystore {
    pub fn load(path: &Path) -> RelayResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Keystore(format!("cannot read {}: {}", path.display(), e)))?;
        let keystore = Self::from_json(&raw)?;
        info!(path = %path.display(), keys = keystore.len(), "keystore loaded");
        Ok(keystore)
    }

    pub fn from_json(raw: &str) -> RelayResult<Self> {
        let entries = match serde_json::from_str::<KeystoreFile>(raw)? {
            KeystoreFile::Single(bytes) => vec![bytes],
            KeystoreFile::Many(entries) => entries,
        };

        let mut keys = HashMap::with_capacity(entries.len());
        for (i, bytes) in entries.iter().enumerate() {
            let keypair = Keypair::try_from(bytes.as_slice())
                .map_err(|e| RelayError::Keystore(format!("entry {} is not a valid keypair: {}", i, e)))?;
            keys.insert(keypair.pubkey(), Arc::new(keypair));
        }
        Ok(Self { keys })
    }

    pub fn get(&self, pubkey: &Pubkey) -> Option<Arc<Keypair>> {
        self.keys.get(pubkey).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

}

impl std::fmt::Debug for Keystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystore")
            .field("pubkeys", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}
