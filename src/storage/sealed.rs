//! Sealed credential store.
//!
//! Records are serialized to JSON, sealed with XChaCha20-Poly1305 and appended
//! to `credentials.bin` as one base64 line each:
//!
//! ```text
//! base64( nonce (24 bytes) | ciphertext + tag )
//! ```
//!
//! The 32-byte key lives next to it in `credentials.key`. It is generated on
//! first open and reused afterwards.

use super::{CredentialRecord, SecureStore, StorageError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce,
};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use zeroize::Zeroizing;

pub const KEY_FILE: &str = "credentials.key";
pub const CREDENTIALS_FILE: &str = "credentials.bin";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;

pub struct SealedFileStore {
    cipher: XChaCha20Poly1305,
    path: PathBuf,
    lock: Mutex<()>,
}

impl SealedFileStore {
    /// Open the store in `dir`, generating a key on first use.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let key = load_or_create_key(&dir.join(KEY_FILE))?;
        let cipher = XChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|_| StorageError::KeyError("key must be 32 bytes".to_string()))?;

        Ok(Self {
            cipher,
            path: dir.join(CREDENTIALS_FILE),
            lock: Mutex::new(()),
        })
    }

    fn seal(&self, plaintext: &[u8]) -> Result<String, StorageError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| StorageError::SealError("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    fn unseal(&self, line: &str) -> Result<CredentialRecord, StorageError> {
        let data = STANDARD
            .decode(line.trim())
            .map_err(|e| StorageError::SealError(e.to_string()))?;
        if data.len() < NONCE_LEN {
            return Err(StorageError::SealError("sealed record too short".to_string()));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(XNonce::from_slice(nonce), ciphertext)
                .map_err(|_| StorageError::SealError("decryption failed".to_string()))?,
        );
        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Unseal every stored record. Lines that fail to unseal are skipped.
    pub fn read_all(&self) -> Result<Vec<CredentialRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let _guard = self.lock.lock();
        let file = std::fs::File::open(&self.path)?;
        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match self.unseal(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = index + 1, "skipping unreadable credential record: {e}"),
            }
        }
        Ok(records)
    }
}

impl SecureStore for SealedFileStore {
    fn append(&self, record: &CredentialRecord) -> Result<(), StorageError> {
        let plaintext = Zeroizing::new(serde_json::to_vec(record)?);
        let mut line = self.seal(&plaintext)?;
        line.push('\n');

        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

fn load_or_create_key(path: &Path) -> Result<Zeroizing<Vec<u8>>, StorageError> {
    if path.exists() {
        let key = Zeroizing::new(std::fs::read(path)?);
        if key.len() != KEY_LEN {
            return Err(StorageError::KeyError(format!(
                "{} holds {} bytes, expected {KEY_LEN}",
                path.display(),
                key.len()
            )));
        }
        return Ok(key);
    }

    let key = Zeroizing::new(XChaCha20Poly1305::generate_key(&mut OsRng).to_vec());
    let mut file = key_file_options().open(path)?;
    if let Err(e) = file.write_all(&key).and_then(|()| file.sync_all()) {
        drop(file);
        // A truncated key file would fail every later open.
        let _ = std::fs::remove_file(path);
        return Err(e.into());
    }
    Ok(key)
}

/// Options for creating the key file, owner-only from the start on unix.
fn key_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str) -> CredentialRecord {
        CredentialRecord::new(username.into(), "firefox".into(), "Sign in".into())
    }

    #[test]
    fn test_records_are_not_stored_in_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = SealedFileStore::open(dir.path()).unwrap();
        store.append(&record("alice")).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(CREDENTIALS_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 1);
        assert!(!raw.contains("alice"));
        assert!(!raw.contains("firefox"));
    }

    #[test]
    fn test_key_is_reused_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        SealedFileStore::open(dir.path())
            .unwrap()
            .append(&record("alice"))
            .unwrap();

        let reopened = SealedFileStore::open(dir.path()).unwrap();
        reopened.append(&record("bob")).unwrap();

        let usernames: Vec<String> = reopened
            .read_all()
            .unwrap()
            .into_iter()
            .map(|r| r.username)
            .collect();
        assert_eq!(usernames, vec!["alice", "bob"]);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = SealedFileStore::open(dir.path()).unwrap();
        store.append(&record("alice")).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(CREDENTIALS_FILE))
            .unwrap();
        writeln!(file, "not-base64!").unwrap();

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].password, "REDACTED");
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        SealedFileStore::open(dir.path()).unwrap();

        let metadata = std::fs::metadata(dir.path().join(KEY_FILE)).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        assert_eq!(metadata.len(), KEY_LEN as u64);
    }

    #[test]
    fn test_wrong_key_length_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(KEY_FILE), b"short").unwrap();
        assert!(matches!(
            SealedFileStore::open(dir.path()),
            Err(StorageError::KeyError(_))
        ));
    }
}
