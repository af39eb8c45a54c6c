//! RSA key management for the optional asymmetric key wrap.
//!
//! The symmetric passphrase can be wrapped with RSA-OAEP and stored in the
//! container header, so a recipient holding the private key can decrypt
//! without ever learning the passphrase out of band.
//!
//! This module handles the key *material*: generating pairs, telling the
//! two PEM kinds apart, loading them from disk, and wrapping/unwrapping
//! the passphrase. The block cipher itself never sees an RSA key.
//!
//! ## Key file format
//!
//! Standard PEM. Generated pairs are written as `<name>_private.pem`
//! (PKCS#1, `BEGIN RSA PRIVATE KEY`) and `<name>_public.pem` (SPKI,
//! `BEGIN PUBLIC KEY`); loading additionally accepts PKCS#8 private keys
//! and PKCS#1 public keys.
//!
//! OAEP runs with SHA-1 for both the label digest and MGF1. Those are the
//! defaults of the baseline implementation this container format comes
//! from; changing them orphans every wrapped key in existing files.

use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use crate::{Error, Result};

/// RSA modulus size, in bits, for generated key pairs.
pub const RSA_KEY_SIZE: usize = 2048;

/// The two kinds of PEM key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Private,
    Public,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Private => write!(f, "private"),
            KeyKind::Public => write!(f, "public"),
        }
    }
}

/// Generate an RSA-2048 pair and write both PEM files into `dir`.
///
/// Files are named `<name>_private.pem` and `<name>_public.pem`; existing
/// files are overwritten (guarding against that is the caller's job).
/// Returns the two paths, private first.
pub fn generate_rsa_keypair(name: &str, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, RSA_KEY_SIZE).map_err(|e| Error::Rsa(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    let private_pem = private
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| Error::Rsa(e.to_string()))?;
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::Rsa(e.to_string()))?;

    let private_path = dir.join(format!("{name}_private.pem"));
    let public_path = dir.join(format!("{name}_public.pem"));
    fs::write(&private_path, private_pem.as_bytes())?;
    fs::write(&public_path, public_pem.as_bytes())?;
    log::debug!("generated RSA-{RSA_KEY_SIZE} pair '{name}' in {}", dir.display());
    Ok((private_path, public_path))
}

/// Classify a PEM file by its first line.
///
/// Returns `None` when the first line names neither key kind; I/O
/// failures propagate.
pub fn detect_rsa_key(path: &Path) -> Result<Option<KeyKind>> {
    let mut first_line = String::new();
    BufReader::new(fs::File::open(path)?).read_line(&mut first_line)?;
    if first_line.contains("PRIVATE KEY") {
        Ok(Some(KeyKind::Private))
    } else if first_line.contains("PUBLIC KEY") {
        Ok(Some(KeyKind::Public))
    } else {
        Ok(None)
    }
}

/// Load a public key, accepting SPKI or PKCS#1 PEM.
///
/// A private key file fails with [`Error::WrongKeyType`] rather than being
/// silently reduced to its public half.
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey> {
    match detect_rsa_key(path)? {
        Some(KeyKind::Public) => {}
        Some(KeyKind::Private) => {
            return Err(Error::WrongKeyType {
                expected: KeyKind::Public,
            });
        }
        None => return Err(Error::Rsa("not a PEM key file".into())),
    }
    let pem = fs::read_to_string(path)?;
    match RsaPublicKey::from_public_key_pem(&pem) {
        Ok(key) => Ok(key),
        Err(_) => RsaPublicKey::from_pkcs1_pem(&pem).map_err(|e| Error::Rsa(e.to_string())),
    }
}

/// Load a private key, accepting PKCS#1 or PKCS#8 PEM.
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey> {
    match detect_rsa_key(path)? {
        Some(KeyKind::Private) => {}
        Some(KeyKind::Public) => {
            return Err(Error::WrongKeyType {
                expected: KeyKind::Private,
            });
        }
        None => return Err(Error::Rsa("not a PEM key file".into())),
    }
    let pem = fs::read_to_string(path)?;
    match RsaPrivateKey::from_pkcs1_pem(&pem) {
        Ok(key) => Ok(key),
        Err(_) => RsaPrivateKey::from_pkcs8_pem(&pem).map_err(|e| Error::Rsa(e.to_string())),
    }
}

/// Wrap the passphrase with RSA-OAEP under the recipient's public key.
pub fn rsa_encrypt_key(passphrase: &[u8], public_key: &RsaPublicKey) -> Result<Vec<u8>> {
    let mut rng = rand::thread_rng();
    public_key
        .encrypt(&mut rng, Oaep::new::<Sha1>(), passphrase)
        .map_err(|e| Error::Rsa(e.to_string()))
}

/// Unwrap a passphrase from the container header.
///
/// Every RSA-level failure collapses to the same [`Error::InvalidKey`]:
/// OAEP gives no way (and no reason) to distinguish a wrong key from a
/// mangled ciphertext.
pub fn rsa_decrypt_key(wrapped: &[u8], private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
    private_key
        .decrypt(Oaep::new::<Sha1>(), wrapped)
        .map_err(|_| Error::InvalidKey("Incorrect RSA key provided"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::thread_rng(), RSA_KEY_SIZE).unwrap()
    }

    #[test]
    fn generate_detect_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (private_path, public_path) = generate_rsa_keypair("unit", dir.path()).unwrap();
        assert!(private_path.ends_with("unit_private.pem"));
        assert!(public_path.ends_with("unit_public.pem"));

        assert_eq!(
            detect_rsa_key(&private_path).unwrap(),
            Some(KeyKind::Private)
        );
        assert_eq!(detect_rsa_key(&public_path).unwrap(), Some(KeyKind::Public));

        let private = load_private_key(&private_path).unwrap();
        let public = load_public_key(&public_path).unwrap();
        assert_eq!(RsaPublicKey::from(&private), public);
    }

    #[test]
    fn detect_rejects_non_key_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "just some text\n").unwrap();
        assert_eq!(detect_rsa_key(&path).unwrap(), None);
        assert!(matches!(load_public_key(&path), Err(Error::Rsa(_))));
    }

    #[test]
    fn loaders_enforce_key_kind() {
        let dir = tempfile::tempdir().unwrap();
        let (private_path, public_path) = generate_rsa_keypair("kind", dir.path()).unwrap();
        assert!(matches!(
            load_public_key(&private_path),
            Err(Error::WrongKeyType {
                expected: KeyKind::Public
            })
        ));
        assert!(matches!(
            load_private_key(&public_path),
            Err(Error::WrongKeyType {
                expected: KeyKind::Private
            })
        ));
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let private = keypair();
        let public = RsaPublicKey::from(&private);
        let wrapped = rsa_encrypt_key(b"hunter22!", &public).unwrap();
        assert_eq!(wrapped.len(), RSA_KEY_SIZE / 8);
        assert_eq!(rsa_decrypt_key(&wrapped, &private).unwrap(), b"hunter22!");
    }

    #[test]
    fn unwrap_with_wrong_key_is_invalid_key() {
        let public = RsaPublicKey::from(&keypair());
        let other = keypair();
        let wrapped = rsa_encrypt_key(b"hunter22!", &public).unwrap();
        assert!(matches!(
            rsa_decrypt_key(&wrapped, &other),
            Err(Error::InvalidKey("Incorrect RSA key provided"))
        ));
    }
}
