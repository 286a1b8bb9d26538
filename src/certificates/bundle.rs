use std::fmt;

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use p12::{SafeBagKind, PFX};
use ring::digest;
use rustls::pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::{SecretBundle, SecretString, Thumbprint};
use crate::errors::CertificateError;

/// Key Vault exports certificate secrets without a container password.
const UNPROTECTED_PASSWORD: &str = "";

/// keyBag, 1.2.840.113549.1.12.10.1.1
const KEY_BAG_OID: &[u64] = &[1, 2, 840, 113_549, 1, 12, 10, 1, 1];

/// DER of the PBES2 OID, 1.2.840.113549.1.5.13
const PBES2_OID_TLV: &[u8] = &[0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x05, 0x0d];

/// DER of the aes256-CBC OID, 2.16.840.1.101.3.4.1.42
const AES_256_CBC_OID_TLV: &[u8] =
    &[0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x01, 0x2a];

/// Metadata extracted from the leaf certificate for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// A certificate collection re-exported as a password-protected PKCS#12 container.
pub struct CertificateBundle {
    /// DER-encoded PKCS#12 container protected with the companion password
    pub pfx: Vec<u8>,
    pub leaf: Vec<u8>,
    pub chain: Vec<Vec<u8>>,
    pub info: CertificateInfo,
}

impl CertificateBundle {
    /// SHA-1 thumbprint of the leaf certificate in this bundle.
    pub fn leaf_thumbprint(&self) -> Result<Thumbprint, CertificateError> {
        leaf_thumbprint(&self.leaf)
    }
}

impl fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("pfx_len", &self.pfx.len())
            .field("leaf_len", &self.leaf.len())
            .field("chain_len", &self.chain.len())
            .field("info", &self.info)
            .finish()
    }
}

/// Certificates and keys read out of a secret, before re-export.
struct KeyMaterial {
    certificates: Vec<Vec<u8>>,
    keys: Vec<Zeroizing<Vec<u8>>>,
}

/// SHA-1 thumbprint of a DER certificate.
pub fn leaf_thumbprint(der: &[u8]) -> Result<Thumbprint, CertificateError> {
    let digest = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, der);
    Thumbprint::from_digest(digest.as_ref())
}

/// Rebuild `secret` into a PKCS#12 container protected by `password`.
///
/// PKCS#12 secrets are base64 and unprotected; PEM secrets (content type
/// `application/x-pem-file`) hold the PEM text directly. The container is
/// named after the secret so the friendly name survives the import.
pub fn repackage(
    secret: &SecretBundle,
    password: &SecretString,
) -> Result<CertificateBundle, CertificateError> {
    let name = secret.name.as_str();

    let material = if secret.is_pem() {
        read_pem(name, secret.value.expose_secret().as_bytes())?
    } else {
        let raw = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(secret.value.expose_secret().trim())
                .map_err(|source| CertificateError::InvalidBase64 {
                    name: name.to_string(),
                    source,
                })?,
        );
        read_pkcs12(name, &raw)?
    };

    let KeyMaterial { certificates, mut keys } = material;

    let key = match keys.len() {
        0 => return Err(CertificateError::MissingPrivateKey { name: name.to_string() }),
        1 => keys.remove(0),
        count => {
            return Err(CertificateError::MultiplePrivateKeys { name: name.to_string(), count })
        }
    };

    let (leaf, chain) = split_leaf(name, certificates)?;
    let info = parse_certificate_metadata(name, &leaf)?;

    let chain_refs: Vec<&[u8]> = chain.iter().map(Vec::as_slice).collect();
    let pfx = PFX::new_with_cas(&leaf, &key, &chain_refs, password.expose_secret(), name)
        .ok_or_else(|| CertificateError::ExportFailed { name: name.to_string() })?
        .to_der();

    debug!(
        certificate = %name,
        subject = %info.subject,
        not_after = %info.not_after,
        chain_len = chain.len(),
        pfx_len = pfx.len(),
        "Repackaged certificate as PKCS#12"
    );

    Ok(CertificateBundle { pfx, leaf, chain, info })
}

fn read_pkcs12(name: &str, raw: &[u8]) -> Result<KeyMaterial, CertificateError> {
    let invalid = |reason: String| match unsupported_encryption(raw) {
        Some(algorithm) => {
            CertificateError::UnsupportedPkcs12Encryption { name: name.to_string(), algorithm }
        }
        None => CertificateError::InvalidPkcs12 { name: name.to_string(), reason },
    };

    let pfx = PFX::parse(raw).map_err(|e| invalid(format!("{:?}", e)))?;

    let certificates =
        pfx.cert_x509_bags(UNPROTECTED_PASSWORD).map_err(|e| invalid(format!("{:?}", e)))?;
    let mut keys: Vec<Zeroizing<Vec<u8>>> = pfx
        .key_bags(UNPROTECTED_PASSWORD)
        .map_err(|e| invalid(format!("{:?}", e)))?
        .into_iter()
        .map(Zeroizing::new)
        .collect();

    // Unencrypted exports store the PrivateKeyInfo in a plain KeyBag
    let bags = pfx.bags(UNPROTECTED_PASSWORD).map_err(|e| invalid(format!("{:?}", e)))?;
    keys.extend(bags.into_iter().filter_map(|safe_bag| match safe_bag.bag {
        SafeBagKind::OtherBagKind(other) if other.bag_id.components().as_slice() == KEY_BAG_OID => {
            Some(Zeroizing::new(other.bag_value))
        }
        _ => None,
    }));

    // Shrouded bags that fail to decrypt are skipped by key_bags
    if keys.is_empty() {
        if let Some(algorithm) = unsupported_encryption(raw) {
            return Err(CertificateError::UnsupportedPkcs12Encryption {
                name: name.to_string(),
                algorithm,
            });
        }
    }

    Ok(KeyMaterial { certificates, keys })
}

/// Names the encryption scheme of a container whose bags cannot be decrypted.
fn unsupported_encryption(raw: &[u8]) -> Option<&'static str> {
    if !contains(raw, PBES2_OID_TLV) {
        return None;
    }
    if contains(raw, AES_256_CBC_OID_TLV) {
        Some("PBES2 with AES-256-CBC")
    } else {
        Some("PBES2")
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn read_pem(name: &str, raw: &[u8]) -> Result<KeyMaterial, CertificateError> {
    let certificates = CertificateDer::pem_slice_iter(raw)
        .map(|result| {
            result.map(|cert| cert.as_ref().to_vec()).map_err(|err| {
                CertificateError::InvalidPem { name: name.to_string(), reason: format!("{:?}", err) }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let key = match PrivateKeyDer::from_pem_slice(raw) {
        Ok(key) => key,
        Err(rustls::pki_types::pem::Error::NoItemsFound) => {
            return Err(CertificateError::MissingPrivateKey { name: name.to_string() })
        }
        Err(err) => {
            return Err(CertificateError::InvalidPem {
                name: name.to_string(),
                reason: format!("{:?}", err),
            })
        }
    };

    let key = match key {
        PrivateKeyDer::Pkcs8(key) => Zeroizing::new(key.secret_pkcs8_der().to_vec()),
        PrivateKeyDer::Pkcs1(_) => {
            return Err(CertificateError::UnsupportedKeyEncoding {
                name: name.to_string(),
                encoding: "PKCS#1",
            })
        }
        PrivateKeyDer::Sec1(_) => {
            return Err(CertificateError::UnsupportedKeyEncoding {
                name: name.to_string(),
                encoding: "SEC1",
            })
        }
        _ => {
            return Err(CertificateError::UnsupportedKeyEncoding {
                name: name.to_string(),
                encoding: "unknown",
            })
        }
    };

    Ok(KeyMaterial { certificates, keys: vec![key] })
}

/// The leaf is the first certificate that is not a CA; containers written by
/// other tools do not always put it first.
fn split_leaf(
    name: &str,
    mut certificates: Vec<Vec<u8>>,
) -> Result<(Vec<u8>, Vec<Vec<u8>>), CertificateError> {
    if certificates.is_empty() {
        return Err(CertificateError::EmptyCertificateChain { name: name.to_string() });
    }

    let index = certificates
        .iter()
        .position(|der| {
            x509_parser::parse_x509_certificate(der).map(|(_, cert)| !cert.is_ca()).unwrap_or(false)
        })
        .unwrap_or(0);

    let leaf = certificates.remove(index);
    Ok((leaf, certificates))
}

fn parse_certificate_metadata(name: &str, der: &[u8]) -> Result<CertificateInfo, CertificateError> {
    let metadata_error =
        |reason: String| CertificateError::Metadata { name: name.to_string(), reason };

    let (_, cert) =
        x509_parser::parse_x509_certificate(der).map_err(|e| metadata_error(e.to_string()))?;

    let validity = cert.validity();
    let not_before = Utc
        .timestamp_opt(validity.not_before.timestamp(), 0)
        .single()
        .ok_or_else(|| metadata_error("notBefore is out of range".to_string()))?;
    let not_after = Utc
        .timestamp_opt(validity.not_after.timestamp(), 0)
        .single()
        .ok_or_else(|| metadata_error("notAfter is out of range".to_string()))?;

    Ok(CertificateInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_before,
        not_after,
    })
}
