//! Connection configuration: TLS verification, client certificate, proxy.
//!
//! # Design
//! The three switches are independent, so there are eight combinations.
//! Instead of one constructor per combination, `ConnectionFlags` indexes a
//! fixed table of `ConnectionProfile`s and `resolve` materializes whatever
//! the selected profile asks for. Resolution does no network I/O; reading
//! and parsing the certificate file is the only step besides proxy URL
//! parsing that can fail.
//!
//! The resolved `ConnectionConfig` is plain data with value equality. It is
//! turned into a `ureq::Agent` only when the executor needs one.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use ureq::tls::{parse_pem, Certificate, ClientCert, PemItem, PrivateKey, TlsConfig};
use ureq::{Agent, Proxy};

use crate::error::{RequestError, Result};
use crate::params::ParameterRecord;

/// Whether the server certificate is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Verify,
    Skip,
}

/// The three booleans the resolution table is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionFlags {
    pub skip_verify: bool,
    pub has_cert: bool,
    pub has_proxy: bool,
}

/// One row of the resolution table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub tls: TlsMode,
    pub client_cert: bool,
    pub proxy: bool,
    pub description: &'static str,
}

const fn profile(
    tls: TlsMode,
    client_cert: bool,
    proxy: bool,
    description: &'static str,
) -> ConnectionProfile {
    ConnectionProfile {
        tls,
        client_cert,
        proxy,
        description,
    }
}

// Indexed by `ConnectionFlags::index`: skip_verify, has_cert, has_proxy as bits 2..0.
const PROFILES: [ConnectionProfile; 8] = [
    profile(TlsMode::Verify, false, false, "verify TLS, no client cert, direct"),
    profile(TlsMode::Verify, false, true, "verify TLS, no client cert, via proxy"),
    profile(TlsMode::Verify, true, false, "verify TLS, client cert, direct"),
    profile(TlsMode::Verify, true, true, "verify TLS, client cert, via proxy"),
    profile(TlsMode::Skip, false, false, "skip TLS verification, no client cert, direct"),
    profile(TlsMode::Skip, false, true, "skip TLS verification, no client cert, via proxy"),
    profile(TlsMode::Skip, true, false, "skip TLS verification, client cert, direct"),
    profile(TlsMode::Skip, true, true, "skip TLS verification, client cert, via proxy"),
];

impl ConnectionFlags {
    pub fn from_params(params: &ParameterRecord) -> Self {
        Self {
            skip_verify: params.ignore_ssl,
            has_cert: !params.client_cert_path().is_empty(),
            has_proxy: !params.proxy.is_empty(),
        }
    }

    fn index(self) -> usize {
        (usize::from(self.skip_verify) << 2)
            | (usize::from(self.has_cert) << 1)
            | usize::from(self.has_proxy)
    }

    pub fn profile(self) -> &'static ConnectionProfile {
        &PROFILES[self.index()]
    }
}

/// Client certificate chain and private key read from one PEM file.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    path: PathBuf,
    pem: Vec<u8>,
    chain_len: usize,
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("path", &self.path)
            .field("chain_len", &self.chain_len)
            .finish_non_exhaustive()
    }
}

impl ClientIdentity {
    /// Read `path` and check it holds at least one certificate and one key.
    pub fn load(path: &Path) -> Result<Self> {
        let cert_error = |why: String| {
            RequestError::CertificateError(format!(
                "failed to load client certificate {}: {why}",
                path.display()
            ))
        };
        let pem = fs::read(path).map_err(|e| cert_error(e.to_string()))?;
        let (chain, _) = split_pem(&pem).map_err(cert_error)?;
        Ok(Self {
            path: path.to_path_buf(),
            chain_len: chain.len(),
            pem,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chain_len(&self) -> usize {
        self.chain_len
    }

    fn client_cert(&self) -> Result<ClientCert> {
        let (chain, key) = split_pem(&self.pem).map_err(RequestError::CertificateError)?;
        Ok(ClientCert::new_with_certs(&chain, key))
    }
}

fn split_pem(
    pem: &[u8],
) -> std::result::Result<(Vec<Certificate<'static>>, PrivateKey<'static>), String> {
    let mut chain = Vec::new();
    let mut key = None;
    for item in parse_pem(pem) {
        match item.map_err(|e| e.to_string())? {
            PemItem::Certificate(cert) => chain.push(cert),
            PemItem::PrivateKey(k) if key.is_none() => key = Some(k),
            PemItem::PrivateKey(_) => return Err("more than one private key".to_string()),
            _ => {}
        }
    }
    if chain.is_empty() {
        return Err("no certificate found".to_string());
    }
    let key = key.ok_or_else(|| "no private key found".to_string())?;
    Ok((chain, key))
}

/// A proxy URL that parsed and names a supported scheme and a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrl(String);

const PROXY_SCHEMES: &[&str] = &["http", "https", "socks4", "socks4a", "socks5"];

impl ProxyUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |why: String| RequestError::ConfigurationError(format!("invalid proxy URL: {why}"));
        let url = url::Url::parse(raw.trim()).map_err(|e| invalid(format!("'{raw}': {e}")))?;
        if !PROXY_SCHEMES.contains(&url.scheme()) {
            return Err(invalid(format!("'{raw}': unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(format!("'{raw}': missing host")));
        }
        Ok(Self(raw.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolved transport settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub tls: TlsMode,
    pub client_identity: Option<ClientIdentity>,
    pub proxy: Option<ProxyUrl>,
}

/// Resolve the transport settings named by the three switches.
pub fn resolve(skip_verify: bool, cert_path: &str, proxy: &str) -> Result<ConnectionConfig> {
    let flags = ConnectionFlags {
        skip_verify,
        has_cert: !cert_path.is_empty(),
        has_proxy: !proxy.is_empty(),
    };
    let profile = flags.profile();
    debug!("connection profile: {}", profile.description);

    let client_identity = if profile.client_cert {
        Some(ClientIdentity::load(Path::new(cert_path))?)
    } else {
        None
    };
    let proxy = if profile.proxy {
        Some(ProxyUrl::parse(proxy)?)
    } else {
        None
    };

    Ok(ConnectionConfig {
        tls: profile.tls,
        client_identity,
        proxy,
    })
}

pub fn resolve_params(params: &ParameterRecord) -> Result<ConnectionConfig> {
    resolve(params.ignore_ssl, params.client_cert_path(), &params.proxy)
}

impl ConnectionConfig {
    pub fn flags(&self) -> ConnectionFlags {
        ConnectionFlags {
            skip_verify: self.tls == TlsMode::Skip,
            has_cert: self.client_identity.is_some(),
            has_proxy: self.proxy.is_some(),
        }
    }

    /// Build the agent that carries this configuration and `timeout` as
    /// its global deadline.
    pub fn agent(&self, timeout: Duration) -> Result<Agent> {
        let client_cert = self
            .client_identity
            .as_ref()
            .map(ClientIdentity::client_cert)
            .transpose()?;
        let tls = TlsConfig::builder()
            .disable_verification(self.tls == TlsMode::Skip)
            .client_cert(client_cert)
            .build();

        // An explicit `None` keeps ambient proxy variables out of direct rows.
        let proxy = self
            .proxy
            .as_ref()
            .map(|p| Proxy::new(p.as_str()))
            .transpose()
            .map_err(|e| RequestError::ConfigurationError(format!("invalid proxy URL: {e}")))?;

        let agent = Agent::config_builder()
            .tls_config(tls)
            .proxy(proxy)
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .allow_non_standard_methods(true)
            .build()
            .new_agent();
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROXY: &str = "http://proxy.internal:3128";

    fn cert_fixture() -> String {
        format!("{}/tests/fixtures/client.pem", env!("CARGO_MANIFEST_DIR"))
    }

    fn all_flags() -> Vec<ConnectionFlags> {
        let mut out = Vec::new();
        for skip_verify in [false, true] {
            for has_cert in [false, true] {
                for has_proxy in [false, true] {
                    out.push(ConnectionFlags {
                        skip_verify,
                        has_cert,
                        has_proxy,
                    });
                }
            }
        }
        out
    }

    fn resolve_flags(flags: ConnectionFlags) -> Result<ConnectionConfig> {
        let cert = if flags.has_cert { cert_fixture() } else { String::new() };
        let proxy = if flags.has_proxy { PROXY } else { "" };
        resolve(flags.skip_verify, &cert, proxy)
    }

    #[test]
    fn every_combination_has_its_own_profile() {
        let flags = all_flags();
        assert_eq!(flags.len(), 8);
        for f in &flags {
            let p = f.profile();
            assert_eq!(p.tls == TlsMode::Skip, f.skip_verify, "{f:?}");
            assert_eq!(p.client_cert, f.has_cert, "{f:?}");
            assert_eq!(p.proxy, f.has_proxy, "{f:?}");
        }
        let mut indices: Vec<_> = flags.iter().map(|f| f.index()).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), 8);
    }

    #[test]
    fn every_combination_resolves() {
        for flags in all_flags() {
            let config = resolve_flags(flags).unwrap();
            assert_eq!(config.flags(), flags);
            if let Some(identity) = &config.client_identity {
                assert_eq!(identity.chain_len(), 1);
            }
            if let Some(proxy) = &config.proxy {
                assert_eq!(proxy.as_str(), PROXY);
            }
            config.agent(Duration::from_secs(5)).unwrap();
        }
    }

    #[test]
    fn resolving_twice_is_identical() {
        for flags in all_flags() {
            assert_eq!(resolve_flags(flags).unwrap(), resolve_flags(flags).unwrap());
        }
    }

    #[test]
    fn missing_certificate_file_is_certificate_error() {
        let err = resolve(false, "/no/such/client.pem", "").unwrap_err();
        assert!(matches!(err, RequestError::CertificateError(_)));
        assert!(err.to_string().contains("/no/such/client.pem"));
    }

    #[test]
    fn certificate_without_key_is_certificate_error() {
        let path = format!("{}/tests/fixtures/cert_only.pem", env!("CARGO_MANIFEST_DIR"));
        let err = resolve(true, &path, "").unwrap_err();
        assert!(err.to_string().contains("no private key found"));
    }

    #[test]
    fn garbage_certificate_is_certificate_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.pem");
        fs::write(&path, "not a pem file").unwrap();
        let err = resolve(false, path.to_str().unwrap(), "").unwrap_err();
        assert!(matches!(err, RequestError::CertificateError(_)));
    }

    #[test]
    fn malformed_proxy_is_configuration_error() {
        for raw in ["not a url", "ftp://proxy:21", "http://"] {
            let err = resolve(false, "", raw).unwrap_err();
            assert!(matches!(err, RequestError::ConfigurationError(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn skip_is_never_substituted_for_verify() {
        assert_eq!(resolve(false, "", "").unwrap().tls, TlsMode::Verify);
        assert_eq!(resolve(true, "", "").unwrap().tls, TlsMode::Skip);
    }

    #[test]
    fn debug_output_leaves_out_key_material() {
        let identity = ClientIdentity::load(Path::new(&cert_fixture())).unwrap();
        let shown = format!("{identity:?}");
        assert!(shown.contains("client.pem"));
        assert!(!shown.contains("PRIVATE KEY"));
    }
}
