//! TLS termination.
//!
//! Loads the server certificate chain and private key from PEM, builds
//! the rustls acceptor, and implements the optional "require any client
//! certificate" policy: the client must present a certificate chain,
//! which is recorded on the session but not verified against any root.
//! Authenticating the presented certificate is the embedder's business
//! (typically inside the login handler, against registrar records).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio_rustls::rustls::client::danger::HandshakeSignatureValid;
use tokio_rustls::rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, UnixTime};
use tokio_rustls::rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use tokio_rustls::rustls::{self, DigitallySignedStruct, DistinguishedName, SignatureScheme};
use tokio_rustls::TlsAcceptor;

/// Client-certificate policy for the TLS handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientAuth {
    /// Do not request a client certificate.
    #[default]
    None,
    /// Require the client to present a certificate chain, accepted
    /// without chain verification.
    RequireAny,
}

/// Server-side TLS material and policy.
pub struct TlsConfig {
    certificate_chain: Vec<CertificateDer<'static>>,
    private_key: PrivateKeyDer<'static>,
    client_auth: ClientAuth,
}

impl TlsConfig {
    /// Builds a config from in-memory DER material.
    #[must_use]
    pub fn new(
        certificate_chain: Vec<CertificateDer<'static>>,
        private_key: PrivateKeyDer<'static>,
        client_auth: ClientAuth,
    ) -> Self {
        Self {
            certificate_chain,
            private_key,
            client_auth,
        }
    }

    /// Loads the certificate chain and private key from PEM files.
    ///
    /// # Errors
    ///
    /// [`TlsError::Read`] if a file cannot be opened or parsed,
    /// [`TlsError::NoCertificates`] / [`TlsError::NoPrivateKey`] if the
    /// files hold no usable material.
    pub fn from_pem_files(
        certificate: &Path,
        private_key: &Path,
        client_auth: ClientAuth,
    ) -> Result<Self, TlsError> {
        let mut reader = open(certificate)?;
        let certificate_chain = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| TlsError::Read {
                path: certificate.to_path_buf(),
                source,
            })?;
        if certificate_chain.is_empty() {
            return Err(TlsError::NoCertificates {
                path: certificate.to_path_buf(),
            });
        }

        let mut reader = open(private_key)?;
        let key = rustls_pemfile::private_key(&mut reader)
            .map_err(|source| TlsError::Read {
                path: private_key.to_path_buf(),
                source,
            })?
            .ok_or_else(|| TlsError::NoPrivateKey {
                path: private_key.to_path_buf(),
            })?;

        Ok(Self::new(certificate_chain, key, client_auth))
    }

    /// Builds the acceptor used by the listener.
    pub(crate) fn into_acceptor(self) -> Result<TlsAcceptor, TlsError> {
        let builder = rustls::ServerConfig::builder();
        let config = match self.client_auth {
            ClientAuth::None => builder
                .with_no_client_auth()
                .with_single_cert(self.certificate_chain, self.private_key)?,
            ClientAuth::RequireAny => builder
                .with_client_cert_verifier(Arc::new(AcceptAnyClientCert::new()))
                .with_single_cert(self.certificate_chain, self.private_key)?,
        };
        Ok(TlsAcceptor::from(Arc::new(config)))
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("certificates", &self.certificate_chain.len())
            .field("client_auth", &self.client_auth)
            .finish_non_exhaustive()
    }
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// TLS configuration failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TlsError {
    /// A PEM file could not be read or parsed.
    #[error("failed to read TLS material from {path}: {source}")]
    Read {
        /// Path of the offending file.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The certificate file held no certificates.
    #[error("no certificates found in {path}")]
    NoCertificates {
        /// Path of the certificate file.
        path: PathBuf,
    },

    /// The key file held no private key.
    #[error("no private key found in {path}")]
    NoPrivateKey {
        /// Path of the key file.
        path: PathBuf,
    },

    /// rustls rejected the material.
    #[error("TLS material rejected: {0}")]
    Rejected(#[from] rustls::Error),
}

/// Verifier for [`ClientAuth::RequireAny`]: the handshake fails unless
/// the client presents a certificate, but the presented chain is not
/// verified against any trust anchor. Signatures are still checked, so
/// the client must hold the matching private key.
#[derive(Debug)]
struct AcceptAnyClientCert {
    provider: CryptoProvider,
}

impl AcceptAnyClientCert {
    fn new() -> Self {
        Self {
            provider: rustls::crypto::aws_lc_rs::default_provider(),
        }
    }
}

impl ClientCertVerifier for AcceptAnyClientCert {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }

    fn client_auth_mandatory(&self) -> bool {
        true
    }
}
