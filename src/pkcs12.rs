use crate::error::SignerError;
use crate::sign::{SignRequest, Signer};
use openssl::pkcs12::Pkcs12;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;

/// Signs with a key and certificate chain unpacked from a PKCS#12 (`.pfx`/`.p12`)
/// bundle. Produces a detached CMS blob for `/SubFilter /adbe.pkcs7.detached`.
pub struct Pkcs12Signer {
    pkey: PKey<Private>,
    cert: X509,
    chain: Vec<X509>,
}

impl Pkcs12Signer {
    pub fn from_der(der: &[u8], password: &str) -> Result<Self, SignerError> {
        let parsed = Pkcs12::from_der(der)
            .and_then(|bundle| bundle.parse2(password))
            .map_err(|err| SignerError::Credentials(err.to_string()))?;
        let pkey = parsed
            .pkey
            .ok_or_else(|| SignerError::Credentials("bundle has no private key".to_string()))?;
        let cert = parsed
            .cert
            .ok_or_else(|| SignerError::Credentials("bundle has no certificate".to_string()))?;
        let chain = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();
        tracing::debug!(
            subject = ?cert.subject_name(),
            chain = chain.len(),
            "loaded pkcs12 credentials"
        );
        Ok(Self { pkey, cert, chain })
    }

    pub fn certificate(&self) -> &X509 {
        &self.cert
    }
}

impl Signer for Pkcs12Signer {
    // CMS computes its own message digest from the covered bytes.
    fn sign(&self, request: &SignRequest<'_>) -> Result<Vec<u8>, SignerError> {
        let service = |err: openssl::error::ErrorStack| SignerError::Service(err.to_string());
        let mut certs = Stack::new().map_err(service)?;
        for cert in &self.chain {
            certs.push(cert.clone()).map_err(service)?;
        }
        let [head, tail] = request.covered;
        let mut data = Vec::with_capacity(head.len() + tail.len());
        data.extend_from_slice(head);
        data.extend_from_slice(tail);

        let flags = Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY | Pkcs7Flags::NOSMIMECAP;
        let pkcs7 = Pkcs7::sign(&self.cert, &self.pkey, &certs, &data, flags).map_err(service)?;
        pkcs7.to_der().map_err(service)
    }
}
