//! Signing-certificate boundary. Cryptographic parsing of the PKCS#7
//! block is delegated to a caller-supplied [`CertificateParser`]; this
//! module only locates the signature entry and names the identities it
//! yields.

use serde::Serialize;

/// One signer identity extracted from the signature block.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Signer {
    pub subject: String,
    pub issuer: String,
    pub signature_algorithm: String,
}

/// Parses a raw `META-INF` signature block into signer identities.
pub trait CertificateParser {
    fn parse(&self, block: &[u8]) -> Result<Vec<Signer>, String>;
}

/// Whether an archive entry name is a signature block, following the
/// `META-INF/<name>.(RSA|DSA|EC)` convention. The base name must not
/// contain a dot and the match is case-insensitive.
pub fn is_certificate_entry(name: &str) -> bool {
    let Some(rest) = strip_prefix_ignore_case(name, "META-INF/") else {
        return false;
    };
    let Some((base, extension)) = rest.rsplit_once('.') else {
        return false;
    };
    if base.is_empty() || base.contains('.') || base.contains('/') {
        return false;
    }
    ["RSA", "DSA", "EC"]
        .iter()
        .any(|ext| extension.eq_ignore_ascii_case(ext))
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        name.get(prefix.len()..)
    } else {
        None
    }
}
