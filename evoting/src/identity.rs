use crate::*;

const X509_PREFIX: &str = "x509::";
const COMMON_NAME_PREFIX: &str = "CN=";

/// A verified caller identity, as supplied by the membership service
///
/// `id` is the raw credential string. For x509 credentials it has the form
/// `x509::<subject DN>::<issuer DN>`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub msp_id: OrgId,
    pub id: String,
}

impl Identity {
    pub fn new(msp_id: OrgId, id: impl Into<String>) -> Self {
        Identity {
            msp_id,
            id: id.into(),
        }
    }

    /// Build the x509 identity of a client enrolled with an organization's CA
    pub fn x509(msp_id: OrgId, user: &str) -> Self {
        let org = msp_id.domain_label();
        let id = format!(
            "{}CN={},OU=client::CN=ca.{}.example.com,O={}.example.com",
            X509_PREFIX, user, org, org
        );
        Identity { msp_id, id }
    }

    /// Decode a base64-encoded credential string
    pub fn from_base64(msp_id: OrgId, encoded: &str) -> Result<Self, Error> {
        let bytes = base64::decode(encoded)?;
        let id = String::from_utf8(bytes).map_err(|_| Error::IdentityNotUtf8)?;
        Ok(Identity { msp_id, id })
    }

    pub fn to_base64(&self) -> String {
        base64::encode(&self.id)
    }

    /// The short display form of this identity
    pub fn display_name(&self) -> String {
        normalize_identity(&self.id)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}@{}", self.display_name(), self.msp_id)
    }
}

/// Strip the credential-type prefix from a raw identity string
///
/// `x509::CN=user1,OU=client::CN=ca...` becomes `user1`. Only the first RDN of
/// the subject is kept, without its `CN=` attribute type, so the disclosed
/// voter is the bare common name rather than `CN=user1`. Strings without a
/// known credential prefix are returned unchanged.
pub fn normalize_identity(raw: &str) -> String {
    let subject = match raw.strip_prefix(X509_PREFIX) {
        Some(rest) => rest.split("::").next().unwrap_or(rest),
        None => return raw.to_owned(),
    };

    let first_rdn = subject.split(',').next().unwrap_or(subject).trim();
    first_rdn
        .strip_prefix(COMMON_NAME_PREFIX)
        .unwrap_or(first_rdn)
        .to_owned()
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_normalize_identity() {
        let org1 = OrgId::new("Org1MSP");
        let voter = Identity::x509(org1.clone(), "voter1");
        assert_eq!(
            voter.id,
            "x509::CN=voter1,OU=client::CN=ca.org1.example.com,O=org1.example.com"
        );
        assert_eq!(voter.display_name(), "voter1");
        assert_eq!(format!("{}", voter), "voter1@Org1MSP");

        assert_eq!(
            normalize_identity("x509::CN=user1,OU=client::CN=ca.org1.example.com"),
            "user1"
        );

        // Not an x509 credential: untouched
        assert_eq!(normalize_identity("v1"), "v1");

        // Subject without a common name keeps its first RDN
        assert_eq!(normalize_identity("x509::OU=client,O=org1::CN=ca"), "OU=client");
    }

    #[test]
    fn test_base64_identity() {
        let org2 = OrgId::new("Org2MSP");
        let voter = Identity::x509(org2.clone(), "alice");
        let encoded = voter.to_base64();

        let decoded = Identity::from_base64(org2.clone(), &encoded).unwrap();
        assert_eq!(decoded, voter);

        assert!(Identity::from_base64(org2, "not base64!").is_err());
    }
}
