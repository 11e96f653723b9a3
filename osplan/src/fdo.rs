//! FIDO Device Onboard options.

use crate::blueprint::FdoCustomization;

/// FDO onboarding parameters, carried from the blueprint into the boot
/// ISO's kernel command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub manufacturing_server_url: String,
    pub diun_pub_key_insecure: String,
    pub diun_pub_key_hash: String,
    pub diun_pub_key_root_certs: String,
}

impl From<&FdoCustomization> for Options {
    fn from(fdo: &FdoCustomization) -> Options {
        Options {
            manufacturing_server_url: fdo.manufacturing_server_url.clone(),
            diun_pub_key_insecure: fdo.diun_pub_key_insecure.clone(),
            diun_pub_key_hash: fdo.diun_pub_key_hash.clone(),
            diun_pub_key_root_certs: fdo.diun_pub_key_root_certs.clone(),
        }
    }
}

impl Options {
    /// Kernel command-line arguments understood by the FDO client.
    pub fn kernel_arguments(&self) -> Vec<String> {
        let mut args = vec![format!(
            "fdo.manufacturing_server_url={}",
            self.manufacturing_server_url
        )];
        if !self.diun_pub_key_insecure.is_empty() {
            args.push(format!("fdo.diun_pub_key_insecure={}", self.diun_pub_key_insecure));
        }
        if !self.diun_pub_key_hash.is_empty() {
            args.push(format!("fdo.diun_pub_key_hash={}", self.diun_pub_key_hash));
        }
        if !self.diun_pub_key_root_certs.is_empty() {
            args.push(format!(
                "fdo.diun_pub_key_root_certs={}",
                self.diun_pub_key_root_certs
            ));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_arguments_skip_unset_fields() {
        let options = Options {
            manufacturing_server_url: "https://fdo.example.org".into(),
            diun_pub_key_hash: "sha256:00ff".into(),
            ..Default::default()
        };
        let args = options.kernel_arguments();
        assert_eq!(args.len(), 2);
        assert!(args[0].starts_with("fdo.manufacturing_server_url="));
        assert!(args[1].starts_with("fdo.diun_pub_key_hash="));
    }
}
