//! Hardware platform descriptions.
//!
//! A [`Platform`] captures everything about a target machine that image
//! assembly needs to know: the architecture, the output image format, which
//! firmware interfaces are supported (BIOS, UEFI, zipl) and which firmware
//! packages and boot files the image must carry.

use serde::Serialize;

pub const X86_64: &str = "x86_64";
pub const AARCH64: &str = "aarch64";
pub const PPC64LE: &str = "ppc64le";
pub const S390X: &str = "s390x";

/// Output format of the raw image produced for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Unset,
    Raw,
    Qcow2,
    Vhd,
    Vmdk,
    Ova,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Unset => "",
            ImageFormat::Raw => "raw",
            ImageFormat::Qcow2 => "qcow2",
            ImageFormat::Vhd => "vhd",
            ImageFormat::Vmdk => "vmdk",
            ImageFormat::Ova => "ova",
        }
    }
}

/// Fields shared by every platform variant.
#[derive(Debug, Clone, Default)]
pub struct BasePlatform {
    pub image_format: ImageFormat,
    pub qcow2_compat: Option<String>,
    pub firmware_packages: Vec<String>,
    /// (source, destination) pairs copied into the boot partition.
    pub boot_files: Vec<(String, String)>,
}

/// A target hardware platform. Closed set; adding a variant means a new
/// architecture family is supported.
#[derive(Debug, Clone)]
pub enum Platform {
    X86 {
        base: BasePlatform,
        bios: bool,
        uefi_vendor: Option<String>,
    },
    Aarch64 {
        base: BasePlatform,
        uefi_vendor: Option<String>,
    },
    /// aarch64 boards that boot through firmware files on the EFI system
    /// partition (e.g. Raspberry Pi) rather than a regular UEFI install.
    Aarch64IoT {
        base: BasePlatform,
        uefi_vendor: Option<String>,
    },
    Ppc64le {
        base: BasePlatform,
    },
    S390x {
        base: BasePlatform,
        zipl: bool,
    },
}

impl Platform {
    pub fn arch(&self) -> &'static str {
        match self {
            Platform::X86 { .. } => X86_64,
            Platform::Aarch64 { .. } | Platform::Aarch64IoT { .. } => AARCH64,
            Platform::Ppc64le { .. } => PPC64LE,
            Platform::S390x { .. } => S390X,
        }
    }

    fn base(&self) -> &BasePlatform {
        match self {
            Platform::X86 { base, .. }
            | Platform::Aarch64 { base, .. }
            | Platform::Aarch64IoT { base, .. }
            | Platform::Ppc64le { base }
            | Platform::S390x { base, .. } => base,
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        self.base().image_format
    }

    pub fn qcow2_compat(&self) -> Option<&str> {
        self.base().qcow2_compat.as_deref()
    }

    /// The grub2 platform directory for BIOS boot, when supported.
    pub fn bios_platform(&self) -> Option<&'static str> {
        match self {
            Platform::X86 { bios: true, .. } => Some("i386-pc"),
            Platform::Ppc64le { .. } => Some("powerpc-ieee1275"),
            _ => None,
        }
    }

    pub fn uefi_vendor(&self) -> Option<&str> {
        match self {
            Platform::X86 { uefi_vendor, .. }
            | Platform::Aarch64 { uefi_vendor, .. }
            | Platform::Aarch64IoT { uefi_vendor, .. } => uefi_vendor.as_deref(),
            _ => None,
        }
    }

    pub fn zipl_support(&self) -> bool {
        matches!(self, Platform::S390x { zipl: true, .. })
    }

    /// Packages the OS payload needs for this platform (firmware plus the
    /// bootloader stack implied by the supported boot interfaces).
    pub fn packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = self.base().firmware_packages.clone();
        if self.bios_platform() == Some("i386-pc") {
            packages.extend(["grub2-pc".to_string(), "grub2-pc-modules".to_string()]);
        }
        if self.uefi_vendor().is_some() {
            packages.push("efibootmgr".to_string());
            match self.arch() {
                X86_64 => {
                    packages.extend(["grub2-efi-x64".to_string(), "shim-x64".to_string()]);
                }
                AARCH64 => {
                    packages.extend(["grub2-efi-aa64".to_string(), "shim-aa64".to_string()]);
                }
                _ => {}
            }
        }
        if self.zipl_support() {
            packages.push("s390utils-base".to_string());
        }
        packages
    }

    /// Packages the build host needs to assemble images for this platform.
    pub fn build_packages(&self) -> Vec<String> {
        match self {
            Platform::X86 { .. } => vec!["grub2-pc".to_string()],
            Platform::S390x { .. } => vec!["s390utils-base".to_string()],
            _ => Vec::new(),
        }
    }

    pub fn boot_files(&self) -> &[(String, String)] {
        &self.base().boot_files
    }
}

/// How an image boots, derived from the platform's firmware interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    None,
    /// BIOS or zipl only.
    Legacy,
    Uefi,
    /// BIOS and UEFI both supported.
    Hybrid,
}

impl BootMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootMode::None => "none",
            BootMode::Legacy => "legacy",
            BootMode::Uefi => "uefi",
            BootMode::Hybrid => "hybrid",
        }
    }
}

/// Derive the boot mode from platform flags: UEFI-only, BIOS-only (or
/// zipl) is legacy, both is hybrid, neither is none.
pub fn boot_mode(platform: &Platform) -> BootMode {
    let uefi = platform.uefi_vendor().is_some();
    let legacy = platform.bios_platform().is_some() || platform.zipl_support();
    match (uefi, legacy) {
        (true, true) => BootMode::Hybrid,
        (true, false) => BootMode::Uefi,
        (false, true) => BootMode::Legacy,
        (false, false) => BootMode::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x86(bios: bool, uefi: bool) -> Platform {
        Platform::X86 {
            base: BasePlatform::default(),
            bios,
            uefi_vendor: uefi.then(|| "fedora".to_string()),
        }
    }

    #[test]
    fn boot_mode_derivation() {
        assert_eq!(boot_mode(&x86(true, true)), BootMode::Hybrid);
        assert_eq!(boot_mode(&x86(false, true)), BootMode::Uefi);
        assert_eq!(boot_mode(&x86(true, false)), BootMode::Legacy);
        assert_eq!(boot_mode(&x86(false, false)), BootMode::None);
    }

    #[test]
    fn zipl_counts_as_legacy() {
        let s390 = Platform::S390x {
            base: BasePlatform::default(),
            zipl: true,
        };
        assert_eq!(boot_mode(&s390), BootMode::Legacy);
    }

    #[test]
    fn x86_hybrid_pulls_bios_and_uefi_bootloaders() {
        let packages = x86(true, true).packages();
        assert!(packages.iter().any(|p| p == "grub2-pc"));
        assert!(packages.iter().any(|p| p == "grub2-efi-x64"));
        assert!(packages.iter().any(|p| p == "shim-x64"));
    }

    #[test]
    fn firmware_packages_are_carried() {
        let platform = Platform::Aarch64 {
            base: BasePlatform {
                firmware_packages: vec!["uboot-images-armv8".into()],
                ..Default::default()
            },
            uefi_vendor: Some("fedora".into()),
        };
        assert!(platform.packages().iter().any(|p| p == "uboot-images-armv8"));
        assert!(platform.packages().iter().any(|p| p == "grub2-efi-aa64"));
    }
}
