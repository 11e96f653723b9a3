//! Fedora distribution definitions.

use rpmmd::PackageSet;

use crate::disk::{
    Filesystem, Partition, PartitionTable, Payload, TableType, BIOS_BOOT_GUID,
    DEFAULT_SECTOR_SIZE, EFI_SYSTEM_GUID, GIB, LINUX_FS_GUID, MIB,
};
use crate::osbuild;
use crate::platform::{BasePlatform, ImageFormat, Platform, AARCH64, X86_64};

use super::images;
use super::{
    package_set, Distribution, DistroData, ImageConfig, ImageType, ImageTypeDef, JournaldDropin,
    BUILD_PKGS_KEY, CONTAINER_PKGS_KEY, INSTALLER_PKGS_KEY, OS_PKGS_KEY,
};

// Kernel options for the plain disk image types.
const DEFAULT_KERNEL_OPTIONS: &str =
    "ro no_timer_check console=ttyS0,115200n8 biosdevname=0 net.ifnames=0";

const IOT_SERVICES: &[&str] = &[
    "NetworkManager.service",
    "firewalld.service",
    "rngd.service",
    "sshd.service",
    "zezere_ignition.timer",
    "zezere_ignition_banner.service",
    "greenboot-grub2-set-counter",
    "greenboot-grub2-set-success",
    "greenboot-healthcheck",
    "greenboot-rpm-ostree-grub2-check-fallback",
    "greenboot-status",
    "greenboot-task-runner",
    "redboot-auto-reboot",
    "redboot-task-runner",
    "parsec",
    "dbus-parsec",
];

const CLOUD_INIT_SERVICES: &[&str] = &[
    "cloud-init.service",
    "cloud-config.service",
    "cloud-final.service",
    "cloud-init-local.service",
];

fn services(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Package sets
// ---------------------------------------------------------------------------

fn build_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &[
            "dnf", "dosfstools", "e2fsprogs", "policycoreutils", "python3-iniparse", "qemu-img",
            "selinux-policy-targeted", "systemd", "tar", "xfsprogs", "xz",
        ],
        &[],
    )
}

fn ostree_build_package_set(t: &ImageType) -> PackageSet {
    build_package_set(t).append(package_set(&["ostree", "pigz", "rpm-ostree"], &[]))
}

fn installer_build_package_set(t: &ImageType) -> PackageSet {
    let mut set = build_package_set(t).append(package_set(
        &["isomd5sum", "lorax-templates-generic", "squashfs-tools", "xorriso"],
        &[],
    ));
    if t.arch_name() == X86_64 {
        set = set.append(package_set(&["syslinux", "syslinux-nonlinux"], &[]));
    }
    set
}

fn iot_installer_build_package_set(t: &ImageType) -> PackageSet {
    installer_build_package_set(t).append(package_set(&["ostree", "pigz", "rpm-ostree"], &[]))
}

fn minimal_rpm_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &["@core", "initial-setup", "libxkbcommon", "NetworkManager-wifi", "brcmfmac-firmware"],
        &[],
    )
}

fn qcow2_common_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &[
            "@Fedora Cloud Server",
            "chrony",
            "systemd-udev",
            "langpacks-en",
            "qemu-guest-agent",
        ],
        &[
            "dracut-config-rescue",
            "firewalld",
            "geolite2-city",
            "geolite2-country",
            "plymouth",
        ],
    )
}

fn vhd_common_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &["@core", "chrony", "langpacks-en", "net-tools", "ntfsprogs", "WALinuxAgent", "libxcrypt-compat"],
        &["dracut-config-rescue", "geolite2-city", "geolite2-country"],
    )
}

fn vmdk_common_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &["@core", "chrony", "cloud-init", "langpacks-en", "open-vm-tools"],
        &["dracut-config-rescue", "geolite2-city", "geolite2-country"],
    )
}

fn openstack_common_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &["@core", "chrony", "langpacks-en", "cloud-init", "qemu-guest-agent", "spice-vdagent"],
        &["dracut-config-rescue", "geolite2-city", "geolite2-country"],
    )
}

fn ec2_common_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &[
            "@core",
            "chrony",
            "langpacks-en",
            "libxcrypt-compat",
            "cloud-init",
            "checkpolicy",
            "net-tools",
        ],
        &["dracut-config-rescue", "geolite2-city", "geolite2-country"],
    )
}

fn container_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &[
            "bash",
            "coreutils",
            "dnf",
            "fedora-release-container",
            "glibc-minimal-langpack",
            "rpm",
            "sudo",
            "util-linux",
        ],
        &["kernel", "dosfstools", "e2fsprogs", "fuse-libs", "gnupg2-smime", "libss", "pinentry", "shared-mime-info", "trousers", "xkeyboard-config", "grubby"],
    )
}

fn iot_commit_package_set(_t: &ImageType) -> PackageSet {
    package_set(
        &[
            "fedora-release-iot",
            "glibc",
            "glibc-minimal-langpack",
            "nss-altfiles",
            "sssd-client",
            "libsss_sudo",
            "shadow-utils",
            "dracut-config-generic",
            "dracut-network",
            "rpm-ostree",
            "polkit",
            "lvm2",
            "chrony",
            "zram-generator",
            "NetworkManager",
            "NetworkManager-wifi",
            "NetworkManager-wwan",
            "firewalld",
            "iwd",
            "iwlwifi-mvm-firmware",
            "openssh-server",
            "openssh-clients",
            "wpa_supplicant",
            "parsec",
            "dbus-parsec",
            "greenboot",
            "greenboot-grub2",
            "greenboot-reboot",
            "greenboot-rpm-ostree-grub2",
            "greenboot-status",
            "fdo-client",
            "fdo-owner-cli",
            "zezere-ignition",
            "rsync",
            "attr",
            "ima-evm-utils",
            "bash-completion",
            "tmux",
            "screen",
            "policycoreutils",
            "setools-console",
            "less",
            "lsof",
            "usbguard",
            "bluez",
            "bluez-libs",
            "bluez-mesh",
            "kernel-tools",
            "libgpiod-utils",
            "podman",
            "container-selinux",
            "skopeo",
            "criu",
            "slirp4netns",
            "clevis",
            "clevis-dracut",
            "clevis-luks",
            "clevis-pin-tpm2",
            "keyutils",
        ],
        &[],
    )
}

fn iot_installer_package_set(t: &ImageType) -> PackageSet {
    anaconda_boot_package_set(t).append(package_set(
        &[
            "anaconda",
            "anaconda-dracut",
            "anaconda-install-env-deps",
            "anaconda-widgets",
            "dracut-config-generic",
            "dracut-network",
            "glibc-all-langpacks",
            "kernel",
            "less",
            "nfs-utils",
            "openssh-clients",
            "ostree",
            "plymouth",
            "rng-tools",
            "rpm-ostree",
            "selinux-policy-targeted",
            "systemd",
            "volume_key",
            "xfsprogs",
        ],
        &[],
    ))
}

fn image_installer_package_set(t: &ImageType) -> PackageSet {
    iot_installer_package_set(t)
}

/// Bootloader packages for the installer ISO, by architecture.
fn anaconda_boot_package_set(t: &ImageType) -> PackageSet {
    let grub_common = package_set(&["grub2-tools", "grub2-tools-extra", "grub2-tools-minimal"], &[]);
    let efi_common = package_set(&["efibootmgr"], &[]);

    match t.arch_name() {
        X86_64 => grub_common.append(efi_common).append(package_set(
            &[
                "grub2-efi-ia32-cdboot",
                "grub2-efi-x64",
                "grub2-efi-x64-cdboot",
                "grub2-pc",
                "grub2-pc-modules",
                "shim-ia32",
                "shim-x64",
                "syslinux",
                "syslinux-nonlinux",
            ],
            &[],
        )),
        AARCH64 => grub_common.append(efi_common).append(package_set(
            &["grub2-efi-aa64-cdboot", "grub2-efi-aa64", "shim-aa64"],
            &[],
        )),
        arch => panic!("unsupported arch for installer boot packages: {arch}"),
    }
}

// ---------------------------------------------------------------------------
// Partition tables
// ---------------------------------------------------------------------------

fn efi_partition(size: u64) -> Partition {
    Partition {
        start: 0,
        size,
        part_type: EFI_SYSTEM_GUID.to_string(),
        bootable: false,
        uuid: None,
        payload: Some(Payload::Filesystem(Filesystem {
            fs_type: "vfat".to_string(),
            uuid: None,
            label: Some("EFI-SYSTEM".to_string()),
            mountpoint: "/boot/efi".to_string(),
            fstab_options: "defaults,uid=0,gid=0,umask=077,shortname=winnt".to_string(),
            fstab_freq: 0,
            fstab_passno: 2,
        })),
    }
}

fn ext4_partition(size: u64, label: &str, mountpoint: &str) -> Partition {
    Partition {
        start: 0,
        size,
        part_type: LINUX_FS_GUID.to_string(),
        bootable: false,
        uuid: None,
        payload: Some(Payload::Filesystem(Filesystem {
            fs_type: "ext4".to_string(),
            uuid: None,
            label: Some(label.to_string()),
            mountpoint: mountpoint.to_string(),
            fstab_options: "defaults".to_string(),
            fstab_freq: 0,
            fstab_passno: 0,
        })),
    }
}

fn default_base_partition_tables(arch: &str) -> Option<PartitionTable> {
    match arch {
        X86_64 => Some(PartitionTable {
            table_type: TableType::Gpt,
            size: 0,
            uuid: None,
            sector_size: DEFAULT_SECTOR_SIZE,
            start_offset: MIB,
            partitions: vec![
                Partition {
                    start: 0,
                    size: MIB,
                    part_type: BIOS_BOOT_GUID.to_string(),
                    bootable: true,
                    uuid: None,
                    payload: None,
                },
                efi_partition(200 * MIB),
                ext4_partition(500 * MIB, "boot", "/boot"),
                ext4_partition(2 * GIB, "root", "/"),
            ],
        }),
        AARCH64 => Some(PartitionTable {
            table_type: TableType::Gpt,
            size: 0,
            uuid: None,
            sector_size: DEFAULT_SECTOR_SIZE,
            start_offset: MIB,
            partitions: vec![
                efi_partition(200 * MIB),
                ext4_partition(500 * MIB, "boot", "/boot"),
                ext4_partition(2 * GIB, "root", "/"),
            ],
        }),
        _ => None,
    }
}

fn iot_base_partition_tables(arch: &str) -> Option<PartitionTable> {
    match arch {
        X86_64 | AARCH64 => Some(PartitionTable {
            table_type: TableType::Gpt,
            size: 0,
            uuid: None,
            sector_size: DEFAULT_SECTOR_SIZE,
            start_offset: MIB,
            partitions: vec![
                efi_partition(501 * MIB),
                ext4_partition(GIB, "boot", "/boot"),
                ext4_partition(2565 * MIB, "root", "/"),
            ],
        }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Image type definitions
// ---------------------------------------------------------------------------

fn qcow2_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "qcow2",
        "disk.qcow2",
        "application/x-qemu-disk",
        images::live_image,
    );
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), build_package_set as _),
        (OS_PKGS_KEY.to_string(), qcow2_common_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        default_target: Some("multi-user.target".to_string()),
        enabled_services: services(CLOUD_INIT_SERVICES),
        ..Default::default()
    };
    def.kernel_options = DEFAULT_KERNEL_OPTIONS.to_string();
    def.bootable = true;
    def.default_size = 2 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into(), "qcow2".into()];
    def.exports = vec!["qcow2".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn oci_image_type() -> ImageTypeDef {
    // identical recipe under a different name
    let mut def = qcow2_image_type();
    def.name = "oci".to_string();
    def
}

fn vhd_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new("vhd", "disk.vhd", "application/x-vhd", images::live_image);
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), build_package_set as _),
        (OS_PKGS_KEY.to_string(), vhd_common_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        locale: Some("en_US.UTF-8".to_string()),
        default_target: Some("multi-user.target".to_string()),
        enabled_services: services(&["sshd", "waagent"]),
        disabled_services: services(&["proc-sys-fs-binfmt_misc.mount", "loadmodules.service"]),
        ..Default::default()
    };
    def.kernel_options = DEFAULT_KERNEL_OPTIONS.to_string();
    def.bootable = true;
    def.default_size = 2 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into(), "vpc".into()];
    def.exports = vec!["vpc".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn vmdk_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new("vmdk", "disk.vmdk", "application/x-vmdk", images::live_image);
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), build_package_set as _),
        (OS_PKGS_KEY.to_string(), vmdk_common_package_set as _),
    ];
    def.default_image_config = vmdk_default_image_config();
    def.kernel_options = DEFAULT_KERNEL_OPTIONS.to_string();
    def.bootable = true;
    def.default_size = 2 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into(), "vmdk".into()];
    def.exports = vec!["vmdk".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn vmdk_default_image_config() -> ImageConfig {
    ImageConfig {
        locale: Some("en_US.UTF-8".to_string()),
        enabled_services: services(CLOUD_INIT_SERVICES),
        ..Default::default()
    }
}

fn ova_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new("ova", "image.ova", "application/ovf", images::ova_image);
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), build_package_set as _),
        (OS_PKGS_KEY.to_string(), vmdk_common_package_set as _),
    ];
    def.default_image_config = vmdk_default_image_config();
    def.kernel_options = DEFAULT_KERNEL_OPTIONS.to_string();
    def.bootable = true;
    def.default_size = 2 * GIB;
    def.payload_pipelines = vec![
        "os".into(),
        "image".into(),
        "vmdk".into(),
        "ovf".into(),
        "archive".into(),
    ];
    def.exports = vec!["archive".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn openstack_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "openstack",
        "disk.qcow2",
        "application/x-qemu-disk",
        images::live_image,
    );
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), build_package_set as _),
        (OS_PKGS_KEY.to_string(), openstack_common_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        locale: Some("en_US.UTF-8".to_string()),
        enabled_services: services(CLOUD_INIT_SERVICES),
        ..Default::default()
    };
    def.kernel_options = DEFAULT_KERNEL_OPTIONS.to_string();
    def.bootable = true;
    def.default_size = 2 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into(), "qcow2".into()];
    def.exports = vec!["qcow2".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn ami_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "ami",
        "image.raw",
        "application/octet-stream",
        images::live_image,
    );
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), build_package_set as _),
        (OS_PKGS_KEY.to_string(), ec2_common_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        default_target: Some("multi-user.target".to_string()),
        enabled_services: services(CLOUD_INIT_SERVICES),
        sysconfig_kernel: Some(osbuild::SysconfigKernelOptions {
            update_default: true,
            default_kernel: Some("kernel".to_string()),
        }),
        sysconfig_network: Some(osbuild::SysconfigNetworkOptions {
            networking: true,
            no_zero_conf: true,
        }),
        ..Default::default()
    };
    def.kernel_options = DEFAULT_KERNEL_OPTIONS.to_string();
    def.bootable = true;
    def.default_size = 6 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into()];
    def.exports = vec!["image".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn container_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "container",
        "container.tar",
        "application/x-tar",
        images::container_image,
    );
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), build_package_set as _),
        (OS_PKGS_KEY.to_string(), container_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        no_selinux: Some(true),
        exclude_docs: Some(true),
        locale: Some("C.UTF-8".to_string()),
        timezone: Some("Etc/UTC".to_string()),
        ..Default::default()
    };
    def.payload_pipelines = vec!["os".into(), "container".into()];
    def.exports = vec!["container".into()];
    def
}

fn minimal_raw_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "minimal-raw",
        "raw.img",
        "application/disk",
        images::live_image,
    );
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), build_package_set as _),
        (OS_PKGS_KEY.to_string(), minimal_rpm_package_set as _),
    ];
    def.kernel_options = DEFAULT_KERNEL_OPTIONS.to_string();
    def.bootable = true;
    def.default_size = 2 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into()];
    def.exports = vec!["image".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn image_installer_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "image-installer",
        "installer.iso",
        "application/x-iso9660-image",
        images::image_installer_image,
    );
    def.name_aliases = vec!["fedora-image-installer".to_string()];
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), installer_build_package_set as _),
        (OS_PKGS_KEY.to_string(), minimal_rpm_package_set as _),
        (INSTALLER_PKGS_KEY.to_string(), image_installer_package_set as _),
    ];
    def.bootable = true;
    def.boot_iso = true;
    def.payload_pipelines = vec![
        "anaconda-tree".into(),
        "rootfs-image".into(),
        "efiboot-tree".into(),
        "os".into(),
        "bootiso-tree".into(),
        "bootiso".into(),
    ];
    def.exports = vec!["bootiso".into()];
    def
}

fn iot_commit_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "iot-commit",
        "commit.tar",
        "application/x-tar",
        images::iot_commit_image,
    );
    def.name_aliases = vec!["fedora-iot-commit".to_string()];
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), ostree_build_package_set as _),
        (OS_PKGS_KEY.to_string(), iot_commit_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        enabled_services: services(IOT_SERVICES),
        ..Default::default()
    };
    def.rpm_ostree = true;
    def.payload_pipelines = vec!["os".into(), "ostree-commit".into(), "commit-archive".into()];
    def.exports = vec!["commit-archive".into()];
    def
}

fn empty_package_set(_t: &ImageType) -> PackageSet {
    PackageSet::default()
}

fn iot_container_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "iot-container",
        "container.tar",
        "application/x-tar",
        images::iot_container_image,
    );
    def.name_aliases = vec!["fedora-iot-container".to_string()];
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), ostree_build_package_set as _),
        (OS_PKGS_KEY.to_string(), iot_commit_package_set as _),
        (CONTAINER_PKGS_KEY.to_string(), empty_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        enabled_services: services(IOT_SERVICES),
        ..Default::default()
    };
    def.rpm_ostree = true;
    def.payload_pipelines = vec![
        "os".into(),
        "ostree-commit".into(),
        "container-tree".into(),
        "container".into(),
    ];
    def.exports = vec!["container".into()];
    def
}

fn iot_installer_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "iot-installer",
        "installer.iso",
        "application/x-iso9660-image",
        images::iot_installer_image,
    );
    def.name_aliases = vec!["fedora-iot-installer".to_string()];
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), iot_installer_build_package_set as _),
        (INSTALLER_PKGS_KEY.to_string(), iot_installer_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        locale: Some("en_US.UTF-8".to_string()),
        enabled_services: services(IOT_SERVICES),
        ..Default::default()
    };
    def.rpm_ostree = true;
    def.boot_iso = true;
    def.payload_pipelines = vec![
        "anaconda-tree".into(),
        "rootfs-image".into(),
        "efiboot-tree".into(),
        "bootiso-tree".into(),
        "bootiso".into(),
    ];
    def.exports = vec!["bootiso".into()];
    def
}

fn iot_raw_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "iot-raw-image",
        "image.raw.xz",
        "application/xz",
        images::iot_raw_image,
    );
    def.name_aliases = vec!["fedora-iot-raw-image".to_string()];
    def.package_sets = vec![(BUILD_PKGS_KEY.to_string(), ostree_build_package_set as _)];
    def.default_image_config = ImageConfig {
        locale: Some("en_US.UTF-8".to_string()),
        ..Default::default()
    };
    def.rpm_ostree = true;
    def.bootable = true;
    def.default_size = 4 * GIB;
    def.payload_pipelines = vec!["ostree-deployment".into(), "image".into(), "xz".into()];
    def.exports = vec!["xz".into()];
    def.base_partition_tables = Some(iot_base_partition_tables);
    // the base table's sizes are deliberately smaller than the usual
    // required minima
    def.required_partition_sizes = Some(Vec::new());
    def
}

// ---------------------------------------------------------------------------
// Distribution assembly
// ---------------------------------------------------------------------------

pub fn new_f36() -> Distribution {
    new_distro(36)
}

pub fn new_f37() -> Distribution {
    new_distro(37)
}

pub fn new_f38() -> Distribution {
    new_distro(38)
}

pub fn new_f39() -> Distribution {
    new_distro(39)
}

fn new_distro(version: u32) -> Distribution {
    let data = DistroData {
        name: format!("fedora-{version}"),
        product: "Fedora".to_string(),
        os_version: version.to_string(),
        release_version: version.to_string(),
        module_platform_id: format!("platform:f{version}"),
        vendor: "fedora".to_string(),
        ostree_ref_tmpl: Some(format!("fedora/{version}/{{arch}}/iot")),
        isolabel_tmpl: format!("Fedora-{version}-BaseOS-{{arch}}"),
        runner: format!("org.osbuild.fedora{version}"),
        default_image_config: ImageConfig {
            timezone: Some("UTC".to_string()),
            locale: Some("en_US".to_string()),
            journald: Some(JournaldDropin {
                filename: "10-persistent.conf".to_string(),
                journal: osbuild::SystemdJournaldConfigJournalSection {
                    storage: Some("persistent".to_string()),
                    ..Default::default()
                },
            }),
            ..Default::default()
        },
        oscap_profile_allowlist: vec![
            "xccdf_org.ssgproject.content_profile_ospp".to_string(),
            "xccdf_org.ssgproject.content_profile_pci-dss".to_string(),
            "xccdf_org.ssgproject.content_profile_standard".to_string(),
        ],
    };
    let mut distro = Distribution::new(data);

    let mut x86_64 = distro.new_arch(X86_64);
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                image_format: ImageFormat::Qcow2,
                qcow2_compat: Some("1.1".to_string()),
                ..Default::default()
            },
            bios: true,
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![qcow2_image_type(), oci_image_type(), openstack_image_type()],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                image_format: ImageFormat::Vhd,
                ..Default::default()
            },
            bios: true,
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![vhd_image_type()],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                image_format: ImageFormat::Vmdk,
                ..Default::default()
            },
            bios: true,
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![vmdk_image_type()],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                image_format: ImageFormat::Ova,
                ..Default::default()
            },
            bios: true,
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![ova_image_type()],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                image_format: ImageFormat::Raw,
                ..Default::default()
            },
            bios: true,
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![ami_image_type(), minimal_raw_image_type()],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform::default(),
            bios: false,
            uefi_vendor: None,
        },
        vec![container_image_type()],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                firmware_packages: vec![
                    "microcode_ctl".to_string(),
                    "iwl1000-firmware".to_string(),
                    "iwl100-firmware".to_string(),
                    "iwl105-firmware".to_string(),
                    "iwl135-firmware".to_string(),
                    "iwl2000-firmware".to_string(),
                    "iwl2030-firmware".to_string(),
                    "iwl3160-firmware".to_string(),
                    "iwl5000-firmware".to_string(),
                    "iwl5150-firmware".to_string(),
                    "iwl6000-firmware".to_string(),
                    "iwl6050-firmware".to_string(),
                ],
                ..Default::default()
            },
            bios: true,
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![
            iot_commit_image_type(),
            iot_container_image_type(),
            iot_installer_image_type(),
            image_installer_image_type(),
        ],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                image_format: ImageFormat::Raw,
                ..Default::default()
            },
            bios: false,
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![iot_raw_image_type()],
    );

    let mut aarch64 = distro.new_arch(AARCH64);
    aarch64.add_image_types(
        &Platform::Aarch64 {
            base: BasePlatform {
                image_format: ImageFormat::Qcow2,
                qcow2_compat: Some("1.1".to_string()),
                ..Default::default()
            },
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![qcow2_image_type(), oci_image_type(), openstack_image_type()],
    );
    aarch64.add_image_types(
        &Platform::Aarch64 {
            base: BasePlatform {
                image_format: ImageFormat::Raw,
                ..Default::default()
            },
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![ami_image_type(), minimal_raw_image_type()],
    );
    aarch64.add_image_types(
        &Platform::Aarch64 {
            base: BasePlatform::default(),
            uefi_vendor: None,
        },
        vec![container_image_type()],
    );
    aarch64.add_image_types(
        &Platform::Aarch64 {
            base: BasePlatform {
                firmware_packages: vec![
                    "uboot-images-armv8".to_string(),
                    "bcm283x-firmware".to_string(),
                    "arm-image-installer".to_string(),
                ],
                ..Default::default()
            },
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![
            iot_commit_image_type(),
            iot_container_image_type(),
            iot_installer_image_type(),
            image_installer_image_type(),
        ],
    );
    aarch64.add_image_types(
        &Platform::Aarch64IoT {
            base: BasePlatform {
                image_format: ImageFormat::Raw,
                boot_files: vec![
                    (
                        "/usr/lib/ostree-boot/efi/config.txt".to_string(),
                        "/boot/efi/config.txt".to_string(),
                    ),
                    (
                        "/usr/lib/ostree-boot/efi/overlays".to_string(),
                        "/boot/efi/".to_string(),
                    ),
                    (
                        "/usr/share/uboot/rpi_arm64/u-boot.bin".to_string(),
                        "/boot/efi/rpi-u-boot.bin".to_string(),
                    ),
                ],
                ..Default::default()
            },
            uefi_vendor: Some("fedora".to_string()),
        },
        vec![iot_raw_image_type()],
    );

    distro.add_arches(vec![x86_64, aarch64]);
    distro
}
