//! RHEL 9 and CentOS Stream 9 distribution definitions.

use rpmmd::PackageSet;

use crate::disk::{
    Filesystem, Partition, PartitionTable, Payload, TableType, BIOS_BOOT_GUID,
    DEFAULT_SECTOR_SIZE, EFI_SYSTEM_GUID, GIB, LINUX_FS_GUID, MIB,
};
use crate::osbuild;
use crate::platform::{BasePlatform, ImageFormat, Platform, AARCH64, PPC64LE, S390X, X86_64};

use super::images;
use super::{
    package_set, Distribution, DistroData, ImageConfig, ImageType, ImageTypeDef,
    BUILD_PKGS_KEY, CONTAINER_PKGS_KEY, INSTALLER_PKGS_KEY, OS_PKGS_KEY,
};

const DEFAULT_KERNEL_OPTIONS: &str = "console=tty0 console=ttyS0,115200n8 no_timer_check net.ifnames=0";

const EDGE_SERVICES: &[&str] = &[
    "NetworkManager.service",
    "firewalld.service",
    "sshd.service",
    "greenboot-grub2-set-counter",
    "greenboot-grub2-set-success",
    "greenboot-healthcheck",
    "greenboot-rpm-ostree-grub2-check-fallback",
    "greenboot-status",
    "greenboot-task-runner",
    "redboot-auto-reboot",
    "redboot-task-runner",
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
            "dnf", "dosfstools", "e2fsprogs", "glibc", "lorax-templates-generic", "policycoreutils",
            "python3-iniparse", "qemu-img", "selinux-policy-targeted", "systemd", "tar",
            "xfsprogs", "xz",
        ],
        &[],
    )
}

fn ostree_build_package_set(t: &ImageType) -> PackageSet {
    build_package_set(t).append(package_set(&["ostree", "pigz", "rpm-ostree"], &[]))
}

fn installer_build_package_set(t: &ImageType) -> PackageSet {
    let mut set = build_package_set(t).append(package_set(
        &["isomd5sum", "squashfs-tools", "xorriso"],
        &[],
    ));
    if t.arch_name() == X86_64 {
        set = set.append(package_set(&["syslinux", "syslinux-nonlinux"], &[]));
    }
    set
}

/// Packages only present on the subscription-carrying distribution.
fn distro_specific_package_set(t: &ImageType) -> PackageSet {
    if t.distro_name().starts_with("rhel-") {
        return package_set(&["insights-client"], &[]);
    }
    PackageSet::default()
}

fn qcow2_common_package_set(t: &ImageType) -> PackageSet {
    package_set(
        &[
            "@core",
            "chrony",
            "cloud-init",
            "cloud-utils-growpart",
            "cockpit-system",
            "cockpit-ws",
            "dnf-utils",
            "dosfstools",
            "nfs-utils",
            "oddjob",
            "oddjob-mkhomedir",
            "psmisc",
            "python3-jsonschema",
            "qemu-guest-agent",
            "redhat-release",
            "rsync",
            "tar",
            "tuned",
            "tcpdump",
        ],
        &[
            "aic94xx-firmware",
            "alsa-firmware",
            "alsa-lib",
            "alsa-tools-firmware",
            "biosdevname",
            "dnf-plugin-spacewalk",
            "dracut-config-rescue",
            "fedora-release",
            "fedora-repos",
            "firewalld",
            "iprutils",
            "ivtv-firmware",
            "langpacks-*",
            "langpacks-en",
            "libertas-sd8787-firmware",
            "nss",
            "plymouth",
            "rng-tools",
            "udisks2",
        ],
    )
    .append(distro_specific_package_set(t))
}

fn vhd_common_package_set(t: &ImageType) -> PackageSet {
    package_set(
        &["@core", "chrony", "WALinuxAgent", "cloud-init", "cloud-utils-growpart", "gdisk", "hyperv-daemons"],
        &["dracut-config-rescue", "rng-tools"],
    )
    .append(distro_specific_package_set(t))
}

fn openstack_common_package_set(t: &ImageType) -> PackageSet {
    package_set(
        &["@core", "langpacks-en", "cloud-init", "qemu-guest-agent", "spice-vdagent"],
        &["dracut-config-rescue", "rng-tools"],
    )
    .append(distro_specific_package_set(t))
}

fn ec2_common_package_set(t: &ImageType) -> PackageSet {
    package_set(
        &[
            "@core",
            "authselect-compat",
            "chrony",
            "cloud-init",
            "cloud-utils-growpart",
            "dhcp-client",
            "yum-utils",
            "dracut-config-generic",
            "gdisk",
            "grub2",
            "langpacks-en",
            "NetworkManager-cloud-setup",
            "redhat-release",
            "rsync",
            "tuned",
            "tar",
        ],
        &[
            "aic94xx-firmware",
            "alsa-firmware",
            "alsa-tools-firmware",
            "biosdevname",
            "firewalld",
            "iprutils",
            "ivtv-firmware",
            "libertas-sd8787-firmware",
            "plymouth",
            "nss",
        ],
    )
    .append(distro_specific_package_set(t))
}

fn edge_commit_package_set(t: &ImageType) -> PackageSet {
    package_set(
        &[
            "redhat-release",
            "glibc",
            "glibc-minimal-langpack",
            "nss-altfiles",
            "dracut-config-generic",
            "dracut-network",
            "basesystem",
            "bash",
            "platform-python",
            "shadow-utils",
            "chrony",
            "setup",
            "sudo",
            "systemd",
            "coreutils",
            "util-linux",
            "curl",
            "vim-minimal",
            "rpm",
            "rpm-ostree",
            "polkit",
            "lvm2",
            "cryptsetup",
            "pinentry",
            "e2fsprogs",
            "dosfstools",
            "keyutils",
            "gnupg2",
            "attr",
            "xz",
            "gzip",
            "firewalld",
            "iptables",
            "NetworkManager",
            "NetworkManager-wifi",
            "NetworkManager-wwan",
            "wpa_supplicant",
            "traceroute",
            "hostname",
            "iproute",
            "iputils",
            "openssh-clients",
            "procps-ng",
            "rootfiles",
            "openssh-server",
            "passwd",
            "policycoreutils",
            "policycoreutils-python-utils",
            "selinux-policy-targeted",
            "setools-console",
            "less",
            "tar",
            "rsync",
            "usbguard",
            "bash-completion",
            "tmux",
            "ima-evm-utils",
            "audit",
            "podman",
            "containernetworking-plugins",
            "container-selinux",
            "skopeo",
            "criu",
            "slirp4netns",
            "fuse-overlayfs",
            "clevis",
            "clevis-dracut",
            "clevis-luks",
            "greenboot",
            "greenboot-default-health-checks",
            "fdo-client",
            "fdo-owner-cli",
            "sos",
        ],
        &["rng-tools"],
    )
    .append(distro_specific_package_set(t))
}

fn edge_installer_package_set(t: &ImageType) -> PackageSet {
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
    edge_installer_package_set(t)
}

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

fn xfs_partition(size: u64, label: &str, mountpoint: &str) -> Partition {
    Partition {
        start: 0,
        size,
        part_type: LINUX_FS_GUID.to_string(),
        bootable: false,
        uuid: None,
        payload: Some(Payload::Filesystem(Filesystem {
            fs_type: "xfs".to_string(),
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
                xfs_partition(500 * MIB, "boot", "/boot"),
                xfs_partition(2 * GIB, "root", "/"),
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
                xfs_partition(500 * MIB, "boot", "/boot"),
                xfs_partition(2 * GIB, "root", "/"),
            ],
        }),
        PPC64LE => Some(PartitionTable {
            table_type: TableType::Dos,
            size: 0,
            uuid: Some("0x14fc63d2".to_string()),
            sector_size: DEFAULT_SECTOR_SIZE,
            start_offset: MIB,
            partitions: vec![
                Partition {
                    // PReP boot partition
                    start: 0,
                    size: 4 * MIB,
                    part_type: "41".to_string(),
                    bootable: true,
                    uuid: None,
                    payload: None,
                },
                xfs_partition(2 * GIB, "root", "/"),
            ],
        }),
        S390X => Some(PartitionTable {
            table_type: TableType::Dos,
            size: 0,
            uuid: Some("0x14fc63d2".to_string()),
            sector_size: DEFAULT_SECTOR_SIZE,
            start_offset: MIB,
            partitions: vec![{
                let mut root = xfs_partition(2 * GIB, "root", "/");
                root.part_type = "83".to_string();
                root.bootable = true;
                root
            }],
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
        enabled_services: services(&["cloud-init.service", "sshd.service"]),
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
    def.default_size = 10 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into(), "qcow2".into()];
    def.exports = vec!["qcow2".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn oci_image_type() -> ImageTypeDef {
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
        sshd_config: Some(osbuild::SshdConfig {
            password_authentication: Some(false),
            client_alive_interval: Some(180),
            ..Default::default()
        }),
        ..Default::default()
    };
    def.kernel_options =
        "ro console=tty1 console=ttyS0 earlyprintk=ttyS0 rootdelay=300".to_string();
    def.bootable = true;
    def.default_size = 4 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into(), "vpc".into()];
    def.exports = vec!["vpc".into()];
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
        enabled_services: services(&["cloud-init.service"]),
        ..Default::default()
    };
    def.kernel_options = DEFAULT_KERNEL_OPTIONS.to_string();
    def.bootable = true;
    def.default_size = 4 * GIB;
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
        locale: Some("en_US.UTF-8".to_string()),
        default_target: Some("multi-user.target".to_string()),
        enabled_services: services(&[
            "sshd",
            "NetworkManager",
            "nm-cloud-setup.service",
            "nm-cloud-setup.timer",
            "cloud-init",
            "cloud-init-local",
            "cloud-config",
            "cloud-final",
        ]),
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
    def.kernel_options = "console=ttyS0,115200n8 console=tty0 net.ifnames=0 rd.blacklist=nouveau nvme_core.io_timeout=4294967295".to_string();
    def.bootable = true;
    def.default_size = 10 * GIB;
    def.payload_pipelines = vec!["os".into(), "image".into()];
    def.exports = vec!["image".into()];
    def.base_partition_tables = Some(default_base_partition_tables);
    def
}

fn edge_commit_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "edge-commit",
        "commit.tar",
        "application/x-tar",
        images::iot_commit_image,
    );
    def.name_aliases = vec!["rhel-edge-commit".to_string()];
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), ostree_build_package_set as _),
        (OS_PKGS_KEY.to_string(), edge_commit_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        enabled_services: services(EDGE_SERVICES),
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
    def.rpm_ostree = true;
    def.payload_pipelines = vec!["os".into(), "ostree-commit".into(), "commit-archive".into()];
    def.exports = vec!["commit-archive".into()];
    def
}

fn empty_package_set(_t: &ImageType) -> PackageSet {
    PackageSet::default()
}

fn edge_container_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "edge-container",
        "container.tar",
        "application/x-tar",
        images::iot_container_image,
    );
    def.name_aliases = vec!["rhel-edge-container".to_string()];
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), ostree_build_package_set as _),
        (OS_PKGS_KEY.to_string(), edge_commit_package_set as _),
        (CONTAINER_PKGS_KEY.to_string(), empty_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        enabled_services: services(EDGE_SERVICES),
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

fn edge_installer_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "edge-installer",
        "installer.iso",
        "application/x-iso9660-image",
        images::iot_installer_image,
    );
    def.name_aliases = vec!["rhel-edge-installer".to_string()];
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), installer_build_package_set as _),
        (INSTALLER_PKGS_KEY.to_string(), edge_installer_package_set as _),
    ];
    def.default_image_config = ImageConfig {
        locale: Some("en_US.UTF-8".to_string()),
        enabled_services: services(EDGE_SERVICES),
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

fn image_installer_image_type() -> ImageTypeDef {
    let mut def = ImageTypeDef::new(
        "image-installer",
        "installer.iso",
        "application/x-iso9660-image",
        images::image_installer_image,
    );
    def.package_sets = vec![
        (BUILD_PKGS_KEY.to_string(), installer_build_package_set as _),
        (OS_PKGS_KEY.to_string(), qcow2_common_package_set as _),
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

// ---------------------------------------------------------------------------
// Distribution assembly
// ---------------------------------------------------------------------------

pub fn new_centos9() -> Distribution {
    new_distro(9, 0, false)
}

pub fn new_rhel92() -> Distribution {
    new_distro(9, 2, true)
}

fn new_distro(major: u32, minor: u32, rhel: bool) -> Distribution {
    let (name, product, isolabel_tmpl, runner) = if rhel {
        (
            format!("rhel-{major}.{minor}"),
            "Red Hat Enterprise Linux".to_string(),
            format!("RHEL-{major}-{minor}-0-BaseOS-{{arch}}"),
            format!("org.osbuild.rhel{major}{minor}"),
        )
    } else {
        (
            format!("centos-{major}"),
            "CentOS Stream".to_string(),
            format!("CentOS-Stream-{major}-BaseOS-{{arch}}"),
            format!("org.osbuild.centos{major}"),
        )
    };
    let os_version = if rhel {
        format!("{major}.{minor}")
    } else {
        format!("{major}-stream")
    };
    let ostree_name = if rhel { "rhel" } else { "centos" };

    let data = DistroData {
        name,
        product,
        os_version: os_version.clone(),
        release_version: major.to_string(),
        module_platform_id: format!("platform:el{major}"),
        vendor: if rhel { "redhat".to_string() } else { "centos".to_string() },
        ostree_ref_tmpl: Some(format!("{ostree_name}/{major}/{{arch}}/edge")),
        isolabel_tmpl,
        runner,
        default_image_config: ImageConfig {
            timezone: Some("America/New_York".to_string()),
            locale: Some("C.UTF-8".to_string()),
            sshd_config: Some(osbuild::SshdConfig {
                permit_root_login: Some("prohibit-password".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
        oscap_profile_allowlist: vec![
            "xccdf_org.ssgproject.content_profile_anssi_bp28_enhanced".to_string(),
            "xccdf_org.ssgproject.content_profile_cis".to_string(),
            "xccdf_org.ssgproject.content_profile_cui".to_string(),
            "xccdf_org.ssgproject.content_profile_e8".to_string(),
            "xccdf_org.ssgproject.content_profile_hipaa".to_string(),
            "xccdf_org.ssgproject.content_profile_ospp".to_string(),
            "xccdf_org.ssgproject.content_profile_pci-dss".to_string(),
            "xccdf_org.ssgproject.content_profile_stig".to_string(),
        ],
    };
    let mut distro = Distribution::new(data);

    let mut x86_64 = distro.new_arch(X86_64);
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                image_format: ImageFormat::Qcow2,
                ..Default::default()
            },
            bios: true,
            uefi_vendor: None,
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
            uefi_vendor: Some("redhat".to_string()),
        },
        vec![vhd_image_type()],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform {
                image_format: ImageFormat::Raw,
                ..Default::default()
            },
            bios: true,
            uefi_vendor: Some("redhat".to_string()),
        },
        vec![ami_image_type()],
    );
    x86_64.add_image_types(
        &Platform::X86 {
            base: BasePlatform::default(),
            bios: true,
            uefi_vendor: Some("redhat".to_string()),
        },
        vec![
            edge_commit_image_type(),
            edge_container_image_type(),
            edge_installer_image_type(),
            image_installer_image_type(),
        ],
    );

    let mut aarch64 = distro.new_arch(AARCH64);
    aarch64.add_image_types(
        &Platform::Aarch64 {
            base: BasePlatform {
                image_format: ImageFormat::Qcow2,
                ..Default::default()
            },
            uefi_vendor: Some("redhat".to_string()),
        },
        vec![qcow2_image_type(), oci_image_type(), openstack_image_type()],
    );
    aarch64.add_image_types(
        &Platform::Aarch64 {
            base: BasePlatform {
                image_format: ImageFormat::Raw,
                ..Default::default()
            },
            uefi_vendor: Some("redhat".to_string()),
        },
        vec![ami_image_type()],
    );
    aarch64.add_image_types(
        &Platform::Aarch64 {
            base: BasePlatform::default(),
            uefi_vendor: Some("redhat".to_string()),
        },
        vec![
            edge_commit_image_type(),
            edge_container_image_type(),
            edge_installer_image_type(),
            image_installer_image_type(),
        ],
    );

    let mut ppc64le = distro.new_arch(PPC64LE);
    ppc64le.add_image_types(
        &Platform::Ppc64le {
            base: BasePlatform {
                image_format: ImageFormat::Qcow2,
                ..Default::default()
            },
        },
        vec![qcow2_image_type()],
    );

    let mut s390x = distro.new_arch(S390X);
    s390x.add_image_types(
        &Platform::S390x {
            base: BasePlatform {
                image_format: ImageFormat::Qcow2,
                ..Default::default()
            },
            zipl: true,
        },
        vec![qcow2_image_type()],
    );

    distro.add_arches(vec![x86_64, aarch64, ppc64le, s390x]);
    distro
}
