//! Image functions: pick and configure an image kind for one request.
//!
//! These are the `image` closures referenced by the image-type
//! definitions. They are shared between distribution modules; everything
//! distro-specific reaches them through the bound [`ImageType`].

use anyhow::Result;

use rpmmd::PackageSet;

use crate::blueprint::{Customizations, UserCustomization};
use crate::disk;
use crate::fdo;
use crate::image::{
    ContainerImage, ImageInstallerImage, ImageKind, IotCommitImage, IotContainerImage,
    IotInstallerImage, IotRawImage, LiveImage, OvaImage, RemoteCommit,
};
use crate::manifest::{
    InstallerInfo, OsCustomizations, OscapConfig, OscapTailoringConfig, SysconfigSections,
    ROOTFS_IMAGE_SIZE,
};
use crate::workload::Workload;

use super::{
    ImageRequest, ImageType, BUILD_PKGS_KEY, CONTAINER_PKGS_KEY, INSTALLER_PKGS_KEY, OS_PKGS_KEY,
};

/// The image type's OS package set plus everything the platform and boot
/// stack require.
fn base_os_set(t: &ImageType, req: &ImageRequest) -> PackageSet {
    let mut set = req
        .package_sets
        .get(OS_PKGS_KEY)
        .cloned()
        .unwrap_or_default();
    for package in t.platform().packages() {
        if !set.include.contains(&package) {
            set.include.push(package);
        }
    }
    if t.def.bootable || t.def.rpm_ostree {
        let kernel = req
            .customizations
            .kernel()
            .name
            .unwrap_or_else(|| "kernel".to_string());
        if !set.include.contains(&kernel) {
            set.include.push(kernel);
        }
    }
    set
}

fn build_set(t: &ImageType, req: &ImageRequest) -> PackageSet {
    let mut set = req
        .package_sets
        .get(BUILD_PKGS_KEY)
        .cloned()
        .unwrap_or_default();
    for package in t.platform().build_packages() {
        if !set.include.contains(&package) {
            set.include.push(package);
        }
    }
    set
}

fn kernel_cmdline(t: &ImageType, custom: &Customizations) -> Vec<String> {
    let mut opts = Vec::new();
    if !t.def.kernel_options.is_empty() {
        opts.push(t.def.kernel_options.clone());
    }
    let append = custom.kernel().append;
    if !append.is_empty() {
        opts.push(append);
    }
    opts
}

/// Users from the blueprint, with standalone SSH key customizations
/// folded in.
fn users_with_keys(custom: &Customizations) -> Vec<UserCustomization> {
    let mut users = custom.user.clone();
    for sshkey in &custom.sshkey {
        if let Some(user) = users.iter_mut().find(|user| user.name == sshkey.user) {
            user.key = Some(sshkey.key.clone());
        } else {
            users.push(UserCustomization {
                name: sshkey.user.clone(),
                key: Some(sshkey.key.clone()),
                ..Default::default()
            });
        }
    }
    users
}

/// Flatten the image type's effective config and the blueprint
/// customizations into the OS pipeline's record.
fn os_customizations(
    t: &ImageType,
    custom: &Customizations,
    workload: &Workload,
) -> OsCustomizations {
    let config = t.default_image_config();
    let locale = custom.locale.clone().unwrap_or_default();
    let timezone = custom.timezone.clone().unwrap_or_default();

    let mut enabled_services = config.enabled_services.clone();
    enabled_services.extend(workload.enabled_services.iter().cloned());
    let mut disabled_services = config.disabled_services.clone();
    disabled_services.extend(workload.disabled_services.iter().cloned());

    let sysconfig = (config.sysconfig_kernel.is_some() || config.sysconfig_network.is_some()).then(
        || SysconfigSections {
            kernel: config.sysconfig_kernel.clone(),
            network: config.sysconfig_network.clone(),
        },
    );

    OsCustomizations {
        hostname: custom.hostname.clone(),
        language: locale.languages.first().cloned().or(config.locale),
        keyboard: locale.keyboard.or(config.keyboard),
        timezone: timezone.timezone.or(config.timezone),
        ntp_servers: timezone.ntpservers,
        enabled_services,
        disabled_services,
        masked_services: config.masked_services,
        default_target: config.default_target,
        groups: custom.group.clone(),
        users: users_with_keys(custom),
        firewall: custom.firewall.clone(),
        sysconfig,
        journald: config
            .journald
            .map(|dropin| (dropin.filename, dropin.journal)),
        sshd_config: config.sshd_config,
        oscap: custom.openscap.as_ref().map(|oscap| OscapConfig {
            datastream: oscap.datastream.clone(),
            profile_id: oscap.profile_id.clone(),
            tailoring: oscap.tailoring.as_ref().map(|tailoring| OscapTailoringConfig {
                selected: tailoring.selected.clone(),
                unselected: tailoring.unselected.clone(),
            }),
        }),
        directories: custom.directories.clone(),
        files: custom.files.clone(),
        exclude_docs: config.exclude_docs.unwrap_or(false),
        no_selinux: config.no_selinux.unwrap_or(false),
    }
}

fn installer_info(t: &ImageType) -> InstallerInfo {
    let variant = match t.name() {
        name if name.starts_with("iot") => "IoT",
        name if name.starts_with("edge") => "edge",
        _ => "Everything",
    };
    InstallerInfo {
        product: t.product().to_string(),
        os_version: t.os_version().to_string(),
        variant: variant.to_string(),
        isolabel: t.isolabel(),
        arch: t.arch_name().to_string(),
        vendor: t.vendor().to_string(),
    }
}

fn remote_commit(t: &ImageType, req: &ImageRequest) -> RemoteCommit {
    let ostree = &req.options.ostree;
    let commit_ref = if ostree.image_ref.is_empty() {
        t.ostree_ref()
    } else {
        ostree.image_ref.clone()
    };
    RemoteCommit {
        url: ostree.url.clone(),
        checksum: ostree.fetch_checksum.clone(),
        commit_ref,
    }
}

fn osname(t: &ImageType) -> String {
    if t.product() == "Fedora" {
        "fedora-iot".to_string()
    } else {
        "redhat".to_string()
    }
}

pub(super) fn live_image(t: &ImageType, mut req: ImageRequest) -> Result<ImageKind> {
    let pt = t.partition_table(&req.customizations.filesystem, req.options, req.rng)?;
    Ok(ImageKind::Live(Box::new(LiveImage {
        platform: t.platform().clone(),
        customizations: os_customizations(t, req.customizations, req.workload),
        os_packages: base_os_set(t, &req),
        build_packages: build_set(t, &req),
        workload: req.workload.clone(),
        partition_table: pt,
        kernel_options: kernel_cmdline(t, req.customizations),
        filename: t.filename().to_string(),
        xz_compression: t.def.compression.as_deref() == Some("xz"),
    })))
}

pub(super) fn ova_image(t: &ImageType, mut req: ImageRequest) -> Result<ImageKind> {
    let pt = t.partition_table(&req.customizations.filesystem, req.options, req.rng)?;
    let live = LiveImage {
        platform: t.platform().clone(),
        customizations: os_customizations(t, req.customizations, req.workload),
        os_packages: base_os_set(t, &req),
        build_packages: build_set(t, &req),
        workload: req.workload.clone(),
        partition_table: pt,
        kernel_options: kernel_cmdline(t, req.customizations),
        filename: String::new(),
        xz_compression: false,
    };
    Ok(ImageKind::Ova(Box::new(OvaImage {
        live,
        vmdk_filename: "image.vmdk".to_string(),
        filename: t.filename().to_string(),
    })))
}

pub(super) fn container_image(t: &ImageType, req: ImageRequest) -> Result<ImageKind> {
    Ok(ImageKind::Container(Box::new(ContainerImage {
        platform: t.platform().clone(),
        customizations: os_customizations(t, req.customizations, req.workload),
        os_packages: base_os_set(t, &req),
        build_packages: build_set(t, &req),
        workload: req.workload.clone(),
        filename: t.filename().to_string(),
    })))
}

fn iot_commit(t: &ImageType, req: &ImageRequest) -> IotCommitImage {
    let ostree = &req.options.ostree;
    let commit_ref = if ostree.image_ref.is_empty() {
        t.ostree_ref()
    } else {
        ostree.image_ref.clone()
    };
    let parent = (!ostree.fetch_checksum.is_empty() && !ostree.url.is_empty())
        .then(|| ostree.fetch_checksum.clone());
    IotCommitImage {
        platform: t.platform().clone(),
        customizations: os_customizations(t, req.customizations, req.workload),
        os_packages: base_os_set(t, req),
        build_packages: build_set(t, req),
        workload: req.workload.clone(),
        commit_ref,
        parent,
        os_version: t.os_version().to_string(),
        filename: t.filename().to_string(),
        containers: req.containers.to_vec(),
    }
}

pub(super) fn iot_commit_image(t: &ImageType, req: ImageRequest) -> Result<ImageKind> {
    Ok(ImageKind::IotCommit(Box::new(iot_commit(t, &req))))
}

pub(super) fn iot_container_image(t: &ImageType, req: ImageRequest) -> Result<ImageKind> {
    Ok(ImageKind::IotContainer(Box::new(IotContainerImage {
        commit: iot_commit(t, &req),
        container_packages: req
            .package_sets
            .get(CONTAINER_PKGS_KEY)
            .cloned()
            .unwrap_or_default(),
    })))
}

pub(super) fn iot_installer_image(t: &ImageType, mut req: ImageRequest) -> Result<ImageKind> {
    let info = installer_info(t);

    let mut kernel_options = vec![format!("inst.stage2=hd:LABEL={}", info.isolabel)];
    if let Some(fdo_custom) = &req.customizations.fdo {
        kernel_options.extend(fdo::Options::from(fdo_custom).kernel_arguments());
    }
    if let Some(ignition) = &req.customizations.ignition {
        if let Some(firstboot) = &ignition.firstboot {
            kernel_options.push("ignition.firstboot".to_string());
            kernel_options.push(format!("ignition.config.url={}", firstboot.url));
        }
    }

    Ok(ImageKind::IotInstaller(Box::new(IotInstallerImage {
        platform: t.platform().clone(),
        installer_packages: req
            .package_sets
            .get(INSTALLER_PKGS_KEY)
            .cloned()
            .unwrap_or_default(),
        build_packages: build_set(t, &req),
        info,
        commit: remote_commit(t, &req),
        kernel_options,
        users: users_with_keys(req.customizations),
        groups: req.customizations.group.clone(),
        rootfs_uuid: disk::random_uuid(req.rng),
        rootfs_size: ROOTFS_IMAGE_SIZE,
        filename: t.filename().to_string(),
    })))
}

pub(super) fn image_installer_image(t: &ImageType, mut req: ImageRequest) -> Result<ImageKind> {
    let info = installer_info(t);
    Ok(ImageKind::ImageInstaller(Box::new(ImageInstallerImage {
        platform: t.platform().clone(),
        customizations: os_customizations(t, req.customizations, req.workload),
        os_packages: base_os_set(t, &req),
        installer_packages: req
            .package_sets
            .get(INSTALLER_PKGS_KEY)
            .cloned()
            .unwrap_or_default(),
        build_packages: build_set(t, &req),
        workload: req.workload.clone(),
        kernel_options: vec![format!("inst.stage2=hd:LABEL={}", info.isolabel)],
        info,
        rootfs_uuid: disk::random_uuid(req.rng),
        rootfs_size: ROOTFS_IMAGE_SIZE,
        filename: t.filename().to_string(),
    })))
}

pub(super) fn iot_raw_image(t: &ImageType, mut req: ImageRequest) -> Result<ImageKind> {
    let pt = t.partition_table(&[], req.options, req.rng)?;
    let mut kernel_options = Vec::new();
    if !t.def.kernel_options.is_empty() {
        kernel_options.push(t.def.kernel_options.clone());
    }
    Ok(ImageKind::IotRaw(Box::new(IotRawImage {
        platform: t.platform().clone(),
        build_packages: build_set(t, &req),
        commit: remote_commit(t, &req),
        osname: osname(t),
        kernel_options,
        partition_table: pt,
        filename: t.filename().to_string(),
    })))
}
