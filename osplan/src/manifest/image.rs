//! Disk image assembly and encoder pipelines.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::disk::{PartitionTable, Payload};
use crate::osbuild;
use crate::platform::Platform;

use super::Content;

/// Assembles the partitioned raw disk from the OS tree.
pub struct RawImagePipeline {
    pub filename: String,
    pub tree_pipeline: String,
    pub partition_table: PartitionTable,
    pub platform: Platform,
}

impl RawImagePipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("image");
        pipeline.build = Some("name:build".to_string());
        let pt = &self.partition_table;

        pipeline
            .stages
            .push(osbuild::new_truncate_stage(&self.filename, pt.size));

        let whole_disk = |lock: bool| {
            let mut devices = BTreeMap::new();
            devices.insert(
                "device".to_string(),
                osbuild::Device {
                    device_type: "org.osbuild.loopback",
                    parent: None,
                    options: osbuild::DeviceOptions::Loopback {
                        filename: self.filename.clone(),
                        start: 0,
                        size: pt.size / pt.sector_size,
                        lock: lock.then_some(true),
                    },
                },
            );
            devices
        };

        pipeline.stages.push(osbuild::new_sfdisk_stage(
            osbuild::SfdiskStageOptions::from_table(pt),
            whole_disk(true),
        ));

        // one mkfs per filesystem; volume groups get created first
        for part in &pt.partitions {
            let (start, size) = part.sectors(pt.sector_size);
            let part_device = || {
                let mut devices = BTreeMap::new();
                devices.insert(
                    "device".to_string(),
                    osbuild::Device::loopback(&self.filename, start, size),
                );
                devices
            };
            match &part.payload {
                Some(Payload::Filesystem(fs)) => {
                    pipeline.stages.push(osbuild::new_mkfs_stage(
                        &fs.fs_type,
                        fs.uuid.as_deref().unwrap_or_default(),
                        fs.label.clone(),
                        part_device(),
                    ));
                }
                Some(Payload::Lvm(vg)) => {
                    let volumes = vg
                        .logical_volumes
                        .iter()
                        .map(|lv| osbuild::Lvm2Volume {
                            name: lv.name.clone(),
                            size: format!("{}B", lv.size),
                        })
                        .collect();
                    pipeline
                        .stages
                        .push(osbuild::new_lvm2_create_stage(volumes, part_device()));
                    for lv in &vg.logical_volumes {
                        let mut devices = BTreeMap::new();
                        devices.insert(
                            "parent".to_string(),
                            osbuild::Device::loopback(&self.filename, start, size),
                        );
                        devices.insert(
                            "device".to_string(),
                            osbuild::Device::lvm2_lv("parent", &lv.name),
                        );
                        pipeline.stages.push(osbuild::new_mkfs_stage(
                            &lv.payload.fs_type,
                            lv.payload.uuid.as_deref().unwrap_or_default(),
                            lv.payload.label.clone(),
                            devices,
                        ));
                    }
                }
                Some(Payload::Btrfs(btrfs)) => {
                    pipeline.stages.push(osbuild::new_mkfs_stage(
                        "btrfs",
                        btrfs.uuid.as_deref().unwrap_or_default(),
                        btrfs.label.clone(),
                        part_device(),
                    ));
                }
                None => {}
            }
        }

        // copy the tree onto the mounted filesystems
        let mut devices = whole_disk(false);
        for part in &pt.partitions {
            if let Some(Payload::Lvm(vg)) = &part.payload {
                for lv in &vg.logical_volumes {
                    devices.insert(
                        lv.name.clone(),
                        osbuild::Device::lvm2_lv("device", &lv.name),
                    );
                }
            }
        }
        let mut copy =
            osbuild::new_copy_tree_stage(&self.tree_pipeline, "mount://root/").with_devices(devices);
        copy.mounts = Some(mounts_for(pt));
        pipeline.stages.push(copy);

        if let Some(platform) = self.platform.bios_platform() {
            if platform == "i386-pc" {
                if let Some((number, part)) = boot_partition(pt) {
                    pipeline.stages.push(osbuild::new_grub2_inst_stage(
                        &self.filename,
                        pt,
                        (number, part),
                    ));
                }
            }
        }

        Ok(pipeline)
    }
}

/// Mounts for every filesystem, parents before children, root named
/// `root` so copy targets can address `mount://root/`.
fn mounts_for(pt: &PartitionTable) -> Vec<osbuild::Mount> {
    let mut mounts = Vec::new();
    let mut spec: Vec<(String, String, Option<u64>, Option<String>)> = Vec::new();
    for (idx, part) in pt.partitions.iter().enumerate() {
        match &part.payload {
            Some(Payload::Filesystem(fs)) if !fs.mountpoint.is_empty() => {
                spec.push((
                    fs.mountpoint.clone(),
                    fs.fs_type.clone(),
                    Some(idx as u64 + 1),
                    None,
                ));
            }
            Some(Payload::Lvm(vg)) => {
                for lv in &vg.logical_volumes {
                    spec.push((
                        lv.payload.mountpoint.clone(),
                        lv.payload.fs_type.clone(),
                        None,
                        Some(lv.name.clone()),
                    ));
                }
            }
            Some(Payload::Btrfs(btrfs)) => {
                for subvolume in &btrfs.subvolumes {
                    spec.push((
                        subvolume.mountpoint.clone(),
                        "btrfs".to_string(),
                        Some(idx as u64 + 1),
                        None,
                    ));
                }
            }
            _ => {}
        }
    }
    spec.sort_by_key(|(mountpoint, ..)| (mountpoint.matches('/').count(), mountpoint.clone()));

    for (mountpoint, fs_type, partition, lv) in spec {
        let name = if mountpoint == "/" {
            "root".to_string()
        } else {
            mountpoint.trim_matches('/').replace('/', "-")
        };
        // logical volumes mount via their own device, plain filesystems
        // via a partition number on the disk device
        let source = lv.as_deref().unwrap_or("device");
        let mut mount = osbuild::Mount::new(&name, &fs_type, source, &mountpoint);
        mount.partition = partition;
        mounts.push(mount);
    }
    mounts
}

/// The partition grub2 reads its second-stage config from: /boot when
/// present, / otherwise. 1-based.
fn boot_partition(pt: &PartitionTable) -> Option<(usize, &crate::disk::Partition)> {
    let want = if pt.find_mountpoint("/boot").is_some() {
        "/boot"
    } else {
        "/"
    };
    pt.partitions.iter().enumerate().find_map(|(idx, part)| {
        matches!(
            &part.payload,
            Some(Payload::Filesystem(fs)) if fs.mountpoint == want
        )
        .then_some((idx + 1, part))
    })
}

/// Converts the raw disk with qemu-img.
pub struct QemuEncoderPipeline {
    pub name: String,
    pub filename: String,
    pub format: osbuild::QemuFormat,
    pub source_pipeline: String,
    pub source_file: String,
}

impl QemuEncoderPipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new(self.name.clone());
        pipeline.build = Some("name:build".to_string());
        pipeline.stages.push(osbuild::new_qemu_stage(
            &self.filename,
            self.format.clone(),
            &self.source_pipeline,
            &self.source_file,
        ));
        Ok(pipeline)
    }
}

pub struct XzPipeline {
    pub filename: String,
    pub source_pipeline: String,
    pub source_file: String,
}

impl XzPipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("xz");
        pipeline.build = Some("name:build".to_string());
        pipeline.stages.push(osbuild::new_xz_stage(
            &self.filename,
            &self.source_pipeline,
            &self.source_file,
        ));
        Ok(pipeline)
    }
}

/// Tars up another pipeline's tree.
pub struct ArchivePipeline {
    pub name: String,
    pub filename: String,
    pub tree_pipeline: String,
}

impl ArchivePipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new(self.name.clone());
        pipeline.build = Some("name:build".to_string());
        pipeline
            .stages
            .push(osbuild::new_tar_stage(&self.filename, &self.tree_pipeline));
        Ok(pipeline)
    }
}

pub struct OvfPipeline {
    pub vmdk_pipeline: String,
    pub vmdk_filename: String,
}

impl OvfPipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("ovf");
        pipeline.build = Some("name:build".to_string());
        pipeline.stages.push(osbuild::new_ovf_stage(
            &self.vmdk_filename,
            &self.vmdk_pipeline,
        ));
        Ok(pipeline)
    }
}
