//! Disk assembly and bootloader stages.

use serde::Serialize;

use crate::disk::{Partition, PartitionTable, TableType};

use super::{Stage, StageOptions};

#[derive(Debug, Serialize)]
pub struct SfdiskStageOptions {
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub partitions: Vec<SfdiskPartition>,
}

#[derive(Debug, Serialize)]
pub struct SfdiskPartition {
    /// Offset in sectors.
    pub start: u64,
    /// Size in sectors.
    pub size: u64,
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl SfdiskStageOptions {
    pub fn from_table(pt: &PartitionTable) -> SfdiskStageOptions {
        SfdiskStageOptions {
            label: pt.table_type.as_str(),
            uuid: pt.uuid.clone(),
            partitions: pt
                .partitions
                .iter()
                .map(|part| {
                    let (start, size) = part.sectors(pt.sector_size);
                    SfdiskPartition {
                        start,
                        size,
                        part_type: part.part_type.clone(),
                        bootable: part.bootable.then_some(true),
                        uuid: if pt.table_type == TableType::Gpt {
                            part.uuid.clone()
                        } else {
                            None
                        },
                    }
                })
                .collect(),
        }
    }
}

/// Partition a (loopback-mounted) image file.
pub fn new_sfdisk_stage(
    options: SfdiskStageOptions,
    devices: std::collections::BTreeMap<String, super::Device>,
) -> Stage {
    Stage::new("org.osbuild.sfdisk", StageOptions::Sfdisk(options)).with_devices(devices)
}

#[derive(Debug, Default, Serialize)]
pub struct MkfsExt4StageOptions {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct MkfsXfsStageOptions {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct MkfsFatStageOptions {
    /// VFAT volume id, hex without the conventional dash.
    pub volid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct MkfsBtrfsStageOptions {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Make a filesystem on a device; the stage type is picked from the
/// filesystem type of the payload.
pub fn new_mkfs_stage(
    fs_type: &str,
    uuid: &str,
    label: Option<String>,
    devices: std::collections::BTreeMap<String, super::Device>,
) -> Stage {
    let (stage_type, options) = match fs_type {
        "ext4" => (
            "org.osbuild.mkfs.ext4",
            StageOptions::MkfsExt4(MkfsExt4StageOptions {
                uuid: uuid.to_string(),
                label,
            }),
        ),
        "xfs" => (
            "org.osbuild.mkfs.xfs",
            StageOptions::MkfsXfs(MkfsXfsStageOptions {
                uuid: uuid.to_string(),
                label,
            }),
        ),
        "vfat" => (
            "org.osbuild.mkfs.fat",
            StageOptions::MkfsFat(MkfsFatStageOptions {
                volid: uuid.replace('-', ""),
                label,
            }),
        ),
        "btrfs" => (
            "org.osbuild.mkfs.btrfs",
            StageOptions::MkfsBtrfs(MkfsBtrfsStageOptions {
                uuid: uuid.to_string(),
                label,
            }),
        ),
        other => panic!("no mkfs stage for filesystem type {other:?}"),
    };
    Stage::new(stage_type, options).with_devices(devices)
}

#[derive(Debug, Default, Serialize)]
pub struct Lvm2CreateStageOptions {
    pub volumes: Vec<Lvm2Volume>,
}

#[derive(Debug, Serialize)]
pub struct Lvm2Volume {
    pub name: String,
    /// Size with unit suffix, e.g. `2048M`.
    pub size: String,
}

pub fn new_lvm2_create_stage(
    volumes: Vec<Lvm2Volume>,
    devices: std::collections::BTreeMap<String, super::Device>,
) -> Stage {
    Stage::new(
        "org.osbuild.lvm2.create",
        StageOptions::Lvm2Create(Lvm2CreateStageOptions { volumes }),
    )
    .with_devices(devices)
}

#[derive(Debug, Default, Serialize)]
pub struct FstabStageOptions {
    pub filesystems: Vec<FstabEntryOptions>,
}

#[derive(Debug, Serialize)]
pub struct FstabEntryOptions {
    pub uuid: String,
    pub path: String,
    pub vfs_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    pub freq: u64,
    pub passno: u64,
}

pub fn new_fstab_stage(pt: &PartitionTable) -> Stage {
    let filesystems = pt
        .fstab_entries()
        .into_iter()
        .map(|entry| FstabEntryOptions {
            uuid: entry.uuid,
            path: entry.path,
            vfs_type: entry.vfs_type,
            options: (!entry.options.is_empty()).then_some(entry.options),
            freq: entry.freq,
            passno: entry.passno,
        })
        .collect();
    Stage::new(
        "org.osbuild.fstab",
        StageOptions::Fstab(FstabStageOptions { filesystems }),
    )
}

/// grub2 configuration in the OS tree.
#[derive(Debug, Default, Serialize)]
pub struct Grub2StageOptions {
    pub root_fs_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_fs_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_opts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uefi: Option<Grub2Uefi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_defaults: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct Grub2Uefi {
    pub vendor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unified: Option<bool>,
}

pub fn new_grub2_stage(options: Grub2StageOptions) -> Stage {
    Stage::new("org.osbuild.grub2", StageOptions::Grub2(options))
}

/// s390x bootloader configuration.
#[derive(Debug, Default, Serialize)]
pub struct ZiplStageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

pub fn new_zipl_stage() -> Stage {
    Stage::new(
        "org.osbuild.zipl",
        StageOptions::Zipl(ZiplStageOptions::default()),
    )
}

/// Install the BIOS boot code into the image file.
#[derive(Debug, Serialize)]
pub struct Grub2InstStageOptions {
    pub filename: String,
    pub platform: String,
    /// Core image location, in sectors.
    pub location: u64,
    pub core: Grub2Core,
    pub prefix: Grub2Prefix,
}

#[derive(Debug, Serialize)]
pub struct Grub2Core {
    #[serde(rename = "type")]
    pub core_type: &'static str,
    pub partlabel: String,
    pub filesystem: String,
}

#[derive(Debug, Serialize)]
pub struct Grub2Prefix {
    #[serde(rename = "type")]
    pub prefix_type: &'static str,
    pub partlabel: String,
    pub number: u64,
    pub path: String,
}

pub fn new_grub2_inst_stage(
    filename: &str,
    pt: &PartitionTable,
    boot_partition: (usize, &Partition),
) -> Stage {
    let (number, partition) = boot_partition;
    let filesystem = match &partition.payload {
        Some(crate::disk::Payload::Filesystem(fs)) => fs.fs_type.clone(),
        _ => "ext4".to_string(),
    };
    Stage::new(
        "org.osbuild.grub2.inst",
        StageOptions::Grub2Inst(Grub2InstStageOptions {
            filename: filename.to_string(),
            platform: "i386-pc".to_string(),
            location: pt.start_offset / pt.sector_size,
            core: Grub2Core {
                core_type: "mkimage",
                partlabel: pt.table_type.as_str().to_string(),
                filesystem,
            },
            prefix: Grub2Prefix {
                prefix_type: "partition",
                partlabel: pt.table_type.as_str().to_string(),
                number: number as u64,
                path: "/boot/grub2".to_string(),
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{Filesystem, Payload, DEFAULT_SECTOR_SIZE, MIB};

    fn table() -> PartitionTable {
        PartitionTable {
            table_type: TableType::Gpt,
            size: 10 * MIB,
            uuid: Some("d209c89e-ea5e-4fbd-b161-b461cce297e0".into()),
            sector_size: DEFAULT_SECTOR_SIZE,
            start_offset: MIB,
            partitions: vec![Partition {
                start: MIB,
                size: 9 * MIB,
                part_type: crate::disk::LINUX_FS_GUID.into(),
                bootable: false,
                uuid: Some("6264d520-3fb9-423f-8ab8-7a0a8e3d3562".into()),
                payload: Some(Payload::Filesystem(Filesystem {
                    fs_type: "ext4".into(),
                    uuid: Some("0bd700f8-090f-4556-b797-b340297ea563".into()),
                    label: Some("root".into()),
                    mountpoint: "/".into(),
                    fstab_options: "defaults".into(),
                    fstab_freq: 0,
                    fstab_passno: 0,
                })),
            }],
        }
    }

    #[test]
    fn sfdisk_options_use_sectors() {
        let options = SfdiskStageOptions::from_table(&table());
        assert_eq!(options.label, "gpt");
        assert_eq!(options.partitions[0].start, 2048);
        assert_eq!(options.partitions[0].size, 9 * 2048);
    }

    #[test]
    fn fstab_stage_lists_root() {
        let value = serde_json::to_value(new_fstab_stage(&table())).unwrap();
        assert_eq!(value["options"]["filesystems"][0]["path"], "/");
        assert_eq!(value["options"]["filesystems"][0]["vfs_type"], "ext4");
    }

    #[test]
    fn vfat_volid_drops_dash() {
        let stage = new_mkfs_stage("vfat", "7B77-95E7", None, Default::default());
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["type"], "org.osbuild.mkfs.fat");
        assert_eq!(value["options"]["volid"], "7B7795E7");
    }
}
