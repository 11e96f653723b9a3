//! Disk layouts.
//!
//! A [`PartitionTable`] is the complete description of a disk image:
//! table type, sector size, and an ordered list of partitions whose
//! payloads are plain filesystems, an LVM volume group, or a btrfs
//! volume. Image types carry per-architecture base tables; a request
//! clones the base, folds in custom mountpoints, and lays the result out
//! to the requested image size. All UUIDs and labels that are not fixed
//! by the base table are drawn from the caller's RNG, so layouts are
//! reproducible for a given seed.

use anyhow::{bail, Result};
use rand::Rng;
use uuid::Uuid;

use crate::blueprint::FilesystemCustomization;
use crate::pathpolicy;

pub const MIB: u64 = 1024 * 1024;
pub const GIB: u64 = 1024 * MIB;

pub const DEFAULT_SECTOR_SIZE: u64 = 512;

/// Space reserved at the end of a GPT disk for the backup header.
const GPT_FOOTER: u64 = 33 * DEFAULT_SECTOR_SIZE;

/// GPT partition type for Linux filesystem data.
pub const LINUX_FS_GUID: &str = "0FC63DAF-8483-4772-8E79-3D69D8477DE4";
/// GPT partition type for the EFI system partition.
pub const EFI_SYSTEM_GUID: &str = "C12A7328-F81F-11D2-BA4B-00A0C93EC93B";
/// GPT partition type for the BIOS boot partition.
pub const BIOS_BOOT_GUID: &str = "21686148-6449-6E6F-744E-656564454649";
/// GPT partition type for an LVM physical volume.
pub const LVM_GUID: &str = "E6D6D379-F507-44C2-A23C-238F2A3DF928";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    Gpt,
    Dos,
    Dasd,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Gpt => "gpt",
            TableType::Dos => "dos",
            TableType::Dasd => "dasd",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PartitionTable {
    pub table_type: TableType,
    /// Total disk size in bytes; set by layout.
    pub size: u64,
    pub uuid: Option<String>,
    pub sector_size: u64,
    /// Offset of the first partition, in bytes.
    pub start_offset: u64,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone)]
pub struct Partition {
    /// Byte offset on disk; set by layout.
    pub start: u64,
    pub size: u64,
    /// GPT type GUID or dos type id.
    pub part_type: String,
    pub bootable: bool,
    pub uuid: Option<String>,
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone)]
pub enum Payload {
    Filesystem(Filesystem),
    Lvm(LvmVolumeGroup),
    Btrfs(Btrfs),
}

#[derive(Debug, Clone)]
pub struct Filesystem {
    /// ext4, xfs, vfat, btrfs, or swap.
    pub fs_type: String,
    pub uuid: Option<String>,
    pub label: Option<String>,
    pub mountpoint: String,
    pub fstab_options: String,
    pub fstab_freq: u64,
    pub fstab_passno: u64,
}

#[derive(Debug, Clone)]
pub struct LvmVolumeGroup {
    pub name: String,
    pub description: String,
    pub logical_volumes: Vec<LvmLogicalVolume>,
}

#[derive(Debug, Clone)]
pub struct LvmLogicalVolume {
    pub name: String,
    pub size: u64,
    pub payload: Filesystem,
}

#[derive(Debug, Clone)]
pub struct Btrfs {
    pub uuid: Option<String>,
    pub label: Option<String>,
    pub subvolumes: Vec<BtrfsSubvolume>,
}

#[derive(Debug, Clone)]
pub struct BtrfsSubvolume {
    pub name: String,
    pub mountpoint: String,
}

/// An fstab entry derived from the table, in mount order.
#[derive(Debug, Clone, PartialEq)]
pub struct FstabEntry {
    pub uuid: String,
    pub path: String,
    pub vfs_type: String,
    pub options: String,
    pub freq: u64,
    pub passno: u64,
}

impl PartitionTable {
    /// Clone a base table and customize it for one request.
    ///
    /// Custom `mountpoints` are validated against the mountpoint policy
    /// and either grow an existing filesystem or add a new one. With
    /// `lvmify`, the root filesystem is wrapped into an LVM volume group
    /// and new mountpoints become logical volumes. `required_sizes` maps
    /// mountpoints to minimum sizes applied after customization; `None`
    /// uses the built-in defaults, `Some(empty)` disables them so the
    /// base table's own sizes win.
    pub fn new_customized(
        base: &PartitionTable,
        mountpoints: &[FilesystemCustomization],
        image_size: u64,
        lvmify: bool,
        required_sizes: Option<&[(&str, u64)]>,
        rng: &mut impl Rng,
    ) -> Result<PartitionTable> {
        let mut table = base.clone();

        let policy = pathpolicy::mountpoint_policies();
        for custom in mountpoints {
            policy.check(&custom.mountpoint)?;
        }

        if lvmify && !mountpoints.is_empty() {
            table.ensure_lvm()?;
        }

        for custom in mountpoints {
            if table.grow_mountpoint(&custom.mountpoint, custom.minsize) {
                continue;
            }
            table.add_mountpoint(&custom.mountpoint, custom.minsize)?;
        }

        let defaults: &[(&str, u64)] = &[("/", GIB), ("/usr", 2 * GIB)];
        for (mountpoint, size) in required_sizes.unwrap_or(defaults) {
            table.grow_mountpoint(mountpoint, *size);
        }

        table.generate_uuids(rng);
        table.relayout(image_size)?;
        Ok(table)
    }

    /// Find the partition holding the root filesystem.
    fn root_partition_index(&self) -> Option<usize> {
        self.partitions.iter().position(|part| {
            part.mountpoints().iter().any(|mp| *mp == "/")
        })
    }

    /// Wrap the root filesystem into an LVM volume group so additional
    /// mountpoints can be created as logical volumes.
    fn ensure_lvm(&mut self) -> Result<()> {
        let idx = match self.root_partition_index() {
            Some(idx) => idx,
            None => bail!("partition table has no root filesystem"),
        };
        let part = &mut self.partitions[idx];
        match part.payload.take() {
            Some(Payload::Filesystem(fs)) => {
                part.payload = Some(Payload::Lvm(LvmVolumeGroup {
                    name: "rootvg".to_string(),
                    description: "created via lvm2 and osbuild".to_string(),
                    logical_volumes: vec![LvmLogicalVolume {
                        name: "rootlv".to_string(),
                        size: part.size,
                        payload: fs,
                    }],
                }));
                if self.table_type == TableType::Gpt {
                    part.part_type = LVM_GUID.to_string();
                }
                Ok(())
            }
            other => {
                // already LVM or btrfs; nothing to wrap
                part.payload = other;
                Ok(())
            }
        }
    }

    /// Grow the entity holding `mountpoint` to at least `size`.
    /// Returns false when no filesystem with that mountpoint exists.
    fn grow_mountpoint(&mut self, mountpoint: &str, size: u64) -> bool {
        for part in &mut self.partitions {
            match &mut part.payload {
                Some(Payload::Filesystem(fs)) if fs.mountpoint == mountpoint => {
                    part.size = part.size.max(size);
                    return true;
                }
                Some(Payload::Lvm(vg)) => {
                    for lv in &mut vg.logical_volumes {
                        if lv.payload.mountpoint == mountpoint {
                            lv.size = lv.size.max(align_up(size, 4 * MIB));
                            return true;
                        }
                    }
                }
                Some(Payload::Btrfs(btrfs)) => {
                    if btrfs.subvolumes.iter().any(|sv| sv.mountpoint == mountpoint) {
                        part.size = part.size.max(size);
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Add a new mountpoint: a logical volume when the table has a volume
    /// group, otherwise a new partition at the end of the table.
    fn add_mountpoint(&mut self, mountpoint: &str, size: u64) -> Result<()> {
        let size = size.max(128 * MIB);
        let fs = Filesystem {
            fs_type: "xfs".to_string(),
            uuid: None,
            label: None,
            mountpoint: mountpoint.to_string(),
            fstab_options: "defaults".to_string(),
            fstab_freq: 0,
            fstab_passno: 0,
        };

        for part in &mut self.partitions {
            if let Some(Payload::Lvm(vg)) = &mut part.payload {
                let name = lv_name_for(mountpoint);
                if vg.logical_volumes.iter().any(|lv| lv.name == name) {
                    bail!("duplicate mountpoint {mountpoint:?}");
                }
                vg.logical_volumes.push(LvmLogicalVolume {
                    name,
                    size: align_up(size, 4 * MIB),
                    payload: fs,
                });
                return Ok(());
            }
        }

        if self.table_type == TableType::Dos && self.partitions.len() >= 4 {
            bail!("dos partition table is full, cannot add mountpoint {mountpoint:?}");
        }
        self.partitions.push(Partition {
            start: 0,
            size,
            part_type: match self.table_type {
                TableType::Gpt => LINUX_FS_GUID.to_string(),
                _ => "83".to_string(),
            },
            bootable: false,
            uuid: None,
            payload: Some(Payload::Filesystem(fs)),
        });
        Ok(())
    }

    /// Fill in every missing UUID and label from the RNG.
    fn generate_uuids(&mut self, rng: &mut impl Rng) {
        if self.uuid.is_none() {
            self.uuid = Some(random_uuid(rng));
        }
        for part in &mut self.partitions {
            if part.uuid.is_none() && self.table_type == TableType::Gpt {
                part.uuid = Some(random_uuid(rng));
            }
            match &mut part.payload {
                Some(Payload::Filesystem(fs)) => fill_fs_uuid(fs, rng),
                Some(Payload::Lvm(vg)) => {
                    for lv in &mut vg.logical_volumes {
                        fill_fs_uuid(&mut lv.payload, rng);
                    }
                }
                Some(Payload::Btrfs(btrfs)) => {
                    if btrfs.uuid.is_none() {
                        btrfs.uuid = Some(random_uuid(rng));
                    }
                }
                None => {}
            }
        }
    }

    /// Assign partition offsets and grow the root entity to fill the
    /// requested image size.
    fn relayout(&mut self, image_size: u64) -> Result<()> {
        if self.partitions.is_empty() {
            bail!("partition table has no partitions");
        }

        // volume group partitions must hold their logical volumes
        for part in &mut self.partitions {
            if let Some(Payload::Lvm(vg)) = &part.payload {
                let needed: u64 = vg.logical_volumes.iter().map(|lv| lv.size).sum();
                part.size = part.size.max(needed + MIB);
            }
        }

        let root_idx = self
            .root_partition_index()
            .unwrap_or(self.partitions.len() - 1);

        let footer = if self.table_type == TableType::Gpt {
            align_up(GPT_FOOTER, MIB)
        } else {
            0
        };
        let fixed: u64 = self
            .partitions
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != root_idx)
            .map(|(_, part)| align_up(part.size, MIB))
            .sum();

        let image_size = image_size.max(self.start_offset + fixed + footer + MIB);
        let root_space = image_size - self.start_offset - fixed - footer;
        let root = &mut self.partitions[root_idx];
        root.size = root.size.max(root_space);
        if let Some(Payload::Lvm(vg)) = &mut root.payload {
            // grow the root LV into the extra space
            let used: u64 = vg.logical_volumes.iter().map(|lv| lv.size).sum();
            let spare = root.size.saturating_sub(used + MIB);
            if let Some(lv) = vg
                .logical_volumes
                .iter_mut()
                .find(|lv| lv.payload.mountpoint == "/")
            {
                lv.size += align_down(spare, 4 * MIB);
            }
        }

        let mut offset = self.start_offset;
        for part in &mut self.partitions {
            part.size = align_up(part.size, MIB);
            part.start = offset;
            offset += part.size;
        }
        self.size = offset + footer;
        Ok(())
    }

    /// All filesystems in the table, logical volumes included.
    pub fn filesystems(&self) -> Vec<&Filesystem> {
        let mut result = Vec::new();
        for part in &self.partitions {
            match &part.payload {
                Some(Payload::Filesystem(fs)) => result.push(fs),
                Some(Payload::Lvm(vg)) => {
                    result.extend(vg.logical_volumes.iter().map(|lv| &lv.payload))
                }
                _ => {}
            }
        }
        result
    }

    pub fn find_mountpoint(&self, mountpoint: &str) -> Option<&Filesystem> {
        self.filesystems()
            .into_iter()
            .find(|fs| fs.mountpoint == mountpoint)
    }

    /// fstab entries sorted by mountpoint depth, so parents mount first.
    pub fn fstab_entries(&self) -> Vec<FstabEntry> {
        let mut entries: Vec<FstabEntry> = self
            .filesystems()
            .into_iter()
            .filter(|fs| !fs.mountpoint.is_empty() && fs.fs_type != "swap")
            .map(|fs| FstabEntry {
                uuid: fs.uuid.clone().unwrap_or_default(),
                path: fs.mountpoint.clone(),
                vfs_type: fs.fs_type.clone(),
                options: fs.fstab_options.clone(),
                freq: fs.fstab_freq,
                passno: fs.fstab_passno,
            })
            .collect();
        entries.sort_by_key(|e| (e.path.matches('/').count(), e.path.clone()));
        entries
    }
}

impl Partition {
    fn mountpoints(&self) -> Vec<&str> {
        match &self.payload {
            Some(Payload::Filesystem(fs)) => vec![fs.mountpoint.as_str()],
            Some(Payload::Lvm(vg)) => vg
                .logical_volumes
                .iter()
                .map(|lv| lv.payload.mountpoint.as_str())
                .collect(),
            Some(Payload::Btrfs(btrfs)) => btrfs
                .subvolumes
                .iter()
                .map(|sv| sv.mountpoint.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Offset and size in sectors, as the partitioning stage wants them.
    pub fn sectors(&self, sector_size: u64) -> (u64, u64) {
        (self.start / sector_size, self.size / sector_size)
    }
}

fn fill_fs_uuid(fs: &mut Filesystem, rng: &mut impl Rng) {
    if fs.uuid.is_some() {
        return;
    }
    fs.uuid = Some(if fs.fs_type == "vfat" {
        // VFAT volume ids are 32 bits, conventionally XXXX-XXXX
        let id: u32 = rng.gen();
        format!("{:04X}-{:04X}", id >> 16, id & 0xffff)
    } else {
        random_uuid(rng)
    });
}

pub(crate) fn random_uuid(rng: &mut impl Rng) -> String {
    let bytes: [u8; 16] = rng.gen();
    Uuid::from_bytes(bytes).hyphenated().to_string()
}

fn lv_name_for(mountpoint: &str) -> String {
    if mountpoint == "/" {
        return "rootlv".to_string();
    }
    format!("{}lv", mountpoint.trim_matches('/').replace('/', "_"))
}

fn align_up(value: u64, to: u64) -> u64 {
    value.div_ceil(to) * to
}

fn align_down(value: u64, to: u64) -> u64 {
    value / to * to
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn base_table() -> PartitionTable {
        PartitionTable {
            table_type: TableType::Gpt,
            size: 0,
            uuid: None,
            sector_size: DEFAULT_SECTOR_SIZE,
            start_offset: MIB,
            partitions: vec![
                Partition {
                    start: 0,
                    size: 200 * MIB,
                    part_type: EFI_SYSTEM_GUID.into(),
                    bootable: false,
                    uuid: None,
                    payload: Some(Payload::Filesystem(Filesystem {
                        fs_type: "vfat".into(),
                        uuid: None,
                        label: Some("EFI-SYSTEM".into()),
                        mountpoint: "/boot/efi".into(),
                        fstab_options: "defaults,uid=0,gid=0,umask=077,shortname=winnt".into(),
                        fstab_freq: 0,
                        fstab_passno: 2,
                    })),
                },
                Partition {
                    start: 0,
                    size: 500 * MIB,
                    part_type: LINUX_FS_GUID.into(),
                    bootable: false,
                    uuid: None,
                    payload: Some(Payload::Filesystem(Filesystem {
                        fs_type: "ext4".into(),
                        uuid: None,
                        label: Some("boot".into()),
                        mountpoint: "/boot".into(),
                        fstab_options: "defaults".into(),
                        fstab_freq: 0,
                        fstab_passno: 0,
                    })),
                },
                Partition {
                    start: 0,
                    size: GIB,
                    part_type: LINUX_FS_GUID.into(),
                    bootable: false,
                    uuid: None,
                    payload: Some(Payload::Filesystem(Filesystem {
                        fs_type: "ext4".into(),
                        uuid: None,
                        label: Some("root".into()),
                        mountpoint: "/".into(),
                        fstab_options: "defaults".into(),
                        fstab_freq: 0,
                        fstab_passno: 0,
                    })),
                },
            ],
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn layout_fills_image_size() {
        let table =
            PartitionTable::new_customized(&base_table(), &[], 4 * GIB, false, None, &mut rng())
                .unwrap();
        assert_eq!(table.size % MIB, 0);
        assert!(table.size >= 4 * GIB);
        let root = table.find_mountpoint("/").unwrap();
        assert!(root.uuid.is_some());
        // root got the remaining space
        let root_part = table.partitions.last().unwrap();
        assert!(root_part.size > 3 * GIB);
    }

    #[test]
    fn partitions_do_not_overlap() {
        let table =
            PartitionTable::new_customized(&base_table(), &[], 4 * GIB, false, None, &mut rng())
                .unwrap();
        let mut last_end = 0;
        for part in &table.partitions {
            assert!(part.start >= last_end);
            last_end = part.start + part.size;
        }
        assert!(last_end <= table.size);
    }

    #[test]
    fn identical_seeds_produce_identical_uuids() {
        let a = PartitionTable::new_customized(&base_table(), &[], 2 * GIB, false, None, &mut rng())
            .unwrap();
        let b = PartitionTable::new_customized(&base_table(), &[], 2 * GIB, false, None, &mut rng())
            .unwrap();
        assert_eq!(a.uuid, b.uuid);
        assert_eq!(
            a.find_mountpoint("/").unwrap().uuid,
            b.find_mountpoint("/").unwrap().uuid
        );
    }

    #[test]
    fn vfat_uuid_is_a_volume_id() {
        let table =
            PartitionTable::new_customized(&base_table(), &[], 2 * GIB, false, None, &mut rng())
                .unwrap();
        let efi = table.find_mountpoint("/boot/efi").unwrap();
        let uuid = efi.uuid.as_ref().unwrap();
        assert_eq!(uuid.len(), 9);
        assert_eq!(uuid.as_bytes()[4], b'-');
    }

    #[test]
    fn custom_mountpoint_becomes_logical_volume_with_lvmify() {
        let mountpoints = vec![FilesystemCustomization {
            mountpoint: "/var/lib/data".into(),
            minsize: GIB,
        }];
        let table = PartitionTable::new_customized(
            &base_table(),
            &mountpoints,
            6 * GIB,
            true,
            None,
            &mut rng(),
        )
        .unwrap();

        let root_part = table
            .partitions
            .iter()
            .find(|p| matches!(p.payload, Some(Payload::Lvm(_))))
            .expect("root was wrapped into LVM");
        if let Some(Payload::Lvm(vg)) = &root_part.payload {
            assert_eq!(vg.name, "rootvg");
            assert!(vg.logical_volumes.iter().any(|lv| lv.name == "rootlv"));
            let data = vg
                .logical_volumes
                .iter()
                .find(|lv| lv.payload.mountpoint == "/var/lib/data")
                .expect("custom LV exists");
            assert!(data.size >= GIB);
        }
        assert!(table.find_mountpoint("/var/lib/data").is_some());
    }

    #[test]
    fn custom_mountpoint_without_lvmify_appends_partition() {
        let mountpoints = vec![FilesystemCustomization {
            mountpoint: "/srv".into(),
            minsize: 512 * MIB,
        }];
        let table = PartitionTable::new_customized(
            &base_table(),
            &mountpoints,
            6 * GIB,
            false,
            None,
            &mut rng(),
        )
        .unwrap();
        assert_eq!(table.partitions.len(), 4);
        assert!(table.find_mountpoint("/srv").is_some());
    }

    #[test]
    fn denied_mountpoint_is_rejected() {
        let mountpoints = vec![FilesystemCustomization {
            mountpoint: "/boot/efi".into(),
            minsize: MIB,
        }];
        let err = PartitionTable::new_customized(
            &base_table(),
            &mountpoints,
            4 * GIB,
            false,
            None,
            &mut rng(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("/boot/efi"));
    }

    #[test]
    fn growing_an_existing_mountpoint_keeps_partition_count() {
        let mountpoints = vec![FilesystemCustomization {
            mountpoint: "/boot".into(),
            minsize: GIB,
        }];
        let table = PartitionTable::new_customized(
            &base_table(),
            &mountpoints,
            6 * GIB,
            false,
            None,
            &mut rng(),
        )
        .unwrap();
        assert_eq!(table.partitions.len(), 3);
        let boot = table
            .partitions
            .iter()
            .find(|p| p.mountpoints() == vec!["/boot"])
            .unwrap();
        assert!(boot.size >= GIB);
    }

    #[test]
    fn fstab_entries_mount_parents_first() {
        let table =
            PartitionTable::new_customized(&base_table(), &[], 4 * GIB, false, None, &mut rng())
                .unwrap();
        let entries = table.fstab_entries();
        assert_eq!(entries[0].path, "/");
        assert_eq!(entries[1].path, "/boot");
        assert_eq!(entries[2].path, "/boot/efi");
    }

    #[test]
    fn required_sizes_grow_the_root() {
        let table = PartitionTable::new_customized(
            &base_table(),
            &[],
            0,
            false,
            Some(&[("/", 3 * GIB)]),
            &mut rng(),
        )
        .unwrap();
        let root_part = table.partitions.last().unwrap();
        assert!(root_part.size >= 3 * GIB);
    }
}
