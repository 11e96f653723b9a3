//! Manifest generation across the whole registry, plus the validation
//! rules a manifest request must enforce.

use std::collections::BTreeMap;

use osplan::blueprint::{
    Customizations, FilesystemCustomization, KernelCustomization, OpenScapCustomization,
    UserCustomization,
};
use osplan::distro::{ImageOptions, OsTreeImageOptions, Registry};
use rpmmd::{PackageSpec, RepoConfig};

fn test_repos() -> Vec<RepoConfig> {
    vec![RepoConfig {
        id: "baseos".into(),
        base_urls: vec!["https://example.org/baseos".into()],
        gpg_keys: vec!["-----BEGIN PGP PUBLIC KEY BLOCK-----".into()],
        check_gpg: Some(true),
        ..Default::default()
    }]
}

fn spec(name: &str, n: u8) -> PackageSpec {
    PackageSpec {
        name: name.into(),
        version: "1.0".into(),
        release: "1".into(),
        arch: "x86_64".into(),
        repo_id: "baseos".into(),
        remote_location: format!("https://example.org/{name}.rpm"),
        checksum: format!("sha256:{:064}", n),
        ..Default::default()
    }
}

fn resolved_sets() -> BTreeMap<String, Vec<PackageSpec>> {
    let mut resolved = BTreeMap::new();
    resolved.insert("build".to_string(), vec![spec("dnf", 1), spec("systemd", 2)]);
    resolved.insert("os".to_string(), vec![spec("kernel", 3), spec("bash", 4)]);
    resolved.insert("installer".to_string(), vec![spec("anaconda", 5)]);
    resolved.insert("container".to_string(), vec![spec("nginx", 6)]);
    resolved
}

fn resolved_ostree_options() -> ImageOptions {
    ImageOptions {
        ostree: OsTreeImageOptions {
            url: "https://ostree.example.org/repo".into(),
            image_ref: "test/ref".into(),
            fetch_checksum: "c0ffee".into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn every_leaf_serializes_a_valid_manifest() {
    let registry = Registry::with_defaults();
    let options = resolved_ostree_options();
    let resolved = resolved_sets();

    for distro_name in registry.list_distros() {
        let distro = registry.get_distro(distro_name).unwrap();
        for arch_name in distro.list_arches() {
            let arch = distro.get_arch(arch_name).unwrap();
            for type_name in arch.list_image_types() {
                let image_type = arch.get_image_type(type_name).unwrap();
                let (bytes, _warnings) = image_type
                    .manifest(None, &options, &test_repos(), &resolved, &[], 0)
                    .unwrap_or_else(|err| {
                        panic!("{distro_name}/{arch_name}/{type_name}: {err:#}")
                    });

                let doc: serde_json::Value = serde_json::from_slice(&bytes)
                    .unwrap_or_else(|err| {
                        panic!("{distro_name}/{arch_name}/{type_name}: bad JSON: {err}")
                    });
                assert_eq!(doc["version"], "2");

                let pipelines = doc["pipelines"].as_array().unwrap();
                assert!(!pipelines.is_empty());
                assert_eq!(pipelines[0]["name"], "build");
                assert!(pipelines[0]["runner"].is_string());

                let names: Vec<&str> = pipelines
                    .iter()
                    .map(|p| p["name"].as_str().unwrap())
                    .collect();
                for export in image_type.exports() {
                    assert!(
                        names.contains(&export.as_str()),
                        "{distro_name}/{arch_name}/{type_name}: export {export} not among pipelines {names:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn manifest_generation_is_deterministic() {
    let registry = Registry::with_defaults();
    let qcow2 = registry
        .get_distro("fedora-38")
        .unwrap()
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("qcow2")
        .unwrap();

    let customizations = Customizations {
        hostname: Some("planner-test".into()),
        user: vec![UserCustomization {
            name: "admin".into(),
            key: Some("ssh-ed25519 AAAA".into()),
            ..Default::default()
        }],
        ..Default::default()
    };

    let make = |seed| {
        qcow2
            .manifest(
                Some(&customizations),
                &ImageOptions::default(),
                &test_repos(),
                &resolved_sets(),
                &[],
                seed,
            )
            .unwrap()
            .0
    };
    assert_eq!(make(7), make(7), "same seed must produce identical bytes");
    assert_ne!(make(7), make(8), "partition UUIDs must follow the seed");
}

#[test]
fn resolved_packages_land_in_rpm_stage_and_sources() {
    let registry = Registry::with_defaults();
    let qcow2 = registry
        .get_distro("centos-9")
        .unwrap()
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("qcow2")
        .unwrap();

    let (bytes, _) = qcow2
        .manifest(
            None,
            &ImageOptions::default(),
            &test_repos(),
            &resolved_sets(),
            &[],
            0,
        )
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let os_pipeline = doc["pipelines"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "os")
        .expect("os pipeline present");
    let rpm_stage = os_pipeline["stages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["type"] == "org.osbuild.rpm")
        .expect("rpm stage present");
    let refs = &rpm_stage["inputs"]["packages"]["references"];
    assert!(refs.get(format!("sha256:{:064}", 3)).is_some());

    let curl_items = &doc["sources"]["org.osbuild.curl"]["items"];
    assert!(curl_items.get(format!("sha256:{:064}", 3)).is_some());
    assert_eq!(
        curl_items[format!("sha256:{:064}", 4).as_str()]["url"],
        "https://example.org/bash.rpm"
    );
}

#[test]
fn iot_installer_requires_a_fetch_checksum() {
    let registry = Registry::with_defaults();
    let installer = registry
        .get_distro("fedora-38")
        .unwrap()
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("iot-installer")
        .unwrap();

    let err = installer
        .manifest(
            None,
            &ImageOptions::default(),
            &test_repos(),
            &resolved_sets(),
            &[],
            0,
        )
        .unwrap_err();
    assert!(
        err.to_string().contains("OSTree commit"),
        "unexpected error: {err:#}"
    );
}

#[test]
fn kernel_append_is_rejected_on_ostree_types() {
    let registry = Registry::with_defaults();
    let commit = registry
        .get_distro("fedora-38")
        .unwrap()
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("iot-commit")
        .unwrap();

    let customizations = Customizations {
        kernel: Some(KernelCustomization {
            name: None,
            append: "quiet".into(),
        }),
        ..Default::default()
    };
    let err = commit
        .manifest(
            Some(&customizations),
            &resolved_ostree_options(),
            &test_repos(),
            &resolved_sets(),
            &[],
            0,
        )
        .unwrap_err();
    assert!(err.to_string().contains("kernel boot parameter"));
}

#[test]
fn custom_mountpoints_are_rejected_on_ostree_types() {
    let registry = Registry::with_defaults();
    let commit = registry
        .get_distro("centos-9")
        .unwrap()
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("edge-commit")
        .unwrap();

    let customizations = Customizations {
        filesystem: vec![FilesystemCustomization {
            mountpoint: "/data".into(),
            minsize: 1024 * 1024 * 1024,
        }],
        ..Default::default()
    };
    let err = commit
        .manifest(
            Some(&customizations),
            &resolved_ostree_options(),
            &test_repos(),
            &resolved_sets(),
            &[],
            0,
        )
        .unwrap_err();
    assert!(err.to_string().contains("mountpoints"));
}

#[test]
fn installer_customizations_are_restricted_to_users_and_groups() {
    let registry = Registry::with_defaults();
    let installer = registry
        .get_distro("fedora-38")
        .unwrap()
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("image-installer")
        .unwrap();

    let customizations = Customizations {
        hostname: Some("not-allowed".into()),
        ..Default::default()
    };
    let err = installer
        .manifest(
            Some(&customizations),
            &ImageOptions::default(),
            &test_repos(),
            &resolved_sets(),
            &[],
            0,
        )
        .unwrap_err();
    assert!(err.to_string().contains("Hostname"));

    let allowed = Customizations {
        user: vec![UserCustomization {
            name: "admin".into(),
            ..Default::default()
        }],
        ..Default::default()
    };
    installer
        .manifest(
            Some(&allowed),
            &ImageOptions::default(),
            &test_repos(),
            &resolved_sets(),
            &[],
            0,
        )
        .unwrap();
}

#[test]
fn unknown_oscap_profile_is_rejected() {
    let registry = Registry::with_defaults();
    let qcow2 = registry
        .get_distro("fedora-38")
        .unwrap()
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("qcow2")
        .unwrap();

    let customizations = Customizations {
        openscap: Some(OpenScapCustomization {
            datastream: "/usr/share/xml/scap/ssg/content/ssg-fedora-ds.xml".into(),
            profile_id: "xccdf_org.ssgproject.content_profile_made_up".into(),
            tailoring: None,
        }),
        ..Default::default()
    };
    let err = qcow2
        .manifest(
            Some(&customizations),
            &ImageOptions::default(),
            &test_repos(),
            &resolved_sets(),
            &[],
            0,
        )
        .unwrap_err();
    assert!(err.to_string().contains("unsupported profile"));
}

#[test]
fn custom_mountpoint_appears_in_fstab_stage() {
    let registry = Registry::with_defaults();
    let qcow2 = registry
        .get_distro("fedora-38")
        .unwrap()
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("qcow2")
        .unwrap();

    let customizations = Customizations {
        filesystem: vec![FilesystemCustomization {
            mountpoint: "/var/lib/data".into(),
            minsize: 1024 * 1024 * 1024,
        }],
        ..Default::default()
    };
    let (bytes, _) = qcow2
        .manifest(
            Some(&customizations),
            &ImageOptions::default(),
            &test_repos(),
            &resolved_sets(),
            &[],
            0,
        )
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let os_pipeline = doc["pipelines"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "os")
        .unwrap();
    let fstab = os_pipeline["stages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["type"] == "org.osbuild.fstab")
        .expect("fstab stage present");
    let paths: Vec<&str> = fstab["options"]["filesystems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|fs| fs["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"/var/lib/data"));
}
