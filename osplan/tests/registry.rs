//! Registry-wide invariants, checked across every registered
//! distribution, architecture, and image type.

use osplan::blueprint::{Blueprint, Package};
use osplan::distro::{ImageOptions, OsTreeImageOptions, Registry};
use rpmmd::RepoConfig;

fn test_repos() -> Vec<RepoConfig> {
    vec![RepoConfig {
        id: "baseos".into(),
        base_urls: vec!["https://example.org/baseos".into()],
        check_gpg: Some(true),
        ..Default::default()
    }]
}

/// OSTree options that satisfy installer image types, as a caller with a
/// resolved commit would pass them.
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
fn every_leaf_has_nonempty_exports() {
    let registry = Registry::with_defaults();
    for distro_name in registry.list_distros() {
        let distro = registry.get_distro(distro_name).unwrap();
        for arch_name in distro.list_arches() {
            let arch = distro.get_arch(arch_name).unwrap();
            for type_name in arch.list_image_types() {
                let image_type = arch.get_image_type(type_name).unwrap();
                assert!(
                    !image_type.exports().is_empty(),
                    "{distro_name}/{arch_name}/{type_name} has no exports"
                );
            }
        }
    }
}

#[test]
fn every_alias_resolves_to_the_same_object() {
    let registry = Registry::with_defaults();
    for distro_name in registry.list_distros() {
        let distro = registry.get_distro(distro_name).unwrap();
        for arch_name in distro.list_arches() {
            let arch = distro.get_arch(arch_name).unwrap();
            for (alias, target) in arch.list_image_type_aliases() {
                let canonical = arch.get_image_type(target).unwrap();
                let aliased = arch.get_image_type(alias).unwrap();
                assert!(
                    std::ptr::eq(canonical, aliased),
                    "{distro_name}/{arch_name}: alias {alias} does not resolve to {target}"
                );
            }
        }
    }
}

#[test]
fn every_leaf_plans_package_sets() {
    let registry = Registry::with_defaults();
    let bp = Blueprint::default();
    let options = resolved_ostree_options();
    for distro_name in registry.list_distros() {
        let distro = registry.get_distro(distro_name).unwrap();
        for arch_name in distro.list_arches() {
            let arch = distro.get_arch(arch_name).unwrap();
            for type_name in arch.list_image_types() {
                let image_type = arch.get_image_type(type_name).unwrap();
                let chains = image_type
                    .package_sets(&bp, &options, &test_repos())
                    .unwrap_or_else(|err| {
                        panic!("{distro_name}/{arch_name}/{type_name}: {err:#}")
                    });
                assert!(
                    chains.contains_key("build"),
                    "{distro_name}/{arch_name}/{type_name} plans no build set"
                );
                for (set_name, chain) in &chains {
                    assert!(
                        !chain.is_empty(),
                        "{distro_name}/{arch_name}/{type_name}: empty chain for {set_name}"
                    );
                }
            }
        }
    }
}

#[test]
fn unknown_names_are_lookup_errors() {
    let registry = Registry::with_defaults();
    assert!(registry.get_distro("fedora-9000").is_err());

    let f38 = registry.get_distro("fedora-38").unwrap();
    assert!(f38.get_arch("riscv64").is_err());

    let x86 = f38.get_arch("x86_64").unwrap();
    assert!(x86.get_image_type("floppy").is_err());
}

#[test]
fn qcow2_blueprint_package_reaches_the_os_chain() {
    let registry = Registry::with_defaults();
    let cs9 = registry.get_distro("centos-9").unwrap();
    let x86 = cs9.get_arch("x86_64").unwrap();
    let qcow2 = x86.get_image_type("qcow2").unwrap();

    let bp = Blueprint {
        packages: vec![Package {
            name: "bind".into(),
            version: None,
        }],
        ..Default::default()
    };
    let chains = qcow2
        .package_sets(&bp, &ImageOptions::default(), &test_repos())
        .unwrap();

    assert_eq!(
        chains.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["build", "os"]
    );
    let os_chain = &chains["os"];
    assert!(
        os_chain
            .iter()
            .any(|set| set.include.iter().any(|p| p == "bind")),
        "blueprint package missing from the os chain"
    );
    // base packages come first, the blueprint overlay second
    assert_eq!(os_chain.len(), 2);
    assert!(os_chain[0].include.iter().any(|p| p == "@core"));
    assert_eq!(os_chain[1].include, vec!["bind"]);
}

#[test]
fn blueprint_tagged_repo_lands_on_the_os_chain() {
    let registry = Registry::with_defaults();
    let f38 = registry.get_distro("fedora-38").unwrap();
    let qcow2 = f38
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("qcow2")
        .unwrap();

    let mut repos = test_repos();
    repos.push(RepoConfig {
        id: "user-payload".into(),
        base_urls: vec!["https://example.org/payload".into()],
        package_sets: vec!["blueprint".into()],
        ..Default::default()
    });

    let bp = Blueprint {
        packages: vec![Package {
            name: "tmux".into(),
            version: None,
        }],
        ..Default::default()
    };
    let chains = qcow2
        .package_sets(&bp, &ImageOptions::default(), &repos)
        .unwrap();

    let os_chain = &chains["os"];
    assert!(
        os_chain.iter().any(|set| set
            .repositories
            .iter()
            .any(|repo| repo.id == "user-payload")),
        "payload-tagged repo must be visible to the os chain"
    );
    // the untagged repo applies everywhere
    assert!(chains["build"][0]
        .repositories
        .iter()
        .any(|repo| repo.id == "baseos"));
    assert!(!chains["build"][0]
        .repositories
        .iter()
        .any(|repo| repo.id == "user-payload"));
}

#[test]
fn iot_installer_plans_without_a_resolved_commit() {
    let registry = Registry::with_defaults();
    let f38 = registry.get_distro("fedora-38").unwrap();
    let installer = f38
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("iot-installer")
        .unwrap();

    // no fetch checksum: planning succeeds via the placeholder
    let chains = installer
        .package_sets(&Blueprint::default(), &ImageOptions::default(), &test_repos())
        .unwrap();
    assert!(chains.contains_key("installer"));
}

#[test]
fn vhd_size_rounds_up_to_mib() {
    let registry = Registry::with_defaults();
    let f38 = registry.get_distro("fedora-38").unwrap();
    let vhd = f38
        .get_arch("x86_64")
        .unwrap()
        .get_image_type("vhd")
        .unwrap();
    let mib = 1024 * 1024;
    assert_eq!(vhd.size(10 * mib + 1), 11 * mib);
    assert_eq!(vhd.size(10 * mib), 10 * mib);
    assert_eq!(vhd.size(0) % mib, 0);
}
