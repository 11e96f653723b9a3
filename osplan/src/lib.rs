//! osplan - plan OS image builds
//!
//! Given a declarative description of a target operating-system image
//! (distribution, architecture, image type, blueprint customizations,
//! package repositories), this crate produces the package-set chains to
//! feed a dependency solver and the osbuild manifest a downstream
//! image-assembly engine executes.
//!
//! The core flow:
//!
//! 1. Look up a (distribution, architecture, image type) triple in the
//!    [`distro::Registry`].
//! 2. Ask the image type for its [package-set chains](distro::ImageType::package_sets)
//!    and depsolve each chain with the `dnfjson` crate.
//! 3. Call [`distro::ImageType::manifest`] with the resolved packages to
//!    obtain the serialized manifest.

pub mod blueprint;
pub mod container;
pub mod disk;
pub mod distro;
pub mod fdo;
pub mod image;
pub mod manifest;
pub mod osbuild;
pub mod pathpolicy;
pub mod platform;
pub mod workload;

pub use distro::Registry;
