//! Release shipping pipeline
//!
//! A run takes the tag on HEAD through these stages, in order:
//!
//! 1. [`tag`]: resolve and normalize the release tag
//! 2. [`changelog`]: require a committed changelog entry for it
//! 3. [`archive`]: build the canonical tarball with `git archive`
//! 4. [`fetch`]: download the tarball the hosting service serves
//! 5. [`compare`]: prove both tarballs carry the same files
//! 6. [`sign`]: detach-sign the downloaded tarball
//! 7. [`publish`]: create the release with notes and signature
//!
//! Every file a stage creates is registered with the run's
//! [`artifacts::ArtifactTracker`] first and removed when the run ends.

pub mod archive;
pub mod artifacts;
pub mod changelog;
pub mod compare;
pub mod fetch;
pub mod pipeline;
pub mod publish;
pub mod sign;
pub mod tag;
