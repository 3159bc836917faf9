//! Runs the parsed command against the library

use crate::cli::args::{Args, Command};
use crate::config::{AuthConfig, ClientConfig};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::manifest_list::{Inspection, ManifestInspector, ManifestListBuilder};
use crate::reference::Reference;
use crate::registry::SessionPool;
use std::fmt::Write;
use std::time::Duration;

pub struct Runner {
    args: Args,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let output = Logger::new(args.debug);
        Self { args, output }
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<()> {
        self.args.validate().map_err(RegistryError::Config)?;

        match &self.args.command {
            Command::Push { target, sources } => self.push(target, sources).await,
            Command::Inspect { image } => self.inspect(image).await,
        }
    }

    fn session_pool(&self) -> SessionPool {
        let auth = AuthConfig::new(
            self.args.username.clone(),
            self.args.password.clone(),
            self.args.cfg.clone(),
        );
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(self.args.timeout))
            .with_plain_http(self.args.plain_http);
        SessionPool::new(config, auth, self.output.clone())
    }

    async fn push(&self, target: &str, sources: &[String]) -> Result<()> {
        self.output.section("Push manifest list");
        self.output.verbose(&format!(
            "Target: {}, sources: {}",
            target,
            sources.join(", ")
        ));

        let mut pool = self.session_pool();
        let published = ManifestListBuilder::new(&mut pool, self.output.clone())
            .put_manifest_list(target, sources)
            .await?;

        self.output.success(&format!(
            "Completed in {}",
            self.output.format_duration(self.output.elapsed())
        ));
        println!("Target image {} is digest {}", target, published.digest);
        Ok(())
    }

    async fn inspect(&self, image: &str) -> Result<()> {
        let reference = Reference::parse(image)?;
        let mut pool = self.session_pool();
        let session = pool.session(reference.hostname())?;

        let inspection = ManifestInspector::new(self.output.clone())
            .inspect(session, reference.repository(), reference.tag_or_digest())
            .await?;

        print!("{}", render_inspection(image, &inspection));
        Ok(())
    }
}

/// Text shown by `inspect`: a list header when the image is a list, then one
/// numbered block per platform manifest.
pub fn render_inspection(name: &str, inspection: &Inspection) -> String {
    let mut out = String::new();

    if inspection.is_list() {
        let _ = writeln!(out, "Name:   {}", name);
        let _ = writeln!(out, "Manifest Type: {}", inspection.descriptor.media_type);
        let _ = writeln!(out, "Digest: {}", inspection.descriptor.digest);
        let _ = writeln!(
            out,
            " * Contains {} manifest references:",
            inspection.records.len()
        );
    }

    for (i, record) in inspection.records.iter().enumerate() {
        let idx = i + 1;
        let platform = &record.platform;
        let _ = writeln!(out, "{}    Manifest Type: {}", idx, record.descriptor.media_type);
        let _ = writeln!(out, "{}           Digest: {}", idx, record.descriptor.digest);
        let _ = writeln!(out, "{}  Manifest Length: {}", idx, record.descriptor.size);
        let _ = writeln!(out, "{}         Platform:", idx);
        let _ = writeln!(out, "{}           -      OS: {}", idx, platform.os);
        let _ = writeln!(out, "{}           -    Arch: {}", idx, platform.architecture);
        let _ = writeln!(out, "{}           - OS Vers: {}", idx, platform.os_version);
        let _ = writeln!(out, "{}           - OS Feat: {}", idx, platform.os_features.join(","));
        let _ = writeln!(out, "{}           - Variant: {}", idx, platform.variant);
        let _ = writeln!(out, "{}           - Feature: {}", idx, platform.features.join(","));
        let _ = writeln!(out);
    }

    out
}
