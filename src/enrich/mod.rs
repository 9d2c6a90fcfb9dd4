//! Per-dependency enrichment pipelines.
//!
//! Each record kind runs a short ordered chain of lookup steps:
//!
//! - **Module**: resolve source repository (per ecosystem) → fetch GitHub
//!   archive flag and last push
//! - **Language**: derive release cycle → fetch end-of-life status
//! - **Image**: parse reference → fetch last update from its registry
//!
//! Steps take the record by `&mut` and return `Result<(), LookupError>`,
//! chained with `?`. The first failing step ends the chain; whatever earlier
//! steps filled in stays on the record next to the error.

mod classify;

pub use classify::{Severity, Verdict, WarnPolicy};

use crate::core::LookupError;
use crate::models::{Dependency, Ecosystem, Finding, Image, ImageReference, Language, Module};
use crate::registry::Registries;

/// Runs enrichment pipelines against the registries.
#[derive(Debug, Clone)]
pub struct Enricher {
    registries: Registries,
}

impl Enricher {
    pub fn new(registries: Registries) -> Self {
        Self {
            registries,
        }
    }

    /// Run the pipeline for `dependency`.
    ///
    /// Never fails: a lookup error ends up in [`Finding::error`].
    pub async fn enrich(&self, dependency: Dependency) -> Finding {
        match dependency {
            Dependency::Module(mut module) => {
                let outcome = self.enrich_module(&mut module).await;
                Finding::new(module.into(), outcome.err())
            }
            Dependency::Language(mut language) => {
                let outcome = self.enrich_language(&mut language).await;
                Finding::new(language.into(), outcome.err())
            }
            Dependency::Image(mut image) => {
                let outcome = self.enrich_image(&mut image).await;
                Finding::new(image.into(), outcome.err())
            }
        }
    }

    async fn enrich_module(&self, module: &mut Module) -> Result<(), LookupError> {
        self.resolve_repository(module).await?;
        self.fetch_repository_status(module).await
    }

    async fn resolve_repository(&self, module: &mut Module) -> Result<(), LookupError> {
        let coordinates = match module.ecosystem {
            Ecosystem::Go => self.registries.go_repository(&module.name).await?,
            Ecosystem::Npm => self.registries.npm_repository(&module.name).await?,
            Ecosystem::PyPI => self.registries.pypi_repository(&module.name).await?,
            Ecosystem::RubyGems => self.registries.rubygems_repository(&module.name).await?,
        };
        tracing::debug!("{} → github.com/{coordinates}", module.identity());
        module.repository = Some(coordinates);
        Ok(())
    }

    async fn fetch_repository_status(&self, module: &mut Module) -> Result<(), LookupError> {
        let coordinates = module.repository.as_ref().ok_or_else(|| LookupError::RepositoryNotFound {
            name: module.name.clone(),
            reason: "repository was not resolved".to_string(),
        })?;
        let status = self.registries.repository_status(coordinates).await?;
        module.archived = status.archived;
        module.last_push = status.pushed_at;
        Ok(())
    }

    async fn enrich_language(&self, language: &mut Language) -> Result<(), LookupError> {
        let cycle = language.cycle()?;
        let status = self.registries.cycle_status(&language.name, &cycle).await?;
        language.eol = status.eol;
        language.eol_date = status.eol_date;
        Ok(())
    }

    async fn enrich_image(&self, image: &mut Image) -> Result<(), LookupError> {
        let reference = ImageReference::parse(&image.raw)?;
        image.reference = Some(reference.clone());
        image.last_update = Some(self.registries.image_last_update(&reference).await?);
        Ok(())
    }
}
