use std::path::Path;

use serde::Serialize;

use crate::catalog;
use crate::config::RunConfig;
use crate::data::loader;
use crate::data::model::Dataset;
use crate::error::{ReportError, Result};
use crate::registry::StepRegistry;
use crate::step::{Manifest, Session, StepOptions};

/// Manifests of every step that ran, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub manifests: Vec<Manifest>,
}

impl RunReport {
    /// Image and table files written across the whole run.
    pub fn artifact_file_count(&self) -> usize {
        self.manifests.iter().map(Manifest::file_count).sum()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| ReportError::io(path, e))
    }
}

/// Runs selected steps one after another over a shared dataset.
pub struct Runner<'r> {
    registry: &'r StepRegistry,
    session: Session,
}

impl<'r> Runner<'r> {
    pub fn new(registry: &'r StepRegistry, session: Session) -> Self {
        Self { registry, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolve `selection` completely, then run each step in order. Figures a
    /// step leaves open are released after it returns, whether it succeeded
    /// or not. The first failing step ends the run.
    pub fn run(
        &mut self,
        dataset: &Dataset,
        selection: &str,
        options: StepOptions,
    ) -> Result<RunReport> {
        let registry = self.registry;
        let steps = registry.resolve(selection)?;

        let mut report = RunReport::default();
        for step in steps {
            log::info!(">>> Running: {}", step.name());
            let outcome = step.run(dataset, &mut self.session, options);

            let released = self.session.figures_mut().close_all();
            if released > 0 {
                log::debug!("{}: released {released} open figure(s)", step.name());
            }

            let manifest = outcome.map_err(|e| ReportError::Step {
                name: step.name().to_string(),
                source: Box::new(e),
            })?;
            print_manifest(&manifest);
            report.manifests.push(manifest);
        }
        Ok(report)
    }
}

fn print_manifest(manifest: &Manifest) {
    for artifact in &manifest.artifacts {
        for (label, path) in artifact.paths() {
            println!("    {label}: {}", path.display());
        }
    }
}

/// Load the dataset once, run the selected steps of the configured catalog
/// and write `manifest.json` under the output root.
pub fn run_pipeline(config: &RunConfig) -> Result<RunReport> {
    let registry = catalog::registry(config.catalog)?;
    // Reject bad selections before touching the dataset or the output root.
    registry.resolve(&config.steps)?;

    let dataset = loader::load_file(&config.data)?;
    std::fs::create_dir_all(&config.out).map_err(|e| ReportError::io(&config.out, e))?;

    let session = Session::new(&config.out).with_render(config.render.clone());
    let mut runner = Runner::new(&registry, session);
    let options = StepOptions {
        show: config.show,
        open_after: config.open_after,
    };
    let report = runner.run(&dataset, &config.steps, options)?;

    let manifest_path = config.out.join("manifest.json");
    report.write_json(&manifest_path)?;
    log::info!(
        "{} step(s), {} file(s); manifest at {}",
        report.manifests.len(),
        report.artifact_file_count(),
        manifest_path.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Catalog;
    use std::io::Write;

    #[test]
    fn unknown_step_fails_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            data: dir.path().join("missing.csv"),
            out: dir.path().join("out"),
            steps: "age_hrr,nope".into(),
            ..RunConfig::default()
        };
        let err = run_pipeline(&config).unwrap_err();
        assert!(matches!(err, ReportError::UnknownStep { .. }));
        assert!(!config.out.exists());
    }

    #[test]
    fn missing_dataset_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            data: dir.path().join("missing.csv"),
            out: dir.path().join("out"),
            ..RunConfig::default()
        };
        assert!(matches!(run_pipeline(&config).unwrap_err(), ReportError::Dataset(_)));
    }

    #[test]
    fn pipeline_writes_manifest_json() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("gym.csv");
        let mut f = std::fs::File::create(&data).unwrap();
        writeln!(f, "Age,Gender,Session_Duration (hours),HRR").unwrap();
        writeln!(f, "25,Male,1.0,62.0").unwrap();
        writeln!(f, "25,Female,0.9,58.0").unwrap();
        writeln!(f, "33,Male,1.4,70.5").unwrap();
        drop(f);

        let config = RunConfig {
            data,
            out: dir.path().join("out"),
            steps: "age_hrr, hrr_gender".into(),
            catalog: Catalog::Gym,
            ..RunConfig::default()
        };
        let report = run_pipeline(&config).unwrap();
        assert_eq!(report.manifests.len(), 2);
        assert_eq!(report.artifact_file_count(), 6);

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(config.out.join("manifest.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["manifests"][1]["step"], "hrr_gender");
        assert_eq!(
            json["manifests"][0]["artifacts"][0]["name"],
            "Correlation_HRR_and_Age"
        );
    }
}
