use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ReportError, Result};
use crate::step::Step;

/// Selection keyword meaning every registered step, in registration order.
pub const ALL: &str = "all";

/// Steps keyed by name, kept in registration order.
pub struct StepRegistry {
    steps: Vec<Box<dyn Step>>,
}

impl StepRegistry {
    /// Rejects duplicate step names and artifact names claimed twice.
    pub fn new(steps: Vec<Box<dyn Step>>) -> Result<Self> {
        let mut names = BTreeSet::new();
        let mut owners: BTreeMap<String, String> = BTreeMap::new();

        for step in &steps {
            if !names.insert(step.name().to_string()) {
                return Err(ReportError::DuplicateStep(step.name().to_string()));
            }
            for artifact in step.artifact_names() {
                if let Some(first) = owners.insert(artifact.clone(), step.name().to_string()) {
                    return Err(ReportError::ArtifactCollision {
                        artifact,
                        first,
                        second: step.name().to_string(),
                    });
                }
            }
        }
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn get(&self, name: &str) -> Result<&dyn Step> {
        self.steps
            .iter()
            .find(|s| s.name() == name)
            .map(|s| &**s)
            .ok_or_else(|| ReportError::UnknownStep {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Turn `"all"` or a comma-separated list into the steps to run, in the
    /// order given. Whitespace around names is ignored, empty entries are
    /// dropped and repeats run repeatedly. Any unknown name fails the whole
    /// selection.
    pub fn resolve(&self, selection: &str) -> Result<Vec<&dyn Step>> {
        let selection = selection.trim();
        if selection == ALL {
            return Ok(self.steps.iter().map(|s| &**s).collect());
        }

        let names: Vec<&str> = selection
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(ReportError::EmptySelection(selection.to_string()));
        }
        names.into_iter().map(|n| self.get(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Dataset;
    use crate::step::{Manifest, Session, StepOptions};

    struct Named(&'static str, &'static [&'static str]);

    impl Step for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn artifact_names(&self) -> Vec<String> {
            self.1.iter().map(|a| a.to_string()).collect()
        }

        fn run(&self, _: &Dataset, _: &mut Session, _: StepOptions) -> Result<Manifest> {
            Ok(Manifest::new(self.0))
        }
    }

    fn registry() -> StepRegistry {
        StepRegistry::new(vec![
            Box::new(Named("age_hrr", &["Correlation_HRR_and_Age"])),
            Box::new(Named("fat_hrr", &["Correlation_HRR_and_Fat"])),
            Box::new(Named("hrr_gender", &["Correlation_HRR_and_Age_by_Gender"])),
        ])
        .unwrap()
    }

    fn names(steps: Vec<&dyn Step>) -> Vec<&str> {
        steps.into_iter().map(|s| s.name()).collect()
    }

    #[test]
    fn all_keeps_registration_order() {
        let reg = registry();
        assert_eq!(
            names(reg.resolve("all").unwrap()),
            vec!["age_hrr", "fat_hrr", "hrr_gender"]
        );
    }

    #[test]
    fn list_is_trimmed_ordered_and_may_repeat() {
        let reg = registry();
        assert_eq!(
            names(reg.resolve(" hrr_gender , ,age_hrr,hrr_gender ").unwrap()),
            vec!["hrr_gender", "age_hrr", "hrr_gender"]
        );
    }

    #[test]
    fn unknown_name_lists_available_steps() {
        let err = registry().resolve("age_hrr,nope").err().unwrap();
        match err {
            ReportError::UnknownStep { name, available } => {
                assert_eq!(name, "nope");
                assert_eq!(available, "age_hrr, fat_hrr, hrr_gender");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_selection_is_rejected() {
        assert!(matches!(
            registry().resolve(" , ").err().unwrap(),
            ReportError::EmptySelection(_)
        ));
    }

    #[test]
    fn duplicate_names_and_artifacts_are_rejected() {
        let dup = StepRegistry::new(vec![
            Box::new(Named("a", &["x"])),
            Box::new(Named("a", &["y"])),
        ]);
        assert!(matches!(dup.err().unwrap(), ReportError::DuplicateStep(n) if n == "a"));

        let clash = StepRegistry::new(vec![
            Box::new(Named("a", &["x"])),
            Box::new(Named("b", &["x"])),
        ]);
        match clash.err().unwrap() {
            ReportError::ArtifactCollision { artifact, first, second } => {
                assert_eq!((artifact.as_str(), first.as_str(), second.as_str()), ("x", "a", "b"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
