//! The bundled report steps.
//!
//! Each entry is one [`ReportStep`]; only the filter, the group keys, the
//! metric and the chart differ between them.

use crate::chart::ChartStyle;
use crate::color::Palette;
use crate::config::Catalog;
use crate::data::aggregate::AggregationSpec;
use crate::data::filter::{Binning, RowFilter};
use crate::error::Result;
use crate::registry::StepRegistry;
use crate::step::{ReportStep, Step};

const DURATION: &str = "Session_Duration (hours)";
const FREQUENCY: &str = "Workout_Frequency (days/week)";

/// Palettes cycled across the per-metric charts of the health reports.
const METRIC_PALETTES: [Palette; 4] = [Palette::Set1, Palette::Set2, Palette::Deep, Palette::Bright];

pub fn registry(catalog: Catalog) -> Result<StepRegistry> {
    match catalog {
        Catalog::Gym => gym(),
        Catalog::Health => health(),
    }
}

/// Sessions of half an hour up to an hour and a half.
fn duration_window() -> RowFilter {
    RowFilter::between(DURATION, 0.5, 1.5)
}

/// Reports over the gym session dataset.
pub fn gym() -> Result<StepRegistry> {
    let fat_groups = Binning::new(
        "Fat_Percentage",
        "Fat_Group",
        &[10.0, 17.0, 23.0, 35.0],
        &["low", "mean", "high"],
    )?;

    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(ReportStep::new("age_hrr", duration_window()).question(
            "Correlation_HRR_and_Age",
            AggregationSpec::mean(&["Age"], "HRR"),
            ChartStyle::regression(Palette::Deep),
        )),
        Box::new(
            ReportStep::new("age_workout_frequency_gender", duration_window()).question(
                "Correlation_Age_Gender_and_Frequency",
                AggregationSpec::mean(&["Age", "Gender"], FREQUENCY),
                ChartStyle::regression(Palette::Set1),
            ),
        ),
        Box::new(
            ReportStep::new("age_workout_frequency_type", duration_window()).question(
                "Correlation_Age_Workout_Type_and_Frequency",
                AggregationSpec::mean(&["Age", "Workout_Type"], FREQUENCY),
                ChartStyle::regression(Palette::Set1),
            ),
        ),
        Box::new(ReportStep::new("avg_bpm_level", RowFilter::equals(DURATION, 1.0)).question(
            "Correlation_Avg_BPM_and_Level",
            AggregationSpec::mean(&["Experience_Level"], "Avg_BPM"),
            ChartStyle::bar(Palette::Paired),
        )),
        Box::new(
            ReportStep::new("duration_type_calories", RowFilter::between("Weight (kg)", 60.0, 80.0))
                .question(
                    "Correlation_Duration_Type_and_Calories",
                    AggregationSpec::mean(&["Workout_Type"], "Calories_per_hour"),
                    ChartStyle::bar(Palette::Set2),
                ),
        ),
        Box::new(
            ReportStep::new("fat_hrr", duration_window())
                .with_binning(fat_groups)
                .question(
                    "Correlation_HRR_and_Fat",
                    AggregationSpec::mean(&["Age", "Fat_Group"], "HRR"),
                    ChartStyle::regression(Palette::Set1),
                ),
        ),
        Box::new(ReportStep::new("hrr_gender", duration_window()).question(
            "Correlation_HRR_and_Age_by_Gender",
            AggregationSpec::mean(&["Age", "Gender"], "HRR").rounded(2),
            ChartStyle::regression(Palette::Set1),
        )),
    ];
    StepRegistry::new(steps)
}

/// One question per metric, all grouped by `key` and `sex`.
fn per_metric(name: &str, key: &str, metrics: &[&str], bars: bool) -> ReportStep {
    metrics
        .iter()
        .zip(METRIC_PALETTES.iter().cycle())
        .fold(ReportStep::new(name, RowFilter::All), |step, (metric, &palette)| {
            let style = if bars {
                ChartStyle::bar(palette)
            } else {
                ChartStyle::regression(palette)
            };
            step.question(
                &format!("Correlation_{key}_sex_{metric}"),
                AggregationSpec::mean(&[key, "sex"], metric),
                style,
            )
        })
}

/// Reports over the health survey dataset.
pub fn health() -> Result<StepRegistry> {
    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(per_metric(
            "correlation_stress",
            "stress_level",
            &["vo2max", "run_5k_min", "resting_hr", "systolic_bp", "max_pushups"],
            false,
        )),
        Box::new(per_metric(
            "correlation_smoking",
            "smoker",
            &[
                "vo2max",
                "run_5k_min",
                "resting_hr",
                "ldl_mg_dL",
                "hdl_mg_dL",
                "triglycerides_mg_dL",
            ],
            true,
        )),
    ];
    StepRegistry::new(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gym_catalog_order() {
        let reg = gym().unwrap();
        assert_eq!(
            reg.names(),
            vec![
                "age_hrr",
                "age_workout_frequency_gender",
                "age_workout_frequency_type",
                "avg_bpm_level",
                "duration_type_calories",
                "fat_hrr",
                "hrr_gender",
            ]
        );
    }

    #[test]
    fn health_steps_answer_one_question_per_metric() {
        let reg = health().unwrap();
        let stress = reg.get("correlation_stress").unwrap();
        assert_eq!(stress.artifact_names().len(), 5);
        assert_eq!(stress.artifact_names()[1], "Correlation_stress_level_sex_run_5k_min");

        let smoking = reg.get("correlation_smoking").unwrap();
        assert_eq!(smoking.artifact_names().len(), 6);
        assert_eq!(smoking.artifact_names()[5], "Correlation_smoker_sex_triglycerides_mg_dL");
    }

    #[test]
    fn palettes_cycle_across_metrics() {
        let step = per_metric("s", "smoker", &["a", "b", "c", "d", "e"], true);
        let palettes: Vec<Palette> = step.questions().iter().map(|q| q.style.palette).collect();
        assert_eq!(
            palettes,
            vec![Palette::Set1, Palette::Set2, Palette::Deep, Palette::Bright, Palette::Set1]
        );
    }

    #[test]
    fn catalogs_select_registries() {
        assert_eq!(registry(Catalog::Gym).unwrap().len(), 7);
        assert_eq!(registry(Catalog::Health).unwrap().len(), 2);
    }
}
