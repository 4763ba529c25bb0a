use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use approx::assert_relative_eq;
use fitness_report::chart::window::Presenter;
use fitness_report::chart::{ChartHandle, Figure, FigureId};
use fitness_report::data::aggregate::AggregatedTable;
use fitness_report::data::loader::load_file;
use fitness_report::data::model::{Dataset, Value};
use fitness_report::export::TableExporter;
use fitness_report::step::Artifact;
use fitness_report::{
    catalog, Manifest, ReportError, Result, Runner, Session, Step, StepOptions, StepRegistry,
};

const GYM_CSV: &str = "\
Age,Gender,Weight (kg),Avg_BPM,Session_Duration (hours),Workout_Type,Fat_Percentage,Workout_Frequency (days/week),Experience_Level,HRR,Calories_per_hour
25,Male,70.5,140,1.0,Cardio,12.0,3,1,62.0,610.0
25,Female,58.0,150,0.75,Yoga,25.5,4,2,58.0,380.0
25,Male,82.0,138,2.0,HIIT,15.0,5,3,90.0,820.0
30,Female,64.0,145,1.25,Cardio,19.0,3,1,66.0,590.5
30,Male,77.0,152,1.0,Strength,21.5,2,2,70.0,640.0
41,Female,61.0,135,1.5,Yoga,30.0,4,3,55.5,350.0
41,Male,90.0,141,0.5,HIIT,17.0,3,1,60.5,905.0
";

fn gym_dataset(dir: &Path) -> Dataset {
    let path = dir.join("gym.csv");
    std::fs::write(&path, GYM_CSV).unwrap();
    load_file(&path).unwrap()
}

struct Broken;

impl TableExporter for Broken {
    fn extension(&self) -> &str {
        "md"
    }

    fn export(&self, _: &AggregatedTable, _: &Path) -> Result<()> {
        Err(ReportError::Render("text export unavailable".into()))
    }
}

#[derive(Clone, Default)]
struct Recorder {
    shown: Rc<RefCell<Vec<String>>>,
}

impl Presenter for Recorder {
    fn present(&self, figure: &Figure, _image: &Path) -> Result<()> {
        self.shown.borrow_mut().push(figure.spec.title.clone());
        Ok(())
    }
}

/// Step that records its invocation and reports a fixed number of artifacts.
struct Counting {
    name: String,
    artifacts: usize,
    log: Rc<RefCell<Vec<String>>>,
}

impl Step for Counting {
    fn name(&self) -> &str {
        &self.name
    }

    fn artifact_names(&self) -> Vec<String> {
        (0..self.artifacts).map(|i| format!("{}_{i}", self.name)).collect()
    }

    fn run(&self, _: &Dataset, session: &mut Session, _: StepOptions) -> Result<Manifest> {
        self.log.borrow_mut().push(self.name.clone());
        let mut manifest = Manifest::new(&self.name);
        for (i, name) in self.artifact_names().into_iter().enumerate() {
            manifest.artifacts.push(Artifact {
                chart: ChartHandle {
                    id: FigureId(i as u64),
                    title: name.clone(),
                },
                image: session.layout().image_path(&name),
                table_csv: session.layout().csv_path(&name),
                table_text: (i % 2 == 0).then(|| session.layout().text_path(&name, "md")),
                name,
            });
        }
        Ok(manifest)
    }
}

#[test]
fn mean_hrr_by_age_inside_duration_window() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = gym_dataset(dir.path());
    let registry = catalog::gym().unwrap();
    let mut runner = Runner::new(&registry, Session::new(dir.path().join("out")));

    let report = runner
        .run(&dataset, "age_hrr", StepOptions::default())
        .unwrap();

    let artifact = &report.manifests[0].artifacts[0];
    assert!(artifact.image.is_file());
    let table = AggregatedTable::read_csv(&artifact.table_csv, 1).unwrap();
    let ages: Vec<Value> = table.rows.iter().map(|r| r.keys[0].clone()).collect();
    assert_eq!(ages, vec![Value::Integer(25), Value::Integer(30), Value::Integer(41)]);
    // The 2.0 h session is outside the window; 0.5 h and 1.5 h are inside.
    assert_relative_eq!(table.rows[0].value, 60.0);
    assert_relative_eq!(table.rows[1].value, 68.0);
    assert_relative_eq!(table.rows[2].value, 58.0);
}

#[test]
fn failed_text_export_keeps_csv_and_records_absence() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = gym_dataset(dir.path());
    let registry = catalog::gym().unwrap();
    let session = Session::new(dir.path().join("out")).with_text_exporter(Box::new(Broken));
    let mut runner = Runner::new(&registry, session);

    let report = runner
        .run(&dataset, "hrr_gender", StepOptions::default())
        .unwrap();

    let artifact = &report.manifests[0].artifacts[0];
    assert!(artifact.table_csv.is_file());
    assert_eq!(artifact.table_text, None);
    assert_eq!(report.artifact_file_count(), 2);
}

#[test]
fn shown_figures_are_released_by_the_runner() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = gym_dataset(dir.path());
    let registry = catalog::gym().unwrap();
    let recorder = Recorder::default();
    let session = Session::new(dir.path().join("out")).with_presenter(Box::new(recorder.clone()));
    let mut runner = Runner::new(&registry, session);
    let options = StepOptions {
        show: true,
        open_after: false,
    };

    runner
        .run(&dataset, "age_hrr,avg_bpm_level", options)
        .unwrap();

    assert_eq!(
        *recorder.shown.borrow(),
        vec!["Correlation_HRR_and_Age", "Correlation_Avg_BPM_and_Level"]
    );
    assert_eq!(runner.session().figures().open_count(), 0);
}

#[test]
fn unknown_step_aborts_before_any_step_runs() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = gym_dataset(dir.path());
    let registry = catalog::gym().unwrap();
    let out = dir.path().join("out");
    let mut runner = Runner::new(&registry, Session::new(&out));

    let err = runner
        .run(&dataset, "age_hrr,not_a_step,fat_hrr", StepOptions::default())
        .unwrap_err();

    assert!(matches!(err, ReportError::UnknownStep { ref name, .. } if name == "not_a_step"));
    assert!(!out.exists());
}

#[test]
fn all_runs_every_step_once_in_registration_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let steps: Vec<Box<dyn Step>> = (1..=5)
        .map(|i| {
            Box::new(Counting {
                name: format!("step{i}"),
                artifacts: i,
                log: Rc::clone(&log),
            }) as Box<dyn Step>
        })
        .collect();
    let registry = StepRegistry::new(steps).unwrap();
    let mut runner = Runner::new(&registry, Session::new(dir.path()));

    let report = runner
        .run(&Dataset::default(), "all", StepOptions::default())
        .unwrap();

    assert_eq!(*log.borrow(), vec!["step1", "step2", "step3", "step4", "step5"]);
    let per_step: usize = report.manifests.iter().map(Manifest::file_count).sum();
    assert_eq!(report.artifact_file_count(), per_step);
    // i artifacts of 2 files each, plus a text table on every other artifact.
    assert_eq!(report.artifact_file_count(), 2 * 15 + (1 + 1 + 2 + 2 + 3));
}

#[test]
fn repeated_name_runs_the_step_again() {
    let dir = tempfile::tempdir().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let steps: Vec<Box<dyn Step>> = ["step1", "step2"]
        .into_iter()
        .map(|name| {
            Box::new(Counting {
                name: name.to_string(),
                artifacts: 1,
                log: Rc::clone(&log),
            }) as Box<dyn Step>
        })
        .collect();
    let registry = StepRegistry::new(steps).unwrap();
    let mut runner = Runner::new(&registry, Session::new(dir.path()));

    let report = runner
        .run(&Dataset::default(), "step2, step1 ,step2", StepOptions::default())
        .unwrap();

    assert_eq!(*log.borrow(), vec!["step2", "step1", "step2"]);
    let names: Vec<&str> = report.manifests.iter().map(|m| m.step.as_str()).collect();
    assert_eq!(names, vec!["step2", "step1", "step2"]);
}

#[test]
fn missing_column_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = gym_dataset(dir.path());
    let registry = catalog::health().unwrap();
    let mut runner = Runner::new(&registry, Session::new(dir.path().join("out")));

    let err = runner
        .run(&dataset, "correlation_smoking", StepOptions::default())
        .unwrap_err();

    match err {
        ReportError::Step { name, source } => {
            assert_eq!(name, "correlation_smoking");
            assert!(matches!(*source, ReportError::ColumnNotFound(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(runner.session().figures().open_count(), 0);
}

#[test]
fn fat_groups_are_binned_without_touching_the_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = gym_dataset(dir.path());
    let registry = catalog::gym().unwrap();
    let mut runner = Runner::new(&registry, Session::new(dir.path().join("out")));

    let report = runner
        .run(&dataset, "fat_hrr", StepOptions::default())
        .unwrap();

    assert!(!dataset.has_column("Fat_Group"));
    let table = AggregatedTable::read_csv(&report.manifests[0].artifacts[0].table_csv, 2).unwrap();
    let groups: Vec<String> = table.rows.iter().map(|r| r.keys[1].to_string()).collect();
    // Sorted by Age, then by bin; 17.0 closes the "low" bin.
    assert_eq!(groups, vec!["low", "high", "mean", "low", "high"]);
}
