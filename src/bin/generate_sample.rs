use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

/// Write deterministic synthetic gym and health datasets.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Directory receiving gym.csv and health.csv.
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,

    /// Rows per dataset.
    #[arg(long, default_value_t = 600)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_u64() % (hi - lo + 1) as u64) as i64
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

fn write_gym(path: &Path, rows: usize, rng: &mut SimpleRng) -> Result<()> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    w.write_record([
        "Age",
        "Gender",
        "Weight (kg)",
        "Max_BPM",
        "Avg_BPM",
        "Resting_BPM",
        "Session_Duration (hours)",
        "Calories_Burned",
        "Workout_Type",
        "Fat_Percentage",
        "Workout_Frequency (days/week)",
        "Experience_Level",
        "HRR",
        "Calories_per_hour",
    ])?;

    let durations = [0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];
    let types = ["Cardio", "HIIT", "Strength", "Yoga"];

    for _ in 0..rows {
        let age = rng.range(18, 59);
        let gender = *rng.pick(&["Male", "Female"]);
        let male = gender == "Male";
        let weight = round_to(rng.gauss(if male { 82.0 } else { 66.0 }, 11.0).clamp(40.0, 130.0), 1);
        let level = rng.range(1, 3);
        let frequency = (level + rng.range(1, 3)).min(5);
        let workout = *rng.pick(&types);
        let duration = *rng.pick(&durations);

        let max_bpm = (208.0 - 0.7 * age as f64 + rng.gauss(0.0, 5.0)).round();
        let resting = (72.0 - 3.0 * level as f64 + rng.gauss(0.0, 4.0)).round();
        let intensity = match workout {
            "HIIT" => 0.80,
            "Cardio" => 0.72,
            "Strength" => 0.65,
            _ => 0.55,
        };
        let avg_bpm = (resting + intensity * (max_bpm - resting) + rng.gauss(0.0, 4.0)).round();
        let per_hour = round_to(weight * 9.0 * intensity + rng.gauss(0.0, 40.0), 1);
        let calories = round_to(per_hour * duration, 1);
        let fat = round_to(
            ((if male { 20.0 } else { 27.0 }) - 2.5 * level as f64 + rng.gauss(0.0, 4.0)).clamp(10.5, 35.0),
            1,
        );

        w.write_record([
            age.to_string(),
            gender.to_string(),
            weight.to_string(),
            max_bpm.to_string(),
            avg_bpm.to_string(),
            resting.to_string(),
            duration.to_string(),
            calories.to_string(),
            workout.to_string(),
            fat.to_string(),
            frequency.to_string(),
            level.to_string(),
            (max_bpm - resting).to_string(),
            per_hour.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_health(path: &Path, rows: usize, rng: &mut SimpleRng) -> Result<()> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    w.write_record([
        "age",
        "sex",
        "stress_level",
        "smoker",
        "vo2max",
        "run_5k_min",
        "resting_hr",
        "systolic_bp",
        "max_pushups",
        "ldl_mg_dL",
        "hdl_mg_dL",
        "triglycerides_mg_dL",
    ])?;

    for _ in 0..rows {
        let age = rng.range(20, 69);
        let sex = *rng.pick(&["F", "M"]);
        let male = sex == "M";
        let stress = rng.range(1, 10);
        let smoker = rng.next_f64() < 0.22;
        let penalty: f64 = if smoker { 1.0 } else { 0.0 };

        let vo2max = round_to(
            (if male { 46.0 } else { 39.0 }) - 0.25 * (age - 20) as f64 - 0.4 * stress as f64
                - 4.0 * penalty
                + rng.gauss(0.0, 4.0),
            1,
        );
        let run_5k = round_to(1500.0 / vo2max.max(15.0) + rng.gauss(0.0, 2.0), 1);
        let resting_hr = (58.0 + 1.1 * stress as f64 + 5.0 * penalty + rng.gauss(0.0, 6.0)).round();
        let systolic = (112.0 + 0.4 * age as f64 + 1.5 * stress as f64 + rng.gauss(0.0, 9.0)).round();
        let pushups = ((if male { 38.0 } else { 22.0 }) - 0.3 * (age - 20) as f64 + rng.gauss(0.0, 6.0))
            .max(0.0)
            .round();
        let ldl = (105.0 + 0.6 * age as f64 + 14.0 * penalty + rng.gauss(0.0, 20.0)).round();
        let hdl = ((if male { 48.0 } else { 58.0 }) - 6.0 * penalty + rng.gauss(0.0, 9.0)).round();
        let trig = (120.0 + 30.0 * penalty + 2.0 * stress as f64 + rng.gauss(0.0, 35.0)).max(40.0).round();

        w.write_record([
            age.to_string(),
            sex.to_string(),
            stress.to_string(),
            smoker.to_string(),
            vo2max.to_string(),
            run_5k.to_string(),
            resting_hr.to_string(),
            systolic.to_string(),
            pushups.to_string(),
            ldl.to_string(),
            hdl.to_string(),
            trig.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let gym = args.out_dir.join("gym.csv");
    write_gym(&gym, args.rows, &mut rng)?;
    let health = args.out_dir.join("health.csv");
    write_health(&health, args.rows, &mut rng)?;

    println!(
        "Wrote {} rows each to {} and {}",
        args.rows,
        gym.display(),
        health.display()
    );
    Ok(())
}
