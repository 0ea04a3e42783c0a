use std::fmt::Write as _;
use std::path::Path;

use student_pass_predictor::PredictorConfig;

pub const HEADER: &str = "StudentID,Name,Gender,AttendanceRate,StudyHoursPerWeek,PreviousGrade,ExtracurricularActivities,ParentalSupport,Online Classes Taken,FinalGrade";

/// Deterministic student table; roughly a third of the rows pass.
/// `grade` maps the row index to a PreviousGrade cell.
pub fn students_csv(rows: usize, grade: impl Fn(usize) -> String) -> String {
    let genders = ["Male", "Female", "Other"];
    let support = ["High", "Medium", "Low"];
    let mut csv = String::from(HEADER);
    for i in 0..rows {
        let attendance = if i % 50 == 7 {
            String::new()
        } else {
            (50 + (i * 13) % 50).to_string()
        };
        write!(
            csv,
            "\n{},Student {},{},{},{},{},{},{},{},{}",
            i,
            i,
            genders[i % 3],
            attendance,
            (i * 7) % 30,
            grade(i),
            if i % 2 == 0 { "Yes" } else { "No" },
            support[(i / 2) % 3],
            if i % 5 == 0 { "True" } else { "False" },
            (i * 11) % 100,
        )
        .unwrap();
    }
    csv.push('\n');
    csv
}

pub fn spread_grade(i: usize) -> String {
    ((i * 37) % 100).to_string()
}

/// Config with every path inside `dir`, dataset written from `csv`.
pub fn config_in(dir: &Path, csv: &str) -> PredictorConfig {
    let dataset = dir.join("students.csv");
    std::fs::write(&dataset, csv).unwrap();
    let path = |name: &str| dir.join(name).to_string_lossy().into_owned();
    PredictorConfig {
        dataset_path: dataset.to_string_lossy().into_owned(),
        model_path: path("model.bin"),
        scaler_path: path("scaler.bin"),
        feature_names_path: path("feature_names.json"),
        ..PredictorConfig::default()
    }
}
