use loqum_rs::error::{Error, ExternalProcessError};
use loqum_rs::model::{ExternalModel, Mode, ModelHandle, RecalibrationModel};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

// ── helpers ──────────────────────────────────────────────────────────────────

/// Stand-in for the statistical model: `fit` saves a marker file, `predict`
/// assigns 0.999 to every feature row.
const MODEL_SCRIPT: &str = r#"#!/bin/sh
set -e
mode="$1"
features="$2"
model="$3"
predictions="$4"
if [ "$mode" = fit ]; then
    echo fitted > "$model"
    exit 0
fi
awk -F, 'NR == 1 { print "read_id,prediction"; next } { print $1 ",0.999" }' "$features" > "$predictions"
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn sh_model(script: &Path) -> ExternalModel {
    ExternalModel::from_template(&format!(
        "sh {} {{mode}} {{features}} {{model}} {{predictions}}",
        script.display()
    ))
    .unwrap()
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[test]
fn template_placeholders_are_substituted() {
    let model = ExternalModel::from_template(
        "Rscript loqum-internal.R {mode} --in={features} {model} {predictions}",
    )
    .unwrap();
    assert_eq!(model.program(), "Rscript");

    let args = model.command_args(
        Mode::Predict,
        Path::new("a.csv"),
        Path::new("m.RData"),
        Some(Path::new("p.csv")),
    );
    assert_eq!(args, vec!["loqum-internal.R", "predict", "--in=a.csv", "m.RData", "p.csv"]);

    let args = model.command_args(Mode::Fit, Path::new("a.csv"), Path::new("m.RData"), None);
    assert_eq!(args, vec!["loqum-internal.R", "fit", "--in=a.csv", "m.RData"]);
}

#[test]
fn empty_template_is_rejected() {
    let err = ExternalModel::from_template("   ").unwrap_err();
    assert!(matches!(err, Error::ExternalProcess(ExternalProcessError::EmptyTemplate)));
}

#[test]
fn fit_then_predict_through_subprocess() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "model.sh", MODEL_SCRIPT);
    let features = dir.path().join("features.csv");
    fs::write(&features, "read_id,map_qual\nr1,60\nr2,0\n").unwrap();

    let model = sh_model(&script);
    let handle = model.fit(&features, &dir.path().join("model.bin")).unwrap();
    assert_eq!(fs::read_to_string(handle.path()).unwrap(), "fitted\n");

    let predictions = dir.path().join("predictions.csv");
    model.predict(&handle, &features, &predictions).unwrap();
    assert_eq!(
        fs::read_to_string(&predictions).unwrap(),
        "read_id,prediction\nr1,0.999\nr2,0.999\n"
    );
}

#[test]
fn nonzero_exit_is_an_external_process_error() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "fail.sh", "exit 3\n");
    fs::write(dir.path().join("model.bin"), "m").unwrap();
    let handle = ModelHandle::open(dir.path().join("model.bin")).unwrap();

    let err = sh_model(&script)
        .predict(&handle, &dir.path().join("f.csv"), &dir.path().join("p.csv"))
        .unwrap_err();
    match err {
        Error::ExternalProcess(ExternalProcessError::Failed { status, .. }) => {
            assert_eq!(status.code(), Some(3));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_program_is_a_spawn_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("model.bin"), "m").unwrap();
    let handle = ModelHandle::open(dir.path().join("model.bin")).unwrap();
    let model = ExternalModel::from_template("/nonexistent/loqum-model {mode}").unwrap();
    let err = model
        .predict(&handle, Path::new("f.csv"), Path::new("p.csv"))
        .unwrap_err();
    assert!(matches!(err, Error::ExternalProcess(ExternalProcessError::Spawn { .. })));
}

#[test]
fn slow_model_times_out() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "slow.sh", "sleep 5\n");
    fs::write(dir.path().join("model.bin"), "m").unwrap();
    let handle = ModelHandle::open(dir.path().join("model.bin")).unwrap();

    let model = sh_model(&script).with_timeout(Some(Duration::from_millis(200)));
    let err = model
        .predict(&handle, &dir.path().join("f.csv"), &dir.path().join("p.csv"))
        .unwrap_err();
    assert!(matches!(err, Error::ExternalProcess(ExternalProcessError::TimedOut { .. })));
}
