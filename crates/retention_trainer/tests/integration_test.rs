//! End-to-end tests: raw export -> ETL snapshot -> trained artifacts -> analysis

use anyhow::Result;
use retention_core::config::RetentionConfig;
use retention_core::{analyze_profile, AnalysisContext, EmployeeProfile};
use retention_etl::{EtlPipeline, LocalFileSource};
use retention_trainer::{
    train_from_snapshot, write_artifacts, ArtifactPaths, GbdtConfig, GbdtTrainer, LcgRng, TrainingArtifacts,
};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const DEPARTMENTS: [&str; 3] = ["Human Resources", "Research & Development", "Sales"];
const JOB_ROLES: [&str; 4] = [
    "Laboratory Technician",
    "Research Scientist",
    "Sales Executive",
    "Sales Representative",
];

/// Synthetic HR export where overtime, low pay and low satisfaction drive attrition
fn synthetic_export(rows: usize) -> String {
    let mut rng = LcgRng::new(2024);
    let mut csv = String::from(
        "Age,Attrition,Department,EmployeeCount,EmployeeNumber,EnvironmentSatisfaction,\
         JobRole,JobSatisfaction,MonthlyIncome,Over18,OverTime,StandardHours\n",
    );

    for i in 0..rows {
        let age = 18 + rng.next_range(42);
        let overtime = rng.next_f64() < 0.3;
        let income = 1000 + rng.next_range(19000);
        let env_sat = 1 + rng.next_range(4);
        let job_sat = 1 + rng.next_range(4);
        let department = DEPARTMENTS[rng.next_range(3) as usize];
        let job_role = JOB_ROLES[rng.next_range(4) as usize];

        let mut score = 0.0;
        if overtime {
            score += 2.0;
        }
        if income < 3000 {
            score += 1.5;
        }
        if env_sat == 1 {
            score += 1.0;
        }
        if job_sat == 1 {
            score += 1.0;
        }
        let left = score >= 2.0 || rng.next_f64() < 0.03;

        // write! to a String cannot fail
        let _ = writeln!(
            csv,
            "{},{},{},1,{},{},{},{},{},Y,{},80",
            age,
            if left { "Yes" } else { "No" },
            department,
            i + 1,
            env_sat,
            job_role,
            job_sat,
            income,
            if overtime { "Yes" } else { "No" },
        );
    }
    csv
}

fn run_etl(dir: &Path) -> Result<PathBuf> {
    let export = dir.join("export.csv");
    fs::write(&export, synthetic_export(300))?;

    let pipeline = EtlPipeline {
        raw_dir: dir.join("data/raw"),
        processed_dir: dir.join("data/processed"),
        ..EtlPipeline::default()
    };
    Ok(pipeline.run(&LocalFileSource::new(&export))?.snapshot_path)
}

fn config() -> GbdtConfig {
    GbdtConfig {
        n_estimators: 40,
        learning_rate: 0.2,
        ..GbdtConfig::default()
    }
}

fn train_to(dir: &Path) -> Result<TrainingArtifacts> {
    let snapshot = run_etl(dir)?;
    let (model, dataset) = train_from_snapshot(&snapshot, config())?;
    let paths = ArtifactPaths::in_dir(dir.join("models"));
    Ok(write_artifacts(&model, &dataset.registry, &paths)?)
}

fn analysis_config(artifacts: &TrainingArtifacts) -> RetentionConfig {
    let mut config = RetentionConfig::default();
    config.artifacts.model_path = artifacts.model_path.clone();
    config.artifacts.schema_path = artifacts.schema_path.clone();
    config.artifacts.hash_path = artifacts.hash_path.clone();
    config
}

fn profile(overtime: &str, income: i64, satisfaction: i64) -> EmployeeProfile {
    EmployeeProfile {
        overtime: overtime.to_string(),
        monthlyincome: income,
        environmentsatisfaction: satisfaction,
        jobsatisfaction: satisfaction,
        worklifebalance: satisfaction,
        jobinvolvement: satisfaction,
        ..EmployeeProfile::default()
    }
}

#[test]
fn test_trained_artifacts_drive_analysis() -> Result<()> {
    let dir = tempdir()?;
    let artifacts = train_to(dir.path())?;

    let ctx = AnalysisContext::load(&analysis_config(&artifacts))?;
    assert_eq!(ctx.model_hash(), artifacts.model_hash);
    assert!(ctx.registry().contains("overtime_Yes"));
    assert!(ctx.registry().contains("department_Sales"));

    let strained = analyze_profile(&ctx, &profile("Yes", 2000, 1))?;
    let engaged = analyze_profile(&ctx, &profile("No", 10000, 4))?;

    assert!(
        strained.probability > engaged.probability,
        "strained {} vs engaged {}",
        strained.probability,
        engaged.probability
    );
    assert!(strained.predicts_attrition());
    assert!(!engaged.predicts_attrition());
    assert!(strained
        .recommendations
        .iter()
        .any(|r| r.title == "High Burnout Risk"));
    Ok(())
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = run_etl(dir.path())?;

    let (model1, dataset) = train_from_snapshot(&snapshot, config())?;
    let model2 = GbdtTrainer::new(config()).train(&dataset)?;

    assert_eq!(model1.base_margin, model2.base_margin, "Base margin should be identical");
    assert_eq!(model1.trees, model2.trees, "Trees should be identical");

    let report = GbdtTrainer::new(config()).evaluate(&model1, &dataset);
    assert!(report.accuracy > 0.8, "accuracy {}", report.accuracy);
    assert!(report.recall > 0.8, "recall {}", report.recall);
    Ok(())
}

#[test]
fn test_tampered_model_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let artifacts = train_to(dir.path())?;

    let mut json = fs::read_to_string(&artifacts.model_path)?;
    json.push(' ');
    fs::write(&artifacts.model_path, json)?;

    assert!(AnalysisContext::load(&analysis_config(&artifacts)).is_err());
    Ok(())
}
