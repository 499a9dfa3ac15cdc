use anyhow::Result;
use retention_core::config::RetentionConfig;
use retention_core::encoding::{encode_record, fit_schema, ColumnSpec};
use retention_core::gbdt::{Model, Node, Tree};
use retention_core::report::NO_RISK_MESSAGE;
use retention_core::{
    analyze, analyze_profile, render_text, AnalysisContext, EmployeeProfile, RawRecord, RiskBand,
    SchemaRegistry,
};
use std::fs;
use tempfile::tempdir;

fn registry() -> Result<SchemaRegistry> {
    Ok(fit_schema(&[
        ColumnSpec::numeric("monthlyincome"),
        ColumnSpec::numeric("environmentsatisfaction"),
        ColumnSpec::numeric("age"),
        ColumnSpec::categorical(
            "department",
            ["Human Resources", "Research & Development", "Sales"],
        ),
        ColumnSpec::categorical(
            "jobrole",
            ["Manager", "Sales Executive", "Sales Representative"],
        ),
        ColumnSpec::categorical("overtime", ["No", "Yes"]),
    ])?)
}

fn stump(registry: &SchemaRegistry, feature: &str, threshold: f64, left: f64, right: f64, left_cover: f64) -> Tree {
    let idx = registry.position(feature).map(|i| i as i32).unwrap_or(-1);
    Tree::new(vec![
        Node::internal(0, idx, threshold, 1, 2, 100.0),
        Node::leaf(1, left, left_cover),
        Node::leaf(2, right, 100.0 - left_cover),
    ])
}

fn model(registry: &SchemaRegistry) -> Model {
    let trees = vec![
        stump(registry, "overtime_Yes", 0.5, -0.5, 1.3, 70.0),
        stump(registry, "monthlyincome", 3000.0, 0.9, -0.25, 25.0),
        stump(registry, "environmentsatisfaction", 1.5, 0.6, -0.1, 20.0),
        stump(registry, "jobrole_Sales Representative", 0.5, -0.05, 0.7, 92.0),
    ];
    Model::new(trees, -1.0, registry.len(), registry.fingerprint())
}

fn context_on_disk(dir: &std::path::Path) -> Result<(AnalysisContext, RetentionConfig)> {
    let registry = registry()?;
    let model = model(&registry);

    let mut config = RetentionConfig::default();
    config.artifacts.model_path = dir.join("model.json");
    config.artifacts.schema_path = dir.join("model_columns.json");
    config.artifacts.hash_path = dir.join("model.hash");

    model.save_json(&config.artifacts.model_path)?;
    fs::write(&config.artifacts.hash_path, model.hash_hex()?)?;
    registry.save(&config.artifacts.schema_path)?;

    Ok((AnalysisContext::load(&config)?, config))
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
fn burnout_profile_scores_above_engaged_profile() -> Result<()> {
    let dir = tempdir()?;
    let (ctx, _) = context_on_disk(dir.path())?;

    let strained = analyze_profile(&ctx, &profile("Yes", 2000, 1))?;
    let engaged = analyze_profile(&ctx, &profile("No", 10_000, 4))?;

    assert!(strained.probability > engaged.probability);
    assert!(strained.predicts_attrition());
    assert_eq!(engaged.band, RiskBand::Low);
    Ok(())
}

#[test]
fn risk_features_map_to_expected_interventions() -> Result<()> {
    let dir = tempdir()?;
    let (ctx, _) = context_on_disk(dir.path())?;

    let record = RawRecord::new()
        .with("overtime", "Yes")
        .with("monthlyincome", 2000_i64)
        .with("environmentsatisfaction", 3_i64)
        .with("jobrole", "Sales Representative");
    let report = analyze(&ctx, &record)?;

    let mut titles: Vec<&str> = report.recommendations.iter().map(|r| r.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(
        titles,
        vec!["Compensation Gap", "High Burnout Risk", "High Turnover Role"]
    );
    assert!(!render_text(&report).contains(NO_RISK_MESSAGE));
    Ok(())
}

#[test]
fn no_positive_drivers_means_no_recommendations() -> Result<()> {
    let dir = tempdir()?;
    let (ctx, _) = context_on_disk(dir.path())?;

    let record = RawRecord::new()
        .with("overtime", "No")
        .with("monthlyincome", 9000_i64)
        .with("environmentsatisfaction", 4_i64)
        .with("jobrole", "Manager");
    let report = analyze(&ctx, &record)?;

    assert!(report.risky_features.is_empty());
    assert!(report.recommendations.is_empty());
    assert!(render_text(&report).contains(NO_RISK_MESSAGE));
    Ok(())
}

#[test]
fn unknown_department_is_zero_filled() -> Result<()> {
    let dir = tempdir()?;
    let (ctx, _) = context_on_disk(dir.path())?;

    let record = EmployeeProfile {
        department: "Legal".to_string(),
        ..EmployeeProfile::default()
    }
    .to_raw_record();

    let row = encode_record(&record, ctx.registry());
    for name in ctx.registry().iter().filter(|n| n.starts_with("department_")) {
        assert_eq!(row.get(ctx.registry(), name), Some(0.0));
    }
    analyze(&ctx, &record)?;
    Ok(())
}

#[test]
fn repeated_analysis_is_identical() -> Result<()> {
    let dir = tempdir()?;
    let (ctx, _) = context_on_disk(dir.path())?;
    let record = profile("Yes", 4500, 2).to_raw_record();

    let first = analyze(&ctx, &record)?;
    let second = analyze(&ctx, &record)?;
    assert_eq!(first, second);
    assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);
    Ok(())
}

#[test]
fn reload_failure_keeps_serving_previous_model() -> Result<()> {
    let dir = tempdir()?;
    let (mut ctx, config) = context_on_disk(dir.path())?;
    let record = profile("Yes", 2000, 1).to_raw_record();
    let before = analyze(&ctx, &record)?;

    fs::write(&config.artifacts.schema_path, "[\"only_one\"]")?;
    assert!(ctx.reload(&config).is_err());

    let after = analyze(&ctx, &record)?;
    assert_eq!(before, after);
    Ok(())
}
