use anyhow::Result;
use retention_etl::{ColumnValues, EtlPipeline, Frame, LocalFileSource};
use std::fs;
use tempfile::tempdir;

const IBM_SAMPLE: &str = "\
Age,Attrition,BusinessTravel,Department,EmployeeCount,EmployeeNumber,MonthlyIncome,Over18,OverTime,StandardHours
41,Yes,Travel_Rarely,Sales,1,1,5993,Y,Yes,80
49,No,Travel_Frequently,Research & Development,1,2,5130,Y,No,80
37,Yes,Travel_Rarely,Research & Development,1,4,2090,Y,Yes,80
33,No,Travel_Frequently,Research & Development,1,5,2909,Y,Yes,80
";

#[test]
fn end_to_end_run_writes_clean_snapshot() -> Result<()> {
    let dir = tempdir()?;
    let export = dir.path().join("WA_Fn-UseC_-HR-Employee-Attrition.csv");
    fs::write(&export, IBM_SAMPLE)?;

    let pipeline = EtlPipeline {
        raw_dir: dir.path().join("data/raw"),
        processed_dir: dir.path().join("data/processed"),
        ..EtlPipeline::default()
    };
    let summary = pipeline.run(&LocalFileSource::new(&export))?;

    assert_eq!(summary.rows, 4);
    assert_eq!(summary.columns, 6);
    assert_eq!(summary.snapshot_path, pipeline.snapshot_path());
    assert!(pipeline.raw_dir.join("hr_raw.csv").exists());

    let frame = Frame::load_snapshot(&summary.snapshot_path)?;
    assert_eq!(
        frame.column_names(),
        vec!["age", "attrition", "businesstravel", "department", "monthlyincome", "overtime"]
    );
    assert_eq!(
        frame.column("attrition").map(|c| c.values.clone()),
        Some(ColumnValues::Numeric(vec![Some(1.0), Some(0.0), Some(1.0), Some(0.0)]))
    );
    Ok(())
}

#[test]
fn rerun_is_stable() -> Result<()> {
    let dir = tempdir()?;
    let export = dir.path().join("export.csv");
    fs::write(&export, IBM_SAMPLE)?;

    let pipeline = EtlPipeline {
        raw_dir: dir.path().join("raw"),
        processed_dir: dir.path().join("processed"),
        ..EtlPipeline::default()
    };
    pipeline.run(&LocalFileSource::new(&export))?;
    let first = fs::read(pipeline.snapshot_path())?;

    // The source disappearing does not matter once hr_raw.csv exists
    fs::remove_file(&export)?;
    pipeline.run(&LocalFileSource::new(&export))?;
    assert_eq!(first, fs::read(pipeline.snapshot_path())?);
    Ok(())
}
