mod common;

use anyhow::Result;
use common::{num, text, xpt, Cell};
use httpmock::prelude::*;
use httpmock::Mock;
use survey_etl::{
    combine, CliConfig, EtlEngine, EtlError, LocalStorage, SurveyPipeline, COMBINED_FILE_NAME,
};
use tempfile::TempDir;

const VARIABLES: &str = "\
Data Set,Data Set Name,Variable,Variable Common Name
DEMO,Demographics,ridageyr,Age
DEMO,Demographics,RIAGENDR,Gender
BPX,Blood Pressure,BPXSY1,Systolic
BPX,Blood Pressure, bpxdi1 ,Diastolic
";

fn demo_xpt() -> Vec<u8> {
    let rows: Vec<Vec<Cell>> = (1..=5)
        .map(|n| {
            vec![
                Cell::Num(n as f64),
                Cell::Num(if n % 2 == 0 { 2.0 } else { 1.0 }),
                Cell::Text("10"),
                Cell::Num(20.0 + n as f64),
            ]
        })
        .collect();
    xpt(
        "DEMO",
        &[num("SEQN"), num("RIAGENDR"), text("SDDSRVYR", 2), num("RIDAGEYR")],
        &rows,
    )
}

fn bpx_xpt() -> Vec<u8> {
    let rows: Vec<Vec<Cell>> = [2, 3, 5, 9]
        .into_iter()
        .map(|n| {
            vec![
                Cell::Num(n as f64),
                Cell::Num(100.0 + n as f64),
                if n == 5 {
                    Cell::Missing
                } else {
                    Cell::Num(70.0 + n as f64)
                },
            ]
        })
        .collect();
    xpt("BPX", &[num("SEQN"), num("BPXSY1"), num("BPXDI1")], &rows)
}

struct Fixture {
    temp_dir: TempDir,
    server: MockServer,
}

impl Fixture {
    async fn new(variables: &str) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        std::fs::write(temp_dir.path().join("variables.csv"), variables)?;
        let server = MockServer::start_async().await;
        Ok(Self { temp_dir, server })
    }

    async fn serve(&self, path: &str, body: Vec<u8>) -> Mock<'_> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path.to_string());
                then.status(200)
                    .header("Content-Type", "application/octet-stream")
                    .body(body);
            })
            .await
    }

    fn output_path(&self) -> String {
        self.temp_dir.path().join("data").to_str().unwrap().to_string()
    }

    fn config(&self) -> CliConfig {
        CliConfig {
            variables_file: self
                .temp_dir
                .path()
                .join("variables.csv")
                .to_str()
                .unwrap()
                .to_string(),
            output_path: self.output_path(),
            base_url: self.server.base_url(),
            year_block: "2017-2018".to_string(),
            url_overrides: vec![],
            config: None,
            verbose: false,
            monitor: false,
        }
    }

    async fn run(&self, config: CliConfig) -> survey_etl::Result<String> {
        let storage = LocalStorage::new(config.output_path.clone());
        let pipeline = SurveyPipeline::from_config(storage, config)?;
        EtlEngine::new(pipeline).run().await
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(std::path::Path::new(&self.output_path()).join(name)).unwrap()
    }
}

const EXPECTED_COMBINED: &str = "\
Systolic,Diastolic,Age,Gender
102.0,72.0,22.0,2.0
103.0,73.0,23.0,1.0
105.0,,25.0,1.0
";

#[tokio::test]
async fn test_end_to_end_fetch_project_combine() -> Result<()> {
    let fixture = Fixture::new(VARIABLES).await?;
    let demo_mock = fixture.serve("/2017-2018/DEMO.XPT", demo_xpt()).await;
    let bpx_mock = fixture.serve("/2017-2018/BPX.XPT", bpx_xpt()).await;

    let output = fixture.run(fixture.config()).await?;

    demo_mock.assert_async().await;
    bpx_mock.assert_async().await;
    assert!(output.ends_with(COMBINED_FILE_NAME));

    // Per-dataset files are projected, renamed and keyed in configured order.
    assert_eq!(
        fixture.read("DEMO.csv"),
        "SEQN,Age,Gender\n1,21.0,1.0\n2,22.0,2.0\n3,23.0,1.0\n4,24.0,2.0\n5,25.0,1.0\n"
    );
    assert_eq!(
        fixture.read("BPX.csv"),
        "SEQN,Systolic,Diastolic\n2,102.0,72.0\n3,103.0,73.0\n5,105.0,\n9,109.0,79.0\n"
    );

    // Only the three shared subjects survive, and SEQN is not written.
    assert_eq!(fixture.read(COMBINED_FILE_NAME), EXPECTED_COMBINED);

    let mut files: Vec<String> = std::fs::read_dir(fixture.output_path())?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    files.sort();
    assert_eq!(files, vec!["BPX.csv", "DEMO.csv", "combined.csv"]);
    Ok(())
}

#[tokio::test]
async fn test_rerun_does_not_join_previous_combined_output() -> Result<()> {
    let fixture = Fixture::new(VARIABLES).await?;
    fixture.serve("/2017-2018/DEMO.XPT", demo_xpt()).await;
    fixture.serve("/2017-2018/BPX.XPT", bpx_xpt()).await;

    fixture.run(fixture.config()).await?;
    fixture.run(fixture.config()).await?;

    assert_eq!(fixture.read(COMBINED_FILE_NAME), EXPECTED_COMBINED);
    Ok(())
}

#[tokio::test]
async fn test_missing_variable_stops_the_run() -> Result<()> {
    let variables = "\
Data Set,Data Set Name,Variable,Variable Common Name
DEMO,Demographics,RIDAGEYR,Age
";
    let fixture = Fixture::new(variables).await?;
    let rows = vec![vec![Cell::Num(1.0), Cell::Num(1.0)]];
    fixture
        .serve(
            "/2017-2018/DEMO.XPT",
            xpt("DEMO", &[num("SEQN"), num("RIAGENDR")], &rows),
        )
        .await;

    let err = fixture.run(fixture.config()).await.unwrap_err();

    assert!(matches!(err, EtlError::MissingVariableError { .. }));
    assert_eq!(
        err.to_string(),
        "Variable RIDAGEYR not found in dataset Demographics"
    );
    assert!(!std::path::Path::new(&fixture.output_path())
        .join(COMBINED_FILE_NAME)
        .exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_variable_stops_before_next_download() -> Result<()> {
    let fixture = Fixture::new(VARIABLES).await?;
    let rows = vec![vec![Cell::Num(1.0), Cell::Num(1.0)]];
    fixture
        .serve(
            "/2017-2018/DEMO.XPT",
            xpt("DEMO", &[num("SEQN"), num("RIAGENDR")], &rows),
        )
        .await;
    let bpx_mock = fixture
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/2017-2018/BPX.XPT");
            then.status(404);
        })
        .await;

    let err = fixture.run(fixture.config()).await.unwrap_err();

    assert!(
        matches!(err, EtlError::MissingVariableError { ref variable, .. } if variable == "RIDAGEYR")
    );
    assert_eq!(bpx_mock.hits_async().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_partial_failure_leaves_earlier_datasets_projected() -> Result<()> {
    let variables = "\
Data Set,Data Set Name,Variable,Variable Common Name
DEMO,Demographics,RIDAGEYR,Age
BPX,Blood Pressure,BPXPLS,Pulse
LAB,Laboratory,LBXGLU,Glucose
";
    let fixture = Fixture::new(variables).await?;
    fixture.serve("/2017-2018/DEMO.XPT", demo_xpt()).await;
    fixture.serve("/2017-2018/BPX.XPT", bpx_xpt()).await;
    let lab_mock = fixture.serve("/2017-2018/LAB.XPT", Vec::new()).await;

    let err = fixture.run(fixture.config()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Variable BPXPLS not found in dataset Blood Pressure"
    );
    assert_eq!(lab_mock.hits_async().await, 0);

    // The dataset before the failure is projected; the failing one keeps
    // every fetched column; nothing was combined.
    assert_eq!(
        fixture.read("DEMO.csv"),
        "SEQN,Age\n1,21.0\n2,22.0\n3,23.0\n4,24.0\n5,25.0\n"
    );
    assert!(fixture
        .read("BPX.csv")
        .starts_with("SEQN,BPXSY1,BPXDI1\n2,102.0,72.0\n"));

    let mut files: Vec<String> = std::fs::read_dir(fixture.output_path())?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    files.sort();
    assert_eq!(files, vec!["BPX.csv", "DEMO.csv"]);
    Ok(())
}

#[tokio::test]
async fn test_fractional_identifier_is_rejected() -> Result<()> {
    let variables = "\
Data Set,Data Set Name,Variable,Variable Common Name
DEMO,Demographics,RIAGENDR,Gender
";
    let fixture = Fixture::new(variables).await?;
    let rows = vec![vec![Cell::Num(1.5), Cell::Num(1.0)]];
    fixture
        .serve(
            "/2017-2018/DEMO.XPT",
            xpt("DEMO", &[num("SEQN"), num("RIAGENDR")], &rows),
        )
        .await;

    let err = fixture.run(fixture.config()).await.unwrap_err();
    assert!(matches!(err, EtlError::IdentifierCastError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_explicit_url_names_files_after_url() -> Result<()> {
    let variables = "\
Data Set,Data Set Name,Variable,Variable Common Name
DEMO,Demographics,RIDAGEYR,Age
";
    let fixture = Fixture::new(variables).await?;
    let mock = fixture.serve("/mirror/P_DEMO.XPT", demo_xpt()).await;

    let mut config = fixture.config();
    config.url_overrides = vec![(
        "DEMO".to_string(),
        fixture.server.url("/mirror/P_DEMO.XPT"),
    )];
    fixture.run(config).await?;

    mock.assert_async().await;
    assert!(fixture.read("P_DEMO.csv").starts_with("SEQN,Age\n1,21.0\n"));
    assert_eq!(
        fixture.read(COMBINED_FILE_NAME),
        "Age\n21.0\n22.0\n23.0\n24.0\n25.0\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_combine_empty_directory_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join(COMBINED_FILE_NAME), "Age\n1\n")?;
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

    let err = combine(&storage).await.unwrap_err();
    assert!(matches!(err, EtlError::NoInputFilesError { .. }));
    Ok(())
}
