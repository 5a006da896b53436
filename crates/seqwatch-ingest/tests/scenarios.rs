use std::fs;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, TimeZone};
use seqwatch_config::load_from_str;
use seqwatch_ingest::{Clock, IngestDispatcher, Run, RunSink, WatchState};
use seqwatch_telemetry::{ActivityJournal, Metrics};
use seqwatch_test_support::fixtures::{WatchLayout, dir_names, file_names};

#[derive(Default)]
struct RecordingSink {
    runs: Mutex<Vec<Run>>,
}

impl RecordingSink {
    fn runs(&self) -> Result<Vec<Run>> {
        Ok(self.runs.lock().map_err(|_| anyhow!("sink lock poisoned"))?.clone())
    }
}

impl RunSink for RecordingSink {
    fn dispatch(&self, run: &Run) -> Result<()> {
        self.runs
            .lock()
            .map_err(|_| anyhow!("sink lock poisoned"))?
            .push(run.clone());
        Ok(())
    }
}

struct FixedClock(DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

struct Harness {
    layout: WatchLayout,
    sink: Arc<RecordingSink>,
    metrics: Metrics,
    dispatcher: IngestDispatcher,
    state: WatchState,
}

const PIPELINES: &str = "pipelines:
  - prefix: sample
    run_command: nf-core/sarek
    multiple_inputs: false
  - prefix: rnaseq
    run_command: nf-core/rnaseq
    multiple_inputs: true
";

impl Harness {
    fn new() -> Result<Self> {
        let layout = WatchLayout::new()?;
        let config = Arc::new(load_from_str(&layout.config_yaml("nextflow", PIPELINES))?);
        let sink = Arc::new(RecordingSink::default());
        let metrics = Metrics::new()?;
        let at = Local
            .with_ymd_and_hms(2024, 6, 12, 9, 15, 42)
            .single()
            .ok_or_else(|| anyhow!("ambiguous fixture time"))?;
        let dispatcher = IngestDispatcher::new(
            config.clone(),
            sink.clone(),
            ActivityJournal::new(config.journal_path()),
            metrics.clone(),
        )
        .with_clock(Arc::new(FixedClock(at)));
        let state = dispatcher.prime()?;
        Ok(Self {
            layout,
            sink,
            metrics,
            dispatcher,
            state,
        })
    }

    fn tick(&mut self) -> Result<seqwatch_ingest::TickReport> {
        Ok(self.dispatcher.tick(&mut self.state)?)
    }

    fn processed(&self) -> std::path::PathBuf {
        self.layout.output_dir().join("processed")
    }
}

#[test]
fn complete_pair_lands_in_one_run_directory() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.layout.arrive("sample_A_R1.fastq.gz", b"r1")?;
    harness.layout.arrive("sample_A_R2.fastq.gz", b"r2")?;

    let report = harness.tick()?;

    assert_eq!(report.runs.len(), 1);
    let runs = harness.sink.runs()?;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, "sample_20240612-091542");
    assert_eq!(
        file_names(&runs[0].directory)?,
        vec!["A_R1.fastq.gz".to_string(), "A_R2.fastq.gz".to_string()]
    );
    assert!(file_names(&harness.layout.input_dir())?.is_empty());
    Ok(())
}

#[test]
fn half_pair_is_requeued_until_partner_arrives() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.layout.arrive("sample_B_R1.fastq.gz", b"r1")?;

    let first = harness.tick()?;
    assert_eq!(first.deferred, vec!["sample_B_R1.fastq.gz".to_string()]);
    assert!(first.runs.is_empty());
    assert!(!harness.state.previous().contains("sample_B_R1.fastq.gz"));
    assert_eq!(
        file_names(&harness.layout.input_dir())?,
        vec!["sample_B_R1.fastq.gz".to_string()]
    );

    let second = harness.tick()?;
    assert_eq!(second.new_files, vec!["sample_B_R1.fastq.gz".to_string()]);
    assert_eq!(second.deferred.len(), 1);

    harness.layout.arrive("sample_B_R2.fastq.gz", b"r2")?;
    let third = harness.tick()?;
    assert!(third.deferred.is_empty());
    assert_eq!(third.runs.len(), 1);
    assert_eq!(third.runs[0].inputs.len(), 2);
    assert_eq!(harness.metrics.snapshot().pairs_deferred_total, 2);
    Ok(())
}

#[test]
fn unclassifiable_file_is_quarantined_without_dispatch() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.layout.arrive("unknownfile.txt", b"?")?;

    let report = harness.tick()?;

    assert_eq!(report.quarantined, vec!["unknownfile.txt".to_string()]);
    assert!(harness.sink.runs()?.is_empty());
    let error_dir = harness.processed().join("error");
    assert_eq!(file_names(&error_dir)?, vec!["unknownfile.txt".to_string()]);
    assert_eq!(dir_names(&harness.processed())?, vec!["error".to_string()]);

    harness.layout.arrive("unknownfile.txt", b"again")?;
    harness.tick()?;
    assert_eq!(
        file_names(&error_dir)?,
        vec!["unknownfile.txt".to_string(), "unknownfile.txt.1".to_string()]
    );
    assert_eq!(fs::read(error_dir.join("unknownfile.txt"))?, b"?");
    Ok(())
}

#[test]
fn multi_input_pipeline_folds_same_prefix_files() -> Result<()> {
    let mut harness = Harness::new()?;
    for name in ["rnaseq_s1.fq", "rnaseq_s2.fq", "rnaseq_s3.fq"] {
        harness.layout.arrive(name, b"reads")?;
    }

    let report = harness.tick()?;

    assert_eq!(report.runs.len(), 1);
    let run = &report.runs[0];
    assert!(run.multi_input);
    assert_eq!(
        file_names(&run.directory)?,
        vec!["s1.fq".to_string(), "s2.fq".to_string(), "s3.fq".to_string()]
    );
    assert_eq!(harness.sink.runs()?.len(), 1);
    Ok(())
}

#[test]
fn multi_input_leaves_pair_incompatible_files_for_their_own_run() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.layout.arrive("rnaseq_x_R1.fastq.gz", b"r1")?;
    harness.layout.arrive("rnaseq_x_R2.fastq.gz", b"r2")?;
    harness.layout.arrive("rnaseq_y_R1.fastq.gz", b"r1")?;
    harness.layout.arrive("rnaseq_y_R2.fastq.gz", b"r2")?;
    harness.layout.arrive("rnaseq_single.fq", b"s")?;

    let report = harness.tick()?;

    assert!(report.failures.is_empty());
    assert_eq!(report.runs.len(), 2);
    let paired = report
        .runs
        .iter()
        .find(|run| run.inputs.len() == 4)
        .ok_or_else(|| anyhow!("paired run missing"))?;
    assert_eq!(
        file_names(&paired.directory)?,
        vec![
            "x_R1.fastq.gz".to_string(),
            "x_R2.fastq.gz".to_string(),
            "y_R1.fastq.gz".to_string(),
            "y_R2.fastq.gz".to_string(),
        ]
    );
    let single = report
        .runs
        .iter()
        .find(|run| run.inputs.len() == 1)
        .ok_or_else(|| anyhow!("single run missing"))?;
    assert_eq!(file_names(&single.directory)?, vec!["single.fq".to_string()]);
    Ok(())
}

#[test]
fn multi_input_sibling_with_clashing_name_gets_its_own_run() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.layout.arrive("RNASEQ_s1.fq", b"upper")?;
    harness.layout.arrive("rnaseq_s1.fq", b"lower")?;
    harness.layout.arrive("rnaseq_s2.fq", b"two")?;

    let report = harness.tick()?;

    assert!(report.failures.is_empty());
    assert_eq!(report.runs.len(), 2);
    assert_eq!(
        file_names(&report.runs[0].directory)?,
        vec!["s1.fq".to_string(), "s2.fq".to_string()]
    );
    assert_eq!(file_names(&report.runs[1].directory)?, vec!["s1.fq".to_string()]);
    assert_eq!(fs::read(report.runs[1].directory.join("s1.fq"))?, b"lower");
    assert!(file_names(&harness.layout.input_dir())?.is_empty());
    Ok(())
}

#[test]
fn unknown_prefix_still_relocates_and_dispatches() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.layout.arrive("mystery_data.csv", b"1,2")?;

    let report = harness.tick()?;

    assert_eq!(report.runs.len(), 1);
    assert_eq!(report.runs[0].prefix, "mystery");
    assert!(!report.runs[0].multi_input);
    Ok(())
}

#[test]
fn journal_records_tick_activity() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.layout.arrive("sample_c.txt", b"c")?;
    harness.layout.arrive("noprefix", b"n")?;
    harness.tick()?;

    let journal = fs::read_to_string(harness.layout.log_dir().join("service.log"))?;
    assert!(journal.contains("New files detected: [\"noprefix\", \"sample_c.txt\"]"));
    assert!(journal.contains("Processing file: sample_c.txt"));
    assert!(journal.contains("No prefix found in noprefix"));
    assert!(journal.contains("Run sample_20240612-091542 assembled with 1 input file(s)"));

    let snapshot = harness.metrics.snapshot();
    assert_eq!(snapshot.files_detected_total, 2);
    assert_eq!(snapshot.files_quarantined_total, 1);
    assert_eq!(snapshot.runs_dispatched_total, 1);
    Ok(())
}
