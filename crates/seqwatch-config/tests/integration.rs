use std::time::Duration;

use seqwatch_config::{
    ConfigError, FiletypePolicy, InputType, LogFormatSetting, load_from_path,
};
use seqwatch_test_support::fixtures::WatchLayout;

const PIPELINES: &str = r"
logging:
  level: debug
  format: json
pipelines:
  - prefix: RNAseq
    run_command: nf-core/rnaseq -r 3.12.0
    version: '23.04.1'
    profile: docker
    config: /etc/seqwatch/rnaseq.config
    with_tower: true
    params:
      - genome: GRCh38
      - aligner: star_salmon
    input_parameter: input
    input_type: directory
    output_parameter: outdir
    filetype: find
    multiple_inputs: true
  - prefix: bam
    run_command: local/bamqc
    input_parameter: bam
    filetype: bam
";

#[test]
fn load_from_path_builds_typed_pipelines() -> anyhow::Result<()> {
    let layout = WatchLayout::new()?;
    let path = layout.write_config(&layout.config_yaml("/opt/nextflow", PIPELINES))?;

    let config = load_from_path(&path)?;
    assert_eq!(config.input_dir, layout.input_dir());
    assert_eq!(config.poll_interval, Duration::from_secs(1));
    assert_eq!(config.tower_address.as_deref(), Some("http://tower.local:8000"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, Some(LogFormatSetting::Json));
    assert_eq!(config.pipelines.len(), 2);

    let rnaseq = config
        .find_pipeline("rnaseq")
        .ok_or_else(|| anyhow::anyhow!("rnaseq pipeline missing"))?;
    assert_eq!(rnaseq.run_command, vec!["nf-core/rnaseq", "-r", "3.12.0"]);
    assert_eq!(rnaseq.version.as_deref(), Some("23.04.1"));
    assert_eq!(rnaseq.profile.as_deref(), Some("docker"));
    assert!(rnaseq.with_tower);
    assert_eq!(rnaseq.params.len(), 2);
    assert_eq!(rnaseq.params[1].name, "aligner");
    assert_eq!(rnaseq.input_type, InputType::Directory);
    assert_eq!(rnaseq.filetype, Some(FiletypePolicy::Find));
    assert!(rnaseq.multiple_inputs);

    let bam = config
        .find_pipeline("BAM")
        .ok_or_else(|| anyhow::anyhow!("bam pipeline missing"))?;
    assert_eq!(bam.input_type, InputType::File);
    assert_eq!(bam.filetype, Some(FiletypePolicy::Fixed("bam".to_string())));
    assert!(bam.output_parameter.is_none());
    Ok(())
}

#[test]
fn load_from_path_reports_missing_file() -> anyhow::Result<()> {
    let layout = WatchLayout::new()?;
    let missing = layout.root().join("absent.yaml");
    assert!(matches!(
        load_from_path(&missing),
        Err(ConfigError::Read { path, .. }) if path == missing
    ));
    Ok(())
}

#[test]
fn load_from_path_rejects_invalid_prefix() -> anyhow::Result<()> {
    let layout = WatchLayout::new()?;
    let document = layout.config_yaml(
        "nextflow",
        "pipelines:\n  - prefix: rna_seq\n    run_command: main.nf\n",
    );
    let path = layout.write_config(&document)?;
    assert!(matches!(
        load_from_path(&path),
        Err(ConfigError::InvalidField { field: "prefix", .. })
    ));
    Ok(())
}
