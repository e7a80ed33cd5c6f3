use simulator::config::{Config, ConfigError, SweepAxis, SweepConfig};
use simulator::{combinations, parse_output, SweepRunner};
use std::fs;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ftm_simulator_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn axis(name: &str, values: &[f64]) -> SweepAxis {
    SweepAxis {
        name: name.to_string(),
        values: values.to_vec(),
    }
}

/// Tests sweep configuration parsing:
/// - defaults fill in omitted experiment parameters and repetitions
/// - axes keep their declared order
#[test]
fn test_sweep_config_parsing() {
    let config = SweepConfig::from_toml(
        r#"
        [sweep]
        name = "bw"
        results_dir = "out"

        [[sweep.axis]]
        name = "channelBandwidth"
        values = [20, 40]
        "#,
    )
    .expect("Failed to parse sweep config");

    assert_eq!(config.sweep.repetitions, 3);
    assert_eq!(config.sweep.axis, vec![axis("channelBandwidth", &[20.0, 40.0])]);
    assert_eq!(config.experiment.stations, 1);
    assert_eq!(config.experiment.channel_bandwidth_mhz, 20);
}

/// Tests that invalid sweeps are rejected before anything runs:
/// - unsupported bandwidth values
/// - unknown parameter names
/// - empty and duplicate axes
/// - zero repetitions
#[test]
fn test_sweep_config_validation() {
    let cases = [
        "[sweep]\nname='a'\nresults_dir='o'\n[[sweep.axis]]\nname='channelBandwidth'\nvalues=[30]",
        "[sweep]\nname='a'\nresults_dir='o'\n[[sweep.axis]]\nname='noSuchParameter'\nvalues=[1]",
        "[sweep]\nname='a'\nresults_dir='o'\n[[sweep.axis]]\nname='distance'\nvalues=[]",
        "[sweep]\nname='a'\nresults_dir='o'\n[[sweep.axis]]\nname='distance'\nvalues=[1]\n[[sweep.axis]]\nname='distance'\nvalues=[2]",
        "[sweep]\nname='a'\nresults_dir='o'\nrepetitions=0",
    ];
    for case in cases {
        let result = SweepConfig::from_toml(case);
        println!("[TEST] {:?}", result.as_ref().err());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    assert!(matches!(Config::from_toml("[output]\nresults_dir = 'o'\n[experiment]\nstations = 0"), Err(ConfigError::ValidationError(_))));
    assert!(matches!(Config::from_toml("[experiment]\nstations = 1"), Err(ConfigError::ParseError(_))));
}

/// Tests combination order and naming:
/// - new axes form the outer loop, earlier axes vary fastest
/// - names are `name=value` pairs joined by `_`
/// - no axes yields a single baseline combination
#[test]
fn test_combinations() {
    let combos = combinations(&[axis("channelBandwidth", &[20.0, 40.0]), axis("distance", &[5.0, 10.5])]);
    let names: Vec<String> = combos.iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec![
            "channelBandwidth=20_distance=5",
            "channelBandwidth=40_distance=5",
            "channelBandwidth=20_distance=10.5",
            "channelBandwidth=40_distance=10.5",
        ]
    );

    let baseline = combinations(&[]);
    assert_eq!(baseline.len(), 1);
    assert_eq!(baseline[0].name(), "baseline");
}

/// Tests a complete sweep run:
/// - every run writes output.txt and a trace under `<combo>/<run>/`
/// - each combination aggregates one summary per station per run
/// - sweep_results.json and one series file per metric are written
/// - RTT results are related to the ideal RTT of the configured distance
#[tokio::test]
async fn test_sweep_run_writes_outputs() {
    let dir = temp_dir("sweep");
    let toml = format!(
        r#"
        [experiment]
        stations = 2

        [experiment.start_mode]
        mode = "immediate"

        [sweep]
        name = "small"
        results_dir = "{}"
        repetitions = 2

        [[sweep.axis]]
        name = "channelBandwidth"
        values = [20, 160]
        "#,
        dir.display().to_string().replace('\\', "/")
    );
    let config = SweepConfig::from_toml(&toml).expect("Failed to parse sweep config");
    let runner = SweepRunner::new(config);
    let results = runner.run().await.expect("Failed to run sweep");

    assert_eq!(results.combinations.len(), 2);
    for stats in &results.combinations {
        println!("[TEST] {} -> {:?}", stats.combination, stats.mean_rtt_ps);
        assert_eq!(stats.seeds.len(), 2);
        assert!(stats.seeds.iter().all(|seed| (100_000..=999_999).contains(seed)));
        assert_eq!(stats.mean_rtt_ps.samples, 4);
        assert_eq!(stats.measurements.mean, 4.0);
        assert_eq!(stats.measurements.std, 0.0);
        assert!(stats.mean_rtt_ps.mean > 0.0);
    }

    for combo in ["channelBandwidth=20", "channelBandwidth=160"] {
        for run in ["1", "2"] {
            let run_dir = dir.join(combo).join(run);
            let output = fs::read_to_string(run_dir.join("output.txt")).expect("Failed to read run output");
            assert_eq!(parse_output(&output).measurements, vec![4.0, 4.0]);
            assert!(run_dir.join("results.json").exists());
            assert!(run_dir.join(format!("{}.jsonl", run)).exists());
        }
    }
    assert!(dir.join("sweep_results.json").exists());

    // Every metric is saved as a series; RTT is set against the ideal RTT at 5 m
    let ideal = ftm_ranging::ftm::ideal_rtt_ps(5.0);
    assert_eq!(results.ideal_rtt_ps, ideal);
    assert_eq!(results.series.len(), 3);
    for series in &results.series {
        assert_eq!(series.points.len(), 2);
        assert!(dir.join(format!("{}_series.json", series.file_stem)).exists());
    }
    assert_eq!(results.series[0].reference, Some(ideal));
    assert!(results.series[1..].iter().all(|series| series.reference.is_none()));
    for stats in &results.combinations {
        assert_eq!(stats.ideal_rtt_ps, ideal);
        assert_eq!(stats.rtt_bias_ps, stats.mean_rtt_ps.mean - ideal);
    }

    fs::remove_dir_all(&dir).expect("Failed to clean up sweep directory");
}
