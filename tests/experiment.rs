use ftm_ranging::{
    ftm::SessionReport,
    orchestrator::{ErrorMapSource, Experiment, ExperimentConfig, StartMode},
    types::{NodeId, SessionState, SimTime},
    Layout,
};

fn immediate_config(stations: usize) -> ExperimentConfig {
    ExperimentConfig {
        stations,
        distance: 5.0,
        layout: Layout::Circle,
        start_mode: StartMode::Immediate,
        error_map: ErrorMapSource::Generated { width: 50, height: 50 },
        seed: 7,
        ..ExperimentConfig::default()
    }
}

/// Tests a full run with one anchor and two stations:
/// - both sessions complete before the stop time
/// - each reports four measurements (exponent 1, two FTMs per burst)
/// - every round-trip time and the mean are non-negative
/// - the completion handles resolve with the same reports
#[tokio::test]
async fn test_two_stations_complete() {
    println!("[TEST]   Running two-station experiment");
    let mut experiment = Experiment::setup(immediate_config(2)).expect("Failed to set up experiment");
    let handles = experiment.launch_sessions().expect("Failed to launch sessions");
    assert_eq!(handles.len(), 2);
    assert_eq!(experiment.session_state(NodeId(1)), Some(SessionState::Scheduled));

    let report = experiment.run().expect("Experiment run failed");
    assert!(report.incomplete.is_empty());
    assert_eq!(report.completed.len(), 2);
    assert!(report.finished_at < report.stop_time);

    for session in &report.completed {
        assert_eq!(session.statistics.measurement_count(), 4);
        assert!(session.statistics.mean_rtt_ps >= 0.0);
        assert!(session.statistics.individual_rtt_ps.iter().all(|rtt| *rtt >= 0.0));
        assert!(session.completed_at < SimTime::from_secs(100));
    }

    let reports: Vec<SessionReport> = futures::future::join_all(handles.into_iter().map(|h| h.completion()))
        .await
        .into_iter()
        .map(|report| report.expect("Session did not complete"))
        .collect();
    for delivered in &reports {
        assert_eq!(Some(delivered), report.session(delivered.station));
    }
    println!("[TEST]   Two-station experiment passed");
}

/// Staggered starts with a 200 s gap register at 0, 200 and 400 s in station order
#[tokio::test]
async fn test_staggered_starts() {
    let config = ExperimentConfig {
        start_mode: StartMode::Staggered { gap_secs: 200.0 },
        ..immediate_config(3)
    };
    let mut experiment = Experiment::setup(config).expect("Failed to set up experiment");
    let handles = experiment.launch_sessions().expect("Failed to launch sessions");

    let expected = vec![
        (NodeId(1), SimTime::ZERO),
        (NodeId(2), SimTime::from_secs(200)),
        (NodeId(3), SimTime::from_secs(400)),
    ];
    assert_eq!(experiment.session_starts(), expected.as_slice());
    let offsets: Vec<SimTime> = handles.iter().map(|h| h.start_offset()).collect();
    assert_eq!(offsets, vec![SimTime::ZERO, SimTime::from_secs(200), SimTime::from_secs(400)]);

    let report = experiment.run().expect("Experiment run failed");
    let order: Vec<NodeId> = report.completed.iter().map(|r| r.station).collect();
    assert_eq!(order, vec![NodeId(1), NodeId(2), NodeId(3)]);
    for (session, (_, start)) in report.completed.iter().zip(&expected) {
        assert_eq!(session.started_at, *start);
    }
}

/// The same seed reproduces the same measurements
#[tokio::test]
async fn test_runs_are_reproducible() {
    let first = ftm_ranging::run_experiment(immediate_config(2)).expect("First run failed");
    let second = ftm_ranging::run_experiment(immediate_config(2)).expect("Second run failed");
    assert_eq!(first.completed, second.completed);

    let other_seed = ftm_ranging::run_experiment(ExperimentConfig { seed: 8, ..immediate_config(2) })
        .expect("Third run failed");
    assert_ne!(first.completed, other_seed.completed);
}

/// The transcript ends with the per-session summary in its line format
#[tokio::test]
async fn test_transcript_summary_lines() {
    let report = ftm_ranging::run_experiment(immediate_config(1)).expect("Experiment run failed");
    let text = report.transcript_text();
    assert!(text.contains("Number of stations:     1"));
    assert!(text.contains("FTM params: "));
    assert!(text.contains("Mean RTT [ps]: "));
    assert!(text.contains("Mean Signal Strength [dBm]: "));
    assert!(text.contains("Number of Measurements: 4"));
}

#[tokio::test]
async fn test_trace_is_written() {
    let dir = std::env::temp_dir().join(format!("ftm-experiment-trace-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    let config = ExperimentConfig {
        trace_path: Some(dir.join("ftm")),
        ..immediate_config(2)
    };
    ftm_ranging::run_experiment(config).expect("Experiment run failed");

    let trace = std::fs::read_to_string(dir.join("ftm.jsonl")).expect("Trace file missing");
    assert_eq!(trace.lines().count(), 8);
    let first: serde_json::Value = serde_json::from_str(trace.lines().next().unwrap()).unwrap();
    for field in ["time_ps", "station", "burst", "frame", "rtt_ps", "rssi_dbm"] {
        assert!(first.get(field).is_some(), "missing {}", field);
    }
    std::fs::remove_dir_all(&dir).expect("Failed to clean up");
}
