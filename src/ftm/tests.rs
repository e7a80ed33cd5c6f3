use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::*;
use crate::channel::{FrequencyBand, LossModelKind};
use crate::error_model::{select_error_model, ErrorMap};
use crate::topology::Topology;
use crate::types::Position;

fn configured_session(params: FtmParams) -> FtmSession {
    let mut topology = Topology::new();
    topology.add_anchor().unwrap();
    let id = topology.add_station(Position::new(5.0, 0.0)).unwrap();
    let anchor_mac = topology.anchor().unwrap().mac();
    let station = topology.node(id).unwrap();

    let map = Arc::new(ErrorMap::new(1, 1, 1.0, vec![0.0]).unwrap());
    let mut session = station.device().new_ftm_session(id, anchor_mac).unwrap();
    session.set_params(params);
    session.set_error_model(select_error_model(80, station, &map).unwrap());
    session
}

#[test]
fn test_ideal_rtt() {
    // Five metres there and back is a little over 33 ns
    let rtt = ideal_rtt_ps(5.0);
    assert!((rtt - 33_356.4).abs() < 0.1, "{}", rtt);
    assert_eq!(ideal_rtt_ps(0.0), 0.0);
}

/// Tests the frame plan of the default parameters:
/// - two bursts of two frames each
/// - the first burst starts right after negotiation (ASAP)
/// - bursts are spaced by the longer of period and duration
#[test]
fn test_default_plan() {
    let mut session = configured_session(FtmParams::default());
    session.mark_scheduled().unwrap();
    let plan = session.begin(SimTime::from_secs(1)).unwrap();

    let first = SimTime::from_secs(1).saturating_add(NEGOTIATION_TIME);
    let spacing = SimTime::from_millis(128);
    let delta = SimTime::from_millis(64);
    assert_eq!(
        plan.frames,
        vec![
            PlannedFrame { at: first, burst: 0, frame: 0 },
            PlannedFrame { at: first + delta, burst: 0, frame: 1 },
            PlannedFrame { at: first + spacing, burst: 1, frame: 0 },
            PlannedFrame { at: first + spacing + delta, burst: 1, frame: 1 },
        ]
    );
    assert_eq!(plan.dropped, 0);
    assert_eq!(plan.ends_at, first + spacing + spacing);
    assert_eq!(session.state(), SessionState::Running);
}

#[test]
fn test_non_asap_waits_one_period() {
    let params = FtmParams { asap: false, ..FtmParams::default() };
    let mut session = configured_session(params);
    session.mark_scheduled().unwrap();
    let plan = session.begin(SimTime::ZERO).unwrap();
    assert_eq!(plan.frames[0].at, NEGOTIATION_TIME + SimTime::from_millis(100));
}

/// Frames past the burst window are dropped, the first frame of a burst never is
#[test]
fn test_frames_outside_window_are_dropped() {
    // 250 µs window, 100 µs spacing, 5 frames: offsets 0, 100, 200 fit
    let params = FtmParams {
        burst_duration: 2,
        min_delta_ftm: 1,
        ftms_per_burst: 5,
        number_of_bursts_exponent: 0,
        ..FtmParams::default()
    };
    let mut session = configured_session(params);
    session.mark_scheduled().unwrap();
    let plan = session.begin(SimTime::ZERO).unwrap();
    assert_eq!(plan.frames.len(), 3);
    assert_eq!(plan.dropped, 2);
}

/// Tests the session lifecycle:
/// - it is single-shot and cannot be scheduled or started twice
/// - completion fires the one-shot exactly once with the recorded statistics
#[test]
fn test_lifecycle_and_completion() {
    let mut session = configured_session(FtmParams::default());
    let (sender, mut receiver) = oneshot::channel();
    session.set_completion(sender);

    assert!(matches!(session.begin(SimTime::ZERO), Err(SessionError::InvalidTransition { .. })));
    session.mark_scheduled().unwrap();
    assert!(session.mark_scheduled().is_err());
    let plan = session.begin(SimTime::ZERO).unwrap();

    let channel = ChannelModel::new(FrequencyBand::Band2_4GHz, LossModelKind::ThreeGppIndoorOffice, 0.0);
    let mut rng = StdRng::seed_from_u64(11);
    for _ in &plan.frames {
        let measurement = session.measure(5.0, &channel, &mut rng).unwrap();
        assert!(measurement.rtt_ps >= 0.0);
    }
    assert_eq!(session.measurement_count(), 4);

    let report = session.complete(plan.ends_at).unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(report.statistics.measurement_count(), 4);
    assert!(report.statistics.mean_rtt_ps >= 0.0);
    assert_eq!(receiver.try_recv().unwrap(), report);

    assert!(session.complete(plan.ends_at).is_err());
    session.fail();
    assert_eq!(session.state(), SessionState::Completed);
}

#[test]
fn test_failed_session_drops_completion() {
    let mut session = configured_session(FtmParams::default());
    let (sender, mut receiver) = oneshot::channel();
    session.set_completion(sender);
    session.mark_scheduled().unwrap();
    session.fail();
    assert_eq!(session.state(), SessionState::Failed);
    assert!(receiver.try_recv().is_err());
}

#[test]
fn test_scheduling_requires_valid_setup() {
    let mut session = configured_session(FtmParams { burst_duration: 12, ..FtmParams::default() });
    assert_eq!(
        session.mark_scheduled(),
        Err(SessionError::InvalidParams(FtmParamsError::ReservedBurstDuration(12)))
    );
    assert_eq!(session.state(), SessionState::Configured);

    // Zero spacing or an oversized burst never reaches the planner
    let mut stacked = configured_session(FtmParams { min_delta_ftm: 0, ..FtmParams::default() });
    assert_eq!(
        stacked.mark_scheduled(),
        Err(SessionError::InvalidParams(FtmParamsError::ZeroMinDeltaFtm))
    );
    assert!(matches!(stacked.begin(SimTime::ZERO), Err(SessionError::InvalidTransition { .. })));
    let mut oversized = configured_session(FtmParams { ftms_per_burst: 1_000_000, ..FtmParams::default() });
    assert_eq!(
        oversized.mark_scheduled(),
        Err(SessionError::InvalidParams(FtmParamsError::TooManyFramesPerBurst(1_000_000)))
    );

    let mut bare = FtmSession::new(NodeId(1), MacAddress::from_index(2), MacAddress::from_index(1));
    assert_eq!(bare.mark_scheduled(), Err(SessionError::MissingErrorModel(NodeId(1))));
}

#[test]
fn test_report_format() {
    let report = SessionReport {
        station: NodeId(1),
        initiator: MacAddress::from_index(2),
        responder: MacAddress::from_index(1),
        params: FtmParams::default(),
        started_at: SimTime::ZERO,
        completed_at: SimTime::from_secs(1),
        statistics: SessionStatistics::from_samples(vec![30_000.0, 40_000.0], vec![-40.0, -42.0]),
    };
    let text = report.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("FTM params: "));
    assert_eq!(lines[1], "Mean RTT [ps]: 35000");
    assert_eq!(lines[2], "Mean Signal Strength [dBm]: -41");
    assert_eq!(lines[3], "Number of Measurements: 2");
}
