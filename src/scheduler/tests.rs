use std::convert::Infallible;

use super::*;

fn record<'a>(
    seen: &'a mut Vec<(SimTime, &'static str)>,
) -> impl FnMut(&mut Scheduler<&'static str>, &'static str) -> Result<(), Infallible> + 'a {
    move |scheduler, event| {
        seen.push((scheduler.now(), event));
        Ok(())
    }
}

/// Tests event ordering:
/// - events run in time order regardless of registration order
/// - ties run in registration order
#[test]
fn test_time_order_with_fifo_ties() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule_at(SimTime::from_secs(2), "late");
    scheduler.schedule_at(SimTime::from_secs(1), "tie-a");
    scheduler.schedule_at(SimTime::ZERO, "first");
    scheduler.schedule_at(SimTime::from_secs(1), "tie-b");
    scheduler.schedule_at(SimTime::from_secs(1), "tie-c");

    let mut seen = Vec::new();
    let outcome = scheduler.run(record(&mut seen)).unwrap();

    assert_eq!(outcome, RunOutcome::Drained);
    let order: Vec<&str> = seen.iter().map(|(_, e)| *e).collect();
    assert_eq!(order, vec!["first", "tie-a", "tie-b", "tie-c", "late"]);
    assert_eq!(seen[4].0, SimTime::from_secs(2));
    assert_eq!(scheduler.executed(), 5);
}

#[test]
fn test_handlers_can_schedule_more_events() {
    let mut scheduler: Scheduler<u32> = Scheduler::new();
    scheduler.schedule_at(SimTime::ZERO, 0);

    let mut times = Vec::new();
    scheduler
        .run(|scheduler, hop| -> Result<(), Infallible> {
            times.push(scheduler.now());
            if hop < 3 {
                scheduler.schedule_in(SimTime::from_millis(10), hop + 1);
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(
        times,
        vec![
            SimTime::ZERO,
            SimTime::from_millis(10),
            SimTime::from_millis(20),
            SimTime::from_millis(30)
        ]
    );
}

/// Events after the stop time stay queued; events exactly at it still run
#[test]
fn test_stop_time() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule_at(SimTime::from_secs(100), "at-stop");
    scheduler.schedule_at(SimTime::from_secs(101), "after-stop");
    scheduler.stop(SimTime::from_secs(100));

    let mut seen = Vec::new();
    let outcome = scheduler.run(record(&mut seen)).unwrap();

    assert_eq!(outcome, RunOutcome::Stopped { pending: 1 });
    assert_eq!(seen, vec![(SimTime::from_secs(100), "at-stop")]);
    assert_eq!(scheduler.now(), SimTime::from_secs(100));
}

#[test]
fn test_past_events_run_now() {
    let mut scheduler: Scheduler<&str> = Scheduler::new();
    scheduler.schedule_at(SimTime::from_secs(5), "advance");
    let mut seen = Vec::new();
    scheduler
        .run(|scheduler, event| -> Result<(), Infallible> {
            seen.push((scheduler.now(), event));
            if event == "advance" {
                scheduler.schedule_at(SimTime::from_secs(1), "stale");
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(seen[1], (SimTime::from_secs(5), "stale"));
}

#[test]
fn test_handler_error_stops_the_run() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule_at(SimTime::from_secs(1), 1u8);
    scheduler.schedule_at(SimTime::from_secs(2), 2u8);

    let result = scheduler.run(|_, event| if event == 1 { Err("boom") } else { Ok(()) });
    assert_eq!(result, Err("boom"));
    assert_eq!(scheduler.pending(), 1);
    assert_eq!(scheduler.now(), SimTime::from_secs(1));
}
