use std::cell::RefCell;
use std::time::Duration;

use area_recognition::classify::{AreaRecord, ItemInfo};
use area_recognition::mission::{RetryPolicy, Sleeper, retry, select_target_area};
use area_recognition::{PerceptionError, Pose};

#[derive(Default)]
struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay_ms: 250,
    }
}

#[test]
fn test_retry_stops_on_first_success() {
    let sleeper = RecordingSleeper::default();
    let mut calls = Vec::new();
    let result = retry(&policy(10), &sleeper, |attempt| {
        calls.push(attempt);
        Ok((attempt == 2).then_some("found"))
    })
    .unwrap();
    assert_eq!(result, Some("found"));
    assert_eq!(calls, vec![0, 1, 2]);
    assert_eq!(
        *sleeper.sleeps.borrow(),
        vec![Duration::from_millis(250); 2]
    );
}

#[test]
fn test_retry_exhausts_budget() {
    let sleeper = RecordingSleeper::default();
    let mut count = 0;
    let result: Option<()> = retry(&policy(4), &sleeper, |_| {
        count += 1;
        Ok(None)
    })
    .unwrap();
    assert_eq!(result, None);
    assert_eq!(count, 4);
    assert_eq!(sleeper.sleeps.borrow().len(), 3);
}

#[test]
fn test_retry_propagates_errors() {
    let sleeper = RecordingSleeper::default();
    let result: Result<Option<()>, _> = retry(&policy(5), &sleeper, |attempt| {
        if attempt == 1 {
            Err(PerceptionError::PoseSolveFailure("collinear".to_string()))
        } else {
            Ok(None)
        }
    });
    assert!(matches!(result, Err(PerceptionError::PoseSolveFailure(_))));
    assert_eq!(sleeper.sleeps.borrow().len(), 1);
}

#[test]
fn test_retry_zero_attempts() {
    let sleeper = RecordingSleeper::default();
    let result = retry(&policy(0), &sleeper, |_| Ok(Some(1))).unwrap();
    assert_eq!(result, None);
    assert!(sleeper.sleeps.borrow().is_empty());
}

#[test]
fn test_select_target_area() {
    let area = |treasure: ItemInfo| AreaRecord::new(ItemInfo::Nothing, treasure, Pose::zero());
    let areas = [
        area(ItemInfo::item("crystal", 1)),
        area(ItemInfo::Nothing),
        area(ItemInfo::item("diamond", 1)),
        area(ItemInfo::item("diamond", 3)),
    ];
    assert_eq!(
        select_target_area(&areas, &ItemInfo::item("diamond", 1), 3),
        2
    );
    assert_eq!(
        select_target_area(&areas, &ItemInfo::item("emerald", 1), 3),
        3
    );
    assert_eq!(select_target_area(&areas, &ItemInfo::Nothing, 0), 0);
    assert_eq!(select_target_area(&[], &ItemInfo::item("coin", 1), 5), 5);
}
