//! Tests for resource accounting through the public API

use prometheus_job_runner::core::ResourceTable;
use rand::Rng;

const CAPACITY: [(&str, u32); 3] = [("cpu", 4), ("gpu", 1), ("disk", 2)];

fn random_job(rng: &mut impl Rng) -> Vec<String> {
    let names = ["cpu", "gpu", "disk", "cpu"];
    let len = rng.random_range(0..=3);
    (0..len)
        .map(|_| names[rng.random_range(0..names.len())].to_string())
        .collect()
}

#[test]
fn test_random_reserve_release_conserves_capacity() {
    let mut rng = rand::rng();
    let mut table = ResourceTable::new(CAPACITY);
    let mut held: Vec<Vec<String>> = Vec::new();

    for step in 0..500_u64 {
        if !held.is_empty() && rng.random_bool(0.4) {
            let job = held.swap_remove(rng.random_range(0..held.len()));
            table.recover(step, &job);
        } else {
            let job = random_job(&mut rng);
            if table.is_available(&job) {
                table.reduce(step, &job).unwrap();
                held.push(job);
            } else {
                assert!(table.reduce(step, &job).is_err());
            }
        }

        for (name, capacity) in CAPACITY {
            let in_use: u32 = held
                .iter()
                .map(|job| job.iter().filter(|n| *n == name).count() as u32)
                .sum();
            assert_eq!(table.available(name), Some(capacity - in_use), "{name} at step {step}");
        }
    }

    for job in held.drain(..) {
        table.recover(0, &job);
    }
    assert_eq!(table, ResourceTable::new(CAPACITY));
}

#[test]
fn test_snapshot_is_sorted_by_name() {
    let table = ResourceTable::new(CAPACITY);
    let names: Vec<String> = table.snapshot().into_keys().collect();
    assert_eq!(names, vec!["cpu", "disk", "gpu"]);
}

#[test]
fn test_capacity_unchanged_by_reservations() {
    let mut table = ResourceTable::new(CAPACITY);
    table.reduce(0, &["gpu".to_string()]).unwrap();
    assert_eq!(table.capacity("gpu"), Some(1));
    assert_eq!(table.available("gpu"), Some(0));
    assert!(table.can_ever_satisfy(&["gpu".to_string()]));
}
