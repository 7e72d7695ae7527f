use std::{collections::BTreeSet, sync::Arc, thread};

use anyhow::{Result, anyhow};
use products_hr::{EmployeeDraft, EmployeeStore, PageRequest};

const WRITERS: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_get_gap_free_ids() -> Result<()> {
    let store = Arc::new(EmployeeStore::new());
    let handles = (0..WRITERS)
        .map(|n| {
            let store = store.clone();
            tokio::spawn(async move {
                store.create(EmployeeDraft::new(format!("task-{n}"), "Eng", n as f64))
            })
        })
        .collect::<Vec<_>>();

    let mut ids = BTreeSet::new();
    for handle in handles {
        let created = handle.await?;
        if !ids.insert(created.id) {
            return Err(anyhow!("id {} assigned twice", created.id));
        }
    }

    let expected = (1..=WRITERS as u64).collect::<BTreeSet<_>>();
    assert_eq!(ids, expected);
    assert_eq!(store.len(), WRITERS);

    let listed = store.list(PageRequest::new(1, WRITERS)?);
    let names = listed.iter().map(|e| e.name.clone()).collect::<BTreeSet<_>>();
    assert_eq!(names.len(), WRITERS);
    Ok(())
}

#[test]
fn concurrent_threads_mixing_writes_and_reads() -> Result<()> {
    let store = Arc::new(EmployeeStore::new());
    let writers = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|n| {
                        store
                            .create(EmployeeDraft::new(format!("t{t}-{n}"), "Ops", 10.0))
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect::<Vec<_>>();
    let reader = {
        let store = store.clone();
        thread::spawn(move || {
            let request = PageRequest::new(1, 25).expect("valid page");
            for _ in 0..200 {
                let page = store.list(request);
                assert!(page.len() <= 25);
                assert!(page.windows(2).all(|pair| pair[0].id < pair[1].id));
            }
        })
    };

    let mut ids = Vec::new();
    for writer in writers {
        let batch = writer.join().map_err(|_| anyhow!("writer panicked"))?;
        assert!(batch.windows(2).all(|pair| pair[0] < pair[1]));
        ids.extend(batch);
    }
    reader.join().map_err(|_| anyhow!("reader panicked"))?;

    ids.sort_unstable();
    assert_eq!(ids, (1..=400).collect::<Vec<u64>>());
    Ok(())
}

#[test]
fn concurrent_updates_and_deletes_never_tear_records() -> Result<()> {
    let store = Arc::new(EmployeeStore::new());
    for n in 0..20 {
        store.create(EmployeeDraft::new(format!("emp-{n}"), "Eng", 1.0));
    }

    let updaters = (0..4)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for id in 1..=20u64 {
                    let tag = format!("u{t}");
                    let _ = store.update(id, EmployeeDraft::new(tag.clone(), tag, t as f64));
                }
            })
        })
        .collect::<Vec<_>>();
    let deleter = {
        let store = store.clone();
        thread::spawn(move || {
            for id in (2..=20u64).step_by(2) {
                store.delete(id).expect("even ids exist until deleted once");
            }
        })
    };

    for updater in updaters {
        updater.join().map_err(|_| anyhow!("updater panicked"))?;
    }
    deleter.join().map_err(|_| anyhow!("deleter panicked"))?;

    let remaining = store.list(PageRequest::new(1, 100)?);
    assert_eq!(remaining.len(), 10);
    for employee in remaining {
        assert_eq!(employee.id % 2, 1);
        // each update writes name and position together
        assert_eq!(employee.name, employee.position);
        let writer: usize = employee.name.trim_start_matches('u').parse()?;
        assert_eq!(employee.salary, writer as f64);
    }
    Ok(())
}
