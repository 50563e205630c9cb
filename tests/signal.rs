//! SIGTERM drives a graceful shutdown and the singleton marker goes away.
//!
//! Kept in its own test binary: the signal is delivered to the whole process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nix::sys::signal::{Signal, raise};
use tokio_util::sync::CancellationToken;

use sysmonitor::{SingletonLock, Supervisor, SupervisorConfig, TaskError, TaskFn, TaskRef, TaskSpec};

#[tokio::test]
async fn sigterm_stops_monitors_and_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sysmonitor.lock");
    let lock = SingletonLock::acquire(&path).unwrap();
    assert!(SingletonLock::acquire(&path).is_err());

    let unwound = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&unwound);
    let audio: TaskRef = TaskFn::arc("audio", move |ctx: CancellationToken| {
        let flag = Arc::clone(&flag);
        async move {
            ctx.cancelled().await;
            flag.store(true, Ordering::SeqCst);
            Err(TaskError::Canceled)
        }
    });

    let cfg = SupervisorConfig::default();
    let sup = Supervisor::builder(cfg.clone()).build();

    tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        raise(Signal::SIGTERM).unwrap();
    });

    let res = tokio::time::timeout(
        Duration::from_secs(10),
        sup.run(vec![TaskSpec::with_defaults(audio, &cfg)]),
    )
    .await
    .expect("supervisor returned after SIGTERM");
    assert!(res.is_ok(), "{res:?}");
    assert!(unwound.load(Ordering::SeqCst));

    drop(lock);
    assert!(!path.exists());
    SingletonLock::acquire(&path).unwrap().release().unwrap();
}
