// Restore driver: replay of the queue into receive processes.

mod common;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use tempfile::tempdir;

    use snapship_core::config::Config;
    use snapship_core::context::Context;
    use snapship_core::framing::FrameError;
    use snapship_core::parts::FilePartDirectory;
    use snapship_core::receiver::{CancelToken, RestoreDriver, RestoreOutcome, Wake};
    use snapship_core::sender::SnapshotSender;
    use snapship_core::types::BackupError;
    use snapship_core::zfs::ProcessError;

    use crate::common::*;

    const CHAIN: [&str; 3] = ["base", "inc1", "inc2"];

    /// Send `Pool@[base, inc1, inc2]` from full and return the part count.
    fn send_chain(cfg: &Config, queue: &Arc<FilePartDirectory>, zfs: &Arc<MockZfs>) -> usize {
        let mut s = SnapshotSender::new(cfg, Arc::clone(queue), zfs.clone(), None, Context::new("send")).unwrap();
        let reports = s.send_starting_from_full(&snaps("Pool", &CHAIN)).unwrap();
        reports.iter().map(|r| r.parts.len()).sum()
    }

    fn restore(cfg: &Config, queue: &Arc<FilePartDirectory>, zfs: &Arc<MockZfs>) -> RestoreDriver {
        RestoreDriver::new(cfg, Arc::clone(queue), zfs.clone(), Context::new("restore")).unwrap()
    }

    fn expected_streams() -> Vec<Vec<u8>> {
        let chain = snaps("Pool", &CHAIN);
        vec![
            full_payload(&chain[0]),
            link_payload(&chain[0], &chain[1]),
            link_payload(&chain[1], &chain[2]),
        ]
    }

    #[test]
    fn end_to_end_with_delete_after_receive() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let source = MockZfs::with_dataset("Pool", &CHAIN);
        let parts = send_chain(&cfg, &queue, &source);
        queue.create_finished_marker().unwrap();

        let target = MockZfs::new();
        let report = restore(&cfg, &queue, &target).run(&CancelToken::new()).unwrap();

        assert_eq!(report.outcome, RestoreOutcome::Finished);
        assert_eq!(report.parts_consumed as usize, parts);
        assert_eq!(report.streams_opened, 3);
        assert_eq!(report.bytes_written as usize, FULL_LEN + 2 * LINK_LEN);

        let received = target.received();
        let bytes: Vec<Vec<u8>> = received.iter().map(|r| r.bytes.clone()).collect();
        assert_eq!(bytes, expected_streams());
        assert!(received.iter().all(|r| r.closed && !r.killed && r.pool == "Backup"));

        assert_eq!(file_names(dir.path()), vec!["finished".to_string()]);
    }

    #[test]
    fn mark_received_keeps_every_part() {
        let dir = tempdir().unwrap();
        let cfg = Config { delete_after_receive: false, ..test_config() };
        let queue = queue_in(dir.path());
        let parts = send_chain(&cfg, &queue, &MockZfs::with_dataset("Pool", &CHAIN));
        queue.create_finished_marker().unwrap();

        let target = MockZfs::new();
        let report = restore(&cfg, &queue, &target).run(&CancelToken::new()).unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Finished);

        let names = file_names(dir.path());
        assert_eq!(names.iter().filter(|n| n.ends_with(".received")).count(), parts);
        assert!(published_parts(dir.path()).is_empty());
        assert_eq!(target.received().len(), 3);
    }

    #[test]
    fn receive_runs_alongside_send() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let target = MockZfs::new();

        let receiver = {
            let (cfg, queue, target) = (cfg.clone(), Arc::clone(&queue), target.clone());
            thread::spawn(move || restore(&cfg, &queue, &target).run(&CancelToken::new()))
        };

        thread::sleep(Duration::from_millis(30));
        send_chain(&cfg, &queue, &MockZfs::with_dataset("Pool", &CHAIN));
        queue.create_finished_marker().unwrap();

        let report = receiver.join().unwrap().unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Finished);

        let bytes: Vec<Vec<u8>> = target.received().iter().map(|r| r.bytes.clone()).collect();
        assert_eq!(bytes, expected_streams());
    }

    #[test]
    fn nonzero_receive_exit_is_fatal() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        send_chain(&cfg, &queue, &MockZfs::with_dataset("Pool", &CHAIN));
        queue.create_finished_marker().unwrap();

        let target = MockZfs::new();
        target.fail_receives_with(1);
        let err = restore(&cfg, &queue, &target).run(&CancelToken::new()).unwrap_err();

        assert!(matches!(err, BackupError::Process(ProcessError::ExitStatus { code: Some(1), .. })));
        // The first stream is closed at the first rotation and fails there.
        assert_eq!(target.received().len(), 1);
        assert!(!published_parts(dir.path()).is_empty());
    }

    #[test]
    fn corrupt_part_stops_the_restore_and_kills_the_receiver() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        send_chain(&cfg, &queue, &MockZfs::with_dataset("Pool", &CHAIN));

        let victim = published_parts(dir.path())[1].clone();
        let mut bytes = fs::read(&victim).unwrap();
        bytes[30] ^= 0xFF;
        fs::write(&victim, bytes).unwrap();

        let target = MockZfs::new();
        let err = restore(&cfg, &queue, &target).run(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, BackupError::Frame(FrameError::ChecksumMismatch { .. })), "{:?}", err);

        let received = target.received();
        assert_eq!(received.len(), 1);
        assert!(received[0].killed);
        // The bad part stays for inspection.
        assert!(victim.exists());
    }

    #[test]
    fn wrong_password_is_a_crypto_error() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        send_chain(&cfg, &queue, &MockZfs::with_dataset("Pool", &CHAIN));

        let other = Config { password: "not the password".into(), ..test_config() };
        let err = restore(&other, &queue, &MockZfs::new()).run(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, BackupError::Crypto(_)));
    }

    #[test]
    fn cancel_ends_an_idle_restore() {
        let dir = tempdir().unwrap();
        let cfg = Config { poll_interval: Duration::from_secs(5), ..test_config() };
        let queue = queue_in(dir.path());
        let token = CancelToken::new();

        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                token.cancel();
            })
        };

        let started = Instant::now();
        let report = restore(&cfg, &queue, &MockZfs::new()).run(&token).unwrap();
        canceller.join().unwrap();

        assert_eq!(report.outcome, RestoreOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.parts_consumed, 0);
    }

    #[test]
    fn cancel_closes_the_live_stream() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let source = MockZfs::with_dataset("Pool", &CHAIN);
        let mut s = SnapshotSender::new(&cfg, Arc::clone(&queue), source, None, Context::new("send")).unwrap();
        s.send_base_snapshot(&snap("Pool@base")).unwrap();

        let token = CancelToken::new();
        let target = MockZfs::new();
        let worker = {
            let (cfg, queue, target, token) = (cfg.clone(), Arc::clone(&queue), target.clone(), token.clone());
            thread::spawn(move || restore(&cfg, &queue, &target).run(&token))
        };
        let deadline = Instant::now() + Duration::from_secs(10);
        while target.received().first().map_or(0, |r| r.bytes.len()) < FULL_LEN && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        token.cancel();

        let report = worker.join().unwrap().unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Cancelled);
        assert_eq!(report.streams_opened, 1);
        let received = target.received();
        assert!(received[0].closed);
        assert_eq!(received[0].bytes, full_payload(&snap("Pool@base")));
    }

    #[test]
    fn idle_timeout_bounds_empty_polls() {
        let dir = tempdir().unwrap();
        let cfg = Config { idle_timeout: Some(Duration::from_millis(50)), ..test_config() };
        let queue = queue_in(dir.path());

        let err = restore(&cfg, &queue, &MockZfs::new()).run(&CancelToken::new()).unwrap_err();
        match err {
            BackupError::Timeout { waited } => assert!(waited >= Duration::from_millis(50)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn restore_needs_a_target_pool() {
        let dir = tempdir().unwrap();
        let cfg = Config { target_pool: String::new(), ..test_config() };
        let result = RestoreDriver::new(&cfg, queue_in(dir.path()), MockZfs::new(), Context::new("restore"));
        assert!(matches!(result, Err(BackupError::Config(_))));
    }

    #[test]
    fn cancel_token_wakes_waiters() {
        let token = CancelToken::new();
        assert_eq!(token.wait(Duration::from_millis(5)), Wake::Elapsed);
        assert!(!token.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.wait(Duration::from_secs(5)), Wake::Cancelled);
        assert_eq!(token.clone().wait(Duration::from_secs(5)), Wake::Cancelled);
    }
}
