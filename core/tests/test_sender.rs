// Snapshot sender: strategy plans, part output, remote upload and check_sent.

mod common;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use tempfile::tempdir;

    use snapship_core::config::{Config, HashTiming};
    use snapship_core::context::Context;
    use snapship_core::crypto::{digest_file, DigestAlg};
    use snapship_core::parts::{part_name_of, FilePartDirectory};
    use snapship_core::remote::{DirectoryStore, RemoteStore};
    use snapship_core::sender::{SendOp, SendStrategy, SnapshotSender};
    use snapship_core::types::BackupError;
    use snapship_core::zfs::ProcessError;

    use crate::common::*;

    const CHAIN: [&str; 3] = ["base", "inc1", "inc2"];

    fn sender(cfg: &Config, queue: &Arc<FilePartDirectory>, zfs: &Arc<MockZfs>) -> SnapshotSender {
        SnapshotSender::new(cfg, Arc::clone(queue), zfs.clone(), None, Context::new("send")).unwrap()
    }

    fn remote_sender(
        cfg: &Config,
        queue: &Arc<FilePartDirectory>,
        zfs: &Arc<MockZfs>,
        remote: Arc<dyn RemoteStore>,
    ) -> SnapshotSender {
        let cfg = Config { load_remote: true, ..cfg.clone() };
        SnapshotSender::new(&cfg, Arc::clone(queue), zfs.clone(), Some(remote), Context::new("send")).unwrap()
    }

// # Plans

    #[test]
    fn per_snapshot_plans() {
        let chain = snaps("Pool", &CHAIN);
        let s = SendStrategy::PerSnapshot;

        assert_eq!(
            s.plan_starting_from_full(&chain).unwrap(),
            vec![
                SendOp::Full { snapshot: chain[0].clone() },
                SendOp::Incremental { base: chain[0].clone(), target: chain[1].clone() },
                SendOp::Incremental { base: chain[1].clone(), target: chain[2].clone() },
            ]
        );
        assert_eq!(
            s.plan_starting_from_incremental(&chain).unwrap(),
            vec![
                SendOp::Incremental { base: chain[0].clone(), target: chain[1].clone() },
                SendOp::Incremental { base: chain[1].clone(), target: chain[2].clone() },
            ]
        );
    }

    #[test]
    fn per_dataset_plans() {
        let chain = snaps("Pool", &CHAIN);
        let s = SendStrategy::PerDataset;

        assert_eq!(
            s.plan_starting_from_full(&chain).unwrap(),
            vec![
                SendOp::Full { snapshot: chain[0].clone() },
                SendOp::MultiIncremental { base: chain[0].clone(), target: chain[2].clone() },
            ]
        );
        assert_eq!(
            s.plan_starting_from_incremental(&chain).unwrap(),
            vec![SendOp::MultiIncremental { base: chain[0].clone(), target: chain[2].clone() }]
        );
        assert_eq!(
            s.plan_starting_from_full(&chain[..1]).unwrap(),
            vec![SendOp::Full { snapshot: chain[0].clone() }]
        );
    }

    #[test]
    fn plans_reject_short_or_mixed_chains() {
        for s in [SendStrategy::PerSnapshot, SendStrategy::PerDataset] {
            assert!(matches!(s.plan_starting_from_full(&[]), Err(BackupError::InvalidArgument(_))));
            assert!(matches!(
                s.plan_starting_from_incremental(&snaps("Pool", &["base"])),
                Err(BackupError::InvalidArgument(_))
            ));
            let mixed = vec![snap("Pool@a"), snap("Other@b")];
            assert!(matches!(s.plan_starting_from_full(&mixed), Err(BackupError::InvalidArgument(_))));
        }
    }

    #[test]
    fn strategy_comes_from_config() {
        let cfg = test_config();
        assert_eq!(SendStrategy::from_config(&cfg), SendStrategy::PerSnapshot);
        let cfg = Config { multi_incremental: true, ..cfg };
        assert_eq!(SendStrategy::from_config(&cfg), SendStrategy::PerDataset);
    }

    #[test]
    fn op_labels() {
        let chain = snaps("Pool/apps", &CHAIN);
        assert_eq!(SendOp::Full { snapshot: chain[0].clone() }.label(), "Pool/apps@base");
        let inc = SendOp::Incremental { base: chain[0].clone(), target: chain[1].clone() };
        assert_eq!(inc.label(), "Pool/apps@base->inc1");
        assert_eq!(inc.target(), &chain[1]);
    }

// # Sending

    #[test]
    fn base_snapshot_becomes_numbered_parts() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let mut s = sender(&cfg, &queue, &zfs);

        let base = snap("Pool@base");
        let report = s.send_base_snapshot(&base).unwrap();

        assert_eq!(report.plaintext_bytes, FULL_LEN as u64);
        // 3000 bytes in 256-byte chunks, parts close at >= 1000: 1024 + 1024 + 952.
        assert_eq!(report.parts.len(), 3);
        let numbers: Vec<u32> = report.parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        assert!(report.parts.iter().all(|p| p.stream == report.stream));
        assert_eq!(report.stream.label(), "Pool@base");

        assert_eq!(published_parts(dir.path()).len(), 3);
        assert!(file_names(dir.path()).iter().all(|n| !n.ends_with(".partial")));
        assert_eq!(replay_all(&cfg, dir.path()), full_payload(&base));
        assert_eq!(zfs.calls(), vec!["send -vpP Pool@base".to_string()]);
    }

    #[test]
    fn exact_multiple_of_part_size_leaves_no_empty_tail() {
        let dir = tempdir().unwrap();
        // Full payload is 3000 bytes: exactly three 1000-byte parts.
        let cfg = Config { chunk_size: 500, file_part_size: 1000, ..test_config() };
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let report = sender(&cfg, &queue, &zfs).send_base_snapshot(&snap("Pool@base")).unwrap();

        assert_eq!(report.parts.len(), 3);
        assert_eq!(published_parts(dir.path()).len(), 3);
        assert_eq!(replay_all(&cfg, dir.path()), full_payload(&snap("Pool@base")));
    }

    #[test]
    fn streams_sort_in_send_order() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let reports = sender(&cfg, &queue, &zfs).send_starting_from_full(&snaps("Pool", &CHAIN)).unwrap();

        let expected: Vec<_> = reports.iter().flat_map(|r| r.parts.clone()).collect();
        let on_disk: Vec<_> = published_parts(dir.path()).iter().map(|p| part_name_of(p).unwrap()).collect();
        assert_eq!(on_disk, expected);

        let labels: Vec<&str> = reports.iter().map(|r| r.stream.label()).collect();
        assert_eq!(labels, vec!["Pool@base", "Pool@base->inc1", "Pool@inc1->inc2"]);
    }

    #[test]
    fn both_strategies_deliver_the_same_bytes() {
        let chain = snaps("Pool", &CHAIN);
        let mut replays = Vec::new();
        let mut transfer_counts = Vec::new();

        for multi in [false, true] {
            let dir = tempdir().unwrap();
            let cfg = Config { multi_incremental: multi, ..test_config() };
            let queue = queue_in(dir.path());
            let zfs = MockZfs::with_dataset("Pool", &CHAIN);
            let reports = sender(&cfg, &queue, &zfs).send_starting_from_incremental(&chain).unwrap();
            transfer_counts.push(reports.len());
            replays.push(replay_all(&cfg, dir.path()));
        }

        assert_eq!(transfer_counts, vec![2, 1]);
        assert_eq!(replays[0], replays[1]);
        let mut expected = link_payload(&chain[0], &chain[1]);
        expected.extend(link_payload(&chain[1], &chain[2]));
        assert_eq!(replays[0], expected);
    }

    #[test]
    fn resending_the_same_chain_replays_identically() {
        let chain = snaps("Pool", &CHAIN);
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let mut s = sender(&cfg, &queue, &zfs);

        s.send_incremental_snapshot(&chain[0], &chain[1]).unwrap();
        s.send_incremental_snapshot(&chain[0], &chain[1]).unwrap();

        let streams = replay_by_stream(&cfg, dir.path());
        assert_eq!(streams.len(), 1, "same label groups both sends");
        let replay = &streams["Pool@base->inc1"];
        let once = link_payload(&chain[0], &chain[1]);
        assert_eq!(&replay[..once.len()], &once[..]);
        assert_eq!(&replay[once.len()..], &once[..]);
    }

    #[test]
    fn failed_send_process_is_an_error() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        zfs.fail_sends_with(2);

        let err = sender(&cfg, &queue, &zfs).send_base_snapshot(&snap("Pool@base")).unwrap_err();
        assert!(matches!(err, BackupError::Process(ProcessError::ExitStatus { code: Some(2), .. })));
        assert!(file_names(dir.path()).iter().all(|n| !n.ends_with(".partial")));
    }

    #[test]
    fn telemetry_counts_streams_and_parts() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let ctx = Context::new("send");
        let mut s = SnapshotSender::new(&cfg, queue, zfs, None, ctx.clone()).unwrap();
        let reports = s.send_starting_from_full(&snaps("Pool", &CHAIN)).unwrap();

        let parts: usize = reports.iter().map(|r| r.parts.len()).sum();
        let c = ctx.counters();
        assert_eq!(c.streams_sent, 3);
        assert_eq!(c.parts_written as usize, parts);
        assert_eq!(c.bytes_plaintext, (FULL_LEN + 2 * LINK_LEN) as u64);
        assert_eq!(c.parts_uploaded, 0);
    }

// # Remote

    #[test]
    fn load_remote_requires_a_store() {
        let dir = tempdir().unwrap();
        let cfg = Config { load_remote: true, ..test_config() };
        let result = SnapshotSender::new(&cfg, queue_in(dir.path()), MockZfs::new(), None, Context::new("send"));
        assert!(matches!(result, Err(BackupError::Config(_))));
    }

    #[test]
    fn check_sent_passes_after_upload_and_fails_when_missing() {
        let dir = tempdir().unwrap();
        let bucket = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let store = Arc::new(DirectoryStore::new(bucket.path()).unwrap());
        let mut s = remote_sender(&cfg, &queue, &zfs, store.clone());

        let chain = snaps("Pool", &CHAIN);
        s.send_starting_from_full(&chain[..2]).unwrap();
        s.check_sent(&chain[..2]).unwrap();

        // inc1 -> inc2 was never sent.
        match s.check_sent(&chain) {
            Err(BackupError::S3MissesFile { key }) => assert_eq!(key, "Pool@inc1->inc2"),
            other => panic!("expected S3MissesFile, got {:?}", other),
        }

        // Losing an uploaded object is also caught.
        let first = s.ledger().get("Pool@base").unwrap().parts[0].clone();
        fs::remove_file(bucket.path().join(&first.key)).unwrap();
        assert!(matches!(s.check_sent(&chain[..2]), Err(BackupError::S3MissesFile { .. })));
    }

    #[test]
    fn fresh_sender_vouches_for_an_earlier_run() {
        let dir = tempdir().unwrap();
        let bucket = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let store = Arc::new(DirectoryStore::new(bucket.path()).unwrap());
        let chain = snaps("Pool", &CHAIN);

        {
            let mut first_run = remote_sender(&cfg, &queue, &zfs, store.clone());
            first_run.send_starting_from_full(&chain).unwrap();
        }

        let resumed = remote_sender(&cfg, &queue, &zfs, store.clone());
        resumed.check_sent(&chain).unwrap();

        // A later part of a transfer goes missing.
        let base = resumed.ledger().get("Pool@base").unwrap().clone();
        assert!(base.parts.len() > 1);
        let lost = base.parts[1].key.clone();
        fs::remove_file(bucket.path().join(&lost)).unwrap();

        match resumed.check_sent(&chain) {
            Err(BackupError::S3MissesFile { key }) => assert_eq!(key, lost),
            other => panic!("expected S3MissesFile, got {:?}", other),
        }
    }

    #[test]
    fn interrupted_transfer_fails_check_sent_after_restart() {
        let dir = tempdir().unwrap();
        let bucket = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let store = Arc::new(DirectoryStore::new(bucket.path()).unwrap());
        let base = snaps("Pool", &CHAIN[..1]);

        zfs.fail_sends_with(2);
        let mut first_run = remote_sender(&cfg, &queue, &zfs, store.clone());
        assert!(first_run.send_base_snapshot(&base[0]).is_err());
        drop(first_run);

        // Every part made it to the store, but the send itself never finished.
        assert!(!store.list_keys().unwrap().is_empty());
        let resumed = remote_sender(&cfg, &queue, &zfs, store.clone());
        match resumed.check_sent(&base) {
            Err(BackupError::S3MissesFile { key }) => assert_eq!(key, "Pool@base"),
            other => panic!("expected S3MissesFile, got {:?}", other),
        }

        // A clean resend replaces the unfinished record.
        zfs.fail_sends_with(0);
        let mut retry = remote_sender(&cfg, &queue, &zfs, store.clone());
        retry.send_base_snapshot(&base[0]).unwrap();
        remote_sender(&cfg, &queue, &zfs, store).check_sent(&base).unwrap();
    }

    #[test]
    fn unreadable_ledger_is_a_config_error() {
        let dir = tempdir().unwrap();
        let bucket = tempdir().unwrap();
        fs::write(dir.path().join(".sent-ledger.json"), b"{not json").unwrap();
        let cfg = Config { load_remote: true, ..test_config() };
        let store: Arc<dyn RemoteStore> = Arc::new(DirectoryStore::new(bucket.path()).unwrap());
        let result = SnapshotSender::new(&cfg, queue_in(dir.path()), MockZfs::new(), Some(store), Context::new("send"));
        assert!(matches!(result, Err(BackupError::Config(_))));
    }

    #[test]
    fn every_published_part_is_uploaded_in_both_hash_timings() {
        for timing in [HashTiming::AtClose, HashTiming::AtUpload] {
            let dir = tempdir().unwrap();
            let bucket = tempdir().unwrap();
            let cfg = Config { hash_timing: timing, digest: DigestAlg::Blake3, ..test_config() };
            let queue = queue_in(dir.path());
            let zfs = MockZfs::with_dataset("Pool", &CHAIN);
            let store = Arc::new(DirectoryStore::new(bucket.path()).unwrap());
            let mut s = remote_sender(&cfg, &queue, &zfs, store.clone());

            s.send_starting_from_full(&snaps("Pool", &CHAIN)).unwrap();

            assert_eq!(store.list_keys().unwrap(), file_names(dir.path()), "{:?}", timing);
            let transfers = s.ledger().transfers();
            assert_eq!(transfers.len(), 3);
            let mut recorded = 0;
            for (label, transfer) in transfers {
                assert!(transfer.complete, "{}", label);
                assert!(transfer.parts[0].key.ends_with(".part0000000000"));
                for sent in &transfer.parts {
                    let local = digest_file(&dir.path().join(&sent.key), DigestAlg::Blake3).unwrap();
                    assert_eq!(sent.digest, local, "{}", label);
                    recorded += 1;
                }
            }
            assert_eq!(recorded, published_parts(dir.path()).len());
            assert!(dir.path().join(".sent-ledger.json").is_file());
        }
    }

    #[test]
    fn altered_upload_is_an_incorrect_hash_in_both_hash_timings() {
        for timing in [HashTiming::AtClose, HashTiming::AtUpload] {
            let dir = tempdir().unwrap();
            let bucket = tempdir().unwrap();
            let cfg = Config { hash_timing: timing, ..test_config() };
            let queue = queue_in(dir.path());
            let zfs = MockZfs::with_dataset("Pool", &CHAIN);
            let store = Arc::new(FaultyStore::new(bucket.path(), Fault::Corrupt));
            let mut s = remote_sender(&cfg, &queue, &zfs, store);

            let err = s.send_base_snapshot(&snap("Pool@base")).unwrap_err();
            assert!(matches!(err, BackupError::IncorrectHash { .. }), "{:?}: {:?}", timing, err);
        }
    }

    #[test]
    fn dropped_upload_is_a_missing_file() {
        let dir = tempdir().unwrap();
        let bucket = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let store = Arc::new(FaultyStore::new(bucket.path(), Fault::Drop));
        let mut s = remote_sender(&cfg, &queue, &zfs, store);

        let err = s.send_base_snapshot(&snap("Pool@base")).unwrap_err();
        assert!(matches!(err, BackupError::S3MissesFile { .. }));
    }

    #[test]
    fn check_sent_without_store_is_invalid() {
        let dir = tempdir().unwrap();
        let cfg = test_config();
        let queue = queue_in(dir.path());
        let zfs = MockZfs::with_dataset("Pool", &CHAIN);
        let s = sender(&cfg, &queue, &zfs);
        assert!(matches!(
            s.check_sent(&snaps("Pool", &CHAIN)),
            Err(BackupError::InvalidArgument(_))
        ));
    }
}
