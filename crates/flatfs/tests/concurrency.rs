//! Concurrency properties of the engine.
//!
//! - Operations on distinct names never disturb each other
//! - Concurrent creates of one name yield exactly one creator
//! - First-write block allocation is race-free
//! - Unlink racing open never exposes a reclaimed inode

use std::sync::{Arc, Barrier};
use std::thread;

use flatfs::{FlatFs, FsError, FsParams, OpenFlags};

#[test]
fn concurrent_creates_on_distinct_paths() {
    const K: usize = 8;
    let fs = Arc::new(
        FlatFs::new(FsParams {
            max_open_files_count: K as u32,
            ..FsParams::default()
        })
        .unwrap(),
    );
    let barrier = Arc::new(Barrier::new(K));

    let workers: Vec<_> = (0..K)
        .map(|i| {
            let fs = Arc::clone(&fs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let path = format!("/file{i}");
                barrier.wait();
                let handle = fs.open(&path, OpenFlags::create()).expect("create");
                handle
            })
        })
        .collect();

    let mut handles: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    handles.sort_unstable();
    handles.dedup();
    assert_eq!(handles.len(), K, "every thread got a distinct handle");

    for handle in handles {
        fs.close(handle).unwrap();
    }
    for i in 0..K {
        assert!(fs.exists(&format!("/file{i}")));
    }
}

#[test]
fn same_name_create_race_yields_one_creator() {
    // Hammer the lookup-then-create window.
    for _ in 0..100 {
        let fs = Arc::new(FlatFs::with_defaults().unwrap());
        let before = fs.stats().inodes_used;
        let barrier = Arc::new(Barrier::new(2));

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let fs = Arc::clone(&fs);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let handle = fs.open("/contended", OpenFlags::create()).expect("open");
                    fs.close(handle).expect("close");
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(
            fs.stats().inodes_used,
            before + 1,
            "both opens succeeded but only one inode was created"
        );
    }
}

#[test]
fn parallel_writers_do_not_interleave() {
    let fs = Arc::new(FlatFs::with_defaults().unwrap());
    let barrier = Arc::new(Barrier::new(3));

    let workers: Vec<_> = (0..3)
        .map(|i| {
            let fs = Arc::clone(&fs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let path = format!("/w{i}");
                barrier.wait();
                let handle = fs.open(&path, OpenFlags::create()).unwrap();
                assert_eq!(fs.write(handle, b"ABC").unwrap(), 3);
                fs.close(handle).unwrap();
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    for i in 0..3 {
        let handle = fs.open(&format!("/w{i}"), OpenFlags::open()).unwrap();
        assert_eq!(fs.read_to_vec(handle).unwrap(), b"ABC");
        fs.close(handle).unwrap();
    }
}

#[test]
fn first_write_allocates_exactly_one_block() {
    for _ in 0..100 {
        let fs = Arc::new(FlatFs::with_defaults().unwrap());
        let handle = fs.open("/f", OpenFlags::create()).unwrap();
        fs.close(handle).unwrap();
        let before = fs.stats().blocks_used;

        let barrier = Arc::new(Barrier::new(2));
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let fs = Arc::clone(&fs);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let handle = fs.open("/f", OpenFlags::open()).unwrap();
                    barrier.wait();
                    assert_eq!(fs.write(handle, b"xxxx").unwrap(), 4);
                    fs.close(handle).unwrap();
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(
            fs.stats().blocks_used,
            before + 1,
            "racing first writes must agree on a single block"
        );
    }
}

#[test]
fn unlink_racing_open_never_exposes_reclaimed_state() {
    for _ in 0..100 {
        let fs = Arc::new(FlatFs::with_defaults().unwrap());
        let handle = fs.open("/target", OpenFlags::create()).unwrap();
        fs.write(handle, b"ABC").unwrap();
        fs.close(handle).unwrap();

        let barrier = Arc::new(Barrier::new(2));

        let opener = {
            let fs = Arc::clone(&fs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                match fs.open("/target", OpenFlags::open()) {
                    Ok(handle) => {
                        // Either the intact content or a clean stale-handle
                        // failure; never garbage.
                        match fs.read_to_vec(handle) {
                            Ok(bytes) => assert_eq!(bytes, b"ABC"),
                            Err(FsError::InvalidHandle(_)) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                        fs.close(handle).unwrap();
                    }
                    Err(FsError::NotFound(_)) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            })
        };
        let remover = {
            let fs = Arc::clone(&fs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                fs.unlink("/target").unwrap();
            })
        };
        opener.join().unwrap();
        remover.join().unwrap();

        assert!(!fs.exists("/target"));
        assert_eq!(fs.stats().blocks_used, 0);
    }
}

#[test]
fn readers_and_writers_on_distinct_handles_share_an_inode() {
    let fs = Arc::new(FlatFs::with_defaults().unwrap());
    let handle = fs.open("/shared", OpenFlags::create()).unwrap();
    fs.write(handle, b"0123456789").unwrap();
    fs.close(handle).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for _ in 0..50 {
                    let handle = fs.open("/shared", OpenFlags::open()).unwrap();
                    let bytes = fs.read_to_vec(handle).unwrap();
                    assert_eq!(bytes, b"0123456789");
                    fs.close(handle).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
}
