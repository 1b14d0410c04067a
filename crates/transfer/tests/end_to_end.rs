//! End-to-end transfer tests wiring uploader, sender, and downloader
//! together over in-memory buffers and socket pairs.

use std::fs;
use std::io::Cursor;

use protocol::{DemuxReader, MuxWriter, ProtocolVersion, Session};
use tempfile::tempdir;
use transfer::{
    DownloadStep, Downloader, FileEntry, FsMetadataApplier, Sender, TransferConfig, UploadStep,
    Uploader, run_receiver,
};

fn session() -> Session {
    Session::new(ProtocolVersion::V27, 0x5EED)
}

/// Runs the three actors sequentially over captured buffers and returns the
/// downloader for inspection.
fn sync_once<'a>(
    files: &'a [FileEntry],
    source_root: &std::path::Path,
    dest_root: &std::path::Path,
) -> Downloader<'a, FsMetadataApplier> {
    let mut requests = MuxWriter::new(Vec::new());
    requests.enable_multiplex();
    let mut uploader = Uploader::new(files, dest_root, session(), TransferConfig::default());
    while uploader.advance(&mut requests).unwrap() != UploadStep::Finished {}

    let mut request_reader = DemuxReader::new(Cursor::new(requests.into_inner()));
    request_reader.enable_multiplex();
    let mut responses = MuxWriter::new(Vec::new());
    responses.enable_multiplex();
    Sender::new(files, source_root, session())
        .run(&mut request_reader, &mut responses)
        .unwrap();

    let mut response_reader = DemuxReader::new(Cursor::new(responses.into_inner()));
    response_reader.enable_multiplex();
    let mut downloader = Downloader::new(files, dest_root, session(), FsMetadataApplier);
    while downloader.advance(&mut response_reader).unwrap() != DownloadStep::Finished {}
    downloader
}

#[test]
fn appended_tail_transfers_only_the_new_bytes() {
    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();

    let basis = vec![b'a'; 1400];
    let mut target = basis.clone();
    target.extend(std::iter::repeat_n(b'b', 50));
    fs::write(source.path().join("f"), &target).unwrap();
    fs::write(dest.path().join("f"), &basis).unwrap();

    let files = [FileEntry::from_fs(source.path(), "f").unwrap()];
    let downloader = sync_once(&files, source.path(), dest.path());

    assert_eq!(fs::read(dest.path().join("f")).unwrap(), target);
    assert_eq!(downloader.matched_bytes(), 1400);
    assert_eq!(downloader.literal_bytes(), 50);
}

#[test]
fn fresh_destination_receives_everything_literally() {
    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();

    let content: Vec<u8> = (0u32..5000).map(|v| (v * 17 % 256) as u8).collect();
    fs::write(source.path().join("new.bin"), &content).unwrap();

    let files = [FileEntry::from_fs(source.path(), "new.bin").unwrap()];
    let downloader = sync_once(&files, source.path(), dest.path());

    assert_eq!(fs::read(dest.path().join("new.bin")).unwrap(), content);
    assert_eq!(downloader.literal_bytes(), 5000);
    assert_eq!(downloader.matched_bytes(), 0);
}

#[test]
fn second_run_skips_everything() {
    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(source.path().join("f"), b"settled content").unwrap();

    let files = [FileEntry::from_fs(source.path(), "f").unwrap()];
    sync_once(&files, source.path(), dest.path());

    // The applied metadata makes the quick check pass, so the second run
    // sends nothing but the sentinel.
    let mut wire = MuxWriter::new(Vec::new());
    wire.enable_multiplex();
    let mut uploader = Uploader::new(&files, dest.path(), session(), TransferConfig::default());
    while uploader.advance(&mut wire).unwrap() != UploadStep::Finished {}
    assert_eq!(uploader.requests_sent(), 0);
    assert_eq!(uploader.skipped(), 1);
}

#[test]
fn empty_files_round_trip() {
    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(source.path().join("empty"), b"").unwrap();

    let files = [FileEntry::from_fs(source.path(), "empty").unwrap()];
    let downloader = sync_once(&files, source.path(), dest.path());

    assert_eq!(fs::read(dest.path().join("empty")).unwrap(), b"");
    assert_eq!(downloader.completed(), 1);
}

#[cfg(unix)]
#[test]
fn full_tree_syncs_over_a_socket_pair() {
    use std::os::unix::net::UnixStream;

    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();

    fs::create_dir(source.path().join("sub")).unwrap();
    let big: Vec<u8> = (0u32..20_000).map(|v| (v * 31 % 256) as u8).collect();
    fs::write(source.path().join("sub/big.bin"), &big).unwrap();
    fs::write(source.path().join("note.txt"), b"hello rdsync").unwrap();
    std::os::unix::fs::symlink("note.txt", source.path().join("alias")).unwrap();

    // Stale basis for the big file: first half identical, rest missing.
    fs::create_dir(dest.path().join("sub")).unwrap();
    fs::write(dest.path().join("sub/big.bin"), &big[..10_000]).unwrap();

    let files = vec![
        FileEntry::from_fs(source.path(), "sub").unwrap(),
        FileEntry::from_fs(source.path(), "sub/big.bin").unwrap(),
        FileEntry::from_fs(source.path(), "note.txt").unwrap(),
        FileEntry::from_fs(source.path(), "alias").unwrap(),
    ];

    let (receiver_end, sender_end) = UnixStream::pair().unwrap();
    let sender_files = files.clone();
    let sender_root = source.path().to_path_buf();
    let sender_thread = std::thread::spawn(move || {
        let mut reader = DemuxReader::new(sender_end.try_clone().unwrap());
        reader.enable_multiplex();
        let mut writer = MuxWriter::new(sender_end);
        writer.enable_multiplex();
        Sender::new(&sender_files, &sender_root, session())
            .run(&mut reader, &mut writer)
            .unwrap()
    });

    let mut reader = DemuxReader::new(receiver_end.try_clone().unwrap());
    reader.enable_multiplex();
    let mut writer = MuxWriter::new(receiver_end);
    writer.enable_multiplex();
    let stats = run_receiver(
        &files,
        dest.path(),
        session(),
        TransferConfig::default(),
        &mut reader,
        &mut writer,
        FsMetadataApplier,
    )
    .unwrap();
    let sender_stats = sender_thread.join().unwrap();

    assert_eq!(fs::read(dest.path().join("sub/big.bin")).unwrap(), big);
    assert_eq!(fs::read(dest.path().join("note.txt")).unwrap(), b"hello rdsync");
    assert_eq!(
        fs::read_link(dest.path().join("alias")).unwrap(),
        std::path::Path::new("note.txt")
    );

    // The intact first half of the big file was reused, not resent.
    assert!(stats.matched_bytes >= 9000);
    assert!(stats.literal_bytes < big.len() as u64);
    assert_eq!(
        stats.literal_bytes + stats.matched_bytes,
        sender_stats.literal_bytes + sender_stats.matched_bytes
    );
}

#[cfg(unix)]
#[test]
fn pipelining_handles_many_small_files() {
    use std::os::unix::net::UnixStream;

    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();

    let mut files = Vec::new();
    for i in 0..50 {
        let name = format!("file-{i:02}");
        fs::write(source.path().join(&name), format!("contents of {name}")).unwrap();
        files.push(FileEntry::from_fs(source.path(), name).unwrap());
    }

    let (receiver_end, sender_end) = UnixStream::pair().unwrap();
    let sender_files = files.clone();
    let sender_root = source.path().to_path_buf();
    let sender_thread = std::thread::spawn(move || {
        let mut reader = DemuxReader::new(sender_end.try_clone().unwrap());
        reader.enable_multiplex();
        let mut writer = MuxWriter::new(sender_end);
        writer.enable_multiplex();
        Sender::new(&sender_files, &sender_root, session())
            .run(&mut reader, &mut writer)
            .unwrap();
    });

    let mut reader = DemuxReader::new(receiver_end.try_clone().unwrap());
    reader.enable_multiplex();
    let mut writer = MuxWriter::new(receiver_end);
    writer.enable_multiplex();
    run_receiver(
        &files,
        dest.path(),
        session(),
        TransferConfig::default(),
        &mut reader,
        &mut writer,
        FsMetadataApplier,
    )
    .unwrap();
    sender_thread.join().unwrap();

    for entry in &files {
        assert_eq!(
            fs::read(dest.path().join(&entry.path)).unwrap(),
            fs::read(source.path().join(&entry.path)).unwrap()
        );
    }
}

#[cfg(unix)]
#[test]
fn oversized_requests_and_responses_keep_flowing() {
    use std::os::unix::net::UnixStream;

    fn fill(len: usize, mut state: u64) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        for byte in &mut buf {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *byte = (state >> 56) as u8;
        }
        buf
    }

    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();

    // Tiny blocks inflate each checksum request far past any socket
    // buffering, and fully rewritten contents make every response just as
    // large. The run only finishes if both directions drain concurrently.
    let size = 1024 * 1024;
    let mut files = Vec::new();
    for (name, stream) in [("a.bin", 1u64), ("b.bin", 2)] {
        fs::write(source.path().join(name), fill(size, stream)).unwrap();
        fs::write(dest.path().join(name), fill(size, stream ^ 0xFFFF)).unwrap();
        files.push(FileEntry::from_fs(source.path(), name).unwrap());
    }

    // Full-length strong checksums: 8-byte blocks make weak collisions
    // routine, and a 2-byte strong prefix would not reliably reject them.
    let config = TransferConfig {
        checksum_length: 16,
        block_length: Some(8),
        quick_check: false,
        ..TransferConfig::default()
    };

    let (receiver_end, sender_end) = UnixStream::pair().unwrap();
    let sender_files = files.clone();
    let sender_root = source.path().to_path_buf();
    let sender_thread = std::thread::spawn(move || {
        let mut reader = DemuxReader::new(sender_end.try_clone().unwrap());
        reader.enable_multiplex();
        let mut writer = MuxWriter::new(sender_end);
        writer.enable_multiplex();
        Sender::new(&sender_files, &sender_root, session())
            .run(&mut reader, &mut writer)
            .unwrap();
    });

    let mut reader = DemuxReader::new(receiver_end.try_clone().unwrap());
    reader.enable_multiplex();
    let mut writer = MuxWriter::new(receiver_end);
    writer.enable_multiplex();
    let stats = run_receiver(
        &files,
        dest.path(),
        session(),
        config,
        &mut reader,
        &mut writer,
        FsMetadataApplier,
    )
    .unwrap();
    sender_thread.join().unwrap();

    for entry in &files {
        assert_eq!(
            fs::read(dest.path().join(&entry.path)).unwrap(),
            fs::read(source.path().join(&entry.path)).unwrap()
        );
    }
    // Each request alone outweighs one file's worth of socket buffering.
    assert!(stats.bytes_written as usize > size);
}

#[test]
fn out_of_band_messages_do_not_disturb_reconstruction() {
    use logging::{Message, MessageSink};

    let source = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(source.path().join("f"), b"payload under chatter").unwrap();
    let files = [FileEntry::from_fs(source.path(), "f").unwrap()];

    // Request phase, as usual.
    let mut requests = MuxWriter::new(Vec::new());
    requests.enable_multiplex();
    let mut uploader = Uploader::new(&files, dest.path(), session(), TransferConfig::default());
    while uploader.advance(&mut requests).unwrap() != UploadStep::Finished {}

    let mut request_reader = DemuxReader::new(Cursor::new(requests.into_inner()));
    request_reader.enable_multiplex();
    let mut responses = MuxWriter::new(Vec::new());
    responses.enable_multiplex();
    // Chatter before the sender even starts.
    responses
        .write_message(&Message::info("sender starting up"))
        .unwrap();
    Sender::new(&files, source.path(), session())
        .run(&mut request_reader, &mut responses)
        .unwrap();
    responses
        .write_message(&Message::warning("sender shutting down"))
        .unwrap();

    let captured: MessageSink<Box<dyn std::io::Write + Send>> =
        MessageSink::new(Box::new(Vec::new()));
    let mut response_reader = DemuxReader::with_sink(Cursor::new(responses.into_inner()), captured);
    response_reader.enable_multiplex();
    let mut downloader = Downloader::new(&files, dest.path(), session(), FsMetadataApplier);
    while downloader.advance(&mut response_reader).unwrap() != DownloadStep::Finished {}

    assert_eq!(
        fs::read(dest.path().join("f")).unwrap(),
        b"payload under chatter"
    );
}
