//! Wire-level test of the chooser daemon over a real Unix socket.

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::{Duration, Instant};

use checksums::{strong_sum, StrongSum, WeakSum};
use daemon::{server, DaemonConfig};
use protocol::{
    read_record, signature_payload, write_record, Command, Record, CNAME_OK, SIGS_END,
};

fn fp(n: u64) -> (WeakSum, StrongSum) {
    (WeakSum::new(n + 1), strong_sum(&n.to_le_bytes()))
}

fn send(stream: &mut UnixStream, command: Command, payload: &[u8]) {
    write_record(stream, command, payload).unwrap();
    stream.flush().unwrap();
}

/// Reads replies until the `sigs_end` ack, returning everything before it.
fn read_until_ack(stream: &mut UnixStream) -> Vec<Record> {
    let mut out = Vec::new();
    loop {
        let record = read_record(stream).unwrap().expect("server closed early");
        if record.command == Command::Control && record.payload == SIGS_END.as_bytes() {
            return out;
        }
        out.push(record);
    }
}

/// Starts a daemon over a fresh store and waits for its listener.
fn start_daemon() -> (tempfile::TempDir, std::path::PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let config = DaemonConfig::new(tmp.path());
    let socket = config.socket_path().to_path_buf();
    thread::spawn(move || {
        let _ = server::serve(&config);
    });
    (tmp, socket)
}

fn connect(socket: &std::path::Path) -> UnixStream {
    let deadline = Instant::now() + Duration::from_secs(10);
    let stream = loop {
        if let Ok(stream) = UnixStream::connect(socket) {
            break stream;
        }
        assert!(Instant::now() < deadline, "daemon never bound {socket:?}");
        thread::sleep(Duration::from_millis(20));
    };
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream
}

fn handshake(stream: &mut UnixStream, name: &[u8]) {
    send(stream, Command::Control, name);
    let ack = read_record(stream).unwrap().unwrap();
    assert_eq!(ack.command, Command::Control);
    assert_eq!(ack.payload, CNAME_OK.as_bytes());
}

#[test]
fn second_pass_over_the_socket_comes_back_as_matches() {
    let (_tmp, socket) = start_daemon();
    let mut stream = connect(&socket);
    handshake(&mut stream, b"cname:itest");

    // First pass: three novel blocks. Novel blocks get no reply, so the
    // only record back is the ack.
    for n in 0..3 {
        let (weak, strong) = fp(n);
        send(
            &mut stream,
            Command::Signature,
            &signature_payload(weak, &strong),
        );
    }
    send(&mut stream, Command::Control, SIGS_END.as_bytes());
    assert!(read_until_ack(&mut stream).is_empty());

    // Second pass: every block is now a duplicate.
    for n in 0..3 {
        let (weak, strong) = fp(n);
        send(
            &mut stream,
            Command::Signature,
            &signature_payload(weak, &strong),
        );
    }
    send(&mut stream, Command::Control, SIGS_END.as_bytes());
    let matches = read_until_ack(&mut stream);
    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|record| record.command == Command::Match));
}

#[test]
fn clients_joining_mid_session_are_served_alongside_the_first() {
    let (_tmp, socket) = start_daemon();
    let mut first = connect(&socket);
    handshake(&mut first, b"cname:first");

    // A stream is already in flight when the second client connects.
    let (weak, strong) = fp(100);
    send(&mut first, Command::Signature, &signature_payload(weak, &strong));

    let mut second = connect(&socket);
    handshake(&mut second, b"cname:second");

    // Both streams finish and both get their own ack.
    send(&mut first, Command::Control, SIGS_END.as_bytes());
    assert!(read_until_ack(&mut first).is_empty());

    let (weak, strong) = fp(100);
    send(&mut second, Command::Signature, &signature_payload(weak, &strong));
    send(&mut second, Command::Control, SIGS_END.as_bytes());
    // The block the first client stored comes back as a match here.
    let matches = read_until_ack(&mut second);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].command, Command::Match);
}
