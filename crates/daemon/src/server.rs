//! The chooser server: a single-threaded readiness loop over a Unix socket.
//!
//! One process serves one store. All engine state (the fingerprint index,
//! the sparse index, the address counters) lives on the loop thread and is
//! only ever touched between `poll` calls, so there is no locking beyond
//! the store's advisory file lock. Each connected client gets its own
//! record buffers and its own batch; a client disconnecting discards that
//! state and nothing else.

use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};

use checksums::WeakSum;
use engine::{Batch, ChampionChooser, DedupSession, EngineError, Resolution, SparseIndex};
use protocol::{
    match_payload, parse_client_name, parse_signature, try_parse_record, write_record,
    wrap_up_payload, Command, ProtocolError, Record, CNAME_OK, EMPTY_SAVE_PATH, SIGS_END,
};
use store::{is_hook, StoreLayout, StoreLock};
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};

const READ_CHUNK_LEN: usize = 64 * 1024;

/// Binds the socket and runs the serve loop until a store-fatal error.
pub fn serve(config: &DaemonConfig) -> DaemonResult<()> {
    let layout = StoreLayout::new(config.store_root());
    layout.create_dirs()?;
    let _lock = StoreLock::acquire(&layout)?;

    let chooser = ChampionChooser::new(SparseIndex::build(&layout)?);
    let mut session = DedupSession::new(&layout, chooser)?;

    let socket_path = config.socket_path();
    match fs::remove_file(socket_path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(DaemonError::io(socket_path, err)),
    }
    let listener =
        UnixListener::bind(socket_path).map_err(|err| DaemonError::io(socket_path, err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| DaemonError::io(socket_path, err))?;
    info!(socket = %socket_path.display(), store = %config.store_root().display(), "listening");

    let mut clients: Vec<Client> = Vec::new();
    loop {
        let mut fds = Vec::with_capacity(clients.len() + 1);
        fds.push(libc::pollfd {
            fd: listener.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        });
        for client in &clients {
            let mut events = if client.conn.draining {
                0
            } else {
                libc::POLLIN
            };
            if !client.conn.outbuf.is_empty() {
                events |= libc::POLLOUT;
            }
            fds.push(libc::pollfd {
                fd: client.stream.as_raw_fd(),
                events,
                revents: 0,
            });
        }

        poll(&mut fds).map_err(|err| DaemonError::io(socket_path, err))?;

        if fds[0].revents & libc::POLLIN != 0 {
            accept_all(&listener, &layout, &mut clients)?;
        }

        // Only the clients that were in the fd set get handled this round;
        // connections accepted above wait for the next poll. Walk back to
        // front so dropping one does not disturb the fd slots still to be
        // visited.
        for i in (0..fds.len() - 1).rev() {
            let revents = fds[i + 1].revents;
            let mut alive = true;
            if revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
                alive = false;
            }
            if alive && revents & libc::POLLOUT != 0 {
                alive = flush_client(&mut clients[i]);
            }
            if alive && !clients[i].conn.draining
                && revents & (libc::POLLIN | libc::POLLHUP) != 0
            {
                alive = read_client(&mut session, &mut clients[i])?;
            }
            if alive && clients[i].conn.draining && clients[i].conn.outbuf.is_empty() {
                alive = false;
            }
            if !alive {
                let client = clients.swap_remove(i);
                debug!(client = %client.conn.name, "client disconnected");
            }
        }
    }
}

#[allow(unsafe_code)]
fn poll(fds: &mut [libc::pollfd]) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if rc >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn accept_all(
    listener: &UnixListener,
    layout: &StoreLayout,
    clients: &mut Vec<Client>,
) -> DaemonResult<()> {
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = stream.set_nonblocking(true) {
                    warn!(error = %err, "dropping connection that cannot go nonblocking");
                    continue;
                }
                debug!("client connected");
                clients.push(Client {
                    stream,
                    conn: ClientConn::new(layout.clone()),
                });
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(DaemonError::io(layout.root(), err)),
        }
    }
}

/// Drains as much of the out buffer as the socket accepts.
fn flush_client(client: &mut Client) -> bool {
    while !client.conn.outbuf.is_empty() {
        match client.stream.write(&client.conn.outbuf) {
            Ok(0) => return false,
            Ok(written) => {
                client.conn.outbuf.drain(..written);
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => break,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                warn!(client = %client.conn.name, error = %err, "write failed");
                return false;
            }
        }
    }
    true
}

/// Reads available bytes and applies every complete record.
///
/// Returns `Ok(false)` when the client should be dropped; store-fatal
/// failures propagate instead.
fn read_client(session: &mut DedupSession, client: &mut Client) -> DaemonResult<bool> {
    let mut buf = [0u8; READ_CHUNK_LEN];
    let mut eof = false;
    loop {
        match client.stream.read(&mut buf) {
            Ok(0) => {
                eof = true;
                break;
            }
            Ok(read) => client.conn.inbuf.extend_from_slice(&buf[..read]),
            Err(err) if err.kind() == ErrorKind::WouldBlock => break,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                warn!(client = %client.conn.name, error = %err, "read failed");
                return Ok(false);
            }
        }
    }

    match client.conn.process(session) {
        Ok(()) => {}
        Err(ClientFault::Fatal(err)) => return Err(err),
        Err(fault) => {
            warn!(client = %client.conn.name, error = %fault, "dropping client");
            return Ok(false);
        }
    }

    if eof {
        if !flush_client(client) {
            return Ok(false);
        }
        if client.conn.outbuf.is_empty() {
            return Ok(false);
        }
        // Queued verdicts outlive the half-closed stream; the client stays
        // registered for writes until the buffer drains.
        client.conn.draining = true;
    }
    Ok(true)
}

struct Client {
    stream: UnixStream,
    conn: ClientConn,
}

#[derive(Debug)]
enum ClientState {
    AwaitName,
    Streaming,
}

/// Why a client connection is being torn down.
#[derive(Debug, thiserror::Error)]
enum ClientFault {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Engine(EngineError),
    #[error("record {0} is not valid in this state")]
    UnexpectedRecord(Command),
    /// Store-fatal failure that must take the daemon down.
    #[error(transparent)]
    Fatal(DaemonError),
}

impl From<EngineError> for ClientFault {
    fn from(err: EngineError) -> Self {
        // Address exhaustion poisons the whole store, not just this client.
        if matches!(
            &err,
            EngineError::Store(store::StoreError::CapacityExhausted { .. })
        ) {
            Self::Fatal(DaemonError::Engine(err))
        } else {
            Self::Engine(err)
        }
    }
}

/// Per-client protocol state, separated from the socket so the record
/// handling stays testable.
struct ClientConn {
    layout: StoreLayout,
    state: ClientState,
    name: String,
    inbuf: Vec<u8>,
    outbuf: Vec<u8>,
    batch: Batch,
    next_index: u64,
    /// Sampled hooks of the stream so far, for candidate registration.
    hooks: Vec<WeakSum>,
    /// Set at EOF while verdicts are still queued; reads stop, writes
    /// continue until the out buffer empties.
    draining: bool,
}

impl ClientConn {
    fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            state: ClientState::AwaitName,
            name: String::new(),
            inbuf: Vec::new(),
            outbuf: Vec::new(),
            batch: Batch::new(),
            next_index: 0,
            hooks: Vec::new(),
            draining: false,
        }
    }

    /// Applies every complete record currently buffered.
    fn process(&mut self, session: &mut DedupSession) -> Result<(), ClientFault> {
        while let Some((record, used)) = try_parse_record(&self.inbuf)? {
            self.inbuf.drain(..used);
            self.apply(session, &record)?;
        }
        Ok(())
    }

    fn apply(&mut self, session: &mut DedupSession, record: &Record) -> Result<(), ClientFault> {
        match (&self.state, record.command) {
            (ClientState::AwaitName, Command::Control) => {
                self.name = parse_client_name(&record.payload)?.to_owned();
                info!(client = %self.name, "client identified");
                self.reply(Command::Control, CNAME_OK.as_bytes())?;
                self.state = ClientState::Streaming;
                Ok(())
            }
            (ClientState::Streaming, Command::Signature) => {
                let (weak, strong) = parse_signature(&record.payload)?;
                if is_hook(weak) {
                    self.hooks.push(weak);
                }
                let index = self.next_index;
                self.next_index += 1;
                let resolutions = session.push(&mut self.batch, index, weak, strong)?;
                self.reply_resolutions(&resolutions)
            }
            (ClientState::Streaming, Command::Control)
                if record.payload == SIGS_END.as_bytes() =>
            {
                let resolutions = session.finish(&mut self.batch)?;
                self.reply_resolutions(&resolutions)?;
                // Ack so the client knows this stream's verdicts are done.
                self.reply(Command::Control, SIGS_END.as_bytes())
            }
            (ClientState::Streaming, Command::ManifestPath) => {
                let path = String::from_utf8(record.payload.clone()).map_err(|err| {
                    ProtocolError::MalformedPayload {
                        context: "manifest path",
                        detail: err.to_string(),
                    }
                })?;
                let hooks = std::mem::take(&mut self.hooks);
                session
                    .chooser_mut()
                    .sparse_mut()
                    .add_candidate(&self.layout, path.into(), &hooks)?;
                info!(client = %self.name, "candidate registered");
                Ok(())
            }
            (_, command) => Err(ClientFault::UnexpectedRecord(command)),
        }
    }

    fn reply_resolutions(&mut self, resolutions: &[Resolution]) -> Result<(), ClientFault> {
        for resolution in resolutions {
            match *resolution {
                // Novel blocks get no reply; silence tells the producer to
                // keep the block for storage.
                Resolution::NotGot { .. } => {}
                Resolution::Got { index, address } => {
                    let payload = match_payload(index, &address.to_string());
                    self.reply(Command::Match, &payload)?;
                }
                Resolution::Empty { index } => {
                    let payload = match_payload(index, EMPTY_SAVE_PATH);
                    self.reply(Command::Match, &payload)?;
                }
                Resolution::WrapUp { index } => {
                    self.reply(Command::WrapUp, &wrap_up_payload(index))?;
                }
            }
        }
        Ok(())
    }

    fn reply(&mut self, command: Command, payload: &[u8]) -> Result<(), ClientFault> {
        write_record(&mut self.outbuf, command, payload).map_err(ClientFault::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checksums::{strong_sum, StrongSum};
    use protocol::signature_payload;

    fn setup() -> (tempfile::TempDir, StoreLayout, DedupSession) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(tmp.path());
        layout.create_dirs().unwrap();
        let chooser = ChampionChooser::new(SparseIndex::build(&layout).unwrap());
        let session = DedupSession::new(&layout, chooser).unwrap();
        (tmp, layout, session)
    }

    fn feed(conn: &mut ClientConn, session: &mut DedupSession, command: Command, payload: &[u8]) {
        write_record(&mut conn.inbuf, command, payload).unwrap();
        conn.process(session).unwrap();
    }

    fn replies(conn: &mut ClientConn) -> Vec<Record> {
        let mut out = Vec::new();
        while let Some((record, used)) = try_parse_record(&conn.outbuf).unwrap() {
            conn.outbuf.drain(..used);
            out.push(record);
        }
        out
    }

    fn fp(n: u64) -> (WeakSum, StrongSum) {
        (WeakSum::new(n + 1), strong_sum(&n.to_le_bytes()))
    }

    #[test]
    fn handshake_acknowledges_the_client_name() {
        let (_tmp, layout, mut session) = setup();
        let mut conn = ClientConn::new(layout);
        feed(&mut conn, &mut session, Command::Control, b"cname:laptop");
        let replies = replies(&mut conn);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].command, Command::Control);
        assert_eq!(replies[0].payload, CNAME_OK.as_bytes());
        assert_eq!(conn.name, "laptop");
    }

    #[test]
    fn signatures_before_handshake_drop_the_client() {
        let (_tmp, layout, mut session) = setup();
        let mut conn = ClientConn::new(layout);
        let (weak, strong) = fp(0);
        write_record(
            &mut conn.inbuf,
            Command::Signature,
            &signature_payload(weak, &strong),
        )
        .unwrap();
        let fault = conn.process(&mut session).unwrap_err();
        assert!(matches!(fault, ClientFault::UnexpectedRecord(_)));
    }

    #[test]
    fn duplicate_stream_yields_match_records_and_an_ack() {
        let (_tmp, layout, mut session) = setup();
        let mut conn = ClientConn::new(layout.clone());
        feed(&mut conn, &mut session, Command::Control, b"cname:one");
        let _ = replies(&mut conn);

        // First pass: two novel blocks, then end of stream.
        for n in 0..2 {
            let (weak, strong) = fp(n);
            feed(
                &mut conn,
                &mut session,
                Command::Signature,
                &signature_payload(weak, &strong),
            );
        }
        feed(&mut conn, &mut session, Command::Control, SIGS_END.as_bytes());
        // Novel blocks get no match records, just the ack.
        let first = replies(&mut conn);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].payload, SIGS_END.as_bytes());

        // Second pass over the same blocks: every one is a duplicate now.
        for n in 0..2 {
            let (weak, strong) = fp(n);
            feed(
                &mut conn,
                &mut session,
                Command::Signature,
                &signature_payload(weak, &strong),
            );
        }
        feed(&mut conn, &mut session, Command::Control, SIGS_END.as_bytes());
        let second = replies(&mut conn);
        assert_eq!(second.len(), 3);
        assert!(second[..2]
            .iter()
            .all(|record| record.command == Command::Match));
        assert_eq!(second[2].payload, SIGS_END.as_bytes());
    }

    #[test]
    fn empty_block_matches_with_the_placeholder_path() {
        let (_tmp, layout, mut session) = setup();
        let mut conn = ClientConn::new(layout);
        feed(&mut conn, &mut session, Command::Control, b"cname:one");
        let _ = replies(&mut conn);

        feed(
            &mut conn,
            &mut session,
            Command::Signature,
            &signature_payload(WeakSum::ZERO, &StrongSum::EMPTY),
        );
        feed(&mut conn, &mut session, Command::Control, SIGS_END.as_bytes());
        let out = replies(&mut conn);
        assert_eq!(out.len(), 2);
        let (index, path) = protocol::parse_match_payload(&out[0].payload).unwrap();
        assert_eq!(index, 0);
        assert_eq!(path, EMPTY_SAVE_PATH);
    }

    #[test]
    fn queued_verdicts_survive_client_eof() {
        let (_tmp, layout, mut session) = setup();
        let (server_end, mut client_end) = UnixStream::pair().unwrap();
        server_end.set_nonblocking(true).unwrap();
        let mut client = Client {
            stream: server_end,
            conn: ClientConn::new(layout),
        };

        // Queue far more reply bytes than a socket buffer holds, then
        // close the sending half from the peer side.
        while client.conn.outbuf.len() < 4 << 20 {
            client
                .conn
                .reply(Command::Match, &match_payload(0, "0000/0000/0000/0000"))
                .unwrap();
        }
        let queued = client.conn.outbuf.len();
        client_end.shutdown(std::net::Shutdown::Write).unwrap();

        // EOF with replies still queued keeps the connection, draining.
        assert!(read_client(&mut session, &mut client).unwrap());
        assert!(client.conn.draining);

        let mut received = 0;
        let mut buf = [0u8; 64 * 1024];
        while received < queued {
            let n = client_end.read(&mut buf).unwrap();
            assert!(n > 0, "peer closed before every verdict arrived");
            received += n;
            flush_client(&mut client);
        }
        assert!(client.conn.outbuf.is_empty());
    }

    #[test]
    fn partial_records_wait_for_more_bytes() {
        let (_tmp, layout, mut session) = setup();
        let mut conn = ClientConn::new(layout);
        let mut framed = Vec::new();
        write_record(&mut framed, Command::Control, b"cname:slow").unwrap();

        conn.inbuf.extend_from_slice(&framed[..3]);
        conn.process(&mut session).unwrap();
        assert!(conn.outbuf.is_empty());

        conn.inbuf.extend_from_slice(&framed[3..]);
        conn.process(&mut session).unwrap();
        assert_eq!(replies(&mut conn).len(), 1);
    }
}
