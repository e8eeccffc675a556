// Match socket for the terminal client.
//
// Each connection runs on its own thread that owns the `tungstenite` socket. The thread
// alternates between draining outgoing requests and reading with a short timeout, and forwards
// everything it sees to the main loop. All updater state stays on the main thread.

use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use live_score::{CloseInfo, LiveScoreError, MatchSocket};
use log::{debug, warn};
use tungstenite::protocol::CloseFrame;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};


// How long `send_text` waits for the socket thread to confirm a write.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(2);
// Upper bound for the socket read timeout, so that queued frames are picked up well within
// `SEND_TIMEOUT`.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(500);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

#[derive(Debug)]
pub enum NetworkEvent {
    Opened,
    Text(String),
    Error(String),
    Closed(CloseInfo),
}

enum Outgoing {
    Text { frame: PendingFrame, reply: mpsc::Sender<Result<(), String>> },
    Close,
}

// A queued text frame that either the socket thread takes or the sender withdraws, never both.
// A withdrawn frame is never written, so a failed `send_text` means the server won't see it.
#[derive(Clone, Debug)]
struct PendingFrame {
    text: String,
    state: Arc<AtomicU8>,
}

const FRAME_QUEUED: u8 = 0;
const FRAME_TAKEN: u8 = 1;
const FRAME_WITHDRAWN: u8 = 2;

impl PendingFrame {
    fn new(text: String) -> Self {
        PendingFrame { text, state: Arc::new(AtomicU8::new(FRAME_QUEUED)) }
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(FRAME_QUEUED, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    // Socket thread side. Returns the text if the sender hasn't given up on it.
    fn take(&self) -> Option<String> { self.transition(FRAME_TAKEN).then(|| self.text.clone()) }

    // Sender side. Returns false if the socket thread has already taken the frame.
    fn withdraw(&self) -> bool { self.transition(FRAME_WITHDRAWN) }
}

// Main-loop side of a connection. Dropping it lets the socket thread notice and exit on its
// next poll.
pub struct Connection {
    generation: u64,
    outgoing: mpsc::Sender<Outgoing>,
}

impl Connection {
    pub fn generation(&self) -> u64 { self.generation }

    // Starts the closing handshake. The `Closed` event follows once the server answers.
    pub fn close(&self) {
        if self.outgoing.send(Outgoing::Close).is_err() {
            debug!("Connection {} is already gone", self.generation);
        }
    }
}

impl MatchSocket for Connection {
    fn send_text(&mut self, text: String) -> Result<(), LiveScoreError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let frame = PendingFrame::new(text);
        self.outgoing
            .send(Outgoing::Text { frame: frame.clone(), reply: reply_tx })
            .map_err(|_| LiveScoreError::SocketSend("connection thread has exited".to_owned()))?;
        let result = match reply_rx.recv_timeout(SEND_TIMEOUT) {
            Ok(result) => result,
            Err(_) if frame.withdraw() => Err("no confirmation from socket".to_owned()),
            // Taken just now: the write is in progress and its result is on the way.
            Err(_) => reply_rx
                .recv()
                .unwrap_or_else(|_| Err("connection thread has exited".to_owned())),
        };
        result.map_err(LiveScoreError::SocketSend)
    }
}

// Opens a connection on a new thread. Events are wrapped with `wrap` together with the
// connection generation so that the caller can ignore events from connections it has
// abandoned.
pub fn connect<E, F>(
    url: String, generation: u64, poll_interval: Duration, events_tx: mpsc::Sender<E>, wrap: F,
) -> Connection
where
    E: Send + 'static,
    F: Fn(u64, NetworkEvent) -> E + Send + 'static,
{
    let (outgoing_tx, outgoing_rx) = mpsc::channel();
    thread::spawn(move || {
        let emit = |event: NetworkEvent| events_tx.send(wrap(generation, event)).is_ok();
        let mut socket = match tungstenite::connect(url.as_str()) {
            Ok((socket, _response)) => socket,
            Err(err) => {
                emit(NetworkEvent::Error(format!("cannot connect to {url}: {err}")));
                emit(NetworkEvent::Closed(CloseInfo::unclean(err.to_string())));
                return;
            }
        };
        if let Err(err) = set_read_timeout(&socket, poll_interval.min(MAX_POLL_INTERVAL)) {
            emit(NetworkEvent::Error(format!("cannot set read timeout: {err}")));
            emit(NetworkEvent::Closed(CloseInfo::unclean(err.to_string())));
            return;
        }
        if !emit(NetworkEvent::Opened) {
            return;
        }
        let close = serve(&mut socket, &outgoing_rx, &emit);
        if let Some(close) = close {
            emit(NetworkEvent::Closed(close));
        }
    });
    Connection { generation, outgoing: outgoing_tx }
}

// Returns how the connection ended, or `None` if the main loop is gone.
fn serve(
    socket: &mut Socket, outgoing_rx: &mpsc::Receiver<Outgoing>, emit: &dyn Fn(NetworkEvent) -> bool,
) -> Option<CloseInfo> {
    let mut close_frame: Option<CloseFrame> = None;
    loop {
        loop {
            match outgoing_rx.try_recv() {
                Ok(Outgoing::Text { frame, reply }) => {
                    let Some(text) = frame.take() else {
                        debug!("Dropping withdrawn frame");
                        continue;
                    };
                    let result = socket.send(Message::text(text)).map_err(|err| err.to_string());
                    let _ = reply.send(result);
                }
                Ok(Outgoing::Close) => {
                    if let Err(err) = socket.close(None) {
                        warn!("Cannot close match socket: {}", err);
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    return None;
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if !emit(NetworkEvent::Text(text.as_str().to_owned())) {
                    return None;
                }
            }
            Ok(Message::Close(frame)) => {
                close_frame = frame;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(err)) if is_timeout(&err) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Some(clean_close(close_frame));
            }
            Err(err) => {
                return Some(CloseInfo::unclean(err.to_string()));
            }
        }
    }
}

fn clean_close(frame: Option<CloseFrame>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo {
            was_clean: true,
            code: Some(frame.code.into()),
            reason: frame.reason.as_str().to_owned(),
        },
        // No status in the close frame, which browsers report as 1005.
        None => CloseInfo { was_clean: true, code: Some(1005), reason: String::new() },
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn set_read_timeout(socket: &Socket, timeout: Duration) -> io::Result<()> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}
