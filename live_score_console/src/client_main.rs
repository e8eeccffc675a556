// Improvement potential: Full-screen board (alternate screen) with log output in a separate
//   pane. Right now board lines and log lines share the terminal.

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::bail;
use live_score::{
    CloseOutcome, ConnectionState, FormFields, FormPoster, LiveMatchUpdater, MatchSocket,
    PageEnvironment, PageLocation, ScoreBoardState, SubmitOutcome,
};
use log::{debug, info, warn};

use crate::client_config::ClientSettings;
use crate::fallback::HttpFormPoster;
use crate::network::{self, Connection, NetworkEvent};
use crate::tui;


pub struct ClientConfig {
    pub page_url: String,
    pub match_id: Option<String>,
    pub settings: ClientSettings,
}

#[derive(Debug)]
enum IncomingEvent {
    Network { generation: u64, event: NetworkEvent },
    Terminal(String),
    TerminalClosed,
    ReconnectDue,
}

fn page_environment(page_url: &str, match_id: Option<String>) -> anyhow::Result<PageEnvironment> {
    Ok(PageEnvironment {
        // A terminal "page" always has a socket and a score display.
        socket_supported: true,
        has_home_score: true,
        declared_match_id: match_id,
        location: PageLocation::parse(page_url)?,
    })
}

// Prints what a page at `page_url` would connect to.
pub fn check_page(page_url: &str, match_id: Option<String>) -> anyhow::Result<()> {
    let env = page_environment(page_url, match_id)?;
    let Some(updater) = LiveMatchUpdater::activate(env, Default::default()) else {
        bail!("No match id: pass --match-id or use a page URL containing 'match/<id>'");
    };
    println!("Match id:     {}", updater.match_id());
    println!("Socket URL:   {}", updater.socket_url());
    println!("Fallback URL: {}", updater.location().fallback_url());
    Ok(())
}

pub fn run(config: ClientConfig) -> anyhow::Result<()> {
    let env = page_environment(&config.page_url, config.match_id)?;
    let settings = config.settings;
    let Some(updater) = LiveMatchUpdater::activate(env, settings.reconnect) else {
        bail!("No match id: pass --match-id or use a page URL containing 'match/<id>'");
    };

    let (tx, rx) = mpsc::channel();
    let tx_terminal = tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx_terminal.send(IncomingEvent::Terminal(line)).is_err() {
                return;
            }
        }
        let _ = tx_terminal.send(IncomingEvent::TerminalClosed);
    });

    let transport = ThreadTransport { tx, poll_interval: settings.poll_interval };
    let mut session = Session::new(updater, transport, HttpFormPoster::new()?);
    let mut stdout = io::stdout();
    let mut last_painted = None;
    println!("Type score updates as `name=value&name=value`, `/quit` to exit.");

    for event in rx.iter() {
        if session.handle_event(event) == Flow::Exit {
            return Ok(());
        }
        let paint_key = (session.board().revision(), session.state());
        if last_painted != Some(paint_key) {
            debug!("Board: {}", tui::render_plain(session.board()));
            tui::print_board(&mut stdout, session.board(), session.state())?;
            last_painted = Some(paint_key);
        }
    }
    bail!("Unexpected end of events stream");
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flow {
    Continue,
    Exit,
}

trait SessionConnection: MatchSocket {
    fn generation(&self) -> u64;
    fn close(&self);
}

impl SessionConnection for Connection {
    fn generation(&self) -> u64 { Connection::generation(self) }
    fn close(&self) { Connection::close(self) }
}

// Side effects of the session that need threads and sockets.
trait SessionTransport {
    type Connection: SessionConnection;
    fn connect(&mut self, url: String, generation: u64) -> Self::Connection;
    // Must deliver exactly one `ReconnectDue` after `delay`.
    fn schedule_reconnect(&mut self, delay: Duration);
}

struct ThreadTransport {
    tx: mpsc::Sender<IncomingEvent>,
    poll_interval: Duration,
}

impl SessionTransport for ThreadTransport {
    type Connection = Connection;

    fn connect(&mut self, url: String, generation: u64) -> Connection {
        network::connect(url, generation, self.poll_interval, self.tx.clone(), |generation, event| {
            IncomingEvent::Network { generation, event }
        })
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = tx.send(IncomingEvent::ReconnectDue);
        });
    }
}

// Everything the main loop does with one event. Owns all updater state.
struct Session<T: SessionTransport, P: FormPoster> {
    updater: LiveMatchUpdater,
    board: ScoreBoardState,
    transport: T,
    connection: T::Connection,
    poster: P,
    quitting: bool,
}

impl<T: SessionTransport, P: FormPoster> Session<T, P> {
    fn new(updater: LiveMatchUpdater, mut transport: T, poster: P) -> Self {
        let connection = transport.connect(updater.socket_url(), 0);
        Session {
            updater,
            board: ScoreBoardState::new(),
            transport,
            connection,
            poster,
            quitting: false,
        }
    }

    fn board(&self) -> &ScoreBoardState { &self.board }
    fn state(&self) -> ConnectionState { self.updater.state() }

    fn handle_event(&mut self, event: IncomingEvent) -> Flow {
        match event {
            IncomingEvent::Network { generation, event } => {
                if generation != self.connection.generation() {
                    debug!("Ignoring {:?} from connection {}", event, generation);
                    return Flow::Continue;
                }
                self.handle_network_event(event)
            }
            IncomingEvent::Terminal(line) => self.handle_line(line.trim()),
            IncomingEvent::TerminalClosed => self.quit(),
            IncomingEvent::ReconnectDue => {
                if let Some(url) = self.updater.reconnect() {
                    let generation = self.connection.generation() + 1;
                    self.connection = self.transport.connect(url, generation);
                }
                Flow::Continue
            }
        }
    }

    fn handle_network_event(&mut self, event: NetworkEvent) -> Flow {
        match event {
            NetworkEvent::Opened => self.updater.on_open(),
            NetworkEvent::Text(text) => {
                self.updater.on_message(&text, &mut self.board);
            }
            NetworkEvent::Error(description) => self.updater.on_error(&description),
            NetworkEvent::Closed(close) => {
                if self.quitting {
                    return Flow::Exit;
                }
                match self.updater.on_close(&close) {
                    CloseOutcome::Finished => {
                        info!("Live updates finished. Forms are still posted over HTTP.");
                    }
                    CloseOutcome::Reconnect { attempt, delay } => {
                        info!(
                            "Connection lost. Retry #{} in {}",
                            attempt,
                            humantime::format_duration(delay)
                        );
                        self.transport.schedule_reconnect(delay);
                    }
                    CloseOutcome::AlreadyPending => {}
                    CloseOutcome::GaveUp { .. } => {
                        warn!("No more live updates. Forms are still posted over HTTP.");
                    }
                }
            }
        }
        Flow::Continue
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        if line == "/quit" {
            return self.quit();
        }
        if line.is_empty() {
            return Flow::Continue;
        }
        let fields = FormFields::parse_urlencoded(line);
        match self.updater.submit_form(&fields, &mut self.connection, &mut self.poster) {
            SubmitOutcome::SentOverSocket => info!("Score update sent"),
            SubmitOutcome::PostedAfterSendFailure | SubmitOutcome::PostedWhileClosed => {
                info!("Score update posted to {}", self.updater.location().fallback_url())
            }
        }
        Flow::Continue
    }

    // Closes the socket politely if there is one; the `Closed` event then ends the session.
    fn quit(&mut self) -> Flow {
        if !self.updater.is_open() {
            return Flow::Exit;
        }
        self.quitting = true;
        self.connection.close();
        Flow::Continue
    }
}


#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use live_score::reconnect::ReconnectPolicy;
    use live_score::test_util::{RecordingPoster, sample_environment};
    use live_score::{CloseInfo, LiveScoreError, ScoreField};
    use pretty_assertions::assert_eq;

    use super::*;

    const SOCKET_URL: &str = "ws://cricket.example.org/ws/match/42/";

    struct FakeConnection {
        generation: u64,
        sent: Vec<String>,
        closed: Cell<bool>,
    }

    impl MatchSocket for FakeConnection {
        fn send_text(&mut self, text: String) -> Result<(), LiveScoreError> {
            self.sent.push(text);
            Ok(())
        }
    }

    impl SessionConnection for FakeConnection {
        fn generation(&self) -> u64 { self.generation }
        fn close(&self) { self.closed.set(true); }
    }

    #[derive(Default)]
    struct FakeTransport {
        connects: Vec<(String, u64)>,
        reconnect_delays: Vec<Duration>,
    }

    impl SessionTransport for FakeTransport {
        type Connection = FakeConnection;

        fn connect(&mut self, url: String, generation: u64) -> FakeConnection {
            self.connects.push((url, generation));
            FakeConnection { generation, sent: Vec::new(), closed: Cell::new(false) }
        }

        fn schedule_reconnect(&mut self, delay: Duration) { self.reconnect_delays.push(delay); }
    }

    type TestSession = Session<FakeTransport, RecordingPoster>;

    fn new_session() -> TestSession {
        let updater =
            LiveMatchUpdater::activate(sample_environment(), ReconnectPolicy::default()).unwrap();
        Session::new(updater, FakeTransport::default(), RecordingPoster::default())
    }

    fn network(generation: u64, event: NetworkEvent) -> IncomingEvent {
        IncomingEvent::Network { generation, event }
    }

    fn terminal(line: &str) -> IncomingEvent { IncomingEvent::Terminal(line.to_owned()) }

    #[test]
    fn reconnect_opens_one_connection_and_ignores_stale_events() {
        let mut session = new_session();
        assert_eq!(session.handle_event(network(0, NetworkEvent::Opened)), Flow::Continue);
        assert_eq!(session.state(), ConnectionState::Open);

        let close = NetworkEvent::Closed(CloseInfo::unclean("connection reset"));
        assert_eq!(session.handle_event(network(0, close)), Flow::Continue);
        assert_eq!(session.transport.reconnect_delays, vec![Duration::from_secs(5)]);

        session.handle_event(IncomingEvent::ReconnectDue);
        session.handle_event(IncomingEvent::ReconnectDue);
        assert_eq!(session.transport.connects, vec![
            (SOCKET_URL.to_owned(), 0),
            (SOCKET_URL.to_owned(), 1),
        ]);

        let late = NetworkEvent::Text(r#"{"innings": "2nd"}"#.to_owned());
        session.handle_event(network(0, late));
        session.handle_event(network(0, NetworkEvent::Opened));
        assert_eq!(session.board().get(ScoreField::Innings), None);
        assert_eq!(session.state(), ConnectionState::Connecting);

        session.handle_event(network(1, NetworkEvent::Opened));
        session.handle_event(network(1, NetworkEvent::Text(r#"{"innings": "2nd"}"#.to_owned())));
        assert_eq!(session.board().get(ScoreField::Innings), Some("2nd"));
        assert_eq!(session.state(), ConnectionState::Open);
    }

    #[test]
    fn form_while_open_goes_over_socket_only() {
        let mut session = new_session();
        session.handle_event(network(0, NetworkEvent::Opened));
        session.handle_event(terminal("home_score=121"));
        assert_eq!(session.connection.sent, vec![
            r#"{"message":{"home_score":"121"}}"#.to_owned()
        ]);
        assert!(session.poster.requests.is_empty());
    }

    #[test]
    fn clean_close_keeps_serving_forms() {
        let mut session = new_session();
        session.handle_event(network(0, NetworkEvent::Opened));
        let close = NetworkEvent::Closed(CloseInfo::clean("match over"));
        assert_eq!(session.handle_event(network(0, close)), Flow::Continue);
        assert!(session.transport.reconnect_delays.is_empty());

        assert_eq!(session.handle_event(terminal("innings=3")), Flow::Continue);
        assert!(session.connection.sent.is_empty());
        assert_eq!(session.poster.requests.len(), 1);
        assert_eq!(session.poster.requests[0].body, "innings=3");

        assert_eq!(session.handle_event(IncomingEvent::TerminalClosed), Flow::Exit);
    }

    #[test]
    fn quit_closes_socket_then_exits_on_close() {
        let mut session = new_session();
        session.handle_event(network(0, NetworkEvent::Opened));
        assert_eq!(session.handle_event(terminal("  /quit ")), Flow::Continue);
        assert!(session.connection.closed.get());
        let close = NetworkEvent::Closed(CloseInfo::clean(""));
        assert_eq!(session.handle_event(network(0, close)), Flow::Exit);
    }

    #[test]
    fn quit_without_open_socket_exits_at_once() {
        let mut session = new_session();
        assert_eq!(session.handle_event(terminal("/quit")), Flow::Exit);
        assert!(!session.connection.closed.get());
    }
}
