// Browser front-end: binds `LiveMatchUpdater` to the page DOM, a `WebSocket` and `fetch`.
//
// Everything runs on the page event loop. State is shared by the event closures through
// `Rc<RefCell<_>>`; no closure holds a borrow across an await or a callback into JS.

#![cfg_attr(feature = "strict", deny(warnings))]

mod web_capabilities;
mod web_document;
mod web_error_handling;
mod web_form;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gloo_timers::callback::Timeout;
use live_score::{
    CloseInfo, CloseOutcome, LiveMatchUpdater, PageEnvironment, PageLocation, ReconnectPolicy,
    ScoreField, SubmitOutcome,
};
use log::{Level, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use web_capabilities::{DomScoreBoard, FetchFormPoster, WebMatchSocket};
use web_document::{WebDocument, add_event_listener_and_forget, web_document};
use web_error_handling::{JsResult, report_error};
pub use web_error_handling::{RustError, last_panic, set_panic_hook};
use web_form::collect_form_fields;


const SCORE_FORM_ID: &str = "score-update-form";
const MATCH_ID_SCRIPT_SELECTOR: &str = "script[data-match-id]";
const MATCH_ID_ATTRIBUTE: &str = "data-match-id";

struct LiveMatch {
    updater: LiveMatchUpdater,
    socket: Option<web_sys::WebSocket>,
    // Bumped on every connection. Events from older sockets are ignored.
    generation: u64,
    board: DomScoreBoard,
}

type SharedLiveMatch = Rc<RefCell<LiveMatch>>;

// Starts live updates if this is a live match page. Returns whether updates were started.
//
// `declared_match_id` is what the page template knows about the match. If it's not given, the
// `data-match-id` attribute of a page script is used, and then the page URL.
#[wasm_bindgen]
pub fn init_live_match(declared_match_id: Option<String>) -> JsResult<bool> {
    set_panic_hook();
    // Fails only if a logger is already installed, e.g. when the page initializes twice.
    let _ = console_log::init_with_level(Level::Info);

    let window = web_sys::window().ok_or_else(|| rust_error!("No window"))?;
    let document = web_document()?;
    let location = window.location();
    let location = PageLocation::from_browser_parts(
        &location.protocol()?,
        &location.host()?,
        &location.pathname()?,
    );
    let declared_match_id = match declared_match_id {
        Some(id) => Some(id),
        None => document
            .query_selector(MATCH_ID_SCRIPT_SELECTOR)?
            .and_then(|script| script.get_attribute(MATCH_ID_ATTRIBUTE)),
    };
    let env = PageEnvironment {
        socket_supported: js_sys::Reflect::has(&window, &JsValue::from_str("WebSocket"))?,
        has_home_score: document.get_element_by_id(ScoreField::HomeScore.element_id()).is_some(),
        declared_match_id,
        location,
    };
    let Some(updater) = LiveMatchUpdater::activate(env, ReconnectPolicy::default()) else {
        info!("Live score updates are not available on this page");
        return Ok(false);
    };

    let url = updater.socket_url();
    let live = Rc::new(RefCell::new(LiveMatch {
        updater,
        socket: None,
        generation: 0,
        board: DomScoreBoard::new(web_document()?),
    }));
    connect(&live, &url)?;
    intercept_score_form(&live, &document)?;
    Ok(true)
}

// TODO: Drop the handlers of a replaced socket instead of leaking them on every reconnect.
fn connect(live: &SharedLiveMatch, url: &str) -> JsResult<()> {
    let socket = web_sys::WebSocket::new(url)?;
    let generation = {
        let mut live = live.borrow_mut();
        live.generation += 1;
        live.generation
    };

    let onopen = socket_handler(live, generation, |live, _: web_sys::Event| {
        live.borrow_mut().updater.on_open();
    });
    let onmessage = socket_handler(live, generation, |live, event: web_sys::MessageEvent| {
        let Some(payload) = event.data().as_string() else {
            warn!("Ignoring non-text match socket message");
            return;
        };
        let LiveMatch { updater, board, .. } = &mut *live.borrow_mut();
        updater.on_message(&payload, board);
    });
    let onerror = socket_handler(live, generation, |live, event: web_sys::Event| {
        live.borrow_mut().updater.on_error(&event.type_());
    });
    let onclose = socket_handler(live, generation, |live, event: web_sys::CloseEvent| {
        let close = CloseInfo {
            was_clean: event.was_clean(),
            code: Some(event.code()),
            reason: event.reason(),
        };
        let outcome = live.borrow_mut().updater.on_close(&close);
        handle_close_outcome(live, outcome);
    });

    socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onopen.forget();
    onmessage.forget();
    onerror.forget();
    onclose.forget();

    live.borrow_mut().socket = Some(socket);
    Ok(())
}

fn socket_handler<E: FromWasmAbi + 'static>(
    live: &SharedLiveMatch, generation: u64, mut handler: impl FnMut(&SharedLiveMatch, E) + 'static,
) -> Closure<dyn FnMut(E)> {
    let live = Rc::clone(live);
    Closure::new(move |event: E| {
        let current = live.borrow().generation;
        if current == generation {
            handler(&live, event);
        }
    })
}

fn handle_close_outcome(live: &SharedLiveMatch, outcome: CloseOutcome) {
    if let CloseOutcome::Reconnect { delay, .. } = outcome {
        schedule_reconnect(live, delay);
    }
}

fn schedule_reconnect(live: &SharedLiveMatch, delay: Duration) {
    let live = Rc::clone(live);
    let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
    // Not kept anywhere: dropping a `Timeout` cancels it.
    Timeout::new(millis, move || {
        let Some(url) = live.borrow_mut().updater.reconnect() else {
            return;
        };
        if let Err(err) = connect(&live, &url) {
            report_error("Cannot reconnect match socket:", &err);
            let outcome =
                live.borrow_mut().updater.on_close(&CloseInfo::unclean("cannot create socket"));
            handle_close_outcome(&live, outcome);
        }
    })
    .forget();
}

fn intercept_score_form(live: &SharedLiveMatch, document: &WebDocument) -> JsResult<()> {
    let Some(form) = document.get_element_by_id(SCORE_FORM_ID) else {
        return Ok(());
    };
    let form: web_sys::HtmlFormElement = form.dyn_into()?;
    let live = Rc::clone(live);
    let target = form.clone();
    add_event_listener_and_forget(&form, "submit", move |event: web_sys::Event| {
        event.prevent_default();
        let fields = match collect_form_fields(&target) {
            Ok(fields) => fields,
            Err(err) => {
                report_error("Cannot read score update form:", &err);
                return;
            }
        };
        let LiveMatch { updater, socket, .. } = &mut *live.borrow_mut();
        match updater.submit_form(&fields, &mut WebMatchSocket(socket.as_ref()), &mut FetchFormPoster)
        {
            SubmitOutcome::SentOverSocket => info!("Score update sent"),
            SubmitOutcome::PostedAfterSendFailure | SubmitOutcome::PostedWhileClosed => {
                info!("Score update posted to {}", updater.location().fallback_path())
            }
        }
    })
}


#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use std::cell::Cell;

    use gloo_timers::future::TimeoutFuture;
    use live_score::ConnectionState;
    use live_score::test_util::sample_environment;
    use wasm_bindgen_test::*;

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn live_match(generation: u64, policy: ReconnectPolicy) -> SharedLiveMatch {
        let mut env = sample_environment();
        env.location = PageLocation::new(false, "127.0.0.1:9", "/match/42/");
        let updater = LiveMatchUpdater::activate(env, policy).unwrap();
        Rc::new(RefCell::new(LiveMatch {
            updater,
            socket: None,
            generation,
            board: DomScoreBoard::new(web_document().unwrap()),
        }))
    }

    fn fire(handler: &Closure<dyn FnMut(web_sys::Event)>) {
        let function: &js_sys::Function = handler.as_ref().unchecked_ref();
        function.call1(&JsValue::NULL, &web_sys::Event::new("open").unwrap()).unwrap();
    }

    fn counting_open_handler(
        live: &SharedLiveMatch, generation: u64, calls: &Rc<Cell<u32>>,
    ) -> Closure<dyn FnMut(web_sys::Event)> {
        let calls = Rc::clone(calls);
        socket_handler(live, generation, move |live, _: web_sys::Event| {
            live.borrow_mut().updater.on_open();
            calls.set(calls.get() + 1);
        })
    }

    #[wasm_bindgen_test]
    fn handlers_of_replaced_socket_are_ignored() {
        let live = live_match(1, ReconnectPolicy::default());
        let calls = Rc::new(Cell::new(0));
        let stale = counting_open_handler(&live, 1, &calls);
        live.borrow_mut().generation = 2;
        fire(&stale);
        assert_eq!(calls.get(), 0);
        assert_eq!(live.borrow().updater.state(), ConnectionState::Connecting);

        let current = counting_open_handler(&live, 2, &calls);
        fire(&current);
        assert_eq!(calls.get(), 1);
        assert!(live.borrow().updater.is_open());
    }

    #[wasm_bindgen_test]
    async fn unclean_close_reconnects_with_new_generation() {
        let policy = ReconnectPolicy {
            delay: Duration::from_millis(10),
            max_attempts: Some(1),
            ..ReconnectPolicy::default()
        };
        let live = live_match(1, policy);
        let outcome = live.borrow_mut().updater.on_close(&CloseInfo::unclean("network down"));
        handle_close_outcome(&live, outcome);
        assert_eq!(live.borrow().generation, 1);
        assert!(live.borrow().socket.is_none());

        TimeoutFuture::new(200).await;
        let live = live.borrow();
        assert_eq!(live.generation, 2);
        assert!(live.socket.is_some());
        assert_eq!(live.updater.reconnect_attempts(), 1);
    }
}
