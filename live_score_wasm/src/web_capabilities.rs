// Browser implementations of the updater's capabilities.

use live_score::{FallbackRequest, FormPoster, LiveScoreError, MatchSocket, ScoreBoard, ScoreField};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::rust_error;
use crate::web_document::WebDocument;
use crate::web_error_handling::{JsResult, report_error};


const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

// Writes straight into the page elements. Slots the page doesn't have are skipped.
pub struct DomScoreBoard {
    document: WebDocument,
}

impl DomScoreBoard {
    pub fn new(document: WebDocument) -> Self { DomScoreBoard { document } }
}

impl ScoreBoard for DomScoreBoard {
    fn set_text(&mut self, field: ScoreField, text: &str) {
        if let Some(element) = self.document.get_element_by_id(field.element_id()) {
            element.set_text_content(Some(text));
        }
    }
}

pub struct WebMatchSocket<'a>(pub Option<&'a web_sys::WebSocket>);

impl MatchSocket for WebMatchSocket<'_> {
    fn is_ready(&self) -> bool {
        self.0.is_some_and(|socket| socket.ready_state() == web_sys::WebSocket::OPEN)
    }

    fn send_text(&mut self, text: String) -> Result<(), LiveScoreError> {
        let socket = self.0.ok_or_else(|| LiveScoreError::SocketSend("no socket".to_owned()))?;
        // `send` silently drops data on a closing socket.
        if socket.ready_state() != web_sys::WebSocket::OPEN {
            return Err(LiveScoreError::SocketSend(format!(
                "socket is not open (ready state {})",
                socket.ready_state()
            )));
        }
        socket
            .send_with_str(&text)
            .map_err(|err| LiveScoreError::SocketSend(format!("{:?}", err)))
    }
}

pub struct FetchFormPoster;

impl FormPoster for FetchFormPoster {
    fn post_form(&mut self, request: FallbackRequest) {
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = post(&request.path, &request.body).await {
                report_error(&format!("Fallback POST to {} failed:", request.path), &err);
            }
        });
    }
}

async fn post(path: &str, body: &str) -> JsResult<()> {
    let window = web_sys::window().ok_or_else(|| rust_error!("No window"))?;
    let headers = web_sys::Headers::new()?;
    headers.set("Content-Type", FORM_CONTENT_TYPE)?;
    headers.set("X-Requested-With", "XMLHttpRequest")?;
    let init = web_sys::RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(body));
    let response = JsFuture::from(window.fetch_with_str_and_init(path, &init)).await?;
    let response: web_sys::Response = response.dyn_into()?;
    if !response.ok() {
        return Err(rust_error!("Server responded with {} {}", response.status(), response.status_text()));
    }
    Ok(())
}
