use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::convert::FromWasmAbi;

use crate::rust_error;
use crate::web_error_handling::JsResult;


pub struct WebDocument(web_sys::Document);

impl WebDocument {
    pub fn get_element_by_id(&self, element_id: &str) -> Option<web_sys::Element> {
        self.0.get_element_by_id(element_id)
    }

    pub fn query_selector(&self, selectors: &str) -> JsResult<Option<web_sys::Element>> {
        self.0.query_selector(selectors)
    }
}

pub fn web_document() -> JsResult<WebDocument> {
    let window = web_sys::window().ok_or_else(|| rust_error!("No window"))?;
    let document = window.document().ok_or_else(|| rust_error!("No document"))?;
    Ok(WebDocument(document))
}

// The listener lives as long as the page.
pub fn add_event_listener_and_forget<E: FromWasmAbi + 'static>(
    target: &web_sys::EventTarget, event_type: &str, listener: impl FnMut(E) + 'static,
) -> JsResult<()> {
    let closure = Closure::<dyn FnMut(E)>::new(listener);
    target.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}
