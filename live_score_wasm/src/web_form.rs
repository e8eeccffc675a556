use live_score::FormFields;
use wasm_bindgen::JsCast;

use crate::web_error_handling::JsResult;


// Collects the successful controls of a form in document order, the same set a browser would
// submit: named, enabled, not a button or file picker, checked if a checkbox or radio, every
// selected option of a select.
pub fn collect_form_fields(form: &web_sys::HtmlFormElement) -> JsResult<FormFields> {
    let mut fields = FormFields::new();
    let elements = form.elements();
    for i in 0..elements.length() {
        let Some(element) = elements.item(i) else {
            continue;
        };
        if element.matches(":disabled")? {
            continue;
        }
        if let Some(input) = element.dyn_ref::<web_sys::HtmlInputElement>() {
            let name = input.name();
            if name.is_empty() {
                continue;
            }
            match input.type_().to_ascii_lowercase().as_str() {
                "submit" | "button" | "reset" | "image" | "file" => {}
                "checkbox" | "radio" => {
                    if input.checked() {
                        fields.push(name, input.value());
                    }
                }
                _ => fields.push(name, input.value()),
            }
        } else if let Some(select) = element.dyn_ref::<web_sys::HtmlSelectElement>() {
            let name = select.name();
            if name.is_empty() {
                continue;
            }
            let options = select.selected_options();
            for j in 0..options.length() {
                if let Some(option) =
                    options.item(j).and_then(|o| o.dyn_into::<web_sys::HtmlOptionElement>().ok())
                {
                    fields.push(name.clone(), option.value());
                }
            }
        } else if let Some(text_area) = element.dyn_ref::<web_sys::HtmlTextAreaElement>() {
            let name = text_area.name();
            if name.is_empty() {
                continue;
            }
            fields.push(name, normalize_newlines(&text_area.value()));
        }
    }
    Ok(fields)
}

// Form serialization sends CRLF line breaks.
fn normalize_newlines(s: &str) -> String { s.replace("\r\n", "\n").replace('\n', "\r\n") }
