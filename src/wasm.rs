//! Browser bindings: the client previews connecting lines and hints with
//! the same engine the server uses to validate moves.

use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use web_sys::console;

use crate::board::{Board, Position};
use crate::connect::connect;
use crate::deadlock::available_pairs;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
}

fn log(msg: &str) {
    console::log_1(&JsValue::from_str(msg));
}

/// Returns the connecting line as `[[row, col], ...]`, or `null`.
#[wasm_bindgen(js_name = findPath)]
pub fn find_path(board: JsValue, a: JsValue, b: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board)?;
    let a: Position = from_value(a)?;
    let b: Position = from_value(b)?;
    match connect(&board, a, b) {
        Some(path) => to_value(&path).map_err(|e| e.into()),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen(js_name = availablePairs)]
pub fn available_pairs_js(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board)?;
    let pairs = available_pairs(&board);
    if pairs.is_empty() {
        log("[hint] no connectable pairs on this board");
    }
    to_value(&pairs).map_err(|e| e.into())
}
