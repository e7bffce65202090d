//! Support for the iTerm2 inline images protocol (OSC 1337).
//!
//! OSC 1337 carries many nonstandard commands; only `File=` uploads with
//! `inline=1` are turned into graphics, everything else is dropped.

use std::str;

use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine;
use rustc_hash::FxHashMap;

use crate::ansi::graphics::{GraphicData, GraphicId};

/// Parse the OSC 1337 parameters into a graphic for the grid.
pub fn parse(params: &[&[u8]]) -> Option<GraphicData> {
    let (params, contents) = param_values(params)?;

    if params.get("inline") != Some(&"1") {
        return None;
    }

    let buffer = match Base64.decode(contents) {
        Ok(buffer) => buffer,
        Err(err) => {
            tracing::warn!("Can't decode base64 data: {}", err);
            return None;
        }
    };

    let image = match image::load_from_memory(&buffer) {
        Ok(image) => image,
        Err(err) => {
            tracing::warn!("Can't load image: {}", err);
            return None;
        }
    };

    Some(GraphicData::from_dynamic_image(GraphicId(0), image))
}

/// Extract parameter values.
///
/// The format defined by iTerm2 starts with a `File=` string, and the
/// file contents follow a `:`:
///
/// ```notrust
/// ESC ] 1337 ; File = [arguments] : base-64 encoded file contents ^G
/// ```
///
/// The `File=` marker lands in the first parameter and the payload is
/// glued to the last one, so both have to be split back apart.
fn param_values<'a>(
    params: &[&'a [u8]],
) -> Option<(FxHashMap<&'a str, &'a str>, &'a [u8])> {
    let mut map = FxHashMap::default();
    let mut contents = None;

    for (index, mut param) in params.iter().skip(1).copied().enumerate() {
        // First parameter should start with "File=".
        if index == 0 {
            if !param.starts_with(&b"File="[..]) {
                return None;
            }

            param = &param[5..];
        }

        if let Some(separator) = param.iter().position(|&b| b == b'=') {
            let (key, mut value) = param.split_at(separator);
            value = &value[1..];

            // Last parameter has the file contents after the first ':'.
            // Add 2 because we are skipping the first param.
            if index + 2 == params.len() {
                if let Some(separator) = value.iter().position(|&b| b == b':') {
                    let (a, b) = value.split_at(separator);
                    value = a;
                    contents = Some(&b[1..]);
                }
            }

            if let (Ok(key), Ok(value)) = (str::from_utf8(key), str::from_utf8(value)) {
                map.insert(key, value);
            }
        }
    }

    contents.map(|c| (map, c))
}
