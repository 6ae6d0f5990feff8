// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pairing challenge rendering
//!
//! The session issues a raw pairing string; browsers need something they can
//! put in an `<img src>`. We render an SVG QR code and wrap it in a data URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";
const MIN_DIMENSION: u32 = 256;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("pairing challenge is empty")]
    Empty,
    #[error("cannot encode pairing challenge: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// Render a raw challenge into a `data:` URL holding an SVG QR code
pub fn render_qr_data_url(challenge: &str) -> Result<String, PairingError> {
    if challenge.is_empty() {
        return Err(PairingError::Empty);
    }

    let code = QrCode::new(challenge.as_bytes())?;
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(image)))
}

#[cfg(test)]
#[path = "pairing_tests.rs"]
mod tests;
