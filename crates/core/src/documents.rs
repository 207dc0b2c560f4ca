//! Customer-facing documents: price quotes and booking certificates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::tax::vat_from_inclusive;
use crate::types::{apply_bps, ensure_amount, Bps, Won};

/// Maximum guests in one quote.
pub const MAX_QUOTE_GUESTS: i32 = 10;

/// Cabins hold two guests; a lone guest pays the single supplement.
const CABIN_OCCUPANCY: i32 = 2;

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

/// Everything needed to price a booking. Prices are VAT-inclusive.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub product_title: String,
    pub departure_date: NaiveDate,
    pub guests: i32,
    pub fare_per_guest: Won,
    pub port_charge_per_guest: Won,
    pub single_supplement_bps: Bps,
    pub discount: Won,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteLine {
    pub label: String,
    pub quantity: i32,
    pub unit_price: Won,
    pub amount: Won,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub product_title: String,
    pub departure_date: NaiveDate,
    pub guests: i32,
    pub lines: Vec<QuoteLine>,
    pub subtotal: Won,
    pub discount: Won,
    pub total: Won,
    pub supply_value: Won,
    pub vat: Won,
}

/// Price a booking into line items and a VAT-split total.
pub fn build_quote(req: &QuoteRequest) -> Result<Quote, CoreError> {
    if !(1..=MAX_QUOTE_GUESTS).contains(&req.guests) {
        return Err(CoreError::Validation(format!(
            "guests must be between 1 and {MAX_QUOTE_GUESTS} (got {})",
            req.guests
        )));
    }
    ensure_amount(req.fare_per_guest, "fare_per_guest")?;
    ensure_amount(req.port_charge_per_guest, "port_charge_per_guest")?;
    ensure_amount(req.discount, "discount")?;

    let mut lines = vec![QuoteLine {
        label: "Cruise fare".to_string(),
        quantity: req.guests,
        unit_price: req.fare_per_guest,
        amount: req.fare_per_guest * i64::from(req.guests),
    }];
    if req.port_charge_per_guest > 0 {
        lines.push(QuoteLine {
            label: "Port charges & taxes".to_string(),
            quantity: req.guests,
            unit_price: req.port_charge_per_guest,
            amount: req.port_charge_per_guest * i64::from(req.guests),
        });
    }
    if req.guests % CABIN_OCCUPANCY == 1 && req.single_supplement_bps > 0 {
        let supplement = apply_bps(req.fare_per_guest, req.single_supplement_bps);
        lines.push(QuoteLine {
            label: "Single supplement".to_string(),
            quantity: 1,
            unit_price: supplement,
            amount: supplement,
        });
    }

    let subtotal: Won = lines.iter().map(|l| l.amount).sum();
    if req.discount > subtotal {
        return Err(CoreError::Validation(format!(
            "discount {} exceeds subtotal {subtotal}",
            req.discount
        )));
    }
    let total = subtotal - req.discount;
    let split = vat_from_inclusive(total)?;

    Ok(Quote {
        product_title: req.product_title.clone(),
        departure_date: req.departure_date,
        guests: req.guests,
        lines,
        subtotal,
        discount: req.discount,
        total,
        supply_value: split.supply,
        vat: split.vat,
    })
}

// ---------------------------------------------------------------------------
// Certificate
// ---------------------------------------------------------------------------

/// Data printed on a booking certificate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CertificateData {
    pub order_number: String,
    pub product_title: String,
    pub ship_name: String,
    pub departure_date: NaiveDate,
    pub nights: i32,
    pub guest_names: Vec<String>,
    pub total_amount: Won,
    pub issued_on: NaiveDate,
}

/// Escape text for inclusion in XML character data or attribute values.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Group digits with commas: `1234567` -> `1,234,567`.
pub fn format_won(amount: Won) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Render a booking certificate as a standalone SVG document.
pub fn render_certificate_svg(data: &CertificateData) -> String {
    const WIDTH: i32 = 800;
    let guest_top = 330;
    let line_height = 28;
    let height = guest_top + line_height * data.guest_names.len() as i32 + 140;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{height}" viewBox="0 0 {WIDTH} {height}">"#
    ));
    svg.push_str(&format!(
        r##"<rect x="10" y="10" width="{}" height="{}" fill="#ffffff" stroke="#0b3d91" stroke-width="4"/>"##,
        WIDTH - 20,
        height - 20
    ));
    svg.push_str(
        r##"<text x="400" y="80" font-size="32" font-weight="bold" text-anchor="middle" fill="#0b3d91">Cruise Booking Certificate</text>"##,
    );

    let rows = [
        ("Order No.", data.order_number.clone()),
        ("Cruise", data.product_title.clone()),
        ("Ship", data.ship_name.clone()),
        (
            "Departure",
            format!("{} ({} nights)", data.departure_date, data.nights),
        ),
        ("Amount Paid", format!("KRW {}", format_won(data.total_amount))),
    ];
    for (i, (label, value)) in rows.iter().enumerate() {
        let y = 140 + i as i32 * 36;
        svg.push_str(&format!(
            r#"<text x="60" y="{y}" font-size="18" font-weight="bold">{}</text>"#,
            escape_xml(label)
        ));
        svg.push_str(&format!(
            r#"<text x="240" y="{y}" font-size="18">{}</text>"#,
            escape_xml(value)
        ));
    }

    svg.push_str(&format!(
        r#"<text x="60" y="{}" font-size="18" font-weight="bold">Guests</text>"#,
        guest_top - 8
    ));
    for (i, name) in data.guest_names.iter().enumerate() {
        let y = guest_top + line_height * (i as i32 + 1);
        svg.push_str(&format!(
            r#"<text x="80" y="{y}" font-size="16">{}. {}</text>"#,
            i + 1,
            escape_xml(name)
        ));
    }

    svg.push_str(&format!(
        r#"<text x="740" y="{}" font-size="14" text-anchor="end">Issued {}</text>"#,
        height - 40,
        data.issued_on
    ));
    svg.push_str("</svg>");
    svg
}
