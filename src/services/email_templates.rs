//! HTML bodies for outgoing mail.
//!
//! All dynamic text goes through [`escape_html`].

use crate::models::record::RecordResponse;

/// One line of an order confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub title: String,
    pub artist: String,
    pub condition: String,
    /// Charged unit price, discount applied.
    pub unit_price_cents: i64,
    pub quantity: i32,
}

impl OrderLine {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents.saturating_mul(i64::from(self.quantity))
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// `2499` -> `€24.99`
pub fn format_euros(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}€{}.{:02}", cents / 100, cents % 100)
}

pub fn order_confirmation_subject(order_number: &str) -> String {
    format!("Order Confirmation #{order_number}")
}

pub fn order_confirmation_body(order_number: &str, lines: &[OrderLine]) -> String {
    let total = lines
        .iter()
        .map(OrderLine::line_total_cents)
        .fold(0i64, i64::saturating_add);

    let rows: String = lines
        .iter()
        .map(|line| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&line.title),
                escape_html(&line.artist),
                escape_html(&line.condition),
                format_euros(line.unit_price_cents),
                line.quantity,
                format_euros(line.line_total_cents()),
            )
        })
        .collect();

    format!(
        r#"<html><body>
<h1>Thank you for your order!</h1>
<p>Order number: <strong>{order}</strong></p>
<table>
<tr><th>Title</th><th>Artist</th><th>Condition</th><th>Price</th><th>Quantity</th><th>Total</th></tr>
{rows}</table>
<p><strong>Order total: {total}</strong></p>
<p>Keep spinning,<br>SpinningMotion</p>
</body></html>"#,
        order = escape_html(order_number),
        total = format_euros(total),
    )
}

pub const NEW_RELEASE_SUBJECT: &str = "New arrivals at SpinningMotion";

pub fn new_release_body(records: &[RecordResponse]) -> String {
    let items: String = records
        .iter()
        .map(|record| {
            format!(
                "<li><strong>{}</strong> by {} ({})</li>\n",
                escape_html(&record.title),
                escape_html(&record.artist),
                format_euros(record.price_cents),
            )
        })
        .collect();

    format!(
        r#"<html><body>
<h1>Fresh vinyl just landed</h1>
<ul>
{items}</ul>
<p>Come take a listen before they are gone.</p>
</body></html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(title: &str, unit_price_cents: i64, quantity: i32) -> OrderLine {
        OrderLine {
            title: title.to_string(),
            artist: "Artist".to_string(),
            condition: "Mint".to_string(),
            unit_price_cents,
            quantity,
        }
    }

    #[test]
    fn euros_have_two_decimals() {
        assert_eq!(format_euros(2499), "€24.99");
        assert_eq!(format_euros(500), "€5.00");
        assert_eq!(format_euros(7), "€0.07");
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html(r#"<b>"Rock" & 'Roll'</b>"#),
            "&lt;b&gt;&quot;Rock&quot; &amp; &#39;Roll&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn confirmation_lists_lines_and_total() {
        let body = order_confirmation_body(
            "ORD-1234ABCD",
            &[line("Blue Train", 1750, 2), line("<script>", 1000, 1)],
        );

        assert!(body.contains("ORD-1234ABCD"));
        assert!(body.contains("<td>Blue Train</td>"));
        assert!(body.contains("<td>€17.50</td><td>2</td><td>€35.00</td>"));
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
        assert!(body.contains("Order total: €45.00"));
    }

    #[test]
    fn confirmation_subject() {
        assert_eq!(
            order_confirmation_subject("ORD-1234ABCD"),
            "Order Confirmation #ORD-1234ABCD"
        );
    }
}
