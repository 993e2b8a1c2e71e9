use crate::models::CandidatePrice;

/// Maps a places price tier to its symbolic form
///
/// Tiers 0 and 1 both render as `"$"`; anything outside 0..=4 is unknown.
pub fn format_price_tier(tier: Option<i64>) -> Option<String> {
    let symbol = match tier? {
        0 | 1 => "$",
        2 => "$$",
        3 => "$$$",
        4 => "$$$$",
        _ => return None,
    };
    Some(symbol.to_string())
}

/// Renders a candidate-supplied price for display
///
/// Strings pass through untouched. Whole numbers render without a fractional
/// part (`120.0` becomes `"120"`), other numbers use their default form.
pub fn normalize_price(price: &CandidatePrice) -> String {
    match price {
        CandidatePrice::Text(text) => text.clone(),
        CandidatePrice::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return n.to_string();
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.0}", f),
                Some(f) => f.to_string(),
                None => n.to_string(),
            }
        }
    }
}
