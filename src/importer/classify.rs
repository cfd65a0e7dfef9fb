// ==========================================
// Pharmaflow - product identification from descriptions
// ==========================================
// External order descriptions are free text written by attendants; the kind
// is inferred from keywords and the compounded quantity from markers like
// "CAPSULA: 60CAP" or "ENVELOPE: 30ENV". Specific keywords are checked
// before generic ones ("CAP" alone would swallow oily capsules).
// ==========================================

use crate::domain::types::ProductKind;

/// Identify the product kind from a description. None means no keyword
/// matched and the order needs a manual fix.
pub fn identify_kind(description: &str) -> Option<ProductKind> {
    let text = description.to_uppercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if has(&["SACHE", "SACHÊ", "ENVELOPE"]) {
        return Some(ProductKind::Sachet);
    }
    if has(&["OLEOSA", "OLEOSO"]) {
        return Some(ProductKind::OilyCapsule);
    }
    if has(&["SUBLINGUAL", "PASTILHA"]) {
        return Some(ProductKind::SublingualTablet);
    }
    if has(&["GOMA", "GUMMY"]) {
        return Some(ProductKind::Gummy);
    }
    if has(&["CHOCOLATE"]) {
        return Some(ProductKind::Chocolate);
    }
    if has(&["FILME"]) {
        return Some(ProductKind::Film);
    }
    if has(&["SHOT"]) {
        return Some(ProductKind::Shot);
    }
    if has(&["SHAMPOO"]) {
        return Some(ProductKind::Shampoo);
    }
    if has(&["LOÇÃO", "LOCAO"]) {
        return Some(ProductKind::Lotion);
    }
    if has(&["CREME", "POMADA", "PENTRAVAN", "GEL"]) {
        return Some(ProductKind::Cream);
    }
    if has(&["ÓVULO", "OVULO"]) {
        return Some(ProductKind::Ovule);
    }
    if has(&["ML", "LIQUIDO", "LÍQUIDO", "XAROPE"]) {
        return Some(ProductKind::PediatricLiquid);
    }
    if has(&["CAPSULA", "CÁPSULA", "CAP"]) {
        return Some(ProductKind::Capsule);
    }
    None
}

/// Extract the compounded quantity from a "CAPSULA: 60CAP" /
/// "ENVELOPE: 30ENV" marker. Bare digit runs never count ("100CAPILAR" is
/// not a quantity).
pub fn extract_quantity(description: &str) -> Option<i64> {
    let text = description.to_uppercase();
    quantity_after_marker(&text, "CÁPSULA", "CAP")
        .or_else(|| quantity_after_marker(&text, "CAPSULA", "CAP"))
        .or_else(|| quantity_after_marker(&text, "ENVELOPE", "ENV"))
}

// Matches MARKER ':' digits UNIT, whitespace allowed around the colon and
// before the unit.
fn quantity_after_marker(text: &str, marker: &str, unit: &str) -> Option<i64> {
    let mut search = text;
    while let Some(pos) = search.find(marker) {
        let after = search[pos + marker.len()..].trim_start();
        if let Some(rest) = after.strip_prefix(':') {
            let rest = rest.trim_start();
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits > 0 && rest[digits..].trim_start().starts_with(unit) {
                if let Ok(qty) = rest[..digits].parse::<i64>() {
                    return Some(qty);
                }
            }
        }
        search = &search[pos + marker.len()..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_common_kinds() {
        assert_eq!(
            identify_kind("VITAMINA D3 10.000UI - CAPSULA: 60CAP"),
            Some(ProductKind::Capsule)
        );
        assert_eq!(
            identify_kind("CREATINA 5G - ENVELOPE: 30ENV"),
            Some(ProductKind::Sachet)
        );
        assert_eq!(
            identify_kind("MINOXIDIL 5% SHAMPOO 120ML"),
            Some(ProductKind::Shampoo)
        );
        assert_eq!(identify_kind("sem forma conhecida"), None);
    }

    #[test]
    fn specific_keywords_beat_generic_cap() {
        assert_eq!(
            identify_kind("OMEGA 3 CAPSULA OLEOSA: 60CAP"),
            Some(ProductKind::OilyCapsule)
        );
        assert_eq!(
            identify_kind("MELATONINA SUBLINGUAL 30 PASTILHAS"),
            Some(ProductKind::SublingualTablet)
        );
    }

    #[test]
    fn extracts_quantity_from_markers() {
        assert_eq!(extract_quantity("VITAMINA D3 - CAPSULA: 60CAP"), Some(60));
        assert_eq!(extract_quantity("CREATINA - ENVELOPE: 30env"), Some(30));
        assert_eq!(extract_quantity("CÁPSULA : 45 CAP"), Some(45));
        assert_eq!(extract_quantity("SHAMPOO 120ML"), None);
    }

    #[test]
    fn dosages_and_bare_digit_runs_are_not_quantities() {
        // "10.000UI" is a dosage, not a quantity.
        assert_eq!(
            extract_quantity("VITAMINA D3 10.000UI - CAPSULA: 90CAP"),
            Some(90)
        );
        // Digits touching "CAP" without the marker prefix never count.
        assert_eq!(extract_quantity("TONICO 100CAPILAR USO DIARIO"), None);
        assert_eq!(extract_quantity("CAPSULA 60CAP"), None);
    }
}
