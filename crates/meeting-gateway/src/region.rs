//! Region lookup for phone numbers and dial-out caller id selection
//!
//! Numbers are matched on their international calling code. The table covers
//! the regions the gateway is usually deployed for; numbers outside it have no
//! region and always fall back to the first configured origin.

/// Calling code prefixes and the region they belong to
const CALLING_CODES: &[(&str, &str)] = &[
    ("353", "IE"),
    ("351", "PT"),
    ("358", "FI"),
    ("852", "HK"),
    ("886", "TW"),
    ("972", "IL"),
    ("971", "AE"),
    ("420", "CZ"),
    ("380", "UA"),
    ("359", "BG"),
    ("40", "RO"),
    ("41", "CH"),
    ("43", "AT"),
    ("44", "GB"),
    ("45", "DK"),
    ("46", "SE"),
    ("47", "NO"),
    ("48", "PL"),
    ("49", "DE"),
    ("30", "GR"),
    ("31", "NL"),
    ("32", "BE"),
    ("33", "FR"),
    ("34", "ES"),
    ("36", "HU"),
    ("39", "IT"),
    ("27", "ZA"),
    ("52", "MX"),
    ("54", "AR"),
    ("55", "BR"),
    ("56", "CL"),
    ("57", "CO"),
    ("60", "MY"),
    ("61", "AU"),
    ("62", "ID"),
    ("63", "PH"),
    ("64", "NZ"),
    ("65", "SG"),
    ("66", "TH"),
    ("81", "JP"),
    ("82", "KR"),
    ("84", "VN"),
    ("86", "CN"),
    ("90", "TR"),
    ("91", "IN"),
    ("1", "US"),
    ("7", "RU"),
];

/// Strip formatting and international prefixes, keeping only digits
pub fn normalize_number(number: &str) -> String {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.strip_prefix("00") {
        Some(rest) if number.trim_start().starts_with("00") => rest.to_string(),
        _ => digits,
    }
}

/// Region code for an international number, if its calling code is known
pub fn region_of(number: &str) -> Option<&'static str> {
    let digits = normalize_number(number);
    if digits.is_empty() {
        return None;
    }
    let mut best: Option<(&str, &'static str)> = None;
    for &(code, region) in CALLING_CODES {
        if digits.starts_with(code) && best.map_or(true, |(b, _)| code.len() > b.len()) {
            best = Some((code, region));
        }
    }
    best.map(|(_, region)| region)
}

/// Pick the caller id to dial `destination` from.
///
/// The first origin in the same region wins; otherwise the first origin is
/// used. Returns `None` only when no origins are configured.
pub fn select_origin<'a>(destination: &str, origins: &'a [String]) -> Option<&'a str> {
    let target = region_of(destination);
    let same_region = target.and_then(|region| {
        origins
            .iter()
            .find(|origin| region_of(origin) == Some(region))
    });
    same_region.or_else(|| origins.first()).map(String::as_str)
}
