//! ISO 639-1 to 639-3 language code conversion.
//!
//! INSPIRE exposes two-letter codes; the repository vocabulary is keyed by
//! three-letter codes. Table covers the languages seen in harvested
//! records; unknown codes are a mapping error upstream.

const ALPHA2_TO_ALPHA3: &[(&str, &str)] = &[
    ("ar", "ara"),
    ("bg", "bul"),
    ("ca", "cat"),
    ("cs", "ces"),
    ("da", "dan"),
    ("de", "deu"),
    ("el", "ell"),
    ("en", "eng"),
    ("es", "spa"),
    ("fa", "fas"),
    ("fi", "fin"),
    ("fr", "fra"),
    ("he", "heb"),
    ("hr", "hrv"),
    ("hu", "hun"),
    ("it", "ita"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("nl", "nld"),
    ("no", "nor"),
    ("pl", "pol"),
    ("pt", "por"),
    ("ro", "ron"),
    ("ru", "rus"),
    ("sk", "slk"),
    ("sl", "slv"),
    ("sr", "srp"),
    ("sv", "swe"),
    ("tr", "tur"),
    ("uk", "ukr"),
    ("zh", "zho"),
];

pub fn alpha2_to_alpha3(code: &str) -> Option<&'static str> {
    let code = code.to_lowercase();
    ALPHA2_TO_ALPHA3
        .iter()
        .find(|(a2, _)| *a2 == code)
        .map(|(_, a3)| *a3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_codes() {
        assert_eq!(alpha2_to_alpha3("en"), Some("eng"));
        assert_eq!(alpha2_to_alpha3("FR"), Some("fra"));
        assert_eq!(alpha2_to_alpha3("xx"), None);
    }
}
