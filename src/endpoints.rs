//! Horizon URL resolution and request URL composition.
use std::sync::OnceLock;

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use regex::Regex;
use url::Url;

use crate::{Error, Result};

/// Fallback Horizon URL used when no organization id can be derived from the public key.
pub const DEFAULT_HORIZON_URL: &str = "https://toggle.hyphen.cloud";

const PUBLIC_KEY_PREFIX: &str = "public_";

pub(crate) const EVALUATE_PATH: &str = "/toggle/evaluate";
pub(crate) const TELEMETRY_PATH: &str = "/toggle/telemetry";

// Public keys are not always padded, and may end with non-zero trailing bits.
const PUBLIC_KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Map `encoded` onto the standard alphabet: URL-safe `-` and `_` become `+` and `/`, characters
/// outside the alphabet are skipped, and everything from the first `=` on is dropped.
fn normalize_base64(encoded: &str) -> String {
    let mut normalized: String = encoded
        .chars()
        .take_while(|c| *c != '=')
        .filter_map(|c| match c {
            '-' => Some('+'),
            '_' => Some('/'),
            c if c.is_ascii_alphanumeric() || c == '+' || c == '/' => Some(c),
            _ => None,
        })
        .collect();
    // A single leftover character does not encode a whole byte.
    if normalized.len() % 4 == 1 {
        normalized.pop();
    }
    normalized
}

fn org_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"))
}

/// Extract the organization id embedded in a public key.
///
/// A public key is `public_` followed by base64 of `<org id>:<rest>`. Both the standard and the
/// URL-safe alphabet are accepted. Returns `None` if any step fails or the org id contains
/// characters other than letters, digits, `-` and `_`.
pub fn org_id_from_public_key(public_key: &str) -> Option<String> {
    let encoded = public_key
        .strip_prefix(PUBLIC_KEY_PREFIX)
        .unwrap_or(public_key);
    let decoded = PUBLIC_KEY_ENGINE.decode(normalize_base64(encoded)).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let org_id = decoded.split(':').next()?;
    org_id_regex()
        .is_match(org_id)
        .then(|| org_id.to_owned())
}

/// Default Horizon URL for a public key: `https://{org id}.toggle.hyphen.cloud`, or
/// [`DEFAULT_HORIZON_URL`] if the key does not carry a valid org id.
pub fn default_horizon_url(public_key: &str) -> String {
    match org_id_from_public_key(public_key) {
        Some(org_id) => format!("https://{org_id}.toggle.hyphen.cloud"),
        None => DEFAULT_HORIZON_URL.to_owned(),
    }
}

/// Append `path` to the path of `base`, with exactly one `/` in between.
pub fn join_path(base: &Url, path: &str) -> Result<Url> {
    let trailing_empty = base.path_segments().map_or(0, |segments| {
        segments.rev().take_while(|segment| segment.is_empty()).count()
    });

    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|()| Error::InvalidBaseUrl {
            url: base.to_string(),
            source: None,
        })?;
        for _ in 0..trailing_empty {
            segments.pop();
        }
        segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
    }
    Ok(url)
}

/// Ordered, immutable list of Horizon base URLs to try.
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    urls: Vec<Url>,
}

impl Endpoints {
    /// Explicit URLs in configured order, followed by the default URL for `public_key` unless
    /// it is already listed.
    pub fn resolve(explicit: &[String], public_key: &str) -> Result<Endpoints> {
        let mut urls = explicit
            .iter()
            .map(|url| parse_base_url(url))
            .collect::<Result<Vec<_>>>()?;

        let default_url = parse_base_url(&default_horizon_url(public_key))?;
        if !urls.contains(&default_url) {
            urls.push(default_url);
        }

        log::debug!(target: "hyphen", count = urls.len(); "resolved horizon urls");
        Ok(Endpoints { urls })
    }

    /// Full request URLs for `path`, one per base URL, in order.
    pub fn urls_for(&self, path: &str) -> Result<Vec<Url>> {
        self.urls.iter().map(|base| join_path(base, path)).collect()
    }

    pub fn base_urls(&self) -> &[Url] {
        &self.urls
    }
}

fn parse_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|err| Error::InvalidBaseUrl {
        url: url.to_owned(),
        source: Some(err),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(Error::InvalidBaseUrl {
            url: url.to_owned(),
            source: None,
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use base64::{
        engine::general_purpose::{STANDARD, URL_SAFE},
        Engine,
    };
    use url::Url;

    use super::{
        default_horizon_url, join_path, org_id_from_public_key, Endpoints, DEFAULT_HORIZON_URL,
        EVALUATE_PATH,
    };
    use crate::Error;

    fn public_key(raw: &str) -> String {
        format!("public_{}", STANDARD.encode(raw))
    }

    fn join(base: &str, path: &str) -> String {
        join_path(&Url::parse(base).unwrap(), path)
            .unwrap()
            .to_string()
    }

    #[test]
    fn join_path_with_path_prefix() {
        assert_eq!(
            join("https://host.example/api/v1", EVALUATE_PATH),
            "https://host.example/api/v1/toggle/evaluate"
        );
        assert_eq!(
            join("https://host.example/api/v1/", EVALUATE_PATH),
            "https://host.example/api/v1/toggle/evaluate"
        );
    }

    #[test]
    fn join_path_with_root() {
        assert_eq!(
            join("https://host.example/", EVALUATE_PATH),
            "https://host.example/toggle/evaluate"
        );
        assert_eq!(
            join("https://host.example", EVALUATE_PATH),
            "https://host.example/toggle/evaluate"
        );
        assert_eq!(
            join("https://host.example", "toggle/telemetry"),
            "https://host.example/toggle/telemetry"
        );
    }

    #[test]
    fn join_path_with_repeated_trailing_slashes() {
        assert_eq!(
            join("https://host.example/api//", EVALUATE_PATH),
            "https://host.example/api/toggle/evaluate"
        );
        assert_eq!(
            join("https://host.example//", EVALUATE_PATH),
            "https://host.example/toggle/evaluate"
        );
    }

    #[test]
    fn join_path_keeps_query() {
        assert_eq!(
            join("https://host.example/api?region=eu", EVALUATE_PATH),
            "https://host.example/api/toggle/evaluate?region=eu"
        );
    }

    #[test]
    fn org_id_from_valid_key() {
        assert_eq!(
            org_id_from_public_key(&public_key("org123:rest")).as_deref(),
            Some("org123")
        );
        assert_eq!(
            org_id_from_public_key(&public_key("my-org_1:abc:def")).as_deref(),
            Some("my-org_1")
        );
        // unpadded base64
        let padded = STANDARD.encode("org12:x");
        assert!(padded.ends_with('='));
        let unpadded = format!("public_{}", padded.trim_end_matches('='));
        assert_eq!(org_id_from_public_key(&unpadded).as_deref(), Some("org12"));
    }

    #[test]
    fn org_id_from_url_safe_key() {
        let url_safe = URL_SAFE.encode("org1:???");
        assert!(url_safe.contains('_'));
        assert_eq!(
            org_id_from_public_key(&format!("public_{url_safe}")).as_deref(),
            Some("org1")
        );

        let url_safe = URL_SAFE.encode("org1:~~~x");
        assert!(url_safe.contains('-'));
        assert_eq!(
            org_id_from_public_key(&format!("public_{url_safe}")).as_deref(),
            Some("org1")
        );
    }

    #[test]
    fn org_id_skips_characters_outside_alphabet() {
        assert_eq!(
            org_id_from_public_key("public_b3Jn!MTIz\nOnJlc3Q=").as_deref(),
            Some("org123")
        );
    }

    #[test]
    fn org_id_from_invalid_key() {
        assert_eq!(org_id_from_public_key("public_!!!not base64!!!"), None);
        assert_eq!(org_id_from_public_key(&public_key("org.123:rest")), None);
        assert_eq!(org_id_from_public_key(&public_key(":rest")), None);
        assert_eq!(org_id_from_public_key(""), None);
        let not_utf8 = format!("public_{}", STANDARD.encode([0xff, 0xfe, b':']));
        assert_eq!(org_id_from_public_key(&not_utf8), None);
    }

    #[test]
    fn default_url() {
        assert_eq!(
            default_horizon_url(&public_key("org123:rest")),
            "https://org123.toggle.hyphen.cloud"
        );
        assert_eq!(default_horizon_url("test-public-key"), DEFAULT_HORIZON_URL);
    }

    #[test]
    fn default_url_is_appended_last() {
        let endpoints = Endpoints::resolve(
            &[
                "https://a.example".to_owned(),
                "https://b.example/api".to_owned(),
            ],
            &public_key("org123:rest"),
        )
        .unwrap();

        let urls: Vec<String> = endpoints.base_urls().iter().map(Url::to_string).collect();
        assert_eq!(
            urls,
            [
                "https://a.example/",
                "https://b.example/api",
                "https://org123.toggle.hyphen.cloud/"
            ]
        );
    }

    #[test]
    fn default_url_is_not_duplicated() {
        let endpoints = Endpoints::resolve(
            &[
                "https://toggle.hyphen.cloud".to_owned(),
                "https://a.example".to_owned(),
            ],
            "test-public-key",
        )
        .unwrap();

        assert_eq!(endpoints.base_urls().len(), 2);
        assert_eq!(endpoints.base_urls()[0].as_str(), "https://toggle.hyphen.cloud/");
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            Endpoints::resolve(&["not a url".to_owned()], "key"),
            Err(Error::InvalidBaseUrl { source: Some(_), .. })
        ));
        assert!(matches!(
            Endpoints::resolve(&["mailto:ops@example.com".to_owned()], "key"),
            Err(Error::InvalidBaseUrl { source: None, .. })
        ));
    }
}
