//! International phone number validation.
//!
//! Numbers are accepted in E.164 form after separators are stripped, then the
//! national part is checked against the pattern registered for its dial code.

use std::sync::LazyLock;

use regex::Regex;

/// Characters users commonly type between digit groups.
const SEPARATORS: [char; 5] = [' ', '-', '.', '(', ')'];

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("static E.164 pattern"));

struct CountryRule {
    dial_code: &'static str,
    country: &'static str,
    national: &'static str,
}

const COUNTRY_RULES: &[CountryRule] = &[
    CountryRule {
        dial_code: "221",
        country: "Senegal",
        national: r"^(7[05-8]\d{7}|3[03]\d{7})$",
    },
    CountryRule {
        dial_code: "225",
        country: "Côte d'Ivoire",
        national: r"^(0[157]|2[157])\d{8}$",
    },
    CountryRule {
        dial_code: "223",
        country: "Mali",
        national: r"^[2-9]\d{7}$",
    },
    CountryRule {
        dial_code: "224",
        country: "Guinea",
        national: r"^6\d{8}$",
    },
    CountryRule {
        dial_code: "237",
        country: "Cameroon",
        national: r"^[26]\d{8}$",
    },
    CountryRule {
        dial_code: "212",
        country: "Morocco",
        national: r"^[5-7]\d{8}$",
    },
    CountryRule {
        dial_code: "33",
        country: "France",
        national: r"^[1-9]\d{8}$",
    },
    CountryRule {
        dial_code: "32",
        country: "Belgium",
        national: r"^(4\d{8}|[1-9]\d{7})$",
    },
    CountryRule {
        dial_code: "1",
        country: "United States/Canada",
        national: r"^[2-9]\d{2}[2-9]\d{6}$",
    },
];

static COMPILED_RULES: LazyLock<Vec<(&'static CountryRule, Regex)>> = LazyLock::new(|| {
    COUNTRY_RULES
        .iter()
        .map(|rule| {
            let re = Regex::new(rule.national).expect("static national phone pattern");
            (rule, re)
        })
        .collect()
});

/// Longest dial code in [`COUNTRY_RULES`].
const MAX_DIAL_CODE_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone number must be in international format, e.g. +221771234567")]
    NotInternational { value: String },
    #[error("country code is not supported")]
    UnsupportedCountryCode { value: String },
    #[error("number does not match the {country} numbering plan")]
    InvalidNationalNumber { value: String, country: &'static str },
}

impl PhoneError {
    /// The normalized value that failed validation.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::NotInternational { value }
            | Self::UnsupportedCountryCode { value }
            | Self::InvalidNationalNumber { value, .. } => Some(value),
        }
    }
}

/// A phone number that passed validation, stored in normalized E.164 form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPhone {
    pub e164: String,
    pub country: &'static str,
}

/// Strip separators and turn a leading `00` trunk prefix into `+`.
pub fn normalize_phone(raw: &str) -> String {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .collect();
    match compact.strip_prefix("00") {
        Some(rest) => format!("+{rest}"),
        None => compact,
    }
}

/// Validate `raw` as an international number from a supported country.
pub fn validate_phone(raw: &str) -> Result<ValidPhone, PhoneError> {
    let value = normalize_phone(raw);
    if !E164.is_match(&value) {
        return Err(PhoneError::NotInternational { value });
    }
    let digits = &value[1..];

    let matched = (1..=MAX_DIAL_CODE_LEN.min(digits.len()))
        .rev()
        .find_map(|len| {
            let (code, national) = digits.split_at(len);
            COMPILED_RULES
                .iter()
                .find(|(rule, _)| rule.dial_code == code)
                .map(|(rule, re)| (*rule, re, national))
        });

    let Some((rule, national_re, national)) = matched else {
        return Err(PhoneError::UnsupportedCountryCode { value });
    };
    if !national_re.is_match(national) {
        return Err(PhoneError::InvalidNationalNumber {
            value,
            country: rule.country,
        });
    }
    Ok(ValidPhone {
        e164: value,
        country: rule.country,
    })
}
