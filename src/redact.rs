//! Deterministic masking of contact identifiers.
//!
//! # Responsibilities
//! - Mask emails, phone numbers, and opaque identifiers before they leave
//!   the system
//! - Extract a contact string out of free-form upstream text
//! - Scrub raw contact occurrences from failure messages
//!
//! # Design Decisions
//! - No randomness: the same input always masks to the same output
//! - The masked run length equals the number of concealed characters
//! - Email domains are never masked (they identify the provider, not the user)

use lazy_static::lazy_static;
use regex::Regex;

const MASK: char = '*';

lazy_static! {
    /// Email embedded anywhere in text.
    static ref EMAIL_IN_TEXT: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
    /// Phone number embedded anywhere in text (10+ phone characters).
    static ref PHONE_IN_TEXT: Regex = Regex::new(r"\+?[\d\s\-()]{10,}").unwrap();
    /// A string that is entirely phone-shaped.
    static ref PHONE_SHAPE: Regex = Regex::new(r"^\+?[\d\s\-()]+$").unwrap();
}

/// Mask a contact identifier, keeping just enough of it for the owner to
/// recognize it.
///
/// Three shapes are recognized: email (local part masked, domain kept),
/// phone (separators stripped, middle masked), and opaque identifiers such
/// as usernames (first/last characters kept by length bracket).
pub fn redact(contact: &str) -> String {
    if contact.is_empty() {
        return String::new();
    }

    if let Some((local, domain)) = contact.split_once('@') {
        return format!("{}@{}", mask_middle(local, EmailBrackets), domain);
    }

    if PHONE_SHAPE.is_match(contact) && contact.chars().any(|c| c.is_ascii_digit()) {
        let cleaned: String = contact
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        return mask_middle(&cleaned, PhoneBrackets);
    }

    mask_middle(contact, OpaqueBrackets)
}

/// Pull the most specific contact out of free-form text: an email if one is
/// present, otherwise a phone number.
pub fn extract_contact(text: &str) -> Option<&str> {
    if let Some(m) = EMAIL_IN_TEXT.find(text) {
        return Some(m.as_str());
    }
    PHONE_IN_TEXT.find(text).map(|m| m.as_str().trim())
}

/// Replace raw contact occurrences in `text` with their masked forms.
///
/// Used on failure messages before they are returned to the caller: upstream
/// error text frequently echoes the submitted identifier or the account's
/// registered email.
pub fn scrub(text: &str, raw_contact: &str) -> String {
    // Emails first: a literal pass afterwards cannot re-match the masked
    // local part, but a masked email's tail would still look like an email
    // to the regex if the order were reversed.
    let mut out = EMAIL_IN_TEXT
        .replace_all(text, |caps: &regex::Captures<'_>| redact(&caps[0]))
        .into_owned();
    if !raw_contact.is_empty() {
        out = out.replace(raw_contact, &redact(raw_contact));
    }
    out
}

/// Keep/mask bracket thresholds: (short keep-first limit, mid keep, long keep).
struct Brackets {
    /// Inputs at or below this length keep only the first character
    /// (phones mask entirely instead).
    short_limit: usize,
    /// Inputs at or below this length keep `mid_keep` at each end.
    mid_limit: usize,
    mid_keep: usize,
    long_keep: usize,
    /// Phones conceal even the first character of short inputs.
    mask_short_entirely: bool,
}

#[allow(non_upper_case_globals)]
const EmailBrackets: Brackets = Brackets {
    short_limit: 2,
    mid_limit: 4,
    mid_keep: 1,
    long_keep: 2,
    mask_short_entirely: false,
};

#[allow(non_upper_case_globals)]
const OpaqueBrackets: Brackets = Brackets {
    short_limit: 2,
    mid_limit: 4,
    mid_keep: 1,
    long_keep: 2,
    mask_short_entirely: false,
};

#[allow(non_upper_case_globals)]
const PhoneBrackets: Brackets = Brackets {
    short_limit: 4,
    mid_limit: 7,
    mid_keep: 2,
    long_keep: 3,
    mask_short_entirely: true,
};

fn mask_middle(s: &str, brackets: Brackets) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();

    if n == 0 {
        return String::new();
    }
    if n <= brackets.short_limit {
        if brackets.mask_short_entirely {
            return MASK.to_string().repeat(n);
        }
        let mut out = String::new();
        out.push(chars[0]);
        out.extend(std::iter::repeat(MASK).take(n - 1));
        return out;
    }

    let keep = if n <= brackets.mid_limit {
        brackets.mid_keep
    } else {
        brackets.long_keep
    };

    let mut out = String::new();
    out.extend(&chars[..keep]);
    out.extend(std::iter::repeat(MASK).take(n - 2 * keep));
    out.extend(&chars[n - keep..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_brackets() {
        assert_eq!(redact("a"), "a");
        assert_eq!(redact("ab"), "a*");
        assert_eq!(redact("abc"), "a*c");
        assert_eq!(redact("abcd"), "a**d");
        assert_eq!(redact("abcde"), "ab*de");
        assert_eq!(redact("abcdef"), "ab**ef");
        assert_eq!(redact("teamnobody"), "te******dy");
    }

    #[test]
    fn opaque_redaction_preserves_length() {
        for s in ["x", "xy", "user", "longer_username", "a.b_c.d"] {
            assert_eq!(redact(s).chars().count(), s.chars().count(), "input {s:?}");
        }
    }

    #[test]
    fn email_local_part_brackets() {
        assert_eq!(redact("jo@example.com"), "j*@example.com");
        assert_eq!(redact("joe@example.com"), "j*e@example.com");
        assert_eq!(redact("jane@example.com"), "j**e@example.com");
        assert_eq!(redact("john.doe@example.com"), "jo****oe@example.com");
    }

    #[test]
    fn email_domain_never_masked() {
        for email in ["a@b.co", "someone@sub.example.org"] {
            let masked = redact(email);
            let domain = email.split_once('@').unwrap().1;
            assert!(masked.ends_with(&format!("@{domain}")), "got {masked}");
        }
    }

    #[test]
    fn phone_brackets() {
        assert_eq!(redact("1234"), "****");
        assert_eq!(redact("12345"), "12*45");
        assert_eq!(redact("1234567"), "12***67");
        assert_eq!(redact("+1 (555) 123-4567"), "+15******567");
    }

    #[test]
    fn separator_only_string_is_not_a_phone() {
        // No digits: falls through to opaque masking instead of emptiness.
        assert_eq!(redact("---"), "-*-");
    }

    #[test]
    fn extracts_email_before_phone() {
        let text = "We sent an email to jane@example.com or SMS to +1 555 000 1111.";
        assert_eq!(extract_contact(text), Some("jane@example.com"));
    }

    #[test]
    fn extracts_phone_when_no_email() {
        let text = "Code sent to +1 (555) 123-4567 just now";
        assert_eq!(extract_contact(text), Some("+1 (555) 123-4567"));
    }

    #[test]
    fn scrub_masks_identifier_and_embedded_emails() {
        let out = scrub("no user matching teamnobody (contact admin@example.com)", "teamnobody");
        assert!(out.contains("te******dy"), "got {out}");
        assert!(out.contains("ad*in@example.com"), "got {out}");
        assert!(!out.contains("teamnobody"));
        assert!(!out.contains("admin@example.com"));
    }
}
