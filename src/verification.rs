//! Recognition of email-verification callback links.
//!
//! The auth provider redirects back with either a fragment (`#access_token=..&type=signup`)
//! or a query string (`?token=..&type=signup`). Confirming never signs the user in, so the
//! token in the link is only checked for presence.

use reqwest::Url;

/// True only for a signup confirmation that carries a token.
pub fn is_signup_confirmation(link: &str) -> bool {
    let Ok(url) = Url::parse(link.trim()) else {
        return false;
    };

    if let Some(fragment) = url.fragment() {
        // Reuse the query parser for the fragment's key/value pairs.
        let mut pairs = url.clone();
        pairs.set_query(Some(fragment));
        if carries_signup_token(&pairs, "access_token") {
            return true;
        }
    }

    carries_signup_token(&url, "token")
}

fn carries_signup_token(url: &Url, token_key: &str) -> bool {
    let mut has_token = false;
    let mut is_signup = false;
    for (k, v) in url.query_pairs() {
        match &*k {
            "type" => is_signup = v == "signup",
            key if key == token_key && !v.is_empty() => has_token = true,
            _ => {}
        }
    }
    has_token && is_signup
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_form() {
        assert!(is_signup_confirmation(
            "https://app.example/#access_token=abc.def&expires_in=3600&type=signup"
        ));
    }

    #[test]
    fn query_form() {
        assert!(is_signup_confirmation(
            "https://app.example/verify?token=xyz&type=signup"
        ));
    }

    #[test]
    fn other_types_and_garbage_are_ignored() {
        assert!(!is_signup_confirmation(
            "https://app.example/#access_token=abc&type=recovery"
        ));
        assert!(!is_signup_confirmation("https://app.example/verify?type=signup"));
        assert!(!is_signup_confirmation("https://app.example/verify?token=&type=signup"));
        assert!(!is_signup_confirmation("https://app.example/"));
        assert!(!is_signup_confirmation("not a link"));
    }
}
