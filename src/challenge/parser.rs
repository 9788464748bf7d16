//! `WWW-Authenticate` header parsing (RFC7235 sections 2.1 and 4.1).
//!
//! The grammar is ambiguous because commas separate both challenges and the
//! auth-params inside a challenge. After each comma the parser looks ahead:
//! a `name =` sequence continues the current challenge, anything else starts
//! the next one. Fragments that fit neither production are skipped up to the
//! next comma; an empty result is legal.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::Challenge;

/// RFC7230 `token`
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+").expect("valid token regex"));

/// RFC7235 `token68`
static TOKEN68: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._~+/\-]+=*").expect("valid token68 regex"));

/// Parses a `WWW-Authenticate` header value into challenges.
///
/// Malformed fragments are dropped rather than reported; this never fails.
///
/// # Arguments
///
/// * `header` - The header value, possibly holding several challenges
///
/// # Returns
///
/// The well-formed challenges in header order.
///
/// # Examples
///
/// ```
/// use vo_auth::parse_challenges;
///
/// let challenges = parse_challenges(r#"Basic realm="archive", Bearer abc123=="#);
/// assert_eq!(challenges.len(), 2);
/// assert_eq!(challenges[0].realm(), Some("archive"));
/// assert_eq!(challenges[1].token68(), Some("abc123=="));
/// ```
pub fn parse_challenges(header: &str) -> Vec<Challenge> {
    let mut scanner = Scanner::new(header);
    let mut challenges = Vec::new();
    loop {
        scanner.skip_separators();
        if scanner.is_eof() {
            break;
        }
        let start = scanner.pos;
        match parse_challenge(&mut scanner) {
            Some(challenge) => challenges.push(challenge),
            None => {
                debug!(
                    "Skipping malformed challenge fragment at offset {} of \"{}\"",
                    start, header
                );
                scanner.skip_past_comma();
            }
        }
    }
    challenges
}

fn parse_challenge(s: &mut Scanner<'_>) -> Option<Challenge> {
    let scheme = s.lexeme(&TOKEN)?;
    let spaced = s.skip_ows() > 0;

    if s.is_eof() {
        return Some(Challenge::new(scheme));
    }

    // "Basic, realm=x": an empty list element between scheme and params
    if s.peek() == Some(',') {
        let mark = s.pos;
        s.skip_separators();
        if s.looks_like_param() {
            return parse_param_list(s).map(|params| Challenge::with_params(scheme, None, params));
        }
        s.pos = mark;
        return Some(Challenge::new(scheme));
    }

    if !spaced {
        return None;
    }

    let mark = s.pos;
    if let Some(token68) = s.lexeme(&TOKEN68) {
        s.skip_ows();
        if s.at_item_end() {
            return Some(Challenge::with_token68(scheme, token68));
        }
        s.pos = mark;
    }

    parse_param_list(s).map(|params| Challenge::with_params(scheme, None, params))
}

/// Parses `auth-param *( OWS "," OWS auth-param )`, stopping before a comma
/// that introduces the next challenge.
fn parse_param_list(s: &mut Scanner<'_>) -> Option<Vec<(String, String)>> {
    let mut params = Vec::new();
    loop {
        let mark = s.pos;
        match parse_param(s) {
            Some(param) => params.push(param),
            None => {
                s.pos = mark;
                break;
            }
        }
        s.skip_ows();
        if s.is_eof() {
            break;
        }
        if s.peek() != Some(',') {
            return None;
        }
        let mark = s.pos;
        s.skip_separators();
        if !s.looks_like_param() {
            s.pos = mark;
            break;
        }
    }
    if params.is_empty() {
        None
    } else {
        Some(params)
    }
}

fn parse_param(s: &mut Scanner<'_>) -> Option<(String, String)> {
    let name = s.lexeme(&TOKEN)?;
    s.skip_ows();
    if s.peek() != Some('=') {
        return None;
    }
    s.advance(1);
    s.skip_ows();
    let value = if s.peek() == Some('"') {
        s.quoted_string()?
    } else {
        s.lexeme(&TOKEN)?.to_string()
    };
    Some((name.to_string(), value))
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn at_item_end(&self) -> bool {
        self.is_eof() || self.peek() == Some(',')
    }

    /// Skips spaces and tabs, returning how many were skipped.
    fn skip_ows(&mut self) -> usize {
        let n = self
            .rest()
            .bytes()
            .take_while(|b| *b == b' ' || *b == b'\t')
            .count();
        self.advance(n);
        n
    }

    /// Skips whitespace and empty list elements.
    fn skip_separators(&mut self) {
        let n = self
            .rest()
            .bytes()
            .take_while(|b| matches!(b, b' ' | b'\t' | b','))
            .count();
        self.advance(n);
    }

    fn skip_past_comma(&mut self) {
        match self.rest().find(',') {
            Some(i) => self.advance(i + 1),
            None => self.pos = self.input.len(),
        }
    }

    fn lexeme(&mut self, re: &Regex) -> Option<&'a str> {
        let rest = self.rest();
        let m = re.find(rest)?;
        let text = &rest[..m.end()];
        self.advance(m.end());
        Some(text)
    }

    /// True if the input continues with `token OWS "="`.
    fn looks_like_param(&self) -> bool {
        let rest = self.rest();
        match TOKEN.find(rest) {
            Some(m) => rest[m.end()..].trim_start_matches([' ', '\t']).starts_with('='),
            None => false,
        }
    }

    /// Reads a quoted-string, resolving `\X` escapes.
    fn quoted_string(&mut self) -> Option<String> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        if chars.next().map(|(_, c)| c) != Some('"') {
            return None;
        }
        let mut value = String::new();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    let (_, escaped) = chars.next()?;
                    value.push(escaped);
                }
                '"' => {
                    self.advance(i + 1);
                    return Some(value);
                }
                _ => value.push(c),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_with_empty_element_before_realm() {
        let challenges = parse_challenges(r#"Basic, realm="x""#);
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].scheme(), "Basic");
        assert_eq!(challenges[0].realm(), Some("x"));
        assert!(challenges[0].params().is_empty());
    }

    #[test]
    fn test_basic_realm() {
        let challenges = parse_challenges(r#"Basic realm="WallyWorld""#);
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].realm(), Some("WallyWorld"));
        assert!(challenges[0].token68().is_none());
    }

    #[test]
    fn test_token68() {
        let challenges = parse_challenges("Bearer abc123==");
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].token68(), Some("abc123=="));
        assert!(challenges[0].realm().is_none());
        assert!(challenges[0].params().is_empty());
    }

    #[test]
    fn test_malformed_fragment_is_dropped() {
        let challenges = parse_challenges(r#"Basic realm="x", b@d realm="y""#);
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].realm(), Some("x"));

        let challenges = parse_challenges(r#"Basic realm="unfinished"#);
        assert!(challenges.is_empty());
    }

    #[test]
    fn test_empty_and_junk_headers() {
        assert!(parse_challenges("").is_empty());
        assert!(parse_challenges(" , ,, ").is_empty());
        assert!(parse_challenges("@@@").is_empty());
        assert!(parse_challenges("=foo").is_empty());
    }

    #[test]
    fn test_multiple_challenges_with_params() {
        let header = concat!(
            r#"Newauth realm="apps", type=1, title="Login to \"apps\"", "#,
            r#"Basic realm="simple""#
        );
        let challenges = parse_challenges(header);
        assert_eq!(challenges.len(), 2);
        assert_eq!(challenges[0].scheme(), "Newauth");
        assert_eq!(challenges[0].realm(), Some("apps"));
        assert_eq!(challenges[0].param("type"), Some("1"));
        assert_eq!(challenges[0].param("title"), Some(r#"Login to "apps""#));
        assert_eq!(challenges[1].scheme(), "Basic");
        assert_eq!(challenges[1].realm(), Some("simple"));
    }

    #[test]
    fn test_bare_schemes_and_token68_mixed() {
        let challenges = parse_challenges("Negotiate, NTLM, Bearer dGVzdA==, Basic realm=r");
        let schemes: Vec<&str> = challenges.iter().map(|c| c.scheme()).collect();
        assert_eq!(schemes, vec!["Negotiate", "NTLM", "Bearer", "Basic"]);
        assert_eq!(challenges[2].token68(), Some("dGVzdA=="));
        assert_eq!(challenges[3].realm(), Some("r"));
    }

    #[test]
    fn test_param_keys_lowercased_and_whitespace_tolerated() {
        let challenges =
            parse_challenges("ivoa_x509  Standard_ID = \"ivo://ivoa.net/sso#tls-with-password\" ,\tACCESS_URL=\"https://e.org/c\"");
        assert_eq!(challenges.len(), 1);
        assert_eq!(
            challenges[0].param("standard_id"),
            Some("ivo://ivoa.net/sso#tls-with-password")
        );
        assert_eq!(challenges[0].param("access_url"), Some("https://e.org/c"));
    }

    #[test]
    fn test_invalid_param_value_ends_challenge() {
        let challenges = parse_challenges(r#"Basic realm="x", foo=@, Bearer t"#);
        let schemes: Vec<&str> = challenges.iter().map(|c| c.scheme()).collect();
        assert_eq!(schemes, vec!["Basic", "Bearer"]);
        assert!(challenges[0].param("foo").is_none());
    }

    #[test]
    fn test_trailing_junk_after_param_drops_fragment() {
        let challenges = parse_challenges(r#"Basic realm="x" junk, Bearer t"#);
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].scheme(), "Bearer");
    }

    #[test]
    fn test_quoted_comma_stays_in_value() {
        let challenges = parse_challenges(r#"Digest realm="a,b", qop="auth,auth-int""#);
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].realm(), Some("a,b"));
        assert_eq!(challenges[0].param("qop"), Some("auth,auth-int"));
    }
}
