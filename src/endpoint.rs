use url::Url;

use crate::error::LiveScoreError;
use crate::match_id::MatchId;


// The parts of `window.location` that the live updater cares about.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PageLocation {
    pub secure: bool,
    // Host with optional port, e.g. "example.org:8000".
    pub host: String,
    pub path: String,
}

impl PageLocation {
    pub fn new(secure: bool, host: impl Into<String>, path: impl Into<String>) -> Self {
        PageLocation { secure, host: host.into(), path: path.into() }
    }

    // Browser-style: `protocol` is "https:" or "http:" (with the colon).
    pub fn from_browser_parts(protocol: &str, host: &str, path: &str) -> Self {
        PageLocation::new(protocol == "https:", host, path)
    }

    pub fn parse(page_url: &str) -> Result<Self, LiveScoreError> {
        let invalid = |reason: String| LiveScoreError::InvalidPageUrl {
            url: page_url.to_owned(),
            reason,
        };
        let url = Url::parse(page_url).map_err(|err| invalid(err.to_string()))?;
        let secure = match url.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };
        let host = url.host_str().ok_or_else(|| invalid("missing host".to_owned()))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        Ok(PageLocation::new(secure, host, url.path()))
    }

    pub fn socket_url(&self, match_id: &MatchId) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}/ws/match/{match_id}/", self.host)
    }

    // Where the score-update form is posted when the socket is not usable. Relative to the
    // page origin, exactly as the page itself would post it.
    pub fn fallback_path(&self) -> String { format!("{}/update", self.path) }

    pub fn fallback_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}{}", self.host, self.fallback_path())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_follows_page_security() {
        let id = MatchId::new("17");
        let plain = PageLocation::new(false, "localhost:8000", "/live/match/17/");
        let secure = PageLocation::new(true, "cricket.example.org", "/live/match/17/");
        assert_eq!(plain.socket_url(&id), "ws://localhost:8000/ws/match/17/");
        assert_eq!(secure.socket_url(&id), "wss://cricket.example.org/ws/match/17/");
    }

    #[test]
    fn fallback_appends_to_path_verbatim() {
        let page = PageLocation::new(false, "localhost:8000", "/matches/17/live/");
        assert_eq!(page.fallback_path(), "/matches/17/live//update");
        let page = PageLocation::new(true, "cricket.example.org", "/match/17");
        assert_eq!(page.fallback_url(), "https://cricket.example.org/match/17/update");
    }

    #[test]
    fn parse_page_url() {
        let page = PageLocation::parse("https://cricket.example.org:8443/match/3/?tab=live").unwrap();
        assert_eq!(page, PageLocation::new(true, "cricket.example.org:8443", "/match/3/"));
        let page = PageLocation::parse("http://localhost/match/3").unwrap();
        assert_eq!(page, PageLocation::new(false, "localhost", "/match/3"));
        assert!(PageLocation::parse("ftp://localhost/match/3").is_err());
        assert!(PageLocation::parse("not a url").is_err());
    }

    #[test]
    fn browser_protocol() {
        assert!(PageLocation::from_browser_parts("https:", "h", "/").secure);
        assert!(!PageLocation::from_browser_parts("http:", "h", "/").secure);
    }
}
