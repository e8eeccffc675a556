use std::fmt;

use serde::{Deserialize, Serialize};

use crate::once_cell_regex;


#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self { MatchId(id.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// Which match a page shows. An explicit `data-match-id` on the script element wins; otherwise
// the first `match/<digits>` segment of the page path is used. An empty attribute counts as
// missing.
pub fn resolve_match_id(declared: Option<&str>, page_path: &str) -> Option<MatchId> {
    if let Some(declared) = declared.filter(|id| !id.is_empty()) {
        return Some(MatchId::new(declared));
    }
    match_id_from_path(page_path)
}

pub fn match_id_from_path(page_path: &str) -> Option<MatchId> {
    let re = once_cell_regex!(r"match/([0-9]+)");
    re.captures(page_path).map(|caps| MatchId::new(&caps[1]))
}
