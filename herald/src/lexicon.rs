// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! The state lexicon: the fixed decoration (glyph and color) of every
//! pipeline execution state that Herald notifies about.

/// The decoration of a notifiable execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexiconEntry {
    /// The execution state, exactly as CodePipeline reports it.
    pub state: &'static str,
    /// The emoji prefixed to subjects and pretexts.
    pub glyph: &'static str,
    /// The attachment color of rich (chat) renderings.
    pub color: &'static str,
}

/// The notifiable execution states, in lifecycle order.
#[rustfmt::skip]
pub const STATE_LEXICON: [LexiconEntry; 7] = [
    LexiconEntry { state: "STARTED",    glyph: "🥳", color: "#00bfff" },
    LexiconEntry { state: "SUCCEEDED",  glyph: "🤩", color: "#36a64f" },
    LexiconEntry { state: "RESUMED",    glyph: "🤔", color: "#87cefa" },
    LexiconEntry { state: "FAILED",     glyph: "😫", color: "#ff0000" },
    LexiconEntry { state: "STOPPING",   glyph: "😮", color: "#ffff00" },
    LexiconEntry { state: "STOPPED",    glyph: "😌", color: "#ffd700" },
    LexiconEntry { state: "SUPERSEDED", glyph: "🧐", color: "#ffa500" },
];

/// Looks up the decoration of `state`. Case-sensitive, no normalization.
pub fn lookup(state: &str) -> Option<&'static LexiconEntry> {
    STATE_LEXICON.iter().find(|entry| entry.state == state)
}

/// Returns true if `state` is one of the notifiable execution states.
pub fn is_notifiable(state: &str) -> bool {
    lookup(state).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_is_notifiable() {
        for state in &[
            "STARTED",
            "SUCCEEDED",
            "RESUMED",
            "FAILED",
            "STOPPING",
            "STOPPED",
            "SUPERSEDED",
        ] {
            assert!(is_notifiable(state), "{} should be notifiable", state);
        }
    }

    #[test]
    fn unknown_states_are_not_notifiable() {
        for state in &["CANCELLED", "succeeded", "Succeeded", " SUCCEEDED", "", "SUCCEEDED\n"] {
            assert!(!is_notifiable(state), "{:?} should not be notifiable", state);
        }
    }

    #[test]
    fn lookup_decoration() {
        let entry = lookup("FAILED").unwrap();
        assert_eq!(entry.glyph, "😫");
        assert_eq!(entry.color, "#ff0000");
        assert_eq!(lookup("SUCCEEDED").unwrap().glyph, "🤩");
    }
}
