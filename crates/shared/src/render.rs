//! Render requests sent from the engine to the host UI.

use serde::{Deserialize, Serialize};

/// Parts of the spellbook window that can be re-rendered on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderPart {
    Sidebar,
    Tabs,
    SpellList,
    Footer,
}

/// `parts = None` re-renders everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<RenderPart>>,
}

impl RenderRequest {
    pub fn full() -> Self {
        Self { parts: None }
    }

    pub fn parts(parts: impl IntoIterator<Item = RenderPart>) -> Self {
        let mut parts: Vec<RenderPart> = parts.into_iter().collect();
        parts.sort();
        parts.dedup();
        Self { parts: Some(parts) }
    }

    pub fn is_full(&self) -> bool {
        self.parts.is_none()
    }

    /// Combine two pending requests into one.
    pub fn merge(self, other: RenderRequest) -> RenderRequest {
        match (self.parts, other.parts) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                RenderRequest::parts(a)
            }
            _ => RenderRequest::full(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_coalesces() {
        let merged = RenderRequest::parts([RenderPart::Footer])
            .merge(RenderRequest::parts([RenderPart::SpellList, RenderPart::Footer]));
        assert_eq!(
            merged.parts,
            Some(vec![RenderPart::SpellList, RenderPart::Footer])
        );
        assert!(RenderRequest::parts([RenderPart::Tabs])
            .merge(RenderRequest::full())
            .is_full());
    }
}
