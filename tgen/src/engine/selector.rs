use crate::template::{Call, Sequence};

/// Picks the calls an engine is responsible for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSelector {
    pub id: String,
    /// Drop calls the engine does not claim instead of keeping them as
    /// unflagged context.
    pub significant_only: bool,
}

impl SequenceSelector {
    pub fn new(id: &str, significant_only: bool) -> Self {
        SequenceSelector {
            id: id.to_string(),
            significant_only,
        }
    }

    /// Whether any primitive of the call carries a situation for this engine.
    pub fn is_tagged(&self, call: &Call) -> bool {
        let Some(prim) = call.primitive() else {
            return false;
        };
        let mut tagged = false;
        prim.visit(&mut |node| {
            tagged |= node
                .situation
                .as_ref()
                .and_then(|s| s.engine.as_deref())
                == Some(self.id.as_str());
        });
        tagged
    }

    /// Sub-sequence of claimed calls, or `None` when nothing is claimed.
    pub fn select(&self, seq: &Sequence) -> Option<Sequence> {
        let mut selected = Sequence::default();
        let mut claimed = false;
        for (call, position) in seq.calls.iter().zip(&seq.positions) {
            if self.is_tagged(call) {
                claimed = true;
                selected.push(call.clone(), *position, true);
            } else if !self.significant_only {
                selected.push(call.clone(), *position, false);
            }
        }
        claimed.then_some(selected)
    }
}
