//! Tool call accumulation
//!
//! Correlates fragments by vendor id, assigns dense indices in first-seen
//! order and concatenates argument chunks until the round completes.

use std::collections::HashMap;
use uuid::Uuid;

use crate::types::{ToolArguments, ToolCall, ToolCallFragment};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingToolCall {
    pub provider_id: String,
    pub call_id: Option<String>,
    pub name: String,
    pub arguments: String,
}

/// Per-stream accumulator. Vendor ids are scoped to one stream.
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    parts: Vec<PendingToolCall>,
    index_of: HashMap<String, usize>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the fragment's index and absorb its name, call id and arguments.
    pub fn on_fragment(&mut self, fragment: &mut ToolCallFragment) -> usize {
        let index = match self.index_of.get(&fragment.provider_id) {
            Some(&index) => index,
            None => {
                let index = self.parts.len();
                self.index_of.insert(fragment.provider_id.clone(), index);
                self.parts.push(PendingToolCall {
                    provider_id: fragment.provider_id.clone(),
                    ..Default::default()
                });
                index
            }
        };
        fragment.index = index;

        let part = &mut self.parts[index];
        if let Some(name) = fragment.name.as_deref().filter(|n| !n.is_empty()) {
            part.name = name.to_string();
        }
        if let Some(call_id) = fragment.call_id.as_deref().filter(|id| !id.is_empty()) {
            part.call_id = Some(call_id.to_string());
        }
        if let Some(chunk) = &fragment.arguments_chunk {
            part.arguments.push_str(chunk);
        }
        index
    }

    /// Assemble the calls in index order. Argument buffers are parsed once here;
    /// anything unparseable is kept raw.
    pub fn finalize(&self) -> Vec<ToolCall> {
        self.parts
            .iter()
            .filter(|part| !part.name.trim().is_empty())
            .map(|part| {
                let id = part
                    .call_id
                    .clone()
                    .or_else(|| (!part.provider_id.is_empty()).then(|| part.provider_id.clone()))
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4()));
                ToolCall::new(id, part.name.clone(), ToolArguments::parse(&part.arguments))
            })
            .collect()
    }

    pub fn parts(&self) -> &[PendingToolCall] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }
}
