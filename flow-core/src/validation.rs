//! Field validation for the blocks of a screen.

use std::collections::BTreeSet;

use crate::block::{BlockType, ContentBlock};
use crate::data::{CollectedData, FieldValue};
use crate::screen::Screen;

/// Field names currently failing a constraint on the current screen.
pub type ValidationErrors = BTreeSet<String>;

/// Whether a single block's constraint is violated.
fn is_invalid(block: &ContentBlock, field: &str, data: &CollectedData) -> bool {
    let value = data.get(field);
    match block.block_type {
        BlockType::Input if block.is_required() => value.is_none_or(FieldValue::is_blank),
        BlockType::Checklist => {
            let min = block.min_selections();
            if min == 0 {
                return false;
            }
            let selected = value.map_or(0, |v| v.selection_count());
            u64::try_from(selected).unwrap_or(u64::MAX) < min
        }
        _ => false,
    }
}

/// Validate the visible blocks of a screen against collected data.
///
/// Required inputs fail when blank or absent; checklists fail below
/// `minSelections`. Other blocks never fail. Pure: `data` is not touched.
#[must_use]
pub fn validate_screen(screen: &Screen, data: &CollectedData) -> ValidationErrors {
    screen
        .visible_blocks()
        .into_iter()
        .filter_map(|block| {
            let field = block.field_name()?;
            is_invalid(block, field, data).then(|| field.to_string())
        })
        .collect()
}
