use std::ops::RangeInclusive;

use affiliator_core::{AffiliationError, Block};

/// The run of blocks believed to hold the author and affiliation lines.
#[derive(Debug, Clone, PartialEq)]
pub struct AffiliationRegion {
    /// Selected blocks in document order.
    pub blocks: Vec<Block>,
    /// Pages that contributed at least one block.
    pub pages: Vec<usize>,
}

impl AffiliationRegion {
    /// Selected block texts joined by a single space. Blank blocks are skipped.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Index range from the first to the last flagged block of a page.
fn flagged_range(blocks: &[Block]) -> Option<RangeInclusive<usize>> {
    let first = blocks.iter().position(|b| b.is_affiliation)?;
    let last = blocks.iter().rposition(|b| b.is_affiliation)?;
    Some(first..=last)
}

/// Locate the affiliation region in analyzed pages.
///
/// Starts at the page of the first flagged block and keeps the span between
/// that page's first and last flagged blocks, non-flagged blocks in between
/// included. Each following page is taken the same way as long as one of its
/// first `lookahead` blocks is flagged; the first page that fails the check
/// ends the region.
pub fn select_region(
    pages: &[Vec<Block>],
    lookahead: usize,
) -> Result<AffiliationRegion, AffiliationError> {
    let start = pages
        .iter()
        .position(|blocks| blocks.iter().any(|b| b.is_affiliation))
        .ok_or(AffiliationError::RegionNotFound)?;

    let mut region = AffiliationRegion {
        blocks: Vec::new(),
        pages: Vec::new(),
    };

    for (page, blocks) in pages.iter().enumerate().skip(start) {
        if page > start && !blocks.iter().take(lookahead).any(|b| b.is_affiliation) {
            break;
        }
        let Some(range) = flagged_range(blocks) else {
            break;
        };
        region.blocks.extend_from_slice(&blocks[range]);
        region.pages.push(page);
    }

    tracing::debug!(
        pages = ?region.pages,
        blocks = region.blocks.len(),
        "selected affiliation region"
    );
    Ok(region)
}
