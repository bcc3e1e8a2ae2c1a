//! # Layers Search
//!
//! Fuzzy filtering of the layer list.
//!
//! Each block is scored on three fields and keeps its best weighted score:
//!
//! | Field                  | Weight |
//! |------------------------|--------|
//! | type (`product-grid`)  | 1.5    |
//! | variant                | 1.3    |
//! | flattened settings     | 1.0    |
//!
//! The per-field scorer ranks in bands so a direct hit always beats a
//! scattered one:
//!
//! ```text
//! exact        1000
//! prefix        900 + length ratio bonus
//! substring     700 + length ratio bonus - start offset penalty  (>= 500)
//! subsequence   consecutive/boundary bonuses - excess length     (<= 450)
//! no match       -1
//! ```

use crate::block::{Block, BlockId};
use crate::mutations;
use crate::settings::settings_text;
use serde::Serialize;

const EXACT_SCORE: f64 = 1000.0;
const PREFIX_SCORE: f64 = 900.0;
const SUBSTRING_SCORE: f64 = 700.0;
const SUBSTRING_FLOOR: f64 = 500.0;
const RATIO_BONUS: f64 = 90.0;
const OFFSET_PENALTY: f64 = 2.0;

const FUZZY_CHAR: f64 = 10.0;
const FUZZY_CONSECUTIVE: f64 = 5.0;
const FUZZY_BOUNDARY: f64 = 15.0;
const FUZZY_EXCESS_PENALTY: f64 = 0.5;
const FUZZY_CEILING: f64 = 450.0;

pub const TYPE_WEIGHT: f64 = 1.5;
pub const VARIANT_WEIGHT: f64 = 1.3;
pub const SETTINGS_WEIGHT: f64 = 1.0;

/// A block that matched a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: BlockId,
    pub score: f64,
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || c == '-' || c == '_'
}

/// Score `query` against one field. Case-insensitive; `-1.0` means no match.
///
/// Substring scores are floored at 500 and subsequence scores capped at 450,
/// so a long target or a late match can never push a substring hit below a
/// scattered one. Without the clamps the offset penalty is unbounded and a
/// long run of consecutive characters can outgrow the substring band.
pub fn fuzzy_score(query: &str, target: &str) -> f64 {
    let query = query.trim().to_lowercase();
    let target = target.to_lowercase();
    if query.is_empty() || target.is_empty() {
        return -1.0;
    }

    let q_len = query.chars().count() as f64;
    let t_len = target.chars().count() as f64;
    let ratio = q_len / t_len;

    if target == query {
        return EXACT_SCORE;
    }
    if target.starts_with(&query) {
        return PREFIX_SCORE + ratio * RATIO_BONUS;
    }
    if let Some(byte_offset) = target.find(&query) {
        let offset = target[..byte_offset].chars().count() as f64;
        let score = SUBSTRING_SCORE + ratio * RATIO_BONUS - offset * OFFSET_PENALTY;
        return score.max(SUBSTRING_FLOOR);
    }

    subsequence_score(&query, &target, q_len, t_len)
}

fn subsequence_score(query: &str, target: &str, q_len: f64, t_len: f64) -> f64 {
    let mut wanted = query.chars().peekable();
    let mut score = 0.0;
    let mut streak = 0u32;
    let mut prev: Option<char> = None;

    for c in target.chars() {
        let Some(&next) = wanted.peek() else { break };
        if c == next {
            wanted.next();
            score += FUZZY_CHAR + f64::from(streak) * FUZZY_CONSECUTIVE;
            streak += 1;
            if prev.map(is_boundary).unwrap_or(true) {
                score += FUZZY_BOUNDARY;
            }
        } else {
            streak = 0;
        }
        prev = Some(c);
    }

    if wanted.peek().is_some() {
        return -1.0;
    }

    let penalized = score - (t_len - q_len) * FUZZY_EXCESS_PENALTY;
    penalized.clamp(0.0, FUZZY_CEILING)
}

/// Best weighted score of a block over its searchable fields
pub fn score_block(query: &str, block: &Block) -> f64 {
    let settings = settings_text(&block.settings);
    let fields = [
        (block.block_type.as_str(), TYPE_WEIGHT),
        (block.variant.as_str(), VARIANT_WEIGHT),
        (settings.as_str(), SETTINGS_WEIGHT),
    ];
    fields
        .iter()
        .map(|(text, weight)| {
            let score = fuzzy_score(query, text);
            if score > 0.0 {
                score * weight
            } else {
                score
            }
        })
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Search the flattened forest.
///
/// Blocks scoring `<= 0` are dropped; the rest come back best first, ties in
/// document order. A blank query matches every block with score 0.
pub fn search_blocks(forest: &[Block], query: &str) -> Vec<SearchHit> {
    let flat = mutations::flatten(forest);
    if query.trim().is_empty() {
        return flat
            .into_iter()
            .map(|b| SearchHit {
                id: b.id.clone(),
                score: 0.0,
            })
            .collect();
    }

    let mut hits: Vec<SearchHit> = flat
        .into_iter()
        .filter_map(|b| {
            let score = score_block(query, b);
            (score > 0.0).then(|| SearchHit {
                id: b.id.clone(),
                score,
            })
        })
        .collect();
    // Stable sort keeps document order for equal scores
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    fn block(id: &str, block_type: BlockType) -> Block {
        Block::new(block_type, "default").with_id(id)
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(fuzzy_score("hero", "hero"), 1000.0);
        assert_eq!(fuzzy_score("HERO", "Hero"), 1000.0);

        let prefix = fuzzy_score("her", "hero");
        assert!(prefix > 900.0 && prefix < 1000.0);

        let substring = fuzzy_score("her", "the hero");
        assert!(substring >= 500.0 && substring < 900.0);

        let fuzzy = fuzzy_score("pgd", "product-grid");
        assert!(fuzzy > 0.0 && fuzzy <= 450.0);

        assert_eq!(fuzzy_score("xyz", "hero"), -1.0);
        assert_eq!(fuzzy_score("", "hero"), -1.0);
    }

    #[test]
    fn test_shorter_targets_rank_higher() {
        assert!(fuzzy_score("her", "hero") > fuzzy_score("her", "header"));
        assert!(fuzzy_score("ad", "head") > fuzzy_score("ad", "product head"));
    }

    #[test]
    fn test_boundary_bonus() {
        // "g" right after the hyphen earns the boundary bonus
        assert!(fuzzy_score("pg", "product-grid") > fuzzy_score("pr", "xpxxrxxxxxxx"));
    }

    #[test]
    fn test_subsequence_must_be_ordered() {
        assert_eq!(fuzzy_score("dh", "header"), -1.0);
        assert!(fuzzy_score("hdr", "header") > 0.0);
    }

    #[test]
    fn test_her_query_ordering() {
        let forest = vec![
            block("footer", BlockType::Footer),
            block("header", BlockType::Header),
            block("hero", BlockType::Hero),
        ];

        let hits = search_blocks(&forest, "her");
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["hero", "header"]);
        assert!(hits.iter().all(|h| h.score > 0.0));
    }

    #[test]
    fn test_search_matches_settings_and_nested_blocks() {
        let banner = block("banner", BlockType::Text).with_setting("text", "Summer sale");
        let forest = vec![Block::new(BlockType::Section, "default")
            .with_id("s")
            .with_children(vec![banner])];

        let hits = search_blocks(&forest, "summer");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "banner");
    }

    #[test]
    fn test_type_outweighs_settings() {
        let by_type = block("t", BlockType::Gallery);
        let by_text = block("s", BlockType::Text).with_setting("caption", "gallery");
        let forest = vec![by_text, by_type];

        let hits = search_blocks(&forest, "gallery");
        assert_eq!(hits[0].id.as_str(), "t");
        assert_eq!(hits[0].score, 1500.0);
        assert_eq!(hits[1].score, 1000.0);
    }

    #[test]
    fn test_blank_query_returns_everything() {
        let forest = vec![block("a", BlockType::Text), block("b", BlockType::Image)];
        assert_eq!(search_blocks(&forest, "  ").len(), 2);
    }
}
