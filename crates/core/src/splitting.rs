//! Line splitting for on-screen narration.
//!
//! Subtitle lines have a hard character budget. Overlong text is split
//! at the most natural boundary available: end of sentence first, then
//! a comma, then before a connective word, then any whitespace, and as
//! a last resort a hard cut. A boundary is only taken when it lands
//! past 60% of the budget, so a split never produces a stub line
//! followed by another overlong one.
//!
//! All positions are counted in characters, not bytes, so multibyte
//! scripts split at the same visual budget as ASCII.

use crate::script::Script;

/// Minimum fraction of the budget a natural boundary must reach.
const SPLIT_THRESHOLD_RATIO: f64 = 0.6;

/// Words a line may be broken in front of.
const CONNECTORS: &[&str] = &["and", "but", "so", "because", "then", "while"];

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Leading and trailing whitespace is trimmed from every chunk; empty
/// chunks are dropped. Returns an empty vector for blank input.
pub fn smart_split(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chars: Vec<char> = text.trim().chars().collect();
    let mut chunks = Vec::new();

    while chars.len() > max_chars {
        let min_pos = (max_chars as f64 * SPLIT_THRESHOLD_RATIO) as usize;
        let cut = find_cut(&chars[..max_chars], min_pos);
        let head: String = chars[..cut].iter().collect();
        chunks.push(head.trim().to_string());
        chars = chars[cut..]
            .iter()
            .copied()
            .skip_while(|c| c.is_whitespace())
            .collect();
    }
    if !chars.is_empty() {
        chunks.push(chars.iter().collect::<String>().trim().to_string());
    }
    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

/// First chunk of a smart split, for fields that must fit in one line.
pub fn truncate_to_line(text: &str, max_chars: usize) -> String {
    smart_split(text, max_chars).into_iter().next().unwrap_or_default()
}

/// Enforce line budgets across a whole script in place.
///
/// Body lines are re-split; the hook and closer are truncated to their
/// first chunk because they are single-beat lines by design. Blocks
/// left without lines are removed.
pub fn validate_script(script: &mut Script, max_line_chars: usize, max_hook_chars: usize) {
    script.hook = truncate_to_line(&script.hook, max_hook_chars);
    script.closer = truncate_to_line(&script.closer, max_line_chars);
    for block in &mut script.body {
        block.lines = block
            .lines
            .iter()
            .flat_map(|line| smart_split(line, max_line_chars))
            .collect();
    }
    script.body.retain(|block| !block.lines.is_empty());
}

/// Best cut position within `window`, in priority order.
fn find_cut(window: &[char], min_pos: usize) -> usize {
    if let Some(pos) = last_mark(window, &['.', '!', '?'], min_pos) {
        return pos;
    }
    if let Some(pos) = last_mark(window, &[','], min_pos) {
        return pos;
    }
    if let Some(pos) = last_connector(window, min_pos) {
        return pos;
    }
    if let Some(pos) = window
        .iter()
        .rposition(|c| c.is_whitespace())
        .filter(|&p| p > min_pos)
    {
        return pos;
    }
    window.len()
}

/// Last position after one of `marks` that is followed by whitespace
/// (or ends the window) and lies past `min_pos`.
fn last_mark(window: &[char], marks: &[char], min_pos: usize) -> Option<usize> {
    (0..window.len()).rev().find_map(|i| {
        let terminal = marks.contains(&window[i])
            && window.get(i + 1).map_or(true, |c| c.is_whitespace());
        let cut = i + 1;
        (terminal && cut > min_pos).then_some(cut)
    })
}

/// Last position in front of a whole connective word past `min_pos`.
fn last_connector(window: &[char], min_pos: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for connector in CONNECTORS {
        let word: Vec<char> = connector.chars().collect();
        for i in 1..window.len().saturating_sub(word.len()) {
            let bounded = window[i - 1].is_whitespace()
                && window
                    .get(i + word.len())
                    .is_some_and(|c| c.is_whitespace());
            if bounded && window[i..i + word.len()] == word[..] && i > min_pos {
                best = Some(best.map_or(i, |b| b.max(i)));
            }
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
