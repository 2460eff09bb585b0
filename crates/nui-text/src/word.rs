//! Word-at-point extraction for execute and look clicks.

/// The maximal run of non-whitespace runes containing offset `q`.
///
/// Returns the half-open span, or `None` when `q` is past the end or sits
/// on whitespace.
pub fn word_at(runes: &[char], q: usize) -> Option<(usize, usize)> {
    let c = runes.get(q)?;
    if c.is_whitespace() {
        return None;
    }
    let start = runes[..q]
        .iter()
        .rposition(|c| c.is_whitespace())
        .map_or(0, |i| i + 1);
    let end = runes[q..]
        .iter()
        .position(|c| c.is_whitespace())
        .map_or(runes.len(), |i| q + i);
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runes(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn word_in_the_middle() {
        let r = runes("New Del  Put");
        assert_eq!(word_at(&r, 5), Some((4, 7)));
        assert_eq!(word_at(&r, 4), Some((4, 7)));
        assert_eq!(word_at(&r, 6), Some((4, 7)));
        assert_eq!(word_at(&r, 0), Some((0, 3)));
        assert_eq!(word_at(&r, 11), Some((9, 12)));
    }

    #[test]
    fn whitespace_and_outside_give_nothing() {
        let r = runes("a b\tc\n");
        assert_eq!(word_at(&r, 1), None);
        assert_eq!(word_at(&r, 3), None);
        assert_eq!(word_at(&r, 5), None);
        assert_eq!(word_at(&r, 6), None);
        assert_eq!(word_at(&[], 0), None);
    }
}
