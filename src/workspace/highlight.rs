//! Bracket checking for prompt text

const OPENERS: [char; 4] = ['(', '{', '<', '['];

fn opener_for(c: char) -> Option<char> {
    match c {
        ')' => Some('('),
        '}' => Some('{'),
        '>' => Some('<'),
        ']' => Some('['),
        _ => None,
    }
}

/// Character positions of brackets that have no partner.
///
/// Each bracket kind is matched independently, so `(]` reports both and
/// `([)]` reports nothing. Positions are sorted ascending.
pub fn unbalanced_brackets(text: &str) -> Vec<usize> {
    let mut open: [Vec<usize>; 4] = Default::default();
    let mut unmatched = Vec::new();

    for (i, c) in text.chars().enumerate() {
        if let Some(slot) = OPENERS.iter().position(|&o| o == c) {
            open[slot].push(i);
        } else if let Some(opener) = opener_for(c) {
            let slot = OPENERS.iter().position(|&o| o == opener).unwrap_or(0);
            if open[slot].pop().is_none() {
                unmatched.push(i);
            }
        }
    }

    unmatched.extend(open.into_iter().flatten());
    unmatched.sort_unstable();
    unmatched
}
