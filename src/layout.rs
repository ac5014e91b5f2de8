//! Fixed-width text layout: greedy word wrap and full justification
//!
//! Widths are counted in chars, not bytes, so accented author names do not
//! throw off the column alignment.

/// Justify a single line to exactly `width` chars by widening the gaps
/// between words. Lines with a single word, or lines that are already at or
/// past the width, are only padded on the right.
pub fn justify_line(line: &str, width: usize) -> String {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() <= 1 || char_len(line) >= width {
        return pad_right(line, width);
    }

    let total_chars: usize = words.iter().map(|w| char_len(w)).sum();
    let gaps = words.len() - 1;
    let spaces = width.saturating_sub(total_chars);
    let per_gap = spaces / gaps;
    let extra = spaces % gaps;

    let mut out = String::with_capacity(width);
    for (i, word) in words[..gaps].iter().enumerate() {
        out.push_str(word);
        let n = per_gap + usize::from(i < extra);
        out.extend(std::iter::repeat(' ').take(n));
    }
    out.push_str(words[gaps]);
    out
}

/// Greedy word wrap. When `justify` is set, every flushed line is justified
/// to `width`; the last line of the text is always left ragged.
///
/// Words longer than `width` are kept whole on their own line. Empty input
/// yields a single empty line.
pub fn wrap_text(text: &str, width: usize, justify: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = char_len(word);
        // current.len() counts the separating spaces already needed
        if current_len + word_len + current.len() <= width {
            current.push(word);
            current_len += word_len;
        } else {
            if !current.is_empty() {
                let joined = current.join(" ");
                lines.push(if justify { justify_line(&joined, width) } else { joined });
            }
            current = vec![word];
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current.join(" "));
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Pad with trailing spaces to `width`. Longer strings are left whole.
pub fn pad_right(s: &str, width: usize) -> String {
    format!("{:<width$}", s, width = width)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
