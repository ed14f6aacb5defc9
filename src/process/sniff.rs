/// Candidate delimiters in preference order.
const CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];

/// How many content lines to sample when sniffing.
const SAMPLE_LINES: usize = 10;

/// Detect the field delimiter of `text`.
///
/// A candidate wins outright when it splits every sampled line into the same
/// number of fields, more than one. If no candidate is consistent the
/// delimiter producing the most fields on the first content line wins, with
/// earlier candidates breaking ties.
pub fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();

    let first = match sample.first() {
        Some(line) => *line,
        None => return b',',
    };

    for &delim in &CANDIDATES {
        let counts: Vec<usize> = sample.iter().map(|line| field_count(line, delim)).collect();
        if counts[0] > 1 && counts.iter().all(|&c| c == counts[0]) {
            return delim;
        }
    }

    // max_by_key keeps the last maximum, so walk candidates in reverse to
    // make earlier ones win ties.
    CANDIDATES
        .iter()
        .rev()
        .copied()
        .max_by_key(|&delim| field_count(first, delim))
        .unwrap_or(b',')
}

fn field_count(line: &str, delim: u8) -> usize {
    line.split(delim as char).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_comma() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
    }

    #[test]
    fn detects_tab() {
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3\n"), b'\t');
    }

    #[test]
    fn detects_semicolon() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
    }

    #[test]
    fn detects_pipe() {
        assert_eq!(sniff_delimiter("a|b|c\n1|2|3\n"), b'|');
    }

    #[test]
    fn inconsistent_counts_fall_back_to_first_line_majority() {
        // Semicolon splits the first line into three fields but the second
        // into two, so no candidate is consistent; semicolon still produces
        // the most fields on the first content line.
        let text = "a;b;c\nd;e\n";
        assert_eq!(sniff_delimiter(text), b';');
    }

    #[test]
    fn commas_inside_semicolon_fields_do_not_confuse_it() {
        let text = "name;value\nPlant A, Unit 1;100\nPlant B, Unit 2;200\n";
        assert_eq!(sniff_delimiter(text), b';');
    }

    #[test]
    fn empty_input_defaults_to_comma() {
        assert_eq!(sniff_delimiter(""), b',');
        assert_eq!(sniff_delimiter("single header\n"), b',');
    }

    #[test]
    fn blank_lines_are_ignored_in_the_sample() {
        assert_eq!(sniff_delimiter("\n\na,b\n1,2\n"), b',');
    }
}
