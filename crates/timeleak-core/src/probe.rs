//! Probe construction.

/// Probe for one candidate symbol at the position right after `prefix`.
///
/// The result is `prefix + symbol` padded with `filler` to `total_len`
/// characters. At the final position the padding is empty; if the prefix is
/// already at or past `total_len` no padding is added.
pub fn candidate_probe(prefix: &str, symbol: char, total_len: usize, filler: char) -> String {
    let used = prefix.chars().count() + 1;
    let padding = total_len.saturating_sub(used);
    let mut probe = String::with_capacity(prefix.len() + (padding + 1) * 4);
    probe.push_str(prefix);
    probe.push(symbol);
    probe.extend(std::iter::repeat_n(filler, padding));
    probe
}

/// Probe of `length` copies of `filler`, used for length discovery.
pub fn filler_probe(length: usize, filler: char) -> String {
    std::iter::repeat_n(filler, length).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_probe_pads_to_length() {
        assert_eq!(candidate_probe("ab", 'q', 6, 'a'), "abqaaa");
    }

    #[test]
    fn test_candidate_probe_first_position() {
        assert_eq!(candidate_probe("", 'z', 4, 'x'), "zxxx");
    }

    #[test]
    fn test_candidate_probe_final_position_has_no_padding() {
        let p = candidate_probe("abcde", 'f', 6, 'a');
        assert_eq!(p, "abcdef");
        assert_eq!(p.chars().count(), 6);
    }

    #[test]
    fn test_candidate_probe_prefix_overrun_does_not_panic() {
        assert_eq!(candidate_probe("abcdef", 'g', 6, 'a'), "abcdefg");
    }

    #[test]
    fn test_filler_probe() {
        assert_eq!(filler_probe(3, 'a'), "aaa");
        assert_eq!(filler_probe(0, 'a'), "");
    }

    #[test]
    fn test_multibyte_symbols_count_as_one() {
        assert_eq!(candidate_probe("é", 'ü', 3, '·'), "éü·");
    }
}
