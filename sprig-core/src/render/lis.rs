//! Longest increasing subsequence.

/// Positions of a longest strictly increasing subsequence of `seq`.
///
/// `None` entries are skipped. The result is sorted ascending. Runs in
/// O(n log n).
///
/// # Example
///
/// ```rust
/// use sprig_core::render::longest_increasing_subsequence;
///
/// let seq = [Some(2), Some(3), Some(1), None, Some(4)];
/// assert_eq!(longest_increasing_subsequence(&seq), vec![0, 1, 4]);
/// ```
pub fn longest_increasing_subsequence(seq: &[Option<usize>]) -> Vec<usize> {
    // tails[k] = (value, position) of the smallest tail of any increasing
    // subsequence of length k + 1 seen so far.
    let mut tails: Vec<(usize, usize)> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = vec![None; seq.len()];

    for (position, value) in seq.iter().enumerate() {
        let Some(value) = *value else {
            continue;
        };

        let slot = tails.partition_point(|&(tail, _)| tail < value);
        if slot > 0 {
            predecessor[position] = Some(tails[slot - 1].1);
        }
        if slot == tails.len() {
            tails.push((value, position));
        } else {
            tails[slot] = (value, position);
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().map(|&(_, position)| position);
    while let Some(position) = cursor {
        result.push(position);
        cursor = predecessor[position];
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(seq: &[Option<usize>], positions: &[usize]) -> Vec<usize> {
        positions.iter().filter_map(|&p| seq[p]).collect()
    }

    #[test]
    fn empty_and_all_none() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
        assert!(longest_increasing_subsequence(&[None, None]).is_empty());
    }

    #[test]
    fn already_sorted_keeps_everything() {
        let seq = [Some(0), Some(1), Some(2)];
        assert_eq!(longest_increasing_subsequence(&seq), vec![0, 1, 2]);
    }

    #[test]
    fn reversed_keeps_one() {
        let seq = [Some(1), Some(0)];
        assert_eq!(longest_increasing_subsequence(&seq).len(), 1);
    }

    #[test]
    fn classic_sequence() {
        let seq: Vec<Option<usize>> = [10, 9, 2, 5, 3, 7, 101, 18].into_iter().map(Some).collect();
        let positions = longest_increasing_subsequence(&seq);
        assert_eq!(positions.len(), 4);

        let picked = values(&seq, &positions);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn equal_values_are_not_increasing() {
        let seq = [Some(3), Some(3), Some(3)];
        assert_eq!(longest_increasing_subsequence(&seq).len(), 1);
    }

    #[test]
    fn gaps_are_skipped() {
        let seq = [Some(4), None, Some(2), Some(3), None, Some(1)];
        assert_eq!(longest_increasing_subsequence(&seq), vec![2, 3]);
    }
}
