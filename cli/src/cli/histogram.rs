/// Renders counts as horizontal bars, merging neighbouring bins so at most
/// `rows` lines come out.
pub fn render(counts: &[u64], rows: usize, bar_width: usize) -> Vec<String> {
    if counts.is_empty() || rows == 0 {
        return vec!["(ビンがありません)".to_owned()];
    }
    let per_row = counts.len().div_ceil(rows.min(counts.len()));
    let sums: Vec<(usize, usize, u64)> = counts
        .chunks(per_row)
        .enumerate()
        .map(|(row, chunk)| {
            let start = row * per_row;
            (start, start + chunk.len() - 1, chunk.iter().sum())
        })
        .collect();
    let max = sums.iter().map(|(_, _, sum)| *sum).max().unwrap_or(0);

    sums.iter()
        .map(|&(start, end, sum)| {
            let len = if max == 0 {
                0
            } else {
                ((sum as f64 / max as f64) * bar_width as f64).round() as usize
            };
            let label = if start == end {
                format!("{start}")
            } else {
                format!("{start}-{end}")
            };
            format!(
                "{label:>9} | {bar:<width$} {sum}",
                bar = "#".repeat(len),
                width = bar_width
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_bins_into_rows() {
        let lines = render(&[1, 2, 3, 4], 2, 10);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{:>9} | {:<10} 3", "0-1", "####"));
        assert_eq!(lines[1], format!("{:>9} | {} 7", "2-3", "#".repeat(10)));
    }

    #[test]
    fn keeps_single_bins_when_rows_suffice() {
        let lines = render(&[0, 5], 20, 4);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].trim_start().starts_with("0 |"));
        assert!(lines[1].ends_with("#### 5"));
    }

    #[test]
    fn empty_and_zero_histograms() {
        assert_eq!(render(&[], 10, 10), vec!["(ビンがありません)".to_owned()]);
        let lines = render(&[0, 0, 0], 3, 5);
        assert!(lines.iter().all(|line| !line.contains('#')));
    }
}
