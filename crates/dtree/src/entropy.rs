use std::collections::BTreeMap;

/// Normalized separation score of a driver-set partition.
///
/// `sum(count * log2(count)) / total` is the weighted average
/// log-count per color; subtracting it from `log2(total)` measures how
/// much the partition narrows down a color's driver set. The score is
/// 0 for a single fully mixed group and approaches `log2(total)` as
/// the groups shrink towards singletons. Round-off can push the raw
/// value slightly below zero, so it is clamped.
pub fn partition_entropy(partition: &BTreeMap<String, u64>, total_colors: u64) -> f64 {
    if total_colors == 0 {
        return 0.0;
    }
    let raw: f64 = partition
        .values()
        .map(|&count| {
            let count = count as f64;
            if count > 0.0 { count * count.log2() } else { 0.0 }
        })
        .sum();
    let total = total_colors as f64;
    let entropy = -(raw / total - total.log2());
    entropy.max(0.0)
}
