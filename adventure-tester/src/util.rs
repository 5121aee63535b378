pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse comma-separated seeds, skipping tokens that are not numbers.
pub fn parse_seeds(s: &str) -> Vec<u64> {
    split_csv(s)
        .iter()
        .filter_map(|token| match token.parse() {
            Ok(seed) => Some(seed),
            Err(_) => {
                log::warn!("ignoring invalid seed {token:?}");
                None
            }
        })
        .collect()
}
