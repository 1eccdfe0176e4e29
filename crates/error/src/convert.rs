use crate::{ErrorCode, SightlineError};

impl From<reqwest::Error> for SightlineError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::ConnectionTimeout
        } else if err.is_connect() {
            ErrorCode::WarehouseUnavailable
        } else if err.is_decode() {
            ErrorCode::SerializationFailed
        } else {
            ErrorCode::QueryExecution
        };
        SightlineError::new(code, err.to_string())
    }
}

impl From<std::io::Error> for SightlineError {
    fn from(err: std::io::Error) -> Self {
        SightlineError::new(ErrorCode::MissingCredentials, err.to_string())
    }
}

impl From<serde_json::Error> for SightlineError {
    fn from(err: serde_json::Error) -> Self {
        SightlineError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

/// Levenshtein-based suggestion for "did you mean" hints on unknown report
/// names and similar lookups.
pub fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(target, option);
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let len_a = a.len();
    let len_b = b.len();
    let mut dp = vec![vec![0; len_b + 1]; len_a + 1];

    for (i, row) in dp.iter_mut().enumerate().take(len_a + 1) {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate().take(len_b + 1) {
        *val = j;
    }

    for i in 1..=len_a {
        for j in 1..=len_b {
            let cost = if a.chars().nth(i - 1) == b.chars().nth(j - 1) {
                0
            } else {
                1
            };
            dp[i][j] = std::cmp::min(
                std::cmp::min(dp[i - 1][j] + 1, dp[i][j - 1] + 1),
                dp[i - 1][j - 1] + cost,
            );
        }
    }

    dp[len_a][len_b]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("book", "back"), 2);
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_find_closest_match() {
        let options = vec![
            "geo".to_string(),
            "mobile".to_string(),
            "userRetention".to_string(),
        ];

        // Exact matches
        assert_eq!(find_closest_match("geo", &options), Some("geo".to_string()));

        // Close matches
        assert_eq!(find_closest_match("gio", &options), Some("geo".to_string()));
        assert_eq!(
            find_closest_match("moble", &options),
            Some("mobile".to_string())
        );

        // No match (distance > 3)
        assert_eq!(find_closest_match("completely_different", &options), None);
    }

    #[test]
    fn test_io_error_mapping() {
        let io_err = std::io::Error::other("File error");
        let err: SightlineError = io_err.into();
        assert_eq!(err.code, ErrorCode::MissingCredentials);
        assert!(err.message.contains("File error"));
    }

    #[test]
    fn test_json_error_mapping() {
        let json_err = serde_json::from_str::<serde_json::Value>("corrupt{").unwrap_err();
        let err: SightlineError = json_err.into();
        assert_eq!(err.code, ErrorCode::SerializationFailed);
    }
}
