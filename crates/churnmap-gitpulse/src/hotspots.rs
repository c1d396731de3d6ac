//! Change frequency × size hotspot scoring.
//!
//! Combines per-file commit counts, byte sizes, and last-change ages into a
//! single score normalized to 0 to 100. Recently changed files score on the
//! plain product of commits and size; files untouched for longer than the
//! recent window are damped by a logarithm in their own age so that
//! once-hot code decays out of the top ranks.

use std::collections::HashMap;

use churnmap_core::{ChurnmapError, FileMetric, ScoringConfig};

/// Age assumed for a file with no recorded last change.
const DEFAULT_AGE_DAYS: i64 = 1;

/// Scores files from three independently computed projections.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use churnmap_core::ScoringConfig;
/// use churnmap_gitpulse::hotspots::HotspotScorer;
///
/// let commits = HashMap::from([("src/engine.rs".to_string(), 12u64), ("src/util.rs".to_string(), 3)]);
/// let sizes = HashMap::from([("src/engine.rs".to_string(), 4_000u64), ("src/util.rs".to_string(), 1_600)]);
/// let ages = HashMap::from([("src/engine.rs".to_string(), 2i64), ("src/util.rs".to_string(), 30)]);
///
/// let scorer = HotspotScorer::new(&ScoringConfig::default());
/// let mut hotspots = scorer.score_all(&commits, &sizes, &ages);
/// churnmap_gitpulse::hotspots::rank(&mut hotspots);
///
/// assert_eq!(hotspots[0].file, "src/engine.rs");
/// assert_eq!(hotspots[0].score, 100.0);
/// assert_eq!(hotspots[1].score, 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct HotspotScorer {
    min_commits: u64,
    recent_days: u64,
}

impl HotspotScorer {
    /// Create a scorer using the thresholds in `policy`.
    pub fn new(policy: &ScoringConfig) -> Self {
        Self {
            min_commits: policy.min_commits,
            recent_days: policy.recent_days,
        }
    }

    /// Age fed to the score function: the raw age floored at one day, plus one.
    ///
    /// The result is always at least 2, so it is a valid logarithm base.
    pub fn effective_age(raw_age: Option<i64>) -> u64 {
        raw_age.unwrap_or(DEFAULT_AGE_DAYS).max(1) as u64 + 1
    }

    /// Default score for a single file.
    ///
    /// Linear `commits * complexity` while `effective_age` is inside the
    /// recent window, `log_{effective_age}(commits * complexity)` after it.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::DegenerateLogBase`] if the logarithmic branch
    /// is reached with `effective_age <= 1`.
    pub fn raw_score(
        &self,
        commits: u64,
        complexity: u64,
        effective_age: u64,
    ) -> Result<f64, ChurnmapError> {
        let product = commits as f64 * complexity as f64;
        if effective_age < self.recent_days {
            Ok(product)
        } else {
            log_with_base(product, effective_age)
        }
    }

    /// Score every qualifying file with the default formula.
    ///
    /// See [`HotspotScorer::score_all_with`].
    pub fn score_all(
        &self,
        commits: &HashMap<String, u64>,
        complexity: &HashMap<String, u64>,
        ages: &HashMap<String, i64>,
    ) -> Vec<FileMetric> {
        self.score_all_with(commits, complexity, ages, |cm, cp, age| {
            self.raw_score(cm, cp, age)
        })
    }

    /// Score every qualifying file with a custom score function.
    ///
    /// `score_fn` receives `(commits, complexity, effective_age)`. Files
    /// without a size, or with no more than `min_commits` commits, are
    /// excluded. Files for which `score_fn` fails or returns a non-finite
    /// value are dropped with a warning. Scores are normalized against the
    /// maximum to `[0, 100]`, rounded to one decimal. Output is ordered by
    /// file path; use [`rank`] to order by score.
    pub fn score_all_with<F>(
        &self,
        commits: &HashMap<String, u64>,
        complexity: &HashMap<String, u64>,
        ages: &HashMap<String, i64>,
        score_fn: F,
    ) -> Vec<FileMetric>
    where
        F: Fn(u64, u64, u64) -> Result<f64, ChurnmapError>,
    {
        let mut files: Vec<(&String, &u64)> = commits.iter().collect();
        files.sort_by(|a, b| a.0.cmp(b.0));

        let mut scored: Vec<(FileMetric, f64)> = Vec::new();
        let mut max_score = 0.0f64;

        for (file, &commit_count) in files {
            let file_complexity = complexity.get(file).copied().unwrap_or(0);
            if file_complexity == 0 {
                continue;
            }
            if commit_count <= self.min_commits {
                continue;
            }

            let raw_age = ages.get(file).copied();
            let effective_age = Self::effective_age(raw_age);
            let raw = match score_fn(commit_count, file_complexity, effective_age) {
                Ok(raw) if raw.is_finite() => raw,
                Ok(raw) => {
                    log::warn!("dropping {file}: score function returned {raw}");
                    continue;
                }
                Err(e) => {
                    log::warn!("dropping {file}: {e}");
                    continue;
                }
            };

            if raw > max_score {
                max_score = raw;
            }
            scored.push((
                FileMetric {
                    file: file.clone(),
                    commits: commit_count,
                    complexity: file_complexity,
                    age_days: raw_age.unwrap_or(DEFAULT_AGE_DAYS).max(0),
                    score: 0.0,
                },
                raw,
            ));
        }

        log::debug!(
            "scored {} of {} files (max raw score {max_score})",
            scored.len(),
            commits.len()
        );

        scored
            .into_iter()
            .map(|(mut metric, raw)| {
                metric.score = normalize(raw, max_score);
                metric
            })
            .collect()
    }
}

/// `log_base(value)`.
///
/// # Errors
///
/// Returns [`ChurnmapError::DegenerateLogBase`] if `base <= 1`.
///
/// # Examples
///
/// ```
/// use churnmap_gitpulse::hotspots::log_with_base;
///
/// assert!((log_with_base(100.0, 10).unwrap() - 2.0).abs() < 1e-12);
/// assert!(log_with_base(100.0, 1).is_err());
/// ```
pub fn log_with_base(value: f64, base: u64) -> Result<f64, ChurnmapError> {
    if base <= 1 {
        return Err(ChurnmapError::DegenerateLogBase(base));
    }
    Ok(value.ln() / (base as f64).ln())
}

fn normalize(raw: f64, max_score: f64) -> f64 {
    if max_score <= 0.0 {
        return 0.0;
    }
    let percent = (raw / max_score * 100.0).clamp(0.0, 100.0);
    (percent * 10.0).round() / 10.0
}

/// Sort hotspots by score descending, ties by path.
pub fn rank(hotspots: &mut [FileMetric]) {
    hotspots.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.file.cmp(&b.file))
    });
}
