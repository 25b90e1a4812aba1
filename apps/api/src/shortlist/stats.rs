use serde::Serialize;
use uuid::Uuid;

use crate::models::resume::ResumeRecord;

/// Processed-score histogram for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    #[serde(rename = "90-100")]
    pub excellent: usize,
    #[serde(rename = "80-89")]
    pub strong: usize,
    #[serde(rename = "70-79")]
    pub good: usize,
    #[serde(rename = "60-69")]
    pub fair: usize,
    #[serde(rename = "below60")]
    pub below_60: usize,
}

impl ScoreDistribution {
    fn add(&mut self, score: i32) {
        match score {
            90.. => self.excellent += 1,
            80..=89 => self.strong += 1,
            70..=79 => self.good += 1,
            60..=69 => self.fair += 1,
            _ => self.below_60 += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStats {
    pub job_id: Uuid,
    pub total_applications: usize,
    pub processed: usize,
    pub in_progress: usize,
    pub failed: usize,
    pub shortlisted: usize,
    /// Rounded mean over processed records; 0 when nothing is processed yet.
    pub average_score: i32,
    pub score_distribution: ScoreDistribution,
}

pub fn compute_stats(job_id: Uuid, records: &[ResumeRecord]) -> JobStats {
    let processed: Vec<&ResumeRecord> = records.iter().filter(|r| r.processed).collect();

    let mut distribution = ScoreDistribution::default();
    for record in &processed {
        distribution.add(record.match_score);
    }

    let average_score = if processed.is_empty() {
        0
    } else {
        let sum: i64 = processed.iter().map(|r| i64::from(r.match_score)).sum();
        (sum as f64 / processed.len() as f64).round() as i32
    };

    JobStats {
        job_id,
        total_applications: records.len(),
        processed: processed.len(),
        in_progress: records.iter().filter(|r| r.processing).count(),
        failed: records.iter().filter(|r| r.processing_error.is_some()).count(),
        shortlisted: processed.iter().filter(|r| r.shortlisted).count(),
        average_score,
        score_distribution: distribution,
    }
}
