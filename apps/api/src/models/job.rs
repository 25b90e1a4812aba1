use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The fixed set of job categories the NLP service knows how to score against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobCategory {
    #[serde(rename = "Cybersecurity")]
    Cybersecurity,
    #[serde(rename = "Web Developer")]
    WebDeveloper,
    #[serde(rename = "UET Peshawar")]
    UetPeshawar,
    #[serde(rename = "Python Developer")]
    PythonDeveloper,
    #[serde(rename = "Software Engineer")]
    SoftwareEngineer,
}

impl JobCategory {
    pub const ALL: [JobCategory; 5] = [
        JobCategory::Cybersecurity,
        JobCategory::WebDeveloper,
        JobCategory::UetPeshawar,
        JobCategory::PythonDeveloper,
        JobCategory::SoftwareEngineer,
    ];

    /// Label sent to the NLP service and stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCategory::Cybersecurity => "Cybersecurity",
            JobCategory::WebDeveloper => "Web Developer",
            JobCategory::UetPeshawar => "UET Peshawar",
            JobCategory::PythonDeveloper => "Python Developer",
            JobCategory::SoftwareEngineer => "Software Engineer",
        }
    }

    pub fn info(&self) -> JobCategoryInfo {
        let (name, description) = match self {
            JobCategory::Cybersecurity => (
                "Cybersecurity Specialist",
                "Information security and cybersecurity positions",
            ),
            JobCategory::WebDeveloper => (
                "Web Developer",
                "Frontend, backend and full stack development positions",
            ),
            JobCategory::UetPeshawar => (
                "Lecturer at UET Peshawar",
                "Academic positions at the University of Engineering and Technology, Peshawar",
            ),
            JobCategory::PythonDeveloper => (
                "Python Developer",
                "Python development and related technologies",
            ),
            JobCategory::SoftwareEngineer => (
                "Software Engineer",
                "General software engineering positions",
            ),
        };
        JobCategoryInfo {
            id: self.as_str(),
            name,
            description,
        }
    }
}

/// Catalogue entry for a category. `id` is the value accepted wherever a category is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobCategoryInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

impl FromStr for JobCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid job category: {s}"))
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub id: Uuid,
    pub title: String,
    pub category: JobCategory,
    pub description: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    /// Years.
    pub required_experience: i32,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a job description.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJobDescription {
    pub title: String,
    pub category: JobCategory,
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub required_experience: i32,
}

impl NewJobDescription {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title cannot be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description cannot be empty".to_string());
        }
        if self.required_experience < 0 {
            return Err("required_experience cannot be negative".to_string());
        }
        Ok(())
    }

    pub fn into_job(self, id: Uuid) -> JobDescription {
        JobDescription {
            id,
            title: self.title.trim().to_string(),
            category: self.category,
            description: self.description,
            required_skills: clean_skills(self.required_skills),
            preferred_skills: clean_skills(self.preferred_skills),
            required_experience: self.required_experience,
            created_at: Utc::now(),
        }
    }
}

fn clean_skills(skills: Vec<String>) -> Vec<String> {
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Row shape of the `job_descriptions` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobDescriptionRow {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub required_experience: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<JobDescriptionRow> for JobDescription {
    type Error = String;

    fn try_from(row: JobDescriptionRow) -> Result<Self, Self::Error> {
        Ok(JobDescription {
            id: row.id,
            title: row.title,
            category: row.category.parse()?,
            description: row.description,
            required_skills: row.required_skills,
            preferred_skills: row.preferred_skills,
            required_experience: row.required_experience,
            created_at: row.created_at,
        })
    }
}
